//! Thread-local record of the last failure, in the style of `dlerror`.
//!
//! Each entry point clears the record on entry and fills it on failure, so a
//! caller can inspect the error right after a `-1` return. Threads never see
//! each other's errors.

use std::cell::RefCell;
use std::ffi::{CString, c_char, c_int};

use aaconfine_core::ConfinementError;

struct LastError {
    kind: c_int,
    errno: c_int,
    message: CString,
}

std::thread_local! {
    static LAST_ERROR: RefCell<Option<LastError>> = const { RefCell::new(None) };
}

pub(crate) fn clear() {
    LAST_ERROR.with_borrow_mut(|slot| *slot = None);
}

pub(crate) fn record(err: &ConfinementError) {
    // Messages echo caller arguments; NUL bytes cannot survive a C string.
    let message = CString::new(err.to_string().replace('\0', "\\0")).unwrap_or_default();
    let entry = LastError {
        kind: err.kind() as c_int,
        errno: err.errno().unwrap_or(0),
        message,
    };
    LAST_ERROR.with_borrow_mut(|slot| *slot = Some(entry));
}

/// Pointer to the current message, or NULL. Valid until the next entry point
/// call on this thread.
pub(crate) fn message_ptr() -> *const c_char {
    LAST_ERROR.with_borrow(|slot| {
        slot.as_ref()
            .map_or(std::ptr::null(), |e| e.message.as_ptr())
    })
}

pub(crate) fn kind() -> c_int {
    LAST_ERROR.with_borrow(|slot| slot.as_ref().map_or(0, |e| e.kind))
}

pub(crate) fn errno() -> c_int {
    LAST_ERROR.with_borrow(|slot| slot.as_ref().map_or(0, |e| e.errno))
}
