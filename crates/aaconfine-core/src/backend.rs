//! The seam between the gateway and the native confinement library.
//!
//! A [`ConfinementBackend`] exposes the six `libapparmor` primitives the
//! gateway needs. The production backend lives in `aaconfine-abi` and calls
//! into `libapparmor`; tests substitute stubs that record or refuse calls.
//!
//! Native primitives follow the C convention "negative status means failure,
//! reason in errno". [`check_status`] is the only place that rule is written.

use std::ffi::{CStr, CString};

use crate::error::UsageError;
use crate::operation::Operation;
use crate::token::Token;

/// A failed native call: the raw status and the errno captured right after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NativeFailure {
    pub status: i32,
    pub errno: Option<i32>,
}

pub type NativeResult = Result<(), NativeFailure>;

/// Translate a native status code.
///
/// `errno` is only invoked on failure, so it must read errno before anything
/// else can clobber it. A zero errno is reported as unknown.
pub fn check_status(status: i32, errno: impl FnOnce() -> i32) -> NativeResult {
    if status < 0 {
        let code = errno();
        Err(NativeFailure {
            status,
            errno: (code != 0).then_some(code),
        })
    } else {
        Ok(())
    }
}

/// Native confinement primitives.
///
/// Implementations must be thread-safe; the gateway is shared process-wide.
pub trait ConfinementBackend: Send + Sync {
    /// `aa_change_hat(hat, token)`; `None` leaves the current hat.
    fn change_hat(&self, hat: Option<&CStr>, token: Token) -> NativeResult;
    /// `aa_change_profile(profile)`.
    fn change_profile(&self, profile: &CStr) -> NativeResult;
    /// `aa_change_onexec(profile)`.
    fn change_onexec(&self, profile: &CStr) -> NativeResult;
    /// `aa_stack_profile(profile)`.
    fn stack_profile(&self, profile: &CStr) -> NativeResult;
    /// `aa_stack_onexec(profile)`.
    fn stack_onexec(&self, profile: &CStr) -> NativeResult;
    /// `aa_is_enabled()`; any failure reads as "not enabled".
    fn is_enabled(&self) -> bool;
}

impl<B: ConfinementBackend + ?Sized> ConfinementBackend for &B {
    fn change_hat(&self, hat: Option<&CStr>, token: Token) -> NativeResult {
        (**self).change_hat(hat, token)
    }
    fn change_profile(&self, profile: &CStr) -> NativeResult {
        (**self).change_profile(profile)
    }
    fn change_onexec(&self, profile: &CStr) -> NativeResult {
        (**self).change_onexec(profile)
    }
    fn stack_profile(&self, profile: &CStr) -> NativeResult {
        (**self).stack_profile(profile)
    }
    fn stack_onexec(&self, profile: &CStr) -> NativeResult {
        (**self).stack_onexec(profile)
    }
    fn is_enabled(&self) -> bool {
        (**self).is_enabled()
    }
}

/// Validate a caller-supplied hat or profile name for `operation`.
///
/// Names must be non-empty and free of NUL bytes so they can cross the C ABI.
/// Whether the named policy exists is for the native layer to decide.
pub fn policy_name(operation: Operation, name: &str) -> Result<CString, UsageError> {
    let parameter = operation.parameter().unwrap_or("name");
    if name.is_empty() {
        return Err(UsageError::Empty {
            operation,
            parameter,
        });
    }
    CString::new(name).map_err(|_| UsageError::EmbeddedNul {
        operation,
        parameter,
    })
}
