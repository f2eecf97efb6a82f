//! Shared internal utilities for ABI adapters.

use std::ffi::{CStr, c_char};

use aaconfine_core::{Operation, UsageError};

/// Borrow a caller-supplied hat or profile name.
///
/// NULL is a missing argument; the text must be non-empty UTF-8.
///
/// # Safety
///
/// `ptr` must be NULL or point to a NUL-terminated string that stays valid
/// and unmodified for `'a`.
pub unsafe fn borrow_name<'a>(
    operation: Operation,
    ptr: *const c_char,
) -> Result<&'a str, UsageError> {
    let parameter = operation.parameter().unwrap_or("name");
    if ptr.is_null() {
        return Err(UsageError::Missing {
            operation,
            parameter,
        });
    }
    // SAFETY: non-null and NUL-terminated per the caller contract.
    let name = unsafe { CStr::from_ptr(ptr) }
        .to_str()
        .map_err(|_| UsageError::NotUtf8 {
            operation,
            parameter,
        })?;
    if name.is_empty() {
        return Err(UsageError::Empty {
            operation,
            parameter,
        });
    }
    Ok(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_is_missing() {
        let err = unsafe { borrow_name(Operation::EnterHat, std::ptr::null()) }.unwrap_err();
        assert_eq!(
            err,
            UsageError::Missing {
                operation: Operation::EnterHat,
                parameter: "hat_name",
            }
        );
    }

    #[test]
    fn empty_is_rejected() {
        let err = unsafe { borrow_name(Operation::ChangeProfile, c"".as_ptr()) }.unwrap_err();
        assert!(matches!(err, UsageError::Empty { .. }));
    }

    #[test]
    fn invalid_utf8_is_rejected() {
        let bytes = b"prof\xffile\0";
        let err = unsafe { borrow_name(Operation::StackProfile, bytes.as_ptr().cast()) }
            .unwrap_err();
        assert!(matches!(err, UsageError::NotUtf8 { .. }));
    }

    #[test]
    fn valid_name_is_borrowed() {
        let name = unsafe { borrow_name(Operation::StackOnexec, c"extra".as_ptr()) }.unwrap();
        assert_eq!(name, "extra");
    }
}
