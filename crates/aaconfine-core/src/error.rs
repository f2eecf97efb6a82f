//! Error model for confinement operations.
//!
//! Three kinds of failure reach callers:
//! - [`InitializationError`]: the module could not be brought up (token or
//!   native library). Fatal; nothing is usable afterwards.
//! - [`UsageError`]: the caller passed a malformed or missing argument. Raised
//!   before any native call.
//! - [`NativeOperationError`]: the confinement subsystem refused the transition.
//!
//! [`ConfinementError`] wraps all three for APIs that can produce more than one.

use std::path::PathBuf;

use thiserror::Error;

use crate::operation::Operation;

/// Stable numeric classification used across the C ABI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ErrorKind {
    Initialization = 1,
    Usage = 2,
    Native = 3,
}

#[derive(Debug, Error)]
pub enum InitializationError {
    #[error("failed to open entropy source {}: {source}", path.display())]
    EntropyUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("short read from entropy source {}: got {got} of {wanted} bytes", path.display())]
    ShortRead {
        path: PathBuf,
        got: usize,
        wanted: usize,
    },
    #[error("failed to read entropy source {}: {source}", path.display())]
    EntropyRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("entropy source {} produced an all-zero token", path.display())]
    ZeroToken { path: PathBuf },
    #[error("failed to load {library}: {reason}")]
    LibraryUnavailable { library: String, reason: String },
    #[error("{library} does not export {symbol}")]
    MissingSymbol {
        library: String,
        symbol: &'static str,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UsageError {
    #[error("{operation}() missing required argument '{parameter}'")]
    Missing {
        operation: Operation,
        parameter: &'static str,
    },
    #[error("{operation}() argument '{parameter}' must be a non-empty string")]
    Empty {
        operation: Operation,
        parameter: &'static str,
    },
    #[error("{operation}() argument '{parameter}' contains an embedded NUL byte")]
    EmbeddedNul {
        operation: Operation,
        parameter: &'static str,
    },
    #[error("{operation}() argument '{parameter}' is not valid UTF-8")]
    NotUtf8 {
        operation: Operation,
        parameter: &'static str,
    },
}

/// A transition the native layer refused.
///
/// `argument` is kept for diagnostics only and is never reused for a second
/// attempt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub struct NativeOperationError {
    pub operation: Operation,
    pub argument: Option<String>,
    pub status: i32,
    pub errno: Option<i32>,
}

impl NativeOperationError {
    /// The underlying OS error, when the native layer reported one.
    #[must_use]
    pub fn os_error(&self) -> Option<std::io::Error> {
        self.errno.map(std::io::Error::from_raw_os_error)
    }
}

impl std::fmt::Display for NativeOperationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} call failed",
            self.operation.native_call(self.argument.as_deref())
        )?;
        match (self.errno, self.os_error()) {
            (Some(code), Some(os)) => write!(f, " (errno {code}: {os})"),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfinementError {
    #[error("initialization failed: {0}")]
    Initialization(#[from] InitializationError),
    #[error(transparent)]
    Usage(#[from] UsageError),
    #[error(transparent)]
    Native(#[from] NativeOperationError),
}

impl ConfinementError {
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Initialization(_) => ErrorKind::Initialization,
            Self::Usage(_) => ErrorKind::Usage,
            Self::Native(_) => ErrorKind::Native,
        }
    }

    /// The errno reported by the native layer, if this is a native failure.
    #[must_use]
    pub fn errno(&self) -> Option<i32> {
        match self {
            Self::Native(err) => err.errno,
            _ => None,
        }
    }
}

pub type Result<T, E = ConfinementError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn native_message_echoes_call() {
        let err = NativeOperationError {
            operation: Operation::StackProfile,
            argument: Some("extra".to_string()),
            status: -1,
            errno: None,
        };
        assert_eq!(err.to_string(), "aa_stack_profile('extra') call failed");
    }

    #[test]
    fn native_message_includes_errno() {
        let err = NativeOperationError {
            operation: Operation::ExitHat,
            argument: None,
            status: -1,
            errno: Some(1),
        };
        let msg = err.to_string();
        assert!(msg.starts_with("aa_change_hat(NULL) call failed (errno 1: "));
        assert_eq!(err.os_error().and_then(|e| e.raw_os_error()), Some(1));
    }

    #[test]
    fn usage_message_names_parameter() {
        let err = UsageError::Empty {
            operation: Operation::ChangeProfile,
            parameter: "profile_name",
        };
        assert_eq!(
            err.to_string(),
            "change_profile() argument 'profile_name' must be a non-empty string"
        );
    }

    #[test]
    fn kinds_are_stable() {
        let usage: ConfinementError = UsageError::Missing {
            operation: Operation::EnterHat,
            parameter: "hat_name",
        }
        .into();
        assert_eq!(usage.kind(), ErrorKind::Usage);
        assert_eq!(usage.kind() as i32, 2);
        assert_eq!(usage.errno(), None);

        let init: ConfinementError = InitializationError::ZeroToken {
            path: PathBuf::from("/dev/urandom"),
        }
        .into();
        assert_eq!(init.kind() as i32, 1);
        assert!(init.to_string().starts_with("initialization failed: "));

        let native: ConfinementError = NativeOperationError {
            operation: Operation::ChangeOnexec,
            argument: Some("p".to_string()),
            status: -1,
            errno: Some(13),
        }
        .into();
        assert_eq!(native.kind() as i32, 3);
        assert_eq!(native.errno(), Some(13));
    }
}
