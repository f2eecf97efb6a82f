//! `libapparmor` adapter.
//!
//! The library is loaded at runtime with `dlopen` and its six primitives are
//! resolved once with `dlsym`. Every raw native call site in the workspace is
//! in this file; status codes go through [`check_status`] with errno read
//! immediately after the call.
//!
//! ```c
//! int aa_change_hat(const char *subprofile, unsigned long magic_token);
//! int aa_change_profile(const char *profile);
//! int aa_change_onexec(const char *profile);
//! int aa_stack_profile(const char *profile);
//! int aa_stack_onexec(const char *profile);
//! int aa_is_enabled(void);
//! ```

use std::ffi::{CStr, c_char, c_int, c_ulong, c_void};
use std::ptr::NonNull;

use aaconfine_core::{ConfinementBackend, InitializationError, NativeResult, Token, check_status};

/// Sonames tried in order by [`LibApparmor::open`].
pub const LIBRARY_CANDIDATES: [&CStr; 2] = [c"libapparmor.so.1", c"libapparmor.so"];

type ChangeHatFn = unsafe extern "C" fn(*const c_char, c_ulong) -> c_int;
type ProfileFn = unsafe extern "C" fn(*const c_char) -> c_int;
type IsEnabledFn = unsafe extern "C" fn() -> c_int;

/// Loaded `libapparmor` with its primitives resolved.
pub struct LibApparmor {
    handle: NonNull<c_void>,
    library: &'static CStr,
    change_hat: ChangeHatFn,
    change_profile: ProfileFn,
    change_onexec: ProfileFn,
    stack_profile: ProfileFn,
    stack_onexec: ProfileFn,
    is_enabled: IsEnabledFn,
}

// SAFETY: the handle is only touched again by `dlclose` in `Drop`; the
// resolved primitives are plain C functions that are safe to call from any
// thread.
unsafe impl Send for LibApparmor {}
unsafe impl Sync for LibApparmor {}

impl std::fmt::Debug for LibApparmor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LibApparmor")
            .field("library", &self.library)
            .finish_non_exhaustive()
    }
}

impl LibApparmor {
    /// Load the first available soname from [`LIBRARY_CANDIDATES`].
    pub fn open() -> Result<Self, InitializationError> {
        let mut failure = None;
        for library in LIBRARY_CANDIDATES {
            match Self::open_named(library) {
                Ok(lib) => return Ok(lib),
                // A library that loads but lacks a primitive is not retried under another name.
                Err(err @ InitializationError::MissingSymbol { .. }) => return Err(err),
                Err(err) => failure = Some(err),
            }
        }
        Err(failure.unwrap_or_else(|| InitializationError::LibraryUnavailable {
            library: "libapparmor".to_string(),
            reason: "no candidate library names".to_string(),
        }))
    }

    /// Load `library` and resolve every primitive from it.
    pub fn open_named(library: &'static CStr) -> Result<Self, InitializationError> {
        // SAFETY: `library` is a valid NUL-terminated string.
        let raw = unsafe { libc::dlopen(library.as_ptr(), libc::RTLD_NOW | libc::RTLD_LOCAL) };
        let Some(handle) = NonNull::new(raw) else {
            return Err(InitializationError::LibraryUnavailable {
                library: display(library),
                reason: dlerror_message(),
            });
        };

        // From here on the handle must be closed on every error path.
        let resolved = (|| {
            let change_hat = resolve(handle, library, c"aa_change_hat", "aa_change_hat")?;
            let change_profile =
                resolve(handle, library, c"aa_change_profile", "aa_change_profile")?;
            let change_onexec = resolve(handle, library, c"aa_change_onexec", "aa_change_onexec")?;
            let stack_profile = resolve(handle, library, c"aa_stack_profile", "aa_stack_profile")?;
            let stack_onexec = resolve(handle, library, c"aa_stack_onexec", "aa_stack_onexec")?;
            let is_enabled = resolve(handle, library, c"aa_is_enabled", "aa_is_enabled")?;
            // SAFETY: each symbol is the libapparmor primitive of the matching
            // signature documented at the top of this module.
            unsafe {
                Ok::<_, InitializationError>(Self {
                    handle,
                    library,
                    change_hat: std::mem::transmute::<*mut c_void, ChangeHatFn>(
                        change_hat.as_ptr(),
                    ),
                    change_profile: std::mem::transmute::<*mut c_void, ProfileFn>(
                        change_profile.as_ptr(),
                    ),
                    change_onexec: std::mem::transmute::<*mut c_void, ProfileFn>(
                        change_onexec.as_ptr(),
                    ),
                    stack_profile: std::mem::transmute::<*mut c_void, ProfileFn>(
                        stack_profile.as_ptr(),
                    ),
                    stack_onexec: std::mem::transmute::<*mut c_void, ProfileFn>(
                        stack_onexec.as_ptr(),
                    ),
                    is_enabled: std::mem::transmute::<*mut c_void, IsEnabledFn>(
                        is_enabled.as_ptr(),
                    ),
                })
            }
        })();

        if resolved.is_err() {
            // SAFETY: handle came from a successful dlopen and is not shared.
            unsafe { libc::dlclose(handle.as_ptr()) };
        }
        resolved
    }

    /// The soname this adapter was loaded from.
    #[must_use]
    pub fn library(&self) -> &'static CStr {
        self.library
    }
}

impl Drop for LibApparmor {
    fn drop(&mut self) {
        // SAFETY: the handle is owned by this adapter and no function pointer
        // outlives it.
        unsafe { libc::dlclose(self.handle.as_ptr()) };
    }
}

impl ConfinementBackend for LibApparmor {
    fn change_hat(&self, hat: Option<&CStr>, token: Token) -> NativeResult {
        let subprofile = hat.map_or(std::ptr::null(), CStr::as_ptr);
        // SAFETY: `subprofile` is NULL or a valid C string borrowed for the call.
        let status = unsafe { (self.change_hat)(subprofile, token.as_raw()) };
        check_status(status, last_errno)
    }

    fn change_profile(&self, profile: &CStr) -> NativeResult {
        // SAFETY: `profile` is a valid C string borrowed for the call.
        let status = unsafe { (self.change_profile)(profile.as_ptr()) };
        check_status(status, last_errno)
    }

    fn change_onexec(&self, profile: &CStr) -> NativeResult {
        // SAFETY: as above.
        let status = unsafe { (self.change_onexec)(profile.as_ptr()) };
        check_status(status, last_errno)
    }

    fn stack_profile(&self, profile: &CStr) -> NativeResult {
        // SAFETY: as above.
        let status = unsafe { (self.stack_profile)(profile.as_ptr()) };
        check_status(status, last_errno)
    }

    fn stack_onexec(&self, profile: &CStr) -> NativeResult {
        // SAFETY: as above.
        let status = unsafe { (self.stack_onexec)(profile.as_ptr()) };
        check_status(status, last_errno)
    }

    fn is_enabled(&self) -> bool {
        // SAFETY: no arguments; returns 1 when enabled, 0 with errno otherwise.
        unsafe { (self.is_enabled)() == 1 }
    }
}

fn resolve(
    handle: NonNull<c_void>,
    library: &CStr,
    name: &CStr,
    symbol: &'static str,
) -> Result<NonNull<c_void>, InitializationError> {
    // SAFETY: clears any stale loader error; handle is live.
    let ptr = unsafe {
        libc::dlerror();
        libc::dlsym(handle.as_ptr(), name.as_ptr())
    };
    NonNull::new(ptr).ok_or_else(|| InitializationError::MissingSymbol {
        library: display(library),
        symbol,
    })
}

fn last_errno() -> i32 {
    // SAFETY: __errno_location always returns this thread's errno slot.
    unsafe { *libc::__errno_location() }
}

fn dlerror_message() -> String {
    // SAFETY: dlerror returns NULL or a NUL-terminated thread-local string.
    let msg = unsafe { libc::dlerror() };
    if msg.is_null() {
        "unknown dynamic loader error".to_string()
    } else {
        // SAFETY: non-null result of dlerror.
        unsafe { CStr::from_ptr(msg) }.to_string_lossy().into_owned()
    }
}

fn display(library: &CStr) -> String {
    library.to_string_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_library_is_initialization_error() {
        let err = LibApparmor::open_named(c"libaaconfine-does-not-exist.so.0").unwrap_err();
        match err {
            InitializationError::LibraryUnavailable { library, reason } => {
                assert_eq!(library, "libaaconfine-does-not-exist.so.0");
                assert!(!reason.is_empty());
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn library_without_primitives_is_refused() {
        // libc loads everywhere this crate runs but exports no aa_* symbols.
        let err = LibApparmor::open_named(c"libc.so.6").unwrap_err();
        assert!(matches!(
            err,
            InitializationError::MissingSymbol {
                symbol: "aa_change_hat",
                ..
            }
        ));
    }

    #[test]
    fn is_enabled_does_not_fail_when_library_present() {
        if let Ok(lib) = LibApparmor::open() {
            let _ = lib.is_enabled();
            assert!(LIBRARY_CANDIDATES.contains(&lib.library()));
        }
    }
}
