//! Exported C entry points.
//!
//! Transitions return `0` on success and `-1` on failure; the failure is then
//! available through [`aaconfine_last_error`], [`aaconfine_last_error_kind`]
//! and [`aaconfine_last_errno`] on the same thread. Name arguments are
//! validated before the module is initialized. The module (token plus
//! `libapparmor`) is initialized lazily by the first entry point that needs it,
//! or explicitly with [`aaconfine_init`].

use std::ffi::{c_char, c_int};

use aaconfine_core::{ConfinementError, Operation};

use crate::{last_error, module_state};

pub(crate) fn complete(result: Result<(), ConfinementError>) -> c_int {
    match result {
        Ok(()) => 0,
        Err(err) => {
            last_error::record(&err);
            -1
        }
    }
}

abi_fn! {
    /// Initialize the module: draw the confinement token and load
    /// `libapparmor`. Calling it is optional; it makes load failures visible
    /// before the first transition.
    fn aaconfine_init() -> c_int {
        complete(module_state::module().map(|_| ()))
    }
}

named_transition_fn! {
    /// Change into the hat `hat_name`, scoped by the process token.
    ///
    /// If a portion of the program needs different access permissions than
    /// other portions, it can "change hats" to a different role, also known as
    /// a subprofile.
    fn aaconfine_change_hat(hat_name) => Operation::EnterHat, enter_hat
}

abi_fn! {
    /// Exit the current hat and return to the previous profile.
    fn aaconfine_exit_hat() -> c_int {
        complete(module_state::module().and_then(|m| m.exit_hat()))
    }
}

named_transition_fn! {
    /// Change to `profile_name` immediately. The confining profile needs a
    /// rule permitting the change.
    fn aaconfine_change_profile(profile_name) => Operation::ChangeProfile, change_profile
}

named_transition_fn! {
    /// Change to `profile_name` at the next exec. Takes precedence over exec
    /// transition rules in the confining profile.
    fn aaconfine_change_onexec(profile_name) => Operation::ChangeOnexec, change_onexec
}

named_transition_fn! {
    /// Stack `profile_name` onto the current confinement immediately. The
    /// result is the intersection of all stacked profiles.
    fn aaconfine_stack_profile(profile_name) => Operation::StackProfile, stack_profile
}

named_transition_fn! {
    /// Stack `profile_name` onto the current confinement at the next exec.
    fn aaconfine_stack_onexec(profile_name) => Operation::StackOnexec, stack_onexec
}

abi_fn! {
    /// `1` if AppArmor is enabled, `0` otherwise. Never fails; if the module
    /// cannot be initialized the answer is `0` and the initialization error is
    /// left in the last-error record.
    fn aaconfine_is_enabled() -> c_int {
        match module_state::module() {
            Ok(m) => c_int::from(m.is_enabled()),
            Err(err) => {
                last_error::record(&err);
                0
            }
        }
    }
}

// The accessors below read the last-error record and must not clear it, so
// they bypass `abi_fn!`.

/// Message describing the last failure on this thread, or NULL.
///
/// Valid until the next transition, `aaconfine_init` or `aaconfine_is_enabled`
/// call on this thread.
#[unsafe(no_mangle)]
pub extern "C" fn aaconfine_last_error() -> *const c_char {
    last_error::message_ptr()
}

/// Kind of the last failure on this thread: `0` none, `1` initialization,
/// `2` usage, `3` native.
#[unsafe(no_mangle)]
pub extern "C" fn aaconfine_last_error_kind() -> c_int {
    last_error::kind()
}

/// errno reported by the native layer for the last failure on this thread,
/// or `0`.
#[unsafe(no_mangle)]
pub extern "C" fn aaconfine_last_errno() -> c_int {
    last_error::errno()
}
