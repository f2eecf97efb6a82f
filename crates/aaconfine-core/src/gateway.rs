//! Transition gateway: validated, traced relays to the confinement backend.
//!
//! The gateway owns no confinement state. The native layer is authoritative
//! about which profile or hat is active; the gateway only validates arguments,
//! forwards the request, and translates failures. Refused transitions are
//! never retried.

use std::ffi::CStr;

use crate::backend::{ConfinementBackend, NativeResult, policy_name};
use crate::error::{NativeOperationError, Result};
use crate::operation::Operation;
use crate::token::{Token, process_token};
use crate::trace::Tracer;

/// Process-facing confinement API over a [`ConfinementBackend`].
#[derive(Debug)]
pub struct Gateway<B> {
    backend: B,
    token: Token,
    tracer: Tracer,
}

impl<B: ConfinementBackend> Gateway<B> {
    /// Create a gateway using the process token, initializing it if needed.
    ///
    /// Fails with an initialization error when no token can be drawn.
    pub fn new(backend: B) -> Result<Self> {
        let token = *process_token()?;
        let gateway = Self {
            backend,
            token,
            tracer: Tracer::from_env(),
        };
        gateway.tracer.module_initialized("confinement token installed");
        Ok(gateway)
    }

    /// Replace the tracer (for example to capture traces in a buffer).
    #[must_use]
    pub fn with_tracer(mut self, tracer: Tracer) -> Self {
        self.tracer = tracer;
        self
    }

    #[must_use]
    pub const fn backend(&self) -> &B {
        &self.backend
    }

    /// Enter the hat `hat_name` within the current profile.
    ///
    /// If a portion of the program needs different access permissions than
    /// other portions, it can "change hats" to a different role, also known as
    /// a subprofile. Hats only narrow the parent profile's permissions. The
    /// hat is scoped to the process token, so only [`Self::exit_hat`] on this
    /// process can leave it.
    pub fn enter_hat(&self, hat_name: &str) -> Result<()> {
        let op = Operation::EnterHat;
        let hat = policy_name(op, hat_name)?;
        self.relay(op, Some(hat_name), |b| b.change_hat(Some(hat.as_c_str()), self.token))
    }

    /// Leave the current hat and return to the profile active before the
    /// matching [`Self::enter_hat`].
    ///
    /// Fails if no hat was entered with this process token.
    pub fn exit_hat(&self) -> Result<()> {
        self.relay(Operation::ExitHat, None, |b| b.change_hat(None, self.token))
    }

    /// Replace the confining profile with `profile_name`, immediately.
    ///
    /// The confining profile must carry a rule permitting the change. There is
    /// no way back from the caller's side.
    pub fn change_profile(&self, profile_name: &str) -> Result<()> {
        self.relay_named(Operation::ChangeProfile, profile_name, |b, p| {
            b.change_profile(p)
        })
    }

    /// Like [`Self::change_profile`], but the transition happens at the next
    /// exec instead of immediately.
    ///
    /// The delayed change takes precedence over any exec transition rules in
    /// the confining profile. Deferring to the exec boundary removes the need
    /// for stub transition profiles, and exec is where sensitive memory gets
    /// unmapped.
    pub fn change_onexec(&self, profile_name: &str) -> Result<()> {
        self.relay_named(Operation::ChangeOnexec, profile_name, |b, p| {
            b.change_onexec(p)
        })
    }

    /// Stack `profile_name` on top of the current confinement, immediately.
    ///
    /// The result is the intersection of all stacked profiles, so confinement
    /// can only become stricter. Unlike [`Self::change_profile`], the new
    /// profile can never be more permissive than the old one.
    pub fn stack_profile(&self, profile_name: &str) -> Result<()> {
        self.relay_named(Operation::StackProfile, profile_name, |b, p| {
            b.stack_profile(p)
        })
    }

    /// Like [`Self::stack_profile`], but the stacking happens at the next exec.
    ///
    /// The delayed change takes precedence over any exec transition rules in
    /// the confining profile.
    pub fn stack_onexec(&self, profile_name: &str) -> Result<()> {
        self.relay_named(Operation::StackOnexec, profile_name, |b, p| {
            b.stack_onexec(p)
        })
    }

    /// Whether AppArmor is enabled on this host. Never fails.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.backend.is_enabled()
    }

    fn relay_named(
        &self,
        op: Operation,
        name: &str,
        call: impl FnOnce(&B, &CStr) -> NativeResult,
    ) -> Result<()> {
        let cname = policy_name(op, name)?;
        self.relay(op, Some(name), |b| call(b, &cname))
    }

    fn relay(
        &self,
        op: Operation,
        argument: Option<&str>,
        call: impl FnOnce(&B) -> NativeResult,
    ) -> Result<()> {
        match call(&self.backend) {
            Ok(()) => {
                self.tracer.transition_succeeded(op, argument);
                Ok(())
            }
            Err(failure) => {
                let err = NativeOperationError {
                    operation: op,
                    argument: argument.map(str::to_owned),
                    status: failure.status,
                    errno: failure.errno,
                };
                self.tracer.transition_refused(&err);
                Err(err.into())
            }
        }
    }
}
