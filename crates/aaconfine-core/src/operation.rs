//! The closed set of confinement operations exposed by the gateway.
//!
//! Each operation knows its public name, the native `libapparmor` primitive it
//! delegates to, and the name of its single text parameter (if any). Error
//! messages and trace records are derived from this table so the wording stays
//! consistent between the gateway, the native adapter and the C ABI.

use serde::Serialize;

/// A gateway operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    /// Switch into a named hat, scoped by the process token.
    EnterHat,
    /// Leave the hat entered with the process token.
    ExitHat,
    /// Replace the confining profile immediately.
    ChangeProfile,
    /// Replace the confining profile at the next exec.
    ChangeOnexec,
    /// Intersect a profile with the current confinement immediately.
    StackProfile,
    /// Intersect a profile with the current confinement at the next exec.
    StackOnexec,
    /// Query whether AppArmor is active on this host.
    IsEnabled,
}

/// Name of the parameter that carries a hat name.
pub const HAT_NAME: &str = "hat_name";
/// Name of the parameter that carries a profile name.
pub const PROFILE_NAME: &str = "profile_name";

impl Operation {
    /// Every operation, mutating ones first.
    pub const ALL: [Self; 7] = [
        Self::EnterHat,
        Self::ExitHat,
        Self::ChangeProfile,
        Self::ChangeOnexec,
        Self::StackProfile,
        Self::StackOnexec,
        Self::IsEnabled,
    ];

    /// Operations that request a confinement transition.
    pub const TRANSITIONS: [Self; 6] = [
        Self::EnterHat,
        Self::ExitHat,
        Self::ChangeProfile,
        Self::ChangeOnexec,
        Self::StackProfile,
        Self::StackOnexec,
    ];

    /// Public, caller-facing name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::EnterHat => "enter_hat",
            Self::ExitHat => "exit_hat",
            Self::ChangeProfile => "change_profile",
            Self::ChangeOnexec => "change_onexec",
            Self::StackProfile => "stack_profile",
            Self::StackOnexec => "stack_onexec",
            Self::IsEnabled => "is_enabled",
        }
    }

    /// The native primitive this operation delegates to.
    #[must_use]
    pub const fn primitive(self) -> &'static str {
        match self {
            Self::EnterHat | Self::ExitHat => "aa_change_hat",
            Self::ChangeProfile => "aa_change_profile",
            Self::ChangeOnexec => "aa_change_onexec",
            Self::StackProfile => "aa_stack_profile",
            Self::StackOnexec => "aa_stack_onexec",
            Self::IsEnabled => "aa_is_enabled",
        }
    }

    /// Name of the text parameter, or `None` for argument-less operations.
    #[must_use]
    pub const fn parameter(self) -> Option<&'static str> {
        match self {
            Self::EnterHat => Some(HAT_NAME),
            Self::ChangeProfile | Self::ChangeOnexec | Self::StackProfile | Self::StackOnexec => {
                Some(PROFILE_NAME)
            }
            Self::ExitHat | Self::IsEnabled => None,
        }
    }

    /// Whether the transition only takes effect at the next exec.
    #[must_use]
    pub const fn is_deferred(self) -> bool {
        matches!(self, Self::ChangeOnexec | Self::StackOnexec)
    }

    /// Render the native call the way it appears in diagnostics,
    /// e.g. `aa_stack_profile('extra')` or `aa_change_hat(NULL)`.
    #[must_use]
    pub fn native_call(self, argument: Option<&str>) -> String {
        match (self, argument) {
            (Self::IsEnabled, _) => format!("{}()", self.primitive()),
            (_, Some(arg)) => format!("{}('{arg}')", self.primitive()),
            (_, None) => format!("{}(NULL)", self.primitive()),
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
