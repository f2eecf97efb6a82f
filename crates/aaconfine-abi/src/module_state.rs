//! Process-wide module state.
//!
//! Holds the singleton `Gateway<LibApparmor>` used by every entry point.
//! Initialization installs the confinement token first, then loads
//! `libapparmor`; either failure leaves nothing installed and is reported to
//! the caller that attempted the load. Later callers retry.

use std::sync::OnceLock;

use aaconfine_core::{ConfinementError, Gateway, process_token};
use parking_lot::Mutex;

use crate::native::LibApparmor;

static MODULE: OnceLock<Gateway<LibApparmor>> = OnceLock::new();
static INIT_LOCK: Mutex<()> = Mutex::new(());

/// The process-wide gateway, initializing token and library on first use.
pub fn module() -> Result<&'static Gateway<LibApparmor>, ConfinementError> {
    if let Some(gateway) = MODULE.get() {
        return Ok(gateway);
    }
    let _guard = INIT_LOCK.lock();
    if let Some(gateway) = MODULE.get() {
        return Ok(gateway);
    }
    process_token()?;
    let library = LibApparmor::open()?;
    let gateway = Gateway::new(library)?;
    Ok(MODULE.get_or_init(|| gateway))
}

/// The gateway if a previous [`module`] call succeeded.
#[must_use]
pub fn try_module() -> Option<&'static Gateway<LibApparmor>> {
    MODULE.get()
}
