// Entry points take raw pointers from C callers and validate them at runtime;
// per-function safety docs would repeat the same contract.
#![allow(clippy::missing_safety_doc)]
//! # aaconfine-abi
//!
//! `extern "C"` embedding surface and `libapparmor` adapter for aaconfine.
//!
//! This crate produces a `cdylib` (`libaaconfine_abi.so`) exporting the
//! `aaconfine_*` symbols declared in `include/aaconfine.h`. Each entry point
//! validates its arguments, then hands the request to the process-wide
//! [`aaconfine_core::Gateway`] backed by a runtime-loaded `libapparmor`.
//!
//! # Architecture
//!
//! ```text
//! C caller -> ABI entry (this crate) -> name validation -> Gateway -> aa_* primitive
//!                  |                                          |
//!                  +------ thread-local last error <----------+
//! ```
//!
//! `libapparmor` is opened with `dlopen` on first use, so the library builds
//! and loads on hosts without AppArmor; there the first entry point needing it
//! reports an initialization error.

#[macro_use]
mod macros;

mod last_error;
mod module_state;
mod util;

pub mod gateway_abi;
pub mod native;

pub use module_state::{module, try_module};
pub use native::LibApparmor;
