//! # aaconfine-core
//!
//! Safe core of the AppArmor confinement binding.
//!
//! ```text
//! caller -> Gateway (validate, relay, translate) -> ConfinementBackend -> libapparmor
//!              |
//!              +-- process Token (read-only, drawn once from /dev/urandom)
//! ```
//!
//! The native backend lives in `aaconfine-abi`; everything here is safe Rust
//! and can be exercised against stub backends.

pub mod backend;
pub mod config;
pub mod error;
pub mod gateway;
pub mod operation;
pub mod token;
pub mod trace;

pub use backend::{ConfinementBackend, NativeFailure, NativeResult, check_status, policy_name};
pub use error::{
    ConfinementError, ErrorKind, InitializationError, NativeOperationError, Result, UsageError,
};
pub use gateway::Gateway;
pub use operation::Operation;
pub use token::{Token, installed_token, process_token};
pub use trace::{TraceBuffer, TraceSink, Tracer};
