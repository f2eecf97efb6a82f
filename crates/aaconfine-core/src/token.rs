//! Process-wide confinement token ("magic token").
//!
//! `aa_change_hat` scopes a hat to the token it was entered with: only a caller
//! presenting the same token can leave the hat again. The token is drawn once
//! from `/dev/urandom`, installed in a write-once cell, and reused for every
//! enter/exit pair for the rest of the process lifetime.
//!
//! A short read or an all-zero value is fatal. The kernel treats a zero token
//! as "this hat can never be left", so zero is never installed as a fallback.

use std::ffi::c_ulong;
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::num::NonZero;
use std::path::Path;
use std::sync::OnceLock;

use parking_lot::Mutex;

use crate::error::InitializationError;

/// Secure entropy device the token is drawn from.
pub const ENTROPY_SOURCE: &str = "/dev/urandom";

/// Number of random bytes a token consumes (width of the native `unsigned long`).
pub const TOKEN_BYTES: usize = std::mem::size_of::<c_ulong>();

static TOKEN: OnceLock<Token> = OnceLock::new();
// Serializes generation so concurrent first callers never read entropy twice.
static INIT_LOCK: Mutex<()> = Mutex::new(());

/// An opaque, non-zero confinement token.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Token(NonZero<c_ulong>);

impl Token {
    /// Draw a fresh token from [`ENTROPY_SOURCE`] without installing it.
    ///
    /// The device handle is dropped before this returns.
    pub fn generate() -> Result<Self, InitializationError> {
        let path = Path::new(ENTROPY_SOURCE);
        let file = File::open(path).map_err(|source| InitializationError::EntropyUnavailable {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_entropy(file, path)
    }

    /// Build a token from a single read of `source`.
    ///
    /// `origin` only labels errors. The first completed `read` decides; fewer than
    /// [`TOKEN_BYTES`] bytes is a [`InitializationError::ShortRead`].
    pub fn from_entropy<R: Read>(
        mut source: R,
        origin: &Path,
    ) -> Result<Self, InitializationError> {
        let mut buf = [0u8; TOKEN_BYTES];
        let got = loop {
            match source.read(&mut buf) {
                Ok(n) => break n,
                Err(err) if err.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(err) => {
                    return Err(InitializationError::EntropyRead {
                        path: origin.to_path_buf(),
                        source: err,
                    });
                }
            }
        };
        if got < TOKEN_BYTES {
            return Err(InitializationError::ShortRead {
                path: origin.to_path_buf(),
                got,
                wanted: TOKEN_BYTES,
            });
        }
        NonZero::new(c_ulong::from_ne_bytes(buf))
            .map(Self)
            .ok_or_else(|| InitializationError::ZeroToken {
                path: origin.to_path_buf(),
            })
    }

    /// Raw value handed to `aa_change_hat`.
    ///
    /// Only confinement backends should need this; gateway callers never see it.
    #[must_use]
    pub const fn as_raw(self) -> c_ulong {
        self.0.get()
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Token(<redacted>)")
    }
}

/// Return the process token, generating and installing it on first use.
///
/// On failure nothing is installed and the next call tries again.
pub fn process_token() -> Result<&'static Token, InitializationError> {
    if let Some(token) = TOKEN.get() {
        return Ok(token);
    }
    let _guard = INIT_LOCK.lock();
    if let Some(token) = TOKEN.get() {
        return Ok(token);
    }
    let token = Token::generate()?;
    Ok(TOKEN.get_or_init(|| token))
}

/// The installed token, if initialization has already succeeded.
#[must_use]
pub fn installed_token() -> Option<&'static Token> {
    TOKEN.get()
}
