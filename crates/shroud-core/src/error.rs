//! Fatal error taxonomy.
//!
//! Only conditions that end the process live here. A rejected password is an
//! [`AuthResult`](crate::verifier::AuthResult), never an error, and
//! malformed or oversized input is dropped without reaching this type.

use crate::config::ConfigError;
use crate::traits::{InputError, SurfaceError};
use crate::verifier::VerifierError;

/// Errors that end a lock session without unlocking.
#[derive(Debug, thiserror::Error)]
pub enum LockError {
    /// No identity to authenticate as.
    #[error("USER environment variable not set, please set it")]
    NoIdentity,

    /// The authentication service could not be started.
    #[error(transparent)]
    Verifier(#[from] VerifierError),

    /// The display could not be opened or set up.
    #[error("cannot open display: {0}")]
    Display(String),

    /// Exclusive input could not be acquired within the retry budget.
    #[error("could not grab pointer and keyboard, another client holds them")]
    GrabFailed,

    /// The lock surface could not be shown.
    #[error(transparent)]
    Surface(#[from] SurfaceError),

    /// The display connection was lost while locked.
    #[error(transparent)]
    Input(#[from] InputError),

    /// The configuration file is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl LockError {
    /// Whether the error happened before anything was shown on screen.
    pub fn is_startup(&self) -> bool {
        !matches!(self, LockError::Input(_))
    }
}
