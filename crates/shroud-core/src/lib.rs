//! Core types and state machine for the shroud screen locker.
//!
//! This crate holds everything that decides whether the screen unlocks. It is
//! intentionally display-free to allow:
//!
//! - Security audits to focus on a small set of modules
//! - Unit tests without an X server or PAM
//! - Swapping the display or authentication backend
//!
//! # Modules
//!
//! - [`buffer`]: Fixed-capacity, memory-locked password buffer
//! - [`keysym`] / [`keymap`]: Keysym constants and keycode translation
//! - [`classify`]: Maps a key press to an editing action
//! - [`grab`]: Bounded retry for exclusive pointer and keyboard grabs
//! - [`verifier`]: Credential verifier interface and a mock implementation
//! - [`session`]: The lock session state machine
//! - [`config`]: Config file and command-line overrides
//! - [`traits`]: Display backend traits (`InputGrabber`, `LockSurface`, `InputSource`)
//!
//! # Example
//!
//! ```
//! use shroud_core::buffer::PasswordBuffer;
//! use shroud_core::classify::{classify, KeyKind};
//! use shroud_core::keymap::RawKey;
//!
//! let mut buffer = PasswordBuffer::new();
//! let key = classify(RawKey::from_char('a'));
//! assert_eq!(key.kind, KeyKind::Printable);
//! assert!(buffer.try_append(&key.text));
//! assert_eq!(buffer.len(), 1);
//! ```

pub mod buffer;
pub mod classify;
pub mod config;
pub mod error;
pub mod grab;
pub mod keymap;
pub mod keysym;
pub mod session;
pub mod traits;
pub mod types;
pub mod verifier;

pub use buffer::PasswordBuffer;
pub use classify::{classify, KeyEvent, KeyKind};
pub use config::{Appearance, Background, Config, LockConfig, Overrides, PointerCursor, Rgb};
pub use error::LockError;
pub use grab::{acquire_exclusive_input, RetryPolicy};
pub use session::LockSession;
pub use traits::{InputEvent, InputGrabber, InputSource, LockSurface, SurfaceHandle};
pub use types::{GrabState, SessionState};
pub use verifier::{AuthResult, CredentialVerifier, VerifierError, VerifierService};
