//! X11 and PAM frontends for the shroud screen locker.
//!
//! The lock logic lives in `shroud-core`; this crate connects it to a real
//! display and a real authentication stack.
//!
//! - [`x11`]: display backend (grabs, lock window, cursor, DPMS, events)
//! - [`backdrop`]: XPM backdrop loading and tiling
//! - [`pam`]: PAM credential verifier
//! - [`daemon`]: forking into the background

pub mod backdrop;
pub mod daemon;
#[cfg(feature = "pam")]
pub mod pam;
pub mod x11;

pub use daemon::daemonize;
#[cfg(feature = "pam")]
pub use pam::{PamService, PamVerifier};
pub use x11::{X11Display, X11Error};
