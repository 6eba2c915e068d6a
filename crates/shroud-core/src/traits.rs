//! Trait definitions for the display-side collaborators.
//!
//! These traits define the interfaces for:
//! - Exclusive input ownership (pointer and keyboard grabs)
//! - The lock surface (window, bell, power management)
//! - The blocking source of input events
//!
//! The session controller is generic over them, so the whole lock state
//! machine runs against scripted implementations in tests and against the
//! X11 backend in production.

use crate::config::Appearance;
use crate::keymap::RawKey;

/// Error type for grab operations.
#[derive(Debug, thiserror::Error)]
pub enum GrabError {
    /// The display connection failed while grabbing.
    #[error("display connection failed during grab: {0}")]
    Connection(String),
}

/// Error type for lock surface operations.
#[derive(Debug, thiserror::Error)]
pub enum SurfaceError {
    /// Creating or mapping the window failed.
    #[error("failed to create lock window: {0}")]
    Window(String),

    /// The backdrop image could not be used.
    #[error("failed to load backdrop image: {0}")]
    Backdrop(String),
}

/// Error type for the input event source.
#[derive(Debug, thiserror::Error)]
pub enum InputError {
    /// The display connection was lost; no further events will arrive.
    #[error("display connection lost: {0}")]
    ConnectionLost(String),
}

/// An input event delivered while locked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
    /// A key press, already looked up in the keyboard map.
    KeyPress(RawKey),
    /// Any other event (key release, button, expose, ...).
    Other,
}

/// Opaque handle for a shown lock surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SurfaceHandle(pub u32);

/// Takes exclusive ownership of pointer and keyboard input.
///
/// Each method performs a single attempt; retrying is the grab manager's
/// job. `Ok(false)` means the device is currently held by someone else.
pub trait InputGrabber {
    /// Attempt to grab the pointer.
    fn try_grab_pointer(&mut self) -> Result<bool, GrabError>;

    /// Attempt to grab the keyboard.
    fn try_grab_keyboard(&mut self) -> Result<bool, GrabError>;

    /// Release any grabs held. Must be safe to call when nothing is held.
    fn release(&mut self);
}

/// The blocking surface shown while locked.
pub trait LockSurface {
    /// Create, raise and map the lock surface.
    fn show(&mut self, appearance: &Appearance) -> Result<SurfaceHandle, SurfaceError>;

    /// Tear the surface down. Must be safe to call on every exit path.
    fn dispose(&mut self, handle: SurfaceHandle);

    /// Enable display power management and force the lowest power mode.
    ///
    /// Returns `false` when the display does not support it.
    fn power_down(&mut self) -> bool;

    /// Ring the bell. Fire and forget.
    fn bell(&mut self);
}

/// Blocking source of input events.
pub trait InputSource {
    /// Wait for and return the next event.
    fn next_event(&mut self) -> Result<InputEvent, InputError>;
}
