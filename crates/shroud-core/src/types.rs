//! Core state types for shroud.
//!
//! This module contains the state enumerations shared by the grab manager
//! and the lock session controller.

/// Ownership of the display's input devices.
///
/// Transitions only move forward: `Unacquired -> PointerHeld -> FullyHeld`,
/// or from any attempt into the terminal `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GrabState {
    /// Nothing grabbed yet.
    Unacquired,
    /// The pointer is grabbed, the keyboard is not.
    PointerHeld,
    /// Pointer and keyboard are both grabbed.
    FullyHeld,
    /// A grab exhausted its retry budget; the session must not lock.
    Failed,
}

impl GrabState {
    /// Whether input is exclusively ours.
    pub fn is_exclusive(&self) -> bool {
        matches!(self, GrabState::FullyHeld)
    }
}

impl std::fmt::Display for GrabState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GrabState::Unacquired => write!(f, "unacquired"),
            GrabState::PointerHeld => write!(f, "pointer_held"),
            GrabState::FullyHeld => write!(f, "fully_held"),
            GrabState::Failed => write!(f, "failed"),
        }
    }
}

/// Lifecycle of a lock session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// Grabs and surface are being set up.
    Initializing,
    /// Collecting password input.
    Locked,
    /// A verifier round-trip is in flight.
    Authenticating,
    /// The verifier accepted a secret. Terminal.
    Unlocked,
    /// The session ended without unlocking (grab failure, lost display). Terminal.
    Aborted,
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Unlocked | SessionState::Aborted)
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::Initializing => write!(f, "initializing"),
            SessionState::Locked => write!(f, "locked"),
            SessionState::Authenticating => write!(f, "authenticating"),
            SessionState::Unlocked => write!(f, "unlocked"),
            SessionState::Aborted => write!(f, "aborted"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_fully_held_is_exclusive() {
        assert!(!GrabState::Unacquired.is_exclusive());
        assert!(!GrabState::PointerHeld.is_exclusive());
        assert!(GrabState::FullyHeld.is_exclusive());
        assert!(!GrabState::Failed.is_exclusive());
    }

    #[test]
    fn terminal_session_states() {
        assert!(!SessionState::Initializing.is_terminal());
        assert!(!SessionState::Locked.is_terminal());
        assert!(!SessionState::Authenticating.is_terminal());
        assert!(SessionState::Unlocked.is_terminal());
        assert!(SessionState::Aborted.is_terminal());
    }

    #[test]
    fn state_display() {
        assert_eq!(GrabState::PointerHeld.to_string(), "pointer_held");
        assert_eq!(GrabState::Failed.to_string(), "failed");
        assert_eq!(SessionState::Authenticating.to_string(), "authenticating");
        assert_eq!(SessionState::Unlocked.to_string(), "unlocked");
    }
}
