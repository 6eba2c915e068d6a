//! Lock session orchestration.
//!
//! [`LockSession`] drives the whole lock:
//! - acquire exclusive input (abort without showing anything on failure)
//! - show the lock surface
//! - collect key presses into the password buffer
//! - run a verifier round on every non-empty submit, until one is accepted
//!
//! The loop is single threaded and blocks in exactly one place, waiting for
//! the next input event. A verifier round blocks the loop too, so no input is
//! processed while authenticating. There is no attempt limit.

use tracing::{debug, error, info, trace, warn};

use crate::buffer::PasswordBuffer;
use crate::classify::{classify, KeyKind};
use crate::config::LockConfig;
use crate::error::LockError;
use crate::grab::acquire_exclusive_input;
use crate::traits::{InputEvent, InputGrabber, InputSource, LockSurface};
use crate::types::{GrabState, SessionState};
use crate::verifier::{AuthResult, BufferSecretProvider, CredentialVerifier};

/// The lock state machine.
///
/// Owns the password buffer and the verifier for its whole lifetime; nothing
/// outside the session can read or change either.
pub struct LockSession<V: CredentialVerifier> {
    config: LockConfig,
    verifier: V,
    buffer: PasswordBuffer,
    state: SessionState,
    grab_state: GrabState,
    /// Events received since the surface was shown.
    iterations: u64,
    /// Verifier rounds run.
    attempts: u32,
}

impl<V: CredentialVerifier> LockSession<V> {
    /// Create a session in the `Initializing` state.
    pub fn new(config: LockConfig, verifier: V) -> Self {
        Self {
            config,
            verifier,
            buffer: PasswordBuffer::new(),
            state: SessionState::Initializing,
            grab_state: GrabState::Unacquired,
            iterations: 0,
            attempts: 0,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn grab_state(&self) -> GrabState {
        self.grab_state
    }

    /// Number of bytes currently typed.
    pub fn buffer_len(&self) -> usize {
        self.buffer.len()
    }

    /// Number of verifier rounds run so far.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn verifier(&self) -> &V {
        &self.verifier
    }

    /// Lock the display and block until a secret is accepted.
    ///
    /// Returns `Ok(())` only after the verifier accepted a secret. Every exit
    /// path disposes the surface (if shown), releases the grabs and ends the
    /// verifier session.
    pub fn run<B>(&mut self, backend: &mut B) -> Result<(), LockError>
    where
        B: InputGrabber + LockSurface + InputSource,
    {
        self.state = SessionState::Initializing;

        self.grab_state = acquire_exclusive_input(backend, &self.config.grab);
        if !self.grab_state.is_exclusive() {
            error!(grab_state = %self.grab_state, "Refusing to lock without exclusive input");
            return Err(self.abort(backend, LockError::GrabFailed));
        }

        let handle = match backend.show(&self.config.appearance) {
            Ok(handle) => handle,
            Err(e) => return Err(self.abort(backend, e.into())),
        };

        self.state = SessionState::Locked;
        self.iterations = 0;
        info!("Screen locked");

        let result = self.event_loop(backend);

        backend.dispose(handle);
        backend.release();
        self.buffer.clear();
        self.verifier.end_session();

        match &result {
            Ok(()) => info!(attempts = self.attempts, "Screen unlocked"),
            Err(e) => error!(error = %e, "Lock session ended without unlocking"),
        }
        result
    }

    fn abort<B: InputGrabber>(&mut self, backend: &mut B, error: LockError) -> LockError {
        self.state = SessionState::Aborted;
        backend.release();
        self.verifier.end_session();
        error
    }

    fn event_loop<B>(&mut self, backend: &mut B) -> Result<(), LockError>
    where
        B: LockSurface + InputSource,
    {
        loop {
            let event = match backend.next_event() {
                Ok(event) => event,
                Err(e) => {
                    self.state = SessionState::Aborted;
                    return Err(e.into());
                }
            };

            if self.iterations == 0 && self.config.dpms {
                if backend.power_down() {
                    debug!("Display forced into power-save");
                } else {
                    debug!("Display does not support power management");
                }
            }
            self.iterations += 1;

            if self.handle_event(event, backend) == SessionState::Unlocked {
                return Ok(());
            }
        }
    }

    /// Apply one input event to the locked session.
    ///
    /// Events are ignored unless the session is `Locked`. Returns the state
    /// after the event.
    pub fn handle_event<S>(&mut self, event: InputEvent, surface: &mut S) -> SessionState
    where
        S: LockSurface + ?Sized,
    {
        if self.state != SessionState::Locked {
            return self.state;
        }

        let InputEvent::KeyPress(raw) = event else {
            return self.state;
        };

        let key = classify(raw);
        trace!(kind = %key.kind, "Key press");

        match key.kind {
            KeyKind::Ignored => {}
            KeyKind::Printable => {
                if !self.buffer.try_append(&key.text) {
                    trace!(len = self.buffer.len(), "Dropped input that does not fit");
                }
            }
            KeyKind::DeleteLast => self.buffer.delete_last(),
            KeyKind::Cancel => self.buffer.clear(),
            KeyKind::Submit => self.submit(surface),
        }

        self.state
    }

    fn submit<S>(&mut self, surface: &mut S)
    where
        S: LockSurface + ?Sized,
    {
        if self.buffer.is_empty() {
            trace!("Ignoring empty submission");
            return;
        }

        self.state = SessionState::Authenticating;
        self.attempts += 1;
        debug!(attempt = self.attempts, len = self.buffer.len(), "Authenticating");

        let result = self
            .verifier
            .authenticate(&BufferSecretProvider::new(&self.buffer));
        self.buffer.clear();

        match result {
            AuthResult::Accepted => {
                self.state = SessionState::Unlocked;
                return;
            }
            AuthResult::Rejected(reason) => {
                warn!(attempt = self.attempts, reason = %reason, "Authentication rejected");
            }
            AuthResult::Error(reason) => {
                error!(attempt = self.attempts, reason = %reason, "Authentication error");
            }
        }

        if self.config.beep {
            surface.bell();
        }
        self.state = SessionState::Locked;
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use crate::buffer::CAPACITY;
    use crate::config::Appearance;
    use crate::grab::tests::FakeGrabber;
    use crate::grab::RetryPolicy;
    use crate::keymap::RawKey;
    use crate::keysym::{normalize, XK_BACKSPACE, XK_ESCAPE, XK_F1, XK_KP_ENTER, XK_RETURN};
    use crate::traits::{SurfaceError, SurfaceHandle};
    use crate::verifier::MockVerifier;
    use proptest::prelude::*;

    /// Surface that only counts bells.
    #[derive(Default)]
    struct CountingSurface {
        bells: usize,
    }

    impl LockSurface for CountingSurface {
        fn show(&mut self, _appearance: &Appearance) -> Result<SurfaceHandle, SurfaceError> {
            Ok(SurfaceHandle(1))
        }

        fn dispose(&mut self, _handle: SurfaceHandle) {}

        fn power_down(&mut self) -> bool {
            false
        }

        fn bell(&mut self) {
            self.bells += 1;
        }
    }

    fn event() -> impl Strategy<Value = InputEvent> {
        prop_oneof![
            6 => any::<char>().prop_map(|c| InputEvent::KeyPress(RawKey::from_char(c))),
            2 => Just(InputEvent::KeyPress(RawKey::new(XK_RETURN, b"\r".to_vec()))),
            1 => Just(InputEvent::KeyPress(RawKey::new(XK_KP_ENTER, b"\r".to_vec()))),
            1 => Just(InputEvent::KeyPress(RawKey::new(XK_ESCAPE, b"\x1b".to_vec()))),
            1 => Just(InputEvent::KeyPress(RawKey::new(XK_BACKSPACE, b"\x08".to_vec()))),
            1 => Just(InputEvent::KeyPress(RawKey::new(XK_F1, Vec::new()))),
            1 => (any::<u32>(), proptest::collection::vec(any::<u8>(), 0..4))
                .prop_map(|(keysym, text)| InputEvent::KeyPress(RawKey::new(keysym, text))),
            1 => Just(InputEvent::Other),
        ]
    }

    fn failure() -> impl Strategy<Value = AuthResult> {
        prop_oneof![
            "[a-z ]{0,12}".prop_map(AuthResult::Rejected),
            "[a-z ]{0,12}".prop_map(AuthResult::Error),
        ]
    }

    proptest! {
        /// Without an accepting verifier the session never unlocks, and the
        /// verifier runs exactly once per non-empty submit.
        #[test]
        fn never_unlocks_without_accepted(
            events in proptest::collection::vec(event(), 0..300),
            script in proptest::collection::vec(failure(), 0..10),
            beep in any::<bool>(),
        ) {
            let config = LockConfig { beep, ..LockConfig::default() };
            let mut session = LockSession::new(config, MockVerifier::with_results(script));
            session.state = SessionState::Locked;
            let mut surface = CountingSurface::default();

            let mut submits = 0;
            for event in events {
                let is_submit = matches!(
                    &event,
                    InputEvent::KeyPress(raw) if normalize(raw.keysym) == XK_RETURN
                );
                if is_submit && session.buffer_len() > 0 {
                    submits += 1;
                }

                let state = session.handle_event(event, &mut surface);
                prop_assert_eq!(state, SessionState::Locked);
                prop_assert!(session.buffer_len() < CAPACITY);
            }

            prop_assert_eq!(session.verifier().call_count(), submits);
            prop_assert_eq!(session.attempts() as usize, submits);
            prop_assert_eq!(surface.bells, if beep { submits } else { 0 });
        }

        /// A grab that never succeeds never shows a surface or locks.
        #[test]
        fn failed_grab_never_locks(pointer_ok in any::<bool>(), attempts in 1u32..20) {
            let mut grabber = FakeGrabber::new(
                if pointer_ok { Some(0) } else { None },
                None,
            );
            let policy = RetryPolicy::new(attempts, std::time::Duration::ZERO);
            let state = acquire_exclusive_input(&mut grabber, &policy);

            prop_assert_eq!(state, GrabState::Failed);
            prop_assert!(!grabber.pointer_held && !grabber.keyboard_held);
            if !pointer_ok {
                prop_assert_eq!(grabber.keyboard_attempts, 0);
            }
        }
    }
}
