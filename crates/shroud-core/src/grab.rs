//! Exclusive input acquisition with bounded retry.
//!
//! Another client (a menu, a drag in progress, a running screen grabber) may
//! hold the pointer or keyboard for a moment when the locker starts. Each
//! device is therefore retried a fixed number of times with a fixed delay.
//! If either device cannot be taken the result is [`GrabState::Failed`] and
//! the caller must abort instead of showing a lock screen that does not
//! actually block input.

use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::traits::{GrabError, InputGrabber};
use crate::types::GrabState;

/// Default number of attempts per device.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 1000;

/// Default pause between attempts.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(1);

/// How often and how fast to retry a grab.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    delay: Duration,
}

impl RetryPolicy {
    /// Create a policy. At least one attempt is always made.
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Total time spent sleeping when every attempt fails, saturating at
    /// `Duration::MAX`.
    pub fn budget(&self) -> Duration {
        self.delay.saturating_mul(self.max_attempts - 1)
    }

    /// Run `attempt` until it reports success or the attempts run out.
    ///
    /// Returns the number of attempts used on success and `None` once the
    /// budget is exhausted. An `Err` from `attempt` stops retrying at once.
    pub fn run<E>(&self, mut attempt: impl FnMut() -> Result<bool, E>) -> Result<Option<u32>, E> {
        for n in 1..=self.max_attempts {
            if attempt()? {
                return Ok(Some(n));
            }
            if n < self.max_attempts && !self.delay.is_zero() {
                std::thread::sleep(self.delay);
            }
        }
        Ok(None)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_DELAY)
    }
}

/// Grab the pointer, then the keyboard.
///
/// The keyboard is only attempted once the pointer is held. On failure any
/// grab already taken is released before `Failed` is returned.
pub fn acquire_exclusive_input<G>(grabber: &mut G, policy: &RetryPolicy) -> GrabState
where
    G: InputGrabber + ?Sized,
{
    if grab_device(policy, "pointer", || grabber.try_grab_pointer()).is_none() {
        return GrabState::Failed;
    }
    debug!(state = %GrabState::PointerHeld, "Pointer grabbed");

    if grab_device(policy, "keyboard", || grabber.try_grab_keyboard()).is_none() {
        grabber.release();
        return GrabState::Failed;
    }

    let state = GrabState::FullyHeld;
    info!(state = %state, "Input grabbed");
    state
}

fn grab_device(
    policy: &RetryPolicy,
    device: &'static str,
    attempt: impl FnMut() -> Result<bool, GrabError>,
) -> Option<u32> {
    match policy.run(attempt) {
        Ok(Some(attempts)) => {
            if attempts > 1 {
                debug!(device, attempts, "Grab succeeded after retrying");
            }
            Some(attempts)
        }
        Ok(None) => {
            warn!(
                device,
                attempts = policy.max_attempts(),
                "Could not grab device, another client holds it"
            );
            None
        }
        Err(e) => {
            error!(device, error = %e, "Grab failed");
            None
        }
    }
}
