//! PIN controller: keypad, completion handler, lockout ticker
//!
//! The controller owns a [`PinSession`] behind a mutex and drives it from three
//! directions:
//! - keypad presses from the UI ([`PinController::press`]),
//! - the caller's verdict through the [`PinHandle`] command interface,
//! - a once-per-interval ticker task that exists only while a lock is set.
//!
//! The ticker holds a weak reference to the shared state. It is aborted when a
//! new lock replaces it, when the lock expires, and when the controller drops.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::session::{KeyOutcome, LockTick, PinSession, PinSnapshot};
use super::{KeypadInput, DEFAULT_TICK_INTERVAL};
use crate::error::PinError;
use crate::haptics::{HapticEffect, Haptics};

/// A completed code was refused by the handler
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PinRejected {
    /// Message to show; `None` clears the input silently
    pub message: Option<String>,
}

impl PinRejected {
    /// Reject with a visible message
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
        }
    }

    /// Reject without a message
    pub fn silent() -> Self {
        Self { message: None }
    }
}

impl From<PinError> for PinRejected {
    fn from(e: PinError) -> Self {
        Self::new(e.to_string())
    }
}

/// Receives completed codes
pub trait PinHandler: Send + Sync {
    /// Called once per completed code
    ///
    /// Returning an error resets the input and shows the message. The handle may
    /// be used to lock the session instead.
    fn on_pin(&self, code: &str, pin: &PinHandle) -> Result<(), PinRejected>;

    /// Called when a lock with a future deadline is established
    fn on_lock(&self) {}
}

/// What a key press did, as seen by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PressOutcome {
    /// Digit appended or removed
    Accepted,
    /// Nothing changed
    Ignored,
    /// A full code was handed to the handler and accepted
    Submitted,
}

struct Inner {
    session: PinSession,
    ticker: Option<JoinHandle<()>>,
}

struct Shared {
    state: Mutex<Inner>,
    handler: Arc<dyn PinHandler>,
    haptics: Arc<dyn Haptics>,
    tick_interval: Duration,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Command interface over a PIN session
#[derive(Clone)]
pub struct PinHandle {
    shared: Arc<Shared>,
}

impl PinHandle {
    /// Clear the input, showing `message` with an error buzz when given
    pub fn reset(&self, message: Option<&str>) {
        let shown = self.shared.lock().session.reset(message);
        if shown {
            self.shared.haptics.vibrate(HapticEffect::Error);
        }
    }

    /// Remove the error message without touching the digits
    pub fn clear_message(&self) {
        self.shared.lock().session.clear_message();
    }

    /// Lock input until `until`, or lift the lock with `None`
    pub fn locked(&self, until: Option<Instant>) {
        let now = Instant::now();
        let established = {
            let mut inner = self.shared.lock();
            if let Some(ticker) = inner.ticker.take() {
                ticker.abort();
            }
            let established = inner.session.lock(until, now);
            if until.is_some() {
                inner.ticker = self.spawn_ticker();
            }
            established
        };

        if established {
            info!("PIN entry locked");
            self.shared.handler.on_lock();
        }
    }

    /// Advance the lockout countdown to `now`
    ///
    /// The ticker task calls this on its own; hosts without a tokio runtime
    /// can drive it from their event loop instead.
    pub fn tick(&self, now: Instant) -> LockTick {
        let mut inner = self.shared.lock();
        let tick = inner.session.tick(now);
        if tick == LockTick::Expired {
            debug!("PIN lockout expired");
            if let Some(ticker) = inner.ticker.take() {
                ticker.abort();
            }
        }
        tick
    }

    /// Current state for rendering
    pub fn snapshot(&self) -> PinSnapshot {
        self.shared.lock().session.snapshot()
    }

    /// Whether input is refused right now
    pub fn is_locked(&self) -> bool {
        self.shared.lock().session.is_locked(Instant::now())
    }

    fn spawn_ticker(&self) -> Option<JoinHandle<()>> {
        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(_) => {
                warn!("No tokio runtime, lockout expiry must be driven through tick()");
                return None;
            }
        };

        let period = self.shared.tick_interval;
        let shared = Arc::downgrade(&self.shared);
        Some(runtime.spawn(run_ticker(shared, period)))
    }
}

async fn run_ticker(shared: Weak<Shared>, period: Duration) {
    let mut interval = tokio::time::interval_at(Instant::now() + period, period);
    loop {
        interval.tick().await;

        let Some(shared) = shared.upgrade() else {
            break;
        };
        let pin = PinHandle { shared };
        if pin.tick(Instant::now()) != LockTick::Counting {
            break;
        }
    }
}

/// PIN entry controller for one screen
pub struct PinController {
    handle: PinHandle,
}

impl PinController {
    /// Create a controller with the default one second countdown
    pub fn new(handler: Arc<dyn PinHandler>, haptics: Arc<dyn Haptics>) -> Self {
        Self::with_tick_interval(handler, haptics, DEFAULT_TICK_INTERVAL)
    }

    /// Create a controller with a custom countdown interval
    pub fn with_tick_interval(
        handler: Arc<dyn PinHandler>,
        haptics: Arc<dyn Haptics>,
        tick_interval: Duration,
    ) -> Self {
        let shared = Shared {
            state: Mutex::new(Inner {
                session: PinSession::new(),
                ticker: None,
            }),
            handler,
            haptics,
            tick_interval,
        };

        Self {
            handle: PinHandle {
                shared: Arc::new(shared),
            },
        }
    }

    /// Get the command handle for this session
    pub fn handle(&self) -> PinHandle {
        self.handle.clone()
    }

    /// Feed a keypad press
    ///
    /// Returns `LockoutActive` while locked and `ValidationFailed` when the
    /// handler refused a completed code. Both are already reflected in the
    /// session state; the error is informational.
    pub fn press(&self, input: KeypadInput) -> Result<PressOutcome, PinError> {
        let shared = &self.handle.shared;
        let outcome = shared.lock().session.press(input, Instant::now());

        let code = match outcome {
            Err(e) => {
                debug!("Keypad input refused: {}", e);
                shared.haptics.vibrate(HapticEffect::Error);
                return Err(e);
            }
            Ok(KeyOutcome::Ignored) => return Ok(PressOutcome::Ignored),
            Ok(KeyOutcome::Accepted) => {
                shared.haptics.vibrate(HapticEffect::Impact);
                return Ok(PressOutcome::Accepted);
            }
            Ok(KeyOutcome::Completed(code)) => code,
        };

        shared.haptics.vibrate(HapticEffect::Impact);
        match shared.handler.on_pin(&code, &self.handle) {
            Ok(()) => Ok(PressOutcome::Submitted),
            Err(rejected) => {
                debug!("PIN rejected by handler");
                self.handle.reset(rejected.message.as_deref());
                Err(PinError::ValidationFailed(
                    rejected.message.unwrap_or_default(),
                ))
            }
        }
    }

    /// Current state for rendering
    pub fn snapshot(&self) -> PinSnapshot {
        self.handle.snapshot()
    }
}

impl Drop for PinController {
    fn drop(&mut self) {
        if let Some(ticker) = self.handle.shared.lock().ticker.take() {
            ticker.abort();
        }
    }
}
