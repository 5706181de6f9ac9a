//! Lock screen gate: verifies completed codes against the PIN store

use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, error, info};
use zeroize::Zeroizing;

use super::controller::{PinHandle, PinHandler, PinRejected};
use super::store::{PinCheck, PinStore};

/// Notifications emitted by the PIN handlers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateEvent {
    /// The entered PIN was correct
    Unlocked,
    /// The entered PIN was wrong; the screen already shows why
    Rejected { attempts_remaining: u32 },
    /// A new PIN was stored
    PinCreated,
    /// Too many failures; input is locked until the deadline
    LockedOut { until: DateTime<Utc> },
}

/// Convert a wall-clock deadline into a monotonic one
pub(crate) fn deadline_instant(until: DateTime<Utc>, now: DateTime<Utc>) -> Instant {
    let remaining = (until - now).to_std().unwrap_or_default();
    Instant::now() + remaining
}

/// Run Argon2 work on the blocking pool, or inline without a runtime
pub(crate) fn spawn_hashing<F>(work: F)
where
    F: FnOnce() + Send + 'static,
{
    match tokio::runtime::Handle::try_current() {
        Ok(runtime) => {
            runtime.spawn_blocking(work);
        }
        Err(_) => work(),
    }
}

/// Message shown after a wrong PIN
pub fn wrong_pin_message(attempts_remaining: u32) -> String {
    match attempts_remaining {
        1 => "Wrong PIN, 1 attempt left".to_string(),
        n => format!("Wrong PIN, {} attempts left", n),
    }
}

/// Completion handler that unlocks the wallet
///
/// Verification runs off the async runtime; its outcome is applied through
/// the session handle and announced on the event channel.
pub struct PinGate {
    store: Arc<Mutex<PinStore>>,
    events: mpsc::UnboundedSender<GateEvent>,
}

impl PinGate {
    /// Create a gate over a shared store
    pub fn new(store: Arc<Mutex<PinStore>>, events: mpsc::UnboundedSender<GateEvent>) -> Self {
        Self { store, events }
    }

    /// Re-apply a lockout persisted by a previous run
    pub fn restore_lockout(&self, pin: &PinHandle) {
        let now = Utc::now();
        let until = self
            .store
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .lockout_until(now);

        if let Some(until) = until {
            info!("Restoring PIN lockout until {}", until);
            pin.locked(Some(deadline_instant(until, now)));
        }
    }
}

impl PinHandler for PinGate {
    fn on_pin(&self, code: &str, pin: &PinHandle) -> Result<(), PinRejected> {
        let code = Zeroizing::new(code.to_string());
        let store = self.store.clone();
        let events = self.events.clone();
        let pin = pin.clone();

        spawn_hashing(move || {
            let now = Utc::now();
            let check = store
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .verify(&code, now);
            apply_check(check, now, &pin, &events);
        });
        Ok(())
    }
}

fn apply_check(
    check: crate::Result<PinCheck>,
    now: DateTime<Utc>,
    pin: &PinHandle,
    events: &mpsc::UnboundedSender<GateEvent>,
) {
    match check {
        Ok(PinCheck::Accepted) => {
            info!("PIN accepted");
            let _ = events.send(GateEvent::Unlocked);
        }
        Ok(PinCheck::Rejected { attempts_remaining }) => {
            debug!("PIN rejected, {} attempts left", attempts_remaining);
            pin.reset(Some(&wrong_pin_message(attempts_remaining)));
            let _ = events.send(GateEvent::Rejected { attempts_remaining });
        }
        Ok(PinCheck::LockedOut { until }) => {
            pin.locked(Some(deadline_instant(until, now)));
            let _ = events.send(GateEvent::LockedOut { until });
        }
        Err(e) => {
            error!("PIN verification failed: {}", e);
            pin.reset(Some("Unable to verify PIN"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::haptics::NoHaptics;
    use crate::pin::{KeypadInput, LockoutPolicy, PinController};
    use tempfile::tempdir;

    fn type_code(controller: &PinController, code: &str) {
        for c in code.chars() {
            let _ = controller.press(KeypadInput::from_char(c).unwrap());
        }
    }

    fn gate_with(
        policy: LockoutPolicy,
    ) -> (
        tempfile::TempDir,
        Arc<Mutex<PinStore>>,
        Arc<PinGate>,
        mpsc::UnboundedReceiver<GateEvent>,
    ) {
        let temp_dir = tempdir().unwrap();
        let mut store = PinStore::open(temp_dir.path().join("pin.json"), policy).unwrap();
        store.set_pin("246810").unwrap();
        let store = Arc::new(Mutex::new(store));

        let (tx, rx) = mpsc::unbounded_channel();
        let gate = Arc::new(PinGate::new(store.clone(), tx));
        (temp_dir, store, gate, rx)
    }

    #[test]
    fn test_wrong_pin_message() {
        assert_eq!(wrong_pin_message(3), "Wrong PIN, 3 attempts left");
        assert_eq!(wrong_pin_message(1), "Wrong PIN, 1 attempt left");
        assert_eq!(wrong_pin_message(0), "Wrong PIN, 0 attempts left");
    }

    #[tokio::test]
    async fn test_gate_unlocks_and_rejects() {
        let (_dir, _store, gate, mut rx) = gate_with(LockoutPolicy::default());
        let controller = PinController::new(gate, Arc::new(NoHaptics));

        type_code(&controller, "111111");
        assert_eq!(
            rx.recv().await,
            Some(GateEvent::Rejected {
                attempts_remaining: 3
            })
        );
        assert_eq!(
            controller.snapshot().error_message,
            "Wrong PIN, 3 attempts left"
        );
        assert_eq!(controller.snapshot().filled, 0);

        type_code(&controller, "246810");
        assert_eq!(rx.recv().await, Some(GateEvent::Unlocked));
    }

    #[tokio::test]
    async fn test_last_attempt_is_singular() {
        let policy = LockoutPolicy::custom(vec![(2, std::time::Duration::from_secs(60))]);
        let (_dir, _store, gate, mut rx) = gate_with(policy);
        let controller = PinController::new(gate, Arc::new(NoHaptics));

        type_code(&controller, "000000");
        assert_eq!(
            rx.recv().await,
            Some(GateEvent::Rejected {
                attempts_remaining: 1
            })
        );
        assert_eq!(
            controller.snapshot().error_message,
            "Wrong PIN, 1 attempt left"
        );
    }

    #[tokio::test]
    async fn test_verification_does_not_block_keypad() {
        let (_dir, store, gate, mut rx) = gate_with(LockoutPolicy::default());
        let controller = PinController::new(gate, Arc::new(NoHaptics));

        // With the store held, verification cannot finish; the press must
        // still return and leave the completed code awaiting its outcome
        let held = store.lock().unwrap();
        type_code(&controller, "111111");
        let snapshot = controller.snapshot();
        assert!(snapshot.awaiting_reset);
        assert_eq!(snapshot.error_message, "");
        drop(held);

        assert!(matches!(rx.recv().await, Some(GateEvent::Rejected { .. })));
        assert!(!controller.snapshot().awaiting_reset);
    }

    #[tokio::test]
    async fn test_gate_locks_controller() {
        let policy = LockoutPolicy::custom(vec![(2, std::time::Duration::from_secs(60))]);
        let (_dir, _store, gate, mut rx) = gate_with(policy);
        let controller = PinController::new(gate.clone(), Arc::new(NoHaptics));

        type_code(&controller, "000000");
        assert!(matches!(rx.recv().await, Some(GateEvent::Rejected { .. })));
        type_code(&controller, "000000");

        assert!(matches!(rx.recv().await, Some(GateEvent::LockedOut { .. })));
        assert!(controller.handle().is_locked());
        assert!(controller
            .snapshot()
            .error_message
            .starts_with("Too many attempts, please wait for"));

        // A fresh screen picks the persisted lock back up
        let fresh = PinController::new(gate.clone(), Arc::new(NoHaptics));
        gate.restore_lockout(&fresh.handle());
        assert!(fresh.handle().is_locked());
    }
}
