//! Two-step PIN creation (enter, then confirm)

use std::mem;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::mpsc;
use tracing::{error, info};
use zeroize::Zeroizing;

use super::controller::{PinHandle, PinHandler, PinRejected};
use super::gate::{spawn_hashing, GateEvent};
use super::store::PinStore;

enum SetupPhase {
    Enter,
    Confirm(Zeroizing<String>),
}

/// Completion handler for the create-PIN screen
pub struct PinSetup {
    store: Arc<Mutex<PinStore>>,
    phase: Mutex<SetupPhase>,
    events: mpsc::UnboundedSender<GateEvent>,
}

impl PinSetup {
    pub fn new(store: Arc<Mutex<PinStore>>, events: mpsc::UnboundedSender<GateEvent>) -> Self {
        Self {
            store,
            phase: Mutex::new(SetupPhase::Enter),
            events,
        }
    }

    /// Whether the first code was taken and the confirmation is pending
    pub fn is_confirming(&self) -> bool {
        matches!(
            *self.phase.lock().unwrap_or_else(PoisonError::into_inner),
            SetupPhase::Confirm(_)
        )
    }
}

impl PinHandler for PinSetup {
    fn on_pin(&self, code: &str, pin: &PinHandle) -> Result<(), PinRejected> {
        let previous = {
            let mut phase = self.phase.lock().unwrap_or_else(PoisonError::into_inner);
            mem::replace(&mut *phase, SetupPhase::Enter)
        };

        let first = match previous {
            SetupPhase::Enter => {
                *self.phase.lock().unwrap_or_else(PoisonError::into_inner) =
                    SetupPhase::Confirm(Zeroizing::new(code.to_string()));
                pin.reset(None);
                pin.clear_message();
                return Ok(());
            }
            SetupPhase::Confirm(first) => first,
        };

        if first.as_str() != code {
            return Err(PinRejected::new("PIN codes do not match"));
        }

        let store = self.store.clone();
        let events = self.events.clone();
        let pin = pin.clone();
        spawn_hashing(move || {
            let stored = store
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .set_pin(&first);

            match stored {
                Ok(()) => {
                    info!("PIN created");
                    let _ = events.send(GateEvent::PinCreated);
                }
                Err(e) => {
                    error!("Failed to store PIN: {}", e);
                    pin.reset(Some("Unable to save PIN"));
                }
            }
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::haptics::NoHaptics;
    use crate::pin::{KeypadInput, LockoutPolicy, PinController};
    use chrono::Utc;
    use tempfile::tempdir;

    fn type_code(controller: &PinController, code: &str) {
        for c in code.chars() {
            let _ = controller.press(KeypadInput::from_char(c).unwrap());
        }
    }

    fn setup() -> (
        tempfile::TempDir,
        Arc<Mutex<PinStore>>,
        Arc<PinSetup>,
        mpsc::UnboundedReceiver<GateEvent>,
    ) {
        let temp_dir = tempdir().unwrap();
        let store = PinStore::open(temp_dir.path().join("pin.json"), LockoutPolicy::default())
            .unwrap();
        let store = Arc::new(Mutex::new(store));
        let (tx, rx) = mpsc::unbounded_channel();
        let setup = Arc::new(PinSetup::new(store.clone(), tx));
        (temp_dir, store, setup, rx)
    }

    #[tokio::test]
    async fn test_create_pin() {
        let (_dir, store, setup, mut rx) = setup();
        let controller = PinController::new(setup.clone(), Arc::new(NoHaptics));

        type_code(&controller, "135790");
        assert!(setup.is_confirming());
        assert_eq!(controller.snapshot().filled, 0);

        type_code(&controller, "135790");
        assert_eq!(rx.recv().await, Some(GateEvent::PinCreated));
        assert!(!setup.is_confirming());

        let mut store = store.lock().unwrap();
        assert!(store.is_pin_set());
        assert_eq!(
            store.verify("135790", Utc::now()).unwrap(),
            crate::pin::PinCheck::Accepted
        );
    }

    #[tokio::test]
    async fn test_mismatch_starts_over() {
        let (_dir, store, setup, mut rx) = setup();
        let controller = PinController::new(setup.clone(), Arc::new(NoHaptics));

        type_code(&controller, "111111");
        type_code(&controller, "222222");

        let snapshot = controller.snapshot();
        assert_eq!(snapshot.error_message, "PIN codes do not match");
        assert_eq!(snapshot.filled, 0);
        assert!(!setup.is_confirming());
        assert!(!store.lock().unwrap().is_pin_set());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_retry_after_mismatch_clears_message() {
        let (_dir, _store, setup, mut rx) = setup();
        let controller = PinController::new(setup.clone(), Arc::new(NoHaptics));

        type_code(&controller, "111111");
        type_code(&controller, "222222");
        assert_eq!(controller.snapshot().error_message, "PIN codes do not match");

        type_code(&controller, "333333");
        assert!(setup.is_confirming());
        assert_eq!(controller.snapshot().error_message, "");

        type_code(&controller, "333333");
        assert_eq!(rx.recv().await, Some(GateEvent::PinCreated));
    }
}
