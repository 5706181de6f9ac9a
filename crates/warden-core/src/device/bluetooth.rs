//! Bluetooth readiness gate

use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, warn};

use crate::error::BluetoothError;
use crate::haptics::{HapticEffect, Haptics};

/// Adapter power and permission state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BluetoothState {
    #[default]
    Unknown,
    Resetting,
    Unsupported,
    Unauthorized,
    PoweredOff,
    PoweredOn,
}

/// Source of adapter state updates
pub trait BluetoothAdapter: Send + Sync {
    fn state(&self) -> watch::Receiver<BluetoothState>;
}

/// Wait until the adapter is powered on
///
/// Fails immediately when access is denied or the radio is unsupported, and
/// with [`BluetoothError::Timeout`] when it stays off for `timeout`.
pub async fn await_for_bluetooth(
    adapter: &dyn BluetoothAdapter,
    timeout: Duration,
    haptics: &dyn Haptics,
) -> Result<(), BluetoothError> {
    let mut states = adapter.state();

    let wait = async {
        loop {
            let state = *states.borrow_and_update();
            match state {
                BluetoothState::PoweredOn => return Ok(()),
                BluetoothState::Unauthorized => {
                    warn!("Bluetooth access denied");
                    haptics.vibrate(HapticEffect::Error);
                    return Err(BluetoothError::Unauthorized);
                }
                BluetoothState::Unsupported => return Err(BluetoothError::Unsupported),
                other => debug!("Waiting for Bluetooth, state is {:?}", other),
            }

            if states.changed().await.is_err() {
                return Err(BluetoothError::AdapterClosed);
            }
        }
    };

    match tokio::time::timeout(timeout, wait).await {
        Ok(result) => result,
        Err(_) => {
            warn!("Bluetooth not ready after {:?}", timeout);
            Err(BluetoothError::Timeout)
        }
    }
}
