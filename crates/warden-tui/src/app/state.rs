//! Screen routing and selection state

use warden_core::{Device, DeviceId};

/// Application screens
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    /// Create a PIN (first run)
    PinSetup,
    /// Unlock with the PIN
    PinEntry,
    /// Ledger device list
    LedgerScan,
    /// A device is connected
    Connected,
}

/// Mutable UI state that is not owned by the core flows
#[derive(Debug, Clone)]
pub struct AppState {
    /// Current screen
    pub current_screen: Screen,
    /// Highlighted row in the device list
    pub device_index: usize,
    /// Device the app-missing prompt is shown for
    pub app_missing: Option<Device>,
    /// Connected device and its display name
    pub connected: Option<(DeviceId, String)>,
    /// One-line status shown when a screen could not start
    pub status: Option<String>,
}

impl AppState {
    pub fn new(current_screen: Screen) -> Self {
        Self {
            current_screen,
            device_index: 0,
            app_missing: None,
            connected: None,
            status: None,
        }
    }

    /// Move the device highlight, clamped to `count` rows
    pub fn move_selection(&mut self, down: bool, count: usize) {
        if count == 0 {
            self.device_index = 0;
        } else if down {
            self.device_index = (self.device_index + 1).min(count - 1);
        } else {
            self.device_index = self.device_index.saturating_sub(1);
        }
    }
}
