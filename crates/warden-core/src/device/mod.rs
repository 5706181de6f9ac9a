//! Hardware wallet discovery and connection
//!
//! The flow is split the same way the screens are:
//! - [`DeviceScanSession`] owns one scan and folds scanner events into a
//!   [`ScanState`] that the UI watches,
//! - [`ConnectFlow`] runs a connection attempt for a selected device and maps
//!   device status codes onto [`ConnectError`](crate::ConnectError),
//! - [`await_for_bluetooth`] gates the scan on the radio being usable.
//!
//! Everything platform specific (HID, BLE, screens) is reached through the
//! traits in this module.

mod bluetooth;
mod connect;
mod scan;
mod status;

pub use bluetooth::{await_for_bluetooth, BluetoothAdapter, BluetoothState};
pub use connect::ConnectFlow;
pub use scan::{DeviceScanSession, ScanState};
pub use status::{DeviceStatusError, APP_NOT_FOUND, SW_OK, USER_REFUSED};

use std::fmt;

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::error::Result;

/// Unique identifier of a discovered device
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceId(String);

impl DeviceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A discovered hardware wallet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Device {
    /// Transport-level identifier
    pub id: DeviceId,
    /// Name reported by the device
    pub name: String,
}

impl Device {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: DeviceId::new(id),
            name: name.into(),
        }
    }

    /// Name shown once the device is paired
    pub fn display_name(&self) -> String {
        format!("Ledger {}", self.name)
    }
}

/// Event emitted by a device scanner
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanEvent {
    /// A device was seen (may repeat for the same device)
    Device(Device),
    /// The scan finished on its own
    Complete,
    /// The scan failed
    Error(String),
}

/// Source of device discovery events
pub trait DeviceScanner: Send + Sync {
    /// Subscribe to scan events
    fn subscribe(&self) -> broadcast::Receiver<ScanEvent>;

    /// Start scanning
    fn start(&self) -> Result<()>;

    /// Stop scanning
    fn stop(&self);
}

/// Ledger connection backend
#[async_trait]
pub trait LedgerProvider: Send + Sync {
    /// Open channel to a device
    type Transport: Send + Sync;

    /// Acquire a transport for the device, or `None` if it cannot be reached
    async fn await_for_transport(&self, device: &DeviceId) -> Option<Self::Transport>;

    /// Ask the device to open the named app
    async fn suggest_app(
        &self,
        transport: &Self::Transport,
        app_name: &str,
    ) -> std::result::Result<(), DeviceStatusError>;
}

/// Hand-off once a device is connected
pub trait Navigator: Send + Sync {
    fn open_accounts(&self, device: &DeviceId, device_name: &str);
}

/// "Install or open the app on your device" prompt
pub trait RemediationPrompt: Send + Sync {
    /// Show the prompt for `device`; its retry action calls [`ConnectFlow::retry`]
    fn show_app_missing(&self, device: &Device);

    /// Dismiss the prompt if it is shown
    fn hide_app_missing(&self);
}
