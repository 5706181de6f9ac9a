//! Device scan session and per-device connection state

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{Device, DeviceId, DeviceScanner, ScanEvent};
use crate::error::{ConnectError, Result};

/// Everything the device list screen renders
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanState {
    /// Discovered devices in discovery order, unique by id
    pub devices: Vec<Device>,
    /// Devices with a connection attempt in flight
    pub loading: HashSet<DeviceId>,
    /// Last connection failure per device
    pub errors: HashMap<DeviceId, ConnectError>,
    /// Whether the scanner is running
    pub refreshing: bool,
    /// Last scan failure, cleared when a new scan starts
    pub scan_error: Option<String>,
}

impl ScanState {
    /// Fold a scanner event into the state
    ///
    /// Returns `true` if anything changed.
    pub fn apply(&mut self, event: ScanEvent) -> bool {
        match event {
            ScanEvent::Device(device) => {
                if self.devices.iter().any(|d| d.id == device.id) {
                    return false;
                }
                debug!("Discovered device {} ({})", device.id, device.name);
                self.devices.push(device);
                true
            }
            ScanEvent::Complete => {
                let changed = self.refreshing;
                self.refreshing = false;
                changed
            }
            ScanEvent::Error(message) => {
                warn!("Device scan failed: {}", message);
                self.refreshing = false;
                self.scan_error = Some(message);
                true
            }
        }
    }

    /// Look up a discovered device
    pub fn device(&self, id: &DeviceId) -> Option<&Device> {
        self.devices.iter().find(|d| &d.id == id)
    }

    pub fn is_loading(&self, id: &DeviceId) -> bool {
        self.loading.contains(id)
    }

    pub fn error(&self, id: &DeviceId) -> Option<&ConnectError> {
        self.errors.get(id)
    }

    /// Mark an attempt as started, clearing the previous outcome
    ///
    /// Returns `false` if an attempt for this device is already loading.
    pub fn begin_attempt(&mut self, id: &DeviceId) -> bool {
        if !self.loading.insert(id.clone()) {
            return false;
        }
        self.errors.remove(id);
        true
    }

    /// Record a failed attempt
    pub fn fail_attempt(&mut self, id: &DeviceId, error: ConnectError) {
        self.loading.remove(id);
        self.errors.insert(id.clone(), error);
    }

    /// Record a successful attempt
    pub fn finish_attempt(&mut self, id: &DeviceId) {
        self.loading.remove(id);
    }

    fn restart(&mut self) {
        self.refreshing = true;
        self.scan_error = None;
    }
}

/// One open device list: scanner subscription, listener task and state
pub struct DeviceScanSession {
    scanner: Arc<dyn DeviceScanner>,
    state: Arc<watch::Sender<ScanState>>,
    listener: Option<JoinHandle<()>>,
}

impl DeviceScanSession {
    /// Subscribe to the scanner and start scanning
    ///
    /// Must be called from within a tokio runtime.
    pub fn open(scanner: Arc<dyn DeviceScanner>) -> Result<Self> {
        let (state, _) = watch::channel(ScanState::default());
        let state = Arc::new(state);

        // Subscribe before starting so no early event is missed
        let events = scanner.subscribe();
        state.send_modify(ScanState::restart);
        let listener = tokio::spawn(listen(events, state.clone()));

        if let Err(e) = scanner.start() {
            listener.abort();
            state.send_modify(|s| s.refreshing = false);
            return Err(e);
        }

        info!("Device scan started");
        Ok(Self {
            scanner,
            state,
            listener: Some(listener),
        })
    }

    /// Restart the scan, keeping discovered devices
    ///
    /// The listener is replaced with one on a fresh subscription, so events
    /// still queued from the previous run never reach the new state.
    pub fn rescan(&mut self) -> Result<()> {
        let Some(listener) = self.listener.take() else {
            return Ok(());
        };
        listener.abort();
        self.scanner.stop();

        let events = self.scanner.subscribe();
        self.state.send_modify(ScanState::restart);
        self.listener = Some(tokio::spawn(listen(events, self.state.clone())));

        if let Err(e) = self.scanner.start() {
            self.state.send_modify(|s| s.refreshing = false);
            return Err(e);
        }
        debug!("Device scan restarted");
        Ok(())
    }

    /// Stop scanning and release the subscription
    pub fn close(&mut self) {
        if let Some(listener) = self.listener.take() {
            listener.abort();
            self.scanner.stop();
            self.state.send_if_modified(|s| {
                let changed = s.refreshing;
                s.refreshing = false;
                changed
            });
            info!("Device scan stopped");
        }
    }

    /// Watch state changes
    pub fn subscribe(&self) -> watch::Receiver<ScanState> {
        self.state.subscribe()
    }

    /// Current state
    pub fn snapshot(&self) -> ScanState {
        self.state.borrow().clone()
    }

    /// Shared state, for the connection flow
    pub fn state_handle(&self) -> Arc<watch::Sender<ScanState>> {
        self.state.clone()
    }
}

impl Drop for DeviceScanSession {
    fn drop(&mut self) {
        self.close();
    }
}

async fn listen(mut events: broadcast::Receiver<ScanEvent>, state: Arc<watch::Sender<ScanState>>) {
    loop {
        match events.recv().await {
            Ok(event) => {
                state.send_if_modified(|s| s.apply(event));
            }
            Err(RecvError::Lagged(skipped)) => {
                warn!("Scan listener lagged, {} events skipped", skipped);
            }
            Err(RecvError::Closed) => {
                debug!("Scanner event channel closed");
                state.send_modify(|s| s.refreshing = false);
                break;
            }
        }
    }
}
