//! USB HID Ledger backend
//!
//! Supports Ledger Nano S, S Plus, X, Stax, and Flex devices over USB.
//! HID calls block, so every one of them runs on the blocking pool.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use ledger_transport_hid::hidapi::HidApi;
use ledger_transport_hid::TransportNativeHID;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use warden_core::device::{DeviceStatusError, SW_OK};
use warden_core::{Device, DeviceId, DeviceScanner, LedgerProvider, Result, ScanEvent};

/// Dashboard CLA
const DASHBOARD_CLA: u8 = 0xE0;

/// Open application by name
const INS_OPEN_APP: u8 = 0xD8;

fn hid_api() -> std::result::Result<HidApi, DeviceStatusError> {
    HidApi::new().map_err(|e| DeviceStatusError::other(format!("Failed to initialize HID: {}", e)))
}

/// Lists USB Ledgers once per start
///
/// An enumeration already running on the blocking pool cannot be aborted, so
/// each run is numbered and only the latest one may publish.
pub struct HidScanner {
    events: broadcast::Sender<ScanEvent>,
    generation: Arc<AtomicU64>,
}

impl HidScanner {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            events,
            generation: Arc::new(AtomicU64::new(0)),
        }
    }
}

/// Publisher for one enumeration run
struct ScanRun {
    events: broadcast::Sender<ScanEvent>,
    generation: Arc<AtomicU64>,
    id: u64,
}

impl ScanRun {
    fn publish(&self, event: ScanEvent) -> bool {
        if self.generation.load(Ordering::SeqCst) != self.id {
            return false;
        }
        let _ = self.events.send(event);
        true
    }
}

impl DeviceScanner for HidScanner {
    fn subscribe(&self) -> broadcast::Receiver<ScanEvent> {
        self.events.subscribe()
    }

    fn start(&self) -> Result<()> {
        let run = ScanRun {
            events: self.events.clone(),
            generation: self.generation.clone(),
            id: self.generation.fetch_add(1, Ordering::SeqCst) + 1,
        };

        tokio::task::spawn_blocking(move || {
            info!("Searching for Ledger devices...");
            let api = match hid_api() {
                Ok(api) => api,
                Err(e) => {
                    run.publish(ScanEvent::Error(e.message));
                    return;
                }
            };

            for info in TransportNativeHID::list_ledgers(&api) {
                let id = info.path().to_string_lossy().into_owned();
                let name = info.product_string().unwrap_or("Nano").to_string();
                debug!("Found Ledger {} at {}", name, id);
                if !run.publish(ScanEvent::Device(Device::new(id, name))) {
                    debug!("Ledger enumeration superseded");
                    return;
                }
            }
            run.publish(ScanEvent::Complete);
        });
        Ok(())
    }

    fn stop(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }
}

/// Opens HID transports and drives the dashboard
pub struct HidProvider;

impl HidProvider {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl LedgerProvider for HidProvider {
    type Transport = Arc<TransportNativeHID>;

    async fn await_for_transport(&self, device: &DeviceId) -> Option<Self::Transport> {
        let path = device.as_str().to_string();
        let opened = tokio::task::spawn_blocking(move || {
            let api = hid_api().ok()?;
            let info = TransportNativeHID::list_ledgers(&api)
                .find(|info| info.path().to_string_lossy() == path)?
                .clone();
            match TransportNativeHID::open_device(&api, &info) {
                Ok(transport) => Some(Arc::new(transport)),
                Err(e) => {
                    warn!("Failed to open Ledger at {}: {}", path, e);
                    None
                }
            }
        })
        .await;

        opened.ok().flatten()
    }

    async fn suggest_app(
        &self,
        transport: &Self::Transport,
        app_name: &str,
    ) -> std::result::Result<(), DeviceStatusError> {
        let transport = transport.clone();
        let command = ledger_apdu::APDUCommand {
            cla: DASHBOARD_CLA,
            ins: INS_OPEN_APP,
            p1: 0x00,
            p2: 0x00,
            data: app_name.as_bytes().to_vec(),
        };

        let retcode = tokio::task::spawn_blocking(move || {
            transport
                .exchange(&command)
                .map(|response| response.retcode())
                .map_err(|e| DeviceStatusError::other(format!("Ledger communication error: {}", e)))
        })
        .await
        .map_err(|e| DeviceStatusError::other(format!("HID task failed: {}", e)))??;

        if retcode != SW_OK {
            return Err(DeviceStatusError::status(retcode));
        }

        debug!("Ledger opened {}", app_name);
        Ok(())
    }
}
