//! Ledger backends for the device list
//!
//! With the `ledger` feature the scan lists USB HID Ledgers and talks to them
//! through `ledger-transport-hid`. Without it the scan fails immediately so the
//! screens still work and explain what is missing.

#[cfg(feature = "ledger")]
pub mod ledger;

#[cfg(feature = "ledger")]
pub use ledger::{HidProvider as Provider, HidScanner as Scanner};

#[cfg(not(feature = "ledger"))]
pub use unavailable::{UnavailableProvider as Provider, UnavailableScanner as Scanner};

#[cfg(not(feature = "ledger"))]
mod unavailable {
    use async_trait::async_trait;
    use tokio::sync::broadcast;
    use tracing::warn;
    use warden_core::device::DeviceStatusError;
    use warden_core::{DeviceId, DeviceScanner, LedgerProvider, Result, ScanEvent};

    const UNAVAILABLE: &str = "Ledger support not compiled in (build with --features ledger)";

    /// Scanner that reports the missing backend
    pub struct UnavailableScanner {
        events: broadcast::Sender<ScanEvent>,
    }

    impl UnavailableScanner {
        pub fn new() -> Self {
            let (events, _) = broadcast::channel(4);
            Self { events }
        }
    }

    impl DeviceScanner for UnavailableScanner {
        fn subscribe(&self) -> broadcast::Receiver<ScanEvent> {
            self.events.subscribe()
        }

        fn start(&self) -> Result<()> {
            warn!("{}", UNAVAILABLE);
            let _ = self.events.send(ScanEvent::Error(UNAVAILABLE.to_string()));
            Ok(())
        }

        fn stop(&self) {}
    }

    /// Provider that never finds a transport
    pub struct UnavailableProvider;

    impl UnavailableProvider {
        pub fn new() -> Self {
            Self
        }
    }

    #[async_trait]
    impl LedgerProvider for UnavailableProvider {
        type Transport = ();

        async fn await_for_transport(&self, _device: &DeviceId) -> Option<()> {
            None
        }

        async fn suggest_app(
            &self,
            _transport: &(),
            _app_name: &str,
        ) -> std::result::Result<(), DeviceStatusError> {
            Err(DeviceStatusError::other(UNAVAILABLE))
        }
    }

}
