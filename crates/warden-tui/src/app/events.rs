//! Event plumbing between the core flows and the TUI loop

use std::io::{self, Write};

use tokio::sync::mpsc;
use warden_core::{Device, DeviceId, HapticEffect, Haptics, Navigator, RemediationPrompt};

/// Application events raised from outside the key handler
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// The Ledger app is missing on this device; offer a retry
    ShowAppMissing(Device),
    /// Dismiss the app-missing prompt
    HideAppMissing,
    /// A device is connected and ready
    OpenAccounts { device: DeviceId, name: String },
}

/// Forwards flow callbacks into the event loop
#[derive(Clone)]
pub struct ScreenBridge {
    sender: mpsc::UnboundedSender<Event>,
}

impl ScreenBridge {
    pub fn new(sender: mpsc::UnboundedSender<Event>) -> Self {
        Self { sender }
    }

    fn send(&self, event: Event) {
        if self.sender.send(event).is_err() {
            tracing::debug!("Event loop gone, dropping screen event");
        }
    }
}

impl RemediationPrompt for ScreenBridge {
    fn show_app_missing(&self, device: &Device) {
        self.send(Event::ShowAppMissing(device.clone()));
    }

    fn hide_app_missing(&self) {
        self.send(Event::HideAppMissing);
    }
}

impl Navigator for ScreenBridge {
    fn open_accounts(&self, device: &DeviceId, device_name: &str) {
        self.send(Event::OpenAccounts {
            device: device.clone(),
            name: device_name.to_string(),
        });
    }
}

/// Terminals cannot vibrate; errors ring the bell instead
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalBell;

impl Haptics for TerminalBell {
    fn vibrate(&self, effect: HapticEffect) {
        if effect == HapticEffect::Error {
            let mut stdout = io::stdout();
            let _ = stdout.write_all(b"\x07");
            let _ = stdout.flush();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bridge_forwards_callbacks() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let bridge = ScreenBridge::new(tx);
        let device = Device::new("hid-1", "Nano S Plus");

        bridge.show_app_missing(&device);
        bridge.hide_app_missing();
        bridge.open_accounts(&device.id, &device.display_name());

        assert_eq!(rx.try_recv().unwrap(), Event::ShowAppMissing(device.clone()));
        assert_eq!(rx.try_recv().unwrap(), Event::HideAppMissing);
        assert_eq!(
            rx.try_recv().unwrap(),
            Event::OpenAccounts {
                device: device.id,
                name: "Ledger Nano S Plus".to_string(),
            }
        );
    }

    #[test]
    fn test_bridge_survives_closed_loop() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        ScreenBridge::new(tx).hide_app_missing();
    }
}
