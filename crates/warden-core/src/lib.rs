//! Warden core - PIN lockout and hardware wallet pairing
//!
//! This crate holds the two state machines behind the wallet's lock screen and
//! Ledger onboarding:
//! - PIN entry with a timed lockout after repeated failures
//! - Ledger discovery, connection handshake and the "open the app" retry loop
//!
//! Rendering is left to the caller. Everything the flows need from the outside
//! world (haptics, navigation, device transports) comes in through traits.

pub mod device;
pub mod error;
pub mod haptics;
pub mod pin;

pub use device::{
    await_for_bluetooth, BluetoothAdapter, BluetoothState, ConnectFlow, Device, DeviceId,
    DeviceScanSession, DeviceScanner, LedgerProvider, Navigator, RemediationPrompt, ScanEvent,
    ScanState,
};
pub use error::{BluetoothError, ConnectError, PinError, Result, WardenError};
pub use haptics::{HapticEffect, Haptics, NoHaptics};
pub use pin::{
    GateEvent, KeypadInput, LockoutPolicy, PinController, PinGate, PinHandle, PinHandler,
    PinRejected, PinSession, PinSetup, PinSnapshot, PinStore, PIN_LENGTH,
};
