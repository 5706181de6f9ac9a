//! PIN entry, lockout and verification

mod controller;
mod gate;
mod lockout;
mod session;
mod setup;
mod store;

pub use controller::{PinController, PinHandle, PinHandler, PinRejected, PressOutcome};
pub use gate::{GateEvent, PinGate};
pub use lockout::{format_countdown, lockout_message, LockoutPolicy, LockoutPreset};
pub use session::{KeyOutcome, LockTick, PinSession, PinSnapshot};
pub use setup::PinSetup;
pub use store::{validate_pin_format, PinCheck, PinStore};

use std::time::Duration;

/// Number of digits in a PIN
pub const PIN_LENGTH: usize = 6;

/// Interval between lockout countdown refreshes
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(1);

/// A key on the numeric keypad
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeypadInput {
    /// Digit 0-9
    Digit(u8),
    /// Remove the last digit
    Delete,
}

impl KeypadInput {
    /// Map a typed character onto the keypad
    pub fn from_char(c: char) -> Option<Self> {
        c.to_digit(10).map(|d| KeypadInput::Digit(d as u8))
    }
}
