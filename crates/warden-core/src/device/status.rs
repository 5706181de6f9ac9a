//! Device status words and their classification

use thiserror::Error;

use crate::error::ConnectError;

/// Command completed
pub const SW_OK: u16 = 0x9000;

/// The requested app is not installed on the device
pub const APP_NOT_FOUND: u16 = 0x6807;

/// The user declined on the device
pub const USER_REFUSED: u16 = 0x5501;

/// Failure reported while talking to a device
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct DeviceStatusError {
    /// Status word returned by the device, if it answered at all
    pub status_code: Option<u16>,
    /// Description of the failure
    pub message: String,
}

impl DeviceStatusError {
    /// Error carrying a device status word
    pub fn status(status_code: u16) -> Self {
        Self {
            status_code: Some(status_code),
            message: format!("Device returned status 0x{:04X}", status_code),
        }
    }

    /// Error without a status word (I/O, framing, disconnect)
    pub fn other(message: impl Into<String>) -> Self {
        Self {
            status_code: None,
            message: message.into(),
        }
    }
}

impl From<DeviceStatusError> for ConnectError {
    fn from(e: DeviceStatusError) -> Self {
        match e.status_code {
            Some(APP_NOT_FOUND) => ConnectError::TargetAppNotFound,
            Some(USER_REFUSED) => ConnectError::UserRefused,
            status_code => ConnectError::UnclassifiedDeviceError {
                status_code,
                message: e.message,
            },
        }
    }
}
