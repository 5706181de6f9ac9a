//! Error types for the Warden core

use thiserror::Error;

/// Result type alias for Warden operations
pub type Result<T> = std::result::Result<T, WardenError>;

/// Errors that can occur in Warden operations
#[derive(Debug, Error)]
pub enum WardenError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// PIN hashing or hash parsing failed
    #[error("Hashing error: {0}")]
    Hashing(String),

    /// PIN entry or verification error
    #[error("PIN error: {0}")]
    Pin(#[from] PinError),

    /// Hardware wallet connection error
    #[error("Connection error: {0}")]
    Connect(#[from] ConnectError),

    /// Bluetooth readiness error
    #[error("Bluetooth error: {0}")]
    Bluetooth(#[from] BluetoothError),

    /// Device scan could not be started
    #[error("Scan error: {0}")]
    Scan(String),
}

impl From<serde_json::Error> for WardenError {
    fn from(e: serde_json::Error) -> Self {
        WardenError::Serialization(e.to_string())
    }
}

/// PIN entry and verification errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PinError {
    /// The caller rejected the entered code
    #[error("{0}")]
    ValidationFailed(String),

    /// Input arrived while a lockout is running
    #[error("PIN entry locked for another {remaining_secs} seconds")]
    LockoutActive { remaining_secs: u64 },

    /// The code is not made of exactly the required number of digits
    #[error("PIN must be exactly {0} digits")]
    InvalidFormat(usize),

    /// Verification was requested before any PIN was stored
    #[error("No PIN has been set")]
    NotSet,
}

/// Failure classes of a hardware wallet connection attempt
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConnectError {
    /// The low-level transport to the device could not be established
    #[error("Could not connect to the device")]
    TransportUnavailable,

    /// The device does not have the wallet app installed (or it cannot be opened)
    #[error("The wallet app is not installed on the device")]
    TargetAppNotFound,

    /// The user declined the request on the device
    #[error("Request was refused on the device")]
    UserRefused,

    /// Any other device failure
    #[error("Device error: {message}")]
    UnclassifiedDeviceError {
        status_code: Option<u16>,
        message: String,
    },

    /// Another attempt for the same device is still loading
    #[error("A connection attempt is already running for this device")]
    AttemptInProgress,
}

/// Bluetooth readiness errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BluetoothError {
    /// The app is not allowed to use Bluetooth
    #[error("Bluetooth access is not authorized")]
    Unauthorized,

    /// The host has no usable Bluetooth adapter
    #[error("Bluetooth is not supported on this device")]
    Unsupported,

    /// Bluetooth did not power on in time
    #[error("Timed out waiting for Bluetooth")]
    Timeout,

    /// The adapter stopped reporting its state
    #[error("Bluetooth adapter went away")]
    AdapterClosed,
}
