//! PIN storage with secure hashing and persisted attempt counters

use std::fs;
use std::path::{Path, PathBuf};

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use super::{LockoutPolicy, PIN_LENGTH};
use crate::error::{PinError, Result, WardenError};

/// PIN storage format
#[derive(Debug, Default, Serialize, Deserialize)]
struct PinRecord {
    /// Argon2 hash of the PIN
    hash: Option<String>,
    /// Number of consecutive failed attempts
    failed_attempts: u32,
    /// End of the current lockout (Unix epoch seconds)
    locked_until: Option<i64>,
}

/// Outcome of a PIN verification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PinCheck {
    /// The PIN matched
    Accepted,
    /// The PIN did not match
    Rejected { attempts_remaining: u32 },
    /// Too many failures; verification refused until the deadline
    LockedOut { until: DateTime<Utc> },
}

/// Check that a PIN is exactly [`PIN_LENGTH`] ASCII digits
pub fn validate_pin_format(pin: &str) -> std::result::Result<(), PinError> {
    if pin.len() != PIN_LENGTH || !pin.chars().all(|c| c.is_ascii_digit()) {
        return Err(PinError::InvalidFormat(PIN_LENGTH));
    }
    Ok(())
}

/// PIN store handles PIN hashing, verification and lockout bookkeeping
pub struct PinStore {
    /// Path to the PIN record file
    path: PathBuf,
    /// Current record
    record: PinRecord,
    /// Lockout policy
    policy: LockoutPolicy,
}

impl PinStore {
    /// Load an existing record or start an empty one
    pub fn open(path: impl Into<PathBuf>, policy: LockoutPolicy) -> Result<Self> {
        let path = path.into();
        let record = if path.exists() {
            let contents = fs::read_to_string(&path)?;
            serde_json::from_str(&contents)?
        } else {
            debug!("No PIN record at {:?}", path);
            PinRecord::default()
        };

        Ok(Self {
            path,
            record,
            policy,
        })
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check if a PIN has been set
    pub fn is_pin_set(&self) -> bool {
        self.record.hash.is_some()
    }

    /// Set a new PIN
    pub fn set_pin(&mut self, pin: &str) -> Result<()> {
        validate_pin_format(pin)?;

        // Hash the PIN using Argon2id
        let salt = SaltString::generate(&mut OsRng);
        let pin_bytes = Zeroizing::new(pin.as_bytes().to_vec());
        let hash = Argon2::default()
            .hash_password(&pin_bytes, &salt)
            .map_err(|e| WardenError::Hashing(format!("Failed to hash PIN: {}", e)))?
            .to_string();

        self.record = PinRecord {
            hash: Some(hash),
            failed_attempts: 0,
            locked_until: None,
        };
        self.save()?;

        info!("PIN updated");
        Ok(())
    }

    /// Verify a PIN at `now`
    pub fn verify(&mut self, pin: &str, now: DateTime<Utc>) -> Result<PinCheck> {
        if let Some(until) = self.lockout_until(now) {
            return Ok(PinCheck::LockedOut { until });
        }

        let hash = self.record.hash.as_deref().ok_or(PinError::NotSet)?;
        let parsed_hash = PasswordHash::new(hash)
            .map_err(|e| WardenError::Hashing(format!("Invalid stored hash: {}", e)))?;

        // Verify with constant-time comparison
        let pin_bytes = Zeroizing::new(pin.as_bytes().to_vec());
        let matched = Argon2::default()
            .verify_password(&pin_bytes, &parsed_hash)
            .is_ok();

        if matched {
            self.record.failed_attempts = 0;
            self.record.locked_until = None;
            self.save()?;
            return Ok(PinCheck::Accepted);
        }

        self.record.failed_attempts = self.record.failed_attempts.saturating_add(1);
        let failed = self.record.failed_attempts;

        let check = match self.policy.lockout_duration(failed) {
            Some(duration) => {
                // Whole seconds, matching what is persisted
                let until_secs = now.timestamp().saturating_add(duration.as_secs() as i64);
                let until = Utc.timestamp_opt(until_secs, 0).single().unwrap_or(now);
                self.record.locked_until = Some(until_secs);
                warn!(
                    "PIN locked after {} failed attempts until {}",
                    failed, until
                );
                PinCheck::LockedOut { until }
            }
            None => PinCheck::Rejected {
                attempts_remaining: self.attempts_remaining(),
            },
        };
        self.save()?;

        Ok(check)
    }

    /// Get the lockout deadline if it is still in the future
    pub fn lockout_until(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.record
            .locked_until
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
            .filter(|until| now < *until)
    }

    /// Get the number of remaining attempts before lockout
    pub fn attempts_remaining(&self) -> u32 {
        self.policy
            .max_attempts()
            .saturating_sub(self.record.failed_attempts)
    }

    /// Number of consecutive failed attempts
    pub fn failed_attempts(&self) -> u32 {
        self.record.failed_attempts
    }

    /// Remove the stored PIN (factory reset)
    pub fn factory_reset(&mut self) -> Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path)?;
        }
        self.record = PinRecord::default();
        info!("PIN record removed");
        Ok(())
    }

    /// Save the record to disk
    fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = serde_json::to_string_pretty(&self.record)?;
        fs::write(&self.path, contents)?;

        // Set restrictive permissions (Unix only)
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.path, fs::Permissions::from_mode(0o600))?;
        }

        Ok(())
    }
}
