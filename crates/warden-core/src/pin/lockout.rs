//! Brute-force protection through progressive lockout

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Lockout policy for failed PIN attempts
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LockoutPolicy {
    /// Thresholds and their corresponding lockout durations
    /// Format: (min_attempts, lockout_duration)
    thresholds: Vec<(u32, Duration)>,
}

impl Default for LockoutPolicy {
    fn default() -> Self {
        Self {
            thresholds: vec![
                // Attempts 1-3: No lockout
                // Attempts 4-5: 30 second lockout
                (4, Duration::from_secs(30)),
                // Attempts 6-7: 5 minute lockout
                (6, Duration::from_secs(5 * 60)),
                // Attempts 8-9: 30 minute lockout
                (8, Duration::from_secs(30 * 60)),
                // Attempts 10+: 24 hour lockout
                (10, Duration::from_secs(24 * 60 * 60)),
            ],
        }
    }
}

impl LockoutPolicy {
    /// Get the lockout duration for a given number of failed attempts
    pub fn lockout_duration(&self, failed_attempts: u32) -> Option<Duration> {
        // Find the highest threshold that applies
        self.thresholds
            .iter()
            .rev()
            .find(|(min, _)| failed_attempts >= *min)
            .map(|(_, duration)| *duration)
    }

    /// Get the maximum attempts before any lockout
    pub fn max_attempts(&self) -> u32 {
        self.thresholds.first().map(|(min, _)| *min).unwrap_or(3)
    }

    /// Create a custom lockout policy
    pub fn custom(mut thresholds: Vec<(u32, Duration)>) -> Self {
        thresholds.sort_by_key(|(min, _)| *min);
        Self { thresholds }
    }

    /// Create a strict policy (shorter thresholds)
    pub fn strict() -> Self {
        Self {
            thresholds: vec![
                (3, Duration::from_secs(60)),
                (5, Duration::from_secs(10 * 60)),
                (7, Duration::from_secs(60 * 60)),
                (9, Duration::from_secs(24 * 60 * 60)),
            ],
        }
    }

    /// Create a lenient policy (longer thresholds)
    pub fn lenient() -> Self {
        Self {
            thresholds: vec![
                (5, Duration::from_secs(30)),
                (8, Duration::from_secs(5 * 60)),
                (12, Duration::from_secs(30 * 60)),
                (15, Duration::from_secs(24 * 60 * 60)),
            ],
        }
    }
}

/// Named lockout policies selectable from configuration
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LockoutPreset {
    #[default]
    Default,
    Strict,
    Lenient,
}

impl From<LockoutPreset> for LockoutPolicy {
    fn from(preset: LockoutPreset) -> Self {
        match preset {
            LockoutPreset::Default => LockoutPolicy::default(),
            LockoutPreset::Strict => LockoutPolicy::strict(),
            LockoutPreset::Lenient => LockoutPolicy::lenient(),
        }
    }
}

/// Format remaining lockout time as MM:SS, rounded to the nearest second
pub fn format_countdown(remaining: Duration) -> String {
    let secs = (remaining.as_millis() + 500) / 1000;
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

/// User-visible message shown while PIN entry is locked
pub fn lockout_message(remaining: Duration) -> String {
    format!(
        "Too many attempts, please wait for {}",
        format_countdown(remaining)
    )
}
