//! PIN input state machine
//!
//! `PinSession` is the synchronous core of the lock screen. It knows nothing
//! about timers or callbacks: every operation takes the current instant, which
//! keeps it deterministic under test. [`super::PinController`] wraps it with the
//! ticker task, haptics and the completion handler.

use tokio::time::Instant;
use zeroize::Zeroizing;

use super::lockout::lockout_message;
use super::{KeypadInput, PIN_LENGTH};
use crate::error::PinError;

/// Result of feeding one key into the session
#[derive(Debug, PartialEq, Eq)]
pub enum KeyOutcome {
    /// A digit was appended or removed
    Accepted,
    /// The code reached full length; carries the code
    Completed(Zeroizing<String>),
    /// Nothing changed (delete on empty input, non-digit, or waiting for reset)
    Ignored,
}

/// Result of a lockout tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockTick {
    /// No lock is set
    Idle,
    /// Still locked; the countdown message was refreshed
    Counting,
    /// The lock just expired and was cleared
    Expired,
}

/// Read-only view of the session for rendering
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinSnapshot {
    /// Number of digits entered so far
    pub filled: usize,
    /// Message shown under the title, empty when there is none
    pub error_message: String,
    /// Lockout deadline, if one is set
    pub locked_until: Option<Instant>,
    /// Whether a completed code is waiting for the caller's verdict
    pub awaiting_reset: bool,
}

/// State of one PIN entry screen
#[derive(Debug)]
pub struct PinSession {
    digits: Zeroizing<String>,
    error_message: String,
    locked_until: Option<Instant>,
    awaiting_reset: bool,
}

impl Default for PinSession {
    fn default() -> Self {
        Self::new()
    }
}

impl PinSession {
    /// Create an empty, unlocked session
    pub fn new() -> Self {
        Self {
            digits: Zeroizing::new(String::with_capacity(PIN_LENGTH)),
            error_message: String::new(),
            locked_until: None,
            awaiting_reset: false,
        }
    }

    /// Whether input is currently refused because of a lockout
    pub fn is_locked(&self, now: Instant) -> bool {
        matches!(self.locked_until, Some(until) if now < until)
    }

    /// Apply a keypad press
    pub fn press(&mut self, input: KeypadInput, now: Instant) -> Result<KeyOutcome, PinError> {
        if let Some(until) = self.locked_until.filter(|until| now < *until) {
            let remaining = until.duration_since(now);
            return Err(PinError::LockoutActive {
                remaining_secs: remaining.as_secs(),
            });
        }

        if self.awaiting_reset {
            return Ok(KeyOutcome::Ignored);
        }

        match input {
            KeypadInput::Delete => {
                if self.digits.pop().is_some() {
                    Ok(KeyOutcome::Accepted)
                } else {
                    Ok(KeyOutcome::Ignored)
                }
            }
            KeypadInput::Digit(d) if d > 9 => Ok(KeyOutcome::Ignored),
            KeypadInput::Digit(d) => {
                self.digits.push(char::from(b'0' + d));
                if self.digits.len() == PIN_LENGTH {
                    self.awaiting_reset = true;
                    Ok(KeyOutcome::Completed(self.digits.clone()))
                } else {
                    Ok(KeyOutcome::Accepted)
                }
            }
        }
    }

    /// Clear the digits, optionally showing a message
    ///
    /// Returns `true` when a message was shown.
    pub fn reset(&mut self, message: Option<&str>) -> bool {
        self.digits.clear();
        self.awaiting_reset = false;

        match message.filter(|m| !m.is_empty()) {
            Some(message) => {
                self.error_message = message.to_string();
                true
            }
            None => false,
        }
    }

    /// Drop the error message, leaving digits and lock as they are
    pub fn clear_message(&mut self) {
        self.error_message.clear();
    }

    /// Set or clear the lockout deadline
    ///
    /// Digits are always cleared. Returns `true` when the new deadline lies in
    /// the future, which is the moment the lock notification is due.
    pub fn lock(&mut self, until: Option<Instant>, now: Instant) -> bool {
        self.digits.clear();
        self.awaiting_reset = false;
        self.locked_until = until;

        match until {
            Some(until) if now < until => {
                self.error_message = lockout_message(until.duration_since(now));
                true
            }
            _ => false,
        }
    }

    /// Refresh the countdown, clearing the lock once the deadline has passed
    pub fn tick(&mut self, now: Instant) -> LockTick {
        let Some(until) = self.locked_until else {
            return LockTick::Idle;
        };

        if now < until {
            self.error_message = lockout_message(until.duration_since(now));
            LockTick::Counting
        } else {
            self.locked_until = None;
            self.error_message.clear();
            LockTick::Expired
        }
    }

    /// Number of digits entered so far
    pub fn len(&self) -> usize {
        self.digits.len()
    }

    /// Whether no digit has been entered
    pub fn is_empty(&self) -> bool {
        self.digits.is_empty()
    }

    /// Current message, empty when there is none
    pub fn error_message(&self) -> &str {
        &self.error_message
    }

    /// Lockout deadline, if one is set
    pub fn locked_until(&self) -> Option<Instant> {
        self.locked_until
    }

    /// Take a rendering snapshot
    pub fn snapshot(&self) -> PinSnapshot {
        PinSnapshot {
            filled: self.digits.len(),
            error_message: self.error_message.clone(),
            locked_until: self.locked_until,
            awaiting_reset: self.awaiting_reset,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn enter(session: &mut PinSession, code: &str, now: Instant) -> Vec<KeyOutcome> {
        code.chars()
            .map(|c| {
                let input = KeypadInput::from_char(c).unwrap();
                session.press(input, now).unwrap()
            })
            .collect()
    }

    #[test]
    fn test_completes_once_at_six_digits() {
        let now = Instant::now();
        let mut session = PinSession::new();

        let outcomes = enter(&mut session, "123456", now);
        let completed: Vec<_> = outcomes
            .iter()
            .filter_map(|o| match o {
                KeyOutcome::Completed(code) => Some(code.as_str().to_string()),
                _ => None,
            })
            .collect();

        assert_eq!(completed, vec!["123456".to_string()]);
        assert_eq!(session.len(), 6);
    }

    #[test]
    fn test_input_refused_until_reset() {
        let now = Instant::now();
        let mut session = PinSession::new();
        enter(&mut session, "123456", now);

        assert_eq!(
            session.press(KeypadInput::Digit(7), now).unwrap(),
            KeyOutcome::Ignored
        );
        assert_eq!(
            session.press(KeypadInput::Delete, now).unwrap(),
            KeyOutcome::Ignored
        );
        assert_eq!(session.len(), 6);

        session.reset(None);
        assert!(session.is_empty());
        assert_eq!(
            session.press(KeypadInput::Digit(7), now).unwrap(),
            KeyOutcome::Accepted
        );
    }

    #[test]
    fn test_delete_on_empty_is_noop() {
        let mut session = PinSession::new();
        assert_eq!(
            session.press(KeypadInput::Delete, Instant::now()).unwrap(),
            KeyOutcome::Ignored
        );
        assert!(session.is_empty());
    }

    #[test]
    fn test_out_of_range_digit_ignored() {
        let mut session = PinSession::new();
        assert_eq!(
            session.press(KeypadInput::Digit(10), Instant::now()).unwrap(),
            KeyOutcome::Ignored
        );
        assert!(session.is_empty());
    }

    #[test]
    fn test_reset_message() {
        let mut session = PinSession::new();
        assert!(!session.reset(None));
        assert!(!session.reset(Some("")));
        assert_eq!(session.error_message(), "");

        assert!(session.reset(Some("Wrong PIN")));
        assert_eq!(session.error_message(), "Wrong PIN");

        // A reset without message keeps the previous one
        session.reset(None);
        assert_eq!(session.error_message(), "Wrong PIN");

        session.clear_message();
        assert_eq!(session.error_message(), "");
    }

    #[test]
    fn test_lock_rejects_digits() {
        let now = Instant::now();
        let mut session = PinSession::new();
        enter(&mut session, "12", now);

        assert!(session.lock(Some(now + Duration::from_secs(90)), now));
        assert!(session.is_empty());
        assert_eq!(
            session.error_message(),
            "Too many attempts, please wait for 01:30"
        );

        let err = session.press(KeypadInput::Digit(1), now).unwrap_err();
        assert_eq!(err, PinError::LockoutActive { remaining_secs: 90 });
        assert!(session.is_empty());
    }

    #[test]
    fn test_lock_in_the_past_is_not_a_new_lock() {
        let now = Instant::now();
        let mut session = PinSession::new();
        assert!(!session.lock(Some(now), now + Duration::from_secs(1)));
        assert!(!session.is_locked(now + Duration::from_secs(1)));
    }

    #[test]
    fn test_tick_counts_down_then_expires() {
        let now = Instant::now();
        let mut session = PinSession::new();
        session.lock(Some(now + Duration::from_secs(90)), now);

        assert_eq!(session.tick(now + Duration::from_secs(30)), LockTick::Counting);
        assert_eq!(
            session.error_message(),
            "Too many attempts, please wait for 01:00"
        );

        assert_eq!(session.tick(now + Duration::from_secs(91)), LockTick::Expired);
        assert_eq!(session.error_message(), "");
        assert!(session.locked_until().is_none());
        assert_eq!(session.tick(now + Duration::from_secs(92)), LockTick::Idle);

        assert_eq!(
            session
                .press(KeypadInput::Digit(4), now + Duration::from_secs(92))
                .unwrap(),
            KeyOutcome::Accepted
        );
    }

    #[test]
    fn test_unlock_keeps_message() {
        let now = Instant::now();
        let mut session = PinSession::new();
        session.lock(Some(now + Duration::from_secs(10)), now);
        assert!(!session.lock(None, now));
        assert!(!session.is_locked(now));
        assert!(!session.error_message().is_empty());
    }
}
