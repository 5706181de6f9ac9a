//! Property-based tests for the PIN session and scan state using proptest
//!
//! These tests check the keypad invariants against a plain reference model.

use std::time::Duration;

use proptest::prelude::*;
use tokio::time::Instant;
use warden_core::device::ScanState;
use warden_core::pin::{KeyOutcome, PinSession};
use warden_core::{Device, KeypadInput, PinError, ScanEvent, PIN_LENGTH};

// ============================================
// Strategies
// ============================================

fn arb_key() -> impl Strategy<Value = KeypadInput> {
    prop_oneof![
        4 => (0u8..=9).prop_map(KeypadInput::Digit),
        1 => Just(KeypadInput::Delete),
    ]
}

fn arb_keys() -> impl Strategy<Value = Vec<KeypadInput>> {
    prop::collection::vec(arb_key(), 0..64)
}

fn arb_scan_event() -> impl Strategy<Value = ScanEvent> {
    prop_oneof![
        8 => (0u8..6).prop_map(|n| ScanEvent::Device(Device::new(format!("hid-{}", n), "Nano X"))),
        1 => Just(ScanEvent::Complete),
        1 => Just(ScanEvent::Error("scan failed".to_string())),
    ]
}

// ============================================
// PIN session
// ============================================

proptest! {
    /// Length tracks appends minus deletes, and every full run completes once
    #[test]
    fn prop_digits_follow_model(keys in arb_keys()) {
        let now = Instant::now();
        let mut session = PinSession::new();
        let mut model: Vec<u8> = Vec::new();
        let mut completions = Vec::new();

        for key in keys {
            let outcome = session.press(key, now).unwrap();
            match key {
                KeypadInput::Digit(d) => {
                    model.push(d);
                    if model.len() == PIN_LENGTH {
                        let expected: String = model.iter().map(|d| char::from(b'0' + d)).collect();
                        match outcome {
                            KeyOutcome::Completed(code) => completions.push(code.as_str().to_string()),
                            other => prop_assert!(false, "expected completion, got {:?}", other),
                        }
                        prop_assert_eq!(completions.last().unwrap(), &expected);

                        // The handler rejects silently, starting a new run
                        session.reset(None);
                        model.clear();
                    } else {
                        prop_assert_eq!(outcome, KeyOutcome::Accepted);
                    }
                }
                KeypadInput::Delete => {
                    let expected = if model.pop().is_some() {
                        KeyOutcome::Accepted
                    } else {
                        KeyOutcome::Ignored
                    };
                    prop_assert_eq!(outcome, expected);
                }
            }

            prop_assert!(session.len() <= PIN_LENGTH);
            prop_assert_eq!(session.len(), model.len());
        }
    }

    /// No input is accepted while a lock is in the future
    #[test]
    fn prop_locked_session_refuses_input(
        keys in arb_keys(),
        prefix in prop::collection::vec(0u8..=9, 0..PIN_LENGTH),
        lock_secs in 1u64..86_400,
        elapsed_secs in 0u64..86_400,
    ) {
        let start = Instant::now();
        let mut session = PinSession::new();
        for d in prefix {
            session.press(KeypadInput::Digit(d), start).unwrap();
        }

        prop_assert!(session.lock(Some(start + Duration::from_secs(lock_secs)), start));
        prop_assert!(session.is_empty());

        let now = start + Duration::from_secs(elapsed_secs.min(lock_secs - 1));
        for key in keys {
            let refused = matches!(session.press(key, now), Err(PinError::LockoutActive { .. }));
            prop_assert!(refused);
            prop_assert!(session.is_empty());
        }
    }

    /// The countdown message always names the rounded remaining time
    #[test]
    fn prop_countdown_message(lock_secs in 1u64..3_600, elapsed_ms in 0u64..3_600_000) {
        let start = Instant::now();
        let mut session = PinSession::new();
        session.lock(Some(start + Duration::from_secs(lock_secs)), start);

        let elapsed = Duration::from_millis(elapsed_ms);
        session.tick(start + elapsed);

        if elapsed < Duration::from_secs(lock_secs) {
            prop_assert!(session.error_message().starts_with("Too many attempts, please wait for "));
        } else {
            prop_assert_eq!(session.error_message(), "");
            prop_assert!(session.locked_until().is_none());
        }
    }
}

// ============================================
// Scan state
// ============================================

proptest! {
    /// The device list never holds the same id twice and keeps discovery order
    #[test]
    fn prop_devices_unique(events in prop::collection::vec(arb_scan_event(), 0..50)) {
        let mut state = ScanState::default();
        let mut first_seen: Vec<String> = Vec::new();

        for event in events {
            if let ScanEvent::Device(device) = &event {
                if !first_seen.iter().any(|id| id == device.id.as_str()) {
                    first_seen.push(device.id.as_str().to_string());
                }
            }
            state.apply(event);
        }

        let ids: Vec<String> = state.devices.iter().map(|d| d.id.as_str().to_string()).collect();
        prop_assert_eq!(ids, first_seen);
    }
}
