//! Haptic feedback hooks

/// Kinds of feedback the flows ask for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HapticEffect {
    /// Short tick on an accepted key press
    Impact,
    /// Error buzz (rejected input, wrong PIN, denied permission)
    Error,
}

/// Sink for haptic feedback
pub trait Haptics: Send + Sync {
    fn vibrate(&self, effect: HapticEffect);
}

/// Haptics sink for hosts without a vibration motor
#[derive(Debug, Default, Clone, Copy)]
pub struct NoHaptics;

impl Haptics for NoHaptics {
    fn vibrate(&self, _effect: HapticEffect) {}
}
