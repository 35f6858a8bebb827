//! Stepped volume arithmetic.
//!
//! 0.1 has no exact binary representation, so every assignment re-rounds to
//! the nearest tenth; repeated stepping can never drift off the 0.0..=1.0
//! grid.

use crate::drum_machine::constants::{VOLUME_MAX, VOLUME_MIN, VOLUME_STEP};

/// Round a volume to the nearest 0.1 step.
pub fn round_to_step(volume: f32) -> f32 {
    (volume * 10.0).round() / 10.0
}

/// One step up. Returns `None` when already at the ceiling.
pub fn increment(volume: f32) -> Option<f32> {
    if volume < VOLUME_MAX {
        Some(round_to_step(volume + VOLUME_STEP).min(VOLUME_MAX))
    } else {
        None
    }
}

/// One step down. Returns `None` when already at the floor.
pub fn decrement(volume: f32) -> Option<f32> {
    if volume > VOLUME_MIN {
        Some(round_to_step(volume - VOLUME_STEP).max(VOLUME_MIN))
    } else {
        None
    }
}

/// Integer percent reading shown after a volume change.
pub fn display_percent(volume: f32) -> u32 {
    (volume * 100.0).round() as u32
}

/// Display line shown after a volume change, e.g. "Volume: 40".
pub fn display_text(volume: f32) -> String {
    format!("Volume: {}", display_percent(volume))
}
