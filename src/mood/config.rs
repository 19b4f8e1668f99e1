#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Level assumed for any control the host leaves unspecified.
pub const DEFAULT_LEVEL: f32 = 100.0;

/// Host-facing control triple, each in 0..=100.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoodConfig {
    pub volume: f32,
    /// Consumed by the host: gates whether a generator runs at all.
    pub occurrence: f32,
    /// Higher intensity means shorter, more percussive envelopes.
    pub intensity: f32,
}

impl Default for MoodConfig {
    fn default() -> Self {
        Self {
            volume: DEFAULT_LEVEL,
            occurrence: DEFAULT_LEVEL,
            intensity: DEFAULT_LEVEL,
        }
    }
}

impl MoodConfig {
    pub fn new(volume: f32, occurrence: f32, intensity: f32) -> Self {
        Self {
            volume,
            occurrence,
            intensity,
        }
    }

    pub fn volume(&self) -> f32 {
        level(self.volume)
    }

    pub fn occurrence(&self) -> f32 {
        level(self.occurrence)
    }

    pub fn intensity(&self) -> f32 {
        level(self.intensity)
    }
}

/// Sanitize a 0..=100 control: clamp, and read NaN as unspecified.
#[inline]
pub fn level(value: f32) -> f32 {
    if value.is_nan() {
        DEFAULT_LEVEL
    } else {
        value.clamp(0.0, 100.0)
    }
}

/// Map a 0..=100 control onto `[min, max]`.
///
/// Out-of-range input clamps; `min > max` maps inversely.
#[inline]
pub fn map_range(value: f32, min: f64, max: f64) -> f64 {
    // Blend form: exact at both ends for any bounds.
    let t = level(value) as f64 / 100.0;
    min * (1.0 - t) + max * t
}
