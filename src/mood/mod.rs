//! Moods and the 0–100 parameter mapping.
//!
//! A `Mood` is a named preset bundle: global multipliers plus the option bag
//! of every generator. The host picks a mood and a `MoodConfig`; each
//! generator derives its `EffectiveSettings` from the pair.
//!
//! # Example
//!
//! ```
//! use ambient_dsp::{mood::ChirpSettings, Mood, MoodConfig};
//!
//! let mood = Mood::calm().with_chirps(ChirpSettings {
//!     chirp_interval_min: 0.25,
//!     chirp_interval_max: 1.3,
//!     ..ChirpSettings::default()
//! });
//! let effective = mood.chirps.effective(&mood.profile, &MoodConfig::default());
//! assert!(effective.interval_max <= 1.3);
//! ```

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::dsp::OscillatorWaveform;

pub mod config;
pub mod settings;

pub use config::{map_range, MoodConfig};
pub use settings::{ChirpSettings, DroneSettings, EffectiveSettings};

/// Multipliers a mood applies on top of every generator's own settings.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoodProfile {
    /// Baseline the volume control is measured against.
    pub volume: f32,
    /// Event-rate multiplier.
    pub density: f64,
    /// Pitch multiplier.
    pub pitch: f32,
}

impl Default for MoodProfile {
    fn default() -> Self {
        Self {
            volume: 1.0,
            density: 1.0,
            pitch: 1.0,
        }
    }
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, PartialEq)]
pub struct Mood {
    pub name: String,
    pub profile: MoodProfile,
    pub chirps: ChirpSettings,
    pub drone: DroneSettings,
}

impl Default for Mood {
    fn default() -> Self {
        Self::named("neutral")
    }
}

impl Mood {
    /// Every built-in preset name.
    pub const PRESETS: [&'static str; 4] = ["calm", "bright", "mysterious", "tense"];

    /// A mood with default settings everywhere.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            profile: MoodProfile::default(),
            chirps: ChirpSettings::default(),
            drone: DroneSettings::default(),
        }
    }

    /// Look up a built-in preset.
    pub fn preset(name: &str) -> Option<Self> {
        match name {
            "calm" => Some(Self::calm()),
            "bright" => Some(Self::bright()),
            "mysterious" => Some(Self::mysterious()),
            "tense" => Some(Self::tense()),
            _ => None,
        }
    }

    /// Sparse, slow and low.
    pub fn calm() -> Self {
        let mut mood = Self::named("calm");
        mood.profile = MoodProfile {
            volume: 0.9,
            density: 0.7,
            pitch: 1.0,
        };
        mood.drone.swell_interval_min = 6.0;
        mood.drone.swell_interval_max = 12.0;
        mood
    }

    /// Busy birdsong over an open fifth.
    pub fn bright() -> Self {
        let mut mood = Self::named("bright");
        mood.profile = MoodProfile {
            volume: 1.0,
            density: 1.4,
            pitch: 1.25,
        };
        mood.chirps.chirps_per_cluster_max = 6;
        mood.chirps.chirp_glide = 1.35;
        mood.drone.base_frequency = 146.83; // D3
        mood
    }

    /// Sine drones, sparse low chirps that fall instead of rise.
    pub fn mysterious() -> Self {
        let mut mood = Self::named("mysterious");
        mood.profile = MoodProfile {
            volume: 0.8,
            density: 0.5,
            pitch: 0.8,
        };
        mood.chirps.chirp_glide = 0.85;
        mood.drone.waveform = OscillatorWaveform::Sine;
        mood.drone.base_frequency = 98.0; // G2
        mood.drone.pitch_spread = 3.0;
        mood
    }

    /// Dense, short and edgy.
    pub fn tense() -> Self {
        let mut mood = Self::named("tense");
        mood.profile = MoodProfile {
            volume: 1.0,
            density: 1.8,
            pitch: 1.1,
        };
        mood.chirps.cluster_spread = 0.15;
        mood.chirps.chirp_release_max = 0.2;
        mood.drone.waveform = OscillatorWaveform::Saw;
        mood.drone.base_frequency = 123.47; // B2
        mood.drone.pitch_spread = 1.0;
        mood.drone.volume_max = 0.2;
        mood
    }

    pub fn with_chirps(mut self, chirps: ChirpSettings) -> Self {
        self.chirps = chirps;
        self
    }

    pub fn with_drone(mut self, drone: DroneSettings) -> Self {
        self.drone = drone;
        self
    }

    pub fn with_profile(mut self, profile: MoodProfile) -> Self {
        self.profile = profile;
        self
    }
}
