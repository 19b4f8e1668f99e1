//! Per-generator option bags and the effective snapshot derived from them.
//!
//! Option bags are plain data with defaults; with the `serde` feature they
//! deserialize from camelCase maps where every missing key falls back to
//! the default, so a partial bag merges over the generator's defaults.
//! `EffectiveSettings` is what the scheduler and the voice factory read: it
//! is recomputed as a whole on every mood change and never edited in place.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{
    dsp::OscillatorWaveform,
    mood::{config::map_range, MoodConfig, MoodProfile},
    synth::voice::VoiceKind,
};

/// Options of the transient cluster generator ("chirps").
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default, rename_all = "camelCase"))]
#[derive(Debug, Clone, PartialEq)]
pub struct ChirpSettings {
    /// Module output gain range, selected by the volume control.
    pub volume_min: f32,
    pub volume_max: f32,
    /// Seconds between clusters, before density scaling.
    pub chirp_interval_min: f64,
    pub chirp_interval_max: f64,
    pub chirps_per_cluster_min: u32,
    pub chirps_per_cluster_max: u32,
    /// Maximum offset of a chirp from its cluster's instant.
    pub cluster_spread: f64,
    pub chirp_freq_min: f32,
    pub chirp_freq_max: f32,
    /// Frequency ratio reached at the end of each chirp's attack.
    pub chirp_glide: f32,
    /// Per-chirp peak level range.
    pub chirp_volume_min: f32,
    pub chirp_volume_max: f32,
    /// Fixed envelope times; override the intensity-scaled ranges when set.
    pub chirp_attack: Option<f64>,
    pub chirp_release: Option<f64>,
    pub chirp_attack_min: f64,
    pub chirp_attack_max: f64,
    pub chirp_release_min: f64,
    pub chirp_release_max: f64,
    pub pan_spread: f32,
    pub module_attack: f64,
    pub module_release: f64,
    pub density_multiplier: f64,
    pub pitch_multiplier: f32,
}

impl Default for ChirpSettings {
    fn default() -> Self {
        Self {
            volume_min: 0.0,
            volume_max: 0.35,
            chirp_interval_min: 1.5,
            chirp_interval_max: 6.0,
            chirps_per_cluster_min: 2,
            chirps_per_cluster_max: 5,
            cluster_spread: 0.35,
            chirp_freq_min: 2_200.0,
            chirp_freq_max: 5_200.0,
            chirp_glide: 1.25,
            chirp_volume_min: 0.15,
            chirp_volume_max: 0.45,
            chirp_attack: None,
            chirp_release: None,
            chirp_attack_min: 0.004,
            chirp_attack_max: 0.03,
            chirp_release_min: 0.06,
            chirp_release_max: 0.35,
            pan_spread: 0.8,
            module_attack: 2.0,
            module_release: 3.0,
            density_multiplier: 1.0,
            pitch_multiplier: 1.0,
        }
    }
}

impl ChirpSettings {
    pub fn effective(&self, mood: &MoodProfile, config: &MoodConfig) -> EffectiveSettings {
        let softness = 100.0 - config.intensity();
        let (interval_min, interval_max) = ordered(self.chirp_interval_min, self.chirp_interval_max);
        let (cluster_min, cluster_max) =
            ordered(self.chirps_per_cluster_min.max(1), self.chirps_per_cluster_max.max(1));
        let pitch = self.pitch_multiplier * mood.pitch;
        let (frequency_min, frequency_max) =
            ordered(self.chirp_freq_min * pitch, self.chirp_freq_max * pitch);
        let (voice_gain_min, voice_gain_max) = ordered(self.chirp_volume_min, self.chirp_volume_max);

        EffectiveSettings {
            kind: VoiceKind::Transient,
            waveform: OscillatorWaveform::Sine,
            output_gain: output_gain(config, self.volume_min, self.volume_max, mood),
            module_attack: self.module_attack.max(0.0),
            module_release: self.module_release.max(0.0),
            interval_min,
            interval_max,
            density: self.density_multiplier * mood.density,
            cluster_min,
            cluster_max,
            cluster_spread: self.cluster_spread.max(0.0),
            frequency_min,
            frequency_max,
            glide: self.chirp_glide,
            attack: self.chirp_attack.unwrap_or_else(|| {
                map_range(softness, self.chirp_attack_min, self.chirp_attack_max)
            }),
            release: self.chirp_release.unwrap_or_else(|| {
                map_range(softness, self.chirp_release_min, self.chirp_release_max)
            }),
            voice_gain_min,
            voice_gain_max,
            pan_spread: self.pan_spread.clamp(0.0, 1.0),
        }
    }
}

/// Options of the sustained generator ("drone").
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default, rename_all = "camelCase"))]
#[derive(Debug, Clone, PartialEq)]
pub struct DroneSettings {
    pub volume_min: f32,
    pub volume_max: f32,
    pub waveform: OscillatorWaveform,
    /// Seconds between new swells, before density scaling.
    pub swell_interval_min: f64,
    pub swell_interval_max: f64,
    pub base_frequency: f32,
    /// Half-width of the pitch range around `base_frequency`, in semitones.
    pub pitch_spread: f32,
    pub swell_volume_min: f32,
    pub swell_volume_max: f32,
    pub swell_attack: Option<f64>,
    pub swell_release: Option<f64>,
    pub swell_attack_min: f64,
    pub swell_attack_max: f64,
    pub swell_release_min: f64,
    pub swell_release_max: f64,
    pub pan_spread: f32,
    pub module_attack: f64,
    pub module_release: f64,
    pub density_multiplier: f64,
    pub pitch_multiplier: f32,
}

impl Default for DroneSettings {
    fn default() -> Self {
        Self {
            volume_min: 0.0,
            volume_max: 0.3,
            waveform: OscillatorWaveform::Triangle,
            swell_interval_min: 4.0,
            swell_interval_max: 9.0,
            base_frequency: 110.0,
            pitch_spread: 7.0,
            swell_volume_min: 0.2,
            swell_volume_max: 0.4,
            swell_attack: None,
            swell_release: None,
            swell_attack_min: 1.5,
            swell_attack_max: 5.0,
            swell_release_min: 4.0,
            swell_release_max: 12.0,
            pan_spread: 0.6,
            module_attack: 4.0,
            module_release: 5.0,
            density_multiplier: 1.0,
            pitch_multiplier: 1.0,
        }
    }
}

impl DroneSettings {
    pub fn effective(&self, mood: &MoodProfile, config: &MoodConfig) -> EffectiveSettings {
        let softness = 100.0 - config.intensity();
        let (interval_min, interval_max) = ordered(self.swell_interval_min, self.swell_interval_max);
        let base = self.base_frequency * self.pitch_multiplier * mood.pitch;
        let spread = 2.0f32.powf(self.pitch_spread.abs() / 12.0);
        let (voice_gain_min, voice_gain_max) = ordered(self.swell_volume_min, self.swell_volume_max);

        EffectiveSettings {
            kind: VoiceKind::Sustained,
            waveform: self.waveform,
            output_gain: output_gain(config, self.volume_min, self.volume_max, mood),
            module_attack: self.module_attack.max(0.0),
            module_release: self.module_release.max(0.0),
            interval_min,
            interval_max,
            density: self.density_multiplier * mood.density,
            cluster_min: 1,
            cluster_max: 1,
            cluster_spread: 0.0,
            frequency_min: base / spread,
            frequency_max: base * spread,
            glide: 1.0,
            attack: self.swell_attack.unwrap_or_else(|| {
                map_range(softness, self.swell_attack_min, self.swell_attack_max)
            }),
            release: self.swell_release.unwrap_or_else(|| {
                map_range(softness, self.swell_release_min, self.swell_release_max)
            }),
            voice_gain_min,
            voice_gain_max,
            pan_spread: self.pan_spread.clamp(0.0, 1.0),
        }
    }
}

/// Concrete ranges the scheduler and voice factory work from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EffectiveSettings {
    pub kind: VoiceKind,
    pub waveform: OscillatorWaveform,
    /// Target level of the module's output stage.
    pub output_gain: f32,
    pub module_attack: f64,
    pub module_release: f64,
    pub interval_min: f64,
    pub interval_max: f64,
    /// Divides the drawn interval; clamped to at least 0.1 when used.
    pub density: f64,
    pub cluster_min: u32,
    pub cluster_max: u32,
    pub cluster_spread: f64,
    pub frequency_min: f32,
    pub frequency_max: f32,
    pub glide: f32,
    pub attack: f64,
    pub release: f64,
    pub voice_gain_min: f32,
    pub voice_gain_max: f32,
    pub pan_spread: f32,
}

impl EffectiveSettings {
    /// Frequency at `position` (0..=1) of the pitch range, on a log scale.
    pub fn frequency_at(&self, position: f32) -> f32 {
        let position = position.clamp(0.0, 1.0);
        if self.frequency_min > 0.0 && self.frequency_max > self.frequency_min {
            self.frequency_min * (self.frequency_max / self.frequency_min).powf(position)
        } else {
            self.frequency_min + (self.frequency_max - self.frequency_min) * position
        }
    }
}

fn output_gain(config: &MoodConfig, min: f32, max: f32, mood: &MoodProfile) -> f32 {
    map_range(config.volume(), min as f64, max as f64) as f32 * mood.volume.max(0.0)
}

fn ordered<T: PartialOrd>(a: T, b: T) -> (T, T) {
    if b < a {
        (b, a)
    } else {
        (a, b)
    }
}
