//! The host-facing facade every ambient generator implements.
//!
//! A host drives a module through a fixed lifecycle:
//!
//! ```text
//!   init ──▶ play ──▶ (update per frame) ──▶ stop ──▶ play ... ──▶ dispose
//!              ▲                                │
//!              └────────── change_mood ─────────┘  (valid in either state)
//! ```
//!
//! All calls happen on one control thread. Nothing blocks: deferred work is
//! queued against the audio clock and executed when `update` pumps it.

use std::sync::Arc;

use crate::{
    error::AmbientError,
    io::{NodeId, RenderTarget},
    mood::{EffectiveSettings, Mood, MoodConfig},
    STALE_EVENT_LIMIT,
};

pub mod chirps;
pub mod drone;
pub mod generator;

pub use chirps::{ChirpModule, Chirps};
pub use drone::{Drone, DroneModule};
pub use generator::Generator;

/// Share of a mood transition spent ramping the output level.
pub const VOLUME_RAMP_FRACTION: f64 = 0.5;
/// Share of a mood transition spent gliding sustained voices to their new pitch.
pub const PITCH_RAMP_FRACTION: f64 = 0.8;
/// Fade used by `StopPolicy::force_decay`.
pub const FORCED_FADE: f64 = 0.03;

/// What happens to voices that are still sounding when a module stops.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub enum StopPolicy {
    /// Voices finish their own decay; only the module output fades.
    #[default]
    LetRing,
    /// Every voice fades to zero over `fade` seconds from the stop instant.
    ForceDecay { fade: f64 },
}

impl StopPolicy {
    pub fn force_decay() -> Self {
        Self::ForceDecay { fade: FORCED_FADE }
    }
}

/// What happens to an event whose intended instant has already slipped
/// behind the clock when it is pumped.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LatePolicy {
    /// Drop events lagging by more than `limit` seconds and resume the
    /// timeline from the present.
    Skip { limit: f64 },
    /// Emit every event however late; its voices start from now.
    Emit,
}

impl Default for LatePolicy {
    fn default() -> Self {
        Self::Skip {
            limit: STALE_EVENT_LIMIT,
        }
    }
}

impl LatePolicy {
    fn is_stale(self, lag: f64) -> bool {
        match self {
            Self::Skip { limit } => lag > limit,
            Self::Emit => false,
        }
    }
}

/// How a generator derives its settings from a mood.
pub trait Voicing {
    const NAME: &'static str;

    fn effective(mood: &Mood, config: &MoodConfig) -> EffectiveSettings;
}

pub trait AmbientModule: Send {
    fn name(&self) -> &str;

    /// Build the output stage into `output` and derive settings. A module that
    /// was already initialized is disposed first. On failure nothing is left
    /// behind and the module stays disabled.
    fn init(
        &mut self,
        target: Arc<dyn RenderTarget>,
        output: NodeId,
        mood: &Mood,
        config: MoodConfig,
    ) -> Result<(), AmbientError>;

    /// Per-frame hook. Runs every task that has come due on the audio clock.
    fn update(&mut self, time: f64, delta_time: f64);

    /// Fade in and start producing events from `start`. No-op when disabled or
    /// already playing.
    fn play(&mut self, start: f64) -> Result<(), AmbientError>;

    /// Stop producing events and fade out over `fade_hint`, or the module's
    /// own release when `None`. No-op when not playing.
    fn stop(&mut self, stop: f64, fade_hint: Option<f64>) -> Result<(), AmbientError>;

    /// Re-derive settings and move towards them over `transition` seconds.
    fn change_mood(
        &mut self,
        mood: &Mood,
        transition: f64,
        config: MoodConfig,
    ) -> Result<(), AmbientError>;

    /// Free every voice and node. Safe to call any number of times.
    fn dispose(&mut self);

    fn is_enabled(&self) -> bool;

    fn is_playing(&self) -> bool;

    fn live_voices(&self) -> usize;

    fn effective_settings(&self) -> Option<EffectiveSettings>;
}
