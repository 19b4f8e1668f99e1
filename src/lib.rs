pub mod dsp; // Envelope and automation math, oscillators
pub mod engine; // Task queue, event scheduler, voice registry
pub mod error;
pub mod graph; // In-process render target
pub mod io; // Render target capability traits
pub mod module; // Ambient generator facade
pub mod mood; // Mood presets and 0-100 parameter mapping
pub mod runtime; // Host coordinator
pub mod synth; // Voices and voice factories

pub use error::{AmbientError, InitFailure};
pub use graph::OfflineGraph;
pub use module::{AmbientModule, ChirpModule, DroneModule, LatePolicy, StopPolicy};
pub use mood::{map_range, Mood, MoodConfig};
pub use runtime::Soundscape;

pub const MAX_BLOCK_SIZE: usize = 2048;
pub(crate) const MIN_TIME: f64 = 1.0 / 48_000.0;

/// Level treated as inaudible when deciding teardown.
pub const SILENCE_FLOOR: f32 = 1e-4;
/// Offset added to "now" when committing a voice's start.
pub const LOOKAHEAD: f64 = 0.05;
/// Linear tail that takes a decayed voice from its residual to exact zero.
pub const RELEASE_TAIL: f64 = 0.02;
/// Slack between a voice going silent and its nodes being disconnected.
pub const CLEANUP_MARGIN: f64 = 0.05;
/// Default lag past which `LatePolicy::Skip` drops an event.
pub const STALE_EVENT_LIMIT: f64 = 1.0;
