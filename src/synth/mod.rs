// Purpose: Voice lifecycle and voice design
// This layer sits above the render target and below the scheduler

pub mod factory;
pub mod voice;

pub use factory::{RandomVoices, VoiceFactory};
pub use voice::{Voice, VoiceId, VoiceKind, VoiceNodes, VoiceSpec, VoiceState};
