use thiserror::Error;

use crate::{
    io::{NodeId, TargetError},
    synth::voice::VoiceId,
};

/// Why `init` refused to enable a module.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum InitFailure {
    #[error("output {0} is not part of the render target")]
    MissingOutput(NodeId),
    #[error("audio clock is unavailable")]
    ClockUnavailable,
    #[error("output stage could not be built: {0}")]
    OutputStage(TargetError),
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum AmbientError {
    #[error("initialization failed: {0}")]
    Initialization(#[from] InitFailure),

    /// One event's voice could not be built. Isolated to that voice.
    #[error("voice {id} could not be created: {source}")]
    VoiceCreation { id: VoiceId, source: TargetError },

    #[error("audio clock was closed underneath the module")]
    ClosedContext,

    /// A fired timer callback failed; playback of that module halts.
    #[error("scheduling callback failed: {0}")]
    SchedulingCallback(TargetError),

    #[error("voice {0} is already registered")]
    DuplicateVoice(VoiceId),

    #[error(transparent)]
    Target(#[from] TargetError),
}
