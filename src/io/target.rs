//! Capability interface of the render target the generators write into.
//!
//! The target owns the audio clock and the node arena; generators only ever
//! hold `NodeId` handles and commit parameter changes ahead of the render
//! point. All methods take `&self` because a target is shared between the
//! control thread (scheduling) and the render thread (sample generation).

use std::fmt;

use thiserror::Error;

use crate::dsp::{OscillatorWaveform, ParamChange};

/// Opaque handle to a node owned by a render target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

/// Automatable parameters. Each node kind exposes exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Param {
    /// Oscillator frequency in Hz.
    Frequency,
    /// Linear gain.
    Gain,
    /// Stereo position in [-1, 1].
    Pan,
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum TargetError {
    #[error("{0} does not exist")]
    UnknownNode(NodeId),
    #[error("{node} has no {param:?} parameter")]
    WrongParam { node: NodeId, param: Param },
    #[error("render target is closed")]
    Closed,
    #[error("render target could not allocate a {0}")]
    ResourceExhausted(&'static str),
}

/// The audio clock: seconds since the target started rendering.
pub trait AudioClock: Send + Sync {
    fn current_time(&self) -> f64;

    /// False once the clock has been torn down; every other call then fails.
    fn is_running(&self) -> bool;
}

/// Node creation, parameter automation and routing.
pub trait RenderTarget: AudioClock {
    /// Whether `node` is currently part of the graph.
    fn contains(&self, node: NodeId) -> bool;

    fn create_oscillator(
        &self,
        waveform: OscillatorWaveform,
        frequency: f32,
    ) -> Result<NodeId, TargetError>;

    fn create_gain(&self, gain: f32) -> Result<NodeId, TargetError>;

    fn create_panner(&self, pan: f32) -> Result<NodeId, TargetError>;

    /// Commit a change to a node parameter.
    fn schedule(&self, node: NodeId, param: Param, change: ParamChange)
        -> Result<(), TargetError>;

    /// Oscillators are silent until started. Calling again moves the instant.
    fn start_node(&self, node: NodeId, at: f64) -> Result<(), TargetError>;

    /// Oscillators are silent from `at` on. Calling again moves the instant.
    fn stop_node(&self, node: NodeId, at: f64) -> Result<(), TargetError>;

    /// Route the output of `from` into `to`. A node has a single output.
    fn connect(&self, from: NodeId, to: NodeId) -> Result<(), TargetError>;

    /// Remove `node` from the graph, dropping its routing in both directions.
    fn disconnect(&self, node: NodeId) -> Result<(), TargetError>;
}
