//! Low-level DSP primitives used by the render graph and the voices.
//!
//! These components are allocation-free once built and carry no knowledge of
//! scheduling. They stay focused on the math so the higher layers can layer
//! lifecycle and timing on top.

/// Audio-parameter timelines: set, ramp, exponential target, hold.
pub mod automation;
/// Linear-attack, exponential-decay voice envelope.
pub mod envelope;
/// Oscillator waveforms.
pub mod oscillator;

pub use automation::{ParamChange, ParamTimeline};
pub use envelope::AmplitudeEnvelope;
pub use oscillator::{OscillatorBlock, OscillatorWaveform};
