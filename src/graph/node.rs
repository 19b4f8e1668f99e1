use std::f32::consts::FRAC_PI_4;

use crate::{
    dsp::{OscillatorBlock, OscillatorWaveform, ParamTimeline},
    io::{NodeId, Param},
};

/// Context passed to graph nodes during rendering
///
/// - sample_rate: Audio sample rate (e.g., 48000.0)
/// - time: Audio-clock instant of the sample being rendered, in seconds
#[derive(Debug, Clone, Copy)]
pub struct RenderCtx {
    pub sample_rate: f32,
    pub time: f64,
}

/// A stereo sample pair.
pub type Frame = (f32, f32);

pub(crate) enum NodeKind {
    /// Sums its inputs; the root of the graph.
    Destination,
    Oscillator {
        osc: OscillatorBlock,
        frequency: ParamTimeline,
        start: Option<f64>,
        stop: Option<f64>,
    },
    Gain {
        gain: ParamTimeline,
    },
    /// Equal-power placement of the mono sum of its inputs.
    Panner {
        pan: ParamTimeline,
    },
}

pub(crate) struct Node {
    pub kind: NodeKind,
    pub output: Option<NodeId>,
}

impl Node {
    pub fn destination() -> Self {
        Self {
            kind: NodeKind::Destination,
            output: None,
        }
    }

    pub fn oscillator(waveform: OscillatorWaveform, frequency: f32) -> Self {
        Self {
            kind: NodeKind::Oscillator {
                osc: OscillatorBlock::new(waveform),
                frequency: ParamTimeline::new(frequency),
                start: None,
                stop: None,
            },
            output: None,
        }
    }

    pub fn gain(gain: f32) -> Self {
        Self {
            kind: NodeKind::Gain {
                gain: ParamTimeline::new(gain),
            },
            output: None,
        }
    }

    pub fn panner(pan: f32) -> Self {
        Self {
            kind: NodeKind::Panner {
                pan: ParamTimeline::new(pan.clamp(-1.0, 1.0)),
            },
            output: None,
        }
    }

    pub fn param_mut(&mut self, param: Param) -> Option<&mut ParamTimeline> {
        match (&mut self.kind, param) {
            (NodeKind::Oscillator { frequency, .. }, Param::Frequency) => Some(frequency),
            (NodeKind::Gain { gain }, Param::Gain) => Some(gain),
            (NodeKind::Panner { pan }, Param::Pan) => Some(pan),
            _ => None,
        }
    }

    pub fn param(&self, param: Param) -> Option<&ParamTimeline> {
        match (&self.kind, param) {
            (NodeKind::Oscillator { frequency, .. }, Param::Frequency) => Some(frequency),
            (NodeKind::Gain { gain }, Param::Gain) => Some(gain),
            (NodeKind::Panner { pan }, Param::Pan) => Some(pan),
            _ => None,
        }
    }

    /// Fold automation history up to `t`; see `ParamTimeline::settle`.
    pub fn settle(&mut self, t: f64) {
        match &mut self.kind {
            NodeKind::Destination => {}
            NodeKind::Oscillator { frequency, .. } => frequency.settle(t),
            NodeKind::Gain { gain } => gain.settle(t),
            NodeKind::Panner { pan } => pan.settle(t),
        }
    }

    /// Start/stop instants; `None` for anything but an oscillator.
    pub fn transport_mut(&mut self) -> Option<(&mut Option<f64>, &mut Option<f64>)> {
        match &mut self.kind {
            NodeKind::Oscillator { start, stop, .. } => Some((start, stop)),
            _ => None,
        }
    }

    /// Render one frame from the summed `input`.
    #[inline]
    pub fn process(&mut self, input: Frame, ctx: &RenderCtx) -> Frame {
        match &mut self.kind {
            NodeKind::Destination => input,
            NodeKind::Oscillator {
                osc,
                frequency,
                start,
                stop,
            } => {
                let started = start.is_some_and(|s| ctx.time >= s);
                let stopped = stop.is_some_and(|s| ctx.time >= s);
                if !started || stopped {
                    return (0.0, 0.0);
                }
                let s = osc.next_sample(frequency.value_at(ctx.time), ctx.sample_rate);
                (s, s)
            }
            NodeKind::Gain { gain } => {
                let g = gain.value_at(ctx.time);
                (input.0 * g, input.1 * g)
            }
            NodeKind::Panner { pan } => {
                let mono = 0.5 * (input.0 + input.1);
                // -1 → hard left, +1 → hard right
                let angle = (pan.value_at(ctx.time).clamp(-1.0, 1.0) + 1.0) * FRAC_PI_4;
                (mono * angle.cos(), mono * angle.sin())
            }
        }
    }
}
