use std::fmt;

use tracing::warn;

use crate::{
    dsp::{automation::time_constant, AmplitudeEnvelope, OscillatorWaveform, ParamChange},
    error::AmbientError,
    io::{NodeId, Param, RenderTarget, TargetError},
    CLEANUP_MARGIN,
};

/// Per-module voice identity. Monotonic, never reused while the module lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VoiceId(pub u64);

impl fmt::Display for VoiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "voice#{}", self.0)
    }
}

/// Lifecycle of a voice. Ordered: a voice only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum VoiceState {
    Pending,   // Created, start instant not reached yet
    Sounding,  // Attack stage
    Releasing, // Exponential decay and tail
    Disposed,  // Nodes disconnected, terminal
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceKind {
    /// Short struck event with a fixed pan and an optional pitch glide.
    Transient,
    /// Long swell whose pan drifts and whose pitch follows mood changes.
    Sustained,
}

/// Everything needed to synthesize one voice.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoiceSpec {
    pub kind: VoiceKind,
    pub waveform: OscillatorWaveform,
    pub frequency: f32,
    /// Frequency ratio reached at the end of the attack (transient voices).
    pub glide: f32,
    pub envelope: AmplitudeEnvelope,
    pub pan: f32,
    /// Pan reached at the end of the decay (sustained voices).
    pub pan_to: f32,
    /// Position of `frequency` within the module's pitch range, 0.0..=1.0 on a
    /// log scale. Used to retune sustained voices when the range moves.
    pub pitch_position: f32,
}

/// Render-target nodes owned by one voice: osc → amplitude → panner → output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoiceNodes {
    pub oscillator: NodeId,
    pub amplitude: NodeId,
    pub panner: NodeId,
}

impl VoiceNodes {
    fn all(&self) -> [NodeId; 3] {
        [self.oscillator, self.amplitude, self.panner]
    }
}

#[derive(Debug)]
pub struct Voice {
    id: VoiceId,
    spec: VoiceSpec,
    start: f64,
    teardown_at: f64,
    state: VoiceState,
    nodes: VoiceNodes,
}

impl Voice {
    /// Build the voice's nodes, commit its automation and route it into
    /// `output`. On failure every node created so far is disconnected again.
    pub fn create(
        target: &dyn RenderTarget,
        output: NodeId,
        id: VoiceId,
        spec: VoiceSpec,
        start: f64,
    ) -> Result<Self, AmbientError> {
        let mut created = Vec::with_capacity(3);
        match build(target, output, &spec, start, &mut created) {
            Ok(nodes) => Ok(Self {
                id,
                spec,
                start,
                teardown_at: spec.envelope.silent_at(start) + CLEANUP_MARGIN,
                state: VoiceState::Pending,
                nodes,
            }),
            Err(source) => {
                for node in created {
                    if let Err(err) = target.disconnect(node) {
                        warn!(voice = %id, %node, error = %err, "failed to release partial voice node");
                    }
                }
                Err(AmbientError::VoiceCreation { id, source })
            }
        }
    }

    pub fn id(&self) -> VoiceId {
        self.id
    }

    pub fn spec(&self) -> &VoiceSpec {
        &self.spec
    }

    pub fn kind(&self) -> VoiceKind {
        self.spec.kind
    }

    pub fn nodes(&self) -> VoiceNodes {
        self.nodes
    }

    /// Effective synthesis start.
    pub fn start(&self) -> f64 {
        self.start
    }

    /// End of the decay stage; strictly after `start + attack`.
    pub fn stop(&self) -> f64 {
        self.spec.envelope.stop_at(self.start)
    }

    /// Instant at which the natural release task disposes the voice.
    pub fn teardown_at(&self) -> f64 {
        self.teardown_at
    }

    pub fn state(&self) -> VoiceState {
        self.state
    }

    pub fn is_disposed(&self) -> bool {
        self.state == VoiceState::Disposed
    }

    /// Advance the time-driven part of the state machine to `now`.
    pub fn sync(&mut self, now: f64) -> VoiceState {
        let by_time = if now < self.start {
            VoiceState::Pending
        } else if now < self.start + self.spec.envelope.attack() {
            VoiceState::Sounding
        } else {
            VoiceState::Releasing
        };
        self.state = self.state.max(by_time);
        self.state
    }

    /// Disconnect every node. Returns `true` only for the call that actually
    /// freed the voice; later calls are no-ops.
    pub fn dispose(&mut self, target: &dyn RenderTarget) -> bool {
        if self.is_disposed() {
            return false;
        }
        for node in self.nodes.all() {
            if let Err(err) = target.disconnect(node) {
                warn!(voice = %self.id, %node, error = %err, "failed to disconnect voice node");
            }
        }
        self.state = VoiceState::Disposed;
        true
    }

    /// Fade out from whatever level the voice has at `at`, reaching zero after
    /// `fade`. Returns the new teardown instant, which is never later than
    /// the natural one.
    pub fn force_decay(
        &mut self,
        target: &dyn RenderTarget,
        at: f64,
        fade: f64,
    ) -> Result<f64, TargetError> {
        let silent = at + fade.max(0.0);
        if self.is_disposed() || silent + CLEANUP_MARGIN >= self.teardown_at {
            return Ok(self.teardown_at);
        }

        target.schedule(self.nodes.amplitude, Param::Gain, ParamChange::HoldAt(at))?;
        target.schedule(
            self.nodes.amplitude,
            Param::Gain,
            ParamChange::LinearRamp {
                end: silent,
                value: 0.0,
            },
        )?;
        target.stop_node(self.nodes.oscillator, silent)?;

        self.teardown_at = silent + CLEANUP_MARGIN;
        Ok(self.teardown_at)
    }

    /// Glide a sustained voice towards `frequency`, covering the distance in
    /// roughly `ramp` seconds. Transient voices are left alone.
    pub fn retune(
        &mut self,
        target: &dyn RenderTarget,
        now: f64,
        frequency: f32,
        ramp: f64,
    ) -> Result<(), TargetError> {
        if self.is_disposed() || self.spec.kind != VoiceKind::Sustained {
            return Ok(());
        }

        let osc = self.nodes.oscillator;
        target.schedule(osc, Param::Frequency, ParamChange::HoldAt(now))?;
        let change = if ramp > 0.0 {
            ParamChange::SetTarget {
                start: now,
                target: frequency,
                time_constant: time_constant(ramp),
            }
        } else {
            ParamChange::SetValue {
                at: now,
                value: frequency,
            }
        };
        target.schedule(osc, Param::Frequency, change)?;

        self.spec.frequency = frequency;
        Ok(())
    }
}

fn build(
    target: &dyn RenderTarget,
    output: NodeId,
    spec: &VoiceSpec,
    start: f64,
    created: &mut Vec<NodeId>,
) -> Result<VoiceNodes, TargetError> {
    let oscillator = target.create_oscillator(spec.waveform, spec.frequency)?;
    created.push(oscillator);
    let amplitude = target.create_gain(0.0)?;
    created.push(amplitude);
    let panner = target.create_panner(spec.pan)?;
    created.push(panner);

    let envelope = &spec.envelope;

    target.schedule(
        oscillator,
        Param::Frequency,
        ParamChange::SetValue {
            at: start,
            value: spec.frequency,
        },
    )?;
    if spec.kind == VoiceKind::Transient && spec.glide != 1.0 {
        target.schedule(
            oscillator,
            Param::Frequency,
            ParamChange::LinearRamp {
                end: start + envelope.attack(),
                value: spec.frequency * spec.glide,
            },
        )?;
    }

    for change in envelope.schedule(start) {
        target.schedule(amplitude, Param::Gain, change)?;
    }

    target.schedule(
        panner,
        Param::Pan,
        ParamChange::SetValue {
            at: start,
            value: spec.pan,
        },
    )?;
    if spec.kind == VoiceKind::Sustained {
        target.schedule(
            panner,
            Param::Pan,
            ParamChange::LinearRamp {
                end: envelope.stop_at(start),
                value: spec.pan_to,
            },
        )?;
    }

    target.start_node(oscillator, start)?;
    target.stop_node(oscillator, envelope.silent_at(start))?;

    target.connect(oscillator, amplitude)?;
    target.connect(amplitude, panner)?;
    target.connect(panner, output)?;

    Ok(VoiceNodes {
        oscillator,
        amplitude,
        panner,
    })
}
