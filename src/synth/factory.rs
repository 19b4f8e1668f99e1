use rand::{distributions::uniform::SampleUniform, rngs::StdRng, Rng};

use crate::{
    dsp::AmplitudeEnvelope,
    mood::EffectiveSettings,
    synth::voice::{VoiceKind, VoiceSpec},
};

/// Decides what each new voice sounds like.
///
/// This is the "instrument design" layer: the scheduler decides *when*, the
/// factory decides pitch, loudness, placement and envelope within the bounds
/// of the current effective settings.
pub trait VoiceFactory: Send {
    fn create_spec(&mut self, settings: &EffectiveSettings, rng: &mut StdRng) -> VoiceSpec;
}

impl<F> VoiceFactory for F
where
    F: FnMut(&EffectiveSettings, &mut StdRng) -> VoiceSpec + Send,
{
    fn create_spec(&mut self, settings: &EffectiveSettings, rng: &mut StdRng) -> VoiceSpec {
        self(settings, rng)
    }
}

/// Independent uniform draws for pitch (log scale), level and pan.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomVoices;

impl VoiceFactory for RandomVoices {
    fn create_spec(&mut self, settings: &EffectiveSettings, rng: &mut StdRng) -> VoiceSpec {
        let pitch_position: f32 = rng.gen();
        let peak = uniform(rng, settings.voice_gain_min, settings.voice_gain_max);
        let spread = settings.pan_spread;
        let pan = uniform(rng, -spread, spread);
        let pan_to = match settings.kind {
            VoiceKind::Transient => pan,
            VoiceKind::Sustained => uniform(rng, -spread, spread),
        };

        VoiceSpec {
            kind: settings.kind,
            waveform: settings.waveform,
            frequency: settings.frequency_at(pitch_position),
            glide: settings.glide,
            envelope: AmplitudeEnvelope::new(settings.attack, settings.release, peak),
            pan,
            pan_to,
            pitch_position,
        }
    }
}

/// Uniform draw from `[lo, hi]`; degenerate ranges return `lo`.
pub fn uniform<T>(rng: &mut impl Rng, lo: T, hi: T) -> T
where
    T: SampleUniform + PartialOrd + Copy,
{
    if lo < hi {
        rng.gen_range(lo..=hi)
    } else {
        lo
    }
}
