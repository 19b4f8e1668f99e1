use crate::{
    dsp::automation::{time_constant, ParamChange},
    MIN_TIME, RELEASE_TAIL, SILENCE_FLOOR,
};

/*
Percussive Amplitude Envelope
=============================

Every generated voice uses the same two-stage shape: a linear attack followed
immediately by an exponential decay. There is no sustain stage; ambient
voices are "struck" and left to ring out.

  Level
   peak ┐    ╱╲
        │   ╱  ╲
        │  ╱    ╲_
        │ ╱       ╲__
        │╱            ╲____
    0.0 └──────────────────╲──→ Time
        start  +attack      stop  +tail

Attack
------

  level(t) = peak * (t - start) / attack

Decay
-----

  level(t) = peak * e^(-(t - start - attack) / tau),   tau = release / 3

After `release` seconds the decay has fallen to e^-3 (~5%) of the peak. An
exponential never reaches zero, so at `stop = start + attack + release` the
residual is ramped linearly to exactly 0.0 over RELEASE_TAIL. This keeps the
curve free of steps (no click) while giving a hard instant after which the
voice is silent and its nodes can be torn down.

The Silence Floor
-----------------

Teardown is only ever scheduled at or after `silent_at()`, the end of the
tail. By then the level is 0.0, which is below SILENCE_FLOOR by construction.
*/

/// Attack/release/peak shape of a single voice.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AmplitudeEnvelope {
    attack: f64,
    release: f64,
    peak: f32,
}

impl AmplitudeEnvelope {
    pub fn new(attack: f64, release: f64, peak: f32) -> Self {
        Self {
            attack: attack.max(MIN_TIME),
            release: release.max(MIN_TIME),
            peak: peak.max(0.0),
        }
    }

    pub fn attack(&self) -> f64 {
        self.attack
    }

    pub fn release(&self) -> f64 {
        self.release
    }

    pub fn peak(&self) -> f32 {
        self.peak
    }

    /// Decay time constant.
    pub fn tau(&self) -> f64 {
        time_constant(self.release)
    }

    /// End of the exponential stage; always strictly after `start + attack`.
    pub fn stop_at(&self, start: f64) -> f64 {
        start + self.attack + self.release
    }

    /// Instant from which the voice is guaranteed silent.
    pub fn silent_at(&self, start: f64) -> f64 {
        self.stop_at(start) + RELEASE_TAIL
    }

    /// Level left when the exponential stage hands over to the tail.
    pub fn residual(&self) -> f32 {
        self.peak * (-self.release / self.tau()).exp() as f32
    }

    /// Analytic level at `t` for a voice started at `start`.
    pub fn value_at(&self, start: f64, t: f64) -> f32 {
        let attack_end = start + self.attack;
        let stop = self.stop_at(start);

        if t < start {
            0.0
        } else if t < attack_end {
            self.peak * ((t - start) / self.attack) as f32
        } else if t < stop {
            self.peak * (-(t - attack_end) / self.tau()).exp() as f32
        } else if t < stop + RELEASE_TAIL {
            self.residual() * (1.0 - ((t - stop) / RELEASE_TAIL) as f32)
        } else {
            0.0
        }
    }

    /// Whether the envelope has fallen below the silence floor at `t`.
    pub fn is_silent(&self, start: f64, t: f64) -> bool {
        t >= start + self.attack && self.value_at(start, t) < SILENCE_FLOOR
    }

    /// The same curve as automation events for a gain parameter.
    pub fn schedule(&self, start: f64) -> [ParamChange; 5] {
        let attack_end = start + self.attack;
        let stop = self.stop_at(start);
        [
            ParamChange::SetValue { at: start, value: 0.0 },
            ParamChange::LinearRamp {
                end: attack_end,
                value: self.peak,
            },
            ParamChange::SetTarget {
                start: attack_end,
                target: 0.0,
                time_constant: self.tau(),
            },
            ParamChange::SetValue {
                at: stop,
                value: self.residual(),
            },
            ParamChange::LinearRamp {
                end: stop + RELEASE_TAIL,
                value: 0.0,
            },
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::automation::ParamTimeline;

    #[test]
    fn attack_reaches_peak_linearly() {
        let env = AmplitudeEnvelope::new(0.1, 0.5, 0.8);
        assert_eq!(env.value_at(1.0, 0.5), 0.0);
        assert!((env.value_at(1.0, 1.05) - 0.4).abs() < 1e-4);
        assert!((env.value_at(1.0, 1.1) - 0.8).abs() < 1e-4);
    }

    #[test]
    fn decay_uses_a_third_of_release_as_time_constant() {
        let env = AmplitudeEnvelope::new(0.01, 0.6, 1.0);
        let at_one_tau = env.value_at(0.0, 0.01 + 0.2);
        assert!((at_one_tau - (-1.0f32).exp()).abs() < 1e-4);
        assert!((env.residual() - (-3.0f32).exp()).abs() < 1e-5);
    }

    #[test]
    fn silent_after_tail() {
        let env = AmplitudeEnvelope::new(0.02, 0.3, 0.9);
        let silent = env.silent_at(2.0);
        assert!(silent > env.stop_at(2.0));
        assert!(env.value_at(2.0, silent) < SILENCE_FLOOR);
        assert!(env.is_silent(2.0, silent + 0.001));
        assert!(!env.is_silent(2.0, 2.1));
    }

    #[test]
    fn stop_is_strictly_after_attack_even_for_zero_times() {
        let env = AmplitudeEnvelope::new(0.0, 0.0, 0.5);
        assert!(env.stop_at(0.0) > 0.0 + env.attack());
    }

    #[test]
    fn scheduled_events_match_analytic_curve() {
        let env = AmplitudeEnvelope::new(0.05, 0.4, 0.7);
        let start = 0.25;
        let mut timeline = ParamTimeline::new(0.0);
        for change in env.schedule(start) {
            timeline.apply(change);
        }

        let mut t = 0.0;
        while t < env.silent_at(start) + 0.1 {
            let expected = env.value_at(start, t);
            let actual = timeline.value_at(t);
            assert!(
                (expected - actual).abs() < 1e-4,
                "t={t}: expected {expected}, got {actual}"
            );
            t += 0.0025;
        }
    }
}
