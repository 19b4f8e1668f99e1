use crate::{
    module::{generator::Generator, Voicing},
    mood::{EffectiveSettings, Mood, MoodConfig},
};

/// Short rising sine chirps fired in small clusters.
#[derive(Debug, Clone, Copy, Default)]
pub struct Chirps;

impl Voicing for Chirps {
    const NAME: &'static str = "chirps";

    fn effective(mood: &Mood, config: &MoodConfig) -> EffectiveSettings {
        mood.chirps.effective(&mood.profile, config)
    }
}

pub type ChirpModule = Generator<Chirps>;
