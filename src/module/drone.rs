use crate::{
    module::{generator::Generator, Voicing},
    mood::{EffectiveSettings, Mood, MoodConfig},
};

/// Slow overlapping swells around a base pitch.
#[derive(Debug, Clone, Copy, Default)]
pub struct Drone;

impl Voicing for Drone {
    const NAME: &'static str = "drone";

    fn effective(mood: &Mood, config: &MoodConfig) -> EffectiveSettings {
        mood.drone.effective(&mood.profile, config)
    }
}

pub type DroneModule = Generator<Drone>;
