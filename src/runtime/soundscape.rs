use std::sync::Arc;

use tracing::{info, warn};

use crate::{
    io::{AudioClock, NodeId, RenderTarget},
    module::{AmbientModule, ChirpModule, DroneModule},
    mood::{Mood, MoodConfig},
};

/// Occurrence the built-in chirp layer needs before it joins in.
pub const CHIRP_THRESHOLD: f32 = 25.0;

struct Slot {
    name: String,
    module: Box<dyn AmbientModule>,
    /// Lowest occurrence at which this module plays.
    min_occurrence: f32,
}

impl Slot {
    fn gate_open(&self, config: &MoodConfig) -> bool {
        config.occurrence() >= self.min_occurrence
    }
}

/// A scene of ambient modules sharing one render target.
pub struct Soundscape {
    target: Arc<dyn RenderTarget>,
    output: NodeId,
    slots: Vec<Slot>,
    mood: Mood,
    config: MoodConfig,
    playing: bool,
}

impl Soundscape {
    pub fn new(target: Arc<dyn RenderTarget>, output: NodeId) -> Self {
        Self {
            target,
            output,
            slots: Vec::new(),
            mood: Mood::default(),
            config: MoodConfig::default(),
            playing: false,
        }
    }

    /// A drone bed that always plays, with chirps above a low occurrence.
    pub fn ambience(target: Arc<dyn RenderTarget>, output: NodeId) -> Self {
        Self::new(target, output)
            .module("drone", DroneModule::new(), 0.0)
            .module("chirps", ChirpModule::new(), CHIRP_THRESHOLD)
    }

    /// Add a module that plays while occurrence is at least `min_occurrence`.
    pub fn module(
        mut self,
        name: &str,
        module: impl AmbientModule + 'static,
        min_occurrence: f32,
    ) -> Self {
        self.slots.push(Slot {
            name: name.to_string(),
            module: Box::new(module),
            min_occurrence,
        });
        self
    }

    /// Initialize every module; returns how many came up enabled.
    pub fn init(&mut self, mood: &Mood, config: MoodConfig) -> usize {
        self.mood = mood.clone();
        self.config = config;
        self.playing = false;

        let mut enabled = 0;
        for slot in &mut self.slots {
            match slot
                .module
                .init(self.target.clone(), self.output, mood, config)
            {
                Ok(()) => enabled += 1,
                Err(err) => warn!(module = %slot.name, error = %err, "module failed to initialize"),
            }
        }
        info!(mood = %mood.name, enabled, total = self.slots.len(), "soundscape initialized");
        enabled
    }

    /// Start every module whose occurrence gate is open.
    pub fn play(&mut self, at: f64) {
        self.playing = true;
        let config = self.config;
        for slot in self.slots.iter_mut().filter(|slot| slot.gate_open(&config)) {
            if let Err(err) = slot.module.play(at) {
                warn!(module = %slot.name, error = %err, "play failed");
            }
        }
    }

    pub fn stop(&mut self, at: f64, fade: Option<f64>) {
        self.playing = false;
        for slot in &mut self.slots {
            if let Err(err) = slot.module.stop(at, fade) {
                warn!(module = %slot.name, error = %err, "stop failed");
            }
        }
    }

    /// Retarget every module. While the scene plays, modules whose gate
    /// changed are started or faded out over the transition.
    pub fn change_mood(&mut self, mood: &Mood, transition: f64, config: MoodConfig) {
        self.mood = mood.clone();
        self.config = config;
        let now = self.target.current_time();
        let fade = (transition > 0.0).then_some(transition);

        for slot in &mut self.slots {
            if let Err(err) = slot.module.change_mood(mood, transition, config) {
                warn!(module = %slot.name, error = %err, "mood change failed");
                continue;
            }
            if !self.playing {
                continue;
            }

            let result = match (slot.gate_open(&config), slot.module.is_playing()) {
                (true, false) => slot.module.play(now),
                (false, true) => slot.module.stop(now, fade),
                _ => Ok(()),
            };
            if let Err(err) = result {
                warn!(module = %slot.name, error = %err, "occurrence change failed");
            }
        }
        info!(mood = %mood.name, occurrence = config.occurrence(), transition, "soundscape mood changed");
    }

    /// Per-frame pump.
    pub fn update(&mut self, delta_time: f64) {
        let time = self.target.current_time();
        for slot in &mut self.slots {
            slot.module.update(time, delta_time);
        }
    }

    pub fn dispose(&mut self) {
        self.playing = false;
        for slot in &mut self.slots {
            slot.module.dispose();
        }
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn mood(&self) -> &Mood {
        &self.mood
    }

    pub fn config(&self) -> MoodConfig {
        self.config
    }

    pub fn modules(&self) -> impl Iterator<Item = (&str, &dyn AmbientModule)> + '_ {
        self.slots
            .iter()
            .map(|slot| (slot.name.as_str(), slot.module.as_ref()))
    }

    pub fn get(&self, name: &str) -> Option<&dyn AmbientModule> {
        self.modules()
            .find(|(slot_name, _)| *slot_name == name)
            .map(|(_, module)| module)
    }

    /// Voices alive across every module.
    pub fn live_voices(&self) -> usize {
        self.slots.iter().map(|slot| slot.module.live_voices()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::OfflineGraph;

    fn scene(graph: &Arc<OfflineGraph>) -> Soundscape {
        Soundscape::new(graph.clone(), graph.destination())
            .module("drone", DroneModule::new().with_seed(1), 0.0)
            .module("chirps", ChirpModule::new().with_seed(2), 50.0)
    }

    fn playing(scene: &Soundscape, name: &str) -> bool {
        scene.get(name).is_some_and(|m| m.is_playing())
    }

    #[test]
    fn occurrence_gates_modules_on_play() {
        let graph = Arc::new(OfflineGraph::new(8_000.0));
        let mut scene = scene(&graph);
        assert_eq!(scene.init(&Mood::calm(), MoodConfig::new(100.0, 20.0, 50.0)), 2);

        scene.play(0.0);
        assert!(playing(&scene, "drone"));
        assert!(!playing(&scene, "chirps"));
    }

    #[test]
    fn crossing_the_threshold_starts_and_stops_modules() {
        let graph = Arc::new(OfflineGraph::new(8_000.0));
        let mut scene = scene(&graph);
        scene.init(&Mood::calm(), MoodConfig::new(100.0, 20.0, 50.0));
        scene.play(0.0);

        scene.change_mood(&Mood::bright(), 1.0, MoodConfig::new(100.0, 80.0, 50.0));
        assert!(playing(&scene, "chirps"));

        scene.change_mood(&Mood::calm(), 1.0, MoodConfig::new(100.0, 10.0, 50.0));
        assert!(!playing(&scene, "chirps"));
        assert!(playing(&scene, "drone"));
    }

    #[test]
    fn mood_changes_while_stopped_do_not_start_anything() {
        let graph = Arc::new(OfflineGraph::new(8_000.0));
        let mut scene = scene(&graph);
        scene.init(&Mood::calm(), MoodConfig::default());
        scene.change_mood(&Mood::tense(), 0.5, MoodConfig::default());

        assert!(!scene.is_playing());
        assert!(scene.modules().all(|(_, m)| !m.is_playing()));
        assert_eq!(scene.mood().name, "tense");
    }

    #[test]
    fn init_failures_are_contained() {
        let graph = Arc::new(OfflineGraph::new(8_000.0));
        let mut scene = Soundscape::new(graph.clone(), NodeId(42))
            .module("drone", DroneModule::new(), 0.0);
        assert_eq!(scene.init(&Mood::calm(), MoodConfig::default()), 0);
        scene.play(0.0);
        assert!(scene.modules().all(|(_, m)| !m.is_enabled()));
    }
}
