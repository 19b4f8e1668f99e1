//! The shared generator behind every ambient module.
//!
//! A `Generator<V>` owns one scheduler, one voice registry and one task queue
//! per initialized instance. `V` only decides how settings are derived from a
//! mood; everything about timing, voice lifetime and teardown lives here.
//!
//! Signal path:
//!
//! ```text
//!   voice ─┐
//!   voice ─┼─▶ output stage (gain) ─▶ host output node
//!   voice ─┘
//! ```
//!
//! Module-level fades (play, stop, mood volume) are automation on the output
//! stage. Voice envelopes are automation on each voice's own gain.

use std::{marker::PhantomData, sync::Arc};

use rand::{rngs::StdRng, SeedableRng};
use tracing::{debug, error, info, warn};

use crate::{
    dsp::ParamChange,
    engine::{
        effective_start, EventScheduler, RegistryStats, ScheduleBounds, Task, TaskQueue,
        VoiceRegistry,
    },
    error::{AmbientError, InitFailure},
    io::{AudioClock, NodeId, Param, RenderTarget, TargetError},
    module::{
        AmbientModule, LatePolicy, StopPolicy, Voicing, PITCH_RAMP_FRACTION,
        VOLUME_RAMP_FRACTION,
    },
    mood::{EffectiveSettings, Mood, MoodConfig},
    synth::{RandomVoices, Voice, VoiceFactory, VoiceKind},
};

struct ModuleState {
    name: &'static str,
    target: Arc<dyn RenderTarget>,
    output_stage: NodeId,
    registry: VoiceRegistry,
    queue: TaskQueue,
    scheduler: EventScheduler,
    settings: EffectiveSettings,
    config: MoodConfig,
    playing: bool,
}

impl ModuleState {
    /// Move the output stage from wherever it is at `at` to `value`.
    fn ramp_output(&self, at: f64, duration: f64, value: f32) -> Result<(), TargetError> {
        let stage = self.output_stage;
        self.target
            .schedule(stage, Param::Gain, ParamChange::HoldAt(at))?;
        let change = if duration > 0.0 {
            ParamChange::LinearRamp {
                end: at + duration,
                value,
            }
        } else {
            ParamChange::SetValue { at, value }
        };
        self.target.schedule(stage, Param::Gain, change)
    }

    /// Cancel scheduling and fade the output to zero. Voices follow `policy`.
    fn silence(&mut self, at: f64, fade: f64, policy: StopPolicy) -> Result<(), TargetError> {
        self.scheduler.stop(&mut self.queue);
        self.playing = false;
        self.ramp_output(at, fade, 0.0)?;

        if let StopPolicy::ForceDecay { fade: voice_fade } = policy {
            let mut moved = Vec::with_capacity(self.registry.len());
            for voice in self.registry.iter_mut() {
                match voice.force_decay(&*self.target, at, voice_fade) {
                    Ok(teardown) => moved.push((voice.id(), teardown)),
                    Err(err) => {
                        warn!(module = self.name, voice = %voice.id(), error = %err, "forced decay failed")
                    }
                }
            }
            for (id, due) in moved {
                self.registry.reschedule_release(id, due, &mut self.queue);
            }
        }
        Ok(())
    }

    /// The clock went away underneath us: drop back to a clean stopped state.
    fn halt_closed(&mut self) {
        self.scheduler.stop(&mut self.queue);
        self.playing = false;
        let released = self.registry.release_all(&*self.target, &mut self.queue);
        let dropped = self.queue.clear();
        warn!(module = self.name, released, dropped, "audio clock closed, module stopped");
    }

    fn ensure_running(&mut self) -> Result<(), AmbientError> {
        if self.target.is_running() {
            return Ok(());
        }
        if self.playing || !self.registry.is_empty() || !self.queue.is_empty() {
            self.halt_closed();
        }
        Err(AmbientError::ClosedContext)
    }

    /// Run every task due on the audio clock.
    fn pump(
        &mut self,
        rng: &mut StdRng,
        factory: &mut dyn VoiceFactory,
        late: LatePolicy,
    ) -> Result<(), AmbientError> {
        let now = self.target.current_time();
        while let Some((_, task)) = self.queue.pop_due(now) {
            match task {
                Task::Release(id) => {
                    self.registry.release_one(id, &*self.target, &mut self.queue);
                }
                Task::Cycle {
                    scheduled,
                    generation,
                } => {
                    if self.scheduler.fire(scheduled, generation) {
                        self.run_cycle(now, scheduled, rng, factory, late)?;
                    }
                }
            }
        }
        for voice in self.registry.iter_mut() {
            voice.sync(now);
        }
        Ok(())
    }

    fn run_cycle(
        &mut self,
        now: f64,
        scheduled: f64,
        rng: &mut StdRng,
        factory: &mut dyn VoiceFactory,
        late: LatePolicy,
    ) -> Result<(), AmbientError> {
        let bounds = ScheduleBounds::from(&self.settings);
        let lag = now - scheduled;

        if late.is_stale(lag) {
            debug!(module = self.name, lag, "skipping stale event");
            self.scheduler.skip_to(now);
        } else {
            let offsets = bounds.plan_cluster(rng);
            debug!(module = self.name, at = scheduled, voices = offsets.len(), "event");
            for offset in offsets {
                self.emit(now, offset, rng, factory)?;
            }
        }

        self.scheduler.arm(&mut self.queue, rng, &bounds);
        Ok(())
    }

    /// Create and register one voice. Only a closed target is fatal; any
    /// other failure costs this voice and nothing else.
    fn emit(
        &mut self,
        now: f64,
        offset: f64,
        rng: &mut StdRng,
        factory: &mut dyn VoiceFactory,
    ) -> Result<(), AmbientError> {
        let id = self.registry.allocate_id();
        let spec = factory.create_spec(&self.settings, rng);
        let start = effective_start(now, offset);

        match Voice::create(&*self.target, self.output_stage, id, spec, start) {
            Ok(voice) => {
                if let Err(err) = self.registry.register(voice, &*self.target, &mut self.queue) {
                    warn!(module = self.name, error = %err, "voice dropped");
                }
                Ok(())
            }
            Err(AmbientError::VoiceCreation {
                source: TargetError::Closed,
                ..
            }) => Err(AmbientError::SchedulingCallback(TargetError::Closed)),
            Err(err) => {
                warn!(module = self.name, error = %err, "voice skipped");
                Ok(())
            }
        }
    }
}

fn build_output_stage(target: &dyn RenderTarget, output: NodeId) -> Result<NodeId, TargetError> {
    let stage = target.create_gain(0.0)?;
    if let Err(err) = target.connect(stage, output) {
        if let Err(cleanup) = target.disconnect(stage) {
            warn!(node = %stage, error = %cleanup, "failed to release output stage");
        }
        return Err(err);
    }
    Ok(stage)
}

/// An ambient module whose sound is chosen by `V`.
pub struct Generator<V> {
    factory: Box<dyn VoiceFactory>,
    stop_policy: StopPolicy,
    late_policy: LatePolicy,
    rng: StdRng,
    state: Option<ModuleState>,
    /// Counters of registries already disposed.
    retired: RegistryStats,
    voicing: PhantomData<fn() -> V>,
}

impl<V: Voicing> Default for Generator<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Voicing> Generator<V> {
    pub fn new() -> Self {
        Self {
            factory: Box::new(RandomVoices),
            stop_policy: StopPolicy::default(),
            late_policy: LatePolicy::default(),
            rng: StdRng::from_entropy(),
            state: None,
            retired: RegistryStats::default(),
            voicing: PhantomData,
        }
    }

    /// Reproducible randomness for timing and voice design.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn with_factory(mut self, factory: impl VoiceFactory + 'static) -> Self {
        self.factory = Box::new(factory);
        self
    }

    pub fn with_stop_policy(mut self, policy: StopPolicy) -> Self {
        self.stop_policy = policy;
        self
    }

    pub fn with_late_policy(mut self, policy: LatePolicy) -> Self {
        self.late_policy = policy;
        self
    }

    pub fn stop_policy(&self) -> StopPolicy {
        self.stop_policy
    }

    pub fn late_policy(&self) -> LatePolicy {
        self.late_policy
    }

    /// Intended instant of the most recent event; `None` unless playing.
    pub fn next_event_instant(&self) -> Option<f64> {
        self.state
            .as_ref()
            .filter(|state| state.playing)
            .map(|state| state.scheduler.next_event_instant())
    }

    /// Lifetime counters across every `init`.
    pub fn voice_stats(&self) -> RegistryStats {
        let current = self
            .state
            .as_ref()
            .map(|state| state.registry.stats())
            .unwrap_or_default();
        RegistryStats {
            registered: self.retired.registered + current.registered,
            disposed: self.retired.disposed + current.disposed,
        }
    }

    pub fn voices(&self) -> impl Iterator<Item = &Voice> + '_ {
        self.state.iter().flat_map(|state| state.registry.iter())
    }

    pub fn mood_config(&self) -> Option<MoodConfig> {
        self.state.as_ref().map(|state| state.config)
    }

    pub fn output_stage(&self) -> Option<NodeId> {
        self.state.as_ref().map(|state| state.output_stage)
    }
}

impl<V: Voicing> AmbientModule for Generator<V> {
    fn name(&self) -> &str {
        V::NAME
    }

    fn init(
        &mut self,
        target: Arc<dyn RenderTarget>,
        output: NodeId,
        mood: &Mood,
        config: MoodConfig,
    ) -> Result<(), AmbientError> {
        if self.state.is_some() {
            self.dispose();
        }
        if !target.is_running() {
            return Err(InitFailure::ClockUnavailable.into());
        }
        if !target.contains(output) {
            return Err(InitFailure::MissingOutput(output).into());
        }

        let output_stage = build_output_stage(&*target, output).map_err(InitFailure::OutputStage)?;
        let settings = V::effective(mood, &config);
        self.state = Some(ModuleState {
            name: V::NAME,
            target,
            output_stage,
            registry: VoiceRegistry::new(),
            queue: TaskQueue::new(),
            scheduler: EventScheduler::new(),
            settings,
            config,
            playing: false,
        });

        info!(module = V::NAME, mood = %mood.name, "initialized");
        Ok(())
    }

    fn update(&mut self, _time: f64, _delta_time: f64) {
        let Some(state) = self.state.as_mut() else {
            return;
        };
        if state.ensure_running().is_err() {
            return;
        }
        if let Err(err) = state.pump(&mut self.rng, &mut *self.factory, self.late_policy) {
            error!(module = V::NAME, error = %err, "scheduling callback failed, halting playback");
            if !state.target.is_running() {
                state.halt_closed();
                return;
            }
            let at = state.target.current_time();
            let fade = state.settings.module_release;
            if let Err(err) = state.silence(at, fade, self.stop_policy) {
                warn!(module = V::NAME, error = %err, "failed to fade out halted module");
            }
        }
    }

    fn play(&mut self, start: f64) -> Result<(), AmbientError> {
        let Some(state) = self.state.as_mut() else {
            debug!(module = V::NAME, "play ignored, not initialized");
            return Ok(());
        };
        if state.playing {
            return Ok(());
        }
        state.ensure_running()?;

        let now = state.target.current_time();
        let at = start.max(now);
        state.ramp_output(at, state.settings.module_attack, state.settings.output_gain)?;
        state.scheduler.start(now, at);
        let bounds = ScheduleBounds::from(&state.settings);
        let first = state.scheduler.arm(&mut state.queue, &mut self.rng, &bounds);
        state.playing = true;

        info!(module = V::NAME, at, first_event = first, "playing");
        Ok(())
    }

    fn stop(&mut self, stop: f64, fade_hint: Option<f64>) -> Result<(), AmbientError> {
        let Some(state) = self.state.as_mut() else {
            return Ok(());
        };
        if !state.playing {
            return Ok(());
        }
        state.ensure_running()?;

        let at = stop.max(state.target.current_time());
        let fade = fade_hint.unwrap_or(state.settings.module_release).max(0.0);
        state.silence(at, fade, self.stop_policy)?;

        info!(module = V::NAME, at, fade, ringing = state.registry.len(), "stopped");
        Ok(())
    }

    fn change_mood(
        &mut self,
        mood: &Mood,
        transition: f64,
        config: MoodConfig,
    ) -> Result<(), AmbientError> {
        let Some(state) = self.state.as_mut() else {
            debug!(module = V::NAME, "mood change ignored, not initialized");
            return Ok(());
        };
        state.ensure_running()?;

        let transition = transition.max(0.0);
        let now = state.target.current_time();
        let settings = V::effective(mood, &config);
        state.settings = settings;
        state.config = config;

        if state.playing {
            state.ramp_output(now, transition * VOLUME_RAMP_FRACTION, settings.output_gain)?;
        }

        let ramp = transition * PITCH_RAMP_FRACTION;
        let mut retuned = 0;
        for voice in state
            .registry
            .iter_mut()
            .filter(|voice| voice.kind() == VoiceKind::Sustained && !voice.is_disposed())
        {
            let frequency = settings.frequency_at(voice.spec().pitch_position);
            match voice.retune(&*state.target, now, frequency, ramp) {
                Ok(()) => retuned += 1,
                Err(err) => {
                    warn!(module = V::NAME, voice = %voice.id(), error = %err, "retune failed")
                }
            }
        }

        info!(module = V::NAME, mood = %mood.name, transition, retuned, "mood changed");
        Ok(())
    }

    fn dispose(&mut self) {
        let Some(mut state) = self.state.take() else {
            return;
        };
        state.scheduler.stop(&mut state.queue);
        let released = state.registry.release_all(&*state.target, &mut state.queue);
        let dropped = state.queue.clear();
        if let Err(err) = state.target.disconnect(state.output_stage) {
            warn!(module = V::NAME, node = %state.output_stage, error = %err, "failed to disconnect output stage");
        }

        let stats = state.registry.stats();
        self.retired.registered += stats.registered;
        self.retired.disposed += stats.disposed;
        info!(module = V::NAME, released, dropped, "disposed");
    }

    fn is_enabled(&self) -> bool {
        self.state.is_some()
    }

    fn is_playing(&self) -> bool {
        self.state.as_ref().is_some_and(|state| state.playing)
    }

    fn live_voices(&self) -> usize {
        self.state.as_ref().map_or(0, |state| state.registry.len())
    }

    fn effective_settings(&self) -> Option<EffectiveSettings> {
        self.state.as_ref().map(|state| state.settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        dsp::OscillatorWaveform,
        graph::OfflineGraph,
        module::{ChirpModule, DroneModule},
        mood::{ChirpSettings, DroneSettings},
        synth::VoiceSpec,
    };

    const SR: f32 = 8_000.0;
    const FRAME: f64 = 1.0 / 60.0;

    fn init<V: Voicing>(module: &mut Generator<V>, mood: &Mood) -> Arc<OfflineGraph> {
        let graph = Arc::new(OfflineGraph::new(SR));
        module
            .init(graph.clone(), graph.destination(), mood, MoodConfig::default())
            .unwrap();
        graph
    }

    fn run(module: &mut dyn AmbientModule, graph: &OfflineGraph, seconds: f64) {
        let end = graph.current_time() + seconds;
        while graph.current_time() < end {
            graph.advance(FRAME);
            module.update(graph.current_time(), FRAME);
        }
    }

    fn busy_chirps() -> Mood {
        Mood::named("busy").with_chirps(ChirpSettings {
            chirp_interval_min: 0.25,
            chirp_interval_max: 0.5,
            ..ChirpSettings::default()
        })
    }

    /// A target whose clock keeps running but which refuses oscillators as
    /// if it had been closed.
    struct NoOscillators(OfflineGraph);

    impl AudioClock for NoOscillators {
        fn current_time(&self) -> f64 {
            self.0.current_time()
        }

        fn is_running(&self) -> bool {
            self.0.is_running()
        }
    }

    impl RenderTarget for NoOscillators {
        fn contains(&self, node: NodeId) -> bool {
            self.0.contains(node)
        }

        fn create_oscillator(&self, _: OscillatorWaveform, _: f32) -> Result<NodeId, TargetError> {
            Err(TargetError::Closed)
        }

        fn create_gain(&self, gain: f32) -> Result<NodeId, TargetError> {
            self.0.create_gain(gain)
        }

        fn create_panner(&self, pan: f32) -> Result<NodeId, TargetError> {
            self.0.create_panner(pan)
        }

        fn schedule(
            &self,
            node: NodeId,
            param: Param,
            change: ParamChange,
        ) -> Result<(), TargetError> {
            self.0.schedule(node, param, change)
        }

        fn start_node(&self, node: NodeId, at: f64) -> Result<(), TargetError> {
            self.0.start_node(node, at)
        }

        fn stop_node(&self, node: NodeId, at: f64) -> Result<(), TargetError> {
            self.0.stop_node(node, at)
        }

        fn connect(&self, from: NodeId, to: NodeId) -> Result<(), TargetError> {
            self.0.connect(from, to)
        }

        fn disconnect(&self, node: NodeId) -> Result<(), TargetError> {
            self.0.disconnect(node)
        }
    }

    fn quick_drone() -> Mood {
        Mood::named("quick").with_drone(DroneSettings {
            swell_interval_min: 0.2,
            swell_interval_max: 0.4,
            swell_attack: Some(0.5),
            swell_release: Some(2.0),
            ..DroneSettings::default()
        })
    }

    #[test]
    fn init_builds_a_silent_output_stage() {
        let mut module = ChirpModule::new().with_seed(1);
        let graph = init(&mut module, &Mood::default());

        assert!(module.is_enabled());
        assert!(!module.is_playing());
        assert_eq!(graph.node_count(), 1);
        let stage = module.output_stage().unwrap();
        assert_eq!(graph.param_value(stage, Param::Gain), Some(0.0));
    }

    #[test]
    fn init_failures_leave_nothing_behind() {
        let graph = Arc::new(OfflineGraph::new(SR));
        let mut module = ChirpModule::new();

        let err = module
            .init(graph.clone(), NodeId(999), &Mood::default(), MoodConfig::default())
            .unwrap_err();
        assert_eq!(err, AmbientError::from(InitFailure::MissingOutput(NodeId(999))));

        graph.set_creation_budget(Some(0));
        let err = module
            .init(graph.clone(), graph.destination(), &Mood::default(), MoodConfig::default())
            .unwrap_err();
        assert_eq!(
            err,
            AmbientError::from(InitFailure::OutputStage(TargetError::ResourceExhausted("gain")))
        );

        graph.close();
        let err = module
            .init(graph.clone(), graph.destination(), &Mood::default(), MoodConfig::default())
            .unwrap_err();
        assert_eq!(err, AmbientError::from(InitFailure::ClockUnavailable));

        assert!(!module.is_enabled());
        assert_eq!(graph.node_count(), 0);
    }

    #[test]
    fn reinit_disposes_the_previous_instance() {
        let mut module = ChirpModule::new().with_seed(2);
        let graph = init(&mut module, &busy_chirps());
        module.play(0.0).unwrap();
        run(&mut module, &graph, 1.0);

        module
            .init(graph.clone(), graph.destination(), &busy_chirps(), MoodConfig::default())
            .unwrap();
        assert_eq!(graph.node_count(), 1);
        assert!(!module.is_playing());
        let stats = module.voice_stats();
        assert_eq!(stats.registered, stats.disposed);
    }

    #[test]
    fn play_is_a_noop_when_disabled_or_playing() {
        let mut module = ChirpModule::new();
        module.play(0.0).unwrap();
        assert!(!module.is_playing());

        let _graph = init(&mut module, &Mood::default());
        module.play(0.0).unwrap();
        let first = module.next_event_instant();
        module.play(5.0).unwrap();
        assert_eq!(module.next_event_instant(), first);
    }

    #[test]
    fn chirps_fire_clusters_and_release_them() {
        let mut module = ChirpModule::new().with_seed(3);
        let graph = init(&mut module, &busy_chirps());
        module.play(0.0).unwrap();

        run(&mut module, &graph, 0.6);
        assert!(module.voice_stats().registered >= 1);

        module.stop(graph.current_time(), Some(0.1)).unwrap();
        run(&mut module, &graph, 2.0);
        assert_eq!(module.live_voices(), 0);
        let stats = module.voice_stats();
        assert_eq!(stats.registered, stats.disposed);
        assert_eq!(graph.node_count(), 1, "only the output stage remains");
    }

    #[test]
    fn nothing_is_registered_after_stop() {
        let mut module = ChirpModule::new().with_seed(4);
        let graph = init(&mut module, &busy_chirps());
        module.play(0.0).unwrap();
        run(&mut module, &graph, 1.0);

        module.stop(graph.current_time(), None).unwrap();
        let registered = module.voice_stats().registered;
        run(&mut module, &graph, 3.0);
        assert_eq!(module.voice_stats().registered, registered);
        assert_eq!(module.next_event_instant(), None);
    }

    #[test]
    fn forced_decay_clears_ringing_voices_quickly() {
        let mut module = DroneModule::new()
            .with_seed(5)
            .with_stop_policy(StopPolicy::force_decay());
        let graph = init(&mut module, &quick_drone());
        module.play(0.0).unwrap();
        run(&mut module, &graph, 1.0);
        assert!(module.live_voices() > 0);

        module.stop(graph.current_time(), Some(0.05)).unwrap();
        run(&mut module, &graph, 0.2);
        assert_eq!(module.live_voices(), 0);
    }

    #[test]
    fn let_ring_keeps_voices_until_their_natural_end() {
        let mut module = DroneModule::new().with_seed(5);
        let graph = init(&mut module, &quick_drone());
        module.play(0.0).unwrap();
        run(&mut module, &graph, 1.0);
        let ringing = module.live_voices();
        assert!(ringing > 0);

        module.stop(graph.current_time(), Some(0.05)).unwrap();
        run(&mut module, &graph, 0.2);
        assert_eq!(module.live_voices(), ringing);
    }

    #[test]
    fn failed_voices_do_not_stop_the_module() {
        let mut module = ChirpModule::new().with_seed(6);
        let graph = init(&mut module, &busy_chirps());
        graph.set_creation_budget(Some(4));
        module.play(0.0).unwrap();
        run(&mut module, &graph, 2.0);

        assert!(module.is_playing());
        assert!(module.voice_stats().registered <= 1);
        assert_eq!(graph.node_count(), 1 + 3 * module.live_voices());
    }

    #[test]
    fn closed_clock_stops_the_module() {
        let mut module = ChirpModule::new().with_seed(7);
        let graph = init(&mut module, &busy_chirps());
        module.play(0.0).unwrap();
        run(&mut module, &graph, 1.0);

        graph.close();
        module.update(graph.current_time(), FRAME);
        assert!(!module.is_playing());
        assert_eq!(module.live_voices(), 0);

        assert_eq!(module.play(0.0), Err(AmbientError::ClosedContext));
        assert_eq!(
            module.change_mood(&Mood::bright(), 1.0, MoodConfig::default()),
            Err(AmbientError::ClosedContext)
        );
        assert!(!module.is_playing());
    }

    #[test]
    fn stalled_host_skips_stale_events() {
        let mut module = ChirpModule::new().with_seed(8);
        let graph = init(&mut module, &busy_chirps());
        module.play(0.0).unwrap();

        graph.advance(3.0);
        module.update(graph.current_time(), 3.0);
        assert_eq!(module.voice_stats().registered, 0);
        assert!(module.next_event_instant().unwrap() >= 3.0 - 1e-9);
    }

    #[test]
    fn mood_change_retunes_sustained_voices() {
        let mut module = DroneModule::new().with_seed(9);
        let graph = init(&mut module, &quick_drone());
        module.play(0.0).unwrap();
        run(&mut module, &graph, 1.0);

        let mut higher = quick_drone();
        higher.profile.pitch = 2.0;
        module.change_mood(&higher, 0.3, MoodConfig::default()).unwrap();
        let settings = module.effective_settings().unwrap();

        for voice in module.voices() {
            let expected = settings.frequency_at(voice.spec().pitch_position);
            assert!((voice.spec().frequency - expected).abs() < 1e-3);
        }

        let sample: Vec<_> = module
            .voices()
            .map(|v| (v.nodes().oscillator, v.spec().frequency))
            .collect();
        run(&mut module, &graph, 0.5);
        for (osc, target) in sample {
            if let Some(freq) = graph.param_value(osc, Param::Frequency) {
                assert!((freq - target).abs() / target < 0.05, "{freq} vs {target}");
            }
        }
    }

    #[test]
    fn dispose_is_idempotent() {
        let mut module = DroneModule::new().with_seed(10);
        let graph = init(&mut module, &quick_drone());
        module.play(0.0).unwrap();
        run(&mut module, &graph, 1.0);

        module.dispose();
        module.dispose();
        assert!(!module.is_enabled());
        assert_eq!(graph.node_count(), 0);
        let stats = module.voice_stats();
        assert_eq!(stats.registered, stats.disposed);
    }

    #[test]
    fn play_fades_the_output_stage_in() {
        let mut module = ChirpModule::new().with_seed(12);
        let graph = init(&mut module, &Mood::default());
        let stage = module.output_stage().unwrap();
        let settings = module.effective_settings().unwrap();
        assert!(settings.module_attack > 0.0 && settings.output_gain > 0.0);

        module.play(0.0).unwrap();
        graph.advance(settings.module_attack / 2.0);
        let half = graph.param_value(stage, Param::Gain).unwrap();
        assert!((half - settings.output_gain / 2.0).abs() < 1e-3, "{half}");

        graph.advance(settings.module_attack / 2.0);
        let full = graph.param_value(stage, Param::Gain).unwrap();
        assert!((full - settings.output_gain).abs() < 1e-6, "{full}");
    }

    #[test]
    fn mood_change_ramps_the_output_level() {
        let mut module = ChirpModule::new().with_seed(13);
        let graph = init(&mut module, &Mood::default());
        let stage = module.output_stage().unwrap();
        module.play(0.0).unwrap();
        let before = module.effective_settings().unwrap();
        graph.advance(before.module_attack + 0.5);

        let quiet = MoodConfig::new(0.0, 100.0, 100.0);
        let transition = 2.0;
        module.change_mood(&Mood::default(), transition, quiet).unwrap();
        let after = module.effective_settings().unwrap().output_gain;
        assert!(after < before.output_gain);
        assert_eq!(module.mood_config(), Some(quiet));

        let ramp = transition * VOLUME_RAMP_FRACTION;
        graph.advance(ramp / 2.0);
        let mid = graph.param_value(stage, Param::Gain).unwrap();
        let expected = (before.output_gain + after) / 2.0;
        assert!((mid - expected).abs() < 1e-3, "{mid} vs {expected}");

        graph.advance(ramp / 2.0);
        let end = graph.param_value(stage, Param::Gain).unwrap();
        assert!((end - after).abs() < 1e-6, "{end}");
    }

    #[test]
    fn output_automation_stays_bounded_across_mood_changes() {
        let mut module = ChirpModule::new().with_seed(14);
        let graph = init(&mut module, &Mood::default());
        let stage = module.output_stage().unwrap();
        module.play(0.0).unwrap();

        for _ in 0..2_000 {
            graph.advance(0.0005);
            module.change_mood(&Mood::calm(), 1.0, MoodConfig::default()).unwrap();
        }
        graph.advance(0.0005);
        let pending = graph.automation_len(stage, Param::Gain).unwrap();
        assert!(pending <= 3, "{pending} events on the output stage");
    }

    #[test]
    fn closed_voice_creation_halts_playback() {
        let target = Arc::new(NoOscillators(OfflineGraph::new(SR)));
        let graph = &target.0;
        let mut module = ChirpModule::new().with_seed(15);
        module
            .init(target.clone(), graph.destination(), &busy_chirps(), MoodConfig::default())
            .unwrap();
        module.play(0.0).unwrap();

        while module.is_playing() && graph.current_time() < 2.0 {
            graph.advance(FRAME);
            module.update(graph.current_time(), FRAME);
        }
        assert!(!module.is_playing(), "scheduling failure stops the module");
        assert!(module.is_enabled());
        assert_eq!(module.voice_stats().registered, 0);
        assert_eq!(graph.node_count(), 1, "no partial voices left behind");
        assert_eq!(module.next_event_instant(), None);

        let release = module.effective_settings().unwrap().module_release;
        graph.advance(release + 0.1);
        let stage = module.output_stage().unwrap();
        assert_eq!(graph.param_value(stage, Param::Gain), Some(0.0));
    }

    #[test]
    fn emit_policy_plays_late_events() {
        let mut module = ChirpModule::new()
            .with_seed(8)
            .with_late_policy(LatePolicy::Emit);
        assert_eq!(module.late_policy(), LatePolicy::Emit);
        let graph = init(&mut module, &busy_chirps());
        module.play(0.0).unwrap();

        graph.advance(3.0);
        module.update(graph.current_time(), 3.0);
        assert!(module.voice_stats().registered > 1);
        assert!(module.voices().all(|v| v.start() >= 3.0));
    }

    #[test]
    fn custom_factory_designs_every_voice() {
        let mut module = ChirpModule::new()
            .with_seed(16)
            .with_factory(|settings: &EffectiveSettings, rng: &mut StdRng| VoiceSpec {
                frequency: 1_000.0,
                ..RandomVoices.create_spec(settings, rng)
            });
        assert_eq!(module.stop_policy(), StopPolicy::LetRing);
        let graph = init(&mut module, &busy_chirps());
        module.play(0.0).unwrap();
        run(&mut module, &graph, 1.0);

        assert!(module.voice_stats().registered >= 1);
        assert!(module.voices().all(|v| v.spec().frequency == 1_000.0));
    }
}
