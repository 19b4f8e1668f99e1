//! Control-thread cost of one frame: render ~16ms of audio, then pump.

use std::{hint::black_box, sync::Arc};

use ambient_dsp::{
    module::{ChirpModule, DroneModule},
    Mood, MoodConfig, OfflineGraph, Soundscape,
};
use criterion::Criterion;

use crate::SAMPLE_RATE;

const FRAME: f64 = 1.0 / 60.0;

pub fn bench_soundscape(c: &mut Criterion) {
    let mut group = c.benchmark_group("scenarios/soundscape");

    for name in Mood::PRESETS {
        let Some(mood) = Mood::preset(name) else {
            continue;
        };
        let graph = Arc::new(OfflineGraph::new(SAMPLE_RATE));
        let mut scene = Soundscape::new(graph.clone(), graph.destination())
            .module("drone", DroneModule::new().with_seed(1), 0.0)
            .module("chirps", ChirpModule::new().with_seed(2), 0.0);
        scene.init(&mood, MoodConfig::default());
        scene.play(0.0);

        group.bench_function(name, |b| {
            b.iter(|| {
                black_box(graph.advance(FRAME));
                scene.update(FRAME);
            })
        });
        scene.dispose();
    }

    group.finish();
}
