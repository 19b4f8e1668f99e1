//! Rendering a graph full of sounding voices, as the audio callback does.

use std::hint::black_box;

use ambient_dsp::{
    dsp::{AmplitudeEnvelope, OscillatorWaveform},
    synth::{Voice, VoiceId, VoiceKind, VoiceSpec},
    OfflineGraph,
};
use criterion::{BenchmarkId, Criterion};

use crate::{BLOCK_SIZES, SAMPLE_RATE};

fn populated(voices: u64) -> OfflineGraph {
    let graph = OfflineGraph::new(SAMPLE_RATE);
    for id in 0..voices {
        let spec = VoiceSpec {
            kind: VoiceKind::Sustained,
            waveform: OscillatorWaveform::Triangle,
            frequency: 110.0 * (1.0 + id as f32 * 0.25),
            glide: 1.0,
            // Long enough to keep sounding for the whole benchmark
            envelope: AmplitudeEnvelope::new(0.01, 10_000.0, 0.1),
            pan: -0.5 + (id % 3) as f32 * 0.5,
            pan_to: 0.0,
            pitch_position: 0.5,
        };
        if let Ok(voice) = Voice::create(&graph, graph.destination(), VoiceId(id), spec, 0.0) {
            black_box(voice);
        }
    }
    graph
}

pub fn bench_graph(c: &mut Criterion) {
    let mut group = c.benchmark_group("scenarios/graph");

    for voices in [1u64, 8, 32] {
        let graph = populated(voices);
        for &size in BLOCK_SIZES {
            let mut buffer = vec![0.0f32; size * 2];
            let id = format!("{voices}_voices");
            group.bench_with_input(BenchmarkId::new(id, size), &size, |b, _| {
                b.iter(|| graph.render_interleaved(black_box(&mut buffer), 2))
            });
        }
    }

    group.finish();
}
