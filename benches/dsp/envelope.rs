//! Benchmarks for the analytic amplitude envelope.

use std::hint::black_box;

use ambient_dsp::dsp::AmplitudeEnvelope;
use criterion::{BenchmarkId, Criterion};

use crate::{BLOCK_SIZES, SAMPLE_RATE};

pub fn bench_envelope(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/envelope");
    let env = AmplitudeEnvelope::new(0.02, 0.3, 0.5);
    let dt = 1.0 / SAMPLE_RATE as f64;

    for &size in BLOCK_SIZES {
        let mut buffer = vec![0.0f32; size];

        for (stage, t0) in [("attack", 0.005), ("decay", 0.1), ("tail", 0.325)] {
            group.bench_with_input(BenchmarkId::new(stage, size), &size, |b, _| {
                b.iter(|| {
                    for (i, sample) in buffer.iter_mut().enumerate() {
                        *sample = env.value_at(0.0, black_box(t0 + i as f64 * dt));
                    }
                })
            });
        }
    }

    group.finish();
}
