//! Benchmarks for parameter timeline evaluation.

use std::hint::black_box;

use ambient_dsp::dsp::{ParamChange, ParamTimeline};
use criterion::{BenchmarkId, Criterion};

use crate::{BLOCK_SIZES, SAMPLE_RATE};

fn evaluate(timeline: &ParamTimeline, out: &mut [f32], t0: f64) {
    let dt = 1.0 / SAMPLE_RATE as f64;
    for (i, sample) in out.iter_mut().enumerate() {
        *sample = timeline.value_at(t0 + i as f64 * dt);
    }
}

pub fn bench_automation(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/automation");

    // Mid linear ramp
    let mut ramp = ParamTimeline::new(0.0);
    ramp.apply(ParamChange::SetValue { at: 0.0, value: 0.0 });
    ramp.apply(ParamChange::LinearRamp { end: 1.0, value: 1.0 });

    // Exponential approach after a hold, as left behind by a mood change
    let mut approach = ParamTimeline::new(220.0);
    approach.apply(ParamChange::HoldAt(0.0));
    approach.apply(ParamChange::SetTarget {
        start: 0.0,
        target: 440.0,
        time_constant: 0.5,
    });

    // Many stacked retargets
    let mut crowded = ParamTimeline::new(0.0);
    for i in 0..32 {
        crowded.apply(ParamChange::SetValue {
            at: i as f64 * 0.01,
            value: i as f32,
        });
    }

    for &size in BLOCK_SIZES {
        let mut buffer = vec![0.0f32; size];

        group.bench_with_input(BenchmarkId::new("linear", size), &size, |b, _| {
            b.iter(|| evaluate(black_box(&ramp), black_box(&mut buffer), 0.5))
        });
        group.bench_with_input(BenchmarkId::new("approach", size), &size, |b, _| {
            b.iter(|| evaluate(black_box(&approach), black_box(&mut buffer), 0.5))
        });
        group.bench_with_input(BenchmarkId::new("crowded", size), &size, |b, _| {
            b.iter(|| evaluate(black_box(&crowded), black_box(&mut buffer), 0.5))
        });
    }

    group.finish();
}
