//! Benchmarks for curve evaluation and oscillators.

mod automation;
mod envelope;
mod oscillator;

pub use automation::bench_automation;
pub use envelope::bench_envelope;
pub use oscillator::bench_oscillator;
