//! Real-world scenario benchmarks.

mod graph;
mod soundscape;

pub use graph::bench_graph;
pub use soundscape::bench_soundscape;
