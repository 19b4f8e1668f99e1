//! Host coordination for a set of ambient modules.
//!
//! `Soundscape` owns the modules of one scene, routes them into a shared
//! output node and applies the occurrence control: each module is given a
//! threshold and only plays while the host's occurrence is at or above it.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use ambient_dsp::{Mood, MoodConfig, OfflineGraph, Soundscape};
//!
//! let graph = Arc::new(OfflineGraph::new(8_000.0));
//! let mut scene = Soundscape::ambience(graph.clone(), graph.destination());
//! scene.init(&Mood::calm(), MoodConfig::default());
//! scene.play(0.0);
//!
//! for _ in 0..60 {
//!     graph.advance(1.0 / 60.0);
//!     scene.update(1.0 / 60.0);
//! }
//! scene.dispose();
//! assert_eq!(graph.node_count(), 0);
//! ```

mod soundscape;

pub use soundscape::Soundscape;
