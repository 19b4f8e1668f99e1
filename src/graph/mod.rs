//! Concrete render target built from a small node arena.
//!
//! Nodes wrap the low-level DSP primitives with per-parameter automation
//! timelines. `OfflineGraph` implements `RenderTarget` over them so the
//! generators can run against real rendered audio, in tests and in the demo
//! binary alike.

/// Node kinds and per-sample processing.
pub mod node;
/// Mutex-guarded node arena implementing `RenderTarget`.
pub mod offline;

pub use node::RenderCtx;
pub use offline::OfflineGraph;
