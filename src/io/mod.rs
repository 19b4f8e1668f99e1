// Purpose - external interfaces: the render target and its audio clock

pub mod target;

pub use target::{AudioClock, NodeId, Param, RenderTarget, TargetError};
