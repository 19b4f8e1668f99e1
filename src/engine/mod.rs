// Purpose: Timing and voice bookkeeping shared by every generator
// Tasks are pumped by the host; nothing here owns a thread or a timer
pub mod registry;
pub mod scheduler;
pub mod tasks;

pub use registry::{RegistryStats, VoiceRegistry};
pub use scheduler::{effective_start, EventScheduler, ScheduleBounds};
pub use tasks::{Task, TaskHandle, TaskQueue};
