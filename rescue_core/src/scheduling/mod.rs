pub mod background;
pub mod scheduler;

pub use background::{BackgroundTask, TaskToken};
pub use scheduler::Scheduler;
