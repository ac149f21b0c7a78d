//! # Rescue Core
//!
//! Runtime for swarm rescue robots. This crate provides the building blocks
//! the rescue behaviours are written against:
//!
//! - **Nodes**: units of periodic work with a lifecycle
//! - **Communication**: in-process publish/subscribe between nodes
//! - **Scheduling**: a priority/rate tick loop plus supervised background tasks
//! - **HAL**: collaborator traits for drive, sensors, indicators, radio and time
//!
//! ## Quick Start
//!
//! ```rust
//! use rescue_core::{Hub, Node, NodeInfo};
//!
//! struct Heartbeat {
//!     output: Hub<u32>,
//!     count: u32,
//! }
//!
//! impl Node for Heartbeat {
//!     fn name(&self) -> &str {
//!         "heartbeat"
//!     }
//!
//!     fn tick(&mut self, ctx: Option<&mut NodeInfo>) {
//!         self.count += 1;
//!         let _ = self.output.send(self.count, ctx);
//!     }
//! }
//! ```

pub mod communication;
pub mod config;
pub mod core;
pub mod error;
pub mod hal;
pub mod scheduling;

pub use communication::{Hub, HubMetrics};
pub use core::{LogSummary, Node, NodeConfig, NodeInfo, NodeState};
pub use error::{RescueError, RescueResult};
pub use hal::{
    Accelerometer, AnimationFrame, Clock, Deadline, DifferentialDrive, Hardware, Indicator,
    IndicatorMode, Interval, ManualTrigger, MotionGuard, RadioTransceiver, RawPacket, SimClock,
    SoundSensor, SystemClock, TriggerCallback,
};
pub use scheduling::{BackgroundTask, Scheduler, TaskToken};
