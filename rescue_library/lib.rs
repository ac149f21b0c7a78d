//! # Rescue Library
//!
//! Everything a swarm rescue robot runs on top of `rescue_core`.
//!
//! ## Structure
//!
//! ```text
//! rescue_library/
//! ── messages/       # Radio protocol and rescue telemetry
//! ── algorithms/     # Normalization, direction fusion, drive kinematics
//! ── nodes/          # Protocol, distress, rescue and indicator nodes
//! ── apps/           # Complete demo applications (swarmsim)
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use rescue_core::Scheduler;
//! use rescue_library::{DeviceId, RescueConfig, Robot};
//!
//! let robot = Robot::new(DeviceId(1), hardware, &RescueConfig::default())?;
//! robot.attach_manual_trigger(&shake_sensor);
//!
//! let mut scheduler = Scheduler::new().name("robot1");
//! robot.add_nodes(&mut scheduler)?;
//! scheduler.run()?;
//! ```

pub mod algorithms;
pub mod config;
pub mod messages;
pub mod nodes;
pub mod robot;
pub mod state;

pub use rescue_core::core::LogSummary;

pub use config::RescueConfig;
pub use messages::*;
pub use robot::Robot;
pub use state::{Interrupt, RescueTrack, SharedState};

pub use nodes::{
    DistressMonitor, DistressNode, IndicatorController, IndicatorNode, ProtocolHandler,
    RadioNode, RescueNode, RescueOrchestrator,
};
