//! # Rescue
//!
//! Swarm rescue robots in Rust. A robot that is flipped over (or shaken)
//! broadcasts a distress alert; healthy robots within radio range scan
//! left and right for the loudest direction, pivot toward it and drive in
//! until the victim is heard clearly, falls quiet, or reports itself safe.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ::rescue::prelude::*;
//!
//! fn start(hardware: Hardware) -> AnyResult<()> {
//!     let config = RescueConfig::find_and_load()?.unwrap_or_default();
//!     let robot = Robot::new(DeviceId(1), hardware, &config)?;
//!
//!     let mut scheduler = Scheduler::new().name("robot1");
//!     robot.add_nodes(&mut scheduler)?;
//!     scheduler.run()?;
//!     Ok(())
//! }
//! ```

// Re-export core components
pub use rescue_core::{self, *};

// Re-export the behaviour library with alias
pub use rescue_library as library;

/// Everything needed to assemble and run a robot
pub mod prelude {
    // Core node types
    pub use rescue_core::core::{Node, NodeConfig, NodeInfo, NodeState};

    // Communication and scheduling
    pub use rescue_core::communication::Hub;
    pub use rescue_core::scheduling::Scheduler;

    // Hardware seams
    pub use rescue_core::hal::{
        Accelerometer, AnimationFrame, Clock, DifferentialDrive, Hardware, Indicator, IndicatorMode,
        ManualTrigger, RadioTransceiver, RawPacket, SimClock, SoundSensor, SystemClock,
    };

    // Error types
    pub use rescue_core::error::{RescueError, RescueResult};
    pub type Result<T> = RescueResult<T>;

    // Common std types
    pub use std::sync::Arc;
    pub use std::time::Duration;

    // Common traits
    pub use serde::{Deserialize, Serialize};

    // Re-export anyhow for error handling
    pub use anyhow::{anyhow, bail, Context, Result as AnyResult};

    // Robot assembly, configuration and messages
    pub use rescue_library::messages::*;
    pub use rescue_library::{RescueConfig, Robot};
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub fn version() -> &'static str {
    VERSION
}
