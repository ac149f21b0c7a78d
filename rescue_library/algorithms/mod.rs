//! Pure computational algorithms
//!
//! No I/O: everything here is plain math over readings, reusable from nodes,
//! simulators and tests.
//!
//! - **normalize**: raw loudness / signal strength to a 0–100 score
//! - **direction**: sound + signal fusion and left/right heading choice
//! - **differential_drive**: percent-command kinematics and pose integration

pub mod differential_drive;
pub mod direction;
pub mod normalize;

pub use differential_drive::{Pose2D, WheelKinematics};
pub use direction::{choose_heading, DirectionalScore, Heading};
pub use normalize::{normalize_signal, normalize_sound};
