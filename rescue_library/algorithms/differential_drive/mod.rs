//! Differential Drive Kinematics
//!
//! Converts percent-of-full-power wheel commands into body motion and
//! integrates a planar pose. Used by simulators to move robots that are
//! driven through [`rescue_core::hal::DifferentialDrive`].
//!
//! # Example
//!
//! ```rust
//! use rescue_library::algorithms::differential_drive::{Pose2D, WheelKinematics};
//!
//! let kinematics = WheelKinematics::new(0.1, 0.2); // wheel_base, top speed
//! let pose = kinematics.integrate(Pose2D::default(), 50, 50, 1.0);
//! assert!((pose.x - 0.1).abs() < 1e-9);
//! ```

use serde::{Deserialize, Serialize};

/// Position (m) and heading (rad, counter-clockwise from +x)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Pose2D {
    pub x: f64,
    pub y: f64,
    pub theta: f64,
}

impl Pose2D {
    pub fn new(x: f64, y: f64, theta: f64) -> Self {
        Self { x, y, theta }
    }

    pub fn distance_to(&self, other: &Pose2D) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }

    /// Angle of `other` relative to this pose's heading, in `(-pi, pi]`
    pub fn bearing_to(&self, other: &Pose2D) -> f64 {
        let absolute = (other.y - self.y).atan2(other.x - self.x);
        normalize_angle(absolute - self.theta)
    }
}

/// Wrap an angle into `(-pi, pi]`
pub fn normalize_angle(angle: f64) -> f64 {
    let two_pi = std::f64::consts::TAU;
    let mut wrapped = angle % two_pi;
    if wrapped <= -std::f64::consts::PI {
        wrapped += two_pi;
    } else if wrapped > std::f64::consts::PI {
        wrapped -= two_pi;
    }
    wrapped
}

/// Differential drive driven by percent commands
#[derive(Debug, Clone, Copy)]
pub struct WheelKinematics {
    wheel_base: f64,      // Distance between wheels (m)
    max_wheel_speed: f64, // Wheel surface speed at 100% (m/s)
}

impl WheelKinematics {
    pub fn new(wheel_base: f64, max_wheel_speed: f64) -> Self {
        Self {
            wheel_base,
            max_wheel_speed,
        }
    }

    /// Percent command (clamped to -100..=100) to wheel surface speed
    pub fn wheel_speed(&self, percent: i32) -> f64 {
        f64::from(percent.clamp(-100, 100)) / 100.0 * self.max_wheel_speed
    }

    /// (linear m/s, angular rad/s) for a pair of percent commands
    pub fn body_velocity(&self, left_percent: i32, right_percent: i32) -> (f64, f64) {
        let left = self.wheel_speed(left_percent);
        let right = self.wheel_speed(right_percent);
        let linear = (left + right) / 2.0;
        let angular = (right - left) / self.wheel_base;
        (linear, angular)
    }

    /// Advance `pose` by `dt` seconds under constant commands
    pub fn integrate(
        &self,
        pose: Pose2D,
        left_percent: i32,
        right_percent: i32,
        dt: f64,
    ) -> Pose2D {
        let (linear, angular) = self.body_velocity(left_percent, right_percent);
        Pose2D {
            x: pose.x + linear * pose.theta.cos() * dt,
            y: pose.y + linear * pose.theta.sin() * dt,
            theta: normalize_angle(pose.theta + angular * dt),
        }
    }

    pub fn wheel_base(&self) -> f64 {
        self.wheel_base
    }
}
