//! Directional scoring
//!
//! A scan window yields one peak loudness and one peak beacon signal. Both are
//! normalized and fused into a [`DirectionalScore`]; comparing the left and
//! right scores picks the [`Heading`] to pivot toward.
//!
//! # Example
//!
//! ```rust
//! use rescue_library::algorithms::direction::{choose_heading, DirectionalScore, Heading};
//!
//! let left = DirectionalScore::fuse(80, 20, 0.7, 0.3);
//! let right = DirectionalScore::fuse(40, 90, 0.7, 0.3);
//! assert_eq!(choose_heading(left, right), Heading::Left);
//! ```

use crate::algorithms::normalize::{normalize_signal, normalize_sound};
use std::cmp::Ordering;
use std::fmt;

/// Fused sound + signal score of one direction, in `[0, 100]`
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct DirectionalScore(f64);

impl DirectionalScore {
    /// Weighted sum of two normalized (0..=100) readings
    pub fn fuse(sound: u8, signal: u8, sound_weight: f64, signal_weight: f64) -> Self {
        let fused = sound_weight * f64::from(sound) + signal_weight * f64::from(signal);
        DirectionalScore(fused.clamp(0.0, 100.0))
    }

    /// Normalize raw peaks, then fuse
    pub fn from_peaks(
        peak_loudness: i32,
        peak_signal: i32,
        sound_weight: f64,
        signal_weight: f64,
    ) -> Self {
        Self::fuse(
            normalize_sound(peak_loudness),
            normalize_signal(peak_signal),
            sound_weight,
            signal_weight,
        )
    }

    pub fn value(&self) -> f64 {
        self.0
    }
}

impl fmt::Display for DirectionalScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}", self.0)
    }
}

/// Side to pivot toward
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Heading {
    Left,
    Right,
}

impl Heading {
    /// Wheel speeds that rotate in place toward this side
    pub fn pivot_speeds(&self, turn_speed: i32) -> (i32, i32) {
        match self {
            Heading::Left => (-turn_speed, turn_speed),
            Heading::Right => (turn_speed, -turn_speed),
        }
    }
}

/// Left only when it strictly beats right; exact ties go right
pub fn choose_heading(left: DirectionalScore, right: DirectionalScore) -> Heading {
    match left.0.partial_cmp(&right.0) {
        Some(Ordering::Greater) => Heading::Left,
        _ => Heading::Right,
    }
}
