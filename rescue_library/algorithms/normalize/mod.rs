//! Sensor normalization
//!
//! Maps raw loudness and radio signal strength onto a common 0–100 scale so
//! the two can be fused into one directional score.
//!
//! Both functions are total: out-of-band input clamps to the band's ends.
//! Results round half up to the nearest integer score.
//!
//! # Example
//!
//! ```rust
//! use rescue_library::algorithms::normalize::{normalize_signal, normalize_sound};
//!
//! assert_eq!(normalize_sound(255), 100);
//! assert_eq!(normalize_signal(-70), 50);
//! ```

/// Raw loudness range of the microphone
pub const SOUND_MIN: i32 = 0;
pub const SOUND_MAX: i32 = 255;

/// Signal strength band in dBm: weakest usable and strongest expected
pub const SIGNAL_WEAK: i32 = -95;
pub const SIGNAL_STRONG: i32 = -45;

/// Signal strength recorded when no beacon has been heard
pub const NO_SIGNAL: i32 = -128;

/// Clamp `raw` into `[low, high]` and rescale to 0..=100, rounding half up
fn rescale(raw: i32, low: i32, high: i32) -> u8 {
    let offset = (raw.clamp(low, high) - low) as i64;
    let span = (high - low) as i64;
    // floor(offset * 100 / span + 1/2) in integers
    ((offset * 200 + span) / (2 * span)) as u8
}

/// Loudness (0..=255) to score
pub fn normalize_sound(raw: i32) -> u8 {
    rescale(raw, SOUND_MIN, SOUND_MAX)
}

/// Signal strength (dBm, -95..=-45) to score
pub fn normalize_signal(raw: i32) -> u8 {
    rescale(raw, SIGNAL_WEAK, SIGNAL_STRONG)
}
