//! Rescue tuning parameters
//!
//! Every threshold, weight and duration the rescue behaviour uses lives in one
//! immutable [`RescueConfig`], injected when a robot is assembled. `Default`
//! reproduces the field-tested firmware values. Files may set any subset of
//! fields; missing ones keep their defaults.
//!
//! ```toml
//! [radio]
//! group = 17
//!
//! [approach]
//! max_duration_ms = 8000
//! arrival_signal = -50
//! ```

use rescue_core::error::{RescueError, RescueResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Broadcast radio setup, applied once at startup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RadioSettings {
    /// Must match across the swarm
    pub group: u8,
    pub transmit_power: u8,
}

impl Default for RadioSettings {
    fn default() -> Self {
        Self {
            group: 17,
            transmit_power: 7,
        }
    }
}

/// Distress detection and broadcasting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DistressSettings {
    /// Vertical acceleration below this enters distress (milli-g)
    pub flip_down_threshold: i32,
    /// Vertical acceleration above this exits distress
    pub flip_up_threshold: i32,
    /// After a manual hold expires, exit only if acceleration is above this
    pub manual_release_threshold: i32,
    /// Minimum distress duration after a manual trigger
    pub manual_hold_ms: u64,
    pub beacon_period_ms: u64,
    /// Chance of re-sending `ALERT` with each beacon
    pub alert_resend_probability: f64,
    pub orientation_poll_ms: u64,
}

impl Default for DistressSettings {
    fn default() -> Self {
        Self {
            flip_down_threshold: -600,
            flip_up_threshold: 200,
            manual_release_threshold: -200,
            manual_hold_ms: 3000,
            beacon_period_ms: 600,
            alert_resend_probability: 0.5,
            orientation_poll_ms: 50,
        }
    }
}

/// Timing of one left/right scan-and-pivot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanProfile {
    /// Pivot speed used for scanning and seeking (percent)
    pub turn_speed: i32,
    /// Duration of each side's window
    pub scan_ms: u64,
    /// Pause after the left window
    pub settle_ms: u64,
    /// Also pause after the right window before pivoting
    pub trailing_settle: bool,
    /// Duration of the pivot toward the winning side
    pub seek_ms: u64,
}

impl ScanProfile {
    /// Initial full-width scan
    pub fn full() -> Self {
        Self {
            turn_speed: 40,
            scan_ms: 600,
            settle_ms: 100,
            trailing_settle: true,
            seek_ms: 400,
        }
    }

    /// Shortened scan used while approaching
    pub fn brief() -> Self {
        Self {
            turn_speed: 35,
            scan_ms: 300,
            settle_ms: 50,
            trailing_settle: false,
            seek_ms: 250,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanSettings {
    /// Loudness sampling interval inside a scan window
    pub sample_interval_ms: u64,
    /// Pause between showing scanning indicators and the first window
    pub pre_scan_pause_ms: u64,
    pub full: ScanProfile,
    pub brief: ScanProfile,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            sample_interval_ms: 10,
            pre_scan_pause_ms: 200,
            full: ScanProfile::full(),
            brief: ScanProfile::brief(),
        }
    }
}

/// Sound / signal fusion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionSettings {
    pub sound_weight: f64,
    pub signal_weight: f64,
    /// Beacon samples older than this do not count
    pub beacon_timeout_ms: u64,
}

impl Default for FusionSettings {
    fn default() -> Self {
        Self {
            sound_weight: 0.7,
            signal_weight: 0.3,
            beacon_timeout_ms: 2000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApproachSettings {
    pub forward_speed: i32,
    /// Raw loudness at or above which the target still counts as heard
    pub loudness_threshold: i32,
    pub max_duration_ms: u64,
    pub quiet_stop_ms: u64,
    pub rescan_period_ms: u64,
    pub poll_interval_ms: u64,
    /// Stop as arrived once a fresh tracked beacon is at least this strong
    pub arrival_signal: Option<i32>,
}

impl Default for ApproachSettings {
    fn default() -> Self {
        Self {
            forward_speed: 25,
            loudness_threshold: 60,
            max_duration_ms: 5000,
            quiet_stop_ms: 500,
            rescan_period_ms: 800,
            poll_interval_ms: 20,
            arrival_signal: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorSettings {
    pub animation_frame_ms: u64,
}

impl Default for IndicatorSettings {
    fn default() -> Self {
        Self {
            animation_frame_ms: 120,
        }
    }
}

/// Complete rescue configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RescueConfig {
    pub radio: RadioSettings,
    pub distress: DistressSettings,
    pub scan: ScanSettings,
    pub fusion: FusionSettings,
    pub approach: ApproachSettings,
    pub indicator: IndicatorSettings,
}

impl RescueConfig {
    /// Load from a TOML or YAML file (format from the extension) and validate
    pub fn from_file<P: AsRef<Path>>(path: P) -> RescueResult<Self> {
        let config: Self = rescue_core::config::from_file(path)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(contents: &str) -> RescueResult<Self> {
        let config: Self = rescue_core::config::from_toml(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml(contents: &str) -> RescueResult<Self> {
        let config: Self = rescue_core::config::from_yaml(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Look for `rescue.toml` / `rescue.yaml` on the standard search path
    pub fn find_and_load() -> RescueResult<Option<Self>> {
        match rescue_core::config::find_and_load::<Self>("rescue")? {
            Some(config) => {
                config.validate()?;
                Ok(Some(config))
            }
            None => Ok(None),
        }
    }

    pub fn to_toml(&self) -> RescueResult<String> {
        toml_string(self)
    }

    /// Every duration multiplied by `factor` (never below 1 ms)
    pub fn scaled(&self, factor: f64) -> Self {
        let scale = |ms: u64| ((ms as f64 * factor).round() as u64).max(1);
        let scale_profile = |p: ScanProfile| ScanProfile {
            scan_ms: scale(p.scan_ms),
            settle_ms: scale(p.settle_ms),
            seek_ms: scale(p.seek_ms),
            ..p
        };

        let mut scaled = self.clone();
        scaled.distress.manual_hold_ms = scale(self.distress.manual_hold_ms);
        scaled.distress.beacon_period_ms = scale(self.distress.beacon_period_ms);
        scaled.distress.orientation_poll_ms = scale(self.distress.orientation_poll_ms);
        scaled.scan.full = scale_profile(self.scan.full);
        scaled.scan.brief = scale_profile(self.scan.brief);
        scaled.scan.sample_interval_ms = scale(self.scan.sample_interval_ms);
        scaled.scan.pre_scan_pause_ms = scale(self.scan.pre_scan_pause_ms);
        scaled.fusion.beacon_timeout_ms = scale(self.fusion.beacon_timeout_ms);
        scaled.approach.max_duration_ms = scale(self.approach.max_duration_ms);
        scaled.approach.quiet_stop_ms = scale(self.approach.quiet_stop_ms);
        scaled.approach.rescan_period_ms = scale(self.approach.rescan_period_ms);
        scaled.approach.poll_interval_ms = scale(self.approach.poll_interval_ms);
        scaled.indicator.animation_frame_ms = scale(self.indicator.animation_frame_ms);
        scaled
    }

    /// Defaults at a fifth of the firmware timing, for demos and tests
    pub fn fast() -> Self {
        Self::default().scaled(0.2)
    }

    pub fn validate(&self) -> RescueResult<()> {
        let fusion = &self.fusion;
        if fusion.sound_weight < 0.0 || fusion.signal_weight < 0.0 {
            return Err(RescueError::config("fusion weights must be non-negative"));
        }
        if (fusion.sound_weight + fusion.signal_weight - 1.0).abs() > 1e-6 {
            return Err(RescueError::config(format!(
                "fusion weights must sum to 1 (got {} + {})",
                fusion.sound_weight, fusion.signal_weight
            )));
        }

        let distress = &self.distress;
        if distress.flip_up_threshold <= distress.flip_down_threshold {
            return Err(RescueError::config(format!(
                "flip_up_threshold ({}) must exceed flip_down_threshold ({})",
                distress.flip_up_threshold, distress.flip_down_threshold
            )));
        }
        if !(0.0..=1.0).contains(&distress.alert_resend_probability) {
            return Err(RescueError::config(
                "alert_resend_probability must be within [0, 1]",
            ));
        }

        let positive = [
            ("distress.beacon_period_ms", distress.beacon_period_ms),
            ("distress.orientation_poll_ms", distress.orientation_poll_ms),
            ("scan.sample_interval_ms", self.scan.sample_interval_ms),
            ("scan.full.scan_ms", self.scan.full.scan_ms),
            ("scan.brief.scan_ms", self.scan.brief.scan_ms),
            ("approach.max_duration_ms", self.approach.max_duration_ms),
            ("approach.poll_interval_ms", self.approach.poll_interval_ms),
            ("approach.rescan_period_ms", self.approach.rescan_period_ms),
            ("indicator.animation_frame_ms", self.indicator.animation_frame_ms),
        ];
        if let Some((name, _)) = positive.iter().find(|(_, value)| *value == 0) {
            return Err(RescueError::config(format!("{} must be positive", name)));
        }

        let speeds = [
            ("scan.full.turn_speed", self.scan.full.turn_speed),
            ("scan.brief.turn_speed", self.scan.brief.turn_speed),
            ("approach.forward_speed", self.approach.forward_speed),
        ];
        if let Some((name, speed)) = speeds.iter().find(|(_, s)| !(1..=100).contains(s)) {
            return Err(RescueError::config(format!(
                "{} must be within 1..=100 (got {})",
                name, speed
            )));
        }

        Ok(())
    }
}

fn toml_string<T: Serialize>(value: &T) -> RescueResult<String> {
    toml::to_string_pretty(value)
        .map_err(|e| RescueError::Encode(format!("Failed to write TOML: {}", e)))
}
