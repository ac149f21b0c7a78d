//! Hardware abstraction layer
//!
//! The rescue logic never talks to motors, sensors, LEDs or the radio
//! directly. It consumes these collaborator traits, bundled per robot in
//! [`Hardware`]. All methods take `&self`: one robot's hardware is shared by the
//! message handler, the distress monitor and the foreground rescue sequence,
//! so implementations provide their own interior synchronization.

pub mod clock;
pub mod timing;

pub use clock::{Clock, SimClock, SystemClock};
pub use timing::{Deadline, Interval};

use crate::error::RescueResult;
use std::sync::Arc;

/// Two-wheel differential drive
pub trait DifferentialDrive: Send + Sync {
    /// Set signed wheel speeds (percent of full power, -100..=100)
    fn set_speeds(&self, left: i32, right: i32);

    /// Stop both wheels
    fn stop(&self);
}

/// Microphone
pub trait SoundSensor: Send + Sync {
    /// Instantaneous loudness on the raw 0..=255 scale
    fn loudness(&self) -> i32;
}

/// Accelerometer, vertical axis only
pub trait Accelerometer: Send + Sync {
    /// Vertical acceleration in milli-g; upright robots read positive
    fn vertical_acceleration(&self) -> i32;
}

/// What the LEDs and display are currently telling bystanders
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndicatorMode {
    /// Green lights, happy face
    Calm,
    /// Red lights, sad face
    Distress,
    /// Yellow lights, animated sweep on the display
    Scanning,
}

/// One 5x5 display frame, one bitmask per row (bit 4 = leftmost column)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnimationFrame(pub [u8; 5]);

/// Lights, display and speaker
pub trait Indicator: Send + Sync {
    fn set_mode(&self, mode: IndicatorMode);

    fn show_frame(&self, frame: &AnimationFrame);

    fn clear_display(&self);

    /// Play the distress sound expression; rescuers home in on it by ear
    fn play_distress_sound(&self);
}

/// A packet as delivered by the radio, with its measured signal strength
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPacket {
    pub payload: Vec<u8>,
    /// Received signal strength in dBm (roughly -128..=-42)
    pub signal_strength: i32,
}

/// Broadcast radio
pub trait RadioTransceiver: Send + Sync {
    /// Join a group and set transmit power; called once at startup
    fn configure(&self, group: u8, transmit_power: u8) -> RescueResult<()>;

    /// Broadcast a payload to everyone in range (no acknowledgement)
    fn send(&self, payload: &[u8]) -> RescueResult<()>;

    /// Take the next received packet, if any
    fn try_recv(&self) -> Option<RawPacket>;
}

pub type TriggerCallback = Box<dyn Fn() + Send + Sync>;

/// Manual distress trigger (e.g. a shake gesture)
pub trait ManualTrigger: Send + Sync {
    /// Register the callback invoked each time the trigger fires
    fn on_trigger(&self, callback: TriggerCallback);
}

/// Everything one robot's rescue logic needs from the platform
#[derive(Clone)]
pub struct Hardware {
    pub drive: Arc<dyn DifferentialDrive>,
    pub sound: Arc<dyn SoundSensor>,
    pub accelerometer: Arc<dyn Accelerometer>,
    pub indicator: Arc<dyn Indicator>,
    pub radio: Arc<dyn RadioTransceiver>,
    pub clock: Arc<dyn Clock>,
}

impl Hardware {
    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    pub fn sleep_ms(&self, ms: u64) {
        self.clock.sleep_ms(ms)
    }

    /// Start driving and get a guard that stops the wheels when dropped
    pub fn drive_guarded(&self, left: i32, right: i32) -> MotionGuard<'_> {
        self.drive.set_speeds(left, right);
        MotionGuard {
            drive: self.drive.as_ref(),
        }
    }
}

/// Stops the drive when dropped, on every exit path of a motion routine
pub struct MotionGuard<'a> {
    drive: &'a dyn DifferentialDrive,
}

impl MotionGuard<'_> {
    /// Change speeds while keeping the stop-on-drop guarantee
    pub fn set_speeds(&self, left: i32, right: i32) {
        self.drive.set_speeds(left, right);
    }

    pub fn stop(&self) {
        self.drive.stop();
    }
}

impl Drop for MotionGuard<'_> {
    fn drop(&mut self) {
        self.drive.stop();
    }
}
