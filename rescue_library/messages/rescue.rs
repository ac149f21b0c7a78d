use crate::messages::radio::DeviceId;
use rescue_core::core::LogSummary;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Whether this robot itself needs rescue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum SelfStatus {
    Healthy = 0,
    Distressed = 1,
}

impl SelfStatus {
    pub(crate) fn from_u8(raw: u8) -> Self {
        if raw == SelfStatus::Distressed as u8 {
            SelfStatus::Distressed
        } else {
            SelfStatus::Healthy
        }
    }
}

/// Step of the rescue sequence this robot is in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RescuePhase {
    Idle,
    /// Initial full-width left/right scan
    Scanning,
    /// Pivoting toward the winning side
    Seeking,
    Approaching,
    /// Brief scan during the approach
    Rescanning,
}

impl RescuePhase {
    pub fn is_active(&self) -> bool {
        !matches!(self, RescuePhase::Idle)
    }
}

impl fmt::Display for RescuePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Proof of having claimed a rescue
///
/// Only [`SharedState`](crate::state::SharedState) hands these out. A ticket
/// stays valid until its rescue finishes, is aborted by distress, or is
/// released by the target's `Done`; every check against shared state after
/// that fails, which is how a running sequence notices it was cut short.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RescueTicket {
    epoch: u64,
    target: DeviceId,
}

impl RescueTicket {
    pub(crate) fn new(epoch: u64, target: DeviceId) -> Self {
        Self { epoch, target }
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn target(&self) -> DeviceId {
        self.target
    }
}

/// Published by the protocol handler when an alert claims this robot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RescueRequest {
    pub ticket: RescueTicket,
    /// Signal strength of the alert that started it
    pub alert_signal: i32,
}

impl LogSummary for RescueRequest {
    fn log_summary(&self) -> String {
        format!(
            "RescueRequest(target={}, epoch={})",
            self.ticket.target, self.ticket.epoch
        )
    }
}

/// How an approach that ran to its end stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ApproachOutcome {
    /// Hard time limit reached
    Timeout,
    /// Loudness stayed below threshold for the quiet duration
    QuietStop,
    /// Tracked beacon reached the arrival signal strength
    Arrived,
}

/// Result of one rescue sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RescueOutcome {
    Completed(ApproachOutcome),
    /// The target declared itself done, or the rescue was aborted externally
    Cancelled,
    /// This robot went into distress mid-rescue
    Interrupted,
    /// The robot was distressed or already busy
    Declined,
}

impl fmt::Display for RescueOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RescueOutcome::Completed(how) => write!(f, "completed ({:?})", how),
            RescueOutcome::Cancelled => write!(f, "cancelled"),
            RescueOutcome::Interrupted => write!(f, "interrupted by distress"),
            RescueOutcome::Declined => write!(f, "declined"),
        }
    }
}

/// Rescue telemetry, one topic per robot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RescueEvent {
    Started {
        rescuer: DeviceId,
        target: DeviceId,
        at_ms: u64,
    },
    Finished {
        rescuer: DeviceId,
        target: DeviceId,
        outcome: RescueOutcome,
        at_ms: u64,
    },
}

impl RescueEvent {
    pub fn rescuer(&self) -> DeviceId {
        match self {
            RescueEvent::Started { rescuer, .. } | RescueEvent::Finished { rescuer, .. } => {
                *rescuer
            }
        }
    }
}

impl LogSummary for RescueEvent {
    fn log_summary(&self) -> String {
        match self {
            RescueEvent::Started {
                rescuer, target, ..
            } => format!("{} started rescue of {}", rescuer, target),
            RescueEvent::Finished {
                rescuer,
                target,
                outcome,
                ..
            } => format!("{} finished rescue of {}: {}", rescuer, target, outcome),
        }
    }
}
