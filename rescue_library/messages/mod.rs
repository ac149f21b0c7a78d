//! Message types exchanged by rescue robots
//!
//! - Radio: the broadcast protocol (`ALERT` / `BEACON` / `DONE`) and its codec
//! - Rescue: status, phases, requests, outcomes and telemetry events
//!
//! All message types are re-exported at the crate root for convenience.

pub mod radio;
pub mod rescue;

pub use radio::{DeviceId, MessageKind, RadioMessage, ReceivedMessage};
pub use rescue::{
    ApproachOutcome, RescueEvent, RescueOutcome, RescuePhase, RescueRequest, RescueTicket,
    SelfStatus,
};
