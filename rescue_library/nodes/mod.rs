//! Rescue behaviour
//!
//! Control logic plus the scheduler nodes that drive it:
//!
//! | Logic | Node | Does |
//! |---|---|---|
//! | [`ProtocolHandler`] | [`RadioNode`] | reacts to ALERT / BEACON / DONE |
//! | [`DistressMonitor`] | [`DistressNode`] | flip detection, beacon loop |
//! | [`RescueOrchestrator`] | [`RescueNode`] | scan, pivot, approach, reset |
//! | [`IndicatorController`] | [`IndicatorNode`] | lights, faces, scanning animation |
//!
//! [`ScanEngine`] and [`ApproachController`] are called synchronously by the
//! orchestrator.

pub mod approach;
pub mod distress;
pub mod indicator;
pub mod protocol;
pub mod rescue;
pub mod scan;

pub use approach::ApproachController;
pub use distress::{DistressMonitor, DistressNode};
pub use indicator::{IndicatorController, IndicatorNode, SCANNING_FRAMES};
pub use protocol::{Handled, ProtocolHandler, RadioNode};
pub use rescue::{RescueNode, RescueOrchestrator};
pub use scan::{ScanEngine, ScanResult};
