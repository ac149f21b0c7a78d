//! # Communication layer
//!
//! In-process publish/subscribe between nodes:
//!
//! - **Hub**: MPMC topic endpoint with bounded, drop-on-full queues
//!
//! ```rust,no_run
//! use rescue_core::communication::Hub;
//! let hub: Hub<String> = Hub::new("topic_name").unwrap();
//! ```
//!
//! Radio traffic between robots does not go through hubs; it crosses the
//! [`RadioTransceiver`](crate::hal::RadioTransceiver) collaborator.

pub mod hub;

pub use hub::{Hub, HubMetrics};
