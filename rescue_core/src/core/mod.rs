//! # Core types and traits for the rescue runtime
//!
//! - **Node**: the base trait for every unit the scheduler drives
//! - **NodeInfo**: runtime context (logging, metrics) handed to nodes
//! - **LogSummary**: compact message summaries for hub logging
//!
//! ## Node Lifecycle
//!
//! 1. **Construction** - node is created with its configuration
//! 2. **Initialization** - `init()` is called once
//! 3. **Execution** - `tick()` is called repeatedly by the scheduler
//! 4. **Shutdown** - `shutdown()` is called to clean up

pub mod node;

pub use node::{LogSummary, Node, NodeConfig, NodeInfo, NodeMetrics, NodeState};
