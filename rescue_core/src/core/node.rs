use crate::error::RescueResult;
use std::fmt;
use std::time::Instant;

/// Trait for providing lightweight logging summaries of message types
///
/// Hubs call this before a message is moved into a channel, so the summary
/// should be cheap and compact.
pub trait LogSummary {
    /// Return a compact string representation suitable for logging
    fn log_summary(&self) -> String;
}

/// Node states for monitoring and lifecycle management
#[derive(Debug, Clone, PartialEq)]
pub enum NodeState {
    Uninitialized,
    Running,
    Stopping,
    Stopped,
    Error(String),
}

impl fmt::Display for NodeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeState::Uninitialized => write!(f, "Uninitialized"),
            NodeState::Running => write!(f, "Running"),
            NodeState::Stopping => write!(f, "Stopping"),
            NodeState::Stopped => write!(f, "Stopped"),
            NodeState::Error(msg) => write!(f, "Error: {}", msg),
        }
    }
}

/// Performance metrics for node execution
#[derive(Debug, Clone, Default)]
pub struct NodeMetrics {
    pub total_ticks: u64,
    pub avg_tick_duration_ms: f64,
    pub max_tick_duration_ms: f64,
    pub last_tick_duration_ms: f64,
    pub messages_sent: u64,
    pub messages_received: u64,
    pub errors_count: u64,
    pub warnings_count: u64,
}

/// Configuration parameters for node behavior
#[derive(Debug, Clone)]
pub struct NodeConfig {
    pub enable_logging: bool,
    /// Rate the scheduler ticks this node at; `None` uses the scheduler rate
    pub rate_hz: Option<f64>,
}

impl Default for NodeConfig {
    fn default() -> Self {
        NodeConfig {
            enable_logging: true,
            rate_hz: None,
        }
    }
}

/// Runtime context handed to a node on every tick
pub struct NodeInfo {
    name: String,
    state: NodeState,
    config: NodeConfig,
    metrics: NodeMetrics,
    tick_start_time: Option<Instant>,
}

impl NodeInfo {
    pub fn new(node_name: impl Into<String>, logging_enabled: bool) -> Self {
        Self {
            name: node_name.into(),
            state: NodeState::Uninitialized,
            config: NodeConfig {
                enable_logging: logging_enabled,
                ..Default::default()
            },
            metrics: NodeMetrics::default(),
            tick_start_time: None,
        }
    }

    pub fn new_with_config(node_name: impl Into<String>, config: NodeConfig) -> Self {
        let mut info = Self::new(node_name, config.enable_logging);
        info.config = config;
        info
    }

    pub fn state(&self) -> &NodeState {
        &self.state
    }

    pub fn set_state(&mut self, new_state: NodeState) {
        if self.state != new_state {
            log::trace!(target: "rescue::node", "{}: {} -> {}", self.name, self.state, new_state);
            self.state = new_state;
        }
    }

    pub fn transition_to_error(&mut self, error_msg: String) {
        self.log_error(&error_msg);
        self.set_state(NodeState::Error(error_msg));
    }

    pub fn start_tick(&mut self) {
        self.tick_start_time = Some(Instant::now());
    }

    pub fn record_tick(&mut self) {
        if let Some(start_time) = self.tick_start_time.take() {
            let duration_ms = start_time.elapsed().as_secs_f64() * 1000.0;

            self.metrics.total_ticks += 1;
            self.metrics.last_tick_duration_ms = duration_ms;
            if duration_ms > self.metrics.max_tick_duration_ms {
                self.metrics.max_tick_duration_ms = duration_ms;
            }

            let ticks = self.metrics.total_ticks as f64;
            self.metrics.avg_tick_duration_ms =
                (self.metrics.avg_tick_duration_ms * (ticks - 1.0) + duration_ms) / ticks;
        }
    }

    /// Record a published message (called by `Hub::send`)
    pub fn log_pub_summary(&mut self, topic: &str, summary: &str) {
        if self.config.enable_logging {
            log::debug!(target: "rescue::hub", "{} --PUB--> '{}' = {}", self.name, topic, summary);
        }
        self.metrics.messages_sent += 1;
    }

    /// Record a received message (called by `Hub::recv`)
    pub fn log_sub_summary(&mut self, topic: &str, summary: &str) {
        if self.config.enable_logging {
            log::debug!(target: "rescue::hub", "{} <--SUB-- '{}' = {}", self.name, topic, summary);
        }
        self.metrics.messages_received += 1;
    }

    pub fn log_info(&self, message: &str) {
        if self.config.enable_logging {
            log::info!(target: "rescue::node", "[{}] {}", self.name, message);
        }
    }

    pub fn log_debug(&self, message: &str) {
        if self.config.enable_logging {
            log::debug!(target: "rescue::node", "[{}] {}", self.name, message);
        }
    }

    pub fn log_warning(&mut self, message: &str) {
        if self.config.enable_logging {
            log::warn!(target: "rescue::node", "[{}] {}", self.name, message);
        }
        self.metrics.warnings_count += 1;
    }

    pub fn log_error(&mut self, message: &str) {
        if self.config.enable_logging {
            log::error!(target: "rescue::node", "[{}] {}", self.name, message);
        }
        self.metrics.errors_count += 1;
    }

    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn config(&self) -> &NodeConfig {
        &self.config
    }
    pub fn metrics(&self) -> &NodeMetrics {
        &self.metrics
    }
}

/// A unit of work driven by the [`Scheduler`](crate::scheduling::Scheduler)
///
/// `tick` must return promptly: long-running work belongs in a
/// [`BackgroundTask`](crate::scheduling::BackgroundTask).
pub trait Node: Send {
    /// Get the node's name (must be unique within a scheduler)
    fn name(&self) -> &str;

    /// Initialize the node (called once at startup)
    fn init(&mut self, ctx: &mut NodeInfo) -> RescueResult<()> {
        ctx.log_debug("Node initialized");
        Ok(())
    }

    /// Main execution step (called repeatedly)
    fn tick(&mut self, ctx: Option<&mut NodeInfo>);

    /// Shutdown the node (called once at cleanup)
    fn shutdown(&mut self, ctx: &mut NodeInfo) -> RescueResult<()> {
        ctx.log_debug("Node shutdown");
        Ok(())
    }

    /// Per-node configuration; the scheduler honours `rate_hz`
    fn get_config(&self) -> NodeConfig {
        NodeConfig::default()
    }
}

impl LogSummary for u32 {
    fn log_summary(&self) -> String {
        self.to_string()
    }
}

impl LogSummary for String {
    fn log_summary(&self) -> String {
        self.clone()
    }
}
