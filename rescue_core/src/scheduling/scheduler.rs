use crate::core::{Node, NodeInfo, NodeState};
use crate::error::RescueResult;
use colored::Colorize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Node registration with lifecycle tracking and per-node rate control
struct RegisteredNode {
    node: Box<dyn Node>,
    priority: u32,
    initialized: bool,
    context: NodeInfo,
    rate_hz: Option<f64>, // None = every scheduler tick
    last_tick: Option<Instant>,
}

impl RegisteredNode {
    fn is_due(&self, now: Instant) -> bool {
        match (self.rate_hz, self.last_tick) {
            (Some(rate), Some(last)) if rate > 0.0 => {
                now.duration_since(last) >= Duration::from_secs_f64(1.0 / rate)
            }
            _ => true,
        }
    }
}

/// Central orchestrator: holds nodes, drives the tick loop.
///
/// Nodes tick in ascending priority order (0 first). A node that panics is
/// moved to the error state and skipped from then on; the rest keep running.
pub struct Scheduler {
    nodes: Vec<RegisteredNode>,
    running: Arc<AtomicBool>,
    scheduler_name: String,
    tick_period: Duration,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    /// Create an empty scheduler ticking at 100 Hz.
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            running: Arc::new(AtomicBool::new(true)),
            scheduler_name: "RescueScheduler".to_string(),
            tick_period: Duration::from_millis(10),
        }
    }

    /// Set the scheduler name (chainable)
    pub fn name(mut self, name: &str) -> Self {
        self.scheduler_name = name.to_string();
        self
    }

    /// Set the global tick rate (chainable)
    pub fn with_tick_rate(mut self, rate_hz: f64) -> Self {
        if rate_hz > 0.0 {
            self.tick_period = Duration::from_secs_f64(1.0 / rate_hz);
        }
        self
    }

    pub fn scheduler_name(&self) -> &str {
        &self.scheduler_name
    }

    /// Add a node with the given priority (lower number = higher priority)
    ///
    /// # Example
    /// ```ignore
    /// scheduler.add(Box::new(radio_node), 0, Some(true));
    /// scheduler.add(Box::new(indicator_node), 50, None);
    /// ```
    pub fn add(
        &mut self,
        node: Box<dyn Node>,
        priority: u32,
        logging_enabled: Option<bool>,
    ) -> &mut Self {
        let node_name = node.name().to_string();
        let logging_enabled = logging_enabled.unwrap_or(false);
        let mut config = node.get_config();
        config.enable_logging = logging_enabled;
        let rate_hz = config.rate_hz;

        log::info!(
            "Added node '{}' with priority {} (logging: {}, rate: {})",
            node_name,
            priority,
            logging_enabled,
            rate_hz.map_or_else(|| "scheduler".to_string(), |r| format!("{:.1} Hz", r))
        );

        let context = NodeInfo::new_with_config(node_name, config);
        self.nodes.push(RegisteredNode {
            node,
            priority,
            initialized: false,
            context,
            rate_hz,
            last_tick: None,
        });
        // Stable: equal priorities keep insertion order
        self.nodes.sort_by_key(|registered| registered.priority);
        self
    }

    /// Set per-node rate control (chainable)
    pub fn set_node_rate(&mut self, name: &str, rate_hz: f64) -> &mut Self {
        if let Some(registered) = self.nodes.iter_mut().find(|r| r.node.name() == name) {
            registered.rate_hz = Some(rate_hz);
            log::debug!("Set node '{}' rate to {:.1} Hz", name, rate_hz);
        } else {
            log::warn!("set_node_rate: no node named '{}'", name);
        }
        self
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Stop the scheduler
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Shared flag other threads can clear to stop the loop
    pub fn running_handle(&self) -> Arc<AtomicBool> {
        self.running.clone()
    }

    /// Main loop with Ctrl+C handling and cleanup
    pub fn run(&mut self) -> RescueResult<()> {
        self.run_with_limit(None)
    }

    /// Run all nodes for a fixed duration, then shut down gracefully
    pub fn run_for(&mut self, duration: Duration) -> RescueResult<()> {
        self.run_with_limit(Some(duration))
    }

    fn run_with_limit(&mut self, duration: Option<Duration>) -> RescueResult<()> {
        let start_time = Instant::now();
        self.running.store(true, Ordering::SeqCst);

        let running = self.running.clone();
        if let Err(e) = ctrlc::set_handler(move || {
            eprintln!("{}", "\nCtrl+C received! Stopping rescue scheduler...".red());
            running.store(false, Ordering::SeqCst);
        }) {
            // Only one handler per process; later schedulers rely on stop()
            log::debug!("Signal handler not installed: {}", e);
        }

        self.init_nodes();

        while self.is_running() {
            if let Some(max_duration) = duration {
                if start_time.elapsed() >= max_duration {
                    log::info!(
                        "Scheduler '{}' reached time limit of {:?}",
                        self.scheduler_name,
                        max_duration
                    );
                    break;
                }
            }

            let cycle_start = Instant::now();
            self.tick_nodes(cycle_start);

            let spent = cycle_start.elapsed();
            if spent < self.tick_period {
                std::thread::sleep(self.tick_period - spent);
            }
        }

        self.shutdown_nodes();
        log::info!("Scheduler '{}' shutdown complete", self.scheduler_name);
        Ok(())
    }

    /// Run one scheduling pass: initialize pending nodes, tick every due node
    pub fn tick_once(&mut self) {
        self.init_nodes();
        self.tick_nodes(Instant::now());
    }

    /// Shut down every initialized node
    pub fn shutdown(&mut self) {
        self.shutdown_nodes();
    }

    fn init_nodes(&mut self) {
        for registered in self.nodes.iter_mut().filter(|r| !r.initialized) {
            let node_name = registered.node.name().to_string();
            match registered.node.init(&mut registered.context) {
                Ok(()) => {
                    registered.initialized = true;
                    registered.context.set_state(NodeState::Running);
                    log::debug!("Initialized node '{}'", node_name);
                }
                Err(e) => {
                    registered
                        .context
                        .transition_to_error(format!("Initialization failed: {}", e));
                }
            }
        }
    }

    fn tick_nodes(&mut self, now: Instant) {
        for registered in self.nodes.iter_mut() {
            if !registered.initialized
                || matches!(registered.context.state(), NodeState::Error(_))
                || !registered.is_due(now)
            {
                continue;
            }
            registered.last_tick = Some(now);

            registered.context.start_tick();
            let tick_result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                registered.node.tick(Some(&mut registered.context));
            }));

            match tick_result {
                Ok(()) => registered.context.record_tick(),
                Err(panic_err) => {
                    let error_msg = if let Some(s) = panic_err.downcast_ref::<&str>() {
                        format!("Node panicked: {}", s)
                    } else if let Some(s) = panic_err.downcast_ref::<String>() {
                        format!("Node panicked: {}", s)
                    } else {
                        "Node panicked with unknown error".to_string()
                    };
                    registered.context.transition_to_error(error_msg);
                }
            }
        }
    }

    fn shutdown_nodes(&mut self) {
        for registered in self.nodes.iter_mut().filter(|r| r.initialized) {
            registered.context.set_state(NodeState::Stopping);
            let node_name = registered.node.name().to_string();
            match registered.node.shutdown(&mut registered.context) {
                Ok(()) => log::debug!("Shutdown node '{}' successfully", node_name),
                Err(e) => log::warn!("Error shutting down node '{}': {}", node_name, e),
            }
            registered.context.set_state(NodeState::Stopped);
            registered.initialized = false;
        }
    }

    /// Names of all registered nodes, in tick order
    pub fn get_node_list(&self) -> Vec<String> {
        self.nodes
            .iter()
            .map(|registered| registered.node.name().to_string())
            .collect()
    }

    pub fn node_state(&self, name: &str) -> Option<NodeState> {
        self.nodes
            .iter()
            .find(|r| r.node.name() == name)
            .map(|r| r.context.state().clone())
    }

    pub fn node_tick_count(&self, name: &str) -> Option<u64> {
        self.nodes
            .iter()
            .find(|r| r.node.name() == name)
            .map(|r| r.context.metrics().total_ticks)
    }
}
