//! Rescue event collection for the swarm simulation

use parking_lot::Mutex;
use ::rescue::library::{RescueEvent, RescueOutcome, Robot};
use ::rescue::prelude::*;
use std::collections::BTreeMap;

/// Totals over one simulation run
#[derive(Debug, Clone, Default, Serialize)]
pub struct Summary {
    pub robots: usize,
    pub rescues_started: u32,
    /// Finished rescues keyed by outcome
    pub outcomes: BTreeMap<String, u32>,
    pub victim_flipped_at_ms: Option<u64>,
    pub victim_righted_at_ms: Option<u64>,
    pub victim_righted_by: Option<DeviceId>,
}

impl Summary {
    fn record(&mut self, event: &RescueEvent) {
        match event {
            RescueEvent::Started { .. } => self.rescues_started += 1,
            RescueEvent::Finished { outcome, .. } => {
                *self.outcomes.entry(outcome_key(outcome)).or_default() += 1;
            }
        }
    }
}

fn outcome_key(outcome: &RescueOutcome) -> String {
    match outcome {
        RescueOutcome::Completed(how) => format!("completed_{:?}", how).to_lowercase(),
        other => format!("{:?}", other).to_lowercase(),
    }
}

/// Drains every robot's event topic into the log and a shared [`Summary`]
pub struct TelemetryNode {
    events: Vec<Hub<RescueEvent>>,
    json: bool,
    summary: Arc<Mutex<Summary>>,
}

impl TelemetryNode {
    pub fn new(robots: &[Robot], json: bool, summary: Arc<Mutex<Summary>>) -> RescueResult<Self> {
        let events = robots
            .iter()
            .map(Robot::subscribe_events)
            .collect::<RescueResult<Vec<_>>>()?;
        summary.lock().robots = robots.len();
        Ok(Self {
            events,
            json,
            summary,
        })
    }

    fn report(&self, event: &RescueEvent) {
        if self.json {
            match serde_json::to_string(event) {
                Ok(line) => println!("{}", line),
                Err(e) => tracing::warn!("could not serialize {:?}: {}", event, e),
            }
            return;
        }
        match event {
            RescueEvent::Started {
                rescuer,
                target,
                at_ms,
            } => tracing::info!("[{:>6} ms] {} heads out to rescue {}", at_ms, rescuer, target),
            RescueEvent::Finished {
                rescuer,
                target,
                outcome,
                at_ms,
            } => tracing::info!(
                "[{:>6} ms] {} finished rescuing {}: {}",
                at_ms,
                rescuer,
                target,
                outcome
            ),
        }
    }
}

impl Node for TelemetryNode {
    fn name(&self) -> &str {
        "telemetry"
    }

    fn tick(&mut self, _ctx: Option<&mut NodeInfo>) {
        for hub in &self.events {
            while let Some(event) = hub.recv(None) {
                self.report(&event);
                self.summary.lock().record(&event);
            }
        }
    }
}
