use crate::config::{RescueConfig, ScanProfile};
use crate::messages::{
    ApproachOutcome, DeviceId, RescueEvent, RescueOutcome, RescuePhase, RescueRequest,
    RescueTicket,
};
use crate::nodes::approach::ApproachController;
use crate::nodes::indicator::IndicatorController;
use crate::nodes::scan::ScanEngine;
use crate::state::{Interrupt, SharedState};
use rescue_core::hal::Hardware;
use rescue_core::{BackgroundTask, Hub, Node, NodeInfo, RescueResult};
use std::sync::Arc;

/// Runs one rescue end to end
///
/// scanning indicators, pre-scan pause, full scan-and-pivot, empathize
/// (distress face and sound), approach, reset. The sequence stops at the next
/// poll boundary when the ticket goes stale or the robot becomes distressed.
pub struct RescueOrchestrator {
    hardware: Hardware,
    state: Arc<SharedState>,
    indicators: Arc<IndicatorController>,
    engine: Arc<ScanEngine>,
    approach: ApproachController,
    full_scan: ScanProfile,
    pre_scan_pause_ms: u64,
}

impl RescueOrchestrator {
    pub fn new(
        hardware: Hardware,
        state: Arc<SharedState>,
        indicators: Arc<IndicatorController>,
        config: &RescueConfig,
    ) -> Self {
        let engine = Arc::new(ScanEngine::new(
            hardware.clone(),
            state.clone(),
            config.scan.clone(),
            config.fusion.clone(),
        ));
        let approach = ApproachController::new(
            hardware.clone(),
            state.clone(),
            engine.clone(),
            indicators.clone(),
            config.approach.clone(),
            config.fusion.clone(),
        );
        Self {
            hardware,
            state,
            indicators,
            engine,
            approach,
            full_scan: config.scan.full,
            pre_scan_pause_ms: config.scan.pre_scan_pause_ms,
        }
    }

    /// Claim a rescue of `target` and run it on the calling thread
    pub fn rescue(&self, target: DeviceId) -> RescueOutcome {
        match self.state.try_begin_rescue(target) {
            Some(ticket) => self.run(&ticket),
            None => RescueOutcome::Declined,
        }
    }

    /// Run an already claimed rescue
    pub fn run(&self, ticket: &RescueTicket) -> RescueOutcome {
        log::info!("rescue of {} started", ticket.target());

        let outcome = match self.sequence(ticket) {
            Ok(how) => RescueOutcome::Completed(how),
            Err(Interrupt::Cancelled) => RescueOutcome::Cancelled,
            Err(Interrupt::Distressed) => RescueOutcome::Interrupted,
        };

        self.hardware.drive.stop();
        let finished = self.state.finish_rescue(ticket);
        // A plain abort releases the rescue without resetting the indicators
        let released = outcome == RescueOutcome::Cancelled && !self.state.phase().is_active();
        if (finished || released) && !self.state.is_distressed() {
            self.indicators.calm();
        }

        log::info!("rescue of {} {}", ticket.target(), outcome);
        outcome
    }

    fn sequence(&self, ticket: &RescueTicket) -> Result<ApproachOutcome, Interrupt> {
        self.state
            .enter_phase(ticket, RescuePhase::Scanning, || self.indicators.scanning())?;
        self.engine.pause(ticket, self.pre_scan_pause_ms)?;
        self.engine.scan_and_pivot(ticket, &self.full_scan)?;

        // Empathize
        self.state.enter_phase(ticket, RescuePhase::Approaching, || {
            self.indicators.distress();
            self.indicators.play_distress_sound();
        })?;
        self.approach.approach(ticket)
    }
}

/// Starts a rescue for every request the protocol handler publishes
///
/// The sequence runs on a [`BackgroundTask`] so the scheduler keeps ticking
/// the radio and distress nodes meanwhile. Start and finish are published as
/// [`RescueEvent`]s.
pub struct RescueNode {
    name: String,
    id: DeviceId,
    hardware: Hardware,
    state: Arc<SharedState>,
    orchestrator: Arc<RescueOrchestrator>,
    requests: Hub<RescueRequest>,
    events: Hub<RescueEvent>,
    worker: BackgroundTask,
}

impl RescueNode {
    pub fn new(
        name: impl Into<String>,
        id: DeviceId,
        hardware: Hardware,
        state: Arc<SharedState>,
        orchestrator: Arc<RescueOrchestrator>,
        requests: Hub<RescueRequest>,
        events_topic: &str,
    ) -> RescueResult<Self> {
        let name = name.into();
        Ok(Self {
            worker: BackgroundTask::new(format!("{}-worker", name)),
            name,
            id,
            hardware,
            state,
            orchestrator,
            requests,
            events: Hub::new(events_topic)?,
        })
    }

    fn start(&mut self, request: RescueRequest, mut ctx: Option<&mut NodeInfo>) {
        let ticket = request.ticket;
        if !self.state.holds(&ticket) {
            // Released (e.g. by Done) before we got to it
            if let Some(ctx) = ctx.as_deref_mut() {
                ctx.log_warning(&format!(
                    "skipping stale rescue request for {}",
                    ticket.target()
                ));
            }
            return;
        }

        if let Some(ctx) = ctx {
            ctx.log_info(&format!(
                "rescuing {} (alert at {} dBm)",
                ticket.target(),
                request.alert_signal
            ));
        }

        let orchestrator = self.orchestrator.clone();
        let events = self.events.clone();
        let clock = self.hardware.clock.clone();
        let rescuer = self.id;
        if self.worker.is_running() {
            log::debug!("previous rescue worker still winding down, superseding it");
        }
        let state = self.state.clone();
        let spawned = self.worker.spawn(move |token| {
            let target = ticket.target();
            if state.supervise(&ticket, token).is_err() {
                log::debug!("rescue of {} released before its worker started", target);
            }
            let _ = events.send(
                RescueEvent::Started {
                    rescuer,
                    target,
                    at_ms: clock.now_ms(),
                },
                None,
            );
            let outcome = orchestrator.run(&ticket);
            let _ = events.send(
                RescueEvent::Finished {
                    rescuer,
                    target,
                    outcome,
                    at_ms: clock.now_ms(),
                },
                None,
            );
        });

        if let Err(e) = spawned {
            log::error!("could not start rescue of {}: {}", ticket.target(), e);
            self.state.finish_rescue(&ticket);
        }
    }
}

impl Node for RescueNode {
    fn name(&self) -> &str {
        &self.name
    }

    fn tick(&mut self, mut ctx: Option<&mut NodeInfo>) {
        while let Some(request) = self.requests.recv(ctx.as_deref_mut()) {
            self.start(request, ctx.as_deref_mut());
        }
    }

    fn shutdown(&mut self, ctx: &mut NodeInfo) -> RescueResult<()> {
        // The worker observes the cancelled token at its next poll and
        // closes out its own rescue
        self.worker.cancel();
        self.worker.join();
        if self.state.abort_rescue() {
            ctx.log_info("aborted rescue that never started");
        }
        self.hardware.drive.stop();
        Ok(())
    }
}
