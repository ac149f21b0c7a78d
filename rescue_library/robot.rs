use crate::config::RescueConfig;
use crate::messages::{DeviceId, RescueEvent, RescueRequest};
use crate::nodes::{
    DistressMonitor, DistressNode, IndicatorController, IndicatorNode, ProtocolHandler,
    RadioNode, RescueNode, RescueOrchestrator,
};
use crate::state::SharedState;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rescue_core::hal::{Hardware, ManualTrigger};
use rescue_core::{Hub, RescueResult, Scheduler};
use std::sync::Arc;

/// One robot, fully wired
///
/// Owns the shared state and the control objects, and knows how to register
/// its four nodes with a [`Scheduler`]:
///
/// | Priority | Node | Rate |
/// |---|---|---|
/// | 0 | radio | every scheduler tick |
/// | 1 | distress | orientation poll period |
/// | 2 | rescue | every scheduler tick |
/// | 3 | indicator | animation frame period |
///
/// Topics are namespaced `robot{id}/...`, so ids must be unique per process.
pub struct Robot {
    id: DeviceId,
    hardware: Hardware,
    config: RescueConfig,
    state: Arc<SharedState>,
    indicators: Arc<IndicatorController>,
    handler: Arc<ProtocolHandler>,
    distress: Arc<DistressMonitor>,
    orchestrator: Arc<RescueOrchestrator>,
    requests: Hub<RescueRequest>,
}

impl Robot {
    pub fn new(id: DeviceId, hardware: Hardware, config: &RescueConfig) -> RescueResult<Self> {
        Self::build(id, hardware, config, StdRng::from_entropy())
    }

    /// Same as [`Robot::new`] with a seeded alert re-send generator
    pub fn with_seed(
        id: DeviceId,
        hardware: Hardware,
        config: &RescueConfig,
        seed: u64,
    ) -> RescueResult<Self> {
        Self::build(id, hardware, config, StdRng::seed_from_u64(seed))
    }

    fn build(
        id: DeviceId,
        hardware: Hardware,
        config: &RescueConfig,
        rng: StdRng,
    ) -> RescueResult<Self> {
        config.validate()?;
        hardware
            .radio
            .configure(config.radio.group, config.radio.transmit_power)?;

        let state = Arc::new(SharedState::new());
        let indicators = Arc::new(IndicatorController::new(hardware.indicator.clone()));

        // Two ends of one topic: the handler publishes, the rescue node reads
        let topic = format!("robot{}/rescue_request", id.0);
        let publisher = Hub::new(&topic)?;
        let requests = Hub::new(&topic)?;

        let handler = Arc::new(ProtocolHandler::new(
            id,
            hardware.clone(),
            state.clone(),
            indicators.clone(),
            publisher,
        ));
        let distress = Arc::new(DistressMonitor::with_rng(
            id,
            hardware.clone(),
            state.clone(),
            indicators.clone(),
            config.distress.clone(),
            rng,
        ));
        let orchestrator = Arc::new(RescueOrchestrator::new(
            hardware.clone(),
            state.clone(),
            indicators.clone(),
            config,
        ));

        indicators.calm();
        log::info!(
            "robot {} ready (radio group {}, power {})",
            id,
            config.radio.group,
            config.radio.transmit_power
        );

        Ok(Self {
            id,
            hardware,
            config: config.clone(),
            state,
            indicators,
            handler,
            distress,
            orchestrator,
            requests,
        })
    }

    /// Route a manual trigger (e.g. shake) into the distress monitor
    pub fn attach_manual_trigger(&self, trigger: &dyn ManualTrigger) {
        let distress = self.distress.clone();
        trigger.on_trigger(Box::new(move || {
            distress.manual_trigger();
        }));
    }

    /// Register this robot's nodes; node names are prefixed `robot{id}_`
    pub fn add_nodes(&self, scheduler: &mut Scheduler) -> RescueResult<()> {
        let prefix = format!("robot{}", self.id.0);

        let radio = RadioNode::new(
            format!("{}_radio", prefix),
            self.handler.clone(),
            self.hardware.clone(),
        );
        let distress = DistressNode::new(format!("{}_distress", prefix), self.distress.clone());
        let rescue = RescueNode::new(
            format!("{}_rescue", prefix),
            self.id,
            self.hardware.clone(),
            self.state.clone(),
            self.orchestrator.clone(),
            self.requests.clone(),
            &self.events_topic(),
        )?;
        let indicator = IndicatorNode::new(
            format!("{}_indicator", prefix),
            self.indicators.clone(),
            self.config.indicator.animation_frame_ms,
        );

        scheduler
            .add(Box::new(radio), 0, None)
            .add(Box::new(distress), 1, Some(true))
            .add(Box::new(rescue), 2, Some(true))
            .add(Box::new(indicator), 3, None);
        Ok(())
    }

    pub fn events_topic(&self) -> String {
        format!("robot{}/rescue_events", self.id.0)
    }

    /// A fresh subscriber to this robot's [`RescueEvent`]s
    pub fn subscribe_events(&self) -> RescueResult<Hub<RescueEvent>> {
        Hub::new(&self.events_topic())
    }

    pub fn id(&self) -> DeviceId {
        self.id
    }

    pub fn hardware(&self) -> &Hardware {
        &self.hardware
    }

    pub fn config(&self) -> &RescueConfig {
        &self.config
    }

    pub fn state(&self) -> &Arc<SharedState> {
        &self.state
    }

    pub fn handler(&self) -> &Arc<ProtocolHandler> {
        &self.handler
    }

    pub fn distress(&self) -> &Arc<DistressMonitor> {
        &self.distress
    }

    pub fn orchestrator(&self) -> &Arc<RescueOrchestrator> {
        &self.orchestrator
    }

    pub fn indicators(&self) -> &Arc<IndicatorController> {
        &self.indicators
    }
}
