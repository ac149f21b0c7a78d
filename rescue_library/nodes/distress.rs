use crate::config::DistressSettings;
use crate::messages::{DeviceId, RadioMessage, SelfStatus};
use crate::nodes::indicator::IndicatorController;
use crate::state::SharedState;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rescue_core::hal::{Hardware, Interval};
use rescue_core::{Node, NodeConfig, NodeInfo, RescueResult};
use std::sync::Arc;

/// The robot's own healthy/distressed state machine
///
/// The only writer of [`SelfStatus`]. Entering distress stops the wheels,
/// abandons any rescue, shows the distress face and broadcasts `ALERT`; while
/// distressed, [`beacon_round`](Self::beacon_round) keeps a `BEACON` going
/// with the distress sound and an occasional repeated `ALERT`. Exiting
/// broadcasts `DONE` and restores the calm face.
pub struct DistressMonitor {
    self_id: DeviceId,
    hardware: Hardware,
    state: Arc<SharedState>,
    indicators: Arc<IndicatorController>,
    settings: DistressSettings,
    /// Manual trigger keeps us distressed until this time
    pinned_until: Mutex<Option<u64>>,
    rng: Mutex<StdRng>,
}

impl DistressMonitor {
    pub fn new(
        self_id: DeviceId,
        hardware: Hardware,
        state: Arc<SharedState>,
        indicators: Arc<IndicatorController>,
        settings: DistressSettings,
    ) -> Self {
        Self::with_rng(
            self_id,
            hardware,
            state,
            indicators,
            settings,
            StdRng::from_entropy(),
        )
    }

    /// Deterministic alert re-sends, for simulation and tests
    pub fn with_rng(
        self_id: DeviceId,
        hardware: Hardware,
        state: Arc<SharedState>,
        indicators: Arc<IndicatorController>,
        settings: DistressSettings,
        rng: StdRng,
    ) -> Self {
        Self {
            self_id,
            hardware,
            state,
            indicators,
            settings,
            pinned_until: Mutex::new(None),
            rng: Mutex::new(rng),
        }
    }

    pub fn status(&self) -> SelfStatus {
        self.state.status()
    }

    /// Healthy -> Distressed. Returns false if already distressed.
    pub fn enter_distress(&self) -> bool {
        if self.state.swap_status(SelfStatus::Distressed) == SelfStatus::Distressed {
            return false;
        }

        self.hardware.drive.stop();
        if self.state.abort_rescue() {
            log::info!("robot {} abandoned its rescue", self.self_id);
        }
        self.indicators.distress();
        self.broadcast(RadioMessage::alert(self.self_id));
        log::info!("robot {} entered distress", self.self_id);
        true
    }

    /// Distressed -> Healthy. Returns false if already healthy.
    pub fn exit_distress(&self) -> bool {
        if self.state.swap_status(SelfStatus::Healthy) == SelfStatus::Healthy {
            return false;
        }

        *self.pinned_until.lock() = None;
        self.broadcast(RadioMessage::done(self.self_id));
        self.indicators.calm();
        log::info!("robot {} recovered", self.self_id);
        true
    }

    /// Manual trigger (shake): enter distress and hold it for the minimum time
    pub fn manual_trigger(&self) -> bool {
        if !self.enter_distress() {
            return false;
        }
        let until = self.hardware.now_ms() + self.settings.manual_hold_ms;
        *self.pinned_until.lock() = Some(until);
        log::debug!("robot {} distress pinned until {} ms", self.self_id, until);
        true
    }

    /// Whether a manual hold is still in force
    pub fn is_pinned(&self) -> bool {
        self.pinned_until.lock().is_some()
    }

    /// Read the accelerometer and apply the flip thresholds
    ///
    /// Returns the new status when this poll changed it.
    pub fn poll_orientation(&self) -> Option<SelfStatus> {
        let accel = self.hardware.accelerometer.vertical_acceleration();
        let now = self.hardware.now_ms();

        let hold = *self.pinned_until.lock();
        if let Some(until) = hold {
            if now < until {
                // Held: flipping back up does not release yet
                return None;
            }
            *self.pinned_until.lock() = None;
            if self.state.is_distressed() && accel > self.settings.manual_release_threshold {
                return self.exit_distress().then_some(SelfStatus::Healthy);
            }
        }

        let distressed = self.state.is_distressed();
        if !distressed && accel < self.settings.flip_down_threshold {
            self.enter_distress().then_some(SelfStatus::Distressed)
        } else if distressed && accel > self.settings.flip_up_threshold {
            self.exit_distress().then_some(SelfStatus::Healthy)
        } else {
            None
        }
    }

    /// One beacon period: `BEACON`, distress sound, maybe another `ALERT`
    ///
    /// Does nothing while healthy.
    pub fn beacon_round(&self) -> bool {
        if !self.state.is_distressed() {
            return false;
        }
        self.broadcast(RadioMessage::beacon(self.self_id));
        self.indicators.play_distress_sound();

        let probability = self.settings.alert_resend_probability.clamp(0.0, 1.0);
        if self.rng.lock().gen_bool(probability) {
            self.broadcast(RadioMessage::alert(self.self_id));
        }
        true
    }

    pub fn settings(&self) -> &DistressSettings {
        &self.settings
    }

    fn broadcast(&self, message: RadioMessage) {
        let sent = message
            .encode()
            .and_then(|payload| self.hardware.radio.send(&payload));
        if let Err(e) = sent {
            log::warn!(
                "robot {} failed to broadcast {:?}: {}",
                self.self_id,
                message.kind,
                e
            );
        }
    }
}

/// Polls orientation and runs the beacon loop while distressed
pub struct DistressNode {
    name: String,
    monitor: Arc<DistressMonitor>,
    beacon: Option<Interval>,
}

impl DistressNode {
    pub fn new(name: impl Into<String>, monitor: Arc<DistressMonitor>) -> Self {
        Self {
            name: name.into(),
            monitor,
            beacon: None,
        }
    }
}

impl Node for DistressNode {
    fn name(&self) -> &str {
        &self.name
    }

    fn init(&mut self, ctx: &mut NodeInfo) -> RescueResult<()> {
        ctx.log_debug(&format!(
            "polling orientation every {} ms",
            self.monitor.settings().orientation_poll_ms
        ));
        Ok(())
    }

    fn tick(&mut self, ctx: Option<&mut NodeInfo>) {
        if let Some(status) = self.monitor.poll_orientation() {
            if let Some(ctx) = ctx {
                ctx.log_info(&format!("status -> {:?}", status));
            }
        }

        if self.monitor.status() == SelfStatus::Distressed {
            let period = self.monitor.settings().beacon_period_ms;
            let now = self.monitor.hardware.now_ms();
            // First round fires right after entering distress
            let beacon = self.beacon.get_or_insert_with(|| Interval::immediate(period));
            if beacon.tick(now) {
                self.monitor.beacon_round();
            }
        } else {
            self.beacon = None;
        }
    }

    fn get_config(&self) -> NodeConfig {
        NodeConfig {
            rate_hz: Some(1000.0 / self.monitor.settings().orientation_poll_ms.max(1) as f64),
            ..Default::default()
        }
    }
}
