use crate::config::{ApproachSettings, FusionSettings};
use crate::messages::{ApproachOutcome, RescuePhase, RescueTicket};
use crate::nodes::indicator::IndicatorController;
use crate::nodes::scan::ScanEngine;
use crate::state::{Interrupt, SharedState};
use rescue_core::hal::{Deadline, Hardware, Interval};
use std::sync::Arc;

/// Drives toward the target while it can still be heard
///
/// Forward motion at reduced speed, polled at a fixed interval against three
/// timers: a hard limit, a quiet-stop timer reset by any loud sample, and a
/// periodic brief rescan that corrects heading. The ticket is checked on every
/// poll, so distress or a released target stops the robot within one interval.
pub struct ApproachController {
    hardware: Hardware,
    state: Arc<SharedState>,
    engine: Arc<ScanEngine>,
    indicators: Arc<IndicatorController>,
    settings: ApproachSettings,
    fusion: FusionSettings,
}

impl ApproachController {
    pub fn new(
        hardware: Hardware,
        state: Arc<SharedState>,
        engine: Arc<ScanEngine>,
        indicators: Arc<IndicatorController>,
        settings: ApproachSettings,
        fusion: FusionSettings,
    ) -> Self {
        Self {
            hardware,
            state,
            engine,
            indicators,
            settings,
            fusion,
        }
    }

    /// Run the approach to completion; motion is stopped on return
    pub fn approach(&self, ticket: &RescueTicket) -> Result<ApproachOutcome, Interrupt> {
        let forward = self.settings.forward_speed;
        let start = self.hardware.now_ms();
        let limit = Deadline::new(start, self.settings.max_duration_ms);
        let mut rescan = Interval::new(start, self.settings.rescan_period_ms);
        let mut quiet_since: Option<u64> = None;

        let motion = self.hardware.drive_guarded(forward, forward);
        let mut now = start;
        while !limit.is_expired(now) {
            self.state.check(ticket)?;

            let loudness = self.hardware.sound.loudness();
            if loudness >= self.settings.loudness_threshold {
                quiet_since = None;
            } else {
                let since = *quiet_since.get_or_insert(now);
                if now.saturating_sub(since) >= self.settings.quiet_stop_ms {
                    log::debug!("target {} went quiet", ticket.target());
                    return Ok(ApproachOutcome::QuietStop);
                }
            }

            if self.has_arrived(now) {
                log::debug!("target {} beacon at arrival strength", ticket.target());
                return Ok(ApproachOutcome::Arrived);
            }

            if rescan.is_due(now) {
                motion.stop();
                self.brief_rescan(ticket)?;
                motion.set_speeds(forward, forward);
                rescan.reset(self.hardware.now_ms());
                // Time spent rescanning does not count as quiet
                quiet_since = None;
            }

            self.hardware.sleep_ms(self.settings.poll_interval_ms);
            now = self.hardware.now_ms();
        }

        log::debug!("approach of {} timed out", ticket.target());
        Ok(ApproachOutcome::Timeout)
    }

    fn has_arrived(&self, now: u64) -> bool {
        let Some(arrival) = self.settings.arrival_signal else {
            return false;
        };
        self.state
            .fresh_signal(now, self.fusion.beacon_timeout_ms)
            .is_some_and(|signal| signal >= arrival)
    }

    fn brief_rescan(&self, ticket: &RescueTicket) -> Result<(), Interrupt> {
        self.state
            .enter_phase(ticket, RescuePhase::Rescanning, || self.indicators.scanning())?;
        let profile = self.engine.settings().brief;
        self.engine.scan_and_pivot(ticket, &profile)?;
        self.state
            .enter_phase(ticket, RescuePhase::Approaching, || self.indicators.distress())
    }
}
