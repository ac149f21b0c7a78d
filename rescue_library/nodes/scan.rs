//! Directional scan and scoring
//!
//! A scan window rotates the robot in place while sampling loudness and the
//! tracked beacon's signal strength; its peaks fuse into a
//! [`DirectionalScore`]. A scan-and-pivot runs a left-biased then a
//! right-biased window and turns toward the better side.
//!
//! Every routine here runs inside a claimed rescue and checks its
//! [`RescueTicket`] at each sample, returning an [`Interrupt`] as soon as the
//! robot is distressed or the rescue was released. Motion is held through a
//! [`MotionGuard`](rescue_core::hal::MotionGuard), so the wheels stop on every
//! exit path.

use crate::algorithms::direction::{choose_heading, DirectionalScore, Heading};
use crate::algorithms::normalize::NO_SIGNAL;
use crate::config::{FusionSettings, ScanProfile, ScanSettings};
use crate::messages::{RescuePhase, RescueTicket};
use crate::state::{Interrupt, SharedState};
use rescue_core::hal::{Deadline, Hardware};
use std::sync::Arc;

/// Scores from both windows and the side chosen
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScanResult {
    pub left: DirectionalScore,
    pub right: DirectionalScore,
    pub heading: Heading,
}

pub struct ScanEngine {
    hardware: Hardware,
    state: Arc<SharedState>,
    scan: ScanSettings,
    fusion: FusionSettings,
}

impl ScanEngine {
    pub fn new(
        hardware: Hardware,
        state: Arc<SharedState>,
        scan: ScanSettings,
        fusion: FusionSettings,
    ) -> Self {
        Self {
            hardware,
            state,
            scan,
            fusion,
        }
    }

    /// Drive at `(left, right)` for `duration_ms` and score what was heard
    ///
    /// Zero fresh beacon samples leave the signal peak at the no-signal
    /// sentinel, which normalizes to 0.
    pub fn scan_side(
        &self,
        ticket: &RescueTicket,
        left: i32,
        right: i32,
        duration_ms: u64,
    ) -> Result<DirectionalScore, Interrupt> {
        let _motion = self.hardware.drive_guarded(left, right);
        let window = Deadline::new(self.hardware.now_ms(), duration_ms);

        let mut peak_loudness = 0;
        let mut peak_signal = NO_SIGNAL;
        let mut now = window.start_ms();
        while !window.is_expired(now) {
            self.state.check(ticket)?;

            peak_loudness = peak_loudness.max(self.hardware.sound.loudness());
            if let Some(signal) = self
                .state
                .fresh_signal(now, self.fusion.beacon_timeout_ms)
            {
                peak_signal = peak_signal.max(signal);
            }

            self.hardware.sleep_ms(self.scan.sample_interval_ms);
            now = self.hardware.now_ms();
        }

        let score = DirectionalScore::from_peaks(
            peak_loudness,
            peak_signal,
            self.fusion.sound_weight,
            self.fusion.signal_weight,
        );
        log::trace!(
            "scan ({}, {}) for {} ms: loudness {} signal {} -> {}",
            left,
            right,
            duration_ms,
            peak_loudness,
            peak_signal,
            score
        );
        Ok(score)
    }

    /// Left window, right window, then pivot toward the winner
    ///
    /// The phase moves to `Seeking` for the pivot; callers set it back.
    pub fn scan_and_pivot(
        &self,
        ticket: &RescueTicket,
        profile: &ScanProfile,
    ) -> Result<ScanResult, Interrupt> {
        let speed = profile.turn_speed;

        let left = self.scan_side(ticket, -speed, speed, profile.scan_ms)?;
        self.pause(ticket, profile.settle_ms)?;
        let right = self.scan_side(ticket, speed, -speed, profile.scan_ms)?;
        if profile.trailing_settle {
            self.pause(ticket, profile.settle_ms)?;
        }

        let heading = choose_heading(left, right);
        log::debug!(
            "target {}: left {} right {} -> pivot {:?}",
            ticket.target(),
            left,
            right,
            heading
        );

        self.state.set_phase(ticket, RescuePhase::Seeking)?;
        let (left_speed, right_speed) = heading.pivot_speeds(speed);
        let motion = self.hardware.drive_guarded(left_speed, right_speed);
        self.pause(ticket, profile.seek_ms)?;
        drop(motion);

        Ok(ScanResult {
            left,
            right,
            heading,
        })
    }

    /// Sleep for `duration_ms` in sample-interval steps, checking the ticket
    pub fn pause(&self, ticket: &RescueTicket, duration_ms: u64) -> Result<(), Interrupt> {
        let deadline = Deadline::new(self.hardware.now_ms(), duration_ms);
        loop {
            self.state.check(ticket)?;
            let remaining = deadline.remaining(self.hardware.now_ms());
            if remaining == 0 {
                return Ok(());
            }
            self.hardware
                .sleep_ms(remaining.min(self.scan.sample_interval_ms));
        }
    }

    pub fn settings(&self) -> &ScanSettings {
        &self.scan
    }
}
