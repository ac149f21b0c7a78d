//! Per-robot shared state
//!
//! Three concurrency contexts touch this state: the radio message handler,
//! the distress monitor and the foreground rescue sequence.
//!
//! - [`SelfStatus`] lives in an atomic and has a single writer, the distress
//!   monitor (the setter is crate-private).
//! - The rescue phase, the track and an epoch counter live together behind one
//!   mutex, so a claim, a release and a check each see a consistent triple.
//!
//! Claiming a rescue yields a [`RescueTicket`] stamped with the current epoch.
//! Anything that ends a rescue (finish, distress abort, the target's `Done`)
//! bumps the epoch, which invalidates the ticket. The running sequence checks
//! its ticket at every poll boundary and unwinds when it goes stale.
//!
//! The worker thread running a rescue registers its [`TaskToken`] with
//! [`SharedState::supervise`]; once that token is cancelled or superseded the
//! ticket fails its checks as well.

use crate::algorithms::normalize::NO_SIGNAL;
use crate::messages::{DeviceId, RescuePhase, RescueTicket, SelfStatus};
use parking_lot::Mutex;
use rescue_core::TaskToken;
use std::sync::atomic::{AtomicU8, Ordering};

/// Why a running rescue step must stop early
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Interrupt {
    /// The ticket went stale: target released, or rescue aborted
    Cancelled,
    /// This robot itself is in distress
    Distressed,
}

/// The one outstanding rescue target and its latest beacon
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RescueTrack {
    pub target: Option<DeviceId>,
    /// dBm, or [`NO_SIGNAL`] before the first beacon
    pub last_seen_signal: i32,
    pub last_seen_at: Option<u64>,
}

impl Default for RescueTrack {
    fn default() -> Self {
        Self {
            target: None,
            last_seen_signal: NO_SIGNAL,
            last_seen_at: None,
        }
    }
}

impl RescueTrack {
    /// Latest beacon signal if it is younger than `timeout_ms`
    pub fn fresh_signal(&self, now_ms: u64, timeout_ms: u64) -> Option<i32> {
        let seen_at = self.last_seen_at?;
        (now_ms.saturating_sub(seen_at) < timeout_ms).then_some(self.last_seen_signal)
    }
}

#[derive(Debug)]
struct RescueSlot {
    phase: RescuePhase,
    epoch: u64,
    track: RescueTrack,
    worker: Option<TaskToken>,
}

impl RescueSlot {
    /// End whatever is running: phase `Idle`, track cleared, tickets stale
    fn release(&mut self) {
        self.phase = RescuePhase::Idle;
        self.epoch += 1;
        self.track = RescueTrack::default();
        self.worker = None;
    }

    /// `ticket` is the claim currently in the slot
    fn owns(&self, ticket: &RescueTicket) -> bool {
        self.epoch == ticket.epoch() && self.phase.is_active()
    }

    /// Owned, and the supervising worker (if any) was not cancelled
    fn holds(&self, ticket: &RescueTicket) -> bool {
        self.owns(ticket) && self.worker.as_ref().map_or(true, TaskToken::is_current)
    }
}

#[derive(Debug)]
pub struct SharedState {
    status: AtomicU8,
    rescue: Mutex<RescueSlot>,
}

impl Default for SharedState {
    fn default() -> Self {
        Self::new()
    }
}

impl SharedState {
    pub fn new() -> Self {
        Self {
            status: AtomicU8::new(SelfStatus::Healthy as u8),
            rescue: Mutex::new(RescueSlot {
                phase: RescuePhase::Idle,
                epoch: 0,
                track: RescueTrack::default(),
                worker: None,
            }),
        }
    }

    pub fn status(&self) -> SelfStatus {
        SelfStatus::from_u8(self.status.load(Ordering::SeqCst))
    }

    pub fn is_distressed(&self) -> bool {
        self.status() == SelfStatus::Distressed
    }

    /// Store a new status, returning the previous one
    pub(crate) fn swap_status(&self, status: SelfStatus) -> SelfStatus {
        SelfStatus::from_u8(self.status.swap(status as u8, Ordering::SeqCst))
    }

    pub fn phase(&self) -> RescuePhase {
        self.rescue.lock().phase
    }

    pub fn track(&self) -> RescueTrack {
        self.rescue.lock().track
    }

    pub fn target(&self) -> Option<DeviceId> {
        self.rescue.lock().track.target
    }

    /// Claim a rescue of `target`
    ///
    /// Succeeds only while healthy and idle; the claim moves the phase to
    /// `Scanning`. Alerts that arrive while busy or distressed are dropped,
    /// never queued.
    pub fn try_begin_rescue(&self, target: DeviceId) -> Option<RescueTicket> {
        let mut slot = self.rescue.lock();
        if self.is_distressed() || slot.phase.is_active() {
            return None;
        }
        slot.epoch += 1;
        slot.phase = RescuePhase::Scanning;
        slot.track.target = Some(target);
        Some(RescueTicket::new(slot.epoch, target))
    }

    /// Whether `ticket` still owns the running rescue
    pub fn holds(&self, ticket: &RescueTicket) -> bool {
        self.rescue.lock().holds(ticket)
    }

    /// Poll-boundary check for a running rescue step
    pub fn check(&self, ticket: &RescueTicket) -> Result<(), Interrupt> {
        if self.is_distressed() {
            return Err(Interrupt::Distressed);
        }
        if !self.holds(ticket) {
            return Err(Interrupt::Cancelled);
        }
        Ok(())
    }

    /// Tie a claimed rescue to the worker running it
    ///
    /// Cancelling or superseding `token` then interrupts the rescue at its
    /// next poll boundary.
    pub fn supervise(&self, ticket: &RescueTicket, token: TaskToken) -> Result<(), Interrupt> {
        let mut slot = self.rescue.lock();
        if !slot.holds(ticket) {
            return Err(Interrupt::Cancelled);
        }
        slot.worker = Some(token);
        Ok(())
    }

    /// Move a held rescue to `phase`; fails once the ticket is stale
    pub fn set_phase(&self, ticket: &RescueTicket, phase: RescuePhase) -> Result<(), Interrupt> {
        self.enter_phase(ticket, phase, || ())
    }

    /// Move a held rescue to `phase` and run `effect` while still holding it
    ///
    /// Nothing can release the rescue between the check and `effect`, so
    /// effects such as indicator changes never land after a release.
    pub fn enter_phase<R>(
        &self,
        ticket: &RescueTicket,
        phase: RescuePhase,
        effect: impl FnOnce() -> R,
    ) -> Result<R, Interrupt> {
        let mut slot = self.rescue.lock();
        if self.is_distressed() {
            return Err(Interrupt::Distressed);
        }
        if !slot.holds(ticket) {
            return Err(Interrupt::Cancelled);
        }
        if phase.is_active() {
            slot.phase = phase;
        } else {
            slot.release();
        }
        Ok(effect())
    }

    /// Normal end of a rescue. Returns false if something else ended it first.
    pub fn finish_rescue(&self, ticket: &RescueTicket) -> bool {
        let mut slot = self.rescue.lock();
        if !slot.owns(ticket) {
            return false;
        }
        slot.release();
        true
    }

    /// Drop any running rescue (used on entering distress)
    pub fn abort_rescue(&self) -> bool {
        let mut slot = self.rescue.lock();
        if !slot.phase.is_active() {
            return false;
        }
        slot.release();
        true
    }

    /// `Done` from `sender`: release the rescue if `sender` is the target
    pub fn complete_target(&self, sender: DeviceId) -> bool {
        let mut slot = self.rescue.lock();
        if slot.track.target != Some(sender) {
            return false;
        }
        slot.release();
        true
    }

    /// `Beacon` from `sender`: record it when untracked or from the target
    pub fn record_beacon(&self, sender: DeviceId, signal: i32, now_ms: u64) -> bool {
        let mut slot = self.rescue.lock();
        match slot.track.target {
            Some(target) if target != sender => false,
            _ => {
                slot.track.last_seen_signal = signal;
                slot.track.last_seen_at = Some(now_ms);
                true
            }
        }
    }

    /// Latest beacon signal if still within the staleness window
    pub fn fresh_signal(&self, now_ms: u64, timeout_ms: u64) -> Option<i32> {
        self.rescue.lock().track.fresh_signal(now_ms, timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rescue_core::BackgroundTask;

    #[test]
    fn test_claim_requires_idle_and_healthy() {
        let state = SharedState::new();
        let ticket = state.try_begin_rescue(DeviceId(2)).unwrap();
        assert_eq!(state.phase(), RescuePhase::Scanning);
        assert_eq!(state.target(), Some(DeviceId(2)));

        // Busy: second alert dropped
        assert!(state.try_begin_rescue(DeviceId(3)).is_none());
        assert_eq!(state.target(), Some(DeviceId(2)));

        assert!(state.finish_rescue(&ticket));
        state.swap_status(SelfStatus::Distressed);
        assert!(state.try_begin_rescue(DeviceId(3)).is_none());
        assert_eq!(state.phase(), RescuePhase::Idle);
    }

    #[test]
    fn test_target_is_none_while_idle() {
        let state = SharedState::new();
        let ticket = state.try_begin_rescue(DeviceId(2)).unwrap();
        assert!(state.finish_rescue(&ticket));
        assert_eq!(state.phase(), RescuePhase::Idle);
        assert_eq!(state.target(), None);
    }

    #[test]
    fn test_done_invalidates_ticket() {
        let state = SharedState::new();
        let ticket = state.try_begin_rescue(DeviceId(5)).unwrap();
        state.set_phase(&ticket, RescuePhase::Approaching).unwrap();

        assert!(!state.complete_target(DeviceId(6)));
        assert!(state.holds(&ticket));

        assert!(state.complete_target(DeviceId(5)));
        assert_eq!(state.phase(), RescuePhase::Idle);
        assert_eq!(state.track(), RescueTrack::default());
        assert_eq!(state.check(&ticket), Err(Interrupt::Cancelled));
        assert_eq!(
            state.set_phase(&ticket, RescuePhase::Rescanning),
            Err(Interrupt::Cancelled)
        );
        assert!(!state.finish_rescue(&ticket));

        // Duplicate delivery is harmless
        assert!(!state.complete_target(DeviceId(5)));
    }

    #[test]
    fn test_stale_ticket_cannot_touch_new_rescue() {
        let state = SharedState::new();
        let old = state.try_begin_rescue(DeviceId(1)).unwrap();
        assert!(state.abort_rescue());
        let new = state.try_begin_rescue(DeviceId(2)).unwrap();

        assert!(!state.finish_rescue(&old));
        assert!(state.holds(&new));
        assert_eq!(state.target(), Some(DeviceId(2)));
    }

    #[test]
    fn test_check_reports_distress_first() {
        let state = SharedState::new();
        let ticket = state.try_begin_rescue(DeviceId(1)).unwrap();
        assert_eq!(state.check(&ticket), Ok(()));
        state.swap_status(SelfStatus::Distressed);
        assert_eq!(state.check(&ticket), Err(Interrupt::Distressed));
    }

    #[test]
    fn test_enter_phase_skips_effect_once_released() {
        let state = SharedState::new();
        let ticket = state.try_begin_rescue(DeviceId(5)).unwrap();

        let ran = state.enter_phase(&ticket, RescuePhase::Seeking, || "shown");
        assert_eq!(ran, Ok("shown"));
        assert_eq!(state.phase(), RescuePhase::Seeking);

        assert!(state.complete_target(DeviceId(5)));
        let mut touched = false;
        let late = state.enter_phase(&ticket, RescuePhase::Approaching, || touched = true);
        assert_eq!(late, Err(Interrupt::Cancelled));
        assert!(!touched);
        assert_eq!(state.phase(), RescuePhase::Idle);
    }

    #[test]
    fn test_enter_phase_refused_while_distressed() {
        let state = SharedState::new();
        let ticket = state.try_begin_rescue(DeviceId(5)).unwrap();
        state.swap_status(SelfStatus::Distressed);

        let mut touched = false;
        let result = state.enter_phase(&ticket, RescuePhase::Approaching, || touched = true);
        assert_eq!(result, Err(Interrupt::Distressed));
        assert!(!touched);
    }

    #[test]
    fn test_cancelled_worker_token_interrupts_rescue() {
        let state = SharedState::new();
        let task = BackgroundTask::new("rescue");
        let ticket = state.try_begin_rescue(DeviceId(3)).unwrap();

        let (tx, rx) = crossbeam::channel::bounded(1);
        task.spawn(move |token| {
            let _ = tx.send(token);
        })
        .unwrap();
        let token = rx.recv().unwrap();
        task.join();

        state.supervise(&ticket, token).unwrap();
        assert_eq!(state.check(&ticket), Ok(()));

        task.cancel();
        assert_eq!(state.check(&ticket), Err(Interrupt::Cancelled));
        // The worker can still close out its own claim
        assert!(state.finish_rescue(&ticket));
        assert_eq!(state.phase(), RescuePhase::Idle);
    }

    #[test]
    fn test_beacon_filtering() {
        let state = SharedState::new();
        // Untracked: any beacon counts
        assert!(state.record_beacon(DeviceId(9), -80, 100));
        assert_eq!(state.track().last_seen_signal, -80);

        state.try_begin_rescue(DeviceId(4)).unwrap();
        assert!(!state.record_beacon(DeviceId(9), -50, 200));
        let track = state.track();
        assert_eq!(track.last_seen_signal, -80);
        assert_eq!(track.last_seen_at, Some(100));

        assert!(state.record_beacon(DeviceId(4), -60, 300));
        assert_eq!(state.track().last_seen_signal, -60);
    }

    #[test]
    fn test_staleness_window() {
        let state = SharedState::new();
        assert_eq!(state.fresh_signal(0, 2000), None);
        state.record_beacon(DeviceId(1), -70, 1_000);
        assert_eq!(state.fresh_signal(2_999, 2000), Some(-70));
        assert_eq!(state.fresh_signal(3_000, 2000), None);
    }
}
