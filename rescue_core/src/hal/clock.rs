//! Monotonic clocks
//!
//! Every timeout and polling loop in the rescue logic reads time and yields
//! through a [`Clock`], so the same control code runs on wall-clock time on a
//! robot and on virtual time in tests.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Monotonic millisecond clock with a cooperative sleep
pub trait Clock: Send + Sync {
    /// Milliseconds since an arbitrary fixed origin
    fn now_ms(&self) -> u64;

    /// Suspend the calling routine for `ms` milliseconds
    fn sleep_ms(&self, ms: u64);
}

/// Wall-clock time measured from construction
#[derive(Debug, Clone)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }

    fn sleep_ms(&self, ms: u64) {
        std::thread::sleep(Duration::from_millis(ms));
    }
}

/// Callback run after every advance of a [`SimClock`], with the new time
pub type AdvanceHook = Box<dyn FnMut(u64) + Send>;

/// Virtual clock for deterministic simulation
///
/// `sleep_ms` advances virtual time instantly and then runs every registered
/// hook. Hooks are how a test injects "concurrent" events, such as a packet
/// arriving or the robot being flipped, at exact points of a control loop.
/// Intended for a single foreground thread.
pub struct SimClock {
    now: AtomicU64,
    hooks: Mutex<Vec<AdvanceHook>>,
}

impl SimClock {
    pub fn new() -> Self {
        Self::starting_at(0)
    }

    pub fn starting_at(ms: u64) -> Self {
        Self {
            now: AtomicU64::new(ms),
            hooks: Mutex::new(Vec::new()),
        }
    }

    /// Register a hook run after each advance
    pub fn on_advance(&self, hook: impl FnMut(u64) + Send + 'static) {
        self.hooks.lock().push(Box::new(hook));
    }

    /// Advance virtual time (same as `sleep_ms`)
    pub fn advance(&self, ms: u64) {
        let now = self.now.fetch_add(ms, Ordering::SeqCst) + ms;

        // Hooks run unlocked so they may call back into the clock
        let mut running = std::mem::take(&mut *self.hooks.lock());
        for hook in running.iter_mut() {
            hook(now);
        }
        let mut hooks = self.hooks.lock();
        running.append(&mut hooks);
        *hooks = running;
    }
}

impl Default for SimClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SimClock {
    fn now_ms(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }

    fn sleep_ms(&self, ms: u64) {
        self.advance(ms);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_sim_clock_advances_on_sleep() {
        let clock = SimClock::starting_at(100);
        clock.sleep_ms(20);
        clock.sleep_ms(5);
        assert_eq!(clock.now_ms(), 125);
    }

    #[test]
    fn test_hooks_see_new_time() {
        let clock = SimClock::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        clock.on_advance(move |now| sink.lock().push(now));

        clock.sleep_ms(10);
        clock.sleep_ms(10);

        assert_eq!(*seen.lock(), vec![10, 20]);
    }

    #[test]
    fn test_hook_may_register_hook() {
        let clock = Arc::new(SimClock::new());
        let inner_clock = clock.clone();
        let fired = Arc::new(AtomicU64::new(0));
        let counter = fired.clone();
        let mut registered = false;
        clock.on_advance(move |_| {
            if !registered {
                registered = true;
                let counter = counter.clone();
                inner_clock.on_advance(move |_| {
                    counter.fetch_add(1, Ordering::SeqCst);
                });
            }
        });

        clock.sleep_ms(1);
        clock.sleep_ms(1);

        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_system_clock_is_monotonic() {
        let clock = SystemClock::new();
        let before = clock.now_ms();
        clock.sleep_ms(2);
        assert!(clock.now_ms() >= before + 2);
    }
}
