//! Supervised background work keyed by a generation counter
//!
//! Starting or cancelling a task bumps the generation. A running task holds a
//! [`TaskToken`] and checks it at its own poll boundaries; once the token is no
//! longer current the task winds down on its own. Starting a new task while an
//! old one is still finishing is therefore well defined: the newest start wins
//! and the old one observes cancellation at its next check.

use crate::error::{RescueError, RescueResult};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

/// Handed to the body of a background task
#[derive(Debug, Clone)]
pub struct TaskToken {
    generation: Arc<AtomicU64>,
    mine: u64,
}

impl TaskToken {
    /// False once the task was cancelled or superseded
    pub fn is_current(&self) -> bool {
        self.generation.load(Ordering::SeqCst) == self.mine
    }
}

/// A named slot running at most one live body on its own thread
pub struct BackgroundTask {
    name: String,
    generation: Arc<AtomicU64>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl BackgroundTask {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            generation: Arc::new(AtomicU64::new(0)),
            handle: Mutex::new(None),
        }
    }

    /// Start `body`, superseding whatever ran before. Returns the new generation.
    pub fn spawn<F>(&self, body: F) -> RescueResult<u64>
    where
        F: FnOnce(TaskToken) + Send + 'static,
    {
        let mine = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let token = TaskToken {
            generation: self.generation.clone(),
            mine,
        };

        let handle = std::thread::Builder::new()
            .name(format!("{}-{}", self.name, mine))
            .spawn(move || body(token))
            .map_err(|e| {
                RescueError::Internal(format!("Failed to spawn task '{}': {}", self.name, e))
            })?;

        // The previous thread, if any, is detached and winds down on its own
        *self.handle.lock() = Some(handle);
        Ok(mine)
    }

    /// Invalidate the current token
    pub fn cancel(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.handle
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Wait for the most recently spawned body to return
    pub fn join(&self) {
        let handle = self.handle.lock().take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                log::error!("Background task '{}' panicked", self.name);
            }
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for BackgroundTask {
    fn drop(&mut self) {
        self.cancel();
    }
}
