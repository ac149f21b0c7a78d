use crate::core::node::{LogSummary, NodeInfo};
use crate::error::{RescueError, RescueResult};
use crossbeam::channel::{self, Receiver, Sender, TrySendError};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::any::Any;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Process-wide topic table: topic name -> `Topic<T>` (type-erased)
static TOPICS: Lazy<Mutex<HashMap<String, Arc<dyn Any + Send + Sync>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

/// Lock-free counters for Hub monitoring
#[derive(Debug, Default)]
pub struct AtomicHubMetrics {
    pub messages_sent: AtomicU64,
    pub messages_received: AtomicU64,
    pub send_failures: AtomicU64,
}

impl AtomicHubMetrics {
    /// Get current metrics snapshot
    pub fn snapshot(&self) -> HubMetrics {
        HubMetrics {
            messages_sent: self.messages_sent.load(Ordering::Relaxed),
            messages_received: self.messages_received.load(Ordering::Relaxed),
            send_failures: self.send_failures.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HubMetrics {
    pub messages_sent: u64,
    pub messages_received: u64,
    pub send_failures: u64,
}

struct SubscriberSlot<T> {
    id: u64,
    sender: Sender<T>,
}

struct Topic<T> {
    subscribers: Mutex<Vec<SubscriberSlot<T>>>,
    next_id: AtomicU64,
}

impl<T: Send + 'static> Topic<T> {
    fn lookup_or_create(topic_name: &str) -> RescueResult<Arc<Self>> {
        let mut topics = TOPICS.lock();
        if let Some(existing) = topics.get(topic_name) {
            return existing.clone().downcast::<Topic<T>>().map_err(|_| {
                RescueError::Communication(format!(
                    "Topic '{}' already carries a different message type",
                    topic_name
                ))
            });
        }

        let topic = Arc::new(Topic {
            subscribers: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(0),
        });
        topics.insert(topic_name.to_string(), topic.clone());
        Ok(topic)
    }
}

/// In-process publish/subscribe endpoint
///
/// Every Hub created on a topic receives every message sent on that topic by
/// any *other* Hub. Queues are bounded; a full subscriber drops the message
/// and the failure is counted, so a slow reader never blocks a publisher.
pub struct Hub<T> {
    topic: Arc<Topic<T>>,
    topic_name: String,
    subscriber_id: u64,
    receiver: Receiver<T>,
    metrics: Arc<AtomicHubMetrics>,
}

// Clones share the same subscriber queue
impl<T> Clone for Hub<T> {
    fn clone(&self) -> Self {
        Self {
            topic: self.topic.clone(),
            topic_name: self.topic_name.clone(),
            subscriber_id: self.subscriber_id,
            receiver: self.receiver.clone(),
            metrics: self.metrics.clone(),
        }
    }
}

impl<T> std::fmt::Debug for Hub<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hub")
            .field("topic_name", &self.topic_name)
            .field("subscriber_id", &self.subscriber_id)
            .finish_non_exhaustive()
    }
}

impl<T: Clone + Send + 'static> Hub<T> {
    /// Create a new Hub with the default queue capacity (1024)
    pub fn new(topic_name: &str) -> RescueResult<Self> {
        Self::new_with_capacity(topic_name, 1024)
    }

    pub fn new_with_capacity(topic_name: &str, capacity: usize) -> RescueResult<Self> {
        if capacity == 0 {
            return Err(RescueError::InvalidInput(
                "Hub capacity must be at least 1".to_string(),
            ));
        }

        let topic = Topic::<T>::lookup_or_create(topic_name)?;
        let (sender, receiver) = channel::bounded(capacity);
        let subscriber_id = topic.next_id.fetch_add(1, Ordering::Relaxed);
        topic.subscribers.lock().push(SubscriberSlot {
            id: subscriber_id,
            sender,
        });

        Ok(Hub {
            topic,
            topic_name: topic_name.to_string(),
            subscriber_id,
            receiver,
            metrics: Arc::new(AtomicHubMetrics::default()),
        })
    }

    /// Publish to every other Hub on this topic
    ///
    /// Returns the message back only when subscribers exist and every one of
    /// them was full.
    pub fn send(&self, msg: T, ctx: Option<&mut NodeInfo>) -> Result<(), T>
    where
        T: LogSummary,
    {
        let summary = ctx.as_ref().map(|_| msg.log_summary());

        let mut delivered = 0usize;
        let mut attempted = 0usize;
        {
            let mut subscribers = self.topic.subscribers.lock();
            subscribers.retain(|slot| {
                if slot.id == self.subscriber_id {
                    return true;
                }
                attempted += 1;
                match slot.sender.try_send(msg.clone()) {
                    Ok(()) => {
                        delivered += 1;
                        true
                    }
                    Err(TrySendError::Full(_)) => true,
                    // Reader dropped: prune the slot
                    Err(TrySendError::Disconnected(_)) => {
                        attempted -= 1;
                        false
                    }
                }
            });
        }

        if attempted > 0 && delivered == 0 {
            self.metrics.send_failures.fetch_add(1, Ordering::Relaxed);
            return Err(msg);
        }
        if delivered < attempted {
            self.metrics.send_failures.fetch_add(1, Ordering::Relaxed);
        }
        self.metrics.messages_sent.fetch_add(1, Ordering::Relaxed);

        if let (Some(ctx), Some(summary)) = (ctx, summary) {
            ctx.log_pub_summary(&self.topic_name, &summary);
        }
        Ok(())
    }

    /// Take the next queued message without blocking
    pub fn recv(&self, ctx: Option<&mut NodeInfo>) -> Option<T>
    where
        T: LogSummary,
    {
        let msg = self.receiver.try_recv().ok()?;
        self.metrics.messages_received.fetch_add(1, Ordering::Relaxed);
        if let Some(ctx) = ctx {
            ctx.log_sub_summary(&self.topic_name, &msg.log_summary());
        }
        Some(msg)
    }

    pub fn get_metrics(&self) -> HubMetrics {
        self.metrics.snapshot()
    }
}
