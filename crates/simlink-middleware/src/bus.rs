//! Named-topic publish/subscribe message bus.
//!
//! Every topic is backed by its own [`tokio::sync::broadcast`] channel, created
//! lazily the first time a publisher or subscriber asks for it, so each
//! subscriber receives every message without any single subscriber blocking
//! the others.
//!
//! Device wrappers hold a [`TopicPublisher`] for their endpoint; consumers
//! (and actuated devices such as LEDs) hold a [`TopicReceiver`].

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use simlink_types::{BridgeError, Event};
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Default channel capacity (number of buffered events before old ones are
/// dropped for slow subscribers).
pub const DEFAULT_CAPACITY: usize = 256;

/// Shared message bus. Clone it cheaply – all clones share the same topic
/// table.
#[derive(Clone, Debug)]
pub struct MessageBus {
    capacity: usize,
    topics: Arc<Mutex<HashMap<String, broadcast::Sender<Event>>>>,
}

impl MessageBus {
    /// Create a new bus. `capacity` is applied to every topic channel
    /// independently and is raised to 1 if zero.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            topics: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Return a publisher bound to `topic`, creating the topic if needed.
    pub fn publisher(&self, topic: &str) -> TopicPublisher {
        TopicPublisher {
            topic: topic.to_string(),
            sender: self.sender(topic),
        }
    }

    /// Subscribe to `topic`, creating the topic if needed.
    ///
    /// The receiver only yields events published after this call.
    pub fn subscribe(&self, topic: &str) -> TopicReceiver {
        TopicReceiver {
            topic: topic.to_string(),
            receiver: self.sender(topic).subscribe(),
        }
    }

    /// Number of live receivers on `topic` (0 for unknown topics).
    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.topics
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(topic)
            .map_or(0, broadcast::Sender::receiver_count)
    }

    /// Names of every topic created so far, sorted.
    pub fn topics(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .topics
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    fn sender(&self, topic: &str) -> broadcast::Sender<Event> {
        let mut topics = self.topics.lock().unwrap_or_else(PoisonError::into_inner);
        topics
            .entry(topic.to_string())
            .or_insert_with(|| {
                debug!(topic, capacity = self.capacity, "creating topic");
                broadcast::channel(self.capacity).0
            })
            .clone()
    }
}

impl Default for MessageBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Publisher
// ---------------------------------------------------------------------------

/// Sending half of a single topic.
#[derive(Clone, Debug)]
pub struct TopicPublisher {
    topic: String,
    sender: broadcast::Sender<Event>,
}

impl TopicPublisher {
    /// Publish `event` on this topic.
    ///
    /// Returns the number of receivers that were handed the event.  Returns
    /// `Ok(0)` when nobody is listening; this is a normal condition, not an
    /// error.
    pub fn publish(&self, event: Event) -> Result<usize, BridgeError> {
        if self.sender.receiver_count() == 0 {
            return Ok(0);
        }
        self.sender
            .send(event)
            .map_err(|e| BridgeError::Channel(format!("publish on `{}` failed: {e}", self.topic)))
    }

    /// Number of live receivers on this topic.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// The topic this publisher is bound to.
    pub fn topic(&self) -> &str {
        &self.topic
    }
}

// ---------------------------------------------------------------------------
// Receiver
// ---------------------------------------------------------------------------

/// Receiving half of a single topic.
pub struct TopicReceiver {
    topic: String,
    receiver: broadcast::Receiver<Event>,
}

impl TopicReceiver {
    /// Wait for the next event on this topic.
    ///
    /// Returns:
    /// * `Ok(event)` – a successfully received event.
    /// * `Err(broadcast::error::RecvError::Lagged(n))` – the subscriber fell
    ///   behind and `n` messages were dropped.
    /// * `Err(broadcast::error::RecvError::Closed)` – every publisher is gone.
    pub async fn recv(&mut self) -> Result<Event, broadcast::error::RecvError> {
        self.receiver.recv().await
    }

    /// Return the next buffered event without waiting, or `None` when the
    /// buffer is empty.  Lagged gaps are logged and skipped.
    pub fn try_recv(&mut self) -> Option<Event> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => return Some(event),
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    warn!(topic = %self.topic, lagged_by = n, "TopicReceiver lagged");
                    continue;
                }
                Err(_) => return None,
            }
        }
    }

    /// The topic this receiver is bound to.
    pub fn topic(&self) -> &str {
        &self.topic
    }
}
