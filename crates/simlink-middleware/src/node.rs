//! [`HostNode`] – the middleware node a device manager lives in.
//!
//! A host node owns the [`MessageBus`] that device wrappers publish to and
//! provides a recurring-timer primitive.  Timers registered on one node never
//! overlap: each firing runs to completion before the next one starts.
//!
//! [`ManualNode`] is an in-process host for tests and step-locked drivers.
//! Its timers only fire when [`ManualNode::fire_all`] is called.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tracing::debug;

use crate::bus::MessageBus;

/// Callback invoked on every timer firing.
pub type TimerCallback = Box<dyn FnMut() + Send + 'static>;

/// Host node abstraction consumed by the device manager.
pub trait HostNode: Send + Sync {
    /// Node name, used in log fields.
    fn name(&self) -> &str;

    /// The bus device wrappers publish to.
    fn bus(&self) -> &MessageBus;

    /// Register `callback` to be called every `period` for the lifetime of
    /// the node.
    fn create_timer(&self, period: Duration, callback: TimerCallback);
}

// ─────────────────────────────────────────────────────────────────────────────
// ManualNode
// ─────────────────────────────────────────────────────────────────────────────

struct ManualTimer {
    period: Duration,
    callback: TimerCallback,
}

/// Host node whose timers are fired explicitly.
pub struct ManualNode {
    name: String,
    bus: MessageBus,
    timers: Mutex<Vec<ManualTimer>>,
}

impl ManualNode {
    /// Create a node with its own fresh bus.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_bus(name, MessageBus::default())
    }

    /// Create a node that publishes to an existing bus.
    pub fn with_bus(name: impl Into<String>, bus: MessageBus) -> Self {
        Self {
            name: name.into(),
            bus,
            timers: Mutex::new(Vec::new()),
        }
    }

    /// Number of registered timers.
    pub fn timer_count(&self) -> usize {
        self.timers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Periods of the registered timers, in registration order.
    pub fn timer_periods(&self) -> Vec<Duration> {
        self.timers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|t| t.period)
            .collect()
    }

    /// Fire every registered timer once, in registration order.  Returns the
    /// number of callbacks invoked.
    ///
    /// Callbacks may register further timers; those are kept but not fired
    /// during this call.
    pub fn fire_all(&self) -> usize {
        let mut fired = {
            let mut timers = self.timers.lock().unwrap_or_else(PoisonError::into_inner);
            std::mem::take(&mut *timers)
        };
        for timer in &mut fired {
            (timer.callback)();
        }
        let count = fired.len();
        let mut timers = self.timers.lock().unwrap_or_else(PoisonError::into_inner);
        fired.append(&mut timers);
        *timers = fired;
        count
    }
}

impl HostNode for ManualNode {
    fn name(&self) -> &str {
        &self.name
    }

    fn bus(&self) -> &MessageBus {
        &self.bus
    }

    fn create_timer(&self, period: Duration, callback: TimerCallback) {
        debug!(node = %self.name, ?period, "registering manual timer");
        self.timers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(ManualTimer { period, callback });
    }
}
