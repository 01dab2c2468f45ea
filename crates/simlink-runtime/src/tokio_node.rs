//! [`TokioNode`] – a [`HostNode`] whose timers run as Tokio tasks.
//!
//! Each timer is one task driving a [`tokio::time::interval`], so a firing
//! always completes before the next begins.  Missed ticks are delayed rather
//! than bursted.  The first firing happens one period after registration.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use simlink_middleware::{HostNode, MessageBus, TimerCallback};
use simlink_types::BridgeError;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

pub struct TokioNode {
    name: String,
    bus: MessageBus,
    runtime: Handle,
    timers: Mutex<Vec<JoinHandle<()>>>,
}

impl TokioNode {
    /// Create a node whose timers are spawned on `runtime`.
    pub fn new(name: impl Into<String>, bus: MessageBus, runtime: Handle) -> Self {
        Self {
            name: name.into(),
            bus,
            runtime,
            timers: Mutex::new(Vec::new()),
        }
    }

    /// Create a node on the runtime the caller is running in.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Channel`] when called outside a Tokio runtime.
    pub fn current(name: impl Into<String>, bus: MessageBus) -> Result<Self, BridgeError> {
        let runtime = Handle::try_current()
            .map_err(|e| BridgeError::Channel(format!("no Tokio runtime: {e}")))?;
        Ok(Self::new(name, bus, runtime))
    }

    /// Number of timers still running.
    pub fn active_timers(&self) -> usize {
        self.timers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|t| !t.is_finished())
            .count()
    }

    /// Stop every timer.  No callback runs after this returns, except one
    /// that was already executing.
    pub fn shutdown(&self) {
        let timers = std::mem::take(&mut *self.timers.lock().unwrap_or_else(PoisonError::into_inner));
        debug!(node = %self.name, timers = timers.len(), "stopping timers");
        for timer in timers {
            timer.abort();
        }
    }
}

impl HostNode for TokioNode {
    fn name(&self) -> &str {
        &self.name
    }

    fn bus(&self) -> &MessageBus {
        &self.bus
    }

    fn create_timer(&self, period: Duration, mut callback: TimerCallback) {
        debug!(node = %self.name, ?period, "spawning timer");
        let task = self.runtime.spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately.
            interval.tick().await;
            loop {
                interval.tick().await;
                callback();
            }
        });
        self.timers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(task);
    }
}

impl Drop for TokioNode {
    fn drop(&mut self) {
        self.shutdown();
    }
}
