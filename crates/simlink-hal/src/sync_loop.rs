//! [`SyncLoop`] – the recurring pass over every discovered wrapper.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use simlink_middleware::HostNode;
use tracing::{debug, trace};

use crate::device_set::DeviceSet;

/// Timer period for a basic time step given in milliseconds: the step
/// truncated to whole milliseconds, never less than 1 ms.
pub fn sync_period(basic_time_step_ms: f64) -> Duration {
    let millis = if basic_time_step_ms.is_finite() && basic_time_step_ms >= 1.0 {
        basic_time_step_ms as u64
    } else {
        1
    };
    Duration::from_millis(millis)
}

/// Calls [`synchronize`][crate::devices::Device::synchronize] on every
/// device of a shared [`DeviceSet`], in registration order.
#[derive(Clone)]
pub struct SyncLoop {
    devices: Arc<Mutex<DeviceSet>>,
}

impl SyncLoop {
    pub fn new(devices: DeviceSet) -> Self {
        Self {
            devices: Arc::new(Mutex::new(devices)),
        }
    }

    /// Register one recurring timer on `node` that runs [`tick`][Self::tick]
    /// every `period`.
    pub fn arm(&self, node: &dyn HostNode, period: Duration) {
        let this = self.clone();
        debug!(node = %node.name(), ?period, "arming synchronization timer");
        node.create_timer(period, Box::new(move || this.tick()));
    }

    /// Run one synchronization pass.
    pub fn tick(&self) {
        let mut devices = self.devices.lock().unwrap_or_else(PoisonError::into_inner);
        trace!(devices = devices.len(), "synchronization tick");
        for device in devices.iter_mut() {
            device.synchronize();
        }
    }

    /// Run `f` with shared access to the device set.
    pub fn with_devices<R>(&self, f: impl FnOnce(&DeviceSet) -> R) -> R {
        let devices = self.devices.lock().unwrap_or_else(PoisonError::into_inner);
        f(&devices)
    }
}
