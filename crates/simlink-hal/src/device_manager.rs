//! [`DeviceManager`] – discovers a robot's devices and keeps them in sync.
//!
//! # Discovery
//!
//! [`discover`] runs once, synchronously, and produces a [`DeviceSet`]:
//!
//! 1. `@robot` ([`RobotDevice`]) is always registered first.
//! 2. Every device the robot reports is visited exactly once.  Devices whose
//!    kind has a [`DeviceBuilder`] get a wrapper built with their configured
//!    options; every device is recorded in a [`DeviceTable`] for IMU lookups.
//! 3. The default IMU is inserted when no IMU key is configured and the
//!    robot's IMU constituents are unambiguous.
//! 4. Each configured IMU key becomes one composite (replacing any wrapper
//!    already registered under the same key).
//! 5. Every configured key that did not end up in the set is reported with
//!    one warning.
//!
//! Nothing in discovery is fatal.  Unsupported kinds are skipped and
//! unmatched configuration only warns.
//!
//! # Synchronization
//!
//! [`DeviceManager::new`] arms one recurring timer on the host node with a
//! period equal to the robot's basic time step; each firing synchronizes
//! every wrapper in registration order.  A disabled configuration
//! (`auto = false`) registers nothing at all.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Map, Value};
use simlink_middleware::HostNode;
use simlink_types::BridgeError;
use tracing::{debug, info, instrument, warn};

use crate::composite::{DeviceTable, configured_imus, default_imu};
use crate::device_set::DeviceSet;
use crate::devices::{DeviceContext, ImuDevice, RobotDevice};
use crate::options::DeviceManagerConfig;
use crate::registry::DeviceBuilder;
use crate::robot::SimRobot;
use crate::sync_loop::{SyncLoop, sync_period};

/// Result of one discovery pass.
pub struct Discovery {
    pub devices: DeviceSet,
    /// Configured keys that matched no registered wrapper, in configuration order.
    pub unconsumed: Vec<String>,
}

/// Build the device set for `ctx.robot` under `config`.
#[instrument(skip_all, fields(robot = %ctx.robot.name()))]
pub fn discover(ctx: &DeviceContext, config: &DeviceManagerConfig) -> Discovery {
    let mut devices = DeviceSet::new();
    if !config.auto {
        debug!("discovery disabled");
        return Discovery {
            devices,
            unconsumed: Vec::new(),
        };
    }

    devices.insert(Box::new(RobotDevice::new(ctx, config.robot.as_ref())));

    let mut table = DeviceTable::default();
    for index in 0..ctx.robot.device_count() {
        let Some(device) = ctx.robot.device(index) else {
            debug!(index, "device index yielded no handle");
            continue;
        };
        match DeviceBuilder::for_kind(device.kind()) {
            Some(builder) => {
                let options = config.resolve(device.name());
                devices.insert(builder.build(ctx, Arc::clone(&device), options));
            }
            None => debug!(device = %device.name(), kind = %device.kind(), "no direct wrapper"),
        }
        table.push(device);
    }

    if let Some((key, parts, options)) = default_imu(&table, config) {
        debug!(%key, "inserting default IMU");
        devices.insert(Box::new(ImuDevice::new(ctx, &key, parts, Some(&options))));
    }
    for (key, parts, options) in configured_imus(&table, config) {
        devices.insert(Box::new(ImuDevice::new(ctx, key, parts, Some(options))));
    }

    let unconsumed: Vec<String> = config
        .keys()
        .filter(|key| !devices.contains(key))
        .map(str::to_string)
        .collect();
    for key in &unconsumed {
        warn!(
            %key,
            "configured device was not found or its kind is not supported"
        );
    }

    Discovery {
        devices,
        unconsumed,
    }
}

/// Owns the discovered devices and the timer that synchronizes them.
pub struct DeviceManager {
    sync: SyncLoop,
    unconsumed: Vec<String>,
    period: Option<Duration>,
}

impl DeviceManager {
    /// Discover `robot`'s devices and, unless `config.auto` is `false`, arm
    /// the synchronization timer on `node`.
    pub fn new(
        node: &dyn HostNode,
        robot: Arc<dyn SimRobot>,
        config: &DeviceManagerConfig,
    ) -> Self {
        let ctx = DeviceContext::new(node.bus().clone(), Arc::clone(&robot));
        let Discovery {
            devices,
            unconsumed,
        } = discover(&ctx, config);
        let sync = SyncLoop::new(devices);

        let period = config.auto.then(|| sync_period(robot.basic_time_step()));
        if let Some(period) = period {
            sync.arm(node, period);
            info!(
                node = %node.name(),
                robot = %robot.name(),
                devices = sync.with_devices(DeviceSet::len),
                ?period,
                "device manager ready"
            );
        } else {
            info!(node = %node.name(), "device manager disabled");
        }

        Self {
            sync,
            unconsumed,
            period,
        }
    }

    /// Like [`new`][Self::new], but configured from the flat legacy map.
    /// The resolved `@auto` flag is written back into `map`.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Config`] when `map` is malformed.
    pub fn from_legacy_map(
        node: &dyn HostNode,
        robot: Arc<dyn SimRobot>,
        map: &mut Map<String, Value>,
    ) -> Result<Self, BridgeError> {
        let config = DeviceManagerConfig::from_legacy_map(map)?;
        Ok(Self::new(node, robot, &config))
    }

    /// `false` when discovery was switched off.
    pub fn is_enabled(&self) -> bool {
        self.period.is_some()
    }

    /// Registered identifiers in registration order.
    pub fn keys(&self) -> Vec<String> {
        self.sync
            .with_devices(|d| d.keys().map(str::to_string).collect())
    }

    /// `(identifier, topic)` pairs in registration order.
    pub fn topics(&self) -> Vec<(String, String)> {
        self.sync.with_devices(|d| {
            d.topics()
                .map(|(k, t)| (k.to_string(), t.to_string()))
                .collect()
        })
    }

    /// Configured keys that matched nothing.
    pub fn unconsumed_keys(&self) -> &[String] {
        &self.unconsumed
    }

    /// Period of the synchronization timer, if one was armed.
    pub fn sync_period(&self) -> Option<Duration> {
        self.period
    }

    /// Run one synchronization pass immediately.
    pub fn step(&self) {
        self.sync.tick();
    }
}
