//! Device wrappers: one bus endpoint per simulated device.
//!
//! Every wrapper implements [`Device`].  The synchronization loop calls
//! [`Device::synchronize`] once per tick; a wrapper decides on its own whether
//! the tick is due (see [`DeviceSettings::timestep`]) and handles its own
//! failures by logging them.  Nothing propagates back to the loop.
//!
//! | Wrapper | Kind | Direction |
//! |---|---|---|
//! | [`CameraDevice`] | camera | device → topic |
//! | [`RangeFinderDevice`] | range finder | device → topic |
//! | [`DistanceSensorDevice`] | distance sensor | device → topic |
//! | [`LightSensorDevice`] | light sensor | device → topic |
//! | [`LedDevice`] | LED | topic → device |
//! | [`ImuDevice`] | accelerometer + inertial unit + gyro | devices → topic |
//! | [`RobotDevice`] | robot body | clock → topic |

use std::sync::Arc;

use simlink_middleware::{MessageBus, TopicPublisher};
use simlink_types::{Event, EventPayload, Reading};
use tracing::warn;

use crate::options::DeviceOptions;
use crate::robot::{SimDevice, SimRobot};

pub mod camera;
pub mod distance_sensor;
pub mod imu;
pub mod led;
pub mod light_sensor;
pub mod range_finder;
pub mod robot;

pub use camera::CameraDevice;
pub use distance_sensor::DistanceSensorDevice;
pub use imu::ImuDevice;
pub use led::LedDevice;
pub use light_sensor::LightSensorDevice;
pub use range_finder::RangeFinderDevice;
pub use robot::RobotDevice;

/// A middleware-facing wrapper around one simulated device or composite.
pub trait Device: Send {
    /// Identifier under which the wrapper is registered: the device name, a
    /// `|`-joined IMU key, or `@robot`.
    fn key(&self) -> &str;

    /// Topic the wrapper publishes on (or listens to).
    fn topic(&self) -> &str;

    /// Mirror the device's current state onto its topic.  Called once per
    /// synchronization tick.
    fn synchronize(&mut self);
}

/// Everything a wrapper constructor needs from its surroundings.
#[derive(Clone)]
pub struct DeviceContext {
    pub bus: MessageBus,
    pub robot: Arc<dyn SimRobot>,
}

impl DeviceContext {
    pub fn new(bus: MessageBus, robot: Arc<dyn SimRobot>) -> Self {
        Self { bus, robot }
    }
}

/// Wrapper settings after applying defaults to [`DeviceOptions`].
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceSettings {
    pub topic_name: String,
    pub frame_id: String,
    /// Milliseconds of simulated time between publications.
    pub timestep: f64,
    pub always_publish: bool,
    pub disabled: bool,
}

impl DeviceSettings {
    /// Resolve settings for the device called `name`.
    ///
    /// Defaults: topic `/<sanitised name>`, frame `name`, the robot's basic
    /// time step, publish only when subscribed, enabled.
    pub fn resolve(name: &str, options: Option<&DeviceOptions>, basic_time_step: f64) -> Self {
        let defaults = DeviceOptions::default();
        let options = options.unwrap_or(&defaults);
        Self {
            topic_name: options
                .topic_name
                .clone()
                .unwrap_or_else(|| default_topic_name(name)),
            frame_id: options.frame_id.clone().unwrap_or_else(|| name.to_string()),
            timestep: options.timestep.unwrap_or(basic_time_step),
            always_publish: options.always_publish.unwrap_or(false),
            disabled: options.disable.unwrap_or(false),
        }
    }
}

/// `/` followed by `name` lower-cased, with every character that is not
/// ASCII alphanumeric replaced by `_`.
pub fn default_topic_name(name: &str) -> String {
    let sanitised: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect();
    format!("/{sanitised}")
}

// ─────────────────────────────────────────────────────────────────────────────
// Shared sensor plumbing
// ─────────────────────────────────────────────────────────────────────────────

// Absorbs float drift when the simulated clock is accumulated in seconds.
const TIME_EPSILON_MS: f64 = 1e-6;

/// Publisher plus the throttle and subscriber gate shared by all sensor
/// wrappers.
pub(crate) struct SensorChannel {
    key: String,
    source: String,
    settings: DeviceSettings,
    robot: Arc<dyn SimRobot>,
    publisher: TopicPublisher,
    last_update_ms: Option<f64>,
}

impl SensorChannel {
    pub(crate) fn new(ctx: &DeviceContext, key: &str, settings: DeviceSettings) -> Self {
        Self {
            key: key.to_string(),
            source: format!("simlink-hal::{key}"),
            publisher: ctx.bus.publisher(&settings.topic_name),
            robot: Arc::clone(&ctx.robot),
            settings,
            last_update_ms: None,
        }
    }

    pub(crate) fn key(&self) -> &str {
        &self.key
    }

    pub(crate) fn topic(&self) -> &str {
        &self.settings.topic_name
    }

    pub(crate) fn frame_id(&self) -> &str {
        &self.settings.frame_id
    }

    pub(crate) fn robot(&self) -> &dyn SimRobot {
        self.robot.as_ref()
    }

    /// `true` when this tick should sample and publish.  Marks the tick as
    /// the last update when it returns `true`.
    pub(crate) fn is_due(&mut self) -> bool {
        if self.settings.disabled {
            return false;
        }
        if !self.settings.always_publish && self.publisher.subscriber_count() == 0 {
            return false;
        }
        let now_ms = self.robot.time() * 1e3;
        if let Some(last) = self.last_update_ms
            && now_ms - last + TIME_EPSILON_MS < self.settings.timestep
        {
            return false;
        }
        self.last_update_ms = Some(now_ms);
        true
    }

    pub(crate) fn publish(&self, payload: EventPayload) {
        if let Err(e) = self.publisher.publish(Event::new(&self.source, payload)) {
            warn!(device = %self.key, topic = %self.settings.topic_name, error = %e, "publish failed");
        }
    }
}

/// Sample `device`, logging and swallowing failures.
pub(crate) fn sample_or_warn(key: &str, device: &dyn SimDevice) -> Option<Reading> {
    match device.sample() {
        Ok(reading) => Some(reading),
        Err(e) => {
            warn!(device = %key, error = %e, "sampling failed");
            None
        }
    }
}

/// Log a reading whose shape does not match what the wrapper expects.
pub(crate) fn warn_unexpected(key: &str, expected: &str, reading: &Reading) {
    warn!(device = %key, expected, ?reading, "unexpected reading");
}
