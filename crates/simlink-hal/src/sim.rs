//! In-process simulated robot for tests and headless runs.
//!
//! [`SimulatedRobot`] implements [`SimRobot`] over a fixed list of
//! [`SimulatedDevice`] stubs whose readings are set by the caller, and a
//! clock that only moves when [`SimulatedRobot::step`] is called.  This lets
//! the whole discovery and synchronization stack run without a physics
//! simulator.
//!
//! # Example
//!
//! ```rust
//! use simlink_hal::robot::SimRobot;
//! use simlink_hal::sim::SimRobotBuilder;
//!
//! let robot = SimRobotBuilder::new("rover")
//!     .time_step(16.0)
//!     .with_camera("front_camera")
//!     .with_accelerometer("accelerometer")
//!     .build();
//!
//! assert_eq!(robot.device_count(), 2);
//! robot.step();
//! assert!((robot.time() - 0.016).abs() < 1e-9);
//! ```

use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use simlink_types::{BridgeError, DeviceKind, Reading};

use crate::robot::{SimDevice, SimRobot};

/// Basic time step used when a description does not specify one.
pub const DEFAULT_TIME_STEP_MS: f64 = 32.0;

// ────────────────────────────────────────────────────────────────────────────
// Stub device
// ────────────────────────────────────────────────────────────────────────────

/// A simulated device that reports whatever reading was last stored in it.
/// LEDs additionally accept [`Reading::Led`] commands.
pub struct SimulatedDevice {
    name: String,
    kind: DeviceKind,
    reading: Mutex<Option<Reading>>,
}

impl SimulatedDevice {
    /// Create a device with no reading; [`SimDevice::sample`] fails until
    /// one is set.
    pub fn new(name: impl Into<String>, kind: DeviceKind) -> Arc<Self> {
        Self::with_reading(name, kind, None)
    }

    /// Create a device holding an initial reading.
    pub fn with_reading(
        name: impl Into<String>,
        kind: DeviceKind,
        reading: Option<Reading>,
    ) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            kind,
            reading: Mutex::new(reading),
        })
    }

    /// Replace the stored reading.
    pub fn set_reading(&self, reading: Reading) {
        *self.reading.lock().unwrap_or_else(PoisonError::into_inner) = Some(reading);
    }

    /// The stored reading, if any.
    pub fn reading(&self) -> Option<Reading> {
        self.reading
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl SimDevice for SimulatedDevice {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> DeviceKind {
        self.kind
    }

    fn sample(&self) -> Result<Reading, BridgeError> {
        self.reading().ok_or_else(|| BridgeError::DeviceFault {
            device: self.name.clone(),
            details: "no reading available".to_string(),
        })
    }

    fn apply(&self, reading: Reading) -> Result<(), BridgeError> {
        match (self.kind, &reading) {
            (DeviceKind::Led, Reading::Led(_)) => {
                self.set_reading(reading);
                Ok(())
            }
            (DeviceKind::Led, _) => Err(BridgeError::UnexpectedReading {
                device: self.name.clone(),
                expected: "led".to_string(),
            }),
            _ => Err(BridgeError::DeviceFault {
                device: self.name.clone(),
                details: format!("{} devices cannot be actuated", self.kind),
            }),
        }
    }
}

/// Plausible initial reading for a freshly created stub of `kind`.
pub fn default_reading(kind: DeviceKind) -> Option<Reading> {
    match kind {
        DeviceKind::Camera => Some(Reading::Image {
            width: 4,
            height: 4,
            data: vec![0u8; 4 * 4 * 4],
        }),
        DeviceKind::RangeFinder => Some(Reading::RangeImage {
            width: 4,
            height: 4,
            ranges: vec![f32::INFINITY; 16],
        }),
        DeviceKind::DistanceSensor | DeviceKind::LightSensor => Some(Reading::Scalar(0.0)),
        DeviceKind::Led => Some(Reading::Led(0)),
        // Resting on a level floor.
        DeviceKind::Accelerometer => Some(Reading::Vector3([0.0, 0.0, 9.81])),
        DeviceKind::InertialUnit => Some(Reading::Quaternion([0.0, 0.0, 0.0, 1.0])),
        DeviceKind::Gyro => Some(Reading::Vector3([0.0, 0.0, 0.0])),
        DeviceKind::Robot | DeviceKind::Unsupported => None,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Simulated robot
// ────────────────────────────────────────────────────────────────────────────

/// A robot model with a manually advanced clock.
pub struct SimulatedRobot {
    name: String,
    time_step_ms: f64,
    devices: Vec<Arc<SimulatedDevice>>,
    time: Mutex<f64>,
}

impl SimulatedRobot {
    /// Advance the clock by one basic time step and return the new time in
    /// seconds.
    pub fn step(&self) -> f64 {
        let mut time = self.time.lock().unwrap_or_else(PoisonError::into_inner);
        *time += self.time_step_ms * 1e-3;
        *time
    }

    /// Look up a device stub by name.
    pub fn device_named(&self, name: &str) -> Option<Arc<SimulatedDevice>> {
        self.devices.iter().find(|d| d.name == name).cloned()
    }
}

impl SimRobot for SimulatedRobot {
    fn name(&self) -> &str {
        &self.name
    }

    fn device_count(&self) -> usize {
        self.devices.len()
    }

    fn device(&self, index: usize) -> Option<Arc<dyn SimDevice>> {
        self.devices
            .get(index)
            .map(|d| Arc::clone(d) as Arc<dyn SimDevice>)
    }

    fn basic_time_step(&self) -> f64 {
        self.time_step_ms
    }

    fn time(&self) -> f64 {
        *self.time.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Serialisable description
// ────────────────────────────────────────────────────────────────────────────

/// A robot model as written in a description file.
///
/// ```toml
/// name = "rover"
/// basic_time_step = 32
///
/// [[devices]]
/// name = "front_camera"
/// kind = "camera"
///
/// [[devices]]
/// name = "ds_left"
/// kind = "distance_sensor"
/// reading = { type = "scalar", value = 0.42 }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RobotDescription {
    pub name: String,
    #[serde(default = "default_time_step")]
    pub basic_time_step: f64,
    #[serde(default)]
    pub devices: Vec<DeviceDescription>,
}

/// One device entry of a [`RobotDescription`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceDescription {
    pub name: String,
    pub kind: DeviceKind,
    /// Initial reading; falls back to [`default_reading`] for the kind.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reading: Option<Reading>,
}

fn default_time_step() -> f64 {
    DEFAULT_TIME_STEP_MS
}

// ────────────────────────────────────────────────────────────────────────────
// Builder
// ────────────────────────────────────────────────────────────────────────────

/// Builder that constructs a [`SimulatedRobot`].
///
/// Call the `with_*` methods to attach the simulated devices you need, in
/// enumeration order, then call [`build`][Self::build].
pub struct SimRobotBuilder {
    name: String,
    time_step_ms: f64,
    devices: Vec<Arc<SimulatedDevice>>,
}

impl SimRobotBuilder {
    /// Create a builder for a robot with no devices and the default time
    /// step.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            time_step_ms: DEFAULT_TIME_STEP_MS,
            devices: Vec::new(),
        }
    }

    /// Builder pre-populated from a [`RobotDescription`].
    pub fn from_description(description: &RobotDescription) -> Self {
        let mut builder = Self::new(&description.name).time_step(description.basic_time_step);
        for device in &description.devices {
            let reading = device
                .reading
                .clone()
                .or_else(|| default_reading(device.kind));
            builder
                .devices
                .push(SimulatedDevice::with_reading(&device.name, device.kind, reading));
        }
        builder
    }

    /// Set the basic time step in milliseconds.
    pub fn time_step(mut self, time_step_ms: f64) -> Self {
        self.time_step_ms = time_step_ms;
        self
    }

    /// Attach a device of any kind with its default reading.
    pub fn with_device(mut self, name: impl Into<String>, kind: DeviceKind) -> Self {
        self.devices
            .push(SimulatedDevice::with_reading(name, kind, default_reading(kind)));
        self
    }

    /// Attach a pre-built device stub.  Useful when a test keeps a handle to
    /// drive its readings.
    pub fn with_stub(mut self, device: Arc<SimulatedDevice>) -> Self {
        self.devices.push(device);
        self
    }

    pub fn with_camera(self, name: impl Into<String>) -> Self {
        self.with_device(name, DeviceKind::Camera)
    }

    pub fn with_led(self, name: impl Into<String>) -> Self {
        self.with_device(name, DeviceKind::Led)
    }

    pub fn with_range_finder(self, name: impl Into<String>) -> Self {
        self.with_device(name, DeviceKind::RangeFinder)
    }

    pub fn with_distance_sensor(self, name: impl Into<String>) -> Self {
        self.with_device(name, DeviceKind::DistanceSensor)
    }

    pub fn with_light_sensor(self, name: impl Into<String>) -> Self {
        self.with_device(name, DeviceKind::LightSensor)
    }

    pub fn with_accelerometer(self, name: impl Into<String>) -> Self {
        self.with_device(name, DeviceKind::Accelerometer)
    }

    pub fn with_inertial_unit(self, name: impl Into<String>) -> Self {
        self.with_device(name, DeviceKind::InertialUnit)
    }

    pub fn with_gyro(self, name: impl Into<String>) -> Self {
        self.with_device(name, DeviceKind::Gyro)
    }

    /// Consume the builder and return the robot with its clock at zero.
    pub fn build(self) -> Arc<SimulatedRobot> {
        Arc::new(SimulatedRobot {
            name: self.name,
            time_step_ms: self.time_step_ms,
            devices: self.devices,
            time: Mutex::new(0.0),
        })
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_preserves_enumeration_order() {
        let robot = SimRobotBuilder::new("rover")
            .with_camera("cam0")
            .with_led("led0")
            .with_gyro("gyro0")
            .build();

        let names: Vec<String> = (0..robot.device_count())
            .filter_map(|i| robot.device(i))
            .map(|d| d.name().to_string())
            .collect();
        assert_eq!(names, ["cam0", "led0", "gyro0"]);
        assert!(robot.device(3).is_none());
    }

    #[test]
    fn step_advances_clock_by_time_step() {
        let robot = SimRobotBuilder::new("rover").time_step(8.0).build();
        assert_eq!(robot.time(), 0.0);
        robot.step();
        robot.step();
        assert!((robot.time() - 0.016).abs() < 1e-9);
        assert_eq!(robot.basic_time_step(), 8.0);
    }

    #[test]
    fn stub_without_reading_reports_fault() {
        let device = SimulatedDevice::new("ds0", DeviceKind::DistanceSensor);
        assert!(matches!(device.sample(), Err(BridgeError::DeviceFault { .. })));
        device.set_reading(Reading::Scalar(0.3));
        assert_eq!(device.sample(), Ok(Reading::Scalar(0.3)));
    }

    #[test]
    fn led_accepts_led_commands_only() {
        let led = SimulatedDevice::with_reading("led0", DeviceKind::Led, Some(Reading::Led(0)));
        led.apply(Reading::Led(3)).unwrap();
        assert_eq!(led.reading(), Some(Reading::Led(3)));
        assert!(matches!(
            led.apply(Reading::Scalar(1.0)),
            Err(BridgeError::UnexpectedReading { .. })
        ));
    }

    #[test]
    fn sensors_cannot_be_actuated() {
        let cam = SimulatedDevice::new("cam0", DeviceKind::Camera);
        assert!(matches!(
            cam.apply(Reading::Led(1)),
            Err(BridgeError::DeviceFault { .. })
        ));
    }

    #[test]
    fn description_parses_from_toml() {
        let raw = r#"
            name = "rover"
            basic_time_step = 16

            [[devices]]
            name = "front_camera"
            kind = "camera"

            [[devices]]
            name = "ds_left"
            kind = "distance_sensor"
            reading = { type = "scalar", value = 0.42 }
        "#;
        let description: RobotDescription = toml::from_str(raw).unwrap();
        assert_eq!(description.basic_time_step, 16.0);

        let robot = SimRobotBuilder::from_description(&description).build();
        assert_eq!(robot.name(), "rover");
        assert_eq!(robot.device_count(), 2);
        let ds = robot.device_named("ds_left").unwrap();
        assert_eq!(ds.sample(), Ok(Reading::Scalar(0.42)));
        let cam = robot.device_named("front_camera").unwrap();
        assert!(matches!(cam.sample(), Ok(Reading::Image { width: 4, .. })));
    }

    #[test]
    fn description_defaults_time_step() {
        let description: RobotDescription = toml::from_str("name = \"bare\"").unwrap();
        assert_eq!(description.basic_time_step, DEFAULT_TIME_STEP_MS);
        assert!(description.devices.is_empty());
    }
}
