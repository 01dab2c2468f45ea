use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Hardware tag the simulator assigns to every device attached to a robot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceKind {
    Camera,
    /// Light emitter (LED).
    Led,
    RangeFinder,
    DistanceSensor,
    LightSensor,
    Accelerometer,
    /// Orientation sensor.
    InertialUnit,
    /// Angular-rate sensor.
    Gyro,
    /// The robot body itself.
    Robot,
    /// Any device the bridge has no wrapper for.
    Unsupported,
}

impl DeviceKind {
    /// `true` for the three kinds that can only be exposed as part of a
    /// composite IMU.
    pub fn is_imu_part(self) -> bool {
        matches!(
            self,
            DeviceKind::Accelerometer | DeviceKind::InertialUnit | DeviceKind::Gyro
        )
    }
}

impl std::fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DeviceKind::Camera => "camera",
            DeviceKind::Led => "led",
            DeviceKind::RangeFinder => "range_finder",
            DeviceKind::DistanceSensor => "distance_sensor",
            DeviceKind::LightSensor => "light_sensor",
            DeviceKind::Accelerometer => "accelerometer",
            DeviceKind::InertialUnit => "inertial_unit",
            DeviceKind::Gyro => "gyro",
            DeviceKind::Robot => "robot",
            DeviceKind::Unsupported => "unsupported",
        };
        f.write_str(s)
    }
}

/// A raw value sampled from (or applied to) a simulated device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Reading {
    /// Colour image, 4 bytes per pixel (BGRA).
    Image {
        width: u32,
        height: u32,
        data: Vec<u8>,
    },
    /// Depth image, one range in metres per pixel.
    RangeImage {
        width: u32,
        height: u32,
        ranges: Vec<f32>,
    },
    /// Single scalar measurement (distance, irradiance, …).
    Scalar(f64),
    /// Three-axis measurement (acceleration, angular velocity).
    Vector3([f64; 3]),
    /// Orientation quaternion `[x, y, z, w]`.
    Quaternion([f64; 4]),
    /// LED intensity / colour index. `0` is off.
    Led(i32),
}

/// Event wrapper routed over the message bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    /// e.g., "simlink-hal::front_camera"
    pub source: String,
    pub payload: EventPayload,
}

impl Event {
    /// Wrap `payload` in a fresh event stamped with the current time.
    pub fn new(source: impl Into<String>, payload: EventPayload) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            source: source.into(),
            payload,
        }
    }
}

/// Variants of data that device wrappers publish (or receive) on their topics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EventPayload {
    Image {
        frame_id: String,
        width: u32,
        height: u32,
        data: Vec<u8>,
    },
    DepthImage {
        frame_id: String,
        width: u32,
        height: u32,
        ranges: Vec<f32>,
    },
    Range {
        frame_id: String,
        range: f64,
    },
    Illuminance {
        frame_id: String,
        value: f64,
    },
    /// Any of the three fields may be absent when the composite has no
    /// matching constituent.
    Imu {
        frame_id: String,
        orientation: Option<[f64; 4]>,
        angular_velocity: Option<[f64; 3]>,
        linear_acceleration: Option<[f64; 3]>,
    },
    /// Simulated time in seconds.
    Clock { sim_time: f64 },
    /// Inbound command for an LED.
    LedCommand(i32),
}

/// Error type shared by the bridge crates.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BridgeError {
    #[error("Device Fault on {device}: {details}")]
    DeviceFault { device: String, details: String },

    #[error("Unexpected reading from {device}: expected {expected}")]
    UnexpectedReading { device: String, expected: String },

    #[error("Channel Error: {0}")]
    Channel(String),

    #[error("Configuration Error: {0}")]
    Config(String),

    #[error("Simulator Error: {0}")]
    Simulator(String),
}
