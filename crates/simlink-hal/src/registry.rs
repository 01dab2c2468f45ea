//! [`DeviceBuilder`] – maps a device kind to the wrapper that serves it.
//!
//! Only directly wrappable kinds have a builder.  IMU constituents
//! (accelerometer, inertial unit, gyro) are assembled by the
//! [`composite`][crate::composite] resolver, the robot body is handled by
//! discovery itself, and every other kind is left without a wrapper.

use std::sync::Arc;

use simlink_types::DeviceKind;

use crate::devices::{
    CameraDevice, Device, DeviceContext, DistanceSensorDevice, LedDevice, LightSensorDevice,
    RangeFinderDevice,
};
use crate::options::DeviceOptions;
use crate::robot::SimDevice;

/// Constructor for one supported wrapper type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceBuilder {
    Camera,
    Led,
    RangeFinder,
    DistanceSensor,
    LightSensor,
}

impl DeviceBuilder {
    /// Every builder, in declaration order.
    pub const ALL: [DeviceBuilder; 5] = [
        DeviceBuilder::Camera,
        DeviceBuilder::Led,
        DeviceBuilder::RangeFinder,
        DeviceBuilder::DistanceSensor,
        DeviceBuilder::LightSensor,
    ];

    /// The builder for `kind`, or `None` when the kind has no direct wrapper.
    pub fn for_kind(kind: DeviceKind) -> Option<Self> {
        match kind {
            DeviceKind::Camera => Some(Self::Camera),
            DeviceKind::Led => Some(Self::Led),
            DeviceKind::RangeFinder => Some(Self::RangeFinder),
            DeviceKind::DistanceSensor => Some(Self::DistanceSensor),
            DeviceKind::LightSensor => Some(Self::LightSensor),
            DeviceKind::Accelerometer
            | DeviceKind::InertialUnit
            | DeviceKind::Gyro
            | DeviceKind::Robot
            | DeviceKind::Unsupported => None,
        }
    }

    /// The device kind this builder serves.
    pub fn kind(self) -> DeviceKind {
        match self {
            Self::Camera => DeviceKind::Camera,
            Self::Led => DeviceKind::Led,
            Self::RangeFinder => DeviceKind::RangeFinder,
            Self::DistanceSensor => DeviceKind::DistanceSensor,
            Self::LightSensor => DeviceKind::LightSensor,
        }
    }

    /// Construct the wrapper for `device`.
    pub fn build(
        self,
        ctx: &DeviceContext,
        device: Arc<dyn SimDevice>,
        options: Option<&DeviceOptions>,
    ) -> Box<dyn Device> {
        match self {
            Self::Camera => Box::new(CameraDevice::new(ctx, device, options)),
            Self::Led => Box::new(LedDevice::new(ctx, device, options)),
            Self::RangeFinder => Box::new(RangeFinderDevice::new(ctx, device, options)),
            Self::DistanceSensor => Box::new(DistanceSensorDevice::new(ctx, device, options)),
            Self::LightSensor => Box::new(LightSensorDevice::new(ctx, device, options)),
        }
    }
}
