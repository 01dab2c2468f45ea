//! [`ImuDevice`] – one IMU endpoint assembled from up to three devices.

use simlink_types::{EventPayload, Reading};

use crate::composite::ImuParts;
use crate::devices::{
    Device, DeviceContext, DeviceSettings, SensorChannel, sample_or_warn, warn_unexpected,
};
use crate::options::DeviceOptions;
use crate::robot::SimDevice;

/// Publishes an [`EventPayload::Imu`] combining the accelerometer's linear
/// acceleration, the inertial unit's orientation and the gyro's angular
/// velocity.  Missing constituents leave their field empty.
///
/// The frame defaults to the first present constituent's name.
pub struct ImuDevice {
    parts: ImuParts,
    channel: SensorChannel,
}

impl ImuDevice {
    pub fn new(
        ctx: &DeviceContext,
        key: &str,
        parts: ImuParts,
        options: Option<&DeviceOptions>,
    ) -> Self {
        let mut settings = DeviceSettings::resolve(key, options, ctx.robot.basic_time_step());
        if options.and_then(|o| o.frame_id.as_ref()).is_none()
            && let Some(first) = parts.first_name()
        {
            settings.frame_id = first.to_string();
        }
        Self {
            channel: SensorChannel::new(ctx, key, settings),
            parts,
        }
    }

    /// The constituents this composite reads from.
    pub fn parts(&self) -> &ImuParts {
        &self.parts
    }

    fn vector(&self, device: Option<&dyn SimDevice>) -> Option<[f64; 3]> {
        match sample_or_warn(self.channel.key(), device?)? {
            Reading::Vector3(v) => Some(v),
            other => {
                warn_unexpected(self.channel.key(), "vector3", &other);
                None
            }
        }
    }

    fn quaternion(&self, device: Option<&dyn SimDevice>) -> Option<[f64; 4]> {
        match sample_or_warn(self.channel.key(), device?)? {
            Reading::Quaternion(q) => Some(q),
            other => {
                warn_unexpected(self.channel.key(), "quaternion", &other);
                None
            }
        }
    }
}

impl Device for ImuDevice {
    fn key(&self) -> &str {
        self.channel.key()
    }

    fn topic(&self) -> &str {
        self.channel.topic()
    }

    fn synchronize(&mut self) {
        if !self.channel.is_due() {
            return;
        }
        let payload = EventPayload::Imu {
            frame_id: self.channel.frame_id().to_string(),
            orientation: self.quaternion(self.parts.inertial_unit.as_deref()),
            angular_velocity: self.vector(self.parts.gyro.as_deref()),
            linear_acceleration: self.vector(self.parts.accelerometer.as_deref()),
        };
        self.channel.publish(payload);
    }
}
