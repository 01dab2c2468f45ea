//! [`DistanceSensorDevice`] – publishes single-ray range measurements.

use std::sync::Arc;

use simlink_types::{EventPayload, Reading};

use crate::devices::{
    Device, DeviceContext, DeviceSettings, SensorChannel, sample_or_warn, warn_unexpected,
};
use crate::options::DeviceOptions;
use crate::robot::SimDevice;

pub struct DistanceSensorDevice {
    device: Arc<dyn SimDevice>,
    channel: SensorChannel,
}

impl DistanceSensorDevice {
    pub fn new(
        ctx: &DeviceContext,
        device: Arc<dyn SimDevice>,
        options: Option<&DeviceOptions>,
    ) -> Self {
        let settings = DeviceSettings::resolve(device.name(), options, ctx.robot.basic_time_step());
        Self {
            channel: SensorChannel::new(ctx, device.name(), settings),
            device,
        }
    }
}

impl Device for DistanceSensorDevice {
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
        match sample_or_warn(self.channel.key(), self.device.as_ref()) {
            Some(Reading::Scalar(range)) => self.channel.publish(EventPayload::Range {
                frame_id: self.channel.frame_id().to_string(),
                range,
            }),
            Some(other) => warn_unexpected(self.channel.key(), "scalar", &other),
            None => {}
        }
    }
}
