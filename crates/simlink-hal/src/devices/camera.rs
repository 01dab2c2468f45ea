//! [`CameraDevice`] – publishes camera frames.

use std::sync::Arc;

use simlink_types::{EventPayload, Reading};

use crate::devices::{
    Device, DeviceContext, DeviceSettings, SensorChannel, sample_or_warn, warn_unexpected,
};
use crate::options::DeviceOptions;
use crate::robot::SimDevice;

/// Publishes every due [`Reading::Image`] as an [`EventPayload::Image`].
pub struct CameraDevice {
    device: Arc<dyn SimDevice>,
    channel: SensorChannel,
}

impl CameraDevice {
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

impl Device for CameraDevice {
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
            Some(Reading::Image {
                width,
                height,
                data,
            }) => self.channel.publish(EventPayload::Image {
                frame_id: self.channel.frame_id().to_string(),
                width,
                height,
                data,
            }),
            Some(other) => warn_unexpected(self.channel.key(), "image", &other),
            None => {}
        }
    }
}
