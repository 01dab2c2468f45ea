//! [`RangeFinderDevice`] – publishes depth images.

use std::sync::Arc;

use simlink_types::{EventPayload, Reading};

use crate::devices::{
    Device, DeviceContext, DeviceSettings, SensorChannel, sample_or_warn, warn_unexpected,
};
use crate::options::DeviceOptions;
use crate::robot::SimDevice;

/// Publishes every due [`Reading::RangeImage`] as an
/// [`EventPayload::DepthImage`] (one `f32` range in metres per pixel).
pub struct RangeFinderDevice {
    device: Arc<dyn SimDevice>,
    channel: SensorChannel,
}

impl RangeFinderDevice {
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

impl Device for RangeFinderDevice {
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
            Some(Reading::RangeImage {
                width,
                height,
                ranges,
            }) => self.channel.publish(EventPayload::DepthImage {
                frame_id: self.channel.frame_id().to_string(),
                width,
                height,
                ranges,
            }),
            Some(other) => warn_unexpected(self.channel.key(), "range image", &other),
            None => {}
        }
    }
}
