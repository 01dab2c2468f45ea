//! [`LightSensorDevice`] – publishes irradiance measurements.

use std::sync::Arc;

use simlink_types::{EventPayload, Reading};

use crate::devices::{
    Device, DeviceContext, DeviceSettings, SensorChannel, sample_or_warn, warn_unexpected,
};
use crate::options::DeviceOptions;
use crate::robot::SimDevice;

pub struct LightSensorDevice {
    device: Arc<dyn SimDevice>,
    channel: SensorChannel,
}

impl LightSensorDevice {
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

impl Device for LightSensorDevice {
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
            Some(Reading::Scalar(value)) => self.channel.publish(EventPayload::Illuminance {
                frame_id: self.channel.frame_id().to_string(),
                value,
            }),
            Some(other) => warn_unexpected(self.channel.key(), "scalar", &other),
            None => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devices::test_support::context;

    #[test]
    fn publishes_illuminance_when_always_publish() {
        let (ctx, robot) = context(|b| b.with_light_sensor("ls0"));
        let device = robot.device_named("ls0").unwrap();
        device.set_reading(Reading::Scalar(120.0));

        let options = DeviceOptions::default().always_publish();
        let mut sensor = LightSensorDevice::new(&ctx, device, Some(&options));
        // No subscriber yet: the sample is taken but reaches nobody.
        sensor.synchronize();

        let mut rx = ctx.bus.subscribe("/ls0");
        robot.step();
        sensor.synchronize();
        match rx.try_recv().map(|e| e.payload) {
            Some(EventPayload::Illuminance { value, .. }) => {
                assert!((value - 120.0).abs() < f64::EPSILON)
            }
            other => panic!("unexpected payload: {other:?}"),
        }
    }
}
