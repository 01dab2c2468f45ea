//! [`LedDevice`] – drives a simulated LED from its topic.
//!
//! Unlike the sensor wrappers, data flows from the bus into the simulator:
//! every [`EventPayload::LedCommand`] received on the LED's topic since the
//! previous tick is applied to the device, in arrival order.

use std::sync::Arc;

use simlink_middleware::TopicReceiver;
use simlink_types::{EventPayload, Reading};
use tracing::{debug, warn};

use crate::devices::{Device, DeviceContext, DeviceSettings};
use crate::options::DeviceOptions;
use crate::robot::SimDevice;

pub struct LedDevice {
    key: String,
    device: Arc<dyn SimDevice>,
    settings: DeviceSettings,
    commands: TopicReceiver,
}

impl LedDevice {
    pub fn new(
        ctx: &DeviceContext,
        device: Arc<dyn SimDevice>,
        options: Option<&DeviceOptions>,
    ) -> Self {
        let settings = DeviceSettings::resolve(device.name(), options, ctx.robot.basic_time_step());
        Self {
            key: device.name().to_string(),
            commands: ctx.bus.subscribe(&settings.topic_name),
            device,
            settings,
        }
    }
}

impl Device for LedDevice {
    fn key(&self) -> &str {
        &self.key
    }

    fn topic(&self) -> &str {
        &self.settings.topic_name
    }

    fn synchronize(&mut self) {
        while let Some(event) = self.commands.try_recv() {
            if self.settings.disabled {
                continue;
            }
            match event.payload {
                EventPayload::LedCommand(value) => {
                    if let Err(e) = self.device.apply(Reading::Led(value)) {
                        warn!(device = %self.key, value, error = %e, "LED command rejected");
                    }
                }
                other => debug!(device = %self.key, ?other, "ignoring non-LED message"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devices::test_support::context;
    use simlink_types::Event;

    fn command(value: i32) -> Event {
        Event::new("test", EventPayload::LedCommand(value))
    }

    #[test]
    fn applies_commands_in_order() {
        let (ctx, robot) = context(|b| b.with_led("led0"));
        let stub = robot.device_named("led0").unwrap();
        let mut led = LedDevice::new(&ctx, stub.clone(), None);
        assert_eq!(led.topic(), "/led0");

        let publisher = ctx.bus.publisher("/led0");
        publisher.publish(command(1)).unwrap();
        publisher.publish(command(7)).unwrap();
        led.synchronize();

        assert_eq!(stub.reading(), Some(Reading::Led(7)));
    }

    #[test]
    fn ignores_other_payloads() {
        let (ctx, robot) = context(|b| b.with_led("led0"));
        let stub = robot.device_named("led0").unwrap();
        let mut led = LedDevice::new(&ctx, stub.clone(), None);

        ctx.bus
            .publisher("/led0")
            .publish(Event::new("test", EventPayload::Clock { sim_time: 1.0 }))
            .unwrap();
        led.synchronize();

        assert_eq!(stub.reading(), Some(Reading::Led(0)));
    }

    #[test]
    fn disabled_led_drops_commands() {
        let (ctx, robot) = context(|b| b.with_led("led0"));
        let stub = robot.device_named("led0").unwrap();
        let options = DeviceOptions::default().disabled();
        let mut led = LedDevice::new(&ctx, stub.clone(), Some(&options));

        ctx.bus.publisher("/led0").publish(command(5)).unwrap();
        led.synchronize();

        assert_eq!(stub.reading(), Some(Reading::Led(0)));
    }
}
