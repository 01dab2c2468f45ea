//! [`RobotDevice`] – mirrors the robot body itself.
//!
//! Registered under `@robot` whenever discovery runs.  Publishes the
//! simulated time on `/clock` so that consumers can follow the simulation
//! clock rather than the wall clock.

use simlink_types::EventPayload;

use crate::devices::{Device, DeviceContext, DeviceSettings, SensorChannel};
use crate::options::{DeviceOptions, ROBOT_KEY};

/// Default topic of the robot body entry.
pub const CLOCK_TOPIC: &str = "/clock";

pub struct RobotDevice {
    channel: SensorChannel,
}

impl RobotDevice {
    pub fn new(ctx: &DeviceContext, options: Option<&DeviceOptions>) -> Self {
        let mut settings =
            DeviceSettings::resolve(ctx.robot.name(), options, ctx.robot.basic_time_step());
        if options.and_then(|o| o.topic_name.as_ref()).is_none() {
            settings.topic_name = CLOCK_TOPIC.to_string();
        }
        Self {
            channel: SensorChannel::new(ctx, ROBOT_KEY, settings),
        }
    }
}

impl Device for RobotDevice {
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
        let sim_time = self.channel.robot().time();
        self.channel.publish(EventPayload::Clock { sim_time });
    }
}
