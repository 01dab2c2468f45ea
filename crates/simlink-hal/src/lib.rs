//! `simlink-hal` – Device Discovery & Synchronization
//!
//! Turns the devices attached to a simulated robot into bus endpoints and
//! keeps those endpoints in step with the simulation clock.
//!
//! # Modules
//!
//! - [`robot`] – [`SimRobot`] and [`SimDevice`]: the simulator handle the
//!   rest of the crate is written against.
//! - [`sim`] – [`SimulatedRobot`][sim::SimulatedRobot]: an in-process robot
//!   with stub devices and a manually stepped clock, buildable from a
//!   serde [`RobotDescription`][sim::RobotDescription].
//! - [`options`] – [`DeviceManagerConfig`] and [`DeviceOptions`], plus the
//!   flat `@auto` / `@robot` legacy map form.
//! - [`registry`] – [`DeviceBuilder`]: which device kinds get a wrapper of
//!   their own.
//! - [`composite`] – IMU keys and the default/configured IMU resolution.
//! - [`devices`] – the [`Device`] trait and one wrapper per supported kind,
//!   plus [`ImuDevice`][devices::ImuDevice] and
//!   [`RobotDevice`][devices::RobotDevice].
//! - [`device_set`] – [`DeviceSet`]: discovered wrappers in registration
//!   order.
//! - [`sync_loop`] – [`SyncLoop`]: the timer-driven pass over the set.
//! - [`device_manager`] – [`DeviceManager`] and [`discover`]: the entry
//!   point tying discovery and synchronization together.

pub mod composite;
pub mod device_manager;
pub mod device_set;
pub mod devices;
pub mod options;
pub mod registry;
pub mod robot;
pub mod sim;
pub mod sync_loop;

pub use device_manager::{DeviceManager, Discovery, discover};
pub use device_set::DeviceSet;
pub use devices::{Device, DeviceContext, DeviceSettings};
pub use options::{AUTO_KEY, DeviceEntries, DeviceManagerConfig, DeviceOptions, ROBOT_KEY};
pub use registry::DeviceBuilder;
pub use robot::{SimDevice, SimRobot};
pub use sync_loop::{SyncLoop, sync_period};
