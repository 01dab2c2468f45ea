//! Simulator handle traits.
//!
//! The rest of the bridge only ever talks to these traits, so the simulated
//! robot in [`sim`][crate::sim] and a live simulator controller are
//! interchangeable.

use std::sync::Arc;

use simlink_types::{BridgeError, DeviceKind, Reading};

/// One device attached to a simulated robot.
pub trait SimDevice: Send + Sync {
    /// Device name, unique among the robot's devices, e.g. `"camera"`.
    fn name(&self) -> &str;

    /// Hardware tag assigned by the simulator.
    fn kind(&self) -> DeviceKind;

    /// Return the device's current measurement.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::DeviceFault`] if the device has nothing to
    /// report (e.g. it is not enabled in the simulator yet).
    fn sample(&self) -> Result<Reading, BridgeError>;

    /// Drive an actuated device (e.g. an LED) to `reading`.
    ///
    /// # Errors
    ///
    /// The default implementation rejects every command with
    /// [`BridgeError::DeviceFault`]; sensors cannot be actuated.
    fn apply(&self, reading: Reading) -> Result<(), BridgeError> {
        let _ = reading;
        Err(BridgeError::DeviceFault {
            device: self.name().to_string(),
            details: format!("{} devices cannot be actuated", self.kind()),
        })
    }
}

/// A simulated robot model exposing its attached devices.
pub trait SimRobot: Send + Sync {
    /// Robot model name.
    fn name(&self) -> &str;

    /// Number of attached devices.
    fn device_count(&self) -> usize;

    /// Device at `index` (`0..device_count()`).
    fn device(&self, index: usize) -> Option<Arc<dyn SimDevice>>;

    /// Basic simulation time step in milliseconds.
    fn basic_time_step(&self) -> f64;

    /// Current simulated time in seconds.
    fn time(&self) -> f64;
}
