//! Composite IMU resolution.
//!
//! An IMU endpoint is assembled from up to three separately named devices:
//! an accelerometer, an inertial unit and a gyro.  Composites are identified
//! by an *IMU key*: the constituent names joined with `|`, e.g.
//! `"accelerometer|inertial_unit|gyro"`.
//!
//! # Resolution
//!
//! 1. **Default IMU** ([`default_imu`]) – when no configured key is an IMU
//!    key and the robot carries at most one device of each constituent kind
//!    (and at least one in total), a single composite is inserted on `/imu`.
//! 2. **Configured IMUs** ([`configured_imus`]) – every configured key that
//!    is an IMU key becomes one composite built with that key's options.
//!
//! Any configured IMU key disables step 1 entirely.  When a robot carries
//! two or more devices of one constituent kind and nothing is configured, no
//! composite is created.
//!
//! Constituents are always ordered accelerometer, inertial unit, gyro,
//! whatever their order inside the key.

use std::fmt;
use std::sync::Arc;

use simlink_types::DeviceKind;

use crate::options::{DeviceManagerConfig, DeviceOptions};
use crate::robot::SimDevice;

/// Separator between constituent names in an IMU key.
pub const IMU_KEY_SEPARATOR: char = '|';

/// Topic of the automatically inserted IMU.
pub const DEFAULT_IMU_TOPIC: &str = "/imu";

// ────────────────────────────────────────────────────────────────────────────
// DeviceTable
// ────────────────────────────────────────────────────────────────────────────

/// Every device seen during enumeration, in enumeration order.
#[derive(Default)]
pub struct DeviceTable {
    devices: Vec<Arc<dyn SimDevice>>,
}

impl DeviceTable {
    pub fn push(&mut self, device: Arc<dyn SimDevice>) {
        self.devices.push(device);
    }

    /// Look up a device by name.  If two devices share a name the one
    /// enumerated last wins.
    pub fn get(&self, name: &str) -> Option<&Arc<dyn SimDevice>> {
        self.devices.iter().rev().find(|d| d.name() == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn SimDevice>> {
        self.devices.iter()
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// ImuParts
// ────────────────────────────────────────────────────────────────────────────

/// At most one device of each constituent kind.
#[derive(Clone, Default)]
pub struct ImuParts {
    pub accelerometer: Option<Arc<dyn SimDevice>>,
    pub inertial_unit: Option<Arc<dyn SimDevice>>,
    pub gyro: Option<Arc<dyn SimDevice>>,
}

impl ImuParts {
    /// Resolve the constituents named by `key`.
    ///
    /// Parts that name no known device, or a device that is not an IMU
    /// constituent, are ignored.  A later part of the same kind replaces an
    /// earlier one.
    pub fn from_key(key: &str, table: &DeviceTable) -> Self {
        let mut parts = Self::default();
        for name in key.split(IMU_KEY_SEPARATOR) {
            if let Some(device) = table.get(name) {
                parts.insert(Arc::clone(device));
            }
        }
        parts
    }

    /// Place `device` in the slot matching its kind.  Returns `false` (and
    /// drops the device) when it is not an IMU constituent.
    pub fn insert(&mut self, device: Arc<dyn SimDevice>) -> bool {
        let slot = match device.kind() {
            DeviceKind::Accelerometer => &mut self.accelerometer,
            DeviceKind::InertialUnit => &mut self.inertial_unit,
            DeviceKind::Gyro => &mut self.gyro,
            _ => return false,
        };
        *slot = Some(device);
        true
    }

    pub fn is_empty(&self) -> bool {
        self.accelerometer.is_none() && self.inertial_unit.is_none() && self.gyro.is_none()
    }

    /// Present constituents, accelerometer first, then inertial unit, then
    /// gyro.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn SimDevice>> {
        [&self.accelerometer, &self.inertial_unit, &self.gyro]
            .into_iter()
            .flatten()
    }

    /// Name of the first present constituent.
    pub fn first_name(&self) -> Option<&str> {
        self.iter().next().map(|d| d.name())
    }

    /// Canonical IMU key: present constituent names joined with `|`.
    pub fn key(&self) -> String {
        let separator = IMU_KEY_SEPARATOR.to_string();
        self.iter()
            .map(|d| d.name())
            .collect::<Vec<_>>()
            .join(separator.as_str())
    }
}

impl fmt::Debug for ImuParts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = |d: &Option<Arc<dyn SimDevice>>| d.as_ref().map(|d| d.name().to_string());
        f.debug_struct("ImuParts")
            .field("accelerometer", &name(&self.accelerometer))
            .field("inertial_unit", &name(&self.inertial_unit))
            .field("gyro", &name(&self.gyro))
            .finish()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Resolution
// ────────────────────────────────────────────────────────────────────────────

/// `true` when at least one `|`-separated part of `key` names a known
/// accelerometer, inertial unit or gyro.
pub fn is_imu_key(key: &str, table: &DeviceTable) -> bool {
    !ImuParts::from_key(key, table).is_empty()
}

/// The automatically inserted IMU, if any: `(key, parts, options)`.
pub fn default_imu(
    table: &DeviceTable,
    config: &DeviceManagerConfig,
) -> Option<(String, ImuParts, DeviceOptions)> {
    if config.keys().any(|key| is_imu_key(key, table)) {
        return None;
    }

    let mut parts = ImuParts::default();
    let (mut accelerometers, mut inertial_units, mut gyros) = (0usize, 0usize, 0usize);
    for device in table.iter() {
        let counter = match device.kind() {
            DeviceKind::Accelerometer => &mut accelerometers,
            DeviceKind::InertialUnit => &mut inertial_units,
            DeviceKind::Gyro => &mut gyros,
            _ => continue,
        };
        *counter += 1;
        if *counter == 1 {
            parts.insert(Arc::clone(device));
        }
    }

    if accelerometers > 1 || inertial_units > 1 || gyros > 1 || parts.is_empty() {
        return None;
    }

    let key = parts.key();
    let options = DeviceOptions::default()
        .with_topic(DEFAULT_IMU_TOPIC)
        .with_frame(parts.first_name().unwrap_or_default());
    Some((key, parts, options))
}

/// Every configured IMU, in configuration key order: `(key, parts, options)`.
pub fn configured_imus<'a>(
    table: &DeviceTable,
    config: &'a DeviceManagerConfig,
) -> Vec<(&'a str, ImuParts, &'a DeviceOptions)> {
    config
        .devices
        .iter()
        .filter_map(|(key, options)| {
            let parts = ImuParts::from_key(key, table);
            (!parts.is_empty()).then_some((key, parts, options))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SimulatedDevice;

    fn table(devices: &[(&str, DeviceKind)]) -> DeviceTable {
        let mut table = DeviceTable::default();
        for (name, kind) in devices {
            table.push(SimulatedDevice::new(*name, *kind));
        }
        table
    }

    fn names(parts: &ImuParts) -> Vec<&str> {
        parts.iter().map(|d| d.name()).collect()
    }

    #[test]
    fn from_key_orders_constituents() {
        let table = table(&[
            ("g", DeviceKind::Gyro),
            ("a", DeviceKind::Accelerometer),
            ("i", DeviceKind::InertialUnit),
        ]);
        let parts = ImuParts::from_key("g|i|a", &table);
        assert_eq!(names(&parts), ["a", "i", "g"]);
        assert_eq!(parts.key(), "a|i|g");
        assert_eq!(parts.first_name(), Some("a"));
    }

    #[test]
    fn from_key_ignores_unknown_and_wrong_kind_parts() {
        let table = table(&[
            ("cam", DeviceKind::Camera),
            ("a", DeviceKind::Accelerometer),
        ]);
        let parts = ImuParts::from_key("cam|ghost|a", &table);
        assert_eq!(names(&parts), ["a"]);
    }

    #[test]
    fn later_part_of_same_kind_wins() {
        let table = table(&[
            ("a1", DeviceKind::Accelerometer),
            ("a2", DeviceKind::Accelerometer),
        ]);
        let parts = ImuParts::from_key("a1|a2", &table);
        assert_eq!(names(&parts), ["a2"]);
    }

    #[test]
    fn imu_key_predicate() {
        let table = table(&[
            ("cam", DeviceKind::Camera),
            ("a", DeviceKind::Accelerometer),
        ]);
        assert!(is_imu_key("a", &table));
        assert!(is_imu_key("a|ghost", &table));
        assert!(!is_imu_key("cam", &table));
        assert!(!is_imu_key("ghost", &table));
        assert!(!is_imu_key("", &table));
    }

    #[test]
    fn default_imu_from_one_of_each() {
        let table = table(&[
            ("gyro", DeviceKind::Gyro),
            ("acc", DeviceKind::Accelerometer),
            ("iu", DeviceKind::InertialUnit),
        ]);
        let (key, parts, options) =
            default_imu(&table, &DeviceManagerConfig::default()).expect("default IMU");
        assert_eq!(key, "acc|iu|gyro");
        assert_eq!(names(&parts), ["acc", "iu", "gyro"]);
        assert_eq!(options.topic_name.as_deref(), Some("/imu"));
        assert_eq!(options.frame_id.as_deref(), Some("acc"));
    }

    #[test]
    fn default_imu_from_partial_set() {
        let table = table(&[
            ("iu", DeviceKind::InertialUnit),
            ("gyro", DeviceKind::Gyro),
        ]);
        let (key, _, options) =
            default_imu(&table, &DeviceManagerConfig::default()).expect("default IMU");
        assert_eq!(key, "iu|gyro");
        assert_eq!(options.frame_id.as_deref(), Some("iu"));
    }

    #[test]
    fn no_default_imu_when_ambiguous() {
        let table = table(&[
            ("acc_front", DeviceKind::Accelerometer),
            ("acc_rear", DeviceKind::Accelerometer),
            ("gyro", DeviceKind::Gyro),
        ]);
        assert!(default_imu(&table, &DeviceManagerConfig::default()).is_none());
    }

    #[test]
    fn no_default_imu_without_constituents() {
        let table = table(&[("cam", DeviceKind::Camera)]);
        assert!(default_imu(&table, &DeviceManagerConfig::default()).is_none());
    }

    #[test]
    fn configured_imu_suppresses_default() {
        let table = table(&[
            ("acc", DeviceKind::Accelerometer),
            ("gyro", DeviceKind::Gyro),
        ]);
        let config = DeviceManagerConfig::default().with_device("gyro", DeviceOptions::default());
        assert!(default_imu(&table, &config).is_none());

        let configured = configured_imus(&table, &config);
        assert_eq!(configured.len(), 1);
        assert_eq!(configured[0].0, "gyro");
        assert_eq!(names(&configured[0].1), ["gyro"]);
    }

    #[test]
    fn configured_imus_skip_non_imu_keys() {
        let table = table(&[
            ("cam", DeviceKind::Camera),
            ("acc", DeviceKind::Accelerometer),
            ("gyro", DeviceKind::Gyro),
        ]);
        let config = DeviceManagerConfig::default()
            .with_device("cam", DeviceOptions::default())
            .with_device("gyro|acc", DeviceOptions::default().with_topic("/body"))
            .with_device("ghost", DeviceOptions::default());

        let configured = configured_imus(&table, &config);
        assert_eq!(configured.len(), 1);
        let (key, parts, options) = &configured[0];
        assert_eq!(*key, "gyro|acc");
        assert_eq!(names(parts), ["acc", "gyro"]);
        assert_eq!(options.topic_name.as_deref(), Some("/body"));
    }
}
