//! Device manager configuration.
//!
//! [`DeviceManagerConfig`] is the typed form: an `auto` switch, optional
//! options for the robot body, and a per-device options map keyed by device
//! name or by a `|`-joined IMU key.
//!
//! Older launch files describe the same thing as one flat map in which the
//! reserved keys `@auto` and `@robot` sit next to device names:
//!
//! ```json
//! { "@auto": true, "@robot": {}, "camera": { "topic_name": "/front" } }
//! ```
//!
//! [`DeviceManagerConfig::from_legacy_map`] and
//! [`DeviceManagerConfig::to_legacy_map`] convert between the two.
//!
//! Configured keys keep the order they were written in.  The reserved keys
//! are not device identifiers: the typed form rejects them inside `devices`.

use std::collections::BTreeMap;
use std::fmt;

use serde::de::{self, MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use simlink_types::BridgeError;
use tracing::warn;

/// Reserved legacy key holding the global enable flag.
pub const AUTO_KEY: &str = "@auto";

/// Reserved key of the robot body entry.
pub const ROBOT_KEY: &str = "@robot";

/// Per-device construction options.  Every field is optional; wrappers fall
/// back to their own defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceOptions {
    /// Topic the device publishes on (or listens to, for LEDs).
    #[serde(default, alias = "topic", skip_serializing_if = "Option::is_none")]
    pub topic_name: Option<String>,

    /// Reference frame stamped on published data.
    #[serde(default, alias = "reference_frame", skip_serializing_if = "Option::is_none")]
    pub frame_id: Option<String>,

    /// Minimum simulated time between two publications, in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestep: Option<f64>,

    /// Publish even when nobody is subscribed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub always_publish: Option<bool>,

    /// Keep the device registered but never synchronize it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disable: Option<bool>,

    /// Options this crate does not interpret, kept for downstream consumers.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl DeviceOptions {
    pub fn with_topic(mut self, topic_name: impl Into<String>) -> Self {
        self.topic_name = Some(topic_name.into());
        self
    }

    pub fn with_frame(mut self, frame_id: impl Into<String>) -> Self {
        self.frame_id = Some(frame_id.into());
        self
    }

    pub fn with_timestep(mut self, timestep_ms: f64) -> Self {
        self.timestep = Some(timestep_ms);
        self
    }

    pub fn always_publish(mut self) -> Self {
        self.always_publish = Some(true);
        self
    }

    pub fn disabled(mut self) -> Self {
        self.disable = Some(true);
        self
    }
}

// ────────────────────────────────────────────────────────────────────────────
// DeviceEntries
// ────────────────────────────────────────────────────────────────────────────

/// Per-device options keyed by device name or IMU key, in configuration
/// order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeviceEntries {
    entries: Vec<(String, DeviceOptions)>,
}

impl DeviceEntries {
    /// Add (or replace in place) the options for `key`.
    pub(crate) fn insert(&mut self, key: String, options: DeviceOptions) -> Option<DeviceOptions> {
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => Some(std::mem::replace(slot, options)),
            None => {
                self.entries.push((key, options));
                None
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&DeviceOptions> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, o)| o)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &DeviceOptions)> {
        self.entries.iter().map(|(k, o)| (k.as_str(), o))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for DeviceEntries {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.iter())
    }
}

impl<'de> Deserialize<'de> for DeviceEntries {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(EntriesVisitor)
    }
}

struct EntriesVisitor;

impl<'de> Visitor<'de> for EntriesVisitor {
    type Value = DeviceEntries;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a map of device keys to options")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut entries = DeviceEntries::default();
        while let Some(key) = access.next_key::<String>()? {
            if let Some(reason) = reserved_key(&key) {
                return Err(de::Error::custom(reason));
            }
            let options = access.next_value::<DeviceOptions>()?;
            entries.insert(key, options);
        }
        Ok(entries)
    }
}

/// Why `key` cannot name a device, if it is one of the reserved keys.
fn reserved_key(key: &str) -> Option<String> {
    match key {
        AUTO_KEY => Some(format!(
            "`{AUTO_KEY}` is reserved; use the top-level `auto` flag"
        )),
        ROBOT_KEY => Some(format!(
            "`{ROBOT_KEY}` is reserved; use the `robot` table"
        )),
        _ => None,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// DeviceManagerConfig
// ────────────────────────────────────────────────────────────────────────────

/// Typed device manager configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceManagerConfig {
    /// Global switch.  When `false` no device is discovered and no timer is
    /// registered.
    #[serde(default = "default_auto")]
    pub auto: bool,

    /// Options for the robot body entry (`@robot`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub robot: Option<DeviceOptions>,

    /// Options keyed by device name or IMU key.
    #[serde(default)]
    pub devices: DeviceEntries,
}

fn default_auto() -> bool {
    true
}

impl Default for DeviceManagerConfig {
    fn default() -> Self {
        Self {
            auto: default_auto(),
            robot: None,
            devices: DeviceEntries::default(),
        }
    }
}

impl DeviceManagerConfig {
    /// A configuration with discovery switched off.
    pub fn disabled() -> Self {
        Self {
            auto: false,
            ..Self::default()
        }
    }

    /// Add (or replace) the options for `key`.
    ///
    /// `@robot` sets the robot body options, as in the legacy map.  Options
    /// given for `@auto` are dropped with a warning.
    pub fn with_device(mut self, key: impl Into<String>, options: DeviceOptions) -> Self {
        let key = key.into();
        if key == ROBOT_KEY {
            self.robot = Some(options);
        } else if key == AUTO_KEY {
            warn!(key = AUTO_KEY, "options for the enable flag ignored");
        } else {
            self.devices.insert(key, options);
        }
        self
    }

    /// Set the robot body options.
    pub fn with_robot(mut self, options: DeviceOptions) -> Self {
        self.robot = Some(options);
        self
    }

    /// Options configured for `identifier`, or `None` when the device should
    /// use its defaults.
    pub fn resolve(&self, identifier: &str) -> Option<&DeviceOptions> {
        self.devices.get(identifier)
    }

    /// Every configured device key, in configuration order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.devices.keys()
    }

    /// Read the flat legacy map.
    ///
    /// The resolved `@auto` flag is written back into `map` so that other
    /// consumers of the same map observe the default explicitly.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Config`] when `@auto` is not a boolean or when
    /// an entry is neither an options object nor `null`.
    pub fn from_legacy_map(map: &mut Map<String, Value>) -> Result<Self, BridgeError> {
        let auto = match map.get(AUTO_KEY) {
            None => default_auto(),
            Some(Value::Bool(flag)) => *flag,
            Some(other) => {
                return Err(BridgeError::Config(format!(
                    "`{AUTO_KEY}` must be a boolean, got {other}"
                )));
            }
        };
        map.insert(AUTO_KEY.to_string(), Value::Bool(auto));

        let mut config = Self {
            auto,
            ..Self::default()
        };
        for (key, value) in map.iter() {
            if key == AUTO_KEY {
                continue;
            }
            let options = parse_options(key, value)?;
            if key == ROBOT_KEY {
                config.robot = Some(options);
            } else {
                config.devices.insert(key.clone(), options);
            }
        }
        Ok(config)
    }

    /// Render the flat legacy map, with `@auto` always present.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Config`] if an `extra` value cannot be
    /// represented as JSON.
    pub fn to_legacy_map(&self) -> Result<Map<String, Value>, BridgeError> {
        let mut map = Map::new();
        map.insert(AUTO_KEY.to_string(), Value::Bool(self.auto));
        if let Some(robot) = &self.robot {
            map.insert(ROBOT_KEY.to_string(), options_to_value(ROBOT_KEY, robot)?);
        }
        for (key, options) in self.devices.iter() {
            map.insert(key.to_string(), options_to_value(key, options)?);
        }
        Ok(map)
    }
}

fn parse_options(key: &str, value: &Value) -> Result<DeviceOptions, BridgeError> {
    match value {
        Value::Null => Ok(DeviceOptions::default()),
        Value::Object(_) => serde_json::from_value(value.clone())
            .map_err(|e| BridgeError::Config(format!("invalid options for `{key}`: {e}"))),
        other => Err(BridgeError::Config(format!(
            "options for `{key}` must be an object or null, got {other}"
        ))),
    }
}

fn options_to_value(key: &str, options: &DeviceOptions) -> Result<Value, BridgeError> {
    serde_json::to_value(options)
        .map_err(|e| BridgeError::Config(format!("cannot serialise options for `{key}`: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn as_map(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected a JSON object"),
        }
    }

    #[test]
    fn auto_defaults_to_true() {
        assert!(DeviceManagerConfig::default().auto);
        let parsed: DeviceManagerConfig = serde_json::from_str("{}").unwrap();
        assert!(parsed.auto);
        assert!(parsed.devices.is_empty());
    }

    #[test]
    fn resolve_returns_configured_options_only() {
        let config = DeviceManagerConfig::default()
            .with_device("camera", DeviceOptions::default().with_topic("/front"));
        assert_eq!(
            config.resolve("camera").and_then(|o| o.topic_name.as_deref()),
            Some("/front")
        );
        assert!(config.resolve("lidar").is_none());
    }

    #[test]
    fn legacy_map_writes_back_auto_flag() {
        let mut map = as_map(json!({ "camera": { "topic_name": "/front" } }));
        let config = DeviceManagerConfig::from_legacy_map(&mut map).unwrap();
        assert!(config.auto);
        assert_eq!(map.get(AUTO_KEY), Some(&Value::Bool(true)));
        assert!(config.resolve("camera").is_some());
    }

    #[test]
    fn legacy_map_keeps_explicit_false() {
        let mut map = as_map(json!({ "@auto": false }));
        let config = DeviceManagerConfig::from_legacy_map(&mut map).unwrap();
        assert!(!config.auto);
        assert_eq!(map.get(AUTO_KEY), Some(&Value::Bool(false)));
    }

    #[test]
    fn legacy_map_splits_robot_entry() {
        let mut map = as_map(json!({
            "@robot": { "topic_name": "/sim_clock" },
            "ds0": null,
        }));
        let config = DeviceManagerConfig::from_legacy_map(&mut map).unwrap();
        assert_eq!(
            config.robot.as_ref().and_then(|o| o.topic_name.as_deref()),
            Some("/sim_clock")
        );
        assert_eq!(config.resolve("ds0"), Some(&DeviceOptions::default()));
        assert!(config.resolve(ROBOT_KEY).is_none());
        assert!(config.resolve(AUTO_KEY).is_none());
    }

    #[test]
    fn legacy_map_rejects_non_boolean_auto() {
        let mut map = as_map(json!({ "@auto": "yes" }));
        assert!(matches!(
            DeviceManagerConfig::from_legacy_map(&mut map),
            Err(BridgeError::Config(_))
        ));
    }

    #[test]
    fn legacy_map_rejects_scalar_options() {
        let mut map = as_map(json!({ "camera": 3 }));
        assert!(matches!(
            DeviceManagerConfig::from_legacy_map(&mut map),
            Err(BridgeError::Config(_))
        ));
    }

    #[test]
    fn aliases_and_extra_options_are_accepted() {
        let options: DeviceOptions = serde_json::from_value(json!({
            "topic": "/imu",
            "reference_frame": "base_link",
            "gain": 2.5,
        }))
        .unwrap();
        assert_eq!(options.topic_name.as_deref(), Some("/imu"));
        assert_eq!(options.frame_id.as_deref(), Some("base_link"));
        assert_eq!(options.extra.get("gain"), Some(&json!(2.5)));
    }

    #[test]
    fn legacy_map_roundtrip() {
        let config = DeviceManagerConfig::default()
            .with_robot(DeviceOptions::default())
            .with_device(
                "accelerometer|gyro",
                DeviceOptions::default().with_topic("/body_imu").with_timestep(64.0),
            );
        let mut map = config.to_legacy_map().unwrap();
        assert_eq!(map.get(AUTO_KEY), Some(&Value::Bool(true)));
        assert!(map.contains_key(ROBOT_KEY));

        let back = DeviceManagerConfig::from_legacy_map(&mut map).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn typed_config_parses_from_toml() {
        let raw = r#"
            auto = true

            [devices.camera]
            topic_name = "/front"
            always_publish = true

            [devices."accelerometer|inertial_unit"]
            topic = "/body_imu"
        "#;
        let config: DeviceManagerConfig = toml::from_str(raw).unwrap();
        assert_eq!(config.keys().collect::<Vec<_>>(), ["camera", "accelerometer|inertial_unit"]);
        assert_eq!(config.resolve("camera").and_then(|o| o.always_publish), Some(true));
    }

    #[test]
    fn typed_config_rejects_robot_key_in_devices() {
        let raw = r#"
            [devices."@robot"]
            topic_name = "/sim_clock"
        "#;
        let err = toml::from_str::<DeviceManagerConfig>(raw).unwrap_err();
        assert!(err.to_string().contains("`@robot` is reserved"), "{err}");
    }

    #[test]
    fn typed_config_rejects_auto_key_in_devices() {
        let raw = r#"
            [devices."@auto"]
            [devices.camera]
        "#;
        let err = toml::from_str::<DeviceManagerConfig>(raw).unwrap_err();
        assert!(err.to_string().contains("`@auto` is reserved"), "{err}");

        let json = json!({ "devices": { "@auto": {} } });
        assert!(serde_json::from_value::<DeviceManagerConfig>(json).is_err());
    }

    #[test]
    fn with_device_routes_reserved_keys() {
        let config = DeviceManagerConfig::default()
            .with_device(ROBOT_KEY, DeviceOptions::default().with_topic("/sim_clock"))
            .with_device(AUTO_KEY, DeviceOptions::default())
            .with_device("camera", DeviceOptions::default());

        assert_eq!(
            config.robot.as_ref().and_then(|o| o.topic_name.as_deref()),
            Some("/sim_clock")
        );
        assert!(config.auto);
        assert_eq!(config.keys().collect::<Vec<_>>(), ["camera"]);
    }

    #[test]
    fn configured_keys_keep_file_order() {
        let mut map: Map<String, Value> =
            serde_json::from_str(r#"{ "zeta": {}, "@robot": {}, "alpha|beta": null, "mid": {} }"#)
                .unwrap();
        let config = DeviceManagerConfig::from_legacy_map(&mut map).unwrap();
        assert_eq!(config.keys().collect::<Vec<_>>(), ["zeta", "alpha|beta", "mid"]);

        let rendered = config.to_legacy_map().unwrap();
        let keys: Vec<&str> = rendered.keys().map(String::as_str).collect();
        assert_eq!(keys, [AUTO_KEY, ROBOT_KEY, "zeta", "alpha|beta", "mid"]);
    }

    #[test]
    fn replacing_an_entry_keeps_its_position() {
        let config = DeviceManagerConfig::default()
            .with_device("b", DeviceOptions::default())
            .with_device("a", DeviceOptions::default())
            .with_device("b", DeviceOptions::default().with_topic("/b2"));
        assert_eq!(config.keys().collect::<Vec<_>>(), ["b", "a"]);
        assert_eq!(config.devices.len(), 2);
        assert_eq!(
            config.resolve("b").and_then(|o| o.topic_name.as_deref()),
            Some("/b2")
        );
    }
}
