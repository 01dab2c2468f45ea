//! Launch configuration – the robot description and the device
//! configuration files.
//!
//! The robot description is TOML (see
//! [`RobotDescription`][simlink_hal::sim::RobotDescription]).  The device
//! configuration is either the typed TOML form of [`DeviceManagerConfig`] or,
//! for files ending in `.json`, the flat legacy map with `@auto` / `@robot`
//! keys.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use simlink_hal::DeviceManagerConfig;
use simlink_hal::sim::RobotDescription;
use simlink_types::BridgeError;

pub const ROBOT_ENV: &str = "SIMLINK_ROBOT";
pub const DEVICES_ENV: &str = "SIMLINK_DEVICES";
pub const TIME_STEP_ENV: &str = "SIMLINK_TIME_STEP";

/// Everything needed to start the bridge.
#[derive(Debug, Clone)]
pub struct LaunchConfig {
    pub robot: RobotDescription,
    pub devices: DeviceManagerConfig,
}

/// Resolve the file paths and load both files.
///
/// Paths given on the command line win over `SIMLINK_ROBOT` /
/// `SIMLINK_DEVICES`.  A robot description is required; without a device
/// configuration the defaults apply.  `SIMLINK_TIME_STEP` then overrides the
/// description's basic time step.
pub fn load(robot: Option<PathBuf>, devices: Option<PathBuf>) -> Result<LaunchConfig, BridgeError> {
    load_with_env(robot, devices, |var| std::env::var(var).ok())
}

/// [`load`], reading the `SIMLINK_*` variables through `env`.
pub fn load_with_env(
    robot: Option<PathBuf>,
    devices: Option<PathBuf>,
    env: impl Fn(&str) -> Option<String>,
) -> Result<LaunchConfig, BridgeError> {
    let robot_path = robot
        .or_else(|| env_path(&env, ROBOT_ENV))
        .ok_or_else(|| {
            BridgeError::Config(format!(
                "no robot description given (use --robot or {ROBOT_ENV})"
            ))
        })?;
    let devices_path = devices.or_else(|| env_path(&env, DEVICES_ENV));

    let mut robot = load_robot(&robot_path)?;
    apply_env_overrides(&mut robot, &env);
    let devices = match devices_path {
        Some(path) => load_devices(&path)?,
        None => DeviceManagerConfig::default(),
    };
    Ok(LaunchConfig { robot, devices })
}

/// Parse a TOML robot description.
pub fn load_robot(path: &Path) -> Result<RobotDescription, BridgeError> {
    let raw = read(path)?;
    toml::from_str(&raw)
        .map_err(|e| BridgeError::Config(format!("invalid robot description {}: {e}", path.display())))
}

/// Parse a device configuration file, TOML or legacy JSON by extension.
pub fn load_devices(path: &Path) -> Result<DeviceManagerConfig, BridgeError> {
    let raw = read(path)?;
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    if is_json {
        let mut map: Map<String, Value> = serde_json::from_str(&raw).map_err(|e| {
            BridgeError::Config(format!("invalid device map {}: {e}", path.display()))
        })?;
        DeviceManagerConfig::from_legacy_map(&mut map)
    } else {
        toml::from_str(&raw).map_err(|e| {
            BridgeError::Config(format!("invalid device configuration {}: {e}", path.display()))
        })
    }
}

/// Apply `SIMLINK_TIME_STEP` (milliseconds), as looked up by `env`, to
/// `robot`.  Values that are not positive numbers are ignored.
pub fn apply_env_overrides(robot: &mut RobotDescription, env: impl Fn(&str) -> Option<String>) {
    if let Some(v) = env(TIME_STEP_ENV)
        && let Ok(step) = v.trim().parse::<f64>()
        && step > 0.0
    {
        robot.basic_time_step = step;
    }
}

fn env_path(env: impl Fn(&str) -> Option<String>, var: &str) -> Option<PathBuf> {
    env(var).filter(|v| !v.is_empty()).map(PathBuf::from)
}

fn read(path: &Path) -> Result<String, BridgeError> {
    fs::read_to_string(path)
        .map_err(|e| BridgeError::Config(format!("failed to read {}: {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env_of(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> + use<> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var: &str| vars.get(var).cloned()
    }

    fn write_file(dir: &tempfile::TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = fs::File::create(&path).expect("create");
        file.write_all(contents.as_bytes()).expect("write");
        path
    }

    const ROBOT: &str = r#"
        name = "e-puck"
        basic_time_step = 16

        [[devices]]
        name = "cam0"
        kind = "camera"

        [[devices]]
        name = "acc0"
        kind = "accelerometer"
    "#;

    #[test]
    fn loads_robot_description() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = write_file(&dir, "robot.toml", ROBOT);
        let robot = load_robot(&path).expect("robot");
        assert_eq!(robot.name, "e-puck");
        assert_eq!(robot.basic_time_step, 16.0);
        assert_eq!(robot.devices.len(), 2);
    }

    #[test]
    fn loads_typed_device_config() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = write_file(
            &dir,
            "devices.toml",
            r#"
                auto = true
                [robot]
                topic_name = "/sim_clock"
                [devices.cam0]
                topic_name = "/front"
            "#,
        );
        let config = load_devices(&path).expect("devices");
        assert!(config.auto);
        assert_eq!(
            config.robot.and_then(|r| r.topic_name).as_deref(),
            Some("/sim_clock")
        );
        assert!(config.devices.contains_key("cam0"));
    }

    #[test]
    fn reserved_keys_in_typed_devices_are_config_errors() {
        let dir = tempfile::tempdir().expect("tmp dir");
        for key in ["@robot", "@auto"] {
            let path = write_file(
                &dir,
                "devices.toml",
                &format!("[devices.\"{key}\"]\ntopic_name = \"/sim_clock\"\n"),
            );
            match load_devices(&path) {
                Err(BridgeError::Config(msg)) => assert!(msg.contains(key), "{msg}"),
                other => panic!("expected a config error for {key}, got {other:?}"),
            }
        }
    }

    #[test]
    fn loads_legacy_json_map() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = write_file(
            &dir,
            "devices.json",
            r#"{ "@auto": false, "acc0|imu0": { "topic": "/body" } }"#,
        );
        let config = load_devices(&path).expect("devices");
        assert!(!config.auto);
        assert_eq!(
            config.resolve("acc0|imu0").and_then(|o| o.topic_name.as_deref()),
            Some("/body")
        );
    }

    #[test]
    fn malformed_files_are_config_errors() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let robot = write_file(&dir, "robot.toml", "name = ");
        assert!(matches!(load_robot(&robot), Err(BridgeError::Config(_))));

        let devices = write_file(&dir, "devices.json", r#"{ "@auto": "maybe" }"#);
        assert!(matches!(load_devices(&devices), Err(BridgeError::Config(_))));

        let missing = dir.path().join("absent.toml");
        assert!(matches!(load_robot(&missing), Err(BridgeError::Config(_))));
    }

    #[test]
    fn load_without_device_file_uses_defaults() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = write_file(&dir, "robot.toml", ROBOT);
        let launch = load_with_env(Some(path), None, env_of(&[])).expect("launch");
        assert_eq!(launch.devices, DeviceManagerConfig::default());
        assert_eq!(launch.robot.devices[0].name, "cam0");
        assert_eq!(launch.robot.basic_time_step, 16.0);
    }

    #[test]
    fn missing_robot_description_is_a_config_error() {
        assert!(matches!(
            load_with_env(None, None, env_of(&[])),
            Err(BridgeError::Config(_))
        ));
    }

    #[test]
    fn environment_supplies_missing_paths() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let robot = write_file(&dir, "robot.toml", ROBOT);
        let devices = write_file(&dir, "devices.json", r#"{ "@auto": false }"#);
        let env = env_of(&[
            (ROBOT_ENV, robot.to_str().expect("utf-8 path")),
            (DEVICES_ENV, devices.to_str().expect("utf-8 path")),
            (TIME_STEP_ENV, "8"),
        ]);

        let launch = load_with_env(None, None, env).expect("launch");
        assert!(!launch.devices.auto);
        assert_eq!(launch.robot.basic_time_step, 8.0);
    }

    #[test]
    fn command_line_paths_win_over_environment() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let robot = write_file(&dir, "robot.toml", ROBOT);
        let env = env_of(&[
            (ROBOT_ENV, "/nonexistent/robot.toml"),
            (DEVICES_ENV, "/nonexistent/devices.toml"),
        ]);

        let devices = write_file(&dir, "devices.toml", "auto = false");
        let launch = load_with_env(Some(robot), Some(devices), &env).expect("launch");
        assert_eq!(launch.robot.name, "e-puck");
        assert!(!launch.devices.auto);
    }

    #[test]
    fn time_step_override() {
        let mut robot: RobotDescription = toml::from_str(ROBOT).unwrap();

        apply_env_overrides(&mut robot, env_of(&[(TIME_STEP_ENV, "8")]));
        assert_eq!(robot.basic_time_step, 8.0);

        apply_env_overrides(&mut robot, env_of(&[(TIME_STEP_ENV, "-4")]));
        assert_eq!(robot.basic_time_step, 8.0);

        apply_env_overrides(&mut robot, env_of(&[(TIME_STEP_ENV, "fast")]));
        assert_eq!(robot.basic_time_step, 8.0);
    }
}
