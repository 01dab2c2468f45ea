//! `simlink` – runs the device bridge against a simulated robot.
//!
//! 1. Loads the robot description and the device configuration
//!    (`--robot` / `--devices`, or `SIMLINK_ROBOT` / `SIMLINK_DEVICES`).
//! 2. Discovers the robot's devices and arms the synchronization timer.
//! 3. Advances the simulated clock once per basic time step until Ctrl-C.
//!
//! ```bash
//! simlink --robot robot.toml --devices devices.toml
//! simlink --robot robot.toml --list
//! simlink --robot robot.toml --echo /imu --echo /clock
//! ```

mod config;

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use colored::Colorize;
use simlink_hal::sim::{SimRobotBuilder, SimulatedRobot};
use simlink_hal::{DeviceManager, SimRobot, sync_period};
use simlink_middleware::{HostNode, MessageBus};
use simlink_runtime::{TokioNode, init_tracing};
use simlink_types::BridgeError;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

/// Simulated robot device bridge
#[derive(Parser, Debug)]
#[command(name = "simlink")]
#[command(version)]
#[command(about = "Expose a simulated robot's devices as message-bus topics")]
struct Args {
    /// Robot description (TOML).  Defaults to $SIMLINK_ROBOT.
    #[arg(short, long, value_name = "FILE")]
    robot: Option<PathBuf>,

    /// Device configuration: typed TOML, or a legacy JSON map.  Defaults to
    /// $SIMLINK_DEVICES.
    #[arg(short, long, value_name = "FILE")]
    devices: Option<PathBuf>,

    /// Override the basic time step, in milliseconds.
    #[arg(short = 't', long, value_name = "MS")]
    time_step: Option<f64>,

    /// Print the discovered devices and exit.
    #[arg(long)]
    list: bool,

    /// Print the effective device configuration as a legacy JSON map and exit.
    #[arg(long)]
    dump_config: bool,

    /// Print every event published on TOPIC (repeatable).
    #[arg(long = "echo", value_name = "TOPIC", action = clap::ArgAction::Append)]
    echo: Vec<String>,
}

fn main() {
    let guard = init_tracing("simlink");
    let args = Args::parse();

    let code = match run(args) {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("{} {e}", "error:".red().bold());
            1
        }
    };
    drop(guard);
    std::process::exit(code);
}

fn run(args: Args) -> Result<(), BridgeError> {
    let mut launch = config::load(args.robot, args.devices)?;
    if let Some(step) = args.time_step {
        if step <= 0.0 {
            return Err(BridgeError::Config(format!(
                "time step must be positive, got {step}"
            )));
        }
        launch.robot.basic_time_step = step;
    }

    if args.dump_config {
        let map = launch.devices.to_legacy_map()?;
        let json = serde_json::to_string_pretty(&map)
            .map_err(|e| BridgeError::Config(format!("cannot render configuration: {e}")))?;
        println!("{json}");
        return Ok(());
    }

    print_banner();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| BridgeError::Simulator(format!("failed to start runtime: {e}")))?;

    let robot = SimRobotBuilder::from_description(&launch.robot).build();
    let node = TokioNode::new("simlink_driver", MessageBus::default(), runtime.handle().clone());
    let manager = DeviceManager::new(&node, robot.clone(), &launch.devices);

    print_devices(&robot, &manager);
    if args.list {
        return Ok(());
    }
    if !manager.is_enabled() {
        println!("  {}", "Device discovery is disabled (auto = false).".yellow());
        return Ok(());
    }

    for topic in &args.echo {
        spawn_echo(&runtime, node.bus(), topic);
    }

    let shutdown = Arc::new(AtomicBool::new(false));
    let flag = shutdown.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        println!();
        println!("{}", "⚠  Ctrl-C received – stopping …".yellow().bold());
        flag.store(true, Ordering::SeqCst);
    }) {
        warn!(error = %e, "failed to install Ctrl-C handler");
    }

    println!("  Running.  Press {} to stop.\n", "Ctrl-C".bold());
    runtime.block_on(drive(robot.clone(), shutdown));

    node.shutdown();
    info!(sim_time = robot.time(), "bridge stopped");
    println!(
        "{}",
        format!("  ✓ Stopped at t = {:.3} s", robot.time()).green()
    );
    Ok(())
}

/// Advance the simulated clock once per basic time step until `shutdown`.
async fn drive(robot: Arc<SimulatedRobot>, shutdown: Arc<AtomicBool>) {
    let mut interval = tokio::time::interval(sync_period(robot.basic_time_step()));
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    while !shutdown.load(Ordering::SeqCst) {
        interval.tick().await;
        robot.step();
    }
}

fn spawn_echo(runtime: &tokio::runtime::Runtime, bus: &MessageBus, topic: &str) {
    let mut rx = bus.subscribe(topic);
    runtime.spawn(async move {
        loop {
            let event = match rx.recv().await {
                Ok(event) => event,
                Err(RecvError::Lagged(n)) => {
                    warn!(topic = %rx.topic(), lagged_by = n, "echo lagged");
                    continue;
                }
                Err(RecvError::Closed) => break,
            };
            match serde_json::to_string(&event) {
                Ok(line) => println!("{} {line}", rx.topic().dimmed()),
                Err(e) => warn!(topic = %rx.topic(), error = %e, "cannot render event"),
            }
        }
    });
}

// ─────────────────────────────────────────────────────────────────────────────
// Output
// ─────────────────────────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    println!("{}", r#"     _           _ _       _    "#.bold().cyan());
    println!("{}", r#" ___(_)_ __ ___ | (_)_ __ | | __"#.bold().cyan());
    println!("{}", r#"/ __| | '_ ` _ \| | | '_ \| |/ /"#.bold().cyan());
    println!("{}", r#"\__ \ | | | | | | | | | | |   < "#.bold().cyan());
    println!("{}", r#"|___/_|_| |_| |_|_|_|_| |_|_|\_\"#.bold().cyan());
    println!();
    println!(
        "  {} {}",
        "simlink".bold(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
    println!("  Simulated robot device bridge");
    println!();
}

fn print_devices(robot: &SimulatedRobot, manager: &DeviceManager) {
    println!(
        "  Robot {} ({} device(s), {} ms step)",
        robot.name().bold(),
        robot.device_count(),
        robot.basic_time_step()
    );
    for (key, topic) in manager.topics() {
        println!("    • {:<32} {}", key.bold(), topic.cyan());
    }
    for key in manager.unconsumed_keys() {
        println!(
            "    {} {} matched no device",
            "!".yellow().bold(),
            key.yellow()
        );
    }
    println!();
}
