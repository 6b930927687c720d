use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use traybot_runtime::autonomous::{self, AutoRoutine};
use traybot_runtime::config::MOTOR_PORT;
use traybot_runtime::runtime::{PhaseGate, SchedulerMode, Updater};
use traybot_runtime::subsystems::Robot;
use traybot_runtime::teleop;

#[derive(Parser)]
#[command(name = "traybot-runtime", about = "Runtime for the tray-stacker robot")]
struct Cli {
    /// Serial port for the motor bus
    #[arg(long)]
    port: Option<String>,

    /// Run against simulated actuators instead of hardware
    #[arg(long)]
    sim: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Drive the robot from the keyboard
    Teleop,
    /// Run an autonomous routine once
    Auto {
        #[arg(value_enum)]
        routine: Option<AutoRoutine>,
    },
}

#[tokio::main]
async fn main() {
    // Setup logging (set RUST_LOG=info or debug)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse().unwrap()))
        .init();

    if let Err(e) = run(Cli::parse()).await {
        eprintln!("Runtime error: {}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let robot = if cli.sim {
        Robot::simulated()
    } else {
        Robot::connect(cli.port.as_deref().unwrap_or(MOTOR_PORT))?
    };

    match cli.command {
        Command::Teleop => {
            // Manual control paces the updater through the phase gate
            let gate = PhaseGate::new();
            let updater = tokio::spawn(
                Updater::new(robot.clone(), SchedulerMode::Gated, gate.clone()).run(),
            );
            let result = teleop::run(robot, gate).await;
            updater.abort();
            result?;
        }
        Command::Auto { routine } => {
            // Autonomous runs against a free-running updater
            let updater = tokio::spawn(
                Updater::new(robot.clone(), SchedulerMode::FreeRunning, PhaseGate::new()).run(),
            );
            autonomous::run(robot, routine.unwrap_or(AutoRoutine::Push)).await;
            updater.abort();
        }
    }

    Ok(())
}
