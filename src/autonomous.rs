// Autonomous routine scripts
//
// Scripts post requests and let the free-running updater actuate them.
// Requests go in under the same try-acquire discipline as everything
// else; the updater only holds a token for a moment, so a short retry
// loop stands in for blocking.

use clap::ValueEnum;
use tokio::time::sleep;
use tracing::info;

use crate::config::TICK;
use crate::routines;
use crate::subsystems::{Drive, Robot};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum AutoRoutine {
    /// Shove a cube into the goal zone and back out
    Push,
    /// Place the preloaded stack, then pull away and stow the tray
    Deposit,
}

/// Autonomous entry, invoked once by the host
pub async fn run(robot: Robot, routine: AutoRoutine) {
    info!("Autonomous: {:?}", routine);
    match routine {
        AutoRoutine::Push => push(&robot).await,
        AutoRoutine::Deposit => deposit(&robot).await,
    }
    info!("Autonomous finished");
}

async fn push(robot: &Robot) {
    with_drive(robot, |d| d.drive_voltage(8_000, 8_000)).await;
    sleep(Duration::from_millis(750)).await;
    with_drive(robot, |d| d.drive_voltage(0, 0)).await;
    sleep(Duration::from_millis(500)).await;

    with_intake(robot, -12_000).await;
    sleep(Duration::from_millis(500)).await;

    with_drive(robot, |d| d.drive_voltage(-8_000, -8_000)).await;
    sleep(Duration::from_millis(750)).await;
    with_drive(robot, |d| d.drive_voltage(0, 0)).await;

    with_intake(robot, 0).await;
}

async fn deposit(robot: &Robot) {
    // The deposit routine owns its subsystems and disables itself once the
    // tray crosses the deposit angle
    let routine = routines::deposit::spawn(robot.clone());
    routine.enable();
    while routine.is_enabled() {
        sleep(TICK).await;
    }
    routine.abort();

    // Slide the tray free of the stack, then stow it
    with_drive(robot, |d| d.drive_voltage(-8_000, -8_000)).await;
    sleep(Duration::from_millis(500)).await;
    with_drive(robot, |d| d.drive_voltage(0, 0)).await;
    sleep(Duration::from_millis(500)).await;
    with_drive(robot, Drive::tilter_retract).await;
}

/// Apply `f` to the drive group, retrying each tick until the token frees
async fn with_drive(robot: &Robot, f: impl FnOnce(&mut Drive)) {
    let mut f = Some(f);
    loop {
        if let Ok(mut drive) = robot.drive.try_lock() {
            if let Some(f) = f.take() {
                f(&mut drive);
            }
            return;
        }
        sleep(TICK).await;
    }
}

async fn with_intake(robot: &Robot, mv: i32) {
    loop {
        if let Ok(mut intake) = robot.intake.try_lock() {
            intake.move_voltage(mv);
            return;
        }
        sleep(TICK).await;
    }
}
