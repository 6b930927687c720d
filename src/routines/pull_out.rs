// Pull-out maneuver: back the chassis away from a placed stack while the
// tray presses forward and the intake feeds out, so the stack stays put as
// the tray slides free. Owns the drive group and the intake; runs until
// disabled.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::time::sleep;
use tracing::info;

use super::Routine;
use crate::config::{PULL_OUT_DRIVE_MV, PULL_OUT_HOLD_BIAS_MV, PULL_OUT_INTAKE_MV, TICK};
use crate::subsystems::{Robot, Subsystem};

pub fn spawn(robot: Robot) -> Routine {
    let enabled = Arc::new(AtomicBool::new(false));
    let flag = enabled.clone();
    let handle = tokio::spawn(async move {
        task(robot, flag).await;
    });
    Routine::new(enabled, handle)
}

async fn task(robot: Robot, enabled: Arc<AtomicBool>) {
    loop {
        if enabled.load(Ordering::Relaxed) {
            if let Ok(mut drive) = robot.drive.try_lock() {
                if let Ok(mut intake) = robot.intake.try_lock() {
                    info!("Pull-out engaged");
                    drive.tilter_hold(PULL_OUT_HOLD_BIAS_MV);
                    intake.move_voltage(PULL_OUT_INTAKE_MV);
                    drive.drive_voltage(PULL_OUT_DRIVE_MV, PULL_OUT_DRIVE_MV);

                    // The lift is not ours; peek at its angle when free and
                    // carry the last reading otherwise.
                    let mut lift_deg = 0.0;

                    while enabled.load(Ordering::Relaxed) {
                        drive.update_poses(TICK);
                        intake.update_pose(TICK);
                        if let Ok(lift) = robot.lift.try_lock() {
                            lift_deg = lift.angle();
                        }
                        drive.update_controllers(lift_deg, TICK);
                        sleep(TICK).await;
                    }

                    drive.tilter_hold(0);
                    drive.drive_voltage(0, 0);
                    intake.lock();
                    drive.update_controllers(lift_deg, TICK);
                    info!("Pull-out released");
                }
            }
        }
        sleep(TICK).await;
    }
}
