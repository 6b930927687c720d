// Tray deposit macro: ramp the tray out under closed-loop control while
// pressing the lift down, then hold the tray against the placed stack.
// Owns the drive group and the lift for the whole maneuver.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::time::sleep;
use tracing::info;

use super::Routine;
use crate::config::{
    DEPOSIT_HOLD_BIAS_MV, DEPOSIT_KD, DEPOSIT_KP, DEPOSIT_LIFT_BIAS_MV, TICK,
    TILTER_EXTEND_THRESHOLD, TILTER_MAX_EXTENDED, VOLTAGE_MAX,
};
use crate::control::PosPd;
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
            // Busy subsystems mean some other owner is mid-maneuver; skip
            // this tick and try again.
            if let Ok(mut drive) = robot.drive.try_lock() {
                if let Ok(mut lift) = robot.lift.try_lock() {
                    info!("Deposit engaged");
                    // Target past the exit threshold so the ramp still has
                    // authority when the tray crosses it
                    let mut pd = PosPd::new(DEPOSIT_KP, DEPOSIT_KD);
                    pd.set_target(TILTER_MAX_EXTENDED);

                    while enabled.load(Ordering::Relaxed) {
                        // Holding the tokens makes both phases ours
                        drive.update_poses(TICK);
                        lift.update_pose(TICK);

                        let tilt = drive.tilter().angle();
                        if tilt >= TILTER_EXTEND_THRESHOLD {
                            enabled.store(false, Ordering::Relaxed);
                            break;
                        }

                        lift.move_voltage(DEPOSIT_LIFT_BIAS_MV);
                        let output = pd.step(tilt, TICK);
                        drive.tilter_move_voltage((output * VOLTAGE_MAX as f64) as i32);
                        drive.update_controllers(lift.angle(), TICK);

                        sleep(TICK).await;
                    }

                    // Pin the tray against whatever it just placed
                    drive.tilter_hold(DEPOSIT_HOLD_BIAS_MV);
                    drive.update_controllers(lift.angle(), TICK);
                    info!("Deposit released");
                }
            }
        }
        sleep(TICK).await;
    }
}
