// Cooperative subsystem updater
//
// Each cycle runs two phases in order: phase A samples every pose, phase B
// runs the controllers and actuates. Within a cycle a subsystem's pose is
// always refreshed before any decision reads it. A subsystem whose
// ownership token is held elsewhere is skipped for the tick; the holder
// has taken over both phases for itself.

use std::sync::Arc;

use tokio::sync::Notify;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

use crate::config::{TELEMETRY_EVERY, TICK};
use crate::messages::TelemetrySnapshot;
use crate::subsystems::{Robot, Subsystem};

/// How update cycles are driven
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerMode {
    /// Self-timed at the nominal tick period (autonomous)
    FreeRunning,
    /// Each phase waits for an external signal (manual control, where the
    /// driver-input loop paces the cycle)
    Gated,
}

/// Phase signals for the gated scheduler mode
#[derive(Default)]
pub struct PhaseGate {
    poses: Notify,
    controllers: Notify,
}

impl PhaseGate {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Release phase A (pose sampling) for this cycle
    pub fn signal_poses(&self) {
        self.poses.notify_one();
    }

    /// Release phase B (controllers/actuation) for this cycle
    pub fn signal_controllers(&self) {
        self.controllers.notify_one();
    }
}

pub struct Updater {
    robot: Robot,
    mode: SchedulerMode,
    gate: Arc<PhaseGate>,
    // Interlock input for the arbiter when the lift token is held
    // elsewhere; the holder is updating the lift pose itself.
    last_lift_deg: f64,
    ticks: u32,
}

impl Updater {
    pub fn new(robot: Robot, mode: SchedulerMode, gate: Arc<PhaseGate>) -> Self {
        Self {
            robot,
            mode,
            gate,
            last_lift_deg: 0.0,
            ticks: 0,
        }
    }

    /// Run cycles until the task is dropped
    pub async fn run(mut self) {
        let mut tick = interval(TICK);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            "Updater started: {:?}, {} ms tick",
            self.mode,
            TICK.as_millis()
        );

        loop {
            match self.mode {
                SchedulerMode::FreeRunning => {
                    tick.tick().await;
                }
                SchedulerMode::Gated => self.gate.poses.notified().await,
            }

            self.pose_phase();

            if self.mode == SchedulerMode::Gated {
                self.gate.controllers.notified().await;
            }

            self.control_phase();
            self.publish_telemetry();
        }
    }

    /// Phase A: sample poses on every subsystem whose token is free
    pub fn pose_phase(&mut self) {
        if let Ok(mut drive) = self.robot.drive.try_lock() {
            drive.update_poses(TICK);
        }
        if let Ok(mut lift) = self.robot.lift.try_lock() {
            lift.update_pose(TICK);
            self.last_lift_deg = lift.angle();
        }
        if let Ok(mut intake) = self.robot.intake.try_lock() {
            intake.update_pose(TICK);
        }
    }

    /// Phase B: arbitrate and actuate on the poses from phase A
    pub fn control_phase(&mut self) {
        if let Ok(mut drive) = self.robot.drive.try_lock() {
            drive.update_controllers(self.last_lift_deg, TICK);
        }
    }

    fn publish_telemetry(&mut self) {
        self.ticks = self.ticks.wrapping_add(1);
        if self.ticks % TELEMETRY_EVERY != 0 {
            return;
        }
        let Ok(drive) = self.robot.drive.try_lock() else {
            return;
        };
        let snapshot = TelemetrySnapshot {
            state: drive.state().name(),
            tilt_deg: drive.tilter().angle(),
            lift_deg: self.last_lift_deg,
            drive: drive.drive_request(),
        };
        drop(drive);
        if let Ok(json) = serde_json::to_string(&snapshot) {
            debug!(target: "telemetry", "{}", json);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sim_updater() -> (Robot, Updater) {
        let robot = Robot::simulated();
        let updater = Updater::new(robot.clone(), SchedulerMode::FreeRunning, PhaseGate::new());
        (robot, updater)
    }

    #[test]
    fn test_phases_advance_a_driven_chassis() {
        let (robot, mut updater) = sim_updater();
        robot.drive.try_lock().unwrap().drive_voltage(6_000, 6_000);

        updater.pose_phase();
        updater.control_phase();
        updater.pose_phase();

        let drive = robot.drive.try_lock().unwrap();
        assert!(drive.chassis().pose().dist_left_m > 0.0);
    }

    #[test]
    fn test_held_token_skips_both_phases() {
        let (robot, mut updater) = sim_updater();
        robot.drive.try_lock().unwrap().drive_voltage(6_000, 6_000);
        updater.pose_phase();
        updater.control_phase();
        updater.pose_phase();

        let before = robot.drive.try_lock().unwrap().chassis().pose();

        {
            // A routine owns the drive group for this tick
            let _token = robot.drive.try_lock().unwrap();
            updater.pose_phase();
            updater.control_phase();
        }

        let after = robot.drive.try_lock().unwrap().chassis().pose();
        assert_eq!(before, after);

        // Token released: the next tick moves again
        updater.pose_phase();
        let resumed = robot.drive.try_lock().unwrap().chassis().pose();
        assert!(resumed.dist_left_m > after.dist_left_m);
    }

    #[test]
    fn test_lift_angle_is_cached_across_skipped_ticks() {
        let (robot, mut updater) = sim_updater();
        updater.pose_phase();
        let cached = updater.last_lift_deg;

        let _token = robot.lift.try_lock().unwrap();
        updater.pose_phase();
        assert_eq!(updater.last_lift_deg, cached);
    }
}
