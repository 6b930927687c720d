// The drive group: transmission, chassis, and tilter as one lock unit.
//
// The tilt estimate is computed from the transmission's own encoders, so
// the three always sample and actuate together under a single ownership
// token; splitting them would let a tilt decision run against a stale
// encoder snapshot.

use std::time::Duration;

use crate::config::VOLTAGE_MAX;
use crate::messages::{DriveCommand, TiltRequest};
use crate::subsystems::chassis::{Chassis, ChassisDeriv, ChassisPose};
use crate::subsystems::tilter::Tilter;
use crate::subsystems::Subsystem;
use crate::transmission::{Transmission, TransmissionState};

pub struct Drive {
    transmission: Transmission,
    chassis: Chassis,
    tilter: Tilter,
}

impl Drive {
    pub fn new(transmission: Transmission) -> Self {
        Self {
            transmission,
            chassis: Chassis::new(),
            tilter: Tilter::new(),
        }
    }

    /// Sampling phase: one encoder snapshot feeds both joint estimators
    pub fn update_poses(&mut self, dt: Duration) {
        let encoders = self.transmission.encoder_degrees();
        self.chassis.update_pose(&encoders, dt);
        self.tilter.update_pose(&encoders, dt);
    }

    /// Control phase: arbitrate and actuate on the freshest poses.
    /// `lift_deg` is the dependent lift angle the interlock gates on.
    pub fn update_controllers(&mut self, lift_deg: f64, dt: Duration) {
        let tilt_deg = self.tilter.angle();
        self.transmission.update(tilt_deg, lift_deg, dt);
    }

    // === chassis ===

    /// Request chassis voltages; actual voltages depend on the
    /// transmission behavior
    pub fn drive_voltage(&mut self, left_mv: i32, right_mv: i32) {
        self.transmission
            .request_drive(DriveCommand::new(left_mv, right_mv));
    }

    pub fn chassis(&self) -> &Chassis {
        &self.chassis
    }

    pub fn tare_chassis(&mut self, pose: ChassisPose) {
        self.chassis.tare(pose);
    }

    // === tilter ===

    pub fn tilter(&self) -> &Tilter {
        &self.tilter
    }

    /// Run the tray out; passive in the sense that the transition guards
    /// decide when it actually happens and when it stops
    pub fn tilter_extend(&mut self) {
        self.transmission.request_tilt(TiltRequest::Extend);
    }

    /// Run the tray back in
    pub fn tilter_retract(&mut self) {
        self.transmission.request_tilt(TiltRequest::Retract);
    }

    /// Drive the tray directly, braking the chassis for the duration
    pub fn tilter_move_voltage(&mut self, mv: i32) {
        self.transmission
            .request_tilt(TiltRequest::DirectVoltage(mv));
    }

    /// Pin the tray at its current angle, pressing with `bias_mv`
    pub fn tilter_hold(&mut self, bias_mv: i32) {
        self.transmission.request_tilt(TiltRequest::Hold { bias_mv });
    }

    pub fn tare_tilter(&mut self, angle_deg: f64) {
        self.tilter.tare(angle_deg);
    }

    pub fn state(&self) -> TransmissionState {
        self.transmission.state()
    }

    /// The pending chassis request, for telemetry
    pub fn drive_request(&self) -> DriveCommand {
        self.transmission.drive_request()
    }
}

impl Subsystem for Drive {
    type Pose = ChassisPose;
    type Deriv = ChassisDeriv;

    fn move_voltage(&mut self, mv: i32) {
        let mv = mv.clamp(-VOLTAGE_MAX, VOLTAGE_MAX);
        self.drive_voltage(mv, mv);
    }

    fn pose(&self) -> ChassisPose {
        self.chassis.pose()
    }

    fn deriv(&self) -> ChassisDeriv {
        self.chassis.deriv()
    }

    fn tare(&mut self, pose: ChassisPose) {
        self.chassis.tare(pose);
    }

    fn update_pose(&mut self, dt: Duration) {
        self.update_poses(dt);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{
        LIFT_MAX_LOCK, SIM_FREE_SPEED_DPS, TICK, TILTER_RATIO, TILTER_RETRACT_THRESHOLD,
    };
    use crate::motor::SimActuator;

    /// Simulated drive group with the tray pre-tilted to `tilt_deg`
    fn sim_drive(tilt_deg: f64) -> Drive {
        let lead = tilt_deg * TILTER_RATIO;
        let transmission = Transmission::new(
            Box::new(SimActuator::new()),
            Box::new(SimActuator::new()),
            Box::new(SimActuator::with_position(lead)),
            Box::new(SimActuator::with_position(-lead)),
        );
        Drive::new(transmission)
    }

    #[test]
    fn test_pose_phase_recovers_preset_tilt() {
        let mut drive = sim_drive(40.0);
        drive.update_poses(TICK);
        assert!((drive.tilter().angle() - 40.0).abs() < 1e-9);
    }

    #[test]
    fn test_retract_runs_to_holding_at_stow_threshold() {
        let mut drive = sim_drive(40.0);
        let lift_deg = LIFT_MAX_LOCK + 10.0;

        drive.update_poses(TICK);
        // First tick with the lift raised lands in the interlock hold;
        // retract is requested from there
        drive.update_controllers(lift_deg, TICK);
        drive.tilter_retract();

        // Tray moves (2 * free_speed / 2 / ratio) deg per tick while
        // retracting; generously bound the tick count
        let per_tick = SIM_FREE_SPEED_DPS * TICK.as_secs_f64() / TILTER_RATIO;
        let max_ticks = (40.0 / per_tick) as usize + 10;

        let mut reached = false;
        for _ in 0..max_ticks {
            drive.update_controllers(lift_deg, TICK);
            drive.update_poses(TICK);
            if drive.state() == (TransmissionState::Holding { target_deg: 0.0 }) {
                reached = true;
                break;
            }
        }

        assert!(reached, "retract never completed");
        // One tick of overshoot at most past the stow threshold
        assert!(drive.tilter().angle() <= TILTER_RETRACT_THRESHOLD);
        assert!(drive.tilter().angle() >= TILTER_RETRACT_THRESHOLD - 2.0 * per_tick);
    }

    #[test]
    fn test_chassis_and_tray_requests_coexist_passively() {
        let mut drive = sim_drive(0.0);
        drive.drive_voltage(6_000, 6_000);
        drive.update_poses(TICK);
        drive.update_controllers(0.0, TICK);
        assert_eq!(drive.state(), TransmissionState::Passive);

        // Common-mode motion: wheels travel, tray stays put
        drive.update_poses(TICK);
        assert!(drive.chassis().pose().dist_left_m > 0.0);
        assert!(drive.tilter().angle().abs() < 1e-9);
    }
}
