// Lift subsystem: two mirrored motors raising the intake tower.
//
// The lift is the transmission's safety dependency: its angle gates when
// the tray may move passively. Left and right sides are driven with a
// levelling trim so a lagging side catches up instead of racking the
// tower.

use std::time::Duration;

use crate::config::{LIFT_RATIO, LIFT_SYNC_GAIN};
use crate::control::{DerivativeFilter, PoseStore};
use crate::motor::{Actuator, BrakeMode};
use crate::subsystems::Subsystem;

pub struct Lift {
    motor_left: Box<dyn Actuator>,
    motor_right: Box<dyn Actuator>,
    pose_left: PoseStore<f64>,
    pose_right: PoseStore<f64>,
    filter_left: DerivativeFilter,
    filter_right: DerivativeFilter,
}

impl Lift {
    pub fn new(motor_left: Box<dyn Actuator>, motor_right: Box<dyn Actuator>) -> Self {
        Self {
            motor_left,
            motor_right,
            pose_left: PoseStore::new(0.0),
            pose_right: PoseStore::new(0.0),
            filter_left: DerivativeFilter::new(),
            filter_right: DerivativeFilter::new(),
        }
    }

    /// Drive both sides at `mv`, trimming each toward the other.
    /// The trim reads the absolute tracks so taring cannot hide a real
    /// mechanical skew.
    pub fn move_voltage(&mut self, mv: i32) {
        let skew_deg = self.pose_right.absolute() - self.pose_left.absolute();
        let trim = (skew_deg * LIFT_SYNC_GAIN) as i32;

        self.motor_left.set_brake_mode(BrakeMode::Coast);
        self.motor_right.set_brake_mode(BrakeMode::Coast);
        self.motor_left.set_voltage(mv + trim);
        self.motor_right.set_voltage(mv - trim);
    }

    /// Brake-hold both sides at zero velocity
    pub fn lock(&mut self) {
        self.motor_left.set_brake_mode(BrakeMode::Hold);
        self.motor_right.set_brake_mode(BrakeMode::Hold);
        self.motor_left.set_voltage(0);
        self.motor_right.set_voltage(0);
    }

    /// Left, right, and averaged angles in degrees
    pub fn angles(&self) -> (f64, f64, f64) {
        let left = self.pose_left.get();
        let right = self.pose_right.get();
        (left, right, (left + right) * 0.5)
    }

    /// Averaged lift angle, the value the transmission interlock reads
    pub fn angle(&self) -> f64 {
        self.angles().2
    }

    /// Left, right, and averaged angular velocities
    pub fn velocities(&self) -> (f64, f64, f64) {
        let left = self.filter_left.velocity();
        let right = self.filter_right.velocity();
        (left, right, (left + right) * 0.5)
    }

    /// Left, right, and averaged angular accelerations
    pub fn accelerations(&self) -> (f64, f64, f64) {
        let left = self.filter_left.acceleration();
        let right = self.filter_right.acceleration();
        (left, right, (left + right) * 0.5)
    }
}

impl Subsystem for Lift {
    type Pose = f64;
    type Deriv = f64;

    fn move_voltage(&mut self, mv: i32) {
        Lift::move_voltage(self, mv);
    }

    fn pose(&self) -> f64 {
        self.angle()
    }

    fn deriv(&self) -> f64 {
        self.velocities().2
    }

    /// Both sides tare to the same target
    fn tare(&mut self, angle_deg: f64) {
        self.pose_left.tare(angle_deg);
        self.pose_right.tare(angle_deg);
    }

    fn update_pose(&mut self, dt: Duration) {
        let left = self.motor_left.position() / LIFT_RATIO;
        let right = self.motor_right.position() / LIFT_RATIO;
        self.pose_left.update(left);
        self.pose_right.update(right);
        self.filter_left.sample(left, dt);
        self.filter_right.sample(right, dt);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TICK;
    use crate::motor::RecordingActuator;

    fn recording_lift() -> (
        Lift,
        std::sync::Arc<parking_lot::Mutex<crate::motor::ActuatorRecord>>,
        std::sync::Arc<parking_lot::Mutex<crate::motor::ActuatorRecord>>,
    ) {
        let (left, left_rec) = RecordingActuator::new();
        let (right, right_rec) = RecordingActuator::new();
        (
            Lift::new(Box::new(left), Box::new(right)),
            left_rec,
            right_rec,
        )
    }

    #[test]
    fn test_level_lift_gets_symmetric_voltage() {
        let (mut lift, left, right) = recording_lift();
        lift.move_voltage(8_000);
        assert_eq!(left.lock().voltage_mv, 8_000);
        assert_eq!(right.lock().voltage_mv, 8_000);
        assert_eq!(left.lock().brake, BrakeMode::Coast);
    }

    #[test]
    fn test_skewed_lift_gets_opposing_trim() {
        let (mut lift, left, right) = recording_lift();
        // Right side 10 deg (at the output shaft) ahead of the left
        left.lock().position_deg = 0.0;
        right.lock().position_deg = 10.0 * LIFT_RATIO;
        lift.update_pose(TICK);

        lift.move_voltage(8_000);
        let trim = (10.0 * LIFT_SYNC_GAIN) as i32;
        assert_eq!(left.lock().voltage_mv, 8_000 + trim);
        assert_eq!(right.lock().voltage_mv, 8_000 - trim);
    }

    #[test]
    fn test_trim_survives_taring() {
        let (mut lift, left, right) = recording_lift();
        left.lock().position_deg = 0.0;
        right.lock().position_deg = 10.0 * LIFT_RATIO;
        lift.update_pose(TICK);
        // A tare levels the visible angles but not the physical skew
        lift.tare(0.0);
        assert_eq!(lift.angle(), 0.0);

        lift.move_voltage(8_000);
        let trim = (10.0 * LIFT_SYNC_GAIN) as i32;
        assert_eq!(left.lock().voltage_mv, 8_000 + trim);
    }

    #[test]
    fn test_lock_brake_holds_at_zero() {
        let (mut lift, left, right) = recording_lift();
        lift.lock();
        assert_eq!(left.lock().brake, BrakeMode::Hold);
        assert_eq!(right.lock().brake, BrakeMode::Hold);
        assert_eq!(left.lock().voltage_mv, 0);
        assert_eq!(right.lock().voltage_mv, 0);
    }

    #[test]
    fn test_angle_is_side_average() {
        let (mut lift, left, right) = recording_lift();
        left.lock().position_deg = 20.0 * LIFT_RATIO;
        right.lock().position_deg = 30.0 * LIFT_RATIO;
        lift.update_pose(TICK);
        let (l, r, avg) = lift.angles();
        assert_eq!(l, 20.0);
        assert_eq!(r, 30.0);
        assert_eq!(avg, 25.0);
    }
}
