// Intake rollers: one motor per side, driven together.

use std::time::Duration;

use crate::control::{DerivativeFilter, PoseStore};
use crate::motor::{Actuator, BrakeMode};
use crate::subsystems::Subsystem;

/// Per-side roller angles in degrees
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RollerAngles {
    pub left_deg: f64,
    pub right_deg: f64,
}

pub struct Intake {
    motor_left: Box<dyn Actuator>,
    motor_right: Box<dyn Actuator>,
    pose_left: PoseStore<f64>,
    pose_right: PoseStore<f64>,
    filter_left: DerivativeFilter,
    filter_right: DerivativeFilter,
}

impl Intake {
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

    /// Run both rollers at `mv`
    pub fn move_voltage(&mut self, mv: i32) {
        self.motor_left.set_brake_mode(BrakeMode::Coast);
        self.motor_right.set_brake_mode(BrakeMode::Coast);
        self.motor_left.set_voltage(mv);
        self.motor_right.set_voltage(mv);
    }

    /// Brake-hold both rollers, pinching whatever is in the tray
    pub fn lock(&mut self) {
        self.motor_left.set_brake_mode(BrakeMode::Hold);
        self.motor_right.set_brake_mode(BrakeMode::Hold);
        self.motor_left.set_voltage(0);
        self.motor_right.set_voltage(0);
    }

    /// Tare each roller independently
    pub fn tare_angles(&mut self, left_deg: f64, right_deg: f64) {
        self.pose_left.tare(left_deg);
        self.pose_right.tare(right_deg);
    }

    pub fn angles(&self) -> RollerAngles {
        RollerAngles {
            left_deg: self.pose_left.get(),
            right_deg: self.pose_right.get(),
        }
    }

    pub fn velocities(&self) -> (f64, f64) {
        (self.filter_left.velocity(), self.filter_right.velocity())
    }
}

impl Subsystem for Intake {
    type Pose = RollerAngles;
    type Deriv = (f64, f64);

    fn move_voltage(&mut self, mv: i32) {
        Intake::move_voltage(self, mv);
    }

    fn pose(&self) -> RollerAngles {
        self.angles()
    }

    fn deriv(&self) -> (f64, f64) {
        self.velocities()
    }

    fn tare(&mut self, pose: RollerAngles) {
        self.tare_angles(pose.left_deg, pose.right_deg);
    }

    fn update_pose(&mut self, dt: Duration) {
        let left = self.motor_left.position();
        let right = self.motor_right.position();
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

    #[test]
    fn test_rollers_share_the_command() {
        let (left, left_rec) = RecordingActuator::new();
        let (right, right_rec) = RecordingActuator::new();
        let mut intake = Intake::new(Box::new(left), Box::new(right));

        intake.move_voltage(-12_000);
        assert_eq!(left_rec.lock().voltage_mv, -12_000);
        assert_eq!(right_rec.lock().voltage_mv, -12_000);

        intake.lock();
        assert_eq!(left_rec.lock().brake, BrakeMode::Hold);
        assert_eq!(right_rec.lock().voltage_mv, 0);
    }

    #[test]
    fn test_independent_tares() {
        let (left, left_rec) = RecordingActuator::new();
        let (right, right_rec) = RecordingActuator::new();
        let mut intake = Intake::new(Box::new(left), Box::new(right));

        left_rec.lock().position_deg = 90.0;
        right_rec.lock().position_deg = 45.0;
        intake.update_pose(TICK);
        intake.tare_angles(0.0, 10.0);

        let angles = intake.angles();
        assert_eq!(angles.left_deg, 0.0);
        assert_eq!(angles.right_deg, 10.0);
    }
}
