// Tray tilt joint.
//
// The tilt angle has no dedicated sensor: it is recovered from the
// transmission's own encoders. On each side the shared motor leads the
// direct motor exactly when the differential is tilting the tray, so the
// tilt is the average of the two side differences, through the tray
// gearing.

use std::time::Duration;

use crate::config::TILTER_RATIO;
use crate::control::{DerivativeFilter, PoseStore};
use crate::transmission::TransmissionEncoders;

pub struct Tilter {
    pose: PoseStore<f64>,
    filter: DerivativeFilter,
}

impl Tilter {
    pub fn new() -> Self {
        Self {
            pose: PoseStore::new(0.0),
            filter: DerivativeFilter::new(),
        }
    }

    /// Sampling phase: recompute the tilt estimate from fresh encoders
    pub fn update_pose(&mut self, encoders: &TransmissionEncoders, dt: Duration) {
        let left_diff = encoders.left_shared - encoders.left_direct;
        let right_diff = encoders.right_shared - encoders.right_direct;
        let absolute = (left_diff - right_diff) * 0.5 / TILTER_RATIO;

        self.pose.update(absolute);
        self.filter.sample(absolute, dt);
    }

    /// Current tray angle in degrees
    pub fn angle(&self) -> f64 {
        self.pose.get()
    }

    pub fn velocity(&self) -> f64 {
        self.filter.velocity()
    }

    pub fn acceleration(&self) -> f64 {
        self.filter.acceleration()
    }

    /// Re-zero the visible tray angle; the derivative estimate is
    /// untouched because it runs on the absolute track
    pub fn tare(&mut self, angle_deg: f64) {
        self.pose.tare(angle_deg);
    }
}

impl Default for Tilter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TICK;

    fn encoders(ld: f64, rd: f64, ls: f64, rs: f64) -> TransmissionEncoders {
        TransmissionEncoders {
            left_direct: ld,
            right_direct: rd,
            left_shared: ls,
            right_shared: rs,
        }
    }

    #[test]
    fn test_pure_drive_reads_zero_tilt() {
        let mut tilter = Tilter::new();
        // All four motors advance together: common mode, no tilt
        tilter.update_pose(&encoders(90.0, 90.0, 90.0, 90.0), TICK);
        assert_eq!(tilter.angle(), 0.0);
    }

    #[test]
    fn test_differential_motion_reads_tilt() {
        let mut tilter = Tilter::new();
        // Shared motors lead by +-100 deg, directs still: tray moved
        tilter.update_pose(&encoders(0.0, 0.0, 100.0, -100.0), TICK);
        assert_eq!(tilter.angle(), 100.0 / TILTER_RATIO);
    }

    #[test]
    fn test_drive_superimposed_on_tilt_cancels() {
        let mut tilter = Tilter::new();
        // 50 deg of common-mode drive on top of the same differential
        tilter.update_pose(&encoders(50.0, 50.0, 150.0, -50.0), TICK);
        assert_eq!(tilter.angle(), 100.0 / TILTER_RATIO);
    }

    #[test]
    fn test_tare_leaves_derivatives_alone() {
        let mut tilter = Tilter::new();
        for i in 0..10 {
            let deg = i as f64 * 10.0;
            tilter.update_pose(&encoders(0.0, 0.0, deg, -deg), TICK);
        }
        let vel = tilter.velocity();
        assert!(vel > 0.0);

        tilter.tare(0.0);
        assert_eq!(tilter.angle(), 0.0);
        assert_eq!(tilter.velocity(), vel);
    }
}
