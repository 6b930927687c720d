// Chassis pose tracking.
//
// Wheel travel comes from the direct drive encoders. The x/y/heading
// fields exist for the dead-reckoning pass, which is not implemented yet;
// until it lands they only move when the pose is tared.

use std::ops::{Add, Sub};
use std::time::Duration;

use crate::config::WHEEL_RADIUS_M;
use crate::control::{DerivativeFilter, PoseStore};
use crate::transmission::TransmissionEncoders;

/// Full chassis pose, meters and degrees
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ChassisPose {
    pub x_m: f64,
    pub y_m: f64,
    pub heading_deg: f64,
    pub dist_left_m: f64,
    pub dist_right_m: f64,
}

impl Add for ChassisPose {
    type Output = ChassisPose;

    fn add(self, other: ChassisPose) -> ChassisPose {
        ChassisPose {
            x_m: self.x_m + other.x_m,
            y_m: self.y_m + other.y_m,
            heading_deg: self.heading_deg + other.heading_deg,
            dist_left_m: self.dist_left_m + other.dist_left_m,
            dist_right_m: self.dist_right_m + other.dist_right_m,
        }
    }
}

impl Sub for ChassisPose {
    type Output = ChassisPose;

    fn sub(self, other: ChassisPose) -> ChassisPose {
        ChassisPose {
            x_m: self.x_m - other.x_m,
            y_m: self.y_m - other.y_m,
            heading_deg: self.heading_deg - other.heading_deg,
            dist_left_m: self.dist_left_m - other.dist_left_m,
            dist_right_m: self.dist_right_m - other.dist_right_m,
        }
    }
}

/// Wheel speeds, meters per second
#[derive(Debug, Clone, Copy, Default)]
pub struct ChassisDeriv {
    pub left_mps: f64,
    pub right_mps: f64,
}

pub struct Chassis {
    pose: PoseStore<ChassisPose>,
    filter_left: DerivativeFilter,
    filter_right: DerivativeFilter,
}

impl Chassis {
    pub fn new() -> Self {
        Self {
            pose: PoseStore::new(ChassisPose::default()),
            filter_left: DerivativeFilter::new(),
            filter_right: DerivativeFilter::new(),
        }
    }

    /// Sampling phase: convert direct encoder angles to wheel travel
    pub fn update_pose(&mut self, encoders: &TransmissionEncoders, dt: Duration) {
        let circumference_per_deg = WHEEL_RADIUS_M * std::f64::consts::PI * 2.0 / 360.0;
        let dist_left_m = encoders.left_direct * circumference_per_deg;
        let dist_right_m = encoders.right_direct * circumference_per_deg;

        self.pose.update(ChassisPose {
            dist_left_m,
            dist_right_m,
            ..ChassisPose::default()
        });
        self.filter_left.sample(dist_left_m, dt);
        self.filter_right.sample(dist_right_m, dt);
    }

    pub fn pose(&self) -> ChassisPose {
        self.pose.get()
    }

    pub fn deriv(&self) -> ChassisDeriv {
        ChassisDeriv {
            left_mps: self.filter_left.velocity(),
            right_mps: self.filter_right.velocity(),
        }
    }

    /// Re-zero the visible pose, e.g. to the starting tile before a match
    pub fn tare(&mut self, pose: ChassisPose) {
        self.pose.tare(pose);
    }
}

impl Default for Chassis {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TICK;

    #[test]
    fn test_encoder_angles_become_wheel_travel() {
        let mut chassis = Chassis::new();
        let encoders = TransmissionEncoders {
            left_direct: 360.0,
            right_direct: 720.0,
            ..TransmissionEncoders::default()
        };
        chassis.update_pose(&encoders, TICK);

        let circumference = WHEEL_RADIUS_M * std::f64::consts::PI * 2.0;
        let pose = chassis.pose();
        assert!((pose.dist_left_m - circumference).abs() < 1e-9);
        assert!((pose.dist_right_m - 2.0 * circumference).abs() < 1e-9);
    }

    #[test]
    fn test_tare_offsets_full_pose() {
        let mut chassis = Chassis::new();
        chassis.tare(ChassisPose {
            x_m: 1.0,
            y_m: 2.0,
            heading_deg: 90.0,
            ..ChassisPose::default()
        });
        let pose = chassis.pose();
        assert_eq!(pose.x_m, 1.0);
        assert_eq!(pose.y_m, 2.0);
        assert_eq!(pose.heading_deg, 90.0);
    }
}
