// Shared request and status types passed between the driver input,
// behavior routines, and the transmission arbiter.

use serde::{Deserialize, Serialize};

/// Desired chassis voltages, one per side, in millivolts.
///
/// This is a request: the voltages the drivetrain actually receives depend
/// on the transmission's current behavior.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriveCommand {
    pub left_mv: i32,
    pub right_mv: i32,
}

impl DriveCommand {
    pub fn new(left_mv: i32, right_mv: i32) -> Self {
        Self { left_mv, right_mv }
    }

    /// Same voltage on both sides
    pub fn both(mv: i32) -> Self {
        Self {
            left_mv: mv,
            right_mv: mv,
        }
    }

    pub fn zero() -> Self {
        Self::default()
    }
}

/// A tilt-mode request submitted to the arbiter.
///
/// Requests never mutate the transmission state directly; the transition
/// function consumes at most one pending request per tick and decides the
/// resulting state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TiltRequest {
    /// Run the tray out toward the deposit angle
    Extend,
    /// Run the tray back toward the stowed angle
    Retract,
    /// Bypass the drivetrain entirely and drive the shared motors at a
    /// caller-supplied differential voltage
    DirectVoltage(i32),
    /// Close the loop on the current tray angle, pressing with `bias_mv`
    Hold { bias_mv: i32 },
}

/// Health of the manual-control input stream
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RuntimeHealth {
    Ok,
    InputStale,
}

/// Periodic status line emitted by the updater as a JSON log record
#[derive(Debug, Clone, Serialize)]
pub struct TelemetrySnapshot {
    pub state: &'static str,
    pub tilt_deg: f64,
    pub lift_deg: f64,
    pub drive: DriveCommand,
}
