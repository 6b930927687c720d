// Loop timing, voltage limits, transmission tuning, motor configuration
use std::time::Duration;

// Update loop frequency
pub const LOOP_HZ: u64 = 100;

// Nominal tick period for pose sampling and control
pub const TICK: Duration = Duration::from_millis(1000 / LOOP_HZ);

// Driver input timeout for the teleop watchdog
pub const INPUT_TIMEOUT: Duration = Duration::from_millis(250);

// Actuator voltage limit in millivolts
pub const VOLTAGE_MAX: i32 = 12_000;

// Transmission arbiter thresholds (degrees).
// The tray counts as retracted below RETRACT and deposited above EXTEND;
// the lift locks out passive coupling once it rises past MAX_LOCK.
pub const TILTER_RETRACT_THRESHOLD: f64 = 5.0;
pub const TILTER_EXTEND_THRESHOLD: f64 = 65.0;
pub const TILTER_MAX_EXTENDED: f64 = 72.0;
pub const LIFT_MAX_LOCK: f64 = 15.0;

// Hold controller: normalized PD output scaled to millivolts by HOLD_GAIN
pub const HOLD_GAIN: i32 = 4_000;
pub const HOLD_KP: f64 = 0.05;
pub const HOLD_KD: f64 = 0.004;

// Output-shaft gear reductions
pub const TILTER_RATIO: f64 = 5.0;
pub const LIFT_RATIO: f64 = 5.0;

// Lift left/right levelling trim, millivolts per degree of side mismatch
pub const LIFT_SYNC_GAIN: f64 = 20.0;

// Drive wheel radius for encoder-distance conversion
pub const WHEEL_RADIUS_M: f64 = 0.0508;

// Deposit routine tuning: PD on the tray angle, lift pressed down while
// the tray ramps out, bias held against the stack afterwards
pub const DEPOSIT_KP: f64 = 0.015;
pub const DEPOSIT_KD: f64 = 0.005;
pub const DEPOSIT_LIFT_BIAS_MV: i32 = -4_500;
pub const DEPOSIT_HOLD_BIAS_MV: i32 = 1_000;

// Pull-out routine tuning
pub const PULL_OUT_INTAKE_MV: i32 = -3_000;
pub const PULL_OUT_DRIVE_MV: i32 = -6_000;
pub const PULL_OUT_HOLD_BIAS_MV: i32 = 1_000;

// Telemetry snapshot cadence, in ticks
pub const TELEMETRY_EVERY: u32 = 100;

// Serial port for the smart-motor bus
pub const MOTOR_PORT: &str = "/dev/ttyACM0";

// Motor bus ids
pub const MOTOR_ID_LEFT_DIRECT: u8 = 1;
pub const MOTOR_ID_RIGHT_DIRECT: u8 = 2;
pub const MOTOR_ID_LEFT_SHARED: u8 = 3;
pub const MOTOR_ID_RIGHT_SHARED: u8 = 4;
pub const MOTOR_ID_LIFT_LEFT: u8 = 5;
pub const MOTOR_ID_LIFT_RIGHT: u8 = 6;
pub const MOTOR_ID_INTAKE_LEFT: u8 = 7;
pub const MOTOR_ID_INTAKE_RIGHT: u8 = 8;

/// All motor ids, pinged at startup
pub const ALL_MOTOR_IDS: [u8; 8] = [
    MOTOR_ID_LEFT_DIRECT,
    MOTOR_ID_RIGHT_DIRECT,
    MOTOR_ID_LEFT_SHARED,
    MOTOR_ID_RIGHT_SHARED,
    MOTOR_ID_LIFT_LEFT,
    MOTOR_ID_LIFT_RIGHT,
    MOTOR_ID_INTAKE_LEFT,
    MOTOR_ID_INTAKE_RIGHT,
];

// Simulated free speed at the motor output shaft
pub const SIM_FREE_SPEED_DPS: f64 = 600.0;
