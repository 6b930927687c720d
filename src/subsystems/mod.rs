// Subsystem capability interface, ownership tokens, and the robot context
//
// Provides:
// - The Subsystem trait every concrete subsystem implements directly
// - Owned<T>, the advisory per-subsystem ownership token
// - Robot, the context object built exactly once at startup

pub mod chassis;
pub mod drive;
pub mod intake;
pub mod lift;
pub mod tilter;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::config::{
    ALL_MOTOR_IDS, MOTOR_ID_INTAKE_LEFT, MOTOR_ID_INTAKE_RIGHT, MOTOR_ID_LEFT_DIRECT,
    MOTOR_ID_LEFT_SHARED, MOTOR_ID_LIFT_LEFT, MOTOR_ID_LIFT_RIGHT, MOTOR_ID_RIGHT_DIRECT,
    MOTOR_ID_RIGHT_SHARED,
};
use crate::motor::{Actuator, BusError, MotorBus, SimActuator, SmartMotor};
use crate::transmission::Transmission;

pub use chassis::{Chassis, ChassisDeriv, ChassisPose};
pub use drive::Drive;
pub use intake::{Intake, RollerAngles};
pub use lift::Lift;
pub use tilter::Tilter;

/// Capability interface of a subsystem. No implementation inheritance:
/// each concrete subsystem implements the whole surface itself.
pub trait Subsystem {
    type Pose;
    type Deriv;

    /// Request a voltage for the subsystem's motors
    fn move_voltage(&mut self, mv: i32);

    /// Current visible pose
    fn pose(&self) -> Self::Pose;

    /// Current pose derivative; unaffected by taring
    fn deriv(&self) -> Self::Deriv;

    /// Re-zero the visible pose without a reading discontinuity
    fn tare(&mut self, pose: Self::Pose);

    /// Sampling phase. Must run before acting on the subsystem within a
    /// tick; the updater or the lock-holding routine is responsible.
    fn update_pose(&mut self, dt: Duration);
}

/// Advisory ownership token over a subsystem.
///
/// Exactly one owner at a time, and acquisition is always `try_lock`: a
/// busy subsystem is skipped for the current tick and retried on the next,
/// never awaited and never an error. Whoever holds the token owns both the
/// sampling and the control phase for as long as it is held.
pub type Owned<T> = Arc<Mutex<T>>;

fn owned<T>(value: T) -> Owned<T> {
    Arc::new(Mutex::new(value))
}

/// Every subsystem handle, constructed once at startup and passed by
/// reference to whatever needs it.
#[derive(Clone)]
pub struct Robot {
    pub drive: Owned<Drive>,
    pub lift: Owned<Lift>,
    pub intake: Owned<Intake>,
}

impl Robot {
    /// Bring up the real robot on the motor bus at `port`.
    ///
    /// Pings every configured motor before handing out actuators, like any
    /// driver bring-up: a missing motor is a hard startup error, not a
    /// silent runtime degradation.
    pub fn connect(port: &str) -> Result<Self, BusError> {
        info!("Opening motor bus on {}", port);
        let bus = Arc::new(parking_lot::Mutex::new(MotorBus::open(port)?));

        for id in ALL_MOTOR_IDS {
            if !bus.lock().ping(id)? {
                return Err(BusError::Timeout { id });
            }
            debug!("Motor {} responding", id);
        }

        let motor = |id: u8, reversed: bool| -> Result<Box<dyn Actuator>, BusError> {
            Ok(Box::new(SmartMotor::new(bus.clone(), id, reversed)?))
        };

        let transmission = Transmission::new(
            motor(MOTOR_ID_LEFT_DIRECT, false)?,
            motor(MOTOR_ID_RIGHT_DIRECT, true)?,
            motor(MOTOR_ID_LEFT_SHARED, false)?,
            motor(MOTOR_ID_RIGHT_SHARED, true)?,
        );
        let lift = Lift::new(
            motor(MOTOR_ID_LIFT_LEFT, false)?,
            motor(MOTOR_ID_LIFT_RIGHT, true)?,
        );
        let intake = Intake::new(
            motor(MOTOR_ID_INTAKE_LEFT, false)?,
            motor(MOTOR_ID_INTAKE_RIGHT, true)?,
        );

        info!("All motors responding, subsystems assembled");
        Ok(Self::assemble(transmission, lift, intake))
    }

    /// Fully simulated robot for tests and `--sim` runs
    pub fn simulated() -> Self {
        let sim = || -> Box<dyn Actuator> { Box::new(SimActuator::new()) };
        let transmission = Transmission::new(sim(), sim(), sim(), sim());
        let lift = Lift::new(sim(), sim());
        let intake = Intake::new(sim(), sim());
        Self::assemble(transmission, lift, intake)
    }

    fn assemble(transmission: Transmission, lift: Lift, intake: Intake) -> Self {
        Self {
            drive: owned(Drive::new(transmission)),
            lift: owned(lift),
            intake: owned(intake),
        }
    }
}
