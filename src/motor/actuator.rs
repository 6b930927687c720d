// Actuator port abstraction over the motor bus
//
// Subsystems own boxed actuators and never see the bus directly. A real
// motor degrades silently on bus errors (warn and keep the cached
// position); the simulated motor integrates a first-order model for tests
// and `--sim` runs.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::warn;

use super::bus::{BrakeMode, BusError, MotorBus};
use crate::config::{SIM_FREE_SPEED_DPS, TICK, VOLTAGE_MAX};

/// A signed-voltage actuator with an accumulating position sensor.
///
/// All operations are total: out-of-range voltages saturate and transport
/// failures degrade to the last known position.
pub trait Actuator: Send {
    /// Command a voltage in millivolts; saturates at the actuator limit
    fn set_voltage(&mut self, mv: i32);

    /// Select the behavior at zero commanded voltage
    fn set_brake_mode(&mut self, mode: BrakeMode);

    /// Take a position sample, in output-shaft degrees since construction.
    /// Monotonic with the raw sensor; never wraps over the operating range.
    fn position(&mut self) -> f64;
}

/// One smart motor on a shared serial bus
pub struct SmartMotor {
    bus: Arc<Mutex<MotorBus>>,
    id: u8,
    reversed: bool,
    origin_deg: f64,
    last_deg: f64,
}

impl SmartMotor {
    /// Attach to motor `id`, zeroing its position at the current reading.
    /// `reversed` flips both commanded voltage and reported position so
    /// mirrored mechanisms read the same sign convention on both sides.
    pub fn new(bus: Arc<Mutex<MotorBus>>, id: u8, reversed: bool) -> Result<Self, BusError> {
        let raw = bus.lock().position(id)?;
        let sign = if reversed { -1.0 } else { 1.0 };
        Ok(Self {
            bus,
            id,
            reversed,
            origin_deg: sign * raw as f64 / 100.0,
            last_deg: 0.0,
        })
    }

    pub fn id(&self) -> u8 {
        self.id
    }
}

impl Actuator for SmartMotor {
    fn set_voltage(&mut self, mv: i32) {
        let mv = mv.clamp(-VOLTAGE_MAX, VOLTAGE_MAX);
        let mv = if self.reversed { -mv } else { mv };
        if let Err(e) = self.bus.lock().set_voltage(self.id, mv as i16) {
            warn!("Motor {}: voltage command dropped: {}", self.id, e);
        }
    }

    fn set_brake_mode(&mut self, mode: BrakeMode) {
        if let Err(e) = self.bus.lock().set_brake_mode(self.id, mode) {
            warn!("Motor {}: brake mode change dropped: {}", self.id, e);
        }
    }

    fn position(&mut self) -> f64 {
        match self.bus.lock().position(self.id) {
            Ok(raw) => {
                let sign = if self.reversed { -1.0 } else { 1.0 };
                self.last_deg = sign * raw as f64 / 100.0 - self.origin_deg;
                self.last_deg
            }
            Err(e) => {
                warn!("Motor {}: position read failed, using cached: {}", self.id, e);
                self.last_deg
            }
        }
    }
}

impl Drop for SmartMotor {
    fn drop(&mut self) {
        // Try to stop the motor when the handle goes away (safety measure)
        if let Err(e) = self.bus.lock().set_voltage(self.id, 0) {
            warn!("Motor {}: failed to stop on drop: {}", self.id, e);
        }
    }
}

/// First-order simulated motor: shaft velocity proportional to voltage.
///
/// The model advances by one nominal tick per position sample, which makes
/// simulated runs line up with the update loop and keeps tests
/// deterministic.
pub struct SimActuator {
    voltage_mv: i32,
    brake: BrakeMode,
    position_deg: f64,
}

impl SimActuator {
    pub fn new() -> Self {
        Self::with_position(0.0)
    }

    /// Start the shaft at a non-zero angle
    pub fn with_position(position_deg: f64) -> Self {
        Self {
            voltage_mv: 0,
            brake: BrakeMode::Coast,
            position_deg,
        }
    }
}

impl Default for SimActuator {
    fn default() -> Self {
        Self::new()
    }
}

impl Actuator for SimActuator {
    fn set_voltage(&mut self, mv: i32) {
        self.voltage_mv = mv.clamp(-VOLTAGE_MAX, VOLTAGE_MAX);
    }

    fn set_brake_mode(&mut self, mode: BrakeMode) {
        self.brake = mode;
    }

    fn position(&mut self) -> f64 {
        if self.brake != BrakeMode::Hold {
            let fraction = self.voltage_mv as f64 / VOLTAGE_MAX as f64;
            self.position_deg += fraction * SIM_FREE_SPEED_DPS * TICK.as_secs_f64();
        }
        self.position_deg
    }
}

/// Test double that records the last command and lets the test script the
/// reported position.
#[cfg(test)]
pub struct RecordingActuator {
    pub record: Arc<parking_lot::Mutex<ActuatorRecord>>,
}

#[cfg(test)]
#[derive(Debug, Clone, Copy)]
pub struct ActuatorRecord {
    pub voltage_mv: i32,
    pub brake: BrakeMode,
    pub position_deg: f64,
}

#[cfg(test)]
impl RecordingActuator {
    pub fn new() -> (Self, Arc<parking_lot::Mutex<ActuatorRecord>>) {
        let record = Arc::new(parking_lot::Mutex::new(ActuatorRecord {
            voltage_mv: 0,
            brake: BrakeMode::Coast,
            position_deg: 0.0,
        }));
        (
            Self {
                record: record.clone(),
            },
            record,
        )
    }
}

#[cfg(test)]
impl Actuator for RecordingActuator {
    fn set_voltage(&mut self, mv: i32) {
        self.record.lock().voltage_mv = mv.clamp(-VOLTAGE_MAX, VOLTAGE_MAX);
    }

    fn set_brake_mode(&mut self, mode: BrakeMode) {
        self.record.lock().brake = mode;
    }

    fn position(&mut self) -> f64 {
        self.record.lock().position_deg
    }
}
