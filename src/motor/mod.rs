// Motor layer for the traybot
//
// Provides:
// - Smart-motor serial bus protocol implementation
// - Actuator port abstraction (voltage, brake mode, accumulated position)
// - Hardware and simulated actuator implementations

mod actuator;
pub mod bus;

pub use actuator::{Actuator, SimActuator, SmartMotor};
pub use bus::{BrakeMode, BusError, MotorBus};

#[cfg(test)]
pub use actuator::{ActuatorRecord, RecordingActuator};
