// Shared-actuator arbitration for the drive/tilter transmission
//
// Two of the four drive motors are coupled to the tray tilter through a
// differential: equal voltages on a side's direct and shared motors produce
// pure drivetrain torque, unequal voltages tilt the tray. Every tick the
// arbiter reconciles one chassis voltage request and one tilt-mode request
// into a single behavior for the shared pair, subject to the lift
// interlock.
//
// Nothing in here can fail: out-of-range requests saturate, conflicting
// requests resolve by the transition priority order, and oversized outputs
// scale proportionally instead of clipping per side.

use std::time::Duration;

use tracing::debug;

use crate::config::{
    HOLD_GAIN, HOLD_KD, HOLD_KP, LIFT_MAX_LOCK, TILTER_EXTEND_THRESHOLD,
    TILTER_RETRACT_THRESHOLD, VOLTAGE_MAX,
};
use crate::control::PosPd;
use crate::messages::{DriveCommand, TiltRequest};
use crate::motor::{Actuator, BrakeMode};

/// Exclusive behaviors of the transmission. Mutated only by [`transition`];
/// callers submit requests and the arbiter decides.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TransmissionState {
    /// Shared motors copy the direct motors; the tray sits by gravity alone
    Passive,
    /// Closed-loop differential correction pins the tray at `target_deg`
    Holding { target_deg: f64 },
    /// Shared motors locked at full reverse until the tray is stowed
    Retracting,
    /// Shared motors locked at full forward until the tray is deposited
    Extending,
    /// Direct motors brake; shared motors follow an external override
    LockedPassthrough,
}

impl TransmissionState {
    pub fn name(&self) -> &'static str {
        match self {
            TransmissionState::Passive => "passive",
            TransmissionState::Holding { .. } => "holding",
            TransmissionState::Retracting => "retracting",
            TransmissionState::Extending => "extending",
            TransmissionState::LockedPassthrough => "locked_passthrough",
        }
    }
}

/// Everything one transition evaluation consumes
#[derive(Debug, Clone, Copy)]
pub struct TransitionInputs {
    pub tilt_request: Option<TiltRequest>,
    pub tilt_deg: f64,
    pub lift_deg: f64,
}

/// The arbiter's transition function, evaluated once per tick before
/// actuation. Pure: actuation happens separately in
/// [`Transmission::update`].
///
/// Priority order:
/// 1. lift interlock (a raised lift must never leave the tray passive)
/// 2. retract/extend completion guards
/// 3. holding disarm
/// 4. explicit tilt requests
pub fn transition(state: TransmissionState, inputs: &TransitionInputs) -> TransmissionState {
    use TransmissionState::*;

    // Interlock outranks everything, requests included: with the lift above
    // the lock height, a passive transmission would let the tray slam under
    // the stack's weight.
    if matches!(state, Passive) && inputs.lift_deg >= LIFT_MAX_LOCK {
        return Holding {
            target_deg: inputs.tilt_deg,
        };
    }

    match state {
        Retracting
            if inputs.tilt_deg <= TILTER_RETRACT_THRESHOLD || inputs.lift_deg < LIFT_MAX_LOCK =>
        {
            return Holding { target_deg: 0.0 };
        }
        Extending
            if inputs.tilt_deg >= TILTER_EXTEND_THRESHOLD || inputs.lift_deg < LIFT_MAX_LOCK =>
        {
            return Holding {
                target_deg: TILTER_RETRACT_THRESHOLD,
            };
        }
        Holding { .. }
            if inputs.tilt_deg <= TILTER_RETRACT_THRESHOLD
                && inputs.lift_deg < LIFT_MAX_LOCK =>
        {
            return Passive;
        }
        _ => {}
    }

    match inputs.tilt_request {
        Some(TiltRequest::Extend) => Extending,
        Some(TiltRequest::Retract) => Retracting,
        Some(TiltRequest::DirectVoltage(_)) => LockedPassthrough,
        Some(TiltRequest::Hold { .. }) => Holding {
            target_deg: inputs.tilt_deg,
        },
        None => state,
    }
}

/// Closed-loop tray hold: a PD on the tray angle with output normalized to
/// [-1, 1], scaled by `HOLD_GAIN` at actuation, plus an optional
/// differential feedforward pressing the tray against the stack.
#[derive(Debug, Clone)]
pub struct HoldController {
    pd: PosPd,
    bias_mv: i32,
}

impl HoldController {
    pub fn new() -> Self {
        Self {
            pd: PosPd::new(HOLD_KP, HOLD_KD),
            bias_mv: 0,
        }
    }

    pub fn set_target(&mut self, target_deg: f64) {
        self.pd.set_target(target_deg);
    }

    pub fn set_bias(&mut self, bias_mv: i32) {
        self.bias_mv = bias_mv.clamp(-VOLTAGE_MAX, VOLTAGE_MAX);
    }

    pub fn bias_mv(&self) -> i32 {
        self.bias_mv
    }

    /// Normalized correction toward the hold target
    pub fn step(&mut self, tilt_deg: f64, dt: Duration) -> f64 {
        self.pd.step(tilt_deg, dt)
    }
}

impl Default for HoldController {
    fn default() -> Self {
        Self::new()
    }
}

/// One sample of the four drive encoders, in output-shaft degrees
#[derive(Debug, Clone, Copy, Default)]
pub struct TransmissionEncoders {
    pub left_direct: f64,
    pub right_direct: f64,
    pub left_shared: f64,
    pub right_shared: f64,
}

/// Voltages actually applied to the four motors in the holding behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HoldOutputs {
    pub direct_left: i32,
    pub direct_right: i32,
    pub shared_left: i32,
    pub shared_right: i32,
}

/// Combine the drive request with the hold correction, then rescale all
/// four outputs together if a shared output would exceed the voltage
/// limit. One common scale factor keeps the ratio of drivetrain torque to
/// hold torque intact; clipping each side on its own would bias the tray.
pub fn holding_outputs(drive: DriveCommand, correction: f64, bias_mv: i32) -> HoldOutputs {
    let offset = (correction * HOLD_GAIN as f64).round() as i32 + bias_mv;
    let shared_left = drive.left_mv + offset;
    let shared_right = drive.right_mv - offset;

    let worst = shared_left.abs().max(shared_right.abs());
    if worst <= VOLTAGE_MAX {
        return HoldOutputs {
            direct_left: drive.left_mv,
            direct_right: drive.right_mv,
            shared_left,
            shared_right,
        };
    }

    let s = VOLTAGE_MAX as f64 / worst as f64;
    let scale = |mv: i32| (mv as f64 * s).round() as i32;
    HoldOutputs {
        direct_left: scale(drive.left_mv),
        direct_right: scale(drive.right_mv),
        shared_left: scale(shared_left),
        shared_right: scale(shared_right),
    }
}

/// Owner of the four drive actuators and sole authority over their
/// voltages. The chassis and tilter never touch a motor; they post
/// requests here and the next [`Transmission::update`] reconciles them.
pub struct Transmission {
    left_direct: Box<dyn Actuator>,
    right_direct: Box<dyn Actuator>,
    left_shared: Box<dyn Actuator>,
    right_shared: Box<dyn Actuator>,

    state: TransmissionState,
    hold: HoldController,

    drive_request: DriveCommand,
    tilt_request: Option<TiltRequest>,
    passthrough_mv: i32,
}

impl Transmission {
    pub fn new(
        left_direct: Box<dyn Actuator>,
        right_direct: Box<dyn Actuator>,
        left_shared: Box<dyn Actuator>,
        right_shared: Box<dyn Actuator>,
    ) -> Self {
        Self {
            left_direct,
            right_direct,
            left_shared,
            right_shared,
            state: TransmissionState::Passive,
            hold: HoldController::new(),
            drive_request: DriveCommand::zero(),
            tilt_request: None,
            passthrough_mv: 0,
        }
    }

    pub fn state(&self) -> TransmissionState {
        self.state
    }

    /// The pending chassis request (not necessarily what is applied)
    pub fn drive_request(&self) -> DriveCommand {
        self.drive_request
    }

    /// Chassis-side request. The chassis is not guaranteed to ever reach
    /// these voltages; the applied values depend on the current behavior.
    pub fn request_drive(&mut self, cmd: DriveCommand) {
        self.drive_request = DriveCommand {
            left_mv: cmd.left_mv.clamp(-VOLTAGE_MAX, VOLTAGE_MAX),
            right_mv: cmd.right_mv.clamp(-VOLTAGE_MAX, VOLTAGE_MAX),
        };
    }

    /// Tilter-side request, consumed by the next transition evaluation.
    /// A later request in the same tick replaces an earlier one.
    pub fn request_tilt(&mut self, request: TiltRequest) {
        match request {
            TiltRequest::DirectVoltage(mv) => {
                self.passthrough_mv = mv.clamp(-VOLTAGE_MAX, VOLTAGE_MAX);
            }
            TiltRequest::Hold { bias_mv } => {
                self.hold.set_bias(bias_mv);
            }
            _ => {}
        }
        self.tilt_request = Some(request);
    }

    /// Sample all four encoders for the pose phase
    pub fn encoder_degrees(&mut self) -> TransmissionEncoders {
        TransmissionEncoders {
            left_direct: self.left_direct.position(),
            right_direct: self.right_direct.position(),
            left_shared: self.left_shared.position(),
            right_shared: self.right_shared.position(),
        }
    }

    /// One control tick: run the transition on the freshest poses, then
    /// actuate the resulting behavior.
    pub fn update(&mut self, tilt_deg: f64, lift_deg: f64, dt: Duration) {
        let inputs = TransitionInputs {
            tilt_request: self.tilt_request.take(),
            tilt_deg,
            lift_deg,
        };
        let next = transition(self.state, &inputs);
        if next != self.state {
            debug!(
                from = self.state.name(),
                to = next.name(),
                tilt_deg,
                lift_deg,
                "transmission transition"
            );
        }
        self.state = next;

        let drive = self.drive_request;
        match self.state {
            TransmissionState::Passive => {
                self.set_all_brake(BrakeMode::Coast);
                self.left_direct.set_voltage(drive.left_mv);
                self.left_shared.set_voltage(drive.left_mv);
                self.right_direct.set_voltage(drive.right_mv);
                self.right_shared.set_voltage(drive.right_mv);
            }
            TransmissionState::Extending => {
                self.set_all_brake(BrakeMode::Coast);
                self.left_direct.set_voltage(drive.left_mv);
                self.right_direct.set_voltage(drive.right_mv);
                self.left_shared.set_voltage(VOLTAGE_MAX);
                self.right_shared.set_voltage(-VOLTAGE_MAX);
            }
            TransmissionState::Retracting => {
                self.set_all_brake(BrakeMode::Coast);
                self.left_direct.set_voltage(drive.left_mv);
                self.right_direct.set_voltage(drive.right_mv);
                self.left_shared.set_voltage(-VOLTAGE_MAX);
                self.right_shared.set_voltage(VOLTAGE_MAX);
            }
            TransmissionState::LockedPassthrough => {
                // Chassis pinned so the override moves only the tray
                self.left_direct.set_brake_mode(BrakeMode::Hold);
                self.right_direct.set_brake_mode(BrakeMode::Hold);
                self.left_direct.set_voltage(0);
                self.right_direct.set_voltage(0);
                self.left_shared.set_brake_mode(BrakeMode::Coast);
                self.right_shared.set_brake_mode(BrakeMode::Coast);
                self.left_shared.set_voltage(self.passthrough_mv);
                self.right_shared.set_voltage(-self.passthrough_mv);
            }
            TransmissionState::Holding { target_deg } => {
                self.hold.set_target(target_deg);
                let correction = self.hold.step(tilt_deg, dt);
                let out = holding_outputs(drive, correction, self.hold.bias_mv());
                self.set_all_brake(BrakeMode::Coast);
                self.left_direct.set_voltage(out.direct_left);
                self.right_direct.set_voltage(out.direct_right);
                self.left_shared.set_voltage(out.shared_left);
                self.right_shared.set_voltage(out.shared_right);
            }
        }
    }

    fn set_all_brake(&mut self, mode: BrakeMode) {
        self.left_direct.set_brake_mode(mode);
        self.right_direct.set_brake_mode(mode);
        self.left_shared.set_brake_mode(mode);
        self.right_shared.set_brake_mode(mode);
    }
}
