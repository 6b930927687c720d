// Keyboard driver station
//
// The competition robot is driven from a gamepad; this collaborator maps
// terminal keys onto the same subsystem requests so the runtime can be
// exercised anywhere. Terminal key repeat stands in for "held" buttons,
// with a staleness watchdog relaxing every request once repeats stop.
//
// Controls: W/S drive, A/D turn, 1/2/3 speed, E/R tray extend/retract,
// U/J lift up/down, I/O intake in/out, Space stop, Q quit.

use std::time::{Duration, Instant};

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use tokio::time::sleep;
use tracing::{info, warn};

use crate::config::{INPUT_TIMEOUT, TICK, VOLTAGE_MAX};
use crate::messages::{RuntimeHealth, TiltRequest};
use crate::runtime::PhaseGate;
use crate::subsystems::Robot;

/// Selectable drive speeds (low, medium, high)
const DRIVE_SPEEDS_MV: [i32; 3] = [4_000, 8_000, 12_000];

const LIFT_UP_MV: i32 = 12_000;
const LIFT_DOWN_MV: i32 = -8_000;
const INTAKE_IN_MV: i32 = 12_000;
const INTAKE_OUT_MV: i32 = -12_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LiftCmd {
    Up,
    Down,
    Idle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IntakeCmd {
    In,
    Out,
    Idle,
}

/// Everything the key handler accumulates between ticks
struct InputState {
    speed_idx: usize,
    throttle_mv: i32,
    turn_mv: i32,
    lift: LiftCmd,
    intake: IntakeCmd,
    tilt: Option<TiltRequest>,
    quit: bool,
}

impl InputState {
    fn new() -> Self {
        Self {
            speed_idx: 1,
            throttle_mv: 0,
            turn_mv: 0,
            lift: LiftCmd::Idle,
            intake: IntakeCmd::Idle,
            tilt: None,
            quit: false,
        }
    }

    /// Apply one key press. Returns true for movement inputs, which feed
    /// the staleness watchdog.
    fn apply_key(&mut self, code: KeyCode) -> bool {
        let speed = DRIVE_SPEEDS_MV[self.speed_idx];
        match code {
            KeyCode::Char('w') => self.throttle_mv = speed,
            KeyCode::Char('s') => self.throttle_mv = -speed,
            KeyCode::Char('a') => self.turn_mv = -speed / 2,
            KeyCode::Char('d') => self.turn_mv = speed / 2,

            KeyCode::Char('e') => self.tilt = Some(TiltRequest::Extend),
            KeyCode::Char('r') => self.tilt = Some(TiltRequest::Retract),

            KeyCode::Char('u') => self.lift = LiftCmd::Up,
            KeyCode::Char('j') => self.lift = LiftCmd::Down,

            KeyCode::Char('i') => self.intake = IntakeCmd::In,
            KeyCode::Char('o') => self.intake = IntakeCmd::Out,

            KeyCode::Char(' ') => self.relax(),

            KeyCode::Char(c @ '1'..='3') => {
                self.speed_idx = (c as usize) - ('1' as usize);
                info!("Drive speed: {} mV", DRIVE_SPEEDS_MV[self.speed_idx]);
                return false;
            }

            KeyCode::Char('q') | KeyCode::Esc => {
                self.quit = true;
                return false;
            }

            _ => return false,
        }
        true
    }

    /// Arcade-mix the drive request
    fn drive_voltages(&self) -> (i32, i32) {
        let left = (self.throttle_mv + self.turn_mv).clamp(-VOLTAGE_MAX, VOLTAGE_MAX);
        let right = (self.throttle_mv - self.turn_mv).clamp(-VOLTAGE_MAX, VOLTAGE_MAX);
        (left, right)
    }

    /// Watchdog action: let go of everything the driver was holding
    fn relax(&mut self) {
        self.throttle_mv = 0;
        self.turn_mv = 0;
        self.lift = LiftCmd::Idle;
        self.intake = IntakeCmd::Idle;
    }
}

/// Manual-control entry: runs until the driver quits
pub async fn run(
    robot: Robot,
    gate: std::sync::Arc<PhaseGate>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    info!("Controls: W/S drive, A/D turn, 1-3 speed, E/R tray, U/J lift, I/O intake, Q quit");

    enable_raw_mode()?;
    let result = teleop_loop(&robot, &gate).await;
    disable_raw_mode()?;
    result
}

async fn teleop_loop(
    robot: &Robot,
    gate: &PhaseGate,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut input = InputState::new();
    let mut last_movement = Instant::now();
    let mut health = RuntimeHealth::Ok;

    loop {
        // Drain pending key events without blocking the tick
        while event::poll(Duration::ZERO)? {
            if let Event::Key(KeyEvent { code, kind, .. }) = event::read()? {
                let pressed = kind == KeyEventKind::Press || kind == KeyEventKind::Repeat;
                if pressed && input.apply_key(code) {
                    last_movement = Instant::now();
                }
            }
        }
        if input.quit {
            info!("Teleop stopped by driver");
            return Ok(());
        }

        // Watchdog: key repeats stopped, so the driver let go
        if last_movement.elapsed() > INPUT_TIMEOUT {
            input.relax();
            if health != RuntimeHealth::InputStale {
                warn!("Driver input stale, relaxing all requests");
                health = RuntimeHealth::InputStale;
            }
        } else if health != RuntimeHealth::Ok {
            info!("Driver input restored");
            health = RuntimeHealth::Ok;
        }

        // Phase A: the updater samples every free subsystem
        gate.signal_poses();

        // Submit requests; a subsystem owned by a routine is skipped
        if let Ok(mut drive) = robot.drive.try_lock() {
            let (left, right) = input.drive_voltages();
            drive.drive_voltage(left, right);
            match input.tilt.take() {
                Some(TiltRequest::Extend) => drive.tilter_extend(),
                Some(TiltRequest::Retract) => drive.tilter_retract(),
                Some(TiltRequest::DirectVoltage(mv)) => drive.tilter_move_voltage(mv),
                Some(TiltRequest::Hold { bias_mv }) => drive.tilter_hold(bias_mv),
                None => {}
            }
        }
        if let Ok(mut lift) = robot.lift.try_lock() {
            match input.lift {
                LiftCmd::Up => lift.move_voltage(LIFT_UP_MV),
                LiftCmd::Down => lift.move_voltage(LIFT_DOWN_MV),
                LiftCmd::Idle => lift.lock(),
            }
        }
        if let Ok(mut intake) = robot.intake.try_lock() {
            match input.intake {
                IntakeCmd::In => intake.move_voltage(INTAKE_IN_MV),
                IntakeCmd::Out => intake.move_voltage(INTAKE_OUT_MV),
                IntakeCmd::Idle => intake.lock(),
            }
        }

        // Phase B: controllers actuate on the fresh poses
        gate.signal_controllers();

        sleep(TICK).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drive_keys_mix_arcade() {
        let mut input = InputState::new();
        input.apply_key(KeyCode::Char('w'));
        input.apply_key(KeyCode::Char('d'));

        let speed = DRIVE_SPEEDS_MV[1];
        let (left, right) = input.drive_voltages();
        assert_eq!(left, speed + speed / 2);
        assert_eq!(right, speed - speed / 2);
    }

    #[test]
    fn test_speed_keys_select_level() {
        let mut input = InputState::new();
        assert!(!input.apply_key(KeyCode::Char('3')));
        input.apply_key(KeyCode::Char('w'));
        assert_eq!(input.drive_voltages().0, DRIVE_SPEEDS_MV[2]);
    }

    #[test]
    fn test_tray_keys_post_requests() {
        let mut input = InputState::new();
        input.apply_key(KeyCode::Char('e'));
        assert_eq!(input.tilt, Some(TiltRequest::Extend));
        input.apply_key(KeyCode::Char('r'));
        assert_eq!(input.tilt, Some(TiltRequest::Retract));
    }

    #[test]
    fn test_relax_zeroes_held_inputs_only() {
        let mut input = InputState::new();
        input.apply_key(KeyCode::Char('w'));
        input.apply_key(KeyCode::Char('u'));
        input.apply_key(KeyCode::Char('i'));
        input.relax();

        assert_eq!(input.drive_voltages(), (0, 0));
        assert_eq!(input.lift, LiftCmd::Idle);
        assert_eq!(input.intake, IntakeCmd::Idle);
        assert!(!input.quit);
    }

    #[test]
    fn test_quit_keys() {
        let mut input = InputState::new();
        assert!(!input.apply_key(KeyCode::Char('q')));
        assert!(input.quit);
    }
}
