// Runtime for the tray-stacker robot
//
// The drivetrain and the tray tilter share two of the four drive motors
// through a differential transmission. This crate arbitrates that shared
// pair tick by tick, estimates every joint's pose, and runs the
// cooperative update protocol that keeps estimation and actuation
// consistent across concurrent control routines.

pub mod autonomous;
pub mod config;
pub mod control;
pub mod messages;
pub mod motor;
pub mod routines;
pub mod runtime;
pub mod subsystems;
pub mod teleop;
pub mod transmission;
