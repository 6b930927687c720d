// Per-joint estimation and control primitives
//
// Provides:
// - Pose bookkeeping with discontinuity-free taring
// - Velocity/acceleration estimation from raw position samples
// - An iterative position PD controller with normalized output

mod filter;
mod pid;
mod pose;

pub use filter::DerivativeFilter;
pub use pid::PosPd;
pub use pose::PoseStore;
