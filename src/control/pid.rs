// Iterative position PD controller with output normalized to [-1, 1].
// Callers scale the output to whatever units the actuator takes.

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct PosPd {
    kp: f64,
    kd: f64,
    target: f64,
    last_error: Option<f64>,
}

impl PosPd {
    pub fn new(kp: f64, kd: f64) -> Self {
        Self {
            kp,
            kd,
            target: 0.0,
            last_error: None,
        }
    }

    pub fn set_target(&mut self, target: f64) {
        self.target = target;
    }

    pub fn target(&self) -> f64 {
        self.target
    }

    /// One controller step against the latest measurement
    pub fn step(&mut self, measured: f64, dt: Duration) -> f64 {
        let dt = dt.as_secs_f64();
        let error = self.target - measured;
        let derivative = match self.last_error {
            // No derivative kick on the first step after construction
            Some(last) if dt > 0.0 => (error - last) / dt,
            _ => 0.0,
        };
        self.last_error = Some(error);
        (self.kp * error + self.kd * derivative).clamp(-1.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: Duration = Duration::from_millis(10);

    #[test]
    fn test_proportional_output() {
        let mut pd = PosPd::new(0.01, 0.0);
        pd.set_target(50.0);
        let out = pd.step(20.0, DT);
        // error = 30, kp * error = 0.3
        assert!((out - 0.3).abs() < 1e-12);
    }

    #[test]
    fn test_output_clamped_to_unit_range() {
        let mut pd = PosPd::new(1.0, 0.0);
        pd.set_target(1000.0);
        assert_eq!(pd.step(0.0, DT), 1.0);
        pd.set_target(-1000.0);
        assert_eq!(pd.step(0.0, DT), -1.0);
    }

    #[test]
    fn test_no_derivative_kick_on_first_step() {
        let mut pd = PosPd::new(0.0, 1.0);
        pd.set_target(10.0);
        assert_eq!(pd.step(0.0, DT), 0.0);
        // Error unchanged on the second step, derivative stays zero
        assert_eq!(pd.step(0.0, DT), 0.0);
        // Error shrinks, derivative goes negative
        assert!(pd.step(5.0, DT) < 0.0);
    }
}
