use std::time::Instant;

use log::trace;

use crate::errors::{GuidanceError, GuidanceResult};

/// PID controller with integral anti-windup and derivative-on-measurement.
///
/// The integral term alone is clamped to `[c_min, c_max]`, and so is the
/// returned output. The derivative acts on the measured value rather than the
/// error, so moving the setpoint does not kick the output.
#[derive(Debug, Clone)]
pub struct PidController {
    kp: f64,
    ki: f64,
    kd: f64,
    c_min: f64,
    c_max: f64,
    setpoint: f64,
    integral: f64,
    last_measured: Option<f64>,
    last_time: Option<f64>,
    output: f64,
    epoch: Instant,
}

impl PidController {
    pub fn new(kp: f64, ki: f64, kd: f64, c_min: f64, c_max: f64) -> GuidanceResult<Self> {
        if !(c_min <= c_max) {
            return Err(GuidanceError::InvalidConfiguration(format!(
                "PID clamp range [{c_min}, {c_max}] is empty"
            )));
        }
        Ok(PidController {
            kp,
            ki,
            kd,
            c_min,
            c_max,
            setpoint: 0.0,
            integral: 0.0f64.clamp(c_min, c_max),
            last_measured: None,
            last_time: None,
            output: 0.0f64.clamp(c_min, c_max),
            epoch: Instant::now(),
        })
    }

    pub fn set_setpoint(&mut self, setpoint: f64) {
        self.setpoint = setpoint;
    }

    pub fn setpoint(&self) -> f64 {
        self.setpoint
    }

    pub fn integral(&self) -> f64 {
        self.integral
    }

    pub fn output(&self) -> f64 {
        self.output
    }

    /// Updates against the wall clock.
    pub fn update(&mut self, measured: f64) -> f64 {
        let now = self.epoch.elapsed().as_secs_f64();
        self.update_at(measured, now)
    }

    /// Updates against a caller-supplied clock (seconds, e.g. game UT).
    /// A non-positive step holds the previous output.
    pub fn update_at(&mut self, measured: f64, now: f64) -> f64 {
        match self.try_update_at(measured, now) {
            Ok(output) => output,
            Err(err) => {
                trace!("PID update skipped: {}", err);
                self.output
            }
        }
    }

    pub fn try_update_at(&mut self, measured: f64, now: f64) -> GuidanceResult<f64> {
        let Some(last_time) = self.last_time else {
            // First sample only establishes the time base.
            self.last_time = Some(now);
            self.last_measured = Some(measured);
            return Ok(self.compute(measured, None));
        };

        let dt = now - last_time;
        if !(dt > 0.0) {
            return Err(GuidanceError::DegenerateTimestep { dt });
        }
        self.last_time = Some(now);
        Ok(self.compute(measured, Some(dt)))
    }

    fn compute(&mut self, measured: f64, dt: Option<f64>) -> f64 {
        let error = self.setpoint - measured;

        let derivative = match (dt, self.last_measured) {
            (Some(dt), Some(last)) => {
                self.integral = (self.integral + self.ki * error * dt).clamp(self.c_min, self.c_max);
                (measured - last) / dt
            }
            _ => 0.0,
        };
        self.last_measured = Some(measured);

        self.output =
            (self.kp * error + self.integral - self.kd * derivative).clamp(self.c_min, self.c_max);
        self.output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn test_rejects_inverted_range() {
        assert!(matches!(
            PidController::new(1.0, 0.0, 0.0, 1.0, -1.0),
            Err(GuidanceError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_pure_proportional() {
        let mut pid = PidController::new(2.0, 0.0, 0.0, -10.0, 10.0).unwrap();
        pid.set_setpoint(1.0);
        assert_relative_eq!(pid.update_at(0.25, 0.0), 1.5);
        assert_relative_eq!(pid.update_at(0.5, 0.1), 1.0);
    }

    #[test]
    fn test_integral_accumulates() {
        let mut pid = PidController::new(0.0, 1.0, 0.0, -10.0, 10.0).unwrap();
        pid.set_setpoint(1.0);
        pid.update_at(0.0, 0.0);
        pid.update_at(0.0, 0.1);
        let out = pid.update_at(0.0, 0.2);
        assert_relative_eq!(out, 0.2, epsilon = 1e-12);
    }

    #[test]
    fn test_derivative_on_measurement_ignores_setpoint_step() {
        let mut pid = PidController::new(0.0, 0.0, 1.0, -100.0, 100.0).unwrap();
        pid.update_at(5.0, 0.0);
        pid.set_setpoint(50.0);
        assert_eq!(pid.update_at(5.0, 0.1), 0.0);
        // Measurement rising at 10 units/s pushes the output down.
        assert_relative_eq!(pid.update_at(6.0, 0.2), -10.0, epsilon = 1e-9);
    }

    #[test]
    fn test_degenerate_timestep_holds_output() {
        let mut pid = PidController::new(1.0, 0.5, 0.1, -10.0, 10.0).unwrap();
        pid.set_setpoint(3.0);
        pid.update_at(0.0, 0.0);
        let held = pid.update_at(1.0, 1.0);
        assert!(matches!(
            pid.try_update_at(2.0, 1.0),
            Err(GuidanceError::DegenerateTimestep { .. })
        ));
        assert_eq!(pid.update_at(2.0, 0.5), held);
        assert_eq!(pid.output(), held);
    }

    #[test]
    fn test_settles_to_zero_at_setpoint() {
        let mut pid = PidController::new(0.8, 0.3, 0.2, 0.0, 1.0).unwrap();
        pid.set_setpoint(42.0);
        let mut out = 1.0;
        for i in 0..50 {
            out = pid.update_at(42.0, i as f64 * 0.05);
        }
        assert_eq!(out, 0.0);
    }

    #[test]
    fn test_integral_never_leaves_clamp_range() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..20 {
            let c_min = rng.gen_range(-5.0..0.0);
            let c_max = rng.gen_range(0.0..5.0);
            let mut pid = PidController::new(
                rng.gen_range(0.0..2.0),
                rng.gen_range(0.0..10.0),
                rng.gen_range(0.0..1.0),
                c_min,
                c_max,
            )
            .unwrap();
            pid.set_setpoint(rng.gen_range(-100.0..100.0));

            let mut now = 0.0;
            for _ in 0..500 {
                now += rng.gen_range(0.001..0.5);
                let out = pid.update_at(rng.gen_range(-1000.0..1000.0), now);
                assert!(pid.integral() >= c_min && pid.integral() <= c_max);
                assert!(out >= c_min && out <= c_max);
            }
        }
    }

    #[test]
    fn test_wall_clock_update_is_finite() {
        let mut pid = PidController::new(1.0, 1.0, 1.0, -1.0, 1.0).unwrap();
        pid.set_setpoint(0.5);
        assert!(pid.update(0.0).is_finite());
        assert!(pid.update(0.1).is_finite());
    }
}
