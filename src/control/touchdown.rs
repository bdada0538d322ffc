use log::{debug, info, trace};

use crate::config::TouchdownConfig;
use crate::control::program::{Program, StepResult};
use crate::errors::{GuidanceError, GuidanceResult};
use crate::telemetry_system::port::{AttitudeTarget, FrameId, VehicleSituation, VesselPort};
use crate::utils::vector3d::Vector3D;

/// Final approach: a proportional descent-rate law from a few hundred
/// metres down to the ground.
///
/// The commanded sink rate is a tenth of the remaining altitude, capped at
/// the configured maximum. Throttle is the hover throttle plus a
/// proportional correction toward that rate.
#[derive(Debug)]
pub struct SoftTouchdownController {
    config: TouchdownConfig,
    target_rate: f64,
    throttle: f64,
    done: bool,
}

impl SoftTouchdownController {
    pub fn new(port: &mut dyn VesselPort, config: TouchdownConfig) -> GuidanceResult<Self> {
        config.validate()?;
        port.set_attitude(AttitudeTarget::pointing(
            FrameId::SurfaceVelocity,
            Vector3D::new(0.0, -1.0, 0.0),
        ))?;
        Ok(SoftTouchdownController {
            config,
            target_rate: 0.0,
            throttle: 0.0,
            done: false,
        })
    }

    pub fn target_rate(&self) -> f64 {
        self.target_rate
    }

    /// Descent rate (negative, m/s) commanded at `altitude`.
    pub fn safe_descent_rate(&self, altitude: f64) -> f64 {
        (altitude / -self.config.descent_gain).max(-self.config.max_descent_rate)
    }

    /// Retrograde while moving, blending to straight up as speed bleeds off.
    fn attitude(&self, port: &dyn VesselPort, vertical_speed: f64, speed: f64) -> GuidanceResult<AttitudeTarget> {
        let up = Vector3D::new(1.0, 0.0, 0.0);
        if vertical_speed >= 0.0 || speed < 1e-6 {
            return Ok(AttitudeTarget::pointing(FrameId::Surface, up));
        }
        let retrograde = -port.velocity(FrameId::Surface)?.normalize();
        let weight = (speed / self.config.blend_speed).min(1.0);
        Ok(AttitudeTarget::pointing(
            FrameId::Surface,
            retrograde * weight + up * (1.0 - weight),
        ))
    }
}

impl Program for SoftTouchdownController {
    fn step(&mut self, port: &mut dyn VesselPort) -> GuidanceResult<StepResult> {
        if self.done {
            return Ok(StepResult::finished(self.describe()));
        }

        let snapshot = port.snapshot()?;
        if snapshot.situation == VehicleSituation::Landed {
            info!("Landed, {:.1} m above terrain", snapshot.surface_altitude);
            port.set_throttle(0.0)?;
            self.throttle = 0.0;
            self.done = true;
            return Ok(StepResult::finished(self.describe()));
        }
        if !(snapshot.available_thrust > 0.0) {
            port.set_throttle(0.0)?;
            return Err(GuidanceError::NoThrustAvailable);
        }

        let capped = self.target_rate <= -self.config.max_descent_rate;
        self.target_rate = self.safe_descent_rate(snapshot.surface_altitude);
        if capped && self.target_rate > -self.config.max_descent_rate {
            debug!("Touchdown sink rate below cap at {:.1} m", snapshot.surface_altitude);
        }

        let hover_throttle = snapshot.mass * snapshot.gravity / snapshot.available_thrust;
        let correction = self.config.proportional_gain * (self.target_rate - snapshot.vertical_speed);
        self.throttle = (hover_throttle + correction).clamp(0.0, 1.0);
        trace!(
            "Touchdown: alt {:.2} vs {:.2} target {:.2} throttle {:.3}",
            snapshot.surface_altitude,
            snapshot.vertical_speed,
            self.target_rate,
            self.throttle
        );

        let attitude = self.attitude(port, snapshot.vertical_speed, snapshot.speed)?;
        port.set_attitude(attitude)?;
        port.set_throttle(self.throttle)?;

        // Throttle stays as commanded; only ground contact cuts the engine.
        if snapshot.surface_altitude <= self.config.touchdown_height
            && snapshot.vertical_speed.abs() < self.config.landed_speed
        {
            info!(
                "Settled at {:.2} m/s, {:.2} m above terrain",
                snapshot.vertical_speed, snapshot.surface_altitude
            );
            self.done = true;
            return Ok(StepResult::finished(self.describe()));
        }
        Ok(StepResult::running(self.describe()))
    }

    fn describe(&self) -> Vec<String> {
        vec![
            self.name().to_string(),
            format!("thrtl: {:.2}", self.throttle),
            format!("vtgt : {:.2}", self.target_rate),
        ]
    }

    fn name(&self) -> &str {
        "SoftLanding"
    }
}
