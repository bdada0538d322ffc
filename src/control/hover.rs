use log::{debug, info, trace, warn};

use crate::config::HoverConfig;
use crate::control::program::{Program, StepResult};
use crate::errors::{GuidanceError, GuidanceResult};
use crate::telemetry_system::port::{
    AttitudeTarget, FrameId, VehicleSituation, VehicleSnapshot, VesselPort,
};
use crate::utils::vector3d::{rpy_to_direction, Vector3D};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoverMode {
    Holding,
    Braking,
    Descending,
    Landed,
}

/// Holds a target height above terrain until the operator aborts.
///
/// Throttle follows F = m * a with `a = g - vertical_speed + altitude_error`.
/// With the brakes on, the vehicle tilts against its horizontal velocity,
/// up to `max_deflection_deg`, until that velocity is within tolerance. An
/// abort lowers the target by `descent_step` every `descent_interval`
/// seconds of game time and ends the program on the ground.
#[derive(Debug)]
pub struct HoverController {
    config: HoverConfig,
    target_altitude: f64,
    mode: HoverMode,
    last_descent_step: Option<f64>,
    throttle: f64,
}

impl HoverController {
    pub fn new(port: &mut dyn VesselPort, config: HoverConfig) -> GuidanceResult<Self> {
        config.validate()?;
        let snapshot = port.snapshot()?;
        if matches!(
            snapshot.situation,
            VehicleSituation::Splashed | VehicleSituation::Docked
        ) {
            return Err(GuidanceError::NotReady(format!(
                "cannot hover while {:?}",
                snapshot.situation
            )));
        }

        port.set_throttle(0.0)?;
        port.set_gear(false)?;
        port.set_attitude(Self::up())?;

        Ok(HoverController {
            target_altitude: config.target_altitude,
            config,
            mode: HoverMode::Holding,
            last_descent_step: None,
            throttle: 0.0,
        })
    }

    pub fn mode(&self) -> HoverMode {
        self.mode
    }

    pub fn target_altitude(&self) -> f64 {
        self.target_altitude
    }

    fn up() -> AttitudeTarget {
        AttitudeTarget::pointing(FrameId::Surface, Vector3D::new(1.0, 0.0, 0.0))
    }

    fn transition(&mut self, mode: HoverMode) {
        if self.mode != mode {
            debug!("Hover: {:?} -> {:?}", self.mode, mode);
            self.mode = mode;
        }
    }

    /// Throttle that makes the vertical acceleration cancel the current
    /// vertical speed and close the altitude gap in one second.
    pub fn hover_throttle(&self, snapshot: &VehicleSnapshot) -> GuidanceResult<f64> {
        if !(snapshot.available_thrust > 0.0) {
            return Err(GuidanceError::NoThrustAvailable);
        }
        let altitude_error = self.target_altitude - snapshot.surface_altitude;
        let acceleration = snapshot.gravity - snapshot.vertical_speed + altitude_error;
        Ok((snapshot.mass * acceleration / snapshot.available_thrust).clamp(0.0, 1.0))
    }

    /// Tilt that pushes back against horizontal drift.
    fn braking_attitude(&self, horizontal: Vector3D) -> AttitudeTarget {
        let max = self.config.max_deflection_deg;
        let pitch_offset = (horizontal.z / self.config.horizontal_speed_max * max).clamp(-max, max);
        let yaw_offset = (horizontal.y / self.config.horizontal_speed_max * max).clamp(-max, max);
        AttitudeTarget::pointing(FrameId::Surface, rpy_to_direction(-pitch_offset, -yaw_offset))
    }

    fn descend_on_abort(&mut self, port: &mut dyn VesselPort, snapshot: &VehicleSnapshot) -> GuidanceResult<bool> {
        if self.mode != HoverMode::Descending {
            warn!("Abort requested, descending from {:.1} m", self.target_altitude);
            port.set_gear(true)?;
            self.transition(HoverMode::Descending);
        }

        let due = self
            .last_descent_step
            .map_or(true, |last| snapshot.ut - last >= self.config.descent_interval);
        if due {
            self.target_altitude -= self.config.descent_step;
            self.last_descent_step = Some(snapshot.ut);
        }

        if snapshot.situation == VehicleSituation::Landed {
            info!("Hover abort complete, landed");
            port.set_throttle(0.0)?;
            port.set_abort(false)?;
            self.throttle = 0.0;
            self.transition(HoverMode::Landed);
            return Ok(true);
        }
        Ok(false)
    }
}

impl Program for HoverController {
    fn step(&mut self, port: &mut dyn VesselPort) -> GuidanceResult<StepResult> {
        if self.mode == HoverMode::Landed {
            return Ok(StepResult::finished(self.describe()));
        }

        let snapshot = port.snapshot()?;
        if (self.mode == HoverMode::Descending || port.abort_requested()?)
            && self.descend_on_abort(port, &snapshot)?
        {
            return Ok(StepResult::finished(self.describe()));
        }

        if port.brakes_engaged()? {
            let velocity = port.velocity(FrameId::Surface)?;
            port.set_attitude(self.braking_attitude(velocity))?;
            if snapshot.horizontal_speed <= self.config.horizontal_speed_tolerance {
                port.set_brakes(false)?;
            }
            if self.mode == HoverMode::Holding {
                self.transition(HoverMode::Braking);
            }
        } else {
            port.set_attitude(Self::up())?;
            if self.mode == HoverMode::Braking {
                self.transition(HoverMode::Holding);
            }
        }

        self.throttle = self.hover_throttle(&snapshot)?;
        trace!(
            "Hover: alt {:.2}/{:.2} vs {:.2} throttle {:.3}",
            snapshot.surface_altitude,
            self.target_altitude,
            snapshot.vertical_speed,
            self.throttle
        );
        port.set_throttle(self.throttle)?;
        Ok(StepResult::running(self.describe()))
    }

    fn describe(&self) -> Vec<String> {
        vec![
            self.name().to_string(),
            format!("Mode : {:?}", self.mode),
            format!("tgAlt: {:.1}", self.target_altitude),
            format!("thrtl: {:.3}", self.throttle),
        ]
    }

    fn name(&self) -> &str {
        "Hover"
    }
}
