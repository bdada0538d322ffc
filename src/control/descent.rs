//! Suicide-burn descent: hold retrograde, wait until the last moment the
//! engine can still stop the vehicle above the terrain, then burn.

use std::f64::consts::FRAC_PI_2;

use log::{debug, info, trace, warn};

use crate::config::{DescentConfig, TouchdownConfig};
use crate::control::program::{Program, StepResult};
use crate::control::touchdown::SoftTouchdownController;
use crate::errors::{GuidanceError, GuidanceResult};
use crate::telemetry_system::port::{AttitudeTarget, FrameId, VehicleSnapshot, VesselPort};
use crate::trajectory_system::kepler::time_to_radius;
use crate::trajectory_system::terrain::{check_terrain, LatLon};
use crate::utils::vector3d::Vector3D;

/// Best deceleration available along the velocity vector once gravity's
/// share is paid for.
///
/// `thrust_accel` is available thrust over mass and `angle` is the descent
/// angle below the horizon in radians. Straight down this is exactly
/// `thrust_accel - g`.
pub fn effective_deceleration(thrust_accel: f64, g: f64, angle: f64) -> GuidanceResult<f64> {
    if !(thrust_accel > g) {
        return Err(GuidanceError::InsufficientThrust {
            thrust_to_weight: if g > 0.0 { thrust_accel / g } else { f64::INFINITY },
        });
    }
    let gravity_component = 2.0 * g * angle.sin();
    let decel = 0.5
        * (-gravity_component
            + (gravity_component * gravity_component + 4.0 * (thrust_accel.powi(2) - g * g)).sqrt());
    if !(decel > 0.0) {
        return Err(GuidanceError::InsufficientThrust {
            thrust_to_weight: thrust_accel / g,
        });
    }
    Ok(decel)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SuicideBurnSolution {
    /// Radians below the horizon, positive when falling.
    pub angle_from_horizontal: f64,
    pub effective_deceleration: f64,
    pub decel_time: f64,
    /// Infinite when the trajectory never reaches the safe radius.
    pub time_to_impact: f64,
    pub time_to_burn: f64,
    /// Ground distance covered before the vehicle stops.
    pub ground_track: f64,
    pub desired_throttle: f64,
}

/// Solves the burn against a safe altitude above the datum.
pub fn solve_suicide_burn(
    snapshot: &VehicleSnapshot,
    mu: f64,
    radius: f64,
    position: Vector3D,
    velocity: Vector3D,
    safe_altitude: f64,
) -> GuidanceResult<SuicideBurnSolution> {
    if !(snapshot.available_thrust > 0.0) || !(snapshot.mass > 0.0) {
        return Err(GuidanceError::NoThrustAvailable);
    }

    let speed = snapshot.speed;
    // Surface-frame path, x up: its angle from up, less a right angle, is the dip below the horizon.
    let path = Vector3D::new(snapshot.vertical_speed, snapshot.horizontal_speed, 0.0);
    let angle = if speed > 0.0 {
        path.angle_between(&Vector3D::new(1.0, 0.0, 0.0)) - FRAC_PI_2
    } else {
        FRAC_PI_2
    };

    let thrust_accel = snapshot.available_thrust / snapshot.mass;
    let decel = effective_deceleration(thrust_accel, snapshot.gravity, angle)?;
    let decel_time = speed / decel;

    let time_to_impact = time_to_radius(mu, position, velocity, radius + safe_altitude).unwrap_or(f64::INFINITY);
    let time_to_burn = time_to_impact - decel_time;

    let ground_track = if time_to_impact.is_finite() {
        snapshot.horizontal_speed * (time_to_burn.max(0.0) + 0.5 * decel_time)
    } else {
        0.0
    };

    let desired_throttle = if time_to_impact <= 0.0 {
        1.0
    } else if time_to_impact.is_finite() {
        (decel_time / time_to_impact).clamp(0.0, 1.0)
    } else {
        0.0
    };

    Ok(SuicideBurnSolution {
        angle_from_horizontal: angle,
        effective_deceleration: decel,
        decel_time,
        time_to_impact,
        time_to_burn,
        ground_track,
        desired_throttle,
    })
}

/// Flies the suicide burn down to a low speed, then yields to
/// [`SoftTouchdownController`] through [`DescentController::hand_off`].
///
/// Each tick the terrain under the projected ground track is rescanned with
/// the previous tick's track length and the burn is re-solved against it.
/// The terrain scan is a sampled margin and can miss narrow peaks.
#[derive(Debug)]
pub struct DescentController {
    config: DescentConfig,
    safe_altitude: f64,
    solution: Option<SuicideBurnSolution>,
    burning: bool,
    done: bool,
}

impl DescentController {
    pub fn new(port: &mut dyn VesselPort, config: DescentConfig) -> GuidanceResult<Self> {
        config.validate()?;
        let snapshot = port.snapshot()?;
        if snapshot.situation.is_grounded() {
            return Err(GuidanceError::NotReady(format!(
                "cannot start a descent while {:?}",
                snapshot.situation
            )));
        }

        let mut controller = DescentController {
            safe_altitude: config.initial_safe_altitude,
            config,
            solution: None,
            burning: false,
            done: false,
        };
        // First estimate against the assumed altitude, then settle on the real terrain.
        controller.solve(port, &snapshot)?;
        controller.rescan_terrain(port, &snapshot)?;

        port.set_attitude(Self::retrograde())?;
        port.set_throttle(0.0)?;
        Ok(controller)
    }

    pub fn is_burning(&self) -> bool {
        self.burning
    }

    pub fn safe_altitude(&self) -> f64 {
        self.safe_altitude
    }

    pub fn solution(&self) -> Option<SuicideBurnSolution> {
        self.solution
    }

    fn retrograde() -> AttitudeTarget {
        AttitudeTarget::pointing(FrameId::SurfaceVelocity, Vector3D::new(0.0, -1.0, 0.0))
    }

    fn solve(&mut self, port: &dyn VesselPort, snapshot: &VehicleSnapshot) -> GuidanceResult<SuicideBurnSolution> {
        let body = port.body()?;
        let solution = solve_suicide_burn(
            snapshot,
            body.gravitational_parameter,
            body.equatorial_radius,
            port.position(FrameId::BodyFixed)?,
            port.velocity(FrameId::BodyFixed)?,
            self.safe_altitude,
        )?;
        self.solution = Some(solution);
        Ok(solution)
    }

    fn rescan_terrain(&mut self, port: &dyn VesselPort, snapshot: &VehicleSnapshot) -> GuidanceResult<()> {
        let ground_track = self.solution.map_or(0.0, |solution| solution.ground_track);
        let surface_velocity = port.velocity(FrameId::Surface)?;
        let bearing = surface_velocity.z.atan2(surface_velocity.y).to_degrees();
        let radius = port.body()?.equatorial_radius;

        let highest = check_terrain(
            port,
            LatLon::new(snapshot.latitude, snapshot.longitude),
            bearing,
            ground_track,
            radius,
            self.config.terrain_samples,
        )?;
        self.safe_altitude = highest + self.config.clearance;
        Ok(())
    }

    /// Consumes the finished descent and starts the touchdown phase with the gear down.
    pub fn hand_off(
        self,
        port: &mut dyn VesselPort,
        config: TouchdownConfig,
    ) -> GuidanceResult<SoftTouchdownController> {
        if !self.done {
            return Err(GuidanceError::NotReady(
                "descent has not slowed enough for touchdown".to_string(),
            ));
        }
        port.set_gear(true)?;
        SoftTouchdownController::new(port, config)
    }
}

impl Program for DescentController {
    fn step(&mut self, port: &mut dyn VesselPort) -> GuidanceResult<StepResult> {
        if self.done {
            return Ok(StepResult::finished(self.describe()));
        }

        let snapshot = port.snapshot()?;
        self.rescan_terrain(port, &snapshot)?;
        let solution = match self.solve(port, &snapshot) {
            Ok(solution) => solution,
            Err(err @ GuidanceError::InsufficientThrust { .. }) => {
                warn!("Descent cannot be arrested: {}", err);
                return Err(err);
            }
            Err(err) => return Err(err),
        };
        trace!(
            "Descent: tti {:.2} s, decel {:.2} s, safe alt {:.1} m, throttle {:.3}",
            solution.time_to_impact,
            solution.decel_time,
            self.safe_altitude,
            solution.desired_throttle
        );

        port.set_attitude(Self::retrograde())?;
        if !self.burning && solution.time_to_burn <= 0.0 {
            debug!("Suicide burn started {:.2} s before impact", solution.time_to_impact);
            self.burning = true;
        }
        if self.burning {
            port.set_throttle(solution.desired_throttle)?;
        }

        if snapshot.speed < self.config.completion_speed {
            info!("Descent complete at {:.1} m/s", snapshot.speed);
            self.done = true;
            return Ok(StepResult::finished(self.describe()));
        }
        Ok(StepResult::running(self.describe()))
    }

    fn describe(&self) -> Vec<String> {
        let mut lines = vec![self.name().to_string()];
        if let Some(solution) = self.solution {
            lines.push(format!("mxDcl: {:.2}", solution.effective_deceleration));
            lines.push(format!("brnDr: {:.2}", solution.decel_time));
            lines.push(format!("ttimp: {:.2}", solution.time_to_impact));
            lines.push(format!("grTrk: {:.2}", solution.ground_track));
            lines.push(format!("dsrTh: {:.2}", solution.desired_throttle));
        }
        lines.push(format!("alt  : {:.2}", self.safe_altitude));
        lines
    }

    fn name(&self) -> &str {
        "Descend"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry_system::port::VehicleSituation;
    use crate::telemetry_system::simulated::{SimStage, SimulatedVessel};
    use approx::assert_relative_eq;

    const G: f64 = 9.81;

    fn falling_snapshot(twr: f64) -> VehicleSnapshot {
        VehicleSnapshot {
            ut: 0.0,
            mass: 1_000.0,
            available_thrust: twr * 1_000.0 * G,
            max_thrust: twr * 1_000.0 * G,
            specific_impulse: 300.0,
            gravity: G,
            mean_altitude: 5_000.0,
            surface_altitude: 5_000.0,
            vertical_speed: -50.0,
            horizontal_speed: 0.0,
            speed: 50.0,
            latitude: 0.0,
            longitude: 0.0,
            heading: 0.0,
            situation: VehicleSituation::Flying,
        }
    }

    #[test]
    fn test_vertical_fall_with_twr_two() {
        let snapshot = falling_snapshot(2.0);
        let radius = 600_000.0;
        let solution = solve_suicide_burn(
            &snapshot,
            G * radius * radius,
            radius,
            Vector3D::new(radius + 5_000.0, 0.0, 0.0),
            Vector3D::new(-50.0, 0.0, 0.0),
            0.0,
        )
        .unwrap();
        // Straight down at TWR 2 the quadratic collapses to 2g - g, so the
        // bound is met with equality; any shallower path clears it strictly.
        assert_relative_eq!(solution.angle_from_horizontal, FRAC_PI_2, max_relative = 1e-12);
        assert_relative_eq!(solution.effective_deceleration, G, max_relative = 1e-12);
        assert!(solution.effective_deceleration >= G - 1e-9);
        assert!(solution.time_to_burn > 0.0);
        assert!((0.0..=1.0).contains(&solution.desired_throttle));
    }

    #[test]
    fn test_shallow_descent_exceeds_g() {
        let snapshot = VehicleSnapshot {
            vertical_speed: -30.0,
            horizontal_speed: 40.0,
            ..falling_snapshot(2.0)
        };
        let radius = 600_000.0;
        let solution = solve_suicide_burn(
            &snapshot,
            G * radius * radius,
            radius,
            Vector3D::new(radius + 5_000.0, 0.0, 0.0),
            Vector3D::new(-30.0, 40.0, 0.0),
            0.0,
        )
        .unwrap();
        assert_relative_eq!(solution.angle_from_horizontal, 0.6f64.asin(), max_relative = 1e-9);
        assert!(solution.effective_deceleration > G);
    }

    #[test]
    fn test_horizontal_flight_gets_more_than_net_thrust() {
        let decel = effective_deceleration(2.0 * G, G, 0.0).unwrap();
        assert_relative_eq!(decel, (3.0f64).sqrt() * G, max_relative = 1e-12);
    }

    #[test]
    fn test_twr_below_one_is_flagged() {
        let snapshot = falling_snapshot(0.8);
        let result = solve_suicide_burn(
            &snapshot,
            3.5316e12,
            600_000.0,
            Vector3D::new(605_000.0, 0.0, 0.0),
            Vector3D::new(-50.0, 0.0, 0.0),
            0.0,
        );
        match result {
            Err(GuidanceError::InsufficientThrust { thrust_to_weight }) => {
                assert_relative_eq!(thrust_to_weight, 0.8, max_relative = 1e-12)
            }
            other => panic!("expected InsufficientThrust, got {:?}", other),
        }
    }

    #[test]
    fn test_rising_vehicle_never_reaches_safe_radius() {
        let mut snapshot = falling_snapshot(2.0);
        snapshot.vertical_speed = 0.0;
        snapshot.horizontal_speed = 5_000.0;
        snapshot.speed = 5_000.0;
        let solution = solve_suicide_burn(
            &snapshot,
            3.5316e12,
            600_000.0,
            Vector3D::new(605_000.0, 0.0, 0.0),
            Vector3D::new(0.0, 5_000.0, 0.0),
            0.0,
        )
        .unwrap();
        assert!(solution.time_to_impact.is_infinite());
        assert_eq!(solution.desired_throttle, 0.0);
    }

    #[test]
    fn test_waits_then_latches_burn() {
        let mut vessel = SimulatedVessel::flying(G, 5_000.0, vec![SimStage::new(2_000.0, 1_000.0, 60_000.0, 300.0)])
            .with_velocity(Vector3D::new(-50.0, 0.0, 0.0));
        let mut descent = DescentController::new(&mut vessel, DescentConfig::default()).unwrap();
        assert_relative_eq!(descent.safe_altitude(), 25.0);

        descent.step(&mut vessel).unwrap();
        assert!(!descent.is_burning());
        assert_eq!(vessel.throttle(), 0.0);

        let mut ticks = 0;
        while !descent.is_burning() && ticks < 10_000 {
            vessel.advance(0.05);
            descent.step(&mut vessel).unwrap();
            ticks += 1;
        }
        assert!(descent.is_burning());
        assert!(vessel.throttle() > 0.0);
        assert!(vessel.kinematics().get_altitude() > 25.0);
    }

    #[test]
    fn test_terrain_raises_safe_altitude() {
        let mut vessel = SimulatedVessel::flying(G, 5_000.0, vec![SimStage::new(2_000.0, 1_000.0, 60_000.0, 300.0)])
            .with_velocity(Vector3D::new(-50.0, 100.0, 0.0))
            .with_terrain(|lat, _| if lat > 0.01 { 800.0 } else { 100.0 });
        let descent = DescentController::new(&mut vessel, DescentConfig::default()).unwrap();
        assert_relative_eq!(descent.safe_altitude(), 825.0);
    }

    #[test]
    fn test_hand_off_requires_low_speed() {
        let mut vessel = SimulatedVessel::flying(G, 5_000.0, vec![SimStage::new(2_000.0, 1_000.0, 60_000.0, 300.0)])
            .with_velocity(Vector3D::new(-50.0, 0.0, 0.0));
        let descent = DescentController::new(&mut vessel, DescentConfig::default()).unwrap();
        assert!(matches!(
            descent.hand_off(&mut vessel, TouchdownConfig::default()),
            Err(GuidanceError::NotReady(_))
        ));
    }
}
