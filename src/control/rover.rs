use log::{debug, info, trace};

use crate::config::RoverConfig;
use crate::constants::ELECTRIC_CHARGE;
use crate::control::pid::PidController;
use crate::control::program::{Program, StepResult};
use crate::errors::{GuidanceError, GuidanceResult};
use crate::telemetry_system::port::VesselPort;
use crate::trajectory_system::terrain::{
    course_correction, distance_over_surface, heading_for_lat_lon, LatLon,
};

const STOPPED_SPEED: f64 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoverMode {
    Driving,
    /// Braking before the panels come out.
    Stopping,
    Recharging,
    Arrived,
}

/// Drives a landed vehicle to a surface coordinate.
///
/// Steering runs a PID on the signed course correction with the setpoint
/// pinned at zero; wheel throttle runs a PID on ground speed. Low battery
/// parks the rover with solar panels out until the charge recovers.
#[derive(Debug)]
pub struct RoverDriveController {
    config: RoverConfig,
    target: LatLon,
    steering: PidController,
    throttle: PidController,
    mode: RoverMode,
    distance: f64,
}

impl RoverDriveController {
    pub fn new(port: &mut dyn VesselPort, target: LatLon, config: RoverConfig) -> GuidanceResult<Self> {
        config.validate()?;
        let snapshot = port.snapshot()?;
        if !snapshot.situation.is_grounded() {
            return Err(GuidanceError::NotReady(format!(
                "rover must be on the ground, vehicle is {:?}",
                snapshot.situation
            )));
        }

        Ok(RoverDriveController {
            steering: Self::steering_pid()?,
            throttle: Self::throttle_pid(config.max_speed)?,
            config,
            target,
            mode: RoverMode::Driving,
            distance: f64::INFINITY,
        })
    }

    pub fn mode(&self) -> RoverMode {
        self.mode
    }

    pub fn distance(&self) -> f64 {
        self.distance
    }

    /// Fed the signed course correction, so the setpoint stays at zero.
    fn steering_pid() -> GuidanceResult<PidController> {
        PidController::new(0.01, 0.01, 0.001, -1.0, 1.0)
    }

    fn throttle_pid(max_speed: f64) -> GuidanceResult<PidController> {
        let mut pid = PidController::new(0.5, 0.01, 0.001, -1.0, 1.0)?;
        pid.set_setpoint(max_speed);
        Ok(pid)
    }

    fn transition(&mut self, mode: RoverMode) {
        if self.mode != mode {
            debug!("Rover: {:?} -> {:?}", self.mode, mode);
            self.mode = mode;
        }
    }

    /// Polled recharge cycle. Returns true while the rover should stay parked.
    fn recharge(&mut self, port: &mut dyn VesselPort, speed: f64) -> GuidanceResult<bool> {
        let charge = port.resource(ELECTRIC_CHARGE)?;
        match self.mode {
            RoverMode::Driving if charge.max > 0.0 && charge.fraction() < self.config.recharge_low => {
                info!("Battery at {:.1}%, stopping to recharge", charge.fraction() * 100.0);
                port.set_wheel_throttle(0.0)?;
                port.set_brakes(true)?;
                self.transition(RoverMode::Stopping);
                Ok(true)
            }
            RoverMode::Stopping => {
                if speed <= STOPPED_SPEED {
                    port.set_solar_panels(true)?;
                    self.transition(RoverMode::Recharging);
                }
                Ok(true)
            }
            RoverMode::Recharging => {
                if charge.fraction() >= self.config.recharge_high {
                    info!("Battery at {:.1}%, resuming", charge.fraction() * 100.0);
                    port.set_solar_panels(false)?;
                    port.set_brakes(false)?;
                    // Rebuilt so the parked interval stays out of the integrators.
                    self.steering = Self::steering_pid()?;
                    self.throttle = Self::throttle_pid(self.config.max_speed)?;
                    self.transition(RoverMode::Driving);
                    return Ok(false);
                }
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

impl Program for RoverDriveController {
    fn step(&mut self, port: &mut dyn VesselPort) -> GuidanceResult<StepResult> {
        if self.mode == RoverMode::Arrived {
            return Ok(StepResult::finished(self.describe()));
        }

        let snapshot = port.snapshot()?;
        if self.recharge(port, snapshot.speed)? {
            return Ok(StepResult::running(self.describe()));
        }

        let location = LatLon::new(snapshot.latitude, snapshot.longitude);
        let radius = port.body()?.equatorial_radius;
        self.distance = distance_over_surface(self.target, location, radius);
        if self.distance < self.config.arrival_radius {
            info!("Arrived within {:.1} m of target", self.distance);
            port.set_wheel_throttle(0.0)?;
            port.set_brakes(true)?;
            self.transition(RoverMode::Arrived);
            return Ok(StepResult::finished(self.describe()));
        }

        let bearing = heading_for_lat_lon(self.target, location);
        let correction = course_correction(snapshot.heading, bearing);
        let steering = self.steering.update_at(correction, snapshot.ut);
        let throttle = self.throttle.update_at(snapshot.speed, snapshot.ut);
        trace!(
            "Rover: {:.1} m to go, correction {:.1} deg, steer {:.3}, throttle {:.3}",
            self.distance,
            correction,
            steering,
            throttle
        );

        port.set_brakes(false)?;
        port.set_wheel_steering(steering)?;
        port.set_wheel_throttle(throttle)?;
        Ok(StepResult::running(self.describe()))
    }

    fn describe(&self) -> Vec<String> {
        vec![
            self.name().to_string(),
            format!("Mode : {:?}", self.mode),
            format!("dist : {:.1}", self.distance),
        ]
    }

    fn name(&self) -> &str {
        "RoverGo"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry_system::simulated::SimulatedVessel;

    fn rover() -> SimulatedVessel {
        SimulatedVessel::landed(1.63, vec![])
            .with_payload(400.0)
            .with_electric_charge(1_000.0, 1_000.0)
    }

    #[test]
    fn test_requires_ground_contact() {
        let mut vessel = SimulatedVessel::flying(1.63, 100.0, vec![]).with_payload(400.0);
        assert!(matches!(
            RoverDriveController::new(&mut vessel, LatLon::new(0.0, 1.0), RoverConfig::default()),
            Err(GuidanceError::NotReady(_))
        ));
    }

    #[test]
    fn test_steers_towards_target() {
        let mut vessel = rover();
        // Target due east while the rover faces north.
        let mut controller =
            RoverDriveController::new(&mut vessel, LatLon::new(0.0, 0.1), RoverConfig::default()).unwrap();
        controller.step(&mut vessel).unwrap();
        assert!(vessel.wheel_steering() < 0.0);
        assert!(vessel.wheel_throttle() > 0.0);
        assert!(!vessel.brakes_engaged().unwrap());
    }

    #[test]
    fn test_arrives_at_nearby_target() {
        let mut vessel = rover();
        // About 31 m away on a 600 km radius.
        let mut controller =
            RoverDriveController::new(&mut vessel, LatLon::new(0.003, 0.0), RoverConfig::default()).unwrap();
        assert!(controller.step(&mut vessel).unwrap().done);
        assert_eq!(controller.mode(), RoverMode::Arrived);
        assert!(vessel.brakes_engaged().unwrap());
    }

    #[test]
    fn test_low_battery_parks_and_recharges() {
        let mut vessel = SimulatedVessel::landed(1.63, vec![])
            .with_payload(400.0)
            .with_electric_charge(10.0, 1_000.0);
        let mut controller =
            RoverDriveController::new(&mut vessel, LatLon::new(1.0, 0.0), RoverConfig::default()).unwrap();

        controller.step(&mut vessel).unwrap();
        assert_eq!(controller.mode(), RoverMode::Stopping);
        assert!(vessel.brakes_engaged().unwrap());
        assert_eq!(vessel.wheel_throttle(), 0.0);

        controller.step(&mut vessel).unwrap();
        assert_eq!(controller.mode(), RoverMode::Recharging);
        assert!(vessel.solar_panels());

        for _ in 0..1_000 {
            vessel.advance(0.5);
            controller.step(&mut vessel).unwrap();
            if controller.mode() == RoverMode::Driving {
                break;
            }
        }
        assert_eq!(controller.mode(), RoverMode::Driving);
        assert!(!vessel.solar_panels());
        assert!(vessel.resource(ELECTRIC_CHARGE).unwrap().fraction() >= 0.85);
    }
}
