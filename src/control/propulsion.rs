//! Rocket-equation burn model: how long a velocity change takes, and how hard
//! to throttle to deliver the last of it without overshooting.

use serde::Deserialize;

use crate::errors::{GuidanceError, GuidanceResult};
use crate::telemetry_system::port::VehicleSnapshot;

/// Propulsion figures the burn model needs, read fresh each tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PropulsionState {
    pub mass: f64,
    pub available_thrust: f64,
    pub specific_impulse: f64,
    /// Gravity used to turn Isp into exhaust velocity.
    pub g: f64,
}

impl PropulsionState {
    pub fn new(mass: f64, available_thrust: f64, specific_impulse: f64, g: f64) -> Self {
        PropulsionState {
            mass,
            available_thrust,
            specific_impulse,
            g,
        }
    }

    pub fn from_snapshot(snapshot: &VehicleSnapshot, g: f64) -> Self {
        PropulsionState::new(
            snapshot.mass,
            snapshot.available_thrust,
            snapshot.specific_impulse,
            g,
        )
    }

    pub fn exhaust_velocity(&self) -> f64 {
        self.specific_impulse * self.g
    }

    /// Mass left after spending `delta_v`.
    fn final_mass(&self, delta_v: f64) -> f64 {
        self.mass * (-delta_v / self.exhaust_velocity()).exp()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaperMode {
    #[default]
    Smooth,
    Stepped,
}

/// Seconds of full available thrust needed to deliver `delta_v`.
pub fn estimate_burn_duration(propulsion: &PropulsionState, delta_v: f64) -> GuidanceResult<f64> {
    if !(propulsion.available_thrust > 0.0) || !(propulsion.exhaust_velocity() > 0.0) {
        return Err(GuidanceError::NoThrustAvailable);
    }
    if delta_v <= 0.0 {
        return Ok(0.0);
    }

    let flow_rate = propulsion.available_thrust / propulsion.exhaust_velocity();
    Ok((propulsion.mass - propulsion.final_mass(delta_v)) / flow_rate)
}

/// Throttle fraction that spreads `remaining_delta_v` over `remaining_time`.
pub fn smooth_throttle(propulsion: &PropulsionState, remaining_delta_v: f64, remaining_time: f64) -> f64 {
    if remaining_delta_v <= 0.0
        || !(propulsion.available_thrust > 0.0)
        || !(propulsion.exhaust_velocity() > 0.0)
    {
        return 0.0;
    }
    if !(remaining_time > 0.0) {
        return 1.0;
    }

    let propellant = propulsion.mass - propulsion.final_mass(remaining_delta_v);
    let thrust = propellant / remaining_time * propulsion.exhaust_velocity();
    (thrust / propulsion.available_thrust).clamp(0.0, 1.0)
}

/// Coarse thrust feathering keyed on thrust-to-weight: the higher the TWR, the
/// earlier the throttle steps down, since one physics tick covers more delta-v.
pub fn stepped_throttle(propulsion: &PropulsionState, remaining_delta_v: f64) -> f64 {
    if propulsion.mass <= 0.0 {
        return 0.0;
    }
    let twr = propulsion.available_thrust / propulsion.mass;
    if remaining_delta_v < twr / 3.0 {
        0.05
    } else if remaining_delta_v < twr / 2.0 {
        0.1
    } else if remaining_delta_v < twr {
        0.25
    } else {
        1.0
    }
}
