//! The vehicle telemetry & actuation port.
//!
//! Everything the guidance programs know about the vehicle comes through
//! [`VesselPort`], and everything they do to it goes back out through the same
//! trait. Frame conversion is the port's job: a controller names a [`FrameId`]
//! and receives vectors already expressed in it.

use std::collections::HashMap;

use crate::errors::GuidanceResult;
use crate::trajectory_system::body::CelestialBody;
use crate::utils::vector3d::Vector3D;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub u64);

/// Opaque reference-frame handle.
///
/// Axis conventions the controllers rely on:
/// - `Surface`: x up, y north, z east, origin at the vehicle.
/// - `SurfaceVelocity`: y along surface velocity, so `(0, -1, 0)` is retrograde.
/// - `Node(id)`: y along the node's burn vector, so `(0, 1, 0)` is the burn direction.
/// - `BodyFixed`: origin at the body's centre, rotating with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameId {
    BodyFixed,
    Surface,
    SurfaceVelocity,
    Node(NodeId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VehicleSituation {
    PreLaunch,
    Landed,
    Splashed,
    Flying,
    SubOrbital,
    Orbiting,
    Escaping,
    Docked,
}

impl VehicleSituation {
    pub fn is_grounded(&self) -> bool {
        matches!(
            self,
            VehicleSituation::PreLaunch | VehicleSituation::Landed | VehicleSituation::Splashed
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttitudeTarget {
    pub frame: FrameId,
    /// Unit vector in `frame`.
    pub direction: Vector3D,
    /// `None` means the controller does not care about roll.
    pub roll: Option<f64>,
}

impl AttitudeTarget {
    /// Points along `direction` (normalised) with free roll.
    pub fn pointing(frame: FrameId, direction: Vector3D) -> Self {
        AttitudeTarget {
            frame,
            direction: direction.normalize(),
            roll: None,
        }
    }
}

/// A planned velocity change as the game currently reports it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ManeuverNode {
    pub id: NodeId,
    pub ut: f64,
    pub prograde: f64,
    pub normal: f64,
    pub radial: f64,
    /// Remaining burn expressed in the node's own frame.
    pub remaining_burn_vector: Vector3D,
}

impl ManeuverNode {
    pub fn delta_v(&self) -> f64 {
        Vector3D::new(self.prograde, self.normal, self.radial).magnitude()
    }

    /// Remaining delta-v along the original burn direction. Goes negative on overshoot.
    pub fn remaining_delta_v(&self) -> f64 {
        self.remaining_burn_vector.y
    }
}

/// Polled state for one control tick. Never carried across ticks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VehicleSnapshot {
    pub ut: f64,
    pub mass: f64,
    pub available_thrust: f64,
    pub max_thrust: f64,
    pub specific_impulse: f64,
    /// Local gravitational acceleration at the vehicle's altitude.
    pub gravity: f64,
    pub mean_altitude: f64,
    pub surface_altitude: f64,
    pub vertical_speed: f64,
    pub horizontal_speed: f64,
    pub speed: f64,
    pub latitude: f64,
    pub longitude: f64,
    pub heading: f64,
    pub situation: VehicleSituation,
}

impl VehicleSnapshot {
    pub fn thrust_to_weight(&self) -> f64 {
        if self.mass <= 0.0 || self.gravity <= 0.0 {
            return 0.0;
        }
        self.available_thrust / (self.mass * self.gravity)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ResourceLevel {
    pub amount: f64,
    pub max: f64,
}

impl ResourceLevel {
    pub fn fraction(&self) -> f64 {
        if self.max <= 0.0 {
            0.0
        } else {
            self.amount / self.max
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct StageResources {
    pub levels: HashMap<String, ResourceLevel>,
}

impl StageResources {
    pub fn has_resource(&self, name: &str) -> bool {
        self.levels.contains_key(name)
    }

    pub fn amount(&self, name: &str) -> f64 {
        self.levels.get(name).map_or(0.0, |level| level.amount)
    }
}

pub trait VesselPort {
    fn snapshot(&self) -> GuidanceResult<VehicleSnapshot>;

    fn body(&self) -> GuidanceResult<CelestialBody>;

    fn position(&self, frame: FrameId) -> GuidanceResult<Vector3D>;

    fn velocity(&self, frame: FrameId) -> GuidanceResult<Vector3D>;

    /// Terrain height above the datum at a latitude/longitude, in degrees.
    fn surface_height(&self, latitude: f64, longitude: f64) -> GuidanceResult<f64>;

    fn abort_requested(&self) -> GuidanceResult<bool>;

    fn brakes_engaged(&self) -> GuidanceResult<bool>;

    fn current_stage(&self) -> GuidanceResult<i32>;

    /// Resources held by parts that decouple in `stage`, not cumulative.
    fn stage_resources(&self, stage: i32) -> GuidanceResult<StageResources>;

    /// Whole-vessel level of a named resource.
    fn resource(&self, name: &str) -> GuidanceResult<ResourceLevel>;

    fn node(&self, id: NodeId) -> GuidanceResult<Option<ManeuverNode>>;

    fn set_throttle(&mut self, throttle: f64) -> GuidanceResult<()>;

    fn set_attitude(&mut self, target: AttitudeTarget) -> GuidanceResult<()>;

    /// Long-lived request; the port resolves it in the background and
    /// must tolerate the same target being requested every tick.
    fn warp_to(&mut self, ut: f64) -> GuidanceResult<()>;

    fn add_node(&mut self, ut: f64, prograde: f64, normal: f64, radial: f64)
        -> GuidanceResult<NodeId>;

    fn remove_node(&mut self, id: NodeId) -> GuidanceResult<()>;

    fn activate_next_stage(&mut self) -> GuidanceResult<()>;

    fn set_abort(&mut self, abort: bool) -> GuidanceResult<()>;

    fn set_brakes(&mut self, brakes: bool) -> GuidanceResult<()>;

    fn set_gear(&mut self, deployed: bool) -> GuidanceResult<()>;

    fn set_solar_panels(&mut self, deployed: bool) -> GuidanceResult<()>;

    fn set_wheel_throttle(&mut self, throttle: f64) -> GuidanceResult<()>;

    fn set_wheel_steering(&mut self, steering: f64) -> GuidanceResult<()>;
}
