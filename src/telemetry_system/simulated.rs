//! A deterministic in-process vessel that implements [`VesselPort`].
//!
//! Flat ground, constant gravity, a stack of stages, and perfect attitude
//! control: the commanded direction is the thrust direction on the next
//! [`SimulatedVessel::advance`]. World axes are (up, north, east).

use std::collections::HashMap;

use log::{debug, trace};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::constants::{ELECTRIC_CHARGE, LIQUID_FUEL, STANDARD_GRAVITY};
use crate::errors::{GuidanceError, GuidanceResult};
use crate::telemetry_system::port::{
    AttitudeTarget, FrameId, ManeuverNode, NodeId, ResourceLevel, StageResources,
    VehicleSituation, VehicleSnapshot, VesselPort,
};
use crate::trajectory_system::body::CelestialBody;
use crate::trajectory_system::kinematics::Kinematics;
use crate::utils::vector3d::Vector3D;

const UP: Vector3D = Vector3D::new(1.0, 0.0, 0.0);
const NORTH: Vector3D = Vector3D::new(0.0, 1.0, 0.0);
const EAST: Vector3D = Vector3D::new(0.0, 0.0, 1.0);

const ROVER_ACCELERATION: f64 = 1.0; // m/s² at full wheel throttle
const ROVER_ROLLING_DRAG: f64 = 0.1; // 1/s
const ROVER_BRAKE_DECELERATION: f64 = 3.0; // m/s²
const ROVER_TURN_RATE: f64 = 30.0; // deg/s at full steering
const ROVER_DRAIN_RATE: f64 = 2.0; // charge/s at full wheel throttle
const SOLAR_CHARGE_RATE: f64 = 5.0; // charge/s with panels out
const LANDING_LEG_HEIGHT: f64 = 1.5; // m of ground clearance with gear down

#[derive(Debug, Clone, PartialEq)]
pub struct SimStage {
    pub fuel_mass: f64,
    pub fuel_capacity: f64,
    pub dry_mass: f64,
    pub thrust: f64,
    pub specific_impulse: f64,
    pub resource: String,
}

impl SimStage {
    pub fn new(fuel_mass: f64, dry_mass: f64, thrust: f64, specific_impulse: f64) -> Self {
        SimStage {
            fuel_mass,
            fuel_capacity: fuel_mass,
            dry_mass,
            thrust,
            specific_impulse,
            resource: LIQUID_FUEL.to_string(),
        }
    }

    pub fn with_resource(mut self, resource: &str) -> Self {
        self.resource = resource.to_string();
        self
    }

    pub fn is_depleted(&self) -> bool {
        self.fuel_mass <= 0.0
    }

    pub fn get_total_mass(&self) -> f64 {
        self.fuel_mass + self.dry_mass
    }
}

#[derive(Debug, Clone)]
struct SimNode {
    id: NodeId,
    ut: f64,
    prograde: f64,
    normal: f64,
    radial: f64,
    burn: Vector3D,
    applied: Vector3D,
}

pub struct SimulatedVessel {
    body: CelestialBody,
    gravity: f64,
    in_space: bool,
    kinematics: Kinematics,
    origin: (f64, f64),
    terrain: Box<dyn Fn(f64, f64) -> f64>,
    stages: Vec<SimStage>,
    payload_mass: f64,
    situation: VehicleSituation,
    throttle: f64,
    attitude: Option<AttitudeTarget>,
    nodes: Vec<SimNode>,
    next_node: u64,
    warp_target: Option<f64>,
    abort: bool,
    brakes: bool,
    gear: bool,
    solar_panels: bool,
    wheel_throttle: f64,
    wheel_steering: f64,
    rover_heading: f64,
    electric_charge: ResourceLevel,
    noise: Option<(StdRng, f64)>,
    noise_sample: (f64, f64),
    touchdown_speed: Option<f64>,
    staging_events: usize,
}

impl SimulatedVessel {
    fn base(body: CelestialBody, gravity: f64, stages: Vec<SimStage>) -> Self {
        SimulatedVessel {
            body,
            gravity,
            in_space: false,
            kinematics: Kinematics::new(Vector3D::ZERO, Vector3D::ZERO),
            origin: (0.0, 0.0),
            terrain: Box::new(|_, _| 0.0),
            stages,
            payload_mass: 0.0,
            situation: VehicleSituation::PreLaunch,
            throttle: 0.0,
            attitude: None,
            nodes: Vec::new(),
            next_node: 1,
            warp_target: None,
            abort: false,
            brakes: false,
            gear: false,
            solar_panels: false,
            wheel_throttle: 0.0,
            wheel_steering: 0.0,
            rover_heading: 0.0,
            electric_charge: ResourceLevel::default(),
            noise: None,
            noise_sample: (0.0, 0.0),
            touchdown_speed: None,
            staging_events: 0,
        }
    }

    /// Sitting on flat ground under constant `gravity`.
    pub fn landed(gravity: f64, stages: Vec<SimStage>) -> Self {
        let body = CelestialBody::with_surface_gravity("Flatland".to_string(), 600_000.0, gravity);
        Self::base(body, gravity, stages)
    }

    /// Airborne at `altitude` under constant `gravity`.
    pub fn flying(gravity: f64, altitude: f64, stages: Vec<SimStage>) -> Self {
        let mut vessel = Self::landed(gravity, stages);
        vessel.kinematics.position.x = altitude;
        vessel.situation = VehicleSituation::Flying;
        vessel
    }

    /// Coasting with no gravity and no ground.
    pub fn in_space(stages: Vec<SimStage>) -> Self {
        let mut vessel = Self::base(CelestialBody::kerbin(), 0.0, stages);
        vessel.in_space = true;
        vessel.kinematics.position.x = 100_000.0;
        vessel.situation = VehicleSituation::Orbiting;
        vessel
    }

    pub fn with_body(mut self, body: CelestialBody) -> Self {
        self.body = body;
        self
    }

    pub fn with_payload(mut self, mass: f64) -> Self {
        self.payload_mass = mass;
        self
    }

    pub fn with_velocity(mut self, velocity: Vector3D) -> Self {
        self.kinematics.velocity = velocity;
        self
    }

    pub fn with_terrain<F>(mut self, terrain: F) -> Self
    where
        F: Fn(f64, f64) -> f64 + 'static,
    {
        self.terrain = Box::new(terrain);
        self
    }

    pub fn at_lat_lon(mut self, latitude: f64, longitude: f64) -> Self {
        self.origin = (latitude, longitude);
        self
    }

    pub fn with_electric_charge(mut self, amount: f64, max: f64) -> Self {
        self.electric_charge = ResourceLevel { amount, max };
        self
    }

    /// Uniform noise of `amplitude` on altitude and vertical-speed readings.
    pub fn with_sensor_noise(mut self, seed: u64, amplitude: f64) -> Self {
        self.noise = Some((StdRng::seed_from_u64(seed), amplitude));
        self
    }

    pub fn throttle(&self) -> f64 {
        self.throttle
    }

    pub fn attitude(&self) -> Option<AttitudeTarget> {
        self.attitude
    }

    pub fn warp_target(&self) -> Option<f64> {
        self.warp_target
    }

    pub fn gear(&self) -> bool {
        self.gear
    }

    pub fn solar_panels(&self) -> bool {
        self.solar_panels
    }

    pub fn wheel_throttle(&self) -> f64 {
        self.wheel_throttle
    }

    pub fn wheel_steering(&self) -> f64 {
        self.wheel_steering
    }

    pub fn kinematics(&self) -> &Kinematics {
        &self.kinematics
    }

    pub fn stages(&self) -> &[SimStage] {
        &self.stages
    }

    pub fn staging_events(&self) -> usize {
        self.staging_events
    }

    /// Speed at the moment of the last ground contact.
    pub fn touchdown_speed(&self) -> Option<f64> {
        self.touchdown_speed
    }

    pub fn ut(&self) -> f64 {
        self.kinematics.time
    }

    pub fn get_total_mass(&self) -> f64 {
        self.payload_mass + self.stages.iter().map(SimStage::get_total_mass).sum::<f64>()
    }

    fn active_stage(&self) -> Option<&SimStage> {
        self.stages.first().filter(|stage| !stage.is_depleted())
    }

    fn lat_lon(&self) -> (f64, f64) {
        let radius = self.body.equatorial_radius;
        let lat = self.origin.0 + (self.kinematics.position.y / radius).to_degrees();
        let lon = self.origin.1
            + (self.kinematics.position.z / (radius * lat.to_radians().cos().max(1e-6))).to_degrees();
        (lat, lon)
    }

    fn ground_height(&self) -> f64 {
        let (lat, lon) = self.lat_lon();
        (self.terrain)(lat, lon)
    }

    /// Altitude at which the vessel rests on the ground, standing on its
    /// legs when the gear is down.
    fn contact_height(&self) -> f64 {
        let legs = if self.gear { LANDING_LEG_HEIGHT } else { 0.0 };
        self.ground_height() + legs
    }

    fn node_basis(burn: Vector3D) -> (Vector3D, Vector3D, Vector3D) {
        Self::basis_around(burn.normalize())
    }

    /// Orthonormal (x, y, z) with `y` along `forward`.
    fn basis_around(forward: Vector3D) -> (Vector3D, Vector3D, Vector3D) {
        let reference = if forward.dot(&UP).abs() > 0.99 { NORTH } else { UP };
        let x = (reference - forward * reference.dot(&forward)).normalize();
        let z = x.cross(&forward);
        (x, forward, z)
    }

    fn frame_basis(&self, frame: FrameId) -> (Vector3D, Vector3D, Vector3D) {
        match frame {
            FrameId::SurfaceVelocity => {
                let velocity = self.kinematics.velocity;
                if velocity.magnitude() < 1e-9 {
                    (NORTH, UP, EAST)
                } else {
                    Self::basis_around(velocity.normalize())
                }
            }
            FrameId::Node(id) => self
                .nodes
                .iter()
                .find(|node| node.id == id)
                .map_or((UP, NORTH, EAST), |node| Self::node_basis(node.burn)),
            FrameId::Surface | FrameId::BodyFixed => (UP, NORTH, EAST),
        }
    }

    fn to_world(&self, frame: FrameId, v: Vector3D) -> Vector3D {
        let (x, y, z) = self.frame_basis(frame);
        x * v.x + y * v.y + z * v.z
    }

    fn from_world(&self, frame: FrameId, v: Vector3D) -> Vector3D {
        let (x, y, z) = self.frame_basis(frame);
        Vector3D::new(v.dot(&x), v.dot(&y), v.dot(&z))
    }

    fn thrust_direction(&self) -> Vector3D {
        self.attitude
            .map_or(UP, |target| self.to_world(target.frame, target.direction).normalize())
    }

    /// Advances the simulation by `delta_time` seconds of game time, or
    /// resolves a pending warp request if the engine is idle.
    pub fn advance(&mut self, delta_time: f64) {
        if let Some(target) = self.warp_target.take() {
            if self.throttle == 0.0 && target > self.kinematics.time {
                let duration = target - self.kinematics.time;
                debug!("Warping {:.1} s", duration);
                if self.situation.is_grounded() && !self.in_space {
                    self.kinematics.time = target;
                } else {
                    let gravity = self.gravity;
                    self.kinematics.coast(duration, |_| gravity);
                    self.settle_on_ground();
                }
                return;
            }
        }

        if self.situation.is_grounded() && !self.in_space {
            self.drive(delta_time);
        }

        let (thrust, burned) = match self.active_stage() {
            Some(stage) if self.throttle > 0.0 && stage.thrust > 0.0 => {
                let thrust = self.throttle * stage.thrust;
                let flow = thrust / (stage.specific_impulse * STANDARD_GRAVITY);
                let burned = (flow * delta_time).min(stage.fuel_mass);
                (thrust * burned / (flow * delta_time), burned)
            }
            _ => (0.0, 0.0),
        };
        let mass = (self.get_total_mass() - burned / 2.0).max(f64::MIN_POSITIVE);
        let thrust_vector = self.thrust_direction() * thrust;

        let grounded = self.situation.is_grounded() && !self.in_space;
        if !grounded || thrust_vector.x > mass * self.gravity {
            let gravity = self.gravity;
            self.kinematics.update(delta_time, thrust_vector, mass, |_| gravity);
            if !self.in_space {
                self.situation = VehicleSituation::Flying;
            }
        } else {
            self.kinematics.time += delta_time;
        }

        if let Some(stage) = self.stages.first_mut() {
            stage.fuel_mass = (stage.fuel_mass - burned).max(0.0);
        }
        let delta_v = thrust_vector / mass * delta_time;
        for node in &mut self.nodes {
            node.applied = node.applied + delta_v;
        }

        self.settle_on_ground();
        self.sample_noise();
        trace!(
            "t={:.2} alt={:.2} vs={:.2} thr={:.3} m={:.1}",
            self.kinematics.time,
            self.kinematics.get_altitude(),
            self.kinematics.get_vertical_speed(),
            self.throttle,
            self.get_total_mass()
        );
    }

    fn settle_on_ground(&mut self) {
        if self.in_space {
            return;
        }
        let contact = self.contact_height();
        if self.kinematics.get_altitude() <= contact && self.situation == VehicleSituation::Flying {
            self.touchdown_speed = Some(self.kinematics.get_velocity_magnitude());
            debug!("Ground contact at {:.2} m/s", self.kinematics.get_velocity_magnitude());
            self.kinematics.rest_on(contact);
            self.situation = VehicleSituation::Landed;
        }
    }

    fn drive(&mut self, delta_time: f64) {
        let mut speed = self.kinematics.get_horizontal_speed();
        let powered = self.electric_charge.amount > 0.0 && !self.brakes;
        let drive = if powered { self.wheel_throttle * ROVER_ACCELERATION } else { 0.0 };
        speed += (drive - ROVER_ROLLING_DRAG * speed) * delta_time;
        if self.brakes {
            speed -= ROVER_BRAKE_DECELERATION * delta_time;
        }
        speed = speed.max(0.0);

        // Positive steering turns left.
        if !self.brakes {
            self.rover_heading = (self.rover_heading - self.wheel_steering * ROVER_TURN_RATE * delta_time)
                .rem_euclid(360.0);
        }
        let heading = self.rover_heading.to_radians();
        self.kinematics.velocity = NORTH * (speed * heading.cos()) + EAST * (speed * heading.sin());
        self.kinematics.position = self.kinematics.position + self.kinematics.velocity * delta_time;
        self.kinematics.position.x = self.contact_height();

        let drain = if powered { self.wheel_throttle.abs() * ROVER_DRAIN_RATE } else { 0.0 };
        let charge = if self.solar_panels { SOLAR_CHARGE_RATE } else { 0.0 };
        self.electric_charge.amount = (self.electric_charge.amount + (charge - drain) * delta_time)
            .clamp(0.0, self.electric_charge.max);
    }

    fn sample_noise(&mut self) {
        if let Some((rng, amplitude)) = self.noise.as_mut() {
            let amplitude = *amplitude;
            self.noise_sample = (
                rng.gen_range(-amplitude..=amplitude),
                rng.gen_range(-amplitude..=amplitude),
            );
        }
    }

    fn node_state(&self, node: &SimNode) -> ManeuverNode {
        let remaining = node.burn - node.applied;
        let (x, y, z) = Self::node_basis(node.burn);
        ManeuverNode {
            id: node.id,
            ut: node.ut,
            prograde: node.prograde,
            normal: node.normal,
            radial: node.radial,
            remaining_burn_vector: Vector3D::new(remaining.dot(&x), remaining.dot(&y), remaining.dot(&z)),
        }
    }
}

impl VesselPort for SimulatedVessel {
    fn snapshot(&self) -> GuidanceResult<VehicleSnapshot> {
        let (lat, lon) = self.lat_lon();
        let velocity = self.kinematics.velocity;
        let heading = if self.kinematics.get_horizontal_speed() > 1e-9 {
            (velocity.z.atan2(velocity.y).to_degrees() + 360.0) % 360.0
        } else {
            self.rover_heading
        };
        let altitude = self.kinematics.get_altitude() + self.noise_sample.0;
        let (thrust, isp) = self
            .active_stage()
            .map_or((0.0, 0.0), |stage| (stage.thrust, stage.specific_impulse));

        Ok(VehicleSnapshot {
            ut: self.kinematics.time,
            mass: self.get_total_mass(),
            available_thrust: thrust,
            max_thrust: thrust,
            specific_impulse: isp,
            gravity: self.gravity,
            mean_altitude: altitude,
            surface_altitude: altitude - self.ground_height(),
            vertical_speed: velocity.x + self.noise_sample.1,
            horizontal_speed: self.kinematics.get_horizontal_speed(),
            speed: velocity.magnitude(),
            latitude: lat,
            longitude: lon,
            heading,
            situation: self.situation,
        })
    }

    fn body(&self) -> GuidanceResult<CelestialBody> {
        Ok(self.body.clone())
    }

    fn position(&self, frame: FrameId) -> GuidanceResult<Vector3D> {
        match frame {
            FrameId::BodyFixed => {
                let p = self.kinematics.position;
                Ok(Vector3D::new(self.body.equatorial_radius + p.x, p.y, p.z))
            }
            _ => Ok(Vector3D::ZERO),
        }
    }

    fn velocity(&self, frame: FrameId) -> GuidanceResult<Vector3D> {
        Ok(self.from_world(frame, self.kinematics.velocity))
    }

    fn surface_height(&self, latitude: f64, longitude: f64) -> GuidanceResult<f64> {
        Ok((self.terrain)(latitude, longitude))
    }

    fn abort_requested(&self) -> GuidanceResult<bool> {
        Ok(self.abort)
    }

    fn brakes_engaged(&self) -> GuidanceResult<bool> {
        Ok(self.brakes)
    }

    fn current_stage(&self) -> GuidanceResult<i32> {
        Ok(self.stages.len() as i32)
    }

    fn stage_resources(&self, stage: i32) -> GuidanceResult<StageResources> {
        let count = self.stages.len() as i32;
        let index = count - 1 - stage;
        let mut levels = HashMap::new();
        if (0..count).contains(&index) {
            let sim_stage = &self.stages[index as usize];
            levels.insert(
                sim_stage.resource.clone(),
                ResourceLevel {
                    amount: sim_stage.fuel_mass,
                    max: sim_stage.fuel_capacity,
                },
            );
        }
        Ok(StageResources { levels })
    }

    fn resource(&self, name: &str) -> GuidanceResult<ResourceLevel> {
        if name == ELECTRIC_CHARGE {
            return Ok(self.electric_charge);
        }
        let (amount, max) = self
            .stages
            .iter()
            .filter(|stage| stage.resource == name)
            .fold((0.0, 0.0), |(amount, max), stage| {
                (amount + stage.fuel_mass, max + stage.fuel_capacity)
            });
        Ok(ResourceLevel { amount, max })
    }

    fn node(&self, id: NodeId) -> GuidanceResult<Option<ManeuverNode>> {
        Ok(self
            .nodes
            .iter()
            .find(|node| node.id == id)
            .map(|node| self.node_state(node)))
    }

    fn set_throttle(&mut self, throttle: f64) -> GuidanceResult<()> {
        if !(0.0..=1.0).contains(&throttle) {
            return Err(GuidanceError::Port(format!("throttle {throttle} out of range")));
        }
        self.throttle = throttle;
        Ok(())
    }

    fn set_attitude(&mut self, target: AttitudeTarget) -> GuidanceResult<()> {
        self.attitude = Some(target);
        Ok(())
    }

    fn warp_to(&mut self, ut: f64) -> GuidanceResult<()> {
        self.warp_target = Some(ut);
        Ok(())
    }

    fn add_node(&mut self, ut: f64, prograde: f64, normal: f64, radial: f64) -> GuidanceResult<NodeId> {
        let id = NodeId(self.next_node);
        self.next_node += 1;
        let prograde_axis = if self.kinematics.velocity.magnitude() > 1e-9 {
            self.kinematics.velocity.normalize()
        } else {
            NORTH
        };
        let (radial_axis, _, normal_axis) = Self::basis_around(prograde_axis);
        self.nodes.push(SimNode {
            id,
            ut,
            prograde,
            normal,
            radial,
            burn: prograde_axis * prograde + normal_axis * normal + radial_axis * radial,
            applied: Vector3D::ZERO,
        });
        Ok(id)
    }

    fn remove_node(&mut self, id: NodeId) -> GuidanceResult<()> {
        self.nodes.retain(|node| node.id != id);
        Ok(())
    }

    fn activate_next_stage(&mut self) -> GuidanceResult<()> {
        if self.stages.is_empty() {
            return Err(GuidanceError::Port("no stages left".to_string()));
        }
        let dropped = self.stages.remove(0);
        self.staging_events += 1;
        debug!("Staged, dropped {:.1} kg", dropped.get_total_mass());
        Ok(())
    }

    fn set_abort(&mut self, abort: bool) -> GuidanceResult<()> {
        self.abort = abort;
        Ok(())
    }

    fn set_brakes(&mut self, brakes: bool) -> GuidanceResult<()> {
        self.brakes = brakes;
        Ok(())
    }

    fn set_gear(&mut self, deployed: bool) -> GuidanceResult<()> {
        self.gear = deployed;
        Ok(())
    }

    fn set_solar_panels(&mut self, deployed: bool) -> GuidanceResult<()> {
        self.solar_panels = deployed;
        Ok(())
    }

    fn set_wheel_throttle(&mut self, throttle: f64) -> GuidanceResult<()> {
        self.wheel_throttle = throttle.clamp(-1.0, 1.0);
        Ok(())
    }

    fn set_wheel_steering(&mut self, steering: f64) -> GuidanceResult<()> {
        self.wheel_steering = steering.clamp(-1.0, 1.0);
        Ok(())
    }
}
