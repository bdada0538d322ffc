use crate::utils::vector3d::Vector3D;

/// Point-mass state over flat ground: position and velocity are expressed as
/// (up, north, east) from a fixed surface origin.
#[derive(Debug, Clone)]
pub struct Kinematics {
    pub position: Vector3D,
    pub velocity: Vector3D,
    pub acceleration: Vector3D,
    pub time: f64,
}

impl Kinematics {
    pub fn new(position: Vector3D, velocity: Vector3D) -> Self {
        Kinematics {
            position,
            velocity,
            acceleration: Vector3D::ZERO,
            time: 0.0,
        }
    }

    /// Advances one RK4 step with thrust held constant over the step.
    /// `gravity` maps altitude to downward acceleration.
    pub fn update<G>(&mut self, delta_time: f64, thrust: Vector3D, total_mass: f64, gravity: G)
    where
        G: Fn(f64) -> f64,
    {
        let initial_state = (self.position, self.velocity);
        let derivatives = |state: (Vector3D, Vector3D)| {
            let (position, velocity) = state;
            (velocity, Self::calculate_acceleration(position, thrust, total_mass, &gravity))
        };

        let k1 = derivatives(initial_state);
        let k2 = derivatives((
            initial_state.0 + k1.0 * (delta_time / 2.0),
            initial_state.1 + k1.1 * (delta_time / 2.0),
        ));
        let k3 = derivatives((
            initial_state.0 + k2.0 * (delta_time / 2.0),
            initial_state.1 + k2.1 * (delta_time / 2.0),
        ));
        let k4 = derivatives((
            initial_state.0 + k3.0 * delta_time,
            initial_state.1 + k3.1 * delta_time,
        ));

        self.position =
            initial_state.0 + (delta_time / 6.0) * (k1.0 + 2.0 * k2.0 + 2.0 * k3.0 + k4.0);
        self.velocity =
            initial_state.1 + (delta_time / 6.0) * (k1.1 + 2.0 * k2.1 + 2.0 * k3.1 + k4.1);
        self.acceleration =
            Self::calculate_acceleration(self.position, thrust, total_mass, &gravity);

        self.time += delta_time;
    }

    /// Ballistic coast used while time is being warped; the engine is idle.
    pub fn coast<G>(&mut self, duration: f64, gravity: G)
    where
        G: Fn(f64) -> f64,
    {
        let g = gravity(self.get_altitude());
        let down = Vector3D::new(-g, 0.0, 0.0);
        self.position = self.position + self.velocity * duration + down * (0.5 * duration * duration);
        self.velocity = self.velocity + down * duration;
        self.acceleration = down;
        self.time += duration;
    }

    /// Pins the vehicle to the ground at `height`, killing any downward motion.
    pub fn rest_on(&mut self, height: f64) {
        self.position.x = height;
        self.velocity = Vector3D::ZERO;
        self.acceleration = Vector3D::ZERO;
    }

    fn calculate_acceleration<G>(
        position: Vector3D,
        thrust: Vector3D,
        total_mass: f64,
        gravity: &G,
    ) -> Vector3D
    where
        G: Fn(f64) -> f64,
    {
        let gravity_vector = Vector3D::new(-gravity(position.x), 0.0, 0.0);
        thrust / total_mass + gravity_vector
    }

    pub fn get_altitude(&self) -> f64 {
        self.position.x
    }

    pub fn get_vertical_speed(&self) -> f64 {
        self.velocity.x
    }

    pub fn get_horizontal_velocity(&self) -> Vector3D {
        Vector3D::new(0.0, self.velocity.y, self.velocity.z)
    }

    pub fn get_horizontal_speed(&self) -> f64 {
        self.get_horizontal_velocity().magnitude()
    }

    pub fn get_velocity_magnitude(&self) -> f64 {
        self.velocity.magnitude()
    }

    pub fn get_acceleration_magnitude(&self) -> f64 {
        self.acceleration.magnitude()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn constant(g: f64) -> impl Fn(f64) -> f64 {
        move |_| g
    }

    #[test]
    fn test_free_fall() {
        let mut kinematics = Kinematics::new(Vector3D::new(1000.0, 0.0, 0.0), Vector3D::ZERO);
        for _ in 0..100 {
            kinematics.update(0.1, Vector3D::ZERO, 1000.0, constant(9.81));
        }
        assert_relative_eq!(kinematics.get_altitude(), 1000.0 - 0.5 * 9.81 * 100.0, epsilon = 1e-6);
        assert_relative_eq!(kinematics.get_vertical_speed(), -98.1, epsilon = 1e-9);
        assert_relative_eq!(kinematics.time, 10.0, epsilon = 1e-9);
    }

    #[test]
    fn test_thrust_balances_gravity() {
        let mass = 3000.0;
        let mut kinematics = Kinematics::new(Vector3D::new(100.0, 0.0, 0.0), Vector3D::ZERO);
        let thrust = Vector3D::new(mass * 9.81, 0.0, 0.0);
        for _ in 0..50 {
            kinematics.update(0.05, thrust, mass, constant(9.81));
        }
        assert_relative_eq!(kinematics.get_altitude(), 100.0, epsilon = 1e-9);
        assert_relative_eq!(kinematics.get_acceleration_magnitude(), 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_coast_matches_rk4_without_thrust() {
        let mut integrated = Kinematics::new(Vector3D::new(500.0, 0.0, 0.0), Vector3D::new(10.0, 3.0, -4.0));
        let mut coasted = integrated.clone();
        for _ in 0..10 {
            integrated.update(0.5, Vector3D::ZERO, 10.0, constant(1.63));
        }
        coasted.coast(5.0, constant(1.63));
        assert_relative_eq!(integrated.position.x, coasted.position.x, epsilon = 1e-9);
        assert_relative_eq!(integrated.position.z, coasted.position.z, epsilon = 1e-9);
        assert_relative_eq!(coasted.get_horizontal_speed(), 5.0, epsilon = 1e-12);
    }
}
