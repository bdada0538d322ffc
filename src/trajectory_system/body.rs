use crate::constants::{KERBIN_GRAVITATIONAL_PARAMETER, KERBIN_RADIUS};

#[derive(Clone, Debug, PartialEq)]
pub struct CelestialBody {
    pub name: String,
    pub equatorial_radius: f64,
    pub gravitational_parameter: f64,
}

impl CelestialBody {
    pub fn new(name: String, equatorial_radius: f64, gravitational_parameter: f64) -> Self {
        CelestialBody {
            name,
            equatorial_radius,
            gravitational_parameter,
        }
    }

    pub fn kerbin() -> Self {
        CelestialBody::new(
            "Kerbin".to_string(),
            KERBIN_RADIUS,
            KERBIN_GRAVITATIONAL_PARAMETER,
        )
    }

    /// A body whose surface gravity is `surface_gravity`, for flat-ground scenarios.
    pub fn with_surface_gravity(name: String, equatorial_radius: f64, surface_gravity: f64) -> Self {
        CelestialBody::new(
            name,
            equatorial_radius,
            surface_gravity * equatorial_radius.powi(2),
        )
    }

    pub fn surface_gravity(&self) -> f64 {
        self.gravitational_parameter / self.equatorial_radius.powi(2)
    }
}
