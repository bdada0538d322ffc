use crate::errors::GuidanceResult;
use crate::telemetry_system::port::VesselPort;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

impl LatLon {
    pub fn new(lat: f64, lon: f64) -> Self {
        LatLon { lat, lon }
    }
}

/// Point reached by travelling `distance` metres along the great circle
/// leaving `origin` at compass `bearing` (degrees).
pub fn coords_down_bearing(origin: LatLon, bearing: f64, distance: f64, radius: f64) -> LatLon {
    let bearing = bearing.to_radians();
    let lat = origin.lat.to_radians();
    let lon = origin.lon.to_radians();
    let angular = distance / radius;

    let lat2 = (lat.sin() * angular.cos() + lat.cos() * angular.sin() * bearing.cos()).asin();
    let lon2 = lon
        + (bearing.sin() * angular.sin() * lat.cos()).atan2(angular.cos() - lat.sin() * lat2.sin());

    LatLon::new(lat2.to_degrees(), lon2.to_degrees())
}

/// Initial compass bearing (0..360) from `location` towards `target`.
pub fn heading_for_lat_lon(target: LatLon, location: LatLon) -> f64 {
    let lat1 = location.lat.to_radians();
    let lat2 = target.lat.to_radians();
    let diff_lon = (target.lon - location.lon).to_radians();

    let x = diff_lon.sin() * lat2.cos();
    let y = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * diff_lon.cos();

    (x.atan2(y).to_degrees() + 360.0) % 360.0
}

/// Haversine distance over a sphere of `radius`.
pub fn distance_over_surface(target: LatLon, location: LatLon, radius: f64) -> f64 {
    let d_lat = (target.lat - location.lat).to_radians();
    let d_lon = (target.lon - location.lon).to_radians();
    let lat1 = location.lat.to_radians();
    let lat2 = target.lat.to_radians();

    let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * radius * a.sqrt().clamp(0.0, 1.0).asin()
}

/// Signed turn (-180..180) that takes `current_heading` onto `target_bearing`.
pub fn course_correction(current_heading: f64, target_bearing: f64) -> f64 {
    let unadjusted = target_bearing - current_heading;
    if unadjusted < -180.0 {
        unadjusted + 360.0
    } else if unadjusted > 180.0 {
        unadjusted - 360.0
    } else {
        unadjusted
    }
}

/// Highest terrain among `samples` evenly spaced points on the great circle
/// from `origin` out to `distance` along `bearing`, endpoints included.
///
/// This is a coarse margin, not a clearance proof: a peak narrower than the
/// sample spacing is missed.
pub fn check_terrain(
    port: &dyn VesselPort,
    origin: LatLon,
    bearing: f64,
    distance: f64,
    radius: f64,
    samples: usize,
) -> GuidanceResult<f64> {
    let mut highest = port.surface_height(origin.lat, origin.lon)?;
    if samples < 2 || distance <= 0.0 {
        return Ok(highest);
    }

    for i in 1..samples {
        let fraction = i as f64 / (samples - 1) as f64;
        let point = coords_down_bearing(origin, bearing, distance * fraction, radius);
        highest = highest.max(port.surface_height(point.lat, point.lon)?);
    }
    Ok(highest)
}
