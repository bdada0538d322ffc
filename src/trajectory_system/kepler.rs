//! Two-body time-of-flight to a given radius.
//!
//! Used by the suicide-burn solver to find when the current trajectory
//! crosses the "safe" radius on its way down.

use std::f64::consts::PI;

use crate::utils::vector3d::Vector3D;

const RADIAL_TOLERANCE: f64 = 1e-6;
const PARABOLIC_TOLERANCE: f64 = 1e-9;

/// Seconds until a body-centred trajectory `(position, velocity)` next reaches
/// `target_radius` while descending, or `None` if it never does.
pub fn time_to_radius(mu: f64, position: Vector3D, velocity: Vector3D, target_radius: f64) -> Option<f64> {
    let r = position.magnitude();
    let v = velocity.magnitude();
    if r <= target_radius {
        return Some(0.0);
    }
    if mu <= 0.0 {
        return None;
    }

    let radial_speed = position.dot(&velocity) / r;
    let h = position.cross(&velocity).magnitude();

    // Straight up or down: the conic is degenerate, fall back to a local-gravity ballistic arc.
    if v == 0.0 || h / (r * v) < RADIAL_TOLERANCE {
        return radial_time_to_radius(mu, r, radial_speed, target_radius);
    }

    let p = h * h / mu;
    let e_vec = (position * (v * v - mu / r) - velocity * position.dot(&velocity)) / mu;
    let e = e_vec.magnitude();

    let periapsis = p / (1.0 + e);
    if periapsis > target_radius {
        return None;
    }

    let nu_now = {
        let cos_nu = if e > 0.0 {
            (e_vec.dot(&position) / (e * r)).clamp(-1.0, 1.0)
        } else {
            1.0
        };
        let nu = cos_nu.acos();
        if radial_speed < 0.0 {
            -nu
        } else {
            nu
        }
    };
    let nu_target = -((p / target_radius - 1.0) / e).clamp(-1.0, 1.0).acos();

    if (e - 1.0).abs() < PARABOLIC_TOLERANCE {
        let barker = |nu: f64| {
            let d = (nu / 2.0).tan();
            d + d.powi(3) / 3.0
        };
        let dt = 0.5 * (p.powi(3) / mu).sqrt() * (barker(nu_target) - barker(nu_now));
        return (dt >= 0.0).then_some(dt);
    }

    if e < 1.0 {
        let a = p / (1.0 - e * e);
        let n = (mu / a.powi(3)).sqrt();
        let mean_anomaly = |nu: f64| {
            let big_e = 2.0 * (((1.0 - e) / (1.0 + e)).sqrt() * (nu / 2.0).tan()).atan();
            big_e - e * big_e.sin()
        };
        let dm = (mean_anomaly(nu_target) - mean_anomaly(nu_now)).rem_euclid(2.0 * PI);
        Some(dm / n)
    } else {
        let a = p / (1.0 - e * e);
        let n = (mu / (-a).powi(3)).sqrt();
        let mean_anomaly = |nu: f64| {
            let big_f = 2.0 * (((e - 1.0) / (e + 1.0)).sqrt() * (nu / 2.0).tan()).atanh();
            e * big_f.sinh() - big_f
        };
        let dt = (mean_anomaly(nu_target) - mean_anomaly(nu_now)) / n;
        (dt >= 0.0).then_some(dt)
    }
}

fn radial_time_to_radius(mu: f64, r: f64, radial_speed: f64, target_radius: f64) -> Option<f64> {
    let g = mu / (r * r);
    let drop = r - target_radius;
    // drop + radial_speed * t - g t² / 2 = 0
    let discriminant = radial_speed * radial_speed + 2.0 * g * drop;
    if discriminant < 0.0 {
        return None;
    }
    Some((radial_speed + discriminant.sqrt()) / g)
}
