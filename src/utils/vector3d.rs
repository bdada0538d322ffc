use std::iter::Sum;
use std::ops::{Add, Div, Mul, Neg, Sub};

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vector3D {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector3D {
    pub const ZERO: Vector3D = Vector3D::new(0.0, 0.0, 0.0);

    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Vector3D { x, y, z }
    }

    pub fn magnitude(&self) -> f64 {
        (self.x.powi(2) + self.y.powi(2) + self.z.powi(2)).sqrt()
    }

    pub fn normalize(&self) -> Self {
        let mag = self.magnitude();
        if mag == 0.0 {
            *self
        } else {
            Vector3D::new(self.x / mag, self.y / mag, self.z / mag)
        }
    }

    pub fn dot(&self, other: &Vector3D) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn cross(&self, other: &Vector3D) -> Vector3D {
        Vector3D::new(
            self.y * other.z - self.z * other.y,
            self.z * other.x - self.x * other.z,
            self.x * other.y - self.y * other.x,
        )
    }

    /// Angle in radians between two vectors, zero if either is degenerate.
    pub fn angle_between(&self, other: &Vector3D) -> f64 {
        let denom = self.magnitude() * other.magnitude();
        if denom == 0.0 {
            return 0.0;
        }
        (self.dot(other) / denom).clamp(-1.0, 1.0).acos()
    }
}

/// Pitch and yaw in degrees to a unit direction: `x` is the zero-pitch,
/// zero-yaw axis, yaw swings towards `y` and pitch towards `z`.
pub fn rpy_to_direction(pitch: f64, yaw: f64) -> Vector3D {
    let (pitch, yaw) = (pitch.to_radians(), yaw.to_radians());
    Vector3D::new(
        yaw.cos() * pitch.cos(),
        yaw.sin() * pitch.cos(),
        pitch.sin(),
    )
}

impl Sum for Vector3D {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Vector3D::ZERO, |a, b| a + b)
    }
}

impl Add for Vector3D {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Vector3D::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }
}

impl Sub for Vector3D {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        Vector3D::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }
}

impl Mul<f64> for Vector3D {
    type Output = Self;

    fn mul(self, scalar: f64) -> Self {
        Vector3D::new(self.x * scalar, self.y * scalar, self.z * scalar)
    }
}

impl Mul<Vector3D> for f64 {
    type Output = Vector3D;

    fn mul(self, vector: Vector3D) -> Vector3D {
        Vector3D::new(self * vector.x, self * vector.y, self * vector.z)
    }
}

impl Div<f64> for Vector3D {
    type Output = Self;

    fn div(self, scalar: f64) -> Self {
        Vector3D::new(self.x / scalar, self.y / scalar, self.z / scalar)
    }
}

impl Neg for Vector3D {
    type Output = Self;

    fn neg(self) -> Self {
        Vector3D::new(-self.x, -self.y, -self.z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_cross_product_is_orthogonal() {
        let a = Vector3D::new(1.0, 2.0, 3.0);
        let b = Vector3D::new(-2.0, 0.5, 4.0);
        let c = a.cross(&b);
        assert_abs_diff_eq!(c.dot(&a), 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(c.dot(&b), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_normalize_zero_vector() {
        assert_eq!(Vector3D::ZERO.normalize(), Vector3D::ZERO);
    }

    #[test]
    fn test_rpy_level_points_along_x() {
        let d = rpy_to_direction(0.0, 0.0);
        assert_abs_diff_eq!(d.x, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(d.y, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(d.z, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_rpy_pitch_and_yaw_axes() {
        let pitched = rpy_to_direction(30.0, 0.0);
        assert_abs_diff_eq!(pitched.z, 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(pitched.y, 0.0, epsilon = 1e-12);
        let yawed = rpy_to_direction(0.0, 90.0);
        assert_abs_diff_eq!(yawed.y, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_angle_between() {
        let a = Vector3D::new(1.0, 0.0, 0.0);
        let b = Vector3D::new(0.0, 0.0, 5.0);
        assert_abs_diff_eq!(a.angle_between(&b), std::f64::consts::FRAC_PI_2, epsilon = 1e-12);
        assert_eq!(a.angle_between(&Vector3D::ZERO), 0.0);
    }
}
