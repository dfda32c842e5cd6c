//! Quaternion implementation for 3D rotations.
//!
//! This module provides a quaternion implementation for representing and
//! composing rotations on the sphere, including the fractional powers
//! needed to interpolate between two total rotation poles.

use std::ops::Mul;

use nalgebra::Vector3;

/// A quaternion representing a rotation in 3D space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quaternion {
    /// Real/scalar component (w)
    pub w: f64,
    /// First complex component (i)
    pub x: f64,
    /// Second complex component (j)
    pub y: f64,
    /// Third complex component (k)
    pub z: f64,
}

impl Quaternion {
    /// Create a new quaternion
    pub fn new(w: f64, x: f64, y: f64, z: f64) -> Self {
        Self { w, x, y, z }
    }

    /// Create an identity quaternion (no rotation)
    pub fn identity() -> Self {
        Self {
            w: 1.0,
            x: 0.0,
            y: 0.0,
            z: 0.0,
        }
    }

    /// Create a quaternion that rotates vectors by `angle` radians
    /// around `axis` (right-hand rule). The axis must be unit length.
    pub fn from_axis_angle(axis: &Vector3<f64>, angle: f64) -> Self {
        let half_angle = angle / 2.0;
        let sin_half_angle = half_angle.sin();

        Self {
            w: half_angle.cos(),
            x: axis[0] * sin_half_angle,
            y: axis[1] * sin_half_angle,
            z: axis[2] * sin_half_angle,
        }
    }

    /// Calculate the norm (magnitude) of the quaternion
    pub fn norm(&self) -> f64 {
        (self.w * self.w + self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    /// Normalize the quaternion to unit length
    pub fn normalize(&self) -> Self {
        let norm = self.norm();
        if norm.abs() < 1e-10 {
            Self::identity()
        } else {
            Self {
                w: self.w / norm,
                x: self.x / norm,
                y: self.y / norm,
                z: self.z / norm,
            }
        }
    }

    /// Calculate the conjugate of the quaternion,
    /// which is the inverse rotation for a unit quaternion.
    pub fn conjugate(&self) -> Self {
        Self {
            w: self.w,
            x: -self.x,
            y: -self.y,
            z: -self.z,
        }
    }

    /// Calculate the inverse of the quaternion
    pub fn inverse(&self) -> Self {
        let norm_squared = self.w * self.w + self.x * self.x + self.y * self.y + self.z * self.z;
        if norm_squared < 1e-10 {
            Self::identity()
        } else {
            let inv_norm_squared = 1.0 / norm_squared;
            Self {
                w: self.w * inv_norm_squared,
                x: -self.x * inv_norm_squared,
                y: -self.y * inv_norm_squared,
                z: -self.z * inv_norm_squared,
            }
        }
    }

    /// Raise the quaternion to a real power, `exp(t * log(q))`.
    ///
    /// For a unit rotation quaternion this yields the fraction `t` of the
    /// rotation, which is the slerp between the identity and `q`.
    pub fn pow(&self, t: f64) -> Self {
        let norm = self.norm();
        if norm < 1e-12 {
            return Self::identity();
        }

        let vec_norm = (self.x * self.x + self.y * self.y + self.z * self.z).sqrt();
        // angle of the quaternion logarithm, in [0, pi]
        let theta = (vec_norm / norm).atan2(self.w / norm);
        let scale = norm.powf(t);
        let nt = theta * t;

        if vec_norm < 1e-12 {
            // purely real: the rotation axis is undefined
            return Self::new(scale * nt.cos(), 0.0, 0.0, 0.0);
        }

        let s = scale * nt.sin() / vec_norm;
        Self {
            w: scale * nt.cos(),
            x: self.x * s,
            y: self.y * s,
            z: self.z * s,
        }
    }

    /// Rotate a 3D vector using this quaternion
    pub fn rotate_vector(&self, v: &Vector3<f64>) -> Vector3<f64> {
        // Convert vector to pure quaternion (w=0)
        let v_quat = Quaternion::new(0.0, v[0], v[1], v[2]);

        // Perform rotation: q * v * q^(-1)
        let rotated = *self * v_quat * self.conjugate();

        // Extract vector part
        Vector3::new(rotated.x, rotated.y, rotated.z)
    }
}

// Quaternion multiplication
impl Mul for Quaternion {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self::Output {
        Self {
            w: self.w * rhs.w - self.x * rhs.x - self.y * rhs.y - self.z * rhs.z,
            x: self.w * rhs.x + self.x * rhs.w + self.y * rhs.z - self.z * rhs.y,
            y: self.w * rhs.y - self.x * rhs.z + self.y * rhs.w + self.z * rhs.x,
            z: self.w * rhs.z + self.x * rhs.y - self.y * rhs.x + self.z * rhs.w,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use globe::Point;
    use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};

    /// Quaternion of an Euler rotation given by its pole coordinates
    /// and an angle, all in degrees.
    fn euler_quat(lat: f64, lon: f64, angle: f64) -> Quaternion {
        Quaternion::from_axis_angle(&Point::new(lat, lon).vector(), angle.to_radians())
    }

    fn assert_vec_eq(v: Vector3<f64>, w: Vector3<f64>, epsilon: f64) {
        assert!(
            (v - w).norm() < epsilon,
            "vectors differ: got {v:?}, want {w:?}"
        );
    }

    // Box 7-3 of Cox & Hart: a 65 degree rotation about an Euler pole
    // at (-37, -48) carries (20, 130) to (30, 113.2).
    #[test]
    fn test_rotation_about_an_euler_pole() {
        let q = euler_quat(-37.0, -48.0, 65.0);
        let got = q.rotate_vector(&Point::new(20.0, 130.0).vector());
        assert_vec_eq(got, Point::new(30.0, 113.2).vector(), 1e-3);
    }

    #[test]
    fn test_identity_leaves_points_in_place() {
        let q = Quaternion::identity();
        let v = Point::new(-26.0, -65.0).vector();
        assert_vec_eq(q.rotate_vector(&v), v, 1e-12);
    }

    #[test]
    fn test_rotation_quaternions_are_unit() {
        let q = euler_quat(70.5, -18.7, -10.4);
        assert_relative_eq!(q.norm(), 1.0, epsilon = 1e-12);

        // products of unit rotations stay unit
        let prod = q * euler_quat(19.7, -43.8, 19.2);
        assert_relative_eq!(prod.norm(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_conjugate_reverses_a_rotation() {
        let q = euler_quat(-37.0, -48.0, 65.0);
        let v = Point::new(20.0, 130.0).vector();
        let back = q.conjugate().rotate_vector(&q.rotate_vector(&v));
        assert_vec_eq(back, v, 1e-9);

        // the conjugate is the rotation by the opposite angle
        let want = euler_quat(-37.0, -48.0, -65.0);
        let conj = q.conjugate();
        assert_relative_eq!(conj.w, want.w, epsilon = 1e-12);
        assert_relative_eq!(conj.x, want.x, epsilon = 1e-12);
        assert_relative_eq!(conj.y, want.y, epsilon = 1e-12);
        assert_relative_eq!(conj.z, want.z, epsilon = 1e-12);
    }

    #[test]
    fn test_multiplication_composes_rotations() {
        // moving a point through two stage poles one after the other
        // equals applying the composed quaternion
        let q1 = euler_quat(68.0, 129.9, 7.8);
        let q2 = euler_quat(50.8, 142.8, 9.8);
        let v = Point::new(20.0, 130.0).vector();

        let seq = q2.rotate_vector(&q1.rotate_vector(&v));
        let composed = (q2 * q1).rotate_vector(&v);
        assert_vec_eq(seq, composed, 1e-12);
    }

    #[test]
    fn test_inverse_cancels_a_drifted_product() {
        // a long chain of products drifts off unit length; the inverse
        // still cancels it
        let mut q = euler_quat(5.6, -4.7, 38.6);
        for _ in 0..50 {
            q = q * euler_quat(8.9, -26.6, 17.2) * euler_quat(8.9, -26.6, -17.2);
        }

        let id = q * q.inverse();
        assert_relative_eq!(id.w, 1.0, epsilon = 1e-9);
        assert_relative_eq!(id.x, 0.0, epsilon = 1e-9);
        assert_relative_eq!(id.y, 0.0, epsilon = 1e-9);
        assert_relative_eq!(id.z, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_normalize_restores_unit_length() {
        let q = euler_quat(80.8, -8.6, -22.5);
        let drifted = Quaternion::new(q.w * 1.01, q.x * 1.01, q.y * 1.01, q.z * 1.01);

        let n = drifted.normalize();
        assert_relative_eq!(n.norm(), 1.0, epsilon = 1e-12);

        // the rotation itself is unchanged
        let v = Point::new(20.0, 130.0).vector();
        assert_vec_eq(n.rotate_vector(&v), q.rotate_vector(&v), 1e-9);
    }

    #[test]
    fn test_pow_halves_a_rotation() {
        let axis = Vector3::new(0.0, 0.0, 1.0);
        let q = Quaternion::from_axis_angle(&axis, FRAC_PI_2);
        let half = q.pow(0.5);
        let want = Quaternion::from_axis_angle(&axis, FRAC_PI_4);

        assert_relative_eq!(half.w, want.w, epsilon = 1e-10);
        assert_relative_eq!(half.x, want.x, epsilon = 1e-10);
        assert_relative_eq!(half.y, want.y, epsilon = 1e-10);
        assert_relative_eq!(half.z, want.z, epsilon = 1e-10);
    }

    #[test]
    fn test_pow_composes() {
        // q^0.3 * q^0.7 == q
        let axis = Vector3::new(1.0, 2.0, -0.5).normalize();
        let q = Quaternion::from_axis_angle(&axis, 1.234);
        let composed = q.pow(0.3) * q.pow(0.7);

        assert_relative_eq!(composed.w, q.w, epsilon = 1e-10);
        assert_relative_eq!(composed.x, q.x, epsilon = 1e-10);
        assert_relative_eq!(composed.y, q.y, epsilon = 1e-10);
        assert_relative_eq!(composed.z, q.z, epsilon = 1e-10);
    }

    #[test]
    fn test_pow_of_identity() {
        let q = Quaternion::identity().pow(0.37);
        assert_relative_eq!(q.w, 1.0, epsilon = 1e-12);
        assert_relative_eq!(q.x, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_pow_zero_is_identity() {
        let axis = Vector3::new(0.0, 1.0, 0.0);
        let q = Quaternion::from_axis_angle(&axis, 2.0).pow(0.0);
        assert_relative_eq!(q.w, 1.0, epsilon = 1e-12);
        assert_relative_eq!(q.y, 0.0, epsilon = 1e-12);
    }
}
