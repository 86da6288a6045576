/*
 * GONIO Toolkit
 * Copyright (C) 2021-onward Christopher Rabotin <christopher.rabotin@gmail.com> et al. (cf. AUTHORS.md)
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 *
 * Documentation: https://nyxspace.com/
 */

use crate::math::rotation::EPSILON;
use crate::math::{Matrix3, Vector3, Vector4};
use core::fmt;
use core::ops::Mul;

use super::EPSILON_RAD;

/// A unit quaternion in the Hamiltonian convention, used to compose the
/// rotations of a kinematic chain and to rotate lab-frame vectors.
///
/// Quaternions here act on vectors in the active sense: `q * v` moves the
/// vector `v` by the rotation carried by `q`, with the right hand rule around
/// the rotation axis. Products compose left to right in the order the axes
/// are stacked on the holder, i.e. `q_outer * q_inner` applies the inner
/// rotation first.
#[derive(Clone, Copy, Debug)]
pub struct Quaternion {
    pub w: f64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Quaternion {
    pub const fn identity() -> Self {
        Self {
            w: 1.0,
            x: 0.0,
            y: 0.0,
            z: 0.0,
        }
    }

    /// Creates a new quaternion, normalized on construction.
    pub fn new(w: f64, x: f64, y: f64, z: f64) -> Self {
        Self { w, x, y, z }.normalize()
    }

    /// Creates the quaternion rotating by `angle_rad` around `axis` (right hand rule).
    pub fn from_axis_angle(axis: &Vector3, angle_rad: f64) -> Self {
        let uvec = axis.normalize();
        let (s_theta, c_theta) = (angle_rad / 2.0).sin_cos();

        Self {
            w: c_theta,
            x: s_theta * uvec.x,
            y: s_theta * uvec.y,
            z: s_theta * uvec.z,
        }
        .normalize()
    }

    /// Returns true if the quaternion represents a rotation of zero radians
    pub fn is_zero(&self) -> bool {
        (1.0 - self.w.abs()) < EPSILON
    }

    /// Returns the norm of this quaternion as a scalar.
    pub(crate) fn scalar_norm(&self) -> f64 {
        (self.w * self.w + self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    /// Normalize the quaternion.
    pub fn normalize(&self) -> Self {
        let norm = self.scalar_norm();
        let mut me = *self;
        me.w /= norm;
        me.x /= norm;
        me.y /= norm;
        me.z /= norm;
        me
    }

    /// Compute the conjugate of the quaternion.
    ///
    /// # Note
    /// Because these are unit quaternions, the inverse and the conjugate are identical.
    pub fn conjugate(&self) -> Self {
        Self {
            w: self.w,
            x: -self.x,
            y: -self.y,
            z: -self.z,
        }
    }

    /// Returns the principal line of rotation (a unit vector) and the angle of rotation in radians
    pub fn uvec_angle(&self) -> (Vector3, f64) {
        let half_angle_rad = self.w.clamp(-1.0, 1.0).acos();
        if half_angle_rad.abs() < EPSILON {
            // Prevent divisions by (near) zero
            (Vector3::zeros(), 2.0 * half_angle_rad)
        } else {
            let prv = Vector3::new(self.x, self.y, self.z) / half_angle_rad.sin();

            (prv / prv.norm(), 2.0 * half_angle_rad)
        }
    }

    /// Returns the rotation matrix equivalent to this quaternion, in the same active convention.
    pub fn to_matrix(&self) -> Matrix3 {
        let (w, x, y, z) = (self.w, self.x, self.y, self.z);
        Matrix3::new(
            1.0 - 2.0 * (y * y + z * z),
            2.0 * (x * y - w * z),
            2.0 * (x * z + w * y),
            2.0 * (x * y + w * z),
            1.0 - 2.0 * (x * x + z * z),
            2.0 * (y * z - w * x),
            2.0 * (x * z - w * y),
            2.0 * (y * z + w * x),
            1.0 - 2.0 * (x * x + y * y),
        )
    }

    /// Returns the data of this quaternion as a vector, simplifies lots of computations.
    pub(crate) fn as_vector(&self) -> Vector4 {
        Vector4::new(self.w, self.x, self.y, self.z)
    }
}

impl Mul for Quaternion {
    type Output = Self;

    fn mul(self, rhs: Quaternion) -> Self::Output {
        let s = self.w * rhs.w - self.x * rhs.x - self.y * rhs.y - self.z * rhs.z;
        let i = self.w * rhs.x + self.x * rhs.w + self.y * rhs.z - self.z * rhs.y;
        let j = self.w * rhs.y - self.x * rhs.z + self.y * rhs.w + self.z * rhs.x;
        let k = self.w * rhs.z + self.x * rhs.y - self.y * rhs.x + self.z * rhs.w;

        Quaternion {
            w: s,
            x: i,
            y: j,
            z: k,
        }
    }
}

impl Mul for &Quaternion {
    type Output = Quaternion;

    fn mul(self, other: &Quaternion) -> Quaternion {
        *self * *other
    }
}

impl Mul<Vector3> for Quaternion {
    type Output = Vector3;

    fn mul(self, rhs: Vector3) -> Self::Output {
        let rhs_q = Self {
            w: 0.0,
            x: rhs.x,
            y: rhs.y,
            z: rhs.z,
        };

        let q_rot = ((self * rhs_q) * self.conjugate()).as_vector();

        Vector3::new(q_rot[1], q_rot[2], q_rot[3])
    }
}

impl PartialEq for Quaternion {
    fn eq(&self, other: &Self) -> bool {
        if (self.w - other.w).abs() < 1e-12 && (self.w - 1.0).abs() < 1e-12 {
            true
        } else {
            let (self_uvec, self_angle) = self.uvec_angle();
            let (other_uvec, other_angle) = other.uvec_angle();

            (self_angle - other_angle).abs() < EPSILON_RAD && (self_uvec - other_uvec).norm() <= 1e-12
        }
    }
}

impl fmt::Display for Quaternion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        write!(
            f,
            "[w = {:1.6}, {:1.6}, {:1.6}, {:1.6}]",
            self.w, self.x, self.y, self.z
        )
    }
}

impl Default for Quaternion {
    fn default() -> Self {
        Self::identity()
    }
}

#[cfg(test)]
mod ut_quaternion {
    use super::{Quaternion, Vector3};
    use crate::math::rotation::generate_angles;
    use crate::math::rotate_vector;
    use core::f64::consts::FRAC_PI_2;

    #[test]
    fn test_identity() {
        let q = Quaternion::identity();
        assert!(q.is_zero());
        assert_eq!(q * Vector3::x(), Vector3::x());
    }

    #[test]
    fn test_single_axis_rotations() {
        let q_x = Quaternion::from_axis_angle(&Vector3::x(), FRAC_PI_2);
        // Check the components
        assert!(
            (q_x.as_vector()
                - crate::math::Vector4::new(0.5_f64.sqrt(), 0.5_f64.sqrt(), 0.0, 0.0))
            .norm()
                < 1e-12
        );
        // The rotation axis is invariant.
        assert_eq!(q_x * Vector3::x(), Vector3::x());
        // Active right hand rule: Y rotated a quarter turn about X yields Z.
        assert!((q_x * Vector3::y() - Vector3::z()).norm() < 1e-12);

        let q_y = Quaternion::from_axis_angle(&Vector3::y(), FRAC_PI_2);
        assert!((q_y * Vector3::z() - Vector3::x()).norm() < 1e-12);

        let q_z = Quaternion::from_axis_angle(&Vector3::z(), FRAC_PI_2);
        assert!((q_z * Vector3::x() - Vector3::y()).norm() < 1e-12);
    }

    #[test]
    fn test_composition_order() {
        // q_outer * q_inner applies the inner rotation first.
        let q_inner = Quaternion::from_axis_angle(&Vector3::z(), FRAC_PI_2);
        let q_outer = Quaternion::from_axis_angle(&Vector3::x(), FRAC_PI_2);
        let v = (q_outer * q_inner) * Vector3::x();
        // X -> Y (inner, around Z) -> Z (outer, around X)
        assert!((v - Vector3::z()).norm() < 1e-12);
    }

    #[test]
    fn test_vrotv_recip() {
        // The quaternion sandwich and the axis-angle vector rotation agree.
        let axis = Vector3::new(0.3, -1.2, 0.7);
        for angle in generate_angles() {
            let q = Quaternion::from_axis_angle(&axis, angle);
            for v in [
                Vector3::x(),
                Vector3::y(),
                Vector3::new(1.0, -2.0, 0.5),
            ] {
                let got = q * v;
                let want = rotate_vector(&v, &axis, angle);
                assert!((got - want).norm() < 1e-10, "angle {angle}");
            }
        }
    }

    #[test]
    fn test_to_matrix() {
        for angle in generate_angles() {
            let q = Quaternion::from_axis_angle(&Vector3::new(1.0, 1.0, 0.0), angle);
            let m = q.to_matrix();
            for v in [Vector3::x(), Vector3::y(), Vector3::z()] {
                assert!(((m * v) - (q * v)).norm() < 1e-10, "angle {angle}");
            }
        }
    }

    #[test]
    fn test_conjugate_roundtrip() {
        let q = Quaternion::from_axis_angle(&Vector3::new(0.1, 0.9, -0.4), 1.234);
        let v = Vector3::new(1.0, 2.0, 3.0);
        assert!((q.conjugate() * (q * v) - v).norm() < 1e-12);
    }
}
