/*
 * GONIO Toolkit
 * Copyright (C) 2021-onward Christopher Rabotin <christopher.rabotin@gmail.com> et al. (cf. AUTHORS.md)
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 *
 * Documentation: https://nyxspace.com/
 */

use super::Matrix3;

/// The smallest difference between two radians is set to one arcsecond.
pub(crate) const EPSILON_RAD: f64 = 4.8e-6;
/// Equality of f64 for rotations
pub(crate) const EPSILON: f64 = 1e-12;

mod quaternion;
pub use quaternion::Quaternion;

/// Build a 3x3 matrix rotating vectors around the X axis (right hand rule).
pub fn rx(angle_rad: f64) -> Matrix3 {
    let (s, c) = angle_rad.sin_cos();
    Matrix3::new(1.0, 0.0, 0.0, 0.0, c, -s, 0.0, s, c)
}

/// Build a 3x3 matrix rotating vectors around the Y axis (right hand rule).
pub fn ry(angle_rad: f64) -> Matrix3 {
    let (s, c) = angle_rad.sin_cos();
    Matrix3::new(c, 0.0, s, 0.0, 1.0, 0.0, -s, 0.0, c)
}

/// Build a 3x3 matrix rotating vectors around the Z axis (right hand rule).
pub fn rz(angle_rad: f64) -> Matrix3 {
    let (s, c) = angle_rad.sin_cos();
    Matrix3::new(c, -s, 0.0, s, c, 0.0, 0.0, 0.0, 1.0)
}

#[cfg(test)]
pub(crate) fn generate_angles() -> Vec<f64> {
    use core::f64::consts::{FRAC_PI_2, FRAC_PI_3, FRAC_PI_4, FRAC_PI_6, FRAC_PI_8, PI, TAU};
    vec![
        0.0,
        FRAC_PI_8,
        FRAC_PI_6,
        FRAC_PI_4,
        FRAC_PI_3,
        FRAC_PI_2,
        PI,
        -FRAC_PI_8,
        -FRAC_PI_6,
        -FRAC_PI_4,
        -FRAC_PI_3,
        -FRAC_PI_2,
        -PI,
        TAU,
        -TAU,
        2.5 * TAU,
    ]
}

#[cfg(test)]
mod ut_rotation {
    use super::{generate_angles, rx, ry, rz, Quaternion};
    use crate::math::Vector3;
    use core::f64::consts::FRAC_PI_2;

    #[test]
    fn test_active_convention() {
        // Rotating Y a quarter turn around X yields Z.
        assert!((rx(FRAC_PI_2) * Vector3::y() - Vector3::z()).norm() < 1e-12);
        // Rotating Z a quarter turn around Y yields X.
        assert!((ry(FRAC_PI_2) * Vector3::z() - Vector3::x()).norm() < 1e-12);
        // Rotating X a quarter turn around Z yields Y.
        assert!((rz(FRAC_PI_2) * Vector3::x() - Vector3::y()).norm() < 1e-12);
    }

    #[test]
    fn test_matrix_quaternion_recip() {
        for angle in generate_angles() {
            for (m, axis) in [
                (rx(angle), Vector3::x()),
                (ry(angle), Vector3::y()),
                (rz(angle), Vector3::z()),
            ] {
                let q = Quaternion::from_axis_angle(&axis, angle);
                for v in [Vector3::x(), Vector3::y(), Vector3::z()] {
                    assert!(
                        (m * v - q * v).norm() < 1e-10,
                        "axis {axis:?} angle {angle}"
                    );
                }
            }
        }
    }
}
