/*
 * GONIO Toolkit
 * Copyright (C) 2021-onward Christopher Rabotin <christopher.rabotin@gmail.com> et al. (cf. AUTHORS.md)
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 *
 * Documentation: https://nyxspace.com/
 */

use core::f64::consts::{PI, TAU};

/// Returns the provided angle bounded between 0 and 2π.
///
/// A negative angle is converted to the positive angle in the equivalent
/// position, e.g. -π/2 becomes 3π/2.
pub fn restrict_pos(angle_rad: f64) -> f64 {
    angle_rad.rem_euclid(TAU)
}

/// Returns the provided angle bounded between -π and +π.
pub fn restrict_sym(angle_rad: f64) -> f64 {
    let mut bounded = angle_rad.rem_euclid(TAU);
    if bounded >= PI {
        bounded -= TAU;
    }
    bounded
}

/// Returns the shortest arc, in radians, between two angles on the circle.
///
/// The result is non negative, symmetric in its arguments, and zero iff the
/// two angles are congruent modulo 2π.
pub fn orthodromic_rad(a_rad: f64, b_rad: f64) -> f64 {
    restrict_sym(b_rad - a_rad).abs()
}

/// Lifts the provided angle into [min, min + 2π).
pub fn smallest_in_range(angle_rad: f64, min_rad: f64) -> f64 {
    min_rad + (angle_rad - min_rad).rem_euclid(TAU)
}

/// Returns the 2π-congruent representative of `angle_rad` which lies inside
/// [min, max] and is the closest to `reference_rad`, or None if the range
/// holds no representative at all.
pub fn closest_in_range(
    angle_rad: f64,
    reference_rad: f64,
    min_rad: f64,
    max_rad: f64,
) -> Option<f64> {
    let mut best: Option<f64> = None;
    let mut candidate = smallest_in_range(angle_rad, min_rad);
    while candidate <= max_rad {
        match best {
            Some(b) if (candidate - reference_rad).abs() >= (b - reference_rad).abs() => {}
            _ => best = Some(candidate),
        }
        candidate += TAU;
    }
    best
}

#[cfg(test)]
mod ut_angles {
    use super::{closest_in_range, orthodromic_rad, restrict_pos, restrict_sym, smallest_in_range};
    use core::f64::consts::{FRAC_PI_2, PI, TAU};

    #[test]
    fn test_restrict() {
        assert!((restrict_pos(-FRAC_PI_2) - 3.0 * FRAC_PI_2).abs() < 1e-12);
        assert!((restrict_sym(3.0 * FRAC_PI_2) - -FRAC_PI_2).abs() < 1e-12);
        assert!(restrict_sym(PI) + PI < 1e-12);
    }

    #[test]
    fn test_orthodromic() {
        assert!((orthodromic_rad(0.1, TAU + 0.1)).abs() < 1e-12);
        assert!((orthodromic_rad(-PI + 0.1, PI - 0.1) - 0.2).abs() < 1e-12);
        // Symmetry
        assert!((orthodromic_rad(1.0, 2.5) - orthodromic_rad(2.5, 1.0)).abs() < 1e-12);
    }

    #[test]
    fn test_smallest_in_range() {
        let lifted = smallest_in_range(5.0 * FRAC_PI_2, -PI);
        assert!((lifted - FRAC_PI_2).abs() < 1e-12);
    }

    #[test]
    fn test_closest_in_range() {
        // Range wider than a full turn: pick the representative nearest the reference.
        let c = closest_in_range(0.0, 5.9, -TAU, TAU).unwrap();
        assert!((c - TAU).abs() < 1e-12);
        // Bounded range with no representative.
        assert!(closest_in_range(FRAC_PI_2, 0.0, -3.0, -2.0).is_none());
        // The representative is within the range and minimal in distance.
        let c = closest_in_range(FRAC_PI_2 + TAU, 0.0, -PI, PI).unwrap();
        assert!((c - FRAC_PI_2).abs() < 1e-12);
    }
}
