/*
 * GONIO Toolkit
 * Copyright (C) 2021-onward Christopher Rabotin <christopher.rabotin@gmail.com> et al. (cf. AUTHORS.md)
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 *
 * Documentation: https://nyxspace.com/
 */

use core::f64::consts::PI;

use snafu::ensure;

use crate::constants::{DEFAULT_LATTICE_NM, TAU};
use crate::errors::{DegenerateLatticeSnafu, SampleError, SingularBasisSnafu};
use crate::math::units::{AngleUnit, LengthUnit, Unit, UnitScale};
use crate::math::Matrix3;
use crate::parameter::Parameter;

/// The unit cell of the sample: three lengths (nanometers) and three angles
/// (radians), plus the derived reciprocal basis.
///
/// The cell is valid iff the volume discriminant
/// D = 1 - cos²α - cos²β - cos²γ + 2·cosα·cosβ·cosγ is strictly positive;
/// every constructor and setter maintains that invariant.
#[derive(Clone, Debug)]
pub struct Lattice {
    a: Parameter,
    b: Parameter,
    c: Parameter,
    alpha: Parameter,
    beta: Parameter,
    gamma: Parameter,
}

fn length_parameter(name: &str, value_nm: f64) -> Parameter {
    Parameter::scalar(name, value_nm, 0.0, 1000.0)
        .with_unit(Unit::Length(LengthUnit::Nanometer))
        .with_description("unit cell length")
}

fn angle_parameter(name: &str, value_rad: f64) -> Parameter {
    Parameter::scalar(name, value_rad, 0.0, PI)
        .with_unit(Unit::Angle(AngleUnit::Degree))
        .with_description("unit cell angle")
}

/// Volume discriminant of a cell with the provided angles, in radians.
fn discriminant(alpha: f64, beta: f64, gamma: f64) -> f64 {
    let (ca, cb, cg) = (alpha.cos(), beta.cos(), gamma.cos());
    1.0 - ca * ca - cb * cb - cg * cg + 2.0 * ca * cb * cg
}

impl Lattice {
    /// Builds a triclinic lattice; lengths in nanometers, angles in radians.
    pub fn new(
        a: f64,
        b: f64,
        c: f64,
        alpha: f64,
        beta: f64,
        gamma: f64,
    ) -> Result<Self, SampleError> {
        let d = discriminant(alpha, beta, gamma);
        ensure!(
            d > 0.0 && a > 0.0 && b > 0.0 && c > 0.0,
            DegenerateLatticeSnafu { d }
        );
        Ok(Self {
            a: length_parameter("a", a),
            b: length_parameter("b", b),
            c: length_parameter("c", c),
            alpha: angle_parameter("alpha", alpha),
            beta: angle_parameter("beta", beta),
            gamma: angle_parameter("gamma", gamma),
        })
    }

    /// Builds a cubic lattice of edge `a` nanometers.
    pub fn cubic(a: f64) -> Result<Self, SampleError> {
        Self::new(a, a, a, PI / 2.0, PI / 2.0, PI / 2.0)
    }

    pub fn a(&self) -> &Parameter {
        &self.a
    }

    pub fn b(&self) -> &Parameter {
        &self.b
    }

    pub fn c(&self) -> &Parameter {
        &self.c
    }

    pub fn alpha(&self) -> &Parameter {
        &self.alpha
    }

    pub fn beta(&self) -> &Parameter {
        &self.beta
    }

    pub fn gamma(&self) -> &Parameter {
        &self.gamma
    }

    /// All six cell parameters, in the canonical (a, b, c, α, β, γ) order.
    pub fn parameters(&self) -> [&Parameter; 6] {
        [&self.a, &self.b, &self.c, &self.alpha, &self.beta, &self.gamma]
    }

    /// Replaces the six cell parameters at once, rejecting degenerate cells
    /// without touching the current values.
    pub fn set(
        &mut self,
        a: f64,
        b: f64,
        c: f64,
        alpha: f64,
        beta: f64,
        gamma: f64,
    ) -> Result<(), SampleError> {
        *self = Self::new(a, b, c, alpha, beta, gamma)?;
        Ok(())
    }

    /// The discriminant D of the current cell, strictly positive by construction.
    pub fn d(&self) -> f64 {
        discriminant(
            self.alpha.value(UnitScale::Default),
            self.beta.value(UnitScale::Default),
            self.gamma.value(UnitScale::Default),
        )
    }

    /// Cell volume in nm³: a·b·c·√D.
    pub fn volume(&self) -> f64 {
        self.a.value(UnitScale::Default)
            * self.b.value(UnitScale::Default)
            * self.c.value(UnitScale::Default)
            * self.d().sqrt()
    }

    /// The derived volume, exposed as a read-only parameter.
    pub fn volume_parameter(&self) -> Parameter {
        Parameter::scalar("volume", self.volume(), 0.0, f64::INFINITY)
            .with_description("unit cell volume")
    }

    /// The Busing-Levy B matrix mapping Miller indices to a sample-frame
    /// vector of the reciprocal lattice, scaled by τ = 2π.
    pub fn b_matrix(&self) -> Result<Matrix3, SampleError> {
        let a = self.a.value(UnitScale::Default);
        let b = self.b.value(UnitScale::Default);
        let c = self.c.value(UnitScale::Default);
        let alpha = self.alpha.value(UnitScale::Default);
        let beta = self.beta.value(UnitScale::Default);
        let gamma = self.gamma.value(UnitScale::Default);

        let d = discriminant(alpha, beta, gamma);
        ensure!(d > 0.0, DegenerateLatticeSnafu { d });
        let volume = a * b * c * d.sqrt();

        // Reciprocal cell lengths and angles.
        let a_star = TAU * b * c * alpha.sin() / volume;
        let b_star = TAU * a * c * beta.sin() / volume;
        let c_star = TAU * a * b * gamma.sin() / volume;
        let cos_alpha_star =
            (beta.cos() * gamma.cos() - alpha.cos()) / (beta.sin() * gamma.sin());
        let cos_beta_star =
            (alpha.cos() * gamma.cos() - beta.cos()) / (alpha.sin() * gamma.sin());
        let cos_gamma_star =
            (alpha.cos() * beta.cos() - gamma.cos()) / (alpha.sin() * beta.sin());
        let sin_beta_star = (1.0 - cos_beta_star * cos_beta_star).sqrt();
        let sin_gamma_star = (1.0 - cos_gamma_star * cos_gamma_star).sqrt();

        Ok(Matrix3::new(
            a_star,
            b_star * cos_gamma_star,
            c_star * cos_beta_star,
            0.0,
            b_star * sin_gamma_star,
            -c_star * sin_beta_star * cos_alpha_star,
            0.0,
            0.0,
            TAU / c,
        ))
    }

    /// The inverse of the B matrix, mapping reciprocal-space vectors back to
    /// Miller indices.
    pub fn b_matrix_inverse(&self) -> Result<Matrix3, SampleError> {
        self.b_matrix()?.try_inverse().ok_or_else(|| {
            SingularBasisSnafu {
                action: "inverting B",
            }
            .build()
        })
    }
}

impl Default for Lattice {
    /// A cubic cell of edge [DEFAULT_LATTICE_NM] nanometers.
    fn default() -> Self {
        Self {
            a: length_parameter("a", DEFAULT_LATTICE_NM),
            b: length_parameter("b", DEFAULT_LATTICE_NM),
            c: length_parameter("c", DEFAULT_LATTICE_NM),
            alpha: angle_parameter("alpha", PI / 2.0),
            beta: angle_parameter("beta", PI / 2.0),
            gamma: angle_parameter("gamma", PI / 2.0),
        }
    }
}

#[cfg(test)]
mod ut_lattice {
    use super::{Lattice, Matrix3, TAU};
    use core::f64::consts::PI;

    #[test]
    fn test_cubic_b() {
        let lattice = Lattice::cubic(1.54).unwrap();
        let b = lattice.b_matrix().unwrap();
        let expected = Matrix3::identity() * (TAU / 1.54);
        assert!((b - expected).norm() < 1e-10);
    }

    #[test]
    fn test_degenerate_rejected() {
        // α = β = γ = 180° collapses the cell.
        assert!(Lattice::new(1.0, 1.0, 1.0, PI, PI, PI).is_err());
        assert!(Lattice::new(-1.0, 1.0, 1.0, PI / 2.0, PI / 2.0, PI / 2.0).is_err());
    }

    #[test]
    fn test_b_inverse_round_trip() {
        // Triclinic cell: B · B⁻¹ must be the identity.
        let lattice = Lattice::new(
            1.1,
            1.3,
            1.7,
            80_f64.to_radians(),
            95_f64.to_radians(),
            105_f64.to_radians(),
        )
        .unwrap();
        let b = lattice.b_matrix().unwrap();
        let b_inv = lattice.b_matrix_inverse().unwrap();
        assert!((b * b_inv - Matrix3::identity()).norm() < 1e-10);
    }

    #[test]
    fn test_volume() {
        let lattice = Lattice::cubic(2.0).unwrap();
        assert!((lattice.volume() - 8.0).abs() < 1e-12);
        assert!((lattice.d() - 1.0).abs() < 1e-12);
        assert_eq!(lattice.volume_parameter().name(), "volume");
    }

    #[test]
    fn test_atomic_set() {
        let mut lattice = Lattice::cubic(1.0).unwrap();
        assert!(lattice.set(1.0, 1.0, 1.0, PI, PI, PI).is_err());
        // The rejected set left the cubic cell untouched.
        assert!((lattice.volume() - 1.0).abs() < 1e-12);
    }
}
