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
use core::fmt;

use rand::Rng;
use snafu::ensure;

use crate::errors::{NoRepresentativeSnafu, NotANumberSnafu, OutOfRangeSnafu, ParameterError};
use crate::math::rotation::Quaternion;
use crate::math::units::{AngleUnit, LengthUnit, Unit, UnitScale};
use crate::math::{angles, rotate_vector, Vector3};

/// The geometric effect of a parameter on the kinematic chain it belongs to.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Transformation {
    /// A bare scalar, e.g. a pseudo-axis or a mode parameter.
    None,
    /// A rotation of `value` radians around `axis`, about the `origin` point.
    Rotation { axis: Vector3, origin: Vector3 },
    /// A translation of `value` along `axis`.
    Translation { axis: Vector3 },
}

/// A named, bounded scalar with an optional geometric transformation.
///
/// Values, ranges and randomization all operate in the internal default unit
/// (radian, nanometer, unitless); the `unit` field only drives the user-side
/// conversion of the accessors taking a [UnitScale].
#[derive(Clone, Debug)]
pub struct Parameter {
    name: String,
    value: f64,
    min: f64,
    max: f64,
    fit: bool,
    changed: bool,
    unit: Unit,
    transformation: Transformation,
    description: &'static str,
}

impl Parameter {
    /// Builds a rotation axis with the canonical (-π, π] travel range.
    pub fn rotation(name: &str, axis: Vector3, unit: AngleUnit) -> Self {
        Self {
            name: name.to_string(),
            value: 0.0,
            min: -PI,
            max: PI,
            fit: true,
            changed: true,
            unit: Unit::Angle(unit),
            transformation: Transformation::Rotation {
                axis,
                origin: Vector3::zeros(),
            },
            description: "rotation axis",
        }
    }

    /// Builds a translation axis, bounded to ±1 m.
    pub fn translation(name: &str, axis: Vector3, unit: LengthUnit) -> Self {
        Self {
            name: name.to_string(),
            value: 0.0,
            min: -1e9,
            max: 1e9,
            fit: true,
            changed: true,
            unit: Unit::Length(unit),
            transformation: Transformation::Translation { axis },
            description: "translation axis",
        }
    }

    /// Builds a bare scalar, e.g. a pseudo-axis or a mode-local parameter.
    pub fn scalar(name: &str, value: f64, min: f64, max: f64) -> Self {
        Self {
            name: name.to_string(),
            value,
            min,
            max,
            fit: true,
            changed: true,
            unit: Unit::Unitless,
            transformation: Transformation::None,
            description: "",
        }
    }

    /// Builds an unbounded angle scalar displayed in degrees, e.g. an angular pseudo-axis.
    pub fn angle(name: &str) -> Self {
        Self {
            name: name.to_string(),
            value: 0.0,
            min: -PI,
            max: PI,
            fit: true,
            changed: true,
            unit: Unit::Angle(AngleUnit::Degree),
            transformation: Transformation::None,
            description: "",
        }
    }

    pub fn with_range(mut self, min: f64, max: f64) -> Self {
        self.min = min;
        self.max = max;
        self
    }

    pub fn with_value(mut self, value: f64) -> Self {
        self.value = value;
        self
    }

    pub fn with_unit(mut self, unit: Unit) -> Self {
        self.unit = unit;
        self
    }

    pub fn with_description(mut self, description: &'static str) -> Self {
        self.description = description;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &'static str {
        self.description
    }

    pub fn unit(&self) -> Unit {
        self.unit
    }

    pub fn transformation(&self) -> Transformation {
        self.transformation
    }

    pub fn is_rotation(&self) -> bool {
        matches!(self.transformation, Transformation::Rotation { .. })
    }

    pub fn fit(&self) -> bool {
        self.fit
    }

    pub fn set_fit(&mut self, fit: bool) {
        self.fit = fit;
    }

    pub(crate) fn changed(&self) -> bool {
        self.changed
    }

    pub(crate) fn clear_changed(&mut self) {
        self.changed = false;
    }

    pub fn value(&self, scale: UnitScale) -> f64 {
        match scale {
            UnitScale::Default => self.value,
            UnitScale::User => self.value / self.unit.factor(),
        }
    }

    /// Sets the value of this parameter. NaN is rejected; a bounded
    /// non-rotational parameter additionally rejects out-of-range values.
    /// On rejection the previous value is untouched.
    pub fn set_value(&mut self, value: f64, scale: UnitScale) -> Result<(), ParameterError> {
        ensure!(!value.is_nan(), NotANumberSnafu { name: self.name.as_str() });
        let default = match scale {
            UnitScale::Default => value,
            UnitScale::User => value * self.unit.factor(),
        };
        if !self.is_rotation() {
            ensure!(
                default >= self.min && default <= self.max,
                OutOfRangeSnafu {
                    name: self.name.as_str(),
                    value: default,
                    min: self.min,
                    max: self.max,
                }
            );
        }
        self.value = default;
        self.changed = true;
        Ok(())
    }

    /// Raw value write used by the solver workspace, which wanders outside the
    /// travel ranges while iterating. Range validity is re-established when
    /// candidates are lifted back in range.
    pub(crate) fn set_value_unchecked(&mut self, value: f64) {
        self.value = value;
        self.changed = true;
    }

    pub fn min(&self, scale: UnitScale) -> f64 {
        match scale {
            UnitScale::Default => self.min,
            UnitScale::User => self.min / self.unit.factor(),
        }
    }

    pub fn max(&self, scale: UnitScale) -> f64 {
        match scale {
            UnitScale::Default => self.max,
            UnitScale::User => self.max / self.unit.factor(),
        }
    }

    pub fn set_range(&mut self, min: f64, max: f64, scale: UnitScale) -> Result<(), ParameterError> {
        ensure!(
            !min.is_nan() && !max.is_nan(),
            NotANumberSnafu { name: self.name.as_str() }
        );
        let factor = match scale {
            UnitScale::Default => 1.0,
            UnitScale::User => self.unit.factor(),
        };
        self.min = min * factor;
        self.max = max * factor;
        Ok(())
    }

    /// Draws a uniform value within the travel range.
    pub fn randomize<R: Rng>(&mut self, rng: &mut R) {
        self.value = rng.gen_range(self.min..=self.max);
        self.changed = true;
    }

    /// The quaternion of a rotation at its current angle. None for anything else.
    pub fn quaternion(&self) -> Option<Quaternion> {
        match self.transformation {
            Transformation::Rotation { axis, .. } => {
                Some(Quaternion::from_axis_angle(&axis, self.value))
            }
            _ => None,
        }
    }

    /// Applies this parameter's transformation to a vector: rotations rotate it
    /// about their axis through their origin, translations offset it along
    /// their axis, bare scalars leave it untouched.
    pub fn transform(&self, v: &Vector3) -> Vector3 {
        match self.transformation {
            Transformation::None => *v,
            Transformation::Rotation { axis, origin } => {
                origin + rotate_vector(&(v - origin), &axis, self.value)
            }
            Transformation::Translation { axis } => v + axis * self.value,
        }
    }

    /// Shortest distance between this parameter's value and another value:
    /// shortest arc for rotations, absolute difference otherwise.
    pub fn orthodromic_distance(&self, other_value: f64) -> f64 {
        if self.is_rotation() {
            angles::orthodromic_rad(self.value, other_value)
        } else {
            (other_value - self.value).abs()
        }
    }

    /// For rotations, the current value lifted into [min, min + 2π);
    /// the identity for anything else.
    pub fn smallest_in_range(&self) -> f64 {
        if self.is_rotation() {
            angles::smallest_in_range(self.value, self.min)
        } else {
            self.value
        }
    }

    /// The 2π-congruent representative of the current value inside [min, max]
    /// closest to `reference`, or None when the range holds no representative.
    /// For non-rotations this is the value itself when in range.
    pub fn closest(&self, reference: f64) -> Option<f64> {
        if self.is_rotation() {
            angles::closest_in_range(self.value, reference, self.min, self.max)
        } else if self.value >= self.min && self.value <= self.max {
            Some(self.value)
        } else {
            None
        }
    }

    /// Same as [Self::closest] but raising a structured error when no representative exists.
    pub(crate) fn try_closest(&self, reference: f64) -> Result<f64, ParameterError> {
        self.closest(reference).ok_or_else(|| {
            NoRepresentativeSnafu {
                name: self.name.as_str(),
                value: self.value,
                min: self.min,
                max: self.max,
            }
            .build()
        })
    }

    /// A value is admissible if it is a number, and within bounds for non-rotations.
    pub fn is_valid(&self) -> bool {
        if self.value.is_nan() {
            return false;
        }
        self.is_rotation() || (self.value >= self.min && self.value <= self.max)
    }

    /// Range validity: some 2π-congruent representative of the value lies
    /// within [min, max] (the value itself for non-rotations).
    pub fn is_valid_range(&self) -> bool {
        if self.value.is_nan() {
            return false;
        }
        if self.is_rotation() {
            angles::smallest_in_range(self.value, self.min) <= self.max
        } else {
            self.value >= self.min && self.value <= self.max
        }
    }

    /// Two parameters are interchangeable iff they carry the same kind of
    /// transformation with bit-equal axis and origin.
    pub fn transformation_eq(&self, other: &Self) -> bool {
        match (self.transformation, other.transformation) {
            (Transformation::None, Transformation::None) => true,
            (
                Transformation::Rotation { axis: a1, origin: o1 },
                Transformation::Rotation { axis: a2, origin: o2 },
            ) => a1 == a2 && o1 == o2,
            (Transformation::Translation { axis: a1 }, Transformation::Translation { axis: a2 }) => {
                a1 == a2
            }
            _ => false,
        }
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} = {:.6} {} in [{:.6}, {:.6}]",
            self.name,
            self.value(UnitScale::User),
            self.unit,
            self.min(UnitScale::User),
            self.max(UnitScale::User),
        )
    }
}

#[cfg(test)]
mod ut_parameter {
    use super::{Parameter, Transformation, UnitScale, Vector3};
    use crate::math::units::{AngleUnit, LengthUnit};
    use core::f64::consts::{FRAC_PI_2, PI};

    #[test]
    fn test_set_nan_rejected() {
        let mut p = Parameter::rotation("omega", -Vector3::y(), AngleUnit::Degree);
        assert!(p.set_value(f64::NAN, UnitScale::Default).is_err());
        assert_eq!(p.value(UnitScale::Default), 0.0);
    }

    #[test]
    fn test_unit_round_trip() {
        let mut p = Parameter::rotation("omega", -Vector3::y(), AngleUnit::Degree);
        p.set_value(30.0, UnitScale::User).unwrap();
        assert!((p.value(UnitScale::Default) - 30_f64.to_radians()).abs() < 1e-12);
        assert!((p.value(UnitScale::User) - 30.0).abs() < 1e-12);
    }

    #[test]
    fn test_rotation_validity_range() {
        // Travel range (-270°, 0°): +45° is out of range, -45° is in.
        let mut p = Parameter::rotation("chi", Vector3::x(), AngleUnit::Degree)
            .with_range(-270_f64.to_radians(), 0.0);
        p.set_value(45.0, UnitScale::User).unwrap();
        assert!(!p.is_valid_range());
        p.set_value(-45.0, UnitScale::User).unwrap();
        assert!(p.is_valid_range());
        // A representative of +45° shifted by a full turn (-315°) is in range too...
        // for the -270° bound it is not: -315° < -270°.
        p.set_value(100.0, UnitScale::User).unwrap();
        assert!(p.is_valid_range(), "-260° is a valid representative of 100°");
    }

    #[test]
    fn test_translation_bounds() {
        let mut p = Parameter::translation("tx", Vector3::x(), LengthUnit::Millimeter)
            .with_range(0.0, 10.0);
        assert!(p.set_value(11.0, UnitScale::Default).is_err());
        assert!(p.set_value(5.0, UnitScale::Default).is_ok());
        assert!(p.is_valid());
    }

    #[test]
    fn test_quaternion_and_transform() {
        let mut p = Parameter::rotation("omega", Vector3::z(), AngleUnit::Radian);
        p.set_value(FRAC_PI_2, UnitScale::Default).unwrap();
        let q = p.quaternion().unwrap();
        assert!((q * Vector3::x() - Vector3::y()).norm() < 1e-12);
        assert!((p.transform(&Vector3::x()) - Vector3::y()).norm() < 1e-12);

        let mut t = Parameter::translation("ty", Vector3::y(), LengthUnit::Millimeter);
        t.set_value(2.0, UnitScale::Default).unwrap();
        assert!(t.quaternion().is_none());
        assert!((t.transform(&Vector3::x()) - Vector3::new(1.0, 2.0, 0.0)).norm() < 1e-12);
    }

    #[test]
    fn test_closest() {
        let mut p = Parameter::rotation("phi", -Vector3::y(), AngleUnit::Radian)
            .with_range(-2.0 * PI, 2.0 * PI);
        p.set_value(FRAC_PI_2, UnitScale::Default).unwrap();
        // Closest representative to a reference just below +2π is 2π + π/2 - 2π... the
        // in-range candidates are π/2 and π/2 - 2π; the closest to -5.0 is the latter.
        let c = p.closest(-5.0).unwrap();
        assert!((c - (FRAC_PI_2 - 2.0 * PI)).abs() < 1e-12);
    }

    #[test]
    fn test_transformation_cmp() {
        let a = Parameter::rotation("omega", -Vector3::y(), AngleUnit::Degree);
        let b = Parameter::rotation("omega", -Vector3::y(), AngleUnit::Radian);
        let c = Parameter::rotation("omega", Vector3::y(), AngleUnit::Degree);
        assert!(a.transformation_eq(&b));
        assert!(!a.transformation_eq(&c));
        assert!(matches!(a.transformation(), Transformation::Rotation { .. }));
    }

    #[test]
    fn test_randomize_in_range() {
        use rand::SeedableRng;
        let mut rng = rand_pcg::Pcg64Mcg::seed_from_u64(42);
        let mut p = Parameter::rotation("omega", -Vector3::y(), AngleUnit::Radian)
            .with_range(-1.0, 1.0);
        for _ in 0..32 {
            p.randomize(&mut rng);
            let v = p.value(UnitScale::Default);
            assert!((-1.0..=1.0).contains(&v));
        }
    }
}
