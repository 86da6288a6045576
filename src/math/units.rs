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
use core::fmt::{self, Display};

/// Selects which side of a parameter's unit conversion a numeric payload is
/// expressed in: the internal default unit (radian, nanometer, unitless) or
/// the parameter's user-facing display unit.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum UnitScale {
    #[default]
    Default,
    User,
}

/// Defines the angle units supported by GONIO. Angles are stored in radians.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum AngleUnit {
    Radian,
    Degree,
}

impl AngleUnit {
    /// Returns the conversion factor of this angle unit to radians.
    /// E.g. to convert a value in Self::Degree into radians, multiply by π/180.
    #[must_use]
    pub fn to_radians(&self) -> f64 {
        match self {
            Self::Radian => 1.0,
            Self::Degree => PI / 180.0,
        }
    }
}

/// Defines the length units supported by GONIO. Lengths are stored in nanometers.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum LengthUnit {
    Angstrom,
    Nanometer,
    Micrometer,
    Millimeter,
    Meter,
}

impl LengthUnit {
    /// Returns the conversion factor of this length unit to nanometers.
    #[must_use]
    pub const fn to_nanometers(&self) -> f64 {
        match self {
            Self::Angstrom => 1e-1,
            Self::Nanometer => 1.0,
            Self::Micrometer => 1e3,
            Self::Millimeter => 1e6,
            Self::Meter => 1e9,
        }
    }
}

/// The user-facing display unit of a parameter, together with its conversion
/// factor toward the internal default unit.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Unit {
    Unitless,
    Angle(AngleUnit),
    Length(LengthUnit),
}

impl Unit {
    /// Returns the factor converting a value in this unit into the internal default unit.
    #[must_use]
    pub fn factor(&self) -> f64 {
        match self {
            Self::Unitless => 1.0,
            Self::Angle(unit) => unit.to_radians(),
            Self::Length(unit) => unit.to_nanometers(),
        }
    }
}

impl Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unitless => write!(f, ""),
            Self::Angle(AngleUnit::Radian) => write!(f, "rad"),
            Self::Angle(AngleUnit::Degree) => write!(f, "deg"),
            Self::Length(LengthUnit::Angstrom) => write!(f, "Å"),
            Self::Length(LengthUnit::Nanometer) => write!(f, "nm"),
            Self::Length(LengthUnit::Micrometer) => write!(f, "µm"),
            Self::Length(LengthUnit::Millimeter) => write!(f, "mm"),
            Self::Length(LengthUnit::Meter) => write!(f, "m"),
        }
    }
}

#[cfg(test)]
mod ut_units {
    use super::{AngleUnit, LengthUnit, Unit};
    use core::f64::consts::PI;

    #[test]
    fn test_factors() {
        assert_eq!(Unit::Angle(AngleUnit::Degree).factor(), PI / 180.0);
        assert_eq!(Unit::Length(LengthUnit::Angstrom).factor(), 0.1);
        assert_eq!(Unit::Unitless.factor(), 1.0);
    }

    #[test]
    fn test_round_trip() {
        // A value converted to default units and back must be bit-identical in scale.
        let factor = Unit::Angle(AngleUnit::Degree).factor();
        let user = 123.456;
        let default = user * factor;
        assert!((default / factor - user).abs() < 1e-12);
    }
}
