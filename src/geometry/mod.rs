/*
 * GONIO Toolkit
 * Copyright (C) 2021-onward Christopher Rabotin <christopher.rabotin@gmail.com> et al. (cf. AUTHORS.md)
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 *
 * Documentation: https://nyxspace.com/
 */

use core::fmt;

use snafu::ensure;

use crate::constants::TAU;
use crate::detector::Detector;
use crate::errors::{
    GeometryError, IncompatibleAxisSnafu, InvalidWavelengthSnafu, MathError, SingularMatrixSnafu,
    UnknownAxisSnafu, UnknownHolderSnafu, ValuesLengthSnafu,
};
use crate::math::rotation::Quaternion;
use crate::math::units::{AngleUnit, LengthUnit, UnitScale};
use crate::math::{Matrix3, Vector3};
use crate::parameter::Parameter;

mod list;
pub use list::{GeometryList, Multiply};

/// The incoming beam: wavelength in nanometers and the direction of
/// propagation in the lab frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Source {
    pub wavelength_nm: f64,
    pub ki_direction: Vector3,
}

/// One kinematic chain of the diffractometer: an ordered list of axis indices
/// into the owning [Geometry], plus the cached cumulative rotation.
#[derive(Clone, Debug)]
pub struct Holder {
    axes: Vec<usize>,
    q: Quaternion,
}

impl Holder {
    fn new() -> Self {
        Self {
            axes: Vec::new(),
            q: Quaternion::identity(),
        }
    }

    /// Indices of the axes of this chain, in mechanical stacking order.
    pub fn axes(&self) -> &[usize] {
        &self.axes
    }

    /// The cached cumulative rotation of this chain.
    pub fn quaternion(&self) -> Quaternion {
        self.q
    }

    /// Recomputes the cumulative quaternion as the product, in insertion
    /// order, of the quaternions of the rotation axes of this chain.
    ///
    /// The accumulation deliberately stops at the first non-rotation axis:
    /// a translation in the middle of a chain does not contribute a rotation
    /// and the axes beyond it are not folded in. Chains mixing translations
    /// and rotations should be walked with [Self::apply_transformation]
    /// instead, which handles every axis kind.
    fn update(&mut self, axes: &[Parameter]) {
        let mut q = Quaternion::identity();
        for index in &self.axes {
            match axes[*index].quaternion() {
                Some(axis_q) => q = q * axis_q,
                None => break,
            }
        }
        self.q = q;
    }

    /// Applies the full transformation chain (rotations and translations
    /// alike) to a lab-frame vector, innermost axis first.
    pub fn apply_transformation(&self, axes: &[Parameter], v: &Vector3) -> Vector3 {
        let mut out = *v;
        for index in self.axes.iter().rev() {
            out = axes[*index].transform(&out);
        }
        out
    }
}

/// The axes of a diffractometer arranged in two kinematic chains: the first
/// holder carries the sample, the last one carries the detector.
///
/// Axes are owned by the geometry and de-duplicated by name; holders refer to
/// them by index.
#[derive(Clone, Debug)]
pub struct Geometry {
    name: &'static str,
    description: &'static str,
    source: Source,
    axes: Vec<Parameter>,
    holders: Vec<Holder>,
}

impl Geometry {
    pub fn new(
        name: &'static str,
        description: &'static str,
        wavelength_nm: f64,
    ) -> Result<Self, GeometryError> {
        ensure!(
            wavelength_nm > 0.0 && wavelength_nm.is_finite(),
            InvalidWavelengthSnafu {
                wavelength: wavelength_nm
            }
        );
        Ok(Self {
            name,
            description,
            source: Source {
                wavelength_nm,
                ki_direction: Vector3::x(),
            },
            axes: Vec::new(),
            holders: Vec::new(),
        })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn description(&self) -> &'static str {
        self.description
    }

    pub fn source(&self) -> Source {
        self.source
    }

    pub fn wavelength(&self) -> f64 {
        self.source.wavelength_nm
    }

    pub fn set_wavelength(&mut self, wavelength_nm: f64) -> Result<(), GeometryError> {
        ensure!(
            wavelength_nm > 0.0 && wavelength_nm.is_finite(),
            InvalidWavelengthSnafu {
                wavelength: wavelength_nm
            }
        );
        self.source.wavelength_nm = wavelength_nm;
        Ok(())
    }

    /// Appends a new, empty kinematic chain and returns its index.
    pub fn add_holder(&mut self) -> usize {
        self.holders.push(Holder::new());
        self.holders.len() - 1
    }

    /// Registers a rotation axis on the given holder. Adding an axis whose
    /// name already exists is idempotent when the transformation matches and
    /// aborts the build when it does not.
    pub fn add_rotation(
        &mut self,
        holder: usize,
        name: &str,
        axis: Vector3,
        unit: AngleUnit,
    ) -> Result<usize, GeometryError> {
        let parameter = Parameter::rotation(name, axis, unit);
        self.add_axis(holder, parameter)
    }

    /// Registers a translation axis on the given holder, with the same
    /// idempotence rule as [Self::add_rotation].
    pub fn add_translation(
        &mut self,
        holder: usize,
        name: &str,
        axis: Vector3,
        unit: LengthUnit,
    ) -> Result<usize, GeometryError> {
        let parameter = Parameter::translation(name, axis, unit);
        self.add_axis(holder, parameter)
    }

    fn add_axis(&mut self, holder: usize, parameter: Parameter) -> Result<usize, GeometryError> {
        ensure!(
            holder < self.holders.len(),
            UnknownHolderSnafu { index: holder }
        );
        let index = match self.axes.iter().position(|p| p.name() == parameter.name()) {
            Some(index) => {
                ensure!(
                    self.axes[index].transformation_eq(&parameter),
                    IncompatibleAxisSnafu {
                        name: parameter.name()
                    }
                );
                index
            }
            None => {
                self.axes.push(parameter);
                self.axes.len() - 1
            }
        };
        if !self.holders[holder].axes.contains(&index) {
            self.holders[holder].axes.push(index);
        }
        Ok(index)
    }

    pub fn holders(&self) -> &[Holder] {
        &self.holders
    }

    pub fn axes(&self) -> &[Parameter] {
        &self.axes
    }

    pub fn axis_names(&self) -> Vec<&str> {
        self.axes.iter().map(|p| p.name()).collect()
    }

    pub(crate) fn axis_index(&self, name: &str) -> Result<usize, GeometryError> {
        self.axes
            .iter()
            .position(|p| p.name() == name)
            .ok_or_else(|| UnknownAxisSnafu { name }.build())
    }

    pub fn axis(&self, name: &str) -> Result<&Parameter, GeometryError> {
        let index = self.axis_index(name)?;
        Ok(&self.axes[index])
    }

    pub fn axis_mut(&mut self, name: &str) -> Result<&mut Parameter, GeometryError> {
        let index = self.axis_index(name)?;
        Ok(&mut self.axes[index])
    }

    pub(crate) fn axis_by_index(&self, index: usize) -> &Parameter {
        &self.axes[index]
    }

    pub(crate) fn axis_by_index_mut(&mut self, index: usize) -> &mut Parameter {
        &mut self.axes[index]
    }

    /// Reads the value of one axis.
    pub fn axis_value(&self, name: &str, scale: UnitScale) -> Result<f64, GeometryError> {
        Ok(self.axis(name)?.value(scale))
    }

    /// Writes the value of one axis.
    pub fn set_axis_value(
        &mut self,
        name: &str,
        value: f64,
        scale: UnitScale,
    ) -> Result<(), GeometryError> {
        self.axis_mut(name)?
            .set_value(value, scale)
            .map_err(|source| GeometryError::AxisParameter {
                action: "setting an axis value",
                source,
            })
    }

    /// All axis values, in axis insertion order.
    pub fn values(&self, scale: UnitScale) -> Vec<f64> {
        self.axes.iter().map(|p| p.value(scale)).collect()
    }

    /// Sets all axis values at once, in axis insertion order. The update is
    /// atomic: either every value is admissible and applied, or none is.
    pub fn set_values(&mut self, values: &[f64], scale: UnitScale) -> Result<(), GeometryError> {
        ensure!(
            values.len() == self.axes.len(),
            ValuesLengthSnafu {
                got: values.len(),
                need: self.axes.len()
            }
        );
        // Validate on a scratch copy first so a late rejection cannot leave
        // the geometry half written.
        let mut scratch = self.axes.clone();
        for (parameter, value) in scratch.iter_mut().zip(values) {
            parameter
                .set_value(*value, scale)
                .map_err(|source| GeometryError::AxisParameter {
                    action: "setting all axis values",
                    source,
                })?;
        }
        self.axes = scratch;
        Ok(())
    }

    /// Recomputes the cached holder quaternions if any axis changed since the
    /// last update, then clears the changed bits.
    pub fn update(&mut self) {
        if self.axes.iter().any(|p| p.changed()) {
            for holder in &mut self.holders {
                holder.update(&self.axes);
            }
            for parameter in &mut self.axes {
                parameter.clear_changed();
            }
        }
    }

    /// The cumulative rotation of the sample chain (the first holder).
    pub fn sample_rotation(&self) -> Quaternion {
        self.holders.first().map(|h| h.q).unwrap_or_default()
    }

    /// The cumulative rotation of the detector chain (the last holder).
    pub fn detector_rotation(&self) -> Quaternion {
        self.holders.last().map(|h| h.q).unwrap_or_default()
    }

    /// The incident wavevector in the lab frame, |ki| = 2π/λ.
    pub fn ki(&self) -> Vector3 {
        self.source.ki_direction * (TAU / self.source.wavelength_nm)
    }

    /// The outgoing wavevector: the detector-local kf direction rotated
    /// through the detector chain, |kf| = |ki|.
    pub fn kf(&self, detector: &Detector) -> Vector3 {
        self.detector_rotation() * (detector.kf_direction() * (TAU / self.source.wavelength_nm))
    }

    /// Projects a lab-frame vector into the reciprocal basis of the sample:
    /// (R_sample · UB)⁻¹ · v.
    pub fn to_reciprocal(&self, ub: &Matrix3, v: &Vector3) -> Result<Vector3, MathError> {
        let m = self.sample_rotation().to_matrix() * ub;
        let inv = m.try_inverse().ok_or_else(|| {
            SingularMatrixSnafu {
                action: "inverting the R·UB projection",
            }
            .build()
        })?;
        Ok(inv * v)
    }

    /// Sum over axes of |Δvalue| against another geometry with the same axes.
    pub fn distance(&self, other: &Self) -> f64 {
        self.axes
            .iter()
            .zip(other.axes.iter())
            .map(|(a, b)| (a.value(UnitScale::Default) - b.value(UnitScale::Default)).abs())
            .sum()
    }

    /// Sum over axes of the shortest-arc distance (rotations) or |Δvalue|
    /// (anything else) against another geometry with the same axes.
    pub fn distance_orthodromic(&self, other: &Self) -> f64 {
        self.axes
            .iter()
            .zip(other.axes.iter())
            .map(|(a, b)| a.orthodromic_distance(b.value(UnitScale::Default)))
            .sum()
    }

    /// Replaces every axis value by its in-range representative closest to the
    /// matching axis of `reference`. Fails atomically: when any axis has no
    /// representative, nothing is mutated.
    pub fn closest_from(&mut self, reference: &Self) -> Result<(), GeometryError> {
        let mut lifted = Vec::with_capacity(self.axes.len());
        for (parameter, other) in self.axes.iter().zip(reference.axes.iter()) {
            let value = parameter
                .try_closest(other.value(UnitScale::Default))
                .map_err(|source| GeometryError::AxisParameter {
                    action: "lifting axes toward a reference geometry",
                    source,
                })?;
            lifted.push(value);
        }
        for (parameter, value) in self.axes.iter_mut().zip(lifted) {
            parameter.set_value_unchecked(value);
        }
        Ok(())
    }

    /// True iff every axis value is inside (a 2π-representative of) its travel range.
    pub fn is_valid(&self) -> bool {
        self.axes.iter().all(|p| p.is_valid_range())
    }
}

impl fmt::Display for Geometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} λ={} nm:", self.name, self.source.wavelength_nm)?;
        for parameter in &self.axes {
            write!(f, " {}={:.5}", parameter.name(), parameter.value(UnitScale::User))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod ut_geometry {
    use super::{Geometry, UnitScale, Vector3};
    use crate::math::units::AngleUnit;
    use core::f64::consts::FRAC_PI_2;

    fn two_circle() -> Geometry {
        let mut g = Geometry::new("TWOC", "two circles", 1.54).unwrap();
        let sample = g.add_holder();
        g.add_rotation(sample, "omega", -Vector3::y(), AngleUnit::Degree)
            .unwrap();
        let detector = g.add_holder();
        g.add_rotation(detector, "tth", -Vector3::y(), AngleUnit::Degree)
            .unwrap();
        g.update();
        g
    }

    #[test]
    fn test_axis_idempotence() {
        let mut g = two_circle();
        let before = g.axes().len();
        let index = g
            .add_rotation(1, "tth", -Vector3::y(), AngleUnit::Degree)
            .unwrap();
        assert_eq!(g.axes().len(), before, "re-adding must not create an axis");
        assert_eq!(g.axis_index("tth").unwrap(), index);
        // Same name with a different axis vector aborts the build.
        assert!(g
            .add_rotation(1, "tth", Vector3::y(), AngleUnit::Degree)
            .is_err());
    }

    #[test]
    fn test_wavelength_guard() {
        let mut g = two_circle();
        assert!(g.set_wavelength(-1.0).is_err());
        assert!(g.set_wavelength(0.0).is_err());
        assert!(g.set_wavelength(1.0).is_ok());
    }

    #[test]
    fn test_update_and_kf() {
        let mut g = two_circle();
        g.set_axis_value("tth", 60.0, UnitScale::User).unwrap();
        g.update();
        let detector = crate::detector::Detector::ZeroD;
        let kf = g.kf(&detector);
        let k = crate::constants::TAU / 1.54;
        // Rotating ki around (0, -1, 0) by 60° lifts it in the xOz plane.
        assert!((kf - Vector3::new(k * 0.5, 0.0, k * 3f64.sqrt() / 2.0)).norm() < 1e-10);
    }

    #[test]
    fn test_distances() {
        let mut a = two_circle();
        let mut b = two_circle();
        a.set_values(&[0.0, 0.0], UnitScale::Default).unwrap();
        b.set_values(&[FRAC_PI_2, 2.0 * core::f64::consts::PI], UnitScale::Default)
            .unwrap();
        assert!((a.distance(&b) - (FRAC_PI_2 + 2.0 * core::f64::consts::PI)).abs() < 1e-12);
        // Orthodromically, a full turn is no distance at all.
        assert!((a.distance_orthodromic(&b) - FRAC_PI_2).abs() < 1e-12);
        assert!(
            (a.distance_orthodromic(&b) - b.distance_orthodromic(&a)).abs() < 1e-12,
            "symmetry"
        );
    }

    #[test]
    fn test_closest_from_atomic() {
        let mut a = two_circle();
        a.set_values(&[FRAC_PI_2 + 2.0 * core::f64::consts::PI, 0.1], UnitScale::Default)
            .unwrap();
        let reference = two_circle();
        a.closest_from(&reference).unwrap();
        assert!((a.values(UnitScale::Default)[0] - FRAC_PI_2).abs() < 1e-12);

        // Narrow the range of omega so no representative exists: nothing moves.
        let mut c = two_circle();
        c.axis_mut("omega").unwrap().set_range(-0.2, 0.2, UnitScale::Default).unwrap();
        c.set_values(&[FRAC_PI_2, 0.3], UnitScale::Default).unwrap();
        let before = c.values(UnitScale::Default);
        assert!(c.closest_from(&reference).is_err());
        assert_eq!(c.values(UnitScale::Default), before);
    }

    #[test]
    fn test_values_length_guard() {
        let mut g = two_circle();
        assert!(g.set_values(&[1.0], UnitScale::Default).is_err());
        assert!(g.set_values(&[1.0, 2.0, 3.0], UnitScale::Default).is_err());
    }

    #[test]
    fn test_holder_transformation_chain() {
        use crate::math::units::LengthUnit;

        // A chain mixing a rotation and a translation: the quaternion cache
        // stops at the translation, the full walk applies both.
        let mut g = Geometry::new("MIXED", "rotation over a translation", 1.54).unwrap();
        let sample = g.add_holder();
        g.add_rotation(sample, "omega", Vector3::z(), AngleUnit::Degree)
            .unwrap();
        g.add_translation(sample, "tz", Vector3::z(), LengthUnit::Millimeter)
            .unwrap();
        g.set_axis_value("omega", 90.0, UnitScale::User).unwrap();
        g.set_axis_value("tz", 2.0, UnitScale::Default).unwrap();
        g.update();

        // Cached rotation: only omega contributes.
        let q = g.holders()[0].quaternion();
        assert!((q * Vector3::x() - Vector3::y()).norm() < 1e-12);

        // Full chain: translate along z, then rotate around z.
        let out = g.holders()[0].apply_transformation(g.axes(), &Vector3::x());
        assert!((out - Vector3::new(0.0, 1.0, 2.0)).norm() < 1e-12);
    }
}
