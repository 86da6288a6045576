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

use const_format::concatcp;
use log::warn;

use crate::constants::DEFAULT_WAVELENGTH_NM;
use crate::diffractometers::Factory;
use crate::engines::hkl::{hkl_engine, reflectivity, rubh_minus_q};
use crate::engines::q::{q2_engine, qper_qpar_engine};
use crate::engines::solver::solve_1d;
use crate::engines::surface::{
    emergence_engine, incidence_engine, surface_mode_parameters,
};
use crate::engines::{Capabilities, Engine, Mode};
use crate::errors::GeometryError;
use crate::geometry::Geometry;
use crate::math::angles::restrict_sym;
use crate::math::units::AngleUnit;
use crate::math::Vector3;

const MED_2_2: &str = "SOLEIL SIXS MED2+2";
const MED_2_2_AXES: &[&str] = &["mu", "omega", "gamma", "delta"];
const MED_2_2_DESCRIPTION: &str = concatcp!(
    "SOLEIL SIXS MED 2+2 surface geometry.\n",
    "+ sample chain: mu around (0, 0, 1), omega around (0, -1, 0)\n",
    "+ detector chain: gamma around (0, 0, 1), delta around (0, -1, 0)\n",
    "All rotations follow the right hand rule around the stated direction.",
);

const MED_2_3: &str = "SOLEIL SIXS MED2+3";
const MED_2_3_AXES: &[&str] = &["mu", "omega", "gamma", "delta", "eta_a"];
const MED_2_3_DESCRIPTION: &str = concatcp!(
    "SOLEIL SIXS MED 2+3 surface geometry with orientable detector slits.\n",
    "+ sample chain: mu around (0, 0, 1), omega around (0, -1, 0)\n",
    "+ detector chain: gamma around (0, 0, 1), delta around (0, -1, 0), ",
    "eta_a around (1, 0, 0)\n",
    "All rotations follow the right hand rule around the stated direction.",
);

fn med_2_2_geometry() -> Result<Geometry, GeometryError> {
    let mut geometry = Geometry::new(MED_2_2, MED_2_2_DESCRIPTION, DEFAULT_WAVELENGTH_NM)?;
    let sample = geometry.add_holder();
    geometry.add_rotation(sample, "mu", Vector3::z(), AngleUnit::Degree)?;
    geometry.add_rotation(sample, "omega", -Vector3::y(), AngleUnit::Degree)?;
    let detector = geometry.add_holder();
    geometry.add_rotation(detector, "gamma", Vector3::z(), AngleUnit::Degree)?;
    geometry.add_rotation(detector, "delta", -Vector3::y(), AngleUnit::Degree)?;
    geometry.update();
    Ok(geometry)
}

fn med_2_3_geometry() -> Result<Geometry, GeometryError> {
    let mut geometry = Geometry::new(MED_2_3, MED_2_3_DESCRIPTION, DEFAULT_WAVELENGTH_NM)?;
    let sample = geometry.add_holder();
    geometry.add_rotation(sample, "mu", Vector3::z(), AngleUnit::Degree)?;
    geometry.add_rotation(sample, "omega", -Vector3::y(), AngleUnit::Degree)?;
    let detector = geometry.add_holder();
    geometry.add_rotation(detector, "gamma", Vector3::z(), AngleUnit::Degree)?;
    geometry.add_rotation(detector, "delta", -Vector3::y(), AngleUnit::Degree)?;
    geometry.add_rotation(detector, "eta_a", Vector3::x(), AngleUnit::Degree)?;
    geometry.update();
    Ok(geometry)
}

fn hkl_modes() -> Vec<Mode> {
    let rw = Capabilities::READABLE | Capabilities::WRITABLE;
    let all = || vec!["mu", "omega", "gamma", "delta"];
    vec![
        Mode::new(
            "mu_fixed",
            all(),
            vec!["omega", "gamma", "delta"],
            vec![rubh_minus_q],
            vec![],
            rw,
        ),
        Mode::new(
            "reflectivity",
            all(),
            all(),
            vec![reflectivity, rubh_minus_q],
            surface_mode_parameters(),
            rw,
        ),
    ]
}

fn med_2_2_engines() -> Vec<Engine> {
    vec![
        hkl_engine(hkl_modes()),
        q2_engine(vec!["gamma", "delta"]),
        qper_qpar_engine(vec!["gamma", "delta"]),
        incidence_engine(vec!["mu", "omega"]),
        emergence_engine(vec!["mu", "omega", "gamma", "delta"]),
    ]
}

fn med_2_3_engines() -> Vec<Engine> {
    // eta_a is a read axis everywhere: only the post-set slit fit moves it.
    vec![
        hkl_engine(hkl_modes()),
        q2_engine(vec!["gamma", "delta"]),
        qper_qpar_engine(vec!["gamma", "delta"]),
        incidence_engine(vec!["mu", "omega"]),
        emergence_engine(vec!["mu", "omega", "gamma", "delta", "eta_a"]),
    ]
}

/// The direction of the detector slit blades for a given eta_a angle, in the
/// lab frame.
fn slit_direction(geometry: &Geometry, eta_rad: f64) -> Vector3 {
    let mut probe = geometry.clone();
    // The probe is only used for its detector chain rotation.
    if probe
        .axis_mut("eta_a")
        .map(|axis| axis.set_value_unchecked(eta_rad))
        .is_err()
    {
        return Vector3::y();
    }
    probe.update();
    probe.detector_rotation() * Vector3::y()
}

/// The MED 2+3 slit-orientation fit: for each solution, solve the 1D root
/// problem keeping the slit blades horizontal (their direction orthogonal to
/// the surface normal, taken vertical for this horizontal-surface
/// diffractometer), rewrite eta_a in place, and emit the half-turn
/// alternative as an extra solution.
fn med_2_3_slit_fit(geometry: &mut Geometry) -> Vec<Geometry> {
    let level = |eta: f64| slit_direction(geometry, eta).z;
    let Some(root) = solve_1d(level, -PI, PI) else {
        warn!("slit orientation fit found no root, eta_a left untouched");
        return Vec::new();
    };

    if let Ok(axis) = geometry.axis_mut("eta_a") {
        axis.set_value_unchecked(restrict_sym(root));
    }
    geometry.update();

    let mut alternative = geometry.clone();
    match alternative.axis_mut("eta_a") {
        Ok(axis) => {
            axis.set_value_unchecked(restrict_sym(root + PI));
            alternative.update();
            vec![alternative]
        }
        Err(_) => Vec::new(),
    }
}

pub(crate) fn factories() -> Vec<Factory> {
    vec![
        Factory::new(
            MED_2_2,
            MED_2_2_DESCRIPTION,
            MED_2_2_AXES,
            med_2_2_geometry,
            med_2_2_engines,
        ),
        Factory::new(
            MED_2_3,
            MED_2_3_DESCRIPTION,
            MED_2_3_AXES,
            med_2_3_geometry,
            med_2_3_engines,
        )
        .with_post_set(med_2_3_slit_fit),
    ]
}

#[cfg(test)]
mod ut_soleil_sixs {
    use super::{med_2_3_geometry, med_2_3_slit_fit};
    use crate::math::units::UnitScale;

    #[test]
    fn test_slit_fit_levels_the_blades() {
        let mut geometry = med_2_3_geometry().unwrap();
        geometry.set_axis_value("gamma", 10.0, UnitScale::User).unwrap();
        geometry.set_axis_value("delta", 30.0, UnitScale::User).unwrap();
        geometry.set_axis_value("eta_a", 42.0, UnitScale::User).unwrap();
        geometry.update();

        let extras = med_2_3_slit_fit(&mut geometry);
        assert_eq!(extras.len(), 1);
        // Both orientations keep the slit blades horizontal.
        for g in core::iter::once(&geometry).chain(extras.iter()) {
            let blades = g.detector_rotation() * crate::math::Vector3::y();
            assert!(blades.z.abs() < 1e-9, "blades not level: {blades}");
        }
        // The two orientations differ by half a turn.
        let eta0 = geometry.axis_value("eta_a", UnitScale::Default).unwrap();
        let eta1 = extras[0].axis_value("eta_a", UnitScale::Default).unwrap();
        assert!(
            (crate::math::angles::orthodromic_rad(eta0, eta1) - core::f64::consts::PI).abs()
                < 1e-9
        );
    }
}
