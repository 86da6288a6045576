/*
 * GONIO Toolkit
 * Copyright (C) 2021-onward Christopher Rabotin <christopher.rabotin@gmail.com> et al. (cf. AUTHORS.md)
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 *
 * Documentation: https://nyxspace.com/
 */

use const_format::concatcp;

use crate::constants::DEFAULT_WAVELENGTH_NM;
use crate::diffractometers::Factory;
use crate::engines::hkl::{
    axis_rad, double_diffraction, double_diffraction_parameters, hkl_engine, psi_constant,
    psi_constant_parameters, rubh_minus_q,
};
use crate::engines::psi::psi_engine;
use crate::engines::q::{q2_engine, q_engine};
use crate::engines::surface::{
    emergence_engine, emergence_fixed_parameters, incidence_engine,
};
use crate::engines::tth::{tth2_engine, tth_engine};
use crate::engines::{Capabilities, Engine, EngineResult, Mode, ResidualArgs};
use crate::errors::GeometryError;
use crate::geometry::Geometry;
use crate::math::angles::restrict_sym;
use crate::math::units::AngleUnit;
use crate::math::Vector3;

const E4CV: &str = "E4CV";
const E4CV_AXES: &[&str] = &["omega", "chi", "phi", "tth"];
const E4CV_DESCRIPTION: &str = concatcp!(
    "Eulerian 4-circle vertical geometry.\n",
    "+ sample chain: omega around (0, -1, 0), chi around (1, 0, 0), phi around (0, -1, 0)\n",
    "+ detector chain: tth around (0, -1, 0)\n",
    "All rotations follow the right hand rule around the stated direction.",
);

const E4CVG: &str = "E4CVG";
const E4CVG_AXES: &[&str] = &["omega", "chi", "phi", "tth", "gamma"];
const E4CVG_DESCRIPTION: &str = concatcp!(
    "Eulerian 4-circle vertical geometry with an out-of-plane detector circle.\n",
    "+ sample chain: omega around (0, -1, 0), chi around (1, 0, 0), phi around (0, -1, 0)\n",
    "+ detector chain: tth around (0, -1, 0), gamma around (0, 0, 1)\n",
    "All rotations follow the right hand rule around the stated direction.",
);

fn e4cv_geometry() -> Result<Geometry, GeometryError> {
    let mut geometry = Geometry::new(E4CV, E4CV_DESCRIPTION, DEFAULT_WAVELENGTH_NM)?;
    let sample = geometry.add_holder();
    geometry.add_rotation(sample, "omega", -Vector3::y(), AngleUnit::Degree)?;
    geometry.add_rotation(sample, "chi", Vector3::x(), AngleUnit::Degree)?;
    geometry.add_rotation(sample, "phi", -Vector3::y(), AngleUnit::Degree)?;
    let detector = geometry.add_holder();
    geometry.add_rotation(detector, "tth", -Vector3::y(), AngleUnit::Degree)?;
    geometry.update();
    Ok(geometry)
}

fn e4cvg_geometry() -> Result<Geometry, GeometryError> {
    let mut geometry = Geometry::new(E4CVG, E4CVG_DESCRIPTION, DEFAULT_WAVELENGTH_NM)?;
    let sample = geometry.add_holder();
    geometry.add_rotation(sample, "omega", -Vector3::y(), AngleUnit::Degree)?;
    geometry.add_rotation(sample, "chi", Vector3::x(), AngleUnit::Degree)?;
    geometry.add_rotation(sample, "phi", -Vector3::y(), AngleUnit::Degree)?;
    let detector = geometry.add_holder();
    geometry.add_rotation(detector, "tth", -Vector3::y(), AngleUnit::Degree)?;
    geometry.add_rotation(detector, "gamma", Vector3::z(), AngleUnit::Degree)?;
    geometry.update();
    Ok(geometry)
}

/// Bisecting condition of the vertical 4-circle: tth = 2·omega.
fn bissector(args: &ResidualArgs) -> EngineResult<Vec<f64>> {
    let omega = axis_rad(args, "omega")?;
    let tth = axis_rad(args, "tth")?;
    Ok(vec![restrict_sym(tth - 2.0 * omega)])
}

fn hkl_modes() -> Vec<Mode> {
    let rw = Capabilities::READABLE | Capabilities::WRITABLE;
    let all = || vec!["omega", "chi", "phi", "tth"];
    vec![
        Mode::new(
            "bissector",
            all(),
            all(),
            vec![bissector, rubh_minus_q],
            vec![],
            rw,
        ),
        Mode::new(
            "constant_omega",
            all(),
            vec!["chi", "phi", "tth"],
            vec![rubh_minus_q],
            vec![],
            rw,
        ),
        Mode::new(
            "constant_chi",
            all(),
            vec!["omega", "phi", "tth"],
            vec![rubh_minus_q],
            vec![],
            rw,
        ),
        Mode::new(
            "constant_phi",
            all(),
            vec!["omega", "chi", "tth"],
            vec![rubh_minus_q],
            vec![],
            rw,
        ),
        Mode::new(
            "double_diffraction",
            all(),
            all(),
            vec![double_diffraction, rubh_minus_q],
            double_diffraction_parameters(),
            rw,
        ),
        Mode::new(
            "psi_constant",
            all(),
            all(),
            vec![psi_constant, rubh_minus_q],
            psi_constant_parameters(),
            rw,
        ),
        Mode::new(
            "emergence_fixed",
            all(),
            all(),
            vec![crate::engines::hkl::emergence_fixed, rubh_minus_q],
            emergence_fixed_parameters(),
            rw,
        ),
    ]
}

fn e4cv_engines() -> Vec<Engine> {
    vec![
        hkl_engine(hkl_modes()),
        psi_engine(vec!["omega", "chi", "phi", "tth"]),
        q_engine(vec!["tth"]),
        tth_engine(vec!["tth"]),
        incidence_engine(vec!["omega", "chi", "phi"]),
        emergence_engine(vec!["omega", "chi", "phi", "tth"]),
    ]
}

fn e4cvg_engines() -> Vec<Engine> {
    vec![
        hkl_engine(hkl_modes()),
        psi_engine(vec!["omega", "chi", "phi", "tth"]),
        q2_engine(vec!["tth", "gamma"]),
        tth2_engine(vec!["tth", "gamma"]),
        incidence_engine(vec!["omega", "chi", "phi"]),
        emergence_engine(vec!["omega", "chi", "phi", "tth", "gamma"]),
    ]
}

pub(crate) fn factories() -> Vec<Factory> {
    vec![
        Factory::new(E4CV, E4CV_DESCRIPTION, E4CV_AXES, e4cv_geometry, e4cv_engines),
        Factory::new(
            E4CVG,
            E4CVG_DESCRIPTION,
            E4CVG_AXES,
            e4cvg_geometry,
            e4cvg_engines,
        ),
    ]
}
