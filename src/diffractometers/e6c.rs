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
use crate::engines::q::{q2_engine, qper_qpar_engine};
use crate::engines::surface::{emergence_engine, incidence_engine};
use crate::engines::tth::tth2_engine;
use crate::engines::{Capabilities, Engine, EngineResult, Mode, ResidualArgs};
use crate::errors::GeometryError;
use crate::geometry::Geometry;
use crate::math::angles::restrict_sym;
use crate::math::units::AngleUnit;
use crate::math::Vector3;

const E6C: &str = "E6C";
const E6C_AXES: &[&str] = &["mu", "omega", "chi", "phi", "gamma", "delta"];
const E6C_DESCRIPTION: &str = concatcp!(
    "Eulerian 6-circle geometry.\n",
    "+ sample chain: mu around (0, 0, 1), omega around (0, -1, 0), chi around (1, 0, 0), ",
    "phi around (0, -1, 0)\n",
    "+ detector chain: gamma around (0, 0, 1), delta around (0, -1, 0)\n",
    "All rotations follow the right hand rule around the stated direction.",
);

fn e6c_geometry() -> Result<Geometry, GeometryError> {
    let mut geometry = Geometry::new(E6C, E6C_DESCRIPTION, DEFAULT_WAVELENGTH_NM)?;
    let sample = geometry.add_holder();
    geometry.add_rotation(sample, "mu", Vector3::z(), AngleUnit::Degree)?;
    geometry.add_rotation(sample, "omega", -Vector3::y(), AngleUnit::Degree)?;
    geometry.add_rotation(sample, "chi", Vector3::x(), AngleUnit::Degree)?;
    geometry.add_rotation(sample, "phi", -Vector3::y(), AngleUnit::Degree)?;
    let detector = geometry.add_holder();
    geometry.add_rotation(detector, "gamma", Vector3::z(), AngleUnit::Degree)?;
    geometry.add_rotation(detector, "delta", -Vector3::y(), AngleUnit::Degree)?;
    geometry.update();
    Ok(geometry)
}

/// Bisecting condition in the vertical scattering plane: delta = 2·omega.
fn bissector_vertical(args: &ResidualArgs) -> EngineResult<Vec<f64>> {
    let omega = axis_rad(args, "omega")?;
    let delta = axis_rad(args, "delta")?;
    Ok(vec![restrict_sym(delta - 2.0 * omega)])
}

fn hkl_modes() -> Vec<Mode> {
    let rw = Capabilities::READABLE | Capabilities::WRITABLE;
    let all = || vec!["mu", "omega", "chi", "phi", "gamma", "delta"];
    let vertical = || vec!["omega", "chi", "phi", "delta"];
    vec![
        Mode::new(
            "bissector_vertical",
            all(),
            vertical(),
            vec![bissector_vertical, rubh_minus_q],
            vec![],
            rw,
        ),
        Mode::new(
            "constant_omega_vertical",
            all(),
            vec!["chi", "phi", "delta"],
            vec![rubh_minus_q],
            vec![],
            rw,
        ),
        Mode::new(
            "constant_chi_vertical",
            all(),
            vec!["omega", "phi", "delta"],
            vec![rubh_minus_q],
            vec![],
            rw,
        ),
        Mode::new(
            "constant_phi_vertical",
            all(),
            vec!["omega", "chi", "delta"],
            vec![rubh_minus_q],
            vec![],
            rw,
        ),
        Mode::new(
            "lifting_detector_phi",
            all(),
            vec!["phi", "gamma", "delta"],
            vec![rubh_minus_q],
            vec![],
            rw,
        ),
        Mode::new(
            "lifting_detector_omega",
            all(),
            vec!["omega", "gamma", "delta"],
            vec![rubh_minus_q],
            vec![],
            rw,
        ),
        Mode::new(
            "lifting_detector_mu",
            all(),
            vec!["mu", "gamma", "delta"],
            vec![rubh_minus_q],
            vec![],
            rw,
        ),
        Mode::new(
            "double_diffraction_vertical",
            all(),
            vertical(),
            vec![double_diffraction, rubh_minus_q],
            double_diffraction_parameters(),
            rw,
        ),
        Mode::new(
            "psi_constant_vertical",
            all(),
            vertical(),
            vec![psi_constant, rubh_minus_q],
            psi_constant_parameters(),
            rw,
        ),
    ]
}

fn e6c_engines() -> Vec<Engine> {
    vec![
        hkl_engine(hkl_modes()),
        psi_engine(vec!["omega", "chi", "phi", "delta"]),
        q2_engine(vec!["gamma", "delta"]),
        qper_qpar_engine(vec!["gamma", "delta"]),
        tth2_engine(vec!["gamma", "delta"]),
        incidence_engine(vec!["mu", "omega", "chi", "phi"]),
        emergence_engine(vec!["mu", "omega", "chi", "phi", "gamma", "delta"]),
    ]
}

pub(crate) fn factories() -> Vec<Factory> {
    vec![Factory::new(
        E6C,
        E6C_DESCRIPTION,
        E6C_AXES,
        e6c_geometry,
        e6c_engines,
    )]
}
