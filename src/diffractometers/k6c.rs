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
use crate::diffractometers::k4cv::{kappa_axis, KAPPA_ALPHA_TEXT};
use crate::diffractometers::Factory;
use crate::engines::eulerians::{eulerian_omega, eulerians_engine};
use crate::engines::hkl::{
    axis_rad, double_diffraction, double_diffraction_parameters, hkl_engine, rubh_minus_q,
};
use crate::engines::psi::psi_engine;
use crate::engines::q::q2_engine;
use crate::engines::surface::{emergence_engine, incidence_engine};
use crate::engines::tth::tth2_engine;
use crate::engines::{Capabilities, Engine, EngineResult, Mode, ResidualArgs};
use crate::errors::GeometryError;
use crate::geometry::Geometry;
use crate::math::angles::restrict_sym;
use crate::math::units::{AngleUnit, UnitScale};
use crate::math::Vector3;
use crate::parameter::Parameter;

const K6C: &str = "K6C";
const K6C_AXES: &[&str] = &["mu", "komega", "kappa", "kphi", "gamma", "delta"];
const K6C_DESCRIPTION: &str = concatcp!(
    "Kappa 6-circle geometry, kappa tilt alpha = ",
    KAPPA_ALPHA_TEXT,
    " deg.\n",
    "+ sample chain: mu around (0, 0, 1), komega around (0, -1, 0), ",
    "kappa around (0, -cos alpha, -sin alpha), kphi around (0, -1, 0)\n",
    "+ detector chain: gamma around (0, 0, 1), delta around (0, -1, 0)\n",
    "All rotations follow the right hand rule around the stated direction.",
);

fn k6c_geometry() -> Result<Geometry, GeometryError> {
    let mut geometry = Geometry::new(K6C, K6C_DESCRIPTION, DEFAULT_WAVELENGTH_NM)?;
    let sample = geometry.add_holder();
    geometry.add_rotation(sample, "mu", Vector3::z(), AngleUnit::Degree)?;
    geometry.add_rotation(sample, "komega", -Vector3::y(), AngleUnit::Degree)?;
    geometry.add_rotation(sample, "kappa", kappa_axis(), AngleUnit::Degree)?;
    geometry.add_rotation(sample, "kphi", -Vector3::y(), AngleUnit::Degree)?;
    let detector = geometry.add_holder();
    geometry.add_rotation(detector, "gamma", Vector3::z(), AngleUnit::Degree)?;
    geometry.add_rotation(detector, "delta", -Vector3::y(), AngleUnit::Degree)?;
    geometry.update();
    Ok(geometry)
}

/// Vertical bisecting condition on the virtual eulerian omega:
/// delta = 2·omega(komega, kappa).
fn bissector_vertical(args: &ResidualArgs) -> EngineResult<Vec<f64>> {
    let omega = eulerian_omega(args.geometry)?;
    let delta = axis_rad(args, "delta")?;
    Ok(vec![restrict_sym(delta - 2.0 * omega)])
}

fn constant_omega_vertical(args: &ResidualArgs) -> EngineResult<Vec<f64>> {
    let omega = eulerian_omega(args.geometry)?;
    let target = args.parameter("omega")?.value(UnitScale::Default);
    Ok(vec![restrict_sym(omega - target)])
}

fn hkl_modes() -> Vec<Mode> {
    let rw = Capabilities::READABLE | Capabilities::WRITABLE;
    let all = || vec!["mu", "komega", "kappa", "kphi", "gamma", "delta"];
    let vertical = || vec!["komega", "kappa", "kphi", "delta"];
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
            vertical(),
            vec![constant_omega_vertical, rubh_minus_q],
            vec![Parameter::angle("omega")],
            rw,
        ),
        Mode::new(
            "lifting_detector_kphi",
            all(),
            vec!["kphi", "gamma", "delta"],
            vec![rubh_minus_q],
            vec![],
            rw,
        ),
        Mode::new(
            "lifting_detector_komega",
            all(),
            vec!["komega", "gamma", "delta"],
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
    ]
}

fn k6c_engines() -> Vec<Engine> {
    vec![
        hkl_engine(hkl_modes()),
        eulerians_engine(),
        psi_engine(vec!["komega", "kappa", "kphi", "delta"]),
        q2_engine(vec!["gamma", "delta"]),
        tth2_engine(vec!["gamma", "delta"]),
        incidence_engine(vec!["mu", "komega", "kappa", "kphi"]),
        emergence_engine(vec!["mu", "komega", "kappa", "kphi", "gamma", "delta"]),
    ]
}

pub(crate) fn factories() -> Vec<Factory> {
    vec![Factory::new(
        K6C,
        K6C_DESCRIPTION,
        K6C_AXES,
        k6c_geometry,
        k6c_engines,
    )]
}
