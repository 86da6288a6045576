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
use crate::engines::eulerians::{
    eulerian_chi, eulerian_omega, eulerian_phi, eulerians_engine,
};
use crate::engines::hkl::{
    axis_rad, double_diffraction, double_diffraction_parameters, hkl_engine, psi_constant,
    psi_constant_parameters, rubh_minus_q,
};
use crate::engines::psi::psi_engine;
use crate::engines::q::q_engine;
use crate::engines::surface::{emergence_engine, incidence_engine};
use crate::engines::tth::tth_engine;
use crate::engines::{Capabilities, Engine, EngineResult, Mode, ResidualArgs};
use crate::errors::GeometryError;
use crate::geometry::Geometry;
use crate::math::angles::restrict_sym;
use crate::math::units::{AngleUnit, UnitScale};
use crate::math::Vector3;
use crate::parameter::Parameter;

/// Tilt of the kappa axis of the SOLEIL-style kappa goniometers, in degrees.
pub(crate) const KAPPA_ALPHA_DEG: f64 = 50.031;
pub(crate) const KAPPA_ALPHA_TEXT: &str = "50.031";

const K4CV: &str = "K4CV";
const K4CV_AXES: &[&str] = &["komega", "kappa", "kphi", "tth"];
const K4CV_DESCRIPTION: &str = concatcp!(
    "Kappa 4-circle vertical geometry, kappa tilt alpha = ",
    KAPPA_ALPHA_TEXT,
    " deg.\n",
    "+ sample chain: komega around (0, -1, 0), kappa around (0, -cos alpha, -sin alpha), ",
    "kphi around (0, -1, 0)\n",
    "+ detector chain: tth around (0, -1, 0)\n",
    "All rotations follow the right hand rule around the stated direction.",
);

pub(crate) fn kappa_axis() -> Vector3 {
    let alpha = KAPPA_ALPHA_DEG.to_radians();
    Vector3::new(0.0, -alpha.cos(), -alpha.sin())
}

fn k4cv_geometry() -> Result<Geometry, GeometryError> {
    let mut geometry = Geometry::new(K4CV, K4CV_DESCRIPTION, DEFAULT_WAVELENGTH_NM)?;
    let sample = geometry.add_holder();
    geometry.add_rotation(sample, "komega", -Vector3::y(), AngleUnit::Degree)?;
    geometry.add_rotation(sample, "kappa", kappa_axis(), AngleUnit::Degree)?;
    geometry.add_rotation(sample, "kphi", -Vector3::y(), AngleUnit::Degree)?;
    let detector = geometry.add_holder();
    geometry.add_rotation(detector, "tth", -Vector3::y(), AngleUnit::Degree)?;
    geometry.update();
    Ok(geometry)
}

/// Bisecting condition expressed on the virtual eulerian omega:
/// tth = 2·omega(komega, kappa).
fn bissector(args: &ResidualArgs) -> EngineResult<Vec<f64>> {
    let omega = eulerian_omega(args.geometry)?;
    let tth = axis_rad(args, "tth")?;
    Ok(vec![restrict_sym(tth - 2.0 * omega)])
}

/// The virtual eulerian omega stays pinned to the `omega` mode parameter.
fn constant_omega(args: &ResidualArgs) -> EngineResult<Vec<f64>> {
    let omega = eulerian_omega(args.geometry)?;
    let target = args.parameter("omega")?.value(UnitScale::Default);
    Ok(vec![restrict_sym(omega - target)])
}

fn constant_chi(args: &ResidualArgs) -> EngineResult<Vec<f64>> {
    let chi = eulerian_chi(args.geometry)?;
    let target = args.parameter("chi")?.value(UnitScale::Default);
    Ok(vec![restrict_sym(chi - target)])
}

fn constant_phi(args: &ResidualArgs) -> EngineResult<Vec<f64>> {
    let phi = eulerian_phi(args.geometry)?;
    let target = args.parameter("phi")?.value(UnitScale::Default);
    Ok(vec![restrict_sym(phi - target)])
}

fn hkl_modes() -> Vec<Mode> {
    let rw = Capabilities::READABLE | Capabilities::WRITABLE;
    let all = || vec!["komega", "kappa", "kphi", "tth"];
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
            all(),
            vec![constant_omega, rubh_minus_q],
            vec![Parameter::angle("omega")],
            rw,
        ),
        Mode::new(
            "constant_chi",
            all(),
            all(),
            vec![constant_chi, rubh_minus_q],
            vec![Parameter::angle("chi")],
            rw,
        ),
        Mode::new(
            "constant_phi",
            all(),
            all(),
            vec![constant_phi, rubh_minus_q],
            vec![Parameter::angle("phi")],
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
    ]
}

fn k4cv_engines() -> Vec<Engine> {
    vec![
        hkl_engine(hkl_modes()),
        eulerians_engine(),
        psi_engine(vec!["komega", "kappa", "kphi", "tth"]),
        q_engine(vec!["tth"]),
        tth_engine(vec!["tth"]),
        incidence_engine(vec!["komega", "kappa", "kphi"]),
        emergence_engine(vec!["komega", "kappa", "kphi", "tth"]),
    ]
}

pub(crate) fn factories() -> Vec<Factory> {
    vec![Factory::new(
        K4CV,
        K4CV_DESCRIPTION,
        K4CV_AXES,
        k4cv_geometry,
        k4cv_engines,
    )]
}
