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
use crate::engines::hkl::{hkl_engine, reflectivity, rubh_minus_q};
use crate::engines::q::{q2_engine, qper_qpar_engine};
use crate::engines::surface::{
    emergence_engine, incidence_engine, surface_mode_parameters,
};
use crate::engines::tth::tth2_engine;
use crate::engines::{Capabilities, Engine, Mode};
use crate::errors::GeometryError;
use crate::geometry::Geometry;
use crate::math::units::AngleUnit;
use crate::math::Vector3;

const ZAXIS: &str = "ZAXIS";
const ZAXIS_AXES: &[&str] = &["mu", "omega", "delta", "gamma"];
const ZAXIS_DESCRIPTION: &str = concatcp!(
    "Z-axis surface geometry.\n",
    "+ sample chain: mu around (0, 0, 1), omega around (0, -1, 0)\n",
    "+ detector chain: delta around (0, -1, 0), gamma around (0, 0, 1)\n",
    "All rotations follow the right hand rule around the stated direction.",
);

fn zaxis_geometry() -> Result<Geometry, GeometryError> {
    let mut geometry = Geometry::new(ZAXIS, ZAXIS_DESCRIPTION, DEFAULT_WAVELENGTH_NM)?;
    let sample = geometry.add_holder();
    geometry.add_rotation(sample, "mu", Vector3::z(), AngleUnit::Degree)?;
    geometry.add_rotation(sample, "omega", -Vector3::y(), AngleUnit::Degree)?;
    let detector = geometry.add_holder();
    geometry.add_rotation(detector, "delta", -Vector3::y(), AngleUnit::Degree)?;
    geometry.add_rotation(detector, "gamma", Vector3::z(), AngleUnit::Degree)?;
    geometry.update();
    Ok(geometry)
}

fn hkl_modes() -> Vec<Mode> {
    let rw = Capabilities::READABLE | Capabilities::WRITABLE;
    let all = || vec!["mu", "omega", "delta", "gamma"];
    vec![
        Mode::new(
            "zaxis",
            all(),
            vec!["omega", "delta", "gamma"],
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

fn zaxis_engines() -> Vec<Engine> {
    vec![
        hkl_engine(hkl_modes()),
        q2_engine(vec!["delta", "gamma"]),
        qper_qpar_engine(vec!["delta", "gamma"]),
        tth2_engine(vec!["delta", "gamma"]),
        incidence_engine(vec!["mu", "omega"]),
        emergence_engine(vec!["mu", "omega", "delta", "gamma"]),
    ]
}

pub(crate) fn factories() -> Vec<Factory> {
    vec![Factory::new(
        ZAXIS,
        ZAXIS_DESCRIPTION,
        ZAXIS_AXES,
        zaxis_geometry,
        zaxis_engines,
    )]
}
