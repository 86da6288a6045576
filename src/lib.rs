#![doc = include_str!("../README.md")]
/*
 * GONIO Toolkit
 * Copyright (C) 2021-onward Christopher Rabotin <christopher.rabotin@gmail.com> et al. (cf. AUTHORS.md)
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 *
 * Documentation: https://nyxspace.com/
 */

extern crate const_format;
extern crate log;

pub mod constants;
pub mod detector;
pub mod diffractometers;
pub mod engines;
pub mod errors;
pub mod geometry;
pub mod math;
pub mod parameter;
pub mod sample;

pub mod prelude {
    pub use crate::detector::Detector;
    pub use crate::diffractometers::{self, Factory};
    pub use crate::engines::{seed_solver_rng, Capabilities, Engine, EngineList, Mode};
    pub use crate::errors::{
        DiffractometerError, GeometryError, MathError, ParameterError, SampleError,
    };
    pub use crate::geometry::{Geometry, GeometryList};
    pub use crate::math::units::{AngleUnit, LengthUnit, Unit, UnitScale};
    pub use crate::math::Vector3;
    pub use crate::parameter::Parameter;
    pub use crate::sample::{Lattice, Sample};
}

#[macro_export]
macro_rules! f64_eq {
    ($x:expr, $val:expr, $msg:expr) => {
        f64_eq_tol!($x, $val, 1e-10, $msg)
    };
}

#[macro_export]
macro_rules! f64_eq_tol {
    ($x:expr, $val:expr, $tol:expr, $msg:expr) => {
        assert!(
            ($x - $val).abs() < $tol,
            "{}: {:.2e}\tgot: {}\twant: {}",
            $msg,
            ($x - $val).abs(),
            $x,
            $val
        )
    };
}
