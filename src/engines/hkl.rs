/*
 * GONIO Toolkit
 * Copyright (C) 2021-onward Christopher Rabotin <christopher.rabotin@gmail.com> et al. (cf. AUTHORS.md)
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 *
 * Documentation: https://nyxspace.com/
 */

use crate::detector::Detector;
use crate::engines::psi::psi_angle_rad;
use crate::engines::surface::{emergence_rad, incidence_rad, surface_normal};
use crate::engines::{
    solver, Dependencies, Engine, EngineContext, EngineOps, EngineResult, EngineSampleSnafu, Mode,
    ResidualArgs,
};
use crate::geometry::{Geometry, GeometryList};
use crate::math::units::UnitScale;
use crate::math::{angles, Vector3};
use crate::parameter::Parameter;
use crate::sample::Sample;
use snafu::{IntoError, ResultExt};

/// The momentum transfer Q = kf - ki in the lab frame.
pub(crate) fn q_vector(geometry: &Geometry, detector: &Detector) -> Vector3 {
    geometry.kf(detector) - geometry.ki()
}

/// Reads one axis of the working geometry, in radians.
pub(crate) fn axis_rad(args: &ResidualArgs, name: &str) -> EngineResult<f64> {
    args.geometry
        .axis_value(name, UnitScale::Default)
        .map_err(|source| {
            crate::engines::EngineGeometrySnafu {
                action: "reading an axis inside a residual",
            }
            .into_error(source)
        })
}

/// Forward computation of the Miller indices from the current axis
/// positions: (R_s · UB)⁻¹ · (kf - ki).
pub fn hkl_from_geometry(
    geometry: &Geometry,
    detector: &Detector,
    sample: &Sample,
) -> EngineResult<Vector3> {
    let ub = sample.ub().context(EngineSampleSnafu {
        action: "computing UB for the hkl projection",
    })?;
    let q = q_vector(geometry, detector);
    geometry
        .to_reciprocal(&ub, &q)
        .map_err(|source| crate::engines::EngineError::SolveFailed { source })
}

/// The shared residual block of every hkl mode:
/// R_s · UB · (h,k,l)ᵀ - (kf - ki), three equations.
pub(crate) fn rubh_minus_q(args: &ResidualArgs) -> EngineResult<Vec<f64>> {
    let hkl = Vector3::new(args.targets[0], args.targets[1], args.targets[2]);
    let ub = args.sample.ub().context(EngineSampleSnafu {
        action: "computing UB for the hkl residual",
    })?;
    let rotated = args.geometry.sample_rotation() * (ub * hkl);
    let q = q_vector(args.geometry, args.detector);
    Ok(vec![rotated.x - q.x, rotated.y - q.y, rotated.z - q.z])
}

/// Double diffraction: the second node (h2, k2, l2) must sit on the Ewald
/// sphere, |R_s · UB · h2 + ki|² - |ki|² = 0.
pub(crate) fn double_diffraction(args: &ResidualArgs) -> EngineResult<Vec<f64>> {
    let h2 = Vector3::new(
        args.parameter("h2")?.value(UnitScale::Default),
        args.parameter("k2")?.value(UnitScale::Default),
        args.parameter("l2")?.value(UnitScale::Default),
    );
    let ub = args.sample.ub().context(EngineSampleSnafu {
        action: "computing UB for the double-diffraction residual",
    })?;
    let node = args.geometry.sample_rotation() * (ub * h2) + args.geometry.ki();
    Ok(vec![node.norm_squared() - args.geometry.ki().norm_squared()])
}

/// Constant-psi: the azimuth of the reference reflection (h2, k2, l2) around
/// Q stays pinned to the `psi` mode parameter.
pub(crate) fn psi_constant(args: &ResidualArgs) -> EngineResult<Vec<f64>> {
    let h2 = Vector3::new(
        args.parameter("h2")?.value(UnitScale::Default),
        args.parameter("k2")?.value(UnitScale::Default),
        args.parameter("l2")?.value(UnitScale::Default),
    );
    let psi = psi_angle_rad(args.geometry, args.detector, args.sample, &h2)?;
    let target = args.parameter("psi")?.value(UnitScale::Default);
    Ok(vec![angles::restrict_sym(psi - target)])
}

/// Fixed emergence angle of kf above the surface described by the (x, y, z)
/// mode parameters.
pub(crate) fn emergence_fixed(args: &ResidualArgs) -> EngineResult<Vec<f64>> {
    let normal = surface_normal(args)?;
    let emergence = emergence_rad(args.geometry, args.detector, &normal)?;
    let target = args.parameter("emergence")?.value(UnitScale::Default);
    Ok(vec![emergence - target])
}

/// Specular condition: the beam leaves the surface at the angle it came in.
pub(crate) fn reflectivity(args: &ResidualArgs) -> EngineResult<Vec<f64>> {
    let normal = surface_normal(args)?;
    let incidence = incidence_rad(args.geometry, &normal)?;
    let emergence = emergence_rad(args.geometry, args.detector, &normal)?;
    Ok(vec![incidence - emergence])
}

/// Mode parameters of the double-diffraction modes.
pub(crate) fn double_diffraction_parameters() -> Vec<Parameter> {
    vec![
        Parameter::scalar("h2", 1.0, -10.0, 10.0),
        Parameter::scalar("k2", 1.0, -10.0, 10.0),
        Parameter::scalar("l2", 1.0, -10.0, 10.0),
    ]
}

/// Mode parameters of the constant-psi modes.
pub(crate) fn psi_constant_parameters() -> Vec<Parameter> {
    vec![
        Parameter::scalar("h2", 1.0, -10.0, 10.0),
        Parameter::scalar("k2", 1.0, -10.0, 10.0),
        Parameter::scalar("l2", 1.0, -10.0, 10.0),
        Parameter::angle("psi"),
    ]
}

fn get_op(engine: &mut Engine, ctx: &EngineContext) -> EngineResult<()> {
    let hkl = hkl_from_geometry(ctx.geometry, ctx.detector, ctx.sample)?;
    engine.write_pseudo_values(&[hkl.x, hkl.y, hkl.z]);
    Ok(())
}

fn set_op(engine: &Engine, ctx: &EngineContext, targets: &[f64]) -> EngineResult<GeometryList> {
    solver::auto_set(engine, ctx, targets)
}

/// Builds the hkl engine over the provided mode catalog.
pub fn hkl_engine(modes: Vec<Mode>) -> Engine {
    Engine::new(
        "hkl",
        Dependencies::AXES | Dependencies::ENERGY | Dependencies::SAMPLE,
        vec![
            Parameter::scalar("h", 0.0, -10.0, 10.0),
            Parameter::scalar("k", 0.0, -10.0, 10.0),
            Parameter::scalar("l", 0.0, -10.0, 10.0),
        ],
        modes,
        EngineOps {
            get: get_op,
            set: set_op,
        },
    )
}
