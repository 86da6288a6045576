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
use crate::engines::{
    Capabilities, Dependencies, Engine, EngineContext, EngineError, EngineOps, EngineResult, Mode,
    ReadOnlyModeSnafu, ResidualArgs,
};
use crate::errors::MathError;
use crate::geometry::{Geometry, GeometryList};
use crate::math::units::UnitScale;
use crate::math::Vector3;
use crate::parameter::Parameter;

/// The sample surface normal described by the (x, y, z) mode parameters,
/// rotated by the sample chain into the lab frame.
pub(crate) fn surface_normal(args: &ResidualArgs) -> EngineResult<Vector3> {
    let normal = Vector3::new(
        args.parameter("x")?.value(UnitScale::Default),
        args.parameter("y")?.value(UnitScale::Default),
        args.parameter("z")?.value(UnitScale::Default),
    );
    rotated_normal(args.geometry, &normal)
}

pub(crate) fn rotated_normal(geometry: &Geometry, normal: &Vector3) -> EngineResult<Vector3> {
    if normal.norm() < f64::EPSILON {
        return Err(EngineError::SolveFailed {
            source: MathError::DomainError {
                value: normal.norm(),
                msg: "the surface normal is null",
            },
        });
    }
    Ok(geometry.sample_rotation() * normal.normalize())
}

/// Signed incidence angle of the incoming beam above the surface: positive
/// when the beam hits the front face of the surface, asin(-k̂i·n̂).
pub(crate) fn incidence_rad(geometry: &Geometry, normal_lab: &Vector3) -> EngineResult<f64> {
    let ki_hat = geometry.ki().normalize();
    Ok((-ki_hat.dot(normal_lab)).clamp(-1.0, 1.0).asin())
}

/// Signed emergence angle of the outgoing beam above the surface,
/// asin(k̂f·n̂).
pub(crate) fn emergence_rad(
    geometry: &Geometry,
    detector: &Detector,
    normal_lab: &Vector3,
) -> EngineResult<f64> {
    let kf_hat = geometry.kf(detector).normalize();
    Ok(kf_hat.dot(normal_lab).clamp(-1.0, 1.0).asin())
}

/// Azimuth of the surface normal around the beam axis: the orientation of its
/// projection on the yOz plane.
fn azimuth_rad(normal_lab: &Vector3) -> f64 {
    normal_lab.z.atan2(normal_lab.y)
}

fn surface_parameters() -> Vec<Parameter> {
    vec![
        Parameter::scalar("x", 0.0, -1.0, 1.0).with_description("surface normal"),
        Parameter::scalar("y", 0.0, -1.0, 1.0).with_description("surface normal"),
        Parameter::scalar("z", 1.0, -1.0, 1.0).with_description("surface normal"),
    ]
}

fn normal_from_engine(engine: &Engine, ctx: &EngineContext) -> EngineResult<Vector3> {
    let parameters = engine.current_mode().parameters();
    let normal = Vector3::new(
        parameters[0].value(UnitScale::Default),
        parameters[1].value(UnitScale::Default),
        parameters[2].value(UnitScale::Default),
    );
    rotated_normal(ctx.geometry, &normal)
}

fn incidence_get_op(engine: &mut Engine, ctx: &EngineContext) -> EngineResult<()> {
    let normal = normal_from_engine(engine, ctx)?;
    let incidence = incidence_rad(ctx.geometry, &normal)?;
    engine.write_pseudo_values(&[incidence, azimuth_rad(&normal)]);
    Ok(())
}

fn emergence_get_op(engine: &mut Engine, ctx: &EngineContext) -> EngineResult<()> {
    let normal = normal_from_engine(engine, ctx)?;
    let emergence = emergence_rad(ctx.geometry, ctx.detector, &normal)?;
    engine.write_pseudo_values(&[emergence, azimuth_rad(&normal)]);
    Ok(())
}

fn read_only_set_op(
    engine: &Engine,
    _ctx: &EngineContext,
    _targets: &[f64],
) -> EngineResult<GeometryList> {
    ReadOnlyModeSnafu {
        engine: engine.name(),
        mode: engine.current_mode().name(),
    }
    .fail()
}

/// Builds the read-only incidence engine: the signed angle of the incoming
/// beam above the sample surface, plus the azimuth of the surface normal.
pub fn incidence_engine(read_axes: Vec<&'static str>) -> Engine {
    let mode = Mode::new(
        "incidence",
        read_axes,
        vec![],
        vec![],
        surface_parameters(),
        Capabilities::READABLE,
    );
    Engine::new(
        "incidence",
        Dependencies::AXES,
        vec![Parameter::angle("incidence"), Parameter::angle("azimuth")],
        vec![mode],
        EngineOps {
            get: incidence_get_op,
            set: read_only_set_op,
        },
    )
}

/// Builds the read-only emergence engine, the kf-side twin of incidence.
pub fn emergence_engine(read_axes: Vec<&'static str>) -> Engine {
    let mode = Mode::new(
        "emergence",
        read_axes,
        vec![],
        vec![],
        surface_parameters(),
        Capabilities::READABLE,
    );
    Engine::new(
        "emergence",
        Dependencies::AXES | Dependencies::ENERGY,
        vec![Parameter::angle("emergence"), Parameter::angle("azimuth")],
        vec![mode],
        EngineOps {
            get: emergence_get_op,
            set: read_only_set_op,
        },
    )
}

/// Mode parameters shared by the surface-aware writable modes
/// (reflectivity, emergence_fixed, qper_qpar).
pub(crate) fn surface_mode_parameters() -> Vec<Parameter> {
    surface_parameters()
}

/// Mode parameters of the emergence_fixed hkl modes.
pub(crate) fn emergence_fixed_parameters() -> Vec<Parameter> {
    let mut parameters = surface_parameters();
    parameters.push(Parameter::angle("emergence"));
    parameters
}
