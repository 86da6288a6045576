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
use crate::engines::q::alpha_rad;
use crate::engines::{
    solver, Capabilities, Dependencies, Engine, EngineContext, EngineOps, EngineResult, Mode,
    ResidualArgs,
};
use crate::geometry::{Geometry, GeometryList};
use crate::math::angles;
use crate::parameter::Parameter;

/// The scattering angle between ki and kf, signed by the same vertical
/// convention as the q engine.
pub(crate) fn tth_signed(geometry: &Geometry, detector: &Detector) -> f64 {
    let ki = geometry.ki();
    let kf = geometry.kf(detector);
    let cos_tth = (ki.dot(&kf) / (ki.norm() * kf.norm())).clamp(-1.0, 1.0);
    let tth = cos_tth.acos();
    if kf.z < 0.0 {
        -tth
    } else {
        tth
    }
}

fn tth_residual(args: &ResidualArgs) -> EngineResult<Vec<f64>> {
    Ok(vec![angles::restrict_sym(
        tth_signed(args.geometry, args.detector) - args.targets[0],
    )])
}

fn tth2_residual(args: &ResidualArgs) -> EngineResult<Vec<f64>> {
    Ok(vec![
        tth_signed(args.geometry, args.detector).abs() - args.targets[0],
        angles::restrict_sym(alpha_rad(args.geometry, args.detector) - args.targets[1]),
    ])
}

fn tth_get_op(engine: &mut Engine, ctx: &EngineContext) -> EngineResult<()> {
    engine.write_pseudo_values(&[tth_signed(ctx.geometry, ctx.detector)]);
    Ok(())
}

fn tth2_get_op(engine: &mut Engine, ctx: &EngineContext) -> EngineResult<()> {
    let tth = tth_signed(ctx.geometry, ctx.detector).abs();
    let alpha = alpha_rad(ctx.geometry, ctx.detector);
    engine.write_pseudo_values(&[tth, alpha]);
    Ok(())
}

fn auto_set_op(engine: &Engine, ctx: &EngineContext, targets: &[f64]) -> EngineResult<GeometryList> {
    solver::auto_set(engine, ctx, targets)
}

/// Builds the tth engine: the signed scattering angle of a single-circle
/// detector arm.
pub fn tth_engine(write_axes: Vec<&'static str>) -> Engine {
    let read_axes = write_axes.clone();
    let mode = Mode::new(
        "tth",
        read_axes,
        write_axes,
        vec![tth_residual],
        vec![],
        Capabilities::READABLE | Capabilities::WRITABLE,
    );
    Engine::new(
        "tth",
        Dependencies::AXES,
        vec![Parameter::angle("tth")],
        vec![mode],
        EngineOps {
            get: tth_get_op,
            set: auto_set_op,
        },
    )
}

/// Builds the tth2 engine: the scattering angle plus the orientation of kf
/// around the beam, for two-circle detector arms.
pub fn tth2_engine(write_axes: Vec<&'static str>) -> Engine {
    let read_axes = write_axes.clone();
    let mode = Mode::new(
        "tth2",
        read_axes,
        write_axes,
        vec![tth2_residual],
        vec![],
        Capabilities::READABLE | Capabilities::WRITABLE,
    );
    Engine::new(
        "tth2",
        Dependencies::AXES,
        vec![Parameter::angle("tth"), Parameter::angle("alpha")],
        vec![mode],
        EngineOps {
            get: tth2_get_op,
            set: auto_set_op,
        },
    )
}
