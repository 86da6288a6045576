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
use crate::engines::hkl::q_vector;
use crate::engines::surface::{surface_mode_parameters, surface_normal};
use crate::engines::{
    solver, Capabilities, Dependencies, Engine, EngineContext, EngineOps, EngineResult, Mode,
    ResidualArgs,
};
use crate::geometry::{Geometry, GeometryList};
use crate::math::angles;
use crate::parameter::Parameter;

/// Magnitude of the momentum transfer, signed by the vertical orientation of
/// kf: q = 2·|ki|·sin(θ) with θ half the scattering angle, negative when kf
/// dips below the xOy plane. The sign is a convention inherited from the
/// original control software, not a derivation.
pub(crate) fn q_signed(geometry: &Geometry, detector: &Detector) -> f64 {
    let ki = geometry.ki();
    let kf = geometry.kf(detector);
    let cos_tth = (ki.dot(&kf) / (ki.norm() * kf.norm())).clamp(-1.0, 1.0);
    let theta = cos_tth.acos() / 2.0;
    let q = 2.0 * ki.norm() * theta.sin();
    if kf.z < 0.0 {
        -q
    } else {
        q
    }
}

/// Orientation of kf projected on the yOz plane: alpha = atan2(kf_z, kf_y).
pub(crate) fn alpha_rad(geometry: &Geometry, detector: &Detector) -> f64 {
    let kf = geometry.kf(detector);
    kf.z.atan2(kf.y)
}

fn q_residual(args: &ResidualArgs) -> EngineResult<Vec<f64>> {
    Ok(vec![
        q_signed(args.geometry, args.detector) - args.targets[0],
    ])
}

fn q2_residual(args: &ResidualArgs) -> EngineResult<Vec<f64>> {
    Ok(vec![
        q_signed(args.geometry, args.detector).abs() - args.targets[0],
        angles::restrict_sym(alpha_rad(args.geometry, args.detector) - args.targets[1]),
    ])
}

fn qper_qpar_values(args: &ResidualArgs) -> EngineResult<(f64, f64)> {
    let normal = surface_normal(args)?;
    let q = q_vector(args.geometry, args.detector);
    qper_qpar_decompose(&q, &normal, &args.geometry.ki())
}

/// Decomposes Q against the surface normal: qper along n̂ (signed by the
/// scalar product), qpar in plane (signed by the projection on the beam
/// axis). Both signs are conventions carried over from the original.
pub(crate) fn qper_qpar_decompose(
    q: &crate::math::Vector3,
    normal_lab: &crate::math::Vector3,
    ki: &crate::math::Vector3,
) -> EngineResult<(f64, f64)> {
    let qper = q.dot(normal_lab);
    let in_plane = q - normal_lab * qper;
    let qpar = in_plane.norm().copysign(q.dot(&ki.normalize()));
    Ok((qper, qpar))
}

fn qper_qpar_residual(args: &ResidualArgs) -> EngineResult<Vec<f64>> {
    let (qper, qpar) = qper_qpar_values(args)?;
    Ok(vec![qper - args.targets[0], qpar - args.targets[1]])
}

fn q_get_op(engine: &mut Engine, ctx: &EngineContext) -> EngineResult<()> {
    let q = q_signed(ctx.geometry, ctx.detector);
    engine.write_pseudo_values(&[q]);
    Ok(())
}

fn q2_get_op(engine: &mut Engine, ctx: &EngineContext) -> EngineResult<()> {
    let q = q_signed(ctx.geometry, ctx.detector).abs();
    let alpha = alpha_rad(ctx.geometry, ctx.detector);
    engine.write_pseudo_values(&[q, alpha]);
    Ok(())
}

fn qper_qpar_get_op(engine: &mut Engine, ctx: &EngineContext) -> EngineResult<()> {
    let mode = engine.current_mode();
    let args = ResidualArgs {
        geometry: ctx.geometry,
        detector: ctx.detector,
        sample: ctx.sample,
        targets: &[],
        parameters: mode.parameters(),
        reference: None,
    };
    let (qper, qpar) = qper_qpar_values(&args)?;
    engine.write_pseudo_values(&[qper, qpar]);
    Ok(())
}

fn auto_set_op(engine: &Engine, ctx: &EngineContext, targets: &[f64]) -> EngineResult<GeometryList> {
    solver::auto_set(engine, ctx, targets)
}

/// Builds the q engine: the signed momentum transfer magnitude, driven by the
/// detector circle alone.
pub fn q_engine(write_axes: Vec<&'static str>) -> Engine {
    let read_axes = write_axes.clone();
    let mode = Mode::new(
        "q",
        read_axes,
        write_axes,
        vec![q_residual],
        vec![],
        Capabilities::READABLE | Capabilities::WRITABLE,
    );
    Engine::new(
        "q",
        Dependencies::AXES | Dependencies::ENERGY,
        vec![Parameter::scalar("q", 0.0, -40.0, 40.0)],
        vec![mode],
        EngineOps {
            get: q_get_op,
            set: auto_set_op,
        },
    )
}

/// Builds the q2 engine: |Q| plus the orientation of kf around the beam.
pub fn q2_engine(write_axes: Vec<&'static str>) -> Engine {
    let read_axes = write_axes.clone();
    let mode = Mode::new(
        "q2",
        read_axes,
        write_axes,
        vec![q2_residual],
        vec![],
        Capabilities::READABLE | Capabilities::WRITABLE,
    );
    Engine::new(
        "q2",
        Dependencies::AXES | Dependencies::ENERGY,
        vec![
            Parameter::scalar("q", 0.0, 0.0, 40.0),
            Parameter::angle("alpha"),
        ],
        vec![mode],
        EngineOps {
            get: q2_get_op,
            set: auto_set_op,
        },
    )
}

/// Builds the qper_qpar engine: Q decomposed along and across the surface
/// normal carried by the (x, y, z) mode parameters.
pub fn qper_qpar_engine(write_axes: Vec<&'static str>) -> Engine {
    let read_axes = write_axes.clone();
    let mode = Mode::new(
        "qper_qpar",
        read_axes,
        write_axes,
        vec![qper_qpar_residual],
        surface_mode_parameters(),
        Capabilities::READABLE | Capabilities::WRITABLE,
    );
    Engine::new(
        "qper_qpar",
        Dependencies::AXES | Dependencies::ENERGY,
        vec![
            Parameter::scalar("qper", 0.0, -40.0, 40.0),
            Parameter::scalar("qpar", 0.0, -40.0, 40.0),
        ],
        vec![mode],
        EngineOps {
            get: qper_qpar_get_op,
            set: auto_set_op,
        },
    )
}
