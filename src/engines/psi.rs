/*
 * GONIO Toolkit
 * Copyright (C) 2021-onward Christopher Rabotin <christopher.rabotin@gmail.com> et al. (cf. AUTHORS.md)
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 *
 * Documentation: https://nyxspace.com/
 */

use snafu::ResultExt;

use crate::detector::Detector;
use crate::engines::hkl::q_vector;
use crate::engines::{
    solver, Capabilities, Dependencies, Engine, EngineContext, EngineError, EngineOps,
    EngineResult, EngineSampleSnafu, Mode, NotInitializedSnafu, ResidualArgs,
};
use crate::errors::MathError;
use crate::geometry::GeometryList;
use crate::math::units::UnitScale;
use crate::math::{perp_vector, Vector3};
use crate::parameter::Parameter;
use crate::sample::Sample;

/// Norm below which Q is considered null and the psi angle undefined.
const Q_EPSILON: f64 = 1e-9;

/// The azimuth of the reference reflection `h2` around the momentum transfer
/// Q: the oriented angle, around Q̂, between the projections onto the plane
/// perpendicular to Q of the incident beam and of R_s · UB · h2.
pub(crate) fn psi_angle_rad(
    geometry: &crate::geometry::Geometry,
    detector: &Detector,
    sample: &Sample,
    h2: &Vector3,
) -> EngineResult<f64> {
    let q = q_vector(geometry, detector);
    if q.norm() < Q_EPSILON {
        return Err(EngineError::SolveFailed {
            source: MathError::DomainError {
                value: q.norm(),
                msg: "Q is null, the psi angle is undefined",
            },
        });
    }
    let q_hat = q.normalize();

    let ub = sample.ub().context(EngineSampleSnafu {
        action: "computing UB for the psi angle",
    })?;
    let reference = geometry.sample_rotation() * (ub * h2);

    let proj_ki = perp_vector(&geometry.ki(), &q);
    let proj_ref = perp_vector(&reference, &q);
    if proj_ki.norm() < Q_EPSILON || proj_ref.norm() < Q_EPSILON {
        return Err(EngineError::SolveFailed {
            source: MathError::DomainError {
                value: proj_ref.norm(),
                msg: "the reference reflection is parallel to Q",
            },
        });
    }

    let sin_psi = proj_ki.cross(&proj_ref).dot(&q_hat);
    let cos_psi = proj_ki.dot(&proj_ref);
    Ok(sin_psi.atan2(cos_psi))
}

fn reference_h2(args: &ResidualArgs) -> EngineResult<Vector3> {
    Ok(Vector3::new(
        args.parameter("h2")?.value(UnitScale::Default),
        args.parameter("k2")?.value(UnitScale::Default),
        args.parameter("l2")?.value(UnitScale::Default),
    ))
}

/// One equation: the psi angle matches the requested pseudo-axis value.
fn psi_matches_target(args: &ResidualArgs) -> EngineResult<Vec<f64>> {
    let h2 = reference_h2(args)?;
    let psi = psi_angle_rad(args.geometry, args.detector, args.sample, &h2)?;
    Ok(vec![crate::math::angles::restrict_sym(psi - args.targets[0])])
}

/// Three equations: the Miller indices of the initialization snapshot stay in
/// diffraction condition while the sample spins around Q.
fn hkl_preserved(args: &ResidualArgs) -> EngineResult<Vec<f64>> {
    let reference = args.reference.ok_or_else(|| {
        NotInitializedSnafu { engine: "psi" }.build()
    })?;
    let hkl = crate::engines::hkl::hkl_from_geometry(args.geometry, args.detector, args.sample)?;
    let hkl0 = crate::engines::hkl::hkl_from_geometry(reference, args.detector, args.sample)?;
    Ok(vec![hkl.x - hkl0.x, hkl.y - hkl0.y, hkl.z - hkl0.z])
}

fn init_check(ctx: &EngineContext) -> EngineResult<()> {
    // Initialization only makes sense in diffraction condition.
    let q = q_vector(ctx.geometry, ctx.detector);
    if q.norm() < Q_EPSILON {
        return Err(EngineError::SolveFailed {
            source: MathError::DomainError {
                value: q.norm(),
                msg: "cannot initialize the psi engine on a null Q",
            },
        });
    }
    Ok(())
}

fn get_op(engine: &mut Engine, ctx: &EngineContext) -> EngineResult<()> {
    if !engine.initialized() {
        return NotInitializedSnafu {
            engine: engine.name(),
        }
        .fail();
    }
    let mode = engine.current_mode();
    let h2 = Vector3::new(
        mode.parameters()[0].value(UnitScale::Default),
        mode.parameters()[1].value(UnitScale::Default),
        mode.parameters()[2].value(UnitScale::Default),
    );
    let psi = psi_angle_rad(ctx.geometry, ctx.detector, ctx.sample, &h2)?;
    engine.write_pseudo_values(&[psi]);
    Ok(())
}

fn set_op(engine: &Engine, ctx: &EngineContext, targets: &[f64]) -> EngineResult<GeometryList> {
    if !engine.initialized() {
        return NotInitializedSnafu {
            engine: engine.name(),
        }
        .fail();
    }
    solver::auto_set(engine, ctx, targets)
}

/// Builds the psi engine: the azimuth of a reference reflection around Q.
/// The engine must be initialized on a diffracting position first; setting
/// psi then spins the sample around the initialization Q.
pub fn psi_engine(write_axes: Vec<&'static str>) -> Engine {
    let read_axes = write_axes.clone();
    let mode = Mode::new(
        "psi",
        read_axes,
        write_axes,
        vec![psi_matches_target, hkl_preserved],
        vec![
            Parameter::scalar("h2", 1.0, -10.0, 10.0),
            Parameter::scalar("k2", 1.0, -10.0, 10.0),
            Parameter::scalar("l2", 1.0, -10.0, 10.0),
        ],
        Capabilities::READABLE | Capabilities::WRITABLE | Capabilities::INITIALIZABLE,
    )
    .with_init(init_check);

    Engine::new(
        "psi",
        Dependencies::AXES | Dependencies::ENERGY | Dependencies::SAMPLE,
        vec![Parameter::angle("psi")],
        vec![mode],
        EngineOps {
            get: get_op,
            set: set_op,
        },
    )
}
