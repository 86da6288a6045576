/*
 * GONIO Toolkit
 * Copyright (C) 2021-onward Christopher Rabotin <christopher.rabotin@gmail.com> et al. (cf. AUTHORS.md)
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 *
 * Documentation: https://nyxspace.com/
 */

use core::f64::consts::FRAC_PI_2;

use log::debug;
use snafu::IntoError;

use crate::engines::{
    Capabilities, Dependencies, Engine, EngineContext, EngineError, EngineOps, EngineResult, Mode,
};
use crate::errors::MathError;
use crate::geometry::{Geometry, GeometryList};
use crate::math::angles::restrict_sym;
use crate::math::units::UnitScale;
use crate::parameter::{Parameter, Transformation};

/// The tilt of the kappa axis, recovered from the axis vector
/// (0, -cos α, -sin α) the geometry was built with.
pub(crate) fn kappa_alpha(geometry: &Geometry) -> EngineResult<f64> {
    let parameter = geometry.axis("kappa").map_err(|source| {
        crate::engines::EngineGeometrySnafu {
            action: "reading the kappa axis tilt",
        }
        .into_error(source)
    })?;
    match parameter.transformation() {
        Transformation::Rotation { axis, .. } => Ok((-axis.z).atan2(-axis.y)),
        _ => Err(EngineError::SolveFailed {
            source: MathError::DomainError {
                value: 0.0,
                msg: "the kappa axis is not a rotation",
            },
        }),
    }
}

/// Converts a kappa configuration into the matching eulerian angles, for one
/// of the two solution branches.
pub(crate) fn kappa_to_eulerian(
    komega: f64,
    kappa: f64,
    kphi: f64,
    alpha: f64,
    solution: bool,
) -> (f64, f64, f64) {
    let p = ((kappa / 2.0).tan() * alpha.cos()).atan();
    let chi = 2.0 * ((kappa / 2.0).sin() * alpha.sin()).asin();
    if solution {
        (komega + p - FRAC_PI_2, chi, kphi + p + FRAC_PI_2)
    } else {
        (komega + p + FRAC_PI_2, -chi, kphi + p - FRAC_PI_2)
    }
}

/// Converts eulerian angles into a kappa configuration, for one of the two
/// solution branches. Fails when |chi| exceeds the 2α reach of the kappa tilt.
pub(crate) fn eulerian_to_kappa(
    omega: f64,
    chi: f64,
    phi: f64,
    alpha: f64,
    solution: bool,
) -> EngineResult<(f64, f64, f64)> {
    if chi.abs() > 2.0 * alpha {
        return Err(EngineError::SolveFailed {
            source: MathError::DomainError {
                value: chi,
                msg: "chi is beyond the reach of the kappa tilt",
            },
        });
    }
    let p = ((chi / 2.0).tan() / alpha.tan()).asin();
    let kappa = 2.0 * ((chi / 2.0).sin() / alpha.sin()).asin();
    if solution {
        Ok((omega - p + FRAC_PI_2, kappa, phi - p - FRAC_PI_2))
    } else {
        Ok((omega + p - FRAC_PI_2, -kappa, phi + p + FRAC_PI_2))
    }
}

/// The eulerian omega of the current kappa configuration, in the primary
/// solution branch. The kappa hkl modes pin their extra equation on it.
pub(crate) fn eulerian_omega(geometry: &Geometry) -> EngineResult<f64> {
    let alpha = kappa_alpha(geometry)?;
    let komega = axis_value(geometry, "komega")?;
    let kappa = axis_value(geometry, "kappa")?;
    let p = ((kappa / 2.0).tan() * alpha.cos()).atan();
    Ok(komega + p - FRAC_PI_2)
}

/// The eulerian chi of the current kappa configuration (primary branch).
pub(crate) fn eulerian_chi(geometry: &Geometry) -> EngineResult<f64> {
    let alpha = kappa_alpha(geometry)?;
    let kappa = axis_value(geometry, "kappa")?;
    Ok(2.0 * ((kappa / 2.0).sin() * alpha.sin()).asin())
}

/// The eulerian phi of the current kappa configuration (primary branch).
pub(crate) fn eulerian_phi(geometry: &Geometry) -> EngineResult<f64> {
    let alpha = kappa_alpha(geometry)?;
    let kappa = axis_value(geometry, "kappa")?;
    let kphi = axis_value(geometry, "kphi")?;
    let p = ((kappa / 2.0).tan() * alpha.cos()).atan();
    Ok(kphi + p + FRAC_PI_2)
}

fn axis_value(geometry: &Geometry, name: &str) -> EngineResult<f64> {
    geometry
        .axis_value(name, UnitScale::Default)
        .map_err(|source| {
            crate::engines::EngineGeometrySnafu {
                action: "reading a kappa axis",
            }
            .into_error(source)
        })
}

fn get_op(engine: &mut Engine, ctx: &EngineContext) -> EngineResult<()> {
    let alpha = kappa_alpha(ctx.geometry)?;
    let komega = axis_value(ctx.geometry, "komega")?;
    let kappa = axis_value(ctx.geometry, "kappa")?;
    let kphi = axis_value(ctx.geometry, "kphi")?;
    let solution = engine.current_mode().parameters()[0].value(UnitScale::Default) != 0.0;
    let (omega, chi, phi) = kappa_to_eulerian(komega, kappa, kphi, alpha, solution);
    engine.write_pseudo_values(&[
        restrict_sym(omega),
        restrict_sym(chi),
        restrict_sym(phi),
    ]);
    Ok(())
}

fn set_op(_engine: &Engine, ctx: &EngineContext, targets: &[f64]) -> EngineResult<GeometryList> {
    let alpha = kappa_alpha(ctx.geometry)?;
    let (omega, chi, phi) = (targets[0], targets[1], targets[2]);

    let mut list = GeometryList::new();
    // Both kappa branches realize the requested eulerian angles; an
    // out-of-reach chi yields the empty list, not an error.
    for solution in [false, true] {
        match eulerian_to_kappa(omega, chi, phi, alpha, solution) {
            Ok((komega, kappa, kphi)) => {
                let mut candidate = ctx.geometry.clone();
                for (name, value) in [("komega", komega), ("kappa", kappa), ("kphi", kphi)] {
                    candidate
                        .axis_mut(name)
                        .map_err(|source| {
                            crate::engines::EngineGeometrySnafu {
                                action: "writing a kappa axis",
                            }
                            .into_error(source)
                        })?
                        .set_value_unchecked(restrict_sym(value));
                }
                candidate.update();
                list.add(candidate);
            }
            Err(error) => {
                debug!("eulerians branch {solution} unreachable: {error}");
            }
        }
    }
    Ok(list)
}

/// Builds the eulerians engine of kappa geometries: the virtual (omega, chi,
/// phi) circles. Setting them emits both kappa branches, in a fixed order;
/// the `solutions` parameter selects which branch the readback reports.
pub fn eulerians_engine() -> Engine {
    let mode = Mode::new(
        "eulerians",
        vec!["komega", "kappa", "kphi"],
        vec!["komega", "kappa", "kphi"],
        vec![],
        vec![Parameter::scalar("solutions", 1.0, 0.0, 1.0)
            .with_description("readback branch of the kappa-to-eulerian conversion")],
        Capabilities::READABLE | Capabilities::WRITABLE,
    );
    Engine::new(
        "eulerians",
        Dependencies::AXES,
        vec![
            Parameter::angle("omega"),
            Parameter::angle("chi"),
            Parameter::angle("phi"),
        ],
        vec![mode],
        EngineOps {
            get: get_op,
            set: set_op,
        },
    )
}
