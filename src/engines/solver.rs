/*
 * GONIO Toolkit
 * Copyright (C) 2021-onward Christopher Rabotin <christopher.rabotin@gmail.com> et al. (cf. AUTHORS.md)
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 *
 * Documentation: https://nyxspace.com/
 */

use std::sync::{Mutex, OnceLock};

use log::debug;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64Mcg;
use snafu::{ensure, IntoError};

use crate::constants::{
    JACOBIAN_STEP, SOLVER_MAX_ITERATIONS, SOLVER_RESTART_PERIOD, SOLVER_TOLERANCE, TAU,
};
use crate::engines::{
    Engine, EngineContext, EngineError, EngineGeometrySnafu, EngineResult, NotSquareSnafu,
    ResidualArgs,
};
use crate::errors::MathError;
use crate::geometry::{Geometry, GeometryList};
use crate::math::units::UnitScale;
use crate::math::{angles, DMatrix, DVector};

/// The process-wide random number generator feeding the solver restarts.
///
/// Every solve in the process shares it: reproducible runs must call
/// [seed_solver_rng] first.
static RNG: OnceLock<Mutex<Pcg64Mcg>> = OnceLock::new();

fn rng() -> &'static Mutex<Pcg64Mcg> {
    RNG.get_or_init(|| Mutex::new(Pcg64Mcg::seed_from_u64(0x0b_ad_5e_ed)))
}

/// Reseeds the shared solver RNG. Solver results involving random restarts
/// are reproducible only after seeding.
pub fn seed_solver_rng(seed: u64) {
    let mut guard = rng()
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    *guard = Pcg64Mcg::seed_from_u64(seed);
}

/// Writes the write-axis vector into the working geometry and evaluates the
/// concatenated residual blocks of the current mode.
fn eval(
    geometry: &mut Geometry,
    ctx: &EngineContext,
    engine: &Engine,
    targets: &[f64],
    write_idx: &[usize],
    x: &[f64],
) -> EngineResult<DVector> {
    for (value, index) in x.iter().zip(write_idx) {
        geometry
            .axis_by_index_mut(*index)
            .set_value_unchecked(*value);
    }
    geometry.update();
    let mode = engine.current_mode();
    let args = ResidualArgs {
        geometry: &*geometry,
        detector: ctx.detector,
        sample: ctx.sample,
        targets,
        parameters: mode.parameters(),
        reference: engine.reference(),
    };
    let mut out = Vec::with_capacity(write_idx.len());
    for residual in mode.residuals() {
        out.extend(residual(&args)?);
    }
    ensure!(
        out.len() == write_idx.len(),
        NotSquareSnafu {
            mode: mode.name(),
            got: out.len(),
            need: write_idx.len()
        }
    );
    Ok(DVector::from_vec(out))
}

fn randomize(geometry: &Geometry, write_idx: &[usize], x: &mut [f64]) {
    let mut guard = rng()
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    for (value, index) in x.iter_mut().zip(write_idx) {
        let parameter = geometry.axis_by_index(*index);
        *value = guard.gen_range(
            parameter.min(UnitScale::Default)..=parameter.max(UnitScale::Default),
        );
    }
}

fn ensure_finite(f: &DVector) -> EngineResult<()> {
    if f.iter().any(|v| !v.is_finite()) {
        return Err(EngineError::SolveFailed {
            source: MathError::InfiniteValue {
                action: "evaluating the residual system",
            },
        });
    }
    Ok(())
}

/// The generic inverse operation of auto modes: a damped-Newton multi-root
/// solve over the mode's residual system, followed by the multiplicity
/// expansion of the permutable axes.
///
/// Returns an empty list when the root converged outside every travel range
/// (the normal no-solution outcome) and a [EngineError::SolveFailed] when the
/// iterations are exhausted or the residual degenerates.
pub(crate) fn auto_set(
    engine: &Engine,
    ctx: &EngineContext,
    targets: &[f64],
) -> EngineResult<GeometryList> {
    let mut geometry = ctx.geometry.clone();
    geometry.update();
    let write_idx = engine
        .current_mode()
        .write_axes()
        .iter()
        .map(|name| geometry.axis_index(name))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|source| {
            EngineGeometrySnafu {
                action: "resolving the write axes",
            }
            .into_error(source)
        })?;
    let n = write_idx.len();

    let seed: Vec<f64> = write_idx
        .iter()
        .map(|index| geometry.axis_by_index(*index).value(UnitScale::Default))
        .collect();
    let mut x = seed.clone();
    let mut f = eval(&mut geometry, ctx, engine, targets, &write_idx, &x)?;

    let mut converged = false;
    for iteration in 0..SOLVER_MAX_ITERATIONS {
        ensure_finite(&f)?;
        if f.amax() < SOLVER_TOLERANCE {
            converged = true;
            break;
        }
        if iteration > 0 && iteration % SOLVER_RESTART_PERIOD == 0 {
            debug!("solver restart at iteration {iteration}");
            randomize(&geometry, &write_idx, &mut x);
            f = eval(&mut geometry, ctx, engine, targets, &write_idx, &x)?;
            continue;
        }

        // Forward-difference Jacobian.
        let mut jacobian = DMatrix::zeros(n, n);
        for column in 0..n {
            let mut probe = x.clone();
            probe[column] += JACOBIAN_STEP;
            let f_probe = eval(&mut geometry, ctx, engine, targets, &write_idx, &probe)?;
            for row in 0..n {
                jacobian[(row, column)] = (f_probe[row] - f[row]) / JACOBIAN_STEP;
            }
        }

        let step = match jacobian.lu().solve(&(-&f)) {
            Some(step) => step,
            None => {
                // Singular Jacobian: restart from a fresh in-range point.
                randomize(&geometry, &write_idx, &mut x);
                f = eval(&mut geometry, ctx, engine, targets, &write_idx, &x)?;
                continue;
            }
        };

        // Backtracking damping: accept the first fraction of the Newton step
        // that actually reduces the residual.
        let mut accepted = false;
        let mut damping = 1.0;
        for _ in 0..6 {
            let trial: Vec<f64> = x
                .iter()
                .zip(step.iter())
                .map(|(xi, di)| xi + damping * di)
                .collect();
            let f_trial = eval(&mut geometry, ctx, engine, targets, &write_idx, &trial)?;
            if f_trial.norm() < f.norm() {
                x = trial;
                f = f_trial;
                accepted = true;
                break;
            }
            damping /= 2.0;
        }
        if !accepted {
            randomize(&geometry, &write_idx, &mut x);
            f = eval(&mut geometry, ctx, engine, targets, &write_idx, &x)?;
        }
    }

    if !converged {
        return Err(EngineError::SolveFailed {
            source: MathError::MaxIterationsReached {
                iter: SOLVER_MAX_ITERATIONS,
                action: "solving the pseudo-axis residual system",
            },
        });
    }

    // Adopt the root, then expand it into every in-range representative:
    // permutable axes (rotations spanning more than one turn) contribute all
    // their 2π shifts, the other axes their single lifted value.
    f = eval(&mut geometry, ctx, engine, targets, &write_idx, &x)?;
    ensure_finite(&f)?;

    let mut representatives: Vec<Vec<f64>> = Vec::with_capacity(n);
    for ((value, index), seed_value) in x.iter().zip(&write_idx).zip(&seed) {
        let parameter = geometry.axis_by_index(*index);
        let min = parameter.min(UnitScale::Default);
        let max = parameter.max(UnitScale::Default);
        let mut reps = Vec::new();
        if parameter.is_rotation() {
            let mut candidate = angles::smallest_in_range(*value, min);
            while candidate <= max {
                reps.push(candidate);
                candidate += TAU;
            }
        } else if *value >= min && *value <= max {
            reps.push(*value);
        }
        if reps.is_empty() {
            // Converged outside the travel ranges: no solution, not an error.
            debug!(
                "root discarded: no in-range representative for axis {}",
                parameter.name()
            );
            return Ok(GeometryList::new());
        }
        // The representative nearest the starting position comes first, so
        // the base candidate is the most natural continuation of a scan.
        reps.sort_by(|a, b| {
            (a - seed_value)
                .abs()
                .total_cmp(&(b - seed_value).abs())
        });
        representatives.push(reps);
    }

    // Cartesian product of the per-axis representatives.
    let mut list = GeometryList::new();
    let mut odometer = vec![0_usize; n];
    loop {
        let mut candidate = geometry.clone();
        for ((digit, reps), index) in odometer.iter().zip(&representatives).zip(&write_idx) {
            candidate
                .axis_by_index_mut(*index)
                .set_value_unchecked(reps[*digit]);
        }
        candidate.update();
        list.add(candidate);

        // Advance the odometer; done once it wraps around.
        let mut position = 0;
        loop {
            if position == n {
                debug!("{} candidate(s) after multiplicity expansion", list.len());
                list.sort_by_distance_from(ctx.geometry);
                return Ok(list);
            }
            odometer[position] += 1;
            if odometer[position] < representatives[position].len() {
                break;
            }
            odometer[position] = 0;
            position += 1;
        }
    }
}

/// Bracketed bisection over [lo, hi], used by 1-dimensional expansion hooks
/// such as the slit-orientation fit. Returns None when no sign change is
/// found on the scan grid.
pub(crate) fn solve_1d<F: FnMut(f64) -> f64>(mut f: F, lo: f64, hi: f64) -> Option<f64> {
    const SCAN: usize = 64;
    const BISECTIONS: usize = 80;

    let width = (hi - lo) / SCAN as f64;
    let mut a = lo;
    let mut fa = f(a);
    for step in 1..=SCAN {
        let b = lo + width * step as f64;
        let fb = f(b);
        if fa == 0.0 {
            return Some(a);
        }
        if fa * fb < 0.0 {
            // Bisect inside [a, b].
            let (mut lo, mut hi, mut flo) = (a, b, fa);
            for _ in 0..BISECTIONS {
                let mid = 0.5 * (lo + hi);
                let fmid = f(mid);
                if fmid == 0.0 {
                    return Some(mid);
                }
                if flo * fmid < 0.0 {
                    hi = mid;
                } else {
                    lo = mid;
                    flo = fmid;
                }
            }
            return Some(0.5 * (lo + hi));
        }
        a = b;
        fa = fb;
    }
    None
}

#[cfg(test)]
mod ut_solver {
    use super::solve_1d;

    #[test]
    fn test_solve_1d() {
        let root = solve_1d(|x| x * x - 2.0, 0.0, 2.0).unwrap();
        assert!((root - 2_f64.sqrt()).abs() < 1e-12);
        assert!(solve_1d(|x| x * x + 1.0, -1.0, 1.0).is_none());
    }
}
