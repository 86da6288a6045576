/*
 * GONIO Toolkit
 * Copyright (C) 2021-onward Christopher Rabotin <christopher.rabotin@gmail.com> et al. (cf. AUTHORS.md)
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 *
 * Documentation: https://nyxspace.com/
 */

/// Reciprocal lattice constant: |ki| = TAU / wavelength, and the B matrix is
/// scaled such that |B·(1,0,0)| = TAU / a for a cubic cell.
pub const TAU: f64 = core::f64::consts::TAU;

/// Two geometries (or two pseudo-axis values) closer than this are considered identical.
pub const GEOMETRY_EPSILON: f64 = 1e-6;

/// A residual vector whose largest component is below this value is considered a root.
pub const SOLVER_TOLERANCE: f64 = 1e-6;

/// Hard cap on the Newton iterations of a single solve.
pub const SOLVER_MAX_ITERATIONS: usize = 1000;

/// The solver restarts from a random in-range point this often, and on any stall.
pub const SOLVER_RESTART_PERIOD: usize = 100;

/// Forward-difference step used to estimate the Jacobian.
pub const JACOBIAN_STEP: f64 = 1e-7;

/// Default source wavelength of freshly built geometries, in nanometers.
pub const DEFAULT_WAVELENGTH_NM: f64 = 1.54;

/// Default lattice parameter of freshly built samples, in nanometers.
pub const DEFAULT_LATTICE_NM: f64 = 1.54;
