/*
 * GONIO Toolkit
 * Copyright (C) 2021-onward Christopher Rabotin <christopher.rabotin@gmail.com> et al. (cf. AUTHORS.md)
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 *
 * Documentation: https://nyxspace.com/
 */

use snafu::prelude::*;

#[derive(Copy, Clone, PartialEq, Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum MathError {
    #[snafu(display("prevented a division by zero when {action}"))]
    DivisionByZero { action: &'static str },
    #[snafu(display("{msg}: {value}"))]
    DomainError { value: f64, msg: &'static str },
    #[snafu(display("max iterations reached ({iter}) when {action}"))]
    MaxIterationsReached { iter: usize, action: &'static str },
    #[snafu(display("infinite value encountered when {action}"))]
    InfiniteValue { action: &'static str },
    #[snafu(display("matrix is singular when {action}"))]
    SingularMatrix { action: &'static str },
}

#[derive(Clone, PartialEq, Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ParameterError {
    #[snafu(display("value for {name} is not a number"))]
    NotANumber { name: String },
    #[snafu(display("value {value} for {name} is outside [{min}, {max}]"))]
    OutOfRange {
        name: String,
        value: f64,
        min: f64,
        max: f64,
    },
    #[snafu(display(
        "no full-turn equivalent of {value} for {name} falls within [{min}, {max}]"
    ))]
    NoRepresentative {
        name: String,
        value: f64,
        min: f64,
        max: f64,
    },
}

#[derive(Clone, PartialEq, Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum GeometryError {
    #[snafu(display("no axis named {name}"))]
    UnknownAxis { name: String },
    /// Raised when an axis is added twice with two different transformations: the
    /// geometry definition itself is malformed, so construction aborts.
    #[snafu(display("axis {name} redefined with a different transformation"))]
    IncompatibleAxis { name: String },
    #[snafu(display("expected {need} axis values but got {got}"))]
    ValuesLength { got: usize, need: usize },
    #[snafu(display("wavelength must be strictly positive, got {wavelength}"))]
    InvalidWavelength { wavelength: f64 },
    #[snafu(display("no holder at index {index}"))]
    UnknownHolder { index: usize },
    #[snafu(display("{source} when {action}"))]
    AxisParameter {
        action: &'static str,
        source: ParameterError,
    },
}

#[derive(Clone, PartialEq, Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum SampleError {
    #[snafu(display(
        "degenerate lattice: 1 - cos²α - cos²β - cos²γ + 2·cosα·cosβ·cosγ = {d} is not positive"
    ))]
    DegenerateLattice { d: f64 },
    #[snafu(display("reflections {index1} and {index2} are collinear"))]
    CollinearReflections { index1: usize, index2: usize },
    #[snafu(display("the B matrix is singular when {action}"))]
    SingularBasis { action: &'static str },
    #[snafu(display("no reflection at index {index}"))]
    UnknownReflection { index: usize },
    #[snafu(display("at least {need} reflections are required to {action}"))]
    NotEnoughReflections { need: usize, action: &'static str },
    #[snafu(display("{source} when {action}"))]
    LatticeParameter {
        action: &'static str,
        source: ParameterError,
    },
    #[snafu(display("{source}"))]
    SampleMath { source: MathError },
}

#[derive(Clone, PartialEq, Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum DiffractometerError {
    #[snafu(display("no diffractometer named {name}"))]
    UnknownDiffractometer { name: String },
    #[snafu(display("{source} when building the {name} geometry"))]
    FactoryGeometry {
        name: String,
        source: GeometryError,
    },
}
