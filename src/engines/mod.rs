/*
 * GONIO Toolkit
 * Copyright (C) 2021-onward Christopher Rabotin <christopher.rabotin@gmail.com> et al. (cf. AUTHORS.md)
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 *
 * Documentation: https://nyxspace.com/
 */

use bitflags::bitflags;
use indexmap::IndexMap;
use log::debug;
use snafu::prelude::*;

use crate::detector::Detector;
use crate::errors::{GeometryError, MathError, ParameterError, SampleError};
use crate::geometry::{Geometry, GeometryList, Multiply};
use crate::math::units::UnitScale;
use crate::parameter::Parameter;
use crate::sample::Sample;

pub mod eulerians;
pub mod hkl;
pub mod psi;
pub mod q;
pub(crate) mod solver;
pub mod surface;
pub mod tth;

pub use solver::seed_solver_rng;

bitflags! {
    /// What the current mode of an engine supports.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct Capabilities: u8 {
        const READABLE = 1;
        const WRITABLE = 1 << 1;
        const INITIALIZABLE = 1 << 2;
    }

    /// What an engine's pseudo-axes depend on, beyond the axis positions.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct Dependencies: u8 {
        const AXES = 1;
        const ENERGY = 1 << 1;
        const SAMPLE = 1 << 2;
    }
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum EngineError {
    #[snafu(display("no engine named {name}"))]
    UnknownEngine { name: String },
    #[snafu(display("engine {engine} has no mode named {name}"))]
    UnknownMode { engine: &'static str, name: String },
    #[snafu(display("engine {engine} has no parameter named {name}"))]
    UnknownEngineParameter { engine: &'static str, name: String },
    #[snafu(display("engine {engine} must be initialized first"))]
    NotInitialized { engine: &'static str },
    #[snafu(display("mode {mode} of engine {engine} is read-only"))]
    ReadOnlyMode {
        engine: &'static str,
        mode: &'static str,
    },
    #[snafu(display("expected {need} pseudo-axis values but got {got}"))]
    PseudoValuesLength { got: usize, need: usize },
    #[snafu(display(
        "mode {mode} provides {got} residuals for {need} write axes: the system is not square"
    ))]
    NotSquare {
        mode: &'static str,
        got: usize,
        need: usize,
    },
    #[snafu(display("no solution at index {index}"))]
    UnknownSolution { index: usize },
    #[snafu(display("solving failed: {source}"))]
    SolveFailed { source: MathError },
    #[snafu(display("{source} when {action}"))]
    EngineGeometry {
        action: &'static str,
        source: GeometryError,
    },
    #[snafu(display("{source} when {action}"))]
    EngineSample {
        action: &'static str,
        source: SampleError,
    },
    #[snafu(display("{source} when {action}"))]
    EngineParameter {
        action: &'static str,
        source: ParameterError,
    },
}

pub type EngineResult<T> = Result<T, EngineError>;

/// The read-only view an engine computes against: the diffractometer state
/// owned by the [EngineList].
pub struct EngineContext<'a> {
    pub geometry: &'a Geometry,
    pub detector: &'a Detector,
    pub sample: &'a Sample,
}

/// Everything a residual function may read while the solver iterates: the
/// working geometry (write axes already set, holders updated), the rest of
/// the diffractometer state, the requested pseudo-axis targets, the
/// mode-local parameters and the optional initialization snapshot.
pub struct ResidualArgs<'a> {
    pub geometry: &'a Geometry,
    pub detector: &'a Detector,
    pub sample: &'a Sample,
    pub targets: &'a [f64],
    pub parameters: &'a [Parameter],
    pub reference: Option<&'a Geometry>,
}

impl ResidualArgs<'_> {
    /// Looks up a mode-local parameter by name.
    pub fn parameter(&self, name: &str) -> EngineResult<&Parameter> {
        self.parameters
            .iter()
            .find(|p| p.name() == name)
            .ok_or_else(|| {
                UnknownEngineParameterSnafu {
                    engine: "mode",
                    name,
                }
                .build()
            })
    }
}

/// One block of the residual system. Each function returns its ordered share
/// of the residual vector; a mode's blocks concatenate to exactly one scalar
/// equation per write axis.
pub type ResidualFn = fn(&ResidualArgs) -> EngineResult<Vec<f64>>;

/// A validation hook run when an engine captures its reference snapshot.
pub type InitFn = fn(&EngineContext) -> EngineResult<()>;

/// A mode: the choice of which axes the solver may vary, the residual
/// functions making the system square, and the mode-local parameters.
pub struct Mode {
    name: &'static str,
    read_axes: Vec<&'static str>,
    write_axes: Vec<&'static str>,
    residuals: Vec<ResidualFn>,
    parameters: Vec<Parameter>,
    defaults: Vec<f64>,
    capabilities: Capabilities,
    init: Option<InitFn>,
}

impl Mode {
    pub fn new(
        name: &'static str,
        read_axes: Vec<&'static str>,
        write_axes: Vec<&'static str>,
        residuals: Vec<ResidualFn>,
        parameters: Vec<Parameter>,
        capabilities: Capabilities,
    ) -> Self {
        let defaults = parameters.iter().map(|p| p.value(UnitScale::Default)).collect();
        Self {
            name,
            read_axes,
            write_axes,
            residuals,
            parameters,
            defaults,
            capabilities,
            init: None,
        }
    }

    pub fn with_init(mut self, init: InitFn) -> Self {
        self.init = Some(init);
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn read_axes(&self) -> &[&'static str] {
        &self.read_axes
    }

    pub fn write_axes(&self) -> &[&'static str] {
        &self.write_axes
    }

    pub(crate) fn residuals(&self) -> &[ResidualFn] {
        &self.residuals
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    /// Resets the mode-local parameters to their construction defaults.
    fn reset(&mut self) {
        for (parameter, default) in self.parameters.iter_mut().zip(&self.defaults) {
            parameter.set_value_unchecked(*default);
        }
    }
}

/// The operations record of an engine: how to forward-compute its
/// pseudo-axes and how to invert them into axis solutions.
#[derive(Clone, Copy)]
pub struct EngineOps {
    pub get: fn(&mut Engine, &EngineContext) -> EngineResult<()>,
    pub set: fn(&Engine, &EngineContext, &[f64]) -> EngineResult<GeometryList>,
}

/// A family of pseudo-axes sharing a set of modes.
pub struct Engine {
    name: &'static str,
    pseudo_axes: Vec<Parameter>,
    modes: Vec<Mode>,
    current: usize,
    dependencies: Dependencies,
    initialized: bool,
    reference: Option<Geometry>,
    ops: EngineOps,
}

impl Engine {
    pub(crate) fn new(
        name: &'static str,
        dependencies: Dependencies,
        pseudo_axes: Vec<Parameter>,
        modes: Vec<Mode>,
        ops: EngineOps,
    ) -> Self {
        Self {
            name,
            pseudo_axes,
            modes,
            current: 0,
            dependencies,
            initialized: false,
            reference: None,
            ops,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn dependencies(&self) -> Dependencies {
        self.dependencies
    }

    pub fn modes_names(&self) -> Vec<&'static str> {
        self.modes.iter().map(|m| m.name).collect()
    }

    pub fn current_mode(&self) -> &Mode {
        &self.modes[self.current]
    }

    /// Switches to the named mode and resets its parameters to their defaults.
    pub fn select_mode(&mut self, name: &str) -> EngineResult<()> {
        let index = self
            .modes
            .iter()
            .position(|m| m.name == name)
            .ok_or_else(|| {
                UnknownModeSnafu {
                    engine: self.name,
                    name,
                }
                .build()
            })?;
        self.current = index;
        self.modes[index].reset();
        Ok(())
    }

    /// The capabilities of the current mode.
    pub fn capabilities(&self) -> Capabilities {
        self.current_mode().capabilities
    }

    pub fn parameters(&self) -> &[Parameter] {
        self.current_mode().parameters()
    }

    pub fn parameters_values(&self, scale: UnitScale) -> Vec<f64> {
        self.parameters().iter().map(|p| p.value(scale)).collect()
    }

    /// Sets every mode-local parameter at once, in declaration order.
    pub fn set_parameters_values(&mut self, values: &[f64], scale: UnitScale) -> EngineResult<()> {
        let mode = &mut self.modes[self.current];
        ensure!(
            values.len() == mode.parameters.len(),
            PseudoValuesLengthSnafu {
                got: values.len(),
                need: mode.parameters.len()
            }
        );
        for (parameter, value) in mode.parameters.iter_mut().zip(values) {
            parameter
                .set_value(*value, scale)
                .context(EngineParameterSnafu {
                    action: "setting the mode parameters",
                })?;
        }
        Ok(())
    }

    /// Sets one mode-local parameter by name.
    pub fn set_parameter_value(
        &mut self,
        name: &str,
        value: f64,
        scale: UnitScale,
    ) -> EngineResult<()> {
        let engine = self.name;
        let mode = &mut self.modes[self.current];
        let parameter = mode
            .parameters
            .iter_mut()
            .find(|p| p.name() == name)
            .ok_or_else(|| UnknownEngineParameterSnafu { engine, name }.build())?;
        parameter
            .set_value(value, scale)
            .context(EngineParameterSnafu {
                action: "setting a mode parameter",
            })
    }

    pub fn pseudo_axes(&self) -> &[Parameter] {
        &self.pseudo_axes
    }

    pub fn pseudo_axis_names(&self) -> Vec<&str> {
        self.pseudo_axes.iter().map(|p| p.name()).collect()
    }

    /// The pseudo-axis values, meaningful after a successful get or set.
    pub fn pseudo_values(&self, scale: UnitScale) -> Vec<f64> {
        self.pseudo_axes.iter().map(|p| p.value(scale)).collect()
    }

    pub(crate) fn write_pseudo_values(&mut self, values: &[f64]) {
        for (parameter, value) in self.pseudo_axes.iter_mut().zip(values) {
            parameter.set_value_unchecked(*value);
        }
    }

    pub fn initialized(&self) -> bool {
        self.initialized
    }

    pub(crate) fn reference(&self) -> Option<&Geometry> {
        self.reference.as_ref()
    }

    /// Captures the current diffractometer state as the reference snapshot of
    /// stateful modes. On failure the previous snapshot is kept untouched.
    pub fn initialize(&mut self, ctx: &EngineContext) -> EngineResult<()> {
        if let Some(init) = self.current_mode().init {
            init(ctx)?;
        }
        let mut snapshot = ctx.geometry.clone();
        snapshot.update();
        self.reference = Some(snapshot);
        self.initialized = true;
        Ok(())
    }

    /// Forward-computes the pseudo-axes from the current axis positions.
    pub(crate) fn get(&mut self, ctx: &EngineContext) -> EngineResult<()> {
        let get = self.ops.get;
        get(self, ctx)
    }

    /// Inverts the pseudo-axes: finds the axis configurations realizing the
    /// requested values (in default units) under the current mode. The input
    /// geometry is never mutated; solutions are deep copies.
    pub(crate) fn set(&self, ctx: &EngineContext, targets: &[f64]) -> EngineResult<GeometryList> {
        ensure!(
            self.capabilities().contains(Capabilities::WRITABLE),
            ReadOnlyModeSnafu {
                engine: self.name,
                mode: self.current_mode().name,
            }
        );
        ensure!(
            targets.len() == self.pseudo_axes.len(),
            PseudoValuesLengthSnafu {
                got: targets.len(),
                need: self.pseudo_axes.len()
            }
        );
        for (parameter, target) in self.pseudo_axes.iter().zip(targets) {
            if target.is_nan() {
                return Err(EngineError::EngineParameter {
                    action: "checking the requested pseudo-axis values",
                    source: ParameterError::NotANumber {
                        name: parameter.name().to_string(),
                    },
                });
            }
        }
        let set = self.ops.set;
        set(self, ctx, targets)
    }
}

/// The ordered engines of one diffractometer, bound to the geometry,
/// detector and sample captured by [Self::init].
pub struct EngineList {
    geometry: Geometry,
    detector: Detector,
    sample: Sample,
    engines: IndexMap<&'static str, Engine>,
    parameters: Vec<Parameter>,
    post_set: Option<Multiply>,
    solutions: GeometryList,
}

impl EngineList {
    pub(crate) fn new(
        geometry: Geometry,
        engines: Vec<Engine>,
        post_set: Option<Multiply>,
    ) -> Self {
        let mut map = IndexMap::with_capacity(engines.len());
        for engine in engines {
            map.insert(engine.name, engine);
        }
        Self {
            geometry,
            detector: Detector::default(),
            sample: Sample::new("default"),
            engines: map,
            parameters: Vec::new(),
            post_set,
            solutions: GeometryList::new(),
        }
    }

    /// Binds the list to deep copies of the provided diffractometer state and
    /// drops any stale engine initialization.
    pub fn init(&mut self, geometry: &Geometry, detector: &Detector, sample: &Sample) {
        self.geometry = geometry.clone();
        self.geometry.update();
        self.detector = *detector;
        self.sample = sample.clone();
        for engine in self.engines.values_mut() {
            engine.initialized = false;
            engine.reference = None;
        }
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    pub fn geometry_mut(&mut self) -> &mut Geometry {
        &mut self.geometry
    }

    pub fn detector(&self) -> &Detector {
        &self.detector
    }

    pub fn sample(&self) -> &Sample {
        &self.sample
    }

    pub fn sample_mut(&mut self) -> &mut Sample {
        &mut self.sample
    }

    /// The optional global parameters of this diffractometer.
    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    pub fn engines_names(&self) -> Vec<&'static str> {
        self.engines.keys().copied().collect()
    }

    pub fn engine(&self, name: &str) -> EngineResult<&Engine> {
        self.engines
            .get(name)
            .ok_or_else(|| UnknownEngineSnafu { name }.build())
    }

    pub fn engine_mut(&mut self, name: &str) -> EngineResult<&mut Engine> {
        self.engines
            .get_mut(name)
            .ok_or_else(|| UnknownEngineSnafu { name }.build())
    }

    /// Captures the reference snapshot of the named engine.
    pub fn initialize(&mut self, engine: &str) -> EngineResult<()> {
        self.geometry.update();
        let Self {
            geometry,
            detector,
            sample,
            engines,
            ..
        } = self;
        let engine = engines
            .get_mut(engine)
            .ok_or_else(|| UnknownEngineSnafu { name: engine }.build())?;
        let ctx = EngineContext {
            geometry,
            detector,
            sample,
        };
        engine.initialize(&ctx)
    }

    /// Forward-computes the pseudo-axes of the named engine and returns their
    /// values in the requested unit scale.
    pub fn pseudo_values_get(&mut self, engine: &str, scale: UnitScale) -> EngineResult<Vec<f64>> {
        self.geometry.update();
        let Self {
            geometry,
            detector,
            sample,
            engines,
            ..
        } = self;
        let engine = engines
            .get_mut(engine)
            .ok_or_else(|| UnknownEngineSnafu { name: engine }.build())?;
        let ctx = EngineContext {
            geometry,
            detector,
            sample,
        };
        engine.get(&ctx)?;
        Ok(engine.pseudo_values(scale))
    }

    /// Forward-computes every engine, logging and skipping the ones that fail
    /// (e.g. for lack of initialization).
    pub fn get_all(&mut self) {
        let names = self.engines_names();
        for name in names {
            if let Err(error) = self.pseudo_values_get(name, UnitScale::Default) {
                debug!("engine {name} not updated: {error}");
            }
        }
    }

    /// Inverts the named engine: finds all axis configurations realizing the
    /// requested pseudo-axis values, applies the diffractometer's post-set
    /// hook and drops out-of-range solutions. The current geometry itself is
    /// not mutated.
    ///
    /// An empty list is the normal no-solution outcome, not an error.
    pub fn pseudo_values_set(
        &mut self,
        engine: &str,
        values: &[f64],
        scale: UnitScale,
    ) -> EngineResult<&GeometryList> {
        self.geometry.update();
        let post_set = self.post_set;
        let Self {
            geometry,
            detector,
            sample,
            engines,
            ..
        } = self;
        let engine = engines
            .get_mut(engine)
            .ok_or_else(|| UnknownEngineSnafu { name: engine }.build())?;
        // User-scale requests are converted through each pseudo-axis' display unit.
        let targets: Vec<f64> = match scale {
            UnitScale::Default => values.to_vec(),
            UnitScale::User => values
                .iter()
                .zip(engine.pseudo_axes())
                .map(|(v, p)| v * p.unit().factor())
                .collect(),
        };
        let ctx = EngineContext {
            geometry,
            detector,
            sample,
        };
        let mut solutions = engine.set(&ctx, &targets)?;
        if let Some(hook) = post_set {
            solutions.multiply(hook);
        }
        // Auto modes already sort by distance from the reference; closed-form
        // modes own their emission order, so no re-sort here.
        solutions.remove_invalid();
        // The requested values are now the engine's pseudo-axis state.
        engine.write_pseudo_values(&targets);
        self.solutions = solutions;
        Ok(&self.solutions)
    }

    /// The solutions of the last successful [Self::pseudo_values_set].
    pub fn solutions(&self) -> &GeometryList {
        &self.solutions
    }

    /// Adopts one solution: copies its axis values onto the list's geometry.
    pub fn select_solution(&mut self, index: usize) -> EngineResult<()> {
        let solution = self
            .solutions
            .get(index)
            .ok_or_else(|| UnknownSolutionSnafu { index }.build())?;
        let values = solution.values(UnitScale::Default);
        self.geometry
            .set_values(&values, UnitScale::Default)
            .context(EngineGeometrySnafu {
                action: "adopting a solution",
            })?;
        self.geometry.update();
        Ok(())
    }
}
