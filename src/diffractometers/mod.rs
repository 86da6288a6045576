/*
 * GONIO Toolkit
 * Copyright (C) 2021-onward Christopher Rabotin <christopher.rabotin@gmail.com> et al. (cf. AUTHORS.md)
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 *
 * Documentation: https://nyxspace.com/
 */

use std::sync::OnceLock;

use indexmap::IndexMap;
use log::info;
use tabled::settings::Style;
use tabled::{Table, Tabled};

use crate::engines::{Engine, EngineList};
use crate::errors::{DiffractometerError, GeometryError, UnknownDiffractometerSnafu};
use crate::geometry::{Geometry, Multiply};

mod e4c;
mod e6c;
mod k4cv;
mod k6c;
mod soleil_sixs;
mod zaxis;

pub(crate) type GeometryCtor = fn() -> Result<Geometry, GeometryError>;
pub(crate) type EnginesCtor = fn() -> Vec<Engine>;

/// One entry of the diffractometer directory: the canonical axis names, a
/// description of the geometry, and the constructors of its Geometry and
/// EngineList.
#[derive(Debug)]
pub struct Factory {
    name: &'static str,
    description: &'static str,
    axis_names: &'static [&'static str],
    geometry: GeometryCtor,
    engines: EnginesCtor,
    post_set: Option<Multiply>,
}

impl Factory {
    pub(crate) fn new(
        name: &'static str,
        description: &'static str,
        axis_names: &'static [&'static str],
        geometry: GeometryCtor,
        engines: EnginesCtor,
    ) -> Self {
        Self {
            name,
            description,
            axis_names,
            geometry,
            engines,
            post_set: None,
        }
    }

    pub(crate) fn with_post_set(mut self, post_set: Multiply) -> Self {
        self.post_set = Some(post_set);
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn description(&self) -> &'static str {
        self.description
    }

    /// The canonical axis names, in axis insertion order.
    pub fn axis_names(&self) -> &'static [&'static str] {
        self.axis_names
    }

    /// Builds a fresh geometry at its zero position.
    pub fn new_geometry(&self) -> Result<Geometry, DiffractometerError> {
        (self.geometry)().map_err(|source| DiffractometerError::FactoryGeometry {
            name: self.name.to_string(),
            source,
        })
    }

    /// Builds the engine list of this diffractometer, bound to a fresh
    /// default geometry until [EngineList::init] rebinds it.
    pub fn new_engine_list(&self) -> Result<EngineList, DiffractometerError> {
        let geometry = self.new_geometry()?;
        Ok(EngineList::new(geometry, (self.engines)(), self.post_set))
    }
}

static REGISTRY: OnceLock<IndexMap<&'static str, Factory>> = OnceLock::new();

fn registry() -> &'static IndexMap<&'static str, Factory> {
    REGISTRY.get_or_init(|| {
        let mut map = IndexMap::new();
        for factory in e4c::factories()
            .into_iter()
            .chain(k4cv::factories())
            .chain(e6c::factories())
            .chain(k6c::factories())
            .chain(zaxis::factories())
            .chain(soleil_sixs::factories())
        {
            map.insert(factory.name, factory);
        }
        info!("registered {} diffractometers", map.len());
        map
    })
}

/// The names of every registered diffractometer, in registration order.
pub fn names() -> Vec<&'static str> {
    registry().keys().copied().collect()
}

/// Every registered factory, in registration order.
pub fn list() -> Vec<&'static Factory> {
    registry().values().collect()
}

/// Looks up a diffractometer by exact name.
pub fn factory(name: &str) -> Result<&'static Factory, DiffractometerError> {
    registry()
        .get(name)
        .ok_or_else(|| UnknownDiffractometerSnafu { name }.build())
}

#[derive(Tabled)]
struct FactoryRow {
    #[tabled(rename = "Diffractometer")]
    name: &'static str,
    #[tabled(rename = "Axes")]
    axes: String,
    #[tabled(rename = "Description")]
    description: &'static str,
}

/// A human-readable table of the registered diffractometers.
pub fn describe() -> String {
    let rows: Vec<FactoryRow> = list()
        .into_iter()
        .map(|factory| FactoryRow {
            name: factory.name,
            axes: factory.axis_names.join(", "),
            description: factory.description,
        })
        .collect();
    Table::new(rows).with(Style::sharp()).to_string()
}

#[cfg(test)]
mod ut_registry {
    use super::{describe, factory, list, names};

    #[test]
    fn test_lookup() {
        assert!(factory("E4CV").is_ok());
        assert!(factory("NOPE").is_err());
        assert_eq!(names().len(), list().len());
    }

    #[test]
    fn test_axis_names_match_geometries() {
        for entry in list() {
            let geometry = entry.new_geometry().unwrap();
            assert_eq!(
                geometry.axis_names(),
                entry.axis_names().to_vec(),
                "{}",
                entry.name()
            );
        }
    }

    #[test]
    fn test_describe() {
        let table = describe();
        assert!(table.contains("E4CV"));
        assert!(table.contains("K6C"));
    }
}
