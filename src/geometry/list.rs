/*
 * GONIO Toolkit
 * Copyright (C) 2021-onward Christopher Rabotin <christopher.rabotin@gmail.com> et al. (cf. AUTHORS.md)
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 *
 * Documentation: https://nyxspace.com/
 */

use core::fmt;

use log::warn;

use crate::constants::GEOMETRY_EPSILON;
use crate::geometry::Geometry;

/// A per-geometry expansion hook: rewrites a solution in place and may return
/// extra solutions derived from it (e.g. a slit-orientation fit emitting the
/// half-turn alternative).
pub type Multiply = fn(&mut Geometry) -> Vec<Geometry>;

/// An ordered container of solution geometries.
///
/// Items are deep copies, pairwise separated by an orthodromic distance
/// greater than [GEOMETRY_EPSILON]: inserting a geometry closer than that to
/// an existing item is a no-op.
#[derive(Clone, Debug, Default)]
pub struct GeometryList {
    items: Vec<Geometry>,
}

impl GeometryList {
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn geometries(&self) -> &[Geometry] {
        &self.items
    }

    pub fn iter(&self) -> core::slice::Iter<'_, Geometry> {
        self.items.iter()
    }

    pub fn first(&self) -> Option<&Geometry> {
        self.items.first()
    }

    pub fn get(&self, index: usize) -> Option<&Geometry> {
        self.items.get(index)
    }

    /// Inserts a solution unless it duplicates an existing item within the
    /// orthodromic tolerance. Returns whether the geometry was kept.
    pub fn add(&mut self, geometry: Geometry) -> bool {
        if self
            .items
            .iter()
            .any(|item| item.distance_orthodromic(&geometry) <= GEOMETRY_EPSILON)
        {
            return false;
        }
        self.items.push(geometry);
        true
    }

    /// Sorts the solutions by increasing axis-space distance from a reference
    /// geometry. The sort is stable, so solutions at equal distance keep
    /// their discovery order.
    pub fn sort_by_distance_from(&mut self, reference: &Geometry) {
        self.items
            .sort_by(|a, b| reference.distance(a).total_cmp(&reference.distance(b)));
    }

    /// Drops every solution with an axis outside its travel range.
    pub fn remove_invalid(&mut self) {
        self.items.retain(|g| g.is_valid());
    }

    /// Applies a [Multiply] hook to every solution, then reinserts everything
    /// (originals, rewritten items and the extra solutions the hook
    /// produced) through the de-duplicating [Self::add].
    pub fn multiply(&mut self, hook: Multiply) {
        let mut rebuilt = Self::new();
        let items = core::mem::take(&mut self.items);
        for mut item in items {
            let extras = hook(&mut item);
            if !rebuilt.add(item) {
                warn!("a multiplied solution collapsed onto an existing one");
            }
            for extra in extras {
                rebuilt.add(extra);
            }
        }
        *self = rebuilt;
    }
}

impl fmt::Display for GeometryList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} solution(s):", self.items.len())?;
        for item in &self.items {
            writeln!(f, "  {item}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod ut_geometry_list {
    use super::GeometryList;
    use crate::geometry::Geometry;
    use crate::math::units::{AngleUnit, UnitScale};
    use crate::math::Vector3;

    fn one_circle(omega_rad: f64) -> Geometry {
        let mut g = Geometry::new("ONE", "one circle", 1.54).unwrap();
        let sample = g.add_holder();
        g.add_rotation(sample, "omega", -Vector3::y(), AngleUnit::Degree)
            .unwrap();
        g.set_axis_value("omega", omega_rad, UnitScale::Default)
            .unwrap();
        g.update();
        g
    }

    #[test]
    fn test_dedup_on_insertion() {
        let mut list = GeometryList::new();
        assert!(list.add(one_circle(0.0)));
        assert!(!list.add(one_circle(1e-9)), "within epsilon: rejected");
        assert!(list.add(one_circle(0.5)));
        assert_eq!(list.len(), 2);
        // Pairwise separation invariant.
        for (i, a) in list.iter().enumerate() {
            for (j, b) in list.iter().enumerate() {
                if i != j {
                    assert!(a.distance_orthodromic(b) > crate::constants::GEOMETRY_EPSILON);
                }
            }
        }
    }

    #[test]
    fn test_sort_by_distance() {
        let mut list = GeometryList::new();
        list.add(one_circle(1.0));
        list.add(one_circle(0.1));
        list.add(one_circle(-0.5));
        list.sort_by_distance_from(&one_circle(0.0));
        let values: Vec<f64> = list
            .iter()
            .map(|g| g.axis_value("omega", UnitScale::Default).unwrap())
            .collect();
        assert_eq!(values, vec![0.1, -0.5, 1.0]);
    }

    #[test]
    fn test_remove_invalid() {
        let mut list = GeometryList::new();
        let mut out_of_range = one_circle(0.0);
        out_of_range
            .axis_mut("omega")
            .unwrap()
            .set_range(-0.2, 0.2, UnitScale::Default)
            .unwrap();
        out_of_range
            .axis_mut("omega")
            .unwrap()
            .set_value(1.0, UnitScale::Default)
            .unwrap();
        list.add(out_of_range);
        list.add(one_circle(0.1));
        list.remove_invalid();
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn test_multiply() {
        fn mirror(g: &mut Geometry) -> Vec<Geometry> {
            let omega = g.axis_value("omega", UnitScale::Default).unwrap();
            let mut extra = g.clone();
            extra
                .axis_mut("omega")
                .unwrap()
                .set_value(-omega, UnitScale::Default)
                .unwrap();
            extra.update();
            vec![extra]
        }
        let mut list = GeometryList::new();
        list.add(one_circle(0.5));
        list.multiply(mirror);
        assert_eq!(list.len(), 2);
    }
}
