/*
 * GONIO Toolkit
 * Copyright (C) 2021-onward Christopher Rabotin <christopher.rabotin@gmail.com> et al. (cf. AUTHORS.md)
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 *
 * Documentation: https://nyxspace.com/
 */

use core::f64::consts::PI;
use core::fmt;

use log::debug;
use snafu::ensure;

use crate::detector::Detector;
use crate::errors::{
    CollinearReflectionsSnafu, MaxIterationsReachedSnafu, NotEnoughReflectionsSnafu, SampleError,
    UnknownReflectionSnafu,
};
use crate::geometry::Geometry;
use crate::math::rotation::{rx, ry, rz};
use crate::math::units::{AngleUnit, Unit, UnitScale};
use crate::math::{Matrix3, Vector3};
use crate::parameter::Parameter;

mod lattice;
pub use lattice::Lattice;

/// Cross products below this norm mean the two vectors are collinear.
const COLLINEAR_EPSILON: f64 = 1e-6;

/// Convergence threshold on the simplex spread of the orientation refinement.
const AFFINE_TOLERANCE: f64 = 1e-12;
const AFFINE_MAX_ITERATIONS: usize = 1000;

/// A reflection: Miller indices bound to the geometry and detector snapshot
/// they were observed with.
#[derive(Clone, Debug)]
pub struct Reflection {
    hkl: Vector3,
    geometry: Geometry,
    detector: Detector,
}

impl Reflection {
    pub fn hkl(&self) -> Vector3 {
        self.hkl
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    /// The measured scattering vector of this reflection, rotated back into
    /// the sample carrier frame: R_s⁻¹ · (kf - ki).
    pub fn measured(&self) -> Vector3 {
        let q = self.geometry.kf(&self.detector) - self.geometry.ki();
        self.geometry.sample_rotation().conjugate() * q
    }
}

/// A sample: a unit cell plus the orientation of the crystal on the carrier,
/// expressed as three rotation angles ux, uy, uz such that
/// U = Rx(ux)·Ry(uy)·Rz(uz).
#[derive(Clone, Debug)]
pub struct Sample {
    name: String,
    lattice: Lattice,
    ux: Parameter,
    uy: Parameter,
    uz: Parameter,
    reflections: Vec<Reflection>,
}

fn orientation_parameter(name: &str) -> Parameter {
    Parameter::scalar(name, 0.0, -PI, PI)
        .with_unit(Unit::Angle(AngleUnit::Degree))
        .with_description("orientation angle")
}

impl Sample {
    /// A new sample with the default cubic lattice and an identity orientation.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            lattice: Lattice::default(),
            ux: orientation_parameter("ux"),
            uy: orientation_parameter("uy"),
            uz: orientation_parameter("uz"),
            reflections: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn lattice(&self) -> &Lattice {
        &self.lattice
    }

    pub fn set_lattice(&mut self, lattice: Lattice) {
        self.lattice = lattice;
    }

    pub fn ux(&self) -> &Parameter {
        &self.ux
    }

    pub fn uy(&self) -> &Parameter {
        &self.uy
    }

    pub fn uz(&self) -> &Parameter {
        &self.uz
    }

    /// Sets the three orientation angles at once.
    pub fn set_u_angles(&mut self, ux: f64, uy: f64, uz: f64, scale: UnitScale) -> Result<(), SampleError> {
        for (parameter, value) in [(&mut self.ux, ux), (&mut self.uy, uy), (&mut self.uz, uz)] {
            parameter
                .set_value(value, scale)
                .map_err(|source| SampleError::LatticeParameter {
                    action: "setting the orientation angles",
                    source,
                })?;
        }
        Ok(())
    }

    /// The orientation matrix U = Rx(ux)·Ry(uy)·Rz(uz).
    pub fn u_matrix(&self) -> Matrix3 {
        rx(self.ux.value(UnitScale::Default))
            * ry(self.uy.value(UnitScale::Default))
            * rz(self.uz.value(UnitScale::Default))
    }

    /// The UB matrix mapping Miller indices to the sample carrier frame.
    pub fn ub(&self) -> Result<Matrix3, SampleError> {
        Ok(self.u_matrix() * self.lattice.b_matrix()?)
    }

    pub fn reflections(&self) -> &[Reflection] {
        &self.reflections
    }

    /// Records a reflection observed at the provided geometry snapshot and
    /// returns its index. The snapshot is deep copied.
    pub fn add_reflection(
        &mut self,
        geometry: &Geometry,
        detector: &Detector,
        h: f64,
        k: f64,
        l: f64,
    ) -> usize {
        let mut snapshot = geometry.clone();
        snapshot.update();
        self.reflections.push(Reflection {
            hkl: Vector3::new(h, k, l),
            geometry: snapshot,
            detector: *detector,
        });
        self.reflections.len() - 1
    }

    pub fn clear_reflections(&mut self) {
        self.reflections.clear();
    }

    /// Busing-Levy closed form: computes U from two non-collinear reflections
    /// and stores the resulting ux, uy, uz angles.
    pub fn compute_ub_from_two_reflections(
        &mut self,
        index1: usize,
        index2: usize,
    ) -> Result<(), SampleError> {
        let r1 = self
            .reflections
            .get(index1)
            .ok_or_else(|| UnknownReflectionSnafu { index: index1 }.build())?;
        let r2 = self
            .reflections
            .get(index2)
            .ok_or_else(|| UnknownReflectionSnafu { index: index2 }.build())?;

        let b = self.lattice.b_matrix()?;
        let t1 = b * r1.hkl;
        let t2 = b * r2.hkl;
        ensure!(
            t1.cross(&t2).norm() > COLLINEAR_EPSILON,
            CollinearReflectionsSnafu { index1, index2 }
        );

        let m1 = r1.measured();
        let m2 = r2.measured();
        ensure!(
            m1.cross(&m2).norm() > COLLINEAR_EPSILON,
            CollinearReflectionsSnafu { index1, index2 }
        );

        let u = triad(&m1, &m2) * triad(&t1, &t2).transpose();
        let (ux, uy, uz) = u_angles(&u);
        self.set_u_angles(ux, uy, uz, UnitScale::Default)
    }

    /// Sum over reflections of |UB·h - q_measured|².
    pub fn fitness(&self) -> Result<f64, SampleError> {
        ensure!(
            !self.reflections.is_empty(),
            NotEnoughReflectionsSnafu {
                need: 1_usize,
                action: "evaluate the orientation fitness"
            }
        );
        let ub = self.ub()?;
        Ok(self
            .reflections
            .iter()
            .map(|r| (ub * r.hkl - r.measured()).norm_squared())
            .sum())
    }

    /// Least-squares refinement of ux, uy, uz over the recorded reflections
    /// with a bounded Nelder-Mead simplex. Returns the final fitness.
    pub fn affine(&mut self) -> Result<f64, SampleError> {
        ensure!(
            !self.reflections.is_empty(),
            NotEnoughReflectionsSnafu {
                need: 1_usize,
                action: "refine the orientation"
            }
        );
        let b = self.lattice.b_matrix()?;
        let lo = [
            self.ux.min(UnitScale::Default),
            self.uy.min(UnitScale::Default),
            self.uz.min(UnitScale::Default),
        ];
        let hi = [
            self.ux.max(UnitScale::Default),
            self.uy.max(UnitScale::Default),
            self.uz.max(UnitScale::Default),
        ];
        let cost = |x: &[f64; 3]| -> f64 {
            let u = rx(x[0]) * ry(x[1]) * rz(x[2]);
            let ub = u * b;
            self.reflections
                .iter()
                .map(|r| (ub * r.hkl - r.measured()).norm_squared())
                .sum()
        };

        let start = [
            self.ux.value(UnitScale::Default),
            self.uy.value(UnitScale::Default),
            self.uz.value(UnitScale::Default),
        ];
        let (best, fitness) = nelder_mead(cost, start, &lo, &hi)?;
        debug!("orientation refined to {best:?} with fitness {fitness:.3e}");
        self.set_u_angles(best[0], best[1], best[2], UnitScale::Default)?;
        Ok(fitness)
    }
}

/// Right-handed orthonormal triad built on v1 and the plane (v1, v2),
/// returned as a matrix with the triad as columns.
fn triad(v1: &Vector3, v2: &Vector3) -> Matrix3 {
    let u1 = v1.normalize();
    let u3 = v1.cross(v2).normalize();
    let u2 = u3.cross(&u1);
    Matrix3::from_columns(&[u1, u2, u3])
}

/// Extracts (ux, uy, uz) such that Rx(ux)·Ry(uy)·Rz(uz) equals the provided
/// rotation matrix.
fn u_angles(u: &Matrix3) -> (f64, f64, f64) {
    let sy = u[(0, 2)].clamp(-1.0, 1.0);
    if 1.0 - sy.abs() < 1e-12 {
        // Gimbal lock: ux and uz are degenerate, fold everything into ux.
        (u[(1, 0)].atan2(u[(1, 1)]), sy.asin(), 0.0)
    } else {
        (
            (-u[(1, 2)]).atan2(u[(2, 2)]),
            sy.asin(),
            (-u[(0, 1)]).atan2(u[(0, 0)]),
        )
    }
}

/// Bounded Nelder-Mead over a 3-dimensional cost function.
fn nelder_mead<F: Fn(&[f64; 3]) -> f64>(
    cost: F,
    start: [f64; 3],
    lo: &[f64; 3],
    hi: &[f64; 3],
) -> Result<([f64; 3], f64), SampleError> {
    const ALPHA: f64 = 1.0;
    const GAMMA: f64 = 2.0;
    const RHO: f64 = 0.5;
    const SIGMA: f64 = 0.5;
    const STEP: f64 = 0.1;

    let clamp = |x: [f64; 3]| -> [f64; 3] {
        [
            x[0].clamp(lo[0], hi[0]),
            x[1].clamp(lo[1], hi[1]),
            x[2].clamp(lo[2], hi[2]),
        ]
    };

    // Initial simplex: the start point plus one offset vertex per dimension.
    let mut simplex: Vec<([f64; 3], f64)> = Vec::with_capacity(4);
    let start = clamp(start);
    simplex.push((start, cost(&start)));
    for dim in 0..3 {
        let mut vertex = start;
        vertex[dim] = if vertex[dim] + STEP <= hi[dim] {
            vertex[dim] + STEP
        } else {
            vertex[dim] - STEP
        };
        let vertex = clamp(vertex);
        simplex.push((vertex, cost(&vertex)));
    }

    for _ in 0..AFFINE_MAX_ITERATIONS {
        simplex.sort_by(|a, b| a.1.total_cmp(&b.1));
        let spread = simplex[3].1 - simplex[0].1;
        if spread.abs() < AFFINE_TOLERANCE {
            return Ok(simplex[0]);
        }

        // Centroid of the three best vertices.
        let mut centroid = [0.0; 3];
        for (vertex, _) in simplex.iter().take(3) {
            for dim in 0..3 {
                centroid[dim] += vertex[dim] / 3.0;
            }
        }

        let worst = simplex[3];
        let reflect = |coef: f64| -> [f64; 3] {
            clamp([
                centroid[0] + coef * (centroid[0] - worst.0[0]),
                centroid[1] + coef * (centroid[1] - worst.0[1]),
                centroid[2] + coef * (centroid[2] - worst.0[2]),
            ])
        };

        let reflected = reflect(ALPHA);
        let reflected_cost = cost(&reflected);
        if reflected_cost < simplex[0].1 {
            let expanded = reflect(GAMMA);
            let expanded_cost = cost(&expanded);
            simplex[3] = if expanded_cost < reflected_cost {
                (expanded, expanded_cost)
            } else {
                (reflected, reflected_cost)
            };
        } else if reflected_cost < simplex[2].1 {
            simplex[3] = (reflected, reflected_cost);
        } else {
            let contracted = reflect(-RHO);
            let contracted_cost = cost(&contracted);
            if contracted_cost < worst.1 {
                simplex[3] = (contracted, contracted_cost);
            } else {
                // Shrink toward the best vertex.
                let best = simplex[0].0;
                for (vertex, value) in simplex.iter_mut().skip(1) {
                    for dim in 0..3 {
                        vertex[dim] = best[dim] + SIGMA * (vertex[dim] - best[dim]);
                    }
                    *value = cost(vertex);
                }
            }
        }
    }

    MaxIterationsReachedSnafu {
        iter: AFFINE_MAX_ITERATIONS,
        action: "refining the sample orientation",
    }
    .fail()
    .map_err(|source| SampleError::SampleMath { source })
}

impl fmt::Display for Sample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: a={:.4} b={:.4} c={:.4} nm, {} reflection(s)",
            self.name,
            self.lattice.a().value(UnitScale::Default),
            self.lattice.b().value(UnitScale::Default),
            self.lattice.c().value(UnitScale::Default),
            self.reflections.len()
        )
    }
}

#[cfg(test)]
mod ut_sample {
    use super::{u_angles, Sample, UnitScale};
    use crate::math::rotation::{rx, ry, rz};

    #[test]
    fn test_u_angles_round_trip() {
        for (a, b, c) in [
            (0.1, -0.2, 0.3),
            (1.0, 0.5, -1.2),
            (-0.7, 1.1, 0.0),
            (0.0, 0.0, 0.0),
        ] {
            let u = rx(a) * ry(b) * rz(c);
            let (ax, ay, az) = u_angles(&u);
            let u2 = rx(ax) * ry(ay) * rz(az);
            assert!((u - u2).norm() < 1e-10, "angles ({a}, {b}, {c})");
        }
    }

    #[test]
    fn test_default_sample() {
        let sample = Sample::new("cu");
        assert_eq!(sample.name(), "cu");
        let ub = sample.ub().unwrap();
        let b = sample.lattice().b_matrix().unwrap();
        assert!((ub - b).norm() < 1e-12, "identity orientation");
    }

    #[test]
    fn test_set_u_angles() {
        let mut sample = Sample::new("cu");
        sample.set_u_angles(10.0, 20.0, 30.0, UnitScale::User).unwrap();
        assert!((sample.ux().value(UnitScale::Default) - 10_f64.to_radians()).abs() < 1e-12);
        let u = sample.u_matrix();
        let expected = rx(10_f64.to_radians()) * ry(20_f64.to_radians()) * rz(30_f64.to_radians());
        assert!((u - expected).norm() < 1e-12);
    }

    #[test]
    fn test_fitness_requires_reflections() {
        let sample = Sample::new("cu");
        assert!(sample.fitness().is_err());
    }
}
