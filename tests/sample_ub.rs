extern crate pretty_env_logger as pel;

use gonio::prelude::*;
use gonio::{f64_eq, f64_eq_tol};

use rstest::{fixture, rstest};

#[fixture]
fn cubic() -> Sample {
    let mut sample = Sample::new("copper");
    sample.set_lattice(Lattice::cubic(1.54).unwrap());
    sample
}

fn geometry_at(values_deg: &[f64]) -> Geometry {
    let factory = diffractometers::factory("E4CV").unwrap();
    let mut geometry = factory.new_geometry().unwrap();
    geometry.set_values(values_deg, UnitScale::User).unwrap();
    geometry.update();
    geometry
}

#[test]
fn val_degenerate_lattice_rejected() {
    let error = Lattice::new(
        1.0,
        1.0,
        1.0,
        180_f64.to_radians(),
        180_f64.to_radians(),
        180_f64.to_radians(),
    )
    .unwrap_err();
    assert!(matches!(error, SampleError::DegenerateLattice { .. }));
}

#[test]
fn val_b_matrix_inverse_property() {
    // Property: for any valid cell, (1/B)·B = I.
    for lattice in [
        Lattice::cubic(1.54).unwrap(),
        Lattice::new(
            1.1,
            2.2,
            0.9,
            75_f64.to_radians(),
            100_f64.to_radians(),
            112_f64.to_radians(),
        )
        .unwrap(),
    ] {
        let b = lattice.b_matrix().unwrap();
        let b_inv = lattice.b_matrix_inverse().unwrap();
        let identity = b_inv * b;
        for row in 0..3 {
            for col in 0..3 {
                let expected = if row == col { 1.0 } else { 0.0 };
                f64_eq_tol!(identity[(row, col)], expected, 1e-10, "identity entry");
            }
        }
    }
}

#[rstest]
fn val_two_reflections_ub(mut cubic: Sample) {
    let detector = Detector::ZeroD;
    // (1, 0, 0) diffracting in the bisecting position.
    let g1 = geometry_at(&[30.0, 0.0, 90.0, 60.0]);
    // (0, 1, 0) diffracting with chi upright.
    let g2 = geometry_at(&[30.0, 90.0, 0.0, 60.0]);

    let r1 = cubic.add_reflection(&g1, &detector, 1.0, 0.0, 0.0);
    let r2 = cubic.add_reflection(&g2, &detector, 0.0, 1.0, 0.0);
    cubic.compute_ub_from_two_reflections(r1, r2).unwrap();

    // The sample was mounted with an identity orientation.
    f64_eq_tol!(cubic.ux().value(UnitScale::Default), 0.0, 1e-8, "ux");
    f64_eq_tol!(cubic.uy().value(UnitScale::Default), 0.0, 1e-8, "uy");
    f64_eq_tol!(cubic.uz().value(UnitScale::Default), 0.0, 1e-8, "uz");

    f64_eq_tol!(cubic.fitness().unwrap(), 0.0, 1e-10, "fitness");
}

#[rstest]
fn val_collinear_reflections_rejected(mut cubic: Sample) {
    let detector = Detector::ZeroD;
    let g1 = geometry_at(&[30.0, 0.0, 90.0, 60.0]);
    let r1 = cubic.add_reflection(&g1, &detector, 1.0, 0.0, 0.0);
    let r2 = cubic.add_reflection(&g1, &detector, 2.0, 0.0, 0.0);
    let error = cubic.compute_ub_from_two_reflections(r1, r2).unwrap_err();
    assert!(matches!(error, SampleError::CollinearReflections { .. }));
}

#[rstest]
fn val_affine_recovers_orientation(mut cubic: Sample) {
    let detector = Detector::ZeroD;
    let g1 = geometry_at(&[30.0, 0.0, 90.0, 60.0]);
    let g2 = geometry_at(&[30.0, 90.0, 0.0, 60.0]);
    cubic.add_reflection(&g1, &detector, 1.0, 0.0, 0.0);
    cubic.add_reflection(&g2, &detector, 0.0, 1.0, 0.0);

    // Start the refinement from a slightly wrong orientation.
    cubic
        .set_u_angles(
            2_f64.to_radians(),
            -1_f64.to_radians(),
            1.5_f64.to_radians(),
            UnitScale::Default,
        )
        .unwrap();
    let fitness = cubic.affine().unwrap();
    assert!(fitness < 1e-8, "fitness {fitness}");
    f64_eq_tol!(cubic.ux().value(UnitScale::Default), 0.0, 1e-3, "ux refined");
    f64_eq_tol!(cubic.uy().value(UnitScale::Default), 0.0, 1e-3, "uy refined");
    f64_eq_tol!(cubic.uz().value(UnitScale::Default), 0.0, 1e-3, "uz refined");
}

#[rstest]
fn val_oriented_sample_hkl(mut cubic: Sample) {
    // Rotate the crystal by 10 degrees around z on its carrier: the hkl
    // readback must follow the UB matrix.
    cubic
        .set_u_angles(0.0, 0.0, 10_f64.to_radians(), UnitScale::Default)
        .unwrap();

    let factory = diffractometers::factory("E4CV").unwrap();
    let geometry = geometry_at(&[30.0, 0.0, 90.0, 60.0]);
    let mut engines = factory.new_engine_list().unwrap();
    engines.init(&geometry, &Detector::ZeroD, &cubic);

    let hkl = engines.pseudo_values_get("hkl", UnitScale::Default).unwrap();
    // U rotates around z, and (1,0,0) is in the equatorial plane: the
    // projection picks up the inverse rotation.
    f64_eq_tol!(hkl[0], 10_f64.to_radians().cos(), 1e-6, "h");
    f64_eq_tol!(hkl[1], -10_f64.to_radians().sin(), 1e-6, "k");
    f64_eq_tol!(hkl[2], 0.0, 1e-6, "l");
}

#[test]
fn val_lattice_setters_guard() {
    let mut lattice = Lattice::cubic(1.0).unwrap();
    assert!(lattice
        .set(
            1.0,
            1.0,
            1.0,
            180_f64.to_radians(),
            180_f64.to_radians(),
            180_f64.to_radians()
        )
        .is_err());
    f64_eq!(lattice.volume(), 1.0, "volume untouched after rejection");
}
