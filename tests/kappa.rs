extern crate pretty_env_logger as pel;

use gonio::engines::{seed_solver_rng, EngineList};
use gonio::math::angles::orthodromic_rad;
use gonio::prelude::*;
use gonio::{f64_eq, f64_eq_tol};

use rstest::{fixture, rstest};

fn angles_close(got: &[f64], want: &[f64], tol_deg: f64, msg: &str) {
    for (g, w) in got.iter().zip(want) {
        assert!(
            orthodromic_rad(g.to_radians(), w.to_radians()) < tol_deg.to_radians(),
            "{msg}: got {got:?}, want {want:?}"
        );
    }
}

#[fixture]
fn k4cv() -> EngineList {
    let factory = diffractometers::factory("K4CV").unwrap();
    let mut geometry = factory.new_geometry().unwrap();
    geometry
        .set_values(&[30.0, 0.0, 0.0, 60.0], UnitScale::User)
        .unwrap();
    let mut engines = factory.new_engine_list().unwrap();
    engines.init(&geometry, &Detector::ZeroD, &Sample::new("copper"));
    engines
}

#[rstest]
fn val_eulerians_degenerate(mut k4cv: EngineList) {
    let solutions = k4cv
        .pseudo_values_set("eulerians", &[0.0, 90.0, 0.0], UnitScale::User)
        .unwrap();
    // Exactly two kappa branches, in conversion order.
    assert_eq!(solutions.len(), 2);
    assert!(solutions.get(2).is_none());

    k4cv.select_solution(0).unwrap();
    let first = k4cv
        .pseudo_values_get("eulerians", UnitScale::User)
        .unwrap();
    angles_close(&first, &[-180.0, -90.0, 180.0], 1e-4, "first solution");

    k4cv.select_solution(1).unwrap();
    let second = k4cv
        .pseudo_values_get("eulerians", UnitScale::User)
        .unwrap();
    angles_close(&second, &[0.0, 90.0, 0.0], 1e-4, "second solution");
}

#[rstest]
fn val_eulerians_generic_target(mut k4cv: EngineList) {
    let solutions = k4cv
        .pseudo_values_set("eulerians", &[10.0, 30.0, 20.0], UnitScale::User)
        .unwrap();
    assert_eq!(solutions.len(), 2);

    // The second emitted branch reads back the request itself; the first one
    // reads back the equivalent flipped representation.
    k4cv.select_solution(1).unwrap();
    let second = k4cv
        .pseudo_values_get("eulerians", UnitScale::User)
        .unwrap();
    angles_close(&second, &[10.0, 30.0, 20.0], 1e-4, "identity branch");

    k4cv.select_solution(0).unwrap();
    let first = k4cv
        .pseudo_values_get("eulerians", UnitScale::User)
        .unwrap();
    angles_close(&first, &[-170.0, -30.0, 200.0], 1e-4, "flipped branch");
}

#[rstest]
fn val_q_scan(mut k4cv: EngineList) {
    seed_solver_rng(0);
    // Forward value at tth = 60 deg.
    let k = core::f64::consts::TAU / 1.54;
    let q = k4cv.pseudo_values_get("q", UnitScale::Default).unwrap();
    f64_eq_tol!(q[0], k, 1e-9, "q at 60 deg");

    // Scan q and check the set/get round trip at every point.
    for step in -10..10 {
        let target = f64::from(step) / 10.0;
        let solutions = k4cv
            .pseudo_values_set("q", &[target], UnitScale::Default)
            .unwrap();
        assert!(!solutions.is_empty(), "no solution for q = {target}");
        k4cv.select_solution(0).unwrap();
        let q = k4cv.pseudo_values_get("q", UnitScale::Default).unwrap();
        f64_eq_tol!(q[0], target, 1e-4, "q round trip");
    }
}

#[test]
fn val_hkl_bissector_forward() {
    // The kappa configuration equivalent to the eulerian (30, 0, 90) position.
    let factory = diffractometers::factory("K4CV").unwrap();
    let mut geometry = factory.new_geometry().unwrap();
    geometry
        .set_values(&[120.0, 0.0, 0.0, 60.0], UnitScale::User)
        .unwrap();
    let mut engines = factory.new_engine_list().unwrap();
    engines.init(&geometry, &Detector::ZeroD, &Sample::new("copper"));

    let hkl = engines.pseudo_values_get("hkl", UnitScale::Default).unwrap();
    f64_eq_tol!(hkl[0], 1.0, 1e-6, "h");
    f64_eq_tol!(hkl[1], 0.0, 1e-6, "k");
    f64_eq_tol!(hkl[2], 0.0, 1e-6, "l");

    // And the inverse from the same spot.
    seed_solver_rng(0);
    engines
        .engine_mut("hkl")
        .unwrap()
        .select_mode("bissector")
        .unwrap();
    let solutions = engines
        .pseudo_values_set("hkl", &[1.0, 0.0, 0.0], UnitScale::Default)
        .unwrap();
    assert!(!solutions.is_empty());
    engines.select_solution(0).unwrap();
    let hkl = engines.pseudo_values_get("hkl", UnitScale::Default).unwrap();
    f64_eq_tol!(hkl[0], 1.0, 1e-4, "h after set");
}

#[test]
fn val_k6c_forward() {
    let factory = diffractometers::factory("K6C").unwrap();
    let mut geometry = factory.new_geometry().unwrap();
    geometry
        .set_values(&[0.0, -60.0, 0.0, 180.0, 0.0, 60.0], UnitScale::User)
        .unwrap();
    let mut engines = factory.new_engine_list().unwrap();
    engines.init(&geometry, &Detector::ZeroD, &Sample::new("copper"));

    let hkl = engines.pseudo_values_get("hkl", UnitScale::Default).unwrap();
    f64_eq_tol!(hkl[0], 1.0, 1e-6, "h");
    f64_eq_tol!(hkl[1], 0.0, 1e-6, "k");
    f64_eq_tol!(hkl[2], 0.0, 1e-6, "l");
}

#[rstest]
fn val_eulerians_readback_branch_parameter(mut k4cv: EngineList) {
    // With solutions = 0 the readback uses the other conversion branch.
    let eulerians = k4cv
        .pseudo_values_get("eulerians", UnitScale::User)
        .unwrap();
    // kappa = 0: the primary branch reads omega = komega - 90.
    f64_eq!(eulerians[0], 30.0 - 90.0, "omega, primary branch");

    k4cv.engine_mut("eulerians")
        .unwrap()
        .set_parameter_value("solutions", 0.0, UnitScale::Default)
        .unwrap();
    let eulerians = k4cv
        .pseudo_values_get("eulerians", UnitScale::User)
        .unwrap();
    f64_eq!(eulerians[0], 30.0 + 90.0, "omega, secondary branch");
}
