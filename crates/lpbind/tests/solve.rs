#![allow(clippy::float_cmp)]

use lpbind::{
    Error, IntegerOptions, Outcome, Problem, Quality, ScaleFlags, SimplexMethod, SimplexOptions,
    SolStatus, SolverKind, VarKind, VarStatus,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// max x + y  s.t.  x + 2y <= 4, 3x + y <= 6, x, y >= 0.
fn bounded_lp() -> Problem {
    let p = Problem::new();
    p.set_name(Some("bounded")).unwrap();
    p.rows().insert(2).unwrap();
    p.cols().insert(2).unwrap();
    p.obj().set_maximize(true);
    p.obj().set(.., 1.0).unwrap();
    for col in &p.cols() {
        col.set_bounds((Some(0.0), None)).unwrap();
    }
    p.rows().get(0).unwrap().set_bounds((None, Some(4.0))).unwrap();
    p.rows().get(1).unwrap().set_bounds((None, Some(6.0))).unwrap();
    p.set_matrix(&[(0, 0, 1.0), (0, 1, 2.0), (1, 0, 3.0), (1, 1, 1.0)])
        .unwrap();
    p
}

fn close(a: f64, b: f64, tol: f64) -> bool {
    (a - b).abs() < tol
}

#[test]
fn test_simplex_solution() {
    init_tracing();
    let p = bounded_lp();
    assert_eq!(p.status(), SolStatus::Undefined);

    let outcome = p.simplex(&SimplexOptions::new()).unwrap();
    assert_eq!(outcome, Outcome::Success);
    assert_eq!(p.last_solver(), SolverKind::Simplex);
    assert_eq!(p.status(), SolStatus::Optimal);
    assert_eq!(p.status_primal(), SolStatus::Feasible);
    assert!(close(p.obj().value(), 2.8, 1e-7));

    let x = p.cols().get(0).unwrap();
    let row = p.rows().get(0).unwrap();
    assert!(close(x.primal().unwrap(), 1.6, 1e-7));
    assert!(close(row.primal().unwrap(), 4.0, 1e-7));
    assert!(close(row.dual().unwrap().abs(), 0.4, 1e-7));
    assert!(matches!(x.primal_m(), Err(Error::NotMip)));
}

#[test]
fn test_simplex_with_options() {
    let p = bounded_lp();
    let options = SimplexOptions::new()
        .with_meth(SimplexMethod::Dual)
        .with_tol_bnd(1e-8)
        .with_it_lim(1000);
    assert_eq!(p.simplex(&options).unwrap(), Outcome::Success);
    assert!(close(p.obj().value_s(), 2.8, 1e-7));

    let err = p.simplex(&SimplexOptions::new().with_tol_bnd(1.5)).unwrap_err();
    assert!(err.to_string().contains("tol_bnd must obey 0<tol_bnd<1"));
}

#[test]
fn test_exact_and_interior() {
    init_tracing();
    let p = bounded_lp();
    assert_eq!(p.exact(&SimplexOptions::new()).unwrap(), Outcome::Success);
    assert!(close(p.obj().value(), 2.8, 1e-7));

    assert_eq!(p.interior().unwrap(), Outcome::Success);
    assert_eq!(p.last_solver(), SolverKind::Interior);
    assert_eq!(p.status(), SolStatus::Optimal);
    assert_eq!(p.status_i(), SolStatus::Optimal);
    assert!(close(p.obj().value(), 2.8, 1e-5));
    assert!(close(p.cols().get(1).unwrap().primal().unwrap(), 1.2, 1e-5));
}

#[test]
fn test_failed_interior_keeps_last_solver() {
    let p = Problem::new();
    p.rows().insert(1).unwrap();
    p.simplex(&SimplexOptions::new()).unwrap();
    assert_eq!(p.interior().unwrap(), Outcome::Fault);
    assert_eq!(p.last_solver(), SolverKind::Simplex);
}

#[test]
fn test_infeasible_and_unbounded() {
    let p = bounded_lp();
    p.rows().get(0).unwrap().set_bounds((Some(10.0), None)).unwrap();
    for col in &p.cols() {
        col.set_bounds((0.0, 1.0)).unwrap();
    }
    assert_eq!(p.simplex(&SimplexOptions::new()).unwrap(), Outcome::Success);
    assert_eq!(p.status(), SolStatus::NoFeasible);

    let q = Problem::new();
    q.cols().insert(1).unwrap();
    let col = q.cols().get(0).unwrap();
    col.set_bounds((Some(0.0), None)).unwrap();
    q.obj().set(0, 1.0).unwrap();
    q.obj().set_maximize(true);
    q.simplex(&SimplexOptions::new()).unwrap();
    assert_eq!(q.status(), SolStatus::Unbounded);
    assert_eq!(q.ray(), Some(col));
}

#[test]
fn test_kkt_on_optimal_basis() {
    let p = bounded_lp();
    assert!(matches!(p.kkt(), Err(Error::KktUndefined(_))));
    p.simplex(&SimplexOptions::new()).unwrap();

    let kkt = p.kkt().unwrap();
    assert!(kkt.pe.ae_max < 1e-6);
    assert!(kkt.pb.ae_max < 1e-6);
    assert_eq!(kkt.pe.quality, Quality::High);
    assert_eq!(kkt.pb.quality, Quality::High);
    let de = kkt.de.unwrap();
    let db = kkt.db.unwrap();
    assert_eq!(de.quality, Quality::High);
    assert_eq!(db.quality, Quality::High);
    assert!(db.ae_max < 1e-9);
    assert!(matches!(p.kktint(), Err(Error::KktUndefined(_))));
}

#[test]
fn test_integer_requires_optimal_basis() {
    let p = bounded_lp();
    for col in &p.cols() {
        col.set_var_kind(VarKind::Integer).unwrap();
    }
    let err = p.integer(&IntegerOptions::new()).unwrap_err();
    assert!(matches!(err, Error::NoOptimalBasis));
    assert!(
        err.to_string()
            .contains("integer solver without presolve requires existing optimal basic solution")
    );

    p.simplex(&SimplexOptions::new()).unwrap();
    assert_eq!(p.integer(&IntegerOptions::new()).unwrap(), Outcome::Success);
    assert_eq!(p.last_solver(), SolverKind::Mip);
    assert_eq!(p.status(), SolStatus::Optimal);
    let value = p.obj().value();
    assert!(close(value, value.round(), 1e-9));
    for col in &p.cols() {
        let v = col.primal().unwrap();
        assert!(close(v, v.round(), 1e-9));
    }

    let kkt = p.kktint().unwrap();
    assert!(kkt.de.is_none());
    assert!(kkt.pb.ae_max < 1e-6);
}

#[test]
fn test_intopt_runs_presolved() {
    let p = bounded_lp();
    for col in &p.cols() {
        col.set_var_kind(VarKind::Integer).unwrap();
    }
    let options = IntegerOptions::new().with_mip_gap(0.0);
    assert_eq!(p.intopt(&options).unwrap(), Outcome::Success);
    assert_eq!(p.status_m(), SolStatus::Optimal);
    assert_eq!(p.status_s(), SolStatus::Undefined);

    let err = p.intopt(&IntegerOptions::new().with_mip_gap(-1.0)).unwrap_err();
    assert!(err.to_string().contains("mip_gap must be non-negative"));
}

#[test]
fn test_copy_keeps_last_solver() {
    let p = bounded_lp();
    p.interior().unwrap();
    let copy = p.copy(true);
    assert_eq!(copy.last_solver(), SolverKind::Interior);
    assert_eq!(copy.name().as_deref(), Some("bounded"));
    p.erase();
    assert_eq!(p.last_solver(), SolverKind::Simplex);
    assert_eq!(p.to_string(), "Problem, 0-by-0");
}

#[test]
fn test_warm_up_from_optimal_statuses() {
    init_tracing();
    let p = bounded_lp();
    for row in &p.rows() {
        row.set_status(VarStatus::Upper).unwrap();
    }
    for col in &p.cols() {
        col.set_status(VarStatus::Basic).unwrap();
    }
    assert_eq!(p.warm_up(), Outcome::Success);
    assert_eq!(p.status_s(), SolStatus::Optimal);
    assert_eq!(p.status_dual(), SolStatus::Feasible);
    assert!(close(p.obj().value_s(), 2.8, 1e-9));
    let y = p.cols().get(1).unwrap();
    assert!(close(y.primal_s().unwrap(), 1.2, 1e-9));
    assert!(close(p.rows().get(1).unwrap().dual_s().unwrap(), 0.2, 1e-9));
}

#[test]
fn test_warm_up_standard_basis_and_bad_basis() {
    let p = bounded_lp();
    p.std_basis();
    assert_eq!(p.warm_up(), Outcome::Success);
    assert_eq!(p.status_s(), SolStatus::Feasible);
    assert_eq!(p.status_primal(), SolStatus::Feasible);
    assert_eq!(p.status_dual(), SolStatus::Infeasible);
    assert_eq!(p.obj().value_s(), 0.0);

    p.cols().get(0).unwrap().set_status(VarStatus::Basic).unwrap();
    assert_eq!(p.warm_up(), Outcome::BadBasis);
    assert_eq!(p.status_s(), SolStatus::Feasible);
}

#[test]
fn test_scaling_requests_keep_optimum() {
    let p = bounded_lp();
    p.scale(ScaleFlags::GM | ScaleFlags::EQ | ScaleFlags::POW2);
    assert_eq!(p.simplex(&SimplexOptions::new()).unwrap(), Outcome::Success);
    assert!(close(p.obj().value_s(), 2.8, 1e-7));

    p.unscale();
    assert_eq!(p.simplex(&SimplexOptions::new()).unwrap(), Outcome::Success);
    assert!(close(p.obj().value_s(), 2.8, 1e-7));
    let bounds = p.cols().get(0).unwrap().bounds().unwrap();
    assert_eq!(bounds.lower, Some(0.0));
    assert_eq!(bounds.upper, None);
}
