#![allow(clippy::float_cmp)]

use lpbind::{Bounds, Error, Key, Problem, ProblemKind, Slice, VarKind, VarStatus};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// Three columns, two rows, objective [1, 2, 3].
fn small_problem() -> Problem {
    let p = Problem::new();
    assert_eq!(p.cols().insert(3).unwrap(), 0);
    assert_eq!(p.rows().insert(2).unwrap(), 0);
    p.obj().set(.., [1.0, 2.0, 3.0]).unwrap();
    p.obj().set(Key::Shift, 0.0).unwrap();
    p.set_matrix(&[(0, 0, 1.0), (0, 1, 2.0), (1, 2, 3.0)]).unwrap();
    p
}

#[test]
fn test_build_and_read_back() {
    init_tracing();
    let p = small_problem();

    assert_eq!(p.to_string(), "Problem, 2-by-3");
    assert_eq!(p.obj().iter().collect::<Vec<_>>(), vec![1.0, 2.0, 3.0]);
    assert_eq!(p.obj().shift(), 0.0);
    assert_eq!(p.matrix(), vec![(0, 0, 1.0), (0, 1, 2.0), (1, 2, 3.0)]);
    assert_eq!(p.nnz(), 3);

    assert_eq!(p.rows().get(0).unwrap().matrix().unwrap(), vec![(0, 1.0), (1, 2.0)]);
    assert_eq!(p.cols().get(2).unwrap().matrix().unwrap(), vec![(1, 3.0)]);
}

#[test]
fn test_insert_delete_cycle_keeps_mappings() {
    init_tracing();
    let p = small_problem();
    let cols = p.cols();
    cols.get(2).unwrap().set_name(Some("z")).unwrap();
    let first = cols.get(0).unwrap();
    let moved = cols.get(2).unwrap();

    assert_eq!(cols.insert(1).unwrap(), 3);
    cols.get(3).unwrap().set_matrix(&[(0, 5.0)]).unwrap();
    cols.delete(1).unwrap();

    assert_eq!(cols.len(), 3);
    assert_eq!(p.obj().iter().collect::<Vec<_>>(), vec![1.0, 3.0, 0.0]);
    assert_eq!(p.matrix(), vec![(0, 0, 1.0), (0, 2, 5.0), (1, 1, 3.0)]);
    assert_eq!(cols.get("z").unwrap().index(), 1);

    assert!(first.is_valid());
    assert_eq!(first.matrix().unwrap(), vec![(0, 1.0)]);
    assert!(!moved.is_valid());
    assert!(matches!(moved.name(), Err(Error::StaleEntity { .. })));

    for (k, bar) in cols.iter().enumerate() {
        assert_eq!(bar.index(), k);
    }
}

#[test]
fn test_index_roundtrips_through_names() {
    let p = Problem::new();
    p.rows().insert(4).unwrap();
    for bar in &p.rows() {
        bar.set_name(Some(&format!("r{}", bar.index()))).unwrap();
    }
    for i in 0..4usize {
        let bar = p.rows().get(i).unwrap();
        assert_eq!(bar.index(), i);
        let name = bar.name().unwrap().unwrap();
        assert_eq!(p.rows().get(name.as_str()).unwrap().index(), i);
    }
}

#[test]
fn test_delete_multiple_and_duplicates() {
    let p = Problem::new();
    p.rows().insert(5).unwrap();
    for bar in &p.rows() {
        bar.set_bounds((None, Some(bar.index() as f64))).unwrap();
    }
    let err = p.rows().delete(Key::many([1, 1])).unwrap_err();
    assert!(matches!(err, Error::DuplicateIndex));
    assert_eq!(p.rows().len(), 5);

    p.rows().delete(Key::many([3, 0])).unwrap();
    let uppers: Vec<Option<f64>> = p
        .rows()
        .iter()
        .map(|bar| bar.bounds().unwrap().upper)
        .collect();
    assert_eq!(uppers, vec![Some(1.0), Some(2.0), Some(4.0)]);

    p.rows().delete(Slice::new(Some(1), None)).unwrap();
    assert_eq!(p.rows().len(), 1);
}

#[test]
fn test_defaults_for_new_entities() {
    let p = Problem::new();
    p.rows().insert(1).unwrap();
    p.cols().insert(1).unwrap();
    let row = p.rows().get(0).unwrap();
    let col = p.cols().get(0).unwrap();

    assert_eq!(row.bounds().unwrap(), Bounds::free());
    assert_eq!(col.bounds().unwrap(), Bounds::fixed(0.0));
    assert_eq!(col.var_kind().unwrap(), VarKind::Continuous);
    assert_eq!(row.status().unwrap(), VarStatus::Basic);
    assert!(row.name().unwrap().is_none());
}

#[test]
fn test_bounds_validation() {
    let p = Problem::new();
    p.cols().insert(1).unwrap();
    let col = p.cols().get(0).unwrap();
    col.set_bounds((0.0, 4.0)).unwrap();
    assert_eq!(col.bounds().unwrap(), Bounds::new(Some(0.0), Some(4.0)));
    assert!(matches!(
        col.set_bounds((5.0, 1.0)),
        Err(Error::InvalidBounds { .. })
    ));
    assert!(col.set_bounds((f64::NAN, 1.0)).is_err());
    col.set_bounds(Bounds::free()).unwrap();
    assert_eq!(col.bounds().unwrap(), Bounds::free());
}

#[test]
fn test_kinds_and_counts() {
    let p = Problem::new();
    p.rows().insert(1).unwrap();
    p.cols().insert(3).unwrap();
    assert_eq!(p.kind(), ProblemKind::Continuous);

    p.cols().get(0).unwrap().set_var_kind(VarKind::Integer).unwrap();
    let bin = p.cols().get(1).unwrap();
    bin.set_var_kind(VarKind::Binary).unwrap();
    assert_eq!(bin.bounds().unwrap(), Bounds::new(Some(0.0), Some(1.0)));
    assert_eq!(bin.var_kind().unwrap(), VarKind::Binary);
    assert_eq!(p.num_int(), 2);
    assert_eq!(p.num_bin(), 1);
    assert_eq!(p.kind(), ProblemKind::MixedInteger);

    let row = p.rows().get(0).unwrap();
    assert!(matches!(row.set_var_kind(VarKind::Integer), Err(Error::RowKind(_))));
    assert_eq!(row.var_kind().unwrap(), VarKind::Continuous);
}

#[test]
fn test_status_codes() {
    let p = Problem::new();
    p.cols().insert(1).unwrap();
    let col = p.cols().get(0).unwrap();
    col.set_status_str("bs").unwrap();
    assert_eq!(col.status().unwrap(), VarStatus::Basic);
    assert!(matches!(col.set_status_str("xx"), Err(Error::InvalidStatus(_))));
}

#[test]
fn test_bars_compare_within_collection() {
    let p = small_problem();
    let a = p.cols().get(0).unwrap();
    let b = p.cols().get(2).unwrap();
    let r = p.rows().get(0).unwrap();
    assert!(a < b);
    assert_eq!(a, p.cols().get(0).unwrap());
    assert!(a.partial_cmp(&r).is_none());
    assert!(p.rows() < p.cols());
    assert_ne!(p.rows(), p.cols());
}

#[test]
fn test_bar_outlives_problem() {
    let bar = {
        let p = small_problem();
        p.cols().get(0).unwrap()
    };
    assert!(!bar.is_valid());
    assert!(bar.bounds().is_err());
}

#[test]
fn test_bad_keys() {
    let p = small_problem();
    assert!(matches!(p.cols().get(0..2), Err(Error::BadKey(_))));
    assert!(matches!(p.cols().get(Key::Shift), Err(Error::BadKey(_))));

    let other = small_problem();
    let foreign = other.cols().get(0).unwrap();
    assert!(matches!(p.cols().get(&foreign), Err(Error::BadKey(_))));
    let row = p.rows().get(0).unwrap();
    assert!(matches!(p.cols().get(row), Err(Error::BadKey(_))));

    assert!(matches!(
        p.cols().select(Slice::all().with_step(0)),
        Err(Error::BadKey(_))
    ));
}
