#![allow(clippy::float_cmp)]

use lpbind_engine::{
    BacktrackTech, BranchDir, BranchTech, ColKind, Direction, IntoptParams, IosHandle, Outcome,
    ProbHandle, Reason, SimplexParams, SolStatus, create_prob, intopt, simplex,
};

/// max 10a + 13b + 7c + 8d  s.t.  4a + 6b + 3c + 5d <= 10, all binary.
fn knapsack() -> ProbHandle {
    let prob = create_prob();
    {
        let mut p = prob.borrow_mut();
        p.set_obj_dir(Direction::Maximize);
        p.add_rows(1).unwrap();
        p.set_row_bounds(1, f64::NEG_INFINITY, 10.0).unwrap();
        p.add_cols(4).unwrap();
        let (profit, weight) = ([10.0, 13.0, 7.0, 8.0], [4.0, 6.0, 3.0, 5.0]);
        let mut entries = Vec::new();
        for j in 1..=4 {
            p.set_col_binary(j).unwrap();
            p.set_obj_coef(j, profit[j - 1]).unwrap();
            entries.push((1, j, weight[j - 1]));
        }
        p.load_matrix(&entries).unwrap();
    }
    prob
}

fn solve_root(prob: &ProbHandle) {
    let outcome = simplex(&mut prob.borrow_mut(), &SimplexParams::default());
    assert_eq!(outcome, Outcome::Success);
}

#[test]
fn test_every_branching_rule_reaches_optimum() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();

    for br_tech in [
        BranchTech::FirstFractional,
        BranchTech::LastFractional,
        BranchTech::MostFractional,
        BranchTech::DriebeckTomlin,
    ] {
        for bt_tech in [
            BacktrackTech::DepthFirst,
            BacktrackTech::BreadthFirst,
            BacktrackTech::BestLocalBound,
            BacktrackTech::BestProjection,
        ] {
            let prob = knapsack();
            solve_root(&prob);
            let parm = IntoptParams {
                br_tech,
                bt_tech,
                ..IntoptParams::default()
            };
            assert_eq!(intopt(&prob, &parm, None), Outcome::Success);
            let p = prob.borrow();
            assert_eq!(p.mip_status(), SolStatus::Optimal);
            assert!((p.mip_obj_val() - 23.0).abs() < 1e-6, "{br_tech:?}/{bt_tech:?}");
            assert!((p.mip_col_val(1).unwrap() - 1.0).abs() < 1e-6);
            assert!((p.mip_row_val(1).unwrap() - 10.0).abs() < 1e-6);
        }
    }
}

#[test]
fn test_tree_queries_are_consistent_inside_callback() {
    let prob = knapsack();
    solve_root(&prob);
    let mut last_gap = f64::MAX;
    let mut cb = |tree: &IosHandle| {
        let (active, all, total) = tree.tree_size();
        assert!(active <= all && all <= total);

        // Walk the active list both ways.
        let mut forward = Vec::new();
        let mut p = tree.next_node(0).unwrap();
        while p != 0 {
            assert!(tree.node_active(p).unwrap());
            forward.push(p);
            p = tree.next_node(p).unwrap();
        }
        let mut backward = Vec::new();
        let mut p = tree.prev_node(0).unwrap();
        while p != 0 {
            backward.push(p);
            p = tree.prev_node(p).unwrap();
        }
        backward.reverse();
        assert_eq!(forward, backward);
        assert_eq!(forward.len(), active);

        for &p in &forward {
            let up = tree.up_node(p).unwrap();
            if up == 0 {
                assert_eq!(tree.node_level(p).unwrap(), 0);
            } else {
                assert_eq!(tree.node_level(p).unwrap(), tree.node_level(up).unwrap() + 1);
                assert!(!tree.node_active(up).unwrap());
            }
        }

        if tree.reason() == Some(Reason::Select) {
            assert_eq!(tree.curr_node(), 0);
        }
        let gap = tree.mip_gap();
        assert!(gap <= last_gap + 1e-9);
        last_gap = gap;
    };
    assert_eq!(intopt(&prob, &IntoptParams::default(), Some(&mut cb)), Outcome::Success);
}

#[test]
fn test_branch_upon_and_select_are_honoured() {
    let prob = knapsack();
    solve_root(&prob);
    let mut branched = Vec::new();
    let mut cb = |tree: &IosHandle| match tree.reason() {
        Some(Reason::Branch) => {
            let j = (1..=4).rev().find(|&j| tree.can_branch(j).unwrap()).unwrap();
            tree.branch_upon(j, BranchDir::Up).unwrap();
            branched.push(j);
        }
        Some(Reason::Select) => {
            let p = tree.prev_node(0).unwrap();
            tree.select_node(p).unwrap();
        }
        _ => {}
    };
    assert_eq!(intopt(&prob, &IntoptParams::default(), Some(&mut cb)), Outcome::Success);
    assert!(!branched.is_empty());
    assert!((prob.borrow().mip_obj_val() - 23.0).abs() < 1e-6);
}

#[test]
fn test_heuristic_solution_is_accepted_once() {
    let prob = knapsack();
    solve_root(&prob);
    let mut accepted = Vec::new();
    let mut cb = |tree: &IosHandle| {
        if tree.reason() == Some(Reason::Heur) {
            // a + c: weight 7, profit 17.
            accepted.push(tree.heur_sol(&[1.0, 0.0, 1.0, 0.0]).unwrap());
        }
    };
    assert_eq!(intopt(&prob, &IntoptParams::default(), Some(&mut cb)), Outcome::Success);
    assert_eq!(accepted.first(), Some(&true));
    assert!(accepted.iter().skip(1).all(|a| !a));
    assert!((prob.borrow().mip_obj_val() - 23.0).abs() < 1e-6);
}

#[test]
fn test_infeasible_heuristic_is_rejected() {
    let prob = knapsack();
    solve_root(&prob);
    let mut verdicts = Vec::new();
    let mut cb = |tree: &IosHandle| {
        if tree.reason() == Some(Reason::Heur) {
            verdicts.push(tree.heur_sol(&[1.0, 1.0, 1.0, 1.0]).unwrap());
        }
    };
    intopt(&prob, &IntoptParams::default(), Some(&mut cb));
    assert!(verdicts.iter().all(|v| !v));
}

#[test]
fn test_row_generation_triggers_resolve() {
    let prob = knapsack();
    solve_root(&prob);
    let mut added = false;
    let mut cb = |tree: &IosHandle| {
        if tree.reason() == Some(Reason::RowGen) && !added {
            // Forbid taking both a and b.
            let work = tree.problem();
            let mut p = work.borrow_mut();
            let i = p.add_rows(1).unwrap();
            p.set_row_bounds(i, f64::NEG_INFINITY, 1.0).unwrap();
            p.set_mat_row(i, &[(1, 1.0), (2, 1.0)]).unwrap();
            added = true;
        }
    };
    assert_eq!(intopt(&prob, &IntoptParams::default(), Some(&mut cb)), Outcome::Success);
    // Best without a+b: b + c = 20.
    assert!((prob.borrow().mip_obj_val() - 20.0).abs() < 1e-6);
}

#[test]
fn test_adding_columns_aborts_search() {
    let prob = knapsack();
    solve_root(&prob);
    let mut cb = |tree: &IosHandle| {
        if tree.reason() == Some(Reason::Prepro) {
            tree.problem().borrow_mut().add_cols(1).unwrap();
        }
    };
    assert_eq!(intopt(&prob, &IntoptParams::default(), Some(&mut cb)), Outcome::Fault);
}

#[test]
fn test_presolve_detects_infeasible_integer_bounds() {
    let prob = create_prob();
    {
        let mut p = prob.borrow_mut();
        p.add_cols(1).unwrap();
        p.set_col_kind(1, ColKind::Integer).unwrap();
        p.set_col_bounds(1, 0.2, 0.8).unwrap();
    }
    let parm = IntoptParams {
        presolve: true,
        ..IntoptParams::default()
    };
    assert_eq!(intopt(&prob, &parm, None), Outcome::NoPrimalFeasible);
}

#[test]
fn test_infeasible_mip_reports_no_feasible() {
    // x integer in [0.2, 0.8] has a feasible relaxation but no integer point.
    let prob = create_prob();
    {
        let mut p = prob.borrow_mut();
        p.add_cols(1).unwrap();
        p.set_col_kind(1, ColKind::Integer).unwrap();
        p.set_col_bounds(1, 0.2, 0.8).unwrap();
        p.set_obj_coef(1, 1.0).unwrap();
    }
    solve_root(&prob);
    let parm = IntoptParams {
        pp_tech: lpbind_engine::PreprocessTech::None,
        ..IntoptParams::default()
    };
    assert_eq!(intopt(&prob, &parm, None), Outcome::Success);
    assert_eq!(prob.borrow().mip_status(), SolStatus::NoFeasible);
}
