//! Karush-Kuhn-Tucker accuracy checks of a stored solution.

use crate::problem::{Direction, NativeProblem};
use crate::status::VarStatus;

/// Which stored solution to check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolKind {
    Basic,
    Interior,
    Mip,
}

/// Condition to check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KktCond {
    /// Row activities agree with the constraint matrix.
    PrimalEq,
    /// Primal values respect their bounds; indices span rows then columns.
    PrimalBound,
    /// Reduced costs agree with the row duals; indices are column numbers.
    DualEq,
    /// Reduced costs have the sign their status calls for; indices span
    /// rows then columns.
    DualBound,
}

/// Largest errors found for one condition. Indices are 1-based, 0 for none.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct KktReport {
    pub ae_max: f64,
    pub ae_ind: usize,
    pub re_max: f64,
    pub re_ind: usize,
}

impl KktReport {
    fn record(&mut self, k: usize, ae: f64, re: f64) {
        if ae > self.ae_max {
            self.ae_max = ae;
            self.ae_ind = k;
        }
        if re > self.re_max {
            self.re_max = re;
            self.re_ind = k;
        }
    }
}

struct View {
    row_prim: Vec<f64>,
    row_dual: Vec<f64>,
    col_prim: Vec<f64>,
    col_dual: Vec<f64>,
}

fn view(prob: &NativeProblem, sol: SolKind) -> View {
    let rows = &prob.rows;
    let cols = prob.cols.iter().map(|c| &c.entity);
    match sol {
        SolKind::Basic => View {
            row_prim: rows.iter().map(|r| r.prim).collect(),
            row_dual: rows.iter().map(|r| r.dual).collect(),
            col_prim: cols.clone().map(|c| c.prim).collect(),
            col_dual: cols.map(|c| c.dual).collect(),
        },
        SolKind::Interior => View {
            row_prim: rows.iter().map(|r| r.ipt_prim).collect(),
            row_dual: rows.iter().map(|r| r.ipt_dual).collect(),
            col_prim: cols.clone().map(|c| c.ipt_prim).collect(),
            col_dual: cols.map(|c| c.ipt_dual).collect(),
        },
        SolKind::Mip => View {
            row_prim: rows.iter().map(|r| r.mip).collect(),
            row_dual: vec![0.0; rows.len()],
            col_prim: cols.map(|c| c.mip).collect(),
            col_dual: vec![0.0; prob.cols.len()],
        },
    }
}

/// Check condition `cond` of solution `sol`.
///
/// Dual conditions are meaningless for a MIP solution and report no error.
pub fn check_kkt(prob: &NativeProblem, sol: SolKind, cond: KktCond) -> KktReport {
    let v = view(prob, sol);
    let mut report = KktReport::default();
    match cond {
        KktCond::PrimalEq => {
            let act = prob.row_activity(&v.col_prim);
            for (i, (&r, sp)) in v.row_prim.iter().zip(act).enumerate() {
                let ae = (r - sp).abs();
                report.record(i + 1, ae, ae / (1.0 + r.abs()));
            }
        }
        KktCond::PrimalBound => {
            let bounds = prob
                .rows
                .iter()
                .map(|r| (r.lower, r.upper))
                .chain(prob.cols.iter().map(|c| (c.entity.lower, c.entity.upper)));
            let values = v.row_prim.iter().chain(&v.col_prim);
            for (k, ((lower, upper), &x)) in bounds.zip(values).enumerate() {
                let (ae, bnd) = if x < lower {
                    (lower - x, lower)
                } else if x > upper {
                    (x - upper, upper)
                } else {
                    continue;
                };
                report.record(k + 1, ae, ae / (1.0 + bnd.abs()));
            }
        }
        KktCond::DualEq if sol == SolKind::Mip => {}
        KktCond::DualEq => {
            let mut dj: Vec<f64> = prob.cols.iter().map(|c| c.obj).collect();
            for (i, j, a) in prob.coef_iter() {
                dj[j - 1] -= a * v.row_dual[i - 1];
            }
            for (j, (col, (&d, &given))) in prob.cols.iter().zip(dj.iter().zip(&v.col_dual)).enumerate() {
                let ae = (d - given).abs();
                report.record(j + 1, ae, ae / (1.0 + col.obj.abs()));
            }
        }
        KktCond::DualBound if sol == SolKind::Mip => {}
        KktCond::DualBound => {
            let sign = match prob.obj_dir() {
                Direction::Minimize => 1.0,
                Direction::Maximize => -1.0,
            };
            let stats = prob
                .rows
                .iter()
                .map(|r| r.stat)
                .chain(prob.cols.iter().map(|c| c.entity.stat));
            let duals = v.row_dual.iter().chain(&v.col_dual);
            for (k, (stat, &d)) in stats.zip(duals).enumerate() {
                let d = sign * d;
                let ae = match stat {
                    VarStatus::Basic => d.abs(),
                    VarStatus::Lower => (-d).max(0.0),
                    VarStatus::Upper => d.max(0.0),
                    VarStatus::Free => d.abs(),
                    VarStatus::Fixed => 0.0,
                };
                if ae > 0.0 {
                    report.record(k + 1, ae, ae / (1.0 + d.abs()));
                }
            }
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::SimplexParams;
    use crate::simplex::simplex;

    fn solved() -> NativeProblem {
        // min x + 2y  s.t.  x + y >= 2, 0 <= x <= 1, y >= 0
        let mut p = NativeProblem::new();
        p.add_rows(1).unwrap();
        p.add_cols(2).unwrap();
        p.set_row_bounds(1, 2.0, f64::INFINITY).unwrap();
        p.set_col_bounds(1, 0.0, 1.0).unwrap();
        p.set_col_bounds(2, 0.0, f64::INFINITY).unwrap();
        p.set_obj_coef(1, 1.0).unwrap();
        p.set_obj_coef(2, 2.0).unwrap();
        p.load_matrix(&[(1, 1, 1.0), (1, 2, 1.0)]).unwrap();
        simplex(&mut p, &SimplexParams::default());
        p
    }

    #[test]
    fn test_primal_conditions_of_optimal_solution() {
        let p = solved();
        let pe = check_kkt(&p, SolKind::Basic, KktCond::PrimalEq);
        assert!(pe.re_max <= 1e-9);
        let pb = check_kkt(&p, SolKind::Basic, KktCond::PrimalBound);
        assert!(pb.re_max <= 1e-9);
    }

    #[test]
    fn test_primal_bound_reports_combined_index() {
        let mut p = solved();
        // Push column 2 below its lower bound.
        p.cols[1].entity.prim = -3.0;
        let pb = check_kkt(&p, SolKind::Basic, KktCond::PrimalBound);
        assert_eq!(pb.ae_ind, 1 + 2);
        assert!((pb.ae_max - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_dual_conditions_of_optimal_solution() {
        // The row sits at its lower bound with multiplier 2; x sits at its
        // upper bound with reduced cost -1.
        let p = solved();
        assert!((p.rows[0].dual - 2.0).abs() < 1e-9);
        let de = check_kkt(&p, SolKind::Basic, KktCond::DualEq);
        assert!(de.re_max <= 1e-9);
        let db = check_kkt(&p, SolKind::Basic, KktCond::DualBound);
        assert_eq!(db, KktReport::default());
    }

    #[test]
    fn test_dual_bound_flags_wrong_sign() {
        let mut p = solved();
        p.rows[0].dual = -2.0;
        let db = check_kkt(&p, SolKind::Basic, KktCond::DualBound);
        assert_eq!(db.ae_ind, 1);
        assert!((db.ae_max - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_dual_groups_empty_for_mip() {
        let p = solved();
        let de = check_kkt(&p, SolKind::Mip, KktCond::DualEq);
        assert_eq!(de, KktReport::default());
    }
}
