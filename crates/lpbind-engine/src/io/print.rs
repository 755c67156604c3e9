//! Human-readable solution reports.

use crate::error::EngineError;
use crate::problem::{Direction, NativeProblem};
use crate::status::SolStatus;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;
use tracing::debug;

#[derive(Clone, Copy)]
enum Which {
    Basic,
    Interior,
    Mip,
}

fn status_text(status: SolStatus) -> &'static str {
    match status {
        SolStatus::Optimal => "OPTIMAL",
        SolStatus::Feasible => "FEASIBLE",
        SolStatus::Infeasible => "INFEASIBLE (INTERMEDIATE)",
        SolStatus::NoFeasible => "INFEASIBLE (FINAL)",
        SolStatus::Unbounded => "UNBOUNDED",
        SolStatus::Undefined => "UNDEFINED",
    }
}

fn bound(v: f64) -> String {
    if v.is_finite() { format!("{v:13.6}") } else { " ".repeat(13) }
}

fn header(out: &mut String, prob: &NativeProblem, status: SolStatus, obj: f64) {
    let sense = match prob.obj_dir() {
        Direction::Minimize => "MINimum",
        Direction::Maximize => "MAXimum",
    };
    let _ = writeln!(out, "Problem:    {}", prob.name().unwrap_or(""));
    let _ = writeln!(out, "Rows:       {}", prob.num_rows());
    let _ = writeln!(out, "Columns:    {}", prob.num_cols());
    let _ = writeln!(out, "Non-zeros:  {}", prob.nnz());
    let _ = writeln!(out, "Status:     {}", status_text(status));
    let _ = writeln!(
        out,
        "Objective:  {} = {obj} ({sense})\n",
        prob.obj_name().unwrap_or("obj")
    );
}

fn table(out: &mut String, prob: &NativeProblem, which: Which) {
    let marginal = !matches!(which, Which::Mip);
    for (label, is_row) in [("Row name", true), ("Column name", false)] {
        let _ = writeln!(
            out,
            "   No. {label:<12} St   Activity     Lower bound   Upper bound{}",
            if marginal { "    Marginal" } else { "" }
        );
        let _ = writeln!(
            out,
            "------ ------------ -- ------------- ------------- -------------{}",
            if marginal { " -------------" } else { "" }
        );
        let count = if is_row { prob.num_rows() } else { prob.num_cols() };
        for k in 0..count {
            let e = if is_row { &prob.rows[k] } else { &prob.cols[k].entity };
            let (value, dual, stat) = match which {
                Which::Basic => (e.prim, e.dual, e.stat.as_str().to_uppercase()),
                Which::Interior => (e.ipt_prim, e.ipt_dual, String::new()),
                Which::Mip => (e.mip, 0.0, String::new()),
            };
            let fallback = if is_row { format!("R{}", k + 1) } else { format!("C{}", k + 1) };
            let name = e.name.clone().unwrap_or(fallback);
            let _ = write!(
                out,
                "{:>6} {:<12} {:<2} {value:13.6} {} {}",
                k + 1,
                name,
                stat,
                bound(e.lower),
                bound(e.upper)
            );
            if marginal {
                let _ = write!(out, " {dual:13.6}");
            }
            out.push('\n');
        }
        out.push('\n');
    }
}

fn finish(path: &Path, mut out: String, operation: &'static str) -> Result<(), EngineError> {
    out.push_str("End of output\n");
    fs::write(path, out)?;
    debug!(
        component = "engine",
        operation,
        status = "success",
        "Wrote solution report"
    );
    Ok(())
}

/// Write the basic solution report.
pub fn print_sol(prob: &NativeProblem, path: &Path) -> Result<(), EngineError> {
    let mut out = String::new();
    header(&mut out, prob, prob.status(), prob.obj_val());
    table(&mut out, prob, Which::Basic);
    finish(path, out, "print_sol")
}

/// Write the interior-point solution report.
pub fn print_ipt(prob: &NativeProblem, path: &Path) -> Result<(), EngineError> {
    let mut out = String::new();
    header(&mut out, prob, prob.ipt_status(), prob.ipt_obj_val());
    table(&mut out, prob, Which::Interior);
    finish(path, out, "print_ipt")
}

/// Write the MIP solution report.
pub fn print_mip(prob: &NativeProblem, path: &Path) -> Result<(), EngineError> {
    let mut out = String::new();
    header(&mut out, prob, prob.mip_status(), prob.mip_obj_val());
    table(&mut out, prob, Which::Mip);
    finish(path, out, "print_mip")
}

/// Write the bound sensitivity report for an optimal basic solution.
///
/// For each non-basic row or column the report gives the marginal together
/// with the objective change per unit of bound relaxation. Basic entries
/// list their slack to either bound.
pub fn print_ranges(prob: &NativeProblem, path: &Path) -> Result<(), EngineError> {
    if prob.status() != SolStatus::Optimal {
        return Err(EngineError::NotOptimal);
    }
    let mut out = String::new();
    header(&mut out, prob, prob.status(), prob.obj_val());
    let _ = writeln!(
        out,
        "   No. Name         St   Activity     Slack lower   Slack upper    Marginal"
    );
    let _ = writeln!(
        out,
        "------ ------------ -- ------------- ------------- ------------- -------------"
    );
    let entities = prob
        .rows
        .iter()
        .chain(prob.cols.iter().map(|c| &c.entity))
        .enumerate();
    let m = prob.num_rows();
    for (k, e) in entities {
        let fallback = if k < m { format!("R{}", k + 1) } else { format!("C{}", k + 1 - m) };
        let name = e.name.clone().unwrap_or(fallback);
        let _ = writeln!(
            out,
            "{:>6} {:<12} {:<2} {:13.6} {} {} {:13.6}",
            k + 1,
            name,
            e.stat.as_str().to_uppercase(),
            e.prim,
            bound(e.prim - e.lower),
            bound(e.upper - e.prim),
            e.dual
        );
    }
    out.push('\n');
    finish(path, out, "print_ranges")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::SimplexParams;
    use crate::simplex::simplex;

    #[test]
    fn test_ranges_require_optimal_basis() {
        let p = NativeProblem::new();
        let path = std::env::temp_dir().join("lpbind-engine-never-written.txt");
        let err = print_ranges(&p, &path).unwrap_err();
        assert_eq!(err, EngineError::NotOptimal);
    }

    #[test]
    fn test_print_sol_lists_entities() {
        let mut p = NativeProblem::new();
        p.add_rows(1).unwrap();
        p.add_cols(1).unwrap();
        p.set_col_name(1, Some("x")).unwrap();
        p.set_col_bounds(1, 0.0, 2.0).unwrap();
        p.set_obj_coef(1, 1.0).unwrap();
        p.set_obj_dir(Direction::Maximize);
        p.load_matrix(&[(1, 1, 1.0)]).unwrap();
        simplex(&mut p, &SimplexParams::default());

        let path = std::env::temp_dir().join(format!("lpbind-engine-{}.sol", std::process::id()));
        print_sol(&p, &path).unwrap();
        print_ranges(&p, &path).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        let _ = fs::remove_file(&path);
        assert!(text.contains("Status:     OPTIMAL"));
        assert!(text.contains("MAXimum"));
        assert!(text.ends_with("End of output\n"));
    }
}
