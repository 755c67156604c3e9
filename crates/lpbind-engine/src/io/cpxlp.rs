//! CPLEX LP writer.

use super::{col_label, format_num, row_label};
use crate::error::EngineError;
use crate::problem::{BoundType, ColKind, Direction, NativeProblem};
use std::fmt::Write as _;
use std::fs;
use std::path::Path;
use tracing::debug;

const SYMBOLS: &str = "!\"#$%&()/,.;?@_`'{}|~";

fn valid_name(name: &str) -> bool {
    let Some(first) = name.chars().next() else {
        return false;
    };
    name.len() <= 255
        && !first.is_ascii_digit()
        && first != '.'
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || SYMBOLS.contains(c))
}

/// CPLEX LP files cannot be read by this engine.
pub fn read_lp(_path: &Path) -> Result<NativeProblem, EngineError> {
    Err(EngineError::Unsupported("CPLEX LP reading"))
}

fn linear(out: &mut String, terms: &[(f64, &str)]) {
    for &(v, name) in terms {
        let sign = if v < 0.0 { '-' } else { '+' };
        let mag = v.abs();
        if mag == 1.0 {
            let _ = write!(out, " {sign} {name}");
        } else {
            let _ = write!(out, " {sign} {} {name}", format_num(mag, 24));
        }
    }
}

/// Write `prob` in CPLEX LP format.
pub fn write_lp(prob: &NativeProblem, path: &Path) -> Result<(), EngineError> {
    let rows: Vec<String> = (1..=prob.num_rows()).map(|i| row_label(prob, i, valid_name)).collect();
    let cols: Vec<String> = (1..=prob.num_cols()).map(|j| col_label(prob, j, valid_name)).collect();
    let placeholder = cols.first().map(String::as_str);

    let mut out = String::new();
    let _ = writeln!(out, "\\* Problem: {} *\\\n", prob.name().unwrap_or("Unknown"));
    out.push_str(match prob.obj_dir() {
        Direction::Minimize => "Minimize\n",
        Direction::Maximize => "Maximize\n",
    });
    let obj = prob.obj_name().filter(|n| valid_name(n)).unwrap_or("obj");
    let _ = write!(out, " {obj}:");
    let terms: Vec<(f64, &str)> = prob
        .cols
        .iter()
        .zip(&cols)
        .filter(|(c, _)| c.obj != 0.0)
        .map(|(c, name)| (c.obj, name.as_str()))
        .collect();
    match (terms.is_empty(), placeholder) {
        (false, _) => linear(&mut out, &terms),
        (true, Some(name)) => {
            let _ = write!(out, " 0 {name}");
        }
        (true, None) => {}
    }
    let shift = prob.obj_coef(0)?;
    if shift != 0.0 {
        let sign = if shift < 0.0 { '-' } else { '+' };
        let _ = write!(out, " {sign} {}", format_num(shift.abs(), 24));
    }
    out.push_str("\n\nSubject To\n");

    let mut free_rows = 0;
    for (k, row) in prob.rows.iter().enumerate() {
        let entries = prob.mat_row(k + 1)?;
        let terms: Vec<(f64, &str)> = entries
            .iter()
            .map(|&(j, v)| (v, cols[j - 1].as_str()))
            .collect();
        let mut expr = String::new();
        match (terms.is_empty(), placeholder) {
            (false, _) => linear(&mut expr, &terms),
            (true, Some(name)) => {
                let _ = write!(expr, " 0 {name}");
            }
            (true, None) => continue,
        }
        let (lo, hi) = (format_num(row.lower, 24), format_num(row.upper, 24));
        let name = &rows[k];
        match BoundType::of(row.lower, row.upper) {
            BoundType::Free => free_rows += 1,
            BoundType::Lower => {
                let _ = writeln!(out, " {name}:{expr} >= {lo}");
            }
            BoundType::Upper => {
                let _ = writeln!(out, " {name}:{expr} <= {hi}");
            }
            BoundType::Double => {
                let _ = writeln!(out, " {name}: {lo} <={expr} <= {hi}");
            }
            BoundType::Fixed => {
                let _ = writeln!(out, " {name}:{expr} = {lo}");
            }
        }
    }
    if free_rows > 0 {
        let _ = writeln!(out, "\\* {free_rows} free row(s) omitted *\\");
    }

    let mut bounds = String::new();
    for (col, name) in prob.cols.iter().zip(&cols) {
        let (lower, upper) = (col.entity.lower, col.entity.upper);
        let (lo, hi) = (format_num(lower, 24), format_num(upper, 24));
        match BoundType::of(lower, upper) {
            BoundType::Lower if lower == 0.0 => {}
            BoundType::Lower => {
                let _ = writeln!(bounds, " {name} >= {lo}");
            }
            BoundType::Free => {
                let _ = writeln!(bounds, " {name} free");
            }
            BoundType::Upper => {
                let _ = writeln!(bounds, " -inf <= {name} <= {hi}");
            }
            BoundType::Double => {
                let _ = writeln!(bounds, " {lo} <= {name} <= {hi}");
            }
            BoundType::Fixed => {
                let _ = writeln!(bounds, " {name} = {lo}");
            }
        }
    }
    if !bounds.is_empty() {
        out.push_str("\nBounds\n");
        out.push_str(&bounds);
    }

    let generals: Vec<&str> = prob
        .cols
        .iter()
        .zip(&cols)
        .filter(|(c, _)| c.kind == ColKind::Integer)
        .map(|(_, name)| name.as_str())
        .collect();
    if !generals.is_empty() {
        out.push_str("\nGenerals\n");
        for name in generals {
            let _ = writeln!(out, " {name}");
        }
    }
    out.push_str("\nEnd\n");

    fs::write(path, out)?;
    debug!(
        component = "engine",
        operation = "write_lp",
        status = "success",
        num_rows = prob.num_rows(),
        num_cols = prob.num_cols(),
        "Wrote CPLEX LP file"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_validity() {
        assert!(valid_name("cap_1"));
        assert!(!valid_name("1cap"));
        assert!(!valid_name("has space"));
        assert!(!valid_name(""));
    }

    #[test]
    fn test_write_lp_sections() {
        let mut p = NativeProblem::new();
        p.add_rows(2).unwrap();
        p.add_cols(2).unwrap();
        p.set_col_name(1, Some("x")).unwrap();
        p.set_row_name(1, Some("cap")).unwrap();
        p.set_row_bounds(1, f64::NEG_INFINITY, 4.0).unwrap();
        p.set_row_bounds(2, 1.0, 3.0).unwrap();
        p.set_col_bounds(1, 0.0, f64::INFINITY).unwrap();
        p.set_col_bounds(2, f64::NEG_INFINITY, f64::INFINITY).unwrap();
        p.set_col_kind(1, ColKind::Integer).unwrap();
        p.set_obj_coef(1, 2.0).unwrap();
        p.set_obj_coef(2, -1.0).unwrap();
        p.load_matrix(&[(1, 1, 1.0), (1, 2, 3.0), (2, 2, 1.0)]).unwrap();

        let path = std::env::temp_dir().join(format!("lpbind-engine-{}.lp", std::process::id()));
        write_lp(&p, &path).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        let _ = fs::remove_file(&path);

        assert!(text.contains("Minimize\n obj: + 2 x - C2\n"));
        assert!(text.contains(" cap: + x + 3 C2 <= 4\n"));
        assert!(text.contains(" R2: 1 <= + C2 <= 3\n"));
        assert!(text.contains(" C2 free\n"));
        assert!(text.contains("Generals\n x\n"));
        assert!(text.ends_with("End\n"));
    }

    #[test]
    fn test_read_lp_unsupported() {
        let err = read_lp(Path::new("model.lp")).unwrap_err();
        assert!(matches!(err, EngineError::Unsupported(_)));
    }
}
