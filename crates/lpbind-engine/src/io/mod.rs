//! Problem file formats and printable solution reports.

mod cpxlp;
mod glp;
mod mps;
mod print;

pub use cpxlp::{read_lp, write_lp};
pub use glp::{GlpDocument, read_glp, write_glp};
pub use mps::{MpsFormat, read_mps, write_mps};
pub use print::{print_ipt, print_mip, print_ranges, print_sol};

use crate::error::EngineError;
use crate::problem::NativeProblem;
use std::path::Path;

/// Translate a MathProg model, with optional data and output files.
///
/// MathProg translation is not available in this engine.
pub fn read_mathprog(
    _model: &Path,
    _data: Option<&Path>,
    _output: Option<&Path>,
) -> Result<NativeProblem, EngineError> {
    Err(EngineError::Unsupported("MathProg translation"))
}

/// Name for row `i` usable in a file, falling back to a generated one.
fn row_label(prob: &NativeProblem, i: usize, valid: impl Fn(&str) -> bool) -> String {
    match prob.row_name(i) {
        Ok(Some(name)) if valid(name) => name.to_string(),
        _ => format!("R{i}"),
    }
}

fn col_label(prob: &NativeProblem, j: usize, valid: impl Fn(&str) -> bool) -> String {
    match prob.col_name(j) {
        Ok(Some(name)) if valid(name) => name.to_string(),
        _ => format!("C{j}"),
    }
}

/// Shortest representation of `v` no longer than `width` characters.
fn format_num(v: f64, width: usize) -> String {
    let plain = format!("{v}");
    if plain.len() <= width {
        return plain;
    }
    let exp = format!("{v:e}");
    if exp.len() <= width {
        return exp;
    }
    // Drop mantissa digits until it fits.
    for digits in (0..15).rev() {
        let s = format!("{v:.digits$e}");
        if s.len() <= width {
            return s;
        }
    }
    exp
}
