//! Native problem format: a JSON document.

use crate::error::EngineError;
use crate::problem::{ColKind, Direction, NativeProblem};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use tracing::debug;

/// Serialized form of a problem. Infinite bounds are written as `null`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GlpDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub objective: GlpObjective,
    #[serde(default)]
    pub rows: Vec<GlpRow>,
    #[serde(default)]
    pub cols: Vec<GlpCol>,
    /// Nonzero coefficients as `(row, col, value)`, 1-based.
    #[serde(default)]
    pub matrix: Vec<(usize, usize, f64)>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GlpObjective {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub direction: Direction,
    #[serde(default)]
    pub shift: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GlpRow {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub lower: Option<f64>,
    pub upper: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GlpCol {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub kind: ColKind,
    pub lower: Option<f64>,
    pub upper: Option<f64>,
    #[serde(default)]
    pub obj: f64,
}

fn finite(v: f64) -> Option<f64> {
    v.is_finite().then_some(v)
}

impl GlpDocument {
    pub fn from_problem(prob: &NativeProblem) -> Self {
        GlpDocument {
            name: prob.name().map(str::to_string),
            objective: GlpObjective {
                name: prob.obj_name().map(str::to_string),
                direction: prob.obj_dir(),
                shift: prob.obj_shift(),
            },
            rows: prob
                .rows
                .iter()
                .map(|r| GlpRow {
                    name: r.name.clone(),
                    lower: finite(r.lower),
                    upper: finite(r.upper),
                })
                .collect(),
            cols: prob
                .cols
                .iter()
                .map(|c| GlpCol {
                    name: c.entity.name.clone(),
                    kind: c.kind,
                    lower: finite(c.entity.lower),
                    upper: finite(c.entity.upper),
                    obj: c.obj,
                })
                .collect(),
            matrix: prob.matrix(),
        }
    }

    pub fn into_problem(self) -> Result<NativeProblem, EngineError> {
        let mut prob = NativeProblem::new();
        prob.set_name(self.name.as_deref());
        prob.set_obj_name(self.objective.name.as_deref());
        prob.set_obj_dir(self.objective.direction);
        prob.set_obj_coef(0, self.objective.shift)?;
        if !self.rows.is_empty() {
            prob.add_rows(self.rows.len())?;
        }
        if !self.cols.is_empty() {
            prob.add_cols(self.cols.len())?;
        }
        for (k, row) in self.rows.iter().enumerate() {
            prob.set_row_name(k + 1, row.name.as_deref())?;
            prob.set_row_bounds(
                k + 1,
                row.lower.unwrap_or(f64::NEG_INFINITY),
                row.upper.unwrap_or(f64::INFINITY),
            )?;
        }
        for (k, col) in self.cols.iter().enumerate() {
            let j = k + 1;
            prob.set_col_name(j, col.name.as_deref())?;
            prob.set_col_kind(j, col.kind)?;
            prob.set_col_bounds(
                j,
                col.lower.unwrap_or(f64::NEG_INFINITY),
                col.upper.unwrap_or(f64::INFINITY),
            )?;
            prob.set_obj_coef(j, col.obj)?;
        }
        prob.load_matrix(&self.matrix)?;
        Ok(prob)
    }
}

pub fn read_glp(path: &Path) -> Result<NativeProblem, EngineError> {
    let reader = BufReader::new(File::open(path)?);
    let doc: GlpDocument = serde_json::from_reader(reader).map_err(|err| EngineError::Parse {
        line: err.line(),
        message: err.to_string(),
    })?;
    let prob = doc.into_problem()?;
    debug!(
        component = "engine",
        operation = "read_glp",
        status = "success",
        num_rows = prob.num_rows(),
        num_cols = prob.num_cols(),
        "Read native problem file"
    );
    Ok(prob)
}

pub fn write_glp(prob: &NativeProblem, path: &Path) -> Result<(), EngineError> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, &GlpDocument::from_problem(prob))
        .map_err(|err| EngineError::Io(err.to_string()))?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}
