//! Building problems from model files.

use crate::error::{Error, Result};
use crate::problem::Problem;
use lpbind_engine::io::{self, MpsFormat};
use lpbind_engine::{EngineError, NativeProblem};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// A MathProg model with its optional data and output files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MathProgSource {
    pub model: PathBuf,
    #[serde(default)]
    pub data: Option<PathBuf>,
    #[serde(default)]
    pub output: Option<PathBuf>,
}

impl MathProgSource {
    pub fn new(model: impl Into<PathBuf>) -> Self {
        Self {
            model: model.into(),
            data: None,
            output: None,
        }
    }

    pub fn with_data(mut self, data: impl Into<PathBuf>) -> Self {
        self.data = Some(data.into());
        self
    }

    pub fn with_output(mut self, output: impl Into<PathBuf>) -> Self {
        self.output = Some(output.into());
        self
    }
}

/// One model file to read.
///
/// The engine writes CPLEX LP but cannot read it, and has no MathProg
/// translator. Reading [`Source::CpxLp`] or [`Source::MathProg`] always
/// fails with [`Error::ReaderFailed`](crate::Error::ReaderFailed) naming the
/// reader ("CPLEX LP" or "GMP model"), whatever the file holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    Mps(PathBuf),
    FreeMps(PathBuf),
    /// Unsupported for reading; always fails with `ReaderFailed`.
    CpxLp(PathBuf),
    Glp(PathBuf),
    /// Unsupported; always fails with `ReaderFailed`.
    MathProg(MathProgSource),
}

impl Source {
    fn reader(&self) -> &'static str {
        match self {
            Source::Mps(_) => "fixed MPS",
            Source::FreeMps(_) => "free MPS",
            Source::CpxLp(_) => "CPLEX LP",
            Source::Glp(_) => "GLPK LP/MIP",
            Source::MathProg(_) => "GMP model",
        }
    }

    fn read(&self) -> std::result::Result<NativeProblem, EngineError> {
        match self {
            Source::Mps(path) => io::read_mps(path, MpsFormat::Fixed),
            Source::FreeMps(path) => io::read_mps(path, MpsFormat::Free),
            Source::CpxLp(path) => io::read_lp(path),
            Source::Glp(path) => io::read_glp(path),
            Source::MathProg(gmp) => {
                io::read_mathprog(&gmp.model, gmp.data.as_deref(), gmp.output.as_deref())
            }
        }
    }

    fn path(&self) -> &Path {
        match self {
            Source::Mps(path) | Source::FreeMps(path) | Source::CpxLp(path) | Source::Glp(path) => {
                path
            }
            Source::MathProg(gmp) => &gmp.model,
        }
    }
}

/// Keyword-style source selection; at most one field may be set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SourceSpec {
    pub mps: Option<PathBuf>,
    pub freemps: Option<PathBuf>,
    pub cpxlp: Option<PathBuf>,
    pub glp: Option<PathBuf>,
    pub gmp: Option<MathProgSource>,
}

impl SourceSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mps(mut self, path: impl Into<PathBuf>) -> Self {
        self.mps = Some(path.into());
        self
    }

    pub fn with_freemps(mut self, path: impl Into<PathBuf>) -> Self {
        self.freemps = Some(path.into());
        self
    }

    /// Reading CPLEX LP is unsupported; see [`Source`].
    pub fn with_cpxlp(mut self, path: impl Into<PathBuf>) -> Self {
        self.cpxlp = Some(path.into());
        self
    }

    pub fn with_glp(mut self, path: impl Into<PathBuf>) -> Self {
        self.glp = Some(path.into());
        self
    }

    /// MathProg is unsupported; see [`Source`].
    pub fn with_gmp(mut self, gmp: MathProgSource) -> Self {
        self.gmp = Some(gmp);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.mps.is_none()
            && self.freemps.is_none()
            && self.cpxlp.is_none()
            && self.glp.is_none()
            && self.gmp.is_none()
    }

    /// The single selected source, `None` when nothing is set.
    pub fn source(&self) -> Result<Option<Source>> {
        let mut found = Vec::with_capacity(1);
        found.extend(self.mps.clone().map(Source::Mps));
        found.extend(self.freemps.clone().map(Source::FreeMps));
        found.extend(self.cpxlp.clone().map(Source::CpxLp));
        found.extend(self.glp.clone().map(Source::Glp));
        found.extend(self.gmp.clone().map(Source::MathProg));
        if found.len() > 1 {
            return Err(Error::MultipleSources);
        }
        Ok(found.pop())
    }
}

impl Problem {
    /// Read a problem from a model file.
    pub fn from_source(source: &Source) -> Result<Problem> {
        match source.read() {
            Ok(prob) => {
                info!(
                    component = "binding",
                    operation = "read",
                    status = "success",
                    reader = source.reader(),
                    path = %source.path().display(),
                    rows = prob.num_rows(),
                    cols = prob.num_cols(),
                    "Read problem"
                );
                Ok(Problem::from_engine(prob))
            }
            Err(err) => {
                warn!(
                    component = "binding",
                    operation = "read",
                    status = "error",
                    reader = source.reader(),
                    path = %source.path().display(),
                    error = %err,
                    "Reader failed"
                );
                Err(Error::ReaderFailed {
                    reader: source.reader(),
                    detail: err.to_string(),
                })
            }
        }
    }

    /// Build a problem from a [`SourceSpec`]: empty when no source is set.
    pub fn from_spec(spec: &SourceSpec) -> Result<Problem> {
        match spec.source()? {
            Some(source) => Problem::from_source(&source),
            None => Ok(Problem::new()),
        }
    }
}
