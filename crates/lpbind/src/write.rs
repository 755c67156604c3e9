//! Writing a problem and its solutions to files.

use crate::error::{Error, Result};
use crate::problem::Problem;
use lpbind_engine::io::{self, MpsFormat};
use lpbind_engine::{EngineError, NativeProblem};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

type Writer = fn(&NativeProblem, &Path) -> std::result::Result<(), EngineError>;

fn write_fixed_mps(prob: &NativeProblem, path: &Path) -> std::result::Result<(), EngineError> {
    io::write_mps(prob, MpsFormat::Fixed, path)
}

fn write_free_mps(prob: &NativeProblem, path: &Path) -> std::result::Result<(), EngineError> {
    io::write_mps(prob, MpsFormat::Free, path)
}

/// Output files for [`Problem::write`]. Unset entries are skipped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WriteOptions {
    /// Fixed MPS model.
    pub mps: Option<PathBuf>,
    /// Free MPS model.
    pub freemps: Option<PathBuf>,
    /// CPLEX LP model.
    pub cpxlp: Option<PathBuf>,
    /// Native GLP model.
    pub glp: Option<PathBuf>,
    /// Basic solution report.
    pub sol: Option<PathBuf>,
    /// Bound sensitivity report.
    pub sens_bnds: Option<PathBuf>,
    /// Interior-point solution report.
    pub ips: Option<PathBuf>,
    /// MIP solution report.
    pub mip: Option<PathBuf>,
}

impl WriteOptions {
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

    pub fn with_cpxlp(mut self, path: impl Into<PathBuf>) -> Self {
        self.cpxlp = Some(path.into());
        self
    }

    pub fn with_glp(mut self, path: impl Into<PathBuf>) -> Self {
        self.glp = Some(path.into());
        self
    }

    pub fn with_sol(mut self, path: impl Into<PathBuf>) -> Self {
        self.sol = Some(path.into());
        self
    }

    pub fn with_sens_bnds(mut self, path: impl Into<PathBuf>) -> Self {
        self.sens_bnds = Some(path.into());
        self
    }

    pub fn with_ips(mut self, path: impl Into<PathBuf>) -> Self {
        self.ips = Some(path.into());
        self
    }

    pub fn with_mip(mut self, path: impl Into<PathBuf>) -> Self {
        self.mip = Some(path.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.entries().all(|(_, path, _)| path.is_none())
    }

    fn entries(&self) -> impl Iterator<Item = (&'static str, Option<&Path>, Writer)> {
        let entries: [(&'static str, Option<&Path>, Writer); 8] = [
            ("mps", self.mps.as_deref(), write_fixed_mps),
            ("freemps", self.freemps.as_deref(), write_free_mps),
            ("cpxlp", self.cpxlp.as_deref(), io::write_lp),
            ("glp", self.glp.as_deref(), io::write_glp),
            ("sol", self.sol.as_deref(), io::print_sol),
            ("sens_bnds", self.sens_bnds.as_deref(), io::print_ranges),
            ("ips", self.ips.as_deref(), io::print_ipt),
            ("mip", self.mip.as_deref(), io::print_mip),
        ];
        entries.into_iter()
    }
}

impl Problem {
    /// Write every requested file, stopping at the first failure.
    pub fn write(&self, options: &WriteOptions) -> Result<()> {
        let prob = self.core.native.borrow();
        for (option, path, writer) in options.entries() {
            let Some(path) = path else {
                continue;
            };
            if let Err(err) = writer(&prob, path) {
                warn!(
                    component = "binding",
                    operation = "write",
                    status = "error",
                    option,
                    path = %path.display(),
                    error = %err,
                    "Writer failed"
                );
                return Err(Error::WriterFailed {
                    option,
                    path: path.display().to_string(),
                });
            }
            debug!(
                component = "binding",
                operation = "write",
                status = "success",
                option,
                path = %path.display(),
                "Wrote file"
            );
        }
        Ok(())
    }
}
