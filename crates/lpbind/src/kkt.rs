//! Karush-Kuhn-Tucker accuracy reports.

use crate::error::{Error, Result};
use crate::problem::Problem;
use lpbind_engine::{KktCond, KktReport, NativeProblem, SolKind, SolStatus, check_kkt};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Solution quality implied by the largest relative error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Quality {
    #[serde(rename = "H")]
    High,
    #[serde(rename = "M")]
    Medium,
    #[serde(rename = "L")]
    Low,
    #[serde(rename = "?")]
    Unknown,
}

impl Quality {
    pub fn from_rel_err(re_max: f64) -> Self {
        if re_max <= 1e-9 {
            Quality::High
        } else if re_max <= 1e-6 {
            Quality::Medium
        } else if re_max <= 1e-3 {
            Quality::Low
        } else {
            Quality::Unknown
        }
    }

    pub fn as_char(self) -> char {
        match self {
            Quality::High => 'H',
            Quality::Medium => 'M',
            Quality::Low => 'L',
            Quality::Unknown => '?',
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// Largest errors found for one condition group. Indices are 0-based;
/// `None` means no offending entry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub ae_max: f64,
    pub ae_index: Option<usize>,
    pub re_max: f64,
    pub re_index: Option<usize>,
    pub quality: Quality,
}

impl From<KktReport> for Condition {
    fn from(report: KktReport) -> Self {
        let index = |k: usize| k.checked_sub(1);
        Self {
            ae_max: report.ae_max,
            ae_index: index(report.ae_ind),
            re_max: report.re_max,
            re_index: index(report.re_ind),
            quality: Quality::from_rel_err(report.re_max),
        }
    }
}

/// Snapshot of the KKT conditions of a solution.
///
/// `pe` indices are rows. `pb` and `db` indices run over rows first, then
/// columns. `de` indices are columns. The dual groups are absent for MIP
/// solutions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Kkt {
    pub pe: Condition,
    pub pb: Condition,
    pub de: Option<Condition>,
    pub db: Option<Condition>,
}

fn condition(prob: &NativeProblem, sol: SolKind, cond: KktCond) -> Condition {
    check_kkt(prob, sol, cond).into()
}

impl Problem {
    /// Check the basic solution. Both its primal and dual status must be
    /// defined.
    pub fn kkt(&self) -> Result<Kkt> {
        let prob = self.core.native.borrow();
        if !prob.prim_stat().is_defined() || !prob.dual_stat().is_defined() {
            return Err(Error::KktUndefined("primal or dual basic solution"));
        }
        let kkt = Kkt {
            pe: condition(&prob, SolKind::Basic, KktCond::PrimalEq),
            pb: condition(&prob, SolKind::Basic, KktCond::PrimalBound),
            de: Some(condition(&prob, SolKind::Basic, KktCond::DualEq)),
            db: Some(condition(&prob, SolKind::Basic, KktCond::DualBound)),
        };
        debug!(
            component = "binding",
            operation = "kkt",
            status = "success",
            pe = %kkt.pe.quality,
            pb = %kkt.pb.quality,
            "Checked basic solution"
        );
        Ok(kkt)
    }

    /// Check the primal conditions of the MIP solution.
    pub fn kktint(&self) -> Result<Kkt> {
        let prob = self.core.native.borrow();
        if prob.mip_status() == SolStatus::Undefined {
            return Err(Error::KktUndefined("MIP solution"));
        }
        Ok(Kkt {
            pe: condition(&prob, SolKind::Mip, KktCond::PrimalEq),
            pb: condition(&prob, SolKind::Mip, KktCond::PrimalBound),
            de: None,
            db: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quality_boundaries() {
        assert_eq!(Quality::from_rel_err(0.0), Quality::High);
        assert_eq!(Quality::from_rel_err(1e-9), Quality::High);
        assert_eq!(Quality::from_rel_err(1e-6), Quality::Medium);
        assert_eq!(Quality::from_rel_err(1e-3), Quality::Low);
        assert_eq!(Quality::from_rel_err(1e-2), Quality::Unknown);
        assert_eq!(Quality::Unknown.to_string(), "?");
    }

    #[test]
    fn test_report_indices_become_zero_based() {
        let cond = Condition::from(KktReport {
            ae_max: 2.0,
            ae_ind: 3,
            re_max: 0.0,
            re_ind: 0,
        });
        assert_eq!(cond.ae_index, Some(2));
        assert_eq!(cond.re_index, None);
        assert_eq!(cond.quality, Quality::High);
    }

    #[test]
    fn test_kkt_requires_defined_solution() {
        let p = Problem::new();
        let err = p.kkt().unwrap_err();
        assert!(
            err.to_string()
                .contains("cannot get KKT when primal or dual basic solution undefined")
        );
        assert!(p.kktint().is_err());
    }
}
