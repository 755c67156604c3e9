//! Solver outcome and solution status types.

use serde::{Deserialize, Serialize};

/// Return code of a solver call.
///
/// `Success` means the solver ran to completion; the solution status still
/// says whether the result is optimal, infeasible and so on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    Success,
    /// Initial basis is invalid.
    BadBasis,
    /// Basis matrix is singular.
    Singular,
    /// Basis matrix is ill-conditioned.
    IllConditioned,
    /// Inconsistent bounds on some variable.
    Bound,
    /// Solver failure not covered by another code.
    Fault,
    /// Objective lower limit reached.
    ObjLowerLimit,
    /// Objective upper limit reached.
    ObjUpperLimit,
    IterationLimit,
    TimeLimit,
    /// Presolver found no primal feasible solution.
    NoPrimalFeasible,
    /// Presolver found no dual feasible solution.
    NoDualFeasible,
    /// Root relaxation has no optimal basis.
    Root,
    /// Search stopped on request.
    Stop,
    /// Interior point did not converge.
    NoConvergence,
    /// Numerical instability.
    Instability,
    /// Relative MIP gap tolerance reached.
    MipGap,
}

impl Outcome {
    pub fn is_success(self) -> bool {
        matches!(self, Outcome::Success)
    }

    /// True for failures that leave the stored solution untouched.
    pub fn is_basis_failure(self) -> bool {
        matches!(
            self,
            Outcome::BadBasis
                | Outcome::Singular
                | Outcome::IllConditioned
                | Outcome::Bound
                | Outcome::Fault
        )
    }

    /// Short code; `None` for success.
    pub fn code(self) -> Option<&'static str> {
        let code = match self {
            Outcome::Success => return None,
            Outcome::BadBasis => "badb",
            Outcome::Singular => "sing",
            Outcome::IllConditioned => "cond",
            Outcome::Bound => "bound",
            Outcome::Fault => "fail",
            Outcome::ObjLowerLimit => "objll",
            Outcome::ObjUpperLimit => "objul",
            Outcome::IterationLimit => "itlim",
            Outcome::TimeLimit => "tmlim",
            Outcome::NoPrimalFeasible => "nopfs",
            Outcome::NoDualFeasible => "nodfs",
            Outcome::Root => "root",
            Outcome::Stop => "stop",
            Outcome::NoConvergence => "nocvg",
            Outcome::Instability => "instab",
            Outcome::MipGap => "mipgap",
        };
        Some(code)
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code().unwrap_or("none"))
    }
}

/// Status of a basic, interior-point or MIP solution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SolStatus {
    #[default]
    Undefined,
    Optimal,
    Feasible,
    Infeasible,
    NoFeasible,
    Unbounded,
}

impl SolStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SolStatus::Undefined => "undef",
            SolStatus::Optimal => "opt",
            SolStatus::Feasible => "feas",
            SolStatus::Infeasible => "infeas",
            SolStatus::NoFeasible => "nofeas",
            SolStatus::Unbounded => "unbnd",
        }
    }

    pub fn is_defined(self) -> bool {
        !matches!(self, SolStatus::Undefined)
    }
}

impl std::fmt::Display for SolStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Basis status of a row or column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum VarStatus {
    /// Basic.
    #[default]
    Basic,
    /// Non-basic on its lower bound.
    Lower,
    /// Non-basic on its upper bound.
    Upper,
    /// Non-basic free.
    Free,
    /// Non-basic fixed.
    Fixed,
}

impl VarStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            VarStatus::Basic => "bs",
            VarStatus::Lower => "nl",
            VarStatus::Upper => "nu",
            VarStatus::Free => "nf",
            VarStatus::Fixed => "ns",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "bs" => Some(VarStatus::Basic),
            "nl" => Some(VarStatus::Lower),
            "nu" => Some(VarStatus::Upper),
            "nf" => Some(VarStatus::Free),
            "ns" => Some(VarStatus::Fixed),
            _ => None,
        }
    }
}

impl std::fmt::Display for VarStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_codes() {
        assert_eq!(Outcome::Success.code(), None);
        assert_eq!(Outcome::Stop.code(), Some("stop"));
        assert_eq!(Outcome::ObjUpperLimit.code(), Some("objul"));
        assert_eq!(Outcome::MipGap.to_string(), "mipgap");
        assert_eq!(Outcome::Success.to_string(), "none");
    }

    #[test]
    fn test_outcome_basis_failure() {
        assert!(Outcome::Singular.is_basis_failure());
        assert!(Outcome::Fault.is_basis_failure());
        assert!(!Outcome::TimeLimit.is_basis_failure());
        assert!(!Outcome::Success.is_basis_failure());
    }

    #[test]
    fn test_var_status_round_trip_codes() {
        for stat in [
            VarStatus::Basic,
            VarStatus::Lower,
            VarStatus::Upper,
            VarStatus::Free,
            VarStatus::Fixed,
        ] {
            assert_eq!(VarStatus::from_code(stat.as_str()), Some(stat));
        }
        assert_eq!(VarStatus::from_code("xx"), None);
    }

    #[test]
    fn test_sol_status_strings() {
        assert_eq!(SolStatus::default().as_str(), "undef");
        assert_eq!(SolStatus::Unbounded.as_str(), "unbnd");
        assert!(!SolStatus::Undefined.is_defined());
        assert!(SolStatus::NoFeasible.is_defined());
    }
}
