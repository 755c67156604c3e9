//! Procedural LP/MIP engine addressed by 1-based row and column numbers
//!
//! This crate stores problem data, runs LP relaxations through HiGHS and
//! drives a branch-and-bound search that reports its decision points to a
//! callback. It reads and writes MPS, CPLEX LP (write only) and a native JSON
//! format.

mod highs;

pub mod basis;
pub mod error;
pub mod io;
pub mod ios;
pub mod kkt;
pub mod params;
pub mod problem;
pub mod simplex;
pub mod status;
pub mod term;

pub use basis::warm_up;
pub use error::EngineError;
pub use highs::highs_version;
pub use ios::{BranchDir, IosCallback, IosHandle, Reason, intopt};
pub use kkt::{KktCond, KktReport, SolKind, check_kkt};
pub use params::{
    BacktrackTech, BranchTech, IntoptParams, MsgLevel, Pricing, PreprocessTech, RatioTest,
    ScaleFlags, SimplexMethod, SimplexParams,
};
pub use problem::{BoundType, ColKind, Direction, NativeProblem, ProbHandle, create_prob};
pub use simplex::{exact, interior, simplex};
pub use status::{Outcome, SolStatus, VarStatus};

/// Version string of this engine.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
