//! Object model over the lpbind LP/MIP engine
//!
//! A [`Problem`] owns an engine instance and hands out views: row and column
//! [`BarCollection`]s addressed by 0-based index, name, slice or lists of
//! those, the [`Objective`], and [`Bar`] proxies for single rows and columns.
//! Solvers return an [`Outcome`] instead of failing; the integer solver can
//! report its branch-and-bound decision points to a [`Callback`] through a
//! short-lived [`SearchTree`].

pub mod bar;
pub mod callback;
pub mod collection;
pub mod env;
pub mod error;
pub mod key;
pub mod kkt;
pub mod logging;
pub mod objective;
pub mod options;
pub mod problem;
pub mod source;
pub mod tree;
pub mod write;

pub use bar::{Bar, BarKind, Bounds, VarKind, parse_status};
pub use callback::{Callback, Handlers, Phase};
pub use collection::{BarCollection, BarIter};
pub use error::{Error, Result};
pub use key::{Key, Slice};
pub use kkt::{Condition, Kkt, Quality};
pub use logging::init_logging;
pub use objective::{Assign, Objective, ObjectiveIter};
pub use options::{IntegerOptions, SimplexOptions};
pub use problem::{MAX_NAME_LEN, Problem, ProblemKind, SolverKind};
pub use source::{MathProgSource, Source, SourceSpec};
pub use tree::{ActiveNodes, BranchDirection, SearchTree, TreeNode};
pub use write::WriteOptions;

pub use lpbind_engine::{
    BacktrackTech, BranchTech, MsgLevel, Outcome, PreprocessTech, Pricing, RatioTest,
    ScaleFlags, SimplexMethod, SolStatus, VarStatus,
};
