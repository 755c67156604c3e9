//! Branch-and-bound callbacks.
//!
//! The integer solver stops at seven decision points. At each one the
//! registered [`Callback`] receives a fresh [`SearchTree`] that is
//! invalidated as soon as the handler returns.

use crate::error::{Error, Result};
use crate::problem::Problem;
use crate::tree::SearchTree;
use lpbind_engine::{IosHandle, Reason};
use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::fmt;
use tracing::{trace, warn};

/// Decision point of the branch-and-bound search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Pick the next subproblem.
    Select,
    /// Preprocess the current subproblem.
    Prepro,
    /// Choose a branching column.
    Branch,
    /// Add lazy constraint rows.
    RowGen,
    /// Offer a heuristic solution.
    Heur,
    /// Add cutting planes.
    CutGen,
    /// A better integer solution was found.
    Bingo,
}

impl Phase {
    pub const ALL: [Phase; 7] = [
        Phase::Select,
        Phase::Prepro,
        Phase::Branch,
        Phase::RowGen,
        Phase::Heur,
        Phase::CutGen,
        Phase::Bingo,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Select => "select",
            Phase::Prepro => "prepro",
            Phase::Branch => "branch",
            Phase::RowGen => "rowgen",
            Phase::Heur => "heur",
            Phase::CutGen => "cutgen",
            Phase::Bingo => "bingo",
        }
    }

    fn bit(self) -> u8 {
        1 << (self as u8)
    }
}

impl From<Reason> for Phase {
    fn from(reason: Reason) -> Self {
        match reason {
            Reason::Select => Phase::Select,
            Reason::Prepro => Phase::Prepro,
            Reason::Branch => Phase::Branch,
            Reason::RowGen => Phase::RowGen,
            Reason::Heur => Phase::Heur,
            Reason::CutGen => Phase::CutGen,
            Reason::Bingo => Phase::Bingo,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Set of handlers a callback provides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Handlers(u8);

impl Handlers {
    const DEFAULT_BIT: u8 = 1 << 7;

    /// No handlers: every phase is skipped.
    pub const NONE: Handlers = Handlers(0);
    /// Every phase method, plus `default`.
    pub const ALL: Handlers = Handlers(0xff);
    /// Only `default`, which then receives every phase.
    pub const DEFAULT_ONLY: Handlers = Handlers(Self::DEFAULT_BIT);

    pub fn with(self, phase: Phase) -> Self {
        Handlers(self.0 | phase.bit())
    }

    pub fn with_default(self) -> Self {
        Handlers(self.0 | Self::DEFAULT_BIT)
    }

    pub fn handles(self, phase: Phase) -> bool {
        self.0 & phase.bit() != 0
    }

    pub fn has_default(self) -> bool {
        self.0 & Self::DEFAULT_BIT != 0
    }
}

impl FromIterator<Phase> for Handlers {
    fn from_iter<I: IntoIterator<Item = Phase>>(iter: I) -> Self {
        iter.into_iter().fold(Handlers::NONE, Handlers::with)
    }
}

/// Receiver of branch-and-bound decision points.
///
/// `handlers` is read once when the search starts. A phase listed there goes
/// to its method; otherwise it goes to `default` if that is listed, and is
/// skipped if not. Unoverridden phase methods forward to `default`.
///
/// Returning an error stops the search; `integer` then returns that error.
pub trait Callback {
    fn handlers(&self) -> Handlers {
        Handlers::ALL
    }

    fn select(&mut self, tree: &SearchTree) -> Result<()> {
        self.default(tree)
    }

    fn prepro(&mut self, tree: &SearchTree) -> Result<()> {
        self.default(tree)
    }

    fn branch(&mut self, tree: &SearchTree) -> Result<()> {
        self.default(tree)
    }

    fn rowgen(&mut self, tree: &SearchTree) -> Result<()> {
        self.default(tree)
    }

    fn heur(&mut self, tree: &SearchTree) -> Result<()> {
        self.default(tree)
    }

    fn cutgen(&mut self, tree: &SearchTree) -> Result<()> {
        self.default(tree)
    }

    fn bingo(&mut self, tree: &SearchTree) -> Result<()> {
        self.default(tree)
    }

    fn default(&mut self, tree: &SearchTree) -> Result<()> {
        let _ = tree;
        Ok(())
    }
}

/// A closure is a callback that receives every phase.
impl<F> Callback for F
where
    F: FnMut(&SearchTree) -> Result<()>,
{
    fn handlers(&self) -> Handlers {
        Handlers::DEFAULT_ONLY
    }

    fn default(&mut self, tree: &SearchTree) -> Result<()> {
        self(tree)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Route {
    Method(Phase),
    Default,
    Skip,
}

fn routes(handlers: Handlers) -> [Route; 7] {
    Phase::ALL.map(|phase| {
        if handlers.handles(phase) {
            Route::Method(phase)
        } else if handlers.has_default() {
            Route::Default
        } else {
            Route::Skip
        }
    })
}

thread_local! {
    static NEXT_GENERATION: Cell<u64> = const { Cell::new(1) };
}

fn next_generation() -> u64 {
    NEXT_GENERATION.with(|g| {
        let id = g.get();
        g.set(id + 1);
        id
    })
}

/// Connects the engine's decision points to a [`Callback`].
pub(crate) struct Bridge<'a> {
    problem: Problem,
    intermediate: Option<Problem>,
    callback: &'a mut dyn Callback,
    routes: [Route; 7],
    error: Option<Error>,
}

impl<'a> Bridge<'a> {
    pub(crate) fn new(problem: Problem, callback: &'a mut dyn Callback) -> Self {
        let routes = routes(callback.handlers());
        Self {
            problem,
            intermediate: None,
            callback,
            routes,
            error: None,
        }
    }

    pub(crate) fn take_error(&mut self) -> Option<Error> {
        self.error.take()
    }

    /// The problem the engine is working on: the caller's own, or a wrapper
    /// around the presolved copy, reused for the whole search.
    fn working_problem(&mut self, handle: &IosHandle) -> Problem {
        let native = handle.problem();
        if self.problem.shares_native(&native) {
            return self.problem.clone();
        }
        match &self.intermediate {
            Some(p) if p.shares_native(&native) => p.clone(),
            _ => {
                let p = Problem::from_native(native);
                self.intermediate = Some(p.clone());
                p
            }
        }
    }

    pub(crate) fn dispatch(&mut self, handle: &IosHandle) {
        let Some(reason) = handle.reason() else {
            return;
        };
        if self.error.is_some() {
            handle.terminate();
            return;
        }
        let phase = Phase::from(reason);
        let route = self.routes[phase as usize];
        if route == Route::Skip {
            return;
        }

        let tree = SearchTree::new(
            handle.clone(),
            self.working_problem(handle),
            next_generation(),
        );
        trace!(
            component = "binding",
            operation = "callback",
            phase = phase.as_str(),
            generation = tree.generation(),
            "Dispatching search callback"
        );
        let result = match route {
            Route::Method(Phase::Select) => self.callback.select(&tree),
            Route::Method(Phase::Prepro) => self.callback.prepro(&tree),
            Route::Method(Phase::Branch) => self.callback.branch(&tree),
            Route::Method(Phase::RowGen) => self.callback.rowgen(&tree),
            Route::Method(Phase::Heur) => self.callback.heur(&tree),
            Route::Method(Phase::CutGen) => self.callback.cutgen(&tree),
            Route::Method(Phase::Bingo) => self.callback.bingo(&tree),
            Route::Default => self.callback.default(&tree),
            Route::Skip => Ok(()),
        };
        tree.invalidate();

        if let Err(err) = result {
            warn!(
                component = "binding",
                operation = "callback",
                status = "error",
                phase = phase.as_str(),
                code = err.code(),
                "Search callback failed; terminating search"
            );
            handle.terminate();
            self.error = Some(err);
        }
    }
}
