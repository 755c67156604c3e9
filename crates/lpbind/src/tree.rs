//! Transient view of an in-progress branch-and-bound search.

use crate::callback::Phase;
use crate::error::{Error, Result};
use crate::problem::Problem;
use lpbind_engine::{BranchDir, IosHandle};
use serde::{Deserialize, Serialize};
use std::cell::{Cell, RefCell};
use std::cmp::Ordering;
use std::fmt;
use std::rc::{Rc, Weak};

/// Which child a branching explores first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BranchDirection {
    Down,
    Up,
    /// Let the solver pick.
    #[default]
    NoPreference,
}

impl From<BranchDirection> for BranchDir {
    fn from(dir: BranchDirection) -> Self {
        match dir {
            BranchDirection::Down => BranchDir::Down,
            BranchDirection::Up => BranchDir::Up,
            BranchDirection::NoPreference => BranchDir::NoPreference,
        }
    }
}

struct TreeInner {
    native: RefCell<Option<IosHandle>>,
    problem: Problem,
    selected: Cell<bool>,
    generation: u64,
}

impl TreeInner {
    fn handle(&self) -> Result<IosHandle> {
        self.native.borrow().clone().ok_or(Error::TreeInvalid)
    }
}

/// The search tree as seen from inside one callback invocation.
///
/// Every method fails with [`Error::TreeInvalid`] once the callback has
/// returned. Subproblems are exposed as [`TreeNode`] handles and columns by
/// 0-based index.
#[derive(Clone)]
pub struct SearchTree {
    inner: Rc<TreeInner>,
}

impl SearchTree {
    pub(crate) fn new(handle: IosHandle, problem: Problem, generation: u64) -> Self {
        Self {
            inner: Rc::new(TreeInner {
                native: RefCell::new(Some(handle)),
                problem,
                selected: Cell::new(false),
                generation,
            }),
        }
    }

    pub(crate) fn invalidate(&self) {
        self.inner.native.borrow_mut().take();
    }

    /// Identifier distinguishing this tree from every other one built
    /// during the process. Later trees have larger identifiers.
    pub fn generation(&self) -> u64 {
        self.inner.generation
    }

    pub fn is_valid(&self) -> bool {
        self.inner.native.borrow().is_some()
    }

    fn handle(&self) -> Result<IosHandle> {
        self.inner.handle()
    }

    fn in_phase(&self, phase: Phase) -> Result<IosHandle> {
        let handle = self.handle()?;
        match handle.reason().map(Phase::from) {
            Some(p) if p == phase => Ok(handle),
            _ => Err(Error::WrongPhase(phase)),
        }
    }

    fn node(&self, subproblem: usize, active: bool) -> Option<TreeNode> {
        (subproblem != 0).then(|| TreeNode {
            tree: Rc::downgrade(&self.inner),
            generation: self.inner.generation,
            subproblem,
            active,
        })
    }

    /// Phase the callback was invoked for.
    pub fn reason(&self) -> Result<Phase> {
        self.handle()?.reason().map(Phase::from).ok_or(Error::TreeInvalid)
    }

    /// The problem the search works on. With presolve on, this is the
    /// presolved copy rather than the caller's problem.
    pub fn problem(&self) -> Result<Problem> {
        self.handle()?;
        Ok(self.inner.problem.clone())
    }

    /// Stop the search at the next decision point.
    pub fn terminate(&self) -> Result<()> {
        self.handle()?.terminate();
        Ok(())
    }

    /// Choose the next subproblem. Only during select, and only once.
    pub fn select(&self, node: &TreeNode) -> Result<()> {
        let handle = self.in_phase(Phase::Select)?;
        if self.inner.selected.get() {
            return Err(Error::AlreadySelected);
        }
        if node.generation != self.inner.generation {
            return Err(Error::ForeignNode);
        }
        if !node.active {
            return Err(Error::InactiveNode);
        }
        handle
            .select_node(node.subproblem)
            .map_err(|_| Error::InactiveNode)?;
        self.inner.selected.set(true);
        Ok(())
    }

    fn branch_column(&self, col: usize) -> Result<(IosHandle, usize)> {
        let handle = self.in_phase(Phase::Branch)?;
        let count = handle.problem().borrow().num_cols();
        if col >= count {
            return Err(Error::ColumnOutOfBound { index: col, count });
        }
        Ok((handle, col + 1))
    }

    /// Whether column `col` may be branched upon. Only during branch.
    pub fn can_branch(&self, col: usize) -> Result<bool> {
        let (handle, j) = self.branch_column(col)?;
        Ok(handle.can_branch(j)?)
    }

    /// Branch on column `col`. Only during branch.
    pub fn branch_upon(&self, col: usize, direction: BranchDirection) -> Result<()> {
        let (handle, j) = self.branch_column(col)?;
        if !handle.can_branch(j)? {
            return Err(Error::CannotBranch);
        }
        handle.branch_upon(j, direction.into())?;
        Ok(())
    }

    /// Offer an integer feasible point, one value per column. Returns
    /// whether it became the new incumbent. Only during heur.
    pub fn heuristic(&self, x: &[f64]) -> Result<bool> {
        let handle = self.in_phase(Phase::Heur)?;
        let expected = handle.problem().borrow().num_cols();
        if x.len() != expected {
            return Err(Error::LengthMismatch {
                expected,
                found: x.len(),
            });
        }
        Ok(handle.heur_sol(x)?)
    }

    /// Number of active subproblems.
    pub fn num_active(&self) -> Result<usize> {
        Ok(self.handle()?.tree_size().0)
    }

    /// Number of subproblems in the tree, active or not.
    pub fn num_all(&self) -> Result<usize> {
        Ok(self.handle()?.tree_size().1)
    }

    /// Number of subproblems created since the search began.
    pub fn num_total(&self) -> Result<usize> {
        Ok(self.handle()?.tree_size().2)
    }

    /// Subproblem being solved; none during select.
    pub fn curr_node(&self) -> Result<Option<TreeNode>> {
        let p = self.handle()?.curr_node();
        Ok(self.node(p, true))
    }

    /// Active subproblem with the best local bound.
    pub fn best_node(&self) -> Result<Option<TreeNode>> {
        let p = self.handle()?.best_node();
        Ok(self.node(p, true))
    }

    pub fn first_node(&self) -> Result<Option<TreeNode>> {
        let p = self.handle()?.next_node(0)?;
        Ok(self.node(p, true))
    }

    pub fn last_node(&self) -> Result<Option<TreeNode>> {
        let p = self.handle()?.prev_node(0)?;
        Ok(self.node(p, true))
    }

    /// Relative gap between the incumbent and the best local bound.
    pub fn gap(&self) -> Result<f64> {
        Ok(self.handle()?.mip_gap())
    }

    /// Iterate over the active subproblems, first to last.
    pub fn active_nodes(&self) -> ActiveNodes {
        ActiveNodes {
            tree: self.clone(),
            last: 0,
            done: false,
        }
    }
}

impl PartialEq for SearchTree {
    fn eq(&self, other: &Self) -> bool {
        self.inner.generation == other.inner.generation
    }
}

impl PartialOrd for SearchTree {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.inner.generation.cmp(&other.inner.generation))
    }
}

impl fmt::Display for SearchTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SearchTree {}", self.inner.generation)
    }
}

impl fmt::Debug for SearchTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchTree")
            .field("generation", &self.inner.generation)
            .field("valid", &self.is_valid())
            .finish()
    }
}

/// Iterator over the active list. Yields an error and stops if the tree is
/// invalidated mid-walk.
pub struct ActiveNodes {
    tree: SearchTree,
    last: usize,
    done: bool,
}

impl Iterator for ActiveNodes {
    type Item = Result<TreeNode>;

    fn next(&mut self) -> Option<Result<TreeNode>> {
        if self.done {
            return None;
        }
        let step = self
            .tree
            .handle()
            .and_then(|h| h.next_node(self.last).map_err(Error::from));
        match step {
            Ok(0) => {
                self.done = true;
                None
            }
            Ok(p) => {
                self.last = p;
                self.tree.node(p, true).map(Ok)
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}

/// Handle for one subproblem of a [`SearchTree`].
#[derive(Clone)]
pub struct TreeNode {
    tree: Weak<TreeInner>,
    generation: u64,
    subproblem: usize,
    active: bool,
}

impl TreeNode {
    fn context(&self) -> Result<(Rc<TreeInner>, IosHandle)> {
        let inner = self.tree.upgrade().ok_or(Error::TreeInvalid)?;
        let handle = inner.handle()?;
        Ok((inner, handle))
    }

    fn sibling(inner: &Rc<TreeInner>, subproblem: usize, active: bool) -> Option<TreeNode> {
        (subproblem != 0).then(|| TreeNode {
            tree: Rc::downgrade(inner),
            generation: inner.generation,
            subproblem,
            active,
        })
    }

    /// Engine identifier of the subproblem.
    pub fn subproblem(&self) -> usize {
        self.subproblem
    }

    /// Identifier of the tree this node came from.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Parent subproblem; none at the root. Parents are never active.
    pub fn up(&self) -> Result<Option<TreeNode>> {
        let (inner, handle) = self.context()?;
        let p = handle.up_node(self.subproblem)?;
        Ok(Self::sibling(&inner, p, false))
    }

    /// Next active subproblem; none at the end or for an inactive node.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&self) -> Result<Option<TreeNode>> {
        let (inner, handle) = self.context()?;
        if !self.active {
            return Ok(None);
        }
        let p = handle.next_node(self.subproblem)?;
        Ok(Self::sibling(&inner, p, true))
    }

    /// Previous active subproblem; none at the start or for an inactive node.
    pub fn prev(&self) -> Result<Option<TreeNode>> {
        let (inner, handle) = self.context()?;
        if !self.active {
            return Ok(None);
        }
        let p = handle.prev_node(self.subproblem)?;
        Ok(Self::sibling(&inner, p, true))
    }

    /// Depth in the tree; the root is level 0.
    pub fn level(&self) -> Result<usize> {
        let (_, handle) = self.context()?;
        Ok(handle.node_level(self.subproblem)?)
    }

    /// Local bound of the subproblem's relaxation.
    pub fn bound(&self) -> Result<f64> {
        let (_, handle) = self.context()?;
        Ok(handle.node_bound(self.subproblem)?)
    }

    /// Whether the node was active when this handle was made.
    pub fn is_active(&self) -> Result<bool> {
        self.context()?;
        Ok(self.active)
    }
}

impl PartialEq for TreeNode {
    fn eq(&self, other: &Self) -> bool {
        self.generation == other.generation && self.subproblem == other.subproblem
    }
}

impl Eq for TreeNode {}

impl PartialOrd for TreeNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TreeNode {
    /// Nodes of one tree order by subproblem; nodes of different trees
    /// order as their trees do.
    fn cmp(&self, other: &Self) -> Ordering {
        self.generation
            .cmp(&other.generation)
            .then(self.subproblem.cmp(&other.subproblem))
    }
}

impl fmt::Display for TreeNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "TreeNode, {} subprob {} of SearchTree {}",
            if self.active { "active" } else { "inactive" },
            self.subproblem,
            self.generation
        )
    }
}

impl fmt::Debug for TreeNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TreeNode")
            .field("generation", &self.generation)
            .field("subproblem", &self.subproblem)
            .field("active", &self.active)
            .finish()
    }
}
