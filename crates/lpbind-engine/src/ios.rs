//! Branch-and-bound driver with decision-point callbacks.
//!
//! The driver walks a search tree of LP relaxations solved by HiGHS. At each
//! decision point it hands an [`IosHandle`] to the caller-supplied callback;
//! the handle exposes tree queries and the control primitives (node
//! selection, branching, heuristic solutions, termination).
//!
//! Subproblems are numbered from 1 in creation order; 0 means "none".
//! No borrow of the tree state or of the problem is held while the callback
//! runs.

use crate::error::EngineError;
use crate::highs::{HighsLp, HighsOption, LpStatus};
use crate::params::{BacktrackTech, BranchTech, IntoptParams, MsgLevel, PreprocessTech};
use crate::problem::{ColKind, Direction, NativeProblem, ProbHandle};
use crate::status::{Outcome, SolStatus};
use crate::term;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;
use std::time::{Duration, Instant};
use tracing::{debug, trace, warn};

const HEUR_FEAS_TOL: f64 = 1e-6;

/// Decision point at which the callback is invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Reason {
    /// Pick the next subproblem to explore.
    Select,
    /// Preprocess the current subproblem.
    Prepro,
    /// Add lazy constraints to the current subproblem.
    RowGen,
    /// Offer a heuristic solution.
    Heur,
    /// Add cutting planes.
    CutGen,
    /// Pick the branching variable.
    Branch,
    /// A better integer feasible solution was found.
    Bingo,
}

impl Reason {
    pub fn as_str(self) -> &'static str {
        match self {
            Reason::Select => "select",
            Reason::Prepro => "prepro",
            Reason::RowGen => "rowgen",
            Reason::Heur => "heur",
            Reason::CutGen => "cutgen",
            Reason::Branch => "branch",
            Reason::Bingo => "bingo",
        }
    }
}

impl std::fmt::Display for Reason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Which child of a branching to explore next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchDir {
    Down,
    Up,
    NoPreference,
}

#[derive(Debug, Clone)]
struct Node {
    parent: usize,
    level: usize,
    bound: f64,
    /// Column bound change relative to the parent: `(col, lower, upper)`.
    change: Option<(usize, f64, f64)>,
    active: bool,
    children: usize,
}

#[derive(Debug)]
struct IosState {
    prob: ProbHandle,
    parm: IntoptParams,
    dir: Direction,
    num_cols: usize,
    reason: Option<Reason>,
    nodes: BTreeMap<usize, Node>,
    active: Vec<usize>,
    next_id: usize,
    curr: usize,
    next_p: usize,
    branch: Option<(usize, BranchDir)>,
    stop: bool,
    incumbent: Option<Vec<f64>>,
    mip_obj: f64,
    relax_x: Vec<f64>,
    non_int: Vec<bool>,
}

impl IosState {
    fn node(&self, p: usize) -> Result<&Node, EngineError> {
        self.nodes.get(&p).ok_or(EngineError::UnknownNode(p))
    }

    fn worst_bound(&self) -> f64 {
        match self.dir {
            Direction::Minimize => f64::NEG_INFINITY,
            Direction::Maximize => f64::INFINITY,
        }
    }

    fn is_better(&self, a: f64, b: f64) -> bool {
        match self.dir {
            Direction::Minimize => a < b,
            Direction::Maximize => a > b,
        }
    }

    /// True when a solution or bound of value `value` could still beat the
    /// incumbent.
    fn improves(&self, value: f64) -> bool {
        if self.incumbent.is_none() {
            return true;
        }
        let eps = self.parm.tol_obj * (1.0 + self.mip_obj.abs());
        match self.dir {
            Direction::Minimize => value < self.mip_obj - eps,
            Direction::Maximize => value > self.mip_obj + eps,
        }
    }

    fn best_node(&self) -> usize {
        let mut best = 0;
        for &p in &self.active {
            let bound = self.nodes[&p].bound;
            if best == 0 || self.is_better(bound, self.nodes[&best].bound) {
                best = p;
            }
        }
        best
    }

    fn mip_gap(&self) -> f64 {
        if self.incumbent.is_none() {
            return f64::MAX;
        }
        let best = self.best_node();
        if best == 0 {
            return 0.0;
        }
        let bound = self.nodes[&best].bound;
        (self.mip_obj - bound).abs() / (self.mip_obj.abs() + f64::EPSILON)
    }

    fn add_node(&mut self, parent: usize, bound: f64, change: Option<(usize, f64, f64)>) -> usize {
        let p = self.next_id;
        self.next_id += 1;
        let level = match self.nodes.get_mut(&parent) {
            Some(up) => {
                up.children += 1;
                up.level + 1
            }
            None => 0,
        };
        self.nodes.insert(
            p,
            Node {
                parent,
                level,
                bound,
                change,
                active: true,
                children: 0,
            },
        );
        self.active.push(p);
        p
    }

    /// Remove `p` from the active list and drop every ancestor left with no
    /// descendants.
    fn fathom(&mut self, p: usize) {
        self.active.retain(|&q| q != p);
        let mut q = p;
        loop {
            let Some(node) = self.nodes.get(&q) else {
                break;
            };
            if (node.active && q != p) || node.children > 0 {
                break;
            }
            let parent = node.parent;
            self.nodes.remove(&q);
            let Some(up) = self.nodes.get_mut(&parent) else {
                break;
            };
            up.children -= 1;
            q = parent;
        }
        if self.curr == p {
            self.curr = 0;
        }
    }

    /// Drop every active subproblem other than the current one whose bound
    /// cannot beat the incumbent.
    fn prune_dominated(&mut self) {
        let doomed: Vec<usize> = self
            .active
            .iter()
            .copied()
            .filter(|&p| p != self.curr && !self.improves(self.nodes[&p].bound))
            .collect();
        for p in doomed {
            self.fathom(p);
        }
    }

    /// Column bounds in effect for subproblem `p`.
    fn node_bounds(&self, p: usize, prob: &NativeProblem) -> Vec<(f64, f64)> {
        let mut bounds: Vec<(f64, f64)> = prob
            .cols
            .iter()
            .map(|c| (c.entity.lower, c.entity.upper))
            .collect();
        let mut chain = Vec::new();
        let mut q = p;
        while let Some(node) = self.nodes.get(&q) {
            if let Some(change) = node.change {
                chain.push(change);
            }
            q = node.parent;
        }
        for (j, lower, upper) in chain.into_iter().rev() {
            let slot = &mut bounds[j - 1];
            slot.0 = slot.0.max(lower);
            slot.1 = slot.1.min(upper);
        }
        let round = match self.parm.pp_tech {
            PreprocessTech::None => false,
            PreprocessTech::Root => p == 1,
            PreprocessTech::All => true,
        };
        if round {
            let tol = self.parm.tol_int;
            for (slot, col) in bounds.iter_mut().zip(&prob.cols) {
                if col.kind == ColKind::Integer {
                    slot.0 = (slot.0 - tol).ceil();
                    slot.1 = (slot.1 + tol).floor();
                }
            }
        }
        bounds
    }

    fn choose_node(&self) -> usize {
        match self.parm.bt_tech {
            BacktrackTech::DepthFirst => self.active.last().copied().unwrap_or(0),
            BacktrackTech::BreadthFirst => self.active.first().copied().unwrap_or(0),
            BacktrackTech::BestLocalBound => self.best_node(),
            BacktrackTech::BestProjection if self.incumbent.is_none() => {
                self.active.last().copied().unwrap_or(0)
            }
            BacktrackTech::BestProjection => self.best_node(),
        }
    }

    /// Branching column (1-based) and preferred child per the branching rule.
    fn choose_branch(&self) -> Option<(usize, BranchDir)> {
        let mut fractional = self
            .non_int
            .iter()
            .enumerate()
            .filter(|(_, f)| **f)
            .map(|(k, _)| k + 1);
        let j = match self.parm.br_tech {
            BranchTech::FirstFractional => fractional.next(),
            BranchTech::LastFractional => fractional.last(),
            BranchTech::MostFractional
            | BranchTech::DriebeckTomlin
            | BranchTech::PseudoCost => fractional.max_by(|&a, &b| {
                let fa = fractionality(self.relax_x[a - 1]);
                let fb = fractionality(self.relax_x[b - 1]);
                fa.total_cmp(&fb).then(b.cmp(&a))
            }),
        }?;
        let x = self.relax_x[j - 1];
        let dir = if x - x.floor() < x.ceil() - x {
            BranchDir::Down
        } else {
            BranchDir::Up
        };
        Some((j, dir))
    }
}

fn fractionality(x: f64) -> f64 {
    let frac = x - x.floor();
    frac.min(1.0 - frac)
}

/// Handle to the in-progress search, valid while the driver runs.
#[derive(Debug, Clone)]
pub struct IosHandle {
    state: Rc<RefCell<IosState>>,
}

impl IosHandle {
    /// Current decision point; `None` outside a callback.
    pub fn reason(&self) -> Option<Reason> {
        self.state.borrow().reason
    }

    /// The problem being solved, which is a presolved copy when presolve is on.
    pub fn problem(&self) -> ProbHandle {
        Rc::clone(&self.state.borrow().prob)
    }

    /// Ask the driver to stop at the next decision point.
    pub fn terminate(&self) {
        self.state.borrow_mut().stop = true;
    }

    /// Active, current-tree and total-ever-created subproblem counts.
    pub fn tree_size(&self) -> (usize, usize, usize) {
        let st = self.state.borrow();
        (st.active.len(), st.nodes.len(), st.next_id - 1)
    }

    pub fn curr_node(&self) -> usize {
        self.state.borrow().curr
    }

    /// Active subproblem after `p`, or the first one for `p == 0`.
    /// Returns 0 at the end of the list or when `p` is not active.
    pub fn next_node(&self, p: usize) -> Result<usize, EngineError> {
        let st = self.state.borrow();
        if p == 0 {
            return Ok(st.active.first().copied().unwrap_or(0));
        }
        st.node(p)?;
        Ok(match st.active.iter().position(|&q| q == p) {
            Some(k) => st.active.get(k + 1).copied().unwrap_or(0),
            None => 0,
        })
    }

    /// Active subproblem before `p`, or the last one for `p == 0`.
    pub fn prev_node(&self, p: usize) -> Result<usize, EngineError> {
        let st = self.state.borrow();
        if p == 0 {
            return Ok(st.active.last().copied().unwrap_or(0));
        }
        st.node(p)?;
        Ok(match st.active.iter().position(|&q| q == p) {
            Some(k) if k > 0 => st.active[k - 1],
            _ => 0,
        })
    }

    pub fn up_node(&self, p: usize) -> Result<usize, EngineError> {
        Ok(self.state.borrow().node(p)?.parent)
    }

    pub fn node_level(&self, p: usize) -> Result<usize, EngineError> {
        Ok(self.state.borrow().node(p)?.level)
    }

    pub fn node_bound(&self, p: usize) -> Result<f64, EngineError> {
        Ok(self.state.borrow().node(p)?.bound)
    }

    pub fn node_active(&self, p: usize) -> Result<bool, EngineError> {
        Ok(self.state.borrow().node(p)?.active)
    }

    /// Active subproblem with the best local bound, 0 if none.
    pub fn best_node(&self) -> usize {
        self.state.borrow().best_node()
    }

    /// Relative gap between the incumbent and the best bound; `f64::MAX`
    /// while no integer solution is known.
    pub fn mip_gap(&self) -> f64 {
        self.state.borrow().mip_gap()
    }

    /// Choose the subproblem to explore next; meaningful during `Select`.
    pub fn select_node(&self, p: usize) -> Result<(), EngineError> {
        let mut st = self.state.borrow_mut();
        if !st.node(p)?.active {
            return Err(EngineError::UnknownNode(p));
        }
        st.next_p = p;
        Ok(())
    }

    /// True if column `j` (1-based) is integer and fractional in the current
    /// relaxation.
    pub fn can_branch(&self, j: usize) -> Result<bool, EngineError> {
        let st = self.state.borrow();
        if j == 0 || j > st.num_cols {
            return Err(EngineError::ColOutOfRange {
                col: j,
                count: st.num_cols,
            });
        }
        Ok(st.non_int.get(j - 1).copied().unwrap_or(false))
    }

    /// Branch on column `j` (1-based); meaningful during `Branch`.
    pub fn branch_upon(&self, j: usize, dir: BranchDir) -> Result<(), EngineError> {
        if !self.can_branch(j)? {
            return Err(EngineError::ColOutOfRange {
                col: j,
                count: self.state.borrow().num_cols,
            });
        }
        self.state.borrow_mut().branch = Some((j, dir));
        Ok(())
    }

    /// Offer an integer feasible solution; returns `true` if it became the
    /// new incumbent.
    pub fn heur_sol(&self, x: &[f64]) -> Result<bool, EngineError> {
        let prob = self.problem();
        let prob = prob.borrow();
        let n = prob.num_cols();
        if x.len() != n {
            return Err(EngineError::ColOutOfRange {
                col: x.len(),
                count: n,
            });
        }
        let tol_int = self.state.borrow().parm.tol_int;
        for (col, &v) in prob.cols.iter().zip(x) {
            let (lo, hi) = (col.entity.lower, col.entity.upper);
            if v < lo - HEUR_FEAS_TOL * (1.0 + lo.abs()) || v > hi + HEUR_FEAS_TOL * (1.0 + hi.abs()) {
                return Ok(false);
            }
            if col.kind == ColKind::Integer && (v - v.round()).abs() > tol_int {
                return Ok(false);
            }
        }
        let act = prob.row_activity(x);
        for (row, v) in prob.rows.iter().zip(act) {
            let (lo, hi) = (row.lower, row.upper);
            if v < lo - HEUR_FEAS_TOL * (1.0 + lo.abs()) || v > hi + HEUR_FEAS_TOL * (1.0 + hi.abs()) {
                return Ok(false);
            }
        }
        let obj = prob.objective_at(x);
        drop(prob);

        let mut st = self.state.borrow_mut();
        if !st.improves(obj) {
            return Ok(false);
        }
        st.incumbent = Some(x.to_vec());
        st.mip_obj = obj;
        st.prune_dominated();
        let prob = Rc::clone(&st.prob);
        drop(st);
        prob.borrow_mut().store_mip(SolStatus::Feasible, x);
        debug!(
            component = "engine",
            operation = "heur_sol",
            status = "success",
            objective = obj,
            "Heuristic solution accepted"
        );
        Ok(true)
    }
}

/// Callback signature invoked at each decision point.
pub type IosCallback<'a> = &'a mut dyn FnMut(&IosHandle);

/// Solve the MIP by branch and bound, storing the result as the MIP solution.
///
/// Without presolve the problem must carry an optimal basic solution of its
/// LP relaxation, otherwise [`Outcome::Root`] is returned.
pub fn intopt(prob: &ProbHandle, parm: &IntoptParams, callback: Option<IosCallback<'_>>) -> Outcome {
    let (num_cols, status) = {
        let p = prob.borrow();
        (p.num_cols(), p.status())
    };
    if num_cols == 0 {
        if parm.msg_lev >= MsgLevel::Err {
            term::print("intopt: problem has no columns");
        }
        return Outcome::Fault;
    }

    let working = if parm.presolve {
        match presolve(&prob.borrow(), parm) {
            Ok(work) => Rc::new(RefCell::new(work)),
            Err(outcome) => {
                prob.borrow_mut().mip.status = SolStatus::NoFeasible;
                if parm.msg_lev >= MsgLevel::On {
                    term::print("PROBLEM HAS NO PRIMAL FEASIBLE SOLUTION");
                }
                return outcome;
            }
        }
    } else {
        if status != SolStatus::Optimal {
            if parm.msg_lev >= MsgLevel::Err {
                term::print("intopt: optimal basis to initial LP relaxation not provided");
            }
            return Outcome::Root;
        }
        Rc::clone(prob)
    };
    let dir = working.borrow().obj_dir();

    let state = IosState {
        prob: Rc::clone(&working),
        parm: parm.clone(),
        dir,
        num_cols,
        reason: None,
        nodes: BTreeMap::new(),
        active: Vec::new(),
        next_id: 1,
        curr: 0,
        next_p: 0,
        branch: None,
        stop: false,
        incumbent: None,
        mip_obj: 0.0,
        relax_x: Vec::new(),
        non_int: vec![false; num_cols],
    };
    let mut driver = Driver {
        tree: IosHandle {
            state: Rc::new(RefCell::new(state)),
        },
        callback,
        started: Instant::now(),
        last_report: None,
    };

    let searched = driver.search();
    driver.show_progress(true);
    let (incumbent, mip_obj, created) = {
        let st = driver.tree.state.borrow();
        (st.incumbent.clone(), st.mip_obj, st.next_id - 1)
    };
    let outcome = match searched {
        Ok(()) => Outcome::Success,
        Err(outcome) => outcome,
    };
    let status = match (&incumbent, outcome) {
        (Some(_), Outcome::Success) => SolStatus::Optimal,
        (Some(_), _) => SolStatus::Feasible,
        (None, Outcome::Success) => SolStatus::NoFeasible,
        (None, _) => SolStatus::Undefined,
    };
    for target in [&working, prob] {
        let mut p = target.borrow_mut();
        match &incumbent {
            Some(x) if p.num_cols() == x.len() => p.store_mip(status, x),
            _ => p.mip.status = status,
        }
        if Rc::ptr_eq(&working, prob) {
            break;
        }
    }

    if parm.msg_lev >= MsgLevel::On {
        let line = match status {
            SolStatus::Optimal => "INTEGER OPTIMAL SOLUTION FOUND".to_string(),
            SolStatus::NoFeasible => "PROBLEM HAS NO INTEGER FEASIBLE SOLUTION".to_string(),
            _ => format!("SEARCH TERMINATED ({outcome})"),
        };
        term::print(&line);
    }
    debug!(
        component = "engine",
        operation = "intopt",
        status = "success",
        outcome = %outcome,
        mip_status = %status,
        mip_obj,
        subproblems = created,
        "Branch and bound finished"
    );
    outcome
}

/// Tighten integer bounds and drop empty rows on a copy of the problem.
fn presolve(prob: &NativeProblem, parm: &IntoptParams) -> Result<NativeProblem, Outcome> {
    let mut work = prob.copy(true);
    for col in &mut work.cols {
        if col.kind == ColKind::Integer {
            col.entity.lower = (col.entity.lower - parm.tol_int).ceil();
            col.entity.upper = (col.entity.upper + parm.tol_int).floor();
            if col.entity.lower > col.entity.upper {
                return Err(Outcome::NoPrimalFeasible);
            }
        }
    }
    let mut empty = Vec::new();
    for i in 1..=work.num_rows() {
        let has_coefs = work.mat_row(i).map(|r| !r.is_empty()).unwrap_or(true);
        if !has_coefs {
            let row = &work.rows[i - 1];
            if row.lower > 0.0 || row.upper < 0.0 {
                return Err(Outcome::NoPrimalFeasible);
            }
            empty.push(i);
        }
    }
    if !empty.is_empty() {
        work.del_rows(&empty).map_err(|_| Outcome::Fault)?;
    }
    trace!(
        component = "engine",
        operation = "presolve",
        status = "success",
        removed_rows = empty.len(),
        num_rows = work.num_rows(),
        "Presolved MIP"
    );
    Ok(work)
}

struct Driver<'a> {
    tree: IosHandle,
    callback: Option<IosCallback<'a>>,
    started: Instant,
    last_report: Option<Instant>,
}

enum Relaxed {
    /// Node solved; carries the relaxation objective.
    Solved(f64),
    /// Node infeasible or dominated by the incumbent.
    Pruned,
}

impl Driver<'_> {
    fn state(&self) -> std::cell::RefMut<'_, IosState> {
        self.tree.state.borrow_mut()
    }

    fn working(&self) -> ProbHandle {
        self.tree.problem()
    }

    /// Run the callback for `reason`, then honour termination and check the
    /// column count is unchanged.
    fn call(&mut self, reason: Reason) -> Result<(), Outcome> {
        if let Some(cb) = self.callback.as_mut() {
            self.tree.state.borrow_mut().reason = Some(reason);
            trace!(
                component = "engine",
                operation = "callback",
                reason = reason.as_str(),
                "Invoking callback"
            );
            cb(&self.tree);
            self.tree.state.borrow_mut().reason = None;
        }
        let st = self.tree.state.borrow();
        if st.stop {
            return Err(Outcome::Stop);
        }
        if st.prob.borrow().num_cols() != st.num_cols {
            warn!(
                component = "engine",
                operation = "callback",
                status = "error",
                "Column count changed during search"
            );
            return Err(Outcome::Fault);
        }
        Ok(())
    }

    fn check_time(&self) -> Result<(), Outcome> {
        let limit = self.tree.state.borrow().parm.tm_lim;
        match limit {
            Some(ms) if self.started.elapsed().as_millis() >= u128::from(ms) => {
                Err(Outcome::TimeLimit)
            }
            _ => Ok(()),
        }
    }

    /// Print a progress line once `out_dly` has passed, then at most every
    /// `out_frq` milliseconds. `last` forces the line when output is due.
    fn show_progress(&mut self, last: bool) {
        let (msg_lev, out_frq, out_dly) = {
            let st = self.tree.state.borrow();
            (st.parm.msg_lev, st.parm.out_frq, st.parm.out_dly)
        };
        if msg_lev < MsgLevel::On
            || self.started.elapsed() < Duration::from_millis(u64::from(out_dly))
        {
            return;
        }
        let due = match self.last_report {
            Some(at) => at.elapsed() >= Duration::from_millis(u64::from(out_frq)),
            None => true,
        };
        if !due && !last {
            return;
        }
        self.last_report = Some(Instant::now());
        let line = {
            let st = self.tree.state.borrow();
            let best = st.best_node();
            let bound = if best == 0 {
                "tree is empty".to_string()
            } else {
                format!("{:>17.9e}", st.nodes[&best].bound)
            };
            let mip = if st.incumbent.is_some() {
                format!("{:>17.9e}", st.mip_obj)
            } else {
                "not found yet".to_string()
            };
            let gap = if st.incumbent.is_some() && best != 0 {
                format!("{:.1}%", st.mip_gap() * 100.0)
            } else {
                String::new()
            };
            format!(
                "+{:>6}: mip = {mip} >= {bound} {gap} ({}; {})",
                st.next_id - 1,
                st.active.len(),
                st.next_id - 1 - st.nodes.len()
            )
        };
        term::print(&line);
    }

    /// Round every integer column of the relaxation optimum and offer the
    /// point as a heuristic solution.
    fn simple_rounding(&mut self) -> Result<(), Outcome> {
        let x: Vec<f64> = {
            let st = self.state();
            let prob = st.prob.borrow();
            prob.cols
                .iter()
                .zip(&st.relax_x)
                .map(|(col, &v)| if col.kind == ColKind::Integer { v.round() } else { v })
                .collect()
        };
        let accepted = self.tree.heur_sol(&x).map_err(|_| Outcome::Fault)?;
        if accepted {
            let obj = self.state().mip_obj;
            trace!(
                component = "engine",
                operation = "simple_rounding",
                status = "success",
                objective = obj,
                "Rounded relaxation is integer feasible"
            );
            self.record_incumbent(obj);
            self.call(Reason::Bingo)?;
        }
        Ok(())
    }

    fn search(&mut self) -> Result<(), Outcome> {
        {
            let mut st = self.state();
            let root_bound = st.worst_bound();
            st.add_node(0, root_bound, None);
        }
        loop {
            if self.state().stop {
                return Err(Outcome::Stop);
            }
            self.check_time()?;
            self.show_progress(false);

            if self.state().curr == 0 {
                let p = {
                    let mut st = self.state();
                    if st.active.is_empty() {
                        return Ok(());
                    }
                    if st.active.len() == 1 {
                        Some(st.active[0])
                    } else if st.next_p != 0 {
                        Some(std::mem::take(&mut st.next_p))
                    } else {
                        None
                    }
                };
                let p = match p {
                    Some(p) => p,
                    None => {
                        self.call(Reason::Select)?;
                        let mut st = self.state();
                        match std::mem::take(&mut st.next_p) {
                            0 => st.choose_node(),
                            p => p,
                        }
                    }
                };
                let mut st = self.state();
                st.next_p = 0;
                st.curr = p;
            }

            self.call(Reason::Prepro)?;
            self.process_node()?;
        }
    }

    /// Explore the current subproblem until it is fathomed or branched.
    fn process_node(&mut self) -> Result<(), Outcome> {
        loop {
            let obj = match self.solve_relaxation()? {
                Relaxed::Pruned => return self.prune(),
                Relaxed::Solved(obj) => obj,
            };

            let rows = self.working().borrow().num_rows();
            self.call(Reason::RowGen)?;
            if self.working().borrow().num_rows() != rows {
                continue;
            }

            let fractional = self.state().non_int.iter().any(|&f| f);
            if !fractional {
                let improved = {
                    let mut st = self.state();
                    if st.improves(obj) {
                        st.incumbent = Some(st.relax_x.clone());
                        st.mip_obj = obj;
                        st.prune_dominated();
                        true
                    } else {
                        false
                    }
                };
                if improved {
                    self.record_incumbent(obj);
                    self.call(Reason::Bingo)?;
                }
                return self.prune();
            }

            self.call(Reason::Heur)?;
            if self.state().parm.sr_heur {
                self.simple_rounding()?;
            }
            if !self.state().improves(obj) {
                return self.prune();
            }

            let rows = self.working().borrow().num_rows();
            self.call(Reason::CutGen)?;
            if self.working().borrow().num_rows() != rows {
                continue;
            }

            {
                let st = self.state();
                if st.incumbent.is_some() && st.mip_gap() <= st.parm.mip_gap {
                    return Err(Outcome::MipGap);
                }
            }

            self.state().branch = None;
            self.call(Reason::Branch)?;
            return self.branch();
        }
    }

    fn solve_relaxation(&mut self) -> Result<Relaxed, Outcome> {
        let prob = self.working();
        let (curr, bounds) = {
            let st = self.state();
            let bounds = st.node_bounds(st.curr, &prob.borrow());
            (st.curr, bounds)
        };
        if bounds.iter().any(|(lo, hi)| lo > hi) {
            return Ok(Relaxed::Pruned);
        }
        let result = {
            let p = prob.borrow();
            let mut lp = HighsLp::relaxation(&p, Some(&bounds));
            lp.set_option("presolve", HighsOption::Str("off"));
            lp.solve()
        };
        match result.status {
            LpStatus::Optimal => {}
            LpStatus::Infeasible => return Ok(Relaxed::Pruned),
            LpStatus::Unbounded | LpStatus::UnboundedOrInfeasible => {
                return Err(Outcome::NoDualFeasible);
            }
            LpStatus::ReachedTimeLimit => return Err(Outcome::TimeLimit),
            LpStatus::ReachedIterationLimit | LpStatus::Unknown => return Err(Outcome::Fault),
        }

        let mut st = self.state();
        let tol_int = st.parm.tol_int;
        let non_int: Vec<bool> = prob
            .borrow()
            .cols
            .iter()
            .zip(&result.col_values)
            .map(|(col, &x)| col.kind == ColKind::Integer && (x - x.round()).abs() > tol_int)
            .collect();
        st.non_int = non_int;
        st.relax_x = result.col_values;
        if let Some(node) = st.nodes.get_mut(&curr) {
            node.bound = result.objective;
        }
        trace!(
            component = "engine",
            operation = "relaxation",
            status = "success",
            subproblem = curr,
            bound = result.objective,
            "Subproblem relaxation solved"
        );
        if !st.improves(result.objective) {
            return Ok(Relaxed::Pruned);
        }
        Ok(Relaxed::Solved(result.objective))
    }

    fn record_incumbent(&self, obj: f64) {
        let (x, msg_lev, created, gap) = {
            let st = self.tree.state.borrow();
            (
                st.incumbent.clone().unwrap_or_default(),
                st.parm.msg_lev,
                st.next_id - 1,
                st.mip_gap(),
            )
        };
        self.working().borrow_mut().store_mip(SolStatus::Feasible, &x);
        if msg_lev >= MsgLevel::All {
            term::print(&format!(
                "+{created:>6}: mip = {obj:>17.9e}; gap = {:.1}%",
                gap * 100.0
            ));
        }
        debug!(
            component = "engine",
            operation = "incumbent",
            status = "success",
            objective = obj,
            "New incumbent found"
        );
    }

    fn prune(&mut self) -> Result<(), Outcome> {
        let mut st = self.state();
        let curr = st.curr;
        st.fathom(curr);
        st.curr = 0;
        Ok(())
    }

    fn branch(&mut self) -> Result<(), Outcome> {
        let mut st = self.state();
        let chosen = st.branch.take();
        let (j, dir) = match chosen {
            Some(choice) => choice,
            None => match st.choose_branch() {
                Some(choice) => choice,
                None => return Err(Outcome::Fault),
            },
        };
        let x = st.relax_x[j - 1];
        let curr = st.curr;
        let bound = st.nodes[&curr].bound;
        let down = st.add_node(curr, bound, Some((j, f64::NEG_INFINITY, x.floor())));
        let up = st.add_node(curr, bound, Some((j, x.ceil(), f64::INFINITY)));
        st.active.retain(|&q| q != curr);
        if let Some(node) = st.nodes.get_mut(&curr) {
            node.active = false;
        }
        st.next_p = match dir {
            BranchDir::Down => down,
            BranchDir::Up => up,
            BranchDir::NoPreference => 0,
        };
        st.curr = 0;
        trace!(
            component = "engine",
            operation = "branch",
            status = "success",
            subproblem = curr,
            column = j,
            value = x,
            "Branched"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::SimplexParams;
    use crate::problem::create_prob;
    use crate::simplex::simplex;

    /// max 5x + 4y  s.t.  6x + 4y <= 24, x + 2y <= 6, x, y >= 0 integer.
    fn knapsack() -> ProbHandle {
        let prob = create_prob();
        {
            let mut p = prob.borrow_mut();
            p.add_rows(2).unwrap();
            p.add_cols(2).unwrap();
            p.set_obj_dir(Direction::Maximize);
            p.set_obj_coef(1, 5.0).unwrap();
            p.set_obj_coef(2, 4.0).unwrap();
            for j in 1..=2 {
                p.set_col_bounds(j, 0.0, f64::INFINITY).unwrap();
                p.set_col_kind(j, ColKind::Integer).unwrap();
            }
            p.set_row_bounds(1, f64::NEG_INFINITY, 24.0).unwrap();
            p.set_row_bounds(2, f64::NEG_INFINITY, 6.0).unwrap();
            p.load_matrix(&[(1, 1, 6.0), (1, 2, 4.0), (2, 1, 1.0), (2, 2, 2.0)])
                .unwrap();
        }
        prob
    }

    #[test]
    fn test_intopt_requires_basis_without_presolve() {
        let prob = knapsack();
        let outcome = intopt(&prob, &IntoptParams::default(), None);
        assert_eq!(outcome, Outcome::Root);
    }

    #[test]
    fn test_intopt_solves_small_mip() {
        let prob = knapsack();
        simplex(&mut prob.borrow_mut(), &SimplexParams::default());
        let outcome = intopt(&prob, &IntoptParams::default(), None);
        assert_eq!(outcome, Outcome::Success);
        let p = prob.borrow();
        assert_eq!(p.mip_status(), SolStatus::Optimal);
        assert!((p.mip_obj_val() - 20.0).abs() < 1e-6);
    }

    #[test]
    fn test_intopt_with_presolve_leaves_basic_solution_alone() {
        let prob = knapsack();
        let parm = IntoptParams {
            presolve: true,
            ..IntoptParams::default()
        };
        assert_eq!(intopt(&prob, &parm, None), Outcome::Success);
        let p = prob.borrow();
        assert_eq!(p.status(), SolStatus::Undefined);
        assert_eq!(p.mip_status(), SolStatus::Optimal);
    }

    #[test]
    fn test_callback_sees_reasons_and_consistent_counts() {
        let prob = knapsack();
        simplex(&mut prob.borrow_mut(), &SimplexParams::default());
        let mut reasons = Vec::new();
        let mut cb = |tree: &IosHandle| {
            let (a, n, t) = tree.tree_size();
            assert!(a <= n && n <= t);
            if let Some(reason) = tree.reason() {
                reasons.push(reason);
            }
        };
        let outcome = intopt(&prob, &IntoptParams::default(), Some(&mut cb));
        assert_eq!(outcome, Outcome::Success);
        assert!(reasons.contains(&Reason::Prepro));
        assert!(reasons.contains(&Reason::Branch));
        assert!(reasons.contains(&Reason::Bingo));
    }

    #[test]
    fn test_terminate_stops_search() {
        let prob = knapsack();
        simplex(&mut prob.borrow_mut(), &SimplexParams::default());
        let mut cb = |tree: &IosHandle| tree.terminate();
        let outcome = intopt(&prob, &IntoptParams::default(), Some(&mut cb));
        assert_eq!(outcome, Outcome::Stop);
        assert_eq!(prob.borrow().mip_status(), SolStatus::Undefined);
    }

    #[test]
    fn test_fathom_drops_childless_ancestors() {
        let mut st = IosState {
            prob: create_prob(),
            parm: IntoptParams::default(),
            dir: Direction::Minimize,
            num_cols: 1,
            reason: None,
            nodes: BTreeMap::new(),
            active: Vec::new(),
            next_id: 1,
            curr: 0,
            next_p: 0,
            branch: None,
            stop: false,
            incumbent: None,
            mip_obj: 0.0,
            relax_x: vec![0.5],
            non_int: vec![true],
        };
        let root = st.add_node(0, 0.0, None);
        let a = st.add_node(root, 0.0, Some((1, f64::NEG_INFINITY, 0.0)));
        let b = st.add_node(root, 0.0, Some((1, 1.0, f64::INFINITY)));
        st.active.retain(|&q| q != root);
        st.nodes.get_mut(&root).unwrap().active = false;

        st.fathom(a);
        assert_eq!(st.nodes.len(), 2);
        st.fathom(b);
        assert!(st.nodes.is_empty());
        assert_eq!(st.next_id - 1, 3);
    }

    /// max x + y  s.t.  x + y <= 1.4, x, y binary.
    fn rounding_mip() -> ProbHandle {
        let prob = create_prob();
        {
            let mut p = prob.borrow_mut();
            p.add_rows(1).unwrap();
            p.add_cols(2).unwrap();
            p.set_obj_dir(Direction::Maximize);
            for j in 1..=2 {
                p.set_obj_coef(j, 1.0).unwrap();
                p.set_col_bounds(j, 0.0, 1.0).unwrap();
                p.set_col_kind(j, ColKind::Integer).unwrap();
            }
            p.set_row_bounds(1, f64::NEG_INFINITY, 1.4).unwrap();
            p.load_matrix(&[(1, 1, 1.0), (1, 2, 1.0)]).unwrap();
        }
        simplex(&mut prob.borrow_mut(), &SimplexParams::default());
        prob
    }

    #[test]
    fn test_simple_rounding_finds_root_incumbent() {
        for sr_heur in [true, false] {
            let prob = rounding_mip();
            let mut bingo_at = Vec::new();
            let mut cb = |tree: &IosHandle| {
                if tree.reason() == Some(Reason::Bingo) {
                    bingo_at.push(tree.curr_node());
                }
            };
            let parm = IntoptParams {
                sr_heur,
                ..IntoptParams::default()
            };
            assert_eq!(intopt(&prob, &parm, Some(&mut cb)), Outcome::Success);
            assert_eq!(bingo_at.first() == Some(&1), sr_heur);
            assert!((prob.borrow().mip_obj_val() - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_progress_lines_follow_output_delay() {
        let run = |out_dly: u32| {
            let seen = Rc::new(RefCell::new(Vec::<String>::new()));
            let sink = Rc::clone(&seen);
            term::set_term_hook(Some(Box::new(move |s: &str| {
                sink.borrow_mut().push(s.to_string());
            })));
            let was_on = term::set_term_on(true);
            let parm = IntoptParams {
                msg_lev: MsgLevel::On,
                out_frq: 0,
                out_dly,
                ..IntoptParams::default()
            };
            intopt(&rounding_mip(), &parm, None);
            term::set_term_on(was_on);
            term::set_term_hook(None);
            seen.take()
        };

        let lines = run(0);
        assert!(lines.iter().filter(|l| l.starts_with('+') && l.contains("mip =")).count() >= 2);
        assert!(lines.iter().any(|l| l == "INTEGER OPTIMAL SOLUTION FOUND"));

        let lines = run(60_000);
        assert!(!lines.iter().any(|l| l.starts_with('+')));
        assert!(lines.iter().any(|l| l == "INTEGER OPTIMAL SOLUTION FOUND"));
    }
}
