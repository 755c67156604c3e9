//! Solver option records.
//!
//! Every field is optional; an unset field keeps the engine default, except
//! `msg_lev`, which defaults to [`MsgLevel::Off`] so solver calls stay quiet
//! unless asked otherwise. Records are checked with `validate()` before any
//! engine call.

use crate::error::{Error, Result};
use lpbind_engine::{
    BacktrackTech, BranchTech, IntoptParams, MsgLevel, PreprocessTech, Pricing, RatioTest,
    SimplexMethod, SimplexParams,
};
use serde::{Deserialize, Serialize};
use tracing::warn;

fn invalid(field: &'static str, message: String) -> Error {
    warn!(
        component = "binding",
        operation = "validate_options",
        status = "error",
        field,
        "{}",
        message
    );
    Error::InvalidOption(message)
}

fn check_open_unit(field: &'static str, value: Option<f64>) -> Result<()> {
    match value {
        Some(v) if !(v > 0.0 && v < 1.0) => {
            Err(invalid(field, format!("{field} must obey 0<{field}<1")))
        }
        _ => Ok(()),
    }
}

fn check_non_negative(field: &'static str, value: Option<i64>) -> Result<()> {
    match value {
        Some(v) if v < 0 => Err(invalid(field, format!("{field} must be non-negative"))),
        _ => Ok(()),
    }
}

fn check_positive(field: &'static str, value: Option<i64>) -> Result<()> {
    match value {
        Some(v) if v <= 0 => Err(invalid(field, format!("{field} must be positive"))),
        _ => Ok(()),
    }
}

/// Saturating conversion of a validated, non-negative count.
fn to_u32(value: i64) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}

/// Options for [`Problem::simplex`](crate::Problem::simplex) and
/// [`Problem::exact`](crate::Problem::exact).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimplexOptions {
    pub msg_lev: Option<MsgLevel>,
    pub meth: Option<SimplexMethod>,
    pub pricing: Option<Pricing>,
    /// Accepted and validated; HiGHS picks its own ratio test.
    pub r_test: Option<RatioTest>,
    /// Primal feasibility tolerance, in (0, 1).
    pub tol_bnd: Option<f64>,
    /// Dual feasibility tolerance, in (0, 1).
    pub tol_dj: Option<f64>,
    /// Pivot tolerance, in (0, 1). Accepted and validated; HiGHS does not
    /// expose it.
    pub tol_piv: Option<f64>,
    /// Lower objective limit, checked during dual simplex.
    pub obj_ll: Option<f64>,
    /// Upper objective limit, checked during dual simplex.
    pub obj_ul: Option<f64>,
    /// Iteration limit.
    pub it_lim: Option<i64>,
    /// Time limit in milliseconds.
    pub tm_lim: Option<i64>,
    /// Output frequency in iterations. HiGHS runs the solve in one call, so
    /// only the final iteration line is reported.
    pub out_frq: Option<i64>,
    /// Output delay in milliseconds; solves shorter than this print no
    /// iteration line.
    pub out_dly: Option<i64>,
    pub presolve: Option<bool>,
}

impl SimplexOptions {
    /// Create options with every field at its default.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_msg_lev(mut self, level: MsgLevel) -> Self {
        self.msg_lev = Some(level);
        self
    }

    pub fn with_meth(mut self, meth: SimplexMethod) -> Self {
        self.meth = Some(meth);
        self
    }

    pub fn with_pricing(mut self, pricing: Pricing) -> Self {
        self.pricing = Some(pricing);
        self
    }

    pub fn with_r_test(mut self, r_test: RatioTest) -> Self {
        self.r_test = Some(r_test);
        self
    }

    pub fn with_tol_bnd(mut self, tol: f64) -> Self {
        self.tol_bnd = Some(tol);
        self
    }

    pub fn with_tol_dj(mut self, tol: f64) -> Self {
        self.tol_dj = Some(tol);
        self
    }

    pub fn with_tol_piv(mut self, tol: f64) -> Self {
        self.tol_piv = Some(tol);
        self
    }

    pub fn with_obj_ll(mut self, limit: f64) -> Self {
        self.obj_ll = Some(limit);
        self
    }

    pub fn with_obj_ul(mut self, limit: f64) -> Self {
        self.obj_ul = Some(limit);
        self
    }

    pub fn with_it_lim(mut self, limit: i64) -> Self {
        self.it_lim = Some(limit);
        self
    }

    /// Set the time limit in milliseconds.
    pub fn with_tm_lim(mut self, millis: i64) -> Self {
        self.tm_lim = Some(millis);
        self
    }

    pub fn with_out_frq(mut self, iterations: i64) -> Self {
        self.out_frq = Some(iterations);
        self
    }

    pub fn with_out_dly(mut self, millis: i64) -> Self {
        self.out_dly = Some(millis);
        self
    }

    pub fn with_presolve(mut self, enabled: bool) -> Self {
        self.presolve = Some(enabled);
        self
    }

    /// Check if every field is unset.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Check each field independently; the first failure is returned.
    pub fn validate(&self) -> Result<()> {
        check_open_unit("tol_bnd", self.tol_bnd)?;
        check_open_unit("tol_dj", self.tol_dj)?;
        check_open_unit("tol_piv", self.tol_piv)?;
        check_non_negative("it_lim", self.it_lim)?;
        check_non_negative("tm_lim", self.tm_lim)?;
        check_positive("out_frq", self.out_frq)?;
        check_non_negative("out_dly", self.out_dly)?;
        Ok(())
    }

    /// Engine parameters after validation.
    pub fn to_params(&self) -> Result<SimplexParams> {
        self.validate()?;
        let defaults = SimplexParams::default();
        Ok(SimplexParams {
            msg_lev: self.msg_lev.unwrap_or(MsgLevel::Off),
            meth: self.meth.unwrap_or(defaults.meth),
            pricing: self.pricing.unwrap_or(defaults.pricing),
            r_test: self.r_test.unwrap_or(defaults.r_test),
            tol_bnd: self.tol_bnd.unwrap_or(defaults.tol_bnd),
            tol_dj: self.tol_dj.unwrap_or(defaults.tol_dj),
            tol_piv: self.tol_piv.unwrap_or(defaults.tol_piv),
            obj_ll: self.obj_ll.unwrap_or(defaults.obj_ll),
            obj_ul: self.obj_ul.unwrap_or(defaults.obj_ul),
            it_lim: self.it_lim.map(to_u32).or(defaults.it_lim),
            tm_lim: self.tm_lim.map(to_u32).or(defaults.tm_lim),
            out_frq: self.out_frq.map_or(defaults.out_frq, to_u32),
            out_dly: self.out_dly.map_or(defaults.out_dly, to_u32),
            presolve: self.presolve.unwrap_or(defaults.presolve),
        })
    }
}

/// Options for [`Problem::integer`](crate::Problem::integer) and
/// [`Problem::intopt`](crate::Problem::intopt).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IntegerOptions {
    pub msg_lev: Option<MsgLevel>,
    pub br_tech: Option<BranchTech>,
    pub bt_tech: Option<BacktrackTech>,
    pub pp_tech: Option<PreprocessTech>,
    /// Simple rounding heuristic: round the relaxation of each node and keep
    /// the point if it is feasible.
    pub sr_heur: Option<bool>,
    /// Feasibility pump heuristic. Accepted and validated, not run.
    pub fp_heur: Option<bool>,
    /// Proximity search heuristic. Accepted and validated, not run.
    pub ps_heur: Option<bool>,
    /// Proximity search time limit in milliseconds. Accepted and validated,
    /// not used.
    pub ps_tm_lim: Option<i64>,
    /// Gomory mixed-integer cuts. Accepted, not generated; use a cutgen
    /// callback to add cuts.
    pub gmi_cuts: Option<bool>,
    /// Mixed-integer rounding cuts. Accepted, not generated.
    pub mir_cuts: Option<bool>,
    /// Mixed cover cuts. Accepted, not generated.
    pub cov_cuts: Option<bool>,
    /// Clique cuts. Accepted, not generated.
    pub clq_cuts: Option<bool>,
    /// Integrality tolerance, in (0, 1).
    pub tol_int: Option<f64>,
    /// Relative objective tolerance, in (0, 1).
    pub tol_obj: Option<f64>,
    /// Relative gap at which the search stops.
    pub mip_gap: Option<f64>,
    /// Time limit in milliseconds.
    pub tm_lim: Option<i64>,
    /// Milliseconds between branch-and-bound progress lines.
    pub out_frq: Option<i64>,
    /// Milliseconds before the first progress line.
    pub out_dly: Option<i64>,
    pub presolve: Option<bool>,
    /// Binarize integer columns during presolve. Accepted and validated; the
    /// working copy keeps general integers.
    pub binarize: Option<bool>,
}

impl IntegerOptions {
    /// Create options with every field at its default.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_msg_lev(mut self, level: MsgLevel) -> Self {
        self.msg_lev = Some(level);
        self
    }

    pub fn with_br_tech(mut self, tech: BranchTech) -> Self {
        self.br_tech = Some(tech);
        self
    }

    pub fn with_bt_tech(mut self, tech: BacktrackTech) -> Self {
        self.bt_tech = Some(tech);
        self
    }

    pub fn with_pp_tech(mut self, tech: PreprocessTech) -> Self {
        self.pp_tech = Some(tech);
        self
    }

    pub fn with_sr_heur(mut self, enabled: bool) -> Self {
        self.sr_heur = Some(enabled);
        self
    }

    pub fn with_fp_heur(mut self, enabled: bool) -> Self {
        self.fp_heur = Some(enabled);
        self
    }

    pub fn with_ps_heur(mut self, enabled: bool) -> Self {
        self.ps_heur = Some(enabled);
        self
    }

    pub fn with_ps_tm_lim(mut self, millis: i64) -> Self {
        self.ps_tm_lim = Some(millis);
        self
    }

    pub fn with_gmi_cuts(mut self, enabled: bool) -> Self {
        self.gmi_cuts = Some(enabled);
        self
    }

    pub fn with_mir_cuts(mut self, enabled: bool) -> Self {
        self.mir_cuts = Some(enabled);
        self
    }

    pub fn with_cov_cuts(mut self, enabled: bool) -> Self {
        self.cov_cuts = Some(enabled);
        self
    }

    pub fn with_clq_cuts(mut self, enabled: bool) -> Self {
        self.clq_cuts = Some(enabled);
        self
    }

    pub fn with_tol_int(mut self, tol: f64) -> Self {
        self.tol_int = Some(tol);
        self
    }

    pub fn with_tol_obj(mut self, tol: f64) -> Self {
        self.tol_obj = Some(tol);
        self
    }

    pub fn with_mip_gap(mut self, gap: f64) -> Self {
        self.mip_gap = Some(gap);
        self
    }

    /// Set the time limit in milliseconds.
    pub fn with_tm_lim(mut self, millis: i64) -> Self {
        self.tm_lim = Some(millis);
        self
    }

    pub fn with_out_frq(mut self, millis: i64) -> Self {
        self.out_frq = Some(millis);
        self
    }

    pub fn with_out_dly(mut self, millis: i64) -> Self {
        self.out_dly = Some(millis);
        self
    }

    pub fn with_presolve(mut self, enabled: bool) -> Self {
        self.presolve = Some(enabled);
        self
    }

    pub fn with_binarize(mut self, enabled: bool) -> Self {
        self.binarize = Some(enabled);
        self
    }

    /// Check if every field is unset.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Check each field independently; the first failure is returned.
    pub fn validate(&self) -> Result<()> {
        if matches!(self.ps_tm_lim, Some(v) if v < 0) {
            return Err(invalid(
                "ps_tm_lim",
                "ps_tm_lim must be nonnegative".to_string(),
            ));
        }
        check_open_unit("tol_int", self.tol_int)?;
        check_open_unit("tol_obj", self.tol_obj)?;
        if matches!(self.mip_gap, Some(v) if v.is_nan() || v < 0.0) {
            return Err(invalid(
                "mip_gap",
                "mip_gap must be non-negative".to_string(),
            ));
        }
        check_non_negative("tm_lim", self.tm_lim)?;
        check_positive("out_frq", self.out_frq)?;
        check_non_negative("out_dly", self.out_dly)?;
        Ok(())
    }

    /// Engine parameters after validation.
    pub fn to_params(&self) -> Result<IntoptParams> {
        self.validate()?;
        let defaults = IntoptParams::default();
        Ok(IntoptParams {
            msg_lev: self.msg_lev.unwrap_or(MsgLevel::Off),
            br_tech: self.br_tech.unwrap_or(defaults.br_tech),
            bt_tech: self.bt_tech.unwrap_or(defaults.bt_tech),
            pp_tech: self.pp_tech.unwrap_or(defaults.pp_tech),
            tol_int: self.tol_int.unwrap_or(defaults.tol_int),
            tol_obj: self.tol_obj.unwrap_or(defaults.tol_obj),
            tm_lim: self.tm_lim.map(to_u32).or(defaults.tm_lim),
            out_frq: self.out_frq.map_or(defaults.out_frq, to_u32),
            out_dly: self.out_dly.map_or(defaults.out_dly, to_u32),
            mip_gap: self.mip_gap.unwrap_or(defaults.mip_gap),
            presolve: self.presolve.unwrap_or(defaults.presolve),
            binarize: self.binarize.unwrap_or(defaults.binarize),
            sr_heur: self.sr_heur.unwrap_or(defaults.sr_heur),
            fp_heur: self.fp_heur.unwrap_or(defaults.fp_heur),
            ps_heur: self.ps_heur.unwrap_or(defaults.ps_heur),
            ps_tm_lim: self.ps_tm_lim.map_or(defaults.ps_tm_lim, to_u32),
            gmi_cuts: self.gmi_cuts.unwrap_or(defaults.gmi_cuts),
            mir_cuts: self.mir_cuts.unwrap_or(defaults.mir_cuts),
            cov_cuts: self.cov_cuts.unwrap_or(defaults.cov_cuts),
            clq_cuts: self.clq_cuts.unwrap_or(defaults.clq_cuts),
        })
    }
}
