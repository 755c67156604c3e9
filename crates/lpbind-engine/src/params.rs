//! Control parameter records for the solver entry points.

use serde::{Deserialize, Serialize};

/// Amount of terminal output produced by a solver call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MsgLevel {
    Off,
    #[default]
    Err,
    On,
    All,
}

impl MsgLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            MsgLevel::Off => "off",
            MsgLevel::Err => "err",
            MsgLevel::On => "on",
            MsgLevel::All => "all",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SimplexMethod {
    #[default]
    #[serde(rename = "primal")]
    Primal,
    #[serde(rename = "dual")]
    Dual,
    /// Dual phase one, then primal.
    #[serde(rename = "dualp")]
    DualPrimal,
}

impl SimplexMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            SimplexMethod::Primal => "primal",
            SimplexMethod::Dual => "dual",
            SimplexMethod::DualPrimal => "dualp",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Pricing {
    #[serde(rename = "std")]
    Standard,
    /// Projected steepest edge.
    #[default]
    #[serde(rename = "pse")]
    SteepestEdge,
}

impl Pricing {
    pub fn as_str(self) -> &'static str {
        match self {
            Pricing::Standard => "std",
            Pricing::SteepestEdge => "pse",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RatioTest {
    #[serde(rename = "std")]
    Standard,
    #[default]
    #[serde(rename = "har")]
    Harris,
}

impl RatioTest {
    pub fn as_str(self) -> &'static str {
        match self {
            RatioTest::Standard => "std",
            RatioTest::Harris => "har",
        }
    }
}

/// Branching variable selection rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BranchTech {
    #[serde(rename = "ffv")]
    FirstFractional,
    #[serde(rename = "lfv")]
    LastFractional,
    #[serde(rename = "mfv")]
    MostFractional,
    #[default]
    #[serde(rename = "dth")]
    DriebeckTomlin,
    #[serde(rename = "pch")]
    PseudoCost,
}

impl BranchTech {
    pub fn as_str(self) -> &'static str {
        match self {
            BranchTech::FirstFractional => "ffv",
            BranchTech::LastFractional => "lfv",
            BranchTech::MostFractional => "mfv",
            BranchTech::DriebeckTomlin => "dth",
            BranchTech::PseudoCost => "pch",
        }
    }
}

/// Rule for picking the next active subproblem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BacktrackTech {
    #[serde(rename = "dfs")]
    DepthFirst,
    #[serde(rename = "bfs")]
    BreadthFirst,
    #[default]
    #[serde(rename = "blb")]
    BestLocalBound,
    #[serde(rename = "bph")]
    BestProjection,
}

impl BacktrackTech {
    pub fn as_str(self) -> &'static str {
        match self {
            BacktrackTech::DepthFirst => "dfs",
            BacktrackTech::BreadthFirst => "bfs",
            BacktrackTech::BestLocalBound => "blb",
            BacktrackTech::BestProjection => "bph",
        }
    }
}

/// Which subproblems get the preprocessing pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PreprocessTech {
    None,
    Root,
    #[default]
    All,
}

impl PreprocessTech {
    pub fn as_str(self) -> &'static str {
        match self {
            PreprocessTech::None => "none",
            PreprocessTech::Root => "root",
            PreprocessTech::All => "all",
        }
    }
}

/// Scaling options, combined with `|`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScaleFlags(u8);

impl ScaleFlags {
    /// No scaling.
    pub const NONE: Self = Self(0);
    /// Geometric mean scaling.
    pub const GM: Self = Self(0x01);
    /// Equilibration scaling.
    pub const EQ: Self = Self(0x10);
    /// Round scale factors to powers of two.
    pub const POW2: Self = Self(0x20);
    /// Skip scaling when the problem is already well scaled.
    pub const SKIP: Self = Self(0x40);
    /// Let the solver choose.
    pub const AUTO: Self = Self(0x80);

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Closest HiGHS `simplex_scale_strategy`. HiGHS always rounds scale
    /// factors to powers of two, so `POW2` alone selects nothing.
    pub(crate) fn highs_strategy(self) -> i32 {
        if self.contains(Self::AUTO) || self.contains(Self::SKIP) {
            1
        } else if self.contains(Self::GM) && self.contains(Self::EQ) {
            3
        } else if self.contains(Self::EQ) {
            2
        } else if self.contains(Self::GM) {
            4
        } else {
            0
        }
    }
}

impl std::ops::BitOr for ScaleFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Simplex control parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct SimplexParams {
    pub msg_lev: MsgLevel,
    pub meth: SimplexMethod,
    pub pricing: Pricing,
    pub r_test: RatioTest,
    pub tol_bnd: f64,
    pub tol_dj: f64,
    pub tol_piv: f64,
    pub obj_ll: f64,
    pub obj_ul: f64,
    /// Simplex iteration limit; `None` is unlimited.
    pub it_lim: Option<u32>,
    /// Time limit in milliseconds; `None` is unlimited.
    pub tm_lim: Option<u32>,
    pub out_frq: u32,
    pub out_dly: u32,
    pub presolve: bool,
}

impl Default for SimplexParams {
    fn default() -> Self {
        Self {
            msg_lev: MsgLevel::default(),
            meth: SimplexMethod::default(),
            pricing: Pricing::default(),
            r_test: RatioTest::default(),
            tol_bnd: 1e-7,
            tol_dj: 1e-7,
            tol_piv: 1e-10,
            obj_ll: f64::MIN,
            obj_ul: f64::MAX,
            it_lim: None,
            tm_lim: None,
            out_frq: 500,
            out_dly: 0,
            presolve: false,
        }
    }
}

/// Branch-and-bound control parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct IntoptParams {
    pub msg_lev: MsgLevel,
    pub br_tech: BranchTech,
    pub bt_tech: BacktrackTech,
    pub pp_tech: PreprocessTech,
    pub tol_int: f64,
    pub tol_obj: f64,
    /// Time limit in milliseconds; `None` is unlimited.
    pub tm_lim: Option<u32>,
    pub out_frq: u32,
    pub out_dly: u32,
    pub mip_gap: f64,
    pub presolve: bool,
    pub binarize: bool,
    pub sr_heur: bool,
    pub fp_heur: bool,
    pub ps_heur: bool,
    pub ps_tm_lim: u32,
    pub gmi_cuts: bool,
    pub mir_cuts: bool,
    pub cov_cuts: bool,
    pub clq_cuts: bool,
}

impl Default for IntoptParams {
    fn default() -> Self {
        Self {
            msg_lev: MsgLevel::default(),
            br_tech: BranchTech::default(),
            bt_tech: BacktrackTech::default(),
            pp_tech: PreprocessTech::default(),
            tol_int: 1e-5,
            tol_obj: 1e-7,
            tm_lim: None,
            out_frq: 5000,
            out_dly: 10000,
            mip_gap: 0.0,
            presolve: false,
            binarize: false,
            sr_heur: true,
            fp_heur: false,
            ps_heur: false,
            ps_tm_lim: 60000,
            gmi_cuts: false,
            mir_cuts: false,
            cov_cuts: false,
            clq_cuts: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serde_names_match_codes() {
        let json = serde_json::to_string(&BranchTech::MostFractional).unwrap();
        assert_eq!(json, "\"mfv\"");
        let meth: SimplexMethod = serde_json::from_str("\"dualp\"").unwrap();
        assert_eq!(meth, SimplexMethod::DualPrimal);
        let lev: MsgLevel = serde_json::from_str("\"all\"").unwrap();
        assert_eq!(lev.as_str(), "all");
    }

    #[test]
    fn test_scale_flags_pick_highs_strategy() {
        assert_eq!(ScaleFlags::AUTO.highs_strategy(), 1);
        assert_eq!((ScaleFlags::GM | ScaleFlags::EQ).highs_strategy(), 3);
        assert_eq!((ScaleFlags::EQ | ScaleFlags::POW2).highs_strategy(), 2);
        assert_eq!(ScaleFlags::GM.highs_strategy(), 4);
        assert_eq!(ScaleFlags::POW2.highs_strategy(), 0);
        assert_eq!(ScaleFlags::NONE.highs_strategy(), 0);
        assert!((ScaleFlags::GM | ScaleFlags::SKIP).contains(ScaleFlags::SKIP));
    }

    #[test]
    fn test_defaults() {
        let smcp = SimplexParams::default();
        assert_eq!(smcp.it_lim, None);
        assert!(smcp.tol_bnd > 0.0 && smcp.tol_bnd < 1.0);
        let iocp = IntoptParams::default();
        assert_eq!(iocp.bt_tech, BacktrackTech::BestLocalBound);
        assert_eq!(iocp.mip_gap, 0.0);
    }
}
