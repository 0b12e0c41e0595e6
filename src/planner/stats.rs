//! Planner output types (spec §4.2, §4.3, §4.4): the terminal status, the top-k root edge
//! summary, and the full result bundle a `PlanAction` node and the telemetry sink consume.

use serde::{Deserialize, Serialize};

use crate::action::Action;

/// Why the planner returned what it returned (spec §4.2 point 3). Wire tokens are the
/// lowercase strings spec §8 pins (`status=ok`, `status=timeout`, `status=noaction`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlannerStatus {
    /// Root is already terminal (goal or collision) — no search was run.
    #[serde(rename = "noaction")]
    NoAction,
    /// The search ran to completion: either the iteration cap was reached, or the time
    /// budget elapsed exactly when the iteration cap was also reached.
    Ok,
    /// The time budget elapsed strictly before the iteration cap was reached.
    Timeout,
}

/// One candidate at the root, ranked `(visits, mean_value)` descending — grounded on the
/// original's `sorted(..., key=lambda e: (e.visits, e.value_sum/e.visits if e.visits else
/// -1e18), reverse=True)`. `q` is the wire name in the `planner.v1` schema (§6.2).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlannerTopChoice {
    pub action: Action,
    pub visits: u32,
    pub q: f64,
}

/// Planner health telemetry (spec §4.2, §6.2 `planner.v1`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannerStats {
    pub iters: u32,
    pub root_visits: u32,
    pub root_children: u32,
    pub widen_added: u32,
    pub depth_max: u32,
    /// `depth_sum / depth_count`; `0.0` when `depth_count == 0` (§4.2 stat invariants).
    pub depth_mean: f64,
    pub budget_ms: f64,
    pub time_used_ms: f64,
    /// Mean value of the chosen root edge, or `0.0` when there is no chosen edge.
    pub value_est: f64,
    /// The configured `top_k` this call was asked to report.
    pub top_k: u32,
}

/// What a `PlanAction` node hands back to the blackboard (spec §4.2, §4.4).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannerResult {
    pub status: PlannerStatus,
    pub best_action: Action,
    /// Fraction of root visits the chosen action accounts for (spec GLOSSARY: Confidence).
    pub confidence: f64,
    pub top_choices: Vec<PlannerTopChoice>,
    pub stats: PlannerStats,
}
