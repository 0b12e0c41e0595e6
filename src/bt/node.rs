//! Behavior tree node shapes (spec §6). A tagged `enum` replaces the
//! trait-object/inheritance hierarchy the `ai-bt` example uses (`Box<dyn BtNode<W>>`) —
//! Design Notes §9 calls that out explicitly; see DESIGN.md.

use serde::{Deserialize, Serialize};

use crate::action::Action;
use crate::blackboard::TickContext;
use crate::config::PlannerConfig;
use crate::planner::Planner;

/// Wire tokens are the lowercase strings spec §3/§8 use (`success`/`failure`/`running`,
/// the original's `Status` values).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Failure,
    Running,
}

/// A leaf predicate over the blackboard; never mutates it.
pub type ConditionFn = fn(&TickContext) -> bool;

/// A leaf effect: mutates the blackboard (typically `chosen_action`) and reports its own
/// status (spec §4.3: "Action(name, effect): invokes effect(ctx) -> status. Effect may
/// mutate the blackboard"); unlike `Condition`, the effect itself decides success/failure.
pub type ActionFn = fn(&mut TickContext) -> Status;

pub enum BtNode {
    Sequence {
        name: &'static str,
        children: Vec<BtNode>,
    },
    Selector {
        name: &'static str,
        children: Vec<BtNode>,
    },
    Condition {
        name: &'static str,
        predicate: ConditionFn,
    },
    Action {
        name: &'static str,
        run: ActionFn,
    },
    /// Invokes the MCTS planner and writes its chosen action plus the full result onto the
    /// blackboard (spec §6, §4.4).
    PlanAction {
        name: &'static str,
        planner_config: PlannerConfig,
        seed: u64,
    },
}

impl BtNode {
    /// Tick this node, recording its name and resulting status into `ctx` (spec §4.3: "every
    /// node, immediately before returning, records itself into ctx.visited_nodes ... and
    /// writes ctx.node_status[name]") — composites record themselves too, after whichever
    /// child decided the outcome.
    pub fn tick(&self, ctx: &mut TickContext) -> Status {
        match self {
            BtNode::Sequence { name, children } => {
                for child in children {
                    let status = child.tick(ctx);
                    if status != Status::Success {
                        ctx.record(name, status);
                        return status;
                    }
                }
                ctx.record(name, Status::Success);
                Status::Success
            }
            BtNode::Selector { name, children } => {
                for child in children {
                    let status = child.tick(ctx);
                    if status != Status::Failure {
                        ctx.record(name, status);
                        return status;
                    }
                }
                ctx.record(name, Status::Failure);
                Status::Failure
            }
            BtNode::Condition { name, predicate } => {
                let status = if predicate(ctx) { Status::Success } else { Status::Failure };
                ctx.record(name, status);
                status
            }
            BtNode::Action { name, run } => {
                let status = run(ctx);
                ctx.record(name, status);
                status
            }
            BtNode::PlanAction {
                name,
                planner_config,
                seed,
            } => {
                let mut planner = Planner::new(*planner_config, *seed);
                let result = planner.plan(
                    ctx.blackboard.state,
                    ctx.blackboard.goal,
                    &ctx.blackboard.obstacles,
                );
                let is_no_action = matches!(result.status, crate::planner::PlannerStatus::NoAction);
                ctx.blackboard.chosen_action = result.best_action;
                ctx.blackboard.last_plan = Some(result);
                let status = if is_no_action { Status::Failure } else { Status::Success };
                ctx.record(name, status);
                status
            }
        }
    }
}
