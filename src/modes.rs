//! Concrete tree shapes per run mode (spec §6.3). Constants and tree shapes are grounded
//! directly on `original_source/.../run_demo.py`'s `build_bt_basic`, `build_bt_obstacle_goal`,
//! and `build_bt_planner`, carried over verbatim since they are the documented behavior of
//! each mode rather than free design choices.

use serde::{Deserialize, Serialize};

use crate::action::Action;
use crate::blackboard::TickContext;
use crate::bt::node::{BtNode, Status};
use crate::config::PlannerConfig;
use crate::geometry::{clamp, wrap_angle};
use crate::model::GOAL_RADIUS;

/// Run mode (spec §6.3). `manual` is intentionally absent: it is adapter-driven and never
/// invokes the BT at all, so there is no tree for `Runtime`/`Executor` to run in that mode —
/// it lives entirely in the out-of-scope adapter (spec §1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mode {
    #[serde(rename = "bt_basic")]
    Basic,
    #[serde(rename = "bt_obstacles")]
    Obstacles,
    #[serde(rename = "bt_planner")]
    Planner,
}

/// `bt_basic`'s constant action (spec §8 scenario 1, original's `constant_throttle`).
const BASIC_CONSTANT_ACTION: Action = Action {
    steering: 0.0,
    throttle: 0.45,
};

fn apply_constant_drive(ctx: &mut TickContext) -> Status {
    ctx.blackboard.chosen_action = BASIC_CONSTANT_ACTION;
    Status::Success
}

/// `bt_basic` (spec §6.3): a single `ActionNode` writing a constant action — open-loop, no
/// goal or obstacle awareness at all.
pub fn build_bt_basic() -> BtNode {
    BtNode::Action {
        name: "apply_constant_drive",
        run: apply_constant_drive,
    }
}

/// Shared `CollisionImminent?` predicate (spec §6.3, §6.1): reads the precomputed blackboard
/// field rather than recomputing it from raw obstacle geometry — the runtime is the single
/// place that derives it from the ray fan (spec §6.1: "must be derived from rays").
fn collision_imminent(ctx: &TickContext) -> bool {
    ctx.blackboard.collision_imminent
}

/// Steer away from the tighter side using left/right ray clearance, and slow down near an
/// obstacle; fails (and zeroes the action) if the adapter supplied no ray fan (grounded on
/// the original's `avoid_obstacle`, which does the same on missing/mismatched ray data).
fn avoid_obstacle(ctx: &mut TickContext, steer_mag: f64, throttle_near: f64, throttle_far: f64, near_thresh: f64) -> Status {
    let (distances, angles) = match (ctx.blackboard.ray_distances, ctx.blackboard.ray_angles_deg) {
        (Some(d), Some(a)) => (d, a),
        _ => {
            ctx.blackboard.chosen_action = Action::zero();
            return Status::Failure;
        }
    };
    let left_clearance: f64 = distances.iter().zip(angles.iter()).filter(|(_, a)| **a > 0.0).map(|(d, _)| d).sum();
    let right_clearance: f64 = distances.iter().zip(angles.iter()).filter(|(_, a)| **a < 0.0).map(|(d, _)| d).sum();
    let steer = if left_clearance >= right_clearance { steer_mag } else { -steer_mag };
    let min_dist = distances.iter().copied().fold(f64::INFINITY, f64::min);
    let throttle = if min_dist < near_thresh { throttle_near } else { throttle_far };
    ctx.blackboard.chosen_action = Action::new(steer, throttle);
    Status::Success
}

const OBSTACLES_STEER_MAG: f64 = 0.7;
const OBSTACLES_THROTTLE_NEAR: f64 = 0.15;
const OBSTACLES_THROTTLE_FAR: f64 = 0.30;
const OBSTACLES_NEAR_THRESH: f64 = 0.70;

fn avoid_obstacle_basic(ctx: &mut TickContext) -> Status {
    avoid_obstacle(ctx, OBSTACLES_STEER_MAG, OBSTACLES_THROTTLE_NEAR, OBSTACLES_THROTTLE_FAR, OBSTACLES_NEAR_THRESH)
}

/// `drive_to_goal` (spec §6.3, original's `drive_to_goal`): straight-line pursuit that slows
/// to a stop inside the goal radius.
fn drive_to_goal(ctx: &mut TickContext) -> Status {
    let dx = ctx.blackboard.goal.x - ctx.blackboard.state.x;
    let dy = ctx.blackboard.goal.y - ctx.blackboard.state.y;
    let distance = (dx * dx + dy * dy).sqrt();
    let desired_yaw = dy.atan2(dx);
    let heading_error = wrap_angle(desired_yaw - ctx.blackboard.state.yaw);
    let steering = clamp(1.4 * heading_error, -1.0, 1.0);
    let throttle = if distance < GOAL_RADIUS {
        0.0
    } else {
        clamp(0.25 + 0.25 * distance, 0.0, 0.75)
    };
    ctx.blackboard.chosen_action = Action::new(steering, throttle);
    Status::Success
}

/// `bt_obstacles` (spec §6.3, §8 scenario 2):
/// `Selector( Sequence(Condition:collision_imminent, Action:avoid_obstacle), Sequence(Action:drive_to_goal) )`.
pub fn build_bt_obstacle_goal() -> BtNode {
    BtNode::Selector {
        name: "root_selector",
        children: vec![
            BtNode::Sequence {
                name: "avoid_branch",
                children: vec![
                    BtNode::Condition {
                        name: "collision_imminent",
                        predicate: collision_imminent,
                    },
                    BtNode::Action {
                        name: "avoid_obstacle",
                        run: avoid_obstacle_basic,
                    },
                ],
            },
            BtNode::Sequence {
                name: "goal_branch",
                children: vec![BtNode::Action {
                    name: "drive_to_goal",
                    run: drive_to_goal,
                }],
            },
        ],
    }
}

const PLANNER_STEER_MAG: f64 = 0.8;
const PLANNER_THROTTLE_NEAR: f64 = 0.12;
const PLANNER_THROTTLE_FAR: f64 = 0.30;
const PLANNER_NEAR_THRESH: f64 = 0.80;

fn avoid_obstacle_planner(ctx: &mut TickContext) -> Status {
    avoid_obstacle(ctx, PLANNER_STEER_MAG, PLANNER_THROTTLE_NEAR, PLANNER_THROTTLE_FAR, PLANNER_NEAR_THRESH)
}

/// Trivial confirmation step after `PlanAction` (original's `apply_planned_action`): by the
/// time this runs, the `Sequence` already required `PlanAction` to succeed, so an action is
/// always present on the blackboard.
fn apply_action(ctx: &mut TickContext) -> Status {
    let _ = ctx;
    Status::Success
}

/// `bt_planner` (spec §6.3, §8 scenario 6):
/// `Selector( Sequence(Condition:collision_imminent, Action:avoid_obstacle), Sequence(PlanAction, Action:apply_action) )`.
pub fn build_bt_planner(planner_config: PlannerConfig, seed: u64) -> BtNode {
    BtNode::Selector {
        name: "root_selector",
        children: vec![
            BtNode::Sequence {
                name: "avoid_branch",
                children: vec![
                    BtNode::Condition {
                        name: "collision_imminent",
                        predicate: collision_imminent,
                    },
                    BtNode::Action {
                        name: "avoid_obstacle",
                        run: avoid_obstacle_planner,
                    },
                ],
            },
            BtNode::Sequence {
                name: "planner_branch",
                children: vec![
                    BtNode::PlanAction {
                        name: "plan_to_goal",
                        planner_config,
                        seed,
                    },
                    BtNode::Action {
                        name: "apply_action",
                        run: apply_action,
                    },
                ],
            },
        ],
    }
}

pub fn build(mode: Mode, planner_config: PlannerConfig, seed: u64) -> BtNode {
    match mode {
        Mode::Basic => build_bt_basic(),
        Mode::Obstacles => build_bt_obstacle_goal(),
        Mode::Planner => build_bt_planner(planner_config, seed),
    }
}
