//! Data flow between the runtime and the behavior tree (spec §5). The key set is small and
//! fixed, so a struct of typed fields stands in for the enumerated-key map Design Notes §9
//! sketches — see DESIGN.md for the rationale.

use crate::action::Action;
use crate::geometry::Point2;
use crate::obstacle::Obstacle;
use crate::planner::stats::PlannerResult;
use crate::state::CarState;

/// Everything a tick of the tree can read or write. Built fresh by the runtime each tick
/// (spec §5: "the blackboard is not carried across ticks except through fields the runtime
/// explicitly re-seeds").
#[derive(Debug, Clone)]
pub struct Blackboard {
    pub state: CarState,
    pub goal: Point2,
    pub obstacles: Vec<Obstacle>,
    /// Ray-cast distances from the fixed 7-ray fan (§11.4), `None` if the adapter doesn't supply one.
    pub ray_distances: Option<[f64; 7]>,
    /// Angles (degrees, relative to heading) paired positionally with `ray_distances`.
    pub ray_angles_deg: Option<[f64; 7]>,
    /// Precomputed once per tick by the runtime from the adapter's own ray sense (spec §6.1:
    /// "must be derived from rays"); BT leaves read this rather than recomputing it themselves.
    pub collision_imminent: bool,
    /// Action actions nodes write; the runtime reads this after the tick completes.
    pub chosen_action: Action,
    /// Set by a `PlanAction` node that ran the planner this tick.
    pub last_plan: Option<PlannerResult>,
}

impl Blackboard {
    pub fn new(state: CarState, goal: Point2, obstacles: Vec<Obstacle>) -> Self {
        Self {
            state,
            goal,
            obstacles,
            ray_distances: None,
            ray_angles_deg: None,
            collision_imminent: false,
            chosen_action: Action::zero(),
            last_plan: None,
        }
    }
}

/// Per-tick execution context: the blackboard plus the bookkeeping the executor records as
/// it walks the tree (spec §5, §6: "every ticked node's name and resulting status").
#[derive(Debug, Clone)]
pub struct TickContext {
    pub blackboard: Blackboard,
    pub visited_nodes: Vec<String>,
    pub node_status: Vec<(String, crate::bt::node::Status)>,
}

impl TickContext {
    pub fn new(blackboard: Blackboard) -> Self {
        Self {
            blackboard,
            visited_nodes: Vec::new(),
            node_status: Vec::new(),
        }
    }

    pub fn record(&mut self, name: &str, status: crate::bt::node::Status) {
        self.visited_nodes.push(name.to_string());
        self.node_status.push((name.to_string(), status));
    }
}
