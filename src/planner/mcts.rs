//! Continuous-action MCTS planner (spec §4.2). Tree structure and logging idiom are
//! grounded on the teacher's `SST::solve` in `rrt/sst.rs`; the selection/expansion/backup
//! algorithm itself is grounded on `original_source/.../run_demo.py`'s
//! `ContinuousMctsPlanner`.

use std::time::Instant;

use log::debug;

use crate::action::Action;
use crate::config::PlannerConfig;
use crate::geometry::Point2;
use crate::model::Model;
use crate::obstacle::Obstacle;
use crate::planner::arena::{NodeId, Tree};
use crate::planner::stats::{PlannerResult, PlannerStats, PlannerStatus, PlannerTopChoice};
use crate::rng::ActionRng;
use crate::state::CarState;

pub struct Planner {
    cfg: PlannerConfig,
    model: Model,
    rng: ActionRng,
}

/// Accumulated across every `simulate` call in one `plan()` invocation.
#[derive(Default)]
struct IterStats {
    widen_added: u32,
    depth_max: u32,
    depth_sum: u64,
    depth_count: u32,
}

impl Planner {
    pub fn new(cfg: PlannerConfig, seed: u64) -> Self {
        let model = Model::from_config(&cfg);
        Self {
            cfg,
            model,
            rng: ActionRng::from_seed(seed),
        }
    }

    /// Run one bounded-time/bounded-iteration search from `root_state` (spec §4.2, §4.3).
    pub fn plan(&mut self, root_state: CarState, goal: Point2, obstacles: &[Obstacle]) -> PlannerResult {
        let root_terminal = self.model.is_collision(&root_state, obstacles) || Model::is_goal(&root_state, goal);
        let start = Instant::now();
        let mut tree = Tree::new(root_state);
        let mut iters = 0u32;
        let mut acc = IterStats::default();

        // A terminal root never widens (spec §3), so every iteration would be a no-op;
        // skip the loop entirely rather than burn `iters_max` trivial calls.
        if !root_terminal {
            loop {
                let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
                if elapsed_ms >= self.cfg.budget_ms {
                    break;
                }
                if iters >= self.cfg.iters_max {
                    break;
                }
                self.simulate(&mut tree, Tree::ROOT, 0, goal, obstacles, &mut acc);
                iters += 1;
            }
        }

        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
        let root = tree.node(Tree::ROOT);
        let root_children = root.children.len() as u32;
        let root_visits = root.visits;
        let depth_mean = if acc.depth_count > 0 {
            acc.depth_sum as f64 / acc.depth_count as f64
        } else {
            0.0
        };

        let stats = PlannerStats {
            iters,
            root_visits,
            root_children,
            widen_added: acc.widen_added,
            depth_max: acc.depth_max,
            depth_mean,
            budget_ms: self.cfg.budget_ms,
            time_used_ms: elapsed_ms,
            value_est: 0.0,
            top_k: self.cfg.top_k,
        };

        // spec §4.2 point 3: "if root has no children, emit status=noaction with a zero
        // action and zero confidence" — true both for a terminal root and for a budget/
        // iteration cap of zero on an otherwise live root (spec §8 scenario 5).
        if root_children == 0 {
            debug!("planner: no root children after {} iters, status=NoAction", iters);
            return PlannerResult {
                status: PlannerStatus::NoAction,
                best_action: Action::zero(),
                confidence: 0.0,
                top_choices: Vec::new(),
                stats,
            };
        }

        let top_choices = self.top_choices(&tree);
        let best = top_choices[0];
        let confidence = best.visits as f64 / (root_visits.max(1) as f64);
        let status = if iters < self.cfg.iters_max && elapsed_ms >= self.cfg.budget_ms {
            PlannerStatus::Timeout
        } else {
            PlannerStatus::Ok
        };

        let mut stats = stats;
        stats.value_est = best.q;

        debug!(
            "planner: {} iters in {:.2}ms, root_children={}, status={:?}",
            iters, elapsed_ms, root_children, status
        );

        PlannerResult {
            status,
            best_action: best.action,
            confidence,
            top_choices,
            stats,
        }
    }

    /// One `simulate(node, depth)` call (spec §4.2): widen-or-select, recurse, then back up
    /// the discounted return through this node and the edge that led into its child.
    fn simulate(
        &mut self,
        tree: &mut Tree,
        node: NodeId,
        depth: u32,
        goal: Point2,
        obstacles: &[Obstacle],
        acc: &mut IterStats,
    ) -> f64 {
        if depth >= self.cfg.max_depth || tree.node(node).terminal {
            acc.depth_max = acc.depth_max.max(depth);
            acc.depth_sum += depth as u64;
            acc.depth_count += 1;
            return 0.0;
        }

        let child = if self.should_widen(tree, node) {
            acc.widen_added += 1;
            self.widen(tree, node, goal, obstacles)
        } else {
            self.select_ucb(tree, node)
        };

        let done = tree.edge(node, child).expect("child always has an edge").done;
        let continuation = if done {
            0.0
        } else {
            self.simulate(tree, child, depth + 1, goal, obstacles, acc)
        };

        let reward = tree.edge(node, child).expect("child always has an edge").reward;
        let total = reward + self.cfg.gamma * continuation;
        tree.record_node_visit(node, total);
        tree.record_edge_visit(node, child, total);
        total
    }

    /// Progressive widening: allow a new child once `pw_k * max(1, visits)^pw_alpha` exceeds
    /// the current child count (spec §3, §4.2).
    fn should_widen(&self, tree: &Tree, node: NodeId) -> bool {
        let n = tree.node(node);
        (n.children.len() as u32) < self.widen_cap(n.visits)
    }

    fn widen_cap(&self, visits: u32) -> u32 {
        let cap = (self.cfg.pw_k * (visits.max(1) as f64).powf(self.cfg.pw_alpha)).floor();
        (cap as u32).max(1)
    }

    /// Sample a fresh action, step the model, and append a new child (spec §4.2 "widen").
    fn widen(&mut self, tree: &mut Tree, parent: NodeId, goal: Point2, obstacles: &[Obstacle]) -> NodeId {
        let action = self.rng.sample_action();
        let parent_state = tree.node(parent).state;
        let (next_state, reward, done) = self.model.step(&parent_state, action, goal, obstacles);
        tree.add_child(parent, next_state, action, reward, done)
    }

    /// UCB1 over existing children, grounded on the original's `_select_ucb`. Any edge with
    /// zero visits is selected immediately (spec §4.2).
    fn select_ucb(&self, tree: &Tree, node: NodeId) -> NodeId {
        let parent_visits = tree.node(node).visits.max(1) as f64;
        let children = &tree.node(node).children;
        if let Some(&unvisited) = children
            .iter()
            .find(|&&c| tree.edge(node, c).map(|e| e.visits == 0).unwrap_or(false))
        {
            return unvisited;
        }
        children
            .iter()
            .copied()
            .max_by(|&a, &b| {
                self.ucb_score(tree, node, a, parent_visits)
                    .partial_cmp(&self.ucb_score(tree, node, b, parent_visits))
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .expect("select_ucb called on a node with no children")
    }

    fn ucb_score(&self, tree: &Tree, parent: NodeId, child: NodeId, parent_visits: f64) -> f64 {
        let edge = tree.edge(parent, child).expect("child always has an edge");
        let exploit = edge.mean_value();
        let explore = self.cfg.c_ucb * (parent_visits.ln() / edge.visits as f64).sqrt();
        exploit + explore
    }

    /// Root children ranked `(visits, mean_value)` descending, truncated to `top_k`
    /// (spec §4.2 point 3).
    fn top_choices(&self, tree: &Tree) -> Vec<PlannerTopChoice> {
        let mut choices: Vec<PlannerTopChoice> = tree
            .node(Tree::ROOT)
            .children
            .iter()
            .map(|&id| {
                let edge = tree.edge(Tree::ROOT, id).expect("root child always has an edge");
                PlannerTopChoice {
                    action: edge.action,
                    visits: edge.visits,
                    q: edge.mean_value(),
                }
            })
            .collect();
        choices.sort_by(|a, b| {
            b.visits
                .cmp(&a.visits)
                .then_with(|| b.q.partial_cmp(&a.q).unwrap_or(std::cmp::Ordering::Equal))
        });
        choices.truncate(self.cfg.top_k as usize);
        choices
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn returns_no_action_when_root_already_at_goal() {
        let cfg = PlannerConfig::default();
        let mut planner = Planner::new(cfg, 1);
        let result = planner.plan(CarState::new(0.0, 0.0, 0.0, 0.0), Point2::new(0.1, 0.0), &[]);
        assert_eq!(result.status, PlannerStatus::NoAction);
        assert_eq!(result.confidence, 0.0);
        assert!(result.top_choices.is_empty());
        assert_eq!(result.stats.root_children, 0);
    }

    #[test]
    fn deterministic_for_a_fixed_seed() {
        let cfg = PlannerConfig::default();
        let goal = Point2::new(5.0, 2.0);
        let mut p1 = Planner::new(cfg, 99);
        let mut p2 = Planner::new(cfg, 99);
        let start = CarState::new(0.0, 0.0, 0.0, 0.0);
        let r1 = p1.plan(start, goal, &[]);
        let r2 = p2.plan(start, goal, &[]);
        assert_eq!(r1.best_action, r2.best_action);
        assert_eq!(r1.stats.iters, r2.stats.iters);
        assert_eq!(r1.top_choices, r2.top_choices);
    }

    #[test]
    fn infinite_budget_stops_at_iteration_cap() {
        let mut cfg = PlannerConfig::default();
        cfg.budget_ms = f64::INFINITY;
        cfg.iters_max = 50;
        let mut planner = Planner::new(cfg, 5);
        let result = planner.plan(CarState::new(0.0, 0.0, 0.0, 0.0), Point2::new(5.0, 0.0), &[]);
        assert_eq!(result.stats.iters, 50);
        assert_eq!(result.status, PlannerStatus::Ok);
    }

    #[test]
    fn zero_budget_and_zero_iters_is_no_action() {
        let mut cfg = PlannerConfig::default();
        cfg.budget_ms = 0.0;
        cfg.iters_max = 0;
        let mut planner = Planner::new(cfg, 3);
        let result = planner.plan(CarState::new(0.0, 0.0, 0.0, 0.0), Point2::new(5.0, 0.0), &[]);
        assert_eq!(result.status, PlannerStatus::NoAction);
        assert_eq!(result.best_action, Action::zero());
        assert_eq!(result.confidence, 0.0);
        assert!(result.top_choices.is_empty());
        assert_eq!(result.stats.iters, 0);
    }

    #[test]
    fn root_visits_equals_iterations_run() {
        let mut cfg = PlannerConfig::default();
        cfg.budget_ms = f64::INFINITY;
        cfg.iters_max = 200;
        let mut planner = Planner::new(cfg, 11);
        let result = planner.plan(CarState::new(0.0, 0.0, 0.0, 0.0), Point2::new(6.0, 1.0), &[]);
        assert_eq!(result.stats.root_visits, result.stats.iters);
    }

    #[test]
    fn widen_added_equals_root_children_when_max_depth_is_one() {
        let mut cfg = PlannerConfig::default();
        cfg.budget_ms = f64::INFINITY;
        cfg.iters_max = 40;
        cfg.max_depth = 1;
        let mut planner = Planner::new(cfg, 4);
        let result = planner.plan(CarState::new(0.0, 0.0, 0.0, 0.0), Point2::new(6.0, 1.0), &[]);
        assert_eq!(result.stats.widen_added, result.stats.root_children);
    }

    #[test]
    fn root_children_never_exceed_the_progressive_widening_bound() {
        let mut cfg = PlannerConfig::default();
        cfg.budget_ms = f64::INFINITY;
        cfg.iters_max = 300;
        let mut planner = Planner::new(cfg, 17);
        let result = planner.plan(CarState::new(0.0, 0.0, 0.0, 0.0), Point2::new(6.0, 1.0), &[]);
        let bound = (cfg.pw_k * (result.stats.root_visits.max(1) as f64).powf(cfg.pw_alpha))
            .floor()
            .max(1.0) as u32;
        assert!(result.stats.root_children <= bound);
    }

    #[test]
    fn top_choices_sorted_by_visits_then_mean_value_descending() {
        let mut cfg = PlannerConfig::default();
        cfg.budget_ms = f64::INFINITY;
        cfg.iters_max = 150;
        let mut planner = Planner::new(cfg, 11);
        let result = planner.plan(CarState::new(0.0, 0.0, 0.0, 0.0), Point2::new(6.0, 1.0), &[]);
        for pair in result.top_choices.windows(2) {
            assert!(pair[0].visits >= pair[1].visits);
        }
        assert!(result.top_choices.len() as u32 <= cfg.top_k);
    }

    #[test]
    fn confidence_and_actions_stay_in_bounds() {
        let mut cfg = PlannerConfig::default();
        cfg.budget_ms = f64::INFINITY;
        cfg.iters_max = 150;
        let mut planner = Planner::new(cfg, 23);
        let result = planner.plan(CarState::new(0.0, 0.0, 0.0, 0.0), Point2::new(6.0, 1.0), &[]);
        assert!(result.confidence >= 0.0 && result.confidence <= 1.0);
        assert!(result.best_action.in_planner_domain());
    }
}
