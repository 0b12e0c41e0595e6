//! Pure kinematic transition model (spec §4.1): a bicycle model with no side effects.
//! `Model` only reads configuration; every call to `step` produces a brand-new `CarState`.

use crate::action::Action;
use crate::config::PlannerConfig;
use crate::geometry::{clamp, wrap_angle, Point2};
use crate::obstacle::Obstacle;
use crate::state::CarState;

/// Radius within which a state counts as "at goal" (spec §4.1 contract constant).
pub const GOAL_RADIUS: f64 = 0.6;

const CONTROL_PENALTY_WEIGHT: f64 = 0.02;
const COLLISION_PENALTY: f64 = 2.5;
const GOAL_BONUS: f64 = 1.5;
const ACCEL_GAIN: f64 = 4.0;
const SPEED_DAMPING: f64 = 1.25;
const WHEEL_BASE_EPS: f64 = 1.0e-6;

/// The subset of `PlannerConfig` the transition needs, held by value so the model can be
/// reused by both the planner's rollouts and the demo `KinematicAdapter` (§11.2).
#[derive(Debug, Clone, Copy)]
pub struct Model {
    pub dt: f64,
    pub max_speed: f64,
    pub max_steer_rad: f64,
    pub wheel_base: f64,
    pub collision_margin: f64,
}

impl Model {
    pub fn from_config(cfg: &PlannerConfig) -> Self {
        Self {
            dt: cfg.dt,
            max_speed: cfg.max_speed,
            max_steer_rad: cfg.max_steer_rad,
            wheel_base: cfg.wheel_base,
            collision_margin: cfg.collision_margin,
        }
    }

    /// `(state, action, dt) -> (state', reward, done)`.
    pub fn step(
        &self,
        state: &CarState,
        action: Action,
        goal: Point2,
        obstacles: &[Obstacle],
    ) -> (CarState, f64, bool) {
        let steering = clamp(action.steering, -1.0, 1.0);
        let throttle = clamp(action.throttle, 0.0, 1.0);

        let accel = ACCEL_GAIN * throttle - SPEED_DAMPING * state.speed;
        let speed_next = clamp(state.speed + accel * self.dt, 0.0, self.max_speed);
        let yaw_rate = if self.wheel_base.abs() > WHEEL_BASE_EPS {
            (speed_next / self.wheel_base) * (steering * self.max_steer_rad).tan()
        } else {
            0.0
        };
        let yaw_next = wrap_angle(state.yaw + yaw_rate * self.dt);
        let x_next = state.x + speed_next * yaw_next.cos() * self.dt;
        let y_next = state.y + speed_next * yaw_next.sin() * self.dt;

        let next_state = CarState::new(x_next, y_next, yaw_next, speed_next);

        let dist_before = Self::distance_to_goal(state, goal);
        let dist_after = Self::distance_to_goal(&next_state, goal);
        let progress = dist_before - dist_after;
        let control_penalty = CONTROL_PENALTY_WEIGHT * (steering * steering + throttle * throttle);
        let collision = self.is_collision(&next_state, obstacles);
        let collision_penalty = if collision { COLLISION_PENALTY } else { 0.0 };
        let goal_bonus = if dist_after < GOAL_RADIUS { GOAL_BONUS } else { 0.0 };
        let reward = progress - control_penalty - collision_penalty + goal_bonus;

        let done = collision || dist_after < GOAL_RADIUS;
        (next_state, reward, done)
    }

    pub fn distance_to_goal(state: &CarState, goal: Point2) -> f64 {
        Point2::new(state.x, state.y).distance(goal)
    }

    pub fn is_goal(state: &CarState, goal: Point2) -> bool {
        Self::distance_to_goal(state, goal) < GOAL_RADIUS
    }

    pub fn is_collision(&self, state: &CarState, obstacles: &[Obstacle]) -> bool {
        obstacles.iter().any(|o| {
            (state.x - o.center_x).abs() <= o.half_x + self.collision_margin
                && (state.y - o.center_y).abs() <= o.half_y + self.collision_margin
        })
    }
}

const RAY_FAN_COUNT: usize = 7;
/// The original's fixed ray fan, degrees relative to heading (§11.4).
pub const RAY_ANGLES_DEG: [f64; RAY_FAN_COUNT] = [-45.0, -25.0, -10.0, 0.0, 10.0, 25.0, 45.0];
const RAY_MAX_RANGE: f64 = 3.0;
/// The original's `min(rays) < 0.9` collision-imminent threshold (§11.2).
pub const COLLISION_IMMINENT_RANGE: f64 = 0.9;

/// Analytic ray-vs-AABB slab test along the fixed 7-ray fan (§11.4), used by
/// `KinematicAdapter` in place of the original's PyBullet raycast calls.
pub fn cast_rays_analytic(state: &CarState, obstacles: &[Obstacle]) -> [f64; RAY_FAN_COUNT] {
    let mut ranges = [RAY_MAX_RANGE; RAY_FAN_COUNT];
    for (i, range) in ranges.iter_mut().enumerate() {
        let angle = state.yaw + RAY_ANGLES_DEG[i].to_radians();
        let dir_x = angle.cos();
        let dir_y = angle.sin();
        let mut nearest = RAY_MAX_RANGE;
        for obstacle in obstacles {
            if let Some(dist) = ray_aabb_distance(state.x, state.y, dir_x, dir_y, obstacle) {
                nearest = nearest.min(dist);
            }
        }
        *range = nearest;
    }
    ranges
}

/// Slab-method ray/AABB intersection; returns the entry distance if the ray hits the box
/// ahead of the origin.
fn ray_aabb_distance(ox: f64, oy: f64, dx: f64, dy: f64, obstacle: &Obstacle) -> Option<f64> {
    let min_x = obstacle.center_x - obstacle.half_x;
    let max_x = obstacle.center_x + obstacle.half_x;
    let min_y = obstacle.center_y - obstacle.half_y;
    let max_y = obstacle.center_y + obstacle.half_y;

    let (mut t_min, mut t_max) = (0.0f64, RAY_MAX_RANGE);
    for (o, d, lo, hi) in [(ox, dx, min_x, max_x), (oy, dy, min_y, max_y)] {
        if d.abs() < 1.0e-12 {
            if o < lo || o > hi {
                return None;
            }
            continue;
        }
        let mut t1 = (lo - o) / d;
        let mut t2 = (hi - o) / d;
        if t1 > t2 {
            std::mem::swap(&mut t1, &mut t2);
        }
        t_min = t_min.max(t1);
        t_max = t_max.min(t2);
        if t_min > t_max {
            return None;
        }
    }
    if t_min >= 0.0 {
        Some(t_min)
    } else {
        None
    }
}

/// In-scope `SimAdapter` used by the demo binary and the integration tests (§11.2):
/// advances state with the same `Model::step` the planner rolls out, so tests can assert
/// exact behavior without a physics backend.
pub struct KinematicAdapter {
    initial_state: CarState,
    state: CarState,
    goal: Point2,
    obstacles: Vec<Obstacle>,
    model: Model,
    pending_action: Action,
    /// Incremented once per substep whose resulting state collides (§6.1: `step(n)`
    /// "accumulates collision events into its own counter"), standing in for the original's
    /// `p.getContactPoints` count.
    collisions: u32,
}

impl KinematicAdapter {
    pub fn new(state: CarState, goal: Point2, obstacles: Vec<Obstacle>, cfg: PlannerConfig) -> Self {
        Self {
            initial_state: state,
            state,
            goal,
            obstacles,
            model: Model::from_config(&cfg),
            pending_action: Action::zero(),
            collisions: 0,
        }
    }
}

impl crate::runtime::SimAdapter for KinematicAdapter {
    fn state(&self) -> CarState {
        self.state
    }

    fn goal(&self) -> Point2 {
        self.goal
    }

    fn obstacles(&self) -> &[Obstacle] {
        &self.obstacles
    }

    fn ray_ranges(&self) -> Option<[f64; 7]> {
        Some(cast_rays_analytic(&self.state, &self.obstacles))
    }

    fn collision_count(&self) -> u32 {
        self.collisions
    }

    fn apply_action(&mut self, action: Action) {
        self.pending_action = action;
    }

    fn step(&mut self, n: u32) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        for _ in 0..n {
            let (next, _reward, _done) = self.model.step(&self.state, self.pending_action, self.goal, &self.obstacles);
            if self.model.is_collision(&next, &self.obstacles) {
                self.collisions += 1;
            }
            self.state = next;
        }
        Ok(())
    }

    fn reset(&mut self) {
        self.state = self.initial_state;
        self.pending_action = Action::zero();
        self.collisions = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::obstacle::BodyHandle;
    use std::f64::consts::PI;

    fn model() -> Model {
        Model::from_config(&PlannerConfig::default())
    }

    #[test]
    fn yaw_stays_in_half_open_interval_after_many_transitions() {
        let m = model();
        let goal = Point2::new(100.0, 0.0);
        let mut state = CarState::new(0.0, 0.0, 0.0, 0.0);
        for _ in 0..500 {
            let (next, _, _) = m.step(&state, Action::new(0.8, 1.0), goal, &[]);
            assert!(next.yaw > -PI && next.yaw <= PI);
            state = next;
        }
    }

    #[test]
    fn progress_reward_matches_distance_delta_when_no_collision() {
        let m = model();
        let goal = Point2::new(5.0, 0.0);
        let state = CarState::new(0.0, 0.0, 0.0, 0.0);
        let (next, reward, _) = m.step(&state, Action::new(0.0, 1.0), goal, &[]);
        let progress = Model::distance_to_goal(&state, goal) - Model::distance_to_goal(&next, goal);
        let control_penalty = CONTROL_PENALTY_WEIGHT * (0.0 + 1.0);
        let goal_bonus = if Model::distance_to_goal(&next, goal) < GOAL_RADIUS {
            GOAL_BONUS
        } else {
            0.0
        };
        let expected = progress - control_penalty + goal_bonus;
        assert!((reward - expected).abs() < 1e-9);
    }

    #[test]
    fn collision_detected_within_margin() {
        let m = model();
        let obstacle = Obstacle::new(2.0, 0.0, 0.5, 0.5, BodyHandle(1));
        let inside = CarState::new(2.0, 0.0, 0.0, 0.0);
        assert!(m.is_collision(&inside, &[obstacle]));
        let far = CarState::new(20.0, 20.0, 0.0, 0.0);
        assert!(!m.is_collision(&far, &[obstacle]));
    }

    #[test]
    fn is_goal_uses_goal_radius() {
        let goal = Point2::new(0.0, 0.0);
        assert!(Model::is_goal(&CarState::new(0.3, 0.0, 0.0, 0.0), goal));
        assert!(!Model::is_goal(&CarState::new(0.6, 0.0, 0.0, 0.0), goal));
    }

    #[test]
    fn done_on_collision_or_goal() {
        let m = model();
        let obstacle = Obstacle::new(1.0, 0.0, 0.5, 0.5, BodyHandle(1));
        let state = CarState::new(0.5, 0.0, 0.0, 0.0);
        let (_, _, done) = m.step(&state, Action::new(0.0, 1.0), Point2::new(100.0, 0.0), &[obstacle]);
        assert!(done);
    }

    #[test]
    fn ray_ahead_of_obstacle_reports_shorter_than_max_range() {
        let state = CarState::new(0.0, 0.0, 0.0, 0.0);
        let obstacle = Obstacle::new(3.0, 0.0, 0.5, 0.5, BodyHandle(1));
        let ranges = cast_rays_analytic(&state, &[obstacle]);
        let forward = ranges[3];
        assert!(forward < RAY_MAX_RANGE);
    }

    #[test]
    fn kinematic_adapter_steps_with_the_same_model_as_the_planner() {
        use crate::runtime::SimAdapter;
        let mut adapter = KinematicAdapter::new(
            CarState::new(0.0, 0.0, 0.0, 0.0),
            Point2::new(5.0, 0.0),
            Vec::new(),
            PlannerConfig::default(),
        );
        adapter.apply_action(Action::new(0.0, 1.0));
        adapter.step(1).unwrap();
        assert!(adapter.state().x > 0.0);
    }

    #[test]
    fn kinematic_adapter_counts_collisions_and_reset_clears_them() {
        use crate::runtime::SimAdapter;
        let obstacle = Obstacle::new(0.5, 0.0, 0.5, 0.5, BodyHandle(1));
        let mut adapter = KinematicAdapter::new(
            CarState::new(0.0, 0.0, 0.0, 0.0),
            Point2::new(5.0, 0.0),
            vec![obstacle],
            PlannerConfig::default(),
        );
        adapter.apply_action(Action::new(0.0, 1.0));
        adapter.step(20).unwrap();
        assert!(adapter.collision_count() > 0);
        adapter.reset();
        assert_eq!(adapter.collision_count(), 0);
        assert_eq!(adapter.state().x, 0.0);
    }
}
