pub mod arena;
pub mod mcts;
pub mod stats;

pub use mcts::Planner;
pub use stats::{PlannerResult, PlannerStats, PlannerStatus, PlannerTopChoice};
