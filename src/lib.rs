//! Reactive behavior-tree executor coupled to a bounded-time continuous-action MCTS planner
//! for a simple car-like robot. See `SPEC_FULL.md` for the full module and operation list.

pub mod action;
pub mod blackboard;
pub mod bt;
pub mod config;
pub mod error;
pub mod geometry;
pub mod model;
pub mod modes;
pub mod obstacle;
pub mod planner;
pub mod rng;
pub mod runtime;
pub mod state;
pub mod telemetry;

pub use action::Action;
pub use blackboard::{Blackboard, TickContext};
pub use bt::{BtNode, Executor, Status};
pub use config::{PlannerConfig, RuntimeConfig};
pub use error::{ConfigError, RuntimeError, SchemaError};
pub use model::{KinematicAdapter, Model};
pub use modes::Mode;
pub use obstacle::{BodyHandle, Obstacle};
pub use planner::{Planner, PlannerResult, PlannerStats, PlannerStatus, PlannerTopChoice};
pub use runtime::{RunSummary, Runtime, SimAdapter};
pub use state::CarState;
