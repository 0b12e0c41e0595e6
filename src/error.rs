//! Error taxonomy, per-subsystem (spec §7). The planner's own degenerate-input handling
//! (`PlannerStatus::NoAction`) is never an error; these enums cover the remaining kinds:
//! fatal configuration, fatal-in-producer schema violations, and surfaced adapter failures.

use thiserror::Error;

/// Fatal, checked once at startup before a run begins.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("budget_ms must be > 0, got {0}")]
    NonPositiveBudget(f64),
    #[error("gamma must be in (0,1], got {0}")]
    GammaOutOfRange(f64),
    #[error("pw_alpha must be in (0,1], got {0}")]
    PwAlphaOutOfRange(f64),
    #[error("wheel_base must be > 0, got {0}")]
    NonPositiveWheelBase(f64),
    #[error("tick_hz must be > 0, got {0}")]
    NonPositiveTickHz(f64),
    #[error("top_k must be >= 1, got {0}")]
    ZeroTopK(u32),
    #[error("c_ucb must be > 0, got {0}")]
    NonPositiveCUcb(f64),
    #[error("pw_k must be > 0, got {0}")]
    NonPositivePwK(f64),
    #[error("steps_per_tick must be >= 1, got {0}")]
    ZeroStepsPerTick(u32),
}

/// A telemetry record that fails schema validation; fatal in the producer (spec §7).
#[derive(Debug, Error, PartialEq)]
pub enum SchemaError {
    #[error("record missing required field `{0}`")]
    MissingField(&'static str),
    #[error("record schema_version `{found}` does not match expected `{expected}`")]
    SchemaVersionMismatch { expected: String, found: String },
    #[error("record carries unexpected top-level field `{0}`")]
    UnexpectedField(String),
    #[error("record field `{0}` is not finite (NaN/Inf)")]
    NonFiniteField(String),
}

/// Adapter failures surfaced from the tick loop (spec §7: "exceptions from the adapter
/// propagate and terminate the loop; the sink is closed in a guaranteed-release scope").
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("adapter failure: {0}")]
    Adapter(#[from] Box<dyn std::error::Error + Send + Sync>),
    #[error("telemetry schema violation: {0}")]
    Schema(#[from] SchemaError),
}
