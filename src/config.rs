use serde::{Deserialize, Serialize};

use crate::action::Action;
use crate::error::ConfigError;

/// Constant-over-a-run planner parameters (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlannerConfig {
    pub budget_ms: f64,
    pub iters_max: u32,
    pub max_depth: u32,
    pub gamma: f64,
    pub c_ucb: f64,
    pub pw_k: f64,
    pub pw_alpha: f64,
    pub dt: f64,
    pub max_speed: f64,
    pub max_steer_rad: f64,
    pub wheel_base: f64,
    pub collision_margin: f64,
    pub top_k: u32,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            budget_ms: 20.0,
            iters_max: 1200,
            max_depth: 18,
            gamma: 0.96,
            c_ucb: 1.2,
            pw_k: 2.0,
            pw_alpha: 0.5,
            dt: 0.10,
            max_speed: 8.0,
            max_steer_rad: 0.55,
            wheel_base: 0.35,
            collision_margin: 0.45,
            top_k: 5,
        }
    }
}

impl PlannerConfig {
    /// Validate the configuration error kinds listed in spec §7. `budget_ms` of `0.0` or
    /// `f64::INFINITY` are both legal (they select the no-action and iteration-only-bound
    /// regimes respectively, per §8 scenarios 3 and 5); only non-positive-and-finite-checked
    /// invariants are rejected here.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.budget_ms < 0.0 {
            return Err(ConfigError::NonPositiveBudget(self.budget_ms));
        }
        if !(self.gamma > 0.0 && self.gamma <= 1.0) {
            return Err(ConfigError::GammaOutOfRange(self.gamma));
        }
        if !(self.pw_alpha > 0.0 && self.pw_alpha <= 1.0) {
            return Err(ConfigError::PwAlphaOutOfRange(self.pw_alpha));
        }
        if self.wheel_base <= 0.0 {
            return Err(ConfigError::NonPositiveWheelBase(self.wheel_base));
        }
        if self.top_k < 1 {
            return Err(ConfigError::ZeroTopK(self.top_k));
        }
        if self.c_ucb <= 0.0 {
            return Err(ConfigError::NonPositiveCUcb(self.c_ucb));
        }
        if self.pw_k <= 0.0 {
            return Err(ConfigError::NonPositivePwK(self.pw_k));
        }
        Ok(())
    }
}

/// Tick-loop configuration (spec §4.5).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    pub tick_hz: f64,
    pub max_ticks: u32,
    pub steps_per_tick: u32,
    pub safe_action: Action,
}

impl RuntimeConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_hz <= 0.0 {
            return Err(ConfigError::NonPositiveTickHz(self.tick_hz));
        }
        if self.steps_per_tick < 1 {
            return Err(ConfigError::ZeroStepsPerTick(self.steps_per_tick));
        }
        Ok(())
    }

    /// `budget_ms <= 1000/tick_hz - headroom_ms`, the startup assertion §4.5 suggests
    /// implementers make (not itself a `ConfigError` — callers opt in to the check).
    pub fn planner_budget_fits(&self, planner_budget_ms: f64, headroom_ms: f64) -> bool {
        planner_budget_ms <= (1000.0 / self.tick_hz) - headroom_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(PlannerConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_gamma_out_of_range() {
        let mut cfg = PlannerConfig::default();
        cfg.gamma = 0.0;
        assert_eq!(cfg.validate(), Err(ConfigError::GammaOutOfRange(0.0)));
        cfg.gamma = 1.5;
        assert_eq!(cfg.validate(), Err(ConfigError::GammaOutOfRange(1.5)));
    }

    #[test]
    fn rejects_non_positive_wheel_base() {
        let mut cfg = PlannerConfig::default();
        cfg.wheel_base = 0.0;
        assert_eq!(cfg.validate(), Err(ConfigError::NonPositiveWheelBase(0.0)));
    }

    #[test]
    fn zero_and_infinite_budget_are_legal() {
        let mut cfg = PlannerConfig::default();
        cfg.budget_ms = 0.0;
        assert!(cfg.validate().is_ok());
        cfg.budget_ms = f64::INFINITY;
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn runtime_config_rejects_non_positive_tick_hz() {
        let cfg = RuntimeConfig {
            tick_hz: 0.0,
            max_ticks: 10,
            steps_per_tick: 1,
            safe_action: Action::zero(),
        };
        assert_eq!(cfg.validate(), Err(ConfigError::NonPositiveTickHz(0.0)));
    }
}
