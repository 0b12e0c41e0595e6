//! Deterministic RNG plumbing. The planner and the demo adapter each hold their own
//! `StdRng` instance, seeded explicitly by the caller — no global/thread-local singleton
//! (spec Design Notes §9, grounded on the teacher's explicit-seed pattern in `rrt/sst.rs`).

use rand::distributions::Uniform;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::action::Action;

/// Samples candidate actions for progressive-widening expansion (spec §4.2).
pub struct ActionRng {
    rng: StdRng,
    steering: Uniform<f64>,
    throttle: Uniform<f64>,
}

impl ActionRng {
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            steering: Uniform::new_inclusive(-1.0, 1.0),
            throttle: Uniform::new_inclusive(0.15, 1.0),
        }
    }

    /// Draw a candidate widening action: `steering ~ U(-1,1)`, `throttle ~ U(0.15,1.0)`
    /// (spec §4.2 "widen").
    pub fn sample_action(&mut self) -> Action {
        Action::new(self.rng.sample(self.steering), self.rng.sample(self.throttle))
    }

    pub fn underlying(&mut self) -> &mut StdRng {
        &mut self.rng
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_reproduces_same_sequence() {
        let mut a = ActionRng::from_seed(7);
        let mut b = ActionRng::from_seed(7);
        for _ in 0..20 {
            assert_eq!(a.sample_action(), b.sample_action());
        }
    }

    #[test]
    fn sampled_actions_stay_in_planner_domain() {
        let mut rng = ActionRng::from_seed(42);
        for _ in 0..200 {
            assert!(rng.sample_action().in_planner_domain());
        }
    }
}
