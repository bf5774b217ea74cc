// src/config.rs
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PouParams {
    /// Per-repetition multiplier applied to the reward for paying the same receiver again.
    pub decay_factor: f64,
    /// Tolerance for comparing fractional pile amounts.
    pub epsilon: f64,
}

pub const POU_PARAMS: PouParams = PouParams {
    decay_factor: 0.8,
    epsilon: 1e-9,
};

impl Default for PouParams {
    fn default() -> Self {
        POU_PARAMS
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ActorConfig {
    /// Capacity of the bounded command channel in front of a block.
    pub queue_depth: usize,
}

impl Default for ActorConfig {
    fn default() -> Self {
        Self { queue_depth: 64 }
    }
}
