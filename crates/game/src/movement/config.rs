use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcilerConfig {
    /// Horizontal smoothing time constant in seconds.
    pub smooth_time: f32,
    /// Horizontal corrections longer than this are warped, not smoothed.
    pub snap_distance: f32,
    /// Height kept between the feet and the sampled ground.
    pub ground_offset: f32,

    pub gravity: f32,
    pub max_fall_speed: f32,
    /// Vertical velocity held while grounded.
    pub grounded_bias: f32,
    pub grounded_tolerance: f32,

    /// Degrees per second.
    pub turn_rate: f32,
    pub min_turn_delta_sq: f32,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            smooth_time: 0.08,
            snap_distance: 3.0,
            ground_offset: 0.05,

            gravity: -25.0,
            max_fall_speed: -60.0,
            grounded_bias: -1.0,
            grounded_tolerance: 0.01,

            turn_rate: 720.0,
            min_turn_delta_sq: 0.000_001,
        }
    }
}
