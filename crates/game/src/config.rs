use serde::{Deserialize, Serialize};

use crate::movement::ReconcilerConfig;
use crate::net::DEFAULT_PORT;

pub const DEFAULT_PLAYER_TEMPLATE: &str = "Player/PaladinTemplate";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub host: String,
    pub port: u16,
    pub user_id: String,
    pub token: String,
    /// Field to enter after login; `None` uses the one the server assigns.
    pub field_id: Option<u32>,
    pub player_template: String,
    /// Used for monsters whose Enter carries no template and none was
    /// learned earlier. `None` defers such Enters.
    pub fallback_monster_template: Option<String>,
    pub reconciler: ReconcilerConfig,
    pub combat: CombatConfig,
    pub input: InputConfig,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            user_id: "guest".to_string(),
            token: String::new(),
            field_id: None,
            player_template: DEFAULT_PLAYER_TEMPLATE.to_string(),
            fallback_monster_template: None,
            reconciler: ReconcilerConfig::default(),
            combat: CombatConfig::default(),
            input: InputConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatConfig {
    /// Minimum time between facing corrections for one attacker.
    pub facing_interval_secs: f32,
    /// Fraction of the remaining turn applied per correction.
    pub facing_blend: f32,
    /// Radius searched for an attack target around the local player.
    pub pick_range: f32,
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self {
            facing_interval_secs: 0.1,
            facing_blend: 0.35,
            pick_range: 2.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    pub stop_timeout_secs: f32,
    pub resend_interval_secs: f32,
    pub direction_change_sq: f32,
    pub dead_zone_sq: f32,
    /// Own-position change that counts as "still moving".
    pub motion_epsilon_sq: f32,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            stop_timeout_secs: 0.25,
            resend_interval_secs: 0.1,
            direction_change_sq: 0.001,
            dead_zone_sq: 0.01,
            motion_epsilon_sq: 0.0001,
        }
    }
}
