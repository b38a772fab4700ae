use serde::{Deserialize, Serialize};

/// Local behavior category derived from the server's AI-state code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BehaviorCategory {
    Idle,
    Patrol,
    /// Moving toward something: plain moves and chases.
    Move,
    Attack,
    Return,
    Dead,
}

impl BehaviorCategory {
    /// Network AI-state table: 0 idle, 1 patrol, 2 chase, 3 attack,
    /// 4 return, 5 dead.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Idle),
            1 => Some(Self::Patrol),
            2 => Some(Self::Move),
            3 => Some(Self::Attack),
            4 => Some(Self::Return),
            5 => Some(Self::Dead),
            _ => None,
        }
    }

    pub fn code(self) -> u8 {
        match self {
            Self::Idle => 0,
            Self::Patrol => 1,
            Self::Move => 2,
            Self::Attack => 3,
            Self::Return => 4,
            Self::Dead => 5,
        }
    }

    pub fn is_moving(self) -> bool {
        matches!(self, Self::Patrol | Self::Move | Self::Return)
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Patrol => "patrolling",
            Self::Move => "chasing",
            Self::Attack => "attacking",
            Self::Return => "returning",
            Self::Dead => "dead",
        }
    }
}
