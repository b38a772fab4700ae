use crate::net::{CloseReason, EntityId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SessionState {
    #[default]
    Disconnected,
    Connecting,
    /// Socket open, login sent and not yet acknowledged.
    Connected,
    LoggedIn,
    InField,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Disconnected => "disconnected",
            SessionState::Connecting => "connecting",
            SessionState::Connected => "connected",
            SessionState::LoggedIn => "logged in",
            SessionState::InField => "in field",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Connected,
    LoggedIn {
        player_id: EntityId,
        field_id: u32,
    },
    LoginRejected {
        user_id: String,
    },
    EnteredField {
        player_id: EntityId,
        field_id: u32,
    },
    Disconnected {
        reason: CloseReason,
    },
}
