use crate::net::{EntityId, EntityKind, MessageKind};
use crate::session::SessionState;

/// Message-local failures: the message is logged and dropped, processing
/// continues with the next one.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SyncError {
    #[error("{op}: no active {kind:?} {id}")]
    Reference {
        op: &'static str,
        kind: EntityKind,
        id: EntityId,
    },
    #[error("{kind:?} {id}: template {template:?} could not be resolved")]
    UnresolvedTemplate {
        kind: EntityKind,
        id: EntityId,
        template: String,
    },
    #[error("{kind:?} {id}: unknown AI state code {code}")]
    UnknownAiState {
        kind: EntityKind,
        id: EntityId,
        code: u8,
    },
    #[error("{message:?} not expected in session state {state:?}")]
    State {
        message: MessageKind,
        state: SessionState,
    },
}
