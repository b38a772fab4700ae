mod error;
mod frame;
mod protocol;
mod transport;

pub use error::{ProtocolError, TransportError};
pub use frame::{
    LENGTH_PREFIX_SIZE, MAX_FRAME_LEN, check_frame_len, encode_frame, read_frame, write_frame,
};
pub use protocol::{
    AiStateEvent, CombatEvent, DEFAULT_PORT, Decoded, ENVELOPE_HEADER_SIZE, EnterField,
    EnterFieldAck, EntityId, EntityKind, FieldCmd, FieldCmdType, FieldMessage, LobbyMessage,
    Login, LoginAck, Message, MessageKind, NO_ENTITY, SkillCmd, StatsEvent, decode_field,
    decode_lobby, split_envelope,
};
pub use transport::{
    CloseHandle, CloseReason, FrameTransport, POLL_BUDGET, Poll, TransportStats,
};
