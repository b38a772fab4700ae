use glam::Vec2;
use rkyv::util::AlignedVec;
use rkyv::{Archive, Deserialize, Serialize, rancor};

use super::error::ProtocolError;

pub const DEFAULT_PORT: u16 = 9000;
pub const ENVELOPE_HEADER_SIZE: usize = 2;

pub type EntityId = u64;

/// Sentinel id meaning "no entity" on the wire and in lookups.
pub const NO_ENTITY: EntityId = 0;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Archive,
    Serialize,
    Deserialize,
    serde::Serialize,
    serde::Deserialize,
)]
#[rkyv(compare(PartialEq), derive(Debug))]
pub enum EntityKind {
    Player,
    Monster,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Archive, Serialize, Deserialize)]
#[rkyv(compare(PartialEq), derive(Debug))]
pub enum FieldCmdType {
    Enter,
    Move,
    Leave,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum MessageKind {
    Login = 1,
    LoginAck = 2,
    EnterField = 3,
    EnterFieldAck = 4,
    FieldCmd = 16,
    CombatEvent = 17,
    AiStateEvent = 18,
    StatsEvent = 19,
    SkillCmd = 20,
}

impl MessageKind {
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            1 => Some(Self::Login),
            2 => Some(Self::LoginAck),
            3 => Some(Self::EnterField),
            4 => Some(Self::EnterFieldAck),
            16 => Some(Self::FieldCmd),
            17 => Some(Self::CombatEvent),
            18 => Some(Self::AiStateEvent),
            19 => Some(Self::StatsEvent),
            20 => Some(Self::SkillCmd),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
#[rkyv(derive(Debug))]
pub struct Login {
    pub user_id: String,
    pub token: String,
}

#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
#[rkyv(derive(Debug))]
pub struct LoginAck {
    pub ok: bool,
    pub user_id: String,
    pub player_id: EntityId,
    pub default_field_id: u32,
}

#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
#[rkyv(derive(Debug))]
pub struct EnterField {
    pub field_id: u32,
}

#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
#[rkyv(derive(Debug))]
pub struct EnterFieldAck {
    pub player_id: EntityId,
    pub field_id: u32,
}

/// Enter/Move/Leave for one entity. Server to client it carries the
/// authoritative ground position; client to server a Move carries the
/// input direction in `dir`.
#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
#[rkyv(derive(Debug))]
pub struct FieldCmd {
    pub cmd: FieldCmdType,
    pub entity_kind: EntityKind,
    pub entity_id: EntityId,
    pub pos: [f32; 2],
    pub dir: [f32; 2],
    pub template: Option<String>,
}

impl FieldCmd {
    pub fn enter(kind: EntityKind, id: EntityId, pos: Vec2, template: Option<String>) -> Self {
        Self {
            cmd: FieldCmdType::Enter,
            entity_kind: kind,
            entity_id: id,
            pos: pos.into(),
            dir: [0.0; 2],
            template,
        }
    }

    pub fn moved(kind: EntityKind, id: EntityId, pos: Vec2) -> Self {
        Self {
            cmd: FieldCmdType::Move,
            entity_kind: kind,
            entity_id: id,
            pos: pos.into(),
            dir: [0.0; 2],
            template: None,
        }
    }

    pub fn leave(kind: EntityKind, id: EntityId) -> Self {
        Self {
            cmd: FieldCmdType::Leave,
            entity_kind: kind,
            entity_id: id,
            pos: [0.0; 2],
            dir: [0.0; 2],
            template: None,
        }
    }

    pub fn move_input(player_id: EntityId, dir: Vec2) -> Self {
        Self {
            cmd: FieldCmdType::Move,
            entity_kind: EntityKind::Player,
            entity_id: player_id,
            pos: [0.0; 2],
            dir: dir.into(),
            template: None,
        }
    }

    pub fn position(&self) -> Vec2 {
        Vec2::from(self.pos)
    }

    pub fn direction(&self) -> Vec2 {
        Vec2::from(self.dir)
    }
}

#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
#[rkyv(derive(Debug))]
pub struct CombatEvent {
    pub attacker_id: EntityId,
    pub attacker_kind: EntityKind,
    pub target_id: EntityId,
    pub target_kind: EntityKind,
    pub damage: i32,
    pub remaining_hp: i32,
}

#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
#[rkyv(derive(Debug))]
pub struct AiStateEvent {
    pub entity_id: EntityId,
    pub entity_kind: EntityKind,
    pub state: u8,
}

#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
#[rkyv(derive(Debug))]
pub struct StatsEvent {
    pub entity_id: EntityId,
    pub entity_kind: EntityKind,
    pub hp: i32,
    pub max_hp: i32,
    pub sp: i32,
    pub max_sp: i32,
}

#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
#[rkyv(derive(Debug))]
pub struct SkillCmd {
    pub skill: u8,
    pub target_id: EntityId,
}

impl SkillCmd {
    pub const NORMAL_ATTACK: u8 = 0;

    pub fn normal_attack(target_id: EntityId) -> Self {
        Self {
            skill: Self::NORMAL_ATTACK,
            target_id,
        }
    }
}

/// A body type that travels behind a message-kind envelope.
pub trait Message: Sized {
    const KIND: MessageKind;

    fn to_body(&self) -> Result<Vec<u8>, ProtocolError>;

    fn from_body(body: &[u8]) -> Result<Self, ProtocolError>;

    /// Envelope-wrapped payload, ready for framing.
    fn encode(&self) -> Result<Vec<u8>, ProtocolError> {
        let body = self.to_body()?;
        let mut payload = Vec::with_capacity(ENVELOPE_HEADER_SIZE + body.len());
        payload.extend_from_slice(&(Self::KIND as u16).to_le_bytes());
        payload.extend_from_slice(&body);
        Ok(payload)
    }
}

macro_rules! impl_message {
    ($ty:ty, $kind:expr) => {
        impl Message for $ty {
            const KIND: MessageKind = $kind;

            fn to_body(&self) -> Result<Vec<u8>, ProtocolError> {
                rkyv::to_bytes::<rancor::Error>(self)
                    .map(|aligned| aligned.into_vec())
                    .map_err(ProtocolError::Serialize)
            }

            fn from_body(body: &[u8]) -> Result<Self, ProtocolError> {
                // Envelope offset leaves the archive unaligned.
                let mut aligned = AlignedVec::<16>::new();
                aligned.extend_from_slice(body);
                rkyv::from_bytes::<$ty, rancor::Error>(&aligned)
                    .map_err(ProtocolError::Deserialize)
            }
        }
    };
}

impl_message!(Login, MessageKind::Login);
impl_message!(LoginAck, MessageKind::LoginAck);
impl_message!(EnterField, MessageKind::EnterField);
impl_message!(EnterFieldAck, MessageKind::EnterFieldAck);
impl_message!(FieldCmd, MessageKind::FieldCmd);
impl_message!(CombatEvent, MessageKind::CombatEvent);
impl_message!(AiStateEvent, MessageKind::AiStateEvent);
impl_message!(StatsEvent, MessageKind::StatsEvent);
impl_message!(SkillCmd, MessageKind::SkillCmd);

#[derive(Debug, Clone, PartialEq)]
pub enum LobbyMessage {
    Login(Login),
    LoginAck(LoginAck),
    EnterField(EnterField),
    EnterFieldAck(EnterFieldAck),
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldMessage {
    Cmd(FieldCmd),
    Combat(CombatEvent),
    AiState(AiStateEvent),
    Stats(StatsEvent),
    Skill(SkillCmd),
}

/// Outcome of reading one payload under a given schema.
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded<T> {
    Message(T),
    /// Known kind that belongs to the other schema.
    WrongSchema(MessageKind),
    Unknown(u16),
}

pub fn split_envelope(payload: &[u8]) -> Result<(u16, &[u8]), ProtocolError> {
    if payload.len() < ENVELOPE_HEADER_SIZE {
        return Err(ProtocolError::Truncated(payload.len()));
    }
    let kind = u16::from_le_bytes([payload[0], payload[1]]);
    Ok((kind, &payload[ENVELOPE_HEADER_SIZE..]))
}

pub fn decode_lobby(payload: &[u8]) -> Result<Decoded<LobbyMessage>, ProtocolError> {
    let (raw_kind, body) = split_envelope(payload)?;
    let Some(kind) = MessageKind::from_u16(raw_kind) else {
        return Ok(Decoded::Unknown(raw_kind));
    };

    let message = match kind {
        MessageKind::Login => LobbyMessage::Login(Login::from_body(body)?),
        MessageKind::LoginAck => LobbyMessage::LoginAck(LoginAck::from_body(body)?),
        MessageKind::EnterField => LobbyMessage::EnterField(EnterField::from_body(body)?),
        MessageKind::EnterFieldAck => {
            LobbyMessage::EnterFieldAck(EnterFieldAck::from_body(body)?)
        }
        other => return Ok(Decoded::WrongSchema(other)),
    };
    Ok(Decoded::Message(message))
}

pub fn decode_field(payload: &[u8]) -> Result<Decoded<FieldMessage>, ProtocolError> {
    let (raw_kind, body) = split_envelope(payload)?;
    let Some(kind) = MessageKind::from_u16(raw_kind) else {
        return Ok(Decoded::Unknown(raw_kind));
    };

    let message = match kind {
        MessageKind::FieldCmd => FieldMessage::Cmd(FieldCmd::from_body(body)?),
        MessageKind::CombatEvent => FieldMessage::Combat(CombatEvent::from_body(body)?),
        MessageKind::AiStateEvent => FieldMessage::AiState(AiStateEvent::from_body(body)?),
        MessageKind::StatsEvent => FieldMessage::Stats(StatsEvent::from_body(body)?),
        MessageKind::SkillCmd => FieldMessage::Skill(SkillCmd::from_body(body)?),
        other => return Ok(Decoded::WrongSchema(other)),
    };
    Ok(Decoded::Message(message))
}
