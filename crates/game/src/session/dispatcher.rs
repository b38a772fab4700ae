use std::collections::VecDeque;

use glam::Vec2;

use crate::config::SyncConfig;
use crate::error::SyncError;
use crate::net::{
    CloseReason, Decoded, EnterField, EnterFieldAck, EntityId, FieldCmd, FieldCmdType,
    FieldMessage, LobbyMessage, Login, LoginAck, Message, MessageKind, ProtocolError,
    decode_field, decode_lobby,
};
use crate::world::AoiWorld;

use super::state::{SessionEvent, SessionState};

/// Session state machine and message router.
///
/// The decode path is chosen by state alone: lobby schema until the field
/// entry is acknowledged, field schema afterwards. Anything that does not
/// fit the current state is logged and dropped.
#[derive(Debug)]
pub struct Dispatcher {
    state: SessionState,
    user_id: String,
    token: String,
    field_override: Option<u32>,
    player_id: Option<EntityId>,
    field_id: Option<u32>,
    outbox: VecDeque<Vec<u8>>,
    pending_events: VecDeque<SessionEvent>,
}

impl Dispatcher {
    pub fn new(config: &SyncConfig) -> Self {
        Self {
            state: SessionState::Disconnected,
            user_id: config.user_id.clone(),
            token: config.token.clone(),
            field_override: config.field_id,
            player_id: None,
            field_id: None,
            outbox: VecDeque::new(),
            pending_events: VecDeque::new(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn player_id(&self) -> Option<EntityId> {
        self.player_id
    }

    pub fn field_id(&self) -> Option<u32> {
        self.field_id
    }

    pub fn begin_connect(&mut self) {
        self.state = SessionState::Connecting;
    }

    /// Socket is up: queue the login request.
    pub fn on_connected(&mut self) -> Result<(), ProtocolError> {
        self.state = SessionState::Connected;
        self.pending_events.push_back(SessionEvent::Connected);
        let login = Login {
            user_id: self.user_id.clone(),
            token: self.token.clone(),
        };
        self.queue(&login)
    }

    /// Transport ended. Returns `false` if the session was already down.
    pub fn on_disconnected(&mut self, reason: CloseReason) -> bool {
        if self.state == SessionState::Disconnected {
            return false;
        }
        log::info!("Session ended while {}: {}", self.state.as_str(), reason);

        self.state = SessionState::Disconnected;
        self.player_id = None;
        self.field_id = None;
        self.outbox.clear();
        self.pending_events
            .push_back(SessionEvent::Disconnected { reason });
        true
    }

    pub fn dispatch(&mut self, payload: &[u8], world: &mut AoiWorld) {
        let result = if self.state == SessionState::InField {
            self.dispatch_field(payload, world)
        } else {
            self.dispatch_lobby(payload, world)
        };

        if let Err(err) = result {
            log::warn!("Dropped message: {}", err);
        }
    }

    fn dispatch_lobby(&mut self, payload: &[u8], world: &mut AoiWorld) -> Result<(), SyncError> {
        let message = match decode_lobby(payload) {
            Ok(Decoded::Message(message)) => message,
            Ok(Decoded::WrongSchema(kind)) => return Err(self.state_error(kind)),
            Ok(Decoded::Unknown(raw)) => {
                log::warn!("Discarding unknown message kind {}", raw);
                return Ok(());
            }
            Err(err) => {
                log::warn!("Malformed lobby payload: {}", err);
                return Ok(());
            }
        };

        match message {
            LobbyMessage::LoginAck(ack) => self.on_login_ack(ack),
            LobbyMessage::EnterFieldAck(ack) => self.on_enter_field_ack(ack, world),
            LobbyMessage::Login(_) => Err(self.state_error(MessageKind::Login)),
            LobbyMessage::EnterField(_) => Err(self.state_error(MessageKind::EnterField)),
        }
    }

    fn on_login_ack(&mut self, ack: LoginAck) -> Result<(), SyncError> {
        if self.state != SessionState::Connected {
            return Err(self.state_error(MessageKind::LoginAck));
        }

        if !ack.ok {
            log::warn!("Login rejected for {}", ack.user_id);
            self.pending_events.push_back(SessionEvent::LoginRejected {
                user_id: ack.user_id,
            });
            return Ok(());
        }

        let field_id = self.field_override.unwrap_or(ack.default_field_id);
        log::info!(
            "Logged in as {} (player {}), entering field {}",
            ack.user_id,
            ack.player_id,
            field_id
        );

        self.player_id = Some(ack.player_id);
        self.field_id = Some(field_id);
        self.state = SessionState::LoggedIn;
        self.pending_events.push_back(SessionEvent::LoggedIn {
            player_id: ack.player_id,
            field_id,
        });

        if let Err(err) = self.queue(&EnterField { field_id }) {
            log::error!("Failed to encode field entry: {}", err);
        }
        Ok(())
    }

    fn on_enter_field_ack(
        &mut self,
        ack: EnterFieldAck,
        world: &mut AoiWorld,
    ) -> Result<(), SyncError> {
        if self.state != SessionState::LoggedIn {
            return Err(self.state_error(MessageKind::EnterFieldAck));
        }

        log::info!("Entered field {} as player {}", ack.field_id, ack.player_id);

        self.player_id = Some(ack.player_id);
        self.field_id = Some(ack.field_id);
        world.set_local_id(ack.player_id);
        world.force_monsters_inactive();

        self.state = SessionState::InField;
        self.pending_events.push_back(SessionEvent::EnteredField {
            player_id: ack.player_id,
            field_id: ack.field_id,
        });
        Ok(())
    }

    fn dispatch_field(&mut self, payload: &[u8], world: &mut AoiWorld) -> Result<(), SyncError> {
        let message = match decode_field(payload) {
            Ok(Decoded::Message(message)) => message,
            Ok(Decoded::WrongSchema(kind)) => return Err(self.state_error(kind)),
            Ok(Decoded::Unknown(raw)) => {
                log::warn!("Discarding unknown message kind {}", raw);
                return Ok(());
            }
            Err(err) => {
                log::warn!("Malformed field payload: {}", err);
                return Ok(());
            }
        };

        match message {
            FieldMessage::Cmd(cmd) => {
                let (id, kind) = (cmd.entity_id, cmd.entity_kind);
                log::trace!("{:?} {:?} {}", cmd.cmd, kind, id);
                match cmd.cmd {
                    FieldCmdType::Enter => world
                        .apply_enter(id, kind, cmd.position(), cmd.template.as_deref())
                        .map(|_| ()),
                    FieldCmdType::Move => {
                        world.apply_move(id, kind, cmd.position());
                        Ok(())
                    }
                    FieldCmdType::Leave => {
                        world.apply_leave(id, kind);
                        Ok(())
                    }
                }
            }
            FieldMessage::Combat(event) => world.apply_combat_event(&event),
            FieldMessage::AiState(event) => world.apply_ai_state(&event),
            FieldMessage::Stats(event) => world.apply_stats(&event),
            FieldMessage::Skill(_) => Err(self.state_error(MessageKind::SkillCmd)),
        }
    }

    fn state_error(&self, message: MessageKind) -> SyncError {
        SyncError::State {
            message,
            state: self.state,
        }
    }

    /// Queues an input direction for the local player. Dropped outside the
    /// field.
    pub fn queue_move_input(&mut self, direction: Vec2) -> Result<bool, ProtocolError> {
        match (self.state, self.player_id) {
            (SessionState::InField, Some(player_id)) => {
                self.queue(&FieldCmd::move_input(player_id, direction))?;
                Ok(true)
            }
            _ => {
                log::debug!("Move input dropped while {}", self.state.as_str());
                Ok(false)
            }
        }
    }

    /// Queues any message for the field. Dropped outside the field.
    pub fn queue_field<M: Message>(&mut self, message: &M) -> Result<bool, ProtocolError> {
        if self.state != SessionState::InField {
            log::debug!("{:?} dropped while {}", M::KIND, self.state.as_str());
            return Ok(false);
        }
        self.queue(message)?;
        Ok(true)
    }

    fn queue<M: Message>(&mut self, message: &M) -> Result<(), ProtocolError> {
        self.outbox.push_back(message.encode()?);
        Ok(())
    }

    /// Encoded payloads waiting for the transport.
    pub fn drain_outbound(&mut self) -> impl Iterator<Item = Vec<u8>> + '_ {
        self.outbox.drain(..)
    }

    pub fn drain_events(&mut self) -> impl Iterator<Item = SessionEvent> + '_ {
        self.pending_events.drain(..)
    }
}
