use glam::Vec2;

use crate::config::SyncConfig;
use crate::net::{
    CloseHandle, CloseReason, EntityId, EntityKind, FrameTransport, NO_ENTITY, SkillCmd,
    TransportError, TransportStats,
};
use crate::session::{Dispatcher, MoveInputThrottle, SessionEvent, SessionState};
use crate::world::{AoiWorld, Collaborators};

/// Owning context for one client session: transport, dispatcher and world,
/// driven by the host calling [`FieldClient::tick`] once per frame.
pub struct FieldClient {
    config: SyncConfig,
    transport: FrameTransport,
    dispatcher: Dispatcher,
    world: AoiWorld,
    throttle: MoveInputThrottle,
}

impl FieldClient {
    pub fn new(config: SyncConfig, collaborators: Collaborators) -> Self {
        Self {
            transport: FrameTransport::new(),
            dispatcher: Dispatcher::new(&config),
            world: AoiWorld::new(&config, collaborators),
            throttle: MoveInputThrottle::new(config.input),
            config,
        }
    }

    /// Opens the connection and sends the login. Ignored unless the session
    /// is down.
    pub fn connect(&mut self) -> Result<(), TransportError> {
        if self.dispatcher.state() != SessionState::Disconnected || self.transport.is_open() {
            log::debug!("connect() ignored while {}", self.dispatcher.state().as_str());
            return Ok(());
        }

        log::info!("Connecting to {}:{}", self.config.host, self.config.port);
        self.dispatcher.begin_connect();

        if let Err(err) = self.transport.connect(&self.config.host, self.config.port) {
            self.handle_disconnect(CloseReason::Io(err.to_string()));
            return Err(err);
        }

        self.dispatcher.on_connected()?;
        self.flush();
        Ok(())
    }

    pub fn disconnect(&mut self) {
        self.transport.close();
        self.handle_disconnect(CloseReason::Local);
    }

    /// Drains received messages into the world, advances reconciliation and
    /// flushes queued outgoing messages. Never blocks.
    pub fn tick(&mut self, dt: f32) {
        for payload in self.transport.poll() {
            self.dispatcher.dispatch(&payload, &mut self.world);
        }

        if let Some(reason) = self.transport.close_reason().cloned() {
            self.handle_disconnect(reason);
        }

        self.world.tick(dt);
        self.flush();
    }

    fn handle_disconnect(&mut self, reason: CloseReason) {
        if self.dispatcher.on_disconnected(reason) {
            self.world.reset();
            self.throttle.reset();
        }
    }

    fn flush(&mut self) {
        for payload in self.dispatcher.drain_outbound() {
            if let Err(err) = self.transport.send(&payload) {
                log::warn!("Outgoing message dropped: {}", err);
                break;
            }
        }
    }

    /// Sends a raw input direction for the local player.
    pub fn send_move_input(&mut self, direction: Vec2) -> bool {
        match self.dispatcher.queue_move_input(direction) {
            Ok(queued) => {
                self.flush();
                queued
            }
            Err(err) => {
                log::warn!("Move input not sent: {}", err);
                false
            }
        }
    }

    /// Feeds the current input through the throttle; sends only what the
    /// throttle lets through.
    pub fn update_move_input(&mut self, input: Vec2) {
        if self.dispatcher.state() != SessionState::InField {
            return;
        }
        if let Some(direction) = self.throttle.update(self.world.clock(), input) {
            self.send_move_input(direction);
        }
    }

    /// Normal attack on the nearest monster around the local player. The
    /// request goes out with no target when nothing is in range.
    pub fn request_attack(&mut self) -> Option<EntityId> {
        let target = self.world.local_record().and_then(|local| {
            self.world.find_nearest(
                EntityKind::Monster,
                local.reconciler().position(),
                self.config.combat.pick_range,
            )
        });

        let command = SkillCmd::normal_attack(target.unwrap_or(NO_ENTITY));
        match self.dispatcher.queue_field(&command) {
            Ok(true) => {
                log::debug!("Attack requested on {:?}", target);
                self.flush();
                target
            }
            Ok(false) => None,
            Err(err) => {
                log::warn!("Attack request not sent: {}", err);
                None
            }
        }
    }

    pub fn drain_events(&mut self) -> impl Iterator<Item = SessionEvent> + '_ {
        self.dispatcher.drain_events()
    }

    pub fn state(&self) -> SessionState {
        self.dispatcher.state()
    }

    pub fn player_id(&self) -> Option<EntityId> {
        self.dispatcher.player_id()
    }

    pub fn world(&self) -> &AoiWorld {
        &self.world
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn transport_stats(&self) -> TransportStats {
        self.transport.stats()
    }

    /// Lets another thread end the connection; observed on the next tick.
    pub fn close_handle(&self) -> Option<CloseHandle> {
        self.transport.close_handle()
    }
}
