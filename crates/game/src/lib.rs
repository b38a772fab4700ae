pub mod client;
pub mod config;
pub mod error;
pub mod movement;
pub mod net;
pub mod session;
pub mod world;

pub use client::FieldClient;
pub use config::{CombatConfig, DEFAULT_PLAYER_TEMPLATE, InputConfig, SyncConfig};
pub use error::SyncError;
pub use movement::{FlatGround, GroundHeight, HeightField, MovementReconciler, ReconcilerConfig};
pub use net::{
    CloseReason, DEFAULT_PORT, EntityId, EntityKind, FrameTransport, MAX_FRAME_LEN, NO_ENTITY,
    ProtocolError, TransportError,
};
pub use session::{Dispatcher, MoveInputThrottle, SessionEvent, SessionState};
pub use world::{
    AoiWorld, BehaviorCategory, Collaborators, EntityPose, EntityRecord, EntityStats,
    InputSource, LogScene, Scene, Visibility,
};
