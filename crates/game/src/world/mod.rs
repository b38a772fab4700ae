mod aoi;
mod behavior;
mod record;
mod scene;

pub use aoi::{AoiWorld, EnterOutcome};
pub use behavior::BehaviorCategory;
pub use record::{EntityPose, EntityRecord, EntityStats, Visibility};
pub use scene::{Collaborators, InputSource, LogScene, NoInput, Scene};

pub use crate::error::SyncError;
pub use crate::net::{EntityId, EntityKind};
