use glam::{Quat, Vec2, Vec3};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::movement::MovementReconciler;
use crate::net::{EntityId, EntityKind};

use super::behavior::BehaviorCategory;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Active,
    /// Known but outside the area of interest; kept for reuse.
    Inactive,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityStats {
    pub hp: i32,
    pub max_hp: i32,
    pub sp: i32,
    pub max_sp: i32,
}

#[derive(Debug, Clone)]
pub struct EntityRecord {
    pub(crate) id: EntityId,
    pub(crate) kind: EntityKind,
    pub(crate) visibility: Visibility,
    pub(crate) position: Vec2,
    pub(crate) behavior: Option<BehaviorCategory>,
    pub(crate) reconciler: MovementReconciler,
    pub(crate) template: String,
    pub(crate) stats: EntityStats,
    pub(crate) is_local: bool,
    pub(crate) last_facing_at: Option<f64>,
}

impl EntityRecord {
    pub(crate) fn new(
        id: EntityId,
        kind: EntityKind,
        template: String,
        reconciler: MovementReconciler,
    ) -> Self {
        Self {
            id,
            kind,
            visibility: Visibility::Active,
            position: Vec2::ZERO,
            behavior: None,
            reconciler,
            template,
            stats: EntityStats::default(),
            is_local: false,
            last_facing_at: None,
        }
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    pub fn is_active(&self) -> bool {
        self.visibility == Visibility::Active
    }

    /// Last authoritative ground position.
    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn behavior(&self) -> Option<BehaviorCategory> {
        self.behavior
    }

    pub fn reconciler(&self) -> &MovementReconciler {
        &self.reconciler
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn stats(&self) -> EntityStats {
        self.stats
    }

    pub fn is_local(&self) -> bool {
        self.is_local
    }

    pub fn pose(&self) -> EntityPose {
        EntityPose {
            id: self.id,
            kind: self.kind,
            position: self.reconciler.position(),
            orientation: self.reconciler.orientation(),
        }
    }
}

/// Reconciled pose handed to render consumers once per frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntityPose {
    pub id: EntityId,
    pub kind: EntityKind,
    pub position: Vec3,
    pub orientation: Quat,
}

/// Player and monster sub-maps. Iteration follows insertion order.
#[derive(Debug, Default)]
pub(crate) struct RecordMap {
    players: IndexMap<EntityId, EntityRecord>,
    monsters: IndexMap<EntityId, EntityRecord>,
}

impl RecordMap {
    fn map(&self, kind: EntityKind) -> &IndexMap<EntityId, EntityRecord> {
        match kind {
            EntityKind::Player => &self.players,
            EntityKind::Monster => &self.monsters,
        }
    }

    fn map_mut(&mut self, kind: EntityKind) -> &mut IndexMap<EntityId, EntityRecord> {
        match kind {
            EntityKind::Player => &mut self.players,
            EntityKind::Monster => &mut self.monsters,
        }
    }

    pub(crate) fn get(&self, kind: EntityKind, id: EntityId) -> Option<&EntityRecord> {
        self.map(kind).get(&id)
    }

    pub(crate) fn get_mut(&mut self, kind: EntityKind, id: EntityId) -> Option<&mut EntityRecord> {
        self.map_mut(kind).get_mut(&id)
    }

    pub(crate) fn active_mut(
        &mut self,
        kind: EntityKind,
        id: EntityId,
    ) -> Option<&mut EntityRecord> {
        self.get_mut(kind, id).filter(|record| record.is_active())
    }

    pub(crate) fn insert(&mut self, record: EntityRecord) {
        self.map_mut(record.kind).insert(record.id, record);
    }

    pub(crate) fn remove(&mut self, kind: EntityKind, id: EntityId) -> Option<EntityRecord> {
        self.map_mut(kind).shift_remove(&id)
    }

    pub(crate) fn of_kind(&self, kind: EntityKind) -> impl Iterator<Item = &EntityRecord> {
        self.map(kind).values()
    }

    pub(crate) fn of_kind_mut(
        &mut self,
        kind: EntityKind,
    ) -> impl Iterator<Item = &mut EntityRecord> {
        self.map_mut(kind).values_mut()
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &EntityRecord> {
        self.players.values().chain(self.monsters.values())
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut EntityRecord> {
        self.players.values_mut().chain(self.monsters.values_mut())
    }

    pub(crate) fn len(&self) -> usize {
        self.players.len() + self.monsters.len()
    }

    pub(crate) fn drain(&mut self) -> impl Iterator<Item = EntityRecord> + '_ {
        self.players
            .drain(..)
            .chain(self.monsters.drain(..))
            .map(|(_, record)| record)
    }
}
