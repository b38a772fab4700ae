use glam::Vec2;

use crate::movement::{FlatGround, GroundHeight};
use crate::net::{EntityId, EntityKind};

use super::behavior::BehaviorCategory;
use super::record::EntityStats;

/// Presentation side of the world: instances, camera, animation, HUD.
/// Everything but `instantiate` defaults to doing nothing.
pub trait Scene {
    /// Creates the visual instance for a new record. Returns `false` when
    /// the template cannot be resolved; the record is then not created.
    fn instantiate(&mut self, id: EntityId, kind: EntityKind, template: &str) -> bool;

    fn set_visible(&mut self, _id: EntityId, _kind: EntityKind, _visible: bool) {}

    fn destroy(&mut self, _id: EntityId, _kind: EntityKind) {}

    /// Rebind camera and input to the local player's instance.
    fn bind_local(&mut self, _id: EntityId) {}

    fn play_behavior(&mut self, _id: EntityId, _kind: EntityKind, _category: BehaviorCategory) {}

    fn play_attack(&mut self, _id: EntityId, _kind: EntityKind) {}

    fn play_death(&mut self, _id: EntityId, _kind: EntityKind) {}

    fn show_stats(&mut self, _id: EntityId, _kind: EntityKind, _stats: &EntityStats) {}

    fn set_local_moving(&mut self, _moving: bool) {}
}

/// Local movement input, in ground-plane world space.
pub trait InputSource {
    fn direction(&self) -> Vec2;
}

impl<F> InputSource for F
where
    F: Fn() -> Vec2,
{
    fn direction(&self) -> Vec2 {
        self()
    }
}

/// Scene for headless hosts: accepts every template and logs.
#[derive(Debug, Default)]
pub struct LogScene;

impl Scene for LogScene {
    fn instantiate(&mut self, id: EntityId, kind: EntityKind, template: &str) -> bool {
        log::info!("Spawn {:?} {} ({})", kind, id, template);
        true
    }

    fn set_visible(&mut self, id: EntityId, kind: EntityKind, visible: bool) {
        log::debug!("{:?} {} visible={}", kind, id, visible);
    }

    fn destroy(&mut self, id: EntityId, kind: EntityKind) {
        log::info!("Destroy {:?} {}", kind, id);
    }

    fn bind_local(&mut self, id: EntityId) {
        log::info!("Local player is {}", id);
    }

    fn play_behavior(&mut self, id: EntityId, kind: EntityKind, category: BehaviorCategory) {
        log::debug!("{:?} {} is {}", kind, id, category.label());
    }

    fn play_death(&mut self, id: EntityId, kind: EntityKind) {
        log::info!("{:?} {} died", kind, id);
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoInput;

impl InputSource for NoInput {
    fn direction(&self) -> Vec2 {
        Vec2::ZERO
    }
}

/// External services the world is wired to at construction.
pub struct Collaborators {
    pub scene: Box<dyn Scene>,
    pub ground: Box<dyn GroundHeight>,
    pub input: Box<dyn InputSource>,
}

impl Collaborators {
    pub fn new(
        scene: impl Scene + 'static,
        ground: impl GroundHeight + 'static,
        input: impl InputSource + 'static,
    ) -> Self {
        Self {
            scene: Box::new(scene),
            ground: Box::new(ground),
            input: Box::new(input),
        }
    }
}

impl Default for Collaborators {
    fn default() -> Self {
        Self::new(LogScene, FlatGround::default(), NoInput)
    }
}
