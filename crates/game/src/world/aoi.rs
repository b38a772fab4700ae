use std::collections::HashMap;

use glam::{Vec2, Vec3};

use crate::config::{CombatConfig, InputConfig, SyncConfig};
use crate::error::SyncError;
use crate::movement::{GroundHeight, MovementReconciler, ReconcilerConfig};
use crate::net::{AiStateEvent, CombatEvent, EntityId, EntityKind, StatsEvent};

use super::behavior::BehaviorCategory;
use super::record::{EntityPose, EntityRecord, RecordMap, Visibility};
use super::scene::{Collaborators, InputSource, Scene};

type EntityKey = (EntityKind, EntityId);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnterOutcome {
    Created,
    Reactivated,
    /// No template known yet; the position waits in the pending buffer.
    Deferred,
}

#[derive(Debug, Default)]
struct LocalMotion {
    moving: bool,
    last_signal: Option<f64>,
    reported: bool,
}

/// Local mirror of the entities inside the server's area of interest.
///
/// All mutation happens on the simulation thread: the dispatcher feeds it
/// decoded field messages, [`AoiWorld::tick`] advances every reconciler.
pub struct AoiWorld {
    reconciler_config: ReconcilerConfig,
    combat: CombatConfig,
    input_config: InputConfig,
    player_template: String,
    fallback_monster_template: Option<String>,

    records: RecordMap,
    pending: HashMap<EntityKey, Vec2>,
    learned_templates: HashMap<EntityId, String>,
    local_id: Option<EntityId>,
    local_motion: LocalMotion,
    clock: f64,
    records_created: u64,

    scene: Box<dyn Scene>,
    ground: Box<dyn GroundHeight>,
    input: Box<dyn InputSource>,
}

impl AoiWorld {
    pub fn new(config: &SyncConfig, collaborators: Collaborators) -> Self {
        Self {
            reconciler_config: config.reconciler,
            combat: config.combat,
            input_config: config.input,
            player_template: config.player_template.clone(),
            fallback_monster_template: config.fallback_monster_template.clone(),
            records: RecordMap::default(),
            pending: HashMap::new(),
            learned_templates: HashMap::new(),
            local_id: None,
            local_motion: LocalMotion::default(),
            clock: 0.0,
            records_created: 0,
            scene: collaborators.scene,
            ground: collaborators.ground,
            input: collaborators.input,
        }
    }

    pub fn local_id(&self) -> Option<EntityId> {
        self.local_id
    }

    pub fn set_local_id(&mut self, id: EntityId) {
        self.local_id = Some(id);
        self.local_motion = LocalMotion::default();

        let mut bound = false;
        for record in self.records.of_kind_mut(EntityKind::Player) {
            record.is_local = record.id == id;
            bound |= record.is_local;
        }
        if bound {
            self.scene.bind_local(id);
        }
    }

    pub fn apply_enter(
        &mut self,
        id: EntityId,
        kind: EntityKind,
        position: Vec2,
        template: Option<&str>,
    ) -> Result<EnterOutcome, SyncError> {
        if kind == EntityKind::Monster {
            if let Some(template) = template.filter(|t| !t.is_empty()) {
                self.learned_templates.insert(id, template.to_string());
            }
        }

        let key = (kind, id);
        if let Some(record) = self.records.get_mut(kind, id) {
            let position = self.pending.remove(&key).unwrap_or(position);
            let was_inactive = !record.is_active();

            record.visibility = Visibility::Active;
            record.position = position;
            record.reconciler.warp_to(position, self.ground.as_ref());

            if was_inactive {
                self.scene.set_visible(id, kind, true);
            }
            log::debug!("{:?} {} re-entered at {}", kind, id, position);
            return Ok(EnterOutcome::Reactivated);
        }

        let Some(template) = self.template_for(kind, id) else {
            self.pending.entry(key).or_insert(position);
            log::debug!("{:?} {} deferred: no template known", kind, id);
            return Ok(EnterOutcome::Deferred);
        };

        if !self.scene.instantiate(id, kind, &template) {
            self.pending.entry(key).or_insert(position);
            return Err(SyncError::UnresolvedTemplate { kind, id, template });
        }

        let position = self.pending.remove(&key).unwrap_or(position);
        let mut record = EntityRecord::new(
            id,
            kind,
            template,
            MovementReconciler::new(self.reconciler_config),
        );
        record.position = position;
        record.reconciler.warp_to(position, self.ground.as_ref());

        if kind == EntityKind::Player && self.local_id == Some(id) {
            record.is_local = true;
            self.scene.bind_local(id);
        }

        self.records.insert(record);
        self.records_created += 1;
        log::debug!("{:?} {} entered at {}", kind, id, position);
        Ok(EnterOutcome::Created)
    }

    fn template_for(&self, kind: EntityKind, id: EntityId) -> Option<String> {
        match kind {
            EntityKind::Player => Some(self.player_template.clone()),
            EntityKind::Monster => self
                .learned_templates
                .get(&id)
                .or(self.fallback_monster_template.as_ref())
                .cloned(),
        }
    }

    /// Forwards a new target to an active record; anything else is
    /// buffered, last write wins.
    pub fn apply_move(&mut self, id: EntityId, kind: EntityKind, position: Vec2) {
        let Some(record) = self.records.active_mut(kind, id) else {
            self.pending.insert((kind, id), position);
            return;
        };

        let previous = record.position;
        record.position = position;
        record.reconciler.set_target(position, self.ground.as_ref());

        if record.is_local
            && previous.distance_squared(position) > self.input_config.motion_epsilon_sq
        {
            self.local_motion.last_signal = Some(self.clock);
        }
    }

    pub fn apply_leave(&mut self, id: EntityId, kind: EntityKind) {
        self.pending.remove(&(kind, id));

        let Some(record) = self.records.active_mut(kind, id) else {
            log::debug!("Leave for {:?} {} which is not active", kind, id);
            return;
        };

        match kind {
            EntityKind::Monster => {
                record.visibility = Visibility::Inactive;
                self.scene.set_visible(id, kind, false);
            }
            EntityKind::Player => {
                self.records.remove(kind, id);
                self.scene.destroy(id, kind);
            }
        }
        log::debug!("{:?} {} left", kind, id);
    }

    pub fn apply_combat_event(&mut self, event: &CombatEvent) -> Result<(), SyncError> {
        let (attacker_kind, attacker_id) = (event.attacker_kind, event.attacker_id);
        let (target_kind, target_id) = (event.target_kind, event.target_id);

        if self.records.active_mut(attacker_kind, attacker_id).is_none() {
            log::debug!("Combat from unknown {:?} {}", attacker_kind, attacker_id);
            return Ok(());
        }

        let Some(target) = self.records.active_mut(target_kind, target_id) else {
            return Err(SyncError::Reference {
                op: "combat",
                kind: target_kind,
                id: target_id,
            });
        };

        target.stats.hp = event.remaining_hp;
        let target_point = target.reconciler.planar_position();
        let target_stats = target.stats;

        if event.remaining_hp <= 0 {
            target.behavior = Some(BehaviorCategory::Dead);
            self.scene.play_death(target_id, target_kind);
        }
        self.scene.show_stats(target_id, target_kind, &target_stats);
        self.scene.play_attack(attacker_id, attacker_kind);

        let now = self.clock;
        let interval = f64::from(self.combat.facing_interval_secs);
        if let Some(attacker) = self.records.active_mut(attacker_kind, attacker_id) {
            let due = attacker.last_facing_at.is_none_or(|at| now - at >= interval);
            if due {
                attacker
                    .reconciler
                    .blend_facing_towards(target_point, self.combat.facing_blend);
                attacker.last_facing_at = Some(now);
            }
        }
        Ok(())
    }

    pub fn apply_ai_state(&mut self, event: &AiStateEvent) -> Result<(), SyncError> {
        let (kind, id) = (event.entity_kind, event.entity_id);
        let Some(category) = BehaviorCategory::from_code(event.state) else {
            return Err(SyncError::UnknownAiState {
                kind,
                id,
                code: event.state,
            });
        };
        let Some(record) = self.records.active_mut(kind, id) else {
            return Err(SyncError::Reference {
                op: "ai_state",
                kind,
                id,
            });
        };

        record.behavior = Some(category);
        let is_local = record.is_local;
        self.scene.play_behavior(id, kind, category);

        if is_local {
            self.local_motion.moving = category.is_moving();
            self.local_motion.last_signal = Some(self.clock);
        }
        Ok(())
    }

    pub fn apply_stats(&mut self, event: &StatsEvent) -> Result<(), SyncError> {
        let (kind, id) = (event.entity_kind, event.entity_id);
        let Some(record) = self.records.active_mut(kind, id) else {
            return Err(SyncError::Reference {
                op: "stats",
                kind,
                id,
            });
        };

        record.stats.hp = event.hp;
        record.stats.max_hp = event.max_hp;
        record.stats.sp = event.sp;
        record.stats.max_sp = event.max_sp;
        self.scene.show_stats(id, kind, &record.stats);
        Ok(())
    }

    /// Closest active record of `kind` strictly within `max_range` of
    /// `origin`. Ties go to the earliest inserted record.
    pub fn find_nearest(&self, kind: EntityKind, origin: Vec3, max_range: f32) -> Option<EntityId> {
        let mut best = None;
        let mut best_sq = max_range * max_range;

        for record in self.records.of_kind(kind).filter(|r| r.is_active()) {
            let distance_sq = record.reconciler.position().distance_squared(origin);
            if distance_sq < best_sq {
                best_sq = distance_sq;
                best = Some(record.id);
            }
        }
        best
    }

    /// Field entry starts with every monster hidden until the server
    /// re-announces it.
    pub fn force_monsters_inactive(&mut self) {
        for record in self.records.of_kind_mut(EntityKind::Monster) {
            if record.is_active() {
                record.visibility = Visibility::Inactive;
                self.scene.set_visible(record.id, record.kind, false);
            }
        }
    }

    pub fn tick(&mut self, dt: f32) {
        if !dt.is_finite() || dt < 0.0 {
            log::warn!("Ignoring tick with dt {}", dt);
            return;
        }
        self.clock += f64::from(dt);
        let input = self.input.direction();

        for record in self.records.iter_mut().filter(|r| r.is_active()) {
            if record.is_local {
                if input.length_squared() > self.input_config.dead_zone_sq {
                    record.reconciler.face_direction(input);
                }
                record.reconciler.step(dt, false);
            } else {
                record.reconciler.step(dt, true);
            }
        }

        let moving = self.local_moving();
        if moving != self.local_motion.reported {
            self.local_motion.reported = moving;
            self.scene.set_local_moving(moving);
        }
    }

    /// Moving flag from the last AI state, valid only while signals keep
    /// arriving within the stop timeout.
    pub fn local_moving(&self) -> bool {
        let timeout = f64::from(self.input_config.stop_timeout_secs);
        self.local_motion.moving
            && self
                .local_motion
                .last_signal
                .is_some_and(|at| self.clock - at <= timeout)
    }

    /// Drops everything tied to the session, destroying every instance.
    pub fn reset(&mut self) {
        for record in self.records.drain() {
            self.scene.destroy(record.id, record.kind);
        }
        self.pending.clear();
        self.learned_templates.clear();
        self.local_id = None;
        self.local_motion = LocalMotion::default();
    }

    pub fn record(&self, kind: EntityKind, id: EntityId) -> Option<&EntityRecord> {
        self.records.get(kind, id)
    }

    pub fn records(&self) -> impl Iterator<Item = &EntityRecord> {
        self.records.iter()
    }

    pub fn local_record(&self) -> Option<&EntityRecord> {
        self.local_id
            .and_then(|id| self.records.get(EntityKind::Player, id))
    }

    pub fn poses(&self) -> impl Iterator<Item = EntityPose> + '_ {
        self.records
            .iter()
            .filter(|r| r.is_active())
            .map(EntityRecord::pose)
    }

    pub fn pending_position(&self, kind: EntityKind, id: EntityId) -> Option<Vec2> {
        self.pending.get(&(kind, id)).copied()
    }

    pub fn learned_template(&self, id: EntityId) -> Option<&str> {
        self.learned_templates.get(&id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.len() == 0
    }

    pub fn active_count(&self) -> usize {
        self.records.iter().filter(|r| r.is_active()).count()
    }

    /// Total records ever created. Reactivations do not count.
    pub fn records_created(&self) -> u64 {
        self.records_created
    }

    /// Seconds of simulation time advanced through [`AoiWorld::tick`].
    pub fn clock(&self) -> f64 {
        self.clock
    }
}

impl std::fmt::Debug for AoiWorld {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AoiWorld")
            .field("records", &self.records.len())
            .field("pending", &self.pending.len())
            .field("local_id", &self.local_id)
            .field("clock", &self.clock)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::f32::consts::FRAC_PI_2;
    use std::rc::Rc;

    use super::*;
    use crate::config::DEFAULT_PLAYER_TEMPLATE;
    use crate::movement::FlatGround;
    use crate::world::EntityStats;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Spawn(EntityId, String),
        Visible(EntityId, bool),
        Destroy(EntityId),
        Bind(EntityId),
        Behavior(EntityId, BehaviorCategory),
        Attack(EntityId),
        Death(EntityId),
        Stats(EntityId, i32),
        Moving(bool),
    }

    #[derive(Clone, Default)]
    struct Recorder {
        calls: Rc<RefCell<Vec<Call>>>,
        rejected: Rc<RefCell<Vec<String>>>,
    }

    impl Recorder {
        fn take(&self) -> Vec<Call> {
            self.calls.borrow_mut().drain(..).collect()
        }

        fn push(&self, call: Call) {
            self.calls.borrow_mut().push(call);
        }
    }

    impl Scene for Recorder {
        fn instantiate(&mut self, id: EntityId, _kind: EntityKind, template: &str) -> bool {
            if self.rejected.borrow().iter().any(|t| t == template) {
                return false;
            }
            self.push(Call::Spawn(id, template.to_string()));
            true
        }

        fn set_visible(&mut self, id: EntityId, _kind: EntityKind, visible: bool) {
            self.push(Call::Visible(id, visible));
        }

        fn destroy(&mut self, id: EntityId, _kind: EntityKind) {
            self.push(Call::Destroy(id));
        }

        fn bind_local(&mut self, id: EntityId) {
            self.push(Call::Bind(id));
        }

        fn play_behavior(&mut self, id: EntityId, _kind: EntityKind, category: BehaviorCategory) {
            self.push(Call::Behavior(id, category));
        }

        fn play_attack(&mut self, id: EntityId, _kind: EntityKind) {
            self.push(Call::Attack(id));
        }

        fn play_death(&mut self, id: EntityId, _kind: EntityKind) {
            self.push(Call::Death(id));
        }

        fn show_stats(&mut self, id: EntityId, _kind: EntityKind, stats: &EntityStats) {
            self.push(Call::Stats(id, stats.hp));
        }

        fn set_local_moving(&mut self, moving: bool) {
            self.push(Call::Moving(moving));
        }
    }

    fn world_with(config: SyncConfig, input: Vec2) -> (AoiWorld, Recorder) {
        let recorder = Recorder::default();
        let collaborators =
            Collaborators::new(recorder.clone(), FlatGround::default(), move || input);
        (AoiWorld::new(&config, collaborators), recorder)
    }

    fn world() -> (AoiWorld, Recorder) {
        world_with(SyncConfig::default(), Vec2::ZERO)
    }

    fn combat(attacker: EntityId, target: EntityId, remaining_hp: i32) -> CombatEvent {
        CombatEvent {
            attacker_id: attacker,
            attacker_kind: EntityKind::Monster,
            target_id: target,
            target_kind: EntityKind::Monster,
            damage: 5,
            remaining_hp,
        }
    }

    fn ai(kind: EntityKind, id: EntityId, state: u8) -> AiStateEvent {
        AiStateEvent {
            entity_id: id,
            entity_kind: kind,
            state,
        }
    }

    fn spawn_monster(world: &mut AoiWorld, id: EntityId, x: f32, z: f32) {
        let outcome = world
            .apply_enter(id, EntityKind::Monster, Vec2::new(x, z), Some("Orc"))
            .unwrap();
        assert_eq!(outcome, EnterOutcome::Created);
    }

    const M: EntityKind = EntityKind::Monster;
    const P: EntityKind = EntityKind::Player;

    #[test]
    fn monster_reentry_reuses_record() {
        let (mut world, scene) = world();

        spawn_monster(&mut world, 7, 10.0, 5.0);
        assert_eq!(world.record(M, 7).unwrap().visibility(), Visibility::Active);

        world.apply_leave(7, M);
        let record = world.record(M, 7).unwrap();
        assert_eq!(record.visibility(), Visibility::Inactive);
        assert!(record.reconciler().is_initialized());

        let outcome = world
            .apply_enter(7, M, Vec2::new(12.0, 5.0), None)
            .unwrap();
        assert_eq!(outcome, EnterOutcome::Reactivated);

        let record = world.record(M, 7).unwrap();
        assert!(record.is_active());
        assert_eq!(record.position(), Vec2::new(12.0, 5.0));
        assert_eq!(record.reconciler().planar_position(), Vec2::new(12.0, 5.0));
        assert_eq!(record.template(), "Orc");
        assert_eq!(world.records_created(), 1);
        assert_eq!(world.len(), 1);

        assert_eq!(
            scene.take(),
            vec![
                Call::Spawn(7, "Orc".to_string()),
                Call::Visible(7, false),
                Call::Visible(7, true),
            ]
        );
    }

    #[test]
    fn move_before_enter_wins_over_enter_position() {
        let (mut world, _scene) = world();

        world.apply_move(9, P, Vec2::new(3.0, 3.0));
        world.apply_move(9, P, Vec2::new(1.0, 1.0));
        assert!(world.record(P, 9).is_none());
        assert_eq!(world.pending_position(P, 9), Some(Vec2::new(1.0, 1.0)));

        world.apply_enter(9, P, Vec2::ZERO, None).unwrap();
        let record = world.record(P, 9).unwrap();
        assert_eq!(record.position(), Vec2::new(1.0, 1.0));
        assert_eq!(record.reconciler().planar_position(), Vec2::new(1.0, 1.0));
        assert_eq!(world.pending_position(P, 9), None);
    }

    #[test]
    fn player_leave_destroys_record() {
        let (mut world, scene) = world();

        world.apply_enter(3, P, Vec2::ZERO, None).unwrap();
        world.apply_leave(3, P);
        assert!(world.record(P, 3).is_none());

        world.apply_enter(3, P, Vec2::ONE, None).unwrap();
        assert_eq!(world.records_created(), 2);
        assert_eq!(
            scene.take(),
            vec![
                Call::Spawn(3, DEFAULT_PLAYER_TEMPLATE.to_string()),
                Call::Destroy(3),
                Call::Spawn(3, DEFAULT_PLAYER_TEMPLATE.to_string()),
            ]
        );
    }

    #[test]
    fn move_on_inactive_record_is_buffered() {
        let (mut world, _scene) = world();

        spawn_monster(&mut world, 4, 0.0, 0.0);
        world.apply_leave(4, M);
        world.apply_move(4, M, Vec2::new(2.0, 0.0));

        let record = world.record(M, 4).unwrap();
        assert!(!record.is_active());
        assert_eq!(record.position(), Vec2::ZERO);
        assert_eq!(world.pending_position(M, 4), Some(Vec2::new(2.0, 0.0)));

        world.apply_enter(4, M, Vec2::new(9.0, 9.0), None).unwrap();
        assert_eq!(world.record(M, 4).unwrap().position(), Vec2::new(2.0, 0.0));
        assert_eq!(world.pending_position(M, 4), None);
    }

    #[test]
    fn leave_drops_pending_position() {
        let (mut world, _scene) = world();

        world.apply_move(6, M, Vec2::ONE);
        world.apply_leave(6, M);
        assert_eq!(world.pending_position(M, 6), None);
    }

    #[test]
    fn active_record_never_has_pending_position() {
        enum Op {
            Enter(f32),
            Move(f32),
            Leave,
        }

        let script = [
            Op::Move(1.0),
            Op::Move(2.0),
            Op::Enter(0.0),
            Op::Move(3.0),
            Op::Enter(4.0),
            Op::Leave,
            Op::Move(5.0),
            Op::Move(6.0),
            Op::Leave,
            Op::Move(7.0),
            Op::Enter(8.0),
            Op::Leave,
            Op::Leave,
            Op::Enter(9.0),
        ];

        for kind in [M, P] {
            let (mut world, _scene) = world();
            for op in &script {
                match *op {
                    Op::Enter(x) => {
                        world.apply_enter(11, kind, Vec2::splat(x), Some("Orc")).unwrap();
                    }
                    Op::Move(x) => world.apply_move(11, kind, Vec2::splat(x)),
                    Op::Leave => world.apply_leave(11, kind),
                }
                let active = world.record(kind, 11).is_some_and(|r| r.is_active());
                assert!(!(active && world.pending_position(kind, 11).is_some()));
            }
            assert!(world.record(kind, 11).unwrap().is_active());
        }
    }

    #[test]
    fn monster_without_template_is_deferred() {
        let (mut world, scene) = world();

        let outcome = world.apply_enter(5, M, Vec2::ONE, None).unwrap();
        assert_eq!(outcome, EnterOutcome::Deferred);
        assert!(world.record(M, 5).is_none());
        assert_eq!(world.pending_position(M, 5), Some(Vec2::ONE));

        world.apply_move(5, M, Vec2::new(2.0, 2.0));
        let outcome = world
            .apply_enter(5, M, Vec2::new(3.0, 3.0), Some("Wolf"))
            .unwrap();
        assert_eq!(outcome, EnterOutcome::Created);
        assert_eq!(world.record(M, 5).unwrap().position(), Vec2::new(2.0, 2.0));
        assert_eq!(world.learned_template(5), Some("Wolf"));
        assert_eq!(scene.take(), vec![Call::Spawn(5, "Wolf".to_string())]);
    }

    #[test]
    fn fallback_template_replaces_deferral() {
        let config = SyncConfig {
            fallback_monster_template: Some("SingleTwoHandSwordTemplate".to_string()),
            ..SyncConfig::default()
        };
        let (mut world, _scene) = world_with(config, Vec2::ZERO);

        let outcome = world.apply_enter(5, M, Vec2::ONE, Some("")).unwrap();
        assert_eq!(outcome, EnterOutcome::Created);
        assert_eq!(
            world.record(M, 5).unwrap().template(),
            "SingleTwoHandSwordTemplate"
        );
        assert_eq!(world.learned_template(5), None);
    }

    #[test]
    fn unresolved_template_keeps_position_pending() {
        let (mut world, scene) = world();
        scene.rejected.borrow_mut().push("Ghost".to_string());

        let err = world
            .apply_enter(8, M, Vec2::ONE, Some("Ghost"))
            .unwrap_err();
        assert_eq!(
            err,
            SyncError::UnresolvedTemplate {
                kind: M,
                id: 8,
                template: "Ghost".to_string()
            }
        );
        assert!(world.record(M, 8).is_none());
        assert_eq!(world.pending_position(M, 8), Some(Vec2::ONE));
    }

    #[test]
    fn find_nearest_edges() {
        let (mut world, _scene) = world();
        let origin = Vec3::new(0.0, 0.05, 0.0);

        assert_eq!(world.find_nearest(M, origin, 2.0), None);

        spawn_monster(&mut world, 1, 5.0, 0.0);
        assert_eq!(world.find_nearest(M, origin, 2.0), None);

        // Exactly at range does not qualify.
        spawn_monster(&mut world, 2, 2.0, 0.0);
        assert_eq!(world.find_nearest(M, origin, 2.0), None);

        spawn_monster(&mut world, 3, 0.0, 1.5);
        spawn_monster(&mut world, 4, 1.0, 0.0);
        assert_eq!(world.find_nearest(M, origin, 2.0), Some(4));

        world.apply_leave(4, M);
        assert_eq!(world.find_nearest(M, origin, 2.0), Some(3));
        assert_eq!(world.find_nearest(P, origin, 100.0), None);
    }

    #[test]
    fn find_nearest_tie_goes_to_first_inserted() {
        let (mut world, _scene) = world();

        spawn_monster(&mut world, 20, -1.0, 0.0);
        spawn_monster(&mut world, 10, 1.0, 0.0);
        spawn_monster(&mut world, 30, 0.0, 1.0);

        let origin = Vec3::new(0.0, 0.05, 0.0);
        assert_eq!(world.find_nearest(M, origin, 2.0), Some(20));
    }

    #[test]
    fn combat_with_missing_participants() {
        let (mut world, scene) = world();
        spawn_monster(&mut world, 1, 0.0, 0.0);
        scene.take();

        assert_eq!(world.apply_combat_event(&combat(99, 1, 10)), Ok(()));
        assert!(scene.take().is_empty());

        assert_eq!(
            world.apply_combat_event(&combat(1, 99, 10)),
            Err(SyncError::Reference {
                op: "combat",
                kind: M,
                id: 99
            })
        );
        assert!(scene.take().is_empty());
    }

    #[test]
    fn combat_signals_attack_and_death() {
        let (mut world, scene) = world();
        spawn_monster(&mut world, 1, 0.0, 0.0);
        spawn_monster(&mut world, 2, 1.0, 0.0);
        scene.take();

        world.apply_combat_event(&combat(1, 2, 10)).unwrap();
        assert_eq!(scene.take(), vec![Call::Stats(2, 10), Call::Attack(1)]);
        assert_eq!(world.record(M, 2).unwrap().stats().hp, 10);

        world.apply_combat_event(&combat(1, 2, 0)).unwrap();
        assert_eq!(
            scene.take(),
            vec![Call::Death(2), Call::Stats(2, 0), Call::Attack(1)]
        );
        assert_eq!(
            world.record(M, 2).unwrap().behavior(),
            Some(BehaviorCategory::Dead)
        );
    }

    #[test]
    fn combat_facing_is_partial_and_rate_limited() {
        let (mut world, _scene) = world();
        spawn_monster(&mut world, 1, 0.0, 0.0);
        spawn_monster(&mut world, 2, 1.0, 0.0);

        let yaw = |world: &AoiWorld| world.record(M, 1).unwrap().reconciler().yaw();
        assert_eq!(yaw(&world), 0.0);

        world.apply_combat_event(&combat(1, 2, 10)).unwrap();
        let first = yaw(&world);
        assert!((first - 0.35 * FRAC_PI_2).abs() < 1e-5);

        world.apply_combat_event(&combat(1, 2, 9)).unwrap();
        assert_eq!(yaw(&world), first);

        world.tick(0.05);
        world.apply_combat_event(&combat(1, 2, 8)).unwrap();
        assert_eq!(yaw(&world), first);

        world.tick(0.06);
        world.apply_combat_event(&combat(1, 2, 7)).unwrap();
        assert!(yaw(&world) > first);
        assert!(yaw(&world) < FRAC_PI_2);
    }

    #[test]
    fn ai_state_maps_and_forwards() {
        let (mut world, scene) = world();
        spawn_monster(&mut world, 1, 0.0, 0.0);
        scene.take();

        world.apply_ai_state(&ai(M, 1, 2)).unwrap();
        assert_eq!(
            world.record(M, 1).unwrap().behavior(),
            Some(BehaviorCategory::Move)
        );
        assert_eq!(scene.take(), vec![Call::Behavior(1, BehaviorCategory::Move)]);

        assert_eq!(
            world.apply_ai_state(&ai(M, 1, 42)),
            Err(SyncError::UnknownAiState {
                kind: M,
                id: 1,
                code: 42
            })
        );
        assert!(matches!(
            world.apply_ai_state(&ai(M, 77, 0)),
            Err(SyncError::Reference { id: 77, .. })
        ));
        assert!(scene.take().is_empty());
    }

    #[test]
    fn local_moving_flag_times_out() {
        let (mut world, scene) = world();
        world.set_local_id(1);
        world.apply_enter(1, P, Vec2::ZERO, None).unwrap();
        assert_eq!(
            scene.take(),
            vec![
                Call::Spawn(1, DEFAULT_PLAYER_TEMPLATE.to_string()),
                Call::Bind(1),
            ]
        );

        world.apply_ai_state(&ai(P, 1, 1)).unwrap();
        assert!(world.local_moving());
        world.tick(0.1);
        world.tick(0.2);
        assert!(!world.local_moving());
        assert_eq!(
            scene.take(),
            vec![
                Call::Behavior(1, BehaviorCategory::Patrol),
                Call::Moving(true),
                Call::Moving(false),
            ]
        );

        // Attack is not a moving category.
        world.apply_ai_state(&ai(P, 1, 3)).unwrap();
        assert!(!world.local_moving());
    }

    #[test]
    fn own_moves_keep_local_flag_alive() {
        let (mut world, _scene) = world();
        world.set_local_id(1);
        world.apply_enter(1, P, Vec2::ZERO, None).unwrap();

        world.apply_ai_state(&ai(P, 1, 4)).unwrap();
        world.tick(0.2);
        world.apply_move(1, P, Vec2::new(1.0, 0.0));
        world.tick(0.2);
        assert!(world.local_moving());

        // A move below the motion threshold does not refresh.
        world.apply_move(1, P, Vec2::new(1.001, 0.0));
        world.tick(0.2);
        assert!(!world.local_moving());
    }

    #[test]
    fn local_id_binds_existing_record() {
        let (mut world, scene) = world();
        world.apply_enter(2, P, Vec2::ZERO, None).unwrap();
        world.apply_enter(5, P, Vec2::ZERO, None).unwrap();
        scene.take();

        world.set_local_id(5);
        assert!(world.record(P, 5).unwrap().is_local());
        assert!(!world.record(P, 2).unwrap().is_local());
        assert_eq!(world.local_record().unwrap().id(), 5);
        assert_eq!(scene.take(), vec![Call::Bind(5)]);
    }

    #[test]
    fn tick_smooths_remote_and_faces_local_input() {
        let (mut world, _scene) = world_with(SyncConfig::default(), Vec2::X);
        world.set_local_id(1);
        world.apply_enter(1, P, Vec2::ZERO, None).unwrap();
        spawn_monster(&mut world, 2, 0.0, 0.0);
        world.apply_move(2, M, Vec2::new(0.0, 1.0));

        world.tick(0.02);

        let remote = world.record(M, 2).unwrap().reconciler();
        let z = remote.position().z;
        assert!(z > 0.0 && z < 1.0);

        let local = world.record(P, 1).unwrap().reconciler();
        assert!((local.yaw() - FRAC_PI_2).abs() < 1e-5);

        let poses: Vec<_> = world.poses().map(|pose| pose.id).collect();
        assert_eq!(poses, vec![1, 2]);
    }

    #[test]
    fn non_finite_tick_is_ignored() {
        let (mut world, _scene) = world();
        spawn_monster(&mut world, 2, 0.0, 0.0);
        world.apply_move(2, M, Vec2::new(0.0, 1.0));

        world.tick(0.1);
        world.tick(f32::NAN);
        world.tick(f32::INFINITY);
        world.tick(-1.0);

        assert!((world.clock() - f64::from(0.1f32)).abs() < 1e-9);
        let position = world.record(M, 2).unwrap().reconciler().position();
        assert!(position.is_finite());
        assert!(position.z > 0.0 && position.z <= 1.0);
    }

    #[test]
    fn force_monsters_inactive_hides_only_monsters() {
        let (mut world, scene) = world();
        world.apply_enter(1, P, Vec2::ZERO, None).unwrap();
        spawn_monster(&mut world, 2, 0.0, 0.0);
        spawn_monster(&mut world, 3, 1.0, 0.0);
        world.apply_leave(3, M);
        scene.take();

        world.force_monsters_inactive();
        assert!(world.record(P, 1).unwrap().is_active());
        assert!(!world.record(M, 2).unwrap().is_active());
        assert_eq!(world.active_count(), 1);
        assert_eq!(scene.take(), vec![Call::Visible(2, false)]);
    }

    #[test]
    fn reset_clears_session_state() {
        let (mut world, scene) = world();
        world.set_local_id(1);
        world.apply_enter(1, P, Vec2::ZERO, None).unwrap();
        spawn_monster(&mut world, 2, 0.0, 0.0);
        world.apply_move(3, M, Vec2::ONE);
        scene.take();

        world.reset();
        assert!(world.is_empty());
        assert_eq!(world.local_id(), None);
        assert_eq!(world.pending_position(M, 3), None);
        assert_eq!(world.learned_template(2), None);
        assert_eq!(scene.take(), vec![Call::Destroy(1), Call::Destroy(2)]);
    }

    #[test]
    fn stats_update_record() {
        let (mut world, scene) = world();
        spawn_monster(&mut world, 1, 0.0, 0.0);
        scene.take();

        let event = StatsEvent {
            entity_id: 1,
            entity_kind: M,
            hp: 30,
            max_hp: 40,
            sp: 5,
            max_sp: 10,
        };
        world.apply_stats(&event).unwrap();
        let stats = world.record(M, 1).unwrap().stats();
        assert_eq!((stats.hp, stats.max_hp, stats.sp, stats.max_sp), (30, 40, 5, 10));
        assert_eq!(scene.take(), vec![Call::Stats(1, 30)]);

        let missing = StatsEvent {
            entity_id: 2,
            ..event
        };
        assert!(world.apply_stats(&missing).is_err());
    }
}
