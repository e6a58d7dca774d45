//! World State
//!
//! Everything one simulation owns, with deterministic iteration order:
//! entities and hitboxes live in `BTreeMap`s keyed by monotonically
//! allocated ids, controllers in slot order.
//!
//! ```text
//! ┌──────────────────────────── World ─────────────────────────────┐
//! │ entities: BTreeMap<EntityId, Entity>   controllers: [InputState]│
//! │ hitboxes: BTreeMap<HitboxId, Hitbox>   clock: SimulationClock   │
//! │ room + level_objects                   camera: CameraTarget     │
//! │ level_states: (room, id) -> bytes      attacks: name -> Arc<..> │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, info};

use crate::core::fixed::Fixed;
use crate::core::hash::{compute_state_hash, StateHash};
use crate::core::rect::Rect;
use crate::core::vec2::FixedVec2;
use crate::error::{SimError, SimResult};
use crate::game::attack::{AttackDefinition, AttackInstance};
use crate::game::camera::CameraTarget;
use crate::game::clock::SimulationClock;
use crate::game::config::SimConfig;
use crate::game::entity::{Body, Collidable, Entity, EntityId, EntityKind, Team};
use crate::game::events::GameEvent;
use crate::game::hitbox::{Hitbox, HitboxId};
use crate::game::input::{InputState, RawDeviceState};
use crate::game::level::{arrival, LevelObject, LevelStateStore};
use crate::game::player::{player_body, PlayerController};
use crate::game::room::{Room, RoomProvider};
use crate::game::scripts::{HitEffectFn, ProjectileHookFn, ScriptTable};

/// Health given to a freshly spawned player.
pub const PLAYER_HEALTH: i32 = 10;

/// Complete simulation state.
#[derive(Debug)]
pub struct World {
    pub config: SimConfig,

    /// Every live entity (removed at end of step once dead)
    pub entities: BTreeMap<EntityId, Entity>,

    /// Every live hitbox
    pub hitboxes: BTreeMap<HitboxId, Hitbox>,

    /// Room being simulated
    pub room: Room,

    /// Doors and switches of the current room
    pub level_objects: Vec<LevelObject>,

    /// Saved level object state across rooms
    pub level_states: LevelStateStore,

    /// One per controller slot; slot 0 reads the keyboard
    pub controllers: Vec<InputState>,

    /// Last raw sample per slot, kept for resync on unpause
    pub(crate) last_raw: Vec<RawDeviceState>,

    pub clock: SimulationClock,

    pub camera: CameraTarget,

    /// Named on-hit effects and projectile hooks. Ids are only ever added,
    /// so every registered attack keeps resolving at spawn time.
    pub(crate) scripts: ScriptTable,

    /// Registered attack definitions by name
    attacks: BTreeMap<String, Arc<AttackDefinition>>,

    /// The input-driven player, once spawned
    pub player: Option<EntityId>,

    /// Real frames run so far
    pub frame: u32,

    next_entity_id: u32,
    pub(crate) next_hitbox_id: u32,

    /// Door index the player left through, until `enter_room`
    pub(crate) pending_transition: Option<usize>,

    /// Events generated since the last drain
    pub(crate) pending_events: Vec<GameEvent>,
}

impl World {
    /// Build a world in `room` with one keyboard controller slot.
    pub fn new(config: SimConfig, room: Room) -> SimResult<Self> {
        config.validate()?;
        let input = InputState::new(
            config.input.buffer_steps,
            config.input.stick_deadzone.raw(),
            true,
        );
        let clock = SimulationClock::new(&config.clock);
        let mut camera = CameraTarget::new(&config.camera);
        camera.update(room.spawn, &room.bounds, true);
        let level_objects = LevelObject::from_room(&room);

        info!(room = %room.id, "world created");

        Ok(Self {
            config,
            entities: BTreeMap::new(),
            hitboxes: BTreeMap::new(),
            room,
            level_objects,
            level_states: LevelStateStore::new(),
            controllers: vec![input],
            last_raw: vec![RawDeviceState::idle()],
            clock,
            camera,
            scripts: ScriptTable::with_builtins(),
            attacks: BTreeMap::new(),
            player: None,
            frame: 0,
            next_entity_id: 1,
            next_hitbox_id: 1,
            pending_transition: None,
            pending_events: Vec::new(),
        })
    }

    /// Add a controller slot that reads only its pad. Returns the slot.
    pub fn add_controller(&mut self) -> usize {
        self.controllers.push(InputState::new(
            self.config.input.buffer_steps,
            self.config.input.stick_deadzone.raw(),
            false,
        ));
        self.last_raw.push(RawDeviceState::idle());
        self.controllers.len() - 1
    }

    // =========================================================================
    // ENTITIES
    // =========================================================================

    fn allocate_entity_id(&mut self) -> EntityId {
        let id = EntityId(self.next_entity_id);
        self.next_entity_id += 1;
        id
    }

    /// Spawn the player driven by controller slot 0.
    pub fn spawn_player(&mut self, position: FixedVec2) -> EntityId {
        let id = self.allocate_entity_id();
        let mut entity = Entity::new(
            id,
            EntityKind::Player,
            Team::Player,
            player_body(position, &self.config.player),
            PLAYER_HEALTH,
        );
        entity.controller = Some(PlayerController::new(0));
        entity.update_offscreen = true;
        self.entities.insert(id, entity);
        self.player = Some(id);
        self.camera.update(position, &self.room.bounds, true);
        debug!(?id, "player spawned");
        id
    }

    /// Spawn a hostile body with default gravity.
    pub fn spawn_enemy(&mut self, position: FixedVec2, collider: Rect, health: i32) -> EntityId {
        let id = self.allocate_entity_id();
        let entity = Entity::new(
            id,
            EntityKind::Enemy,
            Team::Enemy,
            Body::new(position, collider),
            health,
        );
        self.entities.insert(id, entity);
        debug!(?id, "enemy spawned");
        id
    }

    /// Spawn a motionless prop. Solid props block other bodies.
    pub fn spawn_prop(&mut self, position: FixedVec2, collider: Rect, solid: bool) -> EntityId {
        let id = self.allocate_entity_id();
        let mut body = Body::new(position, collider);
        body.gravity = 0;
        let mut entity = Entity::new(id, EntityKind::Prop, Team::Enemy, body, 1);
        entity.solid = solid;
        entity.invulnerable = u32::MAX;
        self.entities.insert(id, entity);
        id
    }

    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    pub fn entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(&id)
    }

    /// The player entity, if spawned and not removed.
    pub fn player_entity(&self) -> Option<&Entity> {
        self.player.and_then(|id| self.entities.get(&id))
    }

    /// Boxes of solid entities other than `except`.
    pub(crate) fn solid_boxes(&self, except: EntityId) -> Vec<Rect> {
        self.entities
            .values()
            .filter(|e| e.id != except && e.is_solid())
            .map(|e| e.body.bounds())
            .collect()
    }

    // =========================================================================
    // ATTACKS
    // =========================================================================

    /// Add or replace a named on-hit effect.
    pub fn register_hit_effect(&mut self, id: impl Into<String>, effect: HitEffectFn) {
        self.scripts.register_hit_effect(id, effect);
    }

    /// Add or replace a named projectile hook.
    pub fn register_projectile_hook(&mut self, id: impl Into<String>, hook: ProjectileHookFn) {
        self.scripts.register_projectile_hook(id, hook);
    }

    pub fn scripts(&self) -> &ScriptTable {
        &self.scripts
    }

    /// Register an attack. Every script id it names must already be known.
    pub fn register_attack(&mut self, definition: Arc<AttackDefinition>) -> SimResult<()> {
        self.scripts.check(&definition)?;
        debug!(attack = %definition.name, "attack registered");
        self.attacks.insert(definition.name.clone(), definition);
        Ok(())
    }

    pub fn attack(&self, name: &str) -> Option<&Arc<AttackDefinition>> {
        self.attacks.get(name)
    }

    /// Begin `name` on `entity`.
    ///
    /// Returns `Ok(false)` when the entity cannot attack right now: it is
    /// stunned, already attacking, or the attack's groundedness does not
    /// match.
    pub fn start_attack(&mut self, entity: EntityId, name: &str) -> SimResult<bool> {
        let definition = self
            .attacks
            .get(name)
            .cloned()
            .ok_or_else(|| SimError::InvalidAttack {
                name: name.to_string(),
                reason: "not registered".to_string(),
            })?;
        let step = self.clock.step();
        let target = self
            .entities
            .get_mut(&entity)
            .ok_or(SimError::UnknownEntity(entity))?;

        if !target.alive
            || target.in_hitstun()
            || target.attack.is_some()
            || !definition.groundedness.allows(target.body.grounded)
        {
            return Ok(false);
        }

        debug!(?entity, attack = %name, "attack started");
        target.attack = Some(AttackInstance::new(definition));
        self.pending_events
            .push(GameEvent::attack_started(step, entity, name));
        Ok(true)
    }

    // =========================================================================
    // ROOMS
    // =========================================================================

    /// Door the player is leaving through, if a transition is pending.
    pub fn pending_transition(&self) -> Option<&str> {
        self.pending_transition
            .and_then(|index| self.room.doors.get(index))
            .map(|door| door.destination.as_str())
    }

    /// Leave the current room for `room_id`.
    ///
    /// Saves level object state, clears everything but the player, installs
    /// the new grid and places the player at the arrival door. On error the
    /// world is left as it was.
    pub fn enter_room(&mut self, provider: &dyn RoomProvider, room_id: &str) -> SimResult<()> {
        let next = provider.load_room(room_id)?;

        // Stage saved state first; nothing is committed unless it all decodes.
        let mut level_states = self.level_states.clone();
        level_states.write_room(&self.room.id, &self.level_objects)?;
        let mut level_objects = LevelObject::from_room(&next);
        level_states.read_room(&next.id, &mut level_objects)?;

        self.level_states = level_states;
        self.level_objects = level_objects;

        let entry = self
            .pending_transition
            .take()
            .and_then(|index| self.room.doors.get(index).cloned());
        let previous = std::mem::replace(&mut self.room, next);

        let player = self.player;
        self.entities.retain(|id, _| Some(*id) == player);
        self.hitboxes.clear();
        self.clock.clear_hitpause();
        for input in &mut self.controllers {
            input.clear_all();
        }

        let mut focus = self.room.spawn;
        if let Some(entity) = player.and_then(|id| self.entities.get_mut(&id)) {
            entity.body.velocity = FixedVec2::ZERO;
            entity.body.grounded = false;
            entity.body.fall_through = false;
            entity.attack = None;
            entity.hitstun = 0;
            if let Some(controller) = entity.controller.as_mut() {
                controller.reset();
            }

            let height: Fixed = entity.body.collider.h;
            match arrival(&self.room.doors, &previous.id, entry.as_ref(), height) {
                Some(at) => {
                    entity.body.position = at.position;
                    entity.body.velocity = at.velocity;
                    if let Some(direction) = at.direction {
                        entity.body.direction = direction;
                    }
                }
                None => entity.body.position = self.room.spawn,
            }
            focus = entity.body.position;
        }

        self.camera.update(focus, &self.room.bounds, true);
        info!(from = %previous.id, to = %self.room.id, "room entered");
        self.pending_events
            .push(GameEvent::room_entered(self.clock.step(), &self.room.id));
        Ok(())
    }

    // =========================================================================
    // PAUSE
    // =========================================================================

    pub fn is_paused(&self) -> bool {
        self.clock.is_paused()
    }

    /// Stop stepping; pending edges are dropped.
    pub fn pause(&mut self) {
        if self.clock.is_paused() {
            return;
        }
        self.clock.set_paused(true);
        for input in &mut self.controllers {
            input.clear_buffers();
        }
        info!("paused");
        self.pending_events.push(GameEvent::paused(self.clock.step()));
    }

    /// Resume stepping with input resynced to the current devices.
    pub fn unpause(&mut self) {
        if !self.clock.is_paused() {
            return;
        }
        self.clock.set_paused(false);
        for (input, raw) in self.controllers.iter_mut().zip(&self.last_raw) {
            input.resync(raw);
        }
        info!("unpaused");
        self.pending_events.push(GameEvent::unpaused(self.clock.step()));
    }

    // =========================================================================
    // OUTPUT
    // =========================================================================

    /// Take events in (step, priority, entity) order.
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        let mut events = std::mem::take(&mut self.pending_events);
        events.sort();
        events
    }

    /// Hash of all simulation state for determinism checks.
    pub fn compute_hash(&self) -> StateHash {
        compute_state_hash(self.clock.step(), |hasher| {
            hasher.update_u32(self.frame);
            hasher.update_str(&self.room.id);
            self.clock.hash_into(hasher);
            self.camera.hash_into(hasher);

            hasher.update_u32(self.entities.len() as u32);
            for entity in self.entities.values() {
                entity.hash_into(hasher);
            }

            hasher.update_u32(self.hitboxes.len() as u32);
            for hitbox in self.hitboxes.values() {
                hitbox.hash_into(hasher);
            }

            for object in &self.level_objects {
                object.hash_into(hasher);
            }
            self.level_states.hash_into(hasher);

            for input in &self.controllers {
                input.hash_into(hasher);
            }

            hasher.update_u32(self.next_entity_id);
            hasher.update_u32(self.next_hitbox_id);
        })
    }
}
