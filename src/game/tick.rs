//! Frame and Step Loop
//!
//! The owning game loop calls [`run_frame`] once per real frame. The clock
//! turns that into zero or more fixed steps; each step runs, in order:
//!
//! 1. input sampling for every controller slot
//! 2. per-entity controller, attack timeline and physics (id order)
//! 3. level objects against the player
//! 4. combat (hitbox update and hit tests)
//! 5. removal of destroyed hitboxes and dead entities
//!
//! Steps run while hitpause is active only sample input.
//!
//! # Determinism
//!
//! Given the same starting world and the same frame inputs, the resulting
//! state hash is identical: iteration is over `BTreeMap`s or id snapshots,
//! all arithmetic is fixed-point, and nothing reads the wall clock.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::core::hash::StateHash;
use crate::game::attack::AttackInstance;
use crate::game::collision::Blockers;
use crate::game::combat::{self, CombatStep};
use crate::game::entity::{Body, EntityId, EntityKind};
use crate::game::events::GameEvent;
use crate::game::hitbox::{Hitbox, HitboxId};
use crate::game::input::{Button, DeviceRecording, RawDeviceState};
use crate::game::level::update_level_objects;
use crate::game::mover::{apply_gravity, integrate_and_resolve};
use crate::game::scripts::ScriptTable;
use crate::game::state::World;

/// Everything the owning loop supplies for one real frame.
#[derive(Clone, Debug, Default)]
pub struct FrameInput {
    /// Raw device state per controller slot; missing slots read idle
    pub devices: Vec<RawDeviceState>,
    /// Animation frame reported by the driver per attacking entity
    pub attack_frames: BTreeMap<EntityId, u32>,
}

impl FrameInput {
    /// Input for slot 0 only.
    pub fn single(device: RawDeviceState) -> Self {
        Self {
            devices: vec![device],
            attack_frames: BTreeMap::new(),
        }
    }
}

/// Result of one real frame.
#[derive(Debug, Default)]
pub struct FrameReport {
    /// Steps executed, frozen ones included
    pub steps: u32,
    /// Steps that only sampled input
    pub frozen_steps: u32,
    /// Hits landed this frame
    pub hits: u32,
    /// Destination of a door the player left through
    pub transition: Option<String>,
    /// Events generated this frame, in order
    pub events: Vec<GameEvent>,
}

/// Run one real frame.
pub fn run_frame(world: &mut World, input: &FrameInput) -> FrameReport {
    let mut report = FrameReport::default();
    remember_devices(world, input);

    if world.is_paused() {
        poll_unpause(world);
    } else {
        let steps = world.clock.begin_frame();
        for _ in 0..steps {
            let frozen = world.clock.frozen();
            report.steps += 1;
            if frozen {
                report.frozen_steps += 1;
            }
            report.hits += step(world, input, frozen);
            if world.is_paused() {
                break;
            }
        }
        world.clock.end_frame();
    }

    world.frame = world.frame.wrapping_add(1);
    report.transition = world.pending_transition().map(str::to_string);
    report.events = world.drain_events();
    report
}

fn remember_devices(world: &mut World, input: &FrameInput) {
    for (slot, raw) in world.last_raw.iter_mut().enumerate() {
        *raw = input
            .devices
            .get(slot)
            .copied()
            .unwrap_or_else(RawDeviceState::idle);
    }
}

/// While paused only the player's Start button is read.
fn poll_unpause(world: &mut World) {
    let slot = player_slot(world);
    let Some(raw) = world.last_raw.get(slot).copied() else {
        return;
    };
    if let Some(input) = world.controllers.get_mut(slot) {
        input.advance(&raw, false);
        if input.consume(Button::Start) {
            world.unpause();
        }
    }
}

fn player_slot(world: &World) -> usize {
    world
        .player_entity()
        .and_then(|e| e.controller.as_ref())
        .map(|c| c.slot)
        .unwrap_or(0)
}

/// Run one fixed step. Returns hits landed.
fn step(world: &mut World, input: &FrameInput, frozen: bool) -> u32 {
    let step = world.clock.advance_step();

    #[cfg(feature = "debug-tracing")]
    tracing::trace!(step, frozen, entities = world.entities.len(), "step");

    // 1. Input
    for (slot, controller) in world.controllers.iter_mut().enumerate() {
        let raw = world
            .last_raw
            .get(slot)
            .copied()
            .unwrap_or_else(RawDeviceState::idle);
        controller.advance(&raw, frozen);
    }

    let slot = player_slot(world);
    if world
        .controllers
        .get_mut(slot)
        .is_some_and(|c| c.consume(Button::Start))
    {
        world.pause();
        return 0;
    }

    if frozen {
        return 0;
    }

    // 2. Entities
    let ids: Vec<EntityId> = world.entities.keys().copied().collect();
    for id in ids {
        update_entity(world, id, input, step);
    }

    // 3. Level objects
    if world.pending_transition.is_none() {
        if let Some(player) = world.player.and_then(|id| world.entities.get(&id)) {
            if let Some(controller) = world.controllers.get_mut(slot) {
                let outcome = update_level_objects(
                    &mut world.level_objects,
                    &player.body,
                    controller,
                    step,
                    &mut world.pending_events,
                );
                world.pending_transition = outcome.transition;
            }
        }
    }

    if let Some(position) = world.player_entity().map(|p| p.body.position) {
        world.camera.update(position, &world.room.bounds, false);
    }

    // 4. Combat
    let mut ctx = CombatStep {
        step,
        grid: &world.room.grid,
        projectile_lookahead: world.config.combat.projectile_lookahead.raw(),
        clock: &mut world.clock,
        events: &mut world.pending_events,
    };
    let hits = combat::update_hitboxes(&mut world.hitboxes, &mut world.entities, &mut ctx);

    // 5. End-of-step removal
    combat::remove_destroyed(&mut world.hitboxes, step, &mut world.pending_events);
    world.entities.retain(|_, e| e.alive);

    hits
}

fn update_entity(world: &mut World, id: EntityId, input: &FrameInput, step: u32) {
    let solids = world.solid_boxes(id);
    let Some(entity) = world.entities.get_mut(&id) else {
        return;
    };
    if !entity.alive || entity.kind == EntityKind::Prop {
        return;
    }
    if !entity.update_offscreen && !world.camera.in_update_range(entity.body.position) {
        return;
    }

    let stunned = entity.in_hitstun();
    entity.tick_timers();

    if !stunned {
        if let Some(controller) = entity.controller.as_mut() {
            if let Some(buttons) = world.controllers.get_mut(controller.slot) {
                controller.update(&mut entity.body, buttons, &world.config.player);
            }
        }

        if let Some(attack) = entity.attack.as_mut() {
            let window = attack.advance(input.attack_frames.get(&id).copied());
            run_triggers(
                attack,
                window,
                &mut entity.body,
                id,
                step,
                TriggerSinks {
                    hitboxes: &mut world.hitboxes,
                    next_hitbox_id: &mut world.next_hitbox_id,
                    scripts: &world.scripts,
                    events: &mut world.pending_events,
                },
            );
            if attack.finished() {
                let name = attack.name().to_string();
                entity.attack = None;
                world
                    .pending_events
                    .push(GameEvent::attack_ended(step, id, &name));
            }
        }
    }

    apply_gravity(&mut entity.body);
    integrate_and_resolve(entity, &Blockers::new(&world.room.grid, &solids));
}

/// Where attack triggers write their results.
struct TriggerSinks<'a> {
    hitboxes: &'a mut BTreeMap<HitboxId, Hitbox>,
    next_hitbox_id: &'a mut u32,
    scripts: &'a ScriptTable,
    events: &'a mut Vec<GameEvent>,
}

fn run_triggers(
    attack: &AttackInstance,
    window: (u32, u32),
    body: &mut Body,
    owner: EntityId,
    step: u32,
    sinks: TriggerSinks<'_>,
) {
    let due = attack.due(window);

    for spawn in due.spawns {
        let id = HitboxId(*sinks.next_hitbox_id);
        match Hitbox::spawn(id, owner, body, spawn, sinks.scripts) {
            Ok(hitbox) => {
                *sinks.next_hitbox_id += 1;
                debug!(?id, ?owner, attack = %attack.name(), "hitbox spawned");
                sinks
                    .events
                    .push(GameEvent::hitbox_spawned(step, id, owner, hitbox.is_projectile()));
                sinks.hitboxes.insert(id, hitbox);
            }
            Err(err) => warn!(%err, attack = %attack.name(), "hitbox spawn skipped"),
        }
    }

    for pusher in due.pushers {
        body.velocity = pusher.velocity.to_vec().mirror_x(body.direction);
        sinks
            .events
            .push(GameEvent::pusher_fired(step, owner, body.velocity));
    }
}

// =============================================================================
// REPLAY
// =============================================================================

/// Drive `world` with a recording of slot 0, one frame per recorded step.
///
/// Returns the final state hash.
pub fn replay(world: &mut World, recording: &DeviceRecording) -> StateHash {
    for (_, device) in recording.replay_iter() {
        run_frame(world, &FrameInput::single(device));
    }
    world.compute_hash()
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fixed::{from_int, FixedNum};
    use crate::core::rect::Rect;
    use crate::core::vec2::FixedVec2;
    use crate::game::attack::{AttackDefinition, Groundedness, HitboxSpawn, Pusher, Vec2Spec};
    use crate::game::config::SimConfig;
    use crate::game::events::GameEventData;
    use crate::game::input::Key;
    use crate::game::room::{DoorDirection, DoorSpec, InMemoryRooms, Room};
    use crate::game::tiles::TileGrid;
    use rand::{Rng, SeedableRng};

    fn flat_room(id: &str) -> Room {
        let grid = TileGrid::from_rows(
            &[
                "................",
                "................",
                "................",
                "################",
            ],
            16,
        )
        .unwrap();
        Room::new(id, grid).with_spawn(FixedVec2::from_ints(64, 16))
    }

    fn world_in(room: Room) -> World {
        let mut world = World::new(SimConfig::default(), room).unwrap();
        world.spawn_player(FixedVec2::from_ints(64, 16));
        world
    }

    fn idle() -> FrameInput {
        FrameInput::single(RawDeviceState::idle())
    }

    fn holding(key: Key) -> FrameInput {
        FrameInput::single(RawDeviceState::idle().with_key(key))
    }

    #[test]
    fn test_one_step_per_frame_at_normal_speed() {
        let mut world = world_in(flat_room("a"));
        for _ in 0..5 {
            let report = run_frame(&mut world, &idle());
            assert_eq!(report.steps, 1);
            assert_eq!(report.frozen_steps, 0);
        }
        assert_eq!(world.clock.step(), 5);
        assert_eq!(world.frame, 5);
    }

    #[test]
    fn test_player_stays_on_floor() {
        let mut world = world_in(flat_room("a"));
        for _ in 0..10 {
            run_frame(&mut world, &idle());
        }
        let body = &world.player_entity().unwrap().body;
        assert!(body.grounded);
        assert_eq!(body.position, FixedVec2::from_ints(64, 16));
    }

    #[test]
    fn test_start_pauses_until_pressed_again() {
        let mut world = world_in(flat_room("a"));
        let report = run_frame(&mut world, &holding(Key::Escape));
        assert!(world.is_paused());
        assert!(report
            .events
            .iter()
            .any(|e| matches!(e.data, GameEventData::Paused)));

        let step = world.clock.step();
        // Still held: no new edge
        run_frame(&mut world, &holding(Key::Escape));
        run_frame(&mut world, &idle());
        assert!(world.is_paused());
        assert_eq!(world.clock.step(), step);

        run_frame(&mut world, &holding(Key::Escape));
        assert!(!world.is_paused());

        // Resynced on unpause, so the held key does not pause again
        let report = run_frame(&mut world, &holding(Key::Escape));
        assert!(!world.is_paused());
        assert_eq!(report.steps, 1);
    }

    #[test]
    fn test_hitpause_freezes_bodies() {
        let mut world = world_in(flat_room("a"));
        let enemy = world.spawn_enemy(FixedVec2::from_ints(160, 0), Rect::from_ints(0, 0, 8, 8), 3);
        world.clock.request_hitpause(2);

        run_frame(&mut world, &idle());
        let before = world.entity(enemy).unwrap().body.position;

        for _ in 0..2 {
            let report = run_frame(&mut world, &idle());
            assert_eq!(report.frozen_steps, 1);
            assert_eq!(world.entity(enemy).unwrap().body.position, before);
        }

        let report = run_frame(&mut world, &idle());
        assert_eq!(report.frozen_steps, 0);
        assert_ne!(world.entity(enemy).unwrap().body.position, before);
    }

    #[test]
    fn test_attack_hits_enemy_on_spawn_step() {
        let mut world = world_in(flat_room("a"));
        let player = world.player.unwrap();
        let enemy = world.spawn_enemy(FixedVec2::from_ints(80, 32), Rect::from_ints(-8, -16, 16, 32), 3);

        let mut spawn = HitboxSpawn::melee(1, Vec2Spec::new(FixedNum::from_int(16), FixedNum::ZERO), 16, 16);
        spawn.friendly = true;
        let slash = AttackDefinition {
            name: "slash".to_string(),
            length: 3,
            frame_rate: 1,
            groundedness: Groundedness::Any,
            hitboxes: vec![spawn],
            pushers: Vec::new(),
        }
        .prepare()
        .unwrap();
        world.register_attack(slash).unwrap();
        assert!(world.start_attack(player, "slash").unwrap());

        let report = run_frame(&mut world, &idle());
        assert_eq!(report.hits, 1);
        assert_eq!(world.entity(enemy).unwrap().health, 2);
        assert!(world.hitboxes.is_empty());
        assert!(report
            .events
            .iter()
            .any(|e| matches!(e.data, GameEventData::HitLanded { .. })));

        let mut ended = false;
        for _ in 0..5 {
            let report = run_frame(&mut world, &idle());
            ended |= report
                .events
                .iter()
                .any(|e| matches!(e.data, GameEventData::AttackEnded { .. }));
        }
        assert!(ended);
        assert!(world.entity(player).unwrap().attack.is_none());
    }

    #[test]
    fn test_pusher_fires_once_mirrored_without_a_hit() {
        let mut world = world_in(flat_room("a"));
        let player = world.player.unwrap();
        world.entity_mut(player).unwrap().body.direction = -1;

        let mut spawn = HitboxSpawn::melee(1, Vec2Spec::new(FixedNum::from_int(16), FixedNum::ZERO), 16, 16);
        spawn.friendly = true;
        let dash = AttackDefinition {
            name: "dash".to_string(),
            length: 4,
            frame_rate: 1,
            groundedness: Groundedness::Any,
            hitboxes: vec![spawn],
            pushers: vec![Pusher {
                frame: 2,
                velocity: Vec2Spec::new(FixedNum::from_int(4), FixedNum::ZERO),
            }],
        }
        .prepare()
        .unwrap();
        world.register_attack(dash).unwrap();
        assert!(world.start_attack(player, "dash").unwrap());

        let mut pushes = Vec::new();
        let mut hits = 0;
        for frame in 0..8 {
            let report = run_frame(&mut world, &idle());
            hits += report.hits;
            pushes.extend(report.events.iter().filter_map(|e| match e.data {
                GameEventData::PusherFired { entity, velocity } => Some((entity, velocity)),
                _ => None,
            }));
            if frame == 1 {
                let body = &world.entity(player).unwrap().body;
                assert_eq!(body.velocity.x, from_int(-4));
            }
        }

        assert_eq!(hits, 0);
        assert_eq!(pushes, vec![(player, FixedVec2::from_ints(-4, 0))]);
        assert!(world.entity(player).unwrap().attack.is_none());
    }

    #[test]
    fn test_walking_through_door_requests_transition() {
        let door = DoorSpec::new(Rect::from_ints(200, 0, 16, 48), DoorDirection::Right, "b");
        let mut world = world_in(flat_room("a").with_door(door));

        let mut transition = None;
        for _ in 0..300 {
            let report = run_frame(&mut world, &holding(Key::D));
            if report.transition.is_some() {
                transition = report.transition;
                break;
            }
        }
        assert_eq!(transition.as_deref(), Some("b"));

        let rooms = InMemoryRooms::new().with(flat_room("b"));
        world.enter_room(&rooms, "b").unwrap();
        assert_eq!(world.room.id, "b");
        assert!(world.pending_transition().is_none());
    }

    #[test]
    fn test_replay_is_deterministic() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(7);
        let keys = [Key::A, Key::D, Key::Space, Key::S];

        let mut recording = DeviceRecording::new();
        for step in 0..240 {
            let mut state = RawDeviceState::idle();
            for key in keys {
                if rng.gen_bool(0.3) {
                    state.set_key(key, true);
                }
            }
            recording.record(step, state);
        }

        let a = replay(&mut world_in(flat_room("a")), &recording);
        let b = replay(&mut world_in(flat_room("a")), &recording);
        assert_eq!(a, b);
    }
}
