//! Combat Resolver
//!
//! Advances every live hitbox once per step and lands hits on the opposing
//! roster.
//!
//! ```text
//! for each hitbox (id order):
//!   pierce == 0 or lifetime == 0 ──► destroy
//!   melee      ──► follow owner (owner gone ──► destroy)
//!   projectile ──► tile look-ahead (contact ──► particle + destroy)
//!                  hook → gravity → integrate
//!   active     ──► test targets (id order, not yet hit)
//!                    on-hit effects → cue → pierce-- → record
//!                    → knockback → damage/stun → hitpause request
//!   lifetime -= 1 (reaching 0 ──► destroy)
//! ```
//!
//! Destroyed hitboxes and killed entities stay in their maps until the end
//! of the step so iteration never observes a removal.

use std::collections::BTreeMap;

use tracing::debug;

use crate::core::fixed::{fixed_min, Fixed};
use crate::game::attack::Knockback;
use crate::game::clock::SimulationClock;
use crate::game::collision::touching_solid_tile;
use crate::game::entity::{Collidable, Damageable, Entity, EntityId};
use crate::game::events::GameEvent;
use crate::game::hitbox::{Hitbox, HitboxId, HitboxKind};
use crate::game::mover::{apply_gravity, integrate_free};
use crate::game::scripts::{HitContext, PendingHit};
use crate::game::tiles::TileGrid;

/// Everything the resolver touches besides the two registries.
pub struct CombatStep<'a> {
    pub step: u32,
    pub grid: &'a TileGrid,
    /// Velocity multiplier for the projectile tile look-ahead
    pub projectile_lookahead: Fixed,
    pub clock: &'a mut SimulationClock,
    pub events: &'a mut Vec<GameEvent>,
}

/// Update every hitbox for one step. Returns the number of hits landed.
pub fn update_hitboxes(
    hitboxes: &mut BTreeMap<HitboxId, Hitbox>,
    entities: &mut BTreeMap<EntityId, Entity>,
    ctx: &mut CombatStep<'_>,
) -> u32 {
    let ids: Vec<HitboxId> = hitboxes.keys().copied().collect();
    let mut hits = 0;

    for id in ids {
        let Some(hitbox) = hitboxes.get_mut(&id) else {
            continue;
        };
        if hitbox.destroyed {
            continue;
        }
        if hitbox.pierce == 0 || hitbox.lifetime == 0 {
            retire(hitbox, ctx);
            continue;
        }

        if !move_hitbox(hitbox, entities, ctx) {
            continue;
        }

        if hitbox.active {
            hits += test_targets(hitbox, entities, ctx);
        }

        if !hitbox.destroyed {
            hitbox.lifetime -= 1;
            if hitbox.lifetime == 0 {
                retire(hitbox, ctx);
            }
        }
    }

    hits
}

/// Drop destroyed hitboxes. Call once at the end of the step.
pub fn remove_destroyed(hitboxes: &mut BTreeMap<HitboxId, Hitbox>, step: u32, events: &mut Vec<GameEvent>) {
    hitboxes.retain(|id, hitbox| {
        if hitbox.destroyed {
            events.push(GameEvent::hitbox_expired(step, *id));
            false
        } else {
            true
        }
    });
}

/// Position the hitbox for this step. False if it was destroyed instead.
fn move_hitbox(
    hitbox: &mut Hitbox,
    entities: &BTreeMap<EntityId, Entity>,
    ctx: &mut CombatStep<'_>,
) -> bool {
    let ignore_tiles = match hitbox.kind {
        HitboxKind::Melee => {
            return match entities.get(&hitbox.owner).filter(|owner| owner.alive) {
                Some(owner) => {
                    hitbox.follow(&owner.body);
                    true
                }
                None => {
                    hitbox.destroy();
                    false
                }
            };
        }
        HitboxKind::Projectile { ignore_tiles, .. } => ignore_tiles,
    };

    if !ignore_tiles
        && hitbox
            .tile_lookahead(ctx.projectile_lookahead)
            .iter()
            .any(|ahead| touching_solid_tile(ctx.grid, ahead))
    {
        retire(hitbox, ctx);
        return false;
    }
    hitbox.run_hook();
    apply_gravity(&mut hitbox.body);
    integrate_free(hitbox);
    true
}

fn test_targets(
    hitbox: &mut Hitbox,
    entities: &mut BTreeMap<EntityId, Entity>,
    ctx: &mut CombatStep<'_>,
) -> u32 {
    let team = hitbox.target_team();
    let bounds = hitbox.bounds();
    let mut hits = 0;

    for target in entities.values_mut() {
        if target.team != team
            || !target.can_be_hit()
            || hitbox.hit_targets.contains(&target.id)
            || !bounds.intersects(&target.bounds())
        {
            continue;
        }

        land_hit(hitbox, target, ctx);
        hits += 1;

        if hitbox.pierce == 0 {
            retire(hitbox, ctx);
            break;
        }
    }

    hits
}

fn land_hit(hitbox: &mut Hitbox, target: &mut Entity, ctx: &mut CombatStep<'_>) {
    let mut pending = PendingHit {
        damage: hitbox.damage,
        knockback: hitbox.knockback,
        hitstun: hitbox.hitstun,
        hitpause: hitbox.hitpause,
    };
    let facts = HitContext {
        step: ctx.step,
        owner: hitbox.owner,
        target: target.id,
        target_team: target.team,
        target_grounded: target.body.grounded,
        hitbox_position: hitbox.body.position,
    };
    for effect in &hitbox.on_hit {
        (effect.run)(&mut pending, &facts);
    }

    ctx.events
        .push(GameEvent::hit_cue(ctx.step, hitbox.body.position, hitbox.hit_sound.clone()));
    hitbox.pierce = hitbox.pierce.saturating_sub(1);
    hitbox.hit_targets.insert(target.id);
    ctx.events.push(GameEvent::hit_landed(
        ctx.step,
        hitbox.id,
        hitbox.owner,
        target.id,
        pending.damage,
    ));
    debug!(
        hitbox = ?hitbox.id,
        target = ?target.id,
        damage = pending.damage,
        "hit landed"
    );

    apply_knockback(target, &pending.knockback, hitbox.body.direction);
    if let Some(attack) = target.attack.take() {
        ctx.events
            .push(GameEvent::attack_ended(ctx.step, target.id, attack.name()));
    }
    if target.take_hit(pending.damage, pending.hitstun) {
        debug!(entity = ?target.id, "entity destroyed");
        ctx.events
            .push(GameEvent::entity_destroyed(ctx.step, target.id, target.body.position));
    }
    if pending.hitpause > 0 {
        ctx.clock.request_hitpause(pending.hitpause);
    }
}

/// Set the target's velocity from a knockback, mirrored by `direction`.
///
/// A ground launch lifts the target off the floor this step. Otherwise a
/// grounded target slides and an airborne one keeps the fall cap.
pub fn apply_knockback(target: &mut Entity, knockback: &Knockback, direction: i32) {
    if knockback.is_none() {
        return;
    }
    let mut velocity = knockback.velocity(direction);
    let body = &mut target.body;
    if knockback.ground_launch {
        body.grounded = false;
    } else if body.grounded {
        velocity.y = 0;
    } else {
        velocity.y = fixed_min(velocity.y, body.fall_speed_cap);
    }
    body.velocity = velocity;
}

/// Destroy, announcing the impact particle for projectiles that have one.
fn retire(hitbox: &mut Hitbox, ctx: &mut CombatStep<'_>) {
    if let HitboxKind::Projectile {
        death_particle: Some(particle),
        ..
    } = &hitbox.kind
    {
        ctx.events.push(GameEvent::death_particle(
            ctx.step,
            hitbox.body.position,
            Some(particle.clone()),
        ));
    }
    hitbox.destroy();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fixed::{from_int, FixedNum, PROJECTILE_LOOKAHEAD};
    use crate::core::rect::Rect;
    use crate::core::vec2::FixedVec2;
    use crate::game::attack::{HitboxSpawn, HitboxSpawnKind, ProjectileSpec, Vec2Spec};
    use crate::game::entity::{Body, EntityKind, Team};
    use crate::game::events::GameEventData;
    use crate::game::scripts::ScriptTable;
    use proptest::prelude::*;

    struct Arena {
        entities: BTreeMap<EntityId, Entity>,
        hitboxes: BTreeMap<HitboxId, Hitbox>,
        grid: TileGrid,
        clock: SimulationClock,
        events: Vec<GameEvent>,
        step: u32,
    }

    impl Arena {
        fn new() -> Self {
            let mut entities = BTreeMap::new();
            let owner = Entity::new(
                EntityId(1),
                EntityKind::Player,
                Team::Player,
                Body::new(FixedVec2::ZERO, Rect::from_ints(-8, -8, 16, 16)),
                5,
            );
            entities.insert(owner.id, owner);
            Self {
                entities,
                hitboxes: BTreeMap::new(),
                grid: TileGrid::empty(),
                clock: SimulationClock::default(),
                events: Vec::new(),
                step: 0,
            }
        }

        fn enemy(&mut self, id: u32, x: i32, health: i32) {
            let e = Entity::new(
                EntityId(id),
                EntityKind::Enemy,
                Team::Enemy,
                Body::new(FixedVec2::from_ints(x, 0), Rect::from_ints(-8, -8, 16, 16)),
                health,
            );
            self.entities.insert(e.id, e);
        }

        fn spawn(&mut self, id: u32, desc: &HitboxSpawn) {
            let owner = &self.entities[&EntityId(1)].body;
            let hb = Hitbox::spawn(HitboxId(id), EntityId(1), owner, desc, &ScriptTable::with_builtins())
                .unwrap();
            self.hitboxes.insert(hb.id, hb);
        }

        fn step(&mut self) -> u32 {
            let mut ctx = CombatStep {
                step: self.step,
                grid: &self.grid,
                projectile_lookahead: PROJECTILE_LOOKAHEAD,
                clock: &mut self.clock,
                events: &mut self.events,
            };
            let hits = update_hitboxes(&mut self.hitboxes, &mut self.entities, &mut ctx);
            remove_destroyed(&mut self.hitboxes, self.step, &mut self.events);
            self.step += 1;
            hits
        }

        fn health(&self, id: u32) -> i32 {
            self.entities[&EntityId(id)].health
        }
    }

    fn slash() -> HitboxSpawn {
        let mut desc = HitboxSpawn::melee(1, Vec2Spec::default(), 64, 32);
        desc.friendly = true;
        desc
    }

    #[test]
    fn test_pierce_one_hits_single_target_and_dies() {
        let mut arena = Arena::new();
        arena.enemy(2, 4, 5);
        arena.enemy(3, -4, 5);
        arena.spawn(1, &slash());

        assert_eq!(arena.step(), 1);
        assert_eq!(arena.health(2), 4);
        assert_eq!(arena.health(3), 5);
        assert!(arena.hitboxes.is_empty());
    }

    #[test]
    fn test_pierce_two_hits_both() {
        let mut arena = Arena::new();
        arena.enemy(2, 4, 5);
        arena.enemy(3, -4, 5);
        let mut desc = slash();
        desc.pierce = 2;
        arena.spawn(1, &desc);

        assert_eq!(arena.step(), 2);
        assert_eq!(arena.health(2), 4);
        assert_eq!(arena.health(3), 4);
        assert!(arena.hitboxes.is_empty());
    }

    #[test]
    fn test_lifetime_counts_hit_tests() {
        let mut arena = Arena::new();
        let mut desc = slash();
        desc.lifetime = 3;
        arena.spawn(1, &desc);
        arena.step();
        arena.step();
        assert_eq!(arena.hitboxes.len(), 1);
        // Enemy walks in during the last test
        arena.enemy(2, 0, 5);
        assert_eq!(arena.step(), 1);
        assert!(arena.hitboxes.is_empty());
    }

    #[test]
    fn test_hostile_hitbox_targets_player_side() {
        let mut arena = Arena::new();
        arena.enemy(2, 0, 5);
        let mut desc = slash();
        desc.friendly = false;
        arena.spawn(1, &desc);
        // Targets the player side, which is the owner itself
        assert_eq!(arena.step(), 1);
        assert_eq!(arena.health(1), 4);
        assert_eq!(arena.health(2), 5);
    }

    #[test]
    fn test_on_hit_effect_runs_before_commit() {
        let mut arena = Arena::new();
        arena.enemy(2, 0, 5);
        let mut desc = slash();
        desc.damage = 2;
        desc.on_hit.push("double_damage".to_string());
        desc.on_hit.push("heavy".to_string());
        arena.spawn(1, &desc);
        arena.step();

        assert_eq!(arena.health(2), 1);
        assert_eq!(arena.clock.prepared_hitpause(), 4);
        let landed = arena.events.iter().find_map(|e| match e.data {
            GameEventData::HitLanded { damage, .. } => Some(damage),
            _ => None,
        });
        assert_eq!(landed, Some(4));
        let cue = arena
            .events
            .iter()
            .position(|e| matches!(e.data, GameEventData::HitCue { .. }));
        let hit = arena
            .events
            .iter()
            .position(|e| matches!(e.data, GameEventData::HitLanded { .. }));
        assert!(cue < hit);
    }

    #[test]
    fn test_knockback_mirrored_and_grounded_slide() {
        let mut arena = Arena::new();
        arena.enemy(2, 0, 5);
        arena.entities.get_mut(&EntityId(2)).unwrap().body.grounded = true;
        arena.entities.get_mut(&EntityId(1)).unwrap().body.direction = -1;
        let mut desc = slash();
        desc.knockback = Knockback::new(FixedNum::from_int(4), 45, false);
        arena.spawn(1, &desc);
        arena.step();

        let body = &arena.entities[&EntityId(2)].body;
        assert!(body.velocity.x < 0);
        assert_eq!(body.velocity.y, 0);
        assert!(body.grounded);
    }

    #[test]
    fn test_ground_launch_lifts_target() {
        let mut arena = Arena::new();
        arena.enemy(2, 0, 5);
        arena.entities.get_mut(&EntityId(2)).unwrap().body.grounded = true;
        let mut desc = slash();
        desc.knockback = Knockback::new(FixedNum::from_int(10), 90, true);
        arena.spawn(1, &desc);
        arena.step();

        let body = &arena.entities[&EntityId(2)].body;
        assert_eq!(body.velocity, FixedVec2::from_ints(0, -10));
        assert!(!body.grounded);
    }

    #[test]
    fn test_kill_emits_destroyed_once() {
        let mut arena = Arena::new();
        arena.enemy(2, 0, 1);
        arena.spawn(1, &slash());
        arena.spawn(2, &slash());
        arena.step();

        let destroyed = arena
            .events
            .iter()
            .filter(|e| matches!(e.data, GameEventData::EntityDestroyed { .. }))
            .count();
        assert_eq!(destroyed, 1);
        assert!(!arena.entities[&EntityId(2)].alive);
    }

    #[test]
    fn test_melee_hitbox_dies_with_owner() {
        let mut arena = Arena::new();
        let mut desc = slash();
        desc.lifetime = 10;
        arena.spawn(1, &desc);
        arena.entities.remove(&EntityId(1));
        arena.step();
        assert!(arena.hitboxes.is_empty());
    }

    #[test]
    fn test_projectile_flies_and_breaks_on_tiles() {
        let mut arena = Arena::new();
        arena.grid = TileGrid::from_rows(&["....#"], 16).unwrap();
        let mut desc = slash();
        desc.width = 4;
        desc.height = 4;
        desc.lifetime = 60;
        desc.offset = Vec2Spec::new(FixedNum::from_int(8), FixedNum::from_int(8));
        desc.kind = HitboxSpawnKind::Projectile(ProjectileSpec {
            velocity: Vec2Spec::new(FixedNum::from_int(8), FixedNum::ZERO),
            gravity: FixedNum::ZERO,
            fall_speed: FixedNum::ZERO,
            ignore_tiles: false,
            hook: None,
            death_particle: Some("spark".to_string()),
        });
        arena.spawn(1, &desc);

        for _ in 0..10 {
            arena.step();
        }
        assert!(arena.hitboxes.is_empty());
        let particle = arena.events.iter().find_map(|e| match &e.data {
            GameEventData::DeathParticle { position, particle } => Some((*position, particle.clone())),
            _ => None,
        });
        let (position, particle) = particle.unwrap();
        assert_eq!(particle.as_deref(), Some("spark"));
        assert!(position.x < from_int(64));
    }

    proptest! {
        #[test]
        fn prop_never_rehits_target(lifetime in 1u32..40, pierce in 1u32..5, enemies in 1u32..6) {
            let mut arena = Arena::new();
            for i in 0..enemies {
                arena.enemy(10 + i, (i as i32 * 3) - 6, 1000);
            }
            let mut desc = slash();
            desc.lifetime = lifetime;
            desc.pierce = pierce;
            arena.spawn(1, &desc);

            let mut total = 0;
            for _ in 0..(lifetime + 2) {
                total += arena.step();
            }
            prop_assert!(total <= enemies.min(pierce));
            for i in 0..enemies {
                prop_assert!(arena.health(10 + i) >= 999);
            }
        }
    }
}
