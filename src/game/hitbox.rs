//! Hitboxes
//!
//! Short-lived damage volumes spawned by attack timelines. Melee hitboxes
//! ride along with their owner; projectiles carry their own body and fly
//! until their lifetime or pierce runs out, or they strike a solid tile.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::fixed::Fixed;
use crate::core::hash::StateHasher;
use crate::core::rect::Rect;
use crate::core::vec2::FixedVec2;
use crate::error::SimResult;
use crate::game::attack::{HitboxSpawn, HitboxSpawnKind, Knockback};
use crate::game::entity::{Body, Collidable, EntityId, Movable, Team};
use crate::game::scripts::{HitEffect, ProjectileHook, ScriptTable};

/// Stable hitbox identifier, allocated separately from entity ids.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct HitboxId(pub u32);

impl fmt::Debug for HitboxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "H{}", self.0)
    }
}

/// Spawn-time variant, resolved from the descriptor.
#[derive(Clone, Debug)]
pub enum HitboxKind {
    Melee,
    Projectile {
        ignore_tiles: bool,
        hook: Option<ProjectileHook>,
        death_particle: Option<String>,
    },
}

/// A live hitbox.
#[derive(Clone, Debug)]
pub struct Hitbox {
    pub id: HitboxId,
    pub owner: EntityId,
    /// Collider is centered on `body.position`
    pub body: Body,
    /// Offset from the owner at spawn, before facing
    pub offset: FixedVec2,
    pub damage: i32,
    pub knockback: Knockback,
    pub pierce: u32,
    pub hitstun: u32,
    /// Hit tests left
    pub lifetime: u32,
    pub hitpause: u32,
    /// Grows only
    pub hit_targets: BTreeSet<EntityId>,
    pub friendly: bool,
    pub active: bool,
    pub hit_sound: Option<String>,
    pub on_hit: Vec<HitEffect>,
    pub kind: HitboxKind,
    /// Removed at the end of the step
    pub destroyed: bool,
}

impl Hitbox {
    /// Build a hitbox for `owner_body` from a descriptor.
    ///
    /// Script ids are resolved here; an unknown id is an error.
    pub fn spawn(
        id: HitboxId,
        owner: EntityId,
        owner_body: &Body,
        spawn: &HitboxSpawn,
        scripts: &ScriptTable,
    ) -> SimResult<Self> {
        let on_hit = spawn
            .on_hit
            .iter()
            .map(|effect| scripts.hit_effect(effect))
            .collect::<SimResult<Vec<_>>>()?;

        let direction = owner_body.direction;
        let offset = spawn.offset.to_vec();
        let collider = Rect::from_ints(
            -spawn.width / 2,
            -spawn.height / 2,
            spawn.width,
            spawn.height,
        );
        let mut body = Body::new(owner_body.position + offset.mirror_x(direction), collider);
        body.direction = direction;
        body.gravity = 0;
        body.fall_speed_cap = Fixed::MAX;

        let kind = match &spawn.kind {
            HitboxSpawnKind::Melee => HitboxKind::Melee,
            HitboxSpawnKind::Projectile(projectile) => {
                body.velocity = projectile.velocity.to_vec().mirror_x(direction);
                body.gravity = projectile.gravity.raw();
                if projectile.fall_speed.raw() > 0 {
                    body.fall_speed_cap = projectile.fall_speed.raw();
                }
                let hook = projectile
                    .hook
                    .as_deref()
                    .map(|hook| scripts.projectile_hook(hook))
                    .transpose()?;
                HitboxKind::Projectile {
                    ignore_tiles: projectile.ignore_tiles,
                    hook,
                    death_particle: projectile.death_particle.clone(),
                }
            }
        };

        Ok(Self {
            id,
            owner,
            body,
            offset,
            damage: spawn.damage,
            knockback: spawn.knockback,
            pierce: spawn.pierce,
            hitstun: spawn.hitstun,
            lifetime: spawn.lifetime,
            hitpause: spawn.hitpause,
            hit_targets: BTreeSet::new(),
            friendly: spawn.friendly,
            active: spawn.active,
            hit_sound: spawn.hit_sound.clone(),
            on_hit,
            kind,
            destroyed: false,
        })
    }

    /// Friendly hitboxes strike enemies; the rest strike the player side.
    #[inline]
    pub fn target_team(&self) -> Team {
        if self.friendly {
            Team::Enemy
        } else {
            Team::Player
        }
    }

    #[inline]
    pub fn is_projectile(&self) -> bool {
        matches!(self.kind, HitboxKind::Projectile { .. })
    }

    /// Snap to the owner's current position and facing.
    pub fn follow(&mut self, owner_body: &Body) {
        self.body.direction = owner_body.direction;
        self.body.position = owner_body.position + self.offset.mirror_x(owner_body.direction);
    }

    /// Run the projectile hook, if any.
    pub fn run_hook(&mut self) {
        let run = match &self.kind {
            HitboxKind::Projectile {
                hook: Some(hook), ..
            } => hook.run,
            _ => return,
        };
        run(self);
    }

    /// Boxes checked for tile contact one step ahead, per axis.
    pub fn tile_lookahead(&self, factor: Fixed) -> [Rect; 2] {
        let bounds = self.body.bounds();
        let ahead = self.body.velocity.scale(factor);
        [
            bounds.offset(FixedVec2::new(ahead.x, 0)),
            bounds.offset(FixedVec2::new(0, ahead.y)),
        ]
    }

    #[inline]
    pub fn destroy(&mut self) {
        self.destroyed = true;
    }

    pub fn hash_into(&self, hasher: &mut StateHasher) {
        hasher.update_u32(self.id.0);
        hasher.update_u32(self.owner.0);
        self.body.hash_into(hasher);
        hasher.update_i32(self.damage);
        hasher.update_u32(self.pierce);
        hasher.update_u32(self.lifetime);
        hasher.update_bool(self.friendly);
        hasher.update_bool(self.active);
        hasher.update_bool(self.destroyed);
        hasher.update_u32(self.hit_targets.len() as u32);
        for target in &self.hit_targets {
            hasher.update_u32(target.0);
        }
    }
}

impl Collidable for Hitbox {
    fn bounds(&self) -> Rect {
        self.body.bounds()
    }
}

impl Movable for Hitbox {
    fn body(&self) -> &Body {
        &self.body
    }

    fn body_mut(&mut self) -> &mut Body {
        &mut self.body
    }
}
