//! Script Table
//!
//! Attack content names side effects by id; the table maps ids to plain
//! function pointers. Ids are checked when an attack is registered so the
//! step loop never meets an unknown one.

use std::collections::BTreeMap;
use std::fmt;

use crate::core::fixed::{fixed_mul, Fixed};
use crate::core::vec2::FixedVec2;
use crate::error::{SimError, SimResult};
use crate::game::attack::{AttackDefinition, Knockback};
use crate::game::entity::{EntityId, Team};
use crate::game::hitbox::Hitbox;

/// Values a hit will commit, open to on-hit effects before commit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PendingHit {
    pub damage: i32,
    pub knockback: Knockback,
    pub hitstun: u32,
    pub hitpause: u32,
}

/// Read-only facts about the hit being resolved.
#[derive(Clone, Copy, Debug)]
pub struct HitContext {
    pub step: u32,
    pub owner: EntityId,
    pub target: EntityId,
    pub target_team: Team,
    pub target_grounded: bool,
    pub hitbox_position: FixedVec2,
}

/// Runs before damage is committed; may rewrite the pending hit.
pub type HitEffectFn = fn(&mut PendingHit, &HitContext);

/// Runs once per step on a projectile before it moves.
pub type ProjectileHookFn = fn(&mut Hitbox);

/// A resolved on-hit effect, carried by the hitbox that runs it.
#[derive(Clone)]
pub struct HitEffect {
    pub id: String,
    pub run: HitEffectFn,
}

impl fmt::Debug for HitEffect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HitEffect({})", self.id)
    }
}

/// A resolved projectile hook.
#[derive(Clone)]
pub struct ProjectileHook {
    pub id: String,
    pub run: ProjectileHookFn,
}

impl fmt::Debug for ProjectileHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ProjectileHook({})", self.id)
    }
}

/// Registry of named effects and hooks.
#[derive(Clone, Default)]
pub struct ScriptTable {
    hit_effects: BTreeMap<String, HitEffectFn>,
    projectile_hooks: BTreeMap<String, ProjectileHookFn>,
}

impl fmt::Debug for ScriptTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptTable")
            .field("hit_effects", &self.hit_effects.keys().collect::<Vec<_>>())
            .field("projectile_hooks", &self.projectile_hooks.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ScriptTable {
    /// Empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Table preloaded with the stock effects and hooks.
    pub fn with_builtins() -> Self {
        let mut table = Self::new();
        table.register_hit_effect("double_damage", double_damage);
        table.register_hit_effect("launch", launch);
        table.register_hit_effect("spike", spike);
        table.register_hit_effect("heavy", heavy);
        table.register_projectile_hook("accelerate", accelerate);
        table.register_projectile_hook("decelerate", decelerate);
        table
    }

    pub fn register_hit_effect(&mut self, id: impl Into<String>, effect: HitEffectFn) {
        self.hit_effects.insert(id.into(), effect);
    }

    pub fn register_projectile_hook(&mut self, id: impl Into<String>, hook: ProjectileHookFn) {
        self.projectile_hooks.insert(id.into(), hook);
    }

    pub fn hit_effect(&self, id: &str) -> SimResult<HitEffect> {
        self.hit_effects
            .get(id)
            .map(|&run| HitEffect {
                id: id.to_string(),
                run,
            })
            .ok_or_else(|| SimError::UnknownHitEffect(id.to_string()))
    }

    pub fn projectile_hook(&self, id: &str) -> SimResult<ProjectileHook> {
        self.projectile_hooks
            .get(id)
            .map(|&run| ProjectileHook {
                id: id.to_string(),
                run,
            })
            .ok_or_else(|| SimError::UnknownProjectileHook(id.to_string()))
    }

    /// Every id the definition references must be registered.
    pub fn check(&self, definition: &AttackDefinition) -> SimResult<()> {
        let (effects, hooks) = definition.script_ids();
        for id in effects {
            self.hit_effect(id)?;
        }
        for id in hooks {
            self.projectile_hook(id)?;
        }
        Ok(())
    }
}

// =============================================================================
// STOCK EFFECTS
// =============================================================================

fn double_damage(hit: &mut PendingHit, _ctx: &HitContext) {
    hit.damage = hit.damage.saturating_mul(2);
}

/// Force the knockback to lift grounded targets.
fn launch(hit: &mut PendingHit, _ctx: &HitContext) {
    hit.knockback.ground_launch = true;
}

/// Airborne targets are driven straight down.
fn spike(hit: &mut PendingHit, ctx: &HitContext) {
    if !ctx.target_grounded {
        hit.knockback.angle = 270;
    }
}

fn heavy(hit: &mut PendingHit, _ctx: &HitContext) {
    hit.hitpause = hit.hitpause.saturating_add(4);
}

/// 1.0625x horizontal speed per step.
const ACCELERATE_FACTOR: Fixed = 69632;

/// 0.9375x horizontal speed per step.
const DECELERATE_FACTOR: Fixed = 61440;

fn accelerate(hitbox: &mut Hitbox) {
    hitbox.body.velocity.x = fixed_mul(hitbox.body.velocity.x, ACCELERATE_FACTOR);
}

fn decelerate(hitbox: &mut Hitbox) {
    hitbox.body.velocity.x = fixed_mul(hitbox.body.velocity.x, DECELERATE_FACTOR);
}
