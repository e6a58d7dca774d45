//! Entity Registry Records
//!
//! Every simulated object (player, enemy, solid prop) shares one record
//! shape. Behaviour that only some entities carry (a player controller, an
//! attack in progress) lives in optional components rather than subtypes.
//!
//! ```text
//! ┌──────────────────────── Entity ─────────────────────────┐
//! │ id · kind · team · health · hitstun · invulnerable      │
//! │ ┌──────────── Body ─────────────┐  controller: Option   │
//! │ │ position  velocity  direction │  attack:     Option   │
//! │ │ gravity   fall_speed_cap      │                       │
//! │ │ collider (local)  grounded    │                       │
//! │ └───────────────────────────────┘                       │
//! └─────────────────────────────────────────────────────────┘
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::fixed::{Fixed, PLAYER_FALL_SPEED, PLAYER_GRAVITY};
use crate::core::hash::StateHasher;
use crate::core::rect::Rect;
use crate::core::vec2::FixedVec2;
use crate::game::attack::AttackInstance;
use crate::game::player::PlayerController;

// =============================================================================
// IDENTITY
// =============================================================================

/// Stable entity identifier. Allocated monotonically, never reused.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(pub u32);

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{}", self.0)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which roster an entity belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Team {
    /// The player side
    Player,
    /// Everything hostile to the player
    Enemy,
}

impl Team {
    /// The roster this team's hitboxes target.
    pub fn opponent(self) -> Team {
        match self {
            Team::Player => Team::Enemy,
            Team::Enemy => Team::Player,
        }
    }
}

/// Coarse entity category.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    /// Input-driven player character
    Player,
    /// Hostile actor
    Enemy,
    /// Static or scripted object (crates, moving blocks)
    Prop,
}

impl EntityKind {
    fn tag(self) -> u8 {
        match self {
            EntityKind::Player => 0,
            EntityKind::Enemy => 1,
            EntityKind::Prop => 2,
        }
    }
}

// =============================================================================
// KINEMATIC BODY
// =============================================================================

/// Kinematic state integrated by the mover.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Body {
    /// Position in pixels (fixed-point)
    pub position: FixedVec2,
    /// Displacement per step
    pub velocity: FixedVec2,
    /// Added to `velocity.y` each airborne step
    pub gravity: Fixed,
    /// Upper bound on `velocity.y`
    pub fall_speed_cap: Fixed,
    /// Facing: +1 right, -1 left
    pub direction: i32,
    /// Collider relative to `position`
    pub collider: Rect,
    /// Set by the last vertical resolution
    pub grounded: bool,
    /// Set when the last downward block was a one-way platform
    pub on_platform: bool,
    /// Ignore one-way platforms for the next resolution only
    pub fall_through: bool,
}

impl Body {
    /// Body at rest with default gravity.
    pub fn new(position: FixedVec2, collider: Rect) -> Self {
        Self {
            position,
            velocity: FixedVec2::ZERO,
            gravity: PLAYER_GRAVITY,
            fall_speed_cap: PLAYER_FALL_SPEED,
            direction: 1,
            collider,
            grounded: false,
            on_platform: false,
            fall_through: false,
        }
    }

    /// World-space collider.
    #[inline]
    pub fn bounds(&self) -> Rect {
        self.collider.offset(self.position)
    }

    /// Face the sign of `x_dir` (unchanged for zero).
    #[inline]
    pub fn face(&mut self, x_dir: i32) {
        if x_dir != 0 {
            self.direction = x_dir.signum();
        }
    }

    pub(crate) fn hash_into(&self, hasher: &mut StateHasher) {
        hasher.update_vec2(self.position);
        hasher.update_vec2(self.velocity);
        hasher.update_fixed(self.gravity);
        hasher.update_fixed(self.fall_speed_cap);
        hasher.update_i32(self.direction);
        hasher.update_rect(&self.collider);
        hasher.update_bool(self.grounded);
        hasher.update_bool(self.on_platform);
    }
}

// =============================================================================
// CAPABILITIES
// =============================================================================

/// Anything with a world-space box that collision queries can see.
pub trait Collidable {
    /// World-space bounds
    fn bounds(&self) -> Rect;

    /// Whether the box blocks movement of other bodies.
    fn is_solid(&self) -> bool {
        false
    }
}

/// Anything the mover integrates.
pub trait Movable {
    /// Kinematic state
    fn body(&self) -> &Body;
    /// Mutable kinematic state
    fn body_mut(&mut self) -> &mut Body;
}

/// Anything a hitbox can land on.
pub trait Damageable {
    /// False while dead or invulnerable.
    fn can_be_hit(&self) -> bool;

    /// Commit damage and stun. Returns true if this killed the target.
    fn take_hit(&mut self, damage: i32, hitstun: u32) -> bool;
}

// =============================================================================
// ENTITY
// =============================================================================

/// One record in the entity registry.
#[derive(Clone, Debug)]
pub struct Entity {
    pub id: EntityId,
    pub kind: EntityKind,
    pub team: Team,
    pub body: Body,
    pub health: i32,
    /// Steps during which controllers and attacks are suppressed
    pub hitstun: u32,
    /// Steps during which hit tests skip this entity
    pub invulnerable: u32,
    /// Invulnerability granted after each hit
    pub hit_iframes: u32,
    /// Blocks other bodies like a solid tile
    pub solid: bool,
    /// Keep updating when far from the camera
    pub update_offscreen: bool,
    /// Cleared when the entity is scheduled for removal
    pub alive: bool,
    /// Present on input-driven entities
    pub controller: Option<PlayerController>,
    /// Attack currently playing
    pub attack: Option<AttackInstance>,
}

impl Entity {
    /// Bare entity; callers fill in components.
    pub fn new(id: EntityId, kind: EntityKind, team: Team, body: Body, health: i32) -> Self {
        Self {
            id,
            kind,
            team,
            body,
            health,
            hitstun: 0,
            invulnerable: 0,
            hit_iframes: 0,
            solid: false,
            update_offscreen: false,
            alive: true,
            controller: None,
            attack: None,
        }
    }

    /// True while a hit has frozen this entity's own actions.
    #[inline]
    pub fn in_hitstun(&self) -> bool {
        self.hitstun > 0
    }

    /// Count down per-step timers.
    pub fn tick_timers(&mut self) {
        self.hitstun = self.hitstun.saturating_sub(1);
        self.invulnerable = self.invulnerable.saturating_sub(1);
    }

    /// Fold this entity into a state hash.
    pub fn hash_into(&self, hasher: &mut StateHasher) {
        hasher.update_u32(self.id.0);
        hasher.update_u8(self.kind.tag());
        hasher.update_bool(self.team == Team::Player);
        self.body.hash_into(hasher);
        hasher.update_i32(self.health);
        hasher.update_u32(self.hitstun);
        hasher.update_u32(self.invulnerable);
        hasher.update_bool(self.solid);
        hasher.update_bool(self.alive);
        if let Some(controller) = &self.controller {
            controller.hash_into(hasher);
        }
        if let Some(attack) = &self.attack {
            attack.hash_into(hasher);
        }
    }
}

impl Collidable for Entity {
    fn bounds(&self) -> Rect {
        self.body.bounds()
    }

    fn is_solid(&self) -> bool {
        self.solid && self.alive
    }
}

impl Movable for Entity {
    fn body(&self) -> &Body {
        &self.body
    }

    fn body_mut(&mut self) -> &mut Body {
        &mut self.body
    }
}

impl Movable for Body {
    fn body(&self) -> &Body {
        self
    }

    fn body_mut(&mut self) -> &mut Body {
        self
    }
}

impl Damageable for Entity {
    fn can_be_hit(&self) -> bool {
        self.alive && self.invulnerable == 0
    }

    fn take_hit(&mut self, damage: i32, hitstun: u32) -> bool {
        self.health = self.health.saturating_sub(damage);
        self.hitstun = hitstun;
        self.invulnerable = self.hit_iframes;
        if self.health <= 0 && self.alive {
            self.alive = false;
            return true;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dummy() -> Entity {
        let body = Body::new(FixedVec2::from_ints(10, 20), Rect::from_ints(-4, -8, 8, 8));
        Entity::new(EntityId(1), EntityKind::Enemy, Team::Enemy, body, 3)
    }

    #[test]
    fn test_bounds_follow_position() {
        let e = dummy();
        assert_eq!(e.bounds(), Rect::from_ints(6, 12, 8, 8));
    }

    #[test]
    fn test_take_hit_kills_once() {
        let mut e = dummy();
        assert!(!e.take_hit(2, 5));
        assert_eq!(e.hitstun, 5);
        assert!(e.take_hit(2, 5));
        assert!(!e.alive);
        assert!(!e.can_be_hit());
        assert!(!e.take_hit(2, 5));
    }

    #[test]
    fn test_iframes_block_hits_until_expired() {
        let mut e = dummy();
        e.hit_iframes = 2;
        e.take_hit(1, 0);
        assert!(!e.can_be_hit());
        e.tick_timers();
        e.tick_timers();
        assert!(e.can_be_hit());
    }

    #[test]
    fn test_face_ignores_zero() {
        let mut body = Body::new(FixedVec2::ZERO, Rect::from_ints(0, 0, 1, 1));
        body.face(-3);
        assert_eq!(body.direction, -1);
        body.face(0);
        assert_eq!(body.direction, -1);
    }

    #[test]
    fn test_team_opponent() {
        assert_eq!(Team::Player.opponent(), Team::Enemy);
        assert_eq!(Team::Enemy.opponent(), Team::Player);
    }
}
