//! Attack Definitions and Timelines
//!
//! An attack definition is immutable data loaded once and shared through
//! `Arc`. An attack instance tracks how far one entity has played through a
//! definition and which trigger frames have already fired.
//!
//! ```text
//!   frame:     1    2    3    4    5 ... length
//!   spawns:         ▲ melee       ▲ projectile
//!   pushers:   ▲ (dash forward)
//! ```
//!
//! Each trigger fires exactly once, when the reported frame first reaches
//! or passes it, even if frames are skipped.

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::fixed::{FixedNum, MAX_PIXELS};
use crate::core::hash::StateHasher;
use crate::core::vec2::FixedVec2;
use crate::error::{SimError, SimResult};

// =============================================================================
// DESCRIPTORS
// =============================================================================

/// Grounded state an attack may be started from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Groundedness {
    #[default]
    Any,
    GroundOnly,
    AirOnly,
}

impl Groundedness {
    /// Whether an entity with this grounded state may start the attack.
    pub fn allows(self, grounded: bool) -> bool {
        match self {
            Groundedness::Any => true,
            Groundedness::GroundOnly => grounded,
            Groundedness::AirOnly => !grounded,
        }
    }
}

/// Decimal 2D vector for content files.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vec2Spec {
    pub x: FixedNum,
    pub y: FixedNum,
}

impl Vec2Spec {
    pub const fn new(x: FixedNum, y: FixedNum) -> Self {
        Self { x, y }
    }

    #[inline]
    pub fn to_vec(self) -> FixedVec2 {
        FixedVec2::new(self.x.raw(), self.y.raw())
    }
}

/// Knockback applied to a target on hit.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Knockback {
    /// Speed of the resulting velocity
    pub magnitude: FixedNum,
    /// Degrees, counter-clockwise, up positive
    pub angle: i32,
    /// Launch grounded targets into the air instead of sliding them
    #[serde(default)]
    pub ground_launch: bool,
}

impl Knockback {
    pub const fn new(magnitude: FixedNum, angle: i32, ground_launch: bool) -> Self {
        Self {
            magnitude,
            angle,
            ground_launch,
        }
    }

    /// Velocity for an attacker facing `direction`.
    pub fn velocity(&self, direction: i32) -> FixedVec2 {
        FixedVec2::from_polar(self.magnitude.raw(), self.angle).mirror_x(direction)
    }

    #[inline]
    pub fn is_none(&self) -> bool {
        self.magnitude.raw() == 0
    }
}

/// Extra data for self-propelled hitboxes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectileSpec {
    /// Launch velocity; X is mirrored by the owner's facing
    #[serde(default)]
    pub velocity: Vec2Spec,
    #[serde(default)]
    pub gravity: FixedNum,
    #[serde(default)]
    pub fall_speed: FixedNum,
    /// Keep flying through solid tiles
    #[serde(default = "default_true")]
    pub ignore_tiles: bool,
    /// Registered per-step hook id
    #[serde(default)]
    pub hook: Option<String>,
    /// Particle id announced when the projectile hits a tile
    #[serde(default)]
    pub death_particle: Option<String>,
}

/// Melee hitboxes follow their owner; projectiles fly on their own.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HitboxSpawnKind {
    #[default]
    Melee,
    Projectile(ProjectileSpec),
}

/// Hitbox created when the timeline reaches `frame`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HitboxSpawn {
    /// Trigger frame (1-based)
    pub frame: u32,
    #[serde(default = "default_damage")]
    pub damage: i32,
    /// Targets enemies when true, the player side otherwise
    #[serde(default)]
    pub friendly: bool,
    #[serde(default)]
    pub knockback: Knockback,
    #[serde(default = "default_one")]
    pub pierce: u32,
    #[serde(default = "default_hitstun")]
    pub hitstun: u32,
    #[serde(default = "default_lifetime")]
    pub lifetime: u32,
    /// Center offset from the owner, X mirrored by facing
    #[serde(default)]
    pub offset: Vec2Spec,
    /// Box size in pixels
    #[serde(default)]
    pub width: i32,
    #[serde(default)]
    pub height: i32,
    #[serde(default)]
    pub hit_sound: Option<String>,
    /// Registered on-hit effect ids, run in order
    #[serde(default)]
    pub on_hit: Vec<String>,
    #[serde(default = "default_true")]
    pub active: bool,
    /// Hitpause requested on hit
    #[serde(default)]
    pub hitpause: u32,
    #[serde(default)]
    pub kind: HitboxSpawnKind,
}

impl HitboxSpawn {
    /// Melee spawn with default combat values.
    pub fn melee(frame: u32, offset: Vec2Spec, width: i32, height: i32) -> Self {
        Self {
            frame,
            damage: default_damage(),
            friendly: false,
            knockback: Knockback::default(),
            pierce: default_one(),
            hitstun: default_hitstun(),
            lifetime: default_lifetime(),
            offset,
            width,
            height,
            hit_sound: None,
            on_hit: Vec::new(),
            active: true,
            hitpause: 0,
            kind: HitboxSpawnKind::Melee,
        }
    }
}

/// Velocity impulse at a trigger frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pusher {
    pub frame: u32,
    /// New velocity; X is mirrored by facing
    pub velocity: Vec2Spec,
}

fn default_true() -> bool {
    true
}

fn default_one() -> u32 {
    1
}

fn default_damage() -> i32 {
    1
}

fn default_hitstun() -> u32 {
    24
}

fn default_lifetime() -> u32 {
    3
}

fn default_frame_rate() -> u32 {
    1
}

// =============================================================================
// DEFINITION
// =============================================================================

/// Immutable attack data.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttackDefinition {
    pub name: String,
    /// Animation length in frames
    pub length: u32,
    /// Simulation steps per animation frame when self-timed
    #[serde(default = "default_frame_rate")]
    pub frame_rate: u32,
    #[serde(default)]
    pub groundedness: Groundedness,
    #[serde(default)]
    pub hitboxes: Vec<HitboxSpawn>,
    #[serde(default)]
    pub pushers: Vec<Pusher>,
}

impl AttackDefinition {
    /// Parse, validate and order a definition.
    pub fn from_json_str(json: &str) -> SimResult<Arc<Self>> {
        let definition: AttackDefinition = serde_json::from_str(json)?;
        definition.prepare()
    }

    /// Read a definition from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> SimResult<Arc<Self>> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Validate and sort triggers by frame, then freeze behind an `Arc`.
    pub fn prepare(mut self) -> SimResult<Arc<Self>> {
        self.validate()?;
        self.hitboxes.sort_by_key(|h| h.frame);
        self.pushers.sort_by_key(|p| p.frame);
        debug!(
            attack = %self.name,
            length = self.length,
            hitboxes = self.hitboxes.len(),
            pushers = self.pushers.len(),
            "attack definition loaded"
        );
        Ok(Arc::new(self))
    }

    /// Structural checks: a non-empty timeline and every trigger inside it.
    pub fn validate(&self) -> SimResult<()> {
        let invalid = |reason: String| SimError::InvalidAttack {
            name: self.name.clone(),
            reason,
        };

        if self.length == 0 {
            return Err(invalid("animation length must be at least one frame".into()));
        }
        if self.frame_rate == 0 {
            return Err(invalid("frame rate must be at least one step".into()));
        }
        for spawn in &self.hitboxes {
            if spawn.frame == 0 || spawn.frame > self.length {
                return Err(invalid(format!(
                    "hitbox trigger frame {} outside 1..={}",
                    spawn.frame, self.length
                )));
            }
            if spawn.width < 0 || spawn.height < 0 {
                return Err(invalid("hitbox size must not be negative".into()));
            }
            if spawn.width > MAX_PIXELS || spawn.height > MAX_PIXELS {
                return Err(invalid(format!(
                    "hitbox size {}x{} exceeds {MAX_PIXELS} px",
                    spawn.width, spawn.height
                )));
            }
        }
        for pusher in &self.pushers {
            if pusher.frame == 0 || pusher.frame > self.length {
                return Err(invalid(format!(
                    "pusher trigger frame {} outside 1..={}",
                    pusher.frame, self.length
                )));
            }
        }
        Ok(())
    }

    /// Effect and hook ids referenced by this definition.
    pub fn script_ids(&self) -> (Vec<&str>, Vec<&str>) {
        let mut effects = Vec::new();
        let mut hooks = Vec::new();
        for spawn in &self.hitboxes {
            effects.extend(spawn.on_hit.iter().map(String::as_str));
            if let HitboxSpawnKind::Projectile(spec) = &spawn.kind {
                if let Some(hook) = &spec.hook {
                    hooks.push(hook.as_str());
                }
            }
        }
        (effects, hooks)
    }

    /// Total steps when self-timed.
    pub fn duration_steps(&self) -> u32 {
        self.length.saturating_mul(self.frame_rate)
    }
}

// =============================================================================
// INSTANCE
// =============================================================================

/// Triggers that became due on one advance.
#[derive(Debug)]
pub struct DueTriggers<'a> {
    pub spawns: Vec<&'a HitboxSpawn>,
    pub pushers: Vec<&'a Pusher>,
}

/// One entity's progress through an attack.
#[derive(Clone, Debug)]
pub struct AttackInstance {
    pub definition: Arc<AttackDefinition>,
    /// Steps since the attack started
    elapsed: u32,
    /// Highest frame whose triggers have fired
    processed: u32,
    /// Frame reported by the last advance
    frame: u32,
}

impl AttackInstance {
    pub fn new(definition: Arc<AttackDefinition>) -> Self {
        Self {
            definition,
            elapsed: 0,
            processed: 0,
            frame: 0,
        }
    }

    #[inline]
    pub fn frame(&self) -> u32 {
        self.frame
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.definition.name
    }

    /// Move to the driver-reported frame, or the self-timed frame when the
    /// driver reports nothing. Returns the window `(from, to]` of frames
    /// whose triggers are now due.
    pub fn advance(&mut self, reported: Option<u32>) -> (u32, u32) {
        let frame = reported.unwrap_or(1 + self.elapsed / self.definition.frame_rate);
        self.elapsed = self.elapsed.saturating_add(1);
        self.frame = frame;

        let from = self.processed;
        if frame > self.processed {
            self.processed = frame;
        }
        (from, self.processed)
    }

    /// Triggers with frame in `(from, to]`.
    pub fn due(&self, window: (u32, u32)) -> DueTriggers<'_> {
        let (from, to) = window;
        let in_window = |frame: u32| frame > from && frame <= to;
        DueTriggers {
            spawns: self
                .definition
                .hitboxes
                .iter()
                .filter(|h| in_window(h.frame))
                .collect(),
            pushers: self
                .definition
                .pushers
                .iter()
                .filter(|p| in_window(p.frame))
                .collect(),
        }
    }

    /// The timeline has run past its last frame.
    #[inline]
    pub fn finished(&self) -> bool {
        self.frame > self.definition.length
    }

    pub fn hash_into(&self, hasher: &mut StateHasher) {
        hasher.update_str(&self.definition.name);
        hasher.update_u32(self.elapsed);
        hasher.update_u32(self.processed);
        hasher.update_u32(self.frame);
    }
}

// =============================================================================
// TESTS
// =============================================================================
