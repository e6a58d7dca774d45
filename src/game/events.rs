//! Game Events
//!
//! Fire-and-forget notifications for the presentation layer (audio cues,
//! particles) and for replay diagnostics. The simulation never waits on
//! them; the owning loop drains them once per frame.

use serde::{Deserialize, Serialize};

use crate::core::vec2::FixedVec2;
use crate::game::entity::EntityId;
use crate::game::hitbox::HitboxId;

/// Priority for event processing order.
///
/// Lower value = processed first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum EventPriority {
    /// Damage and deaths
    Combat = 0,
    /// Hitbox lifecycle
    Hitbox = 1,
    /// Attack timeline
    Attack = 2,
    /// Doors and switches
    Level = 3,
    /// Sounds and particles
    Presentation = 4,
    /// Pause and room flow
    Flow = 5,
}

/// Game event data.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum GameEventData {
    /// Play a hit sound at a world position
    HitCue {
        position: FixedVec2,
        sound: Option<String>,
    },

    /// A hitbox connected
    HitLanded {
        hitbox: HitboxId,
        owner: EntityId,
        target: EntityId,
        damage: i32,
    },

    /// Entity health reached zero; removed at end of step
    EntityDestroyed {
        entity: EntityId,
        position: FixedVec2,
    },

    /// Spawn a one-shot particle (projectile impacts)
    DeathParticle {
        position: FixedVec2,
        particle: Option<String>,
    },

    HitboxSpawned {
        hitbox: HitboxId,
        owner: EntityId,
        projectile: bool,
    },

    HitboxExpired {
        hitbox: HitboxId,
    },

    AttackStarted {
        entity: EntityId,
        attack: String,
    },

    AttackEnded {
        entity: EntityId,
        attack: String,
    },

    /// Scripted velocity impulse applied
    PusherFired {
        entity: EntityId,
        velocity: FixedVec2,
    },

    /// Player left through a door; the owner should call `enter_room`
    RoomTransitionRequested {
        destination: String,
        door: usize,
    },

    RoomEntered {
        room: String,
    },

    /// A switch changed state
    LevelObjectToggled {
        level_state_id: u32,
        on: bool,
    },

    Paused,

    Unpaused,
}

/// A game event with timing and priority.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GameEvent {
    /// Step when the event occurred
    pub tick: u32,

    /// Processing priority
    pub priority: EventPriority,

    /// Entity involved (for tie-breaking)
    pub entity: Option<EntityId>,

    /// Event data
    pub data: GameEventData,
}

impl GameEvent {
    /// Create a new event.
    pub fn new(tick: u32, priority: EventPriority, data: GameEventData) -> Self {
        let entity = match &data {
            GameEventData::HitLanded { target, .. } => Some(*target),
            GameEventData::EntityDestroyed { entity, .. } => Some(*entity),
            GameEventData::HitboxSpawned { owner, .. } => Some(*owner),
            GameEventData::AttackStarted { entity, .. } => Some(*entity),
            GameEventData::AttackEnded { entity, .. } => Some(*entity),
            GameEventData::PusherFired { entity, .. } => Some(*entity),
            _ => None,
        };

        Self {
            tick,
            priority,
            entity,
            data,
        }
    }

    pub fn hit_cue(tick: u32, position: FixedVec2, sound: Option<String>) -> Self {
        Self::new(
            tick,
            EventPriority::Presentation,
            GameEventData::HitCue { position, sound },
        )
    }

    pub fn hit_landed(
        tick: u32,
        hitbox: HitboxId,
        owner: EntityId,
        target: EntityId,
        damage: i32,
    ) -> Self {
        Self::new(
            tick,
            EventPriority::Combat,
            GameEventData::HitLanded {
                hitbox,
                owner,
                target,
                damage,
            },
        )
    }

    pub fn entity_destroyed(tick: u32, entity: EntityId, position: FixedVec2) -> Self {
        Self::new(
            tick,
            EventPriority::Combat,
            GameEventData::EntityDestroyed { entity, position },
        )
    }

    pub fn death_particle(tick: u32, position: FixedVec2, particle: Option<String>) -> Self {
        Self::new(
            tick,
            EventPriority::Presentation,
            GameEventData::DeathParticle { position, particle },
        )
    }

    pub fn hitbox_spawned(tick: u32, hitbox: HitboxId, owner: EntityId, projectile: bool) -> Self {
        Self::new(
            tick,
            EventPriority::Hitbox,
            GameEventData::HitboxSpawned {
                hitbox,
                owner,
                projectile,
            },
        )
    }

    pub fn hitbox_expired(tick: u32, hitbox: HitboxId) -> Self {
        Self::new(tick, EventPriority::Hitbox, GameEventData::HitboxExpired { hitbox })
    }

    pub fn attack_started(tick: u32, entity: EntityId, attack: &str) -> Self {
        Self::new(
            tick,
            EventPriority::Attack,
            GameEventData::AttackStarted {
                entity,
                attack: attack.to_string(),
            },
        )
    }

    pub fn attack_ended(tick: u32, entity: EntityId, attack: &str) -> Self {
        Self::new(
            tick,
            EventPriority::Attack,
            GameEventData::AttackEnded {
                entity,
                attack: attack.to_string(),
            },
        )
    }

    pub fn pusher_fired(tick: u32, entity: EntityId, velocity: FixedVec2) -> Self {
        Self::new(
            tick,
            EventPriority::Attack,
            GameEventData::PusherFired { entity, velocity },
        )
    }

    pub fn room_transition_requested(tick: u32, destination: &str, door: usize) -> Self {
        Self::new(
            tick,
            EventPriority::Flow,
            GameEventData::RoomTransitionRequested {
                destination: destination.to_string(),
                door,
            },
        )
    }

    pub fn room_entered(tick: u32, room: &str) -> Self {
        Self::new(
            tick,
            EventPriority::Flow,
            GameEventData::RoomEntered {
                room: room.to_string(),
            },
        )
    }

    pub fn level_object_toggled(tick: u32, level_state_id: u32, on: bool) -> Self {
        Self::new(
            tick,
            EventPriority::Level,
            GameEventData::LevelObjectToggled { level_state_id, on },
        )
    }

    pub fn paused(tick: u32) -> Self {
        Self::new(tick, EventPriority::Flow, GameEventData::Paused)
    }

    pub fn unpaused(tick: u32) -> Self {
        Self::new(tick, EventPriority::Flow, GameEventData::Unpaused)
    }
}

impl PartialEq for GameEvent {
    fn eq(&self, other: &Self) -> bool {
        self.tick == other.tick && self.priority == other.priority && self.entity == other.entity
    }
}

impl Eq for GameEvent {}

impl PartialOrd for GameEvent {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for GameEvent {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // Sort by: tick, then priority, then entity id
        self.tick
            .cmp(&other.tick)
            .then(self.priority.cmp(&other.priority))
            .then(self.entity.cmp(&other.entity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_ordering() {
        let hit = GameEvent::hit_landed(10, HitboxId(1), EntityId(1), EntityId(2), 1);
        let cue = GameEvent::hit_cue(10, FixedVec2::ZERO, None);
        let other_hit = GameEvent::hit_landed(10, HitboxId(1), EntityId(1), EntityId(3), 1);
        let earlier = GameEvent::paused(9);

        // Same tick, combat before presentation
        assert!(hit < cue);

        // Same tick and priority, lower entity first
        assert!(hit < other_hit);

        assert!(earlier < hit);
    }

    #[test]
    fn test_entity_extracted_for_tie_break() {
        let e = GameEvent::pusher_fired(0, EntityId(7), FixedVec2::ZERO);
        assert_eq!(e.entity, Some(EntityId(7)));
        assert_eq!(GameEvent::paused(0).entity, None);
    }
}
