//! Level Objects and Level State
//!
//! Doors and switches placed in a room. Each gets a `level_state_id` in
//! room order (doors first, then switches); objects with state write it
//! into the [`LevelStateStore`] under `(room id, level_state_id)` when the
//! room is left, and read it back when the room is entered again.
//!
//! The store treats state as opaque bytes so the persistence layer can
//! write it out without knowing what any object keeps.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::core::fixed::{from_int, Fixed};
use crate::core::hash::StateHasher;
use crate::core::rect::Rect;
use crate::core::vec2::FixedVec2;
use crate::error::SimResult;
use crate::game::entity::Body;
use crate::game::events::GameEvent;
use crate::game::input::{Button, InputState};
use crate::game::room::{DoorDirection, DoorSpec, Room};

/// Upward doors need a real jump, not a drift.
const UP_DOOR_MIN_SPEED: Fixed = from_int(-6);

// =============================================================================
// OBJECTS
// =============================================================================

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LevelObjectKind {
    Door(DoorSpec),
    Switch { on: bool },
}

/// A placed object with a persistence slot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LevelObject {
    pub level_state_id: u32,
    pub rect: Rect,
    pub kind: LevelObjectKind,
}

/// What a step of level objects asked the world to do.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LevelOutcome {
    /// Index into the room's doors of a door the player left through
    pub transition: Option<usize>,
}

impl LevelObject {
    /// Instantiate the room's objects with sequential state ids.
    pub fn from_room(room: &Room) -> Vec<LevelObject> {
        let doors = room.doors.iter().map(|door| (door.rect, LevelObjectKind::Door(door.clone())));
        let switches = room.switches.iter().map(|switch| {
            (
                switch.rect,
                LevelObjectKind::Switch {
                    on: switch.initially_on,
                },
            )
        });
        doors
            .chain(switches)
            .zip(0u32..)
            .map(|((rect, kind), level_state_id)| LevelObject {
                level_state_id,
                rect,
                kind,
            })
            .collect()
    }

    /// Persisted state; empty for stateless objects.
    pub fn state_bytes(&self) -> SimResult<Vec<u8>> {
        match &self.kind {
            LevelObjectKind::Door(_) => Ok(Vec::new()),
            LevelObjectKind::Switch { on } => Ok(bincode::serialize(on)?),
        }
    }

    /// Restore state written by [`LevelObject::state_bytes`].
    pub fn read_state(&mut self, bytes: &[u8]) -> SimResult<()> {
        if let LevelObjectKind::Switch { on } = &mut self.kind {
            *on = bincode::deserialize(bytes)?;
        }
        Ok(())
    }

    pub fn is_on(&self) -> Option<bool> {
        match self.kind {
            LevelObjectKind::Switch { on } => Some(on),
            LevelObjectKind::Door(_) => None,
        }
    }

    pub fn hash_into(&self, hasher: &mut StateHasher) {
        hasher.update_u32(self.level_state_id);
        hasher.update_rect(&self.rect);
        match &self.kind {
            LevelObjectKind::Door(door) => {
                hasher.update_u8(0);
                hasher.update_str(&door.destination);
            }
            LevelObjectKind::Switch { on } => {
                hasher.update_u8(1);
                hasher.update_bool(*on);
            }
        }
    }
}

/// True when the player is leaving through `door` this step.
pub fn entry_check(door: &DoorSpec, player: &Body) -> bool {
    let center = door.rect.center();
    let position = player.position;
    let velocity = player.velocity;
    match door.direction {
        DoorDirection::Up => position.y < center.y && velocity.y < UP_DOOR_MIN_SPEED,
        DoorDirection::Down => position.y > center.y && velocity.y > 0,
        DoorDirection::Left => position.x < center.x && velocity.x < 0,
        DoorDirection::Right => position.x > center.x && velocity.x > 0,
    }
}

/// Update every level object against the player for one step.
///
/// A door that fires clears the player's input and holds the exit
/// direction so the player keeps walking through the transition.
pub fn update_level_objects(
    objects: &mut [LevelObject],
    player: &Body,
    input: &mut InputState,
    step: u32,
    events: &mut Vec<GameEvent>,
) -> LevelOutcome {
    let bounds = player.bounds();
    let mut outcome = LevelOutcome::default();
    let mut door_index = 0usize;

    for object in objects.iter_mut() {
        let touching = bounds.intersects(&object.rect);
        match &mut object.kind {
            LevelObjectKind::Door(door) => {
                let index = door_index;
                door_index += 1;
                if door.exit_only || outcome.transition.is_some() || !touching {
                    continue;
                }
                if entry_check(door, player) {
                    input.clear_all();
                    match door.direction {
                        DoorDirection::Right => input.press(Button::Right),
                        DoorDirection::Left => input.press(Button::Left),
                        DoorDirection::Up | DoorDirection::Down => {}
                    }
                    debug!(destination = %door.destination, door = index, "room transition requested");
                    events.push(GameEvent::room_transition_requested(step, &door.destination, index));
                    outcome.transition = Some(index);
                }
            }
            LevelObjectKind::Switch { on } => {
                if touching && input.consume(Button::Interact) {
                    *on = !*on;
                    trace!(id = object.level_state_id, on = *on, "switch toggled");
                    events.push(GameEvent::level_object_toggled(step, object.level_state_id, *on));
                }
            }
        }
    }

    outcome
}

// =============================================================================
// ARRIVAL
// =============================================================================

/// Where and how the player appears in a freshly entered room.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Arrival {
    pub position: FixedVec2,
    /// New facing, if the door sets one
    pub direction: Option<i32>,
    pub velocity: FixedVec2,
}

/// Pick the arrival door in the new room.
///
/// The door named by the entry door's exit warp id wins, then the door
/// leading back to `previous_room`, then the first door. A room without
/// doors has no arrival; the caller uses the room spawn instead.
pub fn arrival(
    doors: &[DoorSpec],
    previous_room: &str,
    entry: Option<&DoorSpec>,
    player_height: Fixed,
) -> Option<Arrival> {
    let first = doors.first()?;
    let chosen = match entry.and_then(|door| door.exit_warp_id) {
        Some(warp) => doors.iter().find(|door| door.warp_id == Some(warp)),
        None => doors.iter().find(|door| door.destination == previous_room),
    }
    .unwrap_or(first);

    let rect = chosen.rect;
    let half_height = player_height / 2;
    let y = match chosen.direction {
        DoorDirection::Up | DoorDirection::Down => rect.top() - half_height,
        DoorDirection::Left | DoorDirection::Right => rect.bottom() - half_height,
    };
    let velocity = if chosen.direction == DoorDirection::Down {
        FixedVec2::from_ints(6 * chosen.eject, -13)
    } else {
        FixedVec2::ZERO
    };

    Some(Arrival {
        position: FixedVec2::new(rect.left() + rect.w / 2, y),
        direction: (chosen.eject != 0).then_some(chosen.eject.signum()),
        velocity,
    })
}

// =============================================================================
// STORE
// =============================================================================

/// Saved object state keyed by `(room id, level_state_id)`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelStateStore {
    states: BTreeMap<(String, u32), Vec<u8>>,
}

impl LevelStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, room: &str, level_state_id: u32) -> Option<&[u8]> {
        self.states
            .get(&(room.to_string(), level_state_id))
            .map(Vec::as_slice)
    }

    /// Replace the blob for one object.
    pub fn insert(&mut self, room: &str, level_state_id: u32, bytes: Vec<u8>) {
        self.states.insert((room.to_string(), level_state_id), bytes);
    }

    /// Write every object's state; empty states are skipped.
    pub fn write_room(&mut self, room: &str, objects: &[LevelObject]) -> SimResult<()> {
        for object in objects {
            let bytes = object.state_bytes()?;
            if !bytes.is_empty() {
                self.insert(room, object.level_state_id, bytes);
            }
        }
        Ok(())
    }

    /// Restore every object that has saved state.
    pub fn read_room(&self, room: &str, objects: &mut [LevelObject]) -> SimResult<()> {
        for object in objects {
            if let Some(bytes) = self.get(room, object.level_state_id) {
                object.read_state(bytes)?;
            }
        }
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&(String, u32), &Vec<u8>)> {
        self.states.iter()
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Whole store as one blob for the persistence layer.
    pub fn to_bytes(&self) -> SimResult<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> SimResult<Self> {
        Ok(bincode::deserialize(bytes)?)
    }

    pub fn hash_into(&self, hasher: &mut StateHasher) {
        hasher.update_u32(self.states.len() as u32);
        for ((room, id), bytes) in &self.states {
            hasher.update_str(room);
            hasher.update_u32(*id);
            hasher.update_bytes(bytes);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::tiles::TileGrid;

    fn room() -> Room {
        let grid = TileGrid::from_rows(&["........", "........", "########"], 16).unwrap();
        let mut back = DoorSpec::new(Rect::from_ints(0, 0, 16, 32), DoorDirection::Left, "west");
        back.eject = 1;
        let mut warp = DoorSpec::new(Rect::from_ints(112, 0, 16, 32), DoorDirection::Right, "east");
        warp.warp_id = Some(7);
        Room::new("middle", grid)
            .with_door(back)
            .with_door(warp)
            .with_switch(Rect::from_ints(48, 16, 16, 16), false)
    }

    fn player_at(x: i32, y: i32, vx: i32) -> Body {
        let mut body = Body::new(FixedVec2::from_ints(x, y), Rect::from_ints(-8, -8, 16, 16));
        body.velocity.x = from_int(vx);
        body
    }

    #[test]
    fn test_state_ids_doors_then_switches() {
        let objects = LevelObject::from_room(&room());
        let ids: Vec<u32> = objects.iter().map(|o| o.level_state_id).collect();
        assert_eq!(ids, vec![0, 1, 2]);
        assert_eq!(objects[2].is_on(), Some(false));
    }

    #[test]
    fn test_only_stateful_objects_are_written() {
        let mut objects = LevelObject::from_room(&room());
        objects[2].kind = LevelObjectKind::Switch { on: true };
        let mut store = LevelStateStore::new();
        store.write_room("middle", &objects).unwrap();
        assert_eq!(store.len(), 1);
        assert!(store.get("middle", 0).is_none());

        let mut fresh = LevelObject::from_room(&room());
        store.read_room("middle", &mut fresh).unwrap();
        assert_eq!(fresh[2].is_on(), Some(true));

        let restored = LevelStateStore::from_bytes(&store.to_bytes().unwrap()).unwrap();
        assert_eq!(restored, store);
    }

    #[test]
    fn test_door_fires_only_moving_out() {
        let mut objects = LevelObject::from_room(&room());
        let mut input = InputState::default();
        let mut events = Vec::new();

        // Overlapping the east door but walking back in
        let inward = player_at(124, 16, -2);
        let outcome = update_level_objects(&mut objects, &inward, &mut input, 0, &mut events);
        assert_eq!(outcome.transition, None);

        let outward = player_at(124, 16, 2);
        let outcome = update_level_objects(&mut objects, &outward, &mut input, 1, &mut events);
        assert_eq!(outcome.transition, Some(1));
        assert!(input.is_down(Button::Right));
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn test_switch_toggles_on_interact() {
        let mut objects = LevelObject::from_room(&room());
        let mut input = InputState::default();
        let mut events = Vec::new();
        let player = player_at(56, 24, 0);

        update_level_objects(&mut objects, &player, &mut input, 0, &mut events);
        assert_eq!(objects[2].is_on(), Some(false));

        input.press(Button::Interact);
        update_level_objects(&mut objects, &player, &mut input, 1, &mut events);
        assert_eq!(objects[2].is_on(), Some(true));
        assert!(!input.was_pressed(Button::Interact));
    }

    #[test]
    fn test_arrival_prefers_warp_then_back_door() {
        let doors = room().doors;
        let mut entry = DoorSpec::new(Rect::from_ints(0, 0, 1, 1), DoorDirection::Left, "middle");

        entry.exit_warp_id = Some(7);
        let at_warp = arrival(&doors, "west", Some(&entry), from_int(48)).unwrap();
        assert_eq!(at_warp.position, FixedVec2::from_ints(120, 8));
        assert_eq!(at_warp.direction, None);

        entry.exit_warp_id = None;
        let back = arrival(&doors, "west", Some(&entry), from_int(48)).unwrap();
        assert_eq!(back.position, FixedVec2::from_ints(8, 8));
        assert_eq!(back.direction, Some(1));

        let fallback = arrival(&doors, "nowhere", None, from_int(48)).unwrap();
        assert_eq!(fallback.position, back.position);
        assert!(arrival(&[], "west", None, from_int(48)).is_none());
    }

    #[test]
    fn test_downward_door_arrival_hops_up() {
        let mut door = DoorSpec::new(Rect::from_ints(32, 0, 16, 16), DoorDirection::Down, "a");
        door.eject = -1;
        let a = arrival(&[door], "a", None, from_int(16)).unwrap();
        assert_eq!(a.velocity, FixedVec2::from_ints(-6, -13));
        assert_eq!(a.position, FixedVec2::from_ints(40, -8));
    }
}
