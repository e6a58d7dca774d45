//! Rooms and the Room Provider
//!
//! A room is the unit of level streaming: one tile grid, its camera bounds
//! and the level objects placed in it. Decoding level files is the
//! provider's business; the simulation only asks for rooms by id.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::rect::Rect;
use crate::core::vec2::FixedVec2;
use crate::error::{SimError, SimResult};
use crate::game::tiles::TileGrid;

/// Side of the room a door leads out of.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DoorDirection {
    Up,
    Down,
    Left,
    Right,
}

/// Placement of a room transition.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoorSpec {
    /// Trigger area in pixels
    pub rect: Rect,
    /// Direction the player must be moving to leave through it
    pub direction: DoorDirection,
    /// Room this door leads to
    pub destination: String,
    /// Facing given to a player arriving here (0 keeps the current facing)
    pub eject: i32,
    /// Arrival-only doors never trigger
    pub exit_only: bool,
    /// Identifier other doors can target
    pub warp_id: Option<u32>,
    /// Door in the destination to arrive at
    pub exit_warp_id: Option<u32>,
}

impl DoorSpec {
    /// Plain door with no warp ids.
    pub fn new(rect: Rect, direction: DoorDirection, destination: impl Into<String>) -> Self {
        Self {
            rect,
            direction,
            destination: destination.into(),
            eject: 0,
            exit_only: false,
            warp_id: None,
            exit_warp_id: None,
        }
    }
}

/// Placement of an interactable toggle.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwitchSpec {
    pub rect: Rect,
    /// State before any saved state is restored
    pub initially_on: bool,
}

/// One loaded room.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    /// Level identifier, also the persistence namespace
    pub id: String,
    /// Camera bounds in pixels
    pub bounds: Rect,
    pub grid: TileGrid,
    pub doors: Vec<DoorSpec>,
    pub switches: Vec<SwitchSpec>,
    /// Player position used when the room has no doors
    pub spawn: FixedVec2,
}

impl Room {
    /// Room whose camera bounds match the grid.
    pub fn new(id: impl Into<String>, grid: TileGrid) -> Self {
        Self {
            id: id.into(),
            bounds: grid.pixel_bounds(),
            grid,
            doors: Vec::new(),
            switches: Vec::new(),
            spawn: FixedVec2::ZERO,
        }
    }

    pub fn with_spawn(mut self, spawn: FixedVec2) -> Self {
        self.spawn = spawn;
        self
    }

    pub fn with_door(mut self, door: DoorSpec) -> Self {
        self.doors.push(door);
        self
    }

    pub fn with_switch(mut self, rect: Rect, initially_on: bool) -> Self {
        self.switches.push(SwitchSpec { rect, initially_on });
        self
    }
}

/// Source of rooms by id.
pub trait RoomProvider {
    /// Fetch a room. Unknown ids are an error.
    fn load_room(&self, id: &str) -> SimResult<Room>;
}

/// Provider backed by a map of prebuilt rooms.
#[derive(Clone, Debug, Default)]
pub struct InMemoryRooms {
    rooms: BTreeMap<String, Room>,
}

impl InMemoryRooms {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, room: Room) {
        self.rooms.insert(room.id.clone(), room);
    }

    pub fn with(mut self, room: Room) -> Self {
        self.insert(room);
        self
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }
}

impl RoomProvider for InMemoryRooms {
    fn load_room(&self, id: &str) -> SimResult<Room> {
        self.rooms
            .get(id)
            .cloned()
            .ok_or_else(|| SimError::UnknownRoom(id.to_string()))
    }
}
