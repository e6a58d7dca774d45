//! Game Logic Module
//!
//! Everything that runs inside a simulation step. 100% deterministic.
//!
//! ## Module Structure
//!
//! - `input`: Device sampling, logical buttons, buffered edges, recordings
//! - `tiles` / `room`: Tile grids, doors, switches and room loading
//! - `collision` / `mover`: Sweeps against tiles and solids, gravity, steering
//! - `attack` / `hitbox` / `scripts`: Attack timelines and what they spawn
//! - `combat`: Hitbox movement, hit tests, damage and knockback
//! - `player`: Walk, jump, coyote time and fall-through
//! - `level` / `camera`: Door transitions, switch state, update radius
//! - `clock`: Fixed steps per frame and hitpause
//! - `state` / `tick`: The world and its frame loop
//! - `events`: Ordered output for presentation and replay checks

pub mod attack;
pub mod camera;
pub mod clock;
pub mod collision;
pub mod combat;
pub mod config;
pub mod entity;
pub mod events;
pub mod hitbox;
pub mod input;
pub mod level;
pub mod mover;
pub mod player;
pub mod room;
pub mod scripts;
pub mod state;
pub mod tick;
pub mod tiles;

// Re-export key types
pub use attack::{AttackDefinition, AttackInstance};
pub use clock::SimulationClock;
pub use config::SimConfig;
pub use entity::{Entity, EntityId, EntityKind, Team};
pub use events::GameEvent;
pub use input::{Button, DeviceRecording, InputState, RawDeviceState};
pub use room::{InMemoryRooms, Room, RoomProvider};
pub use state::World;
pub use tick::{run_frame, FrameInput, FrameReport};
