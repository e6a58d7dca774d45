//! # Frost Sim
//!
//! Deterministic per-frame simulation core for a 2D action platformer.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         FROST SIM                            │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/            - Deterministic primitives                 │
//! │  ├── fixed.rs     - Q16.16 fixed-point arithmetic            │
//! │  ├── vec2.rs      - 2D vector with fixed-point               │
//! │  ├── rect.rs      - Half-open axis-aligned boxes             │
//! │  └── hash.rs      - State hashing for verification           │
//! │                                                              │
//! │  game/            - Simulation (deterministic)               │
//! │  ├── input.rs     - Device sampling and buffered buttons     │
//! │  ├── mover.rs     - Gravity, steering, integration           │
//! │  ├── collision.rs - Tile and solid sweeps                    │
//! │  ├── combat.rs    - Hitboxes, damage, knockback              │
//! │  ├── clock.rs     - Fixed steps and hitpause                 │
//! │  ├── level.rs     - Doors, switches, saved room state        │
//! │  └── tick.rs      - Frame and step loop                      │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Determinism Guarantee
//!
//! The `core/` and `game/` modules are **100% deterministic**:
//! - No floating-point arithmetic in simulation state
//! - No HashMap (uses BTreeMap for sorted iteration)
//! - No system time dependencies
//!
//! Given identical starting worlds and frame inputs, the simulation
//! produces **identical state hashes** on any platform.

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod core;
pub mod error;
pub mod game;

// Re-export commonly used types
pub use core::fixed::{Fixed, FixedNum, FIXED_HALF, FIXED_ONE, FIXED_SCALE};
pub use core::vec2::FixedVec2;
pub use error::{SimError, SimResult};
pub use game::state::World;
pub use game::tick::{run_frame, FrameInput, FrameReport};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Nominal real frames per second
pub const FRAME_RATE: u32 = 60;
