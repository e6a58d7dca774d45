//! Core deterministic primitives.
//!
//! Fixed-point scalars, vectors, rectangles and state hashing. Nothing in
//! this module knows about entities or rooms.

pub mod fixed;
pub mod vec2;
pub mod rect;
pub mod hash;

// Re-export core types
pub use fixed::{approach, Fixed, FixedNum, FIXED_HALF, FIXED_ONE, FIXED_SCALE};
pub use vec2::FixedVec2;
pub use rect::Rect;
pub use hash::{compute_state_hash, StateHash, StateHasher};
