//! Library error type.
//!
//! Only load-time and world-boundary failures are recoverable. Contract
//! violations inside the step loop panic instead.

use crate::game::entity::EntityId;

/// Errors surfaced by configuration, content loading and world operations.
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    /// Configuration values out of range
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// JSON could not be parsed
    #[error("parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Config or content file could not be read
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Attack definition failed validation
    #[error("invalid attack '{name}': {reason}")]
    InvalidAttack {
        /// Attack name
        name: String,
        /// What was wrong
        reason: String,
    },

    /// An on-hit effect id has no registered function
    #[error("unknown hit effect: {0}")]
    UnknownHitEffect(String),

    /// A projectile hook id has no registered function
    #[error("unknown projectile hook: {0}")]
    UnknownProjectileHook(String),

    /// Room provider has no room with this id
    #[error("unknown room: {0}")]
    UnknownRoom(String),

    /// Room layout could not be built
    #[error("invalid room: {0}")]
    InvalidRoom(String),

    /// Level object state could not be encoded or decoded
    #[error("level state codec error: {0}")]
    LevelState(#[from] bincode::Error),

    /// Entity id not present in the registry
    #[error("unknown entity: {0:?}")]
    UnknownEntity(EntityId),
}

/// Result alias for library operations.
pub type SimResult<T> = Result<T, SimError>;
