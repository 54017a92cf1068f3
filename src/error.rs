//! Error types for actor spawning and system lifecycle.
//!
//! The hot path deliberately has no error surface: a send to a stopped
//! actor and a message with no matching handler are silent no-ops, visible
//! only through metrics and debug logs. Everything that can fail loudly
//! (naming, lifecycle) fails at spawn time with a variant below.

use thiserror::Error;

/// Spawn-time and lifecycle errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The requested name is empty, has an empty path segment, or contains
    /// a reserved character (`#`, `.`, `@`; `/` only separates segments).
    #[error("invalid actor name {name:?}: {reason}")]
    InvalidName { name: String, reason: String },

    /// Another live actor already owns this full name.
    #[error("actor name {name:?} is already registered")]
    NameConflict { name: String },

    /// The parent address no longer resolves to a live actor.
    #[error("parent actor {parent:?} is stopped")]
    ParentStopped { parent: String },

    /// The system has been shut down and no longer accepts spawns.
    #[error("actor system is shut down")]
    ShutDown,
}

impl Error {
    pub fn invalid_name(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidName {
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub fn name_conflict(name: impl Into<String>) -> Self {
        Self::NameConflict { name: name.into() }
    }

    pub fn parent_stopped(parent: impl Into<String>) -> Self {
        Self::ParentStopped {
            parent: parent.into(),
        }
    }
}

/// Result type alias for actor system operations.
pub type Result<T> = std::result::Result<T, Error>;
