//! Error taxonomy shared by the derivations and the store seam.

use std::fmt;

use thiserror::Error;

/// Failures reported by an [`EventStore`](crate::EventStore) implementation.
///
/// Fatal for the current query only. The core never retries.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing store could not be opened.
    #[error("event store unavailable at {location}")]
    Unavailable {
        location: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// The store was reachable but the read failed.
    #[error("event store query failed")]
    Query(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// What kind of entity a lookup was for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Session,
    TmuxSession,
    AgentType,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Session => "session",
            Self::TmuxSession => "tmux session",
            Self::AgentType => "agent type",
        })
    }
}

/// Errors surfaced by the derivation queries.
#[derive(Debug, Error)]
pub enum QueryError {
    /// No session, tmux session or agent type matches the requested id.
    #[error("{kind} not found: {id}")]
    NotFound { kind: EntityKind, id: String },

    /// No session in the slice has a `Stop` event, so work/wait time cannot
    /// be computed from ground truth.
    #[error("no session with a Stop event; work/wait time is not computed without one")]
    NoEligibleData,

    /// The log holds no event with a session id.
    #[error("no session recorded yet")]
    NoSessions,

    /// The event store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl QueryError {
    pub(crate) fn not_found(kind: EntityKind, id: &str) -> Self {
        Self::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    /// Returns true for the 404-equivalent variants.
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::NoSessions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_message_names_the_entity() {
        let err = QueryError::not_found(EntityKind::TmuxSession, "main");
        assert_eq!(err.to_string(), "tmux session not found: main");
        assert!(err.is_not_found());
    }

    #[test]
    fn test_no_eligible_data_is_not_a_not_found() {
        assert!(!QueryError::NoEligibleData.is_not_found());
    }
}
