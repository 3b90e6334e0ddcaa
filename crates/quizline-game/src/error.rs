//! Error types for the game layer.

use crate::StoreError;

/// Errors an inbound event can produce.
///
/// Most variants are shown to the client that caused them via
/// `game:errorMessage` (see [`client_message`](Self::client_message)).
/// [`Precondition`](Self::Precondition) is the exception: events that
/// arrive in the wrong phase or from the wrong role are dropped silently.
#[derive(Debug, thiserror::Error)]
pub enum GameError {
    /// The shared secret didn't match.
    #[error("bad password")]
    BadPassword,

    /// The session limit is reached.
    #[error("a session is already active")]
    AlreadyActive,

    /// The username failed validation; carries the human-readable reason.
    #[error("invalid username: {0}")]
    InvalidUsername(String),

    /// No live session has this invite code.
    #[error("room not found")]
    RoomNotFound,

    /// Another player in the room already uses this username.
    #[error("username {0:?} already exists")]
    UsernameTaken(String),

    /// The room left the lobby.
    #[error("game already started")]
    AlreadyStarted,

    /// The connection already manages or plays in a room.
    #[error("connection is already bound to a room")]
    AlreadyJoined,

    /// The question bank had nothing to draw.
    #[error("question bank is empty")]
    EmptyDeck,

    /// Persisting the room or its deck failed.
    #[error("could not create room: {0}")]
    RoomCreation(#[source] StoreError),

    /// Persisting the player failed.
    #[error("could not register player: {0}")]
    PlayerRegistration(#[source] StoreError),

    /// The event doesn't apply right now (wrong phase, wrong role, stale
    /// data). Never reported to the client.
    #[error("ignored: {0}")]
    Precondition(&'static str),
}

impl GameError {
    /// The text to put in `game:errorMessage`, or `None` if the error is
    /// dropped silently.
    pub fn client_message(&self) -> Option<String> {
        let message = match self {
            Self::BadPassword => "Bad Password",
            Self::AlreadyActive => "A game is already running",
            Self::InvalidUsername(reason) => return Some(reason.clone()),
            Self::RoomNotFound => "Room not found",
            Self::UsernameTaken(_) => "Username already exists",
            Self::AlreadyStarted => "Game already started",
            Self::AlreadyJoined => "Already in a room",
            Self::EmptyDeck => "No questions available",
            Self::RoomCreation(_) => "Error creating room in database",
            Self::PlayerRegistration(_) => "Error joining the game",
            Self::Precondition(_) => return None,
        };
        Some(message.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preconditions_are_silent() {
        assert_eq!(GameError::Precondition("not the manager").client_message(), None);
    }

    #[test]
    fn test_store_failures_hide_details() {
        let err = GameError::RoomCreation(StoreError::Unavailable("disk full".into()));
        assert_eq!(
            err.client_message().as_deref(),
            Some("Error creating room in database")
        );
        assert!(err.to_string().contains("disk full"));
    }

    #[test]
    fn test_invalid_username_passes_reason_through() {
        let err = GameError::InvalidUsername("Username is required".into());
        assert_eq!(err.client_message().as_deref(), Some("Username is required"));
    }
}
