//! Identity types that travel on the wire.
//!
//! Every id is a "newtype wrapper" around a primitive, so a `PlayerId`
//! can never be passed where a `QuestionId` is expected even though both
//! are `u64` underneath. `#[serde(transparent)]` keeps the JSON form
//! plain: `PlayerId(42)` is just `42`.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Durable identifiers
// ---------------------------------------------------------------------------

/// A player's durable identifier, assigned by the persistence gateway
/// when the player joins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub u64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P-{}", self.0)
    }
}

/// Durable identifier of a per-room question snapshot.
///
/// Distinct from the question bank's own identifier: editing the bank
/// never touches a room that is already running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuestionId(pub u64);

impl fmt::Display for QuestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Q-{}", self.0)
    }
}

/// Durable identifier of a room, generated when the room is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(pub Uuid);

impl RoomId {
    /// Generates a fresh random (v4) room id.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Live identifiers
// ---------------------------------------------------------------------------

/// The short, human-shareable invite code players type to join a room.
///
/// Not to be confused with [`RoomId`], which is the durable identifier
/// used by persistence and never shown to players.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomCode(String);

impl RoomCode {
    /// Wraps a code string.
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    /// Returns the code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque identifier for one client connection.
///
/// A channel id addresses a single live connection. It changes every time
/// a client reconnects, which is why players are keyed by [`PlayerId`]
/// and not by channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelId(u64);

impl ChannelId {
    /// Creates a new `ChannelId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ch-{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_player_id_serializes_as_plain_number() {
        let json = serde_json::to_string(&PlayerId(42)).unwrap();
        assert_eq!(json, "42");
    }

    #[test]
    fn test_player_id_display() {
        assert_eq!(PlayerId(7).to_string(), "P-7");
    }

    #[test]
    fn test_room_code_serializes_as_plain_string() {
        let json = serde_json::to_string(&RoomCode::new("123456")).unwrap();
        assert_eq!(json, "\"123456\"");
        assert_eq!(RoomCode::new("123456").as_str(), "123456");
    }

    #[test]
    fn test_room_ids_are_unique() {
        assert_ne!(RoomId::generate(), RoomId::generate());
    }

    #[test]
    fn test_channel_id_new_and_into_inner() {
        let id = ChannelId::new(9);
        assert_eq!(id.into_inner(), 9);
        assert_eq!(id.to_string(), "ch-9");
    }

    #[test]
    fn test_channel_id_works_as_map_key() {
        use std::collections::HashMap;
        let mut map = HashMap::new();
        map.insert(ChannelId::new(1), "manager");
        map.insert(ChannelId::new(2), "player");
        assert_eq!(map[&ChannelId::new(1)], "manager");
    }
}
