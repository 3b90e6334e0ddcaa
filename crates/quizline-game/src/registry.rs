//! Live sessions keyed by invite code.

use std::collections::HashMap;
use std::sync::Arc;

use quizline_protocol::{ChannelId, RoomCode};
use rand::Rng;
use tokio::sync::Mutex;

use crate::{GameError, GameSession};

/// Shared handle to one live session.
pub type SessionHandle = Arc<Mutex<GameSession>>;

/// Tracks every live session and which connection belongs to which.
///
/// A connection is bound to at most one session at a time, either as its
/// manager or as a player. Lock order: the registry is always locked
/// before any session.
#[derive(Debug)]
pub struct SessionRegistry {
    sessions: HashMap<RoomCode, SessionHandle>,
    channels: HashMap<ChannelId, RoomCode>,
    capacity: usize,
}

impl SessionRegistry {
    /// Creates a registry holding at most `capacity` sessions.
    pub fn new(capacity: usize) -> Self {
        Self {
            sessions: HashMap::new(),
            channels: HashMap::new(),
            capacity: capacity.max(1),
        }
    }

    pub fn has_capacity(&self) -> bool {
        self.sessions.len() < self.capacity
    }

    /// Draws a 6-digit invite code no live session uses.
    pub fn generate_code(&self) -> RoomCode {
        let mut rng = rand::rng();
        loop {
            let code = RoomCode::new(rng.random_range(100_000..1_000_000).to_string());
            if !self.sessions.contains_key(&code) {
                return code;
            }
        }
    }

    /// Registers a session and binds its manager's connection.
    pub fn insert(&mut self, session: GameSession) -> Result<SessionHandle, GameError> {
        if !self.has_capacity() {
            return Err(GameError::AlreadyActive);
        }
        let manager = session.manager();
        if self.channels.contains_key(&manager) {
            return Err(GameError::AlreadyJoined);
        }
        let code = session.room_code().clone();
        let handle = Arc::new(Mutex::new(session));
        self.channels.insert(manager, code.clone());
        self.sessions.insert(code.clone(), Arc::clone(&handle));
        tracing::info!(room = %code, sessions = self.sessions.len(), "session registered");
        Ok(handle)
    }

    pub fn get(&self, code: &RoomCode) -> Option<SessionHandle> {
        self.sessions.get(code).cloned()
    }

    /// The session a connection is bound to, if any.
    pub fn session_for(&self, channel: ChannelId) -> Option<(RoomCode, SessionHandle)> {
        let code = self.channels.get(&channel)?;
        let handle = self.sessions.get(code)?;
        Some((code.clone(), Arc::clone(handle)))
    }

    pub fn is_bound(&self, channel: ChannelId) -> bool {
        self.channels.contains_key(&channel)
    }

    pub fn bind(&mut self, channel: ChannelId, code: RoomCode) {
        self.channels.insert(channel, code);
    }

    pub fn unbind(&mut self, channel: ChannelId) -> bool {
        self.channels.remove(&channel).is_some()
    }

    /// Whether `handle` is still the live session for `code`.
    pub fn is_live(&self, code: &RoomCode, handle: &SessionHandle) -> bool {
        self.sessions
            .get(code)
            .is_some_and(|live| Arc::ptr_eq(live, handle))
    }

    /// Removes a session and unbinds every connection bound to it.
    pub fn remove(&mut self, code: &RoomCode) -> Option<SessionHandle> {
        let handle = self.sessions.remove(code)?;
        self.channels.retain(|_, bound| bound != code);
        tracing::info!(room = %code, sessions = self.sessions.len(), "session removed");
        Some(handle)
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
