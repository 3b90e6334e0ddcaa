//! Outbound delivery: one event sink per live connection.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use quizline_protocol::{ChannelId, ServerEvent};
use tokio::sync::mpsc;

/// Channel sender for delivering events to one connection's writer task.
pub type EventSender = mpsc::UnboundedSender<ServerEvent>;

/// Who an outbound event is for, relative to one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recipient {
    /// The manager and every player.
    Room,
    /// The whole room except one connection.
    RoomExcept(ChannelId),
    /// Only the session's manager.
    Manager,
    /// One specific connection.
    Channel(ChannelId),
}

/// Registry of outbound sinks keyed by connection.
///
/// Cheap to clone; every clone sees the same map. Sends never block: the
/// sink is unbounded and a send to a closed or unknown connection is
/// dropped.
#[derive(Debug, Clone, Default)]
pub struct ChannelHub {
    sinks: Arc<RwLock<HashMap<ChannelId, EventSender>>>,
}

impl ChannelHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the sink for a new connection, replacing any previous one.
    pub fn register(&self, channel: ChannelId, sink: EventSender) {
        self.sinks
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(channel, sink);
    }

    /// Forgets a connection. Returns `false` if it wasn't registered.
    pub fn unregister(&self, channel: ChannelId) -> bool {
        self.sinks
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&channel)
            .is_some()
    }

    /// Queues an event for one connection.
    ///
    /// Returns `false` if the connection is unknown or already closed.
    pub fn send(&self, channel: ChannelId, event: ServerEvent) -> bool {
        let sinks = self.sinks.read().unwrap_or_else(PoisonError::into_inner);
        match sinks.get(&channel) {
            Some(sink) => sink.send(event).is_ok(),
            None => {
                tracing::trace!(%channel, "dropping event for unknown channel");
                false
            }
        }
    }

    pub fn is_registered(&self, channel: ChannelId) -> bool {
        self.sinks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&channel)
    }

    /// Number of registered connections.
    pub fn len(&self) -> usize {
        self.sinks.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
