//! The quiz service: routes inbound events to the session they concern.

use std::future::Future;
use std::sync::Arc;

use quizline_protocol::{ChannelId, ClientEvent, RoomCode, ServerEvent};
use tokio::sync::Mutex;

use crate::{ChannelHub, GameConfig, GameError, SessionHandle, SessionRegistry, Store, StoreError};

struct Inner<S> {
    config: GameConfig,
    store: S,
    hub: ChannelHub,
    registry: Mutex<SessionRegistry>,
}

/// Entry point for every client event.
///
/// Cheap to clone; clones share the registry, the store, and the hub.
/// Round tasks hold a clone for as long as they run.
pub struct Quiz<S: Store> {
    inner: Arc<Inner<S>>,
}

impl<S: Store> Clone for Quiz<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: Store> Quiz<S> {
    pub fn new(config: GameConfig, store: S, hub: ChannelHub) -> Self {
        let config = config.validated();
        let registry = SessionRegistry::new(config.max_sessions);
        Self {
            inner: Arc::new(Inner {
                config,
                store,
                hub,
                registry: Mutex::new(registry),
            }),
        }
    }

    pub fn config(&self) -> &GameConfig {
        &self.inner.config
    }

    pub fn store(&self) -> &S {
        &self.inner.store
    }

    pub fn hub(&self) -> &ChannelHub {
        &self.inner.hub
    }

    pub(crate) fn registry(&self) -> &Mutex<SessionRegistry> {
        &self.inner.registry
    }

    /// Handles one inbound event from `channel`.
    ///
    /// Errors with a client-facing message are sent back to `channel` as
    /// `game:errorMessage`; precondition failures are only logged.
    pub async fn handle(&self, channel: ChannelId, event: ClientEvent) {
        let result = match event {
            ClientEvent::CreateRoom(password) => self.create_room(channel, &password).await.map(drop),
            ClientEvent::StartGame => self.start_game(channel).await,
            ClientEvent::NextQuestion => self.next_question(channel).await,
            ClientEvent::AbortQuiz => self.abort_quiz(channel).await,
            ClientEvent::ShowLeaderboard => self.show_leaderboard(channel).await,
            ClientEvent::KickPlayer(player_id) => self.kick_player(channel, player_id).await,
            ClientEvent::CheckRoom(code) => self.check_room(channel, &code).await,
            ClientEvent::Join(request) => self.join(channel, request).await,
            ClientEvent::SelectedAnswer(index) => self.select_answer(channel, index).await,
        };
        if let Err(err) = result {
            self.report(channel, &err);
        }
    }

    fn report(&self, channel: ChannelId, err: &GameError) {
        match err.client_message() {
            Some(message) => {
                tracing::debug!(%channel, error = %err, "event rejected");
                self.hub().send(channel, ServerEvent::ErrorMessage(message));
            }
            None => tracing::debug!(%channel, reason = %err, "event ignored"),
        }
    }

    /// Number of live sessions.
    pub async fn session_count(&self) -> usize {
        self.registry().lock().await.len()
    }

    /// The live session behind an invite code.
    pub async fn session(&self, code: &RoomCode) -> Option<SessionHandle> {
        self.registry().lock().await.get(code)
    }

    pub(crate) async fn session_for(&self, channel: ChannelId) -> Option<SessionHandle> {
        self.registry()
            .lock()
            .await
            .session_for(channel)
            .map(|(_, handle)| handle)
    }

    /// Awaits a best-effort write. Failures are logged and swallowed.
    pub(crate) async fn persist<T>(
        &self,
        operation: &'static str,
        write: impl Future<Output = Result<T, StoreError>>,
    ) {
        if let Err(err) = write.await {
            tracing::warn!(operation, error = %err, "persistence write failed");
        }
    }
}
