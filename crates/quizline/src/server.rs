//! `QuizServer` builder and server loop.
//!
//! This is the entry point for running a Quizline server. It ties
//! together all the layers: transport → protocol → quiz sessions.

use std::sync::Arc;
use std::time::Duration;

use quizline_game::{ChannelHub, GameConfig, Quiz, Store};
use quizline_protocol::{Codec, JsonCodec};

use crate::QuizlineError;
use crate::config::ServerConfig;
use crate::handler::handle_connection;
use crate::transport::WebSocketTransport;

/// Shared server state passed to each connection handler task.
pub(crate) struct ServerState<S: Store, C: Codec> {
    pub(crate) quiz: Quiz<S>,
    pub(crate) codec: C,
    pub(crate) config: ServerConfig,
}

/// Builder for configuring and starting a Quizline server.
///
/// # Example
///
/// ```rust,no_run
/// use quizline::prelude::*;
///
/// # async fn start() -> Result<(), QuizlineError> {
/// let bank = load_question_bank(None)?;
/// let server = QuizServer::builder()
///     .bind("0.0.0.0:3100")
///     .build(MemoryStore::new(bank))
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct QuizServerBuilder {
    server_config: ServerConfig,
    game_config: GameConfig,
}

impl QuizServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            server_config: ServerConfig::default(),
            game_config: GameConfig::default(),
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.server_config.bind_addr = addr.to_string();
        self
    }

    /// Replaces the connection settings, bind address included.
    pub fn server_config(mut self, config: ServerConfig) -> Self {
        self.server_config = config;
        self
    }

    /// Sets the game settings (password, deck size, pacing).
    pub fn game_config(mut self, config: GameConfig) -> Self {
        self.game_config = config;
        self
    }

    pub fn ping_interval(mut self, interval: Duration) -> Self {
        self.server_config.ping_interval = interval;
        self
    }

    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.server_config.idle_timeout = timeout;
        self
    }

    /// Binds the listener and builds the server around `store`.
    ///
    /// Uses `JsonCodec`; browser clients speak JSON text frames.
    pub async fn build<S: Store>(self, store: S) -> Result<QuizServer<S, JsonCodec>, QuizlineError> {
        let transport = WebSocketTransport::bind(&self.server_config.bind_addr).await?;
        let quiz = Quiz::new(self.game_config, store, ChannelHub::new());
        tracing::info!(
            subject = %quiz.config().subject,
            deck_size = quiz.config().deck_size,
            "quiz service ready"
        );

        let state = Arc::new(ServerState {
            quiz,
            codec: JsonCodec,
            config: self.server_config,
        });
        Ok(QuizServer { transport, state })
    }
}

impl Default for QuizServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A Quizline server bound to its address.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct QuizServer<S: Store, C: Codec> {
    transport: WebSocketTransport,
    state: Arc<ServerState<S, C>>,
}

impl QuizServer<quizline_game::MemoryStore, JsonCodec> {
    /// Creates a new builder.
    pub fn builder() -> QuizServerBuilder {
        QuizServerBuilder::new()
    }
}

impl<S, C> QuizServer<S, C>
where
    S: Store,
    C: Codec,
{
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// The quiz service behind this server.
    pub fn quiz(&self) -> &Quiz<S> {
        &self.state.quiz
    }

    /// Runs the server accept loop.
    ///
    /// Spawns a handler task for each accepted connection. Runs until the
    /// process is terminated.
    pub async fn run(self) -> Result<(), QuizlineError> {
        tracing::info!("Quizline server running");

        loop {
            match self.transport.accept().await {
                Ok(pending) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        let channel = pending.id();
                        if let Err(e) = handle_connection(pending, state).await {
                            tracing::debug!(%channel, error = %e, "connection ended with error");
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}
