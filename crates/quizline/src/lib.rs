//! # Quizline
//!
//! WebSocket server for live multiplayer quiz rounds.
//!
//! A manager opens a room with the server password and shares the invite
//! code; players join from their own devices. The server then walks the
//! whole room through the deck in lockstep, scoring each answer by how
//! quickly it came in.
//!
//! ```text
//! transport (frames) → protocol (events) → game (sessions, rounds)
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use quizline::prelude::*;
//!
//! # async fn start() -> Result<(), QuizlineError> {
//! let settings = Settings::from_env();
//! let bank = load_question_bank(settings.server.questions_path.as_deref())?;
//! let server = QuizServer::builder()
//!     .server_config(settings.server)
//!     .game_config(settings.game)
//!     .build(MemoryStore::new(bank))
//!     .await?;
//! server.run().await
//! # }
//! ```

pub mod config;
mod error;
mod handler;
mod server;
mod transport;

pub use error::{QuizlineError, TransportError};
pub use server::{QuizServer, QuizServerBuilder};

pub mod prelude {
    pub use crate::config::{ServerConfig, Settings, load_question_bank};
    pub use crate::error::{QuizlineError, TransportError};
    pub use crate::server::{QuizServer, QuizServerBuilder};

    pub use quizline_game::{BankQuestion, GameConfig, MemoryStore, Quiz, Store};
    pub use quizline_protocol::{
        ChannelId, ClientEvent, JoinRequest, PlayerId, RoomCode, ServerEvent, Status,
    };
}
