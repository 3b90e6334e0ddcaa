//! Live quiz sessions for Quizline.
//!
//! A manager creates a room, players join it with the invite code, and
//! the round orchestrator walks the whole room through every question:
//!
//! ```text
//! PREPARED → QUESTION_SHOWN → ANSWERING → SCORED → (next question | FINISH)
//! ```
//!
//! # Key types
//!
//! - [`Quiz`]: the service every inbound client event goes through
//! - [`GameSession`]: the state of one live room (roster, deck, answers)
//! - [`SessionRegistry`]: live sessions keyed by invite code
//! - [`ChannelHub`]: outbound event sinks, one per connection
//! - [`Store`]: the persistence gateway (write-only from here)
//! - [`GameConfig`] / [`Phase`]: settings and the phase state machine

mod answers;
mod config;
mod error;
mod hub;
mod membership;
mod orchestrator;
mod quiz;
mod registry;
mod roster;
mod rooms;
pub mod scoring;
mod session;
mod store;
mod validate;

pub use answers::{AnswerBook, AnswerSubmission};
pub use config::{GameConfig, Phase};
pub use error::GameError;
pub use hub::{ChannelHub, EventSender, Recipient};
pub use quiz::Quiz;
pub use registry::{SessionHandle, SessionRegistry};
pub use roster::{Player, Roster};
pub use session::{GameSession, PlayerResult, Question, RoundOutcome, RoundToken};
pub use store::{
    AnswerRecord, BankQuestion, GameLogEntry, MemoryStore, MemoryTables, NewPlayerRecord,
    Operation, RoomRecord, Store, StoreError, StoredPlayer, StoredQuestion,
};
pub use validate::validate_username;
