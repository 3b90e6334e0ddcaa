//! Wire protocol for Quizline.
//!
//! This crate defines the "language" spoken between the quiz server and
//! its clients (the manager's screen and every player's device):
//!
//! - **Identity types** ([`PlayerId`], [`RoomId`], [`RoomCode`],
//!   [`ChannelId`], [`QuestionId`]): newtype wrappers so ids can't be
//!   mixed up.
//! - **Events** ([`ClientEvent`], [`ServerEvent`], [`Status`]): named
//!   events in the `{"event": ..., "data": ...}` shape.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how events become bytes.
//! - **Errors** ([`ProtocolError`]).
//!
//! ```text
//! Transport (frames) → Protocol (ClientEvent / ServerEvent) → Game (sessions)
//! ```

mod codec;
mod error;
mod events;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use events::{
    AnswerPrompt, ClientEvent, JoinRequest, Leaderboard, PlayerSummary,
    PreparedInfo, QuestionInfo, QuestionProgress, ResponseChart, RoundResult,
    ServerEvent, Standings, StartInfo, Status, WaitInfo,
};
pub use types::{ChannelId, PlayerId, QuestionId, RoomCode, RoomId};
