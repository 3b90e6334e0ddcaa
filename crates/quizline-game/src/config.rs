//! Game configuration and the round phase state machine.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// GameConfig
// ---------------------------------------------------------------------------

/// Settings shared by every session the server runs.
///
/// All durations are whole seconds, since every countdown a client sees
/// ticks once per second.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Shared secret a manager must present to create a room.
    pub password: String,

    /// Quiz subject shown on the start and finish screens.
    pub subject: String,

    /// Number of questions drawn from the bank for each room.
    pub deck_size: usize,

    /// Time limit for bank questions that carry none.
    pub default_time_limit: u32,

    /// Silent pause after `SHOW_START`.
    pub lead_in_secs: u32,

    /// Length of the visible countdown that follows the lead-in.
    pub start_countdown_secs: u32,

    /// How long `SHOW_PREPARED` stays up before the question is revealed.
    pub prepared_secs: u32,

    /// How long `SHOW_QUESTION` stays up before answering opens.
    pub question_secs: u32,

    /// Maximum number of sessions live at once.
    pub max_sessions: usize,

    /// Username length bounds, in characters.
    pub username_min_len: usize,
    pub username_max_len: usize,
}

impl GameConfig {
    /// Upper bound on [`deck_size`](Self::deck_size).
    pub const MAX_DECK_SIZE: usize = 18;

    /// Clamps out-of-range values into something the orchestrator can run.
    pub fn validated(mut self) -> Self {
        self.deck_size = self.deck_size.clamp(1, Self::MAX_DECK_SIZE);
        self.max_sessions = self.max_sessions.max(1);
        self.default_time_limit = self.default_time_limit.max(1);
        self.username_min_len = self.username_min_len.max(1);
        self.username_max_len = self.username_max_len.max(self.username_min_len);
        self
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            password: "PASSWORD".to_owned(),
            subject: "General knowledge".to_owned(),
            deck_size: Self::MAX_DECK_SIZE,
            default_time_limit: 15,
            lead_in_secs: 3,
            start_countdown_secs: 3,
            prepared_secs: 2,
            question_secs: 5,
            max_sessions: 1,
            username_min_len: 1,
            username_max_len: 20,
        }
    }
}

// ---------------------------------------------------------------------------
// Phase
// ---------------------------------------------------------------------------

/// Where a session is in its lifecycle.
///
/// ```text
/// Lobby → Starting → Prepared → QuestionShown → Answering → Scored
///                       ↑                                      │
///                       └──────────── next question ───────────┘
/// ```
///
/// Any phase can jump to `Finished` (abort, final leaderboard, manager
/// disconnect). `Finished` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    /// Room created, players joining.
    Lobby,
    /// Lead-in countdown before the first question.
    Starting,
    Prepared,
    QuestionShown,
    /// The only phase that accepts answers.
    Answering,
    /// Results are out; waiting for the manager.
    Scored,
    Finished,
}

impl Phase {
    /// Returns `true` if players may still join.
    pub fn is_joinable(&self) -> bool {
        matches!(self, Self::Lobby)
    }

    /// Returns `true` between `startGame` and the end of the game.
    pub fn is_started(&self) -> bool {
        !matches!(self, Self::Lobby | Self::Finished)
    }

    /// Returns `true` while a round is between `SHOW_PREPARED` and scoring.
    pub fn is_round_running(&self) -> bool {
        matches!(self, Self::Prepared | Self::QuestionShown | Self::Answering)
    }

    /// The phase that normally follows this one, or `None` for `Finished`.
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Lobby => Some(Self::Starting),
            Self::Starting => Some(Self::Prepared),
            Self::Prepared => Some(Self::QuestionShown),
            Self::QuestionShown => Some(Self::Answering),
            Self::Answering => Some(Self::Scored),
            Self::Scored => Some(Self::Prepared),
            Self::Finished => None,
        }
    }

    /// Returns `true` if moving to `target` is allowed.
    pub fn can_transition_to(self, target: Self) -> bool {
        match target {
            Self::Finished => self != Self::Finished,
            _ => self.next() == Some(target),
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Lobby => write!(f, "Lobby"),
            Self::Starting => write!(f, "Starting"),
            Self::Prepared => write!(f, "Prepared"),
            Self::QuestionShown => write!(f, "QuestionShown"),
            Self::Answering => write!(f, "Answering"),
            Self::Scored => write!(f, "Scored"),
            Self::Finished => write!(f, "Finished"),
        }
    }
}
