//! Named events exchanged between clients and the quiz server.
//!
//! Every frame on the wire is one event in the "adjacently tagged" JSON
//! shape:
//!
//! ```text
//! { "event": "player:selectedAnswer", "data": 2 }
//! { "event": "game:successJoin" }
//! ```
//!
//! The event name carries a role prefix (`manager:`, `player:`, `game:`)
//! so clients can route events without looking at the payload.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{PlayerId, RoomCode};

// ---------------------------------------------------------------------------
// Client → Server
// ---------------------------------------------------------------------------

/// Payload of `player:join`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinRequest {
    /// The name the player wants to appear under.
    pub username: String,
    /// The invite code the player typed.
    pub room: RoomCode,
}

/// Everything a client can send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ClientEvent {
    /// Create a room, authenticated by the shared secret.
    #[serde(rename = "manager:createRoom")]
    CreateRoom(String),

    #[serde(rename = "manager:startGame")]
    StartGame,

    #[serde(rename = "manager:nextQuestion")]
    NextQuestion,

    #[serde(rename = "manager:abortQuiz")]
    AbortQuiz,

    #[serde(rename = "manager:showLeaderboard")]
    ShowLeaderboard,

    #[serde(rename = "manager:kickPlayer")]
    KickPlayer(PlayerId),

    /// Ask whether an invite code points at a live room.
    #[serde(rename = "player:checkRoom")]
    CheckRoom(RoomCode),

    #[serde(rename = "player:join")]
    Join(JoinRequest),

    /// Index into the current question's answer list.
    #[serde(rename = "player:selectedAnswer")]
    SelectedAnswer(usize),
}

// ---------------------------------------------------------------------------
// Server → Client
// ---------------------------------------------------------------------------

/// A player as shown to the manager and on leaderboards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerSummary {
    pub id: PlayerId,
    pub username: String,
    pub points: u32,
}

/// Payload of `game:updateQuestion`. `current` is 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionProgress {
    pub current: usize,
    pub total: usize,
}

/// Everything the server can send.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ServerEvent {
    /// A human-readable error, sent only to the connection that caused it.
    #[serde(rename = "game:errorMessage")]
    ErrorMessage(String),

    #[serde(rename = "manager:inviteCode")]
    InviteCode(RoomCode),

    /// Sent to the manager once the room's question deck is persisted.
    #[serde(rename = "game:dbConfirmation")]
    DbConfirmation(String),

    #[serde(rename = "manager:newPlayer")]
    NewPlayer(PlayerSummary),

    #[serde(rename = "manager:removePlayer")]
    RemovePlayer(PlayerId),

    /// Answer to `player:checkRoom` when the code is live.
    #[serde(rename = "game:successRoom")]
    SuccessRoom(RoomCode),

    #[serde(rename = "game:successJoin")]
    SuccessJoin,

    /// Sent to a player the manager removed.
    #[serde(rename = "game:kick")]
    Kick,

    #[serde(rename = "game:status")]
    Status(Status),

    /// A countdown is starting; payload is its length in seconds.
    #[serde(rename = "game:startCooldown")]
    StartCooldown(u32),

    /// One countdown tick; payload is the seconds remaining.
    #[serde(rename = "game:cooldown")]
    Cooldown(u32),

    #[serde(rename = "game:updateQuestion")]
    UpdateQuestion(QuestionProgress),

    /// Number of answers submitted so far for the current question.
    #[serde(rename = "game:playerAnswer")]
    PlayerAnswer(usize),

    /// The manager left; the room no longer exists.
    #[serde(rename = "game:reset")]
    Reset,
}

// ---------------------------------------------------------------------------
// game:status
// ---------------------------------------------------------------------------

/// The phase screen a client should show, carried by `game:status` as
/// `{ "name": "SHOW_RESULT", "data": { ... } }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name", content = "data", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    ShowStart(StartInfo),
    ShowPrepared(PreparedInfo),
    ShowQuestion(QuestionInfo),
    SelectAnswer(AnswerPrompt),
    Wait(WaitInfo),
    ShowResult(RoundResult),
    ShowResponses(ResponseChart),
    ShowLeaderboard(Leaderboard),
    Finish(Standings),
}

impl Status {
    /// The wire name of this status (`"SHOW_RESULT"`, ...).
    pub fn name(&self) -> &'static str {
        match self {
            Self::ShowStart(_) => "SHOW_START",
            Self::ShowPrepared(_) => "SHOW_PREPARED",
            Self::ShowQuestion(_) => "SHOW_QUESTION",
            Self::SelectAnswer(_) => "SELECT_ANSWER",
            Self::Wait(_) => "WAIT",
            Self::ShowResult(_) => "SHOW_RESULT",
            Self::ShowResponses(_) => "SHOW_RESPONSES",
            Self::ShowLeaderboard(_) => "SHOW_LEADERBOARD",
            Self::Finish(_) => "FINISH",
        }
    }
}

impl From<Status> for ServerEvent {
    fn from(status: Status) -> Self {
        Self::Status(status)
    }
}

/// `SHOW_START`: the game is about to begin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartInfo {
    /// Lead-in length in seconds.
    pub time: u32,
    pub subject: String,
}

/// `SHOW_PREPARED`: a question is coming, its text is not revealed yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreparedInfo {
    pub total_answers: usize,
    /// 1-based.
    pub question_number: usize,
}

/// `SHOW_QUESTION`: the question and its options, answering not open yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionInfo {
    pub question: String,
    pub answers: Vec<String>,
    /// Seconds until answering opens.
    pub cooldown: u32,
    pub image: Option<String>,
}

/// `SELECT_ANSWER`: answering is open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerPrompt {
    pub question: String,
    pub answers: Vec<String>,
    /// Time limit in seconds.
    pub time: u32,
    pub total_player: usize,
    pub image: Option<String>,
}

/// `WAIT`: sent to a player after they answered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitInfo {
    pub text: String,
}

/// `SHOW_RESULT`: one player's outcome for the round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundResult {
    pub correct: bool,
    pub message: String,
    /// Points gained this round.
    pub points: u32,
    /// Cumulative points after this round.
    pub my_points: u32,
    /// 1-based rank after this round.
    pub rank: usize,
    /// Username of the player ranked immediately above, `null` at rank 1.
    pub ahead_of_me: Option<String>,
}

/// `SHOW_RESPONSES`: the manager's results chart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseChart {
    pub question: String,
    /// Answer index → number of players who picked it.
    pub responses: BTreeMap<usize, usize>,
    /// Index of the correct answer.
    pub correct: usize,
    pub answers: Vec<String>,
    pub image: Option<String>,
}

/// `SHOW_LEADERBOARD`: interim standings, best first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Leaderboard {
    pub leaderboard: Vec<PlayerSummary>,
}

/// `FINISH`: final (or aborted) standings, best first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Standings {
    pub subject: String,
    pub top: Vec<PlayerSummary>,
    pub aborted: bool,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_unit_client_event_needs_no_data() {
        let event: ClientEvent =
            serde_json::from_value(json!({ "event": "manager:startGame" })).unwrap();
        assert_eq!(event, ClientEvent::StartGame);
    }

    #[test]
    fn test_join_request_parses() {
        let event: ClientEvent = serde_json::from_value(json!({
            "event": "player:join",
            "data": { "username": "Ada", "room": "123456" }
        }))
        .unwrap();
        assert_eq!(
            event,
            ClientEvent::Join(JoinRequest {
                username: "Ada".into(),
                room: RoomCode::new("123456"),
            })
        );
    }

    #[test]
    fn test_kick_player_takes_plain_id() {
        let event: ClientEvent =
            serde_json::from_value(json!({ "event": "manager:kickPlayer", "data": 12 }))
                .unwrap();
        assert_eq!(event, ClientEvent::KickPlayer(PlayerId(12)));
    }

    #[test]
    fn test_status_wire_shape() {
        let event = ServerEvent::Status(Status::ShowResult(RoundResult {
            correct: true,
            message: "Nice!".into(),
            points: 900,
            my_points: 1800,
            rank: 1,
            ahead_of_me: None,
        }));
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({
                "event": "game:status",
                "data": {
                    "name": "SHOW_RESULT",
                    "data": {
                        "correct": true,
                        "message": "Nice!",
                        "points": 900,
                        "myPoints": 1800,
                        "rank": 1,
                        "aheadOfMe": null
                    }
                }
            })
        );
    }

    #[test]
    fn test_response_histogram_uses_index_keys() {
        let mut responses = BTreeMap::new();
        responses.insert(0, 2);
        responses.insert(3, 1);
        let chart = ResponseChart {
            question: "q".into(),
            responses,
            correct: 3,
            answers: vec![],
            image: None,
        };
        let value = serde_json::to_value(&chart).unwrap();
        assert_eq!(value["responses"], json!({ "0": 2, "3": 1 }));
    }

    #[test]
    fn test_status_name_matches_serialized_tag() {
        let status = Status::Wait(WaitInfo { text: "hold on".into() });
        let value = serde_json::to_value(&status).unwrap();
        assert_eq!(value["name"], status.name());
    }

    #[test]
    fn test_unit_server_event_has_no_data() {
        let value = serde_json::to_value(ServerEvent::SuccessJoin).unwrap();
        assert_eq!(value, json!({ "event": "game:successJoin" }));
    }
}
