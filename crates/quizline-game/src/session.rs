//! The state of one live room.

use quizline_protocol::{
    ChannelId, QuestionId, ResponseChart, RoomCode, RoomId, RoundResult, ServerEvent,
};
use quizline_timer::CooldownTimer;
use tokio::time::Instant;

use crate::scoring::rank_players;
use crate::{AnswerBook, ChannelHub, GameError, Phase, Player, Recipient, Roster};

/// One question of a room's deck.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    pub id: QuestionId,
    pub text: String,
    pub answers: Vec<String>,
    /// Index of the correct answer.
    pub solution: usize,
    /// Seconds players get to answer.
    pub time_limit: u32,
    pub image: Option<String>,
}

/// Identifies one run of the orchestrator against a session.
///
/// Every time a session is closed its generation moves on, so a round
/// task holding an older token knows it must stop touching the room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundToken(u64);

/// One player's row of a round's results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerResult {
    pub player: Player,
    pub result: RoundResult,
}

/// Everything scoring a round produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundOutcome {
    /// In roster order; `player.points` is the new cumulative total.
    pub results: Vec<PlayerResult>,
    pub chart: ResponseChart,
}

/// A live room: its manager, players, deck, and round state.
///
/// Held behind a `tokio::sync::Mutex` (see
/// [`SessionHandle`](crate::SessionHandle)). Every method is synchronous;
/// callers never hold the lock across an await.
#[derive(Debug)]
pub struct GameSession {
    room_code: RoomCode,
    room_id: RoomId,
    manager: ChannelId,
    subject: String,
    questions: Vec<Question>,
    current_question: usize,
    round_start: Option<Instant>,
    phase: Phase,
    generation: u64,
    pub(crate) roster: Roster,
    pub(crate) answers: AnswerBook,
    pub(crate) cooldown: CooldownTimer,
}

impl GameSession {
    pub fn new(
        room_code: RoomCode,
        room_id: RoomId,
        manager: ChannelId,
        subject: impl Into<String>,
        questions: Vec<Question>,
    ) -> Self {
        Self {
            room_code,
            room_id,
            manager,
            subject: subject.into(),
            questions,
            current_question: 0,
            round_start: None,
            phase: Phase::Lobby,
            generation: 0,
            roster: Roster::new(),
            answers: AnswerBook::new(),
            cooldown: CooldownTimer::new(),
        }
    }

    pub fn room_code(&self) -> &RoomCode {
        &self.room_code
    }

    pub fn room_id(&self) -> RoomId {
        self.room_id
    }

    pub fn manager(&self) -> ChannelId {
        self.manager
    }

    pub fn is_manager(&self, channel: ChannelId) -> bool {
        self.manager == channel
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_started(&self) -> bool {
        self.phase.is_started()
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn answers(&self) -> &AnswerBook {
        &self.answers
    }

    pub fn round_start(&self) -> Option<Instant> {
        self.round_start
    }

    pub fn question_count(&self) -> usize {
        self.questions.len()
    }

    /// 0-based index of the current question.
    pub fn question_index(&self) -> usize {
        self.current_question
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.questions.get(self.current_question)
    }

    /// Whether another question follows the current one.
    pub fn has_next_question(&self) -> bool {
        self.current_question + 1 < self.questions.len()
    }

    /// Moves to the next question. Returns `false` at the end of the deck.
    pub fn advance_question(&mut self) -> bool {
        if !self.has_next_question() {
            return false;
        }
        self.current_question += 1;
        true
    }

    // -- Lifecycle ----------------------------------------------------------

    /// The token of the current generation.
    pub fn token(&self) -> RoundToken {
        RoundToken(self.generation)
    }

    /// Whether a task holding `token` may still act on this session.
    pub fn is_current(&self, token: RoundToken) -> bool {
        token.0 == self.generation && self.phase != Phase::Finished
    }

    /// Leaves the lobby. Returns `None` if the game already started.
    pub fn begin(&mut self) -> Option<RoundToken> {
        if self.phase != Phase::Lobby {
            return None;
        }
        self.enter(Phase::Starting);
        Some(self.token())
    }

    /// Moves to `phase`.
    pub fn enter(&mut self, phase: Phase) {
        if !self.phase.can_transition_to(phase) {
            tracing::warn!(
                room = %self.room_code,
                from = %self.phase,
                to = %phase,
                "unexpected phase transition"
            );
        }
        self.phase = phase;
    }

    /// Opens answering for the current question, starting the clock.
    pub fn open_answering(&mut self, now: Instant) {
        self.answers.clear();
        self.round_start = Some(now);
        self.enter(Phase::Answering);
    }

    /// Ends the session: aborts any running countdown and invalidates every
    /// outstanding [`RoundToken`]. Idempotent.
    pub fn close(&mut self) {
        if self.phase == Phase::Finished {
            return;
        }
        self.cooldown.abort();
        self.generation += 1;
        self.round_start = None;
        self.phase = Phase::Finished;
    }

    /// Checks whether `username` may join right now.
    pub fn check_joinable(&self, username: &str) -> Result<(), GameError> {
        if self.roster.has_username(username) {
            return Err(GameError::UsernameTaken(username.to_owned()));
        }
        if !self.phase.is_joinable() {
            return Err(GameError::AlreadyStarted);
        }
        Ok(())
    }

    // -- Delivery -----------------------------------------------------------

    /// The manager followed by every player, in join order.
    pub fn members(&self) -> impl Iterator<Item = ChannelId> + '_ {
        std::iter::once(self.manager).chain(self.roster.channels())
    }

    /// Sends `event` to `to` through `hub`.
    pub fn dispatch(&self, hub: &ChannelHub, to: Recipient, event: ServerEvent) {
        match to {
            Recipient::Manager => {
                hub.send(self.manager, event);
            }
            Recipient::Channel(channel) => {
                hub.send(channel, event);
            }
            Recipient::Room => {
                for channel in self.members() {
                    hub.send(channel, event.clone());
                }
            }
            Recipient::RoomExcept(excluded) => {
                for channel in self.members().filter(|c| *c != excluded) {
                    hub.send(channel, event.clone());
                }
            }
        }
    }

    // -- Scoring ------------------------------------------------------------

    /// Scores the current question and clears its answers.
    ///
    /// Credits every correct submission to its player first, then ranks
    /// the whole roster on the new totals, so every result reflects the
    /// complete round.
    pub fn score_round(&mut self) -> Option<RoundOutcome> {
        let question = self.questions.get(self.current_question)?.clone();

        let mut gained = Vec::with_capacity(self.roster.len());
        for player in self.roster.iter_mut() {
            let correct = self
                .answers
                .get(player.id)
                .filter(|sub| sub.chosen_index == question.solution);
            let points = correct.map_or(0, |sub| sub.time_based_points);
            player.points = player.points.saturating_add(points);
            gained.push((points, correct.is_some()));
        }

        let placements = rank_players(self.roster.as_slice());
        let results = self
            .roster
            .iter()
            .zip(placements)
            .zip(gained)
            .map(|((player, placement), (points, correct))| PlayerResult {
                player: player.clone(),
                result: RoundResult {
                    correct,
                    message: if correct { "Nice!" } else { "Bad" }.to_owned(),
                    points,
                    my_points: player.points,
                    rank: placement.rank,
                    ahead_of_me: placement.ahead_of_me,
                },
            })
            .collect();

        let chart = ResponseChart {
            question: question.text,
            responses: self.answers.histogram(),
            correct: question.solution,
            answers: question.answers,
            image: question.image,
        };

        self.answers.clear();
        self.round_start = None;
        Some(RoundOutcome { results, chart })
    }
}

#[cfg(test)]
mod tests {
    use quizline_protocol::PlayerId;
    use tokio::sync::mpsc;

    use super::*;
    use crate::AnswerSubmission;

    fn question(solution: usize) -> Question {
        Question {
            id: QuestionId(1),
            text: "2 + 2?".into(),
            answers: vec!["3".into(), "4".into(), "5".into()],
            solution,
            time_limit: 20,
            image: None,
        }
    }

    fn session_with(players: &[&str]) -> GameSession {
        let mut session = GameSession::new(
            RoomCode::new("123456"),
            RoomId::generate(),
            ChannelId::new(100),
            "Math",
            vec![question(1), question(0)],
        );
        for (i, name) in players.iter().enumerate() {
            session
                .roster
                .add(Player::new(PlayerId(i as u64 + 1), *name, ChannelId::new(i as u64 + 1)));
        }
        session
    }

    fn submit(session: &mut GameSession, player: u64, index: usize, points: u32) {
        session.answers.record(AnswerSubmission {
            player_id: PlayerId(player),
            chosen_index: index,
            time_based_points: points,
        });
    }

    #[test]
    fn test_score_round_credits_before_ranking() {
        let mut session = session_with(&["A", "B", "C"]);
        submit(&mut session, 3, 1, 900);
        submit(&mut session, 1, 1, 400);
        submit(&mut session, 2, 0, 1000);

        let outcome = session.score_round().unwrap();
        let results: Vec<_> = outcome
            .results
            .iter()
            .map(|r| (r.player.username.as_str(), r.result.points, r.result.rank))
            .collect();
        assert_eq!(results, [("A", 400, 2), ("B", 0, 3), ("C", 900, 1)]);

        let a = &outcome.results[0].result;
        assert!(a.correct);
        assert_eq!(a.message, "Nice!");
        assert_eq!(a.ahead_of_me.as_deref(), Some("C"));
        let b = &outcome.results[1].result;
        assert!(!b.correct);
        assert_eq!(b.message, "Bad");
        assert_eq!(b.my_points, 0);
    }

    #[test]
    fn test_score_round_builds_histogram_and_clears() {
        let mut session = session_with(&["A", "B", "C"]);
        submit(&mut session, 1, 1, 500);
        submit(&mut session, 2, 1, 500);
        submit(&mut session, 3, 2, 500);

        let outcome = session.score_round().unwrap();
        assert_eq!(outcome.chart.responses.get(&1), Some(&2));
        assert_eq!(outcome.chart.responses.get(&2), Some(&1));
        assert_eq!(outcome.chart.correct, 1);
        assert!(session.answers().is_empty());
        assert_eq!(session.round_start(), None);
    }

    #[test]
    fn test_unanswered_player_scores_zero() {
        let mut session = session_with(&["A"]);
        let outcome = session.score_round().unwrap();
        let result = &outcome.results[0].result;
        assert!(!result.correct);
        assert_eq!(result.points, 0);
        assert_eq!(result.rank, 1);
        assert_eq!(result.ahead_of_me, None);
    }

    #[test]
    fn test_close_invalidates_tokens() {
        let mut session = session_with(&[]);
        let token = session.begin().unwrap();
        assert!(session.is_current(token));

        session.close();
        assert!(!session.is_current(token));
        assert_eq!(session.phase(), Phase::Finished);
        assert!(session.begin().is_none());
    }

    #[test]
    fn test_begin_only_once() {
        let mut session = session_with(&[]);
        assert!(session.begin().is_some());
        assert!(session.begin().is_none());
        assert_eq!(session.phase(), Phase::Starting);
    }

    #[test]
    fn test_check_joinable() {
        let mut session = session_with(&["Ada"]);
        assert!(matches!(session.check_joinable("Ada"), Err(GameError::UsernameTaken(_))));
        assert!(session.check_joinable("Bob").is_ok());

        session.begin();
        assert!(matches!(session.check_joinable("Bob"), Err(GameError::AlreadyStarted)));
    }

    #[test]
    fn test_advance_question_stops_at_end() {
        let mut session = session_with(&[]);
        assert!(session.has_next_question());
        assert!(session.advance_question());
        assert_eq!(session.question_index(), 1);
        assert!(!session.advance_question());
        assert_eq!(session.question_index(), 1);
    }

    #[test]
    fn test_dispatch_room_except() {
        let hub = ChannelHub::new();
        let session = session_with(&["A", "B"]);
        let mut receivers = Vec::new();
        for channel in session.members().collect::<Vec<_>>() {
            let (tx, rx) = mpsc::unbounded_channel();
            hub.register(channel, tx);
            receivers.push((channel, rx));
        }

        session.dispatch(&hub, Recipient::RoomExcept(ChannelId::new(1)), ServerEvent::PlayerAnswer(1));

        for (channel, mut rx) in receivers {
            let got = rx.try_recv().ok();
            if channel == ChannelId::new(1) {
                assert_eq!(got, None);
            } else {
                assert_eq!(got, Some(ServerEvent::PlayerAnswer(1)));
            }
        }
    }
}
