//! Answer collection for the current question.

use std::collections::BTreeMap;

use quizline_protocol::{ChannelId, PlayerId, ServerEvent, Status, WaitInfo};
use tokio::time::Instant;

use crate::scoring::time_based_points;
use crate::{AnswerRecord, GameError, GameSession, Phase, Quiz, Recipient, Store};

/// One player's answer to the current question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnswerSubmission {
    pub player_id: PlayerId,
    pub chosen_index: usize,
    /// What the answer is worth if correct, fixed at submission time.
    pub time_based_points: u32,
}

/// The submissions for the current question, at most one per player.
#[derive(Debug, Default)]
pub struct AnswerBook {
    submissions: Vec<AnswerSubmission>,
}

impl AnswerBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a submission. Returns `false` (and keeps the first one) if
    /// the player already answered.
    pub fn record(&mut self, submission: AnswerSubmission) -> bool {
        if self.has_answered(submission.player_id) {
            return false;
        }
        self.submissions.push(submission);
        true
    }

    pub fn get(&self, player_id: PlayerId) -> Option<&AnswerSubmission> {
        self.submissions.iter().find(|s| s.player_id == player_id)
    }

    pub fn has_answered(&self, player_id: PlayerId) -> bool {
        self.get(player_id).is_some()
    }

    pub fn len(&self) -> usize {
        self.submissions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.submissions.is_empty()
    }

    /// Answer index → number of submissions that picked it.
    pub fn histogram(&self) -> BTreeMap<usize, usize> {
        let mut counts = BTreeMap::new();
        for s in &self.submissions {
            *counts.entry(s.chosen_index).or_insert(0) += 1;
        }
        counts
    }

    pub fn clear(&mut self) {
        self.submissions.clear();
    }
}

impl GameSession {
    /// Accepts an answer from the player on `channel`.
    ///
    /// Rejected as a precondition failure outside `Answering`, for
    /// channels not on the roster, for repeat answers, and for indices
    /// outside the current question.
    pub fn submit_answer(
        &mut self,
        channel: ChannelId,
        chosen_index: usize,
        now: Instant,
    ) -> Result<AnswerRecord, GameError> {
        if self.phase() != Phase::Answering {
            return Err(GameError::Precondition("answering is closed"));
        }
        let player_id = self
            .roster
            .by_channel(channel)
            .map(|p| p.id)
            .ok_or(GameError::Precondition("not a player of this room"))?;
        let question = self
            .current_question()
            .ok_or(GameError::Precondition("no current question"))?;
        if chosen_index >= question.answers.len() {
            return Err(GameError::Precondition("answer index out of range"));
        }
        let question_id = question.id;
        let points = time_based_points(self.round_start(), question.time_limit, now);

        let recorded = self.answers.record(AnswerSubmission {
            player_id,
            chosen_index,
            time_based_points: points,
        });
        if !recorded {
            return Err(GameError::Precondition("already answered"));
        }
        Ok(AnswerRecord {
            player_id,
            question_id,
            selected_index: chosen_index,
            points_awarded: points,
        })
    }

    /// Whether every player currently on the roster has answered.
    ///
    /// Vacuously true for an empty roster.
    pub fn all_answered(&self) -> bool {
        self.roster.iter().all(|p| self.answers.has_answered(p.id))
    }

    /// Cuts the answering countdown short if nobody is left to answer.
    pub(crate) fn complete_early_if_done(&mut self) {
        if self.phase() == Phase::Answering && self.all_answered() && self.cooldown.abort() {
            tracing::info!(
                room = %self.room_code(),
                answers = self.answers.len(),
                "every player answered, closing the round early"
            );
        }
    }
}

impl<S: Store> Quiz<S> {
    /// `player:selectedAnswer`.
    pub async fn select_answer(&self, channel: ChannelId, chosen_index: usize) -> Result<(), GameError> {
        let handle = self
            .session_for(channel)
            .await
            .ok_or(GameError::Precondition("not in a room"))?;

        let record = {
            let mut session = handle.lock().await;
            let record = session.submit_answer(channel, chosen_index, Instant::now())?;
            let hub = self.hub();
            session.dispatch(
                hub,
                Recipient::Channel(channel),
                Status::Wait(WaitInfo {
                    text: "Waiting for the players to answer".to_owned(),
                })
                .into(),
            );
            session.dispatch(
                hub,
                Recipient::RoomExcept(channel),
                ServerEvent::PlayerAnswer(session.answers.len()),
            );
            tracing::debug!(
                room = %session.room_code(),
                player_id = %record.player_id,
                points = record.points_awarded,
                "answer recorded"
            );
            session.complete_early_if_done();
            record
        };

        self.persist("insert_answer", self.store().insert_answer(record)).await;
        Ok(())
    }
}
