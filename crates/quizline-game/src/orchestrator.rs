//! Round orchestration.
//!
//! Each started game is driven by one spawned task at a time: the lead-in
//! task ends by running the first round, and `manager:nextQuestion`
//! spawns a task for every later round. A task only waits on countdowns
//! and never holds the session lock while it does.
//!
//! Every step re-locks the session and checks its [`RoundToken`] first.
//! Once the session is closed (abort, finish, manager gone) the token is
//! stale and the task stops without sending or persisting anything else.
//! The one exception is a round that was already scored: its results and
//! new totals are still written.

use quizline_protocol::{
    AnswerPrompt, PreparedInfo, QuestionInfo, QuestionProgress, RoomId, ServerEvent, Status,
};
use quizline_timer::{Countdown, CountdownEnd};
use tokio::time::Instant;

use crate::{GameLogEntry, Phase, Quiz, Recipient, RoundToken, SessionHandle, Store};

impl<S: Store> Quiz<S> {
    /// Lead-in after `SHOW_START`: a silent pause, a visible countdown,
    /// then the first round.
    pub(crate) async fn run_game(self, handle: SessionHandle, token: RoundToken) {
        let config = self.config();
        if !self.pause(&handle, token, config.lead_in_secs).await {
            return;
        }

        let seconds = config.start_countdown_secs;
        let countdown = {
            let mut session = handle.lock().await;
            if !session.is_current(token) {
                return;
            }
            session.dispatch(self.hub(), Recipient::Room, ServerEvent::StartCooldown(seconds));
            session.cooldown.start(seconds)
        };
        if self.ticks(&handle, token, countdown).await.is_none() {
            return;
        }

        self.run_round(handle, token).await;
    }

    /// Runs the current question from `SHOW_PREPARED` to scoring.
    pub(crate) async fn run_round(self, handle: SessionHandle, token: RoundToken) {
        let config = self.config();

        // Prepared
        let (room_id, question, entries) = {
            let mut session = handle.lock().await;
            if !session.is_current(token) {
                return;
            }
            let Some(question) = session.current_question().cloned() else {
                tracing::warn!(room = %session.room_code(), "no question to run");
                return;
            };
            if session.phase() != Phase::Prepared {
                session.enter(Phase::Prepared);
            }
            let progress = QuestionProgress {
                current: session.question_index() + 1,
                total: session.question_count(),
            };
            let status = Status::ShowPrepared(PreparedInfo {
                total_answers: question.answers.len(),
                question_number: progress.current,
            });
            let room_id = session.room_id();
            let entries = vec![
                GameLogEntry::new(room_id, None, "UPDATE_QUESTION", &progress),
                GameLogEntry::new(room_id, None, status.name(), &status),
            ];
            session.dispatch(self.hub(), Recipient::Room, ServerEvent::UpdateQuestion(progress));
            session.dispatch(self.hub(), Recipient::Room, status.into());
            tracing::info!(
                room = %session.room_code(),
                question = progress.current,
                total = progress.total,
                "round started"
            );
            (room_id, question, entries)
        };
        self.record(&handle, token, entries).await;
        if !self.pause(&handle, token, config.prepared_secs).await {
            return;
        }

        // Question shown
        let status = Status::ShowQuestion(QuestionInfo {
            question: question.text.clone(),
            answers: question.answers.clone(),
            cooldown: config.question_secs,
            image: question.image.clone(),
        });
        {
            let mut session = handle.lock().await;
            if !session.is_current(token) {
                return;
            }
            session.enter(Phase::QuestionShown);
            session.dispatch(self.hub(), Recipient::Room, status.clone().into());
        }
        self.record(&handle, token, vec![GameLogEntry::new(room_id, None, status.name(), &status)])
            .await;
        if !self.pause(&handle, token, config.question_secs).await {
            return;
        }

        // Answering
        let (countdown, status) = {
            let mut session = handle.lock().await;
            if !session.is_current(token) {
                return;
            }
            session.open_answering(Instant::now());
            let status = Status::SelectAnswer(AnswerPrompt {
                question: question.text.clone(),
                answers: question.answers.clone(),
                time: question.time_limit,
                total_player: session.roster().len(),
                image: question.image.clone(),
            });
            session.dispatch(self.hub(), Recipient::Room, status.clone().into());
            (session.cooldown.start(question.time_limit), status)
        };
        self.record(&handle, token, vec![GameLogEntry::new(room_id, None, status.name(), &status)])
            .await;
        match self.ticks(&handle, token, countdown).await {
            Some(CountdownEnd::Aborted) => tracing::debug!(room_id = %room_id, "answering closed early"),
            Some(CountdownEnd::Expired) => {}
            None => return,
        }

        self.score(&handle, token, room_id).await;
    }

    /// Scores the round, sends every result, then persists the new totals.
    async fn score(&self, handle: &SessionHandle, token: RoundToken, room_id: RoomId) {
        let (outcome, chart_entry) = {
            let mut session = handle.lock().await;
            if !session.is_current(token) {
                return;
            }
            let Some(outcome) = session.score_round() else {
                return;
            };
            session.enter(Phase::Scored);
            for row in &outcome.results {
                session.dispatch(
                    self.hub(),
                    Recipient::Channel(row.player.channel),
                    Status::ShowResult(row.result.clone()).into(),
                );
            }
            let chart = Status::ShowResponses(outcome.chart.clone());
            let chart_entry = GameLogEntry::new(room_id, None, chart.name(), &chart);
            session.dispatch(self.hub(), Recipient::Manager, chart.into());
            tracing::info!(
                room = %session.room_code(),
                question = session.question_index() + 1,
                answered = outcome.chart.responses.values().sum::<usize>(),
                players = outcome.results.len(),
                "round scored"
            );
            (outcome, chart_entry)
        };

        // The round is committed: these writes go through even if the
        // game is finished or aborted meanwhile.
        for row in &outcome.results {
            let entry = GameLogEntry::new(room_id, Some(row.player.id), "SHOW_RESULT", &row.result);
            self.persist("log_event", self.store().log_event(entry)).await;
            self.persist(
                "update_player_points",
                self.store().update_player_points(row.player.id, row.player.points),
            )
            .await;
        }
        self.persist("log_event", self.store().log_event(chart_entry)).await;
    }

    /// Waits `seconds` without telling clients. Returns `false` if the
    /// session was closed meanwhile.
    async fn pause(&self, handle: &SessionHandle, token: RoundToken, seconds: u32) -> bool {
        let countdown = {
            let mut session = handle.lock().await;
            if !session.is_current(token) {
                return false;
            }
            session.cooldown.start(seconds)
        };
        countdown.finish().await;
        self.still_current(handle, token).await
    }

    /// Drives `countdown`, sending `game:cooldown` every second.
    ///
    /// Returns how it ended, or `None` if the session was closed.
    async fn ticks(&self, handle: &SessionHandle, token: RoundToken, mut countdown: Countdown) -> Option<CountdownEnd> {
        while let Some(remaining) = countdown.wait_for_tick().await {
            let session = handle.lock().await;
            if !session.is_current(token) {
                return None;
            }
            session.dispatch(self.hub(), Recipient::Room, ServerEvent::Cooldown(remaining));
        }
        if !self.still_current(handle, token).await {
            return None;
        }
        countdown.end()
    }

    async fn still_current(&self, handle: &SessionHandle, token: RoundToken) -> bool {
        handle.lock().await.is_current(token)
    }

    /// Appends entries to the room's event log unless the session is gone.
    async fn record(&self, handle: &SessionHandle, token: RoundToken, entries: Vec<GameLogEntry>) {
        for entry in entries {
            if !self.still_current(handle, token).await {
                return;
            }
            self.persist("log_event", self.store().log_event(entry)).await;
        }
    }
}
