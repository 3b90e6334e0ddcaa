//! Manager operations: create, start, advance, and end a session.

use quizline_protocol::{
    ChannelId, Leaderboard, RoomCode, RoomId, ServerEvent, Standings, StartInfo, Status,
};

use crate::{
    GameError, GameLogEntry, GameSession, Phase, Question, Quiz, Recipient, RoomRecord, Store,
};

impl<S: Store> Quiz<S> {
    /// `manager:createRoom`: opens a new session with `channel` as its
    /// manager and returns the invite code.
    ///
    /// The room and its deck are persisted before the session goes live;
    /// if either write fails no session is registered.
    pub async fn create_room(&self, channel: ChannelId, password: &str) -> Result<RoomCode, GameError> {
        let config = self.config();
        if password != config.password {
            return Err(GameError::BadPassword);
        }
        let code = {
            let registry = self.registry().lock().await;
            if registry.is_bound(channel) {
                return Err(GameError::AlreadyJoined);
            }
            if !registry.has_capacity() {
                return Err(GameError::AlreadyActive);
            }
            registry.generate_code()
        };

        let room_id = RoomId::generate();
        let questions = self.persist_room(room_id, &code).await?;
        let total = questions.len();
        let session = GameSession::new(code.clone(), room_id, channel, &config.subject, questions);

        let registered = self.registry().lock().await.insert(session);
        if let Err(err) = registered {
            // Lost a race for the last slot while persisting.
            self.persist("delete_room", self.store().delete_room(room_id)).await;
            return Err(err);
        }

        self.hub().send(channel, ServerEvent::InviteCode(code.clone()));
        self.hub().send(
            channel,
            ServerEvent::DbConfirmation("Room successfully created".to_owned()),
        );
        tracing::info!(room = %code, %room_id, questions = total, "room created");
        Ok(code)
    }

    async fn persist_room(&self, room_id: RoomId, code: &RoomCode) -> Result<Vec<Question>, GameError> {
        let config = self.config();
        let store = self.store();
        store
            .create_room(RoomRecord {
                id: room_id,
                code: code.clone(),
                started: false,
            })
            .await
            .map_err(GameError::RoomCreation)?;

        let rows = match store.load_questions(config.deck_size).await {
            Ok(bank) => {
                store
                    .insert_room_questions(room_id, bank, config.default_time_limit)
                    .await
            }
            Err(err) => Err(err),
        };
        let rows = match rows {
            Ok(rows) if !rows.is_empty() => rows,
            Ok(_) => {
                self.persist("delete_room", store.delete_room(room_id)).await;
                return Err(GameError::EmptyDeck);
            }
            Err(err) => {
                self.persist("delete_room", store.delete_room(room_id)).await;
                return Err(GameError::RoomCreation(err));
            }
        };

        Ok(rows
            .into_iter()
            .map(|row| Question {
                id: row.id,
                text: row.question,
                answers: row.answers,
                solution: row.solution,
                time_limit: row.time_limit,
                image: row.image,
            })
            .collect())
    }

    /// `manager:startGame`: leaves the lobby and starts the lead-in.
    pub async fn start_game(&self, channel: ChannelId) -> Result<(), GameError> {
        let handle = self
            .session_for(channel)
            .await
            .ok_or(GameError::Precondition("not in a room"))?;

        let (token, entry) = {
            let mut session = handle.lock().await;
            if !session.is_manager(channel) {
                return Err(GameError::Precondition("only the manager can start"));
            }
            let token = session
                .begin()
                .ok_or(GameError::Precondition("game already started"))?;
            let status = Status::ShowStart(StartInfo {
                time: self.config().lead_in_secs,
                subject: session.subject().to_owned(),
            });
            let entry = GameLogEntry::new(session.room_id(), None, status.name(), &status);
            session.dispatch(self.hub(), Recipient::Room, status.into());
            tracing::info!(
                room = %session.room_code(),
                players = session.roster().len(),
                "game started"
            );
            (token, entry)
        };

        self.persist("log_event", self.store().log_event(entry)).await;
        tokio::spawn(self.clone().run_game(handle, token));
        Ok(())
    }

    /// `manager:nextQuestion`: runs the next round once the current one
    /// is scored.
    pub async fn next_question(&self, channel: ChannelId) -> Result<(), GameError> {
        let handle = self
            .session_for(channel)
            .await
            .ok_or(GameError::Precondition("not in a room"))?;

        let token = {
            let mut session = handle.lock().await;
            if !session.is_manager(channel) {
                return Err(GameError::Precondition("only the manager can advance"));
            }
            if session.phase() != Phase::Scored {
                return Err(GameError::Precondition("current round is not scored yet"));
            }
            if !session.advance_question() {
                return Err(GameError::Precondition("no more questions"));
            }
            // Leave Scored before the round task runs so a repeated
            // request can't advance twice.
            session.enter(Phase::Prepared);
            session.token()
        };

        tokio::spawn(self.clone().run_round(handle, token));
        Ok(())
    }

    /// `manager:abortQuiz`: ends the game early with the standings so far.
    pub async fn abort_quiz(&self, channel: ChannelId) -> Result<(), GameError> {
        self.finish(channel, true).await
    }

    /// `manager:showLeaderboard`.
    ///
    /// While questions remain this sends the interim leaderboard to the
    /// manager. After the last round is scored it ends the game instead.
    pub async fn show_leaderboard(&self, channel: ChannelId) -> Result<(), GameError> {
        let handle = self
            .session_for(channel)
            .await
            .ok_or(GameError::Precondition("not in a room"))?;
        {
            let session = handle.lock().await;
            if !session.is_manager(channel) {
                return Err(GameError::Precondition("only the manager can show the leaderboard"));
            }
            if !session.is_started() {
                return Err(GameError::Precondition("game not started"));
            }
            if session.has_next_question() {
                let leaderboard = Leaderboard {
                    leaderboard: session.roster().leaderboard(),
                };
                session.dispatch(self.hub(), Recipient::Manager, Status::ShowLeaderboard(leaderboard).into());
                return Ok(());
            }
        }
        self.finish(channel, false).await
    }

    /// Broadcasts `FINISH`, closes the session, and forgets it.
    async fn finish(&self, channel: ChannelId, aborted: bool) -> Result<(), GameError> {
        let entry = {
            let mut registry = self.registry().lock().await;
            let (code, handle) = registry
                .session_for(channel)
                .ok_or(GameError::Precondition("not in a room"))?;
            let mut session = handle.lock().await;
            if !session.is_manager(channel) {
                return Err(GameError::Precondition("only the manager can end the game"));
            }
            if !session.is_started() {
                return Err(GameError::Precondition("game not started"));
            }
            if !aborted && (session.has_next_question() || session.phase() != Phase::Scored) {
                return Err(GameError::Precondition("final round is not scored yet"));
            }

            let status = Status::Finish(Standings {
                subject: session.subject().to_owned(),
                top: session.roster().leaderboard(),
                aborted,
            });
            let entry = GameLogEntry::new(session.room_id(), None, status.name(), &status);
            session.close();
            session.dispatch(self.hub(), Recipient::Room, status.into());
            registry.remove(&code);
            tracing::info!(room = %code, aborted, "game finished");
            entry
        };

        self.persist("log_event", self.store().log_event(entry)).await;
        Ok(())
    }
}
