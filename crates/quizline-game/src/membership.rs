//! Joining, leaving, and removing players.

use quizline_protocol::{ChannelId, JoinRequest, PlayerId, RoomCode, ServerEvent};

use crate::validate::validate_username;
use crate::{GameError, GameSession, NewPlayerRecord, Player, Quiz, Recipient, Store};

impl<S: Store> Quiz<S> {
    /// `player:checkRoom`: tells the client whether `code` is live.
    pub async fn check_room(&self, channel: ChannelId, code: &RoomCode) -> Result<(), GameError> {
        if self.session(code).await.is_none() {
            return Err(GameError::RoomNotFound);
        }
        self.hub().send(channel, ServerEvent::SuccessRoom(code.clone()));
        Ok(())
    }

    /// `player:join`.
    ///
    /// The player is persisted before being added to the roster. Because
    /// that write is awaited without any lock held, every check is
    /// repeated afterwards; if one no longer holds, the orphaned record is
    /// marked disconnected and the join fails.
    pub async fn join(&self, channel: ChannelId, request: JoinRequest) -> Result<(), GameError> {
        let username = validate_username(&request.username, self.config())?;
        let code = request.room;

        let (handle, room_id) = {
            let registry = self.registry().lock().await;
            if registry.is_bound(channel) {
                return Err(GameError::AlreadyJoined);
            }
            let handle = registry.get(&code).ok_or(GameError::RoomNotFound)?;
            let session = handle.lock().await;
            session.check_joinable(&username)?;
            let room_id = session.room_id();
            drop(session);
            (handle, room_id)
        };

        let player_id = self
            .store()
            .insert_player(NewPlayerRecord {
                room_id,
                username: username.clone(),
                channel,
            })
            .await
            .map_err(GameError::PlayerRegistration)?;

        let committed = {
            let mut registry = self.registry().lock().await;
            if !registry.is_live(&code, &handle) {
                Err(GameError::RoomNotFound)
            } else if registry.is_bound(channel) {
                Err(GameError::AlreadyJoined)
            } else {
                let mut session = handle.lock().await;
                match session.check_joinable(&username) {
                    Ok(()) => {
                        let player = Player::new(player_id, username, channel);
                        session.dispatch(self.hub(), Recipient::Manager, ServerEvent::NewPlayer(player.summary()));
                        session.roster.add(player);
                        registry.bind(channel, code.clone());
                        tracing::info!(
                            room = %code,
                            %player_id,
                            players = session.roster().len(),
                            "player joined"
                        );
                        Ok(())
                    }
                    Err(err) => Err(err),
                }
            }
        };

        match committed {
            Ok(()) => {
                self.hub().send(channel, ServerEvent::SuccessJoin);
                Ok(())
            }
            Err(err) => {
                self.persist(
                    "mark_player_disconnected",
                    self.store().mark_player_disconnected(player_id),
                )
                .await;
                Err(err)
            }
        }
    }

    /// `manager:kickPlayer`.
    pub async fn kick_player(&self, channel: ChannelId, player_id: PlayerId) -> Result<(), GameError> {
        let removed = {
            let mut registry = self.registry().lock().await;
            let (_, handle) = registry
                .session_for(channel)
                .ok_or(GameError::Precondition("not in a room"))?;
            let mut session = handle.lock().await;
            if !session.is_manager(channel) {
                return Err(GameError::Precondition("only the manager can kick"));
            }
            let player = session
                .roster
                .remove(player_id)
                .ok_or(GameError::Precondition("no such player"))?;
            registry.unbind(player.channel);
            self.hub().send(player.channel, ServerEvent::Kick);
            self.after_removal(&mut session, &player);
            tracing::info!(room = %session.room_code(), %player_id, "player kicked");
            player
        };

        self.persist(
            "mark_player_disconnected",
            self.store().mark_player_disconnected(removed.id),
        )
        .await;
        Ok(())
    }

    /// Cleans up after a connection closes.
    ///
    /// A departing manager takes the whole session down: the room gets
    /// `game:reset` and the room's records are deleted. A departing player
    /// is removed from the roster and marked disconnected.
    pub async fn disconnect(&self, channel: ChannelId) {
        let mut registry = self.registry().lock().await;
        let Some((code, handle)) = registry.session_for(channel) else {
            return;
        };
        let mut session = handle.lock().await;

        if session.is_manager(channel) {
            session.dispatch(self.hub(), Recipient::Room, ServerEvent::Reset);
            session.close();
            registry.remove(&code);
            let room_id = session.room_id();
            drop(session);
            drop(registry);
            tracing::info!(room = %code, "manager left, session reset");
            self.persist("delete_room", self.store().delete_room(room_id)).await;
            return;
        }

        let Some(player) = session.roster.remove_by_channel(channel) else {
            registry.unbind(channel);
            return;
        };
        registry.unbind(channel);
        self.after_removal(&mut session, &player);
        tracing::info!(room = %code, player_id = %player.id, "player left");
        drop(session);
        drop(registry);

        self.persist(
            "mark_player_disconnected",
            self.store().mark_player_disconnected(player.id),
        )
        .await;
    }

    fn after_removal(&self, session: &mut GameSession, player: &Player) {
        session.dispatch(self.hub(), Recipient::Manager, ServerEvent::RemovePlayer(player.id));
        session.complete_early_if_done();
    }
}
