//! Persistence gateway.
//!
//! The game core only ever *writes* through [`Store`], apart from drawing
//! the question deck when a room is created. Live state is never read
//! back: the session in memory is authoritative while it runs.
//!
//! [`MemoryStore`] is the bundled implementation. It keeps every table in
//! a mutex-guarded struct and can be told to fail specific operations,
//! which is how the tests drive the error paths.

use std::collections::HashSet;
use std::future::Future;
use std::sync::{Mutex, PoisonError};

use quizline_protocol::{ChannelId, PlayerId, QuestionId, RoomCode, RoomId};
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// A question as authored in the bank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankQuestion {
    pub question: String,
    pub answers: Vec<String>,
    /// Index of the correct answer.
    pub solution: usize,
    /// Time limit in seconds; the game default applies when absent.
    #[serde(default)]
    pub time: Option<u32>,
    #[serde(default)]
    pub image: Option<String>,
}

impl BankQuestion {
    /// Whether the question can be played: at least two answers and a
    /// solution that points at one of them.
    pub fn is_playable(&self) -> bool {
        self.answers.len() >= 2 && self.solution < self.answers.len()
    }
}

/// A room row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomRecord {
    pub id: RoomId,
    pub code: RoomCode,
    pub started: bool,
}

/// The room's own copy of a bank question, with its time limit resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredQuestion {
    pub id: QuestionId,
    pub room_id: RoomId,
    pub question: String,
    pub answers: Vec<String>,
    pub solution: usize,
    pub time_limit: u32,
    pub image: Option<String>,
}

/// A player about to be inserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPlayerRecord {
    pub room_id: RoomId,
    pub username: String,
    pub channel: ChannelId,
}

/// A player row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredPlayer {
    pub id: PlayerId,
    pub room_id: RoomId,
    pub username: String,
    pub channel: ChannelId,
    pub points: u32,
    pub connected: bool,
}

/// One answer row. `points_awarded` is the time-based value, credited
/// later only if the answer is correct.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnswerRecord {
    pub player_id: PlayerId,
    pub question_id: QuestionId,
    pub selected_index: usize,
    pub points_awarded: u32,
}

/// One entry of the room's event log.
#[derive(Debug, Clone, PartialEq)]
pub struct GameLogEntry {
    pub room_id: RoomId,
    pub player_id: Option<PlayerId>,
    pub event: String,
    pub payload: serde_json::Value,
}

impl GameLogEntry {
    /// Builds an entry, serializing `payload` to JSON (`null` if that fails).
    pub fn new(
        room_id: RoomId,
        player_id: Option<PlayerId>,
        event: impl Into<String>,
        payload: &impl Serialize,
    ) -> Self {
        Self {
            room_id,
            player_id,
            event: event.into(),
            payload: serde_json::to_value(payload).unwrap_or_default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// Errors a store can report.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backend couldn't be reached or rejected the write.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A referenced row doesn't exist.
    #[error("record not found: {0}")]
    NotFound(String),
}

/// Write-mostly persistence for rooms, players, answers, and event logs.
///
/// Methods return `impl Future + Send` so implementations can be awaited
/// from spawned round tasks.
pub trait Store: Send + Sync + 'static {
    fn create_room(&self, room: RoomRecord) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Draws up to `limit` questions from the bank, shuffled.
    fn load_questions(
        &self,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<BankQuestion>, StoreError>> + Send;

    /// Snapshots `questions` into per-room rows, in order, resolving
    /// missing time limits to `default_time_limit`.
    fn insert_room_questions(
        &self,
        room_id: RoomId,
        questions: Vec<BankQuestion>,
        default_time_limit: u32,
    ) -> impl Future<Output = Result<Vec<StoredQuestion>, StoreError>> + Send;

    fn insert_player(
        &self,
        player: NewPlayerRecord,
    ) -> impl Future<Output = Result<PlayerId, StoreError>> + Send;

    fn update_player_points(
        &self,
        player_id: PlayerId,
        points: u32,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn mark_player_disconnected(
        &self,
        player_id: PlayerId,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn insert_answer(
        &self,
        answer: AnswerRecord,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn log_event(&self, entry: GameLogEntry) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Deletes the room with its answers, players, and question snapshots.
    fn delete_room(&self, room_id: RoomId) -> impl Future<Output = Result<(), StoreError>> + Send;
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

/// A [`Store`] operation, used to inject failures into [`MemoryStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    CreateRoom,
    LoadQuestions,
    InsertRoomQuestions,
    InsertPlayer,
    UpdatePlayerPoints,
    MarkPlayerDisconnected,
    InsertAnswer,
    LogEvent,
    DeleteRoom,
}

/// Every table a [`MemoryStore`] holds.
#[derive(Debug, Clone, Default)]
pub struct MemoryTables {
    pub rooms: Vec<RoomRecord>,
    pub questions: Vec<StoredQuestion>,
    pub players: Vec<StoredPlayer>,
    pub answers: Vec<AnswerRecord>,
    pub events: Vec<GameLogEntry>,
    next_id: u64,
}

impl MemoryTables {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    /// Names of the logged events for one room, oldest first.
    pub fn event_names(&self, room_id: RoomId) -> Vec<&str> {
        self.events
            .iter()
            .filter(|e| e.room_id == room_id)
            .map(|e| e.event.as_str())
            .collect()
    }

    pub fn player(&self, id: PlayerId) -> Option<&StoredPlayer> {
        self.players.iter().find(|p| p.id == id)
    }
}

/// In-process [`Store`] backed by plain vectors.
#[derive(Debug, Default)]
pub struct MemoryStore {
    bank: Vec<BankQuestion>,
    tables: Mutex<MemoryTables>,
    failing: Mutex<HashSet<Operation>>,
}

impl MemoryStore {
    /// Creates a store whose question bank is `bank`. Unplayable questions
    /// are dropped with a warning.
    pub fn new(bank: Vec<BankQuestion>) -> Self {
        let total = bank.len();
        let bank: Vec<_> = bank.into_iter().filter(BankQuestion::is_playable).collect();
        if bank.len() < total {
            tracing::warn!(dropped = total - bank.len(), "skipping unplayable bank questions");
        }
        Self {
            bank,
            ..Self::default()
        }
    }

    /// Makes every later call of `op` fail with [`StoreError::Unavailable`].
    pub fn fail_on(&self, op: Operation) {
        self.failing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(op);
    }

    /// Undoes [`fail_on`](Self::fail_on).
    pub fn recover(&self, op: Operation) {
        self.failing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&op);
    }

    /// A copy of every table.
    pub fn snapshot(&self) -> MemoryTables {
        self.tables().clone()
    }

    pub fn bank_len(&self) -> usize {
        self.bank.len()
    }

    fn check(&self, op: Operation) -> Result<(), StoreError> {
        let failing = self.failing.lock().unwrap_or_else(PoisonError::into_inner);
        if failing.contains(&op) {
            return Err(StoreError::Unavailable(format!("{op:?} disabled")));
        }
        Ok(())
    }

    fn tables(&self) -> std::sync::MutexGuard<'_, MemoryTables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Store for MemoryStore {
    async fn create_room(&self, room: RoomRecord) -> Result<(), StoreError> {
        self.check(Operation::CreateRoom)?;
        self.tables().rooms.push(room);
        Ok(())
    }

    async fn load_questions(&self, limit: usize) -> Result<Vec<BankQuestion>, StoreError> {
        self.check(Operation::LoadQuestions)?;
        let mut deck = self.bank.clone();
        deck.shuffle(&mut rand::rng());
        deck.truncate(limit);
        Ok(deck)
    }

    async fn insert_room_questions(
        &self,
        room_id: RoomId,
        questions: Vec<BankQuestion>,
        default_time_limit: u32,
    ) -> Result<Vec<StoredQuestion>, StoreError> {
        self.check(Operation::InsertRoomQuestions)?;
        let mut tables = self.tables();
        if !tables.rooms.iter().any(|r| r.id == room_id) {
            return Err(StoreError::NotFound(room_id.to_string()));
        }
        let mut stored = Vec::with_capacity(questions.len());
        for q in questions {
            let row = StoredQuestion {
                id: QuestionId(tables.next_id()),
                room_id,
                question: q.question,
                answers: q.answers,
                solution: q.solution,
                time_limit: q.time.unwrap_or(default_time_limit),
                image: q.image,
            };
            tables.questions.push(row.clone());
            stored.push(row);
        }
        Ok(stored)
    }

    async fn insert_player(&self, player: NewPlayerRecord) -> Result<PlayerId, StoreError> {
        self.check(Operation::InsertPlayer)?;
        let mut tables = self.tables();
        let id = PlayerId(tables.next_id());
        tables.players.push(StoredPlayer {
            id,
            room_id: player.room_id,
            username: player.username,
            channel: player.channel,
            points: 0,
            connected: true,
        });
        Ok(id)
    }

    async fn update_player_points(&self, player_id: PlayerId, points: u32) -> Result<(), StoreError> {
        self.check(Operation::UpdatePlayerPoints)?;
        let mut tables = self.tables();
        let player = tables
            .players
            .iter_mut()
            .find(|p| p.id == player_id)
            .ok_or_else(|| StoreError::NotFound(player_id.to_string()))?;
        player.points = points;
        Ok(())
    }

    async fn mark_player_disconnected(&self, player_id: PlayerId) -> Result<(), StoreError> {
        self.check(Operation::MarkPlayerDisconnected)?;
        let mut tables = self.tables();
        let player = tables
            .players
            .iter_mut()
            .find(|p| p.id == player_id)
            .ok_or_else(|| StoreError::NotFound(player_id.to_string()))?;
        player.connected = false;
        Ok(())
    }

    async fn insert_answer(&self, answer: AnswerRecord) -> Result<(), StoreError> {
        self.check(Operation::InsertAnswer)?;
        self.tables().answers.push(answer);
        Ok(())
    }

    async fn log_event(&self, entry: GameLogEntry) -> Result<(), StoreError> {
        self.check(Operation::LogEvent)?;
        self.tables().events.push(entry);
        Ok(())
    }

    async fn delete_room(&self, room_id: RoomId) -> Result<(), StoreError> {
        self.check(Operation::DeleteRoom)?;
        let mut tables = self.tables();
        let question_ids: HashSet<QuestionId> = tables
            .questions
            .iter()
            .filter(|q| q.room_id == room_id)
            .map(|q| q.id)
            .collect();
        tables.answers.retain(|a| !question_ids.contains(&a.question_id));
        tables.players.retain(|p| p.room_id != room_id);
        tables.questions.retain(|q| q.room_id != room_id);
        tables.rooms.retain(|r| r.id != room_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bank(n: usize) -> Vec<BankQuestion> {
        (0..n)
            .map(|i| BankQuestion {
                question: format!("q{i}"),
                answers: vec!["a".into(), "b".into()],
                solution: 0,
                time: None,
                image: None,
            })
            .collect()
    }

    fn room() -> RoomRecord {
        RoomRecord {
            id: RoomId::generate(),
            code: RoomCode::new("123456"),
            started: false,
        }
    }

    #[tokio::test]
    async fn test_load_questions_respects_limit() {
        let store = MemoryStore::new(bank(30));
        assert_eq!(store.load_questions(18).await.unwrap().len(), 18);
        assert_eq!(store.load_questions(50).await.unwrap().len(), 30);
    }

    #[test]
    fn test_unplayable_questions_are_dropped() {
        let mut questions = bank(2);
        questions[1].solution = 5;
        let store = MemoryStore::new(questions);
        assert_eq!(store.bank_len(), 1);
    }

    #[tokio::test]
    async fn test_room_questions_resolve_default_time() {
        let store = MemoryStore::new(vec![]);
        let room = room();
        store.create_room(room.clone()).await.unwrap();

        let mut questions = bank(2);
        questions[1].time = Some(30);
        let stored = store.insert_room_questions(room.id, questions, 15).await.unwrap();

        assert_eq!(stored[0].time_limit, 15);
        assert_eq!(stored[1].time_limit, 30);
        assert_ne!(stored[0].id, stored[1].id);
    }

    #[tokio::test]
    async fn test_room_questions_need_a_room() {
        let store = MemoryStore::new(vec![]);
        let result = store.insert_room_questions(RoomId::generate(), bank(1), 15).await;
        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_room_removes_dependents() {
        let store = MemoryStore::new(vec![]);
        let keep = room();
        let gone = room();
        store.create_room(keep.clone()).await.unwrap();
        store.create_room(gone.clone()).await.unwrap();
        let kept_q = store.insert_room_questions(keep.id, bank(1), 15).await.unwrap();
        let gone_q = store.insert_room_questions(gone.id, bank(1), 15).await.unwrap();
        let player = store
            .insert_player(NewPlayerRecord {
                room_id: gone.id,
                username: "Ada".into(),
                channel: ChannelId::new(1),
            })
            .await
            .unwrap();
        for q in [&kept_q[0], &gone_q[0]] {
            store
                .insert_answer(AnswerRecord {
                    player_id: player,
                    question_id: q.id,
                    selected_index: 0,
                    points_awarded: 500,
                })
                .await
                .unwrap();
        }

        store.delete_room(gone.id).await.unwrap();

        let tables = store.snapshot();
        assert_eq!(tables.rooms, vec![keep]);
        assert_eq!(tables.questions.len(), 1);
        assert!(tables.players.is_empty());
        assert_eq!(tables.answers.len(), 1);
        assert_eq!(tables.answers[0].question_id, kept_q[0].id);
    }

    #[tokio::test]
    async fn test_injected_failure_and_recovery() {
        let store = MemoryStore::new(vec![]);
        store.fail_on(Operation::CreateRoom);
        assert!(matches!(
            store.create_room(room()).await,
            Err(StoreError::Unavailable(_))
        ));

        store.recover(Operation::CreateRoom);
        assert!(store.create_room(room()).await.is_ok());
    }

    #[tokio::test]
    async fn test_player_updates() {
        let store = MemoryStore::new(vec![]);
        let id = store
            .insert_player(NewPlayerRecord {
                room_id: RoomId::generate(),
                username: "Ada".into(),
                channel: ChannelId::new(1),
            })
            .await
            .unwrap();

        store.update_player_points(id, 1200).await.unwrap();
        store.mark_player_disconnected(id).await.unwrap();

        let tables = store.snapshot();
        let player = tables.player(id).unwrap();
        assert_eq!(player.points, 1200);
        assert!(!player.connected);
        assert!(matches!(
            store.update_player_points(PlayerId(999), 1).await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn test_log_entry_serializes_payload() {
        let entry = GameLogEntry::new(RoomId::generate(), None, "SHOW_START", &serde_json::json!({ "time": 3 }));
        assert_eq!(entry.payload["time"], 3);
    }
}
