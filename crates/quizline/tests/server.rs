//! Integration tests for the Quizline server over real WebSocket
//! connections.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use quizline::prelude::*;
use tokio_tungstenite::tungstenite::Message;

// =========================================================================
// Helpers
// =========================================================================

type ClientWs = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

fn bank() -> Vec<BankQuestion> {
    (0..3)
        .map(|i| BankQuestion {
            question: format!("Question {i}"),
            answers: vec!["A".into(), "B".into(), "C".into()],
            solution: 1,
            time: Some(5),
            image: None,
        })
        .collect()
}

/// No pauses between phases, so a round runs as fast as the answers come.
fn fast_game() -> GameConfig {
    GameConfig {
        password: "secret".into(),
        subject: "Trivia".into(),
        lead_in_secs: 0,
        start_countdown_secs: 0,
        prepared_secs: 0,
        question_secs: 0,
        ..GameConfig::default()
    }
}

/// Starts a server on a random port and returns the address.
async fn start_server(builder: QuizServerBuilder) -> String {
    let server = builder
        .bind("127.0.0.1:0")
        .game_config(fast_game())
        .build(MemoryStore::new(bank()))
        .await
        .expect("server should build");

    let addr = server
        .local_addr()
        .expect("should have local addr")
        .to_string();

    tokio::spawn(async move {
        let _ = server.run().await;
    });

    // Give the accept loop a moment to start.
    tokio::time::sleep(Duration::from_millis(10)).await;
    addr
}

async fn connect(addr: &str) -> ClientWs {
    let (ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
        .await
        .expect("should connect");
    ws
}

async fn send(ws: &mut ClientWs, event: ClientEvent) {
    let text = serde_json::to_string(&event).expect("encode");
    ws.send(Message::Text(text.into())).await.expect("send");
}

/// Receives the next server event, skipping control frames.
async fn recv(ws: &mut ClientWs) -> ServerEvent {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("timed out waiting for an event")
            .expect("connection closed")
            .expect("recv error");
        match msg {
            Message::Text(text) => return serde_json::from_str(text.as_str()).expect("decode"),
            Message::Ping(_) | Message::Pong(_) => continue,
            other => panic!("unexpected frame: {other:?}"),
        }
    }
}

/// Skips events until a `game:status` with the given name arrives.
async fn status(ws: &mut ClientWs, name: &str) -> Status {
    loop {
        if let ServerEvent::Status(status) = recv(ws).await {
            if status.name() == name {
                return status;
            }
        }
    }
}

/// Opens a room and returns the manager's connection and invite code.
async fn open_room(addr: &str) -> (ClientWs, RoomCode) {
    let mut manager = connect(addr).await;
    send(&mut manager, ClientEvent::CreateRoom("secret".into())).await;
    let ServerEvent::InviteCode(code) = recv(&mut manager).await else {
        panic!("expected an invite code");
    };
    assert_eq!(
        recv(&mut manager).await,
        ServerEvent::DbConfirmation("Room successfully created".into())
    );
    (manager, code)
}

async fn join(addr: &str, code: &RoomCode, username: &str) -> ClientWs {
    let mut player = connect(addr).await;
    send(
        &mut player,
        ClientEvent::Join(JoinRequest {
            username: username.into(),
            room: code.clone(),
        }),
    )
    .await;
    assert_eq!(recv(&mut player).await, ServerEvent::SuccessJoin);
    player
}

// =========================================================================
// Tests
// =========================================================================

#[tokio::test]
async fn test_create_room() {
    let addr = start_server(QuizServerBuilder::new()).await;
    let (_manager, code) = open_room(&addr).await;
    assert_eq!(code.as_str().len(), 6);
}

#[tokio::test]
async fn test_bad_password() {
    let addr = start_server(QuizServerBuilder::new()).await;
    let mut ws = connect(&addr).await;

    send(&mut ws, ClientEvent::CreateRoom("guess".into())).await;
    assert_eq!(recv(&mut ws).await, ServerEvent::ErrorMessage("Bad Password".into()));
}

#[tokio::test]
async fn test_invalid_frame_ignored() {
    let addr = start_server(QuizServerBuilder::new()).await;
    let mut ws = connect(&addr).await;

    ws.send(Message::Text("not json".into())).await.expect("send");
    ws.send(Message::Text(r#"{"event":"player:fly","data":1}"#.into()))
        .await
        .expect("send");

    // The connection still answers after the bad frames were skipped.
    send(&mut ws, ClientEvent::CheckRoom(RoomCode::new("000000"))).await;
    assert_eq!(recv(&mut ws).await, ServerEvent::ErrorMessage("Room not found".into()));
}

#[tokio::test]
async fn test_join_announced_to_manager() {
    let addr = start_server(QuizServerBuilder::new()).await;
    let (mut manager, code) = open_room(&addr).await;

    let mut player = connect(&addr).await;
    send(&mut player, ClientEvent::CheckRoom(code.clone())).await;
    assert_eq!(recv(&mut player).await, ServerEvent::SuccessRoom(code.clone()));

    send(
        &mut player,
        ClientEvent::Join(JoinRequest {
            username: "  Alice ".into(),
            room: code,
        }),
    )
    .await;
    assert_eq!(recv(&mut player).await, ServerEvent::SuccessJoin);

    let ServerEvent::NewPlayer(summary) = recv(&mut manager).await else {
        panic!("expected manager:newPlayer");
    };
    assert_eq!(summary.username, "Alice");
    assert_eq!(summary.points, 0);
}

#[tokio::test]
async fn test_full_round_over_websocket() {
    let addr = start_server(QuizServerBuilder::new()).await;
    let (mut manager, code) = open_room(&addr).await;
    let mut alice = join(&addr, &code, "Alice").await;

    send(&mut manager, ClientEvent::StartGame).await;
    status(&mut alice, "SHOW_START").await;
    let Status::SelectAnswer(prompt) = status(&mut alice, "SELECT_ANSWER").await else {
        unreachable!();
    };
    assert_eq!(prompt.time, 5);
    assert_eq!(prompt.total_player, 1);

    send(&mut alice, ClientEvent::SelectedAnswer(1)).await;
    status(&mut alice, "WAIT").await;

    // Alice was the only player, so the round closes without waiting.
    let Status::ShowResult(result) = status(&mut alice, "SHOW_RESULT").await else {
        unreachable!();
    };
    assert!(result.correct);
    assert_eq!(result.rank, 1);
    assert!(result.points > 0);

    let Status::ShowResponses(chart) = status(&mut manager, "SHOW_RESPONSES").await else {
        unreachable!();
    };
    assert_eq!(chart.correct, 1);
    assert_eq!(chart.responses.get(&1), Some(&1));

    send(&mut manager, ClientEvent::AbortQuiz).await;
    let Status::Finish(standings) = status(&mut alice, "FINISH").await else {
        unreachable!();
    };
    assert!(standings.aborted);
    assert_eq!(standings.subject, "Trivia");
    assert_eq!(standings.top[0].username, "Alice");
}

#[tokio::test]
async fn test_manager_leaving_resets_players() {
    let addr = start_server(QuizServerBuilder::new()).await;
    let (mut manager, code) = open_room(&addr).await;
    let mut alice = join(&addr, &code, "Alice").await;

    manager.close(None).await.expect("close");
    drop(manager);

    loop {
        if recv(&mut alice).await == ServerEvent::Reset {
            break;
        }
    }

    // The slot is free again for a new room.
    let (_manager, _code) = open_room(&addr).await;
}

#[tokio::test]
async fn test_idle_connection_closed() {
    let addr = start_server(QuizServerBuilder::new().idle_timeout(Duration::from_millis(200))).await;
    let mut ws = connect(&addr).await;

    let result = tokio::time::timeout(Duration::from_secs(2), ws.next()).await;
    match result {
        Ok(Some(Ok(Message::Close(_)))) | Ok(None) => {} // expected
        Ok(Some(Err(_))) => {}                           // also fine
        other => panic!("expected close, got {other:?}"),
    }
}
