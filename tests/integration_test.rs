//! Integration tests driving a live relay server over real WebSockets.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::TcpStream;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};

use chess_relay_rs::server::run_server;

type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Spawn a server on `port` and wait until it accepts connections.
async fn start_server(port: u16) {
    tokio::spawn(run_server("127.0.0.1".to_string(), port));
    for _ in 0..50 {
        if TcpStream::connect(("127.0.0.1", port)).await.is_ok() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("server did not start on port {port}");
}

async fn connect(port: u16) -> WsClient {
    let (ws, _) = connect_async(format!("ws://127.0.0.1:{port}/ws"))
        .await
        .expect("failed to connect");
    ws
}

async fn send(ws: &mut WsClient, msg: Value) {
    ws.send(Message::Text(msg.to_string().into()))
        .await
        .expect("failed to send");
}

/// Receive the next text frame as JSON, with a timeout.
async fn recv(ws: &mut WsClient) -> Value {
    let frame = tokio::time::timeout(Duration::from_secs(2), ws.next())
        .await
        .expect("timed out waiting for a frame")
        .expect("connection closed")
        .expect("websocket error");
    match frame {
        Message::Text(text) => serde_json::from_str(&text).expect("frame is not JSON"),
        other => panic!("unexpected frame: {other:?}"),
    }
}

/// Assert that nothing arrives on `ws` for a short while.
async fn assert_silent(ws: &mut WsClient) {
    let result = tokio::time::timeout(Duration::from_millis(300), ws.next()).await;
    assert!(result.is_err(), "expected silence, got {result:?}");
}

/// Create a room and return (host socket, room id).
async fn create_room(port: u16) -> (WsClient, String) {
    let mut host = connect(port).await;
    send(&mut host, json!({"action": "createRoom"})).await;
    let reply = recv(&mut host).await;
    assert_eq!(reply["action"], "roomCreated");
    let room = reply["room"].as_str().expect("room code").to_string();
    (host, room)
}

/// Create a room, join a guest, and drain the join notifications.
async fn create_pair(port: u16) -> (WsClient, WsClient, String) {
    let (mut host, room) = create_room(port).await;
    let mut guest = connect(port).await;
    send(&mut guest, json!({"action": "joinRoom", "room": room})).await;
    assert_eq!(recv(&mut guest).await["action"], "joinedRoom");
    assert_eq!(recv(&mut host).await["action"], "playerJoined");
    (host, guest, room)
}

fn start_game_msg(room: &str) -> Value {
    json!({
        "action": "startGame",
        "room": room,
        "whiteTimeMs": 300_000,
        "blackTimeMs": 300_000,
        "incrementMs": 0,
        "hostColor": "White",
    })
}

#[tokio::test]
async fn test_create_room_returns_a_four_digit_code() {
    // given:
    let port = 18090;
    start_server(port).await;

    // when:
    let (_host, room) = create_room(port).await;

    // then:
    assert_eq!(room.len(), 4);
    assert!(room.chars().all(|c| c.is_ascii_digit()));
}

#[tokio::test]
async fn test_join_unknown_room_is_an_error() {
    // given:
    let port = 18091;
    start_server(port).await;
    let mut client = connect(port).await;

    // when:
    send(&mut client, json!({"action": "joinRoom", "room": "0000"})).await;

    // then:
    let reply = recv(&mut client).await;
    assert_eq!(reply["action"], "error");
    assert_eq!(reply["message"], "Room 0000 does not exist");
}

#[tokio::test]
async fn test_full_room_rejects_a_third_join() {
    // given:
    let port = 18092;
    start_server(port).await;
    let (_host, _guest, room) = create_pair(port).await;

    // when:
    let mut third = connect(port).await;
    send(&mut third, json!({"action": "joinRoom", "room": room})).await;

    // then:
    let reply = recv(&mut third).await;
    assert_eq!(reply["action"], "error");
    assert_eq!(reply["message"], format!("Room {room} is full"));
}

#[tokio::test]
async fn test_game_start_is_broadcast_with_timer_state() {
    // given:
    let port = 18093;
    start_server(port).await;
    let (mut host, mut guest, room) = create_pair(port).await;

    // when:
    send(&mut host, start_game_msg(&room)).await;

    // then: both members receive the same gameStart
    for ws in [&mut host, &mut guest] {
        let msg = recv(ws).await;
        assert_eq!(msg["action"], "gameStart");
        assert_eq!(msg["room"], room);
        assert_eq!(msg["whiteTimeMs"], 300_000);
        assert_eq!(msg["blackTimeMs"], 300_000);
        assert_eq!(msg["hostColor"], "White");
        assert!(msg["serverTimestamp"].as_i64().expect("timestamp") > 0);
        assert_eq!(msg["timerState"]["timeA"], 300_000);
        assert_eq!(msg["timerState"]["timeB"], 300_000);
        assert_eq!(msg["timerState"]["currentPlayer"], "White");
        assert_eq!(msg["timerState"]["lastSwitchTime"], Value::Null);
    }
}

#[tokio::test]
async fn test_first_move_merges_timer_state_for_both_members() {
    // given: a started game with a 2 second increment
    let port = 18094;
    start_server(port).await;
    let (mut host, mut guest, room) = create_pair(port).await;
    let mut start = start_game_msg(&room);
    start["incrementMs"] = json!(2_000);
    send(&mut host, start).await;
    recv(&mut host).await;
    recv(&mut guest).await;

    // when: the host (White) makes the first move
    send(
        &mut host,
        json!({"action": "move", "room": room, "from": "e2", "to": "e4"}),
    )
    .await;

    // then: both members, sender included, receive the merged payload; the
    // first move costs nothing and is credited the increment
    for ws in [&mut host, &mut guest] {
        let msg = recv(ws).await;
        assert_eq!(msg["action"], "move");
        assert_eq!(msg["from"], "e2");
        assert_eq!(msg["to"], "e4");
        assert_eq!(msg["timerState"]["timeA"], 302_000);
        assert_eq!(msg["timerState"]["timeB"], 300_000);
        assert_eq!(msg["timerState"]["currentPlayer"], "Black");
        assert!(msg["timerState"]["lastSwitchTime"].as_i64().expect("switch time") > 0);
    }
}

#[tokio::test]
async fn test_move_before_game_start_relays_to_the_other_member_only() {
    // given: a paired room where startGame was never sent
    let port = 18095;
    start_server(port).await;
    let (mut host, mut guest, room) = create_pair(port).await;

    // when:
    send(
        &mut host,
        json!({"action": "move", "room": room, "from": "g1", "to": "f3"}),
    )
    .await;

    // then: the guest receives the payload unmodified, the sender nothing
    let msg = recv(&mut guest).await;
    assert_eq!(msg["action"], "move");
    assert_eq!(msg["from"], "g1");
    assert_eq!(msg["to"], "f3");
    assert_eq!(msg.get("timerState"), None);
    assert_silent(&mut host).await;
}

#[tokio::test]
async fn test_surrender_relays_verbatim_to_the_other_member_only() {
    // given:
    let port = 18096;
    start_server(port).await;
    let (mut host, mut guest, room) = create_pair(port).await;

    // when:
    send(&mut guest, json!({"action": "surrender", "room": room})).await;

    // then:
    let msg = recv(&mut host).await;
    assert_eq!(msg, json!({"action": "surrender", "room": room}));
    assert_silent(&mut guest).await;
}

#[tokio::test]
async fn test_host_leave_promotes_the_guest() {
    // given:
    let port = 18097;
    start_server(port).await;
    let (mut host, mut guest, room) = create_pair(port).await;

    // when:
    send(&mut host, json!({"action": "leaveRoom", "room": room})).await;

    // then: departure notice first, then exactly one promotion
    let msg = recv(&mut guest).await;
    assert_eq!(msg, json!({"action": "playerLeft", "room": room}));
    let msg = recv(&mut guest).await;
    assert_eq!(msg, json!({"action": "promotedToHost", "room": room}));
    assert_silent(&mut guest).await;
}

#[tokio::test]
async fn test_emptied_room_code_becomes_unknown() {
    // given:
    let port = 18098;
    start_server(port).await;
    let (mut host, mut guest, room) = create_pair(port).await;

    // when: both members leave, emptying the room
    send(&mut host, json!({"action": "leaveRoom", "room": room})).await;
    recv(&mut guest).await; // playerLeft
    recv(&mut guest).await; // promotedToHost
    send(&mut guest, json!({"action": "leaveRoom", "room": room})).await;

    // then: a join to the same code fails; frames from one connection are
    // processed in order, so the guest's own re-join observes its leave
    send(&mut guest, json!({"action": "joinRoom", "room": room})).await;
    let reply = recv(&mut guest).await;
    assert_eq!(reply["action"], "error");
    assert_eq!(reply["message"], format!("Room {room} does not exist"));
}

#[tokio::test]
async fn test_unrecognized_action_gets_an_explicit_error() {
    // given:
    let port = 18099;
    start_server(port).await;
    let mut client = connect(port).await;

    // when:
    send(&mut client, json!({"action": "teleport"})).await;

    // then:
    let reply = recv(&mut client).await;
    assert_eq!(reply["action"], "error");
    assert_eq!(reply["message"], "unrecognized action: teleport");
}

#[tokio::test]
async fn test_malformed_frame_gets_an_error_and_the_connection_survives() {
    // given:
    let port = 18100;
    start_server(port).await;
    let mut client = connect(port).await;

    // when:
    client
        .send(Message::Text("not json".into()))
        .await
        .expect("failed to send");

    // then: an error reply, not a dropped connection or a dead server
    let reply = recv(&mut client).await;
    assert_eq!(reply["action"], "error");
    send(&mut client, json!({"action": "createRoom"})).await;
    assert_eq!(recv(&mut client).await["action"], "roomCreated");
}

#[tokio::test]
async fn test_disconnect_notifies_and_promotes_the_remaining_member() {
    // given:
    let port = 18101;
    start_server(port).await;
    let (mut host, mut guest, room) = create_pair(port).await;

    // when: the host's socket closes without an explicit leave
    host.close(None).await.expect("failed to close");

    // then: close cleanup behaves exactly like a leave
    let msg = recv(&mut guest).await;
    assert_eq!(msg, json!({"action": "playerLeft", "room": room}));
    let msg = recv(&mut guest).await;
    assert_eq!(msg, json!({"action": "promotedToHost", "room": room}));
}
