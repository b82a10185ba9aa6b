//! Room integration tests: start a real server and talk to it over WebSockets.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use lonely_hangout::config::Config;
use lonely_hangout::persistence::{CatalogStore, JsonFileStore, WriterOptions};
use lonely_hangout::room::SavedStates;
use lonely_hangout::ws::{Room, RoomOptions};
use lonely_hangout::{serve, AppState};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

struct TestServer {
    port: u16,
    room: Arc<Room>,
    states_path: std::path::PathBuf,
    _dir: tempfile::TempDir,
}

/// Start a server on a free port with its own saved states file.
async fn start_server() -> TestServer {
    let dir = tempfile::tempdir().unwrap();
    let states_path = dir.path().join("app.xml.states.json");
    let store = Arc::new(JsonFileStore::new(&states_path));

    // Keep the volume feed out of the way unless a test asks for it.
    let options = RoomOptions {
        signal_interval: Duration::from_secs(3600),
        writer: WriterOptions::default(),
    };
    let room = Room::new(store.load().await.unwrap(), store, options);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let state = AppState::new(room.clone(), Config::default());
    tokio::spawn(async move {
        let _ = serve(listener, state, std::future::pending()).await;
    });

    TestServer {
        port,
        room,
        states_path,
        _dir: dir,
    }
}

async fn connect(server: &TestServer) -> Client {
    let url = format!("ws://127.0.0.1:{}/ws", server.port);
    let (ws, _) = connect_async(&url).await.expect("WS connect failed");
    ws
}

async fn send(ws: &mut Client, event: &str, payload: Value) {
    let frame = json!({ "event": event, "payload": payload });
    ws.send(Message::Text(frame.to_string().into())).await.unwrap();
}

/// Next event frame, skipping volume updates.
async fn next_event(ws: &mut Client) -> Value {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("timed out waiting for an event")
            .expect("socket closed")
            .unwrap();
        if let Message::Text(text) = msg {
            let event: Value = serde_json::from_str(text.as_str()).unwrap();
            if event["event"] != "volume-changed" {
                return event;
            }
        }
    }
}

async fn expect_event(ws: &mut Client, name: &str) -> Value {
    let event = next_event(ws).await;
    assert_eq!(event["event"], name, "unexpected event: {event}");
    event["payload"].clone()
}

/// Nothing but (optionally) volume updates arrives within `wait`.
async fn expect_silence(ws: &mut Client, wait: Duration) {
    if let Ok(event) = tokio::time::timeout(wait, next_event(ws)).await {
        panic!("expected no event, got {event}");
    }
}

#[tokio::test]
async fn test_two_participants_then_late_joiner() {
    let server = start_server().await;

    let mut a = connect(&server).await;
    let welcome_a = expect_event(&mut a, "welcome").await;
    assert_eq!(welcome_a["state"], json!({}));

    let mut b = connect(&server).await;
    let welcome_b = expect_event(&mut b, "welcome").await;
    assert_eq!(welcome_b["users"].as_array().unwrap().len(), 2);
    let joined = expect_event(&mut a, "participants-changed").await;
    assert_eq!(joined["users"], welcome_b["users"]);

    send(&mut a, "submit-delta", json!({ "delta": { "x": 1 } })).await;
    assert_eq!(expect_event(&mut a, "state-changed").await["state"], json!({ "x": 1 }));
    assert_eq!(expect_event(&mut b, "state-changed").await["state"], json!({ "x": 1 }));

    send(&mut b, "submit-delta", json!({ "delta": { "y": 2 }, "deleteKeys": ["x"] })).await;
    assert_eq!(expect_event(&mut a, "state-changed").await["state"], json!({ "y": 2 }));
    assert_eq!(expect_event(&mut b, "state-changed").await["state"], json!({ "y": 2 }));

    let mut c = connect(&server).await;
    let welcome_c = expect_event(&mut c, "welcome").await;
    assert_eq!(welcome_c["state"], json!({ "y": 2 }));
    let ids: Vec<&Value> = welcome_c["users"].as_array().unwrap().iter().map(|u| &u["id"]).collect();
    assert_eq!(ids, vec![&welcome_a["id"], &welcome_b["id"], &welcome_c["id"]]);

    // The joiner hears nothing about its own arrival; the others do.
    expect_event(&mut a, "participants-changed").await;
    expect_event(&mut b, "participants-changed").await;
    expect_silence(&mut c, Duration::from_millis(200)).await;
}

#[tokio::test]
async fn test_reset_reaches_everyone() {
    let server = start_server().await;
    let mut a = connect(&server).await;
    expect_event(&mut a, "welcome").await;
    let mut b = connect(&server).await;
    expect_event(&mut b, "welcome").await;
    expect_event(&mut a, "participants-changed").await;

    send(&mut b, "reset-state", json!({ "state": { "board": [1, 2, 3] } })).await;
    for ws in [&mut a, &mut b] {
        assert_eq!(expect_event(ws, "state-changed").await["state"], json!({ "board": [1, 2, 3] }));
    }

    send(&mut a, "reset-state", json!({})).await;
    for ws in [&mut a, &mut b] {
        assert_eq!(expect_event(ws, "state-changed").await["state"], json!({}));
    }
}

#[tokio::test]
async fn test_saved_state_broadcast_and_persisted() {
    let server = start_server().await;
    let mut a = connect(&server).await;
    expect_event(&mut a, "welcome").await;
    let mut b = connect(&server).await;
    expect_event(&mut b, "welcome").await;
    expect_event(&mut a, "participants-changed").await;

    let snapshot = json!({ "level": 3, "players": ["Quiet Otter", null], "ratio": 0.5 });
    send(&mut a, "add-saved-state", json!({ "name": "checkpoint", "state": snapshot })).await;
    for ws in [&mut a, &mut b] {
        let payload = expect_event(ws, "saved-states-changed").await;
        assert_eq!(payload["savedStates"]["checkpoint"], snapshot);
    }

    assert!(server.room.flush(Duration::from_secs(5)).await);
    let reloaded = JsonFileStore::new(&server.states_path).load().await.unwrap();
    assert_eq!(Value::Object(reloaded["checkpoint"].clone()), snapshot);

    // A newcomer sees the catalog in its welcome.
    let mut c = connect(&server).await;
    let welcome = expect_event(&mut c, "welcome").await;
    assert_eq!(welcome["savedStates"]["checkpoint"], snapshot);
}

#[tokio::test]
async fn test_malformed_and_unknown_events_are_tolerated() {
    let server = start_server().await;
    let mut a = connect(&server).await;
    expect_event(&mut a, "welcome").await;

    a.send(Message::Text("not json".to_string().into())).await.unwrap();
    send(&mut a, "wave", json!({ "hello": true })).await;
    send(&mut a, "add-saved-state", json!({ "state": {} })).await;
    expect_silence(&mut a, Duration::from_millis(200)).await;

    // Absent fields are an empty delta, which still echoes the document.
    send(&mut a, "submit-delta", json!({ "delta": "nope", "deleteKeys": 5 })).await;
    assert_eq!(expect_event(&mut a, "state-changed").await["state"], json!({}));

    send(&mut a, "submit-delta", json!({ "delta": { "still": "alive" } })).await;
    assert_eq!(expect_event(&mut a, "state-changed").await["state"], json!({ "still": "alive" }));
}

#[tokio::test]
async fn test_disconnect_updates_presence() {
    let server = start_server().await;
    let mut a = connect(&server).await;
    let welcome_a = expect_event(&mut a, "welcome").await;
    let mut b = connect(&server).await;
    expect_event(&mut b, "welcome").await;
    expect_event(&mut a, "participants-changed").await;

    b.close(None).await.unwrap();
    let left = expect_event(&mut a, "participants-changed").await;
    let users = left["users"].as_array().unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0]["id"], welcome_a["id"]);

    send(&mut a, "submit-delta", json!({ "delta": { "solo": true } })).await;
    expect_event(&mut a, "state-changed").await;
    assert_eq!(server.room.participants().await.len(), 1);
}

#[tokio::test]
async fn test_volume_feed_goes_to_owner() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(JsonFileStore::new(dir.path().join("states.json")));
    let options = RoomOptions {
        signal_interval: Duration::from_millis(50),
        writer: WriterOptions::default(),
    };
    let room = Room::new(SavedStates::new(), store, options);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let state = AppState::new(room, Config::default());
    tokio::spawn(async move {
        let _ = serve(listener, state, std::future::pending()).await;
    });

    let (mut ws, _) = connect_async(format!("ws://127.0.0.1:{port}/ws")).await.unwrap();
    let welcome: Value = match ws.next().await.unwrap().unwrap() {
        Message::Text(text) => serde_json::from_str(text.as_str()).unwrap(),
        other => panic!("unexpected frame {other:?}"),
    };
    assert_eq!(welcome["event"], "welcome");
    let id = welcome["payload"]["id"].to_string();

    let volume: Value = match ws.next().await.unwrap().unwrap() {
        Message::Text(text) => serde_json::from_str(text.as_str()).unwrap(),
        other => panic!("unexpected frame {other:?}"),
    };
    assert_eq!(volume["event"], "volume-changed");
    let level = volume["payload"]["volumes"][id.as_str()].as_u64().unwrap();
    assert!(level < 6);
}

#[tokio::test]
async fn test_health_endpoint() {
    let server = start_server().await;
    let resp = reqwest::get(format!("http://127.0.0.1:{}/api/health", server.port))
        .await
        .expect("Health request failed");
    assert!(resp.status().is_success());
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "ok");
}
