//! End-to-end tests over a real listener and WebSocket clients.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message;
use vigil_capabilities::{MemoryBlacklist, SabotageDispatcher};
use vigil_core::{ActionCommand, ActionKind};
use vigil_server::{Capabilities, ServerConfig, VigilServer};

type WsClient = tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

#[derive(Default)]
struct RecordingSabotage {
    commands: Mutex<Vec<ActionCommand>>,
}

#[async_trait]
impl SabotageDispatcher for RecordingSabotage {
    async fn dispatch(&self, command: &ActionCommand) -> vigil_capabilities::Result<()> {
        self.commands.lock().push(command.clone());
        Ok(())
    }
}

struct Harness {
    server: VigilServer,
    addr: std::net::SocketAddr,
    sabotage: Arc<RecordingSabotage>,
    task: tokio::task::JoinHandle<()>,
}

async fn start() -> Harness {
    let sabotage = Arc::new(RecordingSabotage::default());
    let capabilities = Capabilities {
        blacklist: Arc::new(MemoryBlacklist::with_entries(["steam"], ["youtube.com"])),
        sabotage: sabotage.clone(),
        ..Capabilities::unconfigured()
    };
    let server = VigilServer::new(ServerConfig::default(), capabilities);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let (addr, task) = server.spawn(listener).unwrap();
    Harness {
        server,
        addr,
        sabotage,
        task,
    }
}

async fn connect(addr: std::net::SocketAddr) -> WsClient {
    let (ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}/ws"))
        .await
        .unwrap();
    ws
}

async fn send_json(ws: &mut WsClient, value: serde_json::Value) {
    ws.send(Message::Text(value.to_string().into())).await.unwrap();
}

async fn next_command(ws: &mut WsClient) -> serde_json::Value {
    let deadline = Duration::from_secs(5);
    loop {
        let msg = tokio::time::timeout(deadline, ws.next())
            .await
            .expect("timed out waiting for command")
            .unwrap()
            .unwrap();
        if let Message::Text(text) = msg {
            return serde_json::from_str(text.as_str()).unwrap();
        }
    }
}

async fn wait_until<F, Fut>(mut check: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    for _ in 0..200 {
        if check().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not met in time");
}

fn closed_eyes(client_id: &str) -> serde_json::Value {
    serde_json::json!({
        "clientId": client_id,
        "isEyesClosed": true,
        "concentrationScore": 0.6,
    })
}

#[tokio::test]
async fn sleeping_client_is_woken_once() {
    let h = start().await;
    let mut ws = connect(h.addr).await;

    for _ in 0..4 {
        send_json(&mut ws, closed_eyes("sleepy")).await;
    }

    let voice = next_command(&mut ws).await;
    assert_eq!(voice, serde_json::json!({"type": "PLAY_SOUND", "payload": "Wake up! Back to work."}));
    let shake = next_command(&mut ws).await;
    assert_eq!(shake, serde_json::json!({"type": "SHAKE_MOUSE", "payload": "Wake Up"}));

    // the fourth heartbeat falls inside the cooldown
    let extra = tokio::time::timeout(Duration::from_millis(300), ws.next()).await;
    assert!(extra.is_err(), "unexpected frame: {extra:?}");
}

#[tokio::test]
async fn garbage_frames_do_not_end_the_session() {
    let h = start().await;
    let mut ws = connect(h.addr).await;

    ws.send(Message::Text("definitely not json".into())).await.unwrap();
    send_json(&mut ws, serde_json::json!({"clientId": "c1", "concentrationScore": 0.9})).await;
    ws.send(Message::Text("{\"clientId\":".into())).await.unwrap();

    let registry = h.server.registry().clone();
    wait_until(|| {
        let registry = registry.clone();
        async move { registry.contains("c1").await }
    })
    .await;

    for _ in 0..3 {
        send_json(&mut ws, closed_eyes("c1")).await;
    }
    assert_eq!(next_command(&mut ws).await["type"], "PLAY_SOUND");
}

#[tokio::test]
async fn blacklisted_window_triggers_sabotage() {
    let h = start().await;
    let mut ws = connect(h.addr).await;

    send_json(
        &mut ws,
        serde_json::json!({
            "clientId": "gamer",
            "keystrokeCount": 5,
            "activeWindowTitle": "Steam - Store",
            "concentrationScore": 0.7,
        }),
    )
    .await;

    let sabotage = h.sabotage.clone();
    wait_until(|| {
        let sabotage = sabotage.clone();
        async move { !sabotage.commands.lock().is_empty() }
    })
    .await;

    let commands = h.sabotage.commands.lock();
    assert_eq!(commands[0].client_id, "gamer");
    assert_eq!(commands[0].action_type, ActionKind::CloseApp);
    assert_eq!(commands[0].intensity, 5);
}

#[tokio::test]
async fn solution_is_pushed_to_connected_client() {
    let h = start().await;
    let mut ws = connect(h.addr).await;
    send_json(&mut ws, serde_json::json!({"clientId": "dev-1"})).await;

    let registry = h.server.registry().clone();
    wait_until(|| {
        let registry = registry.clone();
        async move { registry.contains("dev-1").await }
    })
    .await;

    let resp = reqwest::Client::new()
        .post(format!("http://{}/api/v1/solution", h.addr))
        .json(&serde_json::json!({"clientId": "dev-1", "markdown": "## Check the null guard"}))
        .send()
        .await
        .unwrap();
    assert!(resp.status().is_success());

    let cmd = next_command(&mut ws).await;
    assert_eq!(cmd["type"], "SHOW_MESSAGE");
    assert_eq!(cmd["payload"], "## Check the null guard");
}

#[tokio::test]
async fn disconnect_unregisters_session() {
    let h = start().await;
    let mut ws = connect(h.addr).await;
    send_json(&mut ws, serde_json::json!({"clientId": "leaver"})).await;

    let registry = h.server.registry().clone();
    wait_until(|| {
        let registry = registry.clone();
        async move { registry.contains("leaver").await }
    })
    .await;

    ws.close(None).await.unwrap();
    drop(ws);
    wait_until(|| {
        let registry = registry.clone();
        async move { registry.is_empty().await }
    })
    .await;
}

#[tokio::test]
async fn reconnect_supersedes_previous_session() {
    let h = start().await;
    let mut first = connect(h.addr).await;
    send_json(&mut first, serde_json::json!({"clientId": "dup"})).await;
    let registry = h.server.registry().clone();
    wait_until(|| {
        let registry = registry.clone();
        async move { registry.contains("dup").await }
    })
    .await;
    let first_conn = registry.get("dup").await.unwrap().connection_id;

    let mut second = connect(h.addr).await;
    send_json(&mut second, serde_json::json!({"clientId": "dup"})).await;
    wait_until(|| {
        let registry = registry.clone();
        async move { registry.get("dup").await.is_some_and(|s| s.connection_id != first_conn) }
    })
    .await;

    // the old connection closing must not evict the new one
    first.close(None).await.unwrap();
    drop(first);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(registry.contains("dup").await);
    assert_eq!(registry.len().await, 1);
}

#[tokio::test]
async fn shutdown_stops_listener() {
    let h = start().await;
    h.server.shutdown().shutdown();
    tokio::time::timeout(Duration::from_secs(5), h.task)
        .await
        .expect("listener did not stop")
        .unwrap();
}
