//! Scripted Socket.IO server for session tests
//!
//! Speaks just enough Engine.IO over a WebSocket to accept a namespace
//! connection, records every frame the client sends and answers events
//! through a script closure.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::http::header::COOKIE;
use axum::http::HeaderMap;
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use serde_json::{json, Value};
use spectra_common::config::ClientConfig;
use spectra_common::packet::{EngineIoVersion, EnginePacket, SocketPacketKind};
use tokio::task::JoinHandle;
use url::Url;

/// Server answer to one client event
#[derive(Debug, Default)]
pub struct Reply {
    /// Events emitted back, in order
    pub events: Vec<(String, Value)>,
    /// Close the Engine.IO session after emitting
    pub close: bool,
}

impl Reply {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn emit(mut self, event: &str, payload: Value) -> Self {
        self.events.push((event.to_string(), payload));
        self
    }

    pub fn then_close(mut self) -> Self {
        self.close = true;
        self
    }
}

type Script = dyn Fn(&str, &Value) -> Reply + Send + Sync;

struct MockState {
    script: Box<Script>,
    ping_interval: u64,
    server_pings: bool,
    refuse: Option<String>,
    on_connect: Vec<(String, Value)>,
    received: Mutex<Vec<String>>,
    cookies: Mutex<Vec<String>>,
}

/// Running mock server
pub struct MockServer {
    pub addr: SocketAddr,
    state: Arc<MockState>,
    task: JoinHandle<()>,
}

/// Builder for `MockServer`
pub struct MockServerBuilder {
    script: Box<Script>,
    ping_interval: u64,
    server_pings: bool,
    refuse: Option<String>,
    on_connect: Vec<(String, Value)>,
}

impl MockServerBuilder {
    /// Handshake `pingInterval` in milliseconds
    pub fn ping_interval(mut self, millis: u64) -> Self {
        self.ping_interval = millis;
        self
    }

    /// Send an Engine.IO ping right after the namespace is joined
    pub fn server_pings(mut self) -> Self {
        self.server_pings = true;
        self
    }

    /// Emit an event from the connect handler, ahead of the namespace ack
    pub fn emit_on_connect(mut self, event: &str, payload: Value) -> Self {
        self.on_connect.push((event.to_string(), payload));
        self
    }

    /// Answer namespace connections with CONNECT_ERROR
    pub fn refuse(mut self, message: &str) -> Self {
        self.refuse = Some(message.to_string());
        self
    }

    pub async fn start(self) -> MockServer {
        let state = Arc::new(MockState {
            script: self.script,
            ping_interval: self.ping_interval,
            server_pings: self.server_pings,
            refuse: self.refuse,
            on_connect: self.on_connect,
            received: Mutex::new(Vec::new()),
            cookies: Mutex::new(Vec::new()),
        });

        let app = Router::new()
            .route("/socket.io/", get(upgrade))
            .route("/spectra-analyzer/socket.io/", get(upgrade))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind mock server");
        let addr = listener.local_addr().expect("No local address");
        let task = tokio::spawn(async move {
            axum::serve(listener, app).await.expect("Mock server failed");
        });

        MockServer { addr, state, task }
    }
}

impl MockServer {
    pub fn builder<F>(script: F) -> MockServerBuilder
    where
        F: Fn(&str, &Value) -> Reply + Send + Sync + 'static,
    {
        MockServerBuilder {
            script: Box::new(script),
            ping_interval: 25_000,
            server_pings: false,
            refuse: None,
            on_connect: Vec::new(),
        }
    }

    /// Client configuration pointing at this server
    pub fn config(&self, engine_io: EngineIoVersion) -> ClientConfig {
        let dir = std::env::temp_dir();
        ClientConfig {
            server_url: Url::parse(&format!("http://{}", self.addr)).expect("Bad mock URL"),
            analyzer_socket_path: "/socket.io".to_string(),
            downloader_socket_path: "/spectra-analyzer/socket.io".to_string(),
            engine_io,
            images_dir: dir.join("spectra-ui-test-images"),
            state_file: dir.join("spectra-ui-test-cookies.toml"),
            log_level: "debug".to_string(),
        }
    }

    /// Every text frame received from clients
    pub fn received(&self) -> Vec<String> {
        self.state.received.lock().unwrap().clone()
    }

    /// `Cookie` headers of the upgrade requests
    pub fn cookies(&self) -> Vec<String> {
        self.state.cookies.lock().unwrap().clone()
    }

    /// Wait until a frame satisfying `predicate` arrives
    pub async fn wait_for<P>(&self, predicate: P, timeout: Duration) -> bool
    where
        P: Fn(&str) -> bool,
    {
        let deadline = tokio::time::Instant::now() + timeout;
        while tokio::time::Instant::now() < deadline {
            if self.received().iter().any(|frame| predicate(frame)) {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        false
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn upgrade(
    ws: WebSocketUpgrade,
    headers: HeaderMap,
    State(state): State<Arc<MockState>>,
) -> Response {
    if let Some(cookie) = headers.get(COOKIE).and_then(|value| value.to_str().ok()) {
        state.cookies.lock().unwrap().push(cookie.to_string());
    }
    ws.on_upgrade(move |socket| serve_socket(socket, state))
}

fn event_frame(namespace: &str, event: &str, payload: &Value) -> String {
    format!("42{},{}", namespace, json!([event, payload]))
}

async fn serve_socket(mut socket: WebSocket, state: Arc<MockState>) {
    let open = json!({
        "sid": "mock-sid",
        "upgrades": [],
        "pingInterval": state.ping_interval,
        "pingTimeout": 20000
    });
    if socket.send(Message::Text(format!("0{}", open))).await.is_err() {
        return;
    }

    while let Some(Ok(message)) = socket.recv().await {
        let Message::Text(text) = message else {
            continue;
        };
        state.received.lock().unwrap().push(text.clone());

        let mut outgoing = Vec::new();
        let mut close = false;
        match EnginePacket::decode(&text) {
            Ok(EnginePacket::Ping(_)) => outgoing.push("3".to_string()),
            Ok(EnginePacket::Message(packet)) => match packet.kind {
                SocketPacketKind::Connect => {
                    let namespace = packet.namespace.clone();
                    match &state.refuse {
                        Some(reason) => outgoing.push(format!(
                            "44{},{}",
                            namespace,
                            json!({ "message": reason })
                        )),
                        None => {
                            for (event, payload) in &state.on_connect {
                                outgoing.push(event_frame(&namespace, event, payload));
                            }
                            outgoing.push(format!(
                                "40{},{}",
                                namespace,
                                json!({"sid": "ns-sid"})
                            ));
                            if state.server_pings {
                                outgoing.push("2".to_string());
                            }
                        }
                    }
                }
                SocketPacketKind::Event => {
                    if let Some((event, payload)) = packet.as_event() {
                        let reply = (state.script)(event, &payload);
                        for (name, payload) in &reply.events {
                            outgoing.push(event_frame(&packet.namespace, name, payload));
                        }
                        close = reply.close;
                    }
                }
                _ => {}
            },
            _ => {}
        }

        for frame in outgoing {
            if socket.send(Message::Text(frame)).await.is_err() {
                return;
            }
        }
        if close {
            let _ = socket.send(Message::Text("1".to_string())).await;
            let _ = socket.send(Message::Close(None)).await;
            return;
        }
    }
}
