//! Socket.IO channel over a WebSocket
//!
//! `Channel::connect` performs the Engine.IO handshake and joins one
//! namespace. After that a reader task turns frames into `ChannelEvent`s and
//! a writer task serialises outbound packets, so the session loop only ever
//! sees typed events and never blocks on the socket.

use std::time::Duration;

use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use spectra_common::config::ClientConfig;
use spectra_common::packet::{EnginePacket, Handshake, SocketPacket, SocketPacketKind};
use spectra_common::protocol::Request;
use spectra_common::{Error, Result};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::COOKIE;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, trace, warn};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsWriter = SplitSink<WsStream, Message>;
type WsReader = SplitStream<WsStream>;

/// Something that happened on the channel
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    /// Server emitted an event in our namespace
    Message { event: String, payload: Value },
    /// Channel is closed; always the last event
    Disconnected(String),
}

/// Connected Socket.IO namespace
pub struct Channel {
    namespace: String,
    handshake: Handshake,
    outbound: mpsc::UnboundedSender<String>,
    inbound: mpsc::UnboundedReceiver<ChannelEvent>,
    tasks: Vec<JoinHandle<()>>,
}

impl Channel {
    /// Open the socket, complete the handshake and join `namespace`
    ///
    /// `cookie_header` is sent with the WebSocket upgrade request.
    pub async fn connect(
        config: &ClientConfig,
        namespace: &str,
        cookie_header: Option<&str>,
    ) -> Result<Self> {
        let url = config.websocket_url(namespace)?;
        let mut request = url
            .as_str()
            .into_client_request()
            .map_err(|e| Error::Transport(format!("bad request for {}: {}", url, e)))?;
        if let Some(cookie) = cookie_header {
            let value = HeaderValue::from_str(cookie)
                .map_err(|e| Error::Transport(format!("bad cookie header: {}", e)))?;
            request.headers_mut().insert(COOKIE, value);
        }

        info!("Connecting to {} (namespace {})", url, namespace);
        let (ws, _response) = connect_async(request)
            .await
            .map_err(|e| Error::Transport(format!("cannot connect to {}: {}", url, e)))?;
        let (mut write, mut read) = ws.split();

        let handshake = wait_for_open(&mut read).await?;
        debug!(
            "Engine.IO session {} (ping every {} ms)",
            handshake.sid, handshake.ping_interval
        );

        send_packet(
            &mut write,
            &EnginePacket::Message(SocketPacket::connect(namespace)),
        )
        .await?;
        let early = join_namespace(&mut read, &mut write, namespace).await?;
        info!("Joined namespace {}", namespace);

        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let (in_tx, in_rx) = mpsc::unbounded_channel();
        for event in early {
            let _ = in_tx.send(event);
        }

        let mut tasks = vec![
            tokio::spawn(write_loop(write, out_rx)),
            tokio::spawn(read_loop(read, in_tx, out_tx.clone(), namespace.to_string())),
        ];
        if config.engine_io.client_pings() {
            tasks.push(tokio::spawn(heartbeat(
                out_tx.clone(),
                Duration::from_millis(handshake.ping_interval.max(1)),
            )));
        }

        Ok(Self {
            namespace: namespace.to_string(),
            handshake,
            outbound: out_tx,
            inbound: in_rx,
            tasks,
        })
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn handshake(&self) -> &Handshake {
        &self.handshake
    }

    /// Queue a request for transmission
    pub fn send<R: Request>(&self, request: &R) -> Result<()> {
        let packet = SocketPacket::event(&self.namespace, request.event_name(), request.to_args()?);
        let text = EnginePacket::Message(packet).encode()?;
        trace!("-> {}", text);
        self.outbound
            .send(text)
            .map_err(|_| Error::Disconnected(self.namespace.clone()))
    }

    /// Next inbound event; yields `Disconnected` forever once the socket is gone
    pub async fn next_event(&mut self) -> ChannelEvent {
        self.inbound
            .recv()
            .await
            .unwrap_or_else(|| ChannelEvent::Disconnected("channel closed".to_string()))
    }
}

impl Drop for Channel {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

async fn send_packet(write: &mut WsWriter, packet: &EnginePacket) -> Result<()> {
    let text = packet.encode()?;
    trace!("-> {}", text);
    write
        .send(Message::Text(text))
        .await
        .map_err(|e| Error::Transport(e.to_string()))
}

/// Next text frame, `None` once the socket is closed
async fn next_text(read: &mut WsReader) -> Result<Option<String>> {
    while let Some(frame) = read.next().await {
        match frame.map_err(|e| Error::Transport(e.to_string()))? {
            Message::Text(text) => return Ok(Some(text)),
            Message::Close(_) => return Ok(None),
            _ => continue,
        }
    }
    Ok(None)
}

async fn wait_for_open(read: &mut WsReader) -> Result<Handshake> {
    loop {
        let text = next_text(read)
            .await?
            .ok_or_else(|| Error::Transport("closed before handshake".to_string()))?;
        match EnginePacket::decode(&text)? {
            EnginePacket::Open(handshake) => return Ok(handshake),
            other => debug!("Ignoring {:?} before handshake", other),
        }
    }
}

/// Wait for the namespace ack
///
/// Events the server emits from its connect handler arrive before the ack;
/// they are returned so they can be delivered first.
async fn join_namespace(
    read: &mut WsReader,
    write: &mut WsWriter,
    namespace: &str,
) -> Result<Vec<ChannelEvent>> {
    let mut early = Vec::new();
    loop {
        let text = next_text(read)
            .await?
            .ok_or_else(|| Error::Transport(format!("closed before joining {}", namespace)))?;
        match EnginePacket::decode(&text)? {
            EnginePacket::Ping(data) => send_packet(write, &EnginePacket::Pong(data)).await?,
            EnginePacket::Message(packet) if packet.namespace == namespace => match packet.kind {
                SocketPacketKind::Connect => return Ok(early),
                SocketPacketKind::Event => match packet.as_event() {
                    Some((event, payload)) => {
                        debug!("Buffering {} received while joining {}", event, namespace);
                        early.push(ChannelEvent::Message {
                            event: event.to_string(),
                            payload,
                        });
                    }
                    None => warn!("Malformed event packet: {}", text),
                },
                SocketPacketKind::ConnectError => {
                    return Err(Error::Transport(format!(
                        "server refused {}: {}",
                        namespace,
                        packet.error_message()
                    )))
                }
                _ => debug!("Ignoring {:?} while joining {}", packet.kind, namespace),
            },
            EnginePacket::Close => {
                return Err(Error::Transport(format!(
                    "server closed the session while joining {}",
                    namespace
                )))
            }
            other => debug!("Ignoring {:?} while joining {}", other, namespace),
        }
    }
}

async fn write_loop(mut write: WsWriter, mut outbound: mpsc::UnboundedReceiver<String>) {
    while let Some(text) = outbound.recv().await {
        if let Err(e) = write.send(Message::Text(text)).await {
            warn!("Socket write failed: {}", e);
            break;
        }
    }
    let _ = write.close().await;
}

async fn read_loop(
    mut read: WsReader,
    inbound: mpsc::UnboundedSender<ChannelEvent>,
    outbound: mpsc::UnboundedSender<String>,
    namespace: String,
) {
    let reason = loop {
        let frame = match read.next().await {
            Some(Ok(frame)) => frame,
            Some(Err(e)) => break format!("socket error: {}", e),
            None => break "socket closed".to_string(),
        };
        let text = match frame {
            Message::Text(text) => text,
            Message::Close(_) => break "socket closed by server".to_string(),
            _ => continue,
        };
        trace!("<- {}", text);

        match EnginePacket::decode(&text) {
            Ok(EnginePacket::Ping(data)) => {
                if let Ok(pong) = EnginePacket::Pong(data).encode() {
                    let _ = outbound.send(pong);
                }
            }
            Ok(EnginePacket::Close) => break "server closed the session".to_string(),
            Ok(EnginePacket::Message(packet)) if packet.namespace == namespace => {
                match packet.kind {
                    SocketPacketKind::Event => match packet.as_event() {
                        Some((event, payload)) => {
                            let message = ChannelEvent::Message {
                                event: event.to_string(),
                                payload,
                            };
                            if inbound.send(message).is_err() {
                                return;
                            }
                        }
                        None => warn!("Malformed event packet: {}", text),
                    },
                    SocketPacketKind::Disconnect => {
                        break format!("server left namespace {}", namespace)
                    }
                    other => debug!("Ignoring {:?} packet", other),
                }
            }
            Ok(EnginePacket::Message(packet)) => {
                debug!("Ignoring packet for namespace {}", packet.namespace)
            }
            Ok(_) => {}
            Err(e) => warn!("Dropping malformed frame: {}", e),
        }
    };

    info!("Channel {} disconnected: {}", namespace, reason);
    let _ = inbound.send(ChannelEvent::Disconnected(reason));
}

/// Revision 3 heartbeat: the client pings, the server answers
async fn heartbeat(outbound: mpsc::UnboundedSender<String>, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    ticker.tick().await;
    loop {
        ticker.tick().await;
        if outbound.send("2".to_string()).is_err() {
            break;
        }
    }
}
