//! Engine.IO / Socket.IO text packet codec
//!
//! The socket channel runs Socket.IO on top of Engine.IO over a WebSocket.
//! Every WebSocket text frame holds exactly one Engine.IO packet; `message`
//! packets wrap one Socket.IO packet:
//!
//! ```text
//! 4 2 /analyzer, ["change_path","/tmp"]
//! │ │ │          └─ JSON payload
//! │ │ └─ namespace (omitted for "/")
//! │ └─ Socket.IO packet type (EVENT)
//! └─ Engine.IO packet type (message)
//! ```
//!
//! Binary attachments are not used by either channel and are rejected.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Error, Result};

/// Default namespace
pub const ROOT_NAMESPACE: &str = "/";

/// Engine.IO protocol revision negotiated through the `EIO` query parameter
///
/// Revision 3 clients send pings; in revision 4 the server pings and the
/// client answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum EngineIoVersion {
    V3,
    V4,
}

impl EngineIoVersion {
    pub fn as_u8(self) -> u8 {
        match self {
            EngineIoVersion::V3 => 3,
            EngineIoVersion::V4 => 4,
        }
    }

    /// True when the client is responsible for the heartbeat
    pub fn client_pings(self) -> bool {
        self == EngineIoVersion::V3
    }
}

impl Default for EngineIoVersion {
    fn default() -> Self {
        EngineIoVersion::V4
    }
}

impl TryFrom<u8> for EngineIoVersion {
    type Error = String;

    fn try_from(value: u8) -> std::result::Result<Self, Self::Error> {
        match value {
            3 => Ok(EngineIoVersion::V3),
            4 => Ok(EngineIoVersion::V4),
            other => Err(format!("unsupported Engine.IO revision {}", other)),
        }
    }
}

impl From<EngineIoVersion> for u8 {
    fn from(version: EngineIoVersion) -> u8 {
        version.as_u8()
    }
}

/// Payload of the Engine.IO `open` packet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Handshake {
    pub sid: String,
    #[serde(default)]
    pub upgrades: Vec<String>,
    /// Milliseconds between heartbeats
    #[serde(rename = "pingInterval")]
    pub ping_interval: u64,
    /// Milliseconds before a missing heartbeat closes the connection
    #[serde(rename = "pingTimeout")]
    pub ping_timeout: u64,
}

/// Socket.IO packet type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketPacketKind {
    Connect,
    Disconnect,
    Event,
    Ack,
    ConnectError,
}

impl SocketPacketKind {
    fn code(self) -> char {
        match self {
            SocketPacketKind::Connect => '0',
            SocketPacketKind::Disconnect => '1',
            SocketPacketKind::Event => '2',
            SocketPacketKind::Ack => '3',
            SocketPacketKind::ConnectError => '4',
        }
    }

    fn from_code(code: char) -> Result<Self> {
        match code {
            '0' => Ok(SocketPacketKind::Connect),
            '1' => Ok(SocketPacketKind::Disconnect),
            '2' => Ok(SocketPacketKind::Event),
            '3' => Ok(SocketPacketKind::Ack),
            '4' => Ok(SocketPacketKind::ConnectError),
            '5' | '6' => Err(Error::Protocol(
                "binary packets are not supported".to_string(),
            )),
            other => Err(Error::Protocol(format!(
                "unknown socket packet type '{}'",
                other
            ))),
        }
    }
}

/// One Socket.IO packet
#[derive(Debug, Clone, PartialEq)]
pub struct SocketPacket {
    pub kind: SocketPacketKind,
    pub namespace: String,
    pub ack_id: Option<u64>,
    pub data: Option<Value>,
}

impl SocketPacket {
    /// Namespace connection request
    pub fn connect(namespace: &str) -> Self {
        Self {
            kind: SocketPacketKind::Connect,
            namespace: namespace.to_string(),
            ack_id: None,
            data: None,
        }
    }

    /// Event emission: `[name, args...]`
    pub fn event(namespace: &str, name: &str, args: Vec<Value>) -> Self {
        let mut array = Vec::with_capacity(args.len() + 1);
        array.push(Value::String(name.to_string()));
        array.extend(args);
        Self {
            kind: SocketPacketKind::Event,
            namespace: namespace.to_string(),
            ack_id: None,
            data: Some(Value::Array(array)),
        }
    }

    /// Split an `EVENT` packet into its name and first argument
    ///
    /// Returns `None` for any other packet type or a malformed payload.
    /// Events without arguments yield `Value::Null`.
    pub fn as_event(&self) -> Option<(&str, Value)> {
        if self.kind != SocketPacketKind::Event {
            return None;
        }
        let array = self.data.as_ref()?.as_array()?;
        let name = array.first()?.as_str()?;
        let payload = array.get(1).cloned().unwrap_or(Value::Null);
        Some((name, payload))
    }

    /// Human readable error carried by a `CONNECT_ERROR` packet
    pub fn error_message(&self) -> String {
        match &self.data {
            Some(Value::String(message)) => message.clone(),
            Some(Value::Object(map)) => map
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| Value::Object(map.clone()).to_string()),
            Some(other) => other.to_string(),
            None => "connection refused".to_string(),
        }
    }

    pub fn encode(&self) -> String {
        let mut out = String::new();
        out.push(self.kind.code());
        if self.namespace != ROOT_NAMESPACE && !self.namespace.is_empty() {
            out.push_str(&self.namespace);
            out.push(',');
        }
        if let Some(id) = self.ack_id {
            out.push_str(&id.to_string());
        }
        if let Some(data) = &self.data {
            out.push_str(&data.to_string());
        }
        out
    }

    pub fn decode(text: &str) -> Result<Self> {
        let mut chars = text.chars();
        let code = chars
            .next()
            .ok_or_else(|| Error::Protocol("empty socket packet".to_string()))?;
        let kind = SocketPacketKind::from_code(code)?;
        let mut rest = chars.as_str();

        let namespace = if rest.starts_with('/') {
            match rest.find(',') {
                Some(end) => {
                    let namespace = &rest[..end];
                    rest = &rest[end + 1..];
                    namespace.to_string()
                }
                None => {
                    let namespace = rest.to_string();
                    rest = "";
                    namespace
                }
            }
        } else {
            ROOT_NAMESPACE.to_string()
        };

        let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
        let ack_id = if digits > 0 {
            let id = rest[..digits]
                .parse::<u64>()
                .map_err(|e| Error::Protocol(format!("bad ack id in '{}': {}", text, e)))?;
            rest = &rest[digits..];
            Some(id)
        } else {
            None
        };

        let data = if rest.is_empty() {
            None
        } else {
            Some(serde_json::from_str(rest).map_err(|e| {
                Error::Protocol(format!("bad payload in '{}': {}", truncate(text), e))
            })?)
        };

        Ok(Self {
            kind,
            namespace,
            ack_id,
            data,
        })
    }
}

/// One Engine.IO packet (one WebSocket text frame)
#[derive(Debug, Clone, PartialEq)]
pub enum EnginePacket {
    Open(Handshake),
    Close,
    Ping(Option<String>),
    Pong(Option<String>),
    Message(SocketPacket),
    Upgrade,
    Noop,
}

impl EnginePacket {
    pub fn encode(&self) -> Result<String> {
        Ok(match self {
            EnginePacket::Open(handshake) => format!("0{}", serde_json::to_string(handshake)?),
            EnginePacket::Close => "1".to_string(),
            EnginePacket::Ping(data) => format!("2{}", data.as_deref().unwrap_or_default()),
            EnginePacket::Pong(data) => format!("3{}", data.as_deref().unwrap_or_default()),
            EnginePacket::Message(packet) => format!("4{}", packet.encode()),
            EnginePacket::Upgrade => "5".to_string(),
            EnginePacket::Noop => "6".to_string(),
        })
    }

    pub fn decode(text: &str) -> Result<Self> {
        let mut chars = text.chars();
        let code = chars
            .next()
            .ok_or_else(|| Error::Protocol("empty engine packet".to_string()))?;
        let rest = chars.as_str();
        let optional = || (!rest.is_empty()).then(|| rest.to_string());

        match code {
            '0' => {
                let handshake = serde_json::from_str(rest)
                    .map_err(|e| Error::Protocol(format!("bad handshake: {}", e)))?;
                Ok(EnginePacket::Open(handshake))
            }
            '1' => Ok(EnginePacket::Close),
            '2' => Ok(EnginePacket::Ping(optional())),
            '3' => Ok(EnginePacket::Pong(optional())),
            '4' => Ok(EnginePacket::Message(SocketPacket::decode(rest)?)),
            '5' => Ok(EnginePacket::Upgrade),
            '6' => Ok(EnginePacket::Noop),
            other => Err(Error::Protocol(format!(
                "unknown engine packet type '{}'",
                other
            ))),
        }
    }
}

fn truncate(text: &str) -> &str {
    match text.char_indices().nth(80) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
