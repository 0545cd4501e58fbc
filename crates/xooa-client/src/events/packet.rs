//! Text framing of Engine.IO and Socket.IO packets.
//!
//! Engine.IO prefixes every frame with a single digit packet type; message
//! frames carry a Socket.IO packet which adds its own type digit, an
//! optional namespace, an optional acknowledgement id and a JSON payload,
//! e.g. `42["event",{"eventName":"transfer"}]`. Binary attachments are not
//! supported.

use {
    serde::{Deserialize, Serialize},
    serde_json::Value,
    std::{
        fmt::{self, Display, Formatter},
        str::FromStr,
    },
    thiserror::Error,
};

pub const DEFAULT_NAMESPACE: &str = "/";

/// Engine.IO protocol revision spoken with the gateway.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum ProtocolVersion {
    /// Clients drive the heartbeat and the server connects the default
    /// namespace on its own.
    #[default]
    V3,
    /// The server drives the heartbeat and clients connect namespaces
    /// explicitly.
    V4,
}

impl TryFrom<u8> for ProtocolVersion {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            3 => Ok(Self::V3),
            4 => Ok(Self::V4),
            _ => Err(format!("unsupported Engine.IO protocol version {value}")),
        }
    }
}

impl From<ProtocolVersion> for u8 {
    fn from(version: ProtocolVersion) -> Self {
        match version {
            ProtocolVersion::V3 => 3,
            ProtocolVersion::V4 => 4,
        }
    }
}

impl Display for ProtocolVersion {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", u8::from(*self))
    }
}

impl FromStr for ProtocolVersion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s
            .parse::<u8>()
            .map_err(|_| format!("invalid Engine.IO protocol version {s:?}"))?;
        Self::try_from(value)
    }
}

/// Session parameters sent by the server with the `open` packet.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Handshake {
    pub sid: String,
    #[serde(default)]
    pub upgrades: Vec<String>,
    /// Milliseconds.
    pub ping_interval: u64,
    /// Milliseconds.
    pub ping_timeout: u64,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Packet {
    Open(Handshake),
    Close,
    Ping(String),
    Pong(String),
    Message(SocketPacket),
    Upgrade,
    Noop,
}

#[derive(Clone, Debug, PartialEq)]
pub enum SocketPacket {
    Connect {
        namespace: String,
        data: Option<Value>,
    },
    Disconnect {
        namespace: String,
    },
    Event {
        namespace: String,
        id: Option<u64>,
        name: String,
        data: Vec<Value>,
    },
    Ack {
        namespace: String,
        id: u64,
        data: Vec<Value>,
    },
    Error {
        namespace: String,
        data: Option<Value>,
    },
}

impl SocketPacket {
    /// An event on the default namespace that expects no acknowledgement.
    pub fn event(name: impl Into<String>, data: Vec<Value>) -> Self {
        Self::Event {
            namespace: DEFAULT_NAMESPACE.to_string(),
            id: None,
            name: name.into(),
            data,
        }
    }
}

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("empty packet")]
    Empty,

    #[error("unknown packet type {0:?}")]
    UnknownType(char),

    #[error("binary packets are not supported")]
    Binary,

    #[error("event packet without a name")]
    MissingEventName,

    #[error("acknowledgement without an id")]
    MissingAckId,

    #[error("invalid packet id")]
    InvalidId(#[source] std::num::ParseIntError),

    #[error("invalid packet payload")]
    Json(#[from] serde_json::Error),
}

impl FromStr for Packet {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        let kind = chars.next().ok_or(DecodeError::Empty)?;
        let rest = chars.as_str();
        Ok(match kind {
            '0' => Self::Open(serde_json::from_str(rest)?),
            '1' => Self::Close,
            '2' => Self::Ping(rest.to_string()),
            '3' => Self::Pong(rest.to_string()),
            '4' => Self::Message(rest.parse()?),
            '5' => Self::Upgrade,
            '6' => Self::Noop,
            other => return Err(DecodeError::UnknownType(other)),
        })
    }
}

impl FromStr for SocketPacket {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        let kind = chars.next().ok_or(DecodeError::Empty)?;
        if matches!(kind, '5' | '6') {
            return Err(DecodeError::Binary);
        }
        let mut rest = chars.as_str();

        let namespace = if rest.starts_with('/') {
            let (namespace, remainder) = rest.split_once(',').unwrap_or((rest, ""));
            rest = remainder;
            namespace.to_string()
        } else {
            DEFAULT_NAMESPACE.to_string()
        };

        let digits = rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(rest.len());
        let id = match digits {
            0 => None,
            _ => Some(rest[..digits].parse().map_err(DecodeError::InvalidId)?),
        };
        rest = &rest[digits..];

        let data = match rest {
            "" => None,
            _ => Some(serde_json::from_str::<Value>(rest)?),
        };

        Ok(match kind {
            '0' => Self::Connect { namespace, data },
            '1' => Self::Disconnect { namespace },
            '2' => {
                let mut items = array(data).into_iter();
                let name = match items.next() {
                    Some(Value::String(name)) => name,
                    _ => return Err(DecodeError::MissingEventName),
                };
                Self::Event {
                    namespace,
                    id,
                    name,
                    data: items.collect(),
                }
            }
            '3' => Self::Ack {
                namespace,
                id: id.ok_or(DecodeError::MissingAckId)?,
                data: array(data),
            },
            '4' => Self::Error { namespace, data },
            other => return Err(DecodeError::UnknownType(other)),
        })
    }
}

fn array(data: Option<Value>) -> Vec<Value> {
    match data {
        Some(Value::Array(items)) => items,
        Some(other) => vec![other],
        None => Vec::new(),
    }
}

impl Display for Packet {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open(handshake) => {
                let handshake = serde_json::to_string(handshake).map_err(|_| fmt::Error)?;
                write!(f, "0{handshake}")
            }
            Self::Close => f.write_str("1"),
            Self::Ping(data) => write!(f, "2{data}"),
            Self::Pong(data) => write!(f, "3{data}"),
            Self::Message(packet) => write!(f, "4{packet}"),
            Self::Upgrade => f.write_str("5"),
            Self::Noop => f.write_str("6"),
        }
    }
}

impl Display for SocketPacket {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let (kind, namespace) = match self {
            Self::Connect { namespace, .. } => ('0', namespace),
            Self::Disconnect { namespace } => ('1', namespace),
            Self::Event { namespace, .. } => ('2', namespace),
            Self::Ack { namespace, .. } => ('3', namespace),
            Self::Error { namespace, .. } => ('4', namespace),
        };
        write!(f, "{kind}")?;
        if namespace != DEFAULT_NAMESPACE {
            write!(f, "{namespace},")?;
        }

        match self {
            Self::Connect { data, .. } | Self::Error { data, .. } => match data {
                Some(data) => write!(f, "{data}"),
                None => Ok(()),
            },
            Self::Disconnect { .. } => Ok(()),
            Self::Event { id, name, data, .. } => {
                if let Some(id) = id {
                    write!(f, "{id}")?;
                }
                let items = std::iter::once(Value::String(name.clone()))
                    .chain(data.iter().cloned())
                    .collect::<Vec<_>>();
                write!(f, "{}", Value::Array(items))
            }
            Self::Ack { id, data, .. } => write!(f, "{id}{}", Value::Array(data.clone())),
        }
    }
}
