//! Subscription to smart contract events pushed by the gateway.
//!
//! The gateway publishes events over Socket.IO. A subscription runs in a
//! background task which connects, authenticates with the API token and
//! forwards every matching event through a channel. Lost connections are
//! re-established up to [`Config::retries`] times in a row.

pub mod filter;
pub mod packet;

pub use {filter::EventFilter, packet::ProtocolVersion};
use {
    crate::{dto::value_text, metrics::Metrics},
    futures::{SinkExt, StreamExt},
    packet::{DEFAULT_NAMESPACE, Packet, SocketPacket},
    serde::Deserialize,
    serde_json::{Value, json},
    std::time::Duration,
    thiserror::Error,
    tokio::{
        sync::{mpsc, watch},
        task::JoinHandle,
        time::{Instant, Interval},
    },
    tokio_tungstenite::{
        MaybeTlsStream,
        WebSocketStream,
        tungstenite::{self, Message},
    },
    url::Url,
};

pub const DEFAULT_URL: &str = "wss://api.xooa.com";

/// Silence tolerated before the engine handshake announced its own timeouts.
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(20);

type Socket = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// Connection settings of event subscriptions.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields, default)]
pub struct Config {
    /// Socket.IO server; `http(s)` URLs are mapped to `ws(s)`.
    pub url: Url,
    pub path: String,
    pub version: ProtocolVersion,
    /// Consecutive failed connection attempts tolerated before giving up.
    pub retries: u32,
    #[serde(with = "humantime_serde")]
    pub reconnect_delay: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            url: Url::parse(DEFAULT_URL).unwrap(),
            path: "/subscribe/".to_string(),
            version: ProtocolVersion::default(),
            retries: 10,
            reconnect_delay: Duration::from_secs(1),
        }
    }
}

impl Config {
    /// WebSocket endpoint of the Socket.IO server.
    pub fn socket_url(&self) -> Result<Url, Error> {
        let mut url = self.url.clone();
        let scheme = match url.scheme() {
            "http" | "ws" => "ws",
            "https" | "wss" => "wss",
            other => return Err(Error::Scheme(other.to_string())),
        };
        url.set_scheme(scheme)
            .map_err(|()| Error::Scheme(scheme.to_string()))?;
        let path = format!(
            "{}/{}",
            url.path().trim_end_matches('/'),
            self.path.trim_start_matches('/')
        );
        url.set_path(&path);
        url.query_pairs_mut()
            .clear()
            .append_pair("EIO", &self.version.to_string())
            .append_pair("transport", "websocket");
        Ok(url)
    }
}

/// An event emitted by a smart contract.
#[derive(Clone, Debug, PartialEq)]
pub struct GatewayEvent {
    /// The `eventName` field of the payload, if any.
    pub event_name: Option<String>,
    pub payload: Value,
}

impl From<Value> for GatewayEvent {
    fn from(payload: Value) -> Self {
        Self {
            event_name: payload
                .get("eventName")
                .and_then(Value::as_str)
                .map(str::to_string),
            payload,
        }
    }
}

/// What a subscription reports to its owner.
#[derive(Clone, Debug, PartialEq)]
pub enum SubscriptionEvent {
    /// The socket is open; authentication is in flight.
    Connected,
    Authenticated,
    Event(GatewayEvent),
    /// The socket closed. Unless the subscription ends a reconnect follows.
    Disconnected,
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    #[error("unsupported events url scheme {0:?}")]
    Scheme(String),

    #[error(transparent)]
    Socket(#[from] tungstenite::Error),

    #[error("gateway rejected the connection: {0}")]
    Rejected(String),

    #[error("no traffic from the gateway for {0:?}")]
    Unresponsive(Duration),

    #[error("gateway rejected the api token: {0}")]
    Unauthorized(String),

    #[error("giving up after {retries} reconnection attempts")]
    RetriesExhausted { retries: u32 },

    #[error("subscription task failed")]
    Task(#[from] tokio::task::JoinError),
}

impl Error {
    fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Socket(_) | Self::Rejected(_) | Self::Unresponsive(_)
        )
    }
}

/// Handle to a running subscription.
///
/// Dropping the handle stops the background task as well, but only
/// [`Subscription::unsubscribe`] reports how the task ended.
#[derive(Debug)]
pub struct Subscription {
    events: mpsc::UnboundedReceiver<SubscriptionEvent>,
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<Result<(), Error>>,
}

impl Subscription {
    /// Waits for the next event. Returns `None` once the subscription ended.
    pub async fn next(&mut self) -> Option<SubscriptionEvent> {
        self.events.recv().await
    }

    /// Closes the socket and waits for the background task. Also returns the
    /// error that ended the subscription on its own, e.g.
    /// [`Error::RetriesExhausted`].
    pub async fn unsubscribe(self) -> Result<(), Error> {
        let _ = self.shutdown.send(true);
        self.handle.await?
    }
}

/// Starts a subscription in a background task.
///
/// Must be called from within a tokio runtime.
pub fn subscribe(config: Config, token: &str, filter: EventFilter) -> Result<Subscription, Error> {
    if token.trim().is_empty() {
        return Err(Error::InvalidArgument("api token"));
    }
    let url = config.socket_url()?;
    let (sender, events) = mpsc::unbounded_channel();
    let (shutdown, shutdown_receiver) = watch::channel(false);
    let worker = Worker {
        url,
        config,
        token: token.to_string(),
        filter,
        events: sender,
        shutdown: shutdown_receiver,
        failures: 0,
    };
    Ok(Subscription {
        events,
        shutdown,
        handle: tokio::spawn(worker.run()),
    })
}

struct Worker {
    url: Url,
    config: Config,
    token: String,
    filter: EventFilter,
    events: mpsc::UnboundedSender<SubscriptionEvent>,
    shutdown: watch::Receiver<bool>,
    /// Failed attempts since the last successful authentication.
    failures: u32,
}

#[derive(Debug, PartialEq)]
enum Exit {
    Shutdown,
    Closed,
}

/// Liveness of one engine connection.
#[derive(Debug)]
struct Heartbeat {
    /// Client pings, only sent in protocol v3.
    keepalive: Option<Interval>,
    /// Longest silence after which the connection counts as dead.
    timeout: Duration,
    last_seen: Instant,
}

impl Heartbeat {
    fn new() -> Self {
        Self {
            keepalive: None,
            timeout: HANDSHAKE_TIMEOUT,
            last_seen: Instant::now(),
        }
    }

    fn deadline(&self) -> Instant {
        self.last_seen + self.timeout
    }
}

#[derive(Debug, PartialEq)]
enum Reaction {
    None,
    Send(Packet),
    Exit(Exit),
}

impl Worker {
    async fn run(mut self) -> Result<(), Error> {
        loop {
            if *self.shutdown.borrow() {
                return Ok(());
            }

            tracing::info!(url = %self.url, "connecting to gateway events");
            let connection = tokio::select! {
                connection = tokio_tungstenite::connect_async(self.url.as_str()) => connection,
                _ = self.shutdown.changed() => return Ok(()),
            };
            let result = match connection {
                Ok((socket, _)) => {
                    tracing::info!("connected to gateway events");
                    if !self.emit(SubscriptionEvent::Connected) {
                        return Ok(());
                    }
                    let result = self.session(socket).await;
                    self.emit(SubscriptionEvent::Disconnected);
                    result
                }
                Err(err) => Err(err.into()),
            };

            match result {
                Ok(Exit::Shutdown) => return Ok(()),
                Ok(Exit::Closed) => tracing::info!("gateway closed the event connection"),
                Err(err) if err.is_retryable() => {
                    tracing::warn!(?err, "gateway event connection failed")
                }
                Err(err) => return Err(err),
            }

            self.failures += 1;
            if self.failures > self.config.retries {
                tracing::warn!(retries = self.config.retries, "giving up on gateway events");
                return Err(Error::RetriesExhausted {
                    retries: self.config.retries,
                });
            }
            Metrics::get().on_event("reconnect");
            let delay = self.config.reconnect_delay;
            tracing::info!(attempt = self.failures, ?delay, "reconnecting to gateway events");
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = self.shutdown.changed() => return Ok(()),
            }
        }
    }

    async fn session(&mut self, socket: Socket) -> Result<Exit, Error> {
        let (mut sink, mut stream) = socket.split();
        let mut heartbeat = Heartbeat::new();

        loop {
            let deadline = heartbeat.deadline();
            let frame = tokio::select! {
                frame = stream.next() => frame,
                _ = tick(&mut heartbeat.keepalive) => {
                    sink.send(Message::text(Packet::Ping(String::new()).to_string())).await?;
                    continue;
                }
                _ = tokio::time::sleep_until(deadline) => {
                    tracing::warn!(timeout = ?heartbeat.timeout, "gateway event connection went silent");
                    return Err(Error::Unresponsive(heartbeat.timeout));
                }
                _ = self.shutdown.changed() => {
                    let disconnect = Packet::Message(SocketPacket::Disconnect {
                        namespace: DEFAULT_NAMESPACE.to_string(),
                    });
                    let _ = sink.send(Message::text(disconnect.to_string())).await;
                    let _ = sink.close().await;
                    return Ok(Exit::Shutdown);
                }
            };
            heartbeat.last_seen = Instant::now();

            let text = match frame {
                Some(Ok(Message::Text(text))) => text,
                Some(Ok(Message::Ping(data))) => {
                    sink.send(Message::Pong(data)).await?;
                    continue;
                }
                Some(Ok(Message::Close(_))) | None => return Ok(Exit::Closed),
                Some(Ok(_)) => continue,
                Some(Err(err)) => return Err(err.into()),
            };
            let packet = match text.as_str().parse::<Packet>() {
                Ok(packet) => packet,
                Err(err) => {
                    tracing::warn!(?err, frame = text.as_str(), "ignoring malformed packet");
                    continue;
                }
            };
            tracing::trace!(?packet, "received packet");

            match self.handle(packet, &mut heartbeat)? {
                Reaction::None => {}
                Reaction::Send(packet) => sink.send(Message::text(packet.to_string())).await?,
                Reaction::Exit(exit) => return Ok(exit),
            }
        }
    }

    fn handle(
        &mut self,
        packet: Packet,
        heartbeat: &mut Heartbeat,
    ) -> Result<Reaction, Error> {
        let packet = match packet {
            Packet::Open(handshake) => {
                tracing::debug!(
                    sid = %handshake.sid,
                    ping_interval = handshake.ping_interval,
                    "engine session opened"
                );
                heartbeat.timeout = Duration::from_millis(
                    handshake
                        .ping_interval
                        .saturating_add(handshake.ping_timeout),
                );
                return Ok(match self.config.version {
                    ProtocolVersion::V3 => {
                        let period = Duration::from_millis(handshake.ping_interval.max(1));
                        heartbeat.keepalive =
                            Some(tokio::time::interval_at(Instant::now() + period, period));
                        Reaction::None
                    }
                    ProtocolVersion::V4 => Reaction::Send(Packet::Message(SocketPacket::Connect {
                        namespace: DEFAULT_NAMESPACE.to_string(),
                        data: None,
                    })),
                });
            }
            Packet::Ping(data) => return Ok(Reaction::Send(Packet::Pong(data))),
            Packet::Close => return Ok(Reaction::Exit(Exit::Closed)),
            Packet::Pong(_) | Packet::Upgrade | Packet::Noop => return Ok(Reaction::None),
            Packet::Message(packet) => packet,
        };

        match packet {
            SocketPacket::Connect { .. } => {
                tracing::debug!("authenticating event subscription");
                Ok(Reaction::Send(Packet::Message(SocketPacket::event(
                    "authenticate",
                    vec![json!({ "token": self.token })],
                ))))
            }
            SocketPacket::Event { name, data, .. } => match name.as_str() {
                "authenticated" => {
                    tracing::info!("event subscription authenticated");
                    self.failures = 0;
                    Ok(self.forward(SubscriptionEvent::Authenticated))
                }
                "unauthorized" => Err(Error::Unauthorized(reason(data))),
                "event" => {
                    for payload in data {
                        let event = GatewayEvent::from(payload);
                        if !self.filter.matches(&event) {
                            Metrics::get().on_event("filtered");
                            continue;
                        }
                        Metrics::get().on_event("delivered");
                        if let Reaction::Exit(exit) = self.forward(SubscriptionEvent::Event(event)) {
                            return Ok(Reaction::Exit(exit));
                        }
                    }
                    Ok(Reaction::None)
                }
                other => {
                    tracing::debug!(event = other, "ignoring socket event");
                    Ok(Reaction::None)
                }
            },
            SocketPacket::Disconnect { .. } => Ok(Reaction::Exit(Exit::Closed)),
            SocketPacket::Error { data, .. } => {
                Err(Error::Rejected(data.map(value_text).unwrap_or_default()))
            }
            SocketPacket::Ack { .. } => Ok(Reaction::None),
        }
    }

    /// Hands an event to the subscriber; a dropped receiver ends the task.
    fn forward(&self, event: SubscriptionEvent) -> Reaction {
        match self.emit(event) {
            true => Reaction::None,
            false => Reaction::Exit(Exit::Shutdown),
        }
    }

    fn emit(&self, event: SubscriptionEvent) -> bool {
        self.events.send(event).is_ok()
    }
}

async fn tick(keepalive: &mut Option<Interval>) {
    match keepalive {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

fn reason(data: Vec<Value>) -> String {
    let Some(first) = data.into_iter().next() else {
        return String::new();
    };
    match first.get("message").and_then(Value::as_str) {
        Some(message) => message.to_string(),
        None => value_text(first),
    }
}

#[cfg(test)]
mod tests {
    use {super::*, maplit::hashmap};

    fn worker(config: Config, filter: EventFilter) -> (Worker, mpsc::UnboundedReceiver<SubscriptionEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let (_, shutdown) = watch::channel(false);
        let worker = Worker {
            url: config.socket_url().unwrap(),
            config,
            token: "token".to_string(),
            filter,
            events: sender,
            shutdown,
            failures: 3,
        };
        (worker, receiver)
    }

    fn message(text: &str) -> Packet {
        format!("4{text}").parse().unwrap()
    }

    #[test]
    fn default_socket_url() {
        assert_eq!(
            Config::default().socket_url().unwrap().as_str(),
            "wss://api.xooa.com/subscribe/?EIO=3&transport=websocket"
        );
    }

    #[test]
    fn socket_url_maps_http_schemes() {
        let config = Config {
            url: Url::parse("http://127.0.0.1:4000/gateway/").unwrap(),
            path: "subscribe".to_string(),
            version: ProtocolVersion::V4,
            ..Default::default()
        };
        assert_eq!(
            config.socket_url().unwrap().as_str(),
            "ws://127.0.0.1:4000/gateway/subscribe?EIO=4&transport=websocket"
        );

        let config = Config {
            url: Url::parse("ftp://example.com").unwrap(),
            ..Default::default()
        };
        assert!(matches!(config.socket_url(), Err(Error::Scheme(scheme)) if scheme == "ftp"));
    }

    #[test]
    fn config_from_toml() {
        let config: Config = toml::from_str(
            r#"
            url = "https://events.example.com"
            version = 4
            retries = 2
            reconnect-delay = "250ms"
            "#,
        )
        .unwrap();
        assert_eq!(
            config,
            Config {
                url: Url::parse("https://events.example.com").unwrap(),
                path: "/subscribe/".to_string(),
                version: ProtocolVersion::V4,
                retries: 2,
                reconnect_delay: Duration::from_millis(250),
            }
        );
        assert!(toml::from_str::<Config>("retry = 2").is_err());
    }

    #[test]
    fn gateway_event_name() {
        let events = hashmap! {
            "named" => json!({"eventName": "transfer"}),
            "unnamed" => json!({"block": 1}),
            "not a string" => json!({"eventName": 4}),
        };
        assert_eq!(
            GatewayEvent::from(events["named"].clone()).event_name.as_deref(),
            Some("transfer")
        );
        assert_eq!(GatewayEvent::from(events["unnamed"].clone()).event_name, None);
        assert_eq!(GatewayEvent::from(events["not a string"].clone()).event_name, None);
    }

    #[tokio::test]
    async fn v3_open_starts_keepalive() {
        let (mut worker, _events) = worker(Config::default(), EventFilter::All);
        let mut heartbeat = Heartbeat::new();
        assert_eq!(heartbeat.timeout, HANDSHAKE_TIMEOUT);
        let open = r#"0{"sid":"s","upgrades":[],"pingInterval":25000,"pingTimeout":5000}"#
            .parse()
            .unwrap();
        assert_eq!(worker.handle(open, &mut heartbeat).unwrap(), Reaction::None);
        assert_eq!(heartbeat.timeout, Duration::from_secs(30));
        assert_eq!(heartbeat.keepalive.unwrap().period(), Duration::from_secs(25));
    }

    #[tokio::test]
    async fn v4_open_connects_namespace() {
        let config = Config {
            version: ProtocolVersion::V4,
            ..Default::default()
        };
        let (mut worker, _events) = worker(config, EventFilter::All);
        let mut heartbeat = Heartbeat::new();
        let open = r#"0{"sid":"s","upgrades":[],"pingInterval":25000,"pingTimeout":20000}"#
            .parse()
            .unwrap();
        let Reaction::Send(reply) = worker.handle(open, &mut heartbeat).unwrap() else {
            panic!("expected a reply");
        };
        assert_eq!(reply.to_string(), "40");
        assert!(heartbeat.keepalive.is_none());
        assert_eq!(heartbeat.timeout, Duration::from_secs(45));

        let ping = worker.handle(Packet::Ping(String::new()), &mut heartbeat).unwrap();
        assert_eq!(ping, Reaction::Send(Packet::Pong(String::new())));
    }

    #[tokio::test]
    async fn authenticates_after_connect() {
        let (mut worker, mut events) = worker(Config::default(), EventFilter::All);
        let mut heartbeat = Heartbeat::new();

        let Reaction::Send(reply) = worker.handle(message("0"), &mut heartbeat).unwrap() else {
            panic!("expected a reply");
        };
        assert_eq!(reply.to_string(), r#"42["authenticate",{"token":"token"}]"#);

        let reaction = worker
            .handle(message(r#"2["authenticated"]"#), &mut heartbeat)
            .unwrap();
        assert_eq!(reaction, Reaction::None);
        assert_eq!(worker.failures, 0);
        assert_eq!(events.recv().await, Some(SubscriptionEvent::Authenticated));
    }

    #[tokio::test]
    async fn unauthorized_is_fatal() {
        let (mut worker, _events) = worker(Config::default(), EventFilter::All);
        let err = worker
            .handle(
                message(r#"2["unauthorized",{"message":"invalid token"}]"#),
                &mut Heartbeat::new(),
            )
            .unwrap_err();
        assert!(!err.is_retryable());
        assert!(matches!(err, Error::Unauthorized(message) if message == "invalid token"));
    }

    #[tokio::test]
    async fn forwards_matching_events() {
        let (mut worker, mut events) = worker(
            Config::default(),
            EventFilter::Name("transfer".to_string()),
        );
        let mut heartbeat = Heartbeat::new();
        for frame in [
            r#"2["event",{"eventName":"mint","amount":1}]"#,
            r#"2["event",{"eventName":"transfer","amount":2}]"#,
        ] {
            assert_eq!(
                worker.handle(message(frame), &mut heartbeat).unwrap(),
                Reaction::None
            );
        }

        assert_eq!(
            events.recv().await,
            Some(SubscriptionEvent::Event(GatewayEvent {
                event_name: Some("transfer".to_string()),
                payload: json!({"eventName": "transfer", "amount": 2}),
            }))
        );
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn dropped_receiver_ends_session() {
        let (mut worker, events) = worker(Config::default(), EventFilter::All);
        drop(events);
        let reaction = worker
            .handle(message(r#"2["event",{"eventName":"mint"}]"#), &mut Heartbeat::new())
            .unwrap();
        assert_eq!(reaction, Reaction::Exit(Exit::Shutdown));
    }

    #[tokio::test]
    async fn server_disconnect_and_errors() {
        let (mut worker, _events) = worker(Config::default(), EventFilter::All);
        assert_eq!(
            worker.handle(message("1"), &mut Heartbeat::new()).unwrap(),
            Reaction::Exit(Exit::Closed)
        );
        let err = worker
            .handle(message(r#"4"namespace not allowed""#), &mut Heartbeat::new())
            .unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(
            err.to_string(),
            "gateway rejected the connection: namespace not allowed"
        );
        assert!(Error::Unresponsive(Duration::from_secs(45)).is_retryable());
    }

    #[tokio::test]
    async fn rejects_blank_token() {
        assert!(matches!(
            subscribe(Config::default(), " ", EventFilter::All),
            Err(Error::InvalidArgument("api token"))
        ));
    }
}
