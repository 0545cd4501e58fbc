use {
    axum::{
        Router,
        extract::{
            Query,
            State,
            ws::{Message, WebSocket, WebSocketUpgrade},
        },
        response::IntoResponse,
        routing::get,
    },
    serde_json::json,
    std::{
        collections::HashMap,
        sync::{
            Arc,
            atomic::{AtomicUsize, Ordering},
        },
        time::Duration,
    },
    tokio::sync::Notify,
    url::Url,
    xooa_client::events::{
        self,
        Config,
        Error,
        EventFilter,
        GatewayEvent,
        ProtocolVersion,
        Subscription,
        SubscriptionEvent,
    },
};

const TOKEN: &str = "good-token";

/// Socket.IO server mimicking the gateway's `/subscribe/` endpoint.
#[derive(Clone, Default)]
struct MockEvents {
    /// Close every connection after publishing the events.
    close_after_events: bool,
    /// Stop answering anything once the subscription is authenticated.
    silent_after_auth: bool,
    /// Announced ping interval and timeout in milliseconds.
    heartbeat: Option<(u64, u64)>,
    connections: Arc<AtomicUsize>,
    /// Engine pings received from clients.
    pings: Arc<AtomicUsize>,
    /// Notified whenever a client session ends.
    closed: Arc<Notify>,
}

impl MockEvents {
    async fn start(self) -> Url {
        observe::tracing::initialize_reentrant("xooa_client=debug");
        let app = Router::new()
            .route("/subscribe/", get(Self::upgrade))
            .with_state(self);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        Url::parse(&format!("ws://{addr}")).unwrap()
    }

    async fn upgrade(
        ws: WebSocketUpgrade,
        State(server): State<Self>,
        Query(query): Query<HashMap<String, String>>,
    ) -> impl IntoResponse {
        let version = query.get("EIO").cloned().unwrap_or_default();
        ws.on_upgrade(move |socket| server.session(socket, version))
    }

    async fn session(self, mut socket: WebSocket, version: String) {
        self.connections.fetch_add(1, Ordering::SeqCst);
        let (interval, timeout) = self.heartbeat.unwrap_or((25000, 5000));
        let open = json!({
            "sid": "mock",
            "upgrades": [],
            "pingInterval": interval,
            "pingTimeout": timeout,
        });
        send(&mut socket, &format!("0{open}")).await;
        if version == "3" {
            send(&mut socket, "40").await;
        }

        let mut silent = false;
        while let Some(Ok(message)) = socket.recv().await {
            let Message::Text(text) = message else {
                continue;
            };
            if text.as_str() == "2" {
                self.pings.fetch_add(1, Ordering::SeqCst);
            }
            if silent {
                continue;
            }
            match text.as_str() {
                "40" => send(&mut socket, r#"40{"sid":"mock-socket"}"#).await,
                "2" => send(&mut socket, "3").await,
                "41" => break,
                frame if frame.starts_with(r#"42["authenticate""#) => {
                    let expected = format!(r#"42["authenticate",{{"token":"{TOKEN}"}}]"#);
                    if frame != expected {
                        send(&mut socket, r#"42["unauthorized",{"message":"invalid token"}]"#)
                            .await;
                        break;
                    }
                    send(&mut socket, r#"42["authenticated"]"#).await;
                    if self.silent_after_auth {
                        silent = true;
                        continue;
                    }
                    send(&mut socket, r#"42["event",{"eventName":"mint","amount":"5"}]"#).await;
                    send(
                        &mut socket,
                        r#"42["event",{"eventName":"transfer","amount":"10"}]"#,
                    )
                    .await;
                    if self.close_after_events {
                        break;
                    }
                }
                _ => {}
            }
        }
        let _ = socket.send(Message::Close(None)).await;
        self.closed.notify_one();
    }
}

async fn send(socket: &mut WebSocket, text: &str) {
    let _ = socket.send(Message::Text(text.into())).await;
}

async fn next(subscription: &mut Subscription) -> Option<SubscriptionEvent> {
    tokio::time::timeout(Duration::from_secs(10), subscription.next())
        .await
        .expect("timed out waiting for subscription event")
}

fn config(url: Url, version: ProtocolVersion) -> Config {
    Config {
        url,
        version,
        retries: 1,
        reconnect_delay: Duration::from_millis(10),
        ..Default::default()
    }
}

fn transfer() -> SubscriptionEvent {
    SubscriptionEvent::Event(GatewayEvent {
        event_name: Some("transfer".to_string()),
        payload: json!({"eventName": "transfer", "amount": "10"}),
    })
}

#[tokio::test]
async fn delivers_filtered_events() {
    for version in [ProtocolVersion::V3, ProtocolVersion::V4] {
        let url = MockEvents::default().start().await;
        let mut subscription = events::subscribe(
            config(url, version),
            TOKEN,
            EventFilter::Name("transfer".to_string()),
        )
        .unwrap();

        assert_eq!(next(&mut subscription).await, Some(SubscriptionEvent::Connected));
        assert_eq!(
            next(&mut subscription).await,
            Some(SubscriptionEvent::Authenticated)
        );
        assert_eq!(next(&mut subscription).await, Some(transfer()));

        subscription.unsubscribe().await.unwrap();
    }
}

#[tokio::test]
async fn unauthorized_ends_subscription_without_retry() {
    let server = MockEvents::default();
    let connections = server.connections.clone();
    let url = server.start().await;

    let mut subscription =
        events::subscribe(config(url, ProtocolVersion::V3), "bad-token", EventFilter::All)
            .unwrap();
    assert_eq!(next(&mut subscription).await, Some(SubscriptionEvent::Connected));
    assert_eq!(
        next(&mut subscription).await,
        Some(SubscriptionEvent::Disconnected)
    );
    assert_eq!(next(&mut subscription).await, None);

    let err = subscription.unsubscribe().await.unwrap_err();
    assert!(matches!(err, Error::Unauthorized(message) if message == "invalid token"));
    assert_eq!(connections.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn reconnects_after_server_closes() {
    let server = MockEvents {
        close_after_events: true,
        ..Default::default()
    };
    let connections = server.connections.clone();
    let url = server.start().await;

    // A single tolerated failure in a row; authentication resets the count
    // so the subscription outlives more than two connections.
    let mut subscription =
        events::subscribe(config(url, ProtocolVersion::V3), TOKEN, EventFilter::All).unwrap();
    let mut transfers = 0;
    while transfers < 3 {
        if next(&mut subscription).await == Some(transfer()) {
            transfers += 1;
        }
    }
    assert!(connections.load(Ordering::SeqCst) >= 3);

    subscription.unsubscribe().await.unwrap();
}

#[tokio::test]
async fn reconnects_after_connection_goes_silent() {
    let server = MockEvents {
        silent_after_auth: true,
        heartbeat: Some((100, 100)),
        ..Default::default()
    };
    let connections = server.connections.clone();
    let url = server.start().await;

    let mut subscription =
        events::subscribe(config(url, ProtocolVersion::V3), TOKEN, EventFilter::All).unwrap();
    assert_eq!(next(&mut subscription).await, Some(SubscriptionEvent::Connected));
    assert_eq!(
        next(&mut subscription).await,
        Some(SubscriptionEvent::Authenticated)
    );
    assert_eq!(
        next(&mut subscription).await,
        Some(SubscriptionEvent::Disconnected)
    );
    assert_eq!(next(&mut subscription).await, Some(SubscriptionEvent::Connected));
    assert!(connections.load(Ordering::SeqCst) >= 2);

    subscription.unsubscribe().await.unwrap();
}

#[tokio::test]
async fn v3_client_sends_engine_pings() {
    let server = MockEvents {
        heartbeat: Some((50, 5000)),
        ..Default::default()
    };
    let pings = server.pings.clone();
    let url = server.start().await;

    let mut subscription =
        events::subscribe(config(url, ProtocolVersion::V3), TOKEN, EventFilter::All).unwrap();
    assert_eq!(next(&mut subscription).await, Some(SubscriptionEvent::Connected));
    assert_eq!(
        next(&mut subscription).await,
        Some(SubscriptionEvent::Authenticated)
    );
    tokio::time::sleep(Duration::from_millis(400)).await;
    assert!(pings.load(Ordering::SeqCst) >= 2);

    // Answered pings keep the connection alive.
    for _ in 0..2 {
        assert!(matches!(
            next(&mut subscription).await,
            Some(SubscriptionEvent::Event(_))
        ));
    }
    assert!(
        tokio::time::timeout(Duration::from_millis(100), subscription.next())
            .await
            .is_err()
    );

    subscription.unsubscribe().await.unwrap();
}

#[tokio::test]
async fn dropping_subscription_closes_socket() {
    let server = MockEvents::default();
    let closed = server.closed.clone();
    let url = server.start().await;

    let mut subscription =
        events::subscribe(config(url, ProtocolVersion::V4), TOKEN, EventFilter::All).unwrap();
    assert_eq!(next(&mut subscription).await, Some(SubscriptionEvent::Connected));
    assert_eq!(
        next(&mut subscription).await,
        Some(SubscriptionEvent::Authenticated)
    );
    drop(subscription);

    tokio::time::timeout(Duration::from_secs(10), closed.notified())
        .await
        .expect("server never saw the socket close");
}

#[tokio::test]
async fn gives_up_after_retries() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let config = Config {
        url: Url::parse(&format!("ws://{addr}")).unwrap(),
        retries: 2,
        reconnect_delay: Duration::from_millis(10),
        ..Default::default()
    };
    let mut subscription = events::subscribe(config, TOKEN, EventFilter::All).unwrap();
    assert_eq!(next(&mut subscription).await, None);

    let err = subscription.unsubscribe().await.unwrap_err();
    assert!(matches!(err, Error::RetriesExhausted { retries: 2 }));
}
