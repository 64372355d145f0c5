// ChannelManager against a local tokio-tungstenite server.
#![allow(clippy::unwrap_used)]

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;
use url::Url;

use smartfarm_core::{
    Backend, BackendConfig, ChannelConfig, ChannelManager, ConnectionState, NotificationLevel,
    ReconnectPolicy,
};

const WAIT: Duration = Duration::from_secs(5);

// ── Helpers ─────────────────────────────────────────────────────────

async fn bind() -> (TcpListener, Url) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let url = Url::parse(&format!("ws://{addr}/ws")).unwrap();
    (listener, url)
}

fn manager(ws_url: Url) -> ChannelManager {
    ChannelManager::new(
        ChannelConfig {
            ws_url,
            reconnect: ReconnectPolicy {
                delay: Duration::from_millis(50),
                max_attempts: 3,
            },
        },
        None,
    )
}

async fn accept(listener: &TcpListener) -> WebSocketStream<tokio::net::TcpStream> {
    let (stream, _) = listener.accept().await.unwrap();
    tokio_tungstenite::accept_async(stream).await.unwrap()
}

async fn next_json(ws: &mut WebSocketStream<tokio::net::TcpStream>) -> Value {
    loop {
        let msg = ws.next().await.unwrap().unwrap();
        if let Message::Text(text) = msg {
            return serde_json::from_str(&text).unwrap();
        }
    }
}

async fn push(ws: &mut WebSocketStream<tokio::net::TcpStream>, event: &str, data: Value) {
    ws.send(Message::text(json!({"type": event, "data": data}).to_string()))
        .await
        .unwrap();
}

fn forward(tx: mpsc::UnboundedSender<Value>) -> impl Fn(&Value) + Send + Sync + 'static {
    move |value| {
        let _ = tx.send(value.clone());
    }
}

// ── Tests ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_one_emission_calls_callback_once() {
    let (listener, url) = bind().await;
    let server = tokio::spawn(async move {
        let mut ws = accept(&listener).await;
        assert_eq!(next_json(&mut ws).await, json!({"type": "get-priceUpdate", "data": {}}));
        push(&mut ws, "priceUpdate", json!({"commodity": "maize", "price": 310.0})).await;
        while let Some(Ok(_)) = ws.next().await {}
    });

    let channels = manager(url);
    let (tx, mut rx) = mpsc::unbounded_channel();
    let _sub = channels.subscribe_with_request("priceUpdate", forward(tx));
    channels.connect().await;

    let payload = tokio::time::timeout(WAIT, rx.recv()).await.unwrap().unwrap();
    assert_eq!(payload, json!({"commodity": "maize", "price": 310.0}));
    assert!(
        tokio::time::timeout(Duration::from_millis(200), rx.recv())
            .await
            .is_err(),
        "callback ran more than once"
    );

    channels.disconnect().await;
    assert_eq!(*channels.state().borrow(), ConnectionState::Disconnected);
    server.await.unwrap();
}

#[tokio::test]
async fn test_unsubscribed_event_reaches_nobody() {
    let (listener, url) = bind().await;
    let server = tokio::spawn(async move {
        let mut ws = accept(&listener).await;
        assert_eq!(next_json(&mut ws).await["type"], "get-ready");
        push(&mut ws, "priceUpdate", json!({"price": 1.0})).await;
        push(&mut ws, "ready", json!({})).await;
        while let Some(Ok(_)) = ws.next().await {}
    });

    let channels = manager(url);
    let (price_tx, mut price_rx) = mpsc::unbounded_channel();
    let (ready_tx, mut ready_rx) = mpsc::unbounded_channel();
    let _price = channels.subscribe("priceUpdate", forward(price_tx));
    let _ready = channels.subscribe_with_request("ready", forward(ready_tx));
    channels.unsubscribe("priceUpdate");
    channels.connect().await;

    tokio::time::timeout(WAIT, ready_rx.recv()).await.unwrap().unwrap();
    assert!(price_rx.try_recv().is_err());

    channels.disconnect().await;
    server.await.unwrap();
}

#[tokio::test]
async fn test_requests_are_replayed_after_reconnect() {
    let (listener, url) = bind().await;
    let server = tokio::spawn(async move {
        let mut first = accept(&listener).await;
        assert_eq!(next_json(&mut first).await["type"], "get-alertTriggered");
        first.close(None).await.unwrap();
        drop(first);

        let mut second = accept(&listener).await;
        assert_eq!(next_json(&mut second).await["type"], "get-alertTriggered");
        push(&mut second, "alertTriggered", json!({"id": "a-1"})).await;
        while let Some(Ok(_)) = second.next().await {}
    });

    let channels = manager(url);
    let (tx, mut rx) = mpsc::unbounded_channel();
    let _sub = channels.subscribe_with_request("alertTriggered", forward(tx));
    channels.connect().await;

    let payload = tokio::time::timeout(WAIT, rx.recv()).await.unwrap().unwrap();
    assert_eq!(payload["id"], "a-1");

    channels.disconnect().await;
    server.await.unwrap();
}

#[tokio::test]
async fn test_connect_is_idempotent() {
    let (listener, url) = bind().await;
    let server = tokio::spawn(async move {
        let mut ws = accept(&listener).await;
        while let Some(Ok(_)) = ws.next().await {}
        // A second accept would mean a second transport was opened.
        tokio::time::timeout(Duration::from_millis(300), listener.accept())
            .await
            .is_err()
    });

    let channels = manager(url);
    let mut state = channels.state();
    channels.connect().await;
    channels.connect().await;
    tokio::time::timeout(WAIT, state.wait_for(|s| *s == ConnectionState::Connected))
        .await
        .unwrap()
        .unwrap();

    channels.disconnect().await;
    channels.disconnect().await;
    assert!(server.await.unwrap(), "connect opened a second socket");
}

#[tokio::test]
async fn test_lost_connection_is_reported_once_retries_run_out() {
    // Bind and drop so nothing is listening on the port.
    let (listener, url) = bind().await;
    drop(listener);

    let api_url = Url::parse("http://127.0.0.1:9/api").unwrap();
    let mut config = BackendConfig::new(api_url).unwrap().with_ws_url(url);
    config.reconnect = ReconnectPolicy {
        delay: Duration::from_millis(10),
        max_attempts: 2,
    };
    let backend = Backend::new(config).unwrap();
    let mut notes = backend.notifier().subscribe();
    let mut state = backend.channels().state();

    backend.start_realtime().await;
    tokio::time::timeout(WAIT, state.wait_for(|s| *s == ConnectionState::Failed))
        .await
        .unwrap()
        .unwrap();

    let note = tokio::time::timeout(WAIT, notes.recv()).await.unwrap().unwrap();
    assert_eq!(note.level, NotificationLevel::Error);
    assert_eq!(
        note.message,
        "Connection lost. Please refresh the page to reconnect."
    );

    backend.shutdown().await;
}

// ── Backend wiring ──────────────────────────────────────────────────

fn realtime_backend(ws_url: Url) -> Backend {
    let api_url = Url::parse("http://127.0.0.1:9/api").unwrap();
    let mut config = BackendConfig::new(api_url).unwrap().with_ws_url(ws_url);
    config.reconnect = ReconnectPolicy {
        delay: Duration::from_millis(50),
        max_attempts: 3,
    };
    Backend::new(config).unwrap()
}

#[derive(Debug, PartialEq, serde::Deserialize)]
struct Weather {
    temperature: f64,
    condition: String,
}

#[tokio::test]
async fn test_realtime_value_tracks_latest_payload() {
    let (listener, url) = bind().await;
    let server = tokio::spawn(async move {
        let mut ws = accept(&listener).await;
        while next_json(&mut ws).await["type"] != "get-weather" {}
        push(&mut ws, "weather", json!({"temperature": "hot"})).await;
        push(&mut ws, "weather", json!({"temperature": 24.5, "condition": "sunny"})).await;
        while let Some(Ok(_)) = ws.next().await {}
    });

    let backend = realtime_backend(url);
    let mut notes = backend.notifier().subscribe();
    let mut weather = backend.realtime_value::<Weather>("weather");
    assert!(weather.latest().is_none());
    backend.start_realtime().await;

    let current = tokio::time::timeout(WAIT, weather.changed()).await.unwrap().unwrap();
    assert_eq!(
        *current,
        Weather {
            temperature: 24.5,
            condition: "sunny".into(),
        }
    );
    assert_eq!(weather.latest().unwrap().condition, "sunny");

    let note = notes.try_recv().unwrap();
    assert_eq!(note.level, NotificationLevel::Error);
    assert_eq!(note.message, "Failed to load weather data");

    backend.shutdown().await;
    server.await.unwrap();
}

#[tokio::test]
async fn test_typed_subscription_skips_malformed_payloads() {
    let (listener, url) = bind().await;
    let server = tokio::spawn(async move {
        let mut ws = accept(&listener).await;
        assert_eq!(next_json(&mut ws).await["type"], "get-ready");
        push(&mut ws, "weather", json!("not an object")).await;
        push(&mut ws, "weather", json!({"temperature": 18.0, "condition": "rain"})).await;
        push(&mut ws, "ready", json!({})).await;
        while let Some(Ok(_)) = ws.next().await {}
    });

    let channels = manager(url);
    let (tx, mut rx) = mpsc::unbounded_channel();
    let _weather = channels.subscribe_typed("weather", move |w: Weather| {
        let _ = tx.send(w.condition);
    });
    let (ready_tx, mut ready_rx) = mpsc::unbounded_channel();
    let _ready = channels.subscribe_with_request("ready", forward(ready_tx));
    channels.connect().await;

    tokio::time::timeout(WAIT, ready_rx.recv()).await.unwrap().unwrap();
    assert_eq!(rx.try_recv().unwrap(), "rain");
    assert!(rx.try_recv().is_err());

    channels.disconnect().await;
    server.await.unwrap();
}

#[tokio::test]
async fn test_price_update_invalidates_market_queries() {
    let (listener, url) = bind().await;
    let server = tokio::spawn(async move {
        let mut ws = accept(&listener).await;
        push(&mut ws, "priceUpdate", json!({"commodity": "maize", "price": 320.0})).await;
        while let Some(Ok(_)) = ws.next().await {}
    });

    let backend = realtime_backend(url);
    let prices = smartfarm_core::QueryKey::new(smartfarm_core::keys::MARKET_PRICES).with("maize");
    let commodities = smartfarm_core::QueryKey::new(smartfarm_core::keys::COMMODITIES);
    backend.cache().set(prices.clone(), json!([]));
    backend.cache().set(commodities.clone(), json!(["maize"]));

    backend.start_realtime().await;
    tokio::time::timeout(WAIT, async {
        while !backend.cache().state(&prices).unwrap().is_invalidated {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .unwrap();
    assert!(!backend.cache().state(&commodities).unwrap().is_invalidated);

    backend.shutdown().await;
    server.await.unwrap();
}
