//! End-to-end bridge tests over real WebSocket connections.

use std::future::Future;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use paystream_server::auth::{AuthError, Authorizer};
use paystream_server::events::MemoryEventBus;
use paystream_server::model::{
    BoundObject, Invoice, InvoiceStatus, ObjectKind, Payment, Principal, Wallet,
};
use paystream_server::store::{ObjectStore, StoreError};
use paystream_server::{AppState, Server};
use rust_decimal::Decimal;
use serde_json::json;
use tokio_tungstenite::tungstenite::Message;

struct TokenAuthorizer {
    valid_token: &'static str,
}

#[async_trait]
impl Authorizer for TokenAuthorizer {
    async fn authorize(&self, token: &str, scope: &str) -> Result<Principal, AuthError> {
        if token == self.valid_token {
            Ok(Principal {
                user_id: "user-1".to_string(),
                scopes: vec![scope.to_string()],
            })
        } else {
            Err(AuthError::Denied("invalid token".to_string()))
        }
    }
}

struct FixtureStore {
    wallet: Option<Wallet>,
    invoice: Option<Invoice>,
    lookups: AtomicU64,
}

#[async_trait]
impl ObjectStore for FixtureStore {
    async fn load(
        &self,
        kind: ObjectKind,
        id: &str,
        principal: Option<&Principal>,
    ) -> Result<Option<BoundObject>, StoreError> {
        self.lookups.fetch_add(1, Ordering::Relaxed);
        match kind {
            ObjectKind::Wallet => Ok(self
                .wallet
                .clone()
                .filter(|wallet| {
                    wallet.id == id
                        && principal.is_some_and(|p| p.user_id == wallet.user_id)
                })
                .map(BoundObject::Wallet)),
            ObjectKind::Invoice => Ok(self
                .invoice
                .clone()
                .filter(|invoice| invoice.id == id)
                .map(BoundObject::Invoice)),
        }
    }
}

struct Bridge {
    url: String,
    state: AppState,
    bus: Arc<MemoryEventBus>,
    lookups: Arc<FixtureStore>,
}

fn wallet_fixture() -> Wallet {
    Wallet {
        id: "w1".to_string(),
        user_id: "user-1".to_string(),
        name: "hot".to_string(),
        currency: "btc".to_string(),
    }
}

fn invoice_fixture(status: InvoiceStatus) -> Invoice {
    Invoice {
        id: "i1".to_string(),
        status,
        exception_status: "none".to_string(),
        sent_amount: Decimal::from_str("0.001").expect("decimal"),
        paid_currency: "btc".to_string(),
        payments: vec![Payment {
            currency: "btc".to_string(),
            divisibility: 8,
        }],
    }
}

async fn start_bridge(wallet: Option<Wallet>, invoice: Option<Invoice>) -> Bridge {
    let bus = Arc::new(MemoryEventBus::new());
    let store = Arc::new(FixtureStore {
        wallet,
        invoice,
        lookups: AtomicU64::new(0),
    });
    let state = AppState::new(
        Arc::new(TokenAuthorizer {
            valid_token: "good-token",
        }),
        Arc::clone(&store) as Arc<dyn ObjectStore>,
        Arc::clone(&bus) as Arc<dyn paystream_server::events::EventBus>,
    );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("local addr");
    let app = Server::router(state.clone());
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });

    Bridge {
        url: format!("ws://{addr}"),
        state,
        bus,
        lookups: store,
    }
}

async fn eventually<F, Fut>(what: &str, mut condition: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    for _ in 0..200 {
        if condition().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("timed out waiting for {what}");
}

fn close_code_of(message: Message) -> u16 {
    match message {
        Message::Close(Some(frame)) => u16::from(frame.code),
        other => panic!("expected close frame, got {other:?}"),
    }
}

#[tokio::test]
async fn terminal_invoice_gets_summary_then_normal_close() {
    let bridge = start_bridge(None, Some(invoice_fixture(InvoiceStatus::Complete))).await;

    let (mut ws, _) = tokio_tungstenite::connect_async(format!("{}/ws/invoices/i1", bridge.url))
        .await
        .expect("connect");

    let first = ws.next().await.expect("frame").expect("message");
    let Message::Text(text) = first else {
        panic!("expected summary payload, got {first:?}");
    };
    let payload: serde_json::Value = serde_json::from_str(&text).expect("json");
    assert_eq!(payload["status"], "complete");
    assert_eq!(payload["exception_status"], "none");
    assert_eq!(payload["sent_amount"], "0.00100000");
    assert_eq!(payload["paid_currency"], "btc");

    let second = ws.next().await.expect("frame").expect("message");
    assert_eq!(close_code_of(second), 1000);

    // The terminal path never touches the broker.
    assert_eq!(bridge.bus.subscriber_count("invoice:i1").await, 0);
    assert!(bridge.bus.unsubscribed_channels().await.is_empty());
    eventually("short-circuit recorded", || async {
        bridge.state.metrics.short_circuits() == 1
    })
    .await;
}

#[tokio::test]
async fn pending_invoice_streams_events_in_order() {
    let bridge = start_bridge(None, Some(invoice_fixture(InvoiceStatus::Pending))).await;

    let (mut ws, _) = tokio_tungstenite::connect_async(format!("{}/ws/invoices/i1", bridge.url))
        .await
        .expect("connect");

    let bus = Arc::clone(&bridge.bus);
    eventually("subscription", || {
        let bus = Arc::clone(&bus);
        async move { bus.subscriber_count("invoice:i1").await == 1 }
    })
    .await;

    for seq in 1..=3 {
        bridge
            .bus
            .publish("invoice:i1", json!({"status": "paid", "seq": seq}))
            .await;
    }

    for seq in 1..=3 {
        let frame = ws.next().await.expect("frame").expect("message");
        let Message::Text(text) = frame else {
            panic!("expected event, got {frame:?}");
        };
        let event: serde_json::Value = serde_json::from_str(&text).expect("json");
        assert_eq!(event["seq"], seq);
        assert_eq!(event["status"], "paid");
    }

    ws.close(None).await.expect("close");
    let bus = Arc::clone(&bridge.bus);
    eventually("unsubscribe", || {
        let bus = Arc::clone(&bus);
        async move { bus.unsubscribed_channels().await == vec!["invoice:i1".to_string()] }
    })
    .await;
}

#[tokio::test]
async fn wallet_without_token_is_rejected_before_lookup() {
    let bridge = start_bridge(Some(wallet_fixture()), None).await;

    let (mut ws, _) = tokio_tungstenite::connect_async(format!("{}/ws/wallets/w1", bridge.url))
        .await
        .expect("connect");

    let frame = ws.next().await.expect("frame").expect("message");
    assert_eq!(close_code_of(frame), 1008);
    assert_eq!(bridge.lookups.lookups.load(Ordering::Relaxed), 0);
    assert_eq!(bridge.bus.subscriber_count("wallet:w1").await, 0);
}

#[tokio::test]
async fn wallet_with_invalid_token_is_rejected_before_lookup() {
    let bridge = start_bridge(Some(wallet_fixture()), None).await;

    let (mut ws, _) = tokio_tungstenite::connect_async(format!(
        "{}/ws/wallets/w1?token=wrong",
        bridge.url
    ))
    .await
    .expect("connect");

    let frame = ws.next().await.expect("frame").expect("message");
    assert_eq!(close_code_of(frame), 1008);
    assert_eq!(bridge.lookups.lookups.load(Ordering::Relaxed), 0);
}

#[tokio::test]
async fn wallet_with_valid_token_streams_until_disconnect() {
    let bridge = start_bridge(Some(wallet_fixture()), None).await;

    let (mut ws, _) = tokio_tungstenite::connect_async(format!(
        "{}/ws/wallets/w1?token=good-token",
        bridge.url
    ))
    .await
    .expect("connect");

    let bus = Arc::clone(&bridge.bus);
    eventually("subscription", || {
        let bus = Arc::clone(&bus);
        async move { bus.subscriber_count("wallet:w1").await == 1 }
    })
    .await;

    bridge
        .bus
        .publish("wallet:w1", json!({"balance": "1.5"}))
        .await;

    let frame = ws.next().await.expect("frame").expect("message");
    let Message::Text(text) = frame else {
        panic!("expected event, got {frame:?}");
    };
    assert_eq!(text.as_str(), json!({"balance": "1.5"}).to_string());

    ws.close(None).await.expect("close");
    let bus = Arc::clone(&bridge.bus);
    eventually("unsubscribe", || {
        let bus = Arc::clone(&bus);
        async move { bus.unsubscribed_channels().await == vec!["wallet:w1".to_string()] }
    })
    .await;
}

#[tokio::test]
async fn unknown_invoice_is_rejected() {
    let bridge = start_bridge(None, None).await;

    let (mut ws, _) = tokio_tungstenite::connect_async(format!("{}/ws/invoices/nope", bridge.url))
        .await
        .expect("connect");

    let frame = ws.next().await.expect("frame").expect("message");
    assert_eq!(close_code_of(frame), 1008);
    assert_eq!(bridge.bus.subscriber_count("invoice:nope").await, 0);
}

#[tokio::test]
async fn wallet_of_another_user_is_not_found() {
    let mut foreign = wallet_fixture();
    foreign.user_id = "someone-else".to_string();
    let bridge = start_bridge(Some(foreign), None).await;

    let (mut ws, _) = tokio_tungstenite::connect_async(format!(
        "{}/ws/wallets/w1?token=good-token",
        bridge.url
    ))
    .await
    .expect("connect");

    let frame = ws.next().await.expect("frame").expect("message");
    assert_eq!(close_code_of(frame), 1008);
    assert_eq!(bridge.lookups.lookups.load(Ordering::Relaxed), 1);
}
