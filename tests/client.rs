//! End-to-end scenarios driving `GatewayClient` against a hand-driven mock
//! adapter (exact event control) and the scripted sim gateway.

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use fxgate::sim::SimGateway;
use fxgate::{
    AccountReport, Candle, ClientConfig, Credentials, EventBody, FxgateError, GatewayAdapter,
    GatewayClient, HistoryRequest, InboundEvent, MarketOrder, OrderState, OrderStatus,
    OutboundRequest, RequestId, SessionState, SessionStatus, SessionStatusCode, Side, Timeframe,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::time::sleep;

/// Adapter whose responses are pushed by the test, one event at a time.
#[derive(Clone, Default)]
struct ManualGateway {
    inner: Arc<ManualInner>,
}

#[derive(Default)]
struct ManualInner {
    tx: Mutex<Option<mpsc::Sender<InboundEvent>>>,
    sent: Mutex<Vec<(RequestId, OutboundRequest)>>,
    next: AtomicU64,
}

impl ManualGateway {
    async fn push(&self, event: InboundEvent) {
        let tx = self.inner.tx.lock().await.clone().expect("not connected");
        tx.send(event).await.expect("event stream closed");
    }

    /// Wait for the nth request (0-based) to be handed to the transport.
    async fn request(&self, n: usize) -> (RequestId, OutboundRequest) {
        loop {
            if let Some(pair) = self.inner.sent.lock().await.get(n).cloned() {
                return pair;
            }
            sleep(Duration::from_millis(2)).await;
        }
    }

    /// Drop the event stream without any notice, as a dying transport would.
    async fn kill_stream(&self) {
        self.inner.tx.lock().await.take();
    }
}

#[async_trait]
impl GatewayAdapter for ManualGateway {
    async fn connect(
        &self,
        _credentials: &Credentials,
    ) -> fxgate::Result<mpsc::Receiver<InboundEvent>> {
        let (tx, rx) = mpsc::channel(64);
        *self.inner.tx.lock().await = Some(tx);
        Ok(rx)
    }

    async fn send(&self, request: OutboundRequest) -> fxgate::Result<RequestId> {
        let id = RequestId::new(format!(
            "REQ-{}",
            self.inner.next.fetch_add(1, Ordering::Relaxed)
        ));
        self.inner.sent.lock().await.push((id.clone(), request));
        Ok(id)
    }

    async fn disconnect(&self) -> fxgate::Result<()> {
        self.inner.tx.lock().await.take();
        Ok(())
    }
}

fn credentials() -> Credentials {
    Credentials::builder()
        .username("demo")
        .password("demo")
        .terminal("Demo")
        .host_url("https://gateway.example.com/hosts")
        .build()
        .unwrap()
}

fn config() -> ClientConfig {
    ClientConfig::new(credentials()).request_timeout(Duration::from_secs(2))
}

fn session_open() -> EventBody {
    EventBody::Session(SessionStatus {
        code: SessionStatusCode::Connected,
        message: "trading session open".into(),
    })
}

fn order_status(order_id: &str, state: OrderState) -> OrderStatus {
    OrderStatus {
        order_id: order_id.into(),
        symbol: "EUR/USD".into(),
        state,
        position_id: None,
        price: 1.1,
        quantity: 10_000.0,
        detail: None,
    }
}

/// Answer the login confirmation as soon as it is sent.
fn answer_login(gateway: &ManualGateway) {
    let gateway = gateway.clone();
    tokio::spawn(async move {
        let (id, _) = gateway.request(0).await;
        gateway.push(InboundEvent::terminal(id, session_open())).await;
    });
}

#[tokio::test]
async fn login_resolves_within_deadline() {
    let gateway = ManualGateway::default();
    let mut client = GatewayClient::new(gateway.clone(), config());

    answer_login(&gateway);
    let status = client.login().await.unwrap();
    assert_eq!(status.code, SessionStatusCode::Connected);
    assert_eq!(client.state().await, SessionState::Connected);
}

#[tokio::test]
async fn order_timeout_then_late_event_is_harmless() {
    let gateway = ManualGateway::default();
    let mut client = GatewayClient::new(gateway.clone(), config());
    answer_login(&gateway);
    client.login().await.unwrap();

    // No reply within the deadline: the submit fails with Timeout.
    let order = MarketOrder::builder()
        .account_id("ACC1")
        .symbol("EUR/USD")
        .side(Side::Sell)
        .quantity(10_000.0)
        .build()
        .unwrap();
    let started = std::time::Instant::now();
    let err = client
        .submit(
            OutboundRequest::Order(order),
            false,
            Duration::from_millis(80),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, FxgateError::Timeout));
    assert!(started.elapsed() >= Duration::from_millis(75));

    // The late reply finds no waiter and conflates as a streaming report.
    let (id, _) = gateway.request(1).await;
    gateway
        .push(InboundEvent::terminal(
            id,
            EventBody::Order(order_status("LATE-1", OrderState::Executed)),
        ))
        .await;
    sleep(Duration::from_millis(20)).await;
    assert!(client.latest_order_status("LATE-1").await.is_some());

    // Other correlated traffic is unaffected.
    let gateway_bg = gateway.clone();
    tokio::spawn(async move {
        let (id, _) = gateway_bg.request(2).await;
        gateway_bg
            .push(InboundEvent::terminal(id, session_open()))
            .await;
    });
    let response = client
        .submit(OutboundRequest::SessionStatus, false, Duration::from_secs(1))
        .await
        .unwrap();
    assert!(matches!(
        response.terminal().body,
        EventBody::Session(_)
    ));
}

#[tokio::test]
async fn account_refresh_accumulates_fragments() {
    let gateway = ManualGateway::default();
    let mut client = GatewayClient::new(gateway.clone(), config());
    answer_login(&gateway);
    client.login().await.unwrap();

    let gateway_bg = gateway.clone();
    tokio::spawn(async move {
        let (id, request) = gateway_bg.request(1).await;
        assert!(matches!(request, OutboundRequest::AccountList));
        let report = |n: u32| {
            EventBody::Account(AccountReport {
                account_id: format!("ACC{n}"),
                balance: 1_000.0 * n as f64,
                used_margin: 0.0,
            })
        };
        gateway_bg
            .push(InboundEvent::fragment(id.clone(), report(1)))
            .await;
        gateway_bg
            .push(InboundEvent::fragment(id.clone(), report(2)))
            .await;
        gateway_bg.push(InboundEvent::terminal(id, report(3))).await;
    });

    let accounts = client.accounts().await.unwrap();
    assert_eq!(accounts.len(), 3);
    assert_eq!(accounts[0].account_id, "ACC1");
    assert_eq!(accounts[2].account_id, "ACC3");
}

#[tokio::test]
async fn duplicate_candle_timestamps_keep_last_value() {
    let gateway = ManualGateway::default();
    let mut client = GatewayClient::new(gateway.clone(), config());
    answer_login(&gateway);
    client.login().await.unwrap();

    let stamp = Utc::now();
    let gateway_bg = gateway.clone();
    tokio::spawn(async move {
        let (id, _) = gateway_bg.request(1).await;
        let bar = |close: f64| EventBody::Candle {
            symbol: "EUR/USD".into(),
            timestamp: stamp,
            candle: Candle {
                open: 1.0,
                high: 1.2,
                low: 0.9,
                close,
            },
        };
        gateway_bg
            .push(InboundEvent::fragment(id.clone(), bar(1.1000)))
            .await;
        gateway_bg
            .push(InboundEvent::terminal(id, bar(1.1042)))
            .await;
    });

    let request = HistoryRequest::builder()
        .symbol("EUR/USD")
        .timeframe(Timeframe::Hour)
        .from(stamp - ChronoDuration::hours(2))
        .to(stamp + ChronoDuration::hours(2))
        .build()
        .unwrap();
    let captured = client.fetch_history(request).await.unwrap();
    assert_eq!(captured, 2);

    let history = client.history_snapshot().await;
    assert_eq!(history.len(), 1, "same timestamp key must conflate");
    assert_eq!(history[0].1.close, 1.1042);
}

#[tokio::test]
async fn transport_failure_fails_all_pending_requests() {
    let gateway = ManualGateway::default();
    let mut client = GatewayClient::new(gateway.clone(), config());
    answer_login(&gateway);
    client.login().await.unwrap();

    let client = Arc::new(client);
    let mut waiters = Vec::new();
    for _ in 0..3 {
        let client = Arc::clone(&client);
        waiters.push(tokio::spawn(async move {
            client
                .submit(OutboundRequest::SessionStatus, false, Duration::from_secs(5))
                .await
        }));
    }

    // Let all three register, then deliver an uncorrelated failure notice.
    gateway.request(3).await;
    gateway
        .push(InboundEvent::streaming(EventBody::Session(SessionStatus {
            code: SessionStatusCode::Error,
            message: "link lost".into(),
        })))
        .await;

    for waiter in waiters {
        let result = waiter.await.unwrap();
        assert!(matches!(result, Err(FxgateError::Transport)));
    }
    assert_eq!(client.state().await, SessionState::Disconnected);
}

#[tokio::test]
async fn dead_stream_without_notice_fails_pending() {
    let gateway = ManualGateway::default();
    let mut client = GatewayClient::new(gateway.clone(), config());
    answer_login(&gateway);
    client.login().await.unwrap();

    let client = Arc::new(client);
    let waiter = {
        let client = Arc::clone(&client);
        tokio::spawn(async move {
            client
                .submit(OutboundRequest::AccountList, true, Duration::from_secs(5))
                .await
        })
    };

    gateway.request(1).await;
    gateway.kill_stream().await;

    let result = waiter.await.unwrap();
    assert!(matches!(result, Err(FxgateError::Transport)));
    assert_eq!(client.state().await, SessionState::Disconnected);
}

#[tokio::test]
async fn rejected_request_carries_reason() {
    let gateway = ManualGateway::default();
    let mut client = GatewayClient::new(gateway.clone(), config());
    answer_login(&gateway);
    client.login().await.unwrap();

    let gateway_bg = gateway.clone();
    tokio::spawn(async move {
        let (id, _) = gateway_bg.request(1).await;
        gateway_bg
            .push(InboundEvent::terminal(
                id,
                EventBody::Reject {
                    reason: "market closed".into(),
                },
            ))
            .await;
    });

    let err = client
        .submit(OutboundRequest::InstrumentList, false, Duration::from_secs(1))
        .await
        .unwrap_err();
    match err {
        FxgateError::Rejected { reason } => assert_eq!(reason, "market closed"),
        other => panic!("expected rejection, got {other:?}"),
    }
}

#[tokio::test]
async fn submit_requires_a_session() {
    let client = GatewayClient::new(ManualGateway::default(), config());
    let err = client
        .submit(OutboundRequest::AccountList, true, Duration::from_secs(1))
        .await
        .unwrap_err();
    assert!(matches!(err, FxgateError::Session(_)));
}

#[tokio::test]
async fn sim_batch_trade_round_trip() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("fxgate=debug")
        .try_init();

    let mut client = GatewayClient::new(SimGateway::new(), config());
    client.login().await.unwrap();

    let accounts = client.accounts().await.unwrap();
    assert_eq!(accounts.len(), 1);
    let instruments = client.instruments().await.unwrap();
    assert_eq!(instruments.len(), 3);

    // Open one position per instrument, as the batch trader does.
    let mut opened = Vec::new();
    for instrument in &instruments {
        let order = MarketOrder::builder()
            .account_id(&accounts[0].account_id)
            .symbol(&instrument.symbol)
            .side(Side::Sell)
            .quantity(instrument.min_contract_quantity())
            .build()
            .unwrap();
        let status = client.place_market_order(order).await.unwrap();
        assert_eq!(status.state, OrderState::Executed);
        assert!(status.position_id.is_some());
        opened.push(status);
    }

    // Flatten them with opposite-side orders.
    for status in &opened {
        let close = MarketOrder::closing(&accounts[0].account_id, status, Side::Sell);
        assert_eq!(close.side, Side::Buy);
        let closed = client.place_market_order(close).await.unwrap();
        assert_eq!(closed.state, OrderState::Executed);
    }

    assert!(client.order_statuses().await.len() >= opened.len());

    client.logout().await.unwrap();
    assert_eq!(client.state().await, SessionState::Disconnected);
    let err = client
        .submit(OutboundRequest::AccountList, true, Duration::from_secs(1))
        .await
        .unwrap_err();
    assert!(matches!(err, FxgateError::Session(_)));
}

#[tokio::test]
async fn sim_history_and_quotes() {
    let mut client = GatewayClient::new(SimGateway::new(), config());
    client.login().await.unwrap();

    let to = Utc::now();
    let request = HistoryRequest::builder()
        .symbol("EUR/USD")
        .timeframe(Timeframe::Hour)
        .from(to - ChronoDuration::days(1))
        .to(to)
        .build()
        .unwrap();
    let captured = client.fetch_history(request).await.unwrap();
    assert_eq!(captured, 24);

    let history = client.history_snapshot().await;
    assert_eq!(history.len(), 24);
    assert!(history.windows(2).all(|w| w[0].0 < w[1].0), "snapshot is time-ordered");

    let first = client.subscribe("EUR/USD").await.unwrap();
    assert!(first.ask > first.bid);
    // Streaming updates overwrite the subscription snapshot.
    sleep(Duration::from_millis(30)).await;
    let latest = client.latest_quote("EUR/USD").await.unwrap();
    assert_ne!(latest.bid, first.bid);

    let err = client.subscribe("XX/XX").await.unwrap_err();
    assert!(matches!(err, FxgateError::Rejected { .. }));

    client.logout().await.unwrap();
}
