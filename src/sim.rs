//! In-process gateway standing in for a real transport.
//!
//! Answers every request with scripted data after a small latency, which is
//! enough to exercise login, reference-data pulls, order placement, history
//! backfill, and streaming quote conflation without a live gateway.

use crate::adapter::GatewayAdapter;
use crate::config::Credentials;
use crate::error::{FxgateError, Result};
use crate::events::{
    AccountReport, Candle, EventBody, InboundEvent, Instrument, OrderState, OrderStatus,
    PriceSnapshot, RequestId, SessionStatus, SessionStatusCode,
};
use crate::messages::{HistoryRequest, MarketOrder, OutboundRequest};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{mpsc, Mutex};
use tokio::time::{sleep, Duration};

/// Most candles a single history response will carry.
const MAX_CANDLES: usize = 500;

/// Scripted gateway adapter for demos and tests.
pub struct SimGateway {
    accounts: Vec<AccountReport>,
    instruments: Vec<Instrument>,
    latency: Duration,
    next_order: AtomicU64,
    events_tx: Mutex<Option<mpsc::Sender<InboundEvent>>>,
}

impl SimGateway {
    pub fn new() -> Self {
        let fx = |symbol: &str| Instrument {
            symbol: symbol.to_string(),
            min_quantity: 1.0,
            point_size: 0.0001,
            forex: true,
        };
        Self::with_market(
            vec![AccountReport {
                account_id: "SIM-ACCT-1".into(),
                balance: 50_000.0,
                used_margin: 0.0,
            }],
            vec![fx("EUR/USD"), fx("GBP/USD"), fx("USD/JPY")],
        )
    }

    pub fn with_market(accounts: Vec<AccountReport>, instruments: Vec<Instrument>) -> Self {
        Self {
            accounts,
            instruments,
            latency: Duration::from_millis(5),
            next_order: AtomicU64::new(1),
            events_tx: Mutex::new(None),
        }
    }

    pub fn latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    fn knows(&self, symbol: &str) -> bool {
        self.instruments.iter().any(|i| i.symbol == symbol)
    }

    fn quote(symbol: &str) -> PriceSnapshot {
        let bid = synth_price(symbol, 0);
        PriceSnapshot {
            symbol: symbol.to_string(),
            bid,
            ask: bid + 0.0002,
            timestamp: Utc::now(),
        }
    }

    async fn script(&self, id: RequestId, request: OutboundRequest) -> Vec<InboundEvent> {
        match request {
            OutboundRequest::SessionStatus => vec![InboundEvent::terminal(
                id,
                EventBody::Session(SessionStatus {
                    code: SessionStatusCode::Connected,
                    message: "trading session open".into(),
                }),
            )],
            OutboundRequest::AccountList => {
                let last = self.accounts.len().saturating_sub(1);
                self.accounts
                    .iter()
                    .enumerate()
                    .map(|(i, report)| InboundEvent {
                        correlation_id: Some(id.clone()),
                        is_final: i == last,
                        body: EventBody::Account(report.clone()),
                    })
                    .collect()
            }
            OutboundRequest::InstrumentList => vec![InboundEvent::terminal(
                id,
                EventBody::Instruments(self.instruments.clone()),
            )],
            OutboundRequest::Order(order) => self.script_order(id, order),
            OutboundRequest::History(request) => self.script_history(id, request),
            OutboundRequest::Subscribe { symbol } => {
                if !self.knows(&symbol) {
                    return vec![InboundEvent::terminal(
                        id,
                        EventBody::Reject {
                            reason: format!("unknown symbol {symbol}"),
                        },
                    )];
                }
                // First snapshot answers the subscription; a couple of
                // streaming updates follow so conflation has work to do.
                let mut events = vec![InboundEvent::terminal(
                    id,
                    EventBody::Price(Self::quote(&symbol)),
                )];
                for tick in 1..=2u64 {
                    let bid = synth_price(&symbol, tick);
                    events.push(InboundEvent::streaming(EventBody::Price(PriceSnapshot {
                        symbol: symbol.clone(),
                        bid,
                        ask: bid + 0.0002,
                        timestamp: Utc::now(),
                    })));
                }
                events
            }
        }
    }

    fn script_order(&self, id: RequestId, order: MarketOrder) -> Vec<InboundEvent> {
        if !self.knows(&order.symbol) {
            return vec![InboundEvent::terminal(
                id,
                EventBody::Reject {
                    reason: format!("unknown symbol {}", order.symbol),
                },
            )];
        }
        let seq = self.next_order.fetch_add(1, Ordering::Relaxed);
        let order_id = format!("SIM-ORD-{seq}");
        let executed = OrderStatus {
            order_id: order_id.clone(),
            symbol: order.symbol.clone(),
            state: OrderState::Executed,
            position_id: Some(format!("SIM-POS-{seq}")),
            price: synth_price(&order.symbol, seq),
            quantity: order.quantity,
            detail: None,
        };
        vec![
            InboundEvent::terminal(id, EventBody::Order(executed.clone())),
            // Streaming position confirmation, as a live gateway pushes after
            // the execution report.
            InboundEvent::streaming(EventBody::Order(executed)),
        ]
    }

    fn script_history(&self, id: RequestId, request: HistoryRequest) -> Vec<InboundEvent> {
        if !self.knows(&request.symbol) {
            return vec![InboundEvent::terminal(
                id,
                EventBody::Reject {
                    reason: format!("unknown symbol {}", request.symbol),
                },
            )];
        }
        let step = request.timeframe.step();
        let mut stamps = Vec::new();
        let mut at = request.from;
        while at < request.to && stamps.len() < MAX_CANDLES {
            stamps.push(at);
            at = at + step;
        }
        let last = stamps.len().saturating_sub(1);
        stamps
            .into_iter()
            .enumerate()
            .map(|(i, timestamp)| {
                let close = synth_price(&request.symbol, i as u64);
                InboundEvent {
                    correlation_id: Some(id.clone()),
                    is_final: i == last,
                    body: EventBody::Candle {
                        symbol: request.symbol.clone(),
                        timestamp,
                        candle: Candle {
                            open: close - 0.0005,
                            high: close + 0.0010,
                            low: close - 0.0010,
                            close,
                        },
                    },
                }
            })
            .collect()
    }
}

impl Default for SimGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GatewayAdapter for SimGateway {
    async fn connect(&self, credentials: &Credentials) -> Result<mpsc::Receiver<InboundEvent>> {
        if credentials.username.is_empty() || credentials.password.is_empty() {
            return Err(FxgateError::ConnectionFailed(
                "username and password required".into(),
            ));
        }
        let (tx, rx) = mpsc::channel(256);
        *self.events_tx.lock().await = Some(tx);
        Ok(rx)
    }

    async fn send(&self, request: OutboundRequest) -> Result<RequestId> {
        let tx = self
            .events_tx
            .lock()
            .await
            .clone()
            .ok_or(FxgateError::ChannelClosed)?;
        let id = RequestId::new(uuid::Uuid::new_v4().to_string());
        let events = self.script(id.clone(), request).await;
        let latency = self.latency;
        tokio::spawn(async move {
            sleep(latency).await;
            for event in events {
                if tx.send(event).await.is_err() {
                    break;
                }
            }
        });
        Ok(id)
    }

    async fn disconnect(&self) -> Result<()> {
        if let Some(tx) = self.events_tx.lock().await.take() {
            let _ = tx
                .send(InboundEvent::streaming(EventBody::Session(SessionStatus {
                    code: SessionStatusCode::Disconnected,
                    message: "logout requested".into(),
                })))
                .await;
        }
        Ok(())
    }
}

/// Deterministic pseudo-price so demos and tests are repeatable.
fn synth_price(symbol: &str, tick: u64) -> f64 {
    let mut hasher = DefaultHasher::new();
    symbol.hash(&mut hasher);
    let base = 0.8 + (hasher.finish() % 5_000) as f64 / 10_000.0;
    base + (tick % 10) as f64 * 0.0001
}
