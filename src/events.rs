use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque token linking a sent request to its response event(s).
///
/// Allocated by the gateway adapter when a request is handed to the
/// transport; the correlator only ever compares and hashes it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(String);

impl RequestId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Granularity of historical candle data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Timeframe {
    Tick,
    Minute,
    Hour,
    Day,
}

impl Timeframe {
    /// Nominal spacing between consecutive candles. Ticks have no fixed
    /// spacing; one second is used as the nominal step.
    pub fn step(&self) -> chrono::Duration {
        match self {
            Timeframe::Tick => chrono::Duration::seconds(1),
            Timeframe::Minute => chrono::Duration::minutes(1),
            Timeframe::Hour => chrono::Duration::hours(1),
            Timeframe::Day => chrono::Duration::days(1),
        }
    }
}

/// Trading account summary, one fragment of an account refresh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountReport {
    pub account_id: String,
    pub balance: f64,
    pub used_margin: f64,
}

/// A tradable instrument as reported by the gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instrument {
    pub symbol: String,
    /// Minimum order quantity in lots
    pub min_quantity: f64,
    /// Price increment of one point for this symbol
    pub point_size: f64,
    pub forex: bool,
}

impl Instrument {
    /// Contracts per lot. FX pairs trade in 10k-contract lots; everything
    /// else trades one contract per lot.
    pub fn contract_multiplier(&self) -> f64 {
        if self.forex {
            10_000.0
        } else {
            1.0
        }
    }

    /// Smallest order size in contracts.
    pub fn min_contract_quantity(&self) -> f64 {
        self.min_quantity * self.contract_multiplier()
    }
}

/// Latest dealing rate for one instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSnapshot {
    pub symbol: String,
    pub bid: f64,
    pub ask: f64,
    pub timestamp: DateTime<Utc>,
}

/// One OHLC bar of historical rate data.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

/// Lifecycle states an order moves through at the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderState {
    Waiting,
    Executing,
    InProcess,
    Executed,
    PendingCancel,
    Cancelled,
    Expired,
    Rejected,
    Requoted,
    DealerIntervention,
}

impl OrderState {
    /// States from which the order will never execute.
    pub fn is_negative(self) -> bool {
        matches!(
            self,
            OrderState::PendingCancel
                | OrderState::Cancelled
                | OrderState::Expired
                | OrderState::Rejected
                | OrderState::Requoted
                | OrderState::DealerIntervention
        )
    }
}

/// Execution/position report for one order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderStatus {
    pub order_id: String,
    pub symbol: String,
    pub state: OrderState,
    /// Position opened by this order, once known
    pub position_id: Option<String>,
    pub price: f64,
    pub quantity: f64,
    /// Gateway-provided detail, typically populated on negative states
    pub detail: Option<String>,
}

/// Session-level status codes reported by the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionStatusCode {
    Connecting,
    Connected,
    Disconnecting,
    Disconnected,
    Error,
}

/// Session status notice, either the login confirmation (correlated) or an
/// unsolicited transport notice (uncorrelated).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionStatus {
    pub code: SessionStatusCode,
    pub message: String,
}

impl SessionStatus {
    /// Whether this notice means the transport is going away. Every pending
    /// request must be failed when such a notice arrives uncorrelated.
    pub fn is_transport_failure(&self) -> bool {
        matches!(
            self.code,
            SessionStatusCode::Disconnecting
                | SessionStatusCode::Disconnected
                | SessionStatusCode::Error
        )
    }
}

/// Payload of an inbound event.
///
/// One variant per message shape the gateway can push; the router and the
/// correlator match on this exhaustively, so adding a variant is a
/// compile-time-visible change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EventBody {
    Account(AccountReport),
    Instruments(Vec<Instrument>),
    Price(PriceSnapshot),
    Candle {
        symbol: String,
        timestamp: DateTime<Utc>,
        candle: Candle,
    },
    Order(OrderStatus),
    Reject {
        reason: String,
    },
    Session(SessionStatus),
}

/// An event pushed by the gateway adapter.
///
/// `correlation_id` ties the event to an outstanding request; events without
/// one are streaming updates. `is_final` marks the last fragment of a
/// multi-fragment response and is meaningless on streaming events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundEvent {
    pub correlation_id: Option<RequestId>,
    pub is_final: bool,
    pub body: EventBody,
}

impl InboundEvent {
    /// A streaming update not tied to any request.
    pub fn streaming(body: EventBody) -> Self {
        Self {
            correlation_id: None,
            is_final: false,
            body,
        }
    }

    /// The terminal response (or response fragment) for a request.
    pub fn terminal(id: RequestId, body: EventBody) -> Self {
        Self {
            correlation_id: Some(id),
            is_final: true,
            body,
        }
    }

    /// A non-final fragment of a multi-fragment response.
    pub fn fragment(id: RequestId, body: EventBody) -> Self {
        Self {
            correlation_id: Some(id),
            is_final: false,
            body,
        }
    }
}
