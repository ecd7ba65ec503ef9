use crate::error::{FxgateError, Result};
use crate::events::{OrderStatus, Timeframe};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Direction of an order relative to the market.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn opposite(self) -> Side {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

/// How long an order stays working at the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeInForce {
    FillOrKill,
    ImmediateOrCancel,
    GoodTillCancel,
}

/// A market order, open or close.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketOrder {
    pub account_id: String,
    pub symbol: String,
    pub side: Side,
    /// Quantity in contracts
    pub quantity: f64,
    pub time_in_force: TimeInForce,
    /// Free text carried through to execution reports
    pub text: String,
}

impl MarketOrder {
    pub fn builder() -> MarketOrderBuilder {
        MarketOrderBuilder::default()
    }

    /// An order that flattens the position reported by `status`: same symbol
    /// and quantity, opposite side.
    pub fn closing(account_id: impl Into<String>, status: &OrderStatus, side_opened: Side) -> Self {
        Self {
            account_id: account_id.into(),
            symbol: status.symbol.clone(),
            side: side_opened.opposite(),
            quantity: status.quantity,
            time_in_force: TimeInForce::FillOrKill,
            text: format!("close {}", status.order_id),
        }
    }
}

/// Builder for [`MarketOrder`] with missing-field validation.
#[derive(Debug, Default)]
pub struct MarketOrderBuilder {
    account_id: Option<String>,
    symbol: Option<String>,
    side: Option<Side>,
    quantity: Option<f64>,
    time_in_force: Option<TimeInForce>,
    text: Option<String>,
}

impl MarketOrderBuilder {
    pub fn account_id(mut self, v: impl Into<String>) -> Self {
        self.account_id = Some(v.into());
        self
    }
    pub fn symbol(mut self, v: impl Into<String>) -> Self {
        self.symbol = Some(v.into());
        self
    }
    pub fn side(mut self, v: Side) -> Self {
        self.side = Some(v);
        self
    }
    pub fn quantity(mut self, v: f64) -> Self {
        self.quantity = Some(v);
        self
    }
    pub fn time_in_force(mut self, v: TimeInForce) -> Self {
        self.time_in_force = Some(v);
        self
    }
    pub fn text(mut self, v: impl Into<String>) -> Self {
        self.text = Some(v.into());
        self
    }

    pub fn build(self) -> Result<MarketOrder> {
        let quantity = self
            .quantity
            .ok_or_else(|| FxgateError::InvalidConfig("quantity missing".into()))?;
        if quantity <= 0.0 {
            return Err(FxgateError::InvalidConfig(
                "quantity must be positive".into(),
            ));
        }
        Ok(MarketOrder {
            account_id: self
                .account_id
                .ok_or_else(|| FxgateError::InvalidConfig("account_id missing".into()))?,
            symbol: self
                .symbol
                .ok_or_else(|| FxgateError::InvalidConfig("symbol missing".into()))?,
            side: self
                .side
                .ok_or_else(|| FxgateError::InvalidConfig("side missing".into()))?,
            quantity,
            time_in_force: self.time_in_force.unwrap_or(TimeInForce::FillOrKill),
            text: self.text.unwrap_or_else(|| Uuid::new_v4().to_string()),
        })
    }
}

/// A request for historical OHLC data over a UTC range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRequest {
    pub symbol: String,
    pub timeframe: Timeframe,
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl HistoryRequest {
    pub fn builder() -> HistoryRequestBuilder {
        HistoryRequestBuilder::default()
    }
}

/// Builder for [`HistoryRequest`] with range validation.
#[derive(Debug, Default)]
pub struct HistoryRequestBuilder {
    symbol: Option<String>,
    timeframe: Option<Timeframe>,
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
}

impl HistoryRequestBuilder {
    pub fn symbol(mut self, v: impl Into<String>) -> Self {
        self.symbol = Some(v.into());
        self
    }
    pub fn timeframe(mut self, v: Timeframe) -> Self {
        self.timeframe = Some(v);
        self
    }
    pub fn from(mut self, v: DateTime<Utc>) -> Self {
        self.from = Some(v);
        self
    }
    pub fn to(mut self, v: DateTime<Utc>) -> Self {
        self.to = Some(v);
        self
    }

    pub fn build(self) -> Result<HistoryRequest> {
        let from = self
            .from
            .ok_or_else(|| FxgateError::InvalidConfig("from missing".into()))?;
        let to = self
            .to
            .ok_or_else(|| FxgateError::InvalidConfig("to missing".into()))?;
        if from >= to {
            return Err(FxgateError::InvalidConfig(
                "history range must start before it ends".into(),
            ));
        }
        Ok(HistoryRequest {
            symbol: self
                .symbol
                .ok_or_else(|| FxgateError::InvalidConfig("symbol missing".into()))?,
            timeframe: self
                .timeframe
                .ok_or_else(|| FxgateError::InvalidConfig("timeframe missing".into()))?,
            from,
            to,
        })
    }
}

/// Everything the client can ask the gateway for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OutboundRequest {
    /// Trading-session status confirmation; the terminal event is a
    /// [`SessionStatus`](crate::events::SessionStatus). Sent as part of login.
    SessionStatus,
    /// Refresh of all account reports under the login; multi-fragment
    AccountList,
    /// List of tradable instruments
    InstrumentList,
    /// Market order, open or close
    Order(MarketOrder),
    /// Historical candles; multi-fragment
    History(HistoryRequest),
    /// Live quote subscription for one symbol; the terminal event is the
    /// first snapshot, further updates arrive uncorrelated
    Subscribe { symbol: String },
}

impl OutboundRequest {
    /// Whether the response arrives as multiple fragments sharing one
    /// correlation id, terminated by a final-flagged event.
    pub fn multi_fragment(&self) -> bool {
        matches!(
            self,
            OutboundRequest::AccountList | OutboundRequest::History(_)
        )
    }
}
