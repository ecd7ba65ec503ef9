#![doc = include_str!("../README.md")]
#![warn(rustdoc::broken_intra_doc_links)]
pub mod adapter;
pub mod client;
pub mod config;
pub mod correlator;
pub mod error;
pub mod events;
pub mod messages;
pub mod router;
pub mod session;
pub mod sim;

pub use adapter::{EventSink, GatewayAdapter, TracingSink};
pub use client::GatewayClient;
pub use config::{ClientConfig, Credentials};
pub use correlator::{Correlator, RequestKind, Response};
pub use error::{FxgateError, Result};
pub use events::{
    AccountReport, Candle, EventBody, InboundEvent, Instrument, OrderState, OrderStatus,
    PriceSnapshot, RequestId, SessionStatus, SessionStatusCode, Timeframe,
};
pub use messages::{HistoryRequest, MarketOrder, OutboundRequest, Side, TimeInForce};
pub use router::{ConflatedStore, EventRouter};
pub use session::SessionState;
