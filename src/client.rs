use crate::adapter::{EventSink, GatewayAdapter, TracingSink};
use crate::config::ClientConfig;
use crate::correlator::{Correlator, RequestKind, Response};
use crate::error::{FxgateError, Result};
use crate::events::{
    AccountReport, Candle, EventBody, InboundEvent, Instrument, OrderStatus, PriceSnapshot,
    SessionStatus,
};
use crate::messages::{HistoryRequest, MarketOrder, OutboundRequest};
use crate::router::EventRouter;
use crate::session::{SessionState, SessionTracker};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Synchronous-style client over an asynchronous gateway adapter.
///
/// Owns the correlator, the conflating router, and the event pump that feeds
/// them. Correlated calls go through [`submit`](Self::submit) (or the typed
/// conveniences); streaming data is read back through the store views.
pub struct GatewayClient<A: GatewayAdapter> {
    adapter: Arc<A>,
    config: ClientConfig,
    correlator: Arc<Correlator>,
    router: Arc<EventRouter>,
    session: Arc<SessionTracker>,
    pump: Option<JoinHandle<()>>,
}

impl<A: GatewayAdapter> GatewayClient<A> {
    pub fn new(adapter: A, config: ClientConfig) -> Self {
        Self::with_sink(adapter, config, Arc::new(TracingSink))
    }

    /// Build a client whose status notices and undeliverable events go to
    /// `sink` instead of the default tracing sink.
    pub fn with_sink(adapter: A, config: ClientConfig, sink: Arc<dyn EventSink>) -> Self {
        Self {
            adapter: Arc::new(adapter),
            config,
            correlator: Arc::new(Correlator::new()),
            router: Arc::new(EventRouter::new(sink)),
            session: Arc::new(SessionTracker::new()),
            pump: None,
        }
    }

    /// Connect the transport and confirm the trading session.
    ///
    /// The confirmation is itself a correlated call whose terminal event is a
    /// [`SessionStatus`], so login gets the same timeout and rejection
    /// semantics as any other request.
    pub async fn login(&mut self) -> Result<SessionStatus> {
        self.session.set(SessionState::Connecting).await;
        let events = match self.adapter.connect(&self.config.credentials).await {
            Ok(events) => events,
            Err(e) => {
                self.session.set(SessionState::Disconnected).await;
                return Err(e);
            }
        };
        self.spawn_pump(events);

        let confirmed = self
            .submit(
                OutboundRequest::SessionStatus,
                false,
                self.config.login_timeout,
            )
            .await;
        match confirmed {
            Ok(response) => match response.into_terminal().body {
                EventBody::Session(status) if status.is_transport_failure() => {
                    self.session.set(SessionState::Disconnected).await;
                    Err(FxgateError::ConnectionFailed(status.message))
                }
                EventBody::Session(status) => {
                    self.session.set(SessionState::Connected).await;
                    Ok(status)
                }
                other => {
                    self.session.set(SessionState::Disconnected).await;
                    Err(FxgateError::Session(format!(
                        "unexpected login confirmation: {other:?}"
                    )))
                }
            },
            Err(e) => {
                self.session.set(SessionState::Disconnected).await;
                Err(e)
            }
        }
    }

    /// Tear the session down. Every outstanding request resolves with a
    /// transport error rather than hanging.
    pub async fn logout(&mut self) -> Result<()> {
        self.session.set(SessionState::Disconnected).await;
        let result = self.adapter.disconnect().await;
        self.correlator.fail_all().await;
        if let Some(pump) = self.pump.take() {
            pump.abort();
        }
        result
    }

    /// Correlated request/response call.
    ///
    /// Sends `request`, waits up to `deadline` for its terminal event, and
    /// returns the accumulated response. `multi_fragment` marks requests
    /// whose response arrives in parts terminated by a final-flagged event;
    /// [`OutboundRequest::multi_fragment`] gives the right value for the
    /// built-in vocabulary.
    pub async fn submit(
        &self,
        request: OutboundRequest,
        multi_fragment: bool,
        deadline: Duration,
    ) -> Result<Response> {
        self.session.require_active().await?;
        let kind = if multi_fragment {
            RequestKind::MultiFragment
        } else {
            RequestKind::Simple
        };
        self.correlator
            .submit(self.adapter.as_ref(), request, kind, deadline)
            .await
    }

    /// Refresh and return all account reports under the login.
    pub async fn accounts(&self) -> Result<Vec<AccountReport>> {
        let response = self
            .submit(
                OutboundRequest::AccountList,
                true,
                self.config.request_timeout,
            )
            .await?;
        let accounts = response
            .into_events()
            .into_iter()
            .filter_map(|event| match event.body {
                EventBody::Account(report) => Some(report),
                _ => None,
            })
            .collect();
        Ok(accounts)
    }

    /// Fetch the list of tradable instruments.
    pub async fn instruments(&self) -> Result<Vec<Instrument>> {
        let response = self
            .submit(
                OutboundRequest::InstrumentList,
                false,
                self.config.request_timeout,
            )
            .await?;
        match response.into_terminal().body {
            EventBody::Instruments(instruments) => Ok(instruments),
            other => Err(FxgateError::Session(format!(
                "unexpected instrument response: {other:?}"
            ))),
        }
    }

    /// Place a market order and wait for its execution report.
    ///
    /// A gateway-side reject resolves as `Err(Rejected)`; an order that
    /// reaches the gateway but dies there comes back `Ok` in a negative
    /// [`OrderState`](crate::events::OrderState) for the caller to inspect.
    pub async fn place_market_order(&self, order: MarketOrder) -> Result<OrderStatus> {
        let response = self
            .submit(
                OutboundRequest::Order(order),
                false,
                self.config.request_timeout,
            )
            .await?;
        match response.into_terminal().body {
            EventBody::Order(status) => Ok(status),
            other => Err(FxgateError::Session(format!(
                "unexpected order response: {other:?}"
            ))),
        }
    }

    /// Pull historical candles into the time-keyed store.
    ///
    /// Fragments conflate by timestamp, so re-fetching an overlapping range
    /// overwrites rather than duplicates. Returns the number of candles
    /// captured from this response.
    pub async fn fetch_history(&self, request: HistoryRequest) -> Result<usize> {
        let response = self
            .submit(
                OutboundRequest::History(request),
                true,
                self.config.request_timeout,
            )
            .await?;
        let mut captured = 0;
        for event in response.into_events() {
            if let EventBody::Candle {
                timestamp, candle, ..
            } = event.body
            {
                self.router.history().upsert(timestamp, candle).await;
                captured += 1;
            }
        }
        Ok(captured)
    }

    /// Subscribe to live quotes for one symbol.
    ///
    /// The first snapshot answers the subscription and is returned; later
    /// updates arrive uncorrelated and conflate into the quote store. The
    /// returned snapshot is deliberately not written to the store, since a
    /// streaming update may already have passed it.
    pub async fn subscribe(&self, symbol: impl Into<String>) -> Result<PriceSnapshot> {
        let response = self
            .submit(
                OutboundRequest::Subscribe {
                    symbol: symbol.into(),
                },
                false,
                self.config.request_timeout,
            )
            .await?;
        match response.into_terminal().body {
            EventBody::Price(snapshot) => Ok(snapshot),
            other => Err(FxgateError::Session(format!(
                "unexpected subscription response: {other:?}"
            ))),
        }
    }

    /// Latest known dealing rate for `symbol`, if any update has arrived.
    pub async fn latest_quote(&self, symbol: &str) -> Option<PriceSnapshot> {
        self.router.quotes().get(&symbol.to_string()).await
    }

    /// Time-ordered view of the captured candle history.
    pub async fn history_snapshot(&self) -> Vec<(DateTime<Utc>, Candle)> {
        self.router.history().snapshot().await
    }

    /// Latest execution/position report seen for `order_id`.
    pub async fn latest_order_status(&self, order_id: &str) -> Option<OrderStatus> {
        self.router.orders().get(&order_id.to_string()).await
    }

    /// Latest report per order, in order-id order.
    pub async fn order_statuses(&self) -> Vec<(String, OrderStatus)> {
        self.router.orders().snapshot().await
    }

    pub async fn state(&self) -> SessionState {
        self.session.get().await
    }

    fn spawn_pump(&mut self, events: mpsc::Receiver<InboundEvent>) {
        if let Some(old) = self.pump.take() {
            old.abort();
        }
        let correlator = Arc::clone(&self.correlator);
        let router = Arc::clone(&self.router);
        let session = Arc::clone(&self.session);
        self.pump = Some(tokio::spawn(pump(events, correlator, router, session)));
    }
}

/// Drains the adapter's event stream for the life of the session.
///
/// Runs concurrently with caller tasks blocked in `submit`; all shared state
/// sits behind the correlator's table lock and the per-store locks.
async fn pump(
    mut events: mpsc::Receiver<InboundEvent>,
    correlator: Arc<Correlator>,
    router: Arc<EventRouter>,
    session: Arc<SessionTracker>,
) {
    while let Some(event) = events.recv().await {
        // An uncorrelated transport-failure notice fails every outstanding
        // request before anything else sees the event.
        if let EventBody::Session(status) = &event.body {
            if event.correlation_id.is_none() && status.is_transport_failure() {
                tracing::warn!(code = ?status.code, message = %status.message, "transport failure notice");
                session.set(SessionState::Disconnected).await;
                correlator.fail_all().await;
                router.route(event).await;
                continue;
            }
        }
        if let Some(unclaimed) = correlator.on_event(event).await {
            router.route(unclaimed).await;
        }
    }
    // Stream ended without a notice; nothing further can resolve.
    tracing::debug!("event stream closed");
    session.set(SessionState::Disconnected).await;
    correlator.fail_all().await;
}
