use crate::config::Credentials;
use crate::error::Result;
use crate::events::{InboundEvent, RequestId, SessionStatus};
use crate::messages::OutboundRequest;
use async_trait::async_trait;
use tokio::sync::mpsc;

/// The transport collaborator behind which the proprietary gateway lives.
///
/// The adapter owns session transport, protocol encoding, and delivery of
/// inbound events; this crate only correlates and conflates what comes back.
///
/// Contract for implementations:
/// - `connect` yields the event stream for the session. Events stop when the
///   transport goes away (the sender side is dropped).
/// - `send` is fire-and-forget at the transport level: it must return once
///   the request is handed off, and must never wait for the event stream to
///   be consumed. The correlator relies on this to register the returned id
///   before processing any response.
#[async_trait]
pub trait GatewayAdapter: Send + Sync + 'static {
    /// Establish the transport session and return the inbound event stream.
    async fn connect(&self, credentials: &Credentials) -> Result<mpsc::Receiver<InboundEvent>>;

    /// Hand a request to the transport; completion is observed via events
    /// carrying the returned id.
    async fn send(&self, request: OutboundRequest) -> Result<RequestId>;

    /// Tear the session down. Pending requests are failed by the client, not
    /// the adapter.
    async fn disconnect(&self) -> Result<()>;
}

/// Receives status notices and undeliverable events as they arrive.
///
/// Called synchronously from the event pump; implementations must not block.
pub trait EventSink: Send + Sync {
    /// An uncorrelated session status notice arrived.
    fn on_status(&self, _status: &SessionStatus) {}

    /// An event had nowhere to go: no pending request claimed it and no
    /// conflated store holds its shape. Late duplicates land here too.
    fn on_unroutable(&self, _event: &InboundEvent) {}
}

/// Default sink that forwards everything to `tracing`.
#[derive(Debug, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn on_status(&self, status: &SessionStatus) {
        tracing::info!(code = ?status.code, message = %status.message, "session status");
    }

    fn on_unroutable(&self, event: &InboundEvent) {
        tracing::debug!(?event, "unroutable event dropped");
    }
}
