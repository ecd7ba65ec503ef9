use crate::adapter::GatewayAdapter;
use crate::error::{FxgateError, Result};
use crate::events::{EventBody, InboundEvent, RequestId};
use crate::messages::OutboundRequest;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use tokio::sync::{oneshot, Mutex};
use tokio::time::{timeout, Duration};

/// How a request's response arrives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    /// The first matching event is terminal
    Simple,
    /// Fragments accumulate until one arrives with the final flag set
    MultiFragment,
}

/// Accumulated response for one correlated request.
///
/// Always holds at least the terminal event; multi-fragment responses also
/// carry the non-final fragments in arrival order.
#[derive(Debug)]
pub struct Response {
    fragments: Vec<InboundEvent>,
    terminal: InboundEvent,
}

impl Response {
    /// Non-final fragments in arrival order, excluding the terminal event.
    pub fn fragments(&self) -> &[InboundEvent] {
        &self.fragments
    }

    /// The event that completed the request.
    pub fn terminal(&self) -> &InboundEvent {
        &self.terminal
    }

    /// All events in arrival order, terminal last.
    pub fn into_events(self) -> Vec<InboundEvent> {
        let mut events = self.fragments;
        events.push(self.terminal);
        events
    }

    /// Consume the response, keeping only the terminal event.
    pub fn into_terminal(self) -> InboundEvent {
        self.terminal
    }
}

struct PendingRequest {
    kind: RequestKind,
    fragments: Vec<InboundEvent>,
    done: oneshot::Sender<Result<Response>>,
}

/// Maps outstanding request ids to waiting callers.
///
/// Each pending request owns its own completion slot, so any number of
/// requests may be in flight concurrently; correlation uses the id alone,
/// never arrival order. Exactly one waiter is released per completed request.
pub struct Correlator {
    pending: Mutex<HashMap<RequestId, PendingRequest>>,
}

impl Default for Correlator {
    fn default() -> Self {
        Self::new()
    }
}

impl Correlator {
    pub fn new() -> Self {
        Self {
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// Send a request through the adapter and wait for its terminal event.
    ///
    /// Fails with `Timeout` when no terminal event arrives within `deadline`
    /// (deregistering the entry so a late event is dropped harmlessly), with
    /// `Rejected` when a reject event references the request, and with
    /// `Transport` when the session drops while the request is outstanding.
    pub async fn submit<A: GatewayAdapter>(
        &self,
        adapter: &A,
        request: OutboundRequest,
        kind: RequestKind,
        deadline: Duration,
    ) -> Result<Response> {
        // The table lock is held across the send so the response cannot race
        // registration. The adapter contract keeps send independent of event
        // consumption, so this cannot deadlock.
        let (id, rx) = {
            let mut pending = self.pending.lock().await;
            let id = adapter.send(request).await?;
            let (tx, rx) = oneshot::channel();
            pending.insert(
                id.clone(),
                PendingRequest {
                    kind,
                    fragments: Vec::new(),
                    done: tx,
                },
            );
            (id, rx)
        };

        match timeout(deadline, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(FxgateError::ChannelClosed),
            Err(_) => {
                self.deregister(&id).await;
                Err(FxgateError::Timeout)
            }
        }
    }

    /// Register a pending entry directly and return the receiver the caller
    /// waits on. `submit` is the usual entry point; this exists for callers
    /// that drive the wait themselves.
    pub async fn register(
        &self,
        id: RequestId,
        kind: RequestKind,
    ) -> oneshot::Receiver<Result<Response>> {
        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(
            id,
            PendingRequest {
                kind,
                fragments: Vec::new(),
                done: tx,
            },
        );
        rx
    }

    /// Drop the entry for a request whose caller gave up waiting.
    pub async fn deregister(&self, id: &RequestId) {
        if self.pending.lock().await.remove(id).is_some() {
            tracing::debug!(request = %id, "deregistered pending request");
        }
    }

    /// Consume an event if a pending request claims it.
    ///
    /// Returns the event back when nothing is waiting on it, so the caller
    /// can route it as streaming data. An event whose id matches an
    /// already-resolved request comes back the same way and never touches
    /// any other pending request.
    pub async fn on_event(&self, event: InboundEvent) -> Option<InboundEvent> {
        let id = match &event.correlation_id {
            Some(id) => id.clone(),
            None => return Some(event),
        };

        let mut pending = self.pending.lock().await;
        match pending.entry(id) {
            Entry::Occupied(mut entry) => {
                // A reject referencing the request is terminal regardless of
                // the fragment flag.
                if let EventBody::Reject { reason } = &event.body {
                    let reason = reason.clone();
                    let req = entry.remove();
                    Self::resolve(req.done, Err(FxgateError::Rejected { reason }));
                    return None;
                }
                let terminal = event.is_final || entry.get().kind == RequestKind::Simple;
                if terminal {
                    let req = entry.remove();
                    let response = Response {
                        fragments: req.fragments,
                        terminal: event,
                    };
                    Self::resolve(req.done, Ok(response));
                } else {
                    entry.get_mut().fragments.push(event);
                }
                None
            }
            Entry::Vacant(_) => Some(event),
        }
    }

    /// Resolve every outstanding request with a transport error. Called when
    /// the session drops so no waiter is left to hang.
    pub async fn fail_all(&self) {
        let mut pending = self.pending.lock().await;
        for (id, req) in pending.drain() {
            tracing::debug!(request = %id, "failing pending request on transport loss");
            Self::resolve(req.done, Err(FxgateError::Transport));
        }
    }

    /// Number of requests currently waiting.
    pub async fn outstanding(&self) -> usize {
        self.pending.lock().await.len()
    }

    fn resolve(done: oneshot::Sender<Result<Response>>, result: Result<Response>) {
        // The caller may have raced a timeout with this resolution; the
        // dropped receiver is the deregistration in that case.
        if done.send(result).is_err() {
            tracing::debug!("waiter gone before resolution");
        }
    }
}
