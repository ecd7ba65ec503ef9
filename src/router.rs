use crate::adapter::EventSink;
use crate::events::{Candle, EventBody, InboundEvent, OrderStatus, PriceSnapshot};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Latest-value store for one stream of keyed updates.
///
/// Last writer wins per key. Each store carries its own lock so unrelated
/// streams never serialize against each other; `snapshot` copies the current
/// contents out in key order, giving a restartable traversal that never holds
/// the lock across caller iteration.
pub struct ConflatedStore<K, V> {
    entries: RwLock<BTreeMap<K, V>>,
}

impl<K: Ord + Clone, V: Clone> ConflatedStore<K, V> {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(BTreeMap::new()),
        }
    }

    /// Insert or replace the value for `key`.
    pub async fn upsert(&self, key: K, value: V) {
        self.entries.write().await.insert(key, value);
    }

    pub async fn get(&self, key: &K) -> Option<V> {
        self.entries.read().await.get(key).cloned()
    }

    /// Current contents in ascending key order.
    pub async fn snapshot(&self) -> Vec<(K, V)> {
        self.entries
            .read()
            .await
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

impl<K: Ord + Clone, V: Clone> Default for ConflatedStore<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

/// Dispatches streaming events into keyed latest-value stores.
///
/// Quotes conflate by symbol, candles by timestamp, order reports by order
/// id. Session notices go to the sink and are never stored; anything else
/// that reaches the router uncorrelated (account fragments, rejects with no
/// waiter) is logged and handed to the sink.
pub struct EventRouter {
    quotes: ConflatedStore<String, PriceSnapshot>,
    history: ConflatedStore<DateTime<Utc>, Candle>,
    orders: ConflatedStore<String, OrderStatus>,
    sink: Arc<dyn EventSink>,
}

impl EventRouter {
    pub fn new(sink: Arc<dyn EventSink>) -> Self {
        Self {
            quotes: ConflatedStore::new(),
            history: ConflatedStore::new(),
            orders: ConflatedStore::new(),
            sink,
        }
    }

    pub async fn route(&self, event: InboundEvent) {
        let InboundEvent {
            correlation_id,
            is_final,
            body,
        } = event;
        match body {
            EventBody::Price(snapshot) => {
                self.quotes.upsert(snapshot.symbol.clone(), snapshot).await;
            }
            EventBody::Candle {
                timestamp, candle, ..
            } => {
                self.history.upsert(timestamp, candle).await;
            }
            EventBody::Order(status) => {
                self.orders.upsert(status.order_id.clone(), status).await;
            }
            EventBody::Session(status) => {
                self.sink.on_status(&status);
            }
            body @ (EventBody::Account(_) | EventBody::Instruments(_) | EventBody::Reject { .. }) => {
                let event = InboundEvent {
                    correlation_id,
                    is_final,
                    body,
                };
                tracing::debug!(?event, "event has no streaming home");
                self.sink.on_unroutable(&event);
            }
        }
    }

    pub fn quotes(&self) -> &ConflatedStore<String, PriceSnapshot> {
        &self.quotes
    }

    pub fn history(&self) -> &ConflatedStore<DateTime<Utc>, Candle> {
        &self.history
    }

    pub fn orders(&self) -> &ConflatedStore<String, OrderStatus> {
        &self.orders
    }
}
