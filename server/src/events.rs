//! Backend event bus.
//!
//! One subscription per connection, on the channel named after the bound
//! object. Messages arrive already decoded and are handed to the relay in
//! publish order. Teardown consumes the subscription handle, so a session
//! cannot unsubscribe twice or from the wrong channel.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use futures::StreamExt;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot, Mutex};
use tracing::{debug, warn};

use crate::ws::channels::StreamTopic;

/// Buffered events per subscription before the publisher side blocks.
const EVENT_BUFFER: usize = 64;

/// Global subscription ID counter.
static SUBSCRIPTION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

fn next_subscription_id() -> u64 {
    SUBSCRIPTION_ID_COUNTER.fetch_add(1, Ordering::Relaxed)
}

/// Event bus errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum BusError {
    /// Could not reach the broker.
    #[error("broker connection failed: {0}")]
    Connect(String),

    /// Subscribe command failed.
    #[error("subscribe failed: {0}")]
    Subscribe(String),
}

/// A live subscription on one channel.
///
/// Yields decoded messages in publish order until the backend closes the
/// channel. The handle carries the channel name it was opened with; passing
/// it back to [`EventBus::unsubscribe`] releases exactly that channel.
#[derive(Debug)]
pub struct EventSubscription {
    id: u64,
    topic: String,
    events: mpsc::Receiver<Value>,
    stop: Option<oneshot::Sender<()>>,
}

impl EventSubscription {
    /// Returns the channel name this subscription was opened with.
    #[must_use]
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Receives the next event, or `None` once the channel has ended.
    pub async fn next(&mut self) -> Option<Value> {
        self.events.recv().await
    }
}

/// Publish/subscribe transport consumed by the relay.
#[async_trait]
pub trait EventBus: Send + Sync {
    /// Opens a subscription on the topic's channel.
    ///
    /// # Errors
    ///
    /// Returns an error when the broker is unreachable or rejects the
    /// subscribe command.
    async fn subscribe(&self, topic: &StreamTopic) -> Result<EventSubscription, BusError>;

    /// Releases a subscription, unsubscribing from the exact channel the
    /// handle was opened with.
    ///
    /// # Errors
    ///
    /// Returns an error when the broker rejects the release.
    async fn unsubscribe(&self, subscription: EventSubscription) -> Result<(), BusError>;
}

/// Redis-backed event bus.
///
/// Each subscription gets a dedicated pub/sub connection; a pump task decodes
/// payloads and feeds the subscription queue until the connection ends or the
/// subscription is released.
#[derive(Debug, Clone)]
pub struct RedisEventBus {
    client: redis::Client,
}

impl RedisEventBus {
    /// Creates a bus for the broker at `url`.
    ///
    /// # Errors
    ///
    /// Returns an error when the URL cannot be parsed.
    pub fn new(url: &str) -> Result<Self, BusError> {
        let client = redis::Client::open(url).map_err(|err| BusError::Connect(err.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl EventBus for RedisEventBus {
    async fn subscribe(&self, topic: &StreamTopic) -> Result<EventSubscription, BusError> {
        let mut pubsub = self
            .client
            .get_async_pubsub()
            .await
            .map_err(|err| BusError::Connect(err.to_string()))?;

        let channel = topic.to_string();
        pubsub
            .subscribe(&channel)
            .await
            .map_err(|err| BusError::Subscribe(err.to_string()))?;

        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();
        let pump_channel = channel.clone();

        tokio::spawn(async move {
            {
                let mut messages = pubsub.on_message();
                loop {
                    tokio::select! {
                        _ = &mut stop_rx => break,
                        msg = messages.next() => {
                            let Some(msg) = msg else { break };
                            let payload: String = match msg.get_payload() {
                                Ok(payload) => payload,
                                Err(err) => {
                                    warn!(channel = %pump_channel, error = %err, "unreadable payload");
                                    continue;
                                }
                            };
                            match serde_json::from_str::<Value>(&payload) {
                                Ok(value) => {
                                    if tx.send(value).await.is_err() {
                                        break;
                                    }
                                }
                                Err(err) => {
                                    warn!(channel = %pump_channel, error = %err, "dropping non-JSON payload");
                                }
                            }
                        }
                    }
                }
            }
            if let Err(err) = pubsub.unsubscribe(&pump_channel).await {
                debug!(channel = %pump_channel, error = %err, "unsubscribe on closed connection");
            }
        });

        Ok(EventSubscription {
            id: next_subscription_id(),
            topic: channel,
            events: rx,
            stop: Some(stop_tx),
        })
    }

    async fn unsubscribe(&self, mut subscription: EventSubscription) -> Result<(), BusError> {
        if let Some(stop) = subscription.stop.take() {
            let _ = stop.send(());
        }
        Ok(())
    }
}

/// In-process event bus.
///
/// Serves as the broker when no Redis URL is configured and as the test
/// double for relay and teardown behavior.
#[derive(Debug, Default)]
pub struct MemoryEventBus {
    topics: Mutex<HashMap<String, HashMap<u64, mpsc::Sender<Value>>>>,
    unsubscribed: Mutex<Vec<String>>,
}

impl MemoryEventBus {
    /// Creates an empty bus.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Publishes a message to every subscriber of `channel`.
    ///
    /// Returns the number of subscribers the message was delivered to.
    pub async fn publish(&self, channel: &str, message: Value) -> usize {
        let mut topics = self.topics.lock().await;
        let Some(subscribers) = topics.get_mut(channel) else {
            return 0;
        };

        let mut delivered = 0;
        let mut dead = Vec::new();
        for (id, sender) in subscribers.iter() {
            if sender.send(message.clone()).await.is_ok() {
                delivered += 1;
            } else {
                dead.push(*id);
            }
        }
        for id in dead {
            subscribers.remove(&id);
        }
        delivered
    }

    /// Returns the number of live subscribers on `channel`.
    pub async fn subscriber_count(&self, channel: &str) -> usize {
        let topics = self.topics.lock().await;
        topics.get(channel).map(HashMap::len).unwrap_or(0)
    }

    /// Ends `channel` from the broker side: every open subscription on it
    /// sees its stream finish.
    pub async fn close_channel(&self, channel: &str) {
        self.topics.lock().await.remove(channel);
    }

    /// Returns the channels released so far, in release order.
    pub async fn unsubscribed_channels(&self) -> Vec<String> {
        self.unsubscribed.lock().await.clone()
    }
}

#[async_trait]
impl EventBus for MemoryEventBus {
    async fn subscribe(&self, topic: &StreamTopic) -> Result<EventSubscription, BusError> {
        let channel = topic.to_string();
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let id = next_subscription_id();

        let mut topics = self.topics.lock().await;
        topics.entry(channel.clone()).or_default().insert(id, tx);

        Ok(EventSubscription {
            id,
            topic: channel,
            events: rx,
            stop: None,
        })
    }

    async fn unsubscribe(&self, subscription: EventSubscription) -> Result<(), BusError> {
        let mut topics = self.topics.lock().await;
        if let Some(subscribers) = topics.get_mut(&subscription.topic) {
            subscribers.remove(&subscription.id);
            if subscribers.is_empty() {
                topics.remove(&subscription.topic);
            }
        }
        drop(topics);

        self.unsubscribed
            .lock()
            .await
            .push(subscription.topic.clone());
        Ok(())
    }
}
