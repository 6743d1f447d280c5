//! Subscription relay.
//!
//! Forwards every event a backend subscription yields to the client socket,
//! verbatim and in arrival order, while watching the socket for disconnect.
//! Both waits live in one `select!`, so a disconnect is observable even when
//! the backend channel is idle. Whichever way the loop exits, the
//! subscription handle is consumed by exactly one unsubscribe.

use std::sync::Arc;

use axum::extract::ws::{CloseFrame, Message, Utf8Bytes};
use futures::{Sink, SinkExt, Stream, StreamExt};
use tracing::{debug, warn};

use crate::events::{EventBus, EventSubscription};

use super::messages::close_code;
use super::metrics::WsMetrics;

enum Exit {
    ClientGone,
    StreamEnded,
}

/// Runs the relay loop until the client disconnects or the backend ends the
/// channel, then releases the subscription.
pub async fn run<S>(
    socket: S,
    mut subscription: EventSubscription,
    bus: Arc<dyn EventBus>,
    metrics: Arc<WsMetrics>,
) where
    S: Stream<Item = Result<Message, axum::Error>> + Sink<Message>,
{
    let (mut sender, mut receiver) = socket.split();

    let exit = loop {
        tokio::select! {
            event = subscription.next() => match event {
                Some(payload) => {
                    let text = match serde_json::to_string(&payload) {
                        Ok(text) => text,
                        Err(err) => {
                            warn!(channel = subscription.topic(), error = %err, "unserializable event");
                            continue;
                        }
                    };
                    if sender.send(Message::Text(text.into())).await.is_err() {
                        break Exit::ClientGone;
                    }
                    metrics.record_message_forwarded();
                }
                None => break Exit::StreamEnded,
            },
            frame = receiver.next() => match frame {
                Some(Ok(Message::Close(_))) | None => break Exit::ClientGone,
                Some(Ok(Message::Ping(data))) => {
                    let _ = sender.send(Message::Pong(data)).await;
                }
                Some(Ok(_)) => {}
                Some(Err(err)) => {
                    debug!(channel = subscription.topic(), error = %err, "socket error");
                    break Exit::ClientGone;
                }
            },
        }
    };

    if matches!(exit, Exit::StreamEnded) {
        debug!(channel = subscription.topic(), "backend channel ended");
        let frame = CloseFrame {
            code: close_code::NORMAL,
            reason: Utf8Bytes::from_static(""),
        };
        let _ = sender.send(Message::Close(Some(frame))).await;
    }

    let channel = subscription.topic().to_string();
    match bus.unsubscribe(subscription).await {
        Ok(()) => {
            metrics.record_unsubscription();
            debug!(channel = %channel, "unsubscribed");
        }
        Err(err) => warn!(channel = %channel, error = %err, "unsubscribe failed"),
    }
}
