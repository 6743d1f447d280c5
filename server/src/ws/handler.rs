//! WebSocket endpoint handlers.
//!
//! One handler per registered endpoint kind. Each builds the validated
//! connection parameters, upgrades the socket, and drives the shared flow:
//! admit, apply the decision, then relay until the connection ends.

use std::sync::Arc;

use axum::extract::ws::{CloseFrame, Message, Utf8Bytes, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::state::AppState;

use super::gatekeeper::{self, Admission, ConnectParams};
use super::messages::close_code;
use super::policy::EndpointPolicy;
use super::relay;

/// Query parameters accepted on notification endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotifyQuery {
    /// Access token, required on auth-gated endpoints.
    pub token: Option<String>,
}

/// Upgrade handler for `/ws/wallets/{model_id}`.
pub async fn wallet_ws(
    ws: WebSocketUpgrade,
    Path(model_id): Path<String>,
    Query(query): Query<NotifyQuery>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let params = ConnectParams {
        object_id: Some(model_id),
        token: query.token,
    };
    ws.on_upgrade(move |socket| serve(socket, state, EndpointPolicy::wallet(), params))
}

/// Upgrade handler for `/ws/invoices/{model_id}`.
pub async fn invoice_ws(
    ws: WebSocketUpgrade,
    Path(model_id): Path<String>,
    Query(query): Query<NotifyQuery>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let params = ConnectParams {
        object_id: Some(model_id),
        token: query.token,
    };
    ws.on_upgrade(move |socket| serve(socket, state, EndpointPolicy::invoice(), params))
}

/// Drives one accepted connection from admission to teardown.
async fn serve(
    mut socket: WebSocket,
    state: AppState,
    policy: EndpointPolicy,
    params: ConnectParams,
) {
    state.metrics.record_connection_opened();

    match gatekeeper::admit(&state, &policy, &params).await {
        Admission::Rejected(rejection) => {
            debug!(endpoint = policy.kind.as_str(), reason = %rejection, "connection rejected");
            state.metrics.record_rejection();
            close(&mut socket, close_code::POLICY_VIOLATION).await;
        }
        Admission::ShortCircuit(payload) => {
            state.metrics.record_short_circuit();
            match serde_json::to_string(&payload) {
                Ok(text) => {
                    if socket.send(Message::Text(text.into())).await.is_ok() {
                        close(&mut socket, close_code::NORMAL).await;
                    }
                }
                Err(err) => {
                    warn!(endpoint = policy.kind.as_str(), error = %err, "unserializable terminal payload");
                    close(&mut socket, close_code::POLICY_VIOLATION).await;
                }
            }
        }
        Admission::Admitted(session) => {
            match state.bus.subscribe(session.topic()).await {
                Ok(subscription) => {
                    info!(channel = %session.topic(), "notification stream opened");
                    state.metrics.record_subscription();
                    relay::run(
                        socket,
                        subscription,
                        Arc::clone(&state.bus),
                        Arc::clone(&state.metrics),
                    )
                    .await;
                    info!(channel = %session.topic(), "notification stream closed");
                }
                Err(err) => {
                    warn!(channel = %session.topic(), error = %err, "backend subscribe failed");
                    state.metrics.record_error();
                    close(&mut socket, close_code::POLICY_VIOLATION).await;
                }
            }
        }
    }

    state.metrics.record_connection_closed();
}

async fn close(socket: &mut WebSocket, code: u16) {
    let frame = CloseFrame {
        code,
        reason: Utf8Bytes::from_static(""),
    };
    let _ = socket.send(Message::Close(Some(frame))).await;
}
