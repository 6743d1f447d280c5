//! HTTP server and route registration.

use axum::routing::get;
use axum::{Json, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::ServerConfig;
use crate::state::AppState;
use crate::ws::handler;

/// The notification bridge server.
pub struct Server {
    config: ServerConfig,
    state: AppState,
}

impl Server {
    /// Creates a server from its configuration and state.
    #[must_use]
    pub fn new(config: ServerConfig, state: AppState) -> Self {
        Self { config, state }
    }

    /// Builds the router with every registered endpoint.
    #[must_use]
    pub fn router(state: AppState) -> Router {
        Router::new()
            .route("/health", get(health))
            .route("/ws/wallets/{model_id}", get(handler::wallet_ws))
            .route("/ws/invoices/{model_id}", get(handler::invoice_ws))
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive())
            .with_state(state)
    }

    /// Binds and serves until the process is stopped.
    ///
    /// # Errors
    ///
    /// Returns an error if binding or serving fails.
    pub async fn run(self) -> std::io::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.config.bind_addr()).await?;
        info!("listening on {}", self.config.bind_addr());
        axum::serve(listener, Self::router(self.state)).await
    }
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{AuthError, Authorizer};
    use crate::events::MemoryEventBus;
    use crate::model::{BoundObject, ObjectKind, Principal};
    use crate::store::{ObjectStore, StoreError};
    use async_trait::async_trait;
    use axum_test::TestServer;
    use std::sync::Arc;

    struct NoAuth;

    #[async_trait]
    impl Authorizer for NoAuth {
        async fn authorize(&self, _token: &str, _scope: &str) -> Result<Principal, AuthError> {
            Err(AuthError::Denied("no tokens in test".to_string()))
        }
    }

    struct EmptyStore;

    #[async_trait]
    impl ObjectStore for EmptyStore {
        async fn load(
            &self,
            _kind: ObjectKind,
            _id: &str,
            _principal: Option<&Principal>,
        ) -> Result<Option<BoundObject>, StoreError> {
            Ok(None)
        }
    }

    fn test_state() -> AppState {
        AppState::new(
            Arc::new(NoAuth),
            Arc::new(EmptyStore),
            Arc::new(MemoryEventBus::new()),
        )
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let server = TestServer::new(Server::router(test_state())).expect("test server");

        let response = server.get("/health").await;

        response.assert_status_ok();
        response.assert_json(&serde_json::json!({ "status": "ok" }));
    }

    #[tokio::test]
    async fn test_unknown_route_is_not_found() {
        let server = TestServer::new(Server::router(test_state())).expect("test server");

        let response = server.get("/ws/orders/o1").await;

        response.assert_status_not_found();
    }
}
