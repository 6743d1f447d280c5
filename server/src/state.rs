//! Shared application state.
//!
//! The three collaborators the core needs are injected here once at startup
//! and shared by every connection; the core owns none of their lifecycles.

use std::sync::Arc;

use crate::auth::Authorizer;
use crate::events::EventBus;
use crate::store::ObjectStore;
use crate::ws::metrics::WsMetrics;

/// Collaborators and counters shared across connections.
#[derive(Clone)]
pub struct AppState {
    /// Token authorization collaborator.
    pub authorizer: Arc<dyn Authorizer>,

    /// Object lookup collaborator.
    pub store: Arc<dyn ObjectStore>,

    /// Backend publish/subscribe collaborator.
    pub bus: Arc<dyn EventBus>,

    /// Bridge metrics.
    pub metrics: Arc<WsMetrics>,
}

impl AppState {
    /// Creates the state from its collaborators.
    #[must_use]
    pub fn new(
        authorizer: Arc<dyn Authorizer>,
        store: Arc<dyn ObjectStore>,
        bus: Arc<dyn EventBus>,
    ) -> Self {
        Self {
            authorizer,
            store,
            bus,
            metrics: Arc::new(WsMetrics::new()),
        }
    }
}
