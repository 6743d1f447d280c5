//! Paystream notification bridge.
//!
//! Streams wallet and invoice state changes from the payment server's event
//! broker to WebSocket clients. Each connection is scoped to one object:
//! the bridge authorizes it, resolves the object, then relays that object's
//! channel verbatim until either side hangs up. A settled or expired invoice
//! never opens a stream; it gets one summary payload and a clean close.

pub mod auth;
pub mod config;
pub mod events;
pub mod model;
pub mod moneyfmt;
pub mod server;
pub mod state;
pub mod store;
pub mod ws;

pub use config::{ConfigError, ServerConfig};
pub use server::Server;
pub use state::AppState;
