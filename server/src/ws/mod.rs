//! WebSocket notification streams.
//!
//! Clients connect to one endpoint per object kind and receive that object's
//! state-change events until they disconnect or the stream has nothing left
//! to say.
//!
//! # Endpoints
//!
//! - `/ws/wallets/{model_id}?token=…` — wallet events, owner only
//! - `/ws/invoices/{model_id}` — invoice events, public
//!
//! # Connection flow
//!
//! Admission gates run first (parameters, token, object lookup, pre-relay
//! check); any failure closes with the policy-violation code and no payload.
//! A settled or expired invoice gets one summary payload and a normal close.
//! Everything else gets a backend subscription on `{kind}:{id}` relayed
//! verbatim until either side ends the connection.

pub mod channels;
pub mod gatekeeper;
pub mod handler;
pub mod messages;
pub mod metrics;
pub mod policy;
pub mod relay;
pub mod session;

pub use channels::StreamTopic;
pub use gatekeeper::{Admission, ConnectParams, Rejection};
pub use handler::{invoice_ws, wallet_ws, NotifyQuery};
pub use messages::{close_code, InvoiceSummary};
pub use metrics::WsMetrics;
pub use policy::{EndpointPolicy, Verdict};
pub use session::NotifySession;
