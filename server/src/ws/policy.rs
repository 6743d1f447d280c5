//! Per-endpoint connection policy.
//!
//! The whole variation between endpoint kinds is a policy value: whether a
//! token is required, and whether the resolved object should short-circuit
//! the connection with one final payload instead of streaming. New kinds
//! register a new value, not a new connection flow.

use serde_json::Value;

use crate::model::{BoundObject, ObjectKind};

use super::messages::InvoiceSummary;

/// Outcome of a policy's pre-relay check.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    /// Start the relay.
    Continue,

    /// Send this payload, close normally, and never open a subscription.
    Terminate(Value),
}

/// Endpoint registration value: kind, auth requirement, pre-relay check.
#[derive(Debug, Clone)]
pub struct EndpointPolicy {
    /// Object kind this endpoint serves.
    pub kind: ObjectKind,

    /// Whether a `token` query parameter must be presented and authorized.
    pub require_auth: bool,

    /// Pre-relay check against the resolved object.
    pub short_circuit: fn(&BoundObject) -> Verdict,
}

impl EndpointPolicy {
    /// Wallet streams: owner-only, never short-circuits.
    #[must_use]
    pub fn wallet() -> Self {
        Self {
            kind: ObjectKind::Wallet,
            require_auth: true,
            short_circuit: stream_forever,
        }
    }

    /// Invoice streams: public, but a settled or expired invoice gets its
    /// summary and a normal close instead of a subscription.
    #[must_use]
    pub fn invoice() -> Self {
        Self {
            kind: ObjectKind::Invoice,
            require_auth: false,
            short_circuit: invoice_terminal_check,
        }
    }
}

fn stream_forever(_object: &BoundObject) -> Verdict {
    Verdict::Continue
}

fn invoice_terminal_check(object: &BoundObject) -> Verdict {
    let BoundObject::Invoice(invoice) = object else {
        return Verdict::Continue;
    };
    if !invoice.status.is_stream_terminal() {
        return Verdict::Continue;
    }
    Verdict::Terminate(InvoiceSummary::for_invoice(invoice).payload())
}
