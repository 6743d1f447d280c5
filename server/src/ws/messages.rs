//! Outbound message and close-code definitions.
//!
//! Relayed events go out verbatim; the only message the bridge composes
//! itself is the terminal invoice summary.

use serde::Serialize;
use serde_json::Value;

use crate::model::{Invoice, InvoiceStatus};
use crate::moneyfmt;

/// WebSocket close codes used by the bridge.
pub mod close_code {
    /// Normal closure after a completed delivery.
    pub const NORMAL: u16 = 1000;

    /// Policy violation: every gate failure closes with this code, with no
    /// payload, so a client cannot tell which check failed.
    pub const POLICY_VIOLATION: u16 = 1008;
}

/// Final payload sent when an invoice is already settled or expired.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvoiceSummary {
    /// Lifecycle status.
    pub status: InvoiceStatus,

    /// Exception qualifier, relayed verbatim.
    pub exception_status: String,

    /// Amount sent by the payer, formatted with the paid currency's
    /// divisibility.
    pub sent_amount: String,

    /// Currency the payer paid with.
    pub paid_currency: String,
}

impl InvoiceSummary {
    /// Builds the summary for an invoice snapshot.
    #[must_use]
    pub fn for_invoice(invoice: &Invoice) -> Self {
        let divisibility =
            moneyfmt::sent_amount_divisibility(&invoice.payments, &invoice.paid_currency);
        Self {
            status: invoice.status,
            exception_status: invoice.exception_status.clone(),
            sent_amount: moneyfmt::format_amount(invoice.sent_amount, divisibility),
            paid_currency: invoice.paid_currency.clone(),
        }
    }

    /// Returns the summary as a structured payload.
    #[must_use]
    pub fn payload(&self) -> Value {
        serde_json::json!({
            "status": self.status,
            "exception_status": self.exception_status,
            "sent_amount": self.sent_amount,
            "paid_currency": self.paid_currency,
        })
    }
}
