//! Domain object snapshots.
//!
//! Read-only views of the payment server's wallets and invoices, captured
//! once at connection-admit time. A session never re-fetches its object;
//! live changes arrive through the event stream instead.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Kind of domain object a notification stream is scoped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    /// A user wallet.
    Wallet,

    /// A payment invoice.
    Invoice,
}

impl ObjectKind {
    /// Returns the kind as its wire string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Wallet => "wallet",
            Self::Invoice => "invoice",
        }
    }

    /// Returns the authorization scope required to stream this kind.
    #[must_use]
    pub const fn management_scope(&self) -> &'static str {
        match self {
            Self::Wallet => "wallet_management",
            Self::Invoice => "invoice_management",
        }
    }

    /// Parses a kind from its wire string.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "wallet" => Some(Self::Wallet),
            "invoice" => Some(Self::Invoice),
            _ => None,
        }
    }
}

impl std::fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Authenticated identity resolved from an access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// Owning user id.
    pub user_id: String,

    /// Scopes granted to the token.
    pub scopes: Vec<String>,
}

/// Wallet snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wallet {
    /// Wallet id.
    pub id: String,

    /// Owning user id.
    pub user_id: String,

    /// Display name.
    pub name: String,

    /// Wallet currency code.
    pub currency: String,
}

/// Invoice lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    /// Awaiting payment.
    Pending,

    /// Paid, awaiting confirmations.
    Paid,

    /// Confirmed on-chain.
    Confirmed,

    /// Fully settled.
    Complete,

    /// Expired unpaid.
    Expired,

    /// Marked invalid.
    Invalid,

    /// Refunded to the payer.
    Refunded,
}

impl InvoiceStatus {
    /// Returns the status as its wire string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Confirmed => "confirmed",
            Self::Complete => "complete",
            Self::Expired => "expired",
            Self::Invalid => "invalid",
            Self::Refunded => "refunded",
        }
    }

    /// Parses a status from its wire string.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "paid" => Some(Self::Paid),
            "confirmed" => Some(Self::Confirmed),
            "complete" => Some(Self::Complete),
            "expired" => Some(Self::Expired),
            "invalid" => Some(Self::Invalid),
            "refunded" => Some(Self::Refunded),
            _ => None,
        }
    }

    /// Returns true if a notification stream for this invoice has nothing
    /// left to deliver: the invoice will never change state again.
    #[must_use]
    pub const fn is_stream_terminal(&self) -> bool {
        matches!(self, Self::Expired | Self::Complete)
    }
}

impl std::fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-method payment record attached to an invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    /// Currency code of the payment method.
    pub currency: String,

    /// Decimal places of the payment method's currency.
    pub divisibility: u32,
}

/// Invoice snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    /// Invoice id.
    pub id: String,

    /// Lifecycle status.
    pub status: InvoiceStatus,

    /// Exception qualifier, relayed verbatim (e.g. `none`, `paid_partial`).
    pub exception_status: String,

    /// Amount sent by the payer so far, in the paid currency.
    pub sent_amount: Decimal,

    /// Currency the payer chose to pay with.
    pub paid_currency: String,

    /// Payment methods offered on this invoice.
    pub payments: Vec<Payment>,
}

/// A resolved domain object bound to a session.
#[derive(Debug, Clone, PartialEq)]
pub enum BoundObject {
    /// A wallet snapshot.
    Wallet(Wallet),

    /// An invoice snapshot.
    Invoice(Invoice),
}

impl BoundObject {
    /// Returns the kind of the bound object.
    #[must_use]
    pub const fn kind(&self) -> ObjectKind {
        match self {
            Self::Wallet(_) => ObjectKind::Wallet,
            Self::Invoice(_) => ObjectKind::Invoice,
        }
    }

    /// Returns the object id.
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::Wallet(wallet) => &wallet.id,
            Self::Invoice(invoice) => &invoice.id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_kind_as_str() {
        assert_eq!(ObjectKind::Wallet.as_str(), "wallet");
        assert_eq!(ObjectKind::Invoice.as_str(), "invoice");
    }

    #[test]
    fn test_object_kind_management_scope() {
        assert_eq!(ObjectKind::Wallet.management_scope(), "wallet_management");
        assert_eq!(ObjectKind::Invoice.management_scope(), "invoice_management");
    }

    #[test]
    fn test_object_kind_parse() {
        assert_eq!(ObjectKind::parse("wallet"), Some(ObjectKind::Wallet));
        assert_eq!(ObjectKind::parse("invoice"), Some(ObjectKind::Invoice));
        assert_eq!(ObjectKind::parse("order"), None);
    }

    #[test]
    fn test_invoice_status_parse_round_trip() {
        for status in [
            InvoiceStatus::Pending,
            InvoiceStatus::Paid,
            InvoiceStatus::Confirmed,
            InvoiceStatus::Complete,
            InvoiceStatus::Expired,
            InvoiceStatus::Invalid,
            InvoiceStatus::Refunded,
        ] {
            assert_eq!(InvoiceStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(InvoiceStatus::parse("unknown"), None);
    }

    #[test]
    fn test_invoice_status_stream_terminal() {
        assert!(InvoiceStatus::Expired.is_stream_terminal());
        assert!(InvoiceStatus::Complete.is_stream_terminal());
        assert!(!InvoiceStatus::Pending.is_stream_terminal());
        assert!(!InvoiceStatus::Paid.is_stream_terminal());
        assert!(!InvoiceStatus::Confirmed.is_stream_terminal());
        assert!(!InvoiceStatus::Invalid.is_stream_terminal());
        assert!(!InvoiceStatus::Refunded.is_stream_terminal());
    }

    #[test]
    fn test_invoice_status_serde_lowercase() {
        let json = serde_json::to_string(&InvoiceStatus::Expired).expect("serialize");
        assert_eq!(json, "\"expired\"");
    }

    #[test]
    fn test_bound_object_kind_and_id() {
        let wallet = BoundObject::Wallet(Wallet {
            id: "w1".to_string(),
            user_id: "u1".to_string(),
            name: "hot".to_string(),
            currency: "btc".to_string(),
        });
        assert_eq!(wallet.kind(), ObjectKind::Wallet);
        assert_eq!(wallet.id(), "w1");

        let invoice = BoundObject::Invoice(Invoice {
            id: "i1".to_string(),
            status: InvoiceStatus::Pending,
            exception_status: "none".to_string(),
            sent_amount: Decimal::ZERO,
            paid_currency: "btc".to_string(),
            payments: Vec::new(),
        });
        assert_eq!(invoice.kind(), ObjectKind::Invoice);
        assert_eq!(invoice.id(), "i1");
    }
}
