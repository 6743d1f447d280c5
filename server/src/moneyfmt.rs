//! Amount formatting for terminal invoice payloads.
//!
//! Renders decimal amounts with the divisibility of the currency the payer
//! actually used, so `0.001` BTC comes out as `0.00100000` and `5` USDT as
//! `5.000000`.

use rust_decimal::Decimal;

use crate::model::Payment;

/// Divisibility used when no payment method matches the paid currency.
pub const DEFAULT_DIVISIBILITY: u32 = 8;

/// Largest scale `Decimal` can represent.
const MAX_SCALE: u32 = 28;

/// Formats an amount with exactly `divisibility` fraction digits.
#[must_use]
pub fn format_amount(amount: Decimal, divisibility: u32) -> String {
    let mut scaled = amount;
    scaled.rescale(divisibility.min(MAX_SCALE));
    scaled.to_string()
}

/// Returns the divisibility of the payment method whose currency the payer
/// used, falling back to [`DEFAULT_DIVISIBILITY`] when none matches.
#[must_use]
pub fn sent_amount_divisibility(payments: &[Payment], paid_currency: &str) -> u32 {
    payments
        .iter()
        .find(|payment| payment.currency == paid_currency)
        .map(|payment| payment.divisibility)
        .unwrap_or(DEFAULT_DIVISIBILITY)
}
