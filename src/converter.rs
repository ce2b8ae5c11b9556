//! converter.rs - Converts a native-currency amount into a quoted token
//!
//! `convert` is a pure function of its four inputs. Missing quotes, a
//! non-positive target price, arithmetic overflow or a value too large to
//! carry six decimal places all yield an absent display value rather than an error.

use rust_decimal::{Decimal, RoundingStrategy};

use crate::models::{ConversionResult, NetworkState, QuoteSnapshot, TokenDescriptor};

/// Decimal places of a converted display value
pub const DISPLAY_DECIMALS: u32 = 6;

pub fn convert(
    amount: Decimal,
    snapshot: Option<&QuoteSnapshot>,
    token: &TokenDescriptor,
    network: &NetworkState,
) -> ConversionResult {
    let display_value = snapshot
        .and_then(|snapshot| converted_amount(amount, snapshot, token, network))
        .map(|value| value.to_string());

    ConversionResult {
        display_value,
        target_symbol: token.base_symbol().to_string(),
    }
}

/// amount * native quote / target quote, rounded to six places
pub fn converted_amount(
    amount: Decimal,
    snapshot: &QuoteSnapshot,
    token: &TokenDescriptor,
    network: &NetworkState,
) -> Option<Decimal> {
    let base_quote = snapshot.get(network.network.native_quote)?;
    let target_quote = snapshot.get(token.symbol)?;
    if target_quote <= Decimal::ZERO {
        return None;
    }

    let mut value = amount
        .checked_mul(base_quote)?
        .checked_div(target_quote)?
        .round_dp_with_strategy(DISPLAY_DECIMALS, RoundingStrategy::MidpointAwayFromZero);
    // rescale settles for fewer places when the mantissa cannot hold six
    value.rescale(DISPLAY_DECIMALS);
    (value.scale() == DISPLAY_DECIMALS).then_some(value)
}
