//! Fixed two-decimal money arithmetic.
//!
//! Every monetary field in the crate is produced by [`round2`] or [`sum`].
//! Amounts are [`Decimal`], so there is no binary representation error to
//! compensate for; rounding is half away from zero.

use rust_decimal::{Decimal, RoundingStrategy};

/// Round to the nearest cent, half away from zero.
pub fn round2(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Sum amounts, rounding the running total after each addition.
///
/// # Panics
///
/// Panics when the total leaves the [`Decimal`] range, like `+` does. Use
/// [`checked_sum`] for unbounded input.
pub fn sum<I>(values: I) -> Decimal
where
    I: IntoIterator<Item = Decimal>,
{
    values
        .into_iter()
        .fold(Decimal::ZERO, |acc, v| round2(acc + v))
}

/// [`sum`] returning `None` instead of overflowing.
pub fn checked_sum<I>(values: I) -> Option<Decimal>
where
    I: IntoIterator<Item = Decimal>,
{
    values
        .into_iter()
        .try_fold(Decimal::ZERO, |acc, v| acc.checked_add(v).map(round2))
}

/// Render an amount with exactly two decimals, e.g. `131.6` -> `"131.60"`.
pub fn format_amount(value: Decimal) -> String {
    let mut v = round2(value);
    v.rescale(2);
    v.to_string()
}
