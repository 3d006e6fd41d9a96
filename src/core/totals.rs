use std::collections::BTreeMap;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::amounts::{checked_sum, round2};
use super::error::InvoicingError;
use super::types::{InvoiceLine, LineInput, TaxSubtotal, Totals};

/// Line set with derived amounts plus aggregate totals.
#[derive(Debug, Clone, PartialEq)]
pub struct Calculation {
    pub lines: Vec<InvoiceLine>,
    pub totals: Totals,
}

/// Derive line amounts, per-rate tax subtotals and grand totals.
///
/// Pure and deterministic: the same input always yields the same output.
/// Every summation step is rounded to the cent.
pub fn calculate_totals(inputs: &[LineInput]) -> Result<Calculation, InvoicingError> {
    if inputs.is_empty() {
        return Err(InvoicingError::NoLines);
    }

    let lines = inputs
        .iter()
        .enumerate()
        .map(|(index, input)| derive_line(index, input))
        .collect::<Result<Vec<_>, _>>()?;

    // BTreeMap keys compare by value, so 21 and 21.00 share a bucket.
    let mut by_rate: BTreeMap<Decimal, (Decimal, Decimal)> = BTreeMap::new();
    for (index, line) in lines.iter().enumerate() {
        let entry = by_rate
            .entry(line.vat_rate)
            .or_insert((Decimal::ZERO, Decimal::ZERO));
        entry.0 = checked_sum([entry.0, line.line_total_excl])
            .ok_or_else(|| out_of_range(index))?;
        entry.1 = checked_sum([entry.1, line.line_vat]).ok_or_else(|| out_of_range(index))?;
    }

    let tax_subtotals: Vec<TaxSubtotal> = by_rate
        .into_iter()
        .map(|(rate, (taxable, tax))| TaxSubtotal {
            rate: rate.normalize(),
            taxable,
            tax,
        })
        .collect();

    // Subtotals already fit, so only the grand total can still overflow.
    let last = lines.len() - 1;
    let total_excl =
        checked_sum(lines.iter().map(|l| l.line_total_excl)).ok_or_else(|| out_of_range(last))?;
    let total_vat =
        checked_sum(tax_subtotals.iter().map(|s| s.tax)).ok_or_else(|| out_of_range(last))?;
    let total_incl = checked_sum([total_excl, total_vat]).ok_or_else(|| out_of_range(last))?;

    Ok(Calculation {
        lines,
        totals: Totals {
            total_excl,
            total_vat,
            total_incl,
            tax_subtotals,
        },
    })
}

fn out_of_range(index: usize) -> InvoicingError {
    InvoicingError::InvalidLine {
        index,
        reason: "amount out of range".to_string(),
    }
}

fn derive_line(index: usize, input: &LineInput) -> Result<InvoiceLine, InvoicingError> {
    let line_total_excl = input
        .quantity
        .checked_mul(input.unit_price)
        .map(round2)
        .ok_or_else(|| out_of_range(index))?;
    let line_vat = line_total_excl
        .checked_mul(input.vat_rate)
        .and_then(|v| v.checked_div(dec!(100)))
        .map(round2)
        .ok_or_else(|| out_of_range(index))?;
    Ok(InvoiceLine {
        description: input.description.clone(),
        quantity: input.quantity,
        unit_price: input.unit_price,
        vat_rate: input.vat_rate,
        line_total_excl,
        line_vat,
    })
}

/// Strip derived amounts, e.g. to resubmit a stored line set.
pub fn to_inputs(lines: &[InvoiceLine]) -> Vec<LineInput> {
    lines
        .iter()
        .map(|l| LineInput {
            description: l.description.clone(),
            quantity: l.quantity,
            unit_price: l.unit_price,
            vat_rate: l.vat_rate,
        })
        .collect()
}
