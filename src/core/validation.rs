use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;

use super::drafts::NewInvoice;
use super::error::InvoicingError;
use super::types::LineInput;

/// Validate an invoice submission before any side effect.
///
/// Checks run in a fixed order so the reported error is stable:
/// lines present, each line, dates, currency.
pub fn validate_new_invoice(draft: &NewInvoice) -> Result<(), InvoicingError> {
    validate_lines(&draft.lines)?;
    validate_dates(draft.issue_date, draft.due_date)?;
    validate_currency(&draft.currency)
}

/// Reject empty line sets and lines breaking quantity/price/rate bounds.
pub fn validate_lines(lines: &[LineInput]) -> Result<(), InvoicingError> {
    if lines.is_empty() {
        return Err(InvoicingError::NoLines);
    }
    for (index, line) in lines.iter().enumerate() {
        let reason = if line.description.trim().is_empty() {
            Some("description must not be empty")
        } else if line.quantity <= Decimal::ZERO {
            Some("quantity must be greater than zero")
        } else if line.unit_price < Decimal::ZERO {
            Some("unit price must not be negative")
        } else if line.vat_rate < Decimal::ZERO {
            Some("VAT rate must not be negative")
        } else {
            None
        };
        if let Some(reason) = reason {
            return Err(InvoicingError::InvalidLine {
                index,
                reason: reason.to_string(),
            });
        }
    }
    Ok(())
}

pub fn validate_dates(issue: NaiveDate, due: NaiveDate) -> Result<(), InvoicingError> {
    if due < issue {
        return Err(InvoicingError::DueBeforeIssue);
    }
    Ok(())
}

pub fn validate_currency(code: &str) -> Result<(), InvoicingError> {
    if is_known_currency_code(code) {
        Ok(())
    } else {
        Err(InvoicingError::UnknownCurrency(code.to_string()))
    }
}

/// Parse a caller-supplied date.
///
/// Accepts `YYYY-MM-DD` or an RFC 3339 timestamp, whose UTC calendar date
/// is used.
pub fn parse_invoice_date(input: &str) -> Result<NaiveDate, InvoicingError> {
    let s = input.trim();
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(d);
    }
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc).date_naive())
        .map_err(|_| InvoicingError::BadDates(format!("unparseable date {s:?}")))
}

/// Check whether `code` is a known ISO 4217 currency code.
pub fn is_known_currency_code(code: &str) -> bool {
    CURRENCY_CODES.binary_search(&code).is_ok()
}

// Sorted for binary search.
static CURRENCY_CODES: &[&str] = &[
    "AED", "AUD", "BGN", "BRL", "CAD", "CHF", "CNY", "CZK", "DKK", "EUR", "GBP", "HKD", "HUF",
    "ILS", "INR", "ISK", "JPY", "KRW", "MAD", "MXN", "NOK", "NZD", "PLN", "RON", "RSD", "SAR",
    "SEK", "SGD", "THB", "TRY", "UAH", "USD", "ZAR",
];
