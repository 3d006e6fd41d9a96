//! Invoice creation and line replacement.

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use super::error::InvoicingError;
use super::numbering::InvoiceNumberAllocator;
use super::store::Store;
use super::totals::calculate_totals;
use super::types::{Invoice, InvoiceStatus, LineInput};
use super::validation;

/// A new invoice as submitted by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewInvoice {
    pub client_id: Option<Uuid>,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    pub currency: String,
    pub lines: Vec<LineInput>,
}

/// Validate, total, number and persist a new DRAFT invoice.
///
/// All validation happens before the number is allocated, so a rejected
/// submission never consumes a sequence value.
pub fn create_invoice<S: Store + ?Sized>(
    store: &S,
    company_id: Uuid,
    draft: NewInvoice,
) -> Result<Invoice, InvoicingError> {
    store
        .company(company_id)?
        .ok_or(InvoicingError::CompanyNotFound)?;

    validation::validate_new_invoice(&draft)?;
    if let Some(client_id) = draft.client_id {
        store
            .client(company_id, client_id)?
            .ok_or(InvoicingError::ClientNotFound)?;
    }

    let calc = calculate_totals(&draft.lines)?;
    let allocation = InvoiceNumberAllocator::new(store).allocate(company_id, draft.issue_date)?;

    let now = Utc::now();
    let invoice = Invoice {
        id: Uuid::new_v4(),
        company_id,
        client_id: draft.client_id,
        number: allocation.number,
        issue_date: draft.issue_date,
        due_date: draft.due_date,
        currency: draft.currency,
        lines: calc.lines,
        totals: calc.totals,
        status: InvoiceStatus::Draft,
        xml_path: None,
        pdf_path: None,
        message_id: None,
        channel: None,
        created_at: now,
        updated_at: now,
    };
    store.insert_invoice(invoice.clone())?;

    info!(invoice_id = %invoice.id, number = %invoice.number, "invoice created");
    Ok(invoice)
}

/// Replace the whole line set together with recomputed totals.
///
/// Allowed while DRAFT or READY. A READY invoice keeps its status but loses
/// its artifact paths, so the next `prepare` renders fresh documents.
pub fn replace_lines<S: Store + ?Sized>(
    store: &S,
    company_id: Uuid,
    invoice_id: Uuid,
    lines: Vec<LineInput>,
) -> Result<Invoice, InvoicingError> {
    let mut invoice = store
        .invoice(company_id, invoice_id)?
        .ok_or(InvoicingError::InvoiceNotFound)?;

    if !matches!(invoice.status, InvoiceStatus::Draft | InvoiceStatus::Ready) {
        return Err(InvoicingError::InvoiceLocked(invoice.status));
    }

    validation::validate_lines(&lines)?;
    let calc = calculate_totals(&lines)?;

    invoice.lines = calc.lines;
    invoice.totals = calc.totals;
    if invoice.status == InvoiceStatus::Ready {
        invoice.xml_path = None;
        invoice.pdf_path = None;
    }
    invoice.updated_at = Utc::now();
    store.update_invoice(&invoice)?;

    info!(invoice_id = %invoice.id, lines = invoice.lines.len(), "invoice lines replaced");
    Ok(invoice)
}
