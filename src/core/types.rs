use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// An issued invoice together with its delivery bookkeeping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: Uuid,
    /// Owning company; every read and write is scoped by it.
    pub company_id: Uuid,
    pub client_id: Option<Uuid>,
    /// Allocated number, `YEAR-SEQ` (e.g. "2025-0007").
    pub number: String,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    /// ISO 4217 currency code.
    pub currency: String,
    pub lines: Vec<InvoiceLine>,
    pub totals: Totals,
    pub status: InvoiceStatus,
    /// Storage-relative path of the UBL document, set by `prepare`.
    pub xml_path: Option<String>,
    /// Storage-relative path of the PDF document, set by `prepare`.
    pub pdf_path: Option<String>,
    /// Opaque id returned by the delivery channel, set by `send`.
    pub message_id: Option<String>,
    /// Channel the invoice was sent through.
    pub channel: Option<Channel>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Raw line input as submitted by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineInput {
    pub description: String,
    /// Must be strictly positive.
    pub quantity: Decimal,
    /// Net price per unit, never negative.
    pub unit_price: Decimal,
    /// VAT percentage, e.g. `21` for 21 %.
    pub vat_rate: Decimal,
}

/// Invoice line with its derived amounts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceLine {
    pub description: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub vat_rate: Decimal,
    /// `round2(quantity * unit_price)`.
    pub line_total_excl: Decimal,
    /// `round2(line_total_excl * vat_rate / 100)`.
    pub line_vat: Decimal,
}

/// Taxable base and tax for one distinct VAT rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxSubtotal {
    pub rate: Decimal,
    pub taxable: Decimal,
    pub tax: Decimal,
}

/// Aggregate invoice totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Totals {
    pub total_excl: Decimal,
    pub total_vat: Decimal,
    pub total_incl: Decimal,
    /// Ordered by ascending rate.
    pub tax_subtotals: Vec<TaxSubtotal>,
}

/// Postal address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Address {
    pub street: Option<String>,
    pub city: String,
    pub postal_code: String,
    /// ISO 3166-1 alpha-2.
    pub country_code: String,
}

/// Structured network participant address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkAddress {
    /// 4-digit electronic address scheme code, e.g. "0208".
    pub scheme: String,
    pub id: String,
}

impl NetworkAddress {
    pub fn new(scheme: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            scheme: scheme.into(),
            id: id.into(),
        }
    }

    /// Participant identifier in `scheme:id` form.
    pub fn participant_id(&self) -> String {
        format!("{}:{}", self.scheme, self.id)
    }

    /// True when the scheme is a 4-digit code and the id is non-blank.
    pub fn is_well_formed(&self) -> bool {
        self.scheme.len() == 4
            && self.scheme.bytes().all(|b| b.is_ascii_digit())
            && !self.id.trim().is_empty()
    }
}

/// Invoicing company (the supplier on every document).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Company {
    pub id: Uuid,
    pub name: String,
    pub vat_id: Option<String>,
    pub address: Address,
    pub email: Option<String>,
    pub iban: Option<String>,
    pub bic: Option<String>,
    /// Own structured network address, rendered as the supplier endpoint.
    pub network_address: Option<NetworkAddress>,
}

/// Customer of a company.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Client {
    pub id: Uuid,
    pub company_id: Uuid,
    pub name: String,
    pub vat_id: Option<String>,
    pub email: Option<String>,
    pub address: Address,
    pub delivery_mode: DeliveryMode,
    pub network_address: Option<NetworkAddress>,
}

/// How a client wants to receive invoices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DeliveryMode {
    Structured,
    Fallback,
}

/// Transport channel chosen for an invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Channel {
    Structured,
    Fallback,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Structured => "STRUCTURED",
            Self::Fallback => "FALLBACK",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Invoice lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum InvoiceStatus {
    Draft,
    Ready,
    Sent,
    Delivered,
    Failed,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::Ready => "READY",
            Self::Sent => "SENT",
            Self::Delivered => "DELIVERED",
            Self::Failed => "FAILED",
        }
    }

    /// Whether the lifecycle permits moving from `self` to `next`.
    ///
    /// Transitions only move forward; FAILED is entered from SENT and
    /// left again by a retried send.
    pub fn can_transition_to(&self, next: InvoiceStatus) -> bool {
        use InvoiceStatus::*;
        matches!(
            (self, next),
            (Draft, Ready)
                | (Ready, Sent)
                | (Ready, Delivered)
                | (Sent, Delivered)
                | (Sent, Failed)
                | (Failed, Sent)
                | (Failed, Delivered)
        )
    }

    /// Whether a status reported by the network (poll or webhook) may move
    /// the invoice from `self` to `next`.
    ///
    /// Stricter than [`can_transition_to`](Self::can_transition_to): only a
    /// resend leaves FAILED, so late SENT or DELIVERED reports for the
    /// failed attempt are ignored.
    pub fn can_report(&self, next: InvoiceStatus) -> bool {
        *self != Self::Failed && self.can_transition_to(next)
    }

    /// Statuses in which `send` may transmit.
    pub fn is_sendable(&self) -> bool {
        matches!(self, Self::Ready | Self::Failed)
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Three-way delivery status reported by a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DeliveryStatus {
    Sent,
    Delivered,
    Failed,
}

impl From<DeliveryStatus> for InvoiceStatus {
    fn from(status: DeliveryStatus) -> Self {
        match status {
            DeliveryStatus::Sent => Self::Sent,
            DeliveryStatus::Delivered => Self::Delivered,
            DeliveryStatus::Failed => Self::Failed,
        }
    }
}

/// Kind of an audit log record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogKind {
    Prepare,
    Send,
    Status,
    Error,
    Skip,
}

impl LogKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Prepare => "PREPARE",
            Self::Send => "SEND",
            Self::Status => "STATUS",
            Self::Error => "ERROR",
            Self::Skip => "SKIP",
        }
    }
}

/// One append-only delivery log row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryLogRecord {
    pub id: Uuid,
    pub invoice_id: Uuid,
    pub kind: LogKind,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}
