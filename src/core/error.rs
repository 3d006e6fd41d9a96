use thiserror::Error;

use super::types::{Channel, InvoiceStatus};

/// Errors raised anywhere in the invoicing and delivery pipeline.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum InvoicingError {
    /// The invoice (or the line set being submitted) has no lines.
    #[error("invoice must have at least one line")]
    NoLines,

    /// A date could not be parsed or is out of range.
    #[error("invalid date: {0}")]
    BadDates(String),

    /// The due date lies before the issue date.
    #[error("due date is before issue date")]
    DueBeforeIssue,

    /// A single line violates quantity/price/rate constraints.
    #[error("line {index}: {reason}")]
    InvalidLine { index: usize, reason: String },

    /// Currency code is not a known ISO 4217 code.
    #[error("unknown currency code: {0}")]
    UnknownCurrency(String),

    /// The referenced client does not exist for this company.
    #[error("client not found")]
    ClientNotFound,

    /// The owning company does not exist.
    #[error("company not found")]
    CompanyNotFound,

    /// No invoice matches the given id (or message id).
    #[error("invoice not found")]
    InvoiceNotFound,

    /// Lines can no longer be replaced in this status.
    #[error("invoice lines are locked in status {0}")]
    InvoiceLocked(InvoiceStatus),

    /// The atomic counter increment affected no row.
    #[error("invoice counter allocation failed")]
    CounterAllocationFailed,

    /// `send` was called before the invoice was prepared.
    #[error("invoice is not ready to send (status {0})")]
    NotReady(InvoiceStatus),

    /// A prepared artifact is not present on storage.
    #[error("artifact missing: {0}")]
    ArtifactMissing(String),

    /// `refresh_status` was called on an invoice without a message id.
    #[error("invoice has not been sent")]
    NotSent,

    /// Status transition not permitted by the lifecycle.
    #[error("invalid status transition {from} -> {to}")]
    InvalidTransition {
        from: InvoiceStatus,
        to: InvoiceStatus,
    },

    /// Client asks for structured delivery but carries no network id.
    #[error("client requests structured delivery but has no network id")]
    MissingNetworkId,

    /// A delivery channel answered with a non-success HTTP status.
    #[error("{channel} transport failed with HTTP {status}: {body}")]
    Transport {
        channel: Channel,
        status: u16,
        body: String,
    },

    /// Network-level failure or undecodable response.
    #[error("HTTP error: {0}")]
    Http(String),

    /// Invalid or incomplete configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Document rendering failed.
    #[error("render error: {0}")]
    Render(String),

    /// XML generation error.
    #[error("XML error: {0}")]
    Xml(String),

    /// Artifact or record storage failure.
    #[error("storage error: {0}")]
    Storage(String),

    /// Webhook signature missing or wrong.
    #[error("bad webhook signature")]
    BadSignature,

    /// Webhook body could not be interpreted.
    #[error("bad webhook payload: {0}")]
    BadPayload(String),
}

impl InvoicingError {
    /// True for errors caused by caller input rather than by infrastructure.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::NoLines
                | Self::BadDates(_)
                | Self::DueBeforeIssue
                | Self::InvalidLine { .. }
                | Self::UnknownCurrency(_)
                | Self::ClientNotFound
                | Self::CompanyNotFound
                | Self::InvoiceNotFound
                | Self::InvoiceLocked(_)
                | Self::NotReady(_)
                | Self::NotSent
                | Self::InvalidTransition { .. }
                | Self::MissingNetworkId
                | Self::BadSignature
                | Self::BadPayload(_)
        )
    }

    /// Build a transport error, keeping at most 200 characters of the body.
    pub fn transport(channel: Channel, status: u16, body: &str) -> Self {
        Self::Transport {
            channel,
            status,
            body: body.chars().take(200).collect(),
        }
    }
}
