//! The capability shared by both delivery channels.

use std::time::Duration;

use reqwest::blocking::{Client, Response};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::warn;
use uuid::Uuid;

use crate::core::{Channel, DeliveryStatus, InvoicingError, NetworkAddress};

/// A rendered invoice ready for transmission.
#[derive(Debug, Clone)]
pub struct OutboundDocument {
    pub invoice_id: Uuid,
    pub number: String,
    pub xml: Vec<u8>,
    /// Structured network recipient, required by the structured channel.
    pub recipient: Option<NetworkAddress>,
    /// Structured network sender, when the company is registered.
    pub sender: Option<NetworkAddress>,
}

/// What a channel reports after accepting a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendReceipt {
    pub message_id: String,
    /// The channel confirmed delivery synchronously.
    pub delivered: bool,
}

/// Send a document and poll its delivery status.
///
/// Implementations fail with an error on any non-success remote answer.
/// Only an unconfigured channel may answer without a network call.
pub trait Transport: Send + Sync {
    fn channel(&self) -> Channel;
    fn send(&self, document: &OutboundDocument) -> Result<SendReceipt, InvoicingError>;
    fn status(&self, message_id: &str) -> Result<DeliveryStatus, InvoicingError>;
}

/// Map a provider state string onto the three-way status.
pub fn map_provider_status(raw: &str) -> DeliveryStatus {
    let upper = raw.to_ascii_uppercase();
    if upper.contains("DELIVERED") || upper.contains("COMPLETED") {
        DeliveryStatus::Delivered
    } else if upper.contains("FAIL") || upper.contains("ERROR") {
        DeliveryStatus::Failed
    } else {
        DeliveryStatus::Sent
    }
}

/// Deterministic message id for an unconfigured channel: `prefix` plus 16
/// hex chars of the document's SHA-256.
pub fn stub_message_id(prefix: &str, xml: &[u8]) -> String {
    let digest = hex::encode(Sha256::digest(xml));
    format!("{prefix}{}", &digest[..16])
}

pub(crate) fn http_client(timeout: Duration) -> Result<Client, InvoicingError> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| InvoicingError::Http(format!("failed to build HTTP client: {e}")))
}

pub(crate) fn network_error(channel: Channel, e: reqwest::Error) -> InvoicingError {
    warn!(%channel, error = %e, "transport request failed");
    InvoicingError::Http(format!("{channel} request failed: {e}"))
}

/// Read the body, failing with `Transport` on a non-success status.
pub(crate) fn success_body(channel: Channel, resp: Response) -> Result<String, InvoicingError> {
    let status = resp.status();
    let body = resp.text().map_err(|e| network_error(channel, e))?;
    if !status.is_success() {
        warn!(%channel, status = status.as_u16(), "transport rejected request");
        return Err(InvoicingError::transport(channel, status.as_u16(), &body));
    }
    Ok(body)
}

/// First non-empty string among `keys` at the top level of a JSON object.
pub(crate) fn first_string(value: &serde_json::Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match value.get(*key)? {
        serde_json::Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}
