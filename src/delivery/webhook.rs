//! Signed delivery callbacks.
//!
//! Two payload vocabularies are accepted:
//!
//! - `{"messageId": "...", "status": "SENT" | "IN_TRANSIT" | "DELIVERED" | "FAILED"}`
//! - `{"document_id": "...", "success": true | false}`
//!
//! Either id may be paired with `success` instead of `status`; an explicit
//! `status` wins when both are present.
//!
//! The signature is a hex HMAC-SHA256 of the raw body, optionally prefixed
//! with `sha256=`.

use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use uuid::Uuid;

use crate::core::{DeliveryStatus, InvoiceStatus, InvoicingError};

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the callback signature.
pub const SIGNATURE_HEADER: &str = "x-signature";

/// A parsed callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookEvent {
    pub message_id: String,
    /// `None` when the provider state is not one we map.
    pub status: Option<DeliveryStatus>,
    /// Provider state as received, for the log.
    pub raw_status: String,
}

/// Answer returned to the callback sender.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookAck {
    pub ok: bool,
    pub invoice_id: Option<Uuid>,
    pub status: Option<InvoiceStatus>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEvent {
    message_id: Option<String>,
    status: Option<String>,
    #[serde(rename = "document_id")]
    document_id: Option<String>,
    success: Option<bool>,
}

/// Compute the hex signature for `body`.
pub fn sign(secret: &str, body: &[u8]) -> Result<String, InvoicingError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| InvoicingError::Config(format!("invalid webhook secret: {e}")))?;
    mac.update(body);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Check `signature` against the body in constant time.
pub fn verify_signature(
    secret: &str,
    body: &[u8],
    signature: Option<&str>,
) -> Result<(), InvoicingError> {
    let provided = signature
        .map(str::trim)
        .map(|s| s.strip_prefix("sha256=").unwrap_or(s))
        .filter(|s| !s.is_empty())
        .ok_or(InvoicingError::BadSignature)?;
    let provided = hex::decode(provided).map_err(|_| InvoicingError::BadSignature)?;

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| InvoicingError::Config(format!("invalid webhook secret: {e}")))?;
    mac.update(body);
    mac.verify_slice(&provided)
        .map_err(|_| InvoicingError::BadSignature)
}

/// Parse either payload vocabulary.
pub fn parse_event(body: &[u8]) -> Result<WebhookEvent, InvoicingError> {
    let raw: RawEvent = serde_json::from_slice(body)
        .map_err(|e| InvoicingError::BadPayload(format!("not a JSON object: {e}")))?;

    if let Some(message_id) = raw.message_id.filter(|s| !s.trim().is_empty()) {
        return Ok(match (raw.status, raw.success) {
            (None, Some(success)) => success_event(message_id, success),
            (status, _) => {
                let raw_status = status.unwrap_or_default();
                WebhookEvent {
                    message_id,
                    status: map_webhook_status(&raw_status),
                    raw_status,
                }
            }
        });
    }

    if let Some(message_id) = raw.document_id.filter(|s| !s.trim().is_empty()) {
        let success = raw
            .success
            .ok_or_else(|| InvoicingError::BadPayload("document_id without success flag".into()))?;
        return Ok(success_event(message_id, success));
    }

    Err(InvoicingError::BadPayload(
        "payload carries neither messageId nor document_id".into(),
    ))
}

fn success_event(message_id: String, success: bool) -> WebhookEvent {
    let status = if success {
        DeliveryStatus::Delivered
    } else {
        DeliveryStatus::Failed
    };
    WebhookEvent {
        message_id,
        status: Some(status),
        raw_status: format!("success={success}"),
    }
}

fn map_webhook_status(raw: &str) -> Option<DeliveryStatus> {
    match raw.trim().to_ascii_uppercase().as_str() {
        "SENT" | "IN_TRANSIT" => Some(DeliveryStatus::Sent),
        "DELIVERED" => Some(DeliveryStatus::Delivered),
        "FAILED" => Some(DeliveryStatus::Failed),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test";

    #[test]
    fn valid_signature_accepted_with_or_without_prefix() {
        let body = br#"{"messageId":"m1","status":"DELIVERED"}"#;
        let sig = sign(SECRET, body).unwrap();
        assert!(verify_signature(SECRET, body, Some(&sig)).is_ok());
        assert!(verify_signature(SECRET, body, Some(&format!("sha256={sig}"))).is_ok());
    }

    #[test]
    fn tampered_or_missing_signature_rejected() {
        let body = br#"{"messageId":"m1","status":"DELIVERED"}"#;
        let sig = sign(SECRET, body).unwrap();
        let tampered = br#"{"messageId":"m1","status":"FAILED"}"#;

        assert!(matches!(
            verify_signature(SECRET, tampered, Some(&sig)),
            Err(InvoicingError::BadSignature)
        ));
        assert!(matches!(
            verify_signature(SECRET, body, None),
            Err(InvoicingError::BadSignature)
        ));
        assert!(matches!(
            verify_signature(SECRET, body, Some("not-hex")),
            Err(InvoicingError::BadSignature)
        ));
    }

    #[test]
    fn message_id_vocabulary() {
        let ev = parse_event(br#"{"messageId":"m1","status":"in_transit"}"#).unwrap();
        assert_eq!(ev.message_id, "m1");
        assert_eq!(ev.status, Some(DeliveryStatus::Sent));

        let ev = parse_event(br#"{"messageId":"m1","status":"BOUNCED"}"#).unwrap();
        assert_eq!(ev.status, None);
        assert_eq!(ev.raw_status, "BOUNCED");
    }

    #[test]
    fn message_id_with_success_flag() {
        let ev = parse_event(br#"{"messageId":"m1","success":true}"#).unwrap();
        assert_eq!(ev.status, Some(DeliveryStatus::Delivered));
        assert_eq!(ev.raw_status, "success=true");

        let ev = parse_event(br#"{"messageId":"m1","success":false}"#).unwrap();
        assert_eq!(ev.status, Some(DeliveryStatus::Failed));

        let ev = parse_event(br#"{"messageId":"m1","status":"SENT","success":false}"#).unwrap();
        assert_eq!(ev.status, Some(DeliveryStatus::Sent));

        let ev = parse_event(br#"{"messageId":"m1"}"#).unwrap();
        assert_eq!(ev.status, None);
    }

    #[test]
    fn document_id_vocabulary() {
        let ev = parse_event(br#"{"document_id":"d-9","success":false}"#).unwrap();
        assert_eq!(ev.message_id, "d-9");
        assert_eq!(ev.status, Some(DeliveryStatus::Failed));

        assert!(matches!(
            parse_event(br#"{"document_id":"d-9"}"#),
            Err(InvoicingError::BadPayload(_))
        ));
    }

    #[test]
    fn unusable_payloads() {
        assert!(matches!(parse_event(b"not json"), Err(InvoicingError::BadPayload(_))));
        assert!(matches!(
            parse_event(br#"{"status":"SENT"}"#),
            Err(InvoicingError::BadPayload(_))
        ));
    }
}
