use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use tracing::{debug, info};

use super::config::{DeliveryConfig, FallbackEndpoint};
use super::transport::{
    OutboundDocument, SendReceipt, Transport, first_string, http_client, map_provider_status,
    network_error, stub_message_id, success_body,
};
use crate::core::{Channel, DeliveryStatus, InvoicingError};

const STUB_PREFIX: &str = "fallback_";

/// Relay transport for recipients without a structured network address.
///
/// Without a configured endpoint it runs in stub mode: message ids are
/// derived from the document hash and no network call is made.
pub struct FallbackTransport {
    endpoint: Option<FallbackEndpoint>,
    http: Client,
}

impl FallbackTransport {
    pub fn new(config: &DeliveryConfig) -> Result<Self, InvoicingError> {
        Ok(Self {
            endpoint: config.fallback.clone(),
            http: http_client(config.http_timeout)?,
        })
    }

    pub fn is_stub(&self) -> bool {
        self.endpoint.is_none()
    }
}

impl Transport for FallbackTransport {
    fn channel(&self) -> Channel {
        Channel::Fallback
    }

    fn send(&self, document: &OutboundDocument) -> Result<SendReceipt, InvoicingError> {
        let Some(endpoint) = &self.endpoint else {
            let message_id = stub_message_id(STUB_PREFIX, &document.xml);
            debug!(invoice_id = %document.invoice_id, %message_id, "fallback stub send");
            return Ok(SendReceipt {
                message_id,
                delivered: false,
            });
        };

        let mut req = self
            .http
            .post(format!("{}/messages", endpoint.base_url))
            .header(CONTENT_TYPE, "application/xml")
            .header(ACCEPT, "application/json")
            .body(document.xml.clone());
        if let Some(key) = &endpoint.api_key {
            req = req.header(AUTHORIZATION, format!("Bearer {key}"));
        }
        let resp = req.send().map_err(|e| network_error(Channel::Fallback, e))?;
        let body = success_body(Channel::Fallback, resp)?;

        let message_id = match serde_json::from_str::<serde_json::Value>(&body) {
            Ok(json) => first_string(&json, &["messageId", "id"]),
            Err(_) => Some(body.trim().to_string()).filter(|s| !s.is_empty()),
        }
        .ok_or_else(|| {
            InvoicingError::Http("fallback channel returned no message id".into())
        })?;

        info!(invoice_id = %document.invoice_id, %message_id, "fallback channel accepted document");
        Ok(SendReceipt {
            message_id,
            delivered: false,
        })
    }

    fn status(&self, message_id: &str) -> Result<DeliveryStatus, InvoicingError> {
        let Some(endpoint) = &self.endpoint else {
            // Stub messages never leave the process, so they count as delivered.
            return Ok(if message_id.starts_with(STUB_PREFIX) {
                DeliveryStatus::Delivered
            } else {
                DeliveryStatus::Sent
            });
        };

        let mut req = self
            .http
            .get(format!("{}/messages/{message_id}", endpoint.base_url))
            .header(ACCEPT, "application/json");
        if let Some(key) = &endpoint.api_key {
            req = req.header(AUTHORIZATION, format!("Bearer {key}"));
        }
        let resp = req.send().map_err(|e| network_error(Channel::Fallback, e))?;
        let body = success_body(Channel::Fallback, resp)?;
        let json: serde_json::Value = serde_json::from_str(&body)
            .map_err(|e| InvoicingError::Http(format!("undecodable fallback status: {e}")))?;

        Ok(map_provider_status(
            &first_string(&json, &["status", "state"]).unwrap_or_default(),
        ))
    }
}
