use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use reqwest::StatusCode;
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use serde::Serialize;
use tracing::{debug, info, warn};

use super::config::{DeliveryConfig, StructuredAuth, StructuredEndpoint};
use super::transport::{
    OutboundDocument, SendReceipt, Transport, first_string, http_client, map_provider_status,
    network_error, stub_message_id, success_body,
};
use crate::core::{Channel, DeliveryStatus, InvoicingError};

const STUB_PREFIX: &str = "structured_";
/// Tokens are dropped this long before the provider says they expire.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);
/// Assumed lifetime when the login response carries none.
const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(3600);

pub const HEADER_RECIPIENT: &str = "X-Peppol-Recipient";
pub const HEADER_SENDER: &str = "X-Peppol-Sender";
pub const HEADER_PROCESS_ID: &str = "X-Peppol-Process-Id";
pub const HEADER_DOCUMENT_TYPE_ID: &str = "X-Peppol-Document-Type-Id";

struct CachedToken {
    token: String,
    valid_until: Instant,
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

/// Transport to a structured-network access point.
///
/// Authenticates with a bearer token that is cached until shortly before it
/// expires and fetched again once after a 401. Without a configured
/// endpoint it runs in stub mode.
pub struct StructuredTransport {
    endpoint: Option<StructuredEndpoint>,
    process_id: String,
    document_type_id: String,
    http: Client,
    token: Mutex<Option<CachedToken>>,
}

impl StructuredTransport {
    pub fn new(config: &DeliveryConfig) -> Result<Self, InvoicingError> {
        Ok(Self {
            endpoint: config.structured.clone(),
            process_id: config.process_id.clone(),
            document_type_id: config.document_type_id.clone(),
            http: http_client(config.http_timeout)?,
            token: Mutex::new(None),
        })
    }

    pub fn is_stub(&self) -> bool {
        self.endpoint.is_none()
    }

    fn cache(&self) -> Result<MutexGuard<'_, Option<CachedToken>>, InvoicingError> {
        self.token
            .lock()
            .map_err(|_| InvoicingError::Http("token cache lock poisoned".into()))
    }

    fn bearer(&self, endpoint: &StructuredEndpoint) -> Result<String, InvoicingError> {
        let (auth_url, email, password) = match &endpoint.auth {
            StructuredAuth::ApiKey(key) => return Ok(key.clone()),
            StructuredAuth::Login {
                auth_url,
                email,
                password,
            } => (auth_url, email, password),
        };

        let mut cache = self.cache()?;
        if let Some(cached) = cache.as_ref().filter(|c| Instant::now() < c.valid_until) {
            return Ok(cached.token.clone());
        }

        let resp = self
            .http
            .post(format!("{auth_url}/login"))
            .json(&LoginRequest { email, password })
            .send()
            .map_err(|e| network_error(Channel::Structured, e))?;
        let body = success_body(Channel::Structured, resp)?;
        let json: serde_json::Value = serde_json::from_str(&body)
            .map_err(|e| InvoicingError::Http(format!("undecodable login response: {e}")))?;
        let token = first_string(&json, &["token", "access_token"])
            .ok_or_else(|| InvoicingError::Http("login response carries no token".into()))?;
        let ttl = json
            .get("expires_in")
            .and_then(serde_json::Value::as_u64)
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_TOKEN_TTL);

        debug!(ttl_secs = ttl.as_secs(), "structured channel token refreshed");
        *cache = Some(CachedToken {
            token: token.clone(),
            valid_until: Instant::now() + ttl.saturating_sub(EXPIRY_MARGIN),
        });
        Ok(token)
    }

    fn invalidate(&self) -> Result<(), InvoicingError> {
        *self.cache()? = None;
        Ok(())
    }

    /// Run an authenticated request, fetching a new token once on 401.
    fn execute<F>(&self, endpoint: &StructuredEndpoint, build: F) -> Result<Response, InvoicingError>
    where
        F: Fn(&Client) -> RequestBuilder,
    {
        let token = self.bearer(endpoint)?;
        let resp = build(&self.http)
            .header(AUTHORIZATION, format!("Bearer {token}"))
            .send()
            .map_err(|e| network_error(Channel::Structured, e))?;

        let can_refresh = matches!(endpoint.auth, StructuredAuth::Login { .. });
        if resp.status() != StatusCode::UNAUTHORIZED || !can_refresh {
            return Ok(resp);
        }

        warn!("structured channel rejected token, logging in again");
        self.invalidate()?;
        let token = self.bearer(endpoint)?;
        build(&self.http)
            .header(AUTHORIZATION, format!("Bearer {token}"))
            .send()
            .map_err(|e| network_error(Channel::Structured, e))
    }
}

fn peppol_success(json: &serde_json::Value) -> Option<bool> {
    json.get("peppolMessage")?.get("success")?.as_bool()
}

impl Transport for StructuredTransport {
    fn channel(&self) -> Channel {
        Channel::Structured
    }

    fn send(&self, document: &OutboundDocument) -> Result<SendReceipt, InvoicingError> {
        let recipient = document
            .recipient
            .as_ref()
            .filter(|r| r.is_well_formed())
            .ok_or(InvoicingError::MissingNetworkId)?;

        let Some(endpoint) = &self.endpoint else {
            let message_id = stub_message_id(STUB_PREFIX, &document.xml);
            debug!(invoice_id = %document.invoice_id, %message_id, "structured stub send");
            return Ok(SendReceipt {
                message_id,
                delivered: false,
            });
        };

        let recipient_id = recipient.participant_id();
        let sender_id = document.sender.as_ref().map(|s| s.participant_id());
        let url = format!("{}/invoices/outgoing/ubl", endpoint.base_url);
        let resp = self.execute(endpoint, |http| {
            let mut req = http
                .post(&url)
                .header(CONTENT_TYPE, "application/xml")
                .header(ACCEPT, "application/json")
                .header(HEADER_RECIPIENT, &recipient_id)
                .header(HEADER_PROCESS_ID, &self.process_id)
                .header(HEADER_DOCUMENT_TYPE_ID, &self.document_type_id)
                .body(document.xml.clone());
            if let Some(sender) = &sender_id {
                req = req.header(HEADER_SENDER, sender);
            }
            req
        })?;
        let body = success_body(Channel::Structured, resp)?;
        let json: serde_json::Value = serde_json::from_str(&body)
            .map_err(|e| InvoicingError::Http(format!("undecodable send response: {e}")))?;

        let message_id = first_string(&json, &["uuid", "messageId", "id"]).ok_or_else(|| {
            InvoicingError::Http("structured channel returned no message id".into())
        })?;
        let delivered = json
            .get("delivered")
            .and_then(serde_json::Value::as_bool)
            .or_else(|| peppol_success(&json))
            .unwrap_or(false);

        info!(
            invoice_id = %document.invoice_id,
            recipient = %recipient_id,
            %message_id,
            delivered,
            "structured channel accepted document"
        );
        Ok(SendReceipt {
            message_id,
            delivered,
        })
    }

    fn status(&self, message_id: &str) -> Result<DeliveryStatus, InvoicingError> {
        let Some(endpoint) = &self.endpoint else {
            return Ok(if message_id.starts_with(STUB_PREFIX) {
                DeliveryStatus::Delivered
            } else {
                DeliveryStatus::Sent
            });
        };

        let url = format!("{}/invoices/{message_id}", endpoint.base_url);
        let resp = self.execute(endpoint, |http| {
            http.get(&url).header(ACCEPT, "application/json")
        })?;
        let body = success_body(Channel::Structured, resp)?;
        let json: serde_json::Value = serde_json::from_str(&body)
            .map_err(|e| InvoicingError::Http(format!("undecodable status response: {e}")))?;

        if let Some(state) = first_string(&json, &["status", "state"]) {
            return Ok(map_provider_status(&state));
        }
        Ok(match peppol_success(&json) {
            Some(true) => DeliveryStatus::Delivered,
            Some(false) => DeliveryStatus::Failed,
            None => DeliveryStatus::Sent,
        })
    }
}
