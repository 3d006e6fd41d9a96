use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::core::InvoicingError;
use crate::documents::{PEPPOL_INVOICE_DOCUMENT_TYPE_ID, PEPPOL_PROFILE_ID};

const DEFAULT_STORAGE_ROOT: &str = "./storage";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Everything the delivery pipeline reads from its environment.
///
/// Built once at startup and passed by reference. An unset channel
/// endpoint puts that channel into stub mode.
#[derive(Clone)]
pub struct DeliveryConfig {
    /// Root directory for generated artifacts.
    pub storage_root: PathBuf,
    pub fallback: Option<FallbackEndpoint>,
    pub structured: Option<StructuredEndpoint>,
    /// Routing process identifier sent with structured deliveries.
    pub process_id: String,
    /// Routing document type identifier sent with structured deliveries.
    pub document_type_id: String,
    /// Shared secret for inbound webhook signatures; unset disables checking.
    pub webhook_secret: Option<String>,
    pub http_timeout: Duration,
}

#[derive(Clone)]
pub struct FallbackEndpoint {
    pub base_url: String,
    pub api_key: Option<String>,
}

#[derive(Clone)]
pub struct StructuredEndpoint {
    pub base_url: String,
    pub auth: StructuredAuth,
}

/// How the structured channel obtains its bearer credential.
#[derive(Clone)]
pub enum StructuredAuth {
    /// Static key, used as the bearer token directly.
    ApiKey(String),
    /// Email/password exchanged for a short-lived token at `{auth_url}/login`.
    Login {
        auth_url: String,
        email: String,
        password: String,
    },
}

impl DeliveryConfig {
    /// Stub-mode configuration writing artifacts below `storage_root`.
    pub fn new(storage_root: impl Into<PathBuf>) -> Self {
        Self {
            storage_root: storage_root.into(),
            fallback: None,
            structured: None,
            process_id: PEPPOL_PROFILE_ID.to_string(),
            document_type_id: PEPPOL_INVOICE_DOCUMENT_TYPE_ID.to_string(),
            webhook_secret: None,
            http_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn with_fallback(mut self, base_url: impl Into<String>, api_key: Option<String>) -> Self {
        self.fallback = Some(FallbackEndpoint {
            base_url: trim_url(base_url.into()),
            api_key,
        });
        self
    }

    pub fn with_structured(mut self, base_url: impl Into<String>, auth: StructuredAuth) -> Self {
        self.structured = Some(StructuredEndpoint {
            base_url: trim_url(base_url.into()),
            auth,
        });
        self
    }

    pub fn with_routing(
        mut self,
        process_id: impl Into<String>,
        document_type_id: impl Into<String>,
    ) -> Self {
        self.process_id = process_id.into();
        self.document_type_id = document_type_id.into();
        self
    }

    pub fn with_webhook_secret(mut self, secret: impl Into<String>) -> Self {
        self.webhook_secret = Some(secret.into());
        self
    }

    pub fn with_http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = timeout;
        self
    }

    /// Load `.env` if present, then read the process environment.
    pub fn from_env() -> Result<Self, InvoicingError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, InvoicingError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let mut config =
            Self::new(var("DOCS_DIR").unwrap_or_else(|| DEFAULT_STORAGE_ROOT.to_string()));

        if let Some(base_url) = var("FALLBACK_BASE_URL") {
            config = config.with_fallback(base_url, var("FALLBACK_API_KEY"));
        }

        if let Some(base_url) = var("STRUCTURED_BASE_URL") {
            let auth = if let Some(key) = var("STRUCTURED_API_KEY") {
                StructuredAuth::ApiKey(key)
            } else {
                match (var("STRUCTURED_EMAIL"), var("STRUCTURED_PASSWORD")) {
                    (Some(email), Some(password)) => StructuredAuth::Login {
                        auth_url: trim_url(
                            var("STRUCTURED_AUTH_URL").unwrap_or_else(|| base_url.clone()),
                        ),
                        email,
                        password,
                    },
                    _ => {
                        return Err(InvoicingError::Config(
                            "STRUCTURED_BASE_URL is set but neither STRUCTURED_API_KEY nor \
                             STRUCTURED_EMAIL/STRUCTURED_PASSWORD are"
                                .into(),
                        ));
                    }
                }
            };
            config = config.with_structured(base_url, auth);
        }

        if let Some(process_id) = var("STRUCTURED_PROCESS_ID") {
            config.process_id = process_id;
        }
        if let Some(document_type_id) = var("STRUCTURED_DOCUMENT_TYPE_ID") {
            config.document_type_id = document_type_id;
        }
        config.webhook_secret = var("DELIVERY_WEBHOOK_SECRET");

        if let Some(raw) = var("DELIVERY_HTTP_TIMEOUT_SECS") {
            let secs: u64 = raw.trim().parse().map_err(|_| {
                InvoicingError::Config(format!(
                    "DELIVERY_HTTP_TIMEOUT_SECS must be a whole number of seconds, got {raw:?}"
                ))
            })?;
            config.http_timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }
}

fn trim_url(url: String) -> String {
    url.trim().trim_end_matches('/').to_string()
}

fn redact(secret: &Option<String>) -> &'static str {
    if secret.is_some() { "<redacted>" } else { "<unset>" }
}

impl fmt::Debug for DeliveryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeliveryConfig")
            .field("storage_root", &self.storage_root)
            .field("fallback", &self.fallback)
            .field("structured", &self.structured)
            .field("process_id", &self.process_id)
            .field("document_type_id", &self.document_type_id)
            .field("webhook_secret", &redact(&self.webhook_secret))
            .field("http_timeout", &self.http_timeout)
            .finish()
    }
}

impl fmt::Debug for FallbackEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FallbackEndpoint")
            .field("base_url", &self.base_url)
            .field("api_key", &redact(&self.api_key))
            .finish()
    }
}

impl fmt::Debug for StructuredEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StructuredEndpoint")
            .field("base_url", &self.base_url)
            .field("auth", &self.auth)
            .finish()
    }
}

impl fmt::Debug for StructuredAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ApiKey(_) => f.write_str("ApiKey(<redacted>)"),
            Self::Login {
                auth_url, email, ..
            } => f
                .debug_struct("Login")
                .field("auth_url", auth_url)
                .field("email", email)
                .field("password", &"<redacted>")
                .finish(),
        }
    }
}
