//! Artifact storage, channel routing, transports and the delivery state
//! machine.
//!
//! # Example
//!
//! ```no_run
//! use reliabill::core::*;
//! use reliabill::delivery::{DeliveryConfig, DeliveryOrchestrator};
//! use uuid::Uuid;
//!
//! let store = MemoryStore::new();
//! let config = DeliveryConfig::from_env().unwrap();
//! let orchestrator = DeliveryOrchestrator::new(&store, &config).unwrap();
//!
//! let (company_id, invoice_id): (Uuid, Uuid) = todo!();
//! orchestrator.prepare(company_id, invoice_id, false).unwrap();
//! let sent = orchestrator.send(company_id, invoice_id).unwrap();
//! println!("{} -> {}", sent.number, sent.status);
//! ```

mod artifacts;
mod audit;
mod config;
mod fallback;
mod orchestrator;
pub mod router;
mod structured;
mod transport;
pub mod webhook;

pub use artifacts::{ArtifactKind, ArtifactStorage};
pub use audit::AuditLog;
pub use config::{DeliveryConfig, FallbackEndpoint, StructuredAuth, StructuredEndpoint};
pub use fallback::FallbackTransport;
pub use orchestrator::DeliveryOrchestrator;
pub use structured::{
    HEADER_DOCUMENT_TYPE_ID, HEADER_PROCESS_ID, HEADER_RECIPIENT, HEADER_SENDER,
    StructuredTransport,
};
pub use transport::{
    OutboundDocument, SendReceipt, Transport, map_provider_status, stub_message_id,
};
pub use webhook::{SIGNATURE_HEADER, WebhookAck, WebhookEvent};
