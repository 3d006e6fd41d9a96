//! Persistence ports.
//!
//! The pipeline never talks to a database directly. It goes through these
//! narrow traits, scoped by company on every invoice and client access.
//! [`MemoryStore`](super::MemoryStore) implements all of them for tests and
//! single-process use.

use uuid::Uuid;

use super::error::InvoicingError;
use super::types::{Client, Company, DeliveryLogRecord, Invoice};

/// Durable per-(company, year) counter.
pub trait CounterStore {
    /// Atomically create the counter at 1 or increment it, returning the new
    /// value. `Ok(None)` means the store reported no affected row.
    ///
    /// Implementations must perform this as one indivisible storage
    /// operation (e.g. `INSERT ... ON CONFLICT DO UPDATE ... RETURNING`).
    fn increment(&self, company_id: Uuid, year: i32) -> Result<Option<u64>, InvoicingError>;
}

pub trait CompanyRepository {
    fn company(&self, id: Uuid) -> Result<Option<Company>, InvoicingError>;
    fn save_company(&self, company: Company) -> Result<(), InvoicingError>;
}

pub trait ClientRepository {
    fn client(&self, company_id: Uuid, id: Uuid) -> Result<Option<Client>, InvoicingError>;
    fn save_client(&self, client: Client) -> Result<(), InvoicingError>;
}

pub trait InvoiceRepository {
    fn insert_invoice(&self, invoice: Invoice) -> Result<(), InvoicingError>;
    fn invoice(&self, company_id: Uuid, id: Uuid) -> Result<Option<Invoice>, InvoicingError>;
    /// Lookup across companies, used to correlate inbound delivery webhooks.
    fn invoice_by_message_id(&self, message_id: &str) -> Result<Option<Invoice>, InvoicingError>;
    /// Replace the stored invoice; fails with `InvoiceNotFound` when absent.
    fn update_invoice(&self, invoice: &Invoice) -> Result<(), InvoicingError>;
    fn delete_invoice(&self, company_id: Uuid, id: Uuid) -> Result<(), InvoicingError>;
}

/// Append-only delivery log.
pub trait DeliveryLogStore {
    fn append_log(&self, record: DeliveryLogRecord) -> Result<(), InvoicingError>;
    /// Records for one invoice in insertion order.
    fn logs_for(&self, invoice_id: Uuid) -> Result<Vec<DeliveryLogRecord>, InvoicingError>;
}

/// Everything the pipeline needs from storage.
pub trait Store:
    CounterStore + CompanyRepository + ClientRepository + InvoiceRepository + DeliveryLogStore
{
}

impl<T> Store for T where
    T: CounterStore + CompanyRepository + ClientRepository + InvoiceRepository + DeliveryLogStore
{
}
