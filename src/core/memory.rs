use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use uuid::Uuid;

use super::error::InvoicingError;
use super::store::{
    ClientRepository, CompanyRepository, CounterStore, DeliveryLogStore, InvoiceRepository,
};
use super::types::{Client, Company, DeliveryLogRecord, Invoice};

/// In-process implementation of every persistence port.
///
/// Counters live behind their own mutex, so an increment is indivisible for
/// all threads of the process. Not suitable for several processes sharing
/// one dataset.
#[derive(Debug, Default)]
pub struct MemoryStore {
    counters: Mutex<HashMap<(Uuid, i32), u64>>,
    companies: Mutex<HashMap<Uuid, Company>>,
    clients: Mutex<HashMap<Uuid, Client>>,
    invoices: Mutex<HashMap<Uuid, Invoice>>,
    logs: Mutex<Vec<DeliveryLogRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current counter value, if the (company, year) row exists.
    pub fn counter(&self, company_id: Uuid, year: i32) -> Option<u64> {
        lock(&self.counters)
            .ok()
            .and_then(|c| c.get(&(company_id, year)).copied())
    }
}

fn lock<T>(m: &Mutex<T>) -> Result<MutexGuard<'_, T>, InvoicingError> {
    m.lock()
        .map_err(|_| InvoicingError::Storage("memory store lock poisoned".into()))
}

impl CounterStore for MemoryStore {
    fn increment(&self, company_id: Uuid, year: i32) -> Result<Option<u64>, InvoicingError> {
        let mut counters = lock(&self.counters)?;
        let seq = counters.entry((company_id, year)).or_insert(0);
        *seq += 1;
        Ok(Some(*seq))
    }
}

impl CompanyRepository for MemoryStore {
    fn company(&self, id: Uuid) -> Result<Option<Company>, InvoicingError> {
        Ok(lock(&self.companies)?.get(&id).cloned())
    }

    fn save_company(&self, company: Company) -> Result<(), InvoicingError> {
        lock(&self.companies)?.insert(company.id, company);
        Ok(())
    }
}

impl ClientRepository for MemoryStore {
    fn client(&self, company_id: Uuid, id: Uuid) -> Result<Option<Client>, InvoicingError> {
        Ok(lock(&self.clients)?
            .get(&id)
            .filter(|c| c.company_id == company_id)
            .cloned())
    }

    fn save_client(&self, client: Client) -> Result<(), InvoicingError> {
        lock(&self.clients)?.insert(client.id, client);
        Ok(())
    }
}

impl InvoiceRepository for MemoryStore {
    fn insert_invoice(&self, invoice: Invoice) -> Result<(), InvoicingError> {
        let mut invoices = lock(&self.invoices)?;
        if invoices.contains_key(&invoice.id) {
            return Err(InvoicingError::Storage(format!(
                "invoice {} already exists",
                invoice.id
            )));
        }
        invoices.insert(invoice.id, invoice);
        Ok(())
    }

    fn invoice(&self, company_id: Uuid, id: Uuid) -> Result<Option<Invoice>, InvoicingError> {
        Ok(lock(&self.invoices)?
            .get(&id)
            .filter(|i| i.company_id == company_id)
            .cloned())
    }

    fn invoice_by_message_id(&self, message_id: &str) -> Result<Option<Invoice>, InvoicingError> {
        Ok(lock(&self.invoices)?
            .values()
            .find(|i| i.message_id.as_deref() == Some(message_id))
            .cloned())
    }

    fn update_invoice(&self, invoice: &Invoice) -> Result<(), InvoicingError> {
        let mut invoices = lock(&self.invoices)?;
        match invoices.get_mut(&invoice.id) {
            Some(existing) if existing.company_id == invoice.company_id => {
                *existing = invoice.clone();
                Ok(())
            }
            _ => Err(InvoicingError::InvoiceNotFound),
        }
    }

    fn delete_invoice(&self, company_id: Uuid, id: Uuid) -> Result<(), InvoicingError> {
        let mut invoices = lock(&self.invoices)?;
        match invoices.get(&id) {
            Some(i) if i.company_id == company_id => {
                invoices.remove(&id);
                Ok(())
            }
            _ => Err(InvoicingError::InvoiceNotFound),
        }
    }
}

impl DeliveryLogStore for MemoryStore {
    fn append_log(&self, record: DeliveryLogRecord) -> Result<(), InvoicingError> {
        lock(&self.logs)?.push(record);
        Ok(())
    }

    fn logs_for(&self, invoice_id: Uuid) -> Result<Vec<DeliveryLogRecord>, InvoicingError> {
        Ok(lock(&self.logs)?
            .iter()
            .filter(|r| r.invoice_id == invoice_id)
            .cloned()
            .collect())
    }
}
