use chrono::Utc;
use tracing::debug;
use uuid::Uuid;

use crate::core::{DeliveryLogRecord, DeliveryLogStore, InvoicingError, LogKind};

/// Append-only lifecycle log over a [`DeliveryLogStore`].
pub struct AuditLog<'a, S: DeliveryLogStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: DeliveryLogStore + ?Sized> AuditLog<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    pub fn record(
        &self,
        invoice_id: Uuid,
        kind: LogKind,
        message: impl Into<String>,
    ) -> Result<DeliveryLogRecord, InvoicingError> {
        let record = DeliveryLogRecord {
            id: Uuid::new_v4(),
            invoice_id,
            kind,
            message: message.into(),
            timestamp: Utc::now(),
        };
        self.store.append_log(record.clone())?;
        debug!(%invoice_id, kind = kind.as_str(), "delivery log appended");
        Ok(record)
    }

    /// Records of one invoice, oldest first.
    pub fn list(&self, invoice_id: Uuid) -> Result<Vec<DeliveryLogRecord>, InvoicingError> {
        let mut records = self.store.logs_for(invoice_id)?;
        records.sort_by_key(|r| r.timestamp);
        Ok(records)
    }
}
