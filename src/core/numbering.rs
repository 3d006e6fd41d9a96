use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use super::error::InvoicingError;
use super::store::CounterStore;

/// Result of a number allocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocation {
    pub year: i32,
    pub seq: u64,
    /// Formatted number, e.g. "2025-0007".
    pub number: String,
}

/// Gap-free invoice numbers, one sequence per company and calendar year.
///
/// The allocator holds no state of its own. Each call is a single atomic
/// increment on the [`CounterStore`], which keeps numbering correct across
/// threads and across processes sharing the same store.
pub struct InvoiceNumberAllocator<'a, S: CounterStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: CounterStore + ?Sized> InvoiceNumberAllocator<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Allocate the next number for `company_id` in the year of `issue_date`.
    pub fn allocate(
        &self,
        company_id: Uuid,
        issue_date: NaiveDate,
    ) -> Result<Allocation, InvoicingError> {
        let year = issue_date.year();
        let seq = self
            .store
            .increment(company_id, year)?
            .ok_or(InvoicingError::CounterAllocationFailed)?;
        let number = format_number(year, seq);
        debug!(%company_id, year, seq, "invoice number allocated");
        Ok(Allocation { year, seq, number })
    }
}

/// Format `{year}-{seq}` with the sequence zero-padded to 4 digits.
///
/// Sequences beyond 9999 simply widen.
pub fn format_number(year: i32, seq: u64) -> String {
    format!("{year}-{seq:0>4}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::MemoryStore;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn sequential_numbering() {
        let store = MemoryStore::new();
        let alloc = InvoiceNumberAllocator::new(&store);
        let company = Uuid::new_v4();

        let first = alloc.allocate(company, date(2025, 3, 1)).unwrap();
        assert_eq!(first.seq, 1);
        assert_eq!(first.number, "2025-0001");

        let second = alloc.allocate(company, date(2025, 11, 30)).unwrap();
        assert_eq!(second.seq, 2);
        assert_eq!(second.number, "2025-0002");
    }

    #[test]
    fn sequences_per_year_and_company() {
        let store = MemoryStore::new();
        let alloc = InvoiceNumberAllocator::new(&store);
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        alloc.allocate(a, date(2024, 12, 31)).unwrap();
        assert_eq!(alloc.allocate(a, date(2025, 1, 1)).unwrap().number, "2025-0001");
        assert_eq!(alloc.allocate(b, date(2024, 6, 1)).unwrap().number, "2024-0001");
        assert_eq!(alloc.allocate(a, date(2024, 6, 1)).unwrap().number, "2024-0002");
    }

    #[test]
    fn padding_widens() {
        assert_eq!(format_number(2025, 7), "2025-0007");
        assert_eq!(format_number(2025, 9999), "2025-9999");
        assert_eq!(format_number(2025, 12345), "2025-12345");
    }

    #[test]
    fn no_row_affected_fails() {
        struct Broken;
        impl CounterStore for Broken {
            fn increment(&self, _: Uuid, _: i32) -> Result<Option<u64>, InvoicingError> {
                Ok(None)
            }
        }
        let alloc = InvoiceNumberAllocator::new(&Broken);
        assert!(matches!(
            alloc.allocate(Uuid::new_v4(), date(2025, 1, 1)),
            Err(InvoicingError::CounterAllocationFailed)
        ));
    }
}
