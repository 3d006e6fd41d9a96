//! # reliabill
//!
//! Invoice finalization and delivery: gap-free numbering, cent-exact totals,
//! reproducible UBL and PDF documents, routing between a structured network
//! channel and a fallback relay, and status reconciliation by polling or
//! signed webhook.
//!
//! All monetary values use [`rust_decimal::Decimal`], never floating point.
//! Every amount goes through [`round2`] or [`sum`], which round half away
//! from zero at each step.
//!
//! ## Quick Start
//!
//! ```rust
//! use chrono::NaiveDate;
//! use reliabill::core::*;
//! use rust_decimal_macros::dec;
//!
//! let store = MemoryStore::new();
//! let company = CompanyBuilder::new("Acme BV", AddressBuilder::new("Antwerpen", "2000", "BE").build())
//!     .vat_id("BE0123456789")
//!     .build();
//! let company_id = company.id;
//! store.save_company(company).unwrap();
//!
//! let draft = NewInvoiceBuilder::new(
//!     NaiveDate::from_ymd_opt(2025, 5, 2).unwrap(),
//!     NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
//! )
//! .add_line(LineInput::new("Consulting", dec!(2), dec!(50), dec!(21)))
//! .add_line(LineInput::new("Travel", dec!(1), dec!(10), dec!(6)))
//! .build()
//! .unwrap();
//!
//! let invoice = create_invoice(&store, company_id, draft).unwrap();
//! assert_eq!(invoice.number, "2025-0001");
//! assert_eq!(invoice.totals.total_incl, dec!(131.60));
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `core` (default) | Invoice types, amounts, totals, numbering, validation, persistence ports |
//! | `documents` (default) | UBL 2.1 / Peppol BIS 3.0 and PDF rendering |
//! | `delivery` (default) | Artifact storage, routing, transports, webhook, orchestrator |
//! | `all` | Everything |

#[cfg(feature = "core")]
pub mod core;

#[cfg(feature = "documents")]
pub mod documents;

#[cfg(feature = "delivery")]
pub mod delivery;

// Re-export core types at crate root for convenience
#[cfg(feature = "core")]
pub use crate::core::*;
