//! UBL and PDF rendering.
//!
//! Both renderers are pure functions of a [`DocumentModel`]: the same model
//! always produces byte-identical output, so re-preparing an invoice never
//! changes its artifacts.
//!
//! # Example
//!
//! ```no_run
//! use reliabill::core::*;
//! use reliabill::documents::{self, DocumentModel};
//!
//! let (invoice, company, client): (Invoice, Company, Client) = todo!();
//! let model = DocumentModel::new(&invoice, &company, &client);
//! let xml = documents::render_ubl(&model).unwrap();
//! assert!(documents::check_ubl(&xml).is_empty());
//! let pdf = documents::render_pdf(&model).unwrap();
//! ```

mod check;
mod model;
mod pdf;
mod ubl;
pub(crate) mod xml_utils;

pub use check::check_ubl;
pub use model::{DocParty, DocumentModel, PaymentAccount};
pub use pdf::render_pdf;
pub use ubl::render_ubl;

use crate::core::InvoicingError;

/// Peppol BIS Billing 3.0 customization identifier (BT-24).
pub const PEPPOL_CUSTOMIZATION_ID: &str =
    "urn:cen.eu:en16931:2017#compliant#urn:fdc:peppol.eu:2017:poacc:billing:3.0";

/// Peppol BIS Billing 3.0 profile identifier (BT-23). Doubles as the
/// process id in structured-channel routing.
pub const PEPPOL_PROFILE_ID: &str = "urn:fdc:peppol.eu:2017:poacc:billing:01:1.0";

/// Peppol document type identifier of a BIS 3.0 UBL invoice.
pub const PEPPOL_INVOICE_DOCUMENT_TYPE_ID: &str = "busdox-docid-qns::urn:oasis:names:specification:ubl:schema:xsd:Invoice-2::Invoice##urn:cen.eu:en16931:2017#compliant#urn:fdc:peppol.eu:2017:poacc:billing:3.0::2.1";

/// UBL 2.1 namespace URIs.
pub mod ubl_ns {
    pub const INVOICE: &str = "urn:oasis:names:specification:ubl:schema:xsd:Invoice-2";
    pub const CAC: &str =
        "urn:oasis:names:specification:ubl:schema:xsd:CommonAggregateComponents-2";
    pub const CBC: &str = "urn:oasis:names:specification:ubl:schema:xsd:CommonBasicComponents-2";
}

/// Renders the two invoice artifacts.
///
/// The orchestrator takes a renderer so tests can substitute one that
/// fails or records its calls.
pub trait DocumentRenderer {
    fn render_ubl(&self, model: &DocumentModel) -> Result<Vec<u8>, InvoicingError>;
    fn render_pdf(&self, model: &DocumentModel) -> Result<Vec<u8>, InvoicingError>;
}

/// The built-in renderers of this module.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardRenderer;

impl DocumentRenderer for StandardRenderer {
    fn render_ubl(&self, model: &DocumentModel) -> Result<Vec<u8>, InvoicingError> {
        render_ubl(model)
    }

    fn render_pdf(&self, model: &DocumentModel) -> Result<Vec<u8>, InvoicingError> {
        render_pdf(model)
    }
}
