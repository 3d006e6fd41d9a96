use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::{Address, Client, Company, Invoice, InvoiceLine, NetworkAddress, Totals};

/// Normalized input to both renderers.
///
/// Built from an invoice, its company and its client. Renderers depend on
/// nothing else, which keeps their output reproducible.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentModel {
    pub invoice_id: Uuid,
    pub number: String,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    pub currency: String,
    pub supplier: DocParty,
    pub customer: DocParty,
    pub lines: Vec<InvoiceLine>,
    pub totals: Totals,
    pub payment: Option<PaymentAccount>,
}

/// Supplier or customer as printed on the documents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocParty {
    pub name: String,
    pub vat_id: Option<String>,
    pub address: Address,
    pub email: Option<String>,
    pub endpoint: Option<NetworkAddress>,
}

/// Bank account for credit transfer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentAccount {
    pub iban: String,
    pub bic: Option<String>,
}

impl DocumentModel {
    pub fn new(invoice: &Invoice, company: &Company, client: &Client) -> Self {
        let payment = company
            .iban
            .as_ref()
            .filter(|iban| !iban.trim().is_empty())
            .map(|iban| PaymentAccount {
                iban: iban.replace(' ', ""),
                bic: company.bic.clone().filter(|b| !b.trim().is_empty()),
            });

        Self {
            invoice_id: invoice.id,
            number: invoice.number.clone(),
            issue_date: invoice.issue_date,
            due_date: invoice.due_date,
            currency: invoice.currency.clone(),
            supplier: DocParty {
                name: company.name.clone(),
                vat_id: company.vat_id.clone(),
                address: company.address.clone(),
                email: company.email.clone(),
                endpoint: company.network_address.clone(),
            },
            customer: DocParty {
                name: client.name.clone(),
                vat_id: client.vat_id.clone(),
                address: client.address.clone(),
                email: client.email.clone(),
                endpoint: client.network_address.clone(),
            },
            lines: invoice.lines.clone(),
            totals: invoice.totals.clone(),
            payment,
        }
    }
}
