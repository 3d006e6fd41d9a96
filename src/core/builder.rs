use chrono::NaiveDate;
use rust_decimal::Decimal;
use uuid::Uuid;

use super::drafts::NewInvoice;
use super::error::InvoicingError;
use super::types::*;
use super::validation;

/// Builder for a new invoice submission.
///
/// ```
/// use reliabill::core::*;
/// use rust_decimal_macros::dec;
/// use chrono::NaiveDate;
///
/// let draft = NewInvoiceBuilder::new(
///     NaiveDate::from_ymd_opt(2025, 1, 15).unwrap(),
///     NaiveDate::from_ymd_opt(2025, 2, 14).unwrap(),
/// )
/// .add_line(LineInput::new("Consulting", dec!(8), dec!(95), dec!(21)))
/// .build()
/// .unwrap();
/// assert_eq!(draft.currency, "EUR");
/// ```
pub struct NewInvoiceBuilder {
    client_id: Option<Uuid>,
    issue_date: NaiveDate,
    due_date: NaiveDate,
    currency: String,
    lines: Vec<LineInput>,
}

impl NewInvoiceBuilder {
    pub fn new(issue_date: NaiveDate, due_date: NaiveDate) -> Self {
        Self {
            client_id: None,
            issue_date,
            due_date,
            currency: "EUR".to_string(),
            lines: Vec::new(),
        }
    }

    pub fn client(mut self, client_id: Uuid) -> Self {
        self.client_id = Some(client_id);
        self
    }

    pub fn currency(mut self, code: impl Into<String>) -> Self {
        self.currency = code.into();
        self
    }

    pub fn add_line(mut self, line: LineInput) -> Self {
        self.lines.push(line);
        self
    }

    /// Build the submission, running input validation.
    pub fn build(self) -> Result<NewInvoice, InvoicingError> {
        let draft = NewInvoice {
            client_id: self.client_id,
            issue_date: self.issue_date,
            due_date: self.due_date,
            currency: self.currency,
            lines: self.lines,
        };
        validation::validate_new_invoice(&draft)?;
        Ok(draft)
    }
}

impl LineInput {
    pub fn new(
        description: impl Into<String>,
        quantity: Decimal,
        unit_price: Decimal,
        vat_rate: Decimal,
    ) -> Self {
        Self {
            description: description.into(),
            quantity,
            unit_price,
            vat_rate,
        }
    }
}

/// Builder for Company.
pub struct CompanyBuilder {
    id: Uuid,
    name: String,
    vat_id: Option<String>,
    address: Address,
    email: Option<String>,
    iban: Option<String>,
    bic: Option<String>,
    network_address: Option<NetworkAddress>,
}

impl CompanyBuilder {
    pub fn new(name: impl Into<String>, address: Address) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            vat_id: None,
            address,
            email: None,
            iban: None,
            bic: None,
            network_address: None,
        }
    }

    pub fn id(mut self, id: Uuid) -> Self {
        self.id = id;
        self
    }

    pub fn vat_id(mut self, id: impl Into<String>) -> Self {
        self.vat_id = Some(id.into());
        self
    }

    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn bank_account(mut self, iban: impl Into<String>, bic: Option<String>) -> Self {
        self.iban = Some(iban.into());
        self.bic = bic;
        self
    }

    pub fn network_address(mut self, scheme: impl Into<String>, id: impl Into<String>) -> Self {
        self.network_address = Some(NetworkAddress::new(scheme, id));
        self
    }

    pub fn build(self) -> Company {
        Company {
            id: self.id,
            name: self.name,
            vat_id: self.vat_id,
            address: self.address,
            email: self.email,
            iban: self.iban,
            bic: self.bic,
            network_address: self.network_address,
        }
    }
}

/// Builder for Client. Defaults to fallback delivery.
pub struct ClientBuilder {
    id: Uuid,
    company_id: Uuid,
    name: String,
    vat_id: Option<String>,
    email: Option<String>,
    address: Address,
    delivery_mode: DeliveryMode,
    network_address: Option<NetworkAddress>,
}

impl ClientBuilder {
    pub fn new(company_id: Uuid, name: impl Into<String>, address: Address) -> Self {
        Self {
            id: Uuid::new_v4(),
            company_id,
            name: name.into(),
            vat_id: None,
            email: None,
            address,
            delivery_mode: DeliveryMode::Fallback,
            network_address: None,
        }
    }

    pub fn id(mut self, id: Uuid) -> Self {
        self.id = id;
        self
    }

    pub fn vat_id(mut self, id: impl Into<String>) -> Self {
        self.vat_id = Some(id.into());
        self
    }

    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn delivery_mode(mut self, mode: DeliveryMode) -> Self {
        self.delivery_mode = mode;
        self
    }

    /// Register the client on the structured network and opt into it.
    pub fn structured(mut self, scheme: impl Into<String>, id: impl Into<String>) -> Self {
        self.delivery_mode = DeliveryMode::Structured;
        self.network_address = Some(NetworkAddress::new(scheme, id));
        self
    }

    pub fn build(self) -> Client {
        Client {
            id: self.id,
            company_id: self.company_id,
            name: self.name,
            vat_id: self.vat_id,
            email: self.email,
            address: self.address,
            delivery_mode: self.delivery_mode,
            network_address: self.network_address,
        }
    }
}

/// Builder for Address.
pub struct AddressBuilder {
    street: Option<String>,
    city: String,
    postal_code: String,
    country_code: String,
}

impl AddressBuilder {
    pub fn new(
        city: impl Into<String>,
        postal_code: impl Into<String>,
        country_code: impl Into<String>,
    ) -> Self {
        Self {
            street: None,
            city: city.into(),
            postal_code: postal_code.into(),
            country_code: country_code.into(),
        }
    }

    pub fn street(mut self, street: impl Into<String>) -> Self {
        self.street = Some(street.into());
        self
    }

    pub fn build(self) -> Address {
        Address {
            street: self.street,
            city: self.city,
            postal_code: self.postal_code,
            country_code: self.country_code,
        }
    }
}
