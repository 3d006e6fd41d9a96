use rust_decimal::Decimal;

use super::model::{DocParty, DocumentModel};
use super::xml_utils::{XmlWriter, format_decimal};
use super::{PEPPOL_CUSTOMIZATION_ID, PEPPOL_PROFILE_ID, ubl_ns};
use crate::core::{InvoiceLine, InvoicingError};

/// UNTDID 1001: commercial invoice.
const INVOICE_TYPE_CODE: &str = "380";
/// UNTDID 4461: credit transfer.
const CREDIT_TRANSFER: &str = "30";
/// UNECE Rec 20: one (piece).
const UNIT_PIECE: &str = "C62";

/// Generate a Peppol BIS 3.0 UBL 2.1 Invoice.
pub fn render_ubl(model: &DocumentModel) -> Result<Vec<u8>, InvoicingError> {
    let currency = model.currency.as_str();
    let mut w = XmlWriter::new()?;

    w.start_element_with_attrs(
        "Invoice",
        &[
            ("xmlns", ubl_ns::INVOICE),
            ("xmlns:cac", ubl_ns::CAC),
            ("xmlns:cbc", ubl_ns::CBC),
        ],
    )?;

    w.text_element("cbc:CustomizationID", PEPPOL_CUSTOMIZATION_ID)?;
    w.text_element("cbc:ProfileID", PEPPOL_PROFILE_ID)?;
    w.text_element("cbc:ID", &model.number)?;
    w.text_element("cbc:IssueDate", &model.issue_date.to_string())?;
    w.text_element("cbc:DueDate", &model.due_date.to_string())?;
    w.text_element("cbc:InvoiceTypeCode", INVOICE_TYPE_CODE)?;
    w.text_element("cbc:DocumentCurrencyCode", currency)?;
    // Peppol requires a buyer or order reference; the invoice number serves.
    w.text_element("cbc:BuyerReference", &model.number)?;

    write_party(&mut w, &model.supplier, "cac:AccountingSupplierParty")?;
    write_party(&mut w, &model.customer, "cac:AccountingCustomerParty")?;

    if let Some(account) = &model.payment {
        w.start_element("cac:PaymentMeans")?;
        w.text_element("cbc:PaymentMeansCode", CREDIT_TRANSFER)?;
        w.text_element("cbc:PaymentID", &model.number)?;
        w.start_element("cac:PayeeFinancialAccount")?;
        w.text_element("cbc:ID", &account.iban)?;
        if let Some(bic) = &account.bic {
            w.start_element("cac:FinancialInstitutionBranch")?;
            w.text_element("cbc:ID", bic)?;
            w.end_element("cac:FinancialInstitutionBranch")?;
        }
        w.end_element("cac:PayeeFinancialAccount")?;
        w.end_element("cac:PaymentMeans")?;
    }

    w.start_element("cac:TaxTotal")?;
    w.amount_element("cbc:TaxAmount", model.totals.total_vat, currency)?;
    for sub in &model.totals.tax_subtotals {
        w.start_element("cac:TaxSubtotal")?;
        w.amount_element("cbc:TaxableAmount", sub.taxable, currency)?;
        w.amount_element("cbc:TaxAmount", sub.tax, currency)?;
        write_tax_category(&mut w, "cac:TaxCategory", sub.rate)?;
        w.end_element("cac:TaxSubtotal")?;
    }
    w.end_element("cac:TaxTotal")?;

    w.start_element("cac:LegalMonetaryTotal")?;
    w.amount_element("cbc:LineExtensionAmount", model.totals.total_excl, currency)?;
    w.amount_element("cbc:TaxExclusiveAmount", model.totals.total_excl, currency)?;
    w.amount_element("cbc:TaxInclusiveAmount", model.totals.total_incl, currency)?;
    w.amount_element("cbc:PayableAmount", model.totals.total_incl, currency)?;
    w.end_element("cac:LegalMonetaryTotal")?;

    for (i, line) in model.lines.iter().enumerate() {
        write_line(&mut w, i + 1, line, currency)?;
    }

    w.end_element("Invoice")?;
    Ok(w.into_bytes())
}

fn write_party(w: &mut XmlWriter, party: &DocParty, wrapper: &str) -> Result<(), InvoicingError> {
    w.start_element(wrapper)?;
    w.start_element("cac:Party")?;

    if let Some(endpoint) = &party.endpoint {
        w.text_element_with_attrs("cbc:EndpointID", &endpoint.id, &[("schemeID", &endpoint.scheme)])?;
    }

    w.start_element("cac:PartyName")?;
    w.text_element("cbc:Name", &party.name)?;
    w.end_element("cac:PartyName")?;

    w.start_element("cac:PostalAddress")?;
    if let Some(street) = &party.address.street {
        w.text_element("cbc:StreetName", street)?;
    }
    w.text_element("cbc:CityName", &party.address.city)?;
    w.text_element("cbc:PostalZone", &party.address.postal_code)?;
    w.start_element("cac:Country")?;
    w.text_element("cbc:IdentificationCode", &party.address.country_code)?;
    w.end_element("cac:Country")?;
    w.end_element("cac:PostalAddress")?;

    if let Some(vat_id) = &party.vat_id {
        w.start_element("cac:PartyTaxScheme")?;
        w.text_element("cbc:CompanyID", vat_id)?;
        w.start_element("cac:TaxScheme")?;
        w.text_element("cbc:ID", "VAT")?;
        w.end_element("cac:TaxScheme")?;
        w.end_element("cac:PartyTaxScheme")?;
    }

    w.start_element("cac:PartyLegalEntity")?;
    w.text_element("cbc:RegistrationName", &party.name)?;
    w.end_element("cac:PartyLegalEntity")?;

    if let Some(email) = &party.email {
        w.start_element("cac:Contact")?;
        w.text_element("cbc:ElectronicMail", email)?;
        w.end_element("cac:Contact")?;
    }

    w.end_element("cac:Party")?;
    w.end_element(wrapper)?;
    Ok(())
}

fn write_tax_category(w: &mut XmlWriter, tag: &str, rate: Decimal) -> Result<(), InvoicingError> {
    w.start_element(tag)?;
    w.text_element("cbc:ID", tax_category_code(rate))?;
    w.text_element("cbc:Percent", &format_decimal(rate))?;
    w.start_element("cac:TaxScheme")?;
    w.text_element("cbc:ID", "VAT")?;
    w.end_element("cac:TaxScheme")?;
    w.end_element(tag)?;
    Ok(())
}

fn write_line(
    w: &mut XmlWriter,
    position: usize,
    line: &InvoiceLine,
    currency: &str,
) -> Result<(), InvoicingError> {
    w.start_element("cac:InvoiceLine")?;
    w.text_element("cbc:ID", &position.to_string())?;
    w.quantity_element("cbc:InvoicedQuantity", line.quantity, UNIT_PIECE)?;
    w.amount_element("cbc:LineExtensionAmount", line.line_total_excl, currency)?;

    w.start_element("cac:Item")?;
    w.text_element("cbc:Description", &line.description)?;
    w.text_element("cbc:Name", &item_name(&line.description))?;
    write_tax_category(w, "cac:ClassifiedTaxCategory", line.vat_rate)?;
    w.end_element("cac:Item")?;

    w.start_element("cac:Price")?;
    w.text_element_with_attrs(
        "cbc:PriceAmount",
        &format_decimal(line.unit_price),
        &[("currencyID", currency)],
    )?;
    w.end_element("cac:Price")?;

    w.end_element("cac:InvoiceLine")?;
    Ok(())
}

/// UNTDID 5305: standard rate, or zero rated for 0 %.
fn tax_category_code(rate: Decimal) -> &'static str {
    if rate.is_zero() { "Z" } else { "S" }
}

/// First line of the description, capped at 100 characters.
fn item_name(description: &str) -> String {
    description
        .lines()
        .next()
        .unwrap_or_default()
        .chars()
        .take(100)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn category_codes() {
        assert_eq!(tax_category_code(dec!(21)), "S");
        assert_eq!(tax_category_code(dec!(0.00)), "Z");
    }

    #[test]
    fn item_name_uses_first_line() {
        assert_eq!(item_name("Hosting\nMarch 2025"), "Hosting");
        assert_eq!(item_name(&"a".repeat(150)).len(), 100);
    }
}
