use chrono::NaiveDate;
use quick_xml::Reader;
use quick_xml::events::Event;

/// Structural sanity check of a rendered UBL invoice.
///
/// Returns one message per problem; an empty vector means the document
/// carries every mandatory header block. This is not schematron
/// validation.
pub fn check_ubl(xml: &[u8]) -> Vec<String> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);

    let mut found = Header::default();
    let mut path: Vec<String> = Vec::new();
    let mut problems = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                if path.is_empty() {
                    found.root = Some(name.clone());
                }
                if path.len() == 1 {
                    found.mark(&name);
                }
                path.push(name);
            }
            Ok(Event::Empty(ref e)) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                if path.is_empty() {
                    found.root = Some(name);
                } else if path.len() == 1 {
                    found.mark(&name);
                }
            }
            Ok(Event::Text(ref e)) => {
                if path.len() == 2 {
                    let text = e.unescape().unwrap_or_default().to_string();
                    found.text(&path[1], text);
                }
            }
            Ok(Event::End(_)) => {
                path.pop();
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                problems.push(format!(
                    "malformed XML at position {}: {e}",
                    reader.buffer_position()
                ));
                return problems;
            }
            _ => {}
        }
    }

    match found.root.as_deref() {
        Some("Invoice") => {}
        Some(other) => problems.push(format!("root element is {other}, expected Invoice")),
        None => {
            problems.push("document has no root element".into());
            return problems;
        }
    }

    match &found.customization_id {
        Some(id) if id.contains("en16931") => {}
        Some(id) => problems.push(format!("CustomizationID {id} does not reference EN 16931")),
        None => problems.push("missing CustomizationID".into()),
    }
    if found.profile_id.as_deref().is_none_or(str::is_empty) {
        problems.push("missing ProfileID".into());
    }
    if found.id.as_deref().is_none_or(str::is_empty) {
        problems.push("missing invoice ID".into());
    }
    match &found.issue_date {
        Some(d) if NaiveDate::parse_from_str(d, "%Y-%m-%d").is_ok() => {}
        Some(d) => problems.push(format!("IssueDate {d} is not an ISO date")),
        None => problems.push("missing IssueDate".into()),
    }
    match &found.currency {
        Some(c) if c.len() == 3 && c.bytes().all(|b| b.is_ascii_uppercase()) => {}
        Some(c) => problems.push(format!("DocumentCurrencyCode {c} is not an ISO 4217 code")),
        None => problems.push("missing DocumentCurrencyCode".into()),
    }
    if !found.supplier {
        problems.push("missing AccountingSupplierParty".into());
    }
    if !found.customer {
        problems.push("missing AccountingCustomerParty".into());
    }
    if !found.monetary_total {
        problems.push("missing LegalMonetaryTotal".into());
    }

    problems
}

#[derive(Default)]
struct Header {
    root: Option<String>,
    customization_id: Option<String>,
    profile_id: Option<String>,
    id: Option<String>,
    issue_date: Option<String>,
    currency: Option<String>,
    supplier: bool,
    customer: bool,
    monetary_total: bool,
}

impl Header {
    fn mark(&mut self, name: &str) {
        match name {
            "AccountingSupplierParty" => self.supplier = true,
            "AccountingCustomerParty" => self.customer = true,
            "LegalMonetaryTotal" => self.monetary_total = true,
            _ => {}
        }
    }

    fn text(&mut self, name: &str, text: String) {
        let slot = match name {
            "CustomizationID" => &mut self.customization_id,
            "ProfileID" => &mut self.profile_id,
            "ID" => &mut self.id,
            "IssueDate" => &mut self.issue_date,
            "DocumentCurrencyCode" => &mut self.currency,
            _ => return,
        };
        slot.get_or_insert(text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Invoice xmlns="urn:oasis:names:specification:ubl:schema:xsd:Invoice-2"
         xmlns:cac="urn:oasis:names:specification:ubl:schema:xsd:CommonAggregateComponents-2"
         xmlns:cbc="urn:oasis:names:specification:ubl:schema:xsd:CommonBasicComponents-2">
  <cbc:CustomizationID>urn:cen.eu:en16931:2017</cbc:CustomizationID>
  <cbc:ProfileID>urn:fdc:peppol.eu:2017:poacc:billing:01:1.0</cbc:ProfileID>
  <cbc:ID>2025-0001</cbc:ID>
  <cbc:IssueDate>2025-05-02</cbc:IssueDate>
  <cbc:DocumentCurrencyCode>EUR</cbc:DocumentCurrencyCode>
  <cac:AccountingSupplierParty><cac:Party/></cac:AccountingSupplierParty>
  <cac:AccountingCustomerParty><cac:Party/></cac:AccountingCustomerParty>
  <cac:LegalMonetaryTotal/>
</Invoice>"#;

    #[test]
    fn minimal_document_passes() {
        assert!(check_ubl(MINIMAL.as_bytes()).is_empty());
    }

    #[test]
    fn reports_each_missing_block() {
        let xml = MINIMAL
            .replace("<cbc:ProfileID>urn:fdc:peppol.eu:2017:poacc:billing:01:1.0</cbc:ProfileID>", "")
            .replace("<cac:LegalMonetaryTotal/>", "")
            .replace("2025-05-02", "02.05.2025");
        let problems = check_ubl(xml.as_bytes());
        assert_eq!(problems.len(), 3, "{problems:?}");
        assert!(problems.iter().any(|p| p.contains("ProfileID")));
        assert!(problems.iter().any(|p| p.contains("LegalMonetaryTotal")));
        assert!(problems.iter().any(|p| p.contains("IssueDate")));
    }

    #[test]
    fn nested_ids_do_not_count_as_invoice_id() {
        let xml = MINIMAL.replace(
            "<cbc:ID>2025-0001</cbc:ID>",
            "<cac:OrderReference><cbc:ID>PO-1</cbc:ID></cac:OrderReference>",
        );
        let problems = check_ubl(xml.as_bytes());
        assert_eq!(problems, vec!["missing invoice ID".to_string()]);
    }

    #[test]
    fn wrong_root() {
        let problems = check_ubl(b"<CreditNote/>");
        assert!(problems[0].contains("expected Invoice"));
    }
}
