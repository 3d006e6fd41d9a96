use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, Stream, StringFormat, dictionary};

use super::model::{DocParty, DocumentModel};
use super::xml_utils::format_decimal;
use crate::core::{InvoicingError, format_amount};

// A4 portrait, in points.
const PAGE_WIDTH: i64 = 595;
const PAGE_HEIGHT: i64 = 842;
const LEFT: i64 = 50;
const RIGHT: i64 = 545;
const TOP: i64 = 800;
const BOTTOM: i64 = 100;
const ROW: i64 = 15;

// Right edges of the numeric table columns.
const COL_QTY: i64 = 340;
const COL_PRICE: i64 = 415;
const COL_VAT: i64 = 465;
const COL_AMOUNT: i64 = RIGHT;

const DESCRIPTION_CHARS: usize = 50;

/// Render a human-readable invoice PDF.
///
/// Uses the standard Helvetica fonts with WinAnsi encoding, so no font
/// files are embedded. Text outside that character set is transliterated
/// or dropped. The document carries no creation date or id, hence the same
/// model always yields the same bytes.
pub fn render_pdf(model: &DocumentModel) -> Result<Vec<u8>, InvoicingError> {
    let pages = layout(model);
    let total = pages.len();

    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();
    let regular_id = doc.add_object(font("Helvetica"));
    let bold_id = doc.add_object(font("Helvetica-Bold"));
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => Object::Reference(regular_id),
            "F2" => Object::Reference(bold_id),
        },
    });

    let mut kids = Vec::with_capacity(total);
    for (index, mut items) in pages.into_iter().enumerate() {
        items.push(Item::text_right(
            RIGHT,
            40,
            Font::Regular,
            8,
            &format!("Page {}/{}", index + 1, total),
        ));

        let mut operations = Vec::new();
        for item in &items {
            item.write(&mut operations);
        }
        let content = Content { operations }
            .encode()
            .map_err(|e| InvoicingError::Render(format!("failed to encode page {}: {e}", index + 1)))?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, content));

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => Object::Reference(pages_id),
            "MediaBox" => vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
            "Contents" => Object::Reference(content_id),
            "Resources" => Object::Reference(resources_id),
        });
        kids.push(Object::Reference(page_id));
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => total as i64,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => Object::Reference(pages_id),
    });
    doc.trailer.set("Root", Object::Reference(catalog_id));

    let mut output = Vec::new();
    doc.save_to(&mut output)
        .map_err(|e| InvoicingError::Render(format!("failed to save PDF: {e}")))?;
    Ok(output)
}

fn font(base: &str) -> lopdf::Dictionary {
    dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => base,
        "Encoding" => "WinAnsiEncoding",
    }
}

#[derive(Debug, Clone, Copy)]
enum Font {
    Regular,
    Bold,
}

impl Font {
    fn resource(self) -> &'static str {
        match self {
            Self::Regular => "F1",
            Self::Bold => "F2",
        }
    }
}

enum Item {
    Text {
        x: i64,
        y: i64,
        font: Font,
        size: i64,
        bytes: Vec<u8>,
    },
    Rule {
        y: i64,
    },
}

impl Item {
    fn text(x: i64, y: i64, font: Font, size: i64, text: &str) -> Self {
        Self::Text {
            x,
            y,
            font,
            size,
            bytes: to_win_ansi(text),
        }
    }

    fn text_right(right: i64, y: i64, font: Font, size: i64, text: &str) -> Self {
        let bytes = to_win_ansi(text);
        let x = right - text_width(&bytes, size);
        Self::Text {
            x,
            y,
            font,
            size,
            bytes,
        }
    }

    fn write(&self, ops: &mut Vec<Operation>) {
        match self {
            Self::Text {
                x,
                y,
                font,
                size,
                bytes,
            } => {
                ops.push(Operation::new("BT", vec![]));
                ops.push(Operation::new(
                    "Tf",
                    vec![font.resource().into(), (*size).into()],
                ));
                ops.push(Operation::new("Td", vec![(*x).into(), (*y).into()]));
                ops.push(Operation::new(
                    "Tj",
                    vec![Object::String(bytes.clone(), StringFormat::Literal)],
                ));
                ops.push(Operation::new("ET", vec![]));
            }
            Self::Rule { y } => {
                ops.push(Operation::new("w", vec![1.into()]));
                ops.push(Operation::new("m", vec![LEFT.into(), (*y).into()]));
                ops.push(Operation::new("l", vec![RIGHT.into(), (*y).into()]));
                ops.push(Operation::new("S", vec![]));
            }
        }
    }
}

struct Layout<'a> {
    model: &'a DocumentModel,
    pages: Vec<Vec<Item>>,
    y: i64,
}

impl<'a> Layout<'a> {
    fn new(model: &'a DocumentModel) -> Self {
        Self {
            model,
            pages: vec![Vec::new()],
            y: TOP,
        }
    }

    fn push(&mut self, item: Item) {
        if let Some(page) = self.pages.last_mut() {
            page.push(item);
        }
    }

    fn text(&mut self, x: i64, font: Font, size: i64, text: &str) {
        self.push(Item::text(x, self.y, font, size, text));
    }

    fn text_right(&mut self, right: i64, font: Font, size: i64, text: &str) {
        self.push(Item::text_right(right, self.y, font, size, text));
    }

    /// Start a new page when the next row would cross the bottom margin.
    fn ensure_room(&mut self, table: bool) {
        if self.y - ROW >= BOTTOM {
            return;
        }
        self.pages.push(Vec::new());
        self.y = TOP;
        let heading = format!("Invoice {} (continued)", self.model.number);
        self.text(LEFT, Font::Bold, 12, &heading);
        self.y -= 2 * ROW;
        if table {
            self.table_header();
        }
    }

    fn table_header(&mut self) {
        self.text(LEFT, Font::Bold, 9, "Description");
        self.text_right(COL_QTY, Font::Bold, 9, "Qty");
        self.text_right(COL_PRICE, Font::Bold, 9, "Unit price");
        self.text_right(COL_VAT, Font::Bold, 9, "VAT %");
        self.text_right(COL_AMOUNT, Font::Bold, 9, "Amount");
        self.push(Item::Rule { y: self.y - 4 });
        self.y -= ROW + 2;
    }

    fn party(&mut self, x: i64, top: i64, title: &str, party: &DocParty) -> i64 {
        let mut y = top;
        let mut line = |layout: &mut Self, font: Font, size: i64, text: &str| {
            layout.push(Item::text(x, y, font, size, text));
            y -= 12;
        };
        line(self, Font::Bold, 9, title);
        line(self, Font::Regular, 10, &party.name);
        if let Some(street) = &party.address.street {
            line(self, Font::Regular, 9, street);
        }
        let city = format!("{} {}", party.address.postal_code, party.address.city);
        line(self, Font::Regular, 9, &city);
        line(self, Font::Regular, 9, &party.address.country_code);
        if let Some(vat) = &party.vat_id {
            line(self, Font::Regular, 9, &format!("VAT {vat}"));
        }
        if let Some(endpoint) = &party.endpoint {
            line(self, Font::Regular, 9, &format!("Network id {}", endpoint.participant_id()));
        }
        if let Some(email) = &party.email {
            line(self, Font::Regular, 9, email);
        }
        y
    }
}

fn layout(model: &DocumentModel) -> Vec<Vec<Item>> {
    let mut l = Layout::new(model);
    let currency = model.currency.as_str();

    l.text(LEFT, Font::Bold, 16, &model.supplier.name);
    l.text_right(RIGHT, Font::Bold, 16, "INVOICE");
    l.y -= 30;

    let header_top = l.y;
    let supplier_end = l.party(LEFT, header_top, "From", &model.supplier);

    let meta = [
        ("Invoice no.", model.number.clone()),
        ("Issue date", model.issue_date.to_string()),
        ("Due date", model.due_date.to_string()),
        ("Currency", model.currency.clone()),
    ];
    let mut y = header_top;
    for (label, value) in &meta {
        l.push(Item::text(330, y, Font::Bold, 9, label));
        l.push(Item::text_right(RIGHT, y, Font::Regular, 9, value));
        y -= 12;
    }

    let customer_end = l.party(330, y - 12, "Bill to", &model.customer);
    l.y = supplier_end.min(customer_end) - ROW;

    l.table_header();
    for line in &model.lines {
        l.ensure_room(true);
        l.text(LEFT, Font::Regular, 9, &truncate(&line.description, DESCRIPTION_CHARS));
        l.text_right(COL_QTY, Font::Regular, 9, &format_decimal(line.quantity));
        l.text_right(COL_PRICE, Font::Regular, 9, &format_decimal(line.unit_price));
        l.text_right(COL_VAT, Font::Regular, 9, &format_decimal(line.vat_rate));
        l.text_right(COL_AMOUNT, Font::Regular, 9, &format_amount(line.line_total_excl));
        l.y -= ROW;
    }
    l.push(Item::Rule { y: l.y + ROW - 4 });
    l.y -= 5;

    for sub in &model.totals.tax_subtotals {
        l.ensure_room(false);
        let label = format!(
            "VAT {}% on {} {currency}",
            format_decimal(sub.rate),
            format_amount(sub.taxable)
        );
        l.text_right(COL_VAT, Font::Regular, 9, &label);
        l.text_right(COL_AMOUNT, Font::Regular, 9, &format_amount(sub.tax));
        l.y -= ROW;
    }
    let totals = [
        ("Total excl. VAT", model.totals.total_excl, Font::Regular),
        ("Total VAT", model.totals.total_vat, Font::Regular),
        ("Total due", model.totals.total_incl, Font::Bold),
    ];
    for (label, amount, font) in totals {
        l.ensure_room(false);
        l.text_right(COL_VAT, font, 10, label);
        l.text_right(COL_AMOUNT, font, 10, &format!("{} {currency}", format_amount(amount)));
        l.y -= ROW;
    }

    if let Some(account) = &model.payment {
        l.y -= ROW;
        l.ensure_room(false);
        l.text(LEFT, Font::Bold, 9, "Payment");
        l.y -= 12;
        let mut details = format!("IBAN {}", account.iban);
        if let Some(bic) = &account.bic {
            details.push_str(&format!("  BIC {bic}"));
        }
        l.ensure_room(false);
        l.text(LEFT, Font::Regular, 9, &details);
        l.y -= 12;
        l.ensure_room(false);
        let reference = format!("Reference {} due {}", model.number, model.due_date);
        l.text(LEFT, Font::Regular, 9, &reference);
    }

    l.pages
}

/// First line of `text`, cut to `max` characters with an ellipsis.
fn truncate(text: &str, max: usize) -> String {
    let first = text.lines().next().unwrap_or_default();
    if first.chars().count() <= max {
        first.to_string()
    } else {
        let mut cut: String = first.chars().take(max - 3).collect();
        cut.push_str("...");
        cut
    }
}

/// Approximate Helvetica advance width, enough to right-align columns.
fn text_width(bytes: &[u8], size: i64) -> i64 {
    let units: i64 = bytes
        .iter()
        .map(|b| match b {
            b'0'..=b'9' => 556,
            b' ' | b'.' | b',' | b':' | b'/' => 278,
            b'-' => 333,
            b'%' => 889,
            b'A'..=b'Z' => 667,
            b'i' | b'j' | b'l' => 222,
            b'f' | b't' => 278,
            b'm' => 833,
            b'w' => 722,
            b'r' => 333,
            _ => 556,
        })
        .sum();
    units * size / 1000
}

/// Encode text for a WinAnsiEncoding font. Never fails: control characters
/// become spaces, common non-Latin-1 letters are transliterated and anything
/// else is dropped.
pub(crate) fn to_win_ansi(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len());
    for c in text.chars() {
        let code = c as u32;
        match code {
            0x20..=0x7e | 0xa0..=0xff => out.push(code as u8),
            0x00..=0x1f | 0x7f..=0x9f => out.push(b' '),
            _ => {
                if let Some(b) = win_ansi_extra(c) {
                    out.push(b);
                } else if let Some(s) = transliterate(c) {
                    out.extend_from_slice(s.as_bytes());
                }
            }
        }
    }
    out
}

/// Characters WinAnsi places in 0x80..=0x9f.
fn win_ansi_extra(c: char) -> Option<u8> {
    Some(match c {
        '€' => 0x80,
        '‚' => 0x82,
        'ƒ' => 0x83,
        '„' => 0x84,
        '…' => 0x85,
        '†' => 0x86,
        '‡' => 0x87,
        'ˆ' => 0x88,
        '‰' => 0x89,
        'Š' => 0x8a,
        '‹' => 0x8b,
        'Œ' => 0x8c,
        'Ž' => 0x8e,
        '‘' => 0x91,
        '’' => 0x92,
        '“' => 0x93,
        '”' => 0x94,
        '•' => 0x95,
        '–' => 0x96,
        '—' => 0x97,
        '˜' => 0x98,
        '™' => 0x99,
        'š' => 0x9a,
        '›' => 0x9b,
        'œ' => 0x9c,
        'ž' => 0x9e,
        'Ÿ' => 0x9f,
        _ => return None,
    })
}

fn transliterate(c: char) -> Option<&'static str> {
    Some(match c {
        'ą' | 'ă' | 'ā' => "a",
        'Ą' | 'Ă' | 'Ā' => "A",
        'ć' | 'č' | 'ĉ' => "c",
        'Ć' | 'Č' => "C",
        'ď' | 'đ' => "d",
        'Ď' | 'Đ' => "D",
        'ę' | 'ě' | 'ē' | 'ė' => "e",
        'Ę' | 'Ě' | 'Ē' | 'Ė' => "E",
        'ğ' => "g",
        'Ğ' => "G",
        'ı' | 'ī' | 'į' => "i",
        'İ' | 'Ī' | 'Į' => "I",
        'ł' | 'ľ' | 'ĺ' => "l",
        'Ł' | 'Ľ' | 'Ĺ' => "L",
        'ń' | 'ň' | 'ņ' => "n",
        'Ń' | 'Ň' | 'Ņ' => "N",
        'ő' | 'ō' => "o",
        'Ő' | 'Ō' => "O",
        'ř' | 'ŕ' => "r",
        'Ř' | 'Ŕ' => "R",
        'ś' | 'ş' | 'ș' => "s",
        'Ś' | 'Ş' | 'Ș' => "S",
        'ť' | 'ţ' | 'ț' => "t",
        'Ť' | 'Ţ' | 'Ț' => "T",
        'ů' | 'ű' | 'ū' | 'ų' => "u",
        'Ů' | 'Ű' | 'Ū' | 'Ų' => "U",
        'ź' | 'ż' => "z",
        'Ź' | 'Ż' => "Z",
        '\u{2010}' | '\u{2011}' | '\u{2212}' => "-",
        '\u{2002}'..='\u{200a}' | '\u{202f}' => " ",
        '≤' => "<=",
        '≥' => ">=",
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn win_ansi_keeps_latin1_and_euro() {
        assert_eq!(to_win_ansi("Café €5"), vec![b'C', b'a', b'f', 0xe9, b' ', 0x80, b'5']);
    }

    #[test]
    fn win_ansi_transliterates_and_drops() {
        assert_eq!(to_win_ansi("Łódź"), b"L\xf3dz".to_vec());
        assert_eq!(to_win_ansi("a\tb\nc"), b"a b c".to_vec());
        assert_eq!(to_win_ansi("日本 ok 🙂"), b" ok ".to_vec());
    }

    #[test]
    fn truncate_long_descriptions() {
        assert_eq!(truncate("short", 50), "short");
        let long = "x".repeat(80);
        let cut = truncate(&long, 50);
        assert_eq!(cut.chars().count(), 50);
        assert!(cut.ends_with("..."));
        assert_eq!(truncate("first\nsecond", 50), "first");
    }

    #[test]
    fn right_alignment_width() {
        assert_eq!(text_width(b"10.00", 10), (556 * 4 + 278) * 10 / 1000);
    }
}
