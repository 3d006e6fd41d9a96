use std::collections::HashSet;
use std::sync::Arc;
use std::thread;

use chrono::NaiveDate;
use reliabill::core::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn company() -> Company {
    CompanyBuilder::new(
        "Acme BV",
        AddressBuilder::new("Antwerpen", "2000", "BE")
            .street("Meir 1")
            .build(),
    )
    .vat_id("BE0123456789")
    .bank_account("BE68 5390 0754 7034", Some("BBRUBEBB".into()))
    .build()
}

fn client(company_id: Uuid) -> Client {
    ClientBuilder::new(
        company_id,
        "Kunde BV",
        AddressBuilder::new("Gent", "9000", "BE").build(),
    )
    .vat_id("BE0987654321")
    .build()
}

fn setup() -> (MemoryStore, Uuid, Uuid) {
    let store = MemoryStore::new();
    let company = company();
    let company_id = company.id;
    store.save_company(company).unwrap();
    let client = client(company_id);
    let client_id = client.id;
    store.save_client(client).unwrap();
    (store, company_id, client_id)
}

// --- Totals ---

#[test]
fn two_rate_invoice_totals() {
    let calc = calculate_totals(&[
        LineInput::new("Consulting", dec!(2), dec!(50), dec!(21)),
        LineInput::new("Travel", dec!(1), dec!(10), dec!(6)),
    ])
    .unwrap();

    assert_eq!(calc.totals.total_excl, dec!(110.00));
    assert_eq!(calc.totals.total_vat, dec!(21.60));
    assert_eq!(calc.totals.total_incl, dec!(131.60));

    let rates: Vec<_> = calc.totals.tax_subtotals.iter().map(|s| s.rate).collect();
    assert_eq!(rates, vec![dec!(6), dec!(21)]);
    assert_eq!(calc.totals.tax_subtotals[1].tax, dec!(21.00));
    assert_eq!(calc.totals.tax_subtotals[0].tax, dec!(0.60));
}

#[test]
fn per_line_rounding_is_kept() {
    // Three lines of 0.335: each rounds to 0.34 before summing.
    let line = LineInput::new("Widget", dec!(1), dec!(0.335), dec!(21));
    let calc = calculate_totals(&[line.clone(), line.clone(), line]).unwrap();
    assert_eq!(calc.lines[0].line_total_excl, dec!(0.34));
    assert_eq!(calc.totals.total_excl, dec!(1.02));
    assert_eq!(calc.totals.total_vat, dec!(0.21));
    assert_eq!(calc.totals.total_incl, dec!(1.23));
}

#[test]
fn half_cent_rounds_away_from_zero() {
    assert_eq!(round2(dec!(0.125)), dec!(0.13));
    assert_eq!(round2(dec!(-0.125)), dec!(-0.13));
    assert_eq!(round2(dec!(1.005)), dec!(1.01));
    assert_eq!(sum([dec!(0.005), dec!(0.005)]), dec!(0.02));
}

// --- Numbering ---

#[test]
fn first_two_numbers_of_a_year() {
    let store = MemoryStore::new();
    let allocator = InvoiceNumberAllocator::new(&store);
    let company = Uuid::new_v4();

    let a = allocator.allocate(company, date(2025, 3, 1)).unwrap();
    let b = allocator.allocate(company, date(2025, 12, 31)).unwrap();
    assert_eq!((a.seq, a.number.as_str()), (1, "2025-0001"));
    assert_eq!((b.seq, b.number.as_str()), (2, "2025-0002"));

    let next_year = allocator.allocate(company, date(2026, 1, 1)).unwrap();
    assert_eq!(next_year.number, "2026-0001");
}

#[test]
fn concurrent_invoice_creation_is_gap_free() {
    let (store, company_id, client_id) = setup();
    let store = Arc::new(store);
    let n = 40;

    let handles: Vec<_> = (0..n)
        .map(|i| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                let draft = NewInvoiceBuilder::new(date(2025, 4, 1), date(2025, 5, 1))
                    .client(client_id)
                    .add_line(LineInput::new(format!("Item {i}"), dec!(1), dec!(10), dec!(21)))
                    .build()
                    .unwrap();
                create_invoice(store.as_ref(), company_id, draft).unwrap().number
            })
        })
        .collect();

    let numbers: HashSet<String> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let expected: HashSet<String> = (1..=n).map(|seq| format_number(2025, seq)).collect();
    assert_eq!(numbers, expected);
    assert_eq!(store.counter(company_id, 2025), Some(n));
}

#[test]
fn deleting_an_invoice_never_reuses_its_number() {
    let (store, company_id, client_id) = setup();
    let draft = || {
        NewInvoiceBuilder::new(date(2025, 4, 1), date(2025, 5, 1))
            .client(client_id)
            .add_line(LineInput::new("Audit", dec!(1), dec!(100), dec!(21)))
            .build()
            .unwrap()
    };

    let first = create_invoice(&store, company_id, draft()).unwrap();
    store.delete_invoice(company_id, first.id).unwrap();
    let second = create_invoice(&store, company_id, draft()).unwrap();
    assert_eq!(second.number, "2025-0002");
}

// --- Drafting ---

#[test]
fn client_of_another_company_is_rejected() {
    let (store, company_id, _) = setup();
    let other = company();
    let other_id = other.id;
    store.save_company(other).unwrap();
    let foreign = client(other_id);
    let foreign_id = foreign.id;
    store.save_client(foreign).unwrap();

    let draft = NewInvoiceBuilder::new(date(2025, 4, 1), date(2025, 5, 1))
        .client(foreign_id)
        .add_line(LineInput::new("Audit", dec!(1), dec!(100), dec!(21)))
        .build()
        .unwrap();
    assert!(matches!(
        create_invoice(&store, company_id, draft),
        Err(InvoicingError::ClientNotFound)
    ));
}

#[test]
fn builder_rejects_bad_input_in_order() {
    let empty = NewInvoiceBuilder::new(date(2025, 4, 2), date(2025, 4, 1)).build();
    assert!(matches!(empty, Err(InvoicingError::NoLines)));

    let backwards = NewInvoiceBuilder::new(date(2025, 4, 2), date(2025, 4, 1))
        .add_line(LineInput::new("Audit", dec!(1), dec!(100), dec!(21)))
        .build();
    assert!(matches!(backwards, Err(InvoicingError::DueBeforeIssue)));

    let zero_qty = NewInvoiceBuilder::new(date(2025, 4, 1), date(2025, 4, 1))
        .add_line(LineInput::new("Audit", dec!(1), dec!(100), dec!(21)))
        .add_line(LineInput::new("Free", dec!(0), dec!(100), dec!(21)))
        .build();
    assert!(matches!(
        zero_qty,
        Err(InvoicingError::InvalidLine { index: 1, .. })
    ));

    let currency = NewInvoiceBuilder::new(date(2025, 4, 1), date(2025, 4, 1))
        .currency("XYZ")
        .add_line(LineInput::new("Audit", dec!(1), dec!(100), dec!(21)))
        .build();
    assert!(matches!(currency, Err(InvoicingError::UnknownCurrency(c)) if c == "XYZ"));
}

#[test]
fn overflowing_amounts_are_rejected_before_numbering() {
    let (store, company_id, client_id) = setup();
    let draft = NewInvoiceBuilder::new(date(2025, 4, 1), date(2025, 5, 1))
        .client(client_id)
        .add_line(LineInput::new("Audit", dec!(1), dec!(100), dec!(21)))
        .add_line(LineInput::new("x", Decimal::MAX, dec!(2), dec!(0)))
        .build()
        .unwrap();

    let err = create_invoice(&store, company_id, draft).unwrap_err();
    assert!(matches!(
        err,
        InvoicingError::InvalidLine { index: 1, ref reason } if reason == "amount out of range"
    ));
    assert_eq!(store.counter(company_id, 2025), None);
}

#[test]
fn invoice_dates_from_strings() {
    assert_eq!(parse_invoice_date("2025-07-01").unwrap(), date(2025, 7, 1));
    assert_eq!(
        parse_invoice_date("2025-06-30T23:30:00-02:00").unwrap(),
        date(2025, 7, 1)
    );
    assert!(matches!(
        parse_invoice_date("01.07.2025"),
        Err(InvoicingError::BadDates(_))
    ));
}

#[test]
fn lines_replaced_together_with_totals() {
    let (store, company_id, client_id) = setup();
    let draft = NewInvoiceBuilder::new(date(2025, 4, 1), date(2025, 5, 1))
        .client(client_id)
        .add_line(LineInput::new("Audit", dec!(1), dec!(100), dec!(21)))
        .build()
        .unwrap();
    let invoice = create_invoice(&store, company_id, draft).unwrap();

    let updated = replace_lines(
        &store,
        company_id,
        invoice.id,
        vec![
            LineInput::new("Consulting", dec!(2), dec!(50), dec!(21)),
            LineInput::new("Travel", dec!(1), dec!(10), dec!(6)),
        ],
    )
    .unwrap();
    assert_eq!(updated.number, invoice.number);
    assert_eq!(updated.totals.total_incl, dec!(131.60));

    let stored = store.invoice(company_id, invoice.id).unwrap().unwrap();
    assert_eq!(stored.lines.len(), 2);
    assert_eq!(stored.totals, updated.totals);

    assert!(matches!(
        replace_lines(&store, company_id, invoice.id, vec![]),
        Err(InvoicingError::NoLines)
    ));
}
