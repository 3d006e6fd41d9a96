//! Draft, prepare, send and reconcile one invoice.
//!
//! Runs in stub mode unless channel endpoints are configured in the
//! environment (or a `.env` file). Artifacts go to a temporary directory
//! unless `DOCS_DIR` is set.
//!
//! ```text
//! RUST_LOG=reliabill=debug cargo run --example deliver_invoice
//! ```

use chrono::NaiveDate;
use reliabill::core::*;
use reliabill::delivery::{ArtifactKind, DeliveryConfig, DeliveryOrchestrator, webhook};
use rust_decimal_macros::dec;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("reliabill=info")),
        )
        .init();

    let scratch = tempfile::tempdir()?;
    let mut config = DeliveryConfig::from_env()?;
    if std::env::var_os("DOCS_DIR").is_none() {
        config.storage_root = scratch.path().to_path_buf();
    }
    if config.webhook_secret.is_none() {
        config = config.with_webhook_secret("demo-secret");
    }
    println!("=== Configuration ===\n\n{config:#?}\n");

    let store = MemoryStore::new();
    let company = CompanyBuilder::new(
        "Acme BV",
        AddressBuilder::new("Antwerpen", "2000", "BE")
            .street("Meir 1")
            .build(),
    )
    .vat_id("BE0123456789")
    .email("billing@acme.example")
    .bank_account("BE68 5390 0754 7034", Some("BBRUBEBB".into()))
    .network_address("0208", "0123456789")
    .build();
    let company_id = company.id;
    store.save_company(company)?;

    let client = ClientBuilder::new(
        company_id,
        "Kunde BV",
        AddressBuilder::new("Gent", "9000", "BE")
            .street("Veldstraat 12")
            .build(),
    )
    .vat_id("BE0987654321")
    .email("ap@kunde.example")
    .build();
    let client_id = client.id;
    store.save_client(client)?;

    let draft = NewInvoiceBuilder::new(
        NaiveDate::from_ymd_opt(2025, 5, 2).ok_or("bad date")?,
        NaiveDate::from_ymd_opt(2025, 6, 1).ok_or("bad date")?,
    )
    .client(client_id)
    .add_line(LineInput::new("Consulting", dec!(2), dec!(50), dec!(21)))
    .add_line(LineInput::new("Travel", dec!(1), dec!(10), dec!(6)))
    .build()?;
    let invoice = create_invoice(&store, company_id, draft)?;

    println!("=== Draft ===\n");
    println!("  Number: {}", invoice.number);
    for sub in &invoice.totals.tax_subtotals {
        println!(
            "  VAT {}%: {} on {}",
            sub.rate,
            format_amount(sub.tax),
            format_amount(sub.taxable)
        );
    }
    println!("  Total:  {} {}\n", format_amount(invoice.totals.total_incl), invoice.currency);

    let orchestrator = DeliveryOrchestrator::new(&store, &config)?;
    let prepared = orchestrator.prepare(company_id, invoice.id, false)?;
    let xml = orchestrator.download(company_id, invoice.id, ArtifactKind::Xml)?;
    println!("=== Prepared ({}) ===\n", prepared.status);
    println!("  Storage root: {}", orchestrator.artifacts().root().display());
    println!(
        "  XML: {} ({}, {} bytes)\n",
        prepared.xml_path.as_deref().unwrap_or("-"),
        ArtifactKind::Xml.content_type(),
        xml.len()
    );
    for line in String::from_utf8_lossy(&xml).lines().take(12) {
        println!("{line}");
    }
    println!("...\n");

    let sent = orchestrator.send(company_id, invoice.id)?;
    let message_id = sent.message_id.clone().unwrap_or_default();
    println!("=== Sent ===\n");
    println!("  Channel:    {}", sent.channel.map(|c| c.as_str()).unwrap_or("-"));
    println!("  Message id: {message_id}");
    println!("  Status:     {}\n", sent.status);

    let body = format!(r#"{{"messageId":"{message_id}","status":"DELIVERED"}}"#);
    let secret = config.webhook_secret.as_deref().unwrap_or_default();
    let signature = webhook::sign(secret, body.as_bytes())?;
    let ack = orchestrator.receive_webhook(body.as_bytes(), Some(&signature))?;
    println!("=== Webhook ===\n\n  {}\n", serde_json::to_string(&ack)?);

    println!("=== Delivery log ===\n");
    for record in orchestrator.list_logs(company_id, invoice.id)? {
        println!(
            "  {} {:<7} {}",
            record.timestamp.format("%H:%M:%S%.3f"),
            record.kind.as_str(),
            record.message
        );
    }
    Ok(())
}
