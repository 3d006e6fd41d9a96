use chrono::Utc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::artifacts::{ArtifactKind, ArtifactStorage};
use super::audit::AuditLog;
use super::config::DeliveryConfig;
use super::fallback::FallbackTransport;
use super::router;
use super::structured::StructuredTransport;
use super::transport::{OutboundDocument, Transport};
use super::webhook::{self, WebhookAck};
use crate::core::{
    Channel, Client, DeliveryLogRecord, Invoice, InvoiceStatus, InvoicingError, LogKind, Store,
};
use crate::documents::{DocumentModel, DocumentRenderer, StandardRenderer, check_ubl};

/// Drives an invoice from DRAFT through preparation, sending and status
/// reconciliation, writing a delivery log record for every transition.
///
/// Every operation is synchronous and scoped by company. Failures leave the
/// stored invoice at its last consistent state.
pub struct DeliveryOrchestrator<'a, S: Store + ?Sized> {
    store: &'a S,
    config: &'a DeliveryConfig,
    artifacts: ArtifactStorage,
    renderer: Box<dyn DocumentRenderer + Send + Sync>,
    structured: Box<dyn Transport>,
    fallback: Box<dyn Transport>,
}

impl<'a, S: Store + ?Sized> DeliveryOrchestrator<'a, S> {
    /// Orchestrator with the built-in renderer and HTTP transports.
    pub fn new(store: &'a S, config: &'a DeliveryConfig) -> Result<Self, InvoicingError> {
        Ok(Self {
            store,
            config,
            artifacts: ArtifactStorage::new(&config.storage_root),
            renderer: Box::new(StandardRenderer),
            structured: Box::new(StructuredTransport::new(config)?),
            fallback: Box::new(FallbackTransport::new(config)?),
        })
    }

    /// Replace the transport used for the transport's own channel.
    pub fn with_transport(mut self, transport: Box<dyn Transport>) -> Self {
        match transport.channel() {
            Channel::Structured => self.structured = transport,
            Channel::Fallback => self.fallback = transport,
        }
        self
    }

    pub fn with_renderer(mut self, renderer: Box<dyn DocumentRenderer + Send + Sync>) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn artifacts(&self) -> &ArtifactStorage {
        &self.artifacts
    }

    fn audit(&self) -> AuditLog<'_, S> {
        AuditLog::new(self.store)
    }

    fn transport(&self, channel: Channel) -> &dyn Transport {
        match channel {
            Channel::Structured => self.structured.as_ref(),
            Channel::Fallback => self.fallback.as_ref(),
        }
    }

    fn load(&self, company_id: Uuid, invoice_id: Uuid) -> Result<Invoice, InvoicingError> {
        self.store
            .invoice(company_id, invoice_id)?
            .ok_or(InvoicingError::InvoiceNotFound)
    }

    fn client_of(&self, invoice: &Invoice) -> Result<Client, InvoicingError> {
        let client_id = invoice.client_id.ok_or(InvoicingError::ClientNotFound)?;
        self.store
            .client(invoice.company_id, client_id)?
            .ok_or(InvoicingError::ClientNotFound)
    }

    /// Record a failed operation. Errors while logging are only traced.
    fn log_failure(&self, invoice_id: Uuid, operation: &str, err: &InvoicingError) {
        warn!(%invoice_id, operation, error = %err, "delivery operation failed");
        if let Err(log_err) =
            self.audit()
                .record(invoice_id, LogKind::Error, format!("{operation} failed: {err}"))
        {
            warn!(%invoice_id, error = %log_err, "could not append error log");
        }
    }

    /// Render both documents and move the invoice to READY.
    ///
    /// A READY invoice whose artifacts are still on storage is returned
    /// untouched unless `force` is set.
    #[instrument(skip(self))]
    pub fn prepare(
        &self,
        company_id: Uuid,
        invoice_id: Uuid,
        force: bool,
    ) -> Result<Invoice, InvoicingError> {
        let mut invoice = self.load(company_id, invoice_id)?;

        if !matches!(invoice.status, InvoiceStatus::Draft | InvoiceStatus::Ready) {
            return Err(InvoicingError::InvalidTransition {
                from: invoice.status,
                to: InvoiceStatus::Ready,
            });
        }

        if !force && invoice.status == InvoiceStatus::Ready && self.artifacts_present(&invoice) {
            debug!("already prepared, nothing to do");
            return Ok(invoice);
        }

        let (xml_path, pdf_path) = match self.render_and_store(&invoice) {
            Ok(paths) => paths,
            Err(e) => {
                self.log_failure(invoice.id, "prepare", &e);
                return Err(e);
            }
        };

        invoice.xml_path = Some(xml_path);
        invoice.pdf_path = Some(pdf_path);
        invoice.status = InvoiceStatus::Ready;
        invoice.updated_at = Utc::now();
        self.store.update_invoice(&invoice)?;

        self.audit()
            .record(invoice.id, LogKind::Prepare, "generated UBL and PDF")?;
        info!(number = %invoice.number, "invoice prepared");
        Ok(invoice)
    }

    fn artifacts_present(&self, invoice: &Invoice) -> bool {
        let present = |p: &Option<String>| p.as_deref().is_some_and(|p| self.artifacts.exists(p));
        present(&invoice.xml_path) && present(&invoice.pdf_path)
    }

    /// Both documents are rendered and checked before anything is written.
    fn render_and_store(&self, invoice: &Invoice) -> Result<(String, String), InvoicingError> {
        if invoice.lines.is_empty() {
            return Err(InvoicingError::NoLines);
        }
        let client = self.client_of(invoice)?;
        let company = self
            .store
            .company(invoice.company_id)?
            .ok_or(InvoicingError::CompanyNotFound)?;

        let model = DocumentModel::new(invoice, &company, &client);
        let xml = self.renderer.render_ubl(&model)?;
        let problems = check_ubl(&xml);
        if !problems.is_empty() {
            return Err(InvoicingError::Render(format!(
                "generated UBL failed structural check: {}",
                problems.join("; ")
            )));
        }
        let pdf = self.renderer.render_pdf(&model)?;

        let xml_path = self.artifacts.write(invoice.id, ArtifactKind::Xml, &xml)?;
        let pdf_path = self.artifacts.write(invoice.id, ArtifactKind::Pdf, &pdf)?;
        Ok((xml_path, pdf_path))
    }

    /// Transmit a prepared invoice through the channel its client calls for.
    ///
    /// An invoice that already carries a message id is not sent again
    /// (a SKIP record is written instead) unless it is FAILED.
    #[instrument(skip(self))]
    pub fn send(&self, company_id: Uuid, invoice_id: Uuid) -> Result<Invoice, InvoicingError> {
        let mut invoice = self.load(company_id, invoice_id)?;

        if let Some(message_id) = &invoice.message_id {
            if invoice.status != InvoiceStatus::Failed {
                debug!(%message_id, status = %invoice.status, "already sent, skipping");
                self.audit().record(
                    invoice.id,
                    LogKind::Skip,
                    format!("already sent as {message_id} (status {})", invoice.status),
                )?;
                return Ok(invoice);
            }
        }

        if let Err(e) = self.transmit(&mut invoice) {
            self.log_failure(invoice.id, "send", &e);
            return Err(e);
        }

        if let Err(e) = self.store.update_invoice(&invoice) {
            // The network already holds the document; only the record is lost.
            self.log_failure(invoice.id, "send", &e);
            return Err(e);
        }
        let (channel, message_id) = (
            invoice.channel.map(|c| c.as_str()).unwrap_or_default(),
            invoice.message_id.as_deref().unwrap_or_default(),
        );
        self.audit().record(
            invoice.id,
            LogKind::Send,
            format!("sent via {channel} as {message_id}, status {}", invoice.status),
        )?;
        info!(channel, message_id, status = %invoice.status, "invoice sent");
        Ok(invoice)
    }

    /// Mutates `invoice` in memory only; the caller persists it.
    fn transmit(&self, invoice: &mut Invoice) -> Result<(), InvoicingError> {
        if !invoice.status.is_sendable() {
            return Err(InvoicingError::NotReady(invoice.status));
        }
        let xml_path = invoice
            .xml_path
            .clone()
            .ok_or_else(|| InvoicingError::ArtifactMissing("XML not prepared".into()))?;
        let xml = self.artifacts.read(&xml_path)?;

        let client = self.client_of(invoice)?;
        let channel = router::decide(&client)?;
        let sender = self
            .store
            .company(invoice.company_id)?
            .and_then(|c| c.network_address);

        let document = OutboundDocument {
            invoice_id: invoice.id,
            number: invoice.number.clone(),
            xml,
            recipient: client.network_address.clone(),
            sender,
        };
        let receipt = self.transport(channel).send(&document)?;

        let next = if receipt.delivered {
            InvoiceStatus::Delivered
        } else {
            InvoiceStatus::Sent
        };
        if !invoice.status.can_transition_to(next) {
            return Err(InvoicingError::InvalidTransition {
                from: invoice.status,
                to: next,
            });
        }

        invoice.message_id = Some(receipt.message_id);
        invoice.channel = Some(channel);
        invoice.status = next;
        invoice.updated_at = Utc::now();
        Ok(())
    }

    /// Poll the sending channel and apply a changed status.
    ///
    /// Reports that would move the invoice backwards, or out of FAILED, are
    /// ignored.
    #[instrument(skip(self))]
    pub fn refresh_status(
        &self,
        company_id: Uuid,
        invoice_id: Uuid,
    ) -> Result<Invoice, InvoicingError> {
        let mut invoice = self.load(company_id, invoice_id)?;
        let message_id = invoice.message_id.clone().ok_or(InvoicingError::NotSent)?;

        let channel = match invoice.channel {
            Some(channel) => channel,
            None => router::decide(&self.client_of(&invoice)?)?,
        };
        let reported = match self.transport(channel).status(&message_id) {
            Ok(status) => InvoiceStatus::from(status),
            Err(e) => {
                self.log_failure(invoice.id, "refresh", &e);
                return Err(e);
            }
        };

        if reported == invoice.status {
            debug!(status = %reported, "status unchanged");
            return Ok(invoice);
        }
        if !invoice.status.can_report(reported) {
            debug!(current = %invoice.status, %reported, "ignoring status regression");
            return Ok(invoice);
        }

        let previous = invoice.status;
        invoice.status = reported;
        invoice.updated_at = Utc::now();
        self.store.update_invoice(&invoice)?;
        self.audit().record(
            invoice.id,
            LogKind::Status,
            format!("{channel} reported {reported} (was {previous})"),
        )?;
        info!(%previous, status = %reported, "delivery status updated");
        Ok(invoice)
    }

    /// Apply a signed delivery callback.
    ///
    /// With a configured secret the signature is checked first; a bad one is
    /// rejected before anything is read or written. Callbacks for unknown
    /// message ids are acknowledged without effect.
    #[instrument(skip_all)]
    pub fn receive_webhook(
        &self,
        body: &[u8],
        signature: Option<&str>,
    ) -> Result<WebhookAck, InvoicingError> {
        if let Some(secret) = &self.config.webhook_secret {
            if let Err(e) = webhook::verify_signature(secret, body, signature) {
                warn!("rejected webhook with bad signature");
                return Err(e);
            }
        }

        let event = webhook::parse_event(body).inspect_err(|e| {
            warn!(error = %e, "rejected unparseable webhook");
        })?;

        let Some(mut invoice) = self.store.invoice_by_message_id(&event.message_id)? else {
            debug!(message_id = %event.message_id, "webhook for unknown message");
            return Ok(WebhookAck {
                ok: true,
                invoice_id: None,
                status: None,
            });
        };

        let previous = invoice.status;
        let next = event.status.map(InvoiceStatus::from);
        let message = match next {
            Some(next) if next != previous && previous.can_report(next) => {
                invoice.status = next;
                invoice.updated_at = Utc::now();
                self.store.update_invoice(&invoice)?;
                info!(invoice_id = %invoice.id, %previous, status = %next, "webhook updated status");
                format!("webhook status={} ({previous} -> {next})", event.raw_status)
            }
            _ => {
                debug!(invoice_id = %invoice.id, raw = %event.raw_status, "webhook left status unchanged");
                format!("webhook status={} (unchanged {previous})", event.raw_status)
            }
        };
        self.audit().record(invoice.id, LogKind::Status, message)?;

        Ok(WebhookAck {
            ok: true,
            invoice_id: Some(invoice.id),
            status: Some(invoice.status),
        })
    }

    /// Delivery log of an invoice, oldest first.
    pub fn list_logs(
        &self,
        company_id: Uuid,
        invoice_id: Uuid,
    ) -> Result<Vec<DeliveryLogRecord>, InvoicingError> {
        let invoice = self.load(company_id, invoice_id)?;
        self.audit().list(invoice.id)
    }

    /// Read a prepared artifact back.
    pub fn download(
        &self,
        company_id: Uuid,
        invoice_id: Uuid,
        kind: ArtifactKind,
    ) -> Result<Vec<u8>, InvoicingError> {
        let invoice = self.load(company_id, invoice_id)?;
        let recorded = match kind {
            ArtifactKind::Xml => invoice.xml_path,
            ArtifactKind::Pdf => invoice.pdf_path,
        }
        .ok_or_else(|| {
            InvoicingError::ArtifactMissing(format!("{} not prepared", kind.extension()))
        })?;
        self.artifacts.read(&recorded)
    }
}
