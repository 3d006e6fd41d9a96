use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;
use uuid::Uuid;

use crate::core::InvoicingError;

/// Prefix written by older deployments in front of relative artifact paths.
const LEGACY_PREFIX: &str = "storage/";

/// One of the two generated documents of an invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Xml,
    Pdf,
}

impl ArtifactKind {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Xml => "xml",
            Self::Pdf => "pdf",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Xml => "application/xml",
            Self::Pdf => "application/pdf",
        }
    }
}

/// File-system storage for invoice artifacts.
///
/// Paths recorded on invoices are relative to `root`, in the form
/// `invoices/{id}/{id}.{xml,pdf}`. Writes replace the whole file.
#[derive(Debug, Clone)]
pub struct ArtifactStorage {
    root: PathBuf,
}

impl ArtifactStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Relative path under which an invoice artifact is stored.
    pub fn relative_path(invoice_id: Uuid, kind: ArtifactKind) -> String {
        format!("invoices/{invoice_id}/{invoice_id}.{}", kind.extension())
    }

    /// Write `bytes` and return the relative path to record.
    pub fn write(
        &self,
        invoice_id: Uuid,
        kind: ArtifactKind,
        bytes: &[u8],
    ) -> Result<String, InvoicingError> {
        let relative = Self::relative_path(invoice_id, kind);
        let target = self.root.join(&relative);
        write_replace(&target, bytes).map_err(|e| {
            InvoicingError::Storage(format!("failed to write {}: {e}", target.display()))
        })?;
        debug!(path = %relative, bytes = bytes.len(), "artifact written");
        Ok(relative)
    }

    /// Absolute location of a recorded path.
    ///
    /// Tries the path as recorded, then without the legacy `storage/`
    /// prefix. Returns the first candidate when none exists.
    pub fn resolve(&self, recorded: &str) -> PathBuf {
        let direct = self.root.join(recorded);
        if direct.is_file() {
            return direct;
        }
        if let Some(stripped) = recorded.strip_prefix(LEGACY_PREFIX) {
            let legacy = self.root.join(stripped);
            if legacy.is_file() {
                return legacy;
            }
        }
        direct
    }

    pub fn exists(&self, recorded: &str) -> bool {
        self.resolve(recorded).is_file()
    }

    /// Read a recorded artifact back; `ArtifactMissing` when it is gone.
    pub fn read(&self, recorded: &str) -> Result<Vec<u8>, InvoicingError> {
        let path = self.resolve(recorded);
        fs::read(&path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => InvoicingError::ArtifactMissing(recorded.to_string()),
            _ => InvoicingError::Storage(format!("failed to read {}: {e}", path.display())),
        })
    }
}

fn write_replace(target: &Path, bytes: &[u8]) -> io::Result<()> {
    let dir = target
        .parent()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "artifact path has no parent"))?;
    fs::create_dir_all(dir)?;

    let mut tmp = target.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, target)
}
