// src/error.rs

use std::path::PathBuf;
use thiserror::Error;

/// Every failure the pipeline surfaces to its caller.
///
/// Anomalies inside the order document itself (unknown lines, orphan
/// dimension lines, unmatched aliases) never become errors; they degrade
/// to empty or zero values instead.
#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read PDF: {0}")]
    Pdf(String),

    #[error("PDF text extraction panicked (malformed document)")]
    PdfPanicked,

    #[error("failed to read spreadsheet {path}: {message}")]
    SpreadsheetRead { path: PathBuf, message: String },

    #[error("failed to write spreadsheet {path}: {message}")]
    SpreadsheetWrite { path: PathBuf, message: String },

    #[error("invalid configuration: {0}")]
    Config(String),

    /// The inventory sheet does not have the positional layout reconciliation
    /// relies on. Always fatal for the whole invocation.
    #[error("malformed inventory layout: {0}")]
    MalformedInventory(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    /// True for the one error kind callers are expected to handle specially.
    pub fn is_malformed_inventory(&self) -> bool {
        matches!(self, Error::MalformedInventory(_))
    }
}
