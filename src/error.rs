use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by ledger storage and the document workflows.
///
/// The allocator itself never fails: it is handed an already-fetched ledger and
/// skips rows it cannot parse. Everything that touches a file, a template or
/// the caller's conflict policy reports through this type.
#[derive(Error, Debug)]
pub enum LedgerError {
    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A ledger file could not be parsed.
    #[error("malformed CSV at line {line}: {detail}")]
    Csv { line: usize, detail: String },

    /// Snapshot encode/decode failure.
    #[error("snapshot error: {0}")]
    Snapshot(String),

    /// Template registration or rendering failure.
    #[error("template error: {0}")]
    Template(String),

    /// Update targeted a data row that does not exist.
    #[error("row {index} not found (ledger has {len} rows)")]
    RowNotFound { index: usize, len: usize },

    /// The client already has an engagement with a blank `Service Ended`.
    #[error("client '{reference_key}' already has an active record '{identifier}'")]
    ActiveEngagement {
        reference_key: String,
        identifier: String,
    },

    /// No active record to end.
    #[error("no active record for client '{reference_key}'")]
    NoActiveRecord { reference_key: String },

    /// The same agreement was already saved to its sheet.
    #[error("agreement '{doc_type}' for invoice '{invoice_no}' already saved")]
    DuplicateAgreement { invoice_no: String, doc_type: String },

    /// Configuration file could not be read or parsed.
    #[error("config error in '{}': {detail}", path.display())]
    Config { path: PathBuf, detail: String },

    /// An intake workbook could not be opened or read.
    #[error("workbook error: {0}")]
    Workbook(String),

    /// Spreadsheet export failure.
    #[error("export error: {0}")]
    Export(String),
}

impl From<handlebars::RenderError> for LedgerError {
    fn from(e: handlebars::RenderError) -> Self {
        LedgerError::Template(e.to_string())
    }
}

impl From<bincode::Error> for LedgerError {
    fn from(e: bincode::Error) -> Self {
        LedgerError::Snapshot(e.to_string())
    }
}

#[cfg(feature = "xlsx")]
impl From<calamine::Error> for LedgerError {
    fn from(e: calamine::Error) -> Self {
        LedgerError::Workbook(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;
