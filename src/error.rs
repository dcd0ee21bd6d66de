use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum InvoiceError {
    #[error("Config directory already exists at {0}")]
    AlreadyInitialized(PathBuf),

    #[error("Failed to parse config file {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Failed to save '{key}': {source}")]
    Persist {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Stored '{key}' is not valid: {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error(
        "{source}; restoring invoices also failed ({restore}), so invoice {number} is stored \
         but the number counter did not advance"
    )]
    RollbackFailed {
        number: String,
        #[source]
        source: Box<InvoiceError>,
        restore: Box<InvoiceError>,
    },

    #[error("Client '{0}' not found")]
    ClientNotFound(String),

    #[error("Invoice '{0}' not found")]
    InvoiceNotFound(String),

    #[error("Invalid invoice index '{0}'. Use 'invoicer invoice list' to see available invoices.")]
    InvalidInvoiceIndex(String),

    #[error("Item '{0}' not found on invoice")]
    ItemNotFound(String),

    #[error("Unknown currency '{0}'. Use 'invoicer currencies' to see supported codes.")]
    UnknownCurrency(String),

    #[error("Invalid status '{0}'. Use draft, sent, paid, overdue or canceled.")]
    InvalidStatus(String),

    #[error("Invalid item format '{0}'. Expected 'description:quantity:unit_price[:tax_rate]'")]
    InvalidItemFormat(String),

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Typst not found. Install it from https://typst.app/ or run: cargo install typst-cli")]
    TypstNotFound,

    #[error("Failed to generate PDF: {0}")]
    PdfGeneration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, InvoiceError>;
