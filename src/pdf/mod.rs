mod document;
mod typst;

pub use document::{BillTo, DocumentLine, InvoiceDocument};
pub use typst::{generate_pdf, invoice_pdf_path};
