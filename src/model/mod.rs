mod client;
mod company;
mod invoice;
mod settings;

pub use client::{Client, ClientDetails, UNKNOWN_CLIENT};
pub use company::Company;
pub use invoice::{Invoice, InvoiceItem, InvoiceStatus, ItemChange, NewInvoice, Totals};
pub use settings::Settings;

use uuid::Uuid;

/// Fresh record identifier such as `client-0190f5c4...`.
pub fn new_id(kind: &str) -> String {
    format!("{}-{}", kind, Uuid::now_v7().simple())
}
