pub mod app;
pub mod config;
pub mod currency;
pub mod error;
pub mod model;
pub mod pdf;
pub mod query;
pub mod store;

pub use app::InvoiceApp;
pub use config::Config;
pub use currency::{available_currencies, Currency, SymbolPosition};
pub use error::{InvoiceError, Result};
pub use model::{
    Client, ClientDetails, Company, Invoice, InvoiceItem, InvoiceStatus, ItemChange, NewInvoice,
    Settings, Totals,
};
pub use query::{DashboardStats, InvoiceFilter, StatusCounts};
pub use store::{FileStorage, KeyValueStorage, MemoryStorage};
