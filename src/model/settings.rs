use serde::{Deserialize, Serialize};

use crate::currency::{default_currency, Currency};
use crate::model::Company;

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub company: Company,
    pub currency: Currency,
    /// Days between invoice date and due date.
    pub payment_terms: u32,
    pub invoice_number_prefix: String,
    pub invoice_number_suffix: String,
    /// Next sequence number; advanced by one for every invoice added.
    pub invoice_number_counter: u32,
    pub tax_enabled: bool,
    pub default_tax_rate: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            company: Company::blank(),
            currency: default_currency(),
            payment_terms: 0,
            invoice_number_prefix: "INV-".to_string(),
            invoice_number_suffix: String::new(),
            invoice_number_counter: 1,
            tax_enabled: true,
            default_tax_rate: 6.0,
        }
    }
}

impl Settings {
    /// The number the next invoice will get. Does not advance the counter.
    pub fn next_invoice_number(&self) -> String {
        format!(
            "{}{}{}",
            self.invoice_number_prefix, self.invoice_number_counter, self.invoice_number_suffix
        )
    }

    pub fn format_currency(&self, amount: f64) -> String {
        self.currency.format(amount)
    }

    /// Tax rate a freshly added line item starts with.
    pub fn item_tax_rate(&self) -> f64 {
        if self.tax_enabled {
            self.default_tax_rate
        } else {
            0.0
        }
    }

    /// Terms text prefilled on new invoices, empty until a company is named.
    pub fn default_terms(&self) -> String {
        if self.company.name.is_empty() {
            String::new()
        } else {
            format!("Payment terms: Net {} days", self.payment_terms)
        }
    }
}
