use serde::Serialize;

use crate::model::{Client, Company, Invoice, Settings, UNKNOWN_CLIENT};

/// One row of the item table, already formatted for display.
#[derive(Debug, Serialize, PartialEq)]
pub struct DocumentLine {
    pub description: String,
    pub quantity: String,
    pub unit_price: String,
    pub tax_rate: String,
    pub amount: String,
}

/// The billing block. A deleted client leaves only the placeholder name.
#[derive(Debug, Serialize, PartialEq)]
pub struct BillTo {
    pub name: String,
    pub lines: Vec<String>,
}

/// Everything the invoice template renders. Amounts are pre-formatted with
/// the settings currency so the template does no arithmetic.
#[derive(Debug, Serialize)]
pub struct InvoiceDocument {
    pub heading: String,
    pub number: String,
    pub date: String,
    pub due_date: String,
    pub company: Company,
    pub bill_to: BillTo,
    pub show_tax: bool,
    pub items: Vec<DocumentLine>,
    pub subtotal: String,
    pub tax_total: Option<String>,
    pub total: String,
    pub terms: String,
    pub notes: String,
}

const DATE_FORMAT: &str = "%B %-d, %Y";

fn join_non_empty(parts: &[&str], sep: &str) -> String {
    parts
        .iter()
        .filter(|p| !p.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(sep)
}

impl BillTo {
    fn for_client(client: Option<&Client>) -> Self {
        let Some(client) = client else {
            return Self {
                name: UNKNOWN_CLIENT.to_string(),
                lines: Vec::new(),
            };
        };

        let d = &client.details;
        let locality = join_non_empty(&[d.city.as_str(), d.zip_code.as_str()], " ");
        let street = join_non_empty(&[d.address.as_str(), locality.as_str()], ", ");
        let lines = [street, d.country.clone(), d.email.clone()]
            .into_iter()
            .filter(|l| !l.is_empty())
            .collect();

        Self {
            name: d.name.clone(),
            lines,
        }
    }
}

impl InvoiceDocument {
    pub fn build(invoice: &Invoice, client: Option<&Client>, settings: &Settings) -> Self {
        let fmt = |amount: f64| settings.format_currency(amount);

        let items = invoice
            .items
            .iter()
            .map(|item| DocumentLine {
                description: item.description.clone(),
                quantity: item.quantity.to_string(),
                unit_price: fmt(item.unit_price),
                tax_rate: format!("{}%", item.tax_rate),
                amount: fmt(item.total),
            })
            .collect();

        let tax_total = (settings.tax_enabled && invoice.tax_total > 0.0)
            .then(|| fmt(invoice.tax_total));

        Self {
            heading: invoice
                .title
                .as_deref()
                .filter(|t| !t.is_empty())
                .unwrap_or("INVOICE")
                .to_string(),
            number: invoice.number.clone(),
            date: invoice.date.format(DATE_FORMAT).to_string(),
            due_date: invoice.due_date.format(DATE_FORMAT).to_string(),
            company: settings.company.clone(),
            bill_to: BillTo::for_client(client),
            show_tax: settings.tax_enabled,
            items,
            subtotal: fmt(invoice.subtotal),
            tax_total,
            total: fmt(invoice.total),
            terms: invoice.terms.clone(),
            notes: invoice.notes.clone(),
        }
    }

    /// Download name for the rendered document, always a single path
    /// component. The displayed number is left as is.
    pub fn file_name(&self) -> String {
        let mut stem: String = self
            .number
            .chars()
            .map(|c| match c {
                '/' | '\\' | ':' => '-',
                c if c.is_control() => '-',
                c => c,
            })
            .collect();

        let dots = stem.len() - stem.trim_start_matches('.').len();
        stem.replace_range(..dots, &"-".repeat(dots));

        if stem.is_empty() {
            stem.push_str("invoice");
        }
        format!("{stem}.pdf")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ClientDetails, InvoiceItem, NewInvoice};
    use chrono::{NaiveDate, Utc};

    fn sample(settings: &Settings) -> Invoice {
        let date = NaiveDate::from_ymd_opt(2026, 2, 3).unwrap();
        let mut draft = NewInvoice::from_settings(settings, "client-1", date);
        draft.add_item(InvoiceItem::new("Consulting", 2.0, 50.0, 10.0));
        draft.into_invoice(Utc::now(), settings.tax_enabled)
    }

    fn acme() -> Client {
        Client {
            id: "client-1".to_string(),
            details: ClientDetails {
                name: "Acme".to_string(),
                address: "1 Main St".to_string(),
                city: "Springfield".to_string(),
                zip_code: "12345".to_string(),
                country: "USA".to_string(),
                ..ClientDetails::default()
            },
        }
    }

    #[test]
    fn builds_formatted_document() {
        let settings = Settings::default();
        let invoice = sample(&settings);
        let client = acme();
        let doc = InvoiceDocument::build(&invoice, Some(&client), &settings);

        assert_eq!(doc.heading, "INVOICE");
        assert_eq!(doc.date, "February 3, 2026");
        assert_eq!(doc.bill_to.name, "Acme");
        assert_eq!(doc.bill_to.lines, ["1 Main St, Springfield 12345", "USA"]);
        assert_eq!(
            doc.items[0],
            DocumentLine {
                description: "Consulting".to_string(),
                quantity: "2".to_string(),
                unit_price: "$50.00".to_string(),
                tax_rate: "10%".to_string(),
                amount: "$110.00".to_string(),
            }
        );
        assert_eq!(doc.subtotal, "$100.00");
        assert_eq!(doc.tax_total.as_deref(), Some("$10.00"));
        assert_eq!(doc.total, "$110.00");
        assert_eq!(doc.file_name(), "INV-1.pdf");
    }

    #[test]
    fn file_name_is_a_single_component() {
        let named = |prefix: &str| {
            let settings = Settings {
                invoice_number_prefix: prefix.to_string(),
                ..Settings::default()
            };
            let doc = InvoiceDocument::build(&sample(&settings), None, &settings);
            (doc.number.clone(), doc.file_name())
        };

        assert_eq!(named("A/"), ("A/1".to_string(), "A-1.pdf".to_string()));
        assert_eq!(named("/abs-"), ("/abs-1".to_string(), "-abs-1.pdf".to_string()));
        assert_eq!(named("../../").1, "---..-1.pdf");
        assert_eq!(named("C:\\x\\").1, "C--x-1.pdf");
        assert_eq!(named(".hidden-").1, "-hidden-1.pdf");
    }

    #[test]
    fn missing_client_is_unknown() {
        let settings = Settings::default();
        let doc = InvoiceDocument::build(&sample(&settings), None, &settings);
        assert_eq!(doc.bill_to.name, "Unknown");
        assert!(doc.bill_to.lines.is_empty());
    }

    #[test]
    fn tax_hidden_when_disabled() {
        let settings = Settings {
            tax_enabled: false,
            ..Settings::default()
        };
        let doc = InvoiceDocument::build(&sample(&settings), None, &settings);
        assert!(!doc.show_tax);
        assert!(doc.tax_total.is_none());
        assert_eq!(doc.total, "$100.00");
    }

    #[test]
    fn custom_title_replaces_heading() {
        let settings = Settings::default();
        let mut invoice = sample(&settings);
        invoice.title = Some("PRO FORMA".to_string());
        let doc = InvoiceDocument::build(&invoice, None, &settings);
        assert_eq!(doc.heading, "PRO FORMA");
    }
}
