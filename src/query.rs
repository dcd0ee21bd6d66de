use chrono::NaiveDate;

use crate::model::{Client, Invoice, InvoiceStatus, Settings, UNKNOWN_CLIENT};

/// Date layout the search compares against, e.g. "Mar 5, 2026".
pub const SEARCH_DATE_FORMAT: &str = "%b %-d, %Y";

/// Criteria for narrowing the invoice list. Unset fields match everything.
#[derive(Debug, Clone, Default)]
pub struct InvoiceFilter {
    pub status: Option<InvoiceStatus>,
    pub client_id: Option<String>,
    /// Inclusive lower bound on the invoice date.
    pub start_date: Option<NaiveDate>,
    /// Inclusive upper bound on the invoice date.
    pub end_date: Option<NaiveDate>,
    /// Case-insensitive match against number, client name, title, the date
    /// as "Mar 5, 2026" and the total formatted in the settings currency.
    pub search: Option<String>,
}

impl InvoiceFilter {
    pub fn matches(&self, invoice: &Invoice, clients: &[Client], settings: &Settings) -> bool {
        if self.status.is_some_and(|s| s != invoice.status) {
            return false;
        }
        if self
            .client_id
            .as_deref()
            .is_some_and(|id| id != invoice.client_id)
        {
            return false;
        }
        if self.start_date.is_some_and(|d| invoice.date < d) {
            return false;
        }
        if self.end_date.is_some_and(|d| invoice.date > d) {
            return false;
        }

        match self.search.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(term) => {
                let term = term.to_lowercase();
                let date = invoice.date.format(SEARCH_DATE_FORMAT).to_string();
                let total = settings.format_currency(invoice.total);
                [
                    invoice.number.as_str(),
                    client_name(clients, &invoice.client_id),
                    invoice.display_title(),
                    date.as_str(),
                    total.as_str(),
                ]
                .iter()
                .any(|field| field.to_lowercase().contains(&term))
            }
        }
    }
}

/// Name of the referenced client, or "Unknown" when it no longer exists.
pub fn client_name<'a>(clients: &'a [Client], client_id: &str) -> &'a str {
    clients
        .iter()
        .find(|c| c.id == client_id)
        .map(Client::name)
        .unwrap_or(UNKNOWN_CLIENT)
}

pub fn filter_invoices<'a>(
    invoices: &'a [Invoice],
    clients: &[Client],
    settings: &Settings,
    filter: &InvoiceFilter,
) -> Vec<&'a Invoice> {
    invoices
        .iter()
        .filter(|invoice| filter.matches(invoice, clients, settings))
        .collect()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusCounts {
    pub all: usize,
    pub draft: usize,
    pub sent: usize,
    pub paid: usize,
    pub overdue: usize,
    pub canceled: usize,
}

impl StatusCounts {
    pub fn of(invoices: &[Invoice]) -> Self {
        let mut counts = Self {
            all: invoices.len(),
            ..Self::default()
        };
        for invoice in invoices {
            match invoice.status {
                InvoiceStatus::Draft => counts.draft += 1,
                InvoiceStatus::Sent => counts.sent += 1,
                InvoiceStatus::Paid => counts.paid += 1,
                InvoiceStatus::Overdue => counts.overdue += 1,
                InvoiceStatus::Canceled => counts.canceled += 1,
            }
        }
        counts
    }

    pub fn get(&self, status: InvoiceStatus) -> usize {
        match status {
            InvoiceStatus::Draft => self.draft,
            InvoiceStatus::Sent => self.sent,
            InvoiceStatus::Paid => self.paid,
            InvoiceStatus::Overdue => self.overdue,
            InvoiceStatus::Canceled => self.canceled,
        }
    }
}

/// Headline figures. Pending means sent but not yet paid.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DashboardStats {
    pub paid_count: usize,
    pub overdue_count: usize,
    pub pending_count: usize,
    pub total_paid: f64,
    pub total_overdue: f64,
    pub total_pending: f64,
    pub paid_percentage: f64,
    pub overdue_percentage: f64,
    pub client_count: usize,
    pub invoice_count: usize,
}

impl DashboardStats {
    pub fn compute(invoices: &[Invoice], clients: &[Client]) -> Self {
        let sum_of = |status: InvoiceStatus| -> (usize, f64) {
            invoices
                .iter()
                .filter(|i| i.status == status)
                .fold((0, 0.0), |(n, total), i| (n + 1, total + i.total))
        };
        let (paid_count, total_paid) = sum_of(InvoiceStatus::Paid);
        let (overdue_count, total_overdue) = sum_of(InvoiceStatus::Overdue);
        let (pending_count, total_pending) = sum_of(InvoiceStatus::Sent);

        let percentage = |n: usize| {
            if invoices.is_empty() {
                0.0
            } else {
                n as f64 / invoices.len() as f64 * 100.0
            }
        };

        Self {
            paid_count,
            overdue_count,
            pending_count,
            total_paid,
            total_overdue,
            total_pending,
            paid_percentage: percentage(paid_count),
            overdue_percentage: percentage(overdue_count),
            client_count: clients.len(),
            invoice_count: invoices.len(),
        }
    }
}

/// Up to `limit` invoices, most recently updated first.
pub fn recent_invoices(invoices: &[Invoice], limit: usize) -> Vec<&Invoice> {
    let mut sorted: Vec<&Invoice> = invoices.iter().collect();
    sorted.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
    sorted.truncate(limit);
    sorted
}
