//! The facade every consumer goes through. It owns the aggregates and the
//! storage handle; nothing else writes to either.

use chrono::{NaiveDate, Utc};
use tracing::{debug, info, warn};

use crate::currency::{find_currency, Currency};
use crate::error::{InvoiceError, Result};
use crate::model::{
    new_id, Client, ClientDetails, Company, Invoice, InvoiceStatus, NewInvoice, Settings,
};
use crate::query::{self, DashboardStats, InvoiceFilter, StatusCounts};
use crate::store::{Changes, KeyValueStorage, PersistentStore};

pub struct InvoiceApp<S> {
    store: PersistentStore<S>,
    settings: Settings,
    clients: Vec<Client>,
    invoices: Vec<Invoice>,
}

impl<S: KeyValueStorage> InvoiceApp<S> {
    /// Load every aggregate, seeding and persisting defaults for any that are
    /// missing, so readers never observe an uninitialised store.
    pub fn open(storage: S) -> Result<Self> {
        let mut store = PersistentStore::new(storage);
        let loaded = store.load()?;

        let seed_settings = loaded.settings.is_none();
        let seed_clients = loaded.clients.is_none();
        let seed_invoices = loaded.invoices.is_none();

        let settings = loaded.settings.unwrap_or_default();
        let clients = loaded.clients.unwrap_or_default();
        let invoices = loaded.invoices.unwrap_or_default();

        if seed_settings || seed_clients || seed_invoices {
            info!(
                settings = seed_settings,
                clients = seed_clients,
                invoices = seed_invoices,
                "seeding missing aggregates"
            );
            store.save(Changes {
                settings: seed_settings.then_some(&settings),
                clients: seed_clients.then_some(clients.as_slice()),
                invoices: seed_invoices.then_some(invoices.as_slice()),
            })?;
        }

        debug!(
            clients = clients.len(),
            invoices = invoices.len(),
            "store opened"
        );

        Ok(Self {
            store,
            settings,
            clients,
            invoices,
        })
    }

    pub fn storage(&self) -> &S {
        self.store.storage()
    }

    pub fn storage_mut(&mut self) -> &mut S {
        self.store.storage_mut()
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn clients(&self) -> &[Client] {
        &self.clients
    }

    pub fn invoices(&self) -> &[Invoice] {
        &self.invoices
    }

    // Settings

    pub fn update_settings(&mut self, settings: Settings) -> Result<()> {
        self.store.save(Changes::settings(&settings))?;
        self.settings = settings;
        info!("settings updated");
        Ok(())
    }

    pub fn update_company(&mut self, company: Company) -> Result<()> {
        let settings = Settings {
            company,
            ..self.settings.clone()
        };
        self.update_settings(settings)
    }

    /// Store a copy of `currency`; later table changes do not affect it.
    pub fn update_currency(&mut self, currency: Currency) -> Result<()> {
        let settings = Settings {
            currency,
            ..self.settings.clone()
        };
        self.update_settings(settings)
    }

    pub fn select_currency(&mut self, code: &str) -> Result<()> {
        let currency =
            find_currency(code).ok_or_else(|| InvoiceError::UnknownCurrency(code.to_string()))?;
        self.update_currency(currency)
    }

    pub fn generate_invoice_number(&self) -> String {
        self.settings.next_invoice_number()
    }

    pub fn format_currency(&self, amount: f64) -> String {
        self.settings.format_currency(amount)
    }

    // Clients

    pub fn find_client(&self, id: &str) -> Option<&Client> {
        self.clients.iter().find(|c| c.id == id)
    }

    pub fn client(&self, id: &str) -> Result<&Client> {
        self.find_client(id)
            .ok_or_else(|| InvoiceError::ClientNotFound(id.to_string()))
    }

    /// Client name for an invoice, "Unknown" when the client was deleted.
    pub fn client_name(&self, invoice: &Invoice) -> &str {
        query::client_name(&self.clients, &invoice.client_id)
    }

    pub fn add_client(&mut self, details: ClientDetails) -> Result<Client> {
        let client = Client {
            id: new_id("client"),
            details,
        };
        let mut clients = self.clients.clone();
        clients.push(client.clone());
        self.commit_clients(clients)?;
        info!(id = %client.id, "client added");
        Ok(client)
    }

    pub fn update_client(&mut self, client: Client) -> Result<()> {
        let idx = self
            .clients
            .iter()
            .position(|c| c.id == client.id)
            .ok_or_else(|| InvoiceError::ClientNotFound(client.id.clone()))?;
        let mut clients = self.clients.clone();
        clients[idx] = client;
        self.commit_clients(clients)?;
        info!(id = %self.clients[idx].id, "client updated");
        Ok(())
    }

    /// Remove a client. Invoices pointing at it are left alone. Returns
    /// whether anything was removed; an unknown id is not an error.
    pub fn delete_client(&mut self, id: &str) -> Result<bool> {
        if self.find_client(id).is_none() {
            debug!(id, "delete of unknown client ignored");
            return Ok(false);
        }
        let clients = self.clients.iter().filter(|c| c.id != id).cloned().collect();
        self.commit_clients(clients)?;
        info!(id, "client deleted");
        Ok(true)
    }

    fn commit_clients(&mut self, clients: Vec<Client>) -> Result<()> {
        self.store.save(Changes::clients(&clients))?;
        self.clients = clients;
        Ok(())
    }

    // Invoices

    pub fn find_invoice(&self, id: &str) -> Option<&Invoice> {
        self.invoices.iter().find(|i| i.id == id)
    }

    pub fn invoice(&self, id: &str) -> Result<&Invoice> {
        self.find_invoice(id)
            .ok_or_else(|| InvoiceError::InvoiceNotFound(id.to_string()))
    }

    pub fn find_invoice_by_number(&self, number: &str) -> Option<&Invoice> {
        self.invoices.iter().find(|i| i.number == number)
    }

    /// A draft prefilled from the current settings, numbered with the preview.
    pub fn new_invoice(&self, client_id: impl Into<String>, today: NaiveDate) -> NewInvoice {
        NewInvoice::from_settings(&self.settings, client_id, today)
    }

    /// Add an invoice and advance the number counter as one step: if either
    /// write fails, neither change is kept.
    pub fn add_invoice(&mut self, draft: NewInvoice) -> Result<Invoice> {
        let invoice = draft.into_invoice(Utc::now(), self.settings.tax_enabled);

        let mut invoices = self.invoices.clone();
        invoices.push(invoice.clone());
        let mut settings = self.settings.clone();
        settings.invoice_number_counter = settings.invoice_number_counter.saturating_add(1);

        self.store.save(Changes::invoices(&invoices))?;
        if let Err(e) = self.store.save(Changes::settings(&settings)) {
            if let Err(restore) = self.store.save(Changes::invoices(&self.invoices)) {
                warn!(error = %restore, "could not restore invoices after failed counter update");
                return Err(InvoiceError::RollbackFailed {
                    number: invoice.number,
                    source: Box::new(e),
                    restore: Box::new(restore),
                });
            }
            return Err(e);
        }

        self.invoices = invoices;
        self.settings = settings;
        info!(
            id = %invoice.id,
            number = %invoice.number,
            counter = self.settings.invoice_number_counter,
            "invoice added"
        );
        Ok(invoice)
    }

    /// Replace an invoice by id. Totals are re-derived from the items,
    /// `updated_at` is refreshed and the original `created_at` is kept.
    pub fn update_invoice(&mut self, mut invoice: Invoice) -> Result<Invoice> {
        let idx = self
            .invoices
            .iter()
            .position(|i| i.id == invoice.id)
            .ok_or_else(|| InvoiceError::InvoiceNotFound(invoice.id.clone()))?;

        invoice.created_at = self.invoices[idx].created_at;
        invoice.updated_at = Utc::now();
        invoice.recalculate(self.settings.tax_enabled);

        let mut invoices = self.invoices.clone();
        invoices[idx] = invoice.clone();
        self.commit_invoices(invoices)?;
        info!(id = %invoice.id, "invoice updated");
        Ok(invoice)
    }

    /// Any status may follow any other; nothing is inferred from dates.
    pub fn set_invoice_status(&mut self, id: &str, status: InvoiceStatus) -> Result<Invoice> {
        let mut invoice = self.invoice(id)?.clone();
        invoice.status = status;
        self.update_invoice(invoice)
    }

    pub fn delete_invoice(&mut self, id: &str) -> Result<bool> {
        if self.find_invoice(id).is_none() {
            debug!(id, "delete of unknown invoice ignored");
            return Ok(false);
        }
        let invoices = self.invoices.iter().filter(|i| i.id != id).cloned().collect();
        self.commit_invoices(invoices)?;
        info!(id, "invoice deleted");
        Ok(true)
    }

    fn commit_invoices(&mut self, invoices: Vec<Invoice>) -> Result<()> {
        self.store.save(Changes::invoices(&invoices))?;
        self.invoices = invoices;
        Ok(())
    }

    // Queries

    pub fn filter_invoices(&self, filter: &InvoiceFilter) -> Vec<&Invoice> {
        query::filter_invoices(&self.invoices, &self.clients, &self.settings, filter)
    }

    pub fn status_counts(&self) -> StatusCounts {
        StatusCounts::of(&self.invoices)
    }

    pub fn dashboard(&self) -> DashboardStats {
        DashboardStats::compute(&self.invoices, &self.clients)
    }

    pub fn recent_invoices(&self, limit: usize) -> Vec<&Invoice> {
        query::recent_invoices(&self.invoices, limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{InvoiceItem, ItemChange};
    use crate::store::{MemoryStorage, CLIENTS_KEY, INVOICES_KEY, SETTINGS_KEY};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 6, 1).unwrap()
    }

    fn app() -> InvoiceApp<MemoryStorage> {
        InvoiceApp::open(MemoryStorage::new()).unwrap()
    }

    fn acme() -> ClientDetails {
        ClientDetails {
            name: "Acme".to_string(),
            email: "ap@acme.test".to_string(),
            ..ClientDetails::default()
        }
    }

    #[test]
    fn open_seeds_and_persists_defaults() {
        let app = app();
        assert_eq!(app.settings(), &Settings::default());
        assert!(app.clients().is_empty());
        assert!(app.invoices().is_empty());
        for key in [SETTINGS_KEY, CLIENTS_KEY, INVOICES_KEY] {
            assert!(app.storage().contains(key), "{key} not seeded");
        }
    }

    #[test]
    fn reopening_sees_saved_state() {
        let mut app = app();
        app.add_client(acme()).unwrap();
        let storage = app.storage().clone();

        let reopened = InvoiceApp::open(storage).unwrap();
        assert_eq!(reopened.clients().len(), 1);
        assert_eq!(reopened.clients()[0].name(), "Acme");
    }

    #[test]
    fn client_crud() {
        let mut app = app();
        let client = app.add_client(acme()).unwrap();
        assert!(client.id.starts_with("client-"));

        let mut edited = client.clone();
        edited.details.city = "Springfield".to_string();
        app.update_client(edited).unwrap();
        assert_eq!(app.client(&client.id).unwrap().details.city, "Springfield");

        assert!(app.delete_client(&client.id).unwrap());
        assert!(app.find_client(&client.id).is_none());
    }

    #[test]
    fn updating_unknown_client_is_not_found() {
        let mut app = app();
        let ghost = Client {
            id: "client-ghost".to_string(),
            details: acme(),
        };
        assert!(matches!(
            app.update_client(ghost),
            Err(InvoiceError::ClientNotFound(_))
        ));
    }

    #[test]
    fn deleting_unknown_client_is_a_noop() {
        let mut app = app();
        app.add_client(acme()).unwrap();
        assert!(!app.delete_client("client-nope").unwrap());
        assert_eq!(app.clients().len(), 1);
    }

    #[test]
    fn add_invoice_advances_counter_by_one() {
        let mut app = app();
        let client = app.add_client(acme()).unwrap();

        assert_eq!(app.generate_invoice_number(), "INV-1");
        let mut draft = app.new_invoice(&client.id, today());
        draft.add_item(InvoiceItem::new("Work", 2.0, 50.0, 10.0));
        let invoice = app.add_invoice(draft).unwrap();

        assert_eq!(invoice.number, "INV-1");
        assert_eq!(invoice.created_at, invoice.updated_at);
        assert_eq!(invoice.subtotal, 100.0);
        assert!((invoice.total - 110.0).abs() < 1e-9);
        assert_eq!(app.settings().invoice_number_counter, 2);
        assert_eq!(app.generate_invoice_number(), "INV-2");
    }

    #[test]
    fn failed_counter_write_keeps_nothing() {
        let mut app = app();
        app.storage_mut().fail_writes_to(SETTINGS_KEY);

        let draft = app.new_invoice("client-1", today());
        let err = app.add_invoice(draft).unwrap_err();
        assert!(matches!(err, InvoiceError::Persist { .. }));
        assert!(app.invoices().is_empty());
        assert_eq!(app.settings().invoice_number_counter, 1);

        app.storage_mut().allow_writes();
        let reopened = InvoiceApp::open(app.storage().clone()).unwrap();
        assert!(reopened.invoices().is_empty());
        assert_eq!(reopened.settings().invoice_number_counter, 1);
    }

    #[test]
    fn failed_rollback_is_reported_with_the_number() {
        let mut app = app();
        app.storage_mut().fail_writes_to(SETTINGS_KEY);
        app.storage_mut().fail_writes_to_after(INVOICES_KEY, 1);

        let draft = app.new_invoice("client-1", today());
        let err = app.add_invoice(draft).unwrap_err();
        let InvoiceError::RollbackFailed { number, source, restore } = &err else {
            panic!("expected RollbackFailed, got {err:?}");
        };
        assert_eq!(number, "INV-1");
        assert!(matches!(**source, InvoiceError::Persist { ref key, .. } if key == SETTINGS_KEY));
        assert!(matches!(**restore, InvoiceError::Persist { ref key, .. } if key == INVOICES_KEY));
        assert!(err.to_string().contains("counter did not advance"));

        assert!(app.invoices().is_empty());
        assert_eq!(app.settings().invoice_number_counter, 1);
    }

    #[test]
    fn update_invoice_refreshes_and_recomputes() {
        let mut app = app();
        let mut draft = app.new_invoice("client-1", today());
        draft.add_item(InvoiceItem::new("Work", 1.0, 100.0, 0.0));
        let invoice = app.add_invoice(draft).unwrap();

        let mut edited = invoice.clone();
        let item_id = edited.items[0].id.clone();
        edited
            .update_item(&item_id, ItemChange::Quantity(4.0), true)
            .unwrap();
        edited.subtotal = -1.0;
        let saved = app.update_invoice(edited).unwrap();

        assert_eq!(saved.subtotal, 400.0);
        assert_eq!(saved.created_at, invoice.created_at);
        assert!(saved.updated_at >= invoice.updated_at);
        assert_eq!(app.invoice(&invoice.id).unwrap().total, saved.total);
    }

    #[test]
    fn status_moves_freely() {
        let mut app = app();
        let invoice = app.add_invoice(app.new_invoice("client-1", today())).unwrap();

        for status in [
            InvoiceStatus::Paid,
            InvoiceStatus::Draft,
            InvoiceStatus::Overdue,
            InvoiceStatus::Canceled,
            InvoiceStatus::Sent,
        ] {
            let updated = app.set_invoice_status(&invoice.id, status).unwrap();
            assert_eq!(updated.status, status);
        }
    }

    #[test]
    fn deleting_client_leaves_invoice_unknown() {
        let mut app = app();
        let client = app.add_client(acme()).unwrap();
        let invoice = app.add_invoice(app.new_invoice(&client.id, today())).unwrap();

        app.delete_client(&client.id).unwrap();
        let kept = app.invoice(&invoice.id).unwrap();
        assert_eq!(kept.client_id, client.id);
        assert_eq!(app.client_name(kept), "Unknown");
    }

    #[test]
    fn delete_invoice_tolerates_absence() {
        let mut app = app();
        let invoice = app.add_invoice(app.new_invoice("client-1", today())).unwrap();
        assert!(app.delete_invoice(&invoice.id).unwrap());
        assert!(!app.delete_invoice(&invoice.id).unwrap());
        assert_eq!(app.settings().invoice_number_counter, 2);
    }

    #[test]
    fn currency_selection_is_a_copy() {
        let mut app = app();
        app.select_currency("eur").unwrap();
        assert_eq!(app.format_currency(1234.5), "1234.50€");
        assert!(matches!(
            app.select_currency("XXX"),
            Err(InvoiceError::UnknownCurrency(_))
        ));

        let mut custom = app.settings().currency.clone();
        custom.symbol = "EUR ".to_string();
        custom.position = crate::currency::SymbolPosition::Before;
        app.update_currency(custom).unwrap();
        assert_eq!(app.format_currency(5.0), "EUR 5.00");
    }

    #[test]
    fn failed_settings_write_is_surfaced() {
        let mut app = app();
        app.storage_mut().fail_writes_to(SETTINGS_KEY);
        let company = Company {
            name: "Initech".to_string(),
            ..Company::blank()
        };
        assert!(app.update_company(company).is_err());
        assert_eq!(app.settings().company.name, "");
    }
}
