//! Durable storage for the three aggregates: settings, clients and invoices.
//!
//! Each aggregate is a JSON document under a fixed key. A missing key (or a
//! stored `null`) loads as `None`; seeding defaults is up to the caller.

mod file;
mod memory;

pub use file::FileStorage;
pub use memory::MemoryStorage;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::error::{InvoiceError, Result};
use crate::model::{Client, Invoice, Settings};

pub const SETTINGS_KEY: &str = "appSettings";
pub const CLIENTS_KEY: &str = "clients";
pub const INVOICES_KEY: &str = "invoices";

/// String key-value storage the aggregates are written to.
pub trait KeyValueStorage {
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Must either persist the value or return an error.
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
}

/// Aggregates as found in storage, each independently optional.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoredState {
    pub settings: Option<Settings>,
    pub clients: Option<Vec<Client>>,
    pub invoices: Option<Vec<Invoice>>,
}

/// The aggregates a save should write. Absent fields are left untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct Changes<'a> {
    pub settings: Option<&'a Settings>,
    pub clients: Option<&'a [Client]>,
    pub invoices: Option<&'a [Invoice]>,
}

impl<'a> Changes<'a> {
    pub fn settings(settings: &'a Settings) -> Self {
        Self {
            settings: Some(settings),
            ..Self::default()
        }
    }

    pub fn clients(clients: &'a [Client]) -> Self {
        Self {
            clients: Some(clients),
            ..Self::default()
        }
    }

    pub fn invoices(invoices: &'a [Invoice]) -> Self {
        Self {
            invoices: Some(invoices),
            ..Self::default()
        }
    }
}

pub struct PersistentStore<S> {
    storage: S,
}

impl<S: KeyValueStorage> PersistentStore<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    pub fn load(&self) -> Result<StoredState> {
        Ok(StoredState {
            settings: self.read(SETTINGS_KEY)?,
            clients: self.read(CLIENTS_KEY)?,
            invoices: self.read(INVOICES_KEY)?,
        })
    }

    pub fn save(&mut self, changes: Changes<'_>) -> Result<()> {
        if let Some(settings) = changes.settings {
            self.write(SETTINGS_KEY, settings)?;
        }
        if let Some(clients) = changes.clients {
            self.write(CLIENTS_KEY, clients)?;
        }
        if let Some(invoices) = changes.invoices {
            self.write(INVOICES_KEY, invoices)?;
        }
        Ok(())
    }

    fn read<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let Some(raw) = self.storage.get(key)? else {
            debug!(key, "no stored value");
            return Ok(None);
        };
        serde_json::from_str::<Option<T>>(&raw).map_err(|source| InvoiceError::Corrupt {
            key: key.to_string(),
            source,
        })
    }

    fn write<T: Serialize + ?Sized>(&mut self, key: &str, value: &T) -> Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(|source| InvoiceError::Corrupt {
            key: key.to_string(),
            source,
        })?;
        self.storage.set(key, &json)?;
        debug!(key, bytes = json.len(), "saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ClientDetails, NewInvoice};
    use chrono::{NaiveDate, Utc};

    #[test]
    fn empty_storage_loads_nothing() {
        let store = PersistentStore::new(MemoryStorage::new());
        assert_eq!(store.load().unwrap(), StoredState::default());
    }

    #[test]
    fn stored_null_counts_as_absent() {
        let mut storage = MemoryStorage::new();
        storage.set(CLIENTS_KEY, "null").unwrap();
        let store = PersistentStore::new(storage);
        assert!(store.load().unwrap().clients.is_none());
    }

    #[test]
    fn save_only_touches_given_aggregates() {
        let mut store = PersistentStore::new(MemoryStorage::new());
        store.save(Changes::settings(&Settings::default())).unwrap();

        assert!(store.storage().contains(SETTINGS_KEY));
        assert!(!store.storage().contains(CLIENTS_KEY));
        assert!(!store.storage().contains(INVOICES_KEY));
    }

    #[test]
    fn round_trip_preserves_records() {
        let settings = Settings::default();
        let clients = vec![Client {
            id: "client-1".to_string(),
            details: ClientDetails {
                name: "Acme".to_string(),
                email: "ap@acme.test".to_string(),
                ..ClientDetails::default()
            },
        }];
        let mut draft = NewInvoice::from_settings(
            &settings,
            "client-1",
            NaiveDate::from_ymd_opt(2026, 5, 4).unwrap(),
        );
        draft.add_item(crate::model::InvoiceItem::new("Work", 2.0, 50.0, 10.0));
        draft.title = Some("May".to_string());
        let invoices = vec![draft.into_invoice(Utc::now(), true)];

        let mut store = PersistentStore::new(MemoryStorage::new());
        store
            .save(Changes {
                settings: Some(&settings),
                clients: Some(&clients),
                invoices: Some(&invoices),
            })
            .unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded.settings, Some(settings));
        assert_eq!(loaded.clients, Some(clients));
        assert_eq!(loaded.invoices, Some(invoices));
    }

    #[test]
    fn corrupt_value_names_the_key() {
        let mut storage = MemoryStorage::new();
        storage.set(INVOICES_KEY, "{not json").unwrap();
        let store = PersistentStore::new(storage);
        let err = store.load().unwrap_err();
        assert!(matches!(err, InvoiceError::Corrupt { ref key, .. } if key == INVOICES_KEY));
    }

    #[test]
    fn write_failure_is_reported() {
        let mut storage = MemoryStorage::new();
        storage.fail_writes_to(SETTINGS_KEY);
        let mut store = PersistentStore::new(storage);
        let err = store.save(Changes::settings(&Settings::default())).unwrap_err();
        assert!(matches!(err, InvoiceError::Persist { .. }));
    }
}
