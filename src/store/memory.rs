use std::collections::HashMap;
use std::io;

use crate::error::{InvoiceError, Result};
use crate::store::KeyValueStorage;

/// In-process storage, mainly for tests. Writes to selected keys can be made
/// to fail to exercise error paths.
#[derive(Debug, Default, Clone)]
pub struct MemoryStorage {
    values: HashMap<String, String>,
    /// Writes still allowed per key before `set` starts failing.
    failing: HashMap<String, usize>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Make every later `set` on `key` fail as if storage were full.
    pub fn fail_writes_to(&mut self, key: &str) {
        self.fail_writes_to_after(key, 0);
    }

    /// Let `allowed` more writes to `key` succeed, then fail the rest.
    pub fn fail_writes_to_after(&mut self, key: &str, allowed: usize) {
        self.failing.insert(key.to_string(), allowed);
    }

    pub fn allow_writes(&mut self) {
        self.failing.clear();
    }
}

impl KeyValueStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        if let Some(allowed) = self.failing.get_mut(key) {
            if *allowed == 0 {
                return Err(InvoiceError::Persist {
                    key: key.to_string(),
                    source: io::Error::new(io::ErrorKind::Other, "quota exceeded"),
                });
            }
            *allowed -= 1;
        }
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}
