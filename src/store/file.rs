use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::{InvoiceError, Result};
use crate::store::KeyValueStorage;

/// Stores each key as `<dir>/<key>.json`.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl KeyValueStorage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(InvoiceError::Io(e)),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let persist = |source| InvoiceError::Persist {
            key: key.to_string(),
            source,
        };

        fs::create_dir_all(&self.dir).map_err(persist)?;

        // Write beside the target and rename so a failed write never leaves
        // a truncated document behind.
        let path = self.path_for(key);
        let tmp = self.dir.join(format!(".{key}.json.tmp"));
        fs::write(&tmp, value).map_err(persist)?;
        fs::rename(&tmp, &path).map_err(persist)?;
        Ok(())
    }
}
