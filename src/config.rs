use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{InvoiceError, Result};

pub const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Deserialize, Serialize, Default)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageSettings,
    #[serde(default)]
    pub pdf: PdfSettings,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct StorageSettings {
    /// Where settings, clients and invoices are kept.
    pub data_dir: String,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            data_dir: "data".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct PdfSettings {
    pub output_dir: String,
}

impl Default for PdfSettings {
    fn default() -> Self {
        Self {
            output_dir: "output".to_string(),
        }
    }
}

impl Config {
    pub fn data_dir(&self, config_dir: &Path) -> PathBuf {
        resolve_dir(&self.storage.data_dir, config_dir)
    }

    pub fn output_dir(&self, config_dir: &Path) -> PathBuf {
        resolve_dir(&self.pdf.output_dir, config_dir)
    }
}

/// Get the config directory path (XDG-style, falling back to ~/.invoicer/)
pub fn config_dir() -> Result<PathBuf> {
    if let Some(proj_dirs) = ProjectDirs::from("", "", "invoicer") {
        return Ok(proj_dirs.config_dir().to_path_buf());
    }

    let home = dirs_home().ok_or_else(|| {
        InvoiceError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "Could not determine home directory",
        ))
    })?;

    Ok(home.join(".invoicer"))
}

fn dirs_home() -> Option<PathBuf> {
    std::env::var_os("HOME").map(PathBuf::from)
}

/// Expand ~ in paths
pub fn expand_path(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs_home() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

/// Expand `~` and anchor relative paths at the config directory.
pub fn resolve_dir(path: &str, config_dir: &Path) -> PathBuf {
    let expanded = expand_path(path);
    if expanded.is_absolute() {
        expanded
    } else {
        config_dir.join(expanded)
    }
}

/// Load config.toml; a missing file means defaults.
pub fn load_config(config_dir: &Path) -> Result<Config> {
    let path = config_dir.join(CONFIG_FILE);
    if !path.exists() {
        return Ok(Config::default());
    }
    let content = fs::read_to_string(&path)?;
    toml::from_str(&content).map_err(|e| InvoiceError::ConfigParse { path, source: e })
}

/// Template content for config.toml
pub const CONFIG_TEMPLATE: &str = r#"# Relative paths are resolved against this directory.

[storage]
data_dir = "data"       # appSettings.json, clients.json, invoices.json

[pdf]
output_dir = "output"   # generated <invoice number>.pdf files
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = load_config(temp_dir.path()).unwrap();
        assert_eq!(config.data_dir(temp_dir.path()), temp_dir.path().join("data"));
        assert_eq!(config.output_dir(temp_dir.path()), temp_dir.path().join("output"));
    }

    #[test]
    fn template_parses() {
        let config: Config = toml::from_str(CONFIG_TEMPLATE).unwrap();
        assert_eq!(config.storage.data_dir, "data");
        assert_eq!(config.pdf.output_dir, "output");
    }

    #[test]
    fn absolute_paths_are_kept() {
        let temp_dir = TempDir::new().unwrap();
        let elsewhere = temp_dir.path().join("elsewhere");
        let content = format!("[storage]\ndata_dir = {:?}\n", elsewhere.display().to_string());
        fs::write(temp_dir.path().join(CONFIG_FILE), content).unwrap();

        let config = load_config(temp_dir.path()).unwrap();
        assert_eq!(config.data_dir(Path::new("/ignored")), elsewhere);
        assert_eq!(config.pdf.output_dir, "output");
    }

    #[test]
    fn bad_toml_is_reported_with_path() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join(CONFIG_FILE), "[storage\n").unwrap();
        let err = load_config(temp_dir.path()).unwrap_err();
        assert!(matches!(err, InvoiceError::ConfigParse { .. }));
    }
}
