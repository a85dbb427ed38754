//! Import settings

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use uuid::Uuid;

/// Settings applied to every imported element
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportSettings {
    /// Prefix prepended to every element name
    pub name_prefix: String,
    pub version: String,
    pub author: String,
    /// Comma separated keywords added to every element
    pub keywords: String,
    pub symbol_categories: BTreeSet<Uuid>,
    pub package_categories: BTreeSet<Uuid>,
    pub component_categories: BTreeSet<Uuid>,
    pub device_categories: BTreeSet<Uuid>,
    /// Time limit for joining footprint line segments to polygons
    pub joiner_timeout_ms: u64,
    /// Time limit for footprints matching `slow_joiner_patterns`
    pub slow_joiner_timeout_ms: u64,
    /// Footprint keys known to take very long to join
    pub slow_joiner_patterns: Vec<String>,
    /// Polling interval while waiting for the library database
    pub db_poll_interval_ms: u64,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            name_prefix: String::new(),
            version: "0.1".to_string(),
            author: "KiCad Import".to_string(),
            keywords: "kicad,import".to_string(),
            symbol_categories: BTreeSet::new(),
            package_categories: BTreeSet::new(),
            component_categories: BTreeSet::new(),
            device_categories: BTreeSet::new(),
            joiner_timeout_ms: 5000,
            slow_joiner_timeout_ms: 500,
            slow_joiner_patterns: vec!["TerminalBlock_WAGO".to_string()],
            db_poll_interval_ms: 200,
        }
    }
}

impl ImportSettings {
    /// Load settings from a TOML file; missing keys keep their defaults
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        Ok(toml::from_str(&content)?)
    }

    /// Timeout for the tangent path joiner of the given footprint
    pub fn joiner_timeout_ms(&self, footprint_key: &str) -> u64 {
        if self
            .slow_joiner_patterns
            .iter()
            .any(|p| footprint_key.contains(p.as_str()))
        {
            self.slow_joiner_timeout_ms
        } else {
            self.joiner_timeout_ms
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("import.toml");
        std::fs::write(
            &path,
            "name_prefix = \"KC \"\nsymbol_categories = [\"e29f0cb3-ef6d-4203-b854-d75150cbae0b\"]\n",
        )
        .unwrap();

        let settings = ImportSettings::load(&path).unwrap();
        assert_eq!(settings.name_prefix, "KC ");
        assert_eq!(settings.author, "KiCad Import");
        assert_eq!(settings.symbol_categories.len(), 1);
    }

    #[test]
    fn test_joiner_timeout() {
        let settings = ImportSettings::default();
        assert_eq!(
            settings.joiner_timeout_ms("KiCadImport::TerminalBlock_WAGO::X"),
            500
        );
        assert_eq!(settings.joiner_timeout_ms("KiCadImport::Resistors::R"), 5000);
    }

    #[test]
    fn test_load_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("import.toml");
        std::fs::write(&path, "version = [").unwrap();
        assert!(matches!(ImportSettings::load(&path), Err(Error::Toml(_))));
        assert!(matches!(
            ImportSettings::load(&dir.path().join("missing.toml")),
            Err(Error::Io { .. })
        ));
    }
}
