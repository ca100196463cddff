//! Universe file — sector-organized symbol lists.
//!
//! ```toml
//! [sectors]
//! Technology = ["AAPL", "MSFT"]
//! Energy = ["XOM", "CVX"]
//! ```

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use crate::config::ConfigFileError;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Universe {
    pub sectors: BTreeMap<String, Vec<String>>,
}

impl Universe {
    pub fn from_file(path: &Path) -> Result<Self, ConfigFileError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigFileError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigFileError> {
        Ok(toml::from_str(content)?)
    }

    pub fn sector_names(&self) -> Vec<&str> {
        self.sectors.keys().map(|s| s.as_str()).collect()
    }

    pub fn ticker_count(&self) -> usize {
        self.sectors.values().map(|v| v.len()).sum()
    }

    /// Normalized (trimmed, uppercase) symbols of the named sectors, or of
    /// every sector when `sectors` is empty.
    pub fn symbols(&self, sectors: &[String]) -> Result<BTreeSet<String>, ConfigFileError> {
        let mut selected = BTreeSet::new();
        let mut add = |tickers: &[String]| {
            selected.extend(
                tickers
                    .iter()
                    .map(|t| t.trim().to_ascii_uppercase())
                    .filter(|t| !t.is_empty()),
            );
        };

        if sectors.is_empty() {
            self.sectors.values().for_each(|t| add(t));
        } else {
            for name in sectors {
                let tickers = self.sectors.get(name).ok_or_else(|| ConfigFileError::Invalid {
                    section: "universe",
                    reason: format!(
                        "unknown sector '{name}' (available: {})",
                        self.sector_names().join(", ")
                    ),
                })?;
                add(tickers);
            }
        }
        Ok(selected)
    }
}
