use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};


#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("product names must not be empty")]
    EmptyProductName,

    #[error("product {0} is listed twice")]
    DuplicateProduct(String),
}

/// Fleet configuration, read from TOML:
///
/// ```toml
/// [catalog]
/// products = ["Diesel", "Petrol 95", "AdBlue"]
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FleetConfig {
    #[serde(default)]
    pub catalog: CatalogSettings,
}

/// Products compartments may carry. An empty catalog accepts any name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogSettings {
    #[serde(default)]
    pub products: Vec<String>,
}

impl FleetConfig {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        contents.parse()
    }

    /// Every known product, for the "all products" selection.
    pub fn all_products(&self) -> BTreeSet<String> {
        self.catalog.products.iter().cloned().collect()
    }

    pub fn is_known_product(&self, product: &str) -> bool {
        self.catalog.products.is_empty() || self.catalog.products.iter().any(|p| p == product)
    }

    fn check(&self) -> Result<(), ConfigError> {
        let mut seen = BTreeSet::new();
        for product in &self.catalog.products {
            if product.trim().is_empty() {
                return Err(ConfigError::EmptyProductName);
            }
            if !seen.insert(product.as_str()) {
                return Err(ConfigError::DuplicateProduct(product.clone()));
            }
        }
        Ok(())
    }
}

impl FromStr for FleetConfig {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let config: FleetConfig = toml::from_str(s)?;
        config.check()?;
        Ok(config)
    }
}
