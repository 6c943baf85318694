use crate::reconcile::AllowList;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub store: StoreConfig,
    pub collections: CollectionNames,
    pub categories: CategoryConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("catalog.db"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CollectionNames {
    pub inventory: String,
    pub products: String,
    pub categories: String,
    pub admins: String,
}

impl Default for CollectionNames {
    fn default() -> Self {
        Self {
            inventory: "inventory".to_string(),
            products: "products".to_string(),
            categories: "categories".to_string(),
            admins: "admins".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CategoryConfig {
    pub allowed: Vec<String>,
}

impl CatalogConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::parse(&raw).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn parse(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    pub fn allow_list(&self) -> AllowList {
        AllowList::new(self.categories.allowed.iter().map(|id| id.trim()))
    }
}
