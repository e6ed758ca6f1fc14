//! JSON-backed asset catalog
//!
//! Reads `{"monsters": {...}, "objects": {...}, "levels": {...}}` where each
//! table maps a numeric id (as a string key) to a display name. Without a
//! file the catalog stays empty and every lookup misses.

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{PoisonError, RwLock};

use shared::{process_debug, ProcessId};

use crate::error::{MapError, MapResult};
use crate::traits::AssetCatalog;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogTables {
    #[serde(default)]
    pub monsters: HashMap<u32, String>,
    #[serde(default)]
    pub objects: HashMap<u32, String>,
    #[serde(default)]
    pub levels: HashMap<u32, String>,
}

#[derive(Debug, Default)]
pub struct RealAssetCatalog {
    source: Option<PathBuf>,
    tables: RwLock<CatalogTables>,
}

impl RealAssetCatalog {
    pub fn new(source: Option<PathBuf>) -> Self {
        Self {
            source,
            tables: RwLock::new(CatalogTables::default()),
        }
    }

    /// Catalog with fixed tables and no file behind it
    pub fn from_tables(tables: CatalogTables) -> Self {
        Self {
            source: None,
            tables: RwLock::new(tables),
        }
    }

    fn lookup(&self, pick: impl FnOnce(&CatalogTables) -> Option<&String>) -> Option<String> {
        let tables = self.tables.read().unwrap_or_else(PoisonError::into_inner);
        pick(&tables).cloned()
    }
}

#[async_trait]
impl AssetCatalog for RealAssetCatalog {
    async fn load(&self) -> MapResult<()> {
        let Some(path) = &self.source else {
            return Ok(());
        };

        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| MapError::catalog(format!("reading {}: {e}", path.display())))?;
        let tables: CatalogTables =
            serde_json::from_str(&raw).map_err(|e| MapError::catalog(format!("parsing {}: {e}", path.display())))?;

        process_debug!(
            ProcessId::Service,
            "📚 Loaded asset catalog: {} monsters, {} objects, {} levels",
            tables.monsters.len(),
            tables.objects.len(),
            tables.levels.len()
        );

        *self.tables.write().unwrap_or_else(PoisonError::into_inner) = tables;
        Ok(())
    }

    fn monster_name(&self, id: u32) -> Option<String> {
        self.lookup(|tables| tables.monsters.get(&id))
    }

    fn object_name(&self, id: u32) -> Option<String> {
        self.lookup(|tables| tables.objects.get(&id))
    }

    fn level_name(&self, id: u32) -> Option<String> {
        self.lookup(|tables| tables.levels.get(&id))
    }
}
