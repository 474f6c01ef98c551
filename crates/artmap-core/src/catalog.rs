//! Catalog of stored expression maps.
//!
//! A catalog is a flat, deterministically ordered list of map files. The
//! matcher works on a [`Catalog`] snapshot; [`CatalogHandle`] lets a
//! long-running listener swap in a fresh listing without disturbing a
//! query that is still using the old one.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, RwLock};
use walkdir::WalkDir;

/// One stored map, as the matcher sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRecord {
    /// File name without extension.
    pub display_name: String,
    /// `/`-separated path relative to the catalog root.
    pub storage_path: String,
    /// Relative parent directory, empty at the root.
    pub folder_path: String,
}

impl ResourceRecord {
    /// Folder label for grouped listings.
    pub fn folder_label(&self) -> &str {
        if self.folder_path.is_empty() {
            "Root"
        } else {
            &self.folder_path
        }
    }
}

/// Catalog settings (`[catalog]` in the config file).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogSettings {
    /// Directory holding the map library.
    pub root: Option<PathBuf>,
    /// File extension of stored maps, without the dot.
    pub extension: String,
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            root: None,
            extension: "expressionmap".to_string(),
        }
    }
}

/// Where catalog entries come from.
pub trait CatalogSource {
    /// Every available record in a stable order.
    fn list(&self) -> Result<Vec<ResourceRecord>>;

    /// Raw content of one record.
    fn read(&self, storage_path: &str) -> Result<Vec<u8>>;
}

/// Map files found recursively below a directory.
#[derive(Debug, Clone)]
pub struct DirectoryCatalog {
    root: PathBuf,
    extension: String,
}

impl DirectoryCatalog {
    pub fn new(root: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            extension: extension.into(),
        }
    }

    pub fn from_settings(root: impl Into<PathBuf>, settings: &CatalogSettings) -> Self {
        Self::new(root, settings.extension.clone())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn has_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case(&self.extension))
    }

    fn record_for(&self, path: &Path) -> Option<ResourceRecord> {
        let relative = path.strip_prefix(&self.root).ok()?;
        let display_name = path.file_stem()?.to_str()?.to_string();
        let storage_path = join_components(relative)?;
        let folder_path = match relative.parent() {
            Some(parent) => join_components(parent)?,
            None => String::new(),
        };
        Some(ResourceRecord {
            display_name,
            storage_path,
            folder_path,
        })
    }
}

fn join_components(path: &Path) -> Option<String> {
    let parts: Option<Vec<&str>> = path.components().map(|c| c.as_os_str().to_str()).collect();
    Some(parts?.join("/"))
}

impl CatalogSource for DirectoryCatalog {
    fn list(&self) -> Result<Vec<ResourceRecord>> {
        if !self.root.is_dir() {
            return Err(Error::storage(
                &self.root,
                std::io::Error::new(std::io::ErrorKind::NotFound, "catalog root is not a directory"),
            ));
        }

        let mut records = Vec::new();
        for entry in WalkDir::new(&self.root) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    log::warn!("Skipping unreadable catalog entry: {}", e);
                    continue;
                }
            };
            if !entry.file_type().is_file() || !self.has_extension(entry.path()) {
                continue;
            }
            match self.record_for(entry.path()) {
                Some(record) => records.push(record),
                None => log::warn!("Skipping non UTF-8 catalog path {:?}", entry.path()),
            }
        }

        records.sort_by(|a, b| a.storage_path.cmp(&b.storage_path));
        log::info!("Catalog {:?}: {} maps", self.root, records.len());
        Ok(records)
    }

    fn read(&self, storage_path: &str) -> Result<Vec<u8>> {
        let relative = Path::new(storage_path);
        let escapes = relative.components().any(|c| {
            matches!(c, Component::ParentDir | Component::RootDir | Component::Prefix(_))
        });
        if storage_path.is_empty() || escapes {
            return Err(Error::InvalidPath(storage_path.to_string()));
        }

        let path = self.root.join(relative);
        fs::read(&path).map_err(|e| Error::storage(&path, e))
    }
}

/// An immutable listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    records: Vec<ResourceRecord>,
}

impl Catalog {
    pub fn new(records: Vec<ResourceRecord>) -> Self {
        Self { records }
    }

    pub fn load(source: &dyn CatalogSource) -> Result<Self> {
        Ok(Self::new(source.list()?))
    }

    pub fn records(&self) -> &[ResourceRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records grouped by folder label, folders in sorted order.
    pub fn grouped(&self) -> BTreeMap<String, Vec<ResourceRecord>> {
        let mut groups: BTreeMap<String, Vec<ResourceRecord>> = BTreeMap::new();
        for record in &self.records {
            groups
                .entry(record.folder_label().to_string())
                .or_default()
                .push(record.clone());
        }
        groups
    }
}

/// Shared, refreshable catalog.
///
/// Readers take an `Arc<Catalog>` and keep it for a whole query; a refresh
/// builds the new listing first and only then swaps the pointer.
#[derive(Debug, Clone, Default)]
pub struct CatalogHandle {
    current: Arc<RwLock<Arc<Catalog>>>,
}

impl CatalogHandle {
    pub fn new(catalog: Catalog) -> Self {
        Self {
            current: Arc::new(RwLock::new(Arc::new(catalog))),
        }
    }

    pub fn snapshot(&self) -> Arc<Catalog> {
        let guard = self.current.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&guard)
    }

    /// Reload from `source`. On failure the previous listing stays in place.
    pub fn refresh(&self, source: &dyn CatalogSource) -> Result<usize> {
        let fresh = Arc::new(Catalog::load(source)?);
        let count = fresh.len();
        let mut guard = self.current.write().unwrap_or_else(|e| e.into_inner());
        *guard = fresh;
        Ok(count)
    }
}
