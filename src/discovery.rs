//! Schema Discovery
//!
//! File-backed [`ModuleLoader`]. Module names map to schema files registered
//! out of band: individual paths, reference lists (one path per line), or
//! directories scanned for `*.schema.json` files.

use lazy_static::lazy_static;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use walkdir::WalkDir;

use crate::module::{LoadError, ModuleLoader, ModuleSource};

pub const SCHEMA_EXTENSION: &str = "json";
pub const SCHEMA_SUFFIX: &str = ".schema";

lazy_static! {
    static ref GLOBAL_SCHEMA_LOADER: Arc<SchemaLoader> = Arc::new(SchemaLoader::new());
}

#[derive(Debug, Default)]
pub struct SchemaLoader {
    paths: RwLock<HashMap<String, PathBuf>>,
}

impl SchemaLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide loader shared by the CLI host and [`crate::ModuleCache::global`].
    pub fn global() -> Arc<SchemaLoader> {
        GLOBAL_SCHEMA_LOADER.clone()
    }

    /// Register a schema file under its module name (the file stem without a
    /// trailing `.schema`). A later registration of the same name replaces the
    /// earlier path.
    pub fn register_path(&self, path: impl AsRef<Path>) -> Option<String> {
        let path = path.as_ref();
        let name = module_name_for(path)?;
        tracing::debug!(module = %name, path = %path.display(), "registering schema path");
        self.paths.write().insert(name.clone(), path.to_path_buf());
        Some(name)
    }

    /// Register every non-empty line of `list_file` as a schema path.
    pub fn register_reference_file(&self, list_file: impl AsRef<Path>) -> Result<usize, LoadError> {
        let list_file = list_file.as_ref();
        let contents = fs::read_to_string(list_file).map_err(|e| LoadError::Io {
            path: list_file.to_path_buf(),
            source: e,
        })?;

        let mut count = 0;
        for line in contents.lines().map(str::trim).filter(|l| !l.is_empty()) {
            if self.register_path(line).is_some() {
                count += 1;
            }
        }
        Ok(count)
    }

    /// Recursively register every `*.schema.json` under `dir`.
    pub fn discover(&self, dir: impl AsRef<Path>) -> usize {
        let dir = dir.as_ref();
        if !dir.exists() {
            tracing::warn!(dir = %dir.display(), "schema directory does not exist");
            return 0;
        }

        let mut count = 0;
        for entry in WalkDir::new(dir).follow_links(true).into_iter().flatten() {
            let path = entry.path();
            if path.is_file() && is_schema_file(path) && self.register_path(path).is_some() {
                count += 1;
            }
        }

        tracing::info!(dir = %dir.display(), count, "discovered schema files");
        count
    }

    pub fn path_for(&self, name: &str) -> Option<PathBuf> {
        self.paths.read().get(name).cloned()
    }

    pub fn registered_modules(&self) -> Vec<String> {
        let mut names: Vec<_> = self.paths.read().keys().cloned().collect();
        names.sort();
        names
    }
}

impl ModuleLoader for SchemaLoader {
    fn load(&self, name: &str) -> Result<ModuleSource, LoadError> {
        let path = self.path_for(name).ok_or_else(|| LoadError::UnknownModule {
            name: name.to_string(),
        })?;

        tracing::info!(module = name, path = %path.display(), "loading schema");
        let text = fs::read_to_string(&path).map_err(|e| LoadError::Io {
            path: path.clone(),
            source: e,
        })?;

        Ok(ModuleSource {
            origin: path.display().to_string(),
            text,
        })
    }
}

fn is_schema_file(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == SCHEMA_EXTENSION)
        && path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .is_some_and(|stem| stem.ends_with(SCHEMA_SUFFIX))
}

fn module_name_for(path: &Path) -> Option<String> {
    let stem = path.file_stem()?.to_str()?;
    let name = stem.strip_suffix(SCHEMA_SUFFIX).unwrap_or(stem);
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}
