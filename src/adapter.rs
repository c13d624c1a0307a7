//! Type System Adapter
//!
//! Answers type questions for the walker: which type a `prefix:Name` tag
//! denotes and, through the returned [`TypeDescriptor`], its members and
//! content property. Modules are loaded through the process-wide
//! [`ModuleCache`].

use lazy_static::lazy_static;
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::discovery::SchemaLoader;
use crate::error::CompileError;
use crate::module::{LoadError, Module, ModuleHandle, ModuleLoader};
use crate::namespace::NamespaceRegistry;
use crate::types::TypeDescriptor;

lazy_static! {
    static ref GLOBAL_MODULE_CACHE: Arc<ModuleCache> =
        Arc::new(ModuleCache::new(SchemaLoader::global()));
}

/// Loaded modules keyed by name. Append-only: entries are never evicted.
///
/// Each name owns a `OnceCell`; the map lock is only held to fetch the cell,
/// so loads of different modules run in parallel while concurrent loads of
/// the same module wait for the first one. A failed load leaves the cell
/// empty and the next request tries again.
pub struct ModuleCache {
    loader: Arc<dyn ModuleLoader>,
    entries: Mutex<HashMap<String, Arc<OnceCell<ModuleHandle>>>>,
}

impl ModuleCache {
    pub fn new(loader: Arc<dyn ModuleLoader>) -> Self {
        Self {
            loader,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Process-wide cache backed by [`SchemaLoader::global`].
    pub fn global() -> Arc<ModuleCache> {
        GLOBAL_MODULE_CACHE.clone()
    }

    pub fn load(&self, name: &str) -> Result<ModuleHandle, LoadError> {
        let cell = self
            .entries
            .lock()
            .entry(name.to_string())
            .or_default()
            .clone();

        cell.get_or_try_init(|| {
            let source = self.loader.load(name)?;
            let module = Module::from_source(name, &source)?;
            info!(
                module = name,
                origin = %source.origin,
                types = module.types().len(),
                "loaded module"
            );
            Ok::<_, LoadError>(Arc::new(module))
        })
        .cloned()
    }

    /// The module if it has already been loaded.
    pub fn get_loaded(&self, name: &str) -> Option<ModuleHandle> {
        self.entries
            .lock()
            .get(name)
            .and_then(|cell| cell.get().cloned())
    }

    pub fn is_loaded(&self, name: &str) -> bool {
        self.get_loaded(name).is_some()
    }

    pub fn loaded_count(&self) -> usize {
        self.entries
            .lock()
            .values()
            .filter(|cell| cell.get().is_some())
            .count()
    }
}

#[derive(Clone)]
pub struct TypeSystemAdapter {
    cache: Arc<ModuleCache>,
}

impl TypeSystemAdapter {
    pub fn new(cache: Arc<ModuleCache>) -> Self {
        Self { cache }
    }

    pub fn cache(&self) -> &Arc<ModuleCache> {
        &self.cache
    }

    pub fn load_module(&self, name: &str) -> Result<ModuleHandle, CompileError> {
        self.cache
            .load(name)
            .map_err(|source| CompileError::ModuleLoadFailure {
                module: name.to_string(),
                source,
            })
    }

    /// Resolve `prefix:local_name`. An unregistered prefix or a missing type
    /// is `Ok(None)`; only a module that cannot be loaded is an error.
    pub fn resolve_type(
        &self,
        registry: &NamespaceRegistry,
        prefix: &str,
        local_name: &str,
    ) -> Result<Option<Arc<TypeDescriptor>>, CompileError> {
        let Some(binding) = registry.resolve(prefix) else {
            debug!(prefix, name = local_name, "unregistered namespace prefix");
            return Ok(None);
        };

        let module = self.load_module(&binding.module_name)?;

        if !binding.is_wildcard() {
            return Ok(module.find(&binding.logical_namespace, local_name));
        }

        let mut matches = module.find_by_name(local_name);
        if matches.len() > 1 {
            let candidates: Vec<String> =
                matches.iter().map(|ty| ty.identity().qualified()).collect();
            warn!(
                module = module.name(),
                name = local_name,
                candidates = %candidates.join(", "),
                "ambiguous type name, using the first declared"
            );
        }
        Ok(if matches.is_empty() {
            None
        } else {
            Some(matches.swap_remove(0))
        })
    }
}
