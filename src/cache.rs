use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use crate::adapter::ModuleCache;
use crate::compile::CompileOutput;
use crate::options::{CompileOptions, ObjectModel};

#[derive(Serialize, Deserialize)]
pub struct CacheEntry {
    pub hash: String,
    pub modules: BTreeMap<String, String>,
    pub output: CompileOutput,
}

/// Compile outputs persisted between runs. An entry is reused only when the
/// markup, class, namespace and object model are unchanged and every module it was compiled
/// against still has the same fingerprint.
pub struct IncrementalCache {
    cache_dir: PathBuf,
}

impl Default for IncrementalCache {
    fn default() -> Self {
        Self::new(".markupgen/cache")
    }
}

impl IncrementalCache {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        let cache_dir = cache_dir.into();
        if !cache_dir.exists() {
            fs::create_dir_all(&cache_dir).ok();
        }
        Self { cache_dir }
    }

    pub fn compute_hash(source: &str, options: &CompileOptions, model: &ObjectModel) -> String {
        let mut hasher = Sha256::new();
        hasher.update(source.as_bytes());
        hasher.update([0]);
        hasher.update(options.class_name.as_bytes());
        hasher.update([0]);
        hasher.update(options.namespace.as_bytes());
        hasher.update([0]);
        hasher.update(serde_json::to_string(model).unwrap_or_default().as_bytes());
        format!("{:x}", hasher.finalize())
    }

    fn get_cache_path(&self, file_path: &str) -> PathBuf {
        let safe_name = file_path.replace(['/', '\\', ':'], "_");
        self.cache_dir.join(format!("{}.json", safe_name))
    }

    pub fn get(
        &self,
        file_path: &str,
        source: &str,
        options: &CompileOptions,
        model: &ObjectModel,
        modules: &ModuleCache,
    ) -> Option<CompileOutput> {
        let cache_path = self.get_cache_path(file_path);
        let data = fs::read_to_string(&cache_path).ok()?;

        let entry: CacheEntry = match serde_json::from_str(&data) {
            Ok(e) => e,
            Err(e) => {
                tracing::warn!(file = file_path, error = %e, "discarding corrupt cache entry");
                fs::remove_file(cache_path).ok();
                return None;
            }
        };

        if entry.hash != Self::compute_hash(source, options, model) {
            return None;
        }

        for (name, fingerprint) in &entry.modules {
            match modules.load(name) {
                Ok(module) if module.fingerprint() == fingerprint => {}
                _ => {
                    tracing::debug!(file = file_path, module = %name, "module changed, cache stale");
                    return None;
                }
            }
        }

        tracing::debug!(file = file_path, "cache hit");
        Some(entry.output)
    }

    pub fn set(
        &self,
        file_path: &str,
        source: &str,
        options: &CompileOptions,
        model: &ObjectModel,
        output: &CompileOutput,
    ) {
        let entry = CacheEntry {
            hash: Self::compute_hash(source, options, model),
            modules: output.module_fingerprints.clone(),
            output: output.clone(),
        };

        if let Ok(data) = serde_json::to_string(&entry) {
            fs::write(self.get_cache_path(file_path), data).ok();
        }
    }
}
