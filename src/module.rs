//! Modules
//!
//! A module is a loadable unit of type definitions. Hosts describe modules with
//! a JSON schema and hand the raw text to the compiler through a
//! [`ModuleLoader`]; the compiler builds [`TypeDescriptor`]s from it.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

use crate::types::{TypeDescriptor, TypeIdentity, TypeKind, TypeTable};

// ═══════════════════════════════════════════════════════════════════════════════
// SCHEMA TYPES
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleSchema {
    pub module: String,
    #[serde(default)]
    pub types: Vec<TypeSchema>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SchemaKind {
    #[default]
    Class,
    Enum,
    Collection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeSchema {
    pub namespace: String,
    pub name: String,
    #[serde(default)]
    pub kind: SchemaKind,
    /// Base type in the same module, qualified or relative to `namespace`.
    #[serde(default)]
    pub base: Option<String>,
    #[serde(default)]
    pub bindable: bool,
    #[serde(default)]
    pub content_property: Option<String>,
    #[serde(default)]
    pub properties: Vec<PropertySchema>,
    #[serde(default)]
    pub events: Vec<EventSchema>,
    #[serde(default)]
    pub attached_properties: Vec<RegisteredPropertySchema>,
    #[serde(default)]
    pub routed_events: Vec<RegisteredEventSchema>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertySchema {
    pub name: String,
    #[serde(rename = "type")]
    pub value_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventSchema {
    pub name: String,
    #[serde(default)]
    pub handler_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisteredPropertySchema {
    pub name: String,
    pub field: String,
    #[serde(rename = "type")]
    pub value_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisteredEventSchema {
    pub name: String,
    pub field: String,
}

// ═══════════════════════════════════════════════════════════════════════════════
// LOADER CAPABILITY
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("no schema registered for module '{name}'")]
    UnknownModule { name: String },

    #[error("failed to read schema '{}'", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid schema in '{origin}'")]
    Schema {
        origin: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("schema '{origin}' declares module '{declared}', expected '{expected}'")]
    NameMismatch {
        origin: String,
        declared: String,
        expected: String,
    },
}

/// Raw module text plus where it came from (for diagnostics).
#[derive(Debug, Clone)]
pub struct ModuleSource {
    pub origin: String,
    pub text: String,
}

/// Locates a module by name. Implementations decide how names map to storage.
pub trait ModuleLoader: Send + Sync {
    fn load(&self, name: &str) -> Result<ModuleSource, LoadError>;
}

/// Loader over schema text held in memory.
#[derive(Debug, Default, Clone)]
pub struct InMemoryLoader {
    modules: HashMap<String, String>,
}

impl InMemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_module(mut self, name: impl Into<String>, schema_json: impl Into<String>) -> Self {
        self.insert(name, schema_json);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, schema_json: impl Into<String>) {
        self.modules.insert(name.into(), schema_json.into());
    }
}

impl ModuleLoader for InMemoryLoader {
    fn load(&self, name: &str) -> Result<ModuleSource, LoadError> {
        self.modules
            .get(name)
            .map(|text| ModuleSource {
                origin: format!("memory:{}", name),
                text: text.clone(),
            })
            .ok_or_else(|| LoadError::UnknownModule {
                name: name.to_string(),
            })
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// LOADED MODULE
// ═══════════════════════════════════════════════════════════════════════════════

pub type ModuleHandle = Arc<Module>;

#[derive(Debug)]
pub struct Module {
    name: String,
    fingerprint: String,
    /// Declaration order is kept: wildcard lookups return the first match.
    types: Vec<Arc<TypeDescriptor>>,
    by_identity: HashMap<TypeIdentity, usize>,
}

impl Module {
    pub fn from_source(expected_name: &str, source: &ModuleSource) -> Result<Self, LoadError> {
        let schema: ModuleSchema =
            serde_json::from_str(&source.text).map_err(|e| LoadError::Schema {
                origin: source.origin.clone(),
                source: e,
            })?;

        if schema.module != expected_name {
            return Err(LoadError::NameMismatch {
                origin: source.origin.clone(),
                declared: schema.module,
                expected: expected_name.to_string(),
            });
        }

        Ok(Self::from_schema(schema, compute_fingerprint(&source.text)))
    }

    pub fn from_schema(schema: ModuleSchema, fingerprint: String) -> Self {
        let schemas: Vec<Arc<TypeSchema>> = schema.types.into_iter().map(Arc::new).collect();

        let mut table = TypeTable::default();
        let mut by_qualified = HashMap::new();
        for (idx, ty) in schemas.iter().enumerate() {
            let identity = TypeIdentity::new(&ty.namespace, &ty.name);
            let kind = match ty.kind {
                SchemaKind::Class => TypeKind::Class,
                SchemaKind::Enum => TypeKind::Enum,
                SchemaKind::Collection => TypeKind::Collection,
            };
            table.insert(&identity, kind);
            by_qualified.insert(identity.qualified(), idx);
        }
        let table = Arc::new(table);

        let mut types = Vec::with_capacity(schemas.len());
        let mut by_identity = HashMap::new();
        for (idx, ty) in schemas.iter().enumerate() {
            let lineage = collect_lineage(idx, &schemas, &by_qualified);
            by_identity
                .entry(TypeIdentity::new(&ty.namespace, &ty.name))
                .or_insert(idx);
            types.push(Arc::new(TypeDescriptor::new(lineage, table.clone())));
        }

        Self {
            name: schema.module,
            fingerprint,
            types,
            by_identity,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// SHA-256 of the schema text this module was built from.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn types(&self) -> &[Arc<TypeDescriptor>] {
        &self.types
    }

    pub fn find(&self, namespace: &str, name: &str) -> Option<Arc<TypeDescriptor>> {
        self.by_identity
            .get(&TypeIdentity::new(namespace, name))
            .map(|&idx| self.types[idx].clone())
    }

    /// All types with local name `name`, in declaration order.
    pub fn find_by_name(&self, name: &str) -> Vec<Arc<TypeDescriptor>> {
        self.types
            .iter()
            .filter(|ty| ty.name() == name)
            .cloned()
            .collect()
    }
}

pub fn compute_fingerprint(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// The type at `idx` followed by its base chain. Bases outside the module end
/// the chain; a cycle ends it at the first repeated type.
fn collect_lineage(
    idx: usize,
    schemas: &[Arc<TypeSchema>],
    by_qualified: &HashMap<String, usize>,
) -> Vec<Arc<TypeSchema>> {
    let mut lineage = Vec::new();
    let mut seen = HashSet::new();
    let mut next = Some(idx);

    while let Some(current) = next {
        if !seen.insert(current) {
            tracing::warn!(
                type_name = %schemas[idx].name,
                "cyclic base type chain, truncating"
            );
            break;
        }
        let schema = &schemas[current];
        lineage.push(schema.clone());

        next = schema.base.as_deref().and_then(|base| {
            by_qualified.get(base).copied().or_else(|| {
                by_qualified
                    .get(&format!("{}.{}", schema.namespace, base))
                    .copied()
            })
        });
    }

    lineage
}
