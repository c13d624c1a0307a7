//! Namespace Registry
//!
//! Maps markup prefixes (`xmlns:ui="..."`) to the logical namespace and module
//! that types under that prefix are looked up in. The registry is owned by one
//! compiler and cleared at the start of every compile.

use std::collections::HashMap;

use crate::error::CompileError;

/// Namespace value that matches any type in the bound module by local name.
pub const WILDCARD_NAMESPACE: &str = "*";

pub const MODULE_NAMESPACE_SCHEME: &str = "module-namespace:";
pub const MODULE_SEGMENT: &str = "module=";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceBinding {
    pub prefix: String,
    pub logical_namespace: String,
    pub module_name: String,
}

impl NamespaceBinding {
    pub fn is_wildcard(&self) -> bool {
        self.logical_namespace == WILDCARD_NAMESPACE
    }
}

#[derive(Debug, Clone)]
pub struct NamespaceRegistry {
    bindings: HashMap<String, NamespaceBinding>,
    default_uri: String,
    default_module: String,
}

impl NamespaceRegistry {
    /// `default_uri` is the one non-`module-namespace:` URI accepted; it binds
    /// `default_module` with wildcard type matching.
    pub fn new(default_uri: impl Into<String>, default_module: impl Into<String>) -> Self {
        Self {
            bindings: HashMap::new(),
            default_uri: default_uri.into(),
            default_module: default_module.into(),
        }
    }

    /// Register `prefix` for `uri`. The first registration of a prefix wins;
    /// later calls for the same prefix are no-ops and their URI is not inspected.
    pub fn register(&mut self, prefix: &str, uri: &str) -> Result<(), CompileError> {
        if self.is_registered(prefix) {
            tracing::debug!(prefix, "namespace prefix already registered, skipping");
            return Ok(());
        }

        let (logical_namespace, module_name) =
            parse_namespace_uri(uri, &self.default_uri, &self.default_module)?;

        tracing::info!(
            prefix,
            namespace = %logical_namespace,
            module = %module_name,
            "registering namespace"
        );
        self.bindings.insert(
            prefix.to_string(),
            NamespaceBinding {
                prefix: prefix.to_string(),
                logical_namespace,
                module_name,
            },
        );
        Ok(())
    }

    pub fn resolve(&self, prefix: &str) -> Option<&NamespaceBinding> {
        self.bindings.get(prefix)
    }

    pub fn is_registered(&self, prefix: &str) -> bool {
        self.bindings.contains_key(prefix)
    }

    pub fn clear(&mut self) {
        self.bindings.clear();
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Bindings sorted by prefix.
    pub fn bindings(&self) -> Vec<&NamespaceBinding> {
        let mut bindings: Vec<_> = self.bindings.values().collect();
        bindings.sort_by(|a, b| a.prefix.cmp(&b.prefix));
        bindings
    }
}

/// Parse an xmlns URI into `(logical namespace, module name)`.
///
/// Accepted forms are `module-namespace:<ns>;module=<name>` and the configured
/// default URI.
pub fn parse_namespace_uri(
    uri: &str,
    default_uri: &str,
    default_module: &str,
) -> Result<(String, String), CompileError> {
    if let Some(rest) = uri.strip_prefix(MODULE_NAMESPACE_SCHEME) {
        let mut segments = rest.split(';');
        let logical_namespace = segments.next().unwrap_or_default().trim().to_string();

        let module_name = segments
            .filter_map(|segment| segment.trim().strip_prefix(MODULE_SEGMENT))
            .map(str::trim)
            .find(|name| !name.is_empty());

        return match module_name {
            Some(module_name) => Ok((logical_namespace, module_name.to_string())),
            None => Err(CompileError::MissingModuleName {
                uri: uri.to_string(),
            }),
        };
    }

    if uri == default_uri {
        return Ok((WILDCARD_NAMESPACE.to_string(), default_module.to_string()));
    }

    Err(CompileError::UnsupportedNamespaceUri {
        uri: uri.to_string(),
    })
}
