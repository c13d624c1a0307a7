//! Driver
//!
//! Orchestrates one compile: reset the namespace registry, pre-scan the
//! document, resolve the root and named-element types, then walk the tree
//! inside the class and method scopes. Any error aborts the compile and no
//! text is returned.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{error, info};

use crate::adapter::{ModuleCache, TypeSystemAdapter};
use crate::convert::ConverterRegistry;
use crate::error::{CompileError, CompilerError};
use crate::namespace::NamespaceRegistry;
use crate::options::{CompileOptions, ObjectModel};
use crate::parse::{self, NamedElement};
use crate::types::TypeDescriptor;
use crate::walker::TreeWalker;
use crate::writer::{CodeWriter, TypeNamer};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CompileOutput {
    pub code: String,
    pub class_name: String,
    pub namespace: String,
    /// Fully qualified.
    pub root_type: String,
    pub named_elements: Vec<NamedElement>,
    /// Module name to schema fingerprint, for every module the document binds.
    pub module_fingerprints: BTreeMap<String, String>,
}

pub struct MarkupCompiler {
    adapter: TypeSystemAdapter,
    converters: Arc<ConverterRegistry>,
    namespaces: NamespaceRegistry,
    namer: TypeNamer,
    model: ObjectModel,
}

impl MarkupCompiler {
    pub fn new(cache: Arc<ModuleCache>, model: ObjectModel) -> Self {
        let converters = Arc::new(ConverterRegistry::with_defaults(&model));
        Self::with_converters(cache, model, converters)
    }

    /// Share one converter registry between compilers.
    pub fn with_converters(
        cache: Arc<ModuleCache>,
        model: ObjectModel,
        converters: Arc<ConverterRegistry>,
    ) -> Self {
        Self {
            adapter: TypeSystemAdapter::new(cache),
            converters,
            namespaces: NamespaceRegistry::new(&model.default_uri, &model.default_module),
            namer: TypeNamer::new(model.usings.clone()),
            model,
        }
    }

    pub fn namespaces(&self) -> &NamespaceRegistry {
        &self.namespaces
    }

    pub fn converters(&self) -> &Arc<ConverterRegistry> {
        &self.converters
    }

    pub fn model(&self) -> &ObjectModel {
        &self.model
    }

    pub fn compile(
        &mut self,
        source: &str,
        options: &CompileOptions,
    ) -> Result<CompileOutput, CompilerError> {
        info!(
            class = %options.class_name,
            namespace = %options.namespace,
            "compiling markup"
        );

        let result = self.compile_inner(source, options);
        match &result {
            Ok(output) => info!(
                class = %options.class_name,
                root = %output.root_type,
                named = output.named_elements.len(),
                "compile finished"
            ),
            Err(err) => error!(class = %options.class_name, code = err.code(), "{}", err),
        }
        result
    }

    fn compile_inner(
        &mut self,
        source: &str,
        options: &CompileOptions,
    ) -> Result<CompileOutput, CompilerError> {
        self.namespaces.clear();
        let scan = parse::prescan(source, &mut self.namespaces, &self.model.name_attribute)?;

        let root = self
            .resolve_declared(&scan.root_prefix, &scan.root_name)
            .map_err(|kind| CompilerError {
                kind,
                element: Some(scan.root_name.clone()),
                attribute: None,
                offset: None,
            })?;

        let mut fields = Vec::with_capacity(scan.named.len());
        for named in &scan.named {
            let descriptor = self
                .resolve_declared(&named.prefix, &named.type_name)
                .map_err(|kind| {
                    CompilerError::at(
                        kind,
                        Some(named.type_name.clone()),
                        Some(self.model.name_attribute.clone()),
                        named.offset,
                    )
                })?;
            fields.push(format!(
                "private {} {};",
                self.namer.render(descriptor.identity()),
                named.name
            ));
        }

        let mut writer = CodeWriter::new(&options.namespace, &self.model.usings);
        let class_header = format!(
            "public partial class {} : {}",
            options.class_name,
            self.namer.render(root.identity())
        );

        let walker = TreeWalker::new(
            &self.adapter,
            &self.converters,
            &self.namespaces,
            &self.namer,
            &self.model,
            root.clone(),
        );
        let method_header = &self.model.method_header;
        writer.block(&class_header, |w| {
            for field in &fields {
                w.write_line(field);
            }
            if !fields.is_empty() {
                w.write_blank();
            }
            w.block(method_header, |w| walker.walk(source, w))
        })?;

        Ok(CompileOutput {
            code: writer.finish(),
            class_name: options.class_name.clone(),
            namespace: options.namespace.clone(),
            root_type: root.identity().qualified(),
            named_elements: scan.named,
            module_fingerprints: self.module_fingerprints(),
        })
    }

    fn resolve_declared(
        &self,
        prefix: &str,
        name: &str,
    ) -> Result<Arc<TypeDescriptor>, CompileError> {
        self.adapter
            .resolve_type(&self.namespaces, prefix, name)?
            .ok_or_else(|| CompileError::TypeNotFound {
                prefix: prefix.to_string(),
                name: name.to_string(),
            })
    }

    fn module_fingerprints(&self) -> BTreeMap<String, String> {
        self.namespaces
            .bindings()
            .into_iter()
            .filter_map(|binding| {
                self.adapter
                    .cache()
                    .get_loaded(&binding.module_name)
                    .map(|module| (binding.module_name.clone(), module.fingerprint().to_string()))
            })
            .collect()
    }
}
