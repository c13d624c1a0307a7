//! # markupgen Ground Truth
//!
//! Compiles declarative UI markup (an XML dialect describing an object tree)
//! into imperative C# construction code for a target object model.
//!
//! ## Compile Invariants
//!
//! 1. **Two Passes**: the pre-scan registers the root element's `xmlns`
//!    declarations and collects the root type and named elements; the tree walk
//!    then emits statements in document order. The namespace registry is
//!    cleared at the start of every compile.
//!
//! 2. **Resolution Is Total**: every element resolves to a type and every
//!    attribute to a member of that type (or of the owner named in
//!    `Owner.Member`). Anything unresolved is a compile error
//!    (MG-ERR-TYPE-001, MG-ERR-MEMBER-001), never a guess.
//!
//! 3. **Static Members Win**: on bindable types a static registration
//!    (attached property, routed event) shadows an ordinary member of the same
//!    name.
//!
//! 4. **Values Are Validated**: attribute and text values go through the
//!    converter registry. Raw markup text is never pasted into code
//!    (MG-ERR-VALUE-001, MG-ERR-VALUE-002).
//!
//! 5. **Handlers Last**: event wiring is queued and emitted after every
//!    construction statement, in document order.
//!
//! 6. **No Partial Output**: any error aborts the compile; the caller gets a
//!    [`CompilerError`] and no text.
//!
//! ## Shared State
//!
//! [`ModuleCache`] and [`ConverterRegistry`] are the only structures shared
//! between compiles. Both are append-only and initialize each key at most once.

mod adapter;
mod cache;
mod compile;
mod convert;
pub mod converters;
mod discovery;
mod error;
mod module;
mod namespace;
mod options;
mod parse;
mod types;
mod walker;
mod writer;

#[cfg(test)]
mod test_support;

#[cfg(test)]
mod walker_tests;


pub use adapter::{ModuleCache, TypeSystemAdapter};
pub use cache::{CacheEntry, IncrementalCache};
pub use compile::{CompileOutput, MarkupCompiler};
pub use convert::{
    is_valid_number, string_literal, ConvertContext, ConvertError, ConverterRegistry,
    ValueConverter,
};
pub use discovery::SchemaLoader;
pub use error::*;
pub use module::{
    compute_fingerprint, EventSchema, InMemoryLoader, LoadError, Module, ModuleHandle,
    ModuleLoader, ModuleSchema, ModuleSource, PropertySchema, RegisteredEventSchema,
    RegisteredPropertySchema, SchemaKind, TypeSchema,
};
pub use namespace::{parse_namespace_uri, NamespaceBinding, NamespaceRegistry};
pub use options::{CompileOptions, ObjectModel};
pub use parse::{prescan, split_qualified, MarkupTag, NamedElement, Prescan};
pub use types::{
    MemberDescriptor, Primitive, StaticRegistration, TypeDescriptor, TypeIdentity, TypeKind,
    TypeRef,
};
pub use walker::{ElementContext, PendingEventHandler, TreeWalker};
pub use writer::{CodeWriter, TypeNamer};

/// Compile `source` with the process-wide module cache and the default
/// object model.
pub fn compile_markup(
    source: &str,
    class_name: &str,
    namespace: &str,
) -> Result<String, CompilerError> {
    let mut compiler = MarkupCompiler::new(ModuleCache::global(), ObjectModel::default());
    compiler
        .compile(source, &CompileOptions::new(class_name, namespace))
        .map(|output| output.code)
}
