use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::convert::ConvertError;
use crate::module::LoadError;

// ═══════════════════════════════════════════════════════════════════════════════
// ERROR CODES
// ═══════════════════════════════════════════════════════════════════════════════

pub const ERR_UNSUPPORTED_NAMESPACE_URI: &str = "MG-ERR-NS-001";
pub const ERR_MISSING_MODULE_NAME: &str = "MG-ERR-NS-002";
pub const ERR_TYPE_NOT_FOUND: &str = "MG-ERR-TYPE-001";
pub const ERR_MEMBER_NOT_FOUND: &str = "MG-ERR-MEMBER-001";
pub const ERR_NO_CONTENT_PROPERTY: &str = "MG-ERR-CONTENT-001";
pub const ERR_DEFINITION_CONTENT: &str = "MG-ERR-CONTENT-002";
pub const ERR_UNCONVERTIBLE_VALUE: &str = "MG-ERR-VALUE-001";
pub const ERR_NO_CONVERTER: &str = "MG-ERR-VALUE-002";
pub const ERR_MODULE_LOAD: &str = "MG-ERR-MODULE-001";
pub const ERR_DUPLICATE_NAME: &str = "MG-ERR-NAME-001";
pub const ERR_MALFORMED_MARKUP: &str = "MG-ERR-SYNTAX-001";
pub const ERR_EMPTY_DOCUMENT: &str = "MG-ERR-SYNTAX-002";
pub const ERR_UNCLOSED_ELEMENT: &str = "MG-ERR-SYNTAX-003";

// ═══════════════════════════════════════════════════════════════════════════════
// GUARANTEES
// ═══════════════════════════════════════════════════════════════════════════════

fn get_guarantee(code: &str) -> &'static str {
    match code {
        ERR_UNSUPPORTED_NAMESPACE_URI => {
            "Every xmlns declaration names a module namespace or the built-in default namespace."
        }
        ERR_MISSING_MODULE_NAME => "The compiler never guesses which module a namespace lives in.",
        ERR_TYPE_NOT_FOUND => "Every element resolves to exactly one type at compile time.",
        ERR_MEMBER_NOT_FOUND => "Every attribute resolves to a property or an event.",
        ERR_NO_CONTENT_PROPERTY => "Child content is never silently dropped.",
        ERR_DEFINITION_CONTENT => "Inline definition values hold attributes only.",
        ERR_UNCONVERTIBLE_VALUE => "Literal values are validated against their declared type.",
        ERR_NO_CONVERTER => "Raw markup text is never passed through as code.",
        ERR_MODULE_LOAD => "Type information comes from a loaded module, never from a guess.",
        ERR_DUPLICATE_NAME => "Each element name declares exactly one field.",
        ERR_MALFORMED_MARKUP | ERR_EMPTY_DOCUMENT | ERR_UNCLOSED_ELEMENT => {
            "Input markup is a well-formed document."
        }
        _ => "Unknown invariant.",
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// COMPILE ERROR
// ═══════════════════════════════════════════════════════════════════════════════

/// Every condition that aborts a compile. None of them produce partial output.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("unsupported xmlns URI '{uri}'")]
    UnsupportedNamespaceUri { uri: String },

    #[error("module name missing in xmlns URI '{uri}'")]
    MissingModuleName { uri: String },

    #[error("type '{name}' not found for namespace prefix '{prefix}'")]
    TypeNotFound { prefix: String, name: String },

    #[error("member '{member}' not found on type '{type_name}'")]
    MemberNotFound { type_name: String, member: String },

    #[error("type '{type_name}' declares no content property")]
    NoContentProperty { type_name: String },

    #[error("definition element '{type_name}' cannot hold child content")]
    DefinitionContent { type_name: String },

    #[error("invalid value '{value}' for property '{property}' of type '{type_name}': {reason}")]
    UnconvertibleValue {
        property: String,
        type_name: String,
        value: String,
        reason: String,
    },

    #[error("no converter registered for property '{property}' of type '{type_name}'")]
    NoConverterForType { property: String, type_name: String },

    #[error("failed to load module '{module}': {source}")]
    ModuleLoadFailure {
        module: String,
        #[source]
        source: LoadError,
    },

    #[error("element name '{name}' is declared more than once")]
    DuplicateName { name: String },

    #[error("malformed markup: {0}")]
    MalformedMarkup(#[from] quick_xml::Error),

    #[error("markup document has no root element")]
    EmptyDocument,

    #[error("markup ends before element <{element}> is closed")]
    UnclosedElement { element: String },
}

impl CompileError {
    pub fn code(&self) -> &'static str {
        match self {
            CompileError::UnsupportedNamespaceUri { .. } => ERR_UNSUPPORTED_NAMESPACE_URI,
            CompileError::MissingModuleName { .. } => ERR_MISSING_MODULE_NAME,
            CompileError::TypeNotFound { .. } => ERR_TYPE_NOT_FOUND,
            CompileError::MemberNotFound { .. } => ERR_MEMBER_NOT_FOUND,
            CompileError::NoContentProperty { .. } => ERR_NO_CONTENT_PROPERTY,
            CompileError::DefinitionContent { .. } => ERR_DEFINITION_CONTENT,
            CompileError::UnconvertibleValue { .. } => ERR_UNCONVERTIBLE_VALUE,
            CompileError::NoConverterForType { .. } => ERR_NO_CONVERTER,
            CompileError::ModuleLoadFailure { .. } => ERR_MODULE_LOAD,
            CompileError::DuplicateName { .. } => ERR_DUPLICATE_NAME,
            CompileError::MalformedMarkup(_) => ERR_MALFORMED_MARKUP,
            CompileError::EmptyDocument => ERR_EMPTY_DOCUMENT,
            CompileError::UnclosedElement { .. } => ERR_UNCLOSED_ELEMENT,
        }
    }

    pub fn guarantee(&self) -> &'static str {
        get_guarantee(self.code())
    }
}

impl From<ConvertError> for CompileError {
    fn from(error: ConvertError) -> Self {
        match error {
            ConvertError::Unconvertible {
                property,
                type_name,
                value,
                reason,
            } => CompileError::UnconvertibleValue {
                property,
                type_name,
                value,
                reason,
            },
            ConvertError::NoConverter {
                property,
                type_name,
            } => CompileError::NoConverterForType {
                property,
                type_name,
            },
        }
    }
}

impl From<quick_xml::events::attributes::AttrError> for CompileError {
    fn from(error: quick_xml::events::attributes::AttrError) -> Self {
        CompileError::MalformedMarkup(quick_xml::Error::from(error))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// LOCATED COMPILER ERROR
// ═══════════════════════════════════════════════════════════════════════════════

/// A [`CompileError`] plus where in the markup it happened.
#[derive(Debug)]
pub struct CompilerError {
    pub kind: CompileError,
    pub element: Option<String>,
    pub attribute: Option<String>,
    pub offset: Option<u64>,
}

impl CompilerError {
    pub fn new(kind: CompileError) -> Self {
        Self {
            kind,
            element: None,
            attribute: None,
            offset: None,
        }
    }

    pub fn at(
        kind: CompileError,
        element: Option<String>,
        attribute: Option<String>,
        offset: u64,
    ) -> Self {
        Self {
            kind,
            element,
            attribute,
            offset: Some(offset),
        }
    }

    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    /// Serializable form handed to hosts (CLI, IDE integrations).
    pub fn to_diagnostic(&self) -> Diagnostic {
        Diagnostic {
            code: self.code().to_string(),
            message: self.kind.to_string(),
            guarantee: self.kind.guarantee().to_string(),
            element: self.element.clone(),
            attribute: self.attribute.clone(),
            offset: self.offset,
        }
    }
}

impl fmt::Display for CompilerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code(), self.kind)?;
        if let Some(element) = &self.element {
            write!(f, " (element <{}>", element)?;
            if let Some(attribute) = &self.attribute {
                write!(f, ", attribute '{}'", attribute)?;
            }
            if let Some(offset) = self.offset {
                write!(f, ", byte {}", offset)?;
            }
            write!(f, ")")?;
        }
        Ok(())
    }
}

impl std::error::Error for CompilerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.kind)
    }
}

impl From<CompileError> for CompilerError {
    fn from(kind: CompileError) -> Self {
        CompilerError::new(kind)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    pub code: String,
    pub message: String,
    pub guarantee: String,
    pub element: Option<String>,
    pub attribute: Option<String>,
    pub offset: Option<u64>,
}
