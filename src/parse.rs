//! Parse Module
//!
//! Thin layer over the `quick-xml` streaming reader: tag decoding shared by
//! both compile passes, and the pre-scan pass that registers the document's
//! namespace declarations and collects the root type and named elements.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::{CompileError, CompilerError};
use crate::namespace::NamespaceRegistry;

// ═══════════════════════════════════════════════════════════════════════════════
// TAGS
// ═══════════════════════════════════════════════════════════════════════════════

/// A decoded start tag. `prefix` is empty for unprefixed names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkupTag {
    pub prefix: String,
    pub local: String,
    pub attributes: Vec<(String, String)>,
    pub self_closing: bool,
}

impl MarkupTag {
    pub fn from_start(start: &BytesStart<'_>, self_closing: bool) -> Result<Self, CompileError> {
        let raw_name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
        let (prefix, local) = split_qualified(&raw_name);

        let mut attributes = Vec::new();
        for attr in start.attributes() {
            let attr = attr?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr.unescape_value()?.into_owned();
            attributes.push((key, value));
        }

        Ok(Self {
            prefix: prefix.unwrap_or_default().to_string(),
            local: local.to_string(),
            attributes,
            self_closing,
        })
    }

    /// The tag name as written.
    pub fn qualified_name(&self) -> String {
        if self.prefix.is_empty() {
            self.local.clone()
        } else {
            format!("{}:{}", self.prefix, self.local)
        }
    }

    /// `Owner.Member` tags set a member of the enclosing element.
    pub fn is_property_element(&self) -> bool {
        self.local.contains('.')
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Split `prefix:name` into its parts.
pub fn split_qualified(name: &str) -> (Option<&str>, &str) {
    match name.split_once(':') {
        Some((prefix, local)) => (Some(prefix), local),
        None => (None, name),
    }
}

/// `xmlns` declares the default prefix, `xmlns:p` declares `p`.
pub fn namespace_declaration(key: &str) -> Option<&str> {
    if key == "xmlns" {
        Some("")
    } else {
        key.strip_prefix("xmlns:")
    }
}

pub fn reader(source: &str) -> Reader<&[u8]> {
    let mut reader = Reader::from_str(source);
    reader.config_mut().trim_text(false);
    reader
}

// ═══════════════════════════════════════════════════════════════════════════════
// PRE-SCAN
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NamedElement {
    pub name: String,
    pub prefix: String,
    pub type_name: String,
    pub offset: u64,
}

#[derive(Debug, Clone)]
pub struct Prescan {
    pub root_prefix: String,
    pub root_name: String,
    /// In document order.
    pub named: Vec<NamedElement>,
}

/// First pass over the document. Registers the root element's `xmlns`
/// declarations in `registry` and collects every element carrying
/// `name_attribute`.
pub fn prescan(
    source: &str,
    registry: &mut NamespaceRegistry,
    name_attribute: &str,
) -> Result<Prescan, CompilerError> {
    let mut reader = reader(source);
    let mut root: Option<(String, String)> = None;
    let mut named = Vec::new();
    let mut seen = HashSet::new();
    let mut open: Vec<String> = Vec::new();

    loop {
        let offset = reader.buffer_position();
        let event = reader
            .read_event()
            .map_err(|e| CompilerError::at(e.into(), None, None, offset))?;

        let (start, self_closing) = match event {
            Event::Start(start) => (start, false),
            Event::Empty(start) => (start, true),
            Event::End(_) => {
                open.pop();
                if open.is_empty() && root.is_some() {
                    break;
                }
                continue;
            }
            Event::Eof => match open.last() {
                Some(element) => {
                    return Err(CompilerError::at(
                        CompileError::UnclosedElement {
                            element: element.clone(),
                        },
                        Some(element.clone()),
                        None,
                        offset,
                    ))
                }
                None => break,
            },
            _ => continue,
        };

        let tag = MarkupTag::from_start(&start, self_closing)
            .map_err(|e| CompilerError::at(e, None, None, offset))?;

        if root.is_none() {
            for (key, value) in &tag.attributes {
                if let Some(prefix) = namespace_declaration(key) {
                    registry.register(prefix, value).map_err(|e| {
                        CompilerError::at(e, Some(tag.qualified_name()), Some(key.clone()), offset)
                    })?;
                }
            }
            root = Some((tag.prefix.clone(), tag.local.clone()));
        }

        if !tag.is_property_element() {
            if let Some(name) = tag.attribute(name_attribute) {
                if !seen.insert(name.to_string()) {
                    return Err(CompilerError::at(
                        CompileError::DuplicateName {
                            name: name.to_string(),
                        },
                        Some(tag.qualified_name()),
                        Some(name_attribute.to_string()),
                        offset,
                    ));
                }
                tracing::debug!(name, element = %tag.qualified_name(), "found named element");
                named.push(NamedElement {
                    name: name.to_string(),
                    prefix: tag.prefix.clone(),
                    type_name: tag.local.clone(),
                    offset,
                });
            }
        }

        if !self_closing {
            open.push(tag.qualified_name());
        } else if open.is_empty() {
            break;
        }
    }

    let (root_prefix, root_name) =
        root.ok_or_else(|| CompilerError::new(CompileError::EmptyDocument))?;

    Ok(Prescan {
        root_prefix,
        root_name,
        named,
    })
}
