//! Element Tree Walker
//!
//! Second compile pass. Streams the markup once, keeps an explicit stack of
//! [`ElementContext`] frames and emits construction statements as elements
//! open and close. Event wiring is queued and written only after every
//! construction statement.

use quick_xml::events::{BytesStart, Event};
use std::collections::VecDeque;
use std::sync::Arc;

use crate::adapter::TypeSystemAdapter;
use crate::convert::ConverterRegistry;
use crate::error::{CompileError, CompilerError};
use crate::namespace::NamespaceRegistry;
use crate::options::ObjectModel;
use crate::parse::{self, namespace_declaration, split_qualified, MarkupTag};
use crate::types::{MemberDescriptor, TypeDescriptor, TypeRef};
use crate::writer::{CodeWriter, TypeNamer};

/// One frame of the walk.
#[derive(Debug, Clone)]
pub struct ElementContext {
    /// `None` for values emitted inline into a collection.
    pub variable: Option<String>,
    pub descriptor: Option<Arc<TypeDescriptor>>,
    pub prefix: String,
    /// Tag name as written, for diagnostics.
    pub element: String,
    /// Only the synthetic frame below the document root.
    pub is_root: bool,
    pub is_property_element: bool,
    pub containing_property: Option<String>,
    /// Declared type of `containing_property`.
    pub property_type: Option<TypeRef>,
    pub is_definition_only: bool,
}

impl ElementContext {
    fn synthetic_root(variable: &str, descriptor: Arc<TypeDescriptor>) -> Self {
        Self {
            variable: Some(variable.to_string()),
            descriptor: Some(descriptor),
            prefix: String::new(),
            element: String::new(),
            is_root: true,
            is_property_element: false,
            containing_property: None,
            property_type: None,
            is_definition_only: false,
        }
    }

    fn element(tag: &MarkupTag, variable: Option<String>, descriptor: Arc<TypeDescriptor>) -> Self {
        Self {
            variable,
            descriptor: Some(descriptor),
            prefix: tag.prefix.clone(),
            element: tag.qualified_name(),
            is_root: false,
            is_property_element: false,
            containing_property: None,
            property_type: None,
            is_definition_only: false,
        }
    }

    fn type_name(&self) -> String {
        self.descriptor
            .as_ref()
            .map(|d| d.identity().qualified())
            .unwrap_or_default()
    }
}

/// A statement deferred until the whole document has been walked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingEventHandler {
    pub statement: String,
}

pub struct TreeWalker<'a> {
    adapter: &'a TypeSystemAdapter,
    converters: &'a ConverterRegistry,
    namespaces: &'a NamespaceRegistry,
    namer: &'a TypeNamer,
    model: &'a ObjectModel,
    stack: Vec<ElementContext>,
    current: ElementContext,
    pending: VecDeque<PendingEventHandler>,
    next_index: usize,
}

impl<'a> TreeWalker<'a> {
    pub fn new(
        adapter: &'a TypeSystemAdapter,
        converters: &'a ConverterRegistry,
        namespaces: &'a NamespaceRegistry,
        namer: &'a TypeNamer,
        model: &'a ObjectModel,
        root: Arc<TypeDescriptor>,
    ) -> Self {
        Self {
            adapter,
            converters,
            namespaces,
            namer,
            model,
            stack: Vec::new(),
            current: ElementContext::synthetic_root(&model.self_variable, root),
            pending: VecDeque::new(),
            next_index: 0,
        }
    }

    /// Walk `source`, writing statements into `writer`'s current scope.
    pub fn walk(mut self, source: &str, writer: &mut CodeWriter) -> Result<(), CompilerError> {
        let mut reader = parse::reader(source);
        let mut started = false;

        loop {
            let offset = reader.buffer_position();
            let event = reader
                .read_event()
                .map_err(|e| CompilerError::at(e.into(), None, None, offset))?;

            match event {
                Event::Start(start) => {
                    started = true;
                    self.start_tag(&start, false, writer, offset)?;
                }
                Event::Empty(start) => {
                    started = true;
                    self.start_tag(&start, true, writer, offset)?;
                }
                Event::End(_) => self.end_element(writer, offset)?,
                Event::Text(text) => {
                    let text = text
                        .unescape()
                        .map_err(|e| CompilerError::at(e.into(), None, None, offset))?;
                    self.text(&text, writer, offset)?;
                }
                Event::CData(data) => {
                    let text = String::from_utf8_lossy(&data).into_owned();
                    self.text(&text, writer, offset)?;
                }
                Event::Eof => {
                    if started && !self.stack.is_empty() {
                        return Err(CompilerError::at(
                            CompileError::UnclosedElement {
                                element: self.current.element.clone(),
                            },
                            Some(self.current.element.clone()),
                            None,
                            offset,
                        ));
                    }
                    break;
                }
                _ => {}
            }

            if started && self.stack.is_empty() {
                break;
            }
        }

        for handler in self.pending.drain(..) {
            writer.write_line(&handler.statement);
        }
        Ok(())
    }

    // ───────────────────────────────────────────────────────────────────────────
    // Element start
    // ───────────────────────────────────────────────────────────────────────────

    fn start_tag(
        &mut self,
        start: &BytesStart<'_>,
        self_closing: bool,
        writer: &mut CodeWriter,
        offset: u64,
    ) -> Result<(), CompilerError> {
        let tag = MarkupTag::from_start(start, self_closing)
            .map_err(|e| CompilerError::at(e, None, None, offset))?;
        self.start_element(&tag, writer, offset)
    }

    fn start_element(
        &mut self,
        tag: &MarkupTag,
        writer: &mut CodeWriter,
        offset: u64,
    ) -> Result<(), CompilerError> {
        let element = tag.qualified_name();
        let fail = |kind: CompileError| CompilerError::at(kind, Some(element.clone()), None, offset);

        if self.current.is_definition_only {
            return Err(fail(CompileError::DefinitionContent {
                type_name: self.current.type_name(),
            }));
        }

        if tag.is_property_element() {
            return self.open_property_element(tag, offset);
        }

        let descriptor = self
            .adapter
            .resolve_type(self.namespaces, &tag.prefix, &tag.local)
            .map_err(&fail)?
            .ok_or_else(|| {
                fail(CompileError::TypeNotFound {
                    prefix: tag.prefix.clone(),
                    name: tag.local.clone(),
                })
            })?;
        let type_name = self.namer.render(descriptor.identity());
        let name = tag.attribute(&self.model.name_attribute);

        let variable = if self.current.is_root {
            self.model.self_variable.clone()
        } else if let Some(name) = name {
            writer.write_line(&format!("{} = new {}();", name, type_name));
            name.to_string()
        } else if self.current.is_property_element
            && self.current.property_type.as_ref().is_some_and(TypeRef::is_collection)
        {
            return self.emit_inline(tag, descriptor, writer, offset);
        } else {
            let variable = format!("element{}", self.next_index);
            self.next_index += 1;
            writer.write_line(&format!("{} {} = new();", type_name, variable));
            variable
        };

        self.apply_attributes(tag, &variable, &descriptor, writer, offset)?;

        let context = ElementContext::element(tag, Some(variable), descriptor);
        self.push(context);
        if tag.self_closing {
            self.end_element(writer, offset)?;
        }
        Ok(())
    }

    fn open_property_element(&mut self, tag: &MarkupTag, offset: u64) -> Result<(), CompilerError> {
        if tag.self_closing {
            return Ok(());
        }

        let member_name = tag
            .local
            .rsplit_once('.')
            .map(|(_, member)| member)
            .unwrap_or(&tag.local);

        let property_type = self
            .current
            .descriptor
            .as_ref()
            .and_then(|d| d.member(member_name))
            .and_then(MemberDescriptor::value_type)
            .cloned()
            .ok_or_else(|| {
                CompilerError::at(
                    CompileError::MemberNotFound {
                        type_name: self.current.type_name(),
                        member: member_name.to_string(),
                    },
                    Some(tag.qualified_name()),
                    None,
                    offset,
                )
            })?;

        let context = ElementContext {
            variable: self.current.variable.clone(),
            descriptor: self.current.descriptor.clone(),
            prefix: self.current.prefix.clone(),
            element: tag.qualified_name(),
            is_root: false,
            is_property_element: true,
            containing_property: Some(member_name.to_string()),
            property_type: Some(property_type),
            is_definition_only: false,
        };
        self.push(context);
        Ok(())
    }

    /// `owner.Prop.Add(new T() { A = v, ... });` for an unnamed element
    /// directly inside a collection property element.
    fn emit_inline(
        &mut self,
        tag: &MarkupTag,
        descriptor: Arc<TypeDescriptor>,
        writer: &mut CodeWriter,
        offset: u64,
    ) -> Result<(), CompilerError> {
        let element = tag.qualified_name();
        let mut initializers = Vec::new();

        for (key, value) in &tag.attributes {
            if namespace_declaration(key).is_some() {
                continue;
            }
            let fail = |kind: CompileError| {
                CompilerError::at(kind, Some(element.clone()), Some(key.clone()), offset)
            };

            let value_type = descriptor
                .member(key)
                .and_then(MemberDescriptor::value_type)
                .ok_or_else(|| {
                    fail(CompileError::MemberNotFound {
                        type_name: descriptor.identity().qualified(),
                        member: key.clone(),
                    })
                })?;
            let literal = self.convert(value, value_type, key).map_err(&fail)?;
            initializers.push(format!("{} = {},", key, literal));
        }

        let owner = self
            .current
            .variable
            .clone()
            .unwrap_or_else(|| self.model.self_variable.clone());
        let property = self.current.containing_property.clone().unwrap_or_default();
        let header = format!(
            "{}.{}.Add(new {}()",
            owner,
            property,
            self.namer.render(descriptor.identity())
        );

        if initializers.is_empty() {
            writer.write_line(&format!("{});", header));
        } else {
            writer.begin_block(&header);
            for line in &initializers {
                writer.write_line(line);
            }
            writer.end_block(Some(");"));
        }

        if !tag.self_closing {
            let mut context = ElementContext::element(tag, None, descriptor);
            context.is_definition_only = true;
            self.push(context);
        }
        Ok(())
    }

    // ───────────────────────────────────────────────────────────────────────────
    // Attributes
    // ───────────────────────────────────────────────────────────────────────────

    fn apply_attributes(
        &mut self,
        tag: &MarkupTag,
        variable: &str,
        descriptor: &Arc<TypeDescriptor>,
        writer: &mut CodeWriter,
        offset: u64,
    ) -> Result<(), CompilerError> {
        let element = tag.qualified_name();

        for (key, value) in &tag.attributes {
            if namespace_declaration(key).is_some() || *key == self.model.name_attribute {
                continue;
            }
            let fail = |kind: CompileError| {
                CompilerError::at(kind, Some(element.clone()), Some(key.clone()), offset)
            };

            let (prefix, local) = split_qualified(key);
            match local.rsplit_once('.') {
                Some((owner, member)) => {
                    let owner_type = self
                        .adapter
                        .resolve_type(self.namespaces, prefix.unwrap_or_default(), owner)
                        .map_err(&fail)?
                        .ok_or_else(|| {
                            fail(CompileError::TypeNotFound {
                                prefix: prefix.unwrap_or_default().to_string(),
                                name: owner.to_string(),
                            })
                        })?;
                    // Owner-qualified ordinary members apply only when the
                    // element itself is (or derives from) the owner.
                    let target: &TypeDescriptor = match owner_type.member(member) {
                        Some(MemberDescriptor::AttachedProperty { .. })
                        | Some(MemberDescriptor::RoutedEvent { .. }) => &*owner_type,
                        _ if descriptor.derives_from(owner_type.identity()) => &**descriptor,
                        _ => {
                            return Err(fail(CompileError::MemberNotFound {
                                type_name: descriptor.identity().qualified(),
                                member: local.to_string(),
                            }))
                        }
                    };
                    self.apply_member(target, member, value, variable, writer)
                        .map_err(&fail)?;
                }
                None => {
                    self.apply_member(descriptor, local, value, variable, writer)
                        .map_err(&fail)?;
                }
            }
        }
        Ok(())
    }

    fn apply_member(
        &mut self,
        owner: &TypeDescriptor,
        member_name: &str,
        value: &str,
        variable: &str,
        writer: &mut CodeWriter,
    ) -> Result<(), CompileError> {
        let member = owner
            .member(member_name)
            .ok_or_else(|| CompileError::MemberNotFound {
                type_name: owner.identity().qualified(),
                member: member_name.to_string(),
            })?;

        match member {
            MemberDescriptor::Property { name, value_type } => {
                let literal = self.convert(value, value_type, name)?;
                writer.write_line(&format!("{}.{} = {};", variable, name, literal));
            }
            MemberDescriptor::AttachedProperty {
                name,
                value_type,
                registration,
            } => {
                let literal = self.convert(value, value_type, name)?;
                writer.write_line(&format!(
                    "{}.SetValue({}.{}, {});",
                    variable,
                    self.namer.render(&registration.owner),
                    registration.field,
                    literal
                ));
            }
            MemberDescriptor::Event { name, .. } => {
                self.enqueue(format!("{}.{} += {};", variable, name, value));
            }
            MemberDescriptor::RoutedEvent { registration, .. } => {
                self.enqueue(format!(
                    "{}.AddHandler({}.{}, {});",
                    variable,
                    self.namer.render(&registration.owner),
                    registration.field,
                    value
                ));
            }
        }
        Ok(())
    }

    fn enqueue(&mut self, statement: String) {
        self.pending.push_back(PendingEventHandler { statement });
    }

    // ───────────────────────────────────────────────────────────────────────────
    // Text and element end
    // ───────────────────────────────────────────────────────────────────────────

    fn text(&mut self, raw: &str, writer: &mut CodeWriter, offset: u64) -> Result<(), CompilerError> {
        let text = raw.trim();
        if text.is_empty() {
            return Ok(());
        }

        let fail = |kind: CompileError| {
            CompilerError::at(kind, Some(self.current.element.clone()), None, offset)
        };

        if self.current.is_definition_only {
            return Err(fail(CompileError::DefinitionContent {
                type_name: self.current.type_name(),
            }));
        }

        let (property, value_type) = self.target_property(&self.current).map_err(&fail)?;
        let literal = self.convert(text, &value_type, &property).map_err(&fail)?;
        let variable = self
            .current
            .variable
            .as_deref()
            .unwrap_or(self.model.self_variable.as_str());
        writer.write_line(&format!("{}.{} = {};", variable, property, literal));
        Ok(())
    }

    fn end_element(&mut self, writer: &mut CodeWriter, offset: u64) -> Result<(), CompilerError> {
        let Some(parent) = self.stack.last() else {
            return Ok(());
        };

        let attach = !self.current.is_property_element
            && !self.current.is_definition_only
            && !parent.is_root;

        if attach {
            if let Some(child) = &self.current.variable {
                let (property, value_type) = self.target_property(parent).map_err(|kind| {
                    CompilerError::at(kind, Some(self.current.element.clone()), None, offset)
                })?;
                let owner = parent
                    .variable
                    .as_deref()
                    .unwrap_or(self.model.self_variable.as_str());

                if value_type.is_collection() {
                    writer.write_line(&format!("{}.{}.Add({});", owner, property, child));
                } else {
                    writer.write_line(&format!("{}.{} = {};", owner, property, child));
                }
            }
        }

        self.pop();
        Ok(())
    }

    /// The property content placed inside `context` is assigned to: the
    /// property of a property element, otherwise the type's content property.
    fn target_property(&self, context: &ElementContext) -> Result<(String, TypeRef), CompileError> {
        if context.is_property_element {
            if let (Some(property), Some(value_type)) =
                (&context.containing_property, &context.property_type)
            {
                return Ok((property.clone(), value_type.clone()));
            }
        }

        let descriptor = context
            .descriptor
            .as_ref()
            .ok_or_else(|| CompileError::NoContentProperty {
                type_name: context.element.clone(),
            })?;
        let property = descriptor
            .content_property()
            .ok_or_else(|| CompileError::NoContentProperty {
                type_name: descriptor.identity().qualified(),
            })?;
        let value_type = descriptor
            .member(property)
            .and_then(MemberDescriptor::value_type)
            .ok_or_else(|| CompileError::MemberNotFound {
                type_name: descriptor.identity().qualified(),
                member: property.to_string(),
            })?;

        Ok((property.to_string(), value_type.clone()))
    }

    fn convert(&self, raw: &str, target: &TypeRef, property: &str) -> Result<String, CompileError> {
        Ok(self
            .converters
            .convert(raw, target, property, self.namespaces, self.namer)?)
    }

    fn push(&mut self, context: ElementContext) {
        let parent = std::mem::replace(&mut self.current, context);
        self.stack.push(parent);
    }

    fn pop(&mut self) {
        if let Some(parent) = self.stack.pop() {
            self.current = parent;
        }
    }
}
