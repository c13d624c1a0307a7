//! Type descriptors
//!
//! The compiler's view of the host type system: type identities, the kinds the
//! value converters care about, and the memoized member index of each type.

use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::module::{SchemaKind, TypeSchema};

// ═══════════════════════════════════════════════════════════════════════════════
// TYPE IDENTITY
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TypeIdentity {
    pub namespace: String,
    pub name: String,
}

impl TypeIdentity {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Split `A.B.C` into namespace `A.B` and name `C`.
    pub fn parse(qualified: &str) -> Self {
        match qualified.rfind('.') {
            Some(idx) => Self::new(&qualified[..idx], &qualified[idx + 1..]),
            None => Self::new("", qualified),
        }
    }

    pub fn qualified(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for TypeIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}.{}", self.namespace, self.name)
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TYPE KINDS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    Bool,
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    I64,
    U64,
    F32,
    F64,
    Decimal,
}

impl Primitive {
    /// Recognizes both keyword aliases (`int`) and framework names (`System.Int32`).
    pub fn from_type_name(name: &str) -> Option<Self> {
        let primitive = match name {
            "bool" | "Boolean" | "System.Boolean" => Primitive::Bool,
            "sbyte" | "SByte" | "System.SByte" => Primitive::I8,
            "byte" | "Byte" | "System.Byte" => Primitive::U8,
            "short" | "Int16" | "System.Int16" => Primitive::I16,
            "ushort" | "UInt16" | "System.UInt16" => Primitive::U16,
            "int" | "Int32" | "System.Int32" => Primitive::I32,
            "uint" | "UInt32" | "System.UInt32" => Primitive::U32,
            "long" | "Int64" | "System.Int64" => Primitive::I64,
            "ulong" | "UInt64" | "System.UInt64" => Primitive::U64,
            "float" | "Single" | "System.Single" => Primitive::F32,
            "double" | "Double" | "System.Double" => Primitive::F64,
            "decimal" | "Decimal" | "System.Decimal" => Primitive::Decimal,
            _ => return None,
        };
        Some(primitive)
    }

    pub fn identity(self) -> TypeIdentity {
        let name = match self {
            Primitive::Bool => "Boolean",
            Primitive::I8 => "SByte",
            Primitive::U8 => "Byte",
            Primitive::I16 => "Int16",
            Primitive::U16 => "UInt16",
            Primitive::I32 => "Int32",
            Primitive::U32 => "UInt32",
            Primitive::I64 => "Int64",
            Primitive::U64 => "UInt64",
            Primitive::F32 => "Single",
            Primitive::F64 => "Double",
            Primitive::Decimal => "Decimal",
        };
        TypeIdentity::new("System", name)
    }

    pub fn is_numeric(self) -> bool {
        !matches!(self, Primitive::Bool)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeKind {
    Class,
    Enum,
    Collection,
    String,
    /// `System.Type`: values are type references (`typeof(...)`).
    TypeReference,
    Primitive(Primitive),
}

/// A member's declared value type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeRef {
    pub identity: TypeIdentity,
    pub kind: TypeKind,
}

impl TypeRef {
    pub fn new(identity: TypeIdentity, kind: TypeKind) -> Self {
        Self { identity, kind }
    }

    pub fn is_collection(&self) -> bool {
        self.kind == TypeKind::Collection
    }
}

/// Kinds of every type declared in one module, keyed by qualified name.
/// Used to resolve the type names members declare.
#[derive(Debug, Default)]
pub struct TypeTable {
    kinds: HashMap<String, TypeKind>,
}

impl TypeTable {
    pub fn insert(&mut self, identity: &TypeIdentity, kind: TypeKind) {
        self.kinds.insert(identity.qualified(), kind);
    }

    /// Resolve a member type name as written in a schema. Unqualified names are
    /// tried against the declaring type's namespace first.
    pub fn resolve(&self, type_name: &str, declaring_namespace: &str) -> TypeRef {
        if let Some(primitive) = Primitive::from_type_name(type_name) {
            return TypeRef::new(primitive.identity(), TypeKind::Primitive(primitive));
        }
        match type_name {
            "string" | "String" | "System.String" => {
                return TypeRef::new(TypeIdentity::new("System", "String"), TypeKind::String)
            }
            "Type" | "System.Type" => {
                return TypeRef::new(TypeIdentity::new("System", "Type"), TypeKind::TypeReference)
            }
            "object" | "System.Object" => {
                return TypeRef::new(TypeIdentity::new("System", "Object"), TypeKind::Class)
            }
            _ => {}
        }

        if let Some(kind) = self.kinds.get(type_name) {
            return TypeRef::new(TypeIdentity::parse(type_name), kind.clone());
        }

        if !type_name.contains('.') && !declaring_namespace.is_empty() {
            let identity = TypeIdentity::new(declaring_namespace, type_name);
            if let Some(kind) = self.kinds.get(&identity.qualified()) {
                return TypeRef::new(identity, kind.clone());
            }
        }

        TypeRef::new(TypeIdentity::parse(type_name), TypeKind::Class)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// MEMBERS
// ═══════════════════════════════════════════════════════════════════════════════

/// Static registration object backing an attached property or routed event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticRegistration {
    pub owner: TypeIdentity,
    pub field: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemberDescriptor {
    Property {
        name: String,
        value_type: TypeRef,
    },
    AttachedProperty {
        name: String,
        value_type: TypeRef,
        registration: StaticRegistration,
    },
    Event {
        name: String,
        handler_type: Option<String>,
    },
    RoutedEvent {
        name: String,
        registration: StaticRegistration,
    },
}

impl MemberDescriptor {
    pub fn name(&self) -> &str {
        match self {
            MemberDescriptor::Property { name, .. }
            | MemberDescriptor::AttachedProperty { name, .. }
            | MemberDescriptor::Event { name, .. }
            | MemberDescriptor::RoutedEvent { name, .. } => name,
        }
    }

    /// Declared value type, for property members.
    pub fn value_type(&self) -> Option<&TypeRef> {
        match self {
            MemberDescriptor::Property { value_type, .. }
            | MemberDescriptor::AttachedProperty { value_type, .. } => Some(value_type),
            _ => None,
        }
    }

    pub fn is_event(&self) -> bool {
        matches!(
            self,
            MemberDescriptor::Event { .. } | MemberDescriptor::RoutedEvent { .. }
        )
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TYPE DESCRIPTOR
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug)]
pub struct TypeDescriptor {
    identity: TypeIdentity,
    kind: TypeKind,
    content_property: Option<String>,
    bindable: bool,
    /// The type's own schema followed by its ancestors, nearest first.
    lineage: Vec<Arc<TypeSchema>>,
    table: Arc<TypeTable>,
    members: OnceCell<HashMap<String, MemberDescriptor>>,
}

impl TypeDescriptor {
    pub(crate) fn new(lineage: Vec<Arc<TypeSchema>>, table: Arc<TypeTable>) -> Self {
        let own = &lineage[0];
        let identity = TypeIdentity::new(&own.namespace, &own.name);
        let kind = match own.kind {
            SchemaKind::Class => TypeKind::Class,
            SchemaKind::Enum => TypeKind::Enum,
            SchemaKind::Collection => TypeKind::Collection,
        };
        let content_property = lineage
            .iter()
            .find_map(|schema| schema.content_property.clone());
        let bindable = lineage.iter().any(|schema| schema.bindable);

        Self {
            identity,
            kind,
            content_property,
            bindable,
            lineage,
            table,
            members: OnceCell::new(),
        }
    }

    pub fn identity(&self) -> &TypeIdentity {
        &self.identity
    }

    pub fn name(&self) -> &str {
        &self.identity.name
    }

    pub fn kind(&self) -> &TypeKind {
        &self.kind
    }

    pub fn content_property(&self) -> Option<&str> {
        self.content_property.as_deref()
    }

    /// Whether the type has the bindable-object capability, which enables
    /// attached properties and routed events.
    pub fn is_bindable(&self) -> bool {
        self.bindable
    }

    /// Whether `identity` names this type or one of its ancestors.
    pub fn derives_from(&self, identity: &TypeIdentity) -> bool {
        self.lineage
            .iter()
            .any(|schema| schema.namespace == identity.namespace && schema.name == identity.name)
    }

    pub fn as_type_ref(&self) -> TypeRef {
        TypeRef::new(self.identity.clone(), self.kind.clone())
    }

    pub fn member(&self, name: &str) -> Option<&MemberDescriptor> {
        self.members().get(name)
    }

    /// The member index, built on first use.
    pub fn members(&self) -> &HashMap<String, MemberDescriptor> {
        self.members.get_or_init(|| self.build_member_index())
    }

    fn build_member_index(&self) -> HashMap<String, MemberDescriptor> {
        let mut index = HashMap::new();

        // Farthest ancestor first so nearer declarations overwrite inherited ones.
        for schema in self.lineage.iter().rev() {
            for event in &schema.events {
                index.insert(
                    event.name.clone(),
                    MemberDescriptor::Event {
                        name: event.name.clone(),
                        handler_type: event.handler_type.clone(),
                    },
                );
            }
            for property in &schema.properties {
                index.insert(
                    property.name.clone(),
                    MemberDescriptor::Property {
                        name: property.name.clone(),
                        value_type: self.table.resolve(&property.value_type, &schema.namespace),
                    },
                );
            }
        }

        if !self.bindable {
            return index;
        }

        // Static registrations override ordinary members of the same name.
        for schema in self.lineage.iter().rev() {
            let owner = TypeIdentity::new(&schema.namespace, &schema.name);
            for event in &schema.routed_events {
                index.insert(
                    event.name.clone(),
                    MemberDescriptor::RoutedEvent {
                        name: event.name.clone(),
                        registration: StaticRegistration {
                            owner: owner.clone(),
                            field: event.field.clone(),
                        },
                    },
                );
            }
            for property in &schema.attached_properties {
                index.insert(
                    property.name.clone(),
                    MemberDescriptor::AttachedProperty {
                        name: property.name.clone(),
                        value_type: self.table.resolve(&property.value_type, &schema.namespace),
                        registration: StaticRegistration {
                            owner: owner.clone(),
                            field: property.field.clone(),
                        },
                    },
                );
            }
        }

        tracing::trace!(type_name = %self.identity, members = index.len(), "built member index");
        index
    }
}
