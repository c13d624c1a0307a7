//! Value Converter Registry
//!
//! Turns markup string literals into target-language literal expressions.
//! Resolution order for a target type:
//!
//! 1. an empty value is the `null` literal;
//! 2. a converter registered for the exact type identity;
//! 3. enums render as `TypeName.value`, the type named like any other;
//! 4. booleans, case-insensitive;
//! 5. numerics, validated against an invariant decimal-point grammar and
//!    emitted verbatim;
//! 6. strings, as escaped quoted literals;
//! 7. anything else is an error.

use lazy_static::lazy_static;
use parking_lot::RwLock;
use regex::Regex;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

use crate::converters::{BrushConverter, GridLengthConverter, ThicknessConverter, TypeRefConverter};
use crate::namespace::NamespaceRegistry;
use crate::options::ObjectModel;
use crate::types::{Primitive, TypeIdentity, TypeKind, TypeRef};
use crate::writer::TypeNamer;

lazy_static! {
    static ref INTEGER_LITERAL: Regex = Regex::new(r"^\s*[+-]?[0-9]+\s*$").unwrap();
    static ref FLOAT_LITERAL: Regex =
        Regex::new(r"^\s*[+-]?([0-9]+(\.[0-9]*)?|\.[0-9]+)([eE][+-]?[0-9]+)?\s*$").unwrap();
}

/// Largest magnitude a 96-bit decimal can hold.
const DECIMAL_MAX: f64 = 79_228_162_514_264_337_593_543_950_335.0;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConvertError {
    #[error("invalid value '{value}' for property '{property}' of type '{type_name}': {reason}")]
    Unconvertible {
        property: String,
        type_name: String,
        value: String,
        reason: String,
    },

    #[error("no converter registered for property '{property}' of type '{type_name}'")]
    NoConverter { property: String, type_name: String },
}

/// Everything a converter may consult besides the raw text.
pub struct ConvertContext<'a> {
    pub property: &'a str,
    pub target: &'a TypeRef,
    pub namespaces: &'a NamespaceRegistry,
    pub namer: &'a TypeNamer,
}

impl ConvertContext<'_> {
    pub fn reject(&self, value: &str, reason: impl Into<String>) -> ConvertError {
        ConvertError::Unconvertible {
            property: self.property.to_string(),
            type_name: self.target.identity.qualified(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }

    pub fn render(&self, identity: &TypeIdentity) -> String {
        self.namer.render(identity)
    }
}

pub trait ValueConverter: Send + Sync {
    fn convert(&self, raw: &str, ctx: &ConvertContext<'_>) -> Result<String, ConvertError>;
}

/// Converters keyed by target type identity. Shared between compiles.
#[derive(Default)]
pub struct ConverterRegistry {
    converters: RwLock<HashMap<TypeIdentity, Arc<dyn ValueConverter>>>,
}

impl ConverterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with the brush, thickness, grid-length and type
    /// reference converters for the identities `model` names.
    pub fn with_defaults(model: &ObjectModel) -> Self {
        let registry = Self::new();
        let brush: Arc<dyn ValueConverter> = Arc::new(BrushConverter::new(
            TypeIdentity::parse(&model.solid_color_brush),
            TypeIdentity::parse(&model.color),
        ));
        registry.register(TypeIdentity::parse(&model.brush), brush.clone());
        registry.register(TypeIdentity::parse(&model.solid_color_brush), brush);
        registry.register(
            TypeIdentity::parse(&model.thickness),
            Arc::new(ThicknessConverter),
        );
        registry.register(
            TypeIdentity::parse(&model.grid_length),
            Arc::new(GridLengthConverter::new(TypeIdentity::parse(
                &model.grid_unit_type,
            ))),
        );
        registry.register(
            TypeIdentity::parse(&model.type_reference),
            Arc::new(TypeRefConverter),
        );
        registry
    }

    /// Register or replace the converter for `identity`.
    pub fn register(&self, identity: TypeIdentity, converter: Arc<dyn ValueConverter>) {
        tracing::debug!(type_name = %identity, "registering value converter");
        self.converters.write().insert(identity, converter);
    }

    /// Return the converter for `identity`, creating it with `make` if none is
    /// registered. `make` runs at most once per identity.
    pub fn get_or_register<F>(&self, identity: TypeIdentity, make: F) -> Arc<dyn ValueConverter>
    where
        F: FnOnce() -> Arc<dyn ValueConverter>,
    {
        if let Some(existing) = self.converters.read().get(&identity) {
            return existing.clone();
        }
        self.converters
            .write()
            .entry(identity)
            .or_insert_with(make)
            .clone()
    }

    pub fn converter_for(&self, identity: &TypeIdentity) -> Option<Arc<dyn ValueConverter>> {
        self.converters.read().get(identity).cloned()
    }

    pub fn convert(
        &self,
        raw: &str,
        target: &TypeRef,
        property: &str,
        namespaces: &NamespaceRegistry,
        namer: &TypeNamer,
    ) -> Result<String, ConvertError> {
        let ctx = ConvertContext {
            property,
            target,
            namespaces,
            namer,
        };
        self.convert_with(raw, &ctx)
    }

    pub fn convert_with(&self, raw: &str, ctx: &ConvertContext<'_>) -> Result<String, ConvertError> {
        if raw.is_empty() {
            return Ok("null".to_string());
        }

        // The lock is released before the converter runs.
        if let Some(converter) = self.converter_for(&ctx.target.identity) {
            return converter.convert(raw, ctx);
        }

        match &ctx.target.kind {
            TypeKind::Enum => Ok(format!("{}.{}", ctx.render(&ctx.target.identity), raw)),
            TypeKind::Primitive(Primitive::Bool) => convert_bool(raw, ctx),
            TypeKind::Primitive(primitive) => convert_numeric(raw, *primitive, ctx),
            TypeKind::String => Ok(string_literal(raw)),
            _ => Err(ConvertError::NoConverter {
                property: ctx.property.to_string(),
                type_name: ctx.target.identity.qualified(),
            }),
        }
    }
}

fn convert_bool(raw: &str, ctx: &ConvertContext<'_>) -> Result<String, ConvertError> {
    let value = raw.trim();
    if value.eq_ignore_ascii_case("true") {
        Ok("true".to_string())
    } else if value.eq_ignore_ascii_case("false") {
        Ok("false".to_string())
    } else {
        Err(ctx.reject(raw, "expected 'true' or 'false'"))
    }
}

fn convert_numeric(
    raw: &str,
    primitive: Primitive,
    ctx: &ConvertContext<'_>,
) -> Result<String, ConvertError> {
    if is_valid_number(raw, primitive) {
        Ok(raw.to_string())
    } else {
        Err(ctx.reject(raw, format!("not a valid {}", primitive.identity().name)))
    }
}

/// Culture-invariant numeric validation: optional sign, ASCII digits, `.` as
/// the decimal separator, surrounding whitespace allowed.
pub fn is_valid_number(raw: &str, primitive: Primitive) -> bool {
    match primitive {
        Primitive::Bool => false,
        Primitive::F32 => parse_float(raw).is_some_and(|v| (v as f32).is_finite()),
        Primitive::F64 => parse_float(raw).is_some_and(f64::is_finite),
        Primitive::Decimal => parse_float(raw).is_some_and(|v| v.abs() <= DECIMAL_MAX),
        integer => {
            if !INTEGER_LITERAL.is_match(raw) {
                return false;
            }
            let digits = raw.trim();
            let fits = match integer {
                Primitive::I8 => digits.parse::<i8>().is_ok(),
                Primitive::I16 => digits.parse::<i16>().is_ok(),
                Primitive::I32 => digits.parse::<i32>().is_ok(),
                Primitive::I64 => digits.parse::<i64>().is_ok(),
                Primitive::U8 => digits.parse::<u8>().is_ok(),
                Primitive::U16 => digits.parse::<u16>().is_ok(),
                Primitive::U32 => digits.parse::<u32>().is_ok(),
                Primitive::U64 => digits.parse::<u64>().is_ok(),
                _ => false,
            };
            // "-0" is a valid unsigned value.
            let unsigned = matches!(
                integer,
                Primitive::U8 | Primitive::U16 | Primitive::U32 | Primitive::U64
            );
            let negative_zero = digits
                .strip_prefix('-')
                .is_some_and(|rest| rest.bytes().all(|b| b == b'0'));
            fits || (unsigned && negative_zero)
        }
    }
}

fn parse_float(raw: &str) -> Option<f64> {
    if !FLOAT_LITERAL.is_match(raw) {
        return None;
    }
    raw.trim().parse::<f64>().ok()
}

/// Quote and escape `value` as a string literal.
pub fn string_literal(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\0' => out.push_str("\\0"),
            c if c.is_control() => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}
