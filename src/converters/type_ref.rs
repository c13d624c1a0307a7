use crate::convert::{ConvertContext, ConvertError, ValueConverter};
use crate::parse::split_qualified;

/// `prefix:Name` or `Name` as a `typeof(...)` expression. A prefix bound to a
/// concrete namespace qualifies the name; anything else is left unqualified.
pub struct TypeRefConverter;

impl ValueConverter for TypeRefConverter {
    fn convert(&self, raw: &str, ctx: &ConvertContext<'_>) -> Result<String, ConvertError> {
        let (prefix, name) = split_qualified(raw.trim());
        let namespace = prefix
            .and_then(|prefix| ctx.namespaces.resolve(prefix))
            .filter(|binding| !binding.is_wildcard() && !binding.logical_namespace.is_empty())
            .map(|binding| binding.logical_namespace.as_str());

        Ok(match namespace {
            Some(namespace) => format!("typeof({}.{})", namespace, name),
            None => format!("typeof({})", name),
        })
    }
}
