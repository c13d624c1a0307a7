use crate::convert::{ConvertContext, ConvertError, ValueConverter};
use crate::types::TypeIdentity;

/// `*`, `<n>*`, `Auto`, or a pixel length.
pub struct GridLengthConverter {
    unit_type: TypeIdentity,
}

impl GridLengthConverter {
    pub fn new(unit_type: TypeIdentity) -> Self {
        Self { unit_type }
    }
}

impl ValueConverter for GridLengthConverter {
    fn convert(&self, raw: &str, ctx: &ConvertContext<'_>) -> Result<String, ConvertError> {
        let length = ctx.render(&ctx.target.identity);
        let unit = ctx.render(&self.unit_type);

        let (value, kind) = if let Some(weight) = raw.strip_suffix('*') {
            let weight = if weight.is_empty() { "1" } else { weight };
            (weight, "Star")
        } else if raw.eq_ignore_ascii_case("auto") {
            ("1", "Auto")
        } else {
            // Pixel lengths are passed through unvalidated.
            (raw, "Pixel")
        };

        Ok(format!("new {}({}, {}.{})", length, value, unit, kind))
    }
}
