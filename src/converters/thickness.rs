use crate::convert::{ConvertContext, ConvertError, ValueConverter};

/// Comma-separated edge lengths: one uniform value, `horizontal,vertical`, or
/// `left,top,right,bottom`.
pub struct ThicknessConverter;

impl ValueConverter for ThicknessConverter {
    fn convert(&self, raw: &str, ctx: &ConvertContext<'_>) -> Result<String, ConvertError> {
        let clean: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
        let parts: Vec<&str> = clean.split(',').collect();

        if parts.iter().any(|part| part.is_empty()) {
            return Err(ctx.reject(raw, "empty thickness component"));
        }

        let args = match parts.as_slice() {
            [uniform] => uniform.to_string(),
            [h, v] => format!("{h}, {v}, {h}, {v}"),
            [l, t, r, b] => format!("{l}, {t}, {r}, {b}"),
            _ => return Err(ctx.reject(raw, "expected 1, 2 or 4 comma-separated values")),
        };

        Ok(format!("new {}({})", ctx.render(&ctx.target.identity), args))
    }
}
