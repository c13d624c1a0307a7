use crate::convert::{ConvertContext, ConvertError, ValueConverter};
use crate::types::TypeIdentity;

/// `#AARRGGBB`, `#RRGGBB` and `#RGB` colors as a solid-color brush.
pub struct BrushConverter {
    solid_brush: TypeIdentity,
    color: TypeIdentity,
}

impl BrushConverter {
    pub fn new(solid_brush: TypeIdentity, color: TypeIdentity) -> Self {
        Self { solid_brush, color }
    }
}

impl ValueConverter for BrushConverter {
    fn convert(&self, raw: &str, ctx: &ConvertContext<'_>) -> Result<String, ConvertError> {
        let argb = normalize_hex_color(raw)
            .ok_or_else(|| ctx.reject(raw, "expected #RGB, #RRGGBB or #AARRGGBB"))?;
        Ok(format!(
            "new {}(new {}(0x{}))",
            ctx.render(&self.solid_brush),
            ctx.render(&self.color),
            argb
        ))
    }
}

/// Expand a `#`-prefixed hex color to its 8-digit ARGB form. Missing alpha is
/// fully opaque; 3-digit shorthand duplicates each nibble.
pub fn normalize_hex_color(raw: &str) -> Option<String> {
    let hex = raw.strip_prefix('#')?;
    if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }

    match hex.len() {
        8 => Some(hex.to_string()),
        6 => Some(format!("FF{}", hex)),
        3 => {
            let mut argb = String::from("FF");
            for c in hex.chars() {
                argb.push(c);
                argb.push(c);
            }
            Some(argb)
        }
        _ => None,
    }
}
