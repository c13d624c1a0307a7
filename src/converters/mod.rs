//! Built-in value converters for the object model's structured types.

mod brush;
mod grid_length;
mod thickness;
mod type_ref;

pub use brush::{normalize_hex_color, BrushConverter};
pub use grid_length::GridLengthConverter;
pub use thickness::ThicknessConverter;
pub use type_ref::TypeRefConverter;
