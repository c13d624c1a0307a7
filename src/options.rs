//! Compiler configuration.
//!
//! [`ObjectModel`] names the parts of the target UI framework the generated
//! code depends on. Hosts that target a different framework load their own
//! from JSON; the default describes HexaEngine.UI.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct ObjectModel {
    /// The one xmlns URI accepted besides `module-namespace:` URIs.
    pub default_uri: String,
    /// Module the default URI binds, with wildcard type matching.
    pub default_module: String,
    /// `using` directives written at the top of every output unit.
    pub usings: Vec<String>,
    pub brush: String,
    pub solid_color_brush: String,
    pub color: String,
    pub thickness: String,
    pub grid_length: String,
    pub grid_unit_type: String,
    pub type_reference: String,
    /// Receiver the root element binds to.
    pub self_variable: String,
    /// Attribute that names an element and declares a field for it.
    pub name_attribute: String,
    pub method_header: String,
}

impl Default for ObjectModel {
    fn default() -> Self {
        Self {
            default_uri: "http://hexaengine.com/ui/v0/xaml".to_string(),
            default_module: "HexaEngine.UI".to_string(),
            usings: [
                "System",
                "HexaEngine.UI",
                "HexaEngine.UI.Controls",
                "HexaEngine.UI.Graphics",
                "HexaEngine.UI.Graphics.Text",
                "Hexa.NET.Mathematics",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            brush: "HexaEngine.UI.Graphics.Brush".to_string(),
            solid_color_brush: "HexaEngine.UI.Graphics.SolidColorBrush".to_string(),
            color: "Hexa.NET.Mathematics.Color".to_string(),
            thickness: "HexaEngine.UI.Thickness".to_string(),
            grid_length: "HexaEngine.UI.Controls.GridLength".to_string(),
            grid_unit_type: "HexaEngine.UI.Controls.GridUnitType".to_string(),
            type_reference: "System.Type".to_string(),
            self_variable: "this".to_string(),
            name_attribute: "Name".to_string(),
            method_header: "public override void InitializeComponent()".to_string(),
        }
    }
}

impl ObjectModel {
    /// Parse a JSON override. Missing fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Per-compile inputs besides the markup text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CompileOptions {
    pub class_name: String,
    pub namespace: String,
}

impl CompileOptions {
    pub fn new(class_name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            namespace: namespace.into(),
        }
    }
}
