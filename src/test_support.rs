use std::sync::Arc;

use crate::adapter::ModuleCache;
use crate::compile::{CompileOutput, MarkupCompiler};
use crate::error::CompilerError;
use crate::module::InMemoryLoader;
use crate::options::{CompileOptions, ObjectModel};

pub const DEFAULT_URI: &str = "http://hexaengine.com/ui/v0/xaml";
pub const WIDGETS_URI: &str = "module-namespace:Demo.Controls.Widgets;module=Demo.Controls";

pub const UI_SCHEMA: &str = r#"{
    "module": "HexaEngine.UI",
    "types": [
        { "namespace": "HexaEngine.UI", "name": "Thickness" },
        { "namespace": "HexaEngine.UI", "name": "Visibility", "kind": "enum" },
        {
            "namespace": "HexaEngine.UI",
            "name": "UIElement",
            "bindable": true,
            "properties": [
                { "name": "Width", "type": "float" },
                { "name": "Height", "type": "float" },
                { "name": "Margin", "type": "Thickness" },
                { "name": "IsEnabled", "type": "bool" },
                { "name": "Visibility", "type": "Visibility" },
                { "name": "Tag", "type": "object" }
            ],
            "events": [ { "name": "Loaded", "handlerType": "System.EventHandler" } ],
            "routedEvents": [ { "name": "MouseDown", "field": "MouseDownEvent" } ]
        },
        { "namespace": "HexaEngine.UI.Graphics", "name": "Brush" },
        { "namespace": "HexaEngine.UI.Graphics", "name": "SolidColorBrush", "base": "Brush" },
        { "namespace": "HexaEngine.UI.Controls", "name": "GridLength" },
        { "namespace": "HexaEngine.UI.Controls", "name": "GridUnitType", "kind": "enum" },
        { "namespace": "HexaEngine.UI.Controls", "name": "Orientation", "kind": "enum" },
        { "namespace": "HexaEngine.UI.Controls", "name": "UIElementCollection", "kind": "collection" },
        { "namespace": "HexaEngine.UI.Controls", "name": "RowDefinitionCollection", "kind": "collection" },
        { "namespace": "HexaEngine.UI.Controls", "name": "ColumnDefinitionCollection", "kind": "collection" },
        {
            "namespace": "HexaEngine.UI.Controls",
            "name": "RowDefinition",
            "properties": [ { "name": "Height", "type": "GridLength" } ]
        },
        {
            "namespace": "HexaEngine.UI.Controls",
            "name": "ColumnDefinition",
            "properties": [ { "name": "Width", "type": "GridLength" } ]
        },
        {
            "namespace": "HexaEngine.UI.Controls",
            "name": "Panel",
            "base": "HexaEngine.UI.UIElement",
            "contentProperty": "Children",
            "properties": [
                { "name": "Children", "type": "UIElementCollection" },
                { "name": "Background", "type": "HexaEngine.UI.Graphics.Brush" }
            ]
        },
        {
            "namespace": "HexaEngine.UI.Controls",
            "name": "Grid",
            "base": "Panel",
            "properties": [
                { "name": "RowDefinitions", "type": "RowDefinitionCollection" },
                { "name": "ColumnDefinitions", "type": "ColumnDefinitionCollection" }
            ],
            "attachedProperties": [
                { "name": "Row", "field": "RowProperty", "type": "int" },
                { "name": "Column", "field": "ColumnProperty", "type": "int" }
            ]
        },
        {
            "namespace": "HexaEngine.UI.Controls",
            "name": "StackPanel",
            "base": "Panel",
            "properties": [ { "name": "Orientation", "type": "Orientation" } ]
        },
        {
            "namespace": "HexaEngine.UI.Controls",
            "name": "ContentControl",
            "base": "HexaEngine.UI.UIElement",
            "contentProperty": "Content",
            "properties": [ { "name": "Content", "type": "object" } ]
        },
        {
            "namespace": "HexaEngine.UI.Controls",
            "name": "Button",
            "base": "ContentControl",
            "events": [ { "name": "Click" } ]
        },
        {
            "namespace": "HexaEngine.UI.Controls",
            "name": "Window",
            "base": "ContentControl",
            "properties": [ { "name": "Title", "type": "string" } ]
        },
        {
            "namespace": "HexaEngine.UI.Controls",
            "name": "TextBlock",
            "base": "HexaEngine.UI.UIElement",
            "contentProperty": "Text",
            "properties": [
                { "name": "Text", "type": "string" },
                { "name": "FontSize", "type": "float" }
            ]
        },
        {
            "namespace": "HexaEngine.UI.Controls",
            "name": "Border",
            "base": "HexaEngine.UI.UIElement",
            "contentProperty": "Child",
            "properties": [
                { "name": "Child", "type": "HexaEngine.UI.UIElement" },
                { "name": "BorderThickness", "type": "HexaEngine.UI.Thickness" },
                { "name": "Background", "type": "HexaEngine.UI.Graphics.Brush" }
            ]
        },
        {
            "namespace": "HexaEngine.UI.Controls",
            "name": "Image",
            "base": "HexaEngine.UI.UIElement"
        },
        {
            "namespace": "HexaEngine.UI.Controls",
            "name": "ItemList",
            "base": "HexaEngine.UI.UIElement",
            "properties": [ { "name": "ItemType", "type": "System.Type" } ]
        }
    ]
}"#;

pub const WIDGETS_SCHEMA: &str = r#"{
    "module": "Demo.Controls",
    "types": [
        { "namespace": "Demo.Controls.Widgets", "name": "GaugeMode", "kind": "enum" },
        {
            "namespace": "Demo.Controls.Widgets",
            "name": "Gauge",
            "bindable": true,
            "properties": [
                { "name": "Value", "type": "double" },
                { "name": "Maximum", "type": "decimal" },
                { "name": "Count", "type": "uint" },
                { "name": "Mode", "type": "GaugeMode" }
            ],
            "routedEvents": [ { "name": "ValueChanged", "field": "ValueChangedEvent" } ]
        }
    ]
}"#;

pub fn loader() -> InMemoryLoader {
    InMemoryLoader::new()
        .with_module("HexaEngine.UI", UI_SCHEMA)
        .with_module("Demo.Controls", WIDGETS_SCHEMA)
}

/// A cache private to one test, so tests never share loaded modules.
pub fn module_cache() -> Arc<ModuleCache> {
    Arc::new(ModuleCache::new(Arc::new(loader())))
}

pub fn compiler() -> MarkupCompiler {
    MarkupCompiler::new(module_cache(), ObjectModel::default())
}

pub fn compile(markup: &str) -> Result<CompileOutput, CompilerError> {
    compiler().compile(markup, &CompileOptions::new("Page1", "App"))
}

/// Wrap `body` in a default-namespace root element.
pub fn window(body: &str) -> String {
    format!(r#"<Window xmlns="{}" xmlns:w="{}">{}</Window>"#, DEFAULT_URI, WIDGETS_URI, body)
}

/// Statements of `InitializeComponent`, trimmed, in emitted order.
pub fn statements(markup: &str) -> Vec<String> {
    let output = compile(markup).unwrap_or_else(|e| panic!("compile failed: {}", e));
    method_body(&output.code)
}

pub fn method_body(code: &str) -> Vec<String> {
    let mut lines = code.lines();
    for line in lines.by_ref() {
        if line.trim() == "public override void InitializeComponent()" {
            break;
        }
    }
    lines.next(); // opening brace

    lines
        .take_while(|line| *line != "        }")
        .map(|line| line.trim().to_string())
        .collect()
}
