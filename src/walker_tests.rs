//! Tree Walker Tests
//!
//! Statement emission for each element, attribute and text shape the walker
//! handles, plus the fatal conditions it raises:
//! - MG-ERR-TYPE-001 / MG-ERR-MEMBER-001: unresolved tags and attributes
//! - MG-ERR-CONTENT-001 / MG-ERR-CONTENT-002: content with nowhere to go
//! - MG-ERR-VALUE-001 / MG-ERR-VALUE-002: values that cannot be converted

#[cfg(test)]
mod tests {
    use crate::adapter::TypeSystemAdapter;
    use crate::convert::ConverterRegistry;
    use crate::error::CompileError;
    use crate::namespace::NamespaceRegistry;
    use crate::options::ObjectModel;
    use crate::test_support::{compile, module_cache, statements, window, DEFAULT_URI};
    use crate::walker::TreeWalker;
    use crate::writer::{CodeWriter, TypeNamer};

    fn lines(expected: &[&str]) -> Vec<String> {
        expected.iter().map(|s| s.to_string()).collect()
    }

    fn error_of(markup: &str) -> crate::error::CompilerError {
        match compile(markup) {
            Ok(output) => panic!("expected failure, got:\n{}", output.code),
            Err(err) => err,
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // ELEMENTS
    // ═══════════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_root_attributes_target_this() {
        let markup = format!(
            r#"<Window xmlns="{}" Title="Main &amp; Only" Width="800"/>"#,
            DEFAULT_URI
        );
        assert_eq!(
            statements(&markup),
            lines(&["this.Title = \"Main & Only\";", "this.Width = 800;"])
        );
    }

    #[test]
    fn test_unnamed_children_get_numbered_locals() {
        let markup = window("<StackPanel><Button/><Button/></StackPanel>");
        assert_eq!(
            statements(&markup),
            lines(&[
                "StackPanel element0 = new();",
                "Button element1 = new();",
                "element0.Children.Add(element1);",
                "Button element2 = new();",
                "element0.Children.Add(element2);",
                "this.Content = element0;",
            ])
        );
    }

    #[test]
    fn test_module_namespace_types_are_qualified() {
        let markup = window(r#"<w:Gauge Value="0.5" Count="3" Maximum="100.25"/>"#);
        assert_eq!(
            statements(&markup),
            lines(&[
                "Demo.Controls.Widgets.Gauge element0 = new();",
                "element0.Value = 0.5;",
                "element0.Count = 3;",
                "element0.Maximum = 100.25;",
                "this.Content = element0;",
            ])
        );
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // ATTRIBUTES AND EVENTS
    // ═══════════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_attached_properties_and_deferred_handlers() {
        let markup = window(
            r#"<Grid><Button Grid.Row="1" Click="OnClick" MouseDown="OnDown" Width="20"/></Grid>"#,
        );
        assert_eq!(
            statements(&markup),
            lines(&[
                "Grid element0 = new();",
                "Button element1 = new();",
                "element1.SetValue(Grid.RowProperty, 1);",
                "element1.Width = 20;",
                "element0.Children.Add(element1);",
                "this.Content = element0;",
                "element1.Click += OnClick;",
                "element1.AddHandler(UIElement.MouseDownEvent, OnDown);",
            ])
        );
    }

    #[test]
    fn test_routed_event_from_prefixed_module() {
        let markup = window(r#"<w:Gauge ValueChanged="OnChanged"/>"#);
        let body = statements(&markup);
        assert_eq!(
            body.last().map(String::as_str),
            Some("element0.AddHandler(Demo.Controls.Widgets.Gauge.ValueChangedEvent, OnChanged);")
        );
    }

    #[test]
    fn test_member_reached_through_base_type_owner() {
        let markup = window(r#"<Button UIElement.Width="5" UIElement.Loaded="OnLoaded"/>"#);
        let body = statements(&markup);
        assert!(body.contains(&"element0.Width = 5;".to_string()));
        assert_eq!(body.last().map(String::as_str), Some("element0.Loaded += OnLoaded;"));
    }

    #[test]
    fn test_unrelated_owner_member_is_rejected() {
        // Grid has a Background property; Button does not.
        let err = error_of(&window(r##"<Grid><Button Grid.Background="#F00"/></Grid>"##));
        match &err.kind {
            CompileError::MemberNotFound { type_name, member } => {
                assert_eq!(type_name, "HexaEngine.UI.Controls.Button");
                assert_eq!(member, "Grid.Background");
            }
            other => panic!("unexpected error {:?}", other),
        }
        assert_eq!(err.attribute.as_deref(), Some("Grid.Background"));

        let err = error_of(&window(r#"<TextBlock Button.Click="OnClick"/>"#));
        assert!(matches!(err.kind, CompileError::MemberNotFound { .. }));
    }

    #[test]
    fn test_attached_member_on_prefixed_element() {
        let markup = window(r#"<Grid><w:Gauge Grid.Row="1"/></Grid>"#);
        assert_eq!(
            statements(&markup),
            lines(&[
                "Grid element0 = new();",
                "Demo.Controls.Widgets.Gauge element1 = new();",
                "element1.SetValue(Grid.RowProperty, 1);",
                "element0.Children.Add(element1);",
                "this.Content = element0;",
            ])
        );
    }

    #[test]
    fn test_prefixed_owner_on_default_element() {
        let markup = window(r#"<Button w:Gauge.ValueChanged="OnChanged"/>"#);
        assert_eq!(
            statements(&markup).last().map(String::as_str),
            Some("element0.AddHandler(Demo.Controls.Widgets.Gauge.ValueChangedEvent, OnChanged);")
        );
    }

    #[test]
    fn test_structured_values() {
        let markup = window(
            r##"<Border Background="#F00" BorderThickness="1,2" Margin="4" Visibility="Hidden" IsEnabled="False" Width=""/>"##,
        );
        assert_eq!(
            statements(&markup),
            lines(&[
                "Border element0 = new();",
                "element0.Background = new SolidColorBrush(new Color(0xFFFF0000));",
                "element0.BorderThickness = new Thickness(1, 2, 1, 2);",
                "element0.Margin = new Thickness(4);",
                "element0.Visibility = Visibility.Hidden;",
                "element0.IsEnabled = false;",
                "element0.Width = null;",
                "this.Content = element0;",
            ])
        );
    }

    #[test]
    fn test_module_enum_values_are_qualified() {
        let markup = window(r#"<w:Gauge Mode="Fast"/>"#);
        assert!(statements(&markup)
            .contains(&"element0.Mode = Demo.Controls.Widgets.GaugeMode.Fast;".to_string()));
    }

    #[test]
    fn test_type_reference_values() {
        let markup = window(r#"<ItemList ItemType="w:Gauge"/>"#);
        assert!(statements(&markup)
            .contains(&"element0.ItemType = typeof(Demo.Controls.Widgets.Gauge);".to_string()));
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // PROPERTY ELEMENTS AND TEXT
    // ═══════════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_collection_property_element_inlines_definitions() {
        let markup = window(
            r#"<Grid>
                <Grid.RowDefinitions>
                    <RowDefinition Height="*"/>
                    <RowDefinition Height="Auto"></RowDefinition>
                    <RowDefinition/>
                </Grid.RowDefinitions>
            </Grid>"#,
        );
        assert_eq!(
            statements(&markup),
            lines(&[
                "Grid element0 = new();",
                "element0.RowDefinitions.Add(new RowDefinition()",
                "{",
                "Height = new GridLength(1, GridUnitType.Star),",
                "});",
                "element0.RowDefinitions.Add(new RowDefinition()",
                "{",
                "Height = new GridLength(1, GridUnitType.Auto),",
                "});",
                "element0.RowDefinitions.Add(new RowDefinition());",
                "this.Content = element0;",
            ])
        );
    }

    #[test]
    fn test_named_element_wins_over_inlining() {
        let markup = window(r#"<Grid><Grid.Children><Button Name="ok"/></Grid.Children></Grid>"#);
        assert_eq!(
            statements(&markup),
            lines(&[
                "Grid element0 = new();",
                "ok = new Button();",
                "element0.Children.Add(ok);",
                "this.Content = element0;",
            ])
        );
    }

    #[test]
    fn test_single_value_property_element_assigns() {
        let markup = window("<Border><Border.Child><Button/></Border.Child></Border>");
        assert_eq!(
            statements(&markup),
            lines(&[
                "Border element0 = new();",
                "Button element1 = new();",
                "element0.Child = element1;",
                "this.Content = element0;",
            ])
        );
    }

    #[test]
    fn test_self_closing_property_element_is_ignored() {
        let markup = window("<Grid><Grid.RowDefinitions/></Grid>");
        assert_eq!(
            statements(&markup),
            lines(&["Grid element0 = new();", "this.Content = element0;"])
        );
    }

    #[test]
    fn test_text_targets_content_property() {
        let markup = window(r#"<TextBlock>  Say "hi"  </TextBlock>"#);
        assert_eq!(
            statements(&markup),
            lines(&[
                "TextBlock element0 = new();",
                "element0.Text = \"Say \\\"hi\\\"\";",
                "this.Content = element0;",
            ])
        );
    }

    #[test]
    fn test_text_inside_property_element() {
        let markup = window("<TextBlock><TextBlock.Text>Hi</TextBlock.Text></TextBlock>");
        assert!(statements(&markup).contains(&"element0.Text = \"Hi\";".to_string()));
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // FATAL CONDITIONS
    // ═══════════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_unknown_member_is_located() {
        let err = error_of(&window(r#"<Button Colour="Red"/>"#));
        assert!(matches!(err.kind, CompileError::MemberNotFound { .. }));
        assert_eq!(err.element.as_deref(), Some("Button"));
        assert_eq!(err.attribute.as_deref(), Some("Colour"));
        assert!(err.offset.is_some());
    }

    #[test]
    fn test_unknown_types() {
        let err = error_of(&window("<Nope/>"));
        assert!(matches!(err.kind, CompileError::TypeNotFound { .. }));

        let err = error_of(&window("<x:Button/>"));
        assert!(matches!(err.kind, CompileError::TypeNotFound { .. }));

        let err = error_of(&window(r#"<Button Dock.Left="1"/>"#));
        assert!(matches!(err.kind, CompileError::TypeNotFound { .. }));
    }

    #[test]
    fn test_unknown_property_element_member() {
        let err = error_of(&window("<Grid><Grid.Rows></Grid.Rows></Grid>"));
        assert!(matches!(err.kind, CompileError::MemberNotFound { .. }));
    }

    #[test]
    fn test_content_without_content_property() {
        let err = error_of(&window("<Image>caption</Image>"));
        assert!(matches!(err.kind, CompileError::NoContentProperty { .. }));

        let err = error_of(&window("<Image><Button/></Image>"));
        assert!(matches!(err.kind, CompileError::NoContentProperty { .. }));
    }

    #[test]
    fn test_definition_elements_hold_no_content() {
        let err = error_of(&window(
            "<Grid><Grid.RowDefinitions><RowDefinition><Button/></RowDefinition></Grid.RowDefinitions></Grid>",
        ));
        assert!(matches!(err.kind, CompileError::DefinitionContent { .. }));

        let err = error_of(&window(
            "<Grid><Grid.RowDefinitions><RowDefinition>text</RowDefinition></Grid.RowDefinitions></Grid>",
        ));
        assert!(matches!(err.kind, CompileError::DefinitionContent { .. }));
    }

    #[test]
    fn test_invalid_values() {
        let err = error_of(&window(r#"<Button Width="wide"/>"#));
        match err.kind {
            CompileError::UnconvertibleValue {
                property, value, ..
            } => {
                assert_eq!(property, "Width");
                assert_eq!(value, "wide");
            }
            other => panic!("unexpected error {:?}", other),
        }

        let err = error_of(&window(r#"<w:Gauge Count="-1"/>"#));
        assert!(matches!(err.kind, CompileError::UnconvertibleValue { .. }));

        let err = error_of(&window(r#"<Border Background="red"/>"#));
        assert!(matches!(err.kind, CompileError::UnconvertibleValue { .. }));

        let err = error_of(&window(r#"<Button Tag="x"/>"#));
        assert!(matches!(err.kind, CompileError::NoConverterForType { .. }));
    }

    #[test]
    fn test_walk_rejects_unclosed_elements() {
        let model = ObjectModel::default();
        let adapter = TypeSystemAdapter::new(module_cache());
        let converters = ConverterRegistry::with_defaults(&model);
        let mut namespaces = NamespaceRegistry::new(&model.default_uri, &model.default_module);
        namespaces.register("", DEFAULT_URI).unwrap();
        let namer = TypeNamer::new(model.usings.clone());
        let root = adapter
            .resolve_type(&namespaces, "", "Window")
            .unwrap()
            .unwrap();

        let walker = TreeWalker::new(&adapter, &converters, &namespaces, &namer, &model, root);
        let mut writer = CodeWriter::new("App", &[]);
        let markup = format!(r#"<Window xmlns="{}"><StackPanel><Button/>"#, DEFAULT_URI);
        let err = walker.walk(&markup, &mut writer).unwrap_err();
        match err.kind {
            CompileError::UnclosedElement { element } => assert_eq!(element, "StackPanel"),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_inline_definition_attributes_are_checked() {
        let err = error_of(&window(
            r#"<Grid><Grid.RowDefinitions><RowDefinition Size="1"/></Grid.RowDefinitions></Grid>"#,
        ));
        assert!(matches!(err.kind, CompileError::MemberNotFound { .. }));
        assert_eq!(err.attribute.as_deref(), Some("Size"));
    }
}
