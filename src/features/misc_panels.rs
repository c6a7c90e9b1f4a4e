//! Panels with no workflow behind them: scaffolds shared by whole tool
//! families, the generic placeholder, and the small built-in custom tools.

use crate::catalog::ToolDescriptor;
use crate::dispatch::{CustomTool, ScaffoldKind};
use crate::ui::{node, Button as UiButton, Column as UiColumn, Text as UiText, TextInput};
use serde_json::Value;

impl ScaffoldKind {
    pub fn heading(self) -> &'static str {
        match self {
            ScaffoldKind::UnitConverter => "Unit Converter",
            ScaffoldKind::Calculator => "Calculator",
            ScaffoldKind::GenericGenerator => "Generator",
            ScaffoldKind::TextProcessor => "Text Processor",
            ScaffoldKind::SecurityTool => "Security Tool",
            ScaffoldKind::SocialMediaTool => "Social Media Tool",
        }
    }
}

pub fn render_scaffold(tool: &ToolDescriptor, kind: ScaffoldKind) -> Value {
    let loaded = format!("{} logic loaded...", tool.name);
    let children = vec![
        node(UiText::new(kind.heading()).size(14.0)),
        node(UiText::new(&loaded).content_description("scaffold_status")),
    ];
    node(UiColumn::new(children).padding(16).content_description("scaffold_panel"))
}

pub fn render_placeholder(tool: &ToolDescriptor) -> Value {
    let body = format!("The {} interface is active and ready for your task.", tool.name);
    let children = vec![
        node(UiText::new(&tool.icon).size(32.0)),
        node(UiText::new("Tool Module Ready").size(18.0)),
        node(UiText::new(&body)),
    ];
    node(UiColumn::new(children).padding(16).content_description("placeholder_panel"))
}

pub fn render_not_found(tool_id: &str) -> Value {
    let children = vec![
        node(UiText::new("Tool definition not found.").size(16.0)),
        node(UiText::new(tool_id).size(12.0).content_description("missing_tool_id")),
    ];
    node(UiColumn::new(children).padding(16))
}

/// Pretty-prints `raw` with two-space indentation, or reports where parsing
/// stopped.
pub fn format_json(raw: &str) -> Result<String, String> {
    let value: Value = serde_json::from_str(raw)
        .map_err(|e| format!("Invalid JSON at line {}, column {}: {}", e.line(), e.column(), e))?;
    serde_json::to_string_pretty(&value).map_err(|e| e.to_string())
}

/// Input and output of the JSON formatter, kept by the router between renders.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JsonFormatterState {
    pub input: String,
    pub output: Option<Result<String, String>>,
}

impl JsonFormatterState {
    pub fn apply(&mut self, raw: &str) {
        self.input = raw.to_string();
        self.output = Some(format_json(raw));
    }
}

pub fn render_custom(tool: &ToolDescriptor, custom: CustomTool, json: &JsonFormatterState) -> Value {
    let mut children = vec![node(UiText::new(custom.title()).size(16.0))];
    match custom {
        CustomTool::JsonFormatter => {
            children.push(node(
                TextInput::new("json_input")
                    .text(&json.input)
                    .hint("Paste JSON here"),
            ));
            children.push(node(UiButton::new("Format", "json_format").id("json_format")));
            match &json.output {
                Some(Ok(pretty)) => {
                    children.push(node(UiText::new(pretty).content_description("json_output")))
                }
                Some(Err(err)) => {
                    children.push(node(UiText::new(err).content_description("json_error")))
                }
                None => {}
            }
        }
        _ => {
            let loaded = format!("{} logic loaded...", tool.name);
            children.push(node(UiText::new(&loaded).content_description("custom_status")));
        }
    }
    node(UiColumn::new(children).padding(16))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;

    #[test]
    fn scaffold_names_the_tool() {
        let tool = Catalog::builtin().find("length-conv").cloned().unwrap();
        let ui = render_scaffold(&tool, ScaffoldKind::UnitConverter).to_string();
        assert!(ui.contains("Length Converter logic loaded..."));
        assert!(ui.contains("Unit Converter"));
    }

    #[test]
    fn placeholder_mentions_tool_module_ready() {
        let tool = Catalog::builtin().find("pdf-merge").cloned().unwrap();
        let ui = render_placeholder(&tool).to_string();
        assert!(ui.contains("Tool Module Ready"));
        assert!(ui.contains("The Merge PDF interface is active"));
    }

    #[test]
    fn other_custom_tools_report_loaded_logic() {
        let catalog = Catalog::builtin();
        for (id, custom) in [
            ("qr-gen", CustomTool::QrGenerator),
            ("pass-gen", CustomTool::PasswordGenerator),
        ] {
            let tool = catalog.find(id).cloned().unwrap();
            let ui = render_custom(&tool, custom, &JsonFormatterState::default()).to_string();
            assert!(ui.contains(&format!("{} logic loaded...", tool.name)));
            assert!(!ui.contains("interface is active"));
        }
    }

    #[test]
    fn json_formatter_pretty_prints_or_reports_position() {
        assert_eq!(format_json(r#"{"a":[1,2]}"#).unwrap(), "{\n  \"a\": [\n    1,\n    2\n  ]\n}");
        let err = format_json("{\"a\":").unwrap_err();
        assert!(err.starts_with("Invalid JSON at line 1"));

        let mut state = JsonFormatterState::default();
        state.apply("[]");
        assert_eq!(state.output, Some(Ok("[]".into())));
    }
}
