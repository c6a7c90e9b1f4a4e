//! Maps a tool id to the handler that owns its panel.
//!
//! Resolution walks [`DISPATCH_RULES`] top to bottom and stops at the first
//! match: reserved exact ids, then the `video-` and `pdf-` prefixes, then the
//! keyword heuristics, then the placeholder default. The order is part of the
//! contract; a reserved id always wins over any prefix or keyword it contains.

use crate::catalog::{Catalog, ToolDescriptor};
use crate::error::{ToolboxError, ToolboxResult};
use serde::Serialize;

/// Fully built tools that bypass every pattern rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CustomTool {
    AiChat,
    JsonFormatter,
    QrGenerator,
    ImageToBase64,
    ColorPicker,
    PasswordGenerator,
}

impl CustomTool {
    pub fn title(self) -> &'static str {
        match self {
            CustomTool::AiChat => "AI Chat",
            CustomTool::JsonFormatter => "JSON Formatter",
            CustomTool::QrGenerator => "QR Code Generator",
            CustomTool::ImageToBase64 => "Image to Base64",
            CustomTool::ColorPicker => "Color Picker",
            CustomTool::PasswordGenerator => "Password Generator",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum VideoVariant {
    Generate,
    Trim,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PdfOperation {
    Merge,
    Resize,
    Compress,
    ToExcel,
    Reader,
    /// Any other `pdf-*` tool: no real transformation behind it.
    Simulated,
}

impl PdfOperation {
    pub fn from_tool_id(tool_id: &str) -> Self {
        match tool_id {
            "pdf-merge" => PdfOperation::Merge,
            "pdf-resizer" => PdfOperation::Resize,
            "pdf-reduce" | "pdf-compress" => PdfOperation::Compress,
            "pdf-to-excel" => PdfOperation::ToExcel,
            "pdf-reader" => PdfOperation::Reader,
            _ => PdfOperation::Simulated,
        }
    }

    pub fn accepts_multiple_files(self) -> bool {
        matches!(self, PdfOperation::Merge)
    }
}

/// Scaffold-only panels shared by many catalog entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ScaffoldKind {
    UnitConverter,
    Calculator,
    GenericGenerator,
    TextProcessor,
    SecurityTool,
    SocialMediaTool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum HandlerKind {
    Custom(CustomTool),
    Video(VideoVariant),
    Pdf(PdfOperation),
    Scaffold(ScaffoldKind),
    /// "Tool Module Ready" panel.
    Placeholder,
}

#[derive(Debug, Clone, Copy)]
pub enum Matcher {
    Exact(&'static [&'static str]),
    Prefix(&'static str),
    Contains(&'static [&'static str]),
    Always,
}

impl Matcher {
    fn matches(&self, tool_id: &str) -> bool {
        match self {
            Matcher::Exact(ids) => ids.iter().any(|id| *id == tool_id),
            Matcher::Prefix(prefix) => tool_id.starts_with(prefix),
            Matcher::Contains(needles) => needles.iter().any(|n| tool_id.contains(n)),
            Matcher::Always => true,
        }
    }
}

pub struct DispatchRule {
    pub name: &'static str,
    pub matcher: Matcher,
    pub handler: fn(&str) -> HandlerKind,
}

fn custom_handler(tool_id: &str) -> HandlerKind {
    let tool = match tool_id {
        "ai-chat" => CustomTool::AiChat,
        "json-format" => CustomTool::JsonFormatter,
        "qr-gen" => CustomTool::QrGenerator,
        "img-base64" => CustomTool::ImageToBase64,
        "color-picker" => CustomTool::ColorPicker,
        _ => CustomTool::PasswordGenerator,
    };
    HandlerKind::Custom(tool)
}

fn video_handler(tool_id: &str) -> HandlerKind {
    if tool_id == "video-gen" {
        HandlerKind::Video(VideoVariant::Generate)
    } else {
        HandlerKind::Video(VideoVariant::Trim)
    }
}

fn pdf_handler(tool_id: &str) -> HandlerKind {
    HandlerKind::Pdf(PdfOperation::from_tool_id(tool_id))
}

fn unit_handler(_: &str) -> HandlerKind {
    HandlerKind::Scaffold(ScaffoldKind::UnitConverter)
}

fn calculator_handler(_: &str) -> HandlerKind {
    HandlerKind::Scaffold(ScaffoldKind::Calculator)
}

fn generator_handler(_: &str) -> HandlerKind {
    HandlerKind::Scaffold(ScaffoldKind::GenericGenerator)
}

fn text_handler(_: &str) -> HandlerKind {
    HandlerKind::Scaffold(ScaffoldKind::TextProcessor)
}

fn security_handler(_: &str) -> HandlerKind {
    HandlerKind::Scaffold(ScaffoldKind::SecurityTool)
}

fn social_handler(_: &str) -> HandlerKind {
    HandlerKind::Scaffold(ScaffoldKind::SocialMediaTool)
}

fn placeholder_handler(_: &str) -> HandlerKind {
    HandlerKind::Placeholder
}

pub const RESERVED_IDS: &[&str] = &[
    "ai-chat",
    "json-format",
    "qr-gen",
    "img-base64",
    "color-picker",
    "pass-gen",
];

pub static DISPATCH_RULES: &[DispatchRule] = &[
    DispatchRule {
        name: "reserved",
        matcher: Matcher::Exact(RESERVED_IDS),
        handler: custom_handler,
    },
    DispatchRule {
        name: "video",
        matcher: Matcher::Prefix("video-"),
        handler: video_handler,
    },
    DispatchRule {
        name: "pdf",
        matcher: Matcher::Prefix("pdf-"),
        handler: pdf_handler,
    },
    DispatchRule {
        name: "unit",
        matcher: Matcher::Contains(&["-conv", "unit-"]),
        handler: unit_handler,
    },
    DispatchRule {
        name: "calculator",
        matcher: Matcher::Contains(&["calc", "emi", "bmi"]),
        handler: calculator_handler,
    },
    DispatchRule {
        name: "generator",
        matcher: Matcher::Contains(&["gen", "lorem", "random"]),
        handler: generator_handler,
    },
    DispatchRule {
        name: "text",
        matcher: Matcher::Contains(&["word-", "char-", "case-", "text", "url-"]),
        handler: text_handler,
    },
    DispatchRule {
        name: "security",
        matcher: Matcher::Contains(&["hash", "md5", "ssl", "ip-"]),
        handler: security_handler,
    },
    DispatchRule {
        name: "social",
        matcher: Matcher::Contains(&["yt-", "down", "insta-"]),
        handler: social_handler,
    },
    DispatchRule {
        name: "placeholder",
        matcher: Matcher::Always,
        handler: placeholder_handler,
    },
];

/// The first rule that claims `tool_id`. The table ends in `Always`, so this
/// only returns `None` for a table without a default.
pub fn matching_rule<'a>(rules: &'a [DispatchRule], tool_id: &str) -> Option<&'a DispatchRule> {
    rules.iter().find(|rule| rule.matcher.matches(tool_id))
}

pub fn resolve_handler(tool_id: &str) -> HandlerKind {
    matching_rule(DISPATCH_RULES, tool_id)
        .map(|rule| (rule.handler)(tool_id))
        .unwrap_or(HandlerKind::Placeholder)
}

#[derive(Debug, Clone, PartialEq)]
pub struct DispatchResult {
    pub tool: ToolDescriptor,
    pub handler: HandlerKind,
}

pub fn resolve(tool_id: &str, catalog: &Catalog) -> ToolboxResult<DispatchResult> {
    let tool = catalog
        .find(tool_id)
        .ok_or_else(|| ToolboxError::NotFound(tool_id.to_string()))?;
    let handler = resolve_handler(&tool.id);
    if let Some(rule) = matching_rule(DISPATCH_RULES, &tool.id) {
        log::debug!("[dispatch] {} -> {:?} via {}", tool.id, handler, rule.name);
    }
    Ok(DispatchResult {
        tool: tool.clone(),
        handler,
    })
}
