use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ToolCategory {
    #[serde(rename = "Image Tools")]
    ImageTools,
    #[serde(rename = "SEO Tools")]
    SeoTools,
    #[serde(rename = "Text Tools")]
    TextTools,
    #[serde(rename = "Developer Tools")]
    DevTools,
    #[serde(rename = "Math & Calculators")]
    MathCalculators,
    #[serde(rename = "Unit Converters")]
    UnitConverters,
    #[serde(rename = "Security & Encryption")]
    SecurityEncryption,
    #[serde(rename = "Social Media")]
    SocialMedia,
    #[serde(rename = "Miscellaneous")]
    Miscellaneous,
    #[serde(rename = "PDF Tools")]
    PdfTools,
    #[serde(rename = "Video Tools")]
    VideoTools,
}

impl ToolCategory {
    pub const ALL: [ToolCategory; 11] = [
        ToolCategory::ImageTools,
        ToolCategory::SeoTools,
        ToolCategory::TextTools,
        ToolCategory::DevTools,
        ToolCategory::MathCalculators,
        ToolCategory::UnitConverters,
        ToolCategory::SecurityEncryption,
        ToolCategory::SocialMedia,
        ToolCategory::Miscellaneous,
        ToolCategory::PdfTools,
        ToolCategory::VideoTools,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ToolCategory::ImageTools => "Image Tools",
            ToolCategory::SeoTools => "SEO Tools",
            ToolCategory::TextTools => "Text Tools",
            ToolCategory::DevTools => "Developer Tools",
            ToolCategory::MathCalculators => "Math & Calculators",
            ToolCategory::UnitConverters => "Unit Converters",
            ToolCategory::SecurityEncryption => "Security & Encryption",
            ToolCategory::SocialMedia => "Social Media",
            ToolCategory::Miscellaneous => "Miscellaneous",
            ToolCategory::PdfTools => "PDF Tools",
            ToolCategory::VideoTools => "Video Tools",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        let wanted = label.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.label().eq_ignore_ascii_case(wanted))
    }
}

impl fmt::Display for ToolCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Category filter chosen in the shell; `All` shows every tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CategoryFilter {
    #[default]
    All,
    Only(ToolCategory),
}

impl CategoryFilter {
    pub fn parse(raw: &str) -> Option<Self> {
        if raw.trim().eq_ignore_ascii_case("all") {
            return Some(CategoryFilter::All);
        }
        ToolCategory::from_label(raw).map(CategoryFilter::Only)
    }

    pub fn admits(self, category: ToolCategory) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::Only(only) => only == category,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub id: String,
    pub name: String,
    pub description: String,
    pub category: ToolCategory,
    pub icon: String,
}

impl ToolDescriptor {
    pub fn new(
        id: &str,
        name: &str,
        description: &str,
        category: ToolCategory,
        icon: &str,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: description.into(),
            category,
            icon: icon.into(),
        }
    }

    fn matches_query(&self, needle: &str) -> bool {
        self.name.to_lowercase().contains(needle)
            || self.description.to_lowercase().contains(needle)
    }
}

/// Read-only, ordered tool list.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    tools: Vec<ToolDescriptor>,
}

impl Catalog {
    pub fn new(tools: Vec<ToolDescriptor>) -> Self {
        Self { tools }
    }

    pub fn builtin() -> Self {
        Self::new(builtin_tools())
    }

    pub fn tools(&self) -> &[ToolDescriptor] {
        &self.tools
    }

    pub fn find(&self, id: &str) -> Option<&ToolDescriptor> {
        self.tools.iter().find(|t| t.id == id)
    }

    /// Tools visible for a search query and category filter, catalog order kept.
    pub fn filter(&self, query: &str, category: CategoryFilter) -> Vec<&ToolDescriptor> {
        let needle = query.trim().to_lowercase();
        self.tools
            .iter()
            .filter(|t| category.admits(t.category))
            .filter(|t| needle.is_empty() || t.matches_query(&needle))
            .collect()
    }

    pub fn group_by_category<'a>(
        tools: &[&'a ToolDescriptor],
    ) -> BTreeMap<ToolCategory, Vec<&'a ToolDescriptor>> {
        let mut grouped: BTreeMap<ToolCategory, Vec<&ToolDescriptor>> = BTreeMap::new();
        for tool in tools {
            grouped.entry(tool.category).or_default().push(tool);
        }
        grouped
    }
}

fn builtin_tools() -> Vec<ToolDescriptor> {
    use ToolCategory::*;
    let rows: &[(&str, &str, &str, ToolCategory, &str)] = &[
        ("ai-chat", "AI Chat Assistant", "Ask anything and get instant answers", Miscellaneous, "🤖"),
        ("video-gen", "AI Video Generator", "Turn a text prompt into a short video", VideoTools, "🎬"),
        ("video-trim", "Video Trimmer", "Cut a clip down to the part you need", VideoTools, "✂️"),
        ("pdf-merge", "Merge PDF", "Combine several PDFs into one document", PdfTools, "📑"),
        ("pdf-resizer", "PDF Page Resizer", "Change page size to A4, Letter or half scale", PdfTools, "📐"),
        ("pdf-compress", "Compress PDF", "Shrink a PDF for sharing", PdfTools, "🗜️"),
        ("pdf-reduce", "Reduce PDF Size", "Re-encode a PDF to save space", PdfTools, "📉"),
        ("pdf-to-excel", "PDF to Excel", "Extract tables into a spreadsheet", PdfTools, "📊"),
        ("pdf-reader", "PDF Reader", "Preview a PDF in the browser", PdfTools, "📖"),
        ("pdf-to-word", "PDF to Word", "Turn a PDF into an editable document", PdfTools, "📝"),
        ("pdf-unlock", "Unlock PDF", "Remove restrictions from a PDF", PdfTools, "🔓"),
        ("json-format", "JSON Formatter", "Pretty-print and validate JSON", DevTools, "🧾"),
        ("qr-gen", "QR Code Generator", "Create a QR code for any text or URL", ImageTools, "🔳"),
        ("img-base64", "Image to Base64", "Encode an image as a data URI", ImageTools, "🖼️"),
        ("color-picker", "Color Picker", "Pick colors and copy HEX or RGB", DevTools, "🎨"),
        ("pass-gen", "Password Generator", "Generate strong random passwords", SecurityEncryption, "🔑"),
        ("length-conv", "Length Converter", "Meters, feet, miles and more", UnitConverters, "📏"),
        ("unit-temperature", "Temperature Converter", "Celsius, Fahrenheit, Kelvin", UnitConverters, "🌡️"),
        ("weight-conv", "Weight Converter", "Kilograms, pounds, ounces", UnitConverters, "⚖️"),
        ("age-calc", "Age Calculator", "Exact age in years, months and days", MathCalculators, "🎂"),
        ("emi-calculator", "EMI Calculator", "Monthly loan installments", MathCalculators, "🏦"),
        ("bmi-check", "BMI Checker", "Body mass index from height and weight", MathCalculators, "💪"),
        ("percentage-calc", "Percentage Calculator", "Percent of, change and difference", MathCalculators, "➗"),
        ("lorem-ipsum", "Lorem Ipsum", "Placeholder text for layouts", TextTools, "📄"),
        ("random-number", "Random Number Picker", "Pick numbers in a range", Miscellaneous, "🎲"),
        ("meta-tag-gen", "Meta Tag Generator", "SEO meta tags for a page", SeoTools, "🏷️"),
        ("word-counter", "Word Counter", "Count words and reading time", TextTools, "🔢"),
        ("char-counter", "Character Counter", "Count characters with and without spaces", TextTools, "🔤"),
        ("case-converter", "Case Converter", "UPPER, lower, Title and more", TextTools, "🔠"),
        ("url-encoder", "URL Encoder", "Percent-encode and decode URLs", DevTools, "🔗"),
        ("hash-checker", "Hash Checker", "Compare file and text digests", SecurityEncryption, "#️⃣"),
        ("md5-tool", "MD5 Digest", "Legacy MD5 checksum", SecurityEncryption, "🧮"),
        ("ssl-checker", "SSL Checker", "Inspect a site's certificate", SecurityEncryption, "🔒"),
        ("ip-lookup", "IP Lookup", "Locate an IP address", SecurityEncryption, "🌐"),
        ("yt-thumbnail", "YouTube Thumbnail", "Grab a video's thumbnail", SocialMedia, "▶️"),
        ("insta-saver", "Instagram Saver", "Save public posts", SocialMedia, "📸"),
        ("tiktok-download", "TikTok Downloader", "Save videos without watermark", SocialMedia, "🎵"),
        ("keyword-density", "Keyword Density", "Find overused keywords in copy", SeoTools, "🔍"),
        ("image-compressor", "Image Compressor", "Reduce image file size", ImageTools, "🗜️"),
        ("stopwatch", "Stopwatch", "Lap timer in your browser", Miscellaneous, "⏱️"),
    ];
    rows.iter()
        .map(|(id, name, description, category, icon)| {
            ToolDescriptor::new(id, name, description, *category, icon)
        })
        .collect()
}
