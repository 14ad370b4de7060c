//! Plain-text to SVG engine.
//!
//! Each line of the document becomes one `<text>` element. Lines are split
//! into pages of `linesPerPage` lines.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{Engine, EngineError};

/// Configuration of [`TextEngine`]. Serialized with camelCase keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TextOptions {
    /// Page width in layout units.
    pub page_width: u32,
    /// Page height in layout units.
    pub page_height: u32,
    /// Output scale in percent.
    pub scale: u32,
    /// Font size in layout units.
    pub font_size: u32,
    /// Distance between baselines in layout units.
    pub line_height: u32,
    /// Margin on every side in layout units.
    pub margin: u32,
    /// Lines per rendered page.
    pub lines_per_page: u32,
}

impl Default for TextOptions {
    fn default() -> Self {
        Self {
            page_width: 2100,
            page_height: 2970,
            scale: 40,
            font_size: 24,
            line_height: 32,
            margin: 100,
            lines_per_page: 80,
        }
    }
}

impl TextOptions {
    fn validate(&self) -> Result<(), EngineError> {
        let positive = [
            ("pageWidth", self.page_width),
            ("pageHeight", self.page_height),
            ("scale", self.scale),
            ("fontSize", self.font_size),
            ("lineHeight", self.line_height),
            ("linesPerPage", self.lines_per_page),
        ];
        for (name, value) in positive {
            if value == 0 {
                return Err(EngineError::InvalidOptions(format!(
                    "'{}' must be greater than zero",
                    name
                )));
            }
        }
        if self.margin.saturating_mul(2) >= self.page_width.min(self.page_height) {
            return Err(EngineError::InvalidOptions(
                "'margin' leaves no room on the page".to_string(),
            ));
        }
        Ok(())
    }
}

/// Engine rendering plain-text documents to SVG.
#[derive(Debug, Default)]
pub struct TextEngine {
    options: TextOptions,
    lines: Option<Vec<String>>,
}

impl TextEngine {
    /// Create an engine with default options and no document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current options.
    pub fn options(&self) -> &TextOptions {
        &self.options
    }

    /// Number of pages of the loaded document under the current options.
    pub fn page_count(&self) -> Option<u32> {
        let lines = self.lines.as_ref()?;
        let per_page = self.options.lines_per_page as usize;
        let pages = lines.len().div_ceil(per_page).max(1);
        Some(u32::try_from(pages).unwrap_or(u32::MAX))
    }
}

impl Engine for TextEngine {
    fn configure(&mut self, options: Value) -> Result<(), EngineError> {
        let Value::Object(update) = options else {
            return Err(EngineError::InvalidOptions(
                "expected a JSON object".to_string(),
            ));
        };

        let mut merged = match serde_json::to_value(&self.options) {
            Ok(Value::Object(map)) => map,
            Ok(other) => {
                return Err(EngineError::Other(format!(
                    "options serialized to {} instead of an object",
                    other
                )))
            }
            Err(e) => return Err(EngineError::Other(e.to_string())),
        };

        for (key, value) in update {
            if !merged.contains_key(&key) {
                return Err(EngineError::InvalidOptions(format!(
                    "unsupported option '{}'",
                    key
                )));
            }
            merged.insert(key, value);
        }

        let next: TextOptions = serde_json::from_value(Value::Object(merged))
            .map_err(|e| EngineError::InvalidOptions(e.to_string()))?;
        next.validate()?;

        self.options = next;
        Ok(())
    }

    fn configuration(&self) -> Result<Value, EngineError> {
        serde_json::to_value(&self.options).map_err(|e| EngineError::Other(e.to_string()))
    }

    fn reset_configuration(&mut self) -> Result<(), EngineError> {
        self.options = TextOptions::default();
        Ok(())
    }

    fn load_document(&mut self, document: &str) -> Result<(), EngineError> {
        if document.trim().is_empty() {
            return Err(EngineError::InvalidDocument("document is empty".to_string()));
        }

        for (index, line) in document.lines().enumerate() {
            if let Some(c) = line.chars().find(|c| c.is_control() && *c != '\t' && *c != '\r') {
                return Err(EngineError::InvalidDocument(format!(
                    "control character U+{:04X} on line {}",
                    c as u32,
                    index + 1
                )));
            }
        }

        self.lines = Some(document.lines().map(str::to_owned).collect());
        Ok(())
    }

    fn render(&mut self, page: u32) -> Result<String, EngineError> {
        let lines = self.lines.as_ref().ok_or(EngineError::NoDocument)?;
        let count = self.page_count().unwrap_or(1);
        if page == 0 || page > count {
            return Err(EngineError::PageOutOfRange { page, count });
        }

        let opts = &self.options;
        let per_page = opts.lines_per_page as usize;
        let width = u64::from(opts.page_width) * u64::from(opts.scale) / 100;
        let height = u64::from(opts.page_height) * u64::from(opts.scale) / 100;

        let mut svg = String::new();
        // Writing to a String cannot fail.
        let _ = write!(
            svg,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{}px" height="{}px" viewBox="0 0 {} {}">"#,
            width, height, opts.page_width, opts.page_height
        );
        let _ = write!(svg, r#"<g class="page" font-size="{}">"#, opts.font_size);

        let start = (page as usize - 1) * per_page;
        for (row, line) in lines.iter().skip(start).take(per_page).enumerate() {
            let y = u64::from(opts.margin) + (row as u64 + 1) * u64::from(opts.line_height);
            let _ = write!(
                svg,
                r#"<text x="{}" y="{}">{}</text>"#,
                opts.margin,
                y,
                escape_xml(line.trim_end_matches('\r'))
            );
        }

        svg.push_str("</g></svg>");
        Ok(svg)
    }
}

fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}
