//! Request-scoped conversion input.
//!
//! A [`ConversionRequest`] lives for exactly one conversion. The same type
//! carries Markdown or raw HTML; which one it is follows from the
//! [`ConversionMode`] it is converted with.

use crate::error::Md2PdfError;
use crate::output::OutputFormat;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The three pipeline entry points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConversionMode {
    /// Parse Markdown and assemble a styled HTML document.
    MarkdownToHtml,
    /// Parse Markdown, assemble, then print the document to PDF.
    MarkdownToPdf,
    /// Print caller-supplied HTML to PDF as-is.
    HtmlToPdf,
}

impl ConversionMode {
    /// What the mode produces.
    pub fn output_format(&self) -> OutputFormat {
        match self {
            ConversionMode::MarkdownToHtml => OutputFormat::Html,
            ConversionMode::MarkdownToPdf | ConversionMode::HtmlToPdf => OutputFormat::Pdf,
        }
    }

    /// Whether the source is Markdown (and therefore goes through the parser).
    pub fn parses_markdown(&self) -> bool {
        !matches!(self, ConversionMode::HtmlToPdf)
    }
}

impl fmt::Display for ConversionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ConversionMode::MarkdownToHtml => "md-to-html",
            ConversionMode::MarkdownToPdf => "md-to-pdf",
            ConversionMode::HtmlToPdf => "html-to-pdf",
        })
    }
}

/// Source text plus optional title, stylesheet and script.
///
/// # Example
/// ```rust
/// use md2pdf::ConversionRequest;
///
/// let request = ConversionRequest::new("# Quarterly report")
///     .title("Q3")
///     .css("h1 { color: navy; }");
/// assert!(request.validate().is_ok());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionRequest {
    /// Markdown or HTML source.
    pub content: String,
    /// Document title; falls back to front matter, then the configured default.
    pub title: Option<String>,
    /// Custom CSS appended after the base stylesheet.
    pub css: Option<String>,
    /// JavaScript evaluated in the page after load and before capture.
    pub script: Option<String>,
}

impl ConversionRequest {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Default::default()
        }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn css(mut self, css: impl Into<String>) -> Self {
        self.css = Some(css.into());
        self
    }

    pub fn script(mut self, script: impl Into<String>) -> Self {
        self.script = Some(script.into());
        self
    }

    /// Reject requests without source text.
    pub fn validate(&self) -> Result<(), Md2PdfError> {
        if self.content.is_empty() {
            return Err(Md2PdfError::MissingContent);
        }
        Ok(())
    }

    /// The script to run, if one was supplied and is not blank.
    pub fn effective_script(&self) -> Option<&str> {
        self.script.as_deref().filter(|s| !s.trim().is_empty())
    }

    /// The title, if one was supplied and is not blank.
    pub fn effective_title(&self) -> Option<&str> {
        self.title.as_deref().filter(|t| !t.trim().is_empty())
    }
}
