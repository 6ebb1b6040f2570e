//! Conversion results.

use serde::{Deserialize, Serialize};

/// The kind of document a conversion produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Html,
    Pdf,
}

impl OutputFormat {
    /// MIME type for the `Content-Type` header.
    pub fn content_type(&self) -> &'static str {
        match self {
            OutputFormat::Html => "text/html; charset=utf-8",
            OutputFormat::Pdf => "application/pdf",
        }
    }

    /// File extension without the dot.
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Html => "html",
            OutputFormat::Pdf => "pdf",
        }
    }

    /// Filename used in `Content-Disposition`.
    pub fn default_file_name(&self) -> String {
        format!("output.{}", self.extension())
    }
}

/// Timing and size figures for one conversion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionStats {
    /// Markdown parsing time (0 for HTML input).
    pub parse_duration_ms: u64,
    /// Render-engine time, launch to capture (0 for HTML output).
    pub render_duration_ms: u64,
    /// Wall-clock time for the whole conversion.
    pub total_duration_ms: u64,
    /// Length of the assembled HTML document.
    pub html_bytes: usize,
    /// Length of the final output.
    pub output_bytes: usize,
}

/// The product of a conversion: bytes plus what they are.
///
/// Never retained by the library; the caller owns it.
#[derive(Debug, Clone)]
pub struct ConversionOutput {
    pub format: OutputFormat,
    pub bytes: Vec<u8>,
    pub stats: ConversionStats,
}

impl ConversionOutput {
    /// The output as text, when it is HTML.
    pub fn as_html(&self) -> Option<&str> {
        match self.format {
            OutputFormat::Html => std::str::from_utf8(&self.bytes).ok(),
            OutputFormat::Pdf => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_types() {
        assert_eq!(OutputFormat::Pdf.content_type(), "application/pdf");
        assert!(OutputFormat::Html.content_type().starts_with("text/html"));
    }

    #[test]
    fn file_names() {
        assert_eq!(OutputFormat::Pdf.default_file_name(), "output.pdf");
        assert_eq!(OutputFormat::Html.default_file_name(), "output.html");
    }

    #[test]
    fn pdf_output_is_not_html() {
        let output = ConversionOutput {
            format: OutputFormat::Pdf,
            bytes: b"%PDF-1.7".to_vec(),
            stats: ConversionStats::default(),
        };
        assert!(output.as_html().is_none());
    }

    #[test]
    fn stats_serialise() {
        let stats = ConversionStats {
            output_bytes: 10,
            ..Default::default()
        };
        let json = serde_json::to_string(&stats).unwrap();
        assert!(json.contains("\"output_bytes\":10"));
    }
}
