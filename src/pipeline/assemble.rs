//! Document assembly: fragment + title + stylesheet → complete HTML document.
//!
//! This is the single place an HTML shell is produced; every entry point
//! that emits a document from Markdown goes through [`assemble`].
//!
//! ## Stylesheet order
//!
//! The base stylesheet (caller-supplied or [`DEFAULT_CSS`]) is written first
//! and the request's custom CSS after it, inside one `<style>` element. On
//! equal specificity the later rule wins, so custom CSS overrides the base.

/// Built-in stylesheet used when no base CSS is configured.
pub const DEFAULT_CSS: &str = r#"
:root {
  --text: #1f2328;
  --muted: #59636e;
  --link: #0969da;
  --code-bg: #f6f8fa;
  --border: #d1d9e0;
}
* { box-sizing: border-box; }
html { -webkit-print-color-adjust: exact; print-color-adjust: exact; }
body {
  font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Helvetica, Arial, sans-serif;
  font-size: 11pt;
  line-height: 1.6;
  color: var(--text);
  max-width: 860px;
  margin: 0 auto;
  padding: 0 1rem;
}
h1, h2, h3, h4, h5, h6 { font-weight: 600; line-height: 1.25; margin: 1.5em 0 0.6em; page-break-after: avoid; }
h1 { font-size: 2em; border-bottom: 1px solid var(--border); padding-bottom: .3em; }
h2 { font-size: 1.5em; border-bottom: 1px solid var(--border); padding-bottom: .3em; }
h3 { font-size: 1.25em; }
h6 { color: var(--muted); }
p, ul, ol, blockquote, table, pre { margin: 0 0 1em; }
a { color: var(--link); text-decoration: none; }
a:hover { text-decoration: underline; }
code {
  font-family: "SFMono-Regular", Consolas, "Liberation Mono", Menlo, monospace;
  font-size: 85%;
  background: var(--code-bg);
  padding: .2em .4em;
  border-radius: 4px;
}
pre {
  background: var(--code-bg);
  padding: 12px 16px;
  border-radius: 6px;
  overflow-x: auto;
  line-height: 1.45;
  page-break-inside: avoid;
}
pre code { background: transparent; padding: 0; font-size: 85%; white-space: pre-wrap; }
blockquote { color: var(--muted); border-left: .25em solid var(--border); padding: 0 1em; }
hr { height: 1px; border: 0; background: var(--border); margin: 1.5em 0; }
table { border-collapse: collapse; width: 100%; }
th, td { border: 1px solid var(--border); padding: 6px 13px; }
th { background: var(--code-bg); font-weight: 600; }
tr:nth-child(even) td { background: #fbfcfd; }
img { max-width: 100%; height: auto; }
.toc {
  border: 1px solid var(--border);
  border-radius: 6px;
  background: var(--code-bg);
  padding: .75em 1.25em;
  margin: 0 0 2em;
  page-break-after: always;
}
.toc h2 { font-size: 1.1em; border: 0; margin: 0 0 .5em; padding: 0; }
.toc ul { list-style: none; padding-left: 1.2em; margin: 0; }
.toc > ul { padding-left: 0; }
.toc li { margin: .2em 0; }
"#;

/// The inputs of one assembled document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedDocument {
    pub title: String,
    pub body_html: String,
    pub css: String,
}

impl RenderedDocument {
    /// Compose the stylesheet from a base (default when `None`) and optional
    /// custom CSS appended after it.
    pub fn new(
        title: impl Into<String>,
        body_html: impl Into<String>,
        base_css: Option<&str>,
        custom_css: Option<&str>,
    ) -> Self {
        let base = base_css.unwrap_or(DEFAULT_CSS);
        let custom = custom_css.unwrap_or("");
        let mut css = String::with_capacity(base.len() + custom.len() + 1);
        css.push_str(base);
        if !custom.is_empty() {
            css.push('\n');
            css.push_str(custom);
        }
        Self {
            title: title.into(),
            body_html: body_html.into(),
            css,
        }
    }

    /// Serialise to a complete HTML document.
    ///
    /// The title is escaped; the body is inserted verbatim because it is
    /// already HTML.
    pub fn to_html(&self) -> String {
        format!(
            "<!DOCTYPE html>\n\
<html>\n\
<head>\n\
<meta charset=\"utf-8\" />\n\
<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\" />\n\
<title>{title}</title>\n\
<style>{css}</style>\n\
</head>\n\
<body>\n\
{body}\n\
</body>\n\
</html>\n",
            title = escape_html(&self.title),
            css = self.css,
            body = self.body_html,
        )
    }
}

/// Produce a complete HTML document. Total over its inputs.
pub fn assemble(
    title: &str,
    body_html: &str,
    base_css: Option<&str>,
    custom_css: Option<&str>,
) -> String {
    RenderedDocument::new(title, body_html, base_css, custom_css).to_html()
}

/// Escape `&`, `<`, `>` and `"`.
///
/// `&` goes first: the later substitutions introduce `&` themselves and must
/// not be escaped again.
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_all_four_characters_once() {
        assert_eq!(
            escape_html(r#"<a href="x">Tom & Jerry</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; Jerry&lt;/a&gt;"
        );
        // An existing entity is escaped once, not left as-is or double-escaped.
        assert_eq!(escape_html("&lt;"), "&amp;lt;");
        assert_eq!(escape_html("it's"), "it's");
    }

    #[test]
    fn title_is_escaped_and_body_is_verbatim() {
        let html = assemble("A < B & \"C\" > D", "<p>x &amp; y</p>", None, None);
        assert!(html.contains("<title>A &lt; B &amp; &quot;C&quot; &gt; D</title>"));
        assert!(html.contains("<p>x &amp; y</p>"));
        assert!(html.starts_with("<!DOCTYPE html>\n<html>"));
        assert!(html.trim_end().ends_with("</html>"));
    }

    #[test]
    fn default_css_used_without_base() {
        let html = assemble("t", "", None, None);
        assert!(html.contains(".toc {"));
        assert!(html.contains("pre {"));
    }

    #[test]
    fn base_css_replaces_default() {
        let html = assemble("t", "", Some("body{margin:0}"), None);
        assert!(html.contains("<style>body{margin:0}</style>"));
        assert!(!html.contains(".toc {"));
    }

    #[test]
    fn custom_css_follows_base_css() {
        let html = assemble("t", "", Some("h1{color:red}"), Some("h1{color:blue}"));
        let base = html.find("h1{color:red}").unwrap();
        let custom = html.find("h1{color:blue}").unwrap();
        assert!(base < custom);
    }

    #[test]
    fn custom_css_follows_default_css() {
        let html = assemble("t", "", None, Some(".toc{display:none}"));
        let base = html.find(".toc {").unwrap();
        let custom = html.find(".toc{display:none}").unwrap();
        assert!(base < custom);
    }

    #[test]
    fn empty_base_css_is_respected() {
        let doc = RenderedDocument::new("t", "", Some(""), Some("p{}"));
        assert_eq!(doc.css, "\np{}");
    }
}
