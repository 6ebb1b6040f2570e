//! Normalisation: deterministic cleanup of Markdown before parsing.
//!
//! Markdown arrives from editors on every platform and from JSON bodies
//! assembled by other programs. A handful of cheap rules make the parser see
//! the same text regardless of origin:
//!
//! 1. Strip a leading byte-order mark and invisible Unicode (zero-width
//!    spaces and joiners, word joiners)
//! 2. Normalise line endings (CRLF / CR → LF)
//! 3. Lift a leading YAML front-matter block out of the body, keeping its
//!    `title:` value
//!
//! Trailing whitespace is deliberately left alone: two trailing spaces are a
//! hard line break in Markdown.

use once_cell::sync::Lazy;
use regex::Regex;

/// Markdown after normalisation, with the front-matter title if one was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedMarkdown {
    pub body: String,
    pub front_matter_title: Option<String>,
}

/// Apply every normalisation rule in order.
pub fn normalize_markdown(input: &str) -> NormalizedMarkdown {
    let s = remove_invisible_chars(input);
    let s = normalise_line_endings(&s);
    let (front_matter_title, body) = split_front_matter(&s);
    NormalizedMarkdown {
        body,
        front_matter_title,
    }
}

// ── Rule 1: Strip invisible Unicode ──────────────────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input
        .chars()
        .filter(|c| !matches!(c, '\u{FEFF}' | '\u{200B}' | '\u{200C}' | '\u{200D}' | '\u{2060}'))
        .collect()
}

// ── Rule 2: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 3: Front matter ─────────────────────────────────────────────────────

static RE_FRONT_MATTER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)\A---[ \t]*\n(.*?)\n---[ \t]*(?:\n|\z)").unwrap());

static RE_YAML_KEY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][\w-]*:").unwrap());

static RE_TITLE_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?m)^title:[ \t]*(.+?)[ \t]*$"#).unwrap());

/// Split `---\n…\n---` off the top of the document.
///
/// Returns the unquoted `title:` value (if any) and the remaining body. The
/// block only counts as front matter when every non-empty line is a
/// `key: value` pair; otherwise `---` is a thematic break (or the underline
/// of a setext heading) and the document is left untouched.
fn split_front_matter(input: &str) -> (Option<String>, String) {
    let Some(caps) = RE_FRONT_MATTER.captures(input) else {
        return (None, input.to_string());
    };
    let block = caps.get(1).map_or("", |m| m.as_str());
    if !is_yaml_mapping(block) {
        return (None, input.to_string());
    }
    let end = caps.get(0).map_or(0, |m| m.end());

    let title = RE_TITLE_LINE
        .captures(block)
        .and_then(|c| c.get(1))
        .map(|m| unquote(m.as_str()))
        .filter(|t| !t.is_empty());

    (title, input[end..].trim_start_matches('\n').to_string())
}

/// Top-level keys, their indented continuation lines and comments.
fn is_yaml_mapping(block: &str) -> bool {
    let mut lines = block.lines().filter(|l| !l.trim().is_empty()).peekable();
    if lines.peek().is_none() {
        return false;
    }
    lines.all(|line| {
        RE_YAML_KEY.is_match(line)
            || line.starts_with(' ')
            || line.starts_with('\t')
            || line.trim_start().starts_with('#')
    })
}

fn unquote(value: &str) -> String {
    let v = value.trim();
    for quote in ['"', '\''] {
        if v.len() >= 2 && v.starts_with(quote) && v.ends_with(quote) {
            return v[1..v.len() - 1].to_string();
        }
    }
    v.to_string()
}
