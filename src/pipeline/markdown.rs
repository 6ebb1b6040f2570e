//! Markdown → HTML fragment via pulldown-cmark.
//!
//! When a table of contents is requested the event stream is buffered once
//! so every heading can be given a stable, unique `id` before the HTML is
//! written; the TOC links point at those ids.

use crate::config::MarkdownOptions;
use crate::error::Md2PdfError;
use crate::pipeline::assemble::escape_html;
use once_cell::sync::Lazy;
use pulldown_cmark::{html, CowStr, Event, Options, Parser, Tag, TagEnd};
use regex::Regex;
use std::collections::HashSet;
use tracing::debug;

/// One heading collected for the table of contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TocEntry {
    /// 1–6
    pub level: usize,
    pub text: String,
    pub anchor: String,
}

/// Parser output: the body fragment and, when requested, the TOC entries.
#[derive(Debug, Clone, Default)]
pub struct ParsedMarkdown {
    pub html: String,
    pub toc: Vec<TocEntry>,
}

/// Map [`MarkdownOptions`] onto pulldown-cmark's option flags.
pub fn parser_options(opts: &MarkdownOptions) -> Options {
    let mut options = Options::empty();
    if opts.tables {
        options.insert(Options::ENABLE_TABLES);
    }
    if opts.footnotes {
        options.insert(Options::ENABLE_FOOTNOTES);
    }
    if opts.strikethrough {
        options.insert(Options::ENABLE_STRIKETHROUGH);
    }
    if opts.tasklists {
        options.insert(Options::ENABLE_TASKLISTS);
    }
    if opts.smart_punctuation {
        options.insert(Options::ENABLE_SMART_PUNCTUATION);
    }
    if opts.heading_attributes {
        options.insert(Options::ENABLE_HEADING_ATTRIBUTES);
    }
    options
}

/// Convert Markdown to an HTML fragment.
pub fn render_fragment(markdown: &str, opts: &MarkdownOptions, with_toc: bool) -> ParsedMarkdown {
    let parser = Parser::new_ext(markdown, parser_options(opts));
    let mut out = String::with_capacity(markdown.len() * 3 / 2);

    if !with_toc {
        html::push_html(&mut out, parser);
        return ParsedMarkdown {
            html: out,
            toc: Vec::new(),
        };
    }

    let mut events: Vec<Event<'_>> = parser.collect();
    let toc = anchor_headings(&mut events);
    debug!("Collected {} headings for the table of contents", toc.len());
    html::push_html(&mut out, events.into_iter());
    ParsedMarkdown { html: out, toc }
}

/// Parse on the blocking pool so a pathological document cannot stall the
/// async workers; a panic inside the parser surfaces as [`Md2PdfError::Parse`].
pub async fn parse(
    markdown: String,
    opts: MarkdownOptions,
    with_toc: bool,
) -> Result<ParsedMarkdown, Md2PdfError> {
    tokio::task::spawn_blocking(move || render_fragment(&markdown, &opts, with_toc))
        .await
        .map_err(|e| Md2PdfError::Parse {
            detail: format!("parser task failed: {e}"),
        })
}

// ── Heading anchors ──────────────────────────────────────────────────────

struct OpenHeading {
    start: usize,
    level: usize,
    id: Option<String>,
    text: String,
}

/// Give every heading an `id` and return the headings in document order.
///
/// Ids written by the author (`{#custom}` with heading attributes enabled)
/// are kept and reserved up front; generated ones never reuse them and are
/// de-duplicated with `-1`, `-2`, … suffixes.
fn anchor_headings(events: &mut [Event<'_>]) -> Vec<TocEntry> {
    let mut entries = Vec::new();
    let mut used: HashSet<String> = events
        .iter()
        .filter_map(|event| match event {
            Event::Start(Tag::Heading { id: Some(id), .. }) => Some(id.to_string()),
            _ => None,
        })
        .collect();
    let mut open: Option<OpenHeading> = None;

    for idx in 0..events.len() {
        match &events[idx] {
            Event::Start(Tag::Heading { level, id, .. }) => {
                open = Some(OpenHeading {
                    start: idx,
                    level: *level as usize,
                    id: id.as_ref().map(|s| s.to_string()),
                    text: String::new(),
                });
            }
            Event::Text(t) | Event::Code(t) => {
                if let Some(h) = open.as_mut() {
                    h.text.push_str(t);
                }
            }
            Event::End(TagEnd::Heading(_)) => {
                let Some(h) = open.take() else { continue };
                let anchor = match h.id {
                    Some(existing) => existing,
                    None => unique_anchor(&slugify(&h.text), &mut used),
                };
                if let Event::Start(Tag::Heading { id, .. }) = &mut events[h.start] {
                    if id.is_none() {
                        *id = Some(CowStr::from(anchor.clone()));
                    }
                }
                entries.push(TocEntry {
                    level: h.level,
                    text: h.text.trim().to_string(),
                    anchor,
                });
            }
            _ => {}
        }
    }

    entries
}

static RE_NON_SLUG: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\s-]").unwrap());
static RE_SEPARATORS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\s_-]+").unwrap());

/// URL-safe anchor from heading text.
pub fn slugify(text: &str) -> String {
    let lower = text.trim().to_lowercase();
    let stripped = RE_NON_SLUG.replace_all(&lower, "");
    let slug = RE_SEPARATORS.replace_all(&stripped, "-");
    let slug = slug.trim_matches('-');
    if slug.is_empty() {
        "section".to_string()
    } else {
        slug.to_string()
    }
}

fn unique_anchor(base: &str, used: &mut HashSet<String>) -> String {
    let mut anchor = base.to_string();
    let mut n = 1;
    while used.contains(&anchor) {
        anchor = format!("{base}-{n}");
        n += 1;
    }
    used.insert(anchor.clone());
    anchor
}

// ── Table of contents ────────────────────────────────────────────────────

/// Render TOC entries as nested lists inside `<nav class="toc">`.
///
/// Returns an empty string when there are no headings.
pub fn render_toc(entries: &[TocEntry]) -> String {
    if entries.is_empty() {
        return String::new();
    }

    let base = entries.iter().map(|e| e.level).min().unwrap_or(1);
    let mut out = String::from("<nav class=\"toc\">\n<h2>Contents</h2>\n<ul>\n");
    let mut depth = 0usize;

    for entry in entries {
        let target = entry.level.saturating_sub(base);
        while depth < target {
            out.push_str("<ul>\n");
            depth += 1;
        }
        while depth > target {
            out.push_str("</ul>\n");
            depth -= 1;
        }
        out.push_str(&format!(
            "<li><a href=\"#{}\">{}</a></li>\n",
            escape_html(&entry.anchor),
            escape_html(&entry.text)
        ));
    }
    while depth > 0 {
        out.push_str("</ul>\n");
        depth -= 1;
    }
    out.push_str("</ul>\n</nav>\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts() -> MarkdownOptions {
        MarkdownOptions::default()
    }

    #[test]
    fn heading_renders() {
        let parsed = render_fragment("# Hello", &opts(), false);
        assert_eq!(parsed.html.trim(), "<h1>Hello</h1>");
        assert!(parsed.toc.is_empty());
    }

    #[test]
    fn tables_follow_options() {
        let md = "| a | b |\n|---|---|\n| 1 | 2 |\n";
        assert!(render_fragment(md, &opts(), false).html.contains("<table>"));

        let no_tables = MarkdownOptions {
            tables: false,
            ..opts()
        };
        assert!(!render_fragment(md, &no_tables, false)
            .html
            .contains("<table>"));
    }

    #[test]
    fn strikethrough_and_tasklists() {
        let parsed = render_fragment("~~old~~\n\n- [x] done\n", &opts(), false);
        assert!(parsed.html.contains("<del>old</del>"));
        assert!(parsed.html.contains("type=\"checkbox\""));
    }

    #[test]
    fn toc_collects_headings_and_injects_ids() {
        let md = "# Intro\n\n## Setup `cargo`\n\n## Setup `cargo`\n";
        let parsed = render_fragment(md, &opts(), true);
        let anchors: Vec<_> = parsed.toc.iter().map(|e| e.anchor.as_str()).collect();
        assert_eq!(anchors, vec!["intro", "setup-cargo", "setup-cargo-1"]);
        assert!(parsed.html.contains("<h1 id=\"intro\">"));
        assert!(parsed.html.contains("<h2 id=\"setup-cargo-1\">"));
        assert_eq!(parsed.toc[1].level, 2);
        assert_eq!(parsed.toc[1].text, "Setup cargo");
    }

    #[test]
    fn author_ids_are_kept() {
        let with_attrs = MarkdownOptions {
            heading_attributes: true,
            ..opts()
        };
        let parsed = render_fragment("# Intro {#start}\n", &with_attrs, true);
        assert_eq!(parsed.toc[0].anchor, "start");
        assert!(parsed.html.contains("id=\"start\""));
    }

    #[test]
    fn generated_ids_avoid_author_ids() {
        let with_attrs = MarkdownOptions {
            heading_attributes: true,
            ..opts()
        };
        let md = "# Intro\n\n# Intro {#intro}\n\n# Other {#intro-1}\n\n# Intro\n";
        let parsed = render_fragment(md, &with_attrs, true);
        let anchors: Vec<_> = parsed.toc.iter().map(|e| e.anchor.as_str()).collect();
        assert_eq!(anchors, vec!["intro-2", "intro", "intro-1", "intro-3"]);
        assert_eq!(parsed.html.matches("id=\"intro\"").count(), 1);
    }

    #[test]
    fn slugify_strips_punctuation() {
        assert_eq!(slugify("What's new in 2.0?"), "whats-new-in-20");
        assert_eq!(slugify("  snake_case  name "), "snake-case-name");
        assert_eq!(slugify("!!!"), "section");
    }

    #[test]
    fn toc_nests_by_level() {
        let entries = vec![
            TocEntry {
                level: 2,
                text: "A".into(),
                anchor: "a".into(),
            },
            TocEntry {
                level: 3,
                text: "B & C".into(),
                anchor: "b-c".into(),
            },
            TocEntry {
                level: 2,
                text: "D".into(),
                anchor: "d".into(),
            },
        ];
        let html = render_toc(&entries);
        assert!(html.starts_with("<nav class=\"toc\">"));
        assert!(html.contains("<ul>\n<li><a href=\"#b-c\">B &amp; C</a></li>\n</ul>"));
        assert_eq!(html.matches("<ul>").count(), html.matches("</ul>").count());
    }

    #[test]
    fn empty_toc_renders_nothing() {
        assert_eq!(render_toc(&[]), "");
    }

    #[tokio::test]
    async fn parse_runs_off_the_async_workers() {
        let parsed = parse("*hi*".to_string(), opts(), false).await.unwrap();
        assert!(parsed.html.contains("<em>hi</em>"));
    }
}
