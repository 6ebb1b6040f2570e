//! Pipeline stages for Markdown/HTML conversion.
//!
//! Each submodule implements exactly one transformation step, so each can be
//! tested on its own and the render backend can be swapped without touching
//! the text stages.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ normalize ──▶ markdown ──▶ assemble ──▶ render
//! (path/URL)  (BOM, CRLF,   (pulldown-   (title, CSS,  (headless
//!              front matter) cmark)       shell)        Chromium)
//! ```
//!
//! 1. [`input`]:     read a local file or download a URL (CLI only)
//! 2. [`normalize`]: strip invisible characters, unify line endings, lift
//!    the front-matter title
//! 3. [`markdown`]:  Markdown → HTML fragment, heading anchors, optional TOC
//! 4. [`assemble`]:  wrap the fragment in a complete, styled HTML document
//! 5. [`render`]:    the [`render::RenderEngine`] seam; [`chromium`] is the
//!    production engine

pub mod assemble;
pub mod chromium;
pub mod input;
pub mod markdown;
pub mod normalize;
pub mod render;
