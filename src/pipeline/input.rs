//! Input resolution: turn a user-supplied path or URL into source text.
//!
//! Used by the CLI only; the HTTP service receives its content in the
//! request body. Both branches reject bytes that are not UTF-8 so the
//! parser never sees lossy text.

use crate::error::Md2PdfError;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// What the source text is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    Markdown,
    Html,
}

/// Source text read from disk or downloaded.
#[derive(Debug, Clone)]
pub struct ResolvedInput {
    /// The path or URL as given.
    pub source: String,
    /// Local path, when the input was a file.
    pub local_path: Option<PathBuf>,
    /// File stem used to name the output (`notes` for `notes.md`).
    pub stem: String,
    pub kind: InputKind,
    pub text: String,
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Classify by file extension: `.html`/`.htm` is HTML, anything else Markdown.
pub fn detect_kind(name: &str) -> InputKind {
    let ext = Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("html") | Some("htm") => InputKind::Html,
        _ => InputKind::Markdown,
    }
}

/// Read a local file or download a URL.
pub async fn resolve_input(input: &str, timeout_secs: u64) -> Result<ResolvedInput, Md2PdfError> {
    if is_url(input) {
        download_url(input, timeout_secs).await
    } else {
        resolve_local(input).await
    }
}

async fn resolve_local(path_str: &str) -> Result<ResolvedInput, Md2PdfError> {
    let path = PathBuf::from(path_str);

    let bytes = match tokio::fs::read(&path).await {
        Ok(b) => b,
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(Md2PdfError::PermissionDenied { path });
        }
        Err(_) => return Err(Md2PdfError::FileNotFound { path }),
    };
    let text = String::from_utf8(bytes).map_err(|_| Md2PdfError::InvalidInput {
        input: path_str.to_string(),
    })?;

    debug!("Read {} bytes from {}", text.len(), path.display());
    Ok(ResolvedInput {
        source: path_str.to_string(),
        stem: file_stem(path_str),
        kind: detect_kind(path_str),
        local_path: Some(path),
        text,
    })
}

async fn download_url(url: &str, timeout_secs: u64) -> Result<ResolvedInput, Md2PdfError> {
    info!("Downloading {}", url);

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| Md2PdfError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let map_send_err = |e: reqwest::Error| {
        if e.is_timeout() {
            Md2PdfError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            Md2PdfError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    };

    let response = client.get(url).send().await.map_err(map_send_err)?;

    if !response.status().is_success() {
        return Err(Md2PdfError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let served_as_html = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("text/html"));

    let bytes = response.bytes().await.map_err(map_send_err)?;
    let text = String::from_utf8(bytes.to_vec()).map_err(|_| Md2PdfError::InvalidInput {
        input: url.to_string(),
    })?;

    let name = url_file_name(url);
    let kind = if served_as_html {
        InputKind::Html
    } else {
        name.as_deref().map_or(InputKind::Markdown, detect_kind)
    };

    info!("Downloaded {} bytes", text.len());
    Ok(ResolvedInput {
        source: url.to_string(),
        local_path: None,
        stem: name
            .as_deref()
            .map(file_stem)
            .unwrap_or_else(|| "document".to_string()),
        kind,
        text,
    })
}

/// Last non-empty path segment of a URL.
fn url_file_name(url: &str) -> Option<String> {
    let parsed = reqwest::Url::parse(url).ok()?;
    let last = parsed.path_segments()?.next_back()?;
    (!last.is_empty()).then(|| last.to_string())
}

fn file_stem(name: &str) -> String {
    Path::new(name)
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("document")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_url() {
        assert!(is_url("https://example.com/notes.md"));
        assert!(is_url("http://example.com/notes.md"));
        assert!(!is_url("/tmp/notes.md"));
        assert!(!is_url("notes.md"));
        assert!(!is_url(""));
    }

    #[test]
    fn test_detect_kind() {
        assert_eq!(detect_kind("page.html"), InputKind::Html);
        assert_eq!(detect_kind("PAGE.HTM"), InputKind::Html);
        assert_eq!(detect_kind("notes.md"), InputKind::Markdown);
        assert_eq!(detect_kind("README"), InputKind::Markdown);
    }

    #[test]
    fn test_url_file_name() {
        assert_eq!(
            url_file_name("https://example.com/docs/guide.md?raw=1").as_deref(),
            Some("guide.md")
        );
        assert_eq!(url_file_name("https://example.com/"), None);
    }

    #[tokio::test]
    async fn test_local_file_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.md");
        std::fs::write(&path, "# Notes\n").unwrap();

        let resolved = resolve_input(path.to_str().unwrap(), 5).await.unwrap();
        assert_eq!(resolved.text, "# Notes\n");
        assert_eq!(resolved.stem, "notes");
        assert_eq!(resolved.kind, InputKind::Markdown);
        assert_eq!(resolved.local_path.as_deref(), Some(path.as_path()));
    }

    #[tokio::test]
    async fn test_missing_file() {
        let err = resolve_input("/definitely/not/here.md", 5).await.unwrap_err();
        assert!(matches!(err, Md2PdfError::FileNotFound { .. }));
    }

    #[tokio::test]
    async fn test_non_utf8_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.md");
        std::fs::write(&path, [0xff, 0xfe, 0x00, 0x80]).unwrap();

        let err = resolve_input(path.to_str().unwrap(), 5).await.unwrap_err();
        assert!(matches!(err, Md2PdfError::InvalidInput { .. }));
    }
}
