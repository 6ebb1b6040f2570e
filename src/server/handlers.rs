use super::error::ApiError;
use super::AppState;
use crate::output::ConversionOutput;
use crate::request::{ConversionMode, ConversionRequest};
use axum::body::Bytes;
use axum::extract::{FromRequest, Request, State};
use axum::http::{header, HeaderMap};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

/// JSON body extractor that reads an empty or non-JSON body as `{}`.
///
/// Such a request then fails validation as missing content. The size limit
/// and JSON syntax errors still answer with the extractor's own status.
#[derive(Debug)]
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned + Default,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let json = is_json_content_type(req.headers());
        let bytes = Bytes::from_request(req, state).await?;
        if !json || bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self(T::default()));
        }
        let Json(value) = Json::<T>::from_bytes(&bytes)?;
        Ok(Self(value))
    }
}

/// `application/json` or any `+json` media type, parameters ignored.
fn is_json_content_type(headers: &HeaderMap) -> bool {
    let Some(value) = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
    else {
        return false;
    };
    let essence = value
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    essence == "application/json"
        || (essence.starts_with("application/") && essence.ends_with("+json"))
}

/// Body of the Markdown routes. Every field is optional so that a missing
/// `markdown` is reported as missing content rather than a decode error.
#[derive(Debug, Default, Deserialize)]
pub struct MarkdownBody {
    pub markdown: Option<String>,
    pub title: Option<String>,
    pub css: Option<String>,
    pub js: Option<String>,
}

impl MarkdownBody {
    fn into_request(self, with_script: bool) -> ConversionRequest {
        ConversionRequest {
            content: self.markdown.unwrap_or_default(),
            title: self.title,
            css: self.css,
            script: if with_script { self.js } else { None },
        }
    }
}

/// Body of `/html-to-pdf`.
#[derive(Debug, Default, Deserialize)]
pub struct HtmlBody {
    pub html: Option<String>,
    pub js: Option<String>,
}

impl HtmlBody {
    fn into_request(self) -> ConversionRequest {
        ConversionRequest {
            content: self.html.unwrap_or_default(),
            script: self.js,
            ..Default::default()
        }
    }
}

pub(super) async fn convert(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<MarkdownBody>,
) -> Result<Response, ApiError> {
    // `/convert` predates script support and never runs one.
    run(&state, body.into_request(false), ConversionMode::MarkdownToPdf).await
}

pub(super) async fn md_to_pdf(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<MarkdownBody>,
) -> Result<Response, ApiError> {
    run(&state, body.into_request(true), ConversionMode::MarkdownToPdf).await
}

pub(super) async fn md_to_html(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<MarkdownBody>,
) -> Result<Response, ApiError> {
    run(&state, body.into_request(false), ConversionMode::MarkdownToHtml).await
}

pub(super) async fn html_to_pdf(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<HtmlBody>,
) -> Result<Response, ApiError> {
    run(&state, body.into_request(), ConversionMode::HtmlToPdf).await
}

pub(super) async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn run(
    state: &AppState,
    request: ConversionRequest,
    mode: ConversionMode,
) -> Result<Response, ApiError> {
    debug!(%mode, live_instances = ?state.live_instances(), "Conversion accepted");
    crate::convert::convert(request, mode, &state.conversion)
        .await
        .map(document_response)
        .map_err(|error| ApiError::conversion(mode, error))
}

fn document_response(output: ConversionOutput) -> Response {
    let disposition = format!("inline; filename={}", output.format.default_file_name());
    (
        [
            (header::CONTENT_TYPE, output.format.content_type().to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        output.bytes,
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn convert_route_drops_script() {
        let body = MarkdownBody {
            markdown: Some("# x".into()),
            js: Some("alert(1)".into()),
            ..Default::default()
        };
        assert_eq!(body.into_request(false).script, None);
    }

    fn headers(content_type: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, content_type.parse().unwrap());
        headers
    }

    #[test]
    fn json_content_types() {
        assert!(is_json_content_type(&headers("application/json")));
        assert!(is_json_content_type(&headers("Application/JSON; charset=utf-8")));
        assert!(is_json_content_type(&headers("application/vnd.api+json")));
        assert!(!is_json_content_type(&headers("text/plain")));
        assert!(!is_json_content_type(&HeaderMap::new()));
    }

    #[test]
    fn missing_fields_become_empty_content() {
        let body: HtmlBody = serde_json::from_str("{}").unwrap();
        assert_eq!(body.into_request().content, "");

        let body: MarkdownBody = serde_json::from_str(r#"{"markdown": null}"#).unwrap();
        assert_eq!(body.into_request(true).content, "");
    }
}
