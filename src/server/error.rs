use crate::error::{ErrorKind, Md2PdfError};
use crate::request::ConversionMode;
use axum::extract::rejection::{BytesRejection, JsonRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::error;

/// Everything a handler can fail with.
///
/// Validation failures are explained to the caller as JSON. Pipeline
/// failures are logged here and answered with a fixed plain-text message;
/// the underlying error never reaches the response.
#[derive(Debug)]
pub enum ApiError {
    /// The body extractor refused the request (malformed JSON, over the
    /// size limit).
    Rejection { status: StatusCode, message: String },
    /// The pipeline returned an error.
    Conversion {
        mode: ConversionMode,
        error: Md2PdfError,
    },
}

impl ApiError {
    pub fn conversion(mode: ConversionMode, error: Md2PdfError) -> Self {
        Self::Conversion { mode, error }
    }

    /// Response status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Rejection { status, .. } => *status,
            ApiError::Conversion { error, .. } => match error.kind() {
                ErrorKind::Validation => StatusCode::BAD_REQUEST,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Rejection {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl From<BytesRejection> for ApiError {
    fn from(rejection: BytesRejection) -> Self {
        ApiError::Rejection {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

/// Generic message sent with a 500 for each mode.
pub fn failure_message(mode: ConversionMode) -> &'static str {
    match mode {
        ConversionMode::MarkdownToPdf => "Error converting Markdown to PDF",
        ConversionMode::MarkdownToHtml => "Error converting Markdown to HTML",
        ConversionMode::HtmlToPdf => "Error converting HTML to PDF",
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            ApiError::Rejection { message, .. } => {
                (status, Json(json!({ "error": message }))).into_response()
            }
            ApiError::Conversion { error, .. } if status == StatusCode::BAD_REQUEST => {
                (status, Json(json!({ "error": error.to_string() }))).into_response()
            }
            ApiError::Conversion { mode, error } => {
                error!(%mode, kind = ?error.kind(), "Conversion failed: {error}");
                (status, failure_message(mode)).into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_is_bad_request() {
        let err = ApiError::conversion(ConversionMode::HtmlToPdf, Md2PdfError::MissingContent);
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        let err = ApiError::conversion(ConversionMode::MarkdownToPdf, Md2PdfError::ScriptsDisabled);
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn pipeline_failures_are_server_errors() {
        let err = ApiError::conversion(
            ConversionMode::MarkdownToPdf,
            Md2PdfError::BrowserLaunch {
                detail: "no chrome".into(),
            },
        );
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let err = ApiError::conversion(
            ConversionMode::MarkdownToHtml,
            Md2PdfError::Parse {
                detail: "boom".into(),
            },
        );
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn failure_messages_name_the_mode() {
        assert_eq!(
            failure_message(ConversionMode::HtmlToPdf),
            "Error converting HTML to PDF"
        );
    }
}
