//! HTTP surface tests: the router is driven in-process with
//! `tower::ServiceExt::oneshot` against a mock render engine.

mod common;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use common::{Behaviour, MockEngine};
use md2pdf::server::{build_router, AppState, DEFAULT_BODY_LIMIT};
use md2pdf::{ConversionConfig, RenderEngine};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tower::ServiceExt;

const MISSING: &str = r#"{"error":"Markdown content is missing"}"#;

fn router_with(engine: Arc<MockEngine>, allow_scripts: bool) -> Router {
    common::init_tracing();
    let config = ConversionConfig::builder()
        .engine(engine)
        .allow_scripts(allow_scripts)
        .build()
        .unwrap();
    build_router(AppState::new(config), DEFAULT_BODY_LIMIT)
}

fn post_json(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn post_raw(uri: &str, content_type: Option<&str>, body: &str) -> Request<Body> {
    let mut builder = Request::builder().method("POST").uri(uri);
    if let Some(content_type) = content_type {
        builder = builder.header(header::CONTENT_TYPE, content_type);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn body_string(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8_lossy(&bytes).into_owned()
}

fn header_str<'a>(response: &'a Response, name: header::HeaderName) -> &'a str {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

// ── Success paths ────────────────────────────────────────────────────────────

#[tokio::test]
async fn convert_returns_pdf() {
    let engine = MockEngine::new(Behaviour::Succeed);
    let app = router_with(engine.clone(), false);

    let response = app
        .oneshot(post_json("/convert", r##"{"markdown":"# Hello"}"##))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header_str(&response, header::CONTENT_TYPE), "application/pdf");
    assert_eq!(
        header_str(&response, header::CONTENT_DISPOSITION),
        "inline; filename=output.pdf"
    );
    let body = body_string(response).await;
    assert!(body.starts_with("%PDF-"));

    let jobs = engine.jobs();
    assert_eq!(jobs.len(), 1);
    assert!(jobs[0].html.contains("<h1>Hello</h1>"));
    assert!(jobs[0].html.contains("<title>Document</title>"));
    assert_eq!(engine.gauge.live(), 0);
}

#[tokio::test]
async fn md_to_html_returns_escaped_document() {
    let engine = MockEngine::new(Behaviour::Succeed);
    let app = router_with(engine.clone(), false);

    let response = app
        .oneshot(post_json(
            "/md-to-html",
            r#"{"markdown":"Some *text*","title":"Q&A <draft> \"v2\"","css":"p{color:red}"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(header_str(&response, header::CONTENT_TYPE).starts_with("text/html"));
    assert_eq!(
        header_str(&response, header::CONTENT_DISPOSITION),
        "inline; filename=output.html"
    );
    let html = body_string(response).await;
    assert!(html.contains("<html>"));
    assert!(html.contains("</html>"));
    assert!(html.contains("<title>Q&amp;A &lt;draft&gt; &quot;v2&quot;</title>"));
    assert!(html.contains("<em>text</em>"));
    assert!(html.find(".toc {").unwrap() < html.find("p{color:red}").unwrap());
    // HTML output never touches the engine.
    assert!(engine.jobs().is_empty());
}

#[tokio::test]
async fn html_to_pdf_renders_verbatim() {
    let engine = MockEngine::new(Behaviour::Succeed);
    let app = router_with(engine.clone(), false);
    let page = "<html><body><p>As is</p></body></html>";

    let response = app
        .oneshot(post_json(
            "/html-to-pdf",
            &serde_json::json!({ "html": page }).to_string(),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header_str(&response, header::CONTENT_TYPE), "application/pdf");
    assert_eq!(engine.jobs()[0].html, page);
}

#[tokio::test]
async fn health_reports_ok() {
    let app = router_with(MockEngine::new(Behaviour::Succeed), false);
    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, r#"{"status":"ok"}"#);
}

// ── Validation ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn missing_content_is_rejected_on_every_route() {
    let cases = [
        ("/convert", "{}"),
        ("/convert", r#"{"markdown":""}"#),
        ("/md-to-pdf", r#"{"markdown":null,"title":"x"}"#),
        ("/md-to-html", r#"{"css":"p{}"}"#),
        ("/html-to-pdf", "{}"),
        ("/html-to-pdf", r#"{"html":""}"#),
    ];

    for (uri, body) in cases {
        let engine = MockEngine::new(Behaviour::Succeed);
        let app = router_with(engine.clone(), false);
        let response = app.oneshot(post_json(uri, body)).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{uri} {body}");
        assert!(header_str(&response, header::CONTENT_TYPE).starts_with("application/json"));
        assert_eq!(body_string(response).await, MISSING, "{uri} {body}");
        assert!(engine.jobs().is_empty());
    }
}

#[tokio::test]
async fn script_refused_unless_enabled() {
    let engine = MockEngine::new(Behaviour::Succeed);
    let app = router_with(engine.clone(), false);

    let response = app
        .oneshot(post_json(
            "/md-to-pdf",
            r#"{"markdown":"Hi","js":"document.title='x'"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert!(body["error"].as_str().unwrap().contains("Script injection is disabled"));
    assert!(engine.jobs().is_empty());
}

#[tokio::test]
async fn script_reaches_engine_when_enabled() {
    let engine = MockEngine::new(Behaviour::Succeed);
    let app = router_with(engine.clone(), true);

    let response = app
        .oneshot(post_json(
            "/md-to-pdf",
            r#"{"markdown":"Hi","js":"document.title='x'"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(engine.jobs()[0].script.as_deref(), Some("document.title='x'"));
}

#[tokio::test]
async fn convert_route_never_runs_scripts() {
    let engine = MockEngine::new(Behaviour::Succeed);
    let app = router_with(engine.clone(), true);

    let response = app
        .oneshot(post_json("/convert", r#"{"markdown":"Hi","js":"alert(1)"}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(engine.jobs()[0].script, None);
}

#[tokio::test]
async fn malformed_json_gets_json_error() {
    let app = router_with(MockEngine::new(Behaviour::Succeed), false);
    let response = app
        .oneshot(post_json("/md-to-pdf", r#"{"markdown": "#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn empty_or_non_json_body_is_missing_content() {
    let cases = [
        ("/html-to-pdf", Some("application/json"), ""),
        ("/md-to-pdf", Some("application/json"), "  \n"),
        ("/convert", None, "{}"),
        ("/convert", None, r#"{"markdown":"x"}"#),
        ("/md-to-html", Some("text/plain"), "# Hello"),
        ("/html-to-pdf", Some("application/x-www-form-urlencoded"), "html=x"),
    ];

    for (uri, content_type, body) in cases {
        let engine = MockEngine::new(Behaviour::Succeed);
        let app = router_with(engine.clone(), false);
        let response = app.oneshot(post_raw(uri, content_type, body)).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{uri} {content_type:?}");
        assert_eq!(body_string(response).await, MISSING, "{uri} {content_type:?}");
        assert!(engine.jobs().is_empty());
    }
}

#[tokio::test]
async fn json_with_charset_parameter_is_accepted() {
    let engine = MockEngine::new(Behaviour::Succeed);
    let app = router_with(engine.clone(), false);
    let response = app
        .oneshot(post_raw(
            "/md-to-pdf",
            Some("application/json; charset=utf-8"),
            r#"{"markdown":"Hi"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(engine.jobs().len(), 1);
}

#[tokio::test]
async fn oversized_body_is_rejected() {
    let config = ConversionConfig::builder()
        .engine(MockEngine::new(Behaviour::Succeed))
        .build()
        .unwrap();
    let app = build_router(AppState::new(config), 64);
    let body = serde_json::json!({ "markdown": "x".repeat(1024) }).to_string();

    let response = app
        .clone()
        .oneshot(post_json("/convert", &body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);

    let response = app
        .oneshot(post_raw("/convert", None, &body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

// ── Failures and instance accounting ─────────────────────────────────────────

#[tokio::test]
async fn render_failure_is_generic_500() {
    let engine = MockEngine::new(Behaviour::Fail);

    for (uri, body, message) in [
        ("/convert", r#"{"markdown":"x"}"#, "Error converting Markdown to PDF"),
        ("/md-to-pdf", r#"{"markdown":"x"}"#, "Error converting Markdown to PDF"),
        ("/html-to-pdf", r#"{"html":"<p>x</p>"}"#, "Error converting HTML to PDF"),
    ] {
        let app = router_with(engine.clone(), false);
        let response = app.oneshot(post_json(uri, body)).await.unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(header_str(&response, header::CONTENT_TYPE).starts_with("text/plain"));
        let text = body_string(response).await;
        assert_eq!(text, message);
        assert!(!text.contains("mock capture failure"));
    }
    assert_eq!(engine.gauge.live(), 0);
}

#[tokio::test]
async fn instances_track_in_flight_requests() {
    common::init_tracing();
    let gate = Arc::new(Semaphore::new(0));
    let engine = MockEngine::new(Behaviour::Gated(gate.clone()));
    let config = ConversionConfig::builder()
        .engine(engine.clone())
        .build()
        .unwrap();
    let state = AppState::new(config);
    let app = build_router(state.clone(), DEFAULT_BODY_LIMIT);

    let mut handles = Vec::new();
    for i in 0..3 {
        let app = app.clone();
        let body = format!(r#"{{"markdown":"doc {i}"}}"#);
        handles.push(tokio::spawn(async move {
            app.oneshot(post_json("/md-to-pdf", &body)).await.unwrap()
        }));
    }

    for _ in 0..200 {
        if engine.gauge.live() == 3 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(engine.gauge.live(), 3);
    assert_eq!(state.live_instances(), Some(3));

    gate.add_permits(3);
    for handle in handles {
        assert_eq!(handle.await.unwrap().status(), StatusCode::OK);
    }
    assert_eq!(state.live_instances(), Some(0));
}

#[tokio::test]
async fn default_state_shares_one_chromium_engine() {
    let state = AppState::new(ConversionConfig::default());
    let engine = state.conversion.engine.clone().unwrap();
    assert_eq!(engine.name(), "chromium");
    assert_eq!(state.live_instances(), Some(0));

    let copy = state.clone();
    let same = copy.conversion.engine.clone().unwrap();
    assert!(Arc::ptr_eq(&engine, &same));
}
