// src/runtime.rs

//! HTTP transport for the execution pipeline.
//!
//! - `GET  /?sourceCode=...`  run the query parameter
//! - `POST /`                 run the body (JSON `{"sourceCode": ...}` or
//!                            `text/plain`, optionally base64-encoded)
//! - `GET  /health`
//!
//! Response headers are built fresh for every request.

use crate::{
    auth::api_key_auth,
    engine::{run_execution, summary::ExecutionStatus, Engine},
    execution_id::ExecutionId,
    sinks::log::LoggingEventSink,
};

use axum::{
    body::{Body, Bytes},
    extract::{Query, State},
    http::{header, HeaderMap, HeaderName, HeaderValue, Request, StatusCode},
    middleware,
    response::Response,
    routing::get,
    Router,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::Deserialize;
use std::{net::SocketAddr, time::Duration};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::Span;

const TEXT_PLAIN: &str = "text/plain";
const APPLICATION_JSON: &str = "application/json";
const X_POWERED_BY: HeaderName = HeaderName::from_static("x-powered-by");
const X_EXECUTION_ID: HeaderName = HeaderName::from_static("x-execution-id");
const CONTENT_TRANSFER_ENCODING: &str = "content-transfer-encoding";

#[derive(Clone)]
pub struct AppState {
    pub engine: Engine,
}

/* ---------------- server ---------------- */

pub fn router(state: AppState) -> Router {
    let execution = Router::new()
        .route("/", get(get_snippet).post(post_snippet))
        .layer(middleware::from_fn_with_state(state.clone(), api_key_auth));

    Router::new()
        .route("/health", get(health))
        .merge(execution)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &Request<Body>| {
                    tracing::info_span!(
                        "http_request",
                        method = %req.method(),
                        path = %req.uri().path(),
                    )
                })
                .on_response(|res: &Response, latency: Duration, _span: &Span| {
                    tracing::info!(
                        status = res.status().as_u16(),
                        latency_ms = latency.as_millis(),
                        "request completed"
                    );
                }),
        )
        .with_state(state)
}

pub async fn serve(engine: Engine, addr: &str) -> anyhow::Result<()> {
    let app = router(AppState { engine });

    let socket: SocketAddr = addr.parse()?;
    let listener = TcpListener::bind(socket).await?;

    tracing::info!("lambdarun listening on http://{}", socket);

    axum::serve(listener, app).await?;
    Ok(())
}

/* ---------------- request models ---------------- */

#[derive(Debug, Deserialize)]
struct GetParams {
    #[serde(rename = "sourceCode")]
    source_code: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct PostParams {
    #[serde(default)]
    base64: bool,
}

#[derive(Debug, Deserialize)]
struct SourceBody {
    #[serde(rename = "sourceCode")]
    source_code: Option<String>,
}

/// Reasons a request is rejected before anything is provisioned.
#[derive(Debug, thiserror::Error)]
enum ClientInputError {
    #[error("You didn't supply sourceCode!")]
    MissingSource,

    #[error("Error parsing base64-encoded parameters: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Error parsing JSON body!")]
    Json,

    #[error("Body is not valid UTF-8")]
    Utf8,
}

/* ---------------- response headers ---------------- */

/// Headers for one response. Never shared between requests.
struct ResponseHeaders {
    content_type: &'static str,
    powered_by: String,
    execution_id: Option<ExecutionId>,
}

impl ResponseHeaders {
    fn new(powered_by: &str) -> Self {
        Self {
            content_type: TEXT_PLAIN,
            powered_by: powered_by.to_string(),
            execution_id: None,
        }
    }

    fn respond(self, status: StatusCode, body: impl Into<Body>) -> Response {
        let mut res = Response::new(body.into());
        *res.status_mut() = status;

        let headers = res.headers_mut();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(self.content_type));
        if let Ok(v) = HeaderValue::from_str(&self.powered_by) {
            headers.insert(X_POWERED_BY, v);
        }
        if let Some(id) = self.execution_id {
            if let Ok(v) = HeaderValue::from_str(&id.0) {
                headers.insert(X_EXECUTION_ID, v);
            }
        }

        res
    }
}

/* ---------------- endpoints ---------------- */

async fn health() -> &'static str {
    "ok"
}

async fn get_snippet(State(state): State<AppState>, Query(params): Query<GetParams>) -> Response {
    let headers = ResponseHeaders::new(&state.engine.config.server.powered_by);

    match params.source_code {
        Some(source) => execute(&state, headers, source).await,
        None => reject(headers, ClientInputError::MissingSource),
    }
}

async fn post_snippet(
    State(state): State<AppState>,
    Query(params): Query<PostParams>,
    request_headers: HeaderMap,
    body: Bytes,
) -> Response {
    let headers = ResponseHeaders::new(&state.engine.config.server.powered_by);

    match extract_post_source(&request_headers, params.base64, &body) {
        Ok(source) => execute(&state, headers, source).await,
        Err(e) => reject(headers, e),
    }
}

async fn execute(state: &AppState, mut headers: ResponseHeaders, source: String) -> Response {
    let execution_id = ExecutionId::new();
    headers.execution_id = Some(execution_id.clone());

    let mut sink = LoggingEventSink;
    match run_execution(&state.engine, execution_id, source, &mut sink).await {
        Ok(summary) => {
            if summary.status == ExecutionStatus::Executed {
                headers.content_type = APPLICATION_JSON;
            }
            headers.respond(StatusCode::OK, summary.body)
        }
        Err(e) => headers.respond(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Error when running snippet: {}", e),
        ),
    }
}

fn reject(headers: ResponseHeaders, error: ClientInputError) -> Response {
    tracing::debug!(error = %error, "rejecting request");
    headers.respond(StatusCode::BAD_REQUEST, error.to_string())
}

/* ---------------- body decoding ---------------- */

fn extract_post_source(
    headers: &HeaderMap,
    base64_flag: bool,
    body: &[u8],
) -> Result<String, ClientInputError> {
    let is_base64 = base64_flag
        || headers
            .get(CONTENT_TRANSFER_ENCODING)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.trim().eq_ignore_ascii_case("base64"));

    let decoded = if is_base64 {
        let compact: Vec<u8> = body
            .iter()
            .copied()
            .filter(|b| !b.is_ascii_whitespace())
            .collect();
        BASE64.decode(compact)?
    } else {
        body.to_vec()
    };

    let is_plain_text = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with(TEXT_PLAIN));

    if is_plain_text {
        return String::from_utf8(decoded).map_err(|_| ClientInputError::Utf8);
    }

    let parsed: SourceBody =
        serde_json::from_slice(&decoded).map_err(|_| ClientInputError::Json)?;
    parsed.source_code.ok_or(ClientInputError::MissingSource)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::fake::{FakeBackend, HOST_NAME};
    use crate::config::Config;
    use crate::engine::ExecutionMode;
    use base64::Engine as _;
    use http_body_util::BodyExt;
    use std::io::{Cursor, Read};
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn app(fake: &Arc<FakeBackend>, mode: ExecutionMode) -> Router {
        app_with(fake, |cfg| cfg.mode = mode)
    }

    fn app_with(fake: &Arc<FakeBackend>, tweak: impl FnOnce(&mut Config)) -> Router {
        let mut config = Config::default();
        config.identity.self_name = Some(HOST_NAME.to_string());
        tweak(&mut config);
        router(AppState {
            engine: Engine::new(fake.clone(), config),
        })
    }

    async fn send(app: Router, req: Request<Body>) -> (StatusCode, HeaderMap, String) {
        let res = app.oneshot(req).await.unwrap();
        let status = res.status();
        let headers = res.headers().clone();
        let bytes = res.into_body().collect().await.unwrap().to_bytes();
        (status, headers, String::from_utf8(bytes.to_vec()).unwrap())
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_request(uri: &str, content_type: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, content_type)
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn get_with_source_runs_it() {
        let fake = Arc::new(FakeBackend::with_payload("2"));
        let (status, headers, body) = send(
            app(&fake, ExecutionMode::Execute),
            get_request("/?sourceCode=return%201%2B1"),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "2");
        assert_eq!(headers[header::CONTENT_TYPE], APPLICATION_JSON);
        assert_eq!(headers[X_POWERED_BY], "Sadness, mostly");
        assert!(headers[X_EXECUTION_ID].to_str().unwrap().starts_with("exec_"));

        let created = fake.created_units();
        let mut archive = zip::ZipArchive::new(Cursor::new(created[0].artifact.clone())).unwrap();
        let mut code = String::new();
        archive.by_index(0).unwrap().read_to_string(&mut code).unwrap();
        assert_eq!(code, "def main(event, context):\n\treturn 1+1\n");

        fake.wait_for_deletes(1).await;
        assert_eq!(fake.deleted_names(), vec![created[0].name.clone()]);
    }

    #[tokio::test]
    async fn get_without_source_is_a_client_error() {
        let fake = Arc::new(FakeBackend::new());
        let (status, headers, body) = send(app(&fake, ExecutionMode::Execute), get_request("/")).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, "You didn't supply sourceCode!");
        assert_eq!(headers[header::CONTENT_TYPE], TEXT_PLAIN);
        assert_eq!(headers[X_POWERED_BY], "Sadness, mostly");
        assert_eq!(FakeBackend::count(&fake.describes), 0);
    }

    #[tokio::test]
    async fn post_json_is_echoed_in_echo_mode() {
        let fake = Arc::new(FakeBackend::new());
        let (status, headers, body) = send(
            app(&fake, ExecutionMode::Echo),
            post_request("/", APPLICATION_JSON, r#"{"sourceCode":"pass"}"#),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "pass");
        assert_eq!(headers[header::CONTENT_TYPE], TEXT_PLAIN);
        assert_eq!(FakeBackend::count(&fake.creates), 0);
    }

    #[tokio::test]
    async fn post_json_is_executed_in_execute_mode() {
        let fake = Arc::new(FakeBackend::with_payload("null"));
        let (status, _, body) = send(
            app(&fake, ExecutionMode::Execute),
            post_request("/", APPLICATION_JSON, r#"{"sourceCode":"pass"}"#),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "null");
        assert_eq!(FakeBackend::count(&fake.invokes), 1);
    }

    #[tokio::test]
    async fn invalid_base64_is_a_client_error() {
        let fake = Arc::new(FakeBackend::new());
        let req = Request::builder()
            .method("POST")
            .uri("/")
            .header(CONTENT_TRANSFER_ENCODING, "base64")
            .body(Body::from("!!not base64!!"))
            .unwrap();
        let (status, _, body) = send(app(&fake, ExecutionMode::Echo), req).await;

        let prefix = "Error parsing base64-encoded parameters: ";
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.starts_with(prefix), "{body}");
        assert!(body.len() > prefix.len());
    }

    #[tokio::test]
    async fn base64_body_is_decoded_before_parsing() {
        let fake = Arc::new(FakeBackend::new());
        let encoded = BASE64.encode(r#"{"sourceCode":"return 42"}"#);
        let (status, _, body) = send(
            app(&fake, ExecutionMode::Echo),
            post_request("/?base64=true", APPLICATION_JSON, &encoded),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "return 42");
    }

    #[tokio::test]
    async fn plain_text_body_is_the_source() {
        let fake = Arc::new(FakeBackend::new());
        let (status, _, body) = send(
            app(&fake, ExecutionMode::Echo),
            post_request("/", "text/plain; charset=utf-8", "x = 1\nreturn x"),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "x = 1\nreturn x");
    }

    #[tokio::test]
    async fn malformed_json_is_a_client_error() {
        let fake = Arc::new(FakeBackend::new());
        let (status, _, body) = send(
            app(&fake, ExecutionMode::Echo),
            post_request("/", APPLICATION_JSON, "{sourceCode"),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, "Error parsing JSON body!");

        let (status, _, body) = send(
            app(&fake, ExecutionMode::Echo),
            post_request("/", APPLICATION_JSON, "{}"),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, "You didn't supply sourceCode!");
    }

    #[tokio::test]
    async fn backend_failure_is_a_server_error() {
        let fake = Arc::new(FakeBackend {
            fail_creates: AtomicUsize::new(1),
            ..FakeBackend::new()
        });
        let (status, headers, body) = send(
            app(&fake, ExecutionMode::Execute),
            get_request("/?sourceCode=pass"),
        )
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body.starts_with("Error when running snippet: "), "{body}");
        assert_eq!(headers[header::CONTENT_TYPE], TEXT_PLAIN);
        assert!(headers.contains_key(X_EXECUTION_ID));
        assert_eq!(FakeBackend::count(&fake.invokes), 0);
        assert_eq!(FakeBackend::count(&fake.deletes), 0);
    }

    #[tokio::test]
    async fn health_is_always_open() {
        let fake = Arc::new(FakeBackend::new());
        let (status, _, body) = send(app(&fake, ExecutionMode::Echo), get_request("/health")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "ok");
    }

    #[tokio::test]
    async fn api_key_is_enforced_when_configured() {
        std::env::set_var("LAMBDARUN_TEST_API_KEY", "letmein");
        let fake = Arc::new(FakeBackend::new());
        let make_app = || {
            app_with(&fake, |cfg| {
                cfg.mode = ExecutionMode::Echo;
                cfg.server.api_key_env = "LAMBDARUN_TEST_API_KEY".to_string();
            })
        };

        let (status, _, _) = send(make_app(), get_request("/?sourceCode=pass")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let req = Request::builder()
            .uri("/?sourceCode=pass")
            .header(header::AUTHORIZATION, "Bearer letmein")
            .body(Body::empty())
            .unwrap();
        let (status, _, body) = send(make_app(), req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "pass");
    }
}
