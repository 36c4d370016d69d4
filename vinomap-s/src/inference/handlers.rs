use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    Json,
};
use common::RequestStatus;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;
use vinomap_c::{InferenceError, TransportKind};

use crate::inference::{
    gateway::RegionGateway,
    prompt::{region_prompt, GREETING_PROMPT},
    tracker::TrackingGuard,
};

pub const REQUEST_ID_HEADER: &str = "x-request-id";

pub const MISSING_REGION: &str = "Missing region parameter";
pub const NO_INFORMATION: &str = "No information available for this region. Please try again later.";
pub const CONNECTION_REFUSED: &str =
    "Could not connect to the inference service. Please make sure it is running.";
pub const REQUEST_TIMEOUT: &str = "The inference service took too long to respond. Please try again.";
pub const TRANSPORT_FAILURE: &str = "Error communicating with the inference service.";
pub const INVALID_FORMAT: &str = "Received an invalid response format from the inference service.";
pub const UNEXPECTED_FAILURE: &str = "An unexpected error occurred while retrieving the information.";
pub const GREETING_FALLBACK: &str = "Oops! Something went wrong while retrieving the information.";

/// Status code and user-facing message for a failed inference call.
pub fn error_status(err: &InferenceError) -> (StatusCode, &'static str) {
    match err {
        InferenceError::EmptyResponse => (StatusCode::INTERNAL_SERVER_ERROR, NO_INFORMATION),
        InferenceError::Transport { kind, .. } => match kind {
            TransportKind::Refused => (StatusCode::SERVICE_UNAVAILABLE, CONNECTION_REFUSED),
            TransportKind::Timeout => (StatusCode::GATEWAY_TIMEOUT, REQUEST_TIMEOUT),
            TransportKind::Other => (StatusCode::SERVICE_UNAVAILABLE, TRANSPORT_FAILURE),
        },
        InferenceError::Decode(_) => (StatusCode::INTERNAL_SERVER_ERROR, INVALID_FORMAT),
        InferenceError::Unexpected(_) => (StatusCode::INTERNAL_SERVER_ERROR, UNEXPECTED_FAILURE),
    }
}

/// The `region` field of a request body. Blank (whitespace-only) regions are
/// treated as missing; a non-blank region is returned untrimmed.
fn region_from_body(body: &Value) -> Option<&str> {
    body.get("region")?
        .as_str()
        .filter(|region| !region.trim().is_empty())
}

/// Landing page with the model's self-introduction
pub async fn index(State(gateway): State<Arc<RegionGateway>>) -> Response {
    let general_info = match gateway
        .engine
        .generate(
            &gateway.inference.model,
            GREETING_PROMPT,
            false,
            gateway.inference.greeting_timeout(),
        )
        .await
    {
        Ok(text) => text,
        Err(e) => {
            error!("Failed to fetch greeting: {}", e);
            GREETING_FALLBACK.to_string()
        }
    };

    match gateway.pages.render_index(&general_info) {
        Ok(page) => Html(page).into_response(),
        Err(e) => {
            error!("Failed to render index page: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, GREETING_FALLBACK).into_response()
        }
    }
}

/// Handle `POST /get_region_info`
pub async fn get_region_info(
    State(gateway): State<Arc<RegionGateway>>,
    body: Result<Json<Value>, JsonRejection>,
) -> Response {
    let body = match body {
        Ok(Json(body)) => body,
        Err(e) => {
            warn!("Rejected region request: {}", e);
            Value::Null
        }
    };
    let Some(region) = region_from_body(&body) else {
        warn!("Rejected region request: missing region parameter");
        return (StatusCode::BAD_REQUEST, Json(json!({ "error": MISSING_REGION })))
            .into_response();
    };

    let request_id = gateway.tracker.admit(region).await;
    let guard = TrackingGuard::new(gateway.tracker.clone(), request_id);
    info!("Processing request {} for region {}", request_id, region);

    let prompt = region_prompt(region);
    let result = gateway
        .engine
        .generate(
            &gateway.inference.model,
            &prompt,
            true,
            gateway.inference.region_timeout(),
        )
        .await;

    let response = match result {
        Ok(text) => {
            gateway
                .tracker
                .finish(&request_id, RequestStatus::Completed)
                .await;
            info!(
                "Request {} for region {} completed ({} chars)",
                request_id,
                region,
                text.len()
            );
            region_response(text, request_id)
        }
        Err(e) => {
            gateway
                .tracker
                .finish(&request_id, RequestStatus::Error)
                .await;
            let (status, message) = error_status(&e);
            error!(
                "Request {} for region {} failed with {}: {}",
                request_id, region, status, e
            );
            error_response(status, message, request_id)
        }
    };

    let swept = gateway.tracker.sweep().await;
    debug!("Swept {} finished request(s)", swept);
    guard.disarm();
    response
}

fn region_response(info: String, request_id: Uuid) -> Response {
    (
        StatusCode::OK,
        [(REQUEST_ID_HEADER, request_id.to_string())],
        Json(json!({ "info": info, "request_id": request_id })),
    )
        .into_response()
}

fn error_response(status: StatusCode, message: &str, request_id: Uuid) -> Response {
    (
        status,
        Json(json!({ "error": message, "request_id": request_id })),
    )
        .into_response()
}

/// Liveness and in-flight request count
pub async fn health(State(gateway): State<Arc<RegionGateway>>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "model": gateway.inference.model,
        "in_flight": gateway.tracker.len().await,
        "started_at": gateway.started_at.to_rfc3339(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{header, Request},
        routing::post,
        Router,
    };
    use common::config::{Config, InferenceConfig};
    use std::time::Duration;
    use tower::ServiceExt;

    async fn spawn_upstream(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}/api/generate", addr)
    }

    async fn streaming_upstream(body: &'static str) -> String {
        spawn_upstream(Router::new().route("/api/generate", post(move || async move { body })))
            .await
    }

    fn gateway(url: String) -> Arc<RegionGateway> {
        let config = Config {
            inference: InferenceConfig {
                url,
                region_timeout_secs: 1,
                greeting_timeout_secs: 1,
                backoff_base_ms: 10,
                ..Default::default()
            },
            ..Default::default()
        };
        Arc::new(RegionGateway::new(&config).unwrap())
    }

    fn region_request(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/get_region_info")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn call(gateway: &Arc<RegionGateway>, request: Request<Body>) -> (StatusCode, Option<String>, Value) {
        let response = gateway.clone().create_router().oneshot(request).await.unwrap();
        let status = response.status();
        let header = response
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, header, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_missing_region_is_rejected_untracked() {
        let gateway = gateway(streaming_upstream("{\"response\":\"unused\"}\n").await);
        for body in [
            "{}",
            "{\"region\":\"\"}",
            "{\"region\":\"   \"}",
            "{\"region\":42}",
            "[\"Toscana\"]",
            "not json",
        ] {
            let (status, header, value) = call(&gateway, region_request(body)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "body: {}", body);
            assert_eq!(value, json!({ "error": MISSING_REGION }));
            assert!(header.is_none());
            assert!(gateway.tracker.is_empty().await);
        }
    }

    #[tokio::test]
    async fn test_success_returns_aggregated_text_and_request_id() {
        let gateway = gateway(
            streaming_upstream("{\"response\":\"A\"}\n{\"response\":\"B\"}\n{\"done\":true}\n").await,
        );
        let (status, header, value) =
            call(&gateway, region_request("{\"region\":\"Toscana\"}")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(value["info"], "AB");
        let request_id = value["request_id"].as_str().unwrap();
        assert!(Uuid::parse_str(request_id).is_ok());
        assert_eq!(header.as_deref(), Some(request_id));
        assert!(gateway.tracker.is_empty().await);
    }

    #[tokio::test]
    async fn test_upstream_receives_region_prompt() {
        let app = Router::new().route(
            "/api/generate",
            post(|Json(req): Json<common::GenerateRequest>| async move {
                let echoed = json!({ "response": req.prompt }).to_string();
                format!("{}\n", echoed)
            }),
        );
        let gateway = gateway(spawn_upstream(app).await);
        let (status, _, value) = call(&gateway, region_request("{\"region\":\"Tuscany\"}")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(value["info"], region_prompt("Tuscany"));
    }

    #[tokio::test]
    async fn test_malformed_line_does_not_fail_request() {
        let gateway = gateway(
            streaming_upstream("{\"response\":\"Nero \"}\n{oops\n{\"response\":\"d'Avola\"}\n").await,
        );
        let (status, _, value) = call(&gateway, region_request("{\"region\":\"Sicilia\"}")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(value["info"], "Nero d'Avola");
    }

    #[tokio::test]
    async fn test_empty_stream_is_500_with_request_id() {
        let gateway = gateway(streaming_upstream("{\"done\":true}\n").await);
        let (status, header, value) =
            call(&gateway, region_request("{\"region\":\"Molise\"}")).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(value["error"], NO_INFORMATION);
        assert!(value["request_id"].as_str().is_some());
        assert!(header.is_none());
        assert!(gateway.tracker.is_empty().await);
    }

    #[tokio::test]
    async fn test_connection_refused_is_503() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let gateway = gateway(format!("http://{}/api/generate", addr));
        let (status, _, value) = call(&gateway, region_request("{\"region\":\"Lazio\"}")).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(value["error"], CONNECTION_REFUSED);
        assert!(value["request_id"].as_str().is_some());
        assert!(gateway.tracker.is_empty().await);
    }

    #[tokio::test]
    async fn test_slow_upstream_is_504() {
        let app = Router::new().route(
            "/api/generate",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                "{\"response\":\"late\"}\n"
            }),
        );
        let gateway = gateway(spawn_upstream(app).await);
        let (status, _, value) = call(&gateway, region_request("{\"region\":\"Puglia\"}")).await;
        assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(value["error"], REQUEST_TIMEOUT);
        assert!(gateway.tracker.is_empty().await);
    }

    #[tokio::test]
    async fn test_upstream_client_error_is_503() {
        let app = Router::new().route(
            "/api/generate",
            post(|| async { (StatusCode::NOT_FOUND, "{\"error\":\"model not found\"}") }),
        );
        let gateway = gateway(spawn_upstream(app).await);
        let (status, _, value) = call(&gateway, region_request("{\"region\":\"Umbria\"}")).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(value["error"], TRANSPORT_FAILURE);
    }

    #[tokio::test]
    async fn test_superseded_request_is_untracked() {
        let app = Router::new().route(
            "/api/generate",
            post(|| async {
                tokio::time::sleep(Duration::from_millis(300)).await;
                "{\"response\":\"Trebbiano\"}\n"
            }),
        );
        let gateway = gateway(spawn_upstream(app).await);

        let first = tokio::spawn({
            let gateway = gateway.clone();
            async move { call(&gateway, region_request("{\"region\":\"Abruzzo\"}")).await }
        });
        tokio::time::sleep(Duration::from_millis(50)).await;
        let second = tokio::spawn({
            let gateway = gateway.clone();
            async move { call(&gateway, region_request("{\"region\":\"Abruzzo\"}")).await }
        });
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(gateway.tracker.len().await, 1);

        let (first_status, _, first_body) = first.await.unwrap();
        let (second_status, _, second_body) = second.await.unwrap();
        assert_eq!(first_status, StatusCode::OK);
        assert_eq!(second_status, StatusCode::OK);
        assert_ne!(first_body["request_id"], second_body["request_id"]);
        assert!(gateway.tracker.is_empty().await);
    }

    #[tokio::test]
    async fn test_abandoned_request_is_untracked() {
        let app = Router::new().route(
            "/api/generate",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                "{\"response\":\"late\"}\n"
            }),
        );
        let gateway = gateway(spawn_upstream(app).await);
        let task = tokio::spawn({
            let gateway = gateway.clone();
            async move { call(&gateway, region_request("{\"region\":\"Liguria\"}")).await }
        });
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(gateway.tracker.len().await, 1);

        task.abort();
        let _ = task.await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(gateway.tracker.is_empty().await);
    }

    #[tokio::test]
    async fn test_index_renders_escaped_greeting() {
        let app = Router::new().route(
            "/api/generate",
            post(|Json(req): Json<common::GenerateRequest>| async move {
                assert!(!req.stream);
                assert_eq!(req.prompt, GREETING_PROMPT);
                Json(json!({ "response": "Ciao, I'm <Mario> & I love wine" }))
            }),
        );
        let gateway = gateway(spawn_upstream(app).await);
        let request = Request::builder().uri("/").body(Body::empty()).unwrap();
        let response = gateway.clone().create_router().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let page = String::from_utf8(body.to_vec()).unwrap();
        assert!(page.contains("Ciao, I&#x27;m &lt;Mario&gt; &amp; I love wine"));
        assert!(!page.contains("{{ general_info }}"));
    }

    #[tokio::test]
    async fn test_index_falls_back_when_upstream_fails() {
        let app = Router::new().route(
            "/api/generate",
            post(|| async { (StatusCode::BAD_REQUEST, "bad") }),
        );
        let gateway = gateway(spawn_upstream(app).await);
        let request = Request::builder().uri("/").body(Body::empty()).unwrap();
        let response = gateway.clone().create_router().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let page = String::from_utf8(body.to_vec()).unwrap();
        assert!(page.contains(GREETING_FALLBACK));
    }

    #[tokio::test]
    async fn test_health_reports_in_flight() {
        let gateway = gateway(streaming_upstream("{\"response\":\"x\"}\n").await);
        gateway.tracker.admit("Campania").await;
        let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let (status, _, value) = call(&gateway, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(value["status"], "healthy");
        assert_eq!(value["in_flight"], 1);
        assert_eq!(value["model"], "mario");
    }

    #[test]
    fn test_error_status_mapping() {
        let cases = [
            (InferenceError::EmptyResponse, StatusCode::INTERNAL_SERVER_ERROR),
            (
                InferenceError::transport(TransportKind::Refused, "Connection refused"),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                InferenceError::transport(TransportKind::Timeout, "read timeout"),
                StatusCode::GATEWAY_TIMEOUT,
            ),
            (
                InferenceError::transport(TransportKind::Other, "reset"),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                InferenceError::Decode("expected value".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                InferenceError::Unexpected("boom".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(error_status(&err).0, expected, "{}", err);
        }
    }

    #[test]
    fn test_message_classification_reaches_status() {
        let refused = InferenceError::transport(
            TransportKind::from_message("tcp connect error: Connection refused (os error 111)"),
            "",
        );
        assert_eq!(error_status(&refused).0, StatusCode::SERVICE_UNAVAILABLE);

        let timeout = InferenceError::transport(TransportKind::from_message("Read TimeOut"), "");
        assert_eq!(error_status(&timeout).0, StatusCode::GATEWAY_TIMEOUT);
    }
}
