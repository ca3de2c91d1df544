use std::{
    net::SocketAddr,
    sync::{Arc, Mutex},
    time::Duration,
};

use actix_web::{
    body::MessageBody,
    dev::ServiceResponse,
    error::ErrorInternalServerError,
    http::{header::RETRY_AFTER, StatusCode},
    middleware::from_fn,
    test, web, App, HttpResponse,
};
use async_trait::async_trait;
use movie_gateway_domain::{
    model::{HealthReport, UpstreamRequest},
    services::{
        rate_limit::{RateLimitPolicy, RateLimiter},
        telemetry::{init_telemetry, TelemetryConfig, TelemetryGuard},
    },
    ErrorKind, RuntimeMode,
};
use movie_gateway_upstream::MovieApi;
use serde_json::{json, Value};

use crate::{
    application::{build_app, error_envelopes},
    handlers::INTERNAL_ERROR_MESSAGE,
    middleware::panic_guard,
    state::AppState,
};

/// Stand-in provider: replays a canned reply and records every request.
struct FakeMovieApi {
    reply: Result<Value, ErrorKind>,
    health: HealthReport,
    calls: Mutex<Vec<UpstreamRequest>>,
}

impl FakeMovieApi {
    fn replying(reply: Result<Value, ErrorKind>) -> Arc<Self> {
        Arc::new(Self {
            reply,
            health: HealthReport::healthy(200),
            calls: Mutex::new(Vec::new()),
        })
    }

    fn ok(payload: Value) -> Arc<Self> {
        Self::replying(Ok(payload))
    }

    fn with_health(health: HealthReport) -> Arc<Self> {
        Arc::new(Self {
            reply: Ok(json!({})),
            health,
            calls: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> Vec<UpstreamRequest> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl MovieApi for FakeMovieApi {
    async fn get(&self, request: &UpstreamRequest) -> Result<Value, ErrorKind> {
        self.calls.lock().unwrap().push(request.clone());
        self.reply.clone()
    }

    async fn health_check(&self) -> HealthReport {
        self.health.clone()
    }
}

fn telemetry() -> TelemetryGuard {
    init_telemetry(&TelemetryConfig::with_log_filter("warn")).expect("telemetry inits")
}

fn state_with_limit(fake: &Arc<FakeMovieApi>, max_points: u32, mode: RuntimeMode) -> AppState {
    let limiter = RateLimiter::new(RateLimitPolicy {
        max_points,
        window: Duration::from_secs(900),
    });
    AppState::new(fake.clone(), limiter, telemetry(), mode)
}

fn state(fake: &Arc<FakeMovieApi>) -> AppState {
    state_with_limit(fake, 100, RuntimeMode::Production)
}

fn peer(last_octet: u8) -> SocketAddr {
    SocketAddr::from(([10, 0, 0, last_octet], 40_000))
}

async fn json_body<B: MessageBody>(resp: ServiceResponse<B>) -> (StatusCode, Value) {
    let status = resp.status();
    let bytes = test::read_body(resp).await;
    let body: Value = serde_json::from_slice(&bytes).expect("json body");
    assert_eq!(body["status"], status.as_u16(), "envelope status mirrors transport");
    assert_eq!(
        body["success"],
        status.as_u16() < 400,
        "success flag tracks status"
    );
    (status, body)
}

#[actix_web::test]
async fn homepage_wraps_payload_in_success_envelope() {
    let fake = FakeMovieApi::ok(json!({ "sections": ["popular"], "status": 999 }));
    let app = test::init_service(build_app(state(&fake))).await;

    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/api/v2/homepage")
            .peer_addr(peer(1))
            .to_request(),
    )
    .await;
    let (status, body) = json_body(resp).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["creator"], "GiftedTech");
    assert_eq!(body["sections"], json!(["popular"]));
    assert_eq!(body["status"], 200);

    let calls = fake.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].endpoint(), "/homepage");
    assert!(calls[0].query().is_empty());
}

#[actix_web::test]
async fn trending_forwards_to_trending_endpoint() {
    let fake = FakeMovieApi::ok(json!({ "items": [] }));
    let app = test::init_service(build_app(state(&fake))).await;

    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/api/v2/trending")
            .peer_addr(peer(1))
            .to_request(),
    )
    .await;
    let (status, _) = json_body(resp).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fake.calls()[0].endpoint(), "/trending");
}

#[actix_web::test]
async fn empty_search_query_is_rejected_without_upstream_call() {
    let fake = FakeMovieApi::ok(json!({}));
    let app = test::init_service(build_app(state(&fake))).await;

    for uri in ["/api/v2/search/", "/api/v2/search/%20%20"] {
        let resp = test::call_service(
            &app,
            test::TestRequest::get().uri(uri).peer_addr(peer(1)).to_request(),
        )
        .await;
        let (status, body) = json_body(resp).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(body["message"], "query parameter is required");
    }
    assert!(fake.calls().is_empty());
}

#[actix_web::test]
async fn search_echoes_query_and_page() {
    let fake = FakeMovieApi::ok(json!({ "results": [{ "title": "The Matrix" }] }));
    let app = test::init_service(build_app(state(&fake))).await;

    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/api/v2/search/the%20matrix?page=3")
            .peer_addr(peer(1))
            .to_request(),
    )
    .await;
    let (status, body) = json_body(resp).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["query"], "the matrix");
    assert_eq!(body["page"], 3);
    assert_eq!(body["results"][0]["title"], "The Matrix");

    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/api/v2/search/dune")
            .peer_addr(peer(1))
            .to_request(),
    )
    .await;
    let (_, body) = json_body(resp).await;
    assert_eq!(body["page"], 1);

    let calls = fake.calls();
    assert_eq!(calls[0].endpoint(), "/search/the%20matrix");
    assert_eq!(calls[0].query().get("page"), Some("3"));
    assert_eq!(calls[1].endpoint(), "/search/dune");
    assert_eq!(calls[1].query().get("page"), Some("1"));
}

#[actix_web::test]
async fn invalid_page_is_a_validation_error() {
    let fake = FakeMovieApi::ok(json!({}));
    let app = test::init_service(build_app(state(&fake))).await;

    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/api/v2/search/dune?page=abc")
            .peer_addr(peer(1))
            .to_request(),
    )
    .await;
    let (status, body) = json_body(resp).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "page parameter must be a positive integer");
    assert!(fake.calls().is_empty());
}

#[actix_web::test]
async fn blank_info_id_is_rejected() {
    let fake = FakeMovieApi::ok(json!({}));
    let app = test::init_service(build_app(state(&fake))).await;

    for uri in ["/api/v2/info/", "/api/v2/sources/"] {
        let resp = test::call_service(
            &app,
            test::TestRequest::get().uri(uri).peer_addr(peer(1)).to_request(),
        )
        .await;
        let (status, body) = json_body(resp).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(body["message"], "id parameter is required");
    }
    assert!(fake.calls().is_empty());
}

#[actix_web::test]
async fn sources_forwards_only_present_episode_parameters() {
    let fake = FakeMovieApi::ok(json!({ "sources": [] }));
    let app = test::init_service(build_app(state(&fake))).await;

    for uri in [
        "/api/v2/sources/tt42?season=2",
        "/api/v2/sources/tt42",
        "/api/v2/sources/tt42?season=1&episode=",
        "/api/v2/sources/tt42?season=1&episode=5",
    ] {
        let resp = test::call_service(
            &app,
            test::TestRequest::get().uri(uri).peer_addr(peer(1)).to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK, "{uri}");
    }

    let calls = fake.calls();
    assert!(calls.iter().all(|call| call.endpoint() == "/sources/tt42"));

    assert_eq!(calls[0].query().get("season"), Some("2"));
    assert!(!calls[0].query().contains("episode"));

    assert!(calls[1].query().is_empty());

    assert_eq!(calls[2].query().get("season"), Some("1"));
    assert!(!calls[2].query().contains("episode"));

    assert_eq!(calls[3].query().get("episode"), Some("5"));
}

#[actix_web::test]
async fn upstream_timeout_maps_to_service_unavailable() {
    let fake = FakeMovieApi::replying(Err(ErrorKind::UpstreamUnavailable {
        reason: "operation timed out".into(),
    }));
    let app = test::init_service(build_app(state(&fake))).await;

    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/api/v2/info/42")
            .peer_addr(peer(1))
            .to_request(),
    )
    .await;
    let (status, body) = json_body(resp).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["success"], false);
    assert_eq!(
        body["message"],
        "No response from movie API - Service Unavailable"
    );
}

#[actix_web::test]
async fn upstream_status_and_message_pass_through() {
    let fake = FakeMovieApi::replying(Err(ErrorKind::upstream(
        404,
        Some(json!({ "message": "Title not found" })),
    )));
    let app = test::init_service(build_app(state(&fake))).await;

    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/api/v2/info/missing")
            .peer_addr(peer(1))
            .to_request(),
    )
    .await;
    let (status, body) = json_body(resp).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Title not found");
    assert!(body.get("creator").is_none());
}

#[actix_web::test]
async fn request_setup_failure_is_internal_error() {
    let fake = FakeMovieApi::replying(Err(ErrorKind::RequestSetupError {
        message: "relative URL without a base".into(),
    }));
    let app = test::init_service(build_app(state(&fake))).await;

    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/api/v2/trending")
            .peer_addr(peer(1))
            .to_request(),
    )
    .await;
    let (status, body) = json_body(resp).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["message"], "Error setting up request to movie API");
}

#[actix_web::test]
async fn repeated_info_requests_are_not_cached() {
    let fake = FakeMovieApi::ok(json!({ "title": "Heat" }));
    let app = test::init_service(build_app(state(&fake))).await;

    for _ in 0..2 {
        let resp = test::call_service(
            &app,
            test::TestRequest::get()
                .uri("/api/v2/info/949")
                .peer_addr(peer(1))
                .to_request(),
        )
        .await;
        let (status, body) = json_body(resp).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["title"], "Heat");
    }
    assert_eq!(fake.calls().len(), 2);
}

#[actix_web::test]
async fn health_is_ok_even_when_provider_is_down() {
    let fake = FakeMovieApi::with_health(HealthReport::unhealthy("connection refused"));
    let app = test::init_service(build_app(state(&fake))).await;

    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/api/v2/health")
            .peer_addr(peer(1))
            .to_request(),
    )
    .await;
    let (status, body) = json_body(resp).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["movieApi"]["status"], "unhealthy");
    assert_eq!(body["movieApi"]["error"], "connection refused");
    assert_eq!(body["backend"]["status"], "running");
    assert_eq!(body["backend"]["environment"], "production");
    assert!(body["backend"]["uptime"].is_number());
    assert_eq!(body["endpoints"]["search"], "/api/v2/search/{query}");
    assert!(fake.calls().is_empty());
}

#[actix_web::test]
async fn rate_limit_rejects_after_quota_without_upstream_call() {
    let fake = FakeMovieApi::ok(json!({}));
    let app = test::init_service(build_app(state_with_limit(
        &fake,
        2,
        RuntimeMode::Production,
    )))
    .await;

    for _ in 0..2 {
        let resp = test::call_service(
            &app,
            test::TestRequest::get()
                .uri("/api/v2/homepage")
                .peer_addr(peer(7))
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/api/v2/search/")
            .peer_addr(peer(7))
            .to_request(),
    )
    .await;
    assert!(resp.headers().contains_key(RETRY_AFTER));
    let (status, body) = json_body(resp).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["message"], "Too many requests, please try again later.");
    assert_eq!(fake.calls().len(), 2);

    let other = test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/api/v2/homepage")
            .peer_addr(peer(8))
            .to_request(),
    )
    .await;
    assert_eq!(other.status(), StatusCode::OK);
}

#[actix_web::test]
async fn unmatched_paths_get_not_found_envelope() {
    let fake = FakeMovieApi::ok(json!({}));
    let app = test::init_service(build_app(state(&fake))).await;

    for uri in ["/api/v1/homepage", "/api/v2/unknown", "/"] {
        let resp = test::call_service(
            &app,
            test::TestRequest::get().uri(uri).peer_addr(peer(1)).to_request(),
        )
        .await;
        let (status, body) = json_body(resp).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
        assert_eq!(
            body["message"],
            "Endpoint not found. Please check the API documentation."
        );
    }
}

#[actix_web::test]
async fn wrong_method_is_rewritten_into_envelope() {
    let fake = FakeMovieApi::ok(json!({}));
    let app = test::init_service(build_app(state(&fake))).await;

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/api/v2/homepage")
            .peer_addr(peer(1))
            .to_request(),
    )
    .await;
    let (status, _) = json_body(resp).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(fake.calls().is_empty());
}

#[actix_web::test]
async fn metrics_endpoint_renders_prometheus_text() {
    let fake = FakeMovieApi::ok(json!({}));
    let app = test::init_service(build_app(state(&fake))).await;

    test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/api/v2/trending")
            .peer_addr(peer(1))
            .to_request(),
    )
    .await;
    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/metrics")
            .peer_addr(peer(1))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = test::read_body(resp).await;
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("api_responses_total"));
}

#[actix_web::test]
async fn duplicate_query_field_is_malformed_query() {
    let fake = FakeMovieApi::ok(json!({}));
    let app = test::init_service(build_app(state(&fake))).await;

    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/api/v2/sources/tt42?season=1&season=2")
            .peer_addr(peer(1))
            .to_request(),
    )
    .await;
    let (status, body) = json_body(resp).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "query parameter is malformed");
    assert!(fake.calls().is_empty());
}

async fn failing_handler() -> Result<HttpResponse, actix_web::Error> {
    Err(ErrorInternalServerError("boom"))
}

async fn panicking_handler() -> HttpResponse {
    panic!("handler exploded")
}

/// Mounts the gateway's fault stages over handlers that fail on their own.
async fn call_faulty(mode: RuntimeMode, uri: &str) -> (StatusCode, Value) {
    let fake = FakeMovieApi::ok(json!({}));
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state_with_limit(&fake, 100, mode)))
            .wrap(error_envelopes())
            .wrap(from_fn(panic_guard))
            .route("/boom", web::get().to(failing_handler))
            .route("/panic", web::get().to(panicking_handler)),
    )
    .await;

    let resp = test::call_service(&app, test::TestRequest::get().uri(uri).to_request()).await;
    json_body(resp).await
}

#[actix_web::test]
async fn framework_500_hides_detail_in_production() {
    let (status, body) = call_faulty(RuntimeMode::Production, "/boom").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["message"], INTERNAL_ERROR_MESSAGE);
    assert!(body.get("context").is_none());
}

#[actix_web::test]
async fn framework_500_exposes_detail_in_development() {
    let (status, body) = call_faulty(RuntimeMode::Development, "/boom").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["message"], "boom");
    assert_eq!(body["context"], INTERNAL_ERROR_MESSAGE);
}

#[actix_web::test]
async fn handler_panic_becomes_internal_error_envelope() {
    let (status, body) = call_faulty(RuntimeMode::Production, "/panic").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["message"], INTERNAL_ERROR_MESSAGE);

    let (_, body) = call_faulty(RuntimeMode::Development, "/panic").await;
    assert_eq!(body["message"], "handler exploded");
}
