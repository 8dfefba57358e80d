//! HTTP handler contract tests: validation, the always-200 extract
//! endpoint, and the processing/poll flow for slow resolutions.

use actix_web::{test, web, App};
use async_trait::async_trait;
use rust_stream_resolver::app_state::AppState;
use rust_stream_resolver::config::Config;
use rust_stream_resolver::models::PlayerCandidate;
use rust_stream_resolver::orchestrator::{
    DomainProvider, ManifestExtractor, Orchestrator, PlayerSource, SearchProvider,
};
use rust_stream_resolver::server;
use rust_stream_resolver::stream_resolver::StreamResolver;
use rust_stream_resolver::tasks::TaskRegistry;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// Collaborators that resolve one fixed page/player/manifest chain, with an
/// optional artificial delay to exercise the processing path
struct FixedDomains;

#[async_trait]
impl DomainProvider for FixedDomains {
    async fn current_base(&self) -> String {
        "https://site.tld".to_string()
    }
    async fn force_refresh(&self) -> String {
        "https://site.tld".to_string()
    }
    fn mark_success(&self) {}
    fn is_stale(&self) -> bool {
        false
    }
}

struct FixedSearch {
    delay: Duration,
}

#[async_trait]
impl SearchProvider for FixedSearch {
    async fn search(&self, _base: &str, _query: &str) -> Vec<String> {
        tokio::time::sleep(self.delay).await;
        vec!["https://site.tld/pelicula/show/".to_string()]
    }
}

struct FixedPlayers;

#[async_trait]
impl PlayerSource for FixedPlayers {
    async fn get_player_urls(&self, _base: &str, _url: &str) -> Vec<PlayerCandidate> {
        vec![PlayerCandidate {
            embed_id: "p1".to_string(),
            resolved_player_url: Some("https://player.example/v/1".to_string()),
        }]
    }
}

struct FixedExtractor;

#[async_trait]
impl ManifestExtractor for FixedExtractor {
    async fn extract(&self, _player_url: &str) -> Option<String> {
        Some("https://cdn.example/master.m3u8".to_string())
    }
}

fn app_state(search_delay: Duration, response_deadline_secs: u64) -> web::Data<AppState> {
    let mut config = Config::default();
    config.resolver.response_deadline_secs = response_deadline_secs;

    let orchestrator = Arc::new(Orchestrator::new(
        Arc::new(FixedDomains),
        Arc::new(FixedSearch {
            delay: search_delay,
        }),
        Arc::new(FixedPlayers),
        Arc::new(FixedExtractor),
    ));
    let resolver = Arc::new(StreamResolver::new(config.resolver.clone()));

    web::Data::new(AppState {
        config,
        orchestrator,
        resolver,
        tasks: Arc::new(TaskRegistry::new()),
    })
}

#[actix_web::test]
async fn health_reports_ok() {
    let app = test::init_service(
        App::new()
            .app_data(app_state(Duration::ZERO, 5))
            .configure(server::configure),
    )
    .await;

    let resp = test::call_service(&app, test::TestRequest::get().uri("/health").to_request()).await;
    assert!(resp.status().is_success());
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], "ok");
}

#[actix_web::test]
async fn missing_parameters_are_rejected() {
    let app = test::init_service(
        App::new()
            .app_data(app_state(Duration::ZERO, 5))
            .configure(server::configure),
    )
    .await;

    for uri in [
        "/sources/movie",
        "/sources/movie?title=Show",
        "/sources/series?title=Show&catalog_id=42",
        "/sources/series?title=Show&catalog_id=42&season=0&episode=1",
    ] {
        let resp =
            test::call_service(&app, test::TestRequest::get().uri(uri).to_request()).await;
        assert_eq!(resp.status().as_u16(), 422, "expected 422 for {}", uri);
    }
}

#[actix_web::test]
async fn movie_resolution_returns_manifest() {
    let app = test::init_service(
        App::new()
            .app_data(app_state(Duration::ZERO, 5))
            .configure(server::configure),
    )
    .await;

    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/sources/movie?title=Show%20Name&catalog_id=42")
            .to_request(),
    )
    .await;
    assert!(resp.status().is_success());
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["manifest_url"], "https://cdn.example/master.m3u8");
}

#[actix_web::test]
async fn slow_resolution_yields_processing_status_then_poll() {
    // Zero deadline: the handler answers before the pipeline finishes
    let state = app_state(Duration::from_millis(300), 0);
    let app = test::init_service(
        App::new()
            .app_data(state.clone())
            .configure(server::configure),
    )
    .await;

    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/sources/series?title=Show&catalog_id=42&season=1&episode=1")
            .to_request(),
    )
    .await;
    assert!(resp.status().is_success());
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], "processing");
    let task_id = body["task_id"].as_str().unwrap().to_string();

    // Task keeps running server-side; poll until it delivers
    tokio::time::sleep(Duration::from_millis(600)).await;
    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri(&format!("/sources/status/{}", task_id))
            .to_request(),
    )
    .await;
    assert!(resp.status().is_success());
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["manifest_url"], "https://cdn.example/master.m3u8");

    // Consumed on first poll
    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri(&format!("/sources/status/{}", task_id))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status().as_u16(), 404);
}

#[actix_web::test]
async fn unknown_task_id_is_not_found() {
    let app = test::init_service(
        App::new()
            .app_data(app_state(Duration::ZERO, 5))
            .configure(server::configure),
    )
    .await;

    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/sources/status/00000000-0000-0000-0000-000000000000")
            .to_request(),
    )
    .await;
    assert_eq!(resp.status().as_u16(), 404);

    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/sources/status/not-a-uuid")
            .to_request(),
    )
    .await;
    assert_eq!(resp.status().as_u16(), 422);
}

#[actix_web::test]
async fn extract_manifest_is_always_http_200() {
    let app = test::init_service(
        App::new()
            .app_data(app_state(Duration::ZERO, 5))
            .configure(server::configure),
    )
    .await;

    // Missing player URL
    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/extract-manifest")
            .set_json(serde_json::json!({}))
            .to_request(),
    )
    .await;
    assert!(resp.status().is_success());
    let body: Value = test::read_body_json(resp).await;
    assert!(body["url"].is_null());

    // Skip-listed host: rejected before any browser session is launched
    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/extract-manifest")
            .set_json(serde_json::json!({"playerUrl": "https://fembed.com/v/abc"}))
            .to_request(),
    )
    .await;
    assert!(resp.status().is_success());
    let body: Value = test::read_body_json(resp).await;
    assert!(body["url"].is_null());
}
