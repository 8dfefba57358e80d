//! HTTP entrypoints
//!
//! `/sources/*` wraps each resolution in a task handle: the handler waits
//! up to the configured response deadline, and when the pipeline is still
//! working answers with a processing status plus a task id the client
//! polls via `/sources/status/{id}`. `/extract-manifest` mirrors the
//! original sidecar contract: always HTTP 200, errors carried in-band.

use crate::app_state::AppState;
use crate::helpers::format_title;
use crate::models::{MediaKind, SourceRequest, SourcesOutcome};
use crate::tasks::TaskStatus;
use actix_web::{get, post, web, HttpResponse, Responder};
use chrono::Utc;
use log::{info, warn};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct MovieQuery {
    title: Option<String>,
    catalog_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SeriesQuery {
    title: Option<String>,
    catalog_id: Option<String>,
    season: Option<u32>,
    episode: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct ExtractRequest {
    #[serde(rename = "playerUrl")]
    player_url: Option<String>,
}

#[get("/sources/movie")]
pub async fn movie_sources(
    data: web::Data<AppState>,
    query: web::Query<MovieQuery>,
) -> impl Responder {
    let (title, catalog_id) = match validate_title_and_id(&query.title, &query.catalog_id) {
        Ok(pair) => pair,
        Err(resp) => return resp,
    };

    let request = SourceRequest {
        title: format_title(&title),
        catalog_id,
        media_kind: MediaKind::Movie,
        season: None,
        episode: None,
    };
    run_resolution(&data, request).await
}

#[get("/sources/series")]
pub async fn series_sources(
    data: web::Data<AppState>,
    query: web::Query<SeriesQuery>,
) -> impl Responder {
    let (title, catalog_id) = match validate_title_and_id(&query.title, &query.catalog_id) {
        Ok(pair) => pair,
        Err(resp) => return resp,
    };
    let (season, episode) = match (query.season, query.episode) {
        (Some(s), Some(e)) if s >= 1 && e >= 1 => (s, e),
        _ => {
            warn!("Series request with missing or non-positive season/episode");
            return HttpResponse::UnprocessableEntity()
                .json(json!({"errors": "season and episode must be positive integers"}));
        }
    };

    let request = SourceRequest {
        title: format_title(&title),
        catalog_id,
        media_kind: MediaKind::Series,
        season: Some(season),
        episode: Some(episode),
    };
    run_resolution(&data, request).await
}

#[get("/sources/status/{task_id}")]
pub async fn sources_status(
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> impl Responder {
    let id = match Uuid::parse_str(&path) {
        Ok(id) => id,
        Err(_) => {
            return HttpResponse::UnprocessableEntity().json(json!({"errors": "invalid task id"}))
        }
    };

    match data.tasks.poll(id) {
        TaskStatus::Running => {
            HttpResponse::Ok().json(json!({"status": "processing", "task_id": id}))
        }
        TaskStatus::Finished(outcome) => HttpResponse::Ok().json(outcome),
        TaskStatus::Unknown => HttpResponse::NotFound().json(json!({"errors": "unknown task"})),
    }
}

/// Network-facing entrypoint of the stream resolver. Always HTTP 200 with
/// the result in-band so simple clients need no error branches.
#[post("/extract-manifest")]
pub async fn extract_manifest(
    data: web::Data<AppState>,
    body: web::Json<ExtractRequest>,
) -> impl Responder {
    let player_url = match body.player_url.as_deref() {
        Some(url) if !url.trim().is_empty() => url.to_string(),
        _ => return HttpResponse::Ok().json(json!({"url": null})),
    };

    info!("Extract request for player URL: {}", player_url);
    let resolver = data.resolver.clone();
    let outcome =
        match tokio::task::spawn_blocking(move || resolver.extract_manifest_url(&player_url))
            .await
        {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!("Extraction task failed: {}", e);
                return HttpResponse::Ok().json(json!({"url": null}));
            }
        };

    HttpResponse::Ok().json(json!({"url": outcome.manifest_url}))
}

#[get("/health")]
pub async fn health() -> impl Responder {
    HttpResponse::Ok().json(json!({"status": "ok", "timestamp": Utc::now().to_rfc3339()}))
}

/// Spawn the resolution task and wait up to the response deadline
async fn run_resolution(data: &web::Data<AppState>, request: SourceRequest) -> HttpResponse {
    let orchestrator = data.orchestrator.clone();
    let (task_id, done) = data
        .tasks
        .spawn(async move { orchestrator.resolve_sources(&request).await });

    let deadline = Duration::from_secs(data.config.resolver.response_deadline_secs);
    respond_within(&data.tasks, task_id, done, deadline).await
}

async fn respond_within(
    tasks: &Arc<crate::tasks::TaskRegistry>,
    task_id: Uuid,
    done: oneshot::Receiver<SourcesOutcome>,
    deadline: Duration,
) -> HttpResponse {
    match tokio::time::timeout(deadline, done).await {
        Ok(Ok(outcome)) => {
            // Consume the registry entry; this response delivers the result
            let _ = tasks.poll(task_id);
            HttpResponse::Ok().json(outcome)
        }
        _ => {
            info!("Response deadline hit, task {} continues", task_id);
            HttpResponse::Ok().json(json!({"status": "processing", "task_id": task_id}))
        }
    }
}

fn validate_title_and_id(
    title: &Option<String>,
    catalog_id: &Option<String>,
) -> Result<(String, String), HttpResponse> {
    match (title, catalog_id) {
        (Some(t), Some(c)) if !t.trim().is_empty() && !c.trim().is_empty() => {
            Ok((t.clone(), c.clone()))
        }
        _ => {
            warn!("Request missing title or catalog_id");
            Err(HttpResponse::UnprocessableEntity()
                .json(json!({"errors": "title and catalog_id are required"})))
        }
    }
}

/// Register every route; shared between `main` and the handler tests
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(movie_sources)
        .service(series_sources)
        .service(sources_status)
        .service(extract_manifest)
        .service(health);
}
