use actix_web::{web, App, HttpServer};
use log::info;
use std::sync::Arc;
use std::time::Duration;

use rust_stream_resolver::app_state::AppState;
use rust_stream_resolver::config::Config;
use rust_stream_resolver::domain_directory::{DomainDirectory, SystemClock};
use rust_stream_resolver::http_client::SiteClient;
use rust_stream_resolver::orchestrator::{BlockingExtractor, Orchestrator};
use rust_stream_resolver::player_extractor::PlayerExtractor;
use rust_stream_resolver::server;
use rust_stream_resolver::site_search::SearchClient;
use rust_stream_resolver::stream_resolver::StreamResolver;
use rust_stream_resolver::tasks::TaskRegistry;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = Config::load();
    info!("Starting stream resolver on {}", config.bind_addr);

    let site_client = Arc::new(
        SiteClient::new(
            &config.site.cookie,
            Duration::from_secs(config.site.request_timeout_secs),
        )
        .map_err(std::io::Error::other)?,
    );

    let directory = Arc::new(DomainDirectory::new(
        site_client.clone(),
        config.site.clone(),
        Arc::new(SystemClock),
    ));
    let search = Arc::new(SearchClient::new(site_client.clone()));
    let players = Arc::new(PlayerExtractor::new(site_client));
    let resolver = Arc::new(StreamResolver::new(config.resolver.clone()));
    let extractor = Arc::new(BlockingExtractor::new(resolver.clone()));

    let orchestrator = Arc::new(Orchestrator::new(directory, search, players, extractor));

    let state = web::Data::new(AppState {
        config: config.clone(),
        orchestrator,
        resolver,
        tasks: Arc::new(TaskRegistry::new()),
    });

    let bind_addr = config.bind_addr.clone();
    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .configure(server::configure)
    })
    .bind(&bind_addr)?
    .run()
    .await
}
