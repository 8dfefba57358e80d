// Library interface for rust_stream_resolver
// This allows tests and external crates to use the pipeline components

pub mod app_state;
pub mod config;
pub mod domain_directory;
pub mod helpers;
pub mod http_client;
pub mod models;
pub mod orchestrator;
pub mod player_extractor;
pub mod server;
pub mod site_search;
pub mod stream_resolver;
pub mod tasks;
pub mod url_normalizer;
