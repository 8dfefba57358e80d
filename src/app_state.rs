//! Shared application state for the Actix-web server

use crate::config::Config;
use crate::orchestrator::Orchestrator;
use crate::stream_resolver::StreamResolver;
use crate::tasks::TaskRegistry;
use std::sync::Arc;

/// Wrapped in `web::Data` and shared across all HTTP handlers
pub struct AppState {
    pub config: Config,
    pub orchestrator: Arc<Orchestrator>,
    /// Direct handle for the `/extract-manifest` entrypoint
    pub resolver: Arc<StreamResolver>,
    pub tasks: Arc<TaskRegistry>,
}
