//! Show source resolution service
//!
//! Composes the domain directory, site search, player extractor and stream
//! resolver into the end-to-end "get sources for this title" operation:
//! staleness-triggered domain refresh, two-round search (plain title, then
//! catalog-ID-qualified), episode URL-pattern fallbacks and sequential
//! multi-player trials with a bounded number of alternate results.
//!
//! Collaborators sit behind traits so the control flow is testable with
//! stubs; the real implementations live in their own modules.

use crate::domain_directory::DomainDirectory;
use crate::models::{PlayerCandidate, SourceRequest, SourcesOutcome};
use crate::player_extractor::PlayerExtractor;
use crate::site_search::SearchClient;
use crate::stream_resolver::StreamResolver;
use async_trait::async_trait;
use log::{info, warn};
use std::sync::Arc;

/// Alternate results tried after the first one fails
const MAX_ALTERNATE_RESULTS: usize = 3;

#[async_trait]
pub trait DomainProvider: Send + Sync {
    async fn current_base(&self) -> String;
    async fn force_refresh(&self) -> String;
    fn mark_success(&self);
    fn is_stale(&self) -> bool;
}

#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(&self, base: &str, query: &str) -> Vec<String>;
}

#[async_trait]
pub trait PlayerSource: Send + Sync {
    async fn get_player_urls(&self, base: &str, content_page_url: &str) -> Vec<PlayerCandidate>;
}

#[async_trait]
pub trait ManifestExtractor: Send + Sync {
    async fn extract(&self, player_url: &str) -> Option<String>;
}

#[async_trait]
impl DomainProvider for DomainDirectory {
    async fn current_base(&self) -> String {
        DomainDirectory::current_base(self).await
    }
    async fn force_refresh(&self) -> String {
        DomainDirectory::force_refresh(self).await
    }
    fn mark_success(&self) {
        DomainDirectory::mark_success(self)
    }
    fn is_stale(&self) -> bool {
        DomainDirectory::is_stale(self)
    }
}

#[async_trait]
impl SearchProvider for SearchClient {
    async fn search(&self, base: &str, query: &str) -> Vec<String> {
        SearchClient::search(self, base, query).await
    }
}

#[async_trait]
impl PlayerSource for PlayerExtractor {
    async fn get_player_urls(&self, base: &str, content_page_url: &str) -> Vec<PlayerCandidate> {
        PlayerExtractor::get_player_urls(self, base, content_page_url).await
    }
}

/// Runs the blocking Chrome-driving resolver off the async runtime
pub struct BlockingExtractor {
    resolver: Arc<StreamResolver>,
}

impl BlockingExtractor {
    pub fn new(resolver: Arc<StreamResolver>) -> Self {
        Self { resolver }
    }
}

#[async_trait]
impl ManifestExtractor for BlockingExtractor {
    async fn extract(&self, player_url: &str) -> Option<String> {
        let resolver = self.resolver.clone();
        let url = player_url.to_string();
        match tokio::task::spawn_blocking(move || resolver.extract_manifest_url(&url)).await {
            Ok(outcome) => outcome.manifest_url,
            Err(e) => {
                warn!("Extraction task panicked or was cancelled: {}", e);
                None
            }
        }
    }
}

pub struct Orchestrator {
    domains: Arc<dyn DomainProvider>,
    search: Arc<dyn SearchProvider>,
    players: Arc<dyn PlayerSource>,
    extractor: Arc<dyn ManifestExtractor>,
}

impl Orchestrator {
    pub fn new(
        domains: Arc<dyn DomainProvider>,
        search: Arc<dyn SearchProvider>,
        players: Arc<dyn PlayerSource>,
        extractor: Arc<dyn ManifestExtractor>,
    ) -> Self {
        Self {
            domains,
            search,
            players,
            extractor,
        }
    }

    /// End-to-end resolution of a request to a manifest URL or a short
    /// error. Never panics or errors; every failure path ends in one of the
    /// fixed error strings.
    pub async fn resolve_sources(&self, request: &SourceRequest) -> SourcesOutcome {
        info!(
            "Resolving sources for '{}' (catalog {})",
            request.title, request.catalog_id
        );

        // Prolonged failure suggests the domain silently rotated
        if self.domains.is_stale() {
            info!("Last success is stale, forcing domain refresh");
            self.domains.force_refresh().await;
        }

        let slug = request.title.split_whitespace().collect::<Vec<_>>().join("_");
        let mut base = self.domains.current_base().await;

        let mut results = self.search.search(&base, &slug).await;

        // Empty search is how a silent mid-operation rotation shows up;
        // refresh once and retry the same query
        if results.is_empty() {
            warn!("Empty search result, refreshing domain and retrying");
            base = self.domains.force_refresh().await;
            results = self.search.search(&base, &slug).await;
        }

        // Single-result fast path: no second search round
        if results.len() == 1 {
            info!("Single search result, attempting extraction directly");
            if let Some(url) = self.try_content_page(&base, &results[0]).await {
                return self.success(url);
            }
        }

        // Disambiguate with the catalog ID
        let qualified = format!("{}_{}", slug, request.catalog_id);
        let qualified_results = self.search.search(&base, &qualified).await;

        let candidates = if !qualified_results.is_empty() {
            qualified_results
        } else {
            results
        };
        if candidates.is_empty() {
            warn!("No results in either search round");
            return SourcesOutcome::not_found();
        }

        // Episode URL patterns sidestep the listing page entirely
        if request.is_episode() {
            let season = request.season.unwrap();
            let episode = request.episode.unwrap();
            for episode_url in episode_url_patterns(&base, &slug, &request.catalog_id, season, episode)
            {
                info!("Trying episode URL pattern: {}", episode_url);
                if let Some(url) = self.try_content_page(&base, &episode_url).await {
                    return self.success(url);
                }
            }
        }

        // First result, then a bounded number of alternates
        if let Some(url) = self.try_content_page(&base, &candidates[0]).await {
            return self.success(url);
        }
        for alternate in candidates.iter().skip(1).take(MAX_ALTERNATE_RESULTS) {
            info!("Trying alternate result: {}", alternate);
            if let Some(url) = self.try_content_page(&base, alternate).await {
                return self.success(url);
            }
        }

        warn!("All candidates exhausted without a manifest URL");
        SourcesOutcome::no_valid_sources()
    }

    /// Trial every player on one content page sequentially; first manifest
    /// wins and remaining players are abandoned. Sequential on purpose, to
    /// bound concurrent browser sessions.
    async fn try_content_page(&self, base: &str, content_page_url: &str) -> Option<String> {
        let players = self.players.get_player_urls(base, content_page_url).await;
        if players.is_empty() {
            return None;
        }

        for player in players {
            let player_url = match player.resolved_player_url {
                Some(url) => url,
                None => continue,
            };
            if let Some(manifest) = self.extractor.extract(&player_url).await {
                return Some(manifest);
            }
        }
        None
    }

    fn success(&self, manifest_url: String) -> SourcesOutcome {
        self.domains.mark_success();
        info!("Resolved manifest URL: {}", manifest_url);
        SourcesOutcome::Found { manifest_url }
    }
}

/// The three episode URL shapes the site serves, in trial order
pub fn episode_url_patterns(
    base: &str,
    slug: &str,
    catalog_id: &str,
    season: u32,
    episode: u32,
) -> Vec<String> {
    let base = base.trim_end_matches('/');
    vec![
        format!("{}/episodios/{}-{}x{}/", base, slug, season, episode),
        format!(
            "{}/episodios/{}_{}-{}x{}/",
            base, slug, catalog_id, season, episode
        ),
        format!(
            "{}/serie/{}/temporada-{}/capitulo-{}",
            base, slug, season, episode
        ),
    ]
}
