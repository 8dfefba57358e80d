//! Data model for the source resolution pipeline
//!
//! These are the shapes that cross component boundaries: the immutable
//! request, the per-placeholder player candidates, the extraction outcome,
//! the cached domain record and the user-facing response envelope.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What kind of catalog entry is being resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Movie,
    Series,
    Anime,
}

/// Immutable input to the orchestrator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceRequest {
    pub title: String,
    pub catalog_id: String,
    pub media_kind: MediaKind,
    pub season: Option<u32>,
    pub episode: Option<u32>,
}

impl SourceRequest {
    /// Season and episode are both present, so episode URL patterns apply
    pub fn is_episode(&self) -> bool {
        matches!(self.media_kind, MediaKind::Series | MediaKind::Anime)
            && self.season.is_some()
            && self.episode.is_some()
    }
}

/// One player placeholder found on a content page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerCandidate {
    /// Opaque load identifier from the placeholder element
    pub embed_id: String,
    /// Actual third-party player URL, if the embed page yielded one
    pub resolved_player_url: Option<String>,
}

/// Result of one headless extraction attempt
#[derive(Debug, Clone, Serialize)]
pub struct ExtractionOutcome {
    pub manifest_url: Option<String>,
    pub elapsed_ms: u64,
}

/// Cached content-site base domain with a bounded lifetime
#[derive(Debug, Clone)]
pub struct DomainRecord {
    pub base_url: String,
    pub verified_at: DateTime<Utc>,
    pub ttl_seconds: i64,
}

impl DomainRecord {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        (now - self.verified_at).num_seconds() >= self.ttl_seconds
    }
}

/// Final user-facing resolution result
///
/// Exactly one of a manifest URL or a short error string; internal
/// diagnostics never surface here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SourcesOutcome {
    Found { manifest_url: String },
    Failed { error: String },
}

impl SourcesOutcome {
    pub fn not_found() -> Self {
        SourcesOutcome::Failed {
            error: "Show not found".to_string(),
        }
    }

    pub fn no_valid_sources() -> Self {
        SourcesOutcome::Failed {
            error: "No valid sources found".to_string(),
        }
    }

    pub fn processing_error() -> Self {
        SourcesOutcome::Failed {
            error: "Error processing request".to_string(),
        }
    }
}
