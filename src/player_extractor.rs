//! Player link extraction from content pages
//!
//! A content page lists one `div.playerItem` placeholder per embeddable
//! source, tagged with a language and an opaque `data-loadplayer` id. Each
//! id maps to an embed page that exposes the real third-party player URL in
//! an inline `var url = "..."` script. Spanish-tagged players are queried
//! first; if none exist the language filter is dropped.
//!
//! Every failure degrades to empty/None, never an error.

use crate::http_client::SiteClient;
use crate::models::PlayerCandidate;
use log::{info, warn};
use regex::Regex;
use scraper::{Html, Selector};
use std::sync::Arc;

/// Preferred language tag on placeholder elements
const PREFERRED_LANG: &str = "esp";

pub struct PlayerExtractor {
    client: Arc<SiteClient>,
}

impl PlayerExtractor {
    pub fn new(client: Arc<SiteClient>) -> Self {
        Self { client }
    }

    /// Load a content page and resolve each placeholder to a player URL.
    /// Candidates keep placeholder order; language-preferred ones come
    /// first because they are the only ones queried when present.
    pub async fn get_player_urls(&self, base: &str, content_page_url: &str) -> Vec<PlayerCandidate> {
        info!("Getting player items from: {}", content_page_url);

        let html = match self.client.get_text(content_page_url).await {
            Ok(body) => body,
            Err(e) => {
                warn!("Content page fetch failed: {}", e);
                return Vec::new();
            }
        };

        let embed_ids = extract_embed_ids(&html);
        if embed_ids.is_empty() {
            warn!("No player placeholders found on {}", content_page_url);
            return Vec::new();
        }
        info!("Found {} player placeholders", embed_ids.len());

        let mut candidates = Vec::new();
        for embed_id in embed_ids {
            let embed_url = build_embed_url(base, &embed_id);
            let resolved = self.resolve_embed(&embed_url).await;
            candidates.push(PlayerCandidate {
                embed_id,
                resolved_player_url: resolved,
            });
        }
        candidates
    }

    /// Load an embed page and pull the player URL out of its inline script
    pub async fn resolve_embed(&self, embed_url: &str) -> Option<String> {
        info!("Resolving embed: {}", embed_url);

        let html = match self.client.get_text(embed_url).await {
            Ok(body) => body,
            Err(e) => {
                warn!("Embed page fetch failed: {}", e);
                return None;
            }
        };

        match extract_player_url(&html) {
            Some(url) => {
                info!("Embed resolved to player URL: {}", url);
                Some(url)
            }
            None => {
                warn!("No player URL found in embed page");
                None
            }
        }
    }
}

/// Placeholder ids from a content page, preferring the Spanish language
/// tag and falling back to any language when no tagged players exist
pub fn extract_embed_ids(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);

    let preferred = format!(r#"div.playerItem[data-lang="{}"]"#, PREFERRED_LANG);
    for sel_str in [preferred.as_str(), "div.playerItem"] {
        let selector = match Selector::parse(sel_str) {
            Ok(s) => s,
            Err(_) => continue,
        };
        let ids: Vec<String> = document
            .select(&selector)
            .filter_map(|el| el.value().attr("data-loadplayer"))
            .filter(|id| !id.is_empty())
            .map(|id| id.to_string())
            .collect();
        if !ids.is_empty() {
            return ids;
        }
    }
    Vec::new()
}

/// Fixed embed URL shape the site serves players through
pub fn build_embed_url(base: &str, embed_id: &str) -> String {
    format!(
        "{}/embed.php?id={}&width=752&height=585",
        base.trim_end_matches('/'),
        embed_id
    )
}

/// The embed page assigns the player URL to a known script variable
pub fn extract_player_url(html: &str) -> Option<String> {
    let re = Regex::new(r#"var\s+url\s*=\s*"([^"]+)""#).ok()?;
    re.captures(html)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_extract_embed_ids_prefers_language() {
        let html = r#"
            <div class="playerItem" data-lang="lat" data-loadplayer="111"></div>
            <div class="playerItem" data-lang="esp" data-loadplayer="222"></div>
            <div class="playerItem" data-lang="esp" data-loadplayer="333"></div>
        "#;
        assert_eq!(extract_embed_ids(html), vec!["222", "333"]);
    }

    #[test]
    fn test_extract_embed_ids_falls_back_to_any_language() {
        let html = r#"
            <div class="playerItem" data-lang="lat" data-loadplayer="111"></div>
            <div class="playerItem" data-lang="sub" data-loadplayer="444"></div>
        "#;
        assert_eq!(extract_embed_ids(html), vec!["111", "444"]);
        assert!(extract_embed_ids("<div></div>").is_empty());
    }

    #[test]
    fn test_build_embed_url() {
        assert_eq!(
            build_embed_url("https://site.tld/", "abc"),
            "https://site.tld/embed.php?id=abc&width=752&height=585"
        );
    }

    #[test]
    fn test_extract_player_url() {
        let html = r#"<script>
            var w = 752;
            var url = "https://dood.so/e/abc123";
        </script>"#;
        assert_eq!(
            extract_player_url(html).unwrap(),
            "https://dood.so/e/abc123"
        );
        assert_eq!(extract_player_url("<script>var x = 1;</script>"), None);
    }

    #[tokio::test]
    async fn test_get_player_urls_end_to_end() {
        let mut server = mockito::Server::new_async().await;
        let base = server.url();

        let _page = server
            .mock("GET", "/pelicula/show/")
            .with_status(200)
            .with_body(
                r#"<div class="playerItem" data-lang="esp" data-loadplayer="p1"></div>"#,
            )
            .create_async()
            .await;
        let _embed = server
            .mock("GET", "/embed.php?id=p1&width=752&height=585")
            .with_status(200)
            .with_body(r#"<script>var url = "https://player.example/v/1";</script>"#)
            .create_async()
            .await;

        let client = Arc::new(SiteClient::new("", Duration::from_secs(5)).unwrap());
        let extractor = PlayerExtractor::new(client);
        let candidates = extractor
            .get_player_urls(&base, &format!("{}/pelicula/show/", base))
            .await;

        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].embed_id, "p1");
        assert_eq!(
            candidates[0].resolved_player_url.as_deref(),
            Some("https://player.example/v/1")
        );
    }

    #[tokio::test]
    async fn test_unresolvable_embed_yields_none_candidate() {
        let mut server = mockito::Server::new_async().await;
        let base = server.url();

        let _page = server
            .mock("GET", "/pelicula/show/")
            .with_status(200)
            .with_body(
                r#"<div class="playerItem" data-lang="esp" data-loadplayer="p2"></div>"#,
            )
            .create_async()
            .await;
        let _embed = server
            .mock("GET", "/embed.php?id=p2&width=752&height=585")
            .with_status(200)
            .with_body("<html>no script variable here</html>")
            .create_async()
            .await;

        let client = Arc::new(SiteClient::new("", Duration::from_secs(5)).unwrap());
        let extractor = PlayerExtractor::new(client);
        let candidates = extractor
            .get_player_urls(&base, &format!("{}/pelicula/show/", base))
            .await;

        assert_eq!(candidates.len(), 1);
        assert!(candidates[0].resolved_player_url.is_none());
    }
}
