//! Content-site search
//!
//! Issues `{base}/search?s={query}` and parses the results listing into
//! content-page URLs, in site ranking order. Every failure mode (network,
//! non-2xx, missing container) degrades to an empty list so the
//! orchestrator can treat "no results" uniformly.

use crate::helpers::absolutize;
use crate::http_client::SiteClient;
use log::{info, warn};
use scraper::{Html, Selector};

/// The live site's results container carries a leading space in its id
/// attribute; match it literally.
const RESULTS_CONTAINER: &str = r#"div[id=" archive-content"]"#;

pub struct SearchClient {
    client: std::sync::Arc<SiteClient>,
}

impl SearchClient {
    pub fn new(client: std::sync::Arc<SiteClient>) -> Self {
        Self { client }
    }

    /// Search the content site; never errors, empty on any failure
    pub async fn search(&self, base: &str, query: &str) -> Vec<String> {
        let search_url = format!("{}/search?s={}", base.trim_end_matches('/'), query);
        info!("Searching content site: {}", search_url);

        let html = match self.client.get_text(&search_url).await {
            Ok(body) => body,
            Err(e) => {
                warn!("Search request failed: {}", e);
                return Vec::new();
            }
        };

        let results = parse_search_results(&html, base);
        info!("Search returned {} results", results.len());
        results
    }
}

/// Parse the results listing: one article per result, first anchor href is
/// the content-page URL, relative hrefs resolved against the base domain
pub fn parse_search_results(html: &str, base: &str) -> Vec<String> {
    let document = Html::parse_document(html);

    let container_sel = match Selector::parse(RESULTS_CONTAINER) {
        Ok(s) => s,
        Err(_) => return Vec::new(),
    };
    let container = match document.select(&container_sel).next() {
        Some(c) => c,
        None => {
            warn!("Results container not found in search response");
            return Vec::new();
        }
    };

    let article_sel = Selector::parse("article").unwrap();
    let a_sel = Selector::parse("a").unwrap();

    let mut results = Vec::new();
    for article in container.select(&article_sel) {
        if let Some(link) = article.select(&a_sel).next() {
            if let Some(href) = link.value().attr("href") {
                if !href.is_empty() {
                    results.push(absolutize(base, href));
                }
            }
        }
    }
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    const BASE: &str = "https://www6.playdede.link";

    fn listing(items: &[&str]) -> String {
        let articles: String = items
            .iter()
            .map(|href| format!(r#"<article><a href="{}">x</a></article>"#, href))
            .collect();
        format!(
            r#"<html><body><div id=" archive-content">{}</div></body></html>"#,
            articles
        )
    }

    #[test]
    fn test_parse_preserves_site_order() {
        let html = listing(&["/pelicula/a/", "/pelicula/b/", "https://other.tld/c"]);
        let results = parse_search_results(&html, BASE);
        assert_eq!(
            results,
            vec![
                format!("{}/pelicula/a/", BASE),
                format!("{}/pelicula/b/", BASE),
                "https://other.tld/c".to_string(),
            ]
        );
    }

    #[test]
    fn test_parse_missing_container_is_empty() {
        // A container without the leading-space id quirk does not match
        let html = r#"<div id="archive-content"><article><a href="/x"></a></article></div>"#;
        assert!(parse_search_results(html, BASE).is_empty());
        assert!(parse_search_results("<html></html>", BASE).is_empty());
    }

    #[test]
    fn test_parse_skips_articles_without_links() {
        let html = r#"<div id=" archive-content"><article><p>no link</p></article><article><a href="/ok/"></a></article></div>"#;
        let results = parse_search_results(html, BASE);
        assert_eq!(results, vec![format!("{}/ok/", BASE)]);
    }

    #[tokio::test]
    async fn test_search_network_failure_is_empty() {
        let client = Arc::new(SiteClient::new("", Duration::from_secs(1)).unwrap());
        let search = SearchClient::new(client);
        // Unroutable address: connection failure degrades to empty
        let results = search.search("http://127.0.0.1:1", "show_name").await;
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_search_end_to_end_with_mock() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/search?s=show_name")
            .with_status(200)
            .with_body(listing(&["/pelicula/show-name/"]))
            .create_async()
            .await;

        let client = Arc::new(SiteClient::new("", Duration::from_secs(5)).unwrap());
        let search = SearchClient::new(client);
        let results = search.search(&server.url(), "show_name").await;
        assert_eq!(results.len(), 1);
        assert!(results[0].ends_with("/pelicula/show-name/"));
    }
}
