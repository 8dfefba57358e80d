//! Discovery and caching of the content site's current base domain
//!
//! The site rotates domains periodically and announces the current one on a
//! stable discovery page. The directory scrapes that page, verifies the
//! candidate with a live probe, and caches it: one hour on success, thirty
//! minutes when it had to fall back to the last-known-good domain so the
//! next lookup retries sooner.
//!
//! The clock is injected so TTL behavior is testable without waiting.

use crate::config::SiteConfig;
use crate::http_client::SiteClient;
use crate::models::DomainRecord;
use chrono::{DateTime, Utc};
use log::{info, warn};
use scraper::{Html, Selector};
use std::sync::{Arc, Mutex};

/// Time source, swappable for tests
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock used outside tests
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Prioritized selectors for the announced domain, most specific first
const DOMAIN_SELECTORS: &[&str] = &["h1 a", "h1", "a[href*='playdede']"];

pub struct DomainDirectory {
    client: Arc<SiteClient>,
    config: SiteConfig,
    clock: Arc<dyn Clock>,
    record: Mutex<Option<DomainRecord>>,
    last_success: Mutex<Option<DateTime<Utc>>>,
}

impl DomainDirectory {
    pub fn new(client: Arc<SiteClient>, config: SiteConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            client,
            config,
            clock,
            record: Mutex::new(None),
            last_success: Mutex::new(None),
        }
    }

    /// Current base domain, refreshing the cache on miss or expiry
    pub async fn current_base(&self) -> String {
        let now = self.clock.now();
        {
            let record = self.record.lock().unwrap();
            if let Some(r) = record.as_ref() {
                if !r.is_expired(now) {
                    return r.base_url.clone();
                }
            }
        }
        self.refresh().await
    }

    /// Refresh regardless of cache state
    pub async fn force_refresh(&self) -> String {
        info!("Forcing domain refresh");
        self.refresh().await
    }

    /// Record a confirmed-successful resolution; feeds the staleness signal
    pub fn mark_success(&self) {
        *self.last_success.lock().unwrap() = Some(self.clock.now());
    }

    /// Whether the last confirmed success is old enough to suggest the
    /// domain silently rotated
    pub fn is_stale(&self) -> bool {
        let last = self.last_success.lock().unwrap();
        match last.as_ref() {
            Some(ts) => {
                (self.clock.now() - *ts).num_hours() >= self.config.stale_after_hours
            }
            // Nothing has succeeded yet; the empty-search retry path covers
            // a wrong initial domain
            None => false,
        }
    }

    async fn refresh(&self) -> String {
        let (base_url, ttl) = match self.discover_and_verify().await {
            Some(domain) => {
                info!("Verified current domain: {}", domain);
                (domain, self.config.verified_ttl_secs)
            }
            None => {
                warn!(
                    "Domain discovery failed, using fallback {}",
                    self.config.fallback_domain
                );
                (
                    self.config.fallback_domain.clone(),
                    self.config.fallback_ttl_secs,
                )
            }
        };

        let record = DomainRecord {
            base_url: base_url.clone(),
            verified_at: self.clock.now(),
            ttl_seconds: ttl,
        };
        *self.record.lock().unwrap() = Some(record);
        base_url
    }

    async fn discover_and_verify(&self) -> Option<String> {
        let html = match self.client.get_text(&self.config.discovery_url).await {
            Ok(body) => body,
            Err(e) => {
                warn!("Discovery page fetch failed: {}", e);
                return None;
            }
        };

        let candidate = extract_announced_domain(&html)?;
        info!("Discovery page announces domain: {}", candidate);

        if self.client.probe(&candidate).await {
            Some(candidate)
        } else {
            warn!("Announced domain {} failed the live probe", candidate);
            None
        }
    }
}

/// Pull the announced domain out of the discovery page, trying the most
/// specific selector first
fn extract_announced_domain(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    for sel in DOMAIN_SELECTORS {
        let selector = match Selector::parse(sel) {
            Ok(s) => s,
            Err(_) => continue,
        };
        if let Some(element) = document.select(&selector).next() {
            let text = element.text().collect::<String>().trim().to_string();
            if !text.is_empty() {
                return Some(normalize_scheme(&text));
            }
        }
    }
    None
}

/// The discovery page announces a bare hostname; give it a scheme
fn normalize_scheme(domain: &str) -> String {
    let d = domain.trim().trim_end_matches('/');
    if d.starts_with("http://") || d.starts_with("https://") {
        d.to_string()
    } else {
        format!("https://{}", d)
    }
}
