use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    #[serde(default)]
    pub site: SiteConfig,

    #[serde(default)]
    pub resolver: ResolverConfig,
}

/// Content-site access settings
#[derive(Debug, Deserialize, Clone)]
pub struct SiteConfig {
    /// Session cookie sent with every content-site request
    #[serde(default = "default_cookie")]
    pub cookie: String,

    /// Page announcing the site's current base domain
    #[serde(default = "default_discovery_url")]
    pub discovery_url: String,

    /// Last-known-good base domain used when discovery fails
    #[serde(default = "default_fallback_domain")]
    pub fallback_domain: String,

    /// Timeout for content-site HTTP requests in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// TTL for a verified domain record in seconds
    #[serde(default = "default_verified_ttl")]
    pub verified_ttl_secs: i64,

    /// TTL for the fallback domain record in seconds (retry sooner)
    #[serde(default = "default_fallback_ttl")]
    pub fallback_ttl_secs: i64,

    /// Hours without a confirmed-successful resolution before forcing a
    /// domain refresh
    #[serde(default = "default_stale_hours")]
    pub stale_after_hours: i64,
}

/// Headless extraction settings
#[derive(Debug, Deserialize, Clone)]
pub struct ResolverConfig {
    /// Overall deadline for one player-URL extraction in seconds
    #[serde(default = "default_overall_deadline")]
    pub overall_deadline_secs: u64,

    /// Inner deadline for the network-response watch in seconds
    #[serde(default = "default_network_watch")]
    pub network_watch_secs: u64,

    /// Extra wait after the interaction fallback in seconds
    #[serde(default = "default_interaction_wait")]
    pub interaction_wait_secs: u64,

    /// Deadline for closing the browser session in seconds
    #[serde(default = "default_teardown")]
    pub teardown_secs: u64,

    /// Hosting domains that are never worth launching a browser for
    #[serde(default = "default_skip_domains")]
    pub skip_domains: Vec<String>,

    /// How long the transport waits for a resolution task before answering
    /// with a processing status, in seconds
    #[serde(default = "default_response_deadline")]
    pub response_deadline_secs: u64,
}

fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}
fn default_cookie() -> String {
    String::new()
}
fn default_discovery_url() -> String {
    "https://entrarplaydede.com/".to_string()
}
fn default_fallback_domain() -> String {
    "https://www6.playdede.link".to_string()
}
fn default_request_timeout() -> u64 {
    20
}
fn default_verified_ttl() -> i64 {
    3600
}
fn default_fallback_ttl() -> i64 {
    1800
}
fn default_stale_hours() -> i64 {
    24
}
fn default_overall_deadline() -> u64 {
    15
}
fn default_network_watch() -> u64 {
    10
}
fn default_interaction_wait() -> u64 {
    3
}
fn default_teardown() -> u64 {
    2
}
fn default_skip_domains() -> Vec<String> {
    crate::url_normalizer::default_skip_domains()
}
fn default_response_deadline() -> u64 {
    25
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            cookie: default_cookie(),
            discovery_url: default_discovery_url(),
            fallback_domain: default_fallback_domain(),
            request_timeout_secs: default_request_timeout(),
            verified_ttl_secs: default_verified_ttl(),
            fallback_ttl_secs: default_fallback_ttl(),
            stale_after_hours: default_stale_hours(),
        }
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            overall_deadline_secs: default_overall_deadline(),
            network_watch_secs: default_network_watch(),
            interaction_wait_secs: default_interaction_wait(),
            teardown_secs: default_teardown(),
            skip_domains: default_skip_domains(),
            response_deadline_secs: default_response_deadline(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            site: SiteConfig::default(),
            resolver: ResolverConfig::default(),
        }
    }
}

impl Config {
    pub fn load() -> Self {
        let path = Path::new("config.toml");
        if path.exists() {
            if let Ok(content) = fs::read_to_string(path) {
                if let Ok(cfg) = toml::from_str::<Config>(&content) {
                    return cfg;
                }
            }
        }
        Self::default()
    }
}
