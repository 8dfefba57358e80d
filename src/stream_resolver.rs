//! Headless extraction engine
//!
//! Given a third-party player URL, drives an isolated Chrome session and
//! races a network-response watch against a deadline; when the watch finds
//! nothing, falls back to DOM/script inspection and finally to simulated
//! user interaction. Always resolves to an outcome, never errors across its
//! boundary, so the orchestrator's sequential player loop keeps moving.
//!
//! The state machine per invocation: Init -> Launch -> Race -> DOM Fallback
//! -> Interaction Fallback -> Teardown. The overall deadline bounds the
//! whole invocation; the network watch has its own inner deadline.

use crate::config::ResolverConfig;
use crate::models::ExtractionOutcome;
use crate::url_normalizer::{normalize_with_skips, requires_direct_render};
use headless_chrome::{Browser, LaunchOptions, Tab};
use log::{info, warn};
use regex::Regex;
use scraper::{Html, Selector};
use std::ffi::OsStr;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// HLS manifest MIME types accepted independently of the URL
const HLS_MIME_TYPES: &[&str] = &[
    "application/vnd.apple.mpegurl",
    "application/x-mpegurl",
    "audio/mpegurl",
    "audio/x-mpegurl",
];

/// Inline-script assignment patterns, most specific first; each requires
/// the manifest extension in the captured URL
const SCRIPT_PATTERNS: &[&str] = &[
    r#"file:\s*['"]([^'"]+\.m3u8[^'"]*)['"]"#,
    r#"source:\s*['"]([^'"]+\.m3u8[^'"]*)['"]"#,
    r#"src:\s*['"]([^'"]+\.m3u8[^'"]*)['"]"#,
    r#"url:\s*['"]([^'"]+\.m3u8[^'"]*)['"]"#,
    r#"['"]([^'"]+\.m3u8[^'"]*)['"]"#,
];

const JWPLAYER_PROBE: &str = r#"
(() => {
    try {
        if (window.jwplayer && typeof window.jwplayer === 'function') {
            const player = window.jwplayer();
            if (player && player.getPlaylist) {
                const playlist = player.getPlaylist();
                if (playlist && playlist[0] && playlist[0].file
                        && playlist[0].file.includes('.m3u8')) {
                    return playlist[0].file;
                }
            }
        }
    } catch (e) {}
    return null;
})()
"#;

const INTERACTION_SCRIPT: &str = r#"
(() => {
    const buttons = document.querySelectorAll(
        'button[class*="play"], .play-button, .vjs-big-play-button');
    buttons.forEach(btn => { try { btn.click(); } catch (e) {} });
    document.querySelectorAll('video').forEach(video => {
        try { video.play(); } catch (e) {}
    });
    return buttons.length;
})()
"#;

pub struct StreamResolver {
    config: ResolverConfig,
}

impl StreamResolver {
    pub fn new(config: ResolverConfig) -> Self {
        Self { config }
    }

    /// Extract a validated manifest URL from a player page.
    ///
    /// Blocking: drives a Chrome session synchronously. Callers on the
    /// async runtime should wrap this in `spawn_blocking`.
    pub fn extract_manifest_url(&self, player_url: &str) -> ExtractionOutcome {
        let started = Instant::now();

        let manifest_url = match self.prepare(player_url) {
            Some(url) => self.run_session(&url, started),
            None => None,
        };

        let outcome = ExtractionOutcome {
            manifest_url,
            elapsed_ms: started.elapsed().as_millis() as u64,
        };
        info!(
            "Extraction finished in {}ms: {:?}",
            outcome.elapsed_ms, outcome.manifest_url
        );
        outcome
    }

    /// Init stage: validate and normalize the input
    fn prepare(&self, player_url: &str) -> Option<String> {
        if player_url.trim().is_empty() {
            return None;
        }
        normalize_with_skips(player_url, &self.config.skip_domains)
    }

    /// Launch through Teardown; any internal error degrades to None
    fn run_session(&self, player_url: &str, started: Instant) -> Option<String> {
        let direct_render = requires_direct_render(player_url);
        if direct_render {
            info!("Direct-render host, running without stealth: {}", player_url);
        }

        let browser = match launch_browser(direct_render) {
            Ok(b) => b,
            Err(e) => {
                warn!("Browser launch failed: {}", e);
                return None;
            }
        };

        let overall = Duration::from_secs(self.config.overall_deadline_secs);
        let result = self.drive_tab(&browser, player_url, direct_render, started, overall);

        teardown(browser, Duration::from_secs(self.config.teardown_secs));
        result.unwrap_or_else(|e| {
            warn!("Extraction session error, treating as not found: {}", e);
            None
        })
    }

    fn drive_tab(
        &self,
        browser: &Browser,
        player_url: &str,
        direct_render: bool,
        started: Instant,
        overall: Duration,
    ) -> Result<Option<String>, Box<dyn std::error::Error>> {
        let tab = browser.new_tab()?;

        // Network watch: every completed response is checked against the
        // manifest predicate; hits accumulate in observation order
        let hits: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let hits_writer = hits.clone();
        tab.register_response_handling(
            "manifest-watch",
            Box::new(move |params, _fetch_body| {
                let response = &params.response;
                if manifest_hit(&response.url, response.status as i64, &response.mime_type) {
                    info!("Network watch hit: {}", response.url);
                    hits_writer.lock().unwrap().push(response.url.clone());
                }
            }),
        )?;

        info!("Navigating to player URL: {}", player_url);
        if let Err(e) = tab.navigate_to(player_url) {
            // Player pages often abort navigation mid-redirect; the watch
            // may still have seen the manifest
            warn!("Navigation error, continuing: {}", e);
        }
        if let Err(e) = tab.wait_until_navigated() {
            warn!("Navigation wait error, continuing: {}", e);
        }

        // Direct-render hosts redirect through several frames; wait for the
        // chain to settle. The watch and DOM stages below already operate
        // on the tab's final page, so the landing URL is only logged.
        if direct_render {
            std::thread::sleep(Duration::from_secs(3));
            let final_url = tab.get_url();
            if final_url != player_url {
                info!("Redirect chain settled at: {}", final_url);
            }
        }

        // Race: network watch vs inner deadline
        let inner = Duration::from_secs(self.config.network_watch_secs);
        if let Some(url) = poll_hits(&hits, started, overall.min(inner)) {
            return Ok(Some(url));
        }

        // DOM fallback: media elements and inline scripts first, then the
        // embeddable player's runtime playlist API
        if started.elapsed() < overall {
            if let Ok(html) = tab.get_content() {
                if let Some(url) = find_manifest_in_html(&html) {
                    info!("DOM fallback hit: {}", url);
                    return Ok(Some(url));
                }
            }
            if let Some(url) = evaluate_for_url(&tab, JWPLAYER_PROBE) {
                info!("JWPlayer playlist hit: {}", url);
                return Ok(Some(url));
            }
        }

        // Interaction fallback: simulate a user gesture, then re-check the
        // watch once for late network activity
        if started.elapsed() < overall {
            info!("Interaction fallback: clicking play controls");
            if let Err(e) = tab.evaluate(INTERACTION_SCRIPT, false) {
                warn!("Interaction script failed: {}", e);
            }
            let wait = Duration::from_secs(self.config.interaction_wait_secs)
                .min(overall.saturating_sub(started.elapsed()));
            std::thread::sleep(wait);
            if let Some(url) = latest_hit(&hits) {
                info!("Late network hit after interaction: {}", url);
                return Ok(Some(url));
            }
        }

        Ok(None)
    }
}

/// Whether a completed response is an HLS manifest: URL extension plus a
/// successful status, or a manifest content type on its own
pub fn manifest_hit(url: &str, status: i64, mime_type: &str) -> bool {
    let mime = mime_type.to_lowercase();
    if HLS_MIME_TYPES.iter().any(|m| mime == *m) {
        return true;
    }
    url.contains(".m3u8") && (200..300).contains(&status)
}

/// Rust-side DOM inspection of the rendered page, in priority order:
/// direct video sources, nested source elements, inline script patterns
pub fn find_manifest_in_html(html: &str) -> Option<String> {
    let document = Html::parse_document(html);

    let video_sel = Selector::parse("video").unwrap();
    for video in document.select(&video_sel) {
        if let Some(src) = video.value().attr("src") {
            if src.contains(".m3u8") {
                return Some(src.to_string());
            }
        }
    }

    let source_sel = Selector::parse("video source").unwrap();
    for source in document.select(&source_sel) {
        if let Some(src) = source.value().attr("src") {
            if src.contains(".m3u8") {
                return Some(src.to_string());
            }
        }
    }

    let script_sel = Selector::parse("script").unwrap();
    for script in document.select(&script_sel) {
        let content = script.text().collect::<String>();
        if let Some(url) = scan_script_text(&content) {
            return Some(url);
        }
    }

    None
}

/// Match inline script text against the known assignment patterns
pub fn scan_script_text(content: &str) -> Option<String> {
    for pattern in SCRIPT_PATTERNS {
        let re = Regex::new(pattern).ok()?;
        if let Some(captures) = re.captures(content) {
            if let Some(m) = captures.get(1) {
                return Some(m.as_str().to_string());
            }
        }
    }
    None
}

/// After the interaction fallback several segments may already be loading;
/// the most recently observed hit is the one the player actually chose
fn latest_hit(hits: &Arc<Mutex<Vec<String>>>) -> Option<String> {
    hits.lock().unwrap().last().cloned()
}

/// Poll the network-watch hits until the deadline; first hit wins the race
fn poll_hits(hits: &Arc<Mutex<Vec<String>>>, started: Instant, deadline: Duration) -> Option<String> {
    while started.elapsed() < deadline {
        if let Some(url) = hits.lock().unwrap().first().cloned() {
            return Some(url);
        }
        std::thread::sleep(Duration::from_millis(250));
    }
    hits.lock().unwrap().first().cloned()
}

/// Run a script expected to return a string URL or null
fn evaluate_for_url(tab: &Arc<Tab>, script: &str) -> Option<String> {
    match tab.evaluate(script, false) {
        Ok(result) => result
            .value
            .as_ref()
            .and_then(|v| v.as_str())
            .map(|s| s.to_string()),
        Err(e) => {
            warn!("Script evaluation failed: {}", e);
            None
        }
    }
}

fn launch_browser(direct_render: bool) -> Result<Browser, Box<dyn std::error::Error>> {
    let mut args: Vec<&OsStr> = vec![
        OsStr::new("--disable-blink-features=AutomationControlled"),
        OsStr::new("--disable-dev-shm-usage"),
        OsStr::new("--no-sandbox"),
        OsStr::new("--disable-setuid-sandbox"),
        OsStr::new("--disable-web-security"),
        OsStr::new("--disable-gpu"),
        OsStr::new("--disable-extensions"),
    ];

    // Images are dead weight for extraction; manifests arrive as
    // XHR/fetch/media responses which this flag does not touch. Direct-render
    // hosts get full rendering because their redirect chain is fragile.
    if !direct_render {
        args.push(OsStr::new("--blink-settings=imagesEnabled=false"));
    }

    let launch_options = LaunchOptions::default_builder()
        .headless(!direct_render)
        .window_size(Some((1280, 720)))
        .args(args)
        .build()?;

    Ok(Browser::new(launch_options)?)
}

/// Close the session without letting a hung Chrome mask an obtained result
fn teardown(browser: Browser, timeout: Duration) {
    let (tx, rx) = std::sync::mpsc::channel();
    std::thread::spawn(move || {
        drop(browser);
        let _ = tx.send(());
    });
    if rx.recv_timeout(timeout).is_err() {
        warn!("Browser teardown exceeded {:?}, abandoning session", timeout);
    }
}
