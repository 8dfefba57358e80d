//! URL canonicalization and hosting-domain quirk handling
//!
//! Every player URL goes through [`normalize`] before it is dispatched
//! anywhere: the query string is decoded and rebuilt so upstream
//! double-encoding artifacts cannot leak into requests, hosts that moved
//! are rewritten to their working equivalents, and hosts on the skip-list
//! short-circuit to `None` before any request is made.

use url::Url;

/// Hosts rewritten to a working equivalent before any other rule applies.
/// Literal substring substitutions; a rewrite can change which skip rule
/// matches, so rewrites run first.
const REWRITE_RULES: &[(&str, &str)] = &[
    ("dood.to", "dood.so"),
    ("streamsb.net", "sbplay2.xyz"),
    ("player.upvid.co", "upvid.pro"),
];

/// Hosts known to be non-functional; checked against the rewritten host
const SKIP_DOMAINS: &[&str] = &[
    "fembed.com",
    "jetload.net",
    "clipwatching.com",
    "gounlimited.to",
];

/// Domain family whose redirect chain breaks under stealth/headless
/// rendering; the resolver runs these with full rendering and tracks the
/// final URL after redirects.
const DIRECT_RENDER_HOSTS: &[&str] = &["hqq.ac", "hqq.tv", "waaw.to"];

/// Canonicalize a URL and apply the hosting quirk tables.
///
/// Returns `None` for unparseable URLs and for skip-listed hosts.
/// Idempotent: normalizing an already-normalized URL yields the same URL.
pub fn normalize(raw: &str) -> Option<String> {
    normalize_with_skips(raw, &[])
}

/// [`normalize`] with configured skip domains layered over the built-ins
pub fn normalize_with_skips(raw: &str, extra_skips: &[String]) -> Option<String> {
    let mut parsed = Url::parse(raw).ok()?;

    // Rebuild the query from decoded pairs for consistent encoding
    if parsed.query().is_some() {
        let pairs: Vec<(String, String)> = parsed
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        parsed.query_pairs_mut().clear().extend_pairs(pairs);
    }

    let mut out = parsed.to_string();
    for (from, to) in REWRITE_RULES {
        if out.contains(from) {
            out = out.replace(from, to);
        }
    }

    let host = Url::parse(&out).ok()?.host_str()?.to_string();
    if SKIP_DOMAINS.iter().any(|d| host_in_domain(&host, d))
        || extra_skips.iter().any(|d| host_in_domain(&host, d))
    {
        log::info!("Skipping known-broken host: {}", host);
        return None;
    }

    Some(out)
}

/// Exact host or a subdomain of it; a bare suffix match would also catch
/// unrelated hosts like `notfembed.com`
fn host_in_domain(host: &str, domain: &str) -> bool {
    host == domain
        || host
            .strip_suffix(domain)
            .is_some_and(|prefix| prefix.ends_with('.'))
}

/// Whether the URL belongs to the direct-render (non-stealth) family
pub fn requires_direct_render(url: &str) -> bool {
    DIRECT_RENDER_HOSTS.iter().any(|d| url.contains(d))
}

/// Built-in skip-list, exposed so config defaults can extend it
pub fn default_skip_domains() -> Vec<String> {
    SKIP_DOMAINS.iter().map(|s| s.to_string()).collect()
}
