//! Helper functions for the source resolution API
//!
//! Mostly title formatting: the content site indexes shows under lowercase
//! underscore-separated slugs with accents and punctuation stripped, so
//! every search query and episode URL goes through `format_title` first.

/// Accented letters the content site drops entirely from its slugs
const ACCENTED: &str = "áàâãäåÁÀÂÃÄÅéèêëÉÈÊËíìîïÍÌÎÏóòôõöÓÒÔÕÖúùûüÚÙÛÜñÑçÇ";

/// Punctuation stripped from slugs
const PUNCTUATION: &str = r#"()[]{}:;,.'"!¡?¿&%$#@*+-/\"#;

/// Format a title the way the content site slugs it: drop accented letters
/// and punctuation, collapse whitespace runs into `_`, lowercase.
///
/// Re-running on its own output is a no-op.
pub fn format_title(title: &str) -> String {
    let mut cleaned = String::with_capacity(title.len());
    for c in title.chars() {
        if ACCENTED.contains(c) || PUNCTUATION.contains(c) {
            continue;
        }
        cleaned.push(c);
    }

    cleaned
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .to_lowercase()
}

/// Resolve a possibly-relative href against a base domain
pub fn absolutize(base: &str, href: &str) -> String {
    if href.starts_with("http") {
        href.to_string()
    } else {
        format!("{}/{}", base.trim_end_matches('/'), href.trim_start_matches('/'))
    }
}
