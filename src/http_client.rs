use rand::Rng;
use reqwest::{Client, ClientBuilder, StatusCode};
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("request to {url} failed with status {status}")]
    Status { url: String, status: StatusCode },
}

/// User agents to rotate through to avoid bot detection
const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
];

/// HTTP client for the content site
///
/// Sends a session cookie with every request, rotates desktop user agents
/// and accepts the site's invalid certificate chain. Failures are not
/// retried here; callers degrade to empty results instead.
pub struct SiteClient {
    client: Client,
    cookie: String,
}

impl SiteClient {
    pub fn new(cookie: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = ClientBuilder::new()
            .timeout(timeout)
            .user_agent(Self::random_user_agent())
            // The content site rotates behind invalid/self-signed chains
            .danger_accept_invalid_certs(true)
            .gzip(true)
            .build()?;

        Ok(Self {
            client,
            cookie: cookie.to_string(),
        })
    }

    /// Get a random user agent from the pool
    fn random_user_agent() -> &'static str {
        let mut rng = rand::thread_rng();
        USER_AGENTS[rng.gen_range(0..USER_AGENTS.len())]
    }

    /// GET a page and return its body; non-2xx statuses are errors so
    /// callers can treat them like network failures
    pub async fn get_text(&self, url: &str) -> Result<String, FetchError> {
        let mut request = self
            .client
            .get(url)
            .header("User-Agent", Self::random_user_agent());
        if !self.cookie.is_empty() {
            request = request.header("Cookie", self.cookie.clone());
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status,
            });
        }
        Ok(response.text().await?)
    }

    /// HEAD-style probe used to verify a discovered domain actually answers
    pub async fn probe(&self, url: &str) -> bool {
        let mut request = self
            .client
            .get(url)
            .header("User-Agent", Self::random_user_agent());
        if !self.cookie.is_empty() {
            request = request.header("Cookie", self.cookie.clone());
        }
        match request.send().await {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                log::warn!("Probe failed for {}: {}", url, e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_client_creation() {
        let client = SiteClient::new("PLAYDEDE_SESSION=x", Duration::from_secs(5));
        assert!(client.is_ok());
    }

    #[test]
    fn test_random_user_agent() {
        let ua = SiteClient::random_user_agent();
        assert!(USER_AGENTS.contains(&ua));
    }

    #[tokio::test]
    async fn test_non_success_status_is_error() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/missing")
            .with_status(404)
            .create_async()
            .await;

        let client = SiteClient::new("", Duration::from_secs(5)).unwrap();
        let result = client.get_text(&format!("{}/missing", server.url())).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_cookie_header_sent() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/page")
            .match_header("Cookie", "PLAYDEDE_SESSION=abc")
            .with_status(200)
            .with_body("ok")
            .create_async()
            .await;

        let client = SiteClient::new("PLAYDEDE_SESSION=abc", Duration::from_secs(5)).unwrap();
        let body = client.get_text(&format!("{}/page", server.url())).await;
        assert_eq!(body.unwrap(), "ok");
    }
}
