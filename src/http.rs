//! reqwest-backed page fetcher.
//!
//! Each session gets its own `reqwest::Client` (and therefore its own
//! connection pool and cookie jar); dropping the session drops the client and
//! aborts whatever it still has in flight.

use crate::config::HttpConfig;
use crate::cookies::CookieManager;
use crate::error::{FetchError, LeadsError, Result};
use crate::fetcher::{FetchOptions, FetchedPage, PageFetcher, SessionProvider};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Markers Google Scholar shows instead of results when it suspects a bot.
const CAPTCHA_MARKERS: &[&str] = &["Solving the above CAPTCHA", "unusual traffic", "gs_captcha_f"];

/// Fetcher for one extraction session.
pub struct HttpFetcher {
    client: reqwest::Client,
    cookie_header: String,
    config: HttpConfig,
}

impl HttpFetcher {
    pub fn new(config: HttpConfig, cookie_header: String) -> Result<Self> {
        Ok(Self {
            client: build_http_client(&config)?,
            cookie_header,
            config,
        })
    }
}

/// Build HTTP client with optional proxy
fn build_http_client(config: &HttpConfig) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder()
        .user_agent(config.user_agent.as_str())
        .connect_timeout(Duration::from_secs(10))
        .cookie_store(true);

    if let Some(proxy_url) = config.proxy.as_deref() {
        let proxy = reqwest::Proxy::all(proxy_url).map_err(|e| {
            LeadsError::Config(format!("Invalid proxy URL '{}': {}", proxy_url, e))
        })?;
        builder = builder.proxy(proxy);
    }

    builder
        .build()
        .map_err(|e| LeadsError::Config(format!("Failed to build HTTP client: {}", e)))
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(
        &self,
        url: &str,
        options: &FetchOptions,
    ) -> std::result::Result<FetchedPage, FetchError> {
        let parsed = url::Url::parse(url).map_err(|e| FetchError::InvalidUrl(format!("{}: {}", url, e)))?;

        let delay = self.config.jitter();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        debug!(url = %parsed, session = %options.session_id, "Fetching page");

        let mut request = self
            .client
            .get(parsed)
            .timeout(options.timeout)
            .header("Accept", "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8")
            .header("Accept-Language", "pt-BR,pt;q=0.9,en-US;q=0.8,en;q=0.7")
            .header("Sec-Fetch-Dest", "document")
            .header("Sec-Fetch-Mode", "navigate")
            .header("Upgrade-Insecure-Requests", "1");

        if options.bypass_cache {
            request = request
                .header("Cache-Control", "no-cache")
                .header("Pragma", "no-cache");
        }

        if !self.cookie_header.is_empty() && is_google_host(url) {
            request = request.header("Cookie", &self.cookie_header);
        }

        let response = request
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest_error(e, options.timeout))?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok())
                .unwrap_or(60);
            return Err(FetchError::RateLimited(retry_after));
        }

        if !status.is_success() {
            return Err(FetchError::Http {
                status: status.as_u16(),
                retriable: status.is_server_error(),
            });
        }

        let html = response
            .text()
            .await
            .map_err(|e| FetchError::from_reqwest_error(e, options.timeout))?;

        if CAPTCHA_MARKERS.iter().any(|m| html.contains(m)) {
            warn!(url = %url, "CAPTCHA detected");
            return Err(FetchError::Captcha);
        }

        Ok(FetchedPage::ok(html))
    }
}

fn is_google_host(url: &str) -> bool {
    url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.contains("google")))
        .unwrap_or(false)
}

/// Opens an [`HttpFetcher`] per extraction; nothing is pooled across requests.
pub struct HttpSessionProvider {
    config: HttpConfig,
    cookies: CookieManager,
}

impl HttpSessionProvider {
    pub fn new(config: HttpConfig) -> Self {
        let cookies = CookieManager::resolve(config.cookie_path.clone());
        Self { config, cookies }
    }
}

impl SessionProvider for HttpSessionProvider {
    type Fetcher = HttpFetcher;

    fn open(&self, session_id: &str) -> Result<Self::Fetcher> {
        let cookie_header = self.cookies.header_for("google");
        if cookie_header.is_empty() {
            debug!(session = %session_id, "No stored cookies; Scholar may answer with a CAPTCHA");
        } else {
            info!(session = %session_id, "Attaching stored Scholar cookies");
        }
        HttpFetcher::new(self.config.clone(), cookie_header)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_proxy_is_config_error() {
        let config = HttpConfig {
            proxy: Some("not a proxy url ::".to_string()),
            ..Default::default()
        };
        assert!(matches!(build_http_client(&config), Err(LeadsError::Config(_))));
    }

    #[test]
    fn test_is_google_host() {
        assert!(is_google_host("https://scholar.google.com/citations?user=x"));
        assert!(!is_google_host("https://doi.org/10.1/x"));
        assert!(!is_google_host("not a url"));
    }
}
