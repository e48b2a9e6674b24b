//! Pipeline and HTTP fetcher configuration.

use std::path::PathBuf;
use std::time::Duration;

/// Default Google Scholar URL
pub const DEFAULT_SCHOLAR_URL: &str = "https://scholar.google.com";

/// User agent string for requests
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

/// Options shared by the search step and the profile extraction pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Base URL used to resolve relative links (mirror sites allowed)
    pub base_url: String,
    /// Interface language passed as `hl=`; affects label text on detail pages
    pub locale: String,
    /// Maximum number of publications taken from the profile table
    pub max_publications: usize,
    /// Maximum concurrent publication enrichments per profile
    pub enrich_concurrency: usize,
    /// Budget for first-hop fetches (search, profile, detail, coauthors)
    pub fetch_timeout: Duration,
    /// Budget for second-hop fetches to publisher pages
    pub second_hop_timeout: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_SCHOLAR_URL.to_string(),
            locale: "pt-BR".to_string(),
            max_publications: 5,
            enrich_concurrency: 3,
            fetch_timeout: Duration::from_secs(30),
            second_hop_timeout: Duration::from_secs(15),
        }
    }
}

impl PipelineConfig {
    /// Base URL without a trailing slash.
    pub fn base(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    /// Fan-out width, never below one.
    pub fn concurrency(&self) -> usize {
        self.enrich_concurrency.max(1)
    }
}

/// Settings for the reqwest-backed fetcher.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub user_agent: String,
    /// Proxy URL (e.g., "http://127.0.0.1:7890")
    pub proxy: Option<String>,
    /// Cookie file; `None` uses `~/.scholarleads_cookies.json`
    pub cookie_path: Option<PathBuf>,
    /// Random politeness delay range applied before each request
    pub min_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: USER_AGENT.to_string(),
            proxy: None,
            cookie_path: None,
            min_delay_ms: 300,
            max_delay_ms: 1200,
        }
    }
}

impl HttpConfig {
    /// Pick a delay inside the configured range.
    pub fn jitter(&self) -> Duration {
        let span = self.max_delay_ms.saturating_sub(self.min_delay_ms);
        let extra = if span == 0 { 0 } else { rand::random::<u64>() % span };
        Duration::from_millis(self.min_delay_ms + extra)
    }
}
