//! Page fetcher contract and per-extraction sessions.
//!
//! The pipeline only talks to [`PageFetcher`]. A [`SessionProvider`] opens a
//! fresh fetcher for each search or profile extraction; the returned
//! [`FetcherSession`] releases it when dropped, on every exit path including
//! errors, panics and cancellation of the owning future.

use crate::error::{FetchError, Result};
use async_trait::async_trait;
use std::ops::Deref;
use std::time::Duration;
use tracing::{debug, warn};

/// Per-request fetch options.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub timeout: Duration,
    /// Ask the transport to skip any cache layer
    pub bypass_cache: bool,
    /// Logical session label (e.g. "scholar_session", "all_coauthors")
    pub session_id: String,
}

impl FetchOptions {
    pub fn new(session_id: impl Into<String>, timeout: Duration) -> Self {
        Self {
            timeout,
            bypass_cache: true,
            session_id: session_id.into(),
        }
    }
}

/// Result of a fetch that reached the transport.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub html: String,
    pub success: bool,
}

impl FetchedPage {
    pub fn ok(html: impl Into<String>) -> Self {
        Self {
            html: html.into(),
            success: true,
        }
    }

    pub fn failed() -> Self {
        Self {
            html: String::new(),
            success: false,
        }
    }
}

/// Fetches a URL and returns rendered markup.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str, options: &FetchOptions) -> std::result::Result<FetchedPage, FetchError>;
}

/// Opens one fetcher per extraction request.
pub trait SessionProvider: Send + Sync {
    type Fetcher: PageFetcher;

    fn open(&self, session_id: &str) -> Result<Self::Fetcher>;

    /// Called exactly once when a session is dropped.
    fn release(&self, _session_id: &str) {}
}

/// A fetcher scoped to one extraction. Released on drop.
pub struct FetcherSession<'p, P: SessionProvider> {
    provider: &'p P,
    fetcher: P::Fetcher,
    id: String,
}

impl<'p, P: SessionProvider> FetcherSession<'p, P> {
    /// Open a session labelled `<prefix>-<random suffix>`.
    pub fn open(provider: &'p P, prefix: &str) -> Result<Self> {
        let id = format!("{}-{:08x}", prefix, rand::random::<u32>());
        let fetcher = provider.open(&id)?;
        debug!(session = %id, "Opened fetcher session");
        Ok(Self { provider, fetcher, id })
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

impl<P: SessionProvider> Deref for FetcherSession<'_, P> {
    type Target = P::Fetcher;

    fn deref(&self) -> &Self::Target {
        &self.fetcher
    }
}

impl<P: SessionProvider> Drop for FetcherSession<'_, P> {
    fn drop(&mut self) {
        self.provider.release(&self.id);
        debug!(session = %self.id, "Released fetcher session");
    }
}

/// Fetch `url` under the option's time budget and return its HTML.
///
/// `success = false` and transport errors are reported the same way.
pub async fn fetch_html<F: PageFetcher + ?Sized>(
    fetcher: &F,
    url: &str,
    options: &FetchOptions,
) -> std::result::Result<String, FetchError> {
    match tokio::time::timeout(options.timeout, fetcher.fetch(url, options)).await {
        Ok(Ok(page)) if page.success => Ok(page.html),
        Ok(Ok(_)) => Err(FetchError::Unsuccessful { url: url.to_string() }),
        Ok(Err(e)) => Err(e),
        Err(_) => {
            warn!(url = %url, timeout = ?options.timeout, "Fetch timed out");
            Err(FetchError::Timeout {
                url: url.to_string(),
                after: options.timeout,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{StaticFetcher, StaticSessionProvider};

    #[tokio::test]
    async fn test_fetch_html_maps_unsuccessful() {
        let fetcher = StaticFetcher::new()
            .with_page("https://a.test/ok", "<p>ok</p>")
            .with_unsuccessful("https://a.test/bad");
        let options = FetchOptions::new("test", Duration::from_secs(1));

        assert_eq!(
            fetch_html(&fetcher, "https://a.test/ok", &options).await.ok().as_deref(),
            Some("<p>ok</p>")
        );
        assert!(matches!(
            fetch_html(&fetcher, "https://a.test/bad", &options).await,
            Err(FetchError::Unsuccessful { .. })
        ));
        assert!(fetch_html(&fetcher, "https://a.test/missing", &options).await.is_err());
    }

    #[tokio::test]
    async fn test_fetch_html_timeout() {
        let fetcher = StaticFetcher::new().with_hanging("https://a.test/slow");
        let options = FetchOptions::new("test", Duration::from_millis(20));
        match fetch_html(&fetcher, "https://a.test/slow", &options).await {
            Err(FetchError::Timeout { after, .. }) => assert_eq!(after, Duration::from_millis(20)),
            other => panic!("expected timeout, got {:?}", other),
        }
    }

    #[test]
    fn test_session_released_on_drop() {
        let provider = StaticSessionProvider::new(StaticFetcher::new());
        {
            let session = FetcherSession::open(&provider, "profile").expect("open");
            assert!(session.id().starts_with("profile-"));
            assert_eq!(provider.open_sessions(), 1);
        }
        assert_eq!(provider.open_sessions(), 0);
        assert_eq!(provider.opened_total(), 1);
    }
}
