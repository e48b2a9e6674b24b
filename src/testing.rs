//! In-memory fetchers for tests.
//!
//! [`StaticFetcher`] serves canned HTML by URL and can simulate failures,
//! hangs, slow responses and panics. It records every request and the peak
//! number of concurrent fetches so tests can assert on fan-out limits.

use crate::error::{FetchError, Result};
use crate::fetcher::{FetchOptions, FetchedPage, PageFetcher, SessionProvider};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

#[derive(Debug, Clone)]
enum Canned {
    Page(String),
    Unsuccessful,
    Error(FetchError),
    Hang,
    Panic,
}

#[derive(Default)]
struct Inner {
    responses: Mutex<HashMap<String, Canned>>,
    latency: Mutex<Duration>,
    requests: Mutex<Vec<(String, String)>>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

fn locked<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Canned-response fetcher. Clones share state, including responses
/// configured after cloning.
#[derive(Clone, Default)]
pub struct StaticFetcher {
    inner: Arc<Inner>,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    fn with(self, url: &str, canned: Canned) -> Self {
        locked(&self.inner.responses).insert(url.to_string(), canned);
        self
    }

    pub fn with_page(self, url: &str, html: impl Into<String>) -> Self {
        self.with(url, Canned::Page(html.into()))
    }

    /// Respond with `success = false`.
    pub fn with_unsuccessful(self, url: &str) -> Self {
        self.with(url, Canned::Unsuccessful)
    }

    pub fn with_error(self, url: &str, error: FetchError) -> Self {
        self.with(url, Canned::Error(error))
    }

    /// Never respond; only a timeout ends the fetch.
    pub fn with_hanging(self, url: &str) -> Self {
        self.with(url, Canned::Hang)
    }

    /// Panic inside the fetch future.
    pub fn with_panic(self, url: &str) -> Self {
        self.with(url, Canned::Panic)
    }

    /// Delay applied to every response.
    pub fn with_latency(self, latency: Duration) -> Self {
        *locked(&self.inner.latency) = latency;
        self
    }

    /// URLs requested so far, in call order.
    pub fn requested(&self) -> Vec<String> {
        self.requests().into_iter().map(|(url, _)| url).collect()
    }

    /// `(url, session label)` pairs requested so far.
    pub fn requests(&self) -> Vec<(String, String)> {
        locked(&self.inner.requests).clone()
    }

    pub fn peak_in_flight(&self) -> usize {
        self.inner.peak_in_flight.load(Ordering::SeqCst)
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl PageFetcher for StaticFetcher {
    async fn fetch(
        &self,
        url: &str,
        options: &FetchOptions,
    ) -> std::result::Result<FetchedPage, FetchError> {
        locked(&self.inner.requests).push((url.to_string(), options.session_id.clone()));

        let now = self.inner.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        let _guard = InFlight(&self.inner.in_flight);

        let latency = *locked(&self.inner.latency);
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        let canned = locked(&self.inner.responses).get(url).cloned();
        match canned {
            Some(Canned::Page(html)) => Ok(FetchedPage::ok(html)),
            Some(Canned::Unsuccessful) => Ok(FetchedPage::failed()),
            Some(Canned::Error(e)) => Err(e),
            Some(Canned::Hang) => {
                futures::future::pending::<()>().await;
                Err(FetchError::Network("unreachable".to_string()))
            }
            Some(Canned::Panic) => panic!("simulated fetcher panic for {}", url),
            None => Err(FetchError::Http {
                status: 404,
                retriable: false,
            }),
        }
    }
}

/// Hands out clones of one [`StaticFetcher`] and counts session lifetimes.
pub struct StaticSessionProvider {
    fetcher: StaticFetcher,
    open: AtomicUsize,
    opened_total: AtomicUsize,
    fail_open: bool,
}

impl StaticSessionProvider {
    pub fn new(fetcher: StaticFetcher) -> Self {
        Self {
            fetcher,
            open: AtomicUsize::new(0),
            opened_total: AtomicUsize::new(0),
            fail_open: false,
        }
    }

    /// A provider whose sessions cannot be opened.
    pub fn failing() -> Self {
        Self {
            fail_open: true,
            ..Self::new(StaticFetcher::new())
        }
    }

    pub fn fetcher(&self) -> &StaticFetcher {
        &self.fetcher
    }

    /// Sessions opened and not yet released.
    pub fn open_sessions(&self) -> usize {
        self.open.load(Ordering::SeqCst)
    }

    pub fn opened_total(&self) -> usize {
        self.opened_total.load(Ordering::SeqCst)
    }
}

impl SessionProvider for StaticSessionProvider {
    type Fetcher = StaticFetcher;

    fn open(&self, _session_id: &str) -> Result<Self::Fetcher> {
        if self.fail_open {
            return Err(crate::error::LeadsError::Config(
                "fetcher backend unavailable".to_string(),
            ));
        }
        self.open.fetch_add(1, Ordering::SeqCst);
        self.opened_total.fetch_add(1, Ordering::SeqCst);
        Ok(self.fetcher.clone())
    }

    fn release(&self, _session_id: &str) {
        self.open.fetch_sub(1, Ordering::SeqCst);
    }
}
