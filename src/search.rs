//! Google Scholar author search.
//!
//! Builds the author-search URL from a researcher name plus optional
//! institution and email-domain hints, and returns every candidate profile in
//! document order. Choosing among candidates is left to the caller.

use crate::config::PipelineConfig;
use crate::dom::{absolute_url, Document};
use crate::error::{LeadsError, Result};
use crate::fetcher::{fetch_html, FetchOptions, FetcherSession, SessionProvider};
use crate::model::Candidate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{error, info, warn};
use url::Url;

/// Who to look for.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchQuery {
    pub name: String,
    #[serde(default)]
    pub institution: Option<String>,
    /// Email domain as shown by Scholar ("ufrj.br")
    #[serde(default)]
    pub email: Option<String>,
}

impl SearchQuery {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_institution(mut self, institution: impl Into<String>) -> Self {
        self.institution = Some(institution.into());
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Name, institution and email joined by spaces, skipping blank hints.
    ///
    /// # Errors
    ///
    /// [`LeadsError::InvalidInput`] if the name is empty or whitespace.
    pub fn terms(&self) -> Result<String> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(LeadsError::InvalidInput(
                "Researcher name must not be empty".to_string(),
            ));
        }

        let terms: Vec<&str> = std::iter::once(name)
            .chain(self.institution.as_deref().map(str::trim))
            .chain(self.email.as_deref().map(str::trim))
            .filter(|t| !t.is_empty())
            .collect();

        Ok(terms.join(" "))
    }
}

/// Build the author search URL for `query`.
pub fn build_search_url(config: &PipelineConfig, query: &SearchQuery) -> Result<Url> {
    let terms = query.terms()?;
    let raw = format!(
        "{}/citations?view_op=search_authors&mauthors={}&hl={}",
        config.base(),
        urlencoding::encode(&terms),
        urlencoding::encode(&config.locale)
    );
    Url::parse(&raw).map_err(|e| LeadsError::Config(format!("Invalid base URL: {}", e)))
}

/// Extract candidate profile URLs from an author search results page.
///
/// Each result card links the same profile from its avatar and its name, so
/// repeated URLs keep only their first occurrence.
pub fn parse_candidates(html: &str, base_url: &str) -> Vec<Candidate> {
    let document = Document::parse(html);
    let mut seen = HashSet::new();

    document
        .select(r#"div.gsc_1usr a[href*="user="]"#)
        .into_iter()
        .filter_map(|link| link.attribute("href"))
        .filter_map(|href| absolute_url(base_url, href))
        .filter(|url| seen.insert(url.clone()))
        .map(Candidate::new)
        .collect()
}

/// Search Scholar for profiles matching `query`.
///
/// Returns an empty list when nothing matches. A transport failure becomes
/// [`LeadsError::SearchFailed`]; an empty name becomes
/// [`LeadsError::InvalidInput`] before any request is made.
pub async fn search_profiles<P: SessionProvider>(
    provider: &P,
    config: &PipelineConfig,
    query: &SearchQuery,
) -> Result<Vec<Candidate>> {
    let url = build_search_url(config, query)?;

    info!(
        name = %query.name,
        institution = ?query.institution,
        email = ?query.email,
        url = %url,
        "Searching Scholar profiles"
    );

    let session = FetcherSession::open(provider, "scholar_search")?;
    let options = FetchOptions::new(session.id(), config.fetch_timeout);

    let html = match fetch_html(&*session, url.as_str(), &options).await {
        Ok(html) => html,
        Err(e) => {
            error!(url = %url, error = %e, retriable = e.should_retry(), "Search request failed");
            return Err(LeadsError::SearchFailed(e));
        }
    };

    let candidates = parse_candidates(&html, config.base());
    if candidates.is_empty() {
        warn!(name = %query.name, "No profiles found");
    } else {
        info!(count = candidates.len(), "Found candidate profiles");
    }

    Ok(candidates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;
    use crate::testing::{StaticFetcher, StaticSessionProvider};

    const RESULTS: &str = r#"
        <html><body>
          <div class="gsc_1usr">
            <a href="/citations?hl=pt-BR&amp;user=AAA111"><img src="a.jpg"></a>
            <h3 class="gs_ai_name"><a href="/citations?hl=pt-BR&amp;user=AAA111">Maria Silva</a></h3>
          </div>
          <div class="gsc_1usr">
            <h3 class="gs_ai_name"><a href="/citations?hl=pt-BR&amp;user=BBB222">Maria S. Silva</a></h3>
          </div>
          <a href="/citations?user=OUTSIDE">not a result card</a>
        </body></html>"#;

    #[test]
    fn test_terms_order_and_blank_hints() {
        let query = SearchQuery::new("  Maria Silva ")
            .with_email("ufrj.br")
            .with_institution("UFRJ");
        assert_eq!(query.terms().ok().as_deref(), Some("Maria Silva UFRJ ufrj.br"));

        let blank = SearchQuery::new("Maria").with_institution("   ");
        assert_eq!(blank.terms().ok().as_deref(), Some("Maria"));
    }

    #[test]
    fn test_empty_name_rejected() {
        assert!(matches!(
            SearchQuery::new("   ").terms(),
            Err(LeadsError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_build_search_url_encodes_terms() {
        let config = PipelineConfig::default();
        let query = SearchQuery::new("João Silva").with_institution("UFRJ");
        let url = build_search_url(&config, &query).expect("url");
        assert!(url.as_str().starts_with(
            "https://scholar.google.com/citations?view_op=search_authors&mauthors=Jo%C3%A3o%20Silva%20UFRJ"
        ));
        assert!(url.as_str().ends_with("&hl=pt-BR"));
    }

    #[test]
    fn test_parse_candidates_document_order() {
        let candidates = parse_candidates(RESULTS, "https://scholar.google.com");
        assert_eq!(
            candidates,
            vec![
                Candidate::new("https://scholar.google.com/citations?hl=pt-BR&user=AAA111"),
                Candidate::new("https://scholar.google.com/citations?hl=pt-BR&user=BBB222"),
            ]
        );
        assert_eq!(candidates[1].user_id().as_deref(), Some("BBB222"));
    }

    #[test]
    fn test_parse_candidates_empty() {
        assert!(parse_candidates("<html><body></body></html>", "https://scholar.google.com").is_empty());
    }

    #[tokio::test]
    async fn test_search_failure_is_typed() {
        let config = PipelineConfig::default();
        let query = SearchQuery::new("Maria Silva");
        let url = build_search_url(&config, &query).expect("url");
        let provider = StaticSessionProvider::new(
            StaticFetcher::new().with_error(url.as_str(), FetchError::Captcha),
        );

        let result = search_profiles(&provider, &config, &query).await;
        assert!(matches!(result, Err(LeadsError::SearchFailed(FetchError::Captcha))));
        assert_eq!(provider.open_sessions(), 0);
    }

    #[tokio::test]
    async fn test_search_no_match_is_empty() {
        let config = PipelineConfig::default();
        let query = SearchQuery::new("Nobody Atall");
        let url = build_search_url(&config, &query).expect("url");
        let provider = StaticSessionProvider::new(
            StaticFetcher::new().with_page(url.as_str(), "<html><body><p>Nenhum resultado</p></body></html>"),
        );

        let candidates = search_profiles(&provider, &config, &query).await.expect("search");
        assert!(candidates.is_empty());
    }

    #[tokio::test]
    async fn test_empty_name_makes_no_request() {
        let provider = StaticSessionProvider::new(StaticFetcher::new());
        let result = search_profiles(&provider, &PipelineConfig::default(), &SearchQuery::new("")).await;
        assert!(matches!(result, Err(LeadsError::InvalidInput(_))));
        assert_eq!(provider.opened_total(), 0);
        assert!(provider.fetcher().requested().is_empty());
    }
}
