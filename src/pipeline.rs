//! Profile extraction orchestrator.
//!
//! One extraction walks a fixed sequence of stages:
//!
//! ```text
//! Idle -> FetchingPrimary -> ExtractingScalars -> ExtractingCollections
//!      -> Enriching -> Assembled -> Done
//! ```
//!
//! Only an invalid URL or a failed primary-page fetch ends in `Failed`;
//! everything after a successful primary fetch degrades field by field.
//! All fetches of one extraction go through a single [`FetcherSession`],
//! so dropping the extraction future cancels them and releases the session.

use crate::abstracts::AbstractEnricher;
use crate::classify::Classifier;
use crate::coauthors::{self, EntryParser, PrimaryCoauthors};
use crate::config::PipelineConfig;
use crate::dom::Document;
use crate::error::{LeadsError, Result};
use crate::fetcher::{fetch_html, FetchOptions, FetcherSession, SessionProvider};
use crate::model::{Candidate, ExtractionOutput, Publication, ResearcherProfile};
use crate::profile::{extract_publications, extract_scalars, ScalarFields};
use crate::search::{search_profiles, SearchQuery};
use std::fmt;
use tracing::{debug, error, info, warn};
use url::Url;

/// Stage of one profile extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionStage {
    Idle,
    FetchingPrimary,
    ExtractingScalars,
    /// Publications and coauthors from the primary page
    ExtractingCollections,
    /// Abstract fan-out and the full coauthor list, concurrently
    Enriching,
    Assembled,
    Done,
    Failed,
}

impl fmt::Display for ExtractionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::FetchingPrimary => "fetching_primary",
            Self::ExtractingScalars => "extracting_scalars",
            Self::ExtractingCollections => "extracting_collections",
            Self::Enriching => "enriching",
            Self::Assembled => "assembled",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

struct StageTracker<'u> {
    url: &'u str,
    history: Vec<ExtractionStage>,
}

impl<'u> StageTracker<'u> {
    fn new(url: &'u str) -> Self {
        Self {
            url,
            history: vec![ExtractionStage::Idle],
        }
    }

    fn current(&self) -> ExtractionStage {
        self.history.last().copied().unwrap_or(ExtractionStage::Idle)
    }

    fn advance(&mut self, next: ExtractionStage) {
        debug!(url = %self.url, from = %self.current(), stage = %next, "Stage transition");
        self.history.push(next);
    }
}

/// Everything read synchronously from the primary page.
struct PrimaryPage {
    scalars: ScalarFields,
    publications: Vec<Publication>,
    coauthors: PrimaryCoauthors,
}

fn read_primary_page(html: &str, config: &PipelineConfig, tracker: &mut StageTracker<'_>) -> PrimaryPage {
    let document = Document::parse(html);

    tracker.advance(ExtractionStage::ExtractingScalars);
    let scalars = extract_scalars(&document);

    tracker.advance(ExtractionStage::ExtractingCollections);
    let publications = extract_publications(&document, config.base(), config.max_publications);
    let coauthors = match EntryParser::new() {
        Ok(parser) => coauthors::extract_primary(&document, config.base(), &parser),
        Err(e) => {
            warn!(error = %e, "Coauthor parser unavailable, skipping coauthors");
            PrimaryCoauthors::default()
        }
    };

    PrimaryPage {
        scalars,
        publications,
        coauthors,
    }
}

fn validate_profile_url(profile_url: &str) -> Result<Url> {
    let trimmed = profile_url.trim();
    if trimmed.is_empty() {
        return Err(LeadsError::InvalidInput("Profile URL must not be empty".to_string()));
    }
    Url::parse(trimmed).map_err(|e| LeadsError::InvalidInput(format!("Invalid profile URL '{}': {}", trimmed, e)))
}

/// Picks one profile among search candidates.
pub trait CandidateSelector: Send + Sync {
    fn select<'c>(&self, candidates: &'c [Candidate]) -> Option<&'c Candidate>;
}

/// Always the first (best ranked) candidate.
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstCandidate;

impl CandidateSelector for FirstCandidate {
    fn select<'c>(&self, candidates: &'c [Candidate]) -> Option<&'c Candidate> {
        candidates.first()
    }
}

/// The candidate at a fixed position.
#[derive(Debug, Clone, Copy)]
pub struct IndexSelector(pub usize);

impl CandidateSelector for IndexSelector {
    fn select<'c>(&self, candidates: &'c [Candidate]) -> Option<&'c Candidate> {
        candidates.get(self.0)
    }
}

/// Extracts researcher profiles through sessions opened on `provider`.
pub struct ProfilePipeline<'p, P: SessionProvider> {
    provider: &'p P,
    config: PipelineConfig,
}

impl<'p, P: SessionProvider> ProfilePipeline<'p, P> {
    pub fn new(provider: &'p P, config: PipelineConfig) -> Self {
        Self { provider, config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Extract one profile.
    ///
    /// # Errors
    ///
    /// [`LeadsError::InvalidInput`] for an empty or malformed URL and
    /// [`LeadsError::ProfileFetch`] when the profile page cannot be fetched.
    pub async fn extract(&self, profile_url: &str) -> Result<ResearcherProfile> {
        self.extract_traced(profile_url).await.0
    }

    /// Extract one profile, also returning the visited stages.
    pub async fn extract_traced(&self, profile_url: &str) -> (Result<ResearcherProfile>, Vec<ExtractionStage>) {
        let mut tracker = StageTracker::new(profile_url);
        let result = self.extract_stages(profile_url, &mut tracker).await;

        match &result {
            Ok(_) => tracker.advance(ExtractionStage::Done),
            Err(e) => {
                error!(url = %profile_url, error = %e, "Profile extraction failed");
                tracker.advance(ExtractionStage::Failed);
            }
        }

        (result, tracker.history)
    }

    async fn extract_stages(&self, profile_url: &str, tracker: &mut StageTracker<'_>) -> Result<ResearcherProfile> {
        let url = validate_profile_url(profile_url)?;

        tracker.advance(ExtractionStage::FetchingPrimary);
        let session = FetcherSession::open(self.provider, "scholar_session")?;
        info!(url = %url, session = %session.id(), "Extracting profile");

        let options = FetchOptions::new(session.id(), self.config.fetch_timeout);
        let html = fetch_html(&*session, url.as_str(), &options)
            .await
            .map_err(|source| LeadsError::ProfileFetch {
                url: url.to_string(),
                source,
            })?;

        let PrimaryPage {
            scalars,
            mut publications,
            coauthors: sidebar,
        } = read_primary_page(&html, &self.config, tracker);

        tracker.advance(ExtractionStage::Enriching);
        let enricher = AbstractEnricher::new(&*session, &self.config, session.id());
        let (report, coauthors) = tokio::join!(
            enricher.enrich_all(&mut publications),
            coauthors::complete(&*session, &self.config, session.id(), url.as_str(), sidebar)
        );

        tracker.advance(ExtractionStage::Assembled);
        let profile = ResearcherProfile {
            name: scalars.name,
            profile_url: profile_url.trim().to_string(),
            research_area: scalars.research_area,
            total_citations: scalars.total_citations,
            publications,
            coauthors,
            classification: None,
        };

        if let Err(e) = profile.validate(self.config.max_publications) {
            warn!(url = %url, error = %e, "Assembled record failed validation");
        }

        info!(
            name = %profile.name,
            citations = profile.total_citations,
            publications = profile.publications.len(),
            abstracts = report.with_abstract,
            failed_enrichments = report.failures.len(),
            coauthors = profile.coauthors.len(),
            "Profile extracted"
        );

        Ok(profile)
    }

    /// Search, select a candidate, extract it and optionally classify it.
    ///
    /// Never fails: every error becomes an `{ "error": ... }` output.
    pub async fn run(
        &self,
        query: &SearchQuery,
        selector: &dyn CandidateSelector,
        classifier: Option<&dyn Classifier>,
    ) -> ExtractionOutput {
        let candidates = match search_profiles(self.provider, &self.config, query).await {
            Ok(candidates) => candidates,
            Err(e) => return ExtractionOutput::failed(e),
        };

        if candidates.is_empty() {
            return ExtractionOutput::failed(format!("No profiles found for '{}'", query.name.trim()));
        }

        let Some(candidate) = selector.select(&candidates) else {
            return ExtractionOutput::failed(format!(
                "No candidate selected among {} profiles",
                candidates.len()
            ));
        };
        info!(url = %candidate.profile_url, of = candidates.len(), "Selected candidate");

        let mut profile = match self.extract(&candidate.profile_url).await {
            Ok(profile) => profile,
            Err(e) => return ExtractionOutput::failed(e),
        };

        if let Some(classifier) = classifier {
            match classifier.classify(&profile).await {
                Ok(classification) => profile.classification = Some(classification),
                Err(e) => warn!(name = %profile.name, error = %e, "Classification unavailable"),
            }
        }

        ExtractionOutput::Record(Box::new(profile))
    }
}
