//! Researcher record types and their JSON output format.
//!
//! Field names on the wire follow the established output schema
//! (`articles`, `url`, `artigo_completo`, `veredict`), while the Rust side
//! uses descriptive names. Absent optional fields are omitted, never `null`.

use crate::error::{LeadsError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use url::Url;

/// A profile URL returned by search, pending external selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub profile_url: String,
}

impl Candidate {
    pub fn new(profile_url: impl Into<String>) -> Self {
        Self {
            profile_url: profile_url.into(),
        }
    }

    /// The `user=` identifier of this profile, if the URL carries one.
    pub fn user_id(&self) -> Option<String> {
        profile_user_id(&self.profile_url)
    }
}

/// One representative publication of a researcher.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Publication {
    pub title: String,
    /// Absolute detail-page URL; empty when the title had no link
    #[serde(rename = "url", default)]
    pub source_url: String,
    #[serde(rename = "abstract", default, skip_serializing_if = "Option::is_none")]
    pub abstract_text: Option<String>,
    #[serde(
        rename = "artigo_completo",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub full_text_url: Option<String>,
}

impl Publication {
    pub fn new(title: impl Into<String>, source_url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            source_url: source_url.into(),
            ..Default::default()
        }
    }
}

/// A coauthor listed on (or linked from) a profile page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coauthor {
    #[serde(rename = "name")]
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub institution: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_domain: Option<String>,
}

/// Deduplication key of a coauthor.
///
/// Two URL-less coauthors sharing a display name cannot be told apart, and
/// the same person listed with differing text will not be merged. Callers
/// that merge lists only deduplicate on [`IdentityKey::Profile`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IdentityKey {
    /// `user=` id when present, otherwise the full profile URL
    Profile(String),
    Name(String),
}

impl Coauthor {
    pub fn named(display_name: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            ..Default::default()
        }
    }

    pub fn identity_key(&self) -> IdentityKey {
        match &self.profile_url {
            Some(url) => IdentityKey::Profile(profile_user_id(url).unwrap_or_else(|| url.clone())),
            None => IdentityKey::Name(self.display_name.clone()),
        }
    }
}

/// Detailed part of a classification verdict.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualitativeAnalysis {
    pub is_qualitative_researcher: bool,
    pub contains_qualitative_research: bool,
    #[serde(default)]
    pub detailed_analysis: String,
}

/// Verdict provided by an external classifier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    #[serde(rename = "veredict", default, skip_serializing_if = "Option::is_none")]
    pub verdict: Option<String>,
    #[serde(
        rename = "qualitative_research_analysis",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub analysis: Option<QualitativeAnalysis>,
}

impl Classification {
    pub fn is_empty(&self) -> bool {
        self.verdict.is_none() && self.analysis.is_none()
    }
}

/// A flattened classification with neither key present reads as `None`.
fn classification_if_present<'de, D>(deserializer: D) -> std::result::Result<Option<Classification>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let classification = Option::<Classification>::deserialize(deserializer)?;
    Ok(classification.filter(|c| !c.is_empty()))
}

/// The normalized record produced by one extraction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearcherProfile {
    pub name: String,
    pub profile_url: String,
    pub research_area: String,
    pub total_citations: u64,
    #[serde(rename = "articles", default)]
    pub publications: Vec<Publication>,
    #[serde(default)]
    pub coauthors: Vec<Coauthor>,
    #[serde(flatten, deserialize_with = "classification_if_present")]
    pub classification: Option<Classification>,
}

impl ResearcherProfile {
    /// Check record invariants: publication cap, well-formed profile URL and
    /// no two coauthors sharing a profile identity.
    pub fn validate(&self, max_publications: usize) -> Result<()> {
        if self.publications.len() > max_publications {
            return Err(LeadsError::Validation(format!(
                "{} publications exceed the cap of {}",
                self.publications.len(),
                max_publications
            )));
        }

        Url::parse(&self.profile_url).map_err(|e| {
            LeadsError::Validation(format!("Invalid profile URL '{}': {}", self.profile_url, e))
        })?;

        let mut seen = HashSet::new();
        for coauthor in &self.coauthors {
            let key = coauthor.identity_key();
            if matches!(key, IdentityKey::Profile(_)) && !seen.insert(key) {
                return Err(LeadsError::Validation(format!(
                    "Duplicate coauthor profile: {}",
                    coauthor.display_name
                )));
            }
        }

        Ok(())
    }
}

/// What the pipeline hands to persistence: a record, or `{ "error": ... }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExtractionOutput {
    Failed { error: String },
    Record(Box<ResearcherProfile>),
}

impl ExtractionOutput {
    pub fn failed(message: impl ToString) -> Self {
        Self::Failed {
            error: message.to_string(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    pub fn record(&self) -> Option<&ResearcherProfile> {
        match self {
            Self::Record(profile) => Some(profile),
            Self::Failed { .. } => None,
        }
    }
}

impl From<Result<ResearcherProfile>> for ExtractionOutput {
    fn from(result: Result<ResearcherProfile>) -> Self {
        match result {
            Ok(profile) => Self::Record(Box::new(profile)),
            Err(e) => Self::failed(e),
        }
    }
}

/// Extract the `user=` query parameter from a profile link (relative or absolute).
pub fn profile_user_id(href: &str) -> Option<String> {
    let query = href.split_once('?').map(|(_, q)| q)?;
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(k, _)| *k == "user")
        .map(|(_, v)| v.to_string())
        .filter(|v| !v.is_empty())
}
