//! On-disk persistence of extraction results.
//!
//! Records are written as pretty JSON named after the researcher and the
//! capture time. Two extractions of the same name within one second write
//! the same file; the later one wins.

use crate::error::{LeadsError, Result};
use crate::model::{ExtractionOutput, ResearcherProfile};
use chrono::Local;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

/// File stem for a researcher: ASCII alphanumerics and spaces kept, spaces
/// turned into underscores.
pub fn normalize_name(name: &str) -> String {
    let kept: String = name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == ' ')
        .collect();
    let stem = kept.trim().replace(' ', "_");
    if stem.is_empty() {
        "researcher".to_string()
    } else {
        stem
    }
}

/// `<normalized name>_<YYYYmmdd_HHMMSS>.json` inside `dir`.
pub fn record_path(dir: &Path, name: &str) -> PathBuf {
    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    dir.join(format!("{}_{}.json", normalize_name(name), timestamp))
}

/// Write `output` as pretty JSON and return the file path.
pub fn save_record(dir: &Path, name: &str, output: &ExtractionOutput) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = record_path(dir, name);
    let content = serde_json::to_string_pretty(output)?;
    std::fs::write(&path, content)?;
    info!(path = %path.display(), error = output.is_error(), "Saved extraction result");
    Ok(path)
}

/// Read a saved result back, validating records against `max_publications`.
pub fn load_record(path: &Path, max_publications: usize) -> Result<ExtractionOutput> {
    let content = std::fs::read_to_string(path)?;
    let output: ExtractionOutput = serde_json::from_str(&content)?;
    if let Some(record) = output.record() {
        record.validate(max_publications)?;
    }
    Ok(output)
}

/// One coauthor row of the leads CSV.
#[derive(Debug, Serialize)]
struct CoauthorLead<'a> {
    researcher: &'a str,
    researcher_profile: &'a str,
    coauthor: &'a str,
    profile_url: &'a str,
    institution: &'a str,
    email_domain: &'a str,
}

/// Write the coauthors of `profile` as CSV leads; returns the row count.
pub fn save_coauthor_leads(path: &Path, profile: &ResearcherProfile) -> Result<usize> {
    if profile.coauthors.is_empty() {
        return Err(LeadsError::Validation(format!(
            "{} has no coauthors to export",
            profile.name
        )));
    }

    let mut wtr = csv::WriterBuilder::new().has_headers(true).from_path(path)?;

    for coauthor in &profile.coauthors {
        wtr.serialize(CoauthorLead {
            researcher: &profile.name,
            researcher_profile: &profile.profile_url,
            coauthor: &coauthor.display_name,
            profile_url: coauthor.profile_url.as_deref().unwrap_or_default(),
            institution: coauthor.institution.as_deref().unwrap_or_default(),
            email_domain: coauthor.email_domain.as_deref().unwrap_or_default(),
        })?;
    }

    wtr.flush()?;
    info!(path = %path.display(), rows = profile.coauthors.len(), "Saved coauthor leads");
    Ok(profile.coauthors.len())
}
