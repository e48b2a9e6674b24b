//! Scalar fields and the publication list of a Scholar profile page.
//!
//! Each field is read independently; a missing or malformed field falls back
//! to its sentinel and never affects the others.

use crate::dom::{absolute_url, normalize_ws, Document};
use crate::model::Publication;
use tracing::{debug, warn};

/// Sentinel for a missing researcher name.
pub const UNKNOWN_NAME: &str = "Unknown";

/// Sentinel for a missing research area.
pub const UNKNOWN_AREA: &str = "Not found";

/// Name, research area and citation total of one profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScalarFields {
    pub name: String,
    pub research_area: String,
    pub total_citations: u64,
}

/// Read the scalar fields from a profile page.
pub fn extract_scalars(document: &Document) -> ScalarFields {
    ScalarFields {
        name: extract_name(document),
        research_area: extract_research_area(document),
        total_citations: extract_total_citations(document),
    }
}

fn extract_name(document: &Document) -> String {
    match document
        .select_first("#gsc_prf_in")
        .map(|n| normalize_ws(&n.text()))
        .filter(|name| !name.is_empty())
    {
        Some(name) => name,
        None => {
            warn!(field = "name", "Field missing, using sentinel");
            UNKNOWN_NAME.to_string()
        }
    }
}

/// First listed interest: the first interest link, else the first
/// comma-separated item of the interests block.
fn extract_research_area(document: &Document) -> String {
    let Some(block) = document.select_first("#gsc_prf_int") else {
        warn!(field = "research_area", "Field missing, using sentinel");
        return UNKNOWN_AREA.to_string();
    };

    let from_link = block
        .select_first("a")
        .map(|a| normalize_ws(&a.text()))
        .filter(|t| !t.is_empty());

    let area = from_link.or_else(|| {
        block
            .text()
            .split(',')
            .next()
            .map(normalize_ws)
            .filter(|t| !t.is_empty())
    });

    area.unwrap_or_else(|| {
        warn!(field = "research_area", "Interests block empty, using sentinel");
        UNKNOWN_AREA.to_string()
    })
}

/// First cell of the citation statistics table ("all time" citations).
fn extract_total_citations(document: &Document) -> u64 {
    let Some(cell) = document.select_first("#gsc_rsb_st td.gsc_rsb_std") else {
        warn!(field = "total_citations", "Field missing, using 0");
        return 0;
    };

    let text = cell.text();
    parse_count(&text).unwrap_or_else(|| {
        warn!(field = "total_citations", raw = %text, "Non-numeric citation count, using 0");
        0
    })
}

/// Parse "1,234" / "1.234" / "1 234" as 1234.
pub fn parse_count(text: &str) -> Option<u64> {
    let cleaned: String = text
        .trim()
        .chars()
        .filter(|c| !matches!(c, ',' | '.' | ' ' | '\u{a0}'))
        .collect();
    if cleaned.is_empty() || !cleaned.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    cleaned.parse().ok()
}

/// Take the first `limit` publication titles from the profile table.
///
/// `abstract_text` and `full_text_url` are left empty for the enricher.
pub fn extract_publications(document: &Document, base_url: &str, limit: usize) -> Vec<Publication> {
    let publications: Vec<Publication> = document
        .select("#gsc_a_b .gsc_a_t a")
        .into_iter()
        .take(limit)
        .map(|link| {
            let title = normalize_ws(&link.text());
            let url = link
                .attribute("href")
                .and_then(|href| absolute_url(base_url, href))
                .unwrap_or_default();
            if url.is_empty() {
                debug!(title = %title, "Publication has no detail link");
            }
            Publication::new(title, url)
        })
        .collect();

    debug!(count = publications.len(), limit = limit, "Extracted publications");
    publications
}
