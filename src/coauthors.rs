//! Coauthor extraction and merging.
//!
//! The profile page lists a handful of coauthors; when it links a "view all
//! coauthors" page, that page is fetched and its entries are merged in,
//! deduplicated by profile identity.

use crate::config::PipelineConfig;
use crate::dom::{absolute_url, normalize_ws, Document, Node};
use crate::error::{LeadsError, Result};
use crate::fetcher::{fetch_html, FetchOptions, PageFetcher};
use crate::model::{profile_user_id, Coauthor, IdentityKey};
use regex::Regex;
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// Phrases Scholar puts before a verified email domain.
const CONFIRMATION_PHRASES: &[&str] = &["E-mail confirmado em", "verificado em", "Verified email at"];

/// Words that start the institution part of an entry.
const INSTITUTION_KEYWORDS: &[&str] = &[
    "University",
    "Universidade",
    "Instituto",
    "UFRJ",
    "UERJ",
    "UFOPA",
    "Professor",
    "Doutor",
];

const VIEW_ALL_LABELS: &[&str] = &["coauthor", "coautor", "co-author"];

/// Fields recovered from the free text of one coauthor entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryText {
    pub display_name: String,
    pub institution: Option<String>,
    pub email_domain: Option<String>,
}

/// Splits coauthor entry text into name, institution and email domain.
pub struct EntryParser {
    email_domain: Regex,
}

impl EntryParser {
    pub fn new() -> Result<Self> {
        let email_domain = Regex::new(r"(?i)(?:confirmado em|verificado em|verified email at)\s+([\w.-]+\.\w+)")
            .map_err(|e| LeadsError::Parse(e.to_string()))?;
        Ok(Self { email_domain })
    }

    /// Parse raw entry text.
    ///
    /// Without a confirmation phrase the whole text is the display name.
    pub fn parse(&self, raw: &str) -> EntryText {
        let text = normalize_ws(raw);

        let phrase_at = CONFIRMATION_PHRASES
            .iter()
            .filter_map(|phrase| text.find(phrase))
            .min();

        let Some(at) = phrase_at else {
            return EntryText {
                display_name: text,
                ..Default::default()
            };
        };

        let (before, after) = text.split_at(at);
        let before = before.trim().trim_end_matches("E-mail").trim();
        let (display_name, institution) = split_institution(before);

        let email_domain = self
            .email_domain
            .captures(after)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().trim_end_matches('.').to_string());

        EntryText {
            display_name,
            institution,
            email_domain,
        }
    }
}

/// Split at the earliest institution keyword; the keyword starts the institution.
fn split_institution(segment: &str) -> (String, Option<String>) {
    let at = INSTITUTION_KEYWORDS
        .iter()
        .filter_map(|keyword| segment.find(keyword))
        .min();

    match at {
        Some(at) if at > 0 => {
            let (name, institution) = segment.split_at(at);
            (name.trim().to_string(), Some(institution.trim().to_string()))
        }
        _ => (segment.to_string(), None),
    }
}

/// Absolute profile URL for a coauthor link carrying a `user=` id.
fn coauthor_profile_url(base_url: &str, href: &str) -> Option<String> {
    if profile_user_id(href).is_none() {
        debug!(href = %href, "Coauthor link has no user id, leaving profile_url empty");
        return None;
    }
    absolute_url(base_url, href)
}

fn to_coauthor(parser: &EntryParser, node: Node<'_>, base_url: &str) -> Option<Coauthor> {
    let entry = parser.parse(&node.spaced_text());
    if entry.display_name.is_empty() {
        return None;
    }
    Some(Coauthor {
        display_name: entry.display_name,
        profile_url: node.link().and_then(|href| coauthor_profile_url(base_url, href)),
        institution: entry.institution,
        email_domain: entry.email_domain,
    })
}

/// Coauthors read from the profile page plus the "view all" link, if any.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrimaryCoauthors {
    pub entries: Vec<Coauthor>,
    pub view_all_url: Option<String>,
}

/// Read the coauthor sidebar of a profile page.
pub fn extract_primary(document: &Document, base_url: &str, parser: &EntryParser) -> PrimaryCoauthors {
    let listed: Vec<Coauthor> = document
        .select(".gsc_rsb_aa")
        .into_iter()
        .filter_map(|node| to_coauthor(parser, node, base_url))
        .collect();
    let entries = merge(Vec::new(), listed);

    debug!(count = entries.len(), "Coauthors on profile page");

    PrimaryCoauthors {
        entries,
        view_all_url: find_view_all_link(document, base_url),
    }
}

/// The sidebar link to the full coauthor list.
pub fn find_view_all_link(document: &Document, base_url: &str) -> Option<String> {
    let link = document.select_first("a.gsc_rsb_lbl")?;
    let label = link.text().to_lowercase();
    if !VIEW_ALL_LABELS.iter().any(|l| label.contains(l)) {
        return None;
    }
    link.attribute("href").and_then(|href| absolute_url(base_url, href))
}

/// Every profile-linked entry of the "view all coauthors" page.
pub fn extract_all_page(html: &str, base_url: &str, parser: &EntryParser) -> Vec<Coauthor> {
    let document = Document::parse(html);
    document
        .select(r#"a[href*="user="]"#)
        .into_iter()
        .filter_map(|node| to_coauthor(parser, node, base_url))
        .filter(|c| c.profile_url.is_some())
        .collect()
}

/// Append `extra` entries whose profile is not already present.
///
/// Only profile-linked entries are deduplicated; entries without a profile
/// URL are always kept.
pub fn merge(primary: Vec<Coauthor>, extra: Vec<Coauthor>) -> Vec<Coauthor> {
    let mut seen: HashSet<IdentityKey> = primary
        .iter()
        .map(Coauthor::identity_key)
        .filter(|key| matches!(key, IdentityKey::Profile(_)))
        .collect();

    let mut merged = primary;
    for coauthor in extra {
        match coauthor.identity_key() {
            key @ IdentityKey::Profile(_) => {
                if seen.insert(key) {
                    merged.push(coauthor);
                }
            }
            IdentityKey::Name(_) => merged.push(coauthor),
        }
    }
    merged
}

/// Fetch the full coauthor list when linked and merge it into `primary`.
///
/// The profile owner is never listed as their own coauthor. A failed fetch
/// keeps the primary list.
pub async fn complete<F: PageFetcher + ?Sized>(
    fetcher: &F,
    config: &PipelineConfig,
    session_id: &str,
    owner_url: &str,
    primary: PrimaryCoauthors,
) -> Vec<Coauthor> {
    let PrimaryCoauthors { entries, view_all_url } = primary;

    let Some(url) = view_all_url else {
        return entries;
    };

    let parser = match EntryParser::new() {
        Ok(parser) => parser,
        Err(e) => {
            warn!(error = %e, "Coauthor parser unavailable");
            return entries;
        }
    };

    info!(url = %url, "Fetching full coauthor list");
    let options = FetchOptions::new(format!("{}/all_coauthors", session_id), config.fetch_timeout);
    let html = match fetch_html(fetcher, &url, &options).await {
        Ok(html) => html,
        Err(e) => {
            warn!(url = %url, error = %e, "Full coauthor list unavailable, keeping profile page entries");
            return entries;
        }
    };

    let owner = profile_user_id(owner_url);
    let extra: Vec<Coauthor> = extract_all_page(&html, config.base(), &parser)
        .into_iter()
        .filter(|c| owner.is_none() || c.profile_url.as_deref().and_then(profile_user_id) != owner)
        .collect();

    let before = entries.len();
    let merged = merge(entries, extra);
    debug!(added = merged.len() - before, total = merged.len(), "Merged coauthor lists");
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::StaticFetcher;

    const BASE: &str = "https://scholar.google.com";
    const OWNER: &str = "https://scholar.google.com/citations?user=OWNER&hl=pt-BR";

    fn parser() -> EntryParser {
        EntryParser::new().expect("regex compiles")
    }

    fn linked(name: &str, user: &str) -> Coauthor {
        Coauthor {
            profile_url: Some(format!("{}/citations?user={}&hl=pt-BR", BASE, user)),
            ..Coauthor::named(name)
        }
    }

    const PROFILE: &str = r#"
        <html><body>
          <div id="gsc_rsb_co">
            <h3 class="gsc_rsb_h"><a class="gsc_rsb_lbl" href="/citations?view_op=list_colleagues&amp;hl=pt-BR&amp;user=OWNER">Coautores</a></h3>
            <ul>
              <li><div class="gsc_rsb_aa">
                <div class="gsc_rsb_a_desc">
                  <a href="/citations?user=U1&amp;hl=pt-BR">Ana Souza</a>
                  <span class="gsc_rsb_a_ext">Universidade Federal do Rio de Janeiro</span>
                  <span class="gsc_rsb_a_ext gsc_rsb_a_ext2">E-mail confirmado em ufrj.br</span>
                </div>
              </div></li>
              <li><div class="gsc_rsb_aa">
                <div class="gsc_rsb_a_desc"><a href="/citations?view_op=x">Bruno Lima</a></div>
              </div></li>
            </ul>
          </div>
        </body></html>"#;

    const ALL_PAGE: &str = r#"
        <html><body>
          <div class="gsc_ucoar"><h3 class="gs_ai_name"><a href="/citations?user=U1&amp;hl=en">Ana Souza</a></h3></div>
          <div class="gsc_ucoar"><h3 class="gs_ai_name"><a href="/citations?user=U2&amp;hl=en">Carla Dias</a></h3>
            <div class="gs_ai_aff">Instituto Oswaldo Cruz</div></div>
          <div class="gsc_ucoar"><h3 class="gs_ai_name"><a href="/citations?user=OWNER&amp;hl=en">Maria Silva</a></h3></div>
        </body></html>"#;

    #[test]
    fn test_parse_entry_with_confirmation() {
        let entry = parser().parse("Ana Souza Universidade Federal do Rio de Janeiro E-mail confirmado em ufrj.br");
        assert_eq!(entry.display_name, "Ana Souza");
        assert_eq!(entry.institution.as_deref(), Some("Universidade Federal do Rio de Janeiro"));
        assert_eq!(entry.email_domain.as_deref(), Some("ufrj.br"));
    }

    #[test]
    fn test_parse_entry_verified_variant() {
        let entry = parser().parse("Carlos Reis Professor, UERJ E-mail verificado em uerj.br");
        assert_eq!(entry.display_name, "Carlos Reis");
        assert_eq!(entry.institution.as_deref(), Some("Professor, UERJ"));
        assert_eq!(entry.email_domain.as_deref(), Some("uerj.br"));
    }

    #[test]
    fn test_parse_entry_without_phrase() {
        let entry = parser().parse("  Bruno   Lima  ");
        assert_eq!(
            entry,
            EntryText {
                display_name: "Bruno Lima".to_string(),
                institution: None,
                email_domain: None,
            }
        );
    }

    #[test]
    fn test_parse_entry_without_keyword() {
        let entry = parser().parse("Dana Costa Fiocruz E-mail confirmado em fiocruz.br");
        assert_eq!(entry.display_name, "Dana Costa Fiocruz");
        assert_eq!(entry.institution, None);
        assert_eq!(entry.email_domain.as_deref(), Some("fiocruz.br"));
    }

    #[test]
    fn test_extract_primary() {
        let doc = Document::parse(PROFILE);
        let primary = extract_primary(&doc, BASE, &parser());

        assert_eq!(primary.entries.len(), 2);
        assert_eq!(primary.entries[0].display_name, "Ana Souza");
        assert_eq!(
            primary.entries[0].profile_url.as_deref(),
            Some("https://scholar.google.com/citations?user=U1&hl=pt-BR")
        );
        assert_eq!(primary.entries[0].email_domain.as_deref(), Some("ufrj.br"));
        // Link without a user id is treated as absent.
        assert_eq!(primary.entries[1].display_name, "Bruno Lima");
        assert_eq!(primary.entries[1].profile_url, None);
        assert_eq!(
            primary.view_all_url.as_deref(),
            Some("https://scholar.google.com/citations?view_op=list_colleagues&hl=pt-BR&user=OWNER")
        );
    }

    #[test]
    fn test_view_all_requires_label() {
        let doc = Document::parse(r#"<a class="gsc_rsb_lbl" href="/citations?view_op=x">Citações</a>"#);
        assert_eq!(find_view_all_link(&doc, BASE), None);

        let doc = Document::parse(r#"<a class="gsc_rsb_lbl" href="/list">View all Co-authors</a>"#);
        assert!(find_view_all_link(&doc, BASE).is_some());
    }

    #[test]
    fn test_merge_dedups_by_profile_only() {
        let a = linked("A", "u1");
        let b = Coauthor::named("B");
        let c = linked("C", "u2");

        let merged = merge(vec![a.clone(), b.clone()], vec![linked("A again", "u1"), c.clone()]);
        assert_eq!(merged, vec![a, b, c]);
    }

    #[test]
    fn test_merge_keeps_urlless_duplicates() {
        let merged = merge(vec![Coauthor::named("B")], vec![Coauthor::named("B")]);
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn test_merge_matches_user_id_across_url_shapes() {
        let relative_hl = Coauthor {
            profile_url: Some("https://scholar.google.com/citations?hl=en&user=u1".to_string()),
            ..Coauthor::named("A")
        };
        let merged = merge(vec![linked("A", "u1")], vec![relative_hl]);
        assert_eq!(merged.len(), 1);
    }

    #[tokio::test]
    async fn test_complete_merges_full_list() {
        let doc = Document::parse(PROFILE);
        let primary = extract_primary(&doc, BASE, &parser());
        let view_all = primary.view_all_url.clone().expect("link");
        let fetcher = StaticFetcher::new().with_page(&view_all, ALL_PAGE);

        let merged = complete(&fetcher, &PipelineConfig::default(), "s", OWNER, primary).await;
        let names: Vec<_> = merged.iter().map(|c| c.display_name.as_str()).collect();
        assert_eq!(names, vec!["Ana Souza", "Bruno Lima", "Carla Dias"]);
        assert_eq!(fetcher.requests()[0].1, "s/all_coauthors");
    }

    #[tokio::test]
    async fn test_complete_degrades_on_fetch_failure() {
        let doc = Document::parse(PROFILE);
        let primary = extract_primary(&doc, BASE, &parser());
        let expected = primary.entries.clone();
        let fetcher = StaticFetcher::new();

        let merged = complete(&fetcher, &PipelineConfig::default(), "s", OWNER, primary).await;
        assert_eq!(merged, expected);
        assert_eq!(fetcher.requested().len(), 1);
    }
}
