//! Publication abstract and full-text enrichment.
//!
//! For each publication the detail page is fetched and run through an
//! ordered list of extraction strategies; the first that yields text wins.
//! When none does, outbound publisher links are followed (second hop) and the
//! publisher page is searched for a known abstract container.
//!
//! All publications of one profile are enriched concurrently with a bounded
//! fan-out. A failure (or panic) in one task is recorded for that publication
//! only; the others always run to completion.

use crate::config::PipelineConfig;
use crate::dom::{absolute_url, normalize_ws, Document};
use crate::error::EnrichmentFailed;
use crate::fetcher::{fetch_html, FetchOptions, PageFetcher};
use crate::model::Publication;
use futures::stream::{self, StreamExt};
use futures::FutureExt;
use std::any::Any;
use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use tracing::{debug, info, warn};

/// A strategy reading an abstract out of a detail page.
type Strategy = fn(&Document) -> Option<String>;

/// Detail-page strategies, in evaluation order.
const DETAIL_STRATEGIES: &[(&str, Strategy)] = &[
    ("description_label", by_description_label),
    ("description_id", by_description_id),
    ("long_value", by_long_value),
    ("keyword_block", by_keyword_block),
];

const DESCRIPTION_LABELS: &[&str] = &["Description", "Descrição"];

const ABSTRACT_KEYWORDS: &[&str] = &["Resumo", "Abstract", "Resumé", "Summary", "Descrição", "Description"];

/// Value containers longer than this are abstract candidates.
const MIN_VALUE_CHARS: usize = 100;

/// Blocks following an abstract keyword must be longer than this.
const MIN_BLOCK_CHARS: usize = 50;

/// Publisher hosts worth a second-hop fetch.
const PUBLISHER_HOSTS: &[&str] = &[
    "doi.org",
    "ieee.org",
    "springer.com",
    "acm.org",
    "sciencedirect.com",
    "wiley.com",
    "scielo.br",
];

/// Abstract containers on publisher pages, in priority order.
const EXTERNAL_SELECTORS: &[&str] = &[
    "abstract",
    "#abstract",
    ".abstract",
    "#paper-abstract",
    ".paper-abstract",
    "#abstractSection",
    ".abstractSection",
    "div.abstract-content",
];

/// Meta tags carrying an abstract, tried after the containers.
const EXTERNAL_META: &[&str] = &[
    r#"meta[name="citation_abstract"]"#,
    r#"meta[name="dc.description"]"#,
];

/// Run the detail-page strategies, returning the winning strategy's name
/// with the normalized abstract.
pub fn extract_detail_abstract(document: &Document) -> Option<(&'static str, String)> {
    DETAIL_STRATEGIES.iter().find_map(|(name, strategy)| {
        strategy(document)
            .map(|text| normalize_ws(&text))
            .filter(|text| !text.is_empty())
            .map(|text| (*name, text))
    })
}

/// 1. The value next to a "Description" label.
fn by_description_label(document: &Document) -> Option<String> {
    document
        .select("div")
        .into_iter()
        .filter(|div| DESCRIPTION_LABELS.contains(&div.text().as_str()))
        .find_map(|label| {
            label
                .next_element_siblings()
                .find(|sibling| sibling.tag() == "div" && sibling.has_class("gsc_oci_value"))
                .map(|value| value.text())
                .filter(|text| !text.is_empty())
        })
}

/// 2. The description container by its identifier.
fn by_description_id(document: &Document) -> Option<String> {
    document
        .select_first("#gsc_oci_descr, #gsc_oci_desc")
        .map(|node| node.text())
        .filter(|text| !text.is_empty())
}

/// 3. Any long value container that is not a reference list.
fn by_long_value(document: &Document) -> Option<String> {
    document
        .select(".gsc_oci_value")
        .into_iter()
        .map(|node| node.text())
        .find(|text| text.chars().count() > MIN_VALUE_CHARS && !looks_like_reference_list(text))
}

/// 4. The first paragraph (else block) after an abstract keyword.
fn by_keyword_block(document: &Document) -> Option<String> {
    ABSTRACT_KEYWORDS.iter().find_map(|keyword| {
        let anchor = document.first_text_containing(keyword)?;
        let block = document
            .elements_after(anchor)
            .find(|n| n.tag() == "p")
            .or_else(|| document.elements_after(anchor).find(|n| n.tag() == "div"))?;
        let text = block.text();
        (text.chars().count() > MIN_BLOCK_CHARS).then_some(text)
    })
}

/// True when the text is mostly short newline-separated lines, as in a
/// bibliography or author list.
pub fn looks_like_reference_list(text: &str) -> bool {
    let lines: Vec<&str> = text.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
    if lines.len() <= 5 {
        return false;
    }
    let short = lines.iter().filter(|l| l.chars().count() < 80).count();
    short * 2 > lines.len()
}

/// Outbound links that may lead to the original publication.
///
/// PDF links come first, then the title link; only PDF, DOI or known
/// publisher targets are kept.
pub fn find_external_links(document: &Document, base_url: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    document
        .select(r#"a[href*=".pdf"]"#)
        .into_iter()
        .chain(document.select("a.gsc_oci_title_link"))
        .filter_map(|a| a.attribute("href"))
        .filter_map(|href| absolute_url(base_url, href))
        .filter(|url| is_publisher_link(url))
        .filter(|url| seen.insert(url.clone()))
        .collect()
}

fn is_publisher_link(url: &str) -> bool {
    let lower = url.to_lowercase();
    let path_is_pdf = url::Url::parse(&lower)
        .map(|u| u.path().ends_with(".pdf"))
        .unwrap_or(false);
    path_is_pdf || lower.ends_with(".pdf") || PUBLISHER_HOSTS.iter().any(|host| lower.contains(host))
}

/// The "[PDF] host" full-text link shown beside the title.
pub fn find_full_text_link(document: &Document, base_url: &str) -> Option<String> {
    document
        .select_first("div.gsc_oci_title_ggi a")
        .and_then(|a| a.attribute("href"))
        .and_then(|href| absolute_url(base_url, href))
}

/// Look for an abstract on a publisher page.
pub fn extract_external_abstract(html: &str) -> Option<String> {
    let document = Document::parse(html);

    let from_container = EXTERNAL_SELECTORS.iter().find_map(|css| {
        document
            .select_first(css)
            .map(|node| normalize_ws(&node.text()))
            .filter(|text| !text.is_empty())
    });

    from_container.or_else(|| {
        EXTERNAL_META.iter().find_map(|css| {
            document
                .select_first(css)
                .and_then(|meta| meta.attribute("content"))
                .map(normalize_ws)
                .filter(|text| text.chars().count() > MIN_BLOCK_CHARS)
        })
    })
}

/// Everything read from one detail page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DetailScan {
    pub abstract_text: Option<String>,
    pub full_text_url: Option<String>,
    pub external_links: Vec<String>,
}

/// Parse a detail page. Synchronous; the document is dropped on return.
pub fn scan_detail_page(html: &str, base_url: &str) -> DetailScan {
    let document = Document::parse(html);
    let found = extract_detail_abstract(&document);

    if let Some((strategy, _)) = &found {
        debug!(
            strategy = *strategy,
            page = ?document.title(),
            "Abstract found on detail page"
        );
    }

    DetailScan {
        abstract_text: found.map(|(_, text)| text),
        full_text_url: find_full_text_link(&document, base_url),
        external_links: find_external_links(&document, base_url),
    }
}

/// Result of enriching one publication.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Enrichment {
    pub abstract_text: Option<String>,
    pub full_text_url: Option<String>,
}

/// Outcome counts of one fan-out.
#[derive(Debug, Default)]
pub struct EnrichmentReport {
    pub enriched: usize,
    pub with_abstract: usize,
    pub failures: Vec<EnrichmentFailed>,
}

/// Fills in abstracts and full-text links through one fetcher session.
pub struct AbstractEnricher<'a, F: PageFetcher + ?Sized> {
    fetcher: &'a F,
    config: &'a PipelineConfig,
    session_id: &'a str,
}

impl<'a, F: PageFetcher + ?Sized> AbstractEnricher<'a, F> {
    pub fn new(fetcher: &'a F, config: &'a PipelineConfig, session_id: &'a str) -> Self {
        Self {
            fetcher,
            config,
            session_id,
        }
    }

    fn options(&self, label: &str, timeout: std::time::Duration) -> FetchOptions {
        FetchOptions::new(format!("{}/{}", self.session_id, label), timeout)
    }

    /// Enrich a single publication detail URL.
    ///
    /// Only a failed detail-page fetch is an error; a failed second hop
    /// leaves the abstract absent.
    pub async fn enrich_one(&self, url: &str) -> Result<Enrichment, EnrichmentFailed> {
        if url.is_empty() {
            return Err(EnrichmentFailed::new(url, "publication has no detail link"));
        }

        let options = self.options("article_abstract", self.config.fetch_timeout);
        let html = fetch_html(self.fetcher, url, &options)
            .await
            .map_err(|e| EnrichmentFailed::new(url, e))?;

        let scan = scan_detail_page(&html, self.config.base());
        let full_text_url = scan
            .full_text_url
            .clone()
            .or_else(|| scan.external_links.first().cloned());

        if scan.abstract_text.is_some() {
            return Ok(Enrichment {
                abstract_text: scan.abstract_text,
                full_text_url,
            });
        }

        let abstract_text = self.second_hop(url, &scan.external_links).await;
        if abstract_text.is_none() {
            debug!(url = %url, "No abstract found by any strategy");
        }

        Ok(Enrichment {
            abstract_text,
            full_text_url,
        })
    }

    /// Try publisher pages in order until one yields an abstract.
    async fn second_hop(&self, source: &str, links: &[String]) -> Option<String> {
        let options = self.options("original_article", self.config.second_hop_timeout);

        for link in links {
            debug!(source = %source, link = %link, "Following publisher link");
            match fetch_html(self.fetcher, link, &options).await {
                Ok(html) => {
                    if let Some(text) = extract_external_abstract(&html) {
                        debug!(link = %link, "Abstract found on publisher page");
                        return Some(text);
                    }
                }
                Err(e) => {
                    debug!(link = %link, error = %e, "Publisher page unavailable");
                }
            }
        }

        None
    }

    /// Enrich every publication concurrently, writing results back by index.
    ///
    /// Document order of `publications` is preserved regardless of the order
    /// in which fetches complete.
    pub async fn enrich_all(&self, publications: &mut [Publication]) -> EnrichmentReport {
        let width = self.config.concurrency();
        let jobs: Vec<(usize, String)> = publications
            .iter()
            .enumerate()
            .map(|(idx, p)| (idx, p.source_url.clone()))
            .collect();

        info!(count = jobs.len(), width = width, "Enriching publications");

        let outcomes: Vec<(usize, Result<Enrichment, EnrichmentFailed>)> = stream::iter(jobs)
            .map(|(idx, url)| async move {
                let attempt = AssertUnwindSafe(self.enrich_one(&url)).catch_unwind().await;
                let outcome = attempt
                    .unwrap_or_else(|panic| Err(EnrichmentFailed::new(&url, panic_message(panic))));
                (idx, outcome)
            })
            .buffer_unordered(width)
            .collect()
            .await;

        let mut report = EnrichmentReport::default();
        for (idx, outcome) in outcomes {
            match outcome {
                Ok(enrichment) => {
                    report.enriched += 1;
                    if enrichment.abstract_text.is_some() {
                        report.with_abstract += 1;
                    }
                    if let Some(publication) = publications.get_mut(idx) {
                        publication.abstract_text = enrichment.abstract_text;
                        publication.full_text_url = enrichment.full_text_url;
                    }
                }
                Err(failure) => {
                    warn!(url = %failure.url, reason = %failure.reason, "Publication enrichment failed");
                    report.failures.push(failure);
                }
            }
        }

        info!(
            enriched = report.enriched,
            with_abstract = report.with_abstract,
            failed = report.failures.len(),
            "Enrichment complete"
        );

        report
    }
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        format!("task panicked: {}", msg)
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        format!("task panicked: {}", msg)
    } else {
        "task panicked".to_string()
    }
}
