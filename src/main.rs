//! scholarleads - Google Scholar researcher profile extraction
//!
//! Finds a researcher's Scholar profile from a name (plus optional
//! institution/email hints), extracts citations, representative publications
//! with abstracts and coauthors, and optionally classifies the researcher.
//!
//! ## Usage
//!
//! ### CLI Mode
//! ```bash
//! scholarleads run "Maria Silva" --institution UFRJ
//! scholarleads profile "https://scholar.google.com/citations?user=XXXX"
//! ```
//!
//! ### HTTP Server Mode
//! ```bash
//! scholarleads serve --port 3000
//! ```

use anyhow::{Context, Result};
use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use clap::{Args, Parser, Subcommand};
use scholarleads::classify::{Classifier, LlmClassifier, LlmConfig};
use scholarleads::config::{HttpConfig, PipelineConfig, DEFAULT_SCHOLAR_URL};
use scholarleads::cookies::CookieManager;
use scholarleads::http::HttpSessionProvider;
use scholarleads::model::{Candidate, ExtractionOutput, ResearcherProfile};
use scholarleads::pipeline::{IndexSelector, ProfilePipeline};
use scholarleads::search::{search_profiles, SearchQuery};
use scholarleads::store;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info, warn, Level};
use tracing_subscriber::{fmt, EnvFilter};

// ============================================================================
// CLI Definition
// ============================================================================

/// Google Scholar researcher profile extraction
#[derive(Parser)]
#[command(name = "scholarleads")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List candidate profiles for a researcher
    Search {
        #[command(flatten)]
        who: WhoArgs,

        #[command(flatten)]
        fetch: FetchArgs,
    },

    /// Extract one profile by URL
    Profile {
        /// Scholar profile URL
        url: String,

        #[command(flatten)]
        fetch: FetchArgs,

        #[command(flatten)]
        llm: LlmArgs,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Search, pick a candidate and extract it
    Run {
        #[command(flatten)]
        who: WhoArgs,

        /// Index of the candidate to extract (0 = first result)
        #[arg(long, default_value = "0")]
        candidate: usize,

        #[command(flatten)]
        fetch: FetchArgs,

        #[command(flatten)]
        llm: LlmArgs,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Run as HTTP server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        #[command(flatten)]
        fetch: FetchArgs,

        #[command(flatten)]
        llm: LlmArgs,
    },

    /// Manage cookies
    Cookies {
        /// Cookie file (default: ~/.scholarleads_cookies.json)
        #[arg(long, global = true)]
        cookies: Option<PathBuf>,

        #[command(subcommand)]
        action: CookieAction,
    },
}

#[derive(Args)]
struct WhoArgs {
    /// Researcher name
    name: String,

    /// Institution hint (e.g., "UFRJ")
    #[arg(long)]
    institution: Option<String>,

    /// Email domain hint (e.g., "ufrj.br")
    #[arg(long)]
    email: Option<String>,
}

impl WhoArgs {
    fn query(&self) -> SearchQuery {
        SearchQuery {
            name: self.name.clone(),
            institution: self.institution.clone(),
            email: self.email.clone(),
        }
    }
}

#[derive(Args, Clone)]
struct FetchArgs {
    /// Proxy URL (e.g., http://127.0.0.1:7890)
    #[arg(long)]
    proxy: Option<String>,

    /// Mirror site URL
    #[arg(long)]
    mirror: Option<String>,

    /// Scholar interface language
    #[arg(long, default_value = "pt-BR")]
    locale: String,

    /// Maximum publications per profile
    #[arg(long, default_value = "5")]
    max_publications: usize,

    /// Concurrent publication fetches per profile
    #[arg(long, default_value = "3")]
    concurrency: usize,

    /// Per-request timeout in seconds
    #[arg(long, default_value = "30")]
    timeout: u64,

    /// Cookie file (default: ~/.scholarleads_cookies.json)
    #[arg(long)]
    cookies: Option<PathBuf>,
}

impl FetchArgs {
    fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            base_url: self
                .mirror
                .clone()
                .unwrap_or_else(|| DEFAULT_SCHOLAR_URL.to_string()),
            locale: self.locale.clone(),
            max_publications: self.max_publications,
            enrich_concurrency: self.concurrency,
            fetch_timeout: Duration::from_secs(self.timeout),
            ..Default::default()
        }
    }

    fn http_config(&self) -> HttpConfig {
        HttpConfig {
            proxy: self.proxy.clone(),
            cookie_path: self.cookies.clone(),
            ..Default::default()
        }
    }
}

#[derive(Args, Clone)]
struct LlmArgs {
    /// LLM API base URL (enables classification, e.g., https://api.openai.com/v1)
    #[arg(long, env = "LLM_BASE_URL")]
    llm_base_url: Option<String>,

    /// LLM API key
    #[arg(long, env = "LLM_API_KEY", hide_env_values = true)]
    llm_key: Option<String>,

    /// LLM model name
    #[arg(long, env = "LLM_MODEL", default_value = "gpt-4o-mini")]
    llm_model: String,
}

impl LlmArgs {
    fn config(&self) -> Option<LlmConfig> {
        match (&self.llm_base_url, &self.llm_key) {
            (Some(base_url), Some(api_key)) => Some(LlmConfig {
                base_url: base_url.clone(),
                api_key: api_key.clone(),
                model: self.llm_model.clone(),
            }),
            (Some(_), None) => {
                warn!("LLM base URL set without API key, classification disabled");
                None
            }
            _ => None,
        }
    }
}

#[derive(Args)]
struct OutputArgs {
    /// Output directory for JSON records
    #[arg(short, long, default_value = "./data")]
    output: PathBuf,

    /// Also write coauthors as CSV leads to this file
    #[arg(long)]
    leads: Option<PathBuf>,
}

#[derive(Subcommand)]
enum CookieAction {
    /// Clear stored cookies
    Clear,
    /// Show cookie file path
    Path,
    /// Import cookies exported from a browser (JSON array)
    Import {
        /// Exported cookie file
        file: PathBuf,
    },
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.debug { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.to_string()));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .init();

    match cli.command {
        Commands::Search { who, fetch } => run_search(who, fetch).await,
        Commands::Profile {
            url,
            fetch,
            llm,
            output,
        } => run_profile(url, fetch, llm, output).await,
        Commands::Run {
            who,
            candidate,
            fetch,
            llm,
            output,
        } => run_pipeline(who, candidate, fetch, llm, output).await,
        Commands::Serve {
            port,
            host,
            fetch,
            llm,
        } => run_server(host, port, fetch, llm).await,
        Commands::Cookies { cookies, action } => handle_cookies(cookies, action),
    }
}

fn build_classifier(llm: &LlmArgs) -> Option<LlmClassifier> {
    let config = llm.config()?;
    match LlmClassifier::new(config) {
        Ok(classifier) => Some(classifier),
        Err(e) => {
            warn!(error = %e, "Classifier unavailable");
            None
        }
    }
}

// ============================================================================
// CLI Commands
// ============================================================================

async fn run_search(who: WhoArgs, fetch: FetchArgs) -> Result<()> {
    let provider = HttpSessionProvider::new(fetch.http_config());
    let candidates = search_profiles(&provider, &fetch.pipeline_config(), &who.query())
        .await
        .context("Search failed")?;

    if candidates.is_empty() {
        println!("No profiles found for '{}'.", who.name);
        return Ok(());
    }

    println!("Found {} candidate profiles:", candidates.len());
    for (idx, candidate) in candidates.iter().enumerate() {
        println!("  [{}] {}", idx, candidate.profile_url);
    }
    Ok(())
}

async fn run_profile(url: String, fetch: FetchArgs, llm: LlmArgs, output: OutputArgs) -> Result<()> {
    let provider = HttpSessionProvider::new(fetch.http_config());
    let pipeline = ProfilePipeline::new(&provider, fetch.pipeline_config());

    let mut profile = pipeline.extract(&url).await.context("Profile extraction failed")?;

    if let Some(classifier) = build_classifier(&llm) {
        match classifier.classify(&profile).await {
            Ok(classification) => profile.classification = Some(classification),
            Err(e) => warn!(error = %e, "Classification failed"),
        }
    }

    print_profile(&profile);
    let name = profile.name.clone();
    save_output(&output, &name, &ExtractionOutput::Record(Box::new(profile)))
}

async fn run_pipeline(
    who: WhoArgs,
    candidate: usize,
    fetch: FetchArgs,
    llm: LlmArgs,
    output: OutputArgs,
) -> Result<()> {
    let provider = HttpSessionProvider::new(fetch.http_config());
    let pipeline = ProfilePipeline::new(&provider, fetch.pipeline_config());
    let classifier = build_classifier(&llm);

    let result = pipeline
        .run(
            &who.query(),
            &IndexSelector(candidate),
            classifier.as_ref().map(|c| c as &dyn Classifier),
        )
        .await;

    match &result {
        ExtractionOutput::Record(profile) => print_profile(profile),
        ExtractionOutput::Failed { error } => println!("Extraction failed: {}", error),
    }

    save_output(&output, &who.name, &result)
}

fn save_output(output: &OutputArgs, name: &str, result: &ExtractionOutput) -> Result<()> {
    let path = store::save_record(&output.output, name, result).context("Failed to save record")?;
    println!("Saved: {}", path.display());

    if let (Some(leads), Some(profile)) = (&output.leads, result.record()) {
        save_leads(leads, profile)?;
    }
    Ok(())
}

fn save_leads(path: &Path, profile: &ResearcherProfile) -> Result<()> {
    if profile.coauthors.is_empty() {
        println!("No coauthors to save to {:?}", path);
        return Ok(());
    }
    let rows = store::save_coauthor_leads(path, profile).context("Failed to write coauthor leads")?;
    println!("Saved {} coauthor leads: {:?}", rows, path);
    Ok(())
}

fn print_profile(profile: &ResearcherProfile) {
    println!();
    println!("{}", profile.name);
    println!("  Profile:   {}", profile.profile_url);
    println!("  Area:      {}", profile.research_area);
    println!("  Citations: {}", profile.total_citations);

    println!("\n--- Publications ({}) ---", profile.publications.len());
    for publication in &profile.publications {
        let marker = if publication.abstract_text.is_some() { "+" } else { "-" };
        println!("  [{}] {}", marker, publication.title);
        if let Some(full_text) = &publication.full_text_url {
            println!("      {}", full_text);
        }
    }

    println!("\n--- Coauthors ({}) ---", profile.coauthors.len());
    for coauthor in &profile.coauthors {
        let details: Vec<&str> = [
            coauthor.institution.as_deref(),
            coauthor.email_domain.as_deref(),
        ]
        .into_iter()
        .flatten()
        .collect();
        if details.is_empty() {
            println!("  {}", coauthor.display_name);
        } else {
            println!("  {} ({})", coauthor.display_name, details.join(", "));
        }
    }

    if let Some(classification) = &profile.classification {
        println!("\n--- Qualitative research analysis ---");
        if let Some(verdict) = &classification.verdict {
            println!("  {}", verdict);
        }
        if let Some(analysis) = &classification.analysis {
            println!("  {}", analysis.detailed_analysis);
        }
    }
    println!();
}

// ============================================================================
// HTTP Server
// ============================================================================

async fn run_server(host: String, port: u16, fetch: FetchArgs, llm: LlmArgs) -> Result<()> {
    info!(host = %host, port = port, "Starting HTTP server");
    println!("Starting server at http://{}:{}", host, port);

    let app_state = Arc::new(AppState {
        http: fetch.http_config(),
        pipeline: fetch.pipeline_config(),
        classifier: build_classifier(&llm),
    });

    let app = Router::new()
        .route("/health", get(health_handler))
        .route("/search", post(search_handler))
        .route("/analyze", post(analyze_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(app_state);

    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .context("Invalid host:port")?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    println!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .await
        .context("Server error")?;

    Ok(())
}

/// Settings shared by all requests; each request opens its own fetcher sessions.
struct AppState {
    http: HttpConfig,
    pipeline: PipelineConfig,
    classifier: Option<LlmClassifier>,
}

/// Health check endpoint
async fn health_handler() -> &'static str {
    "OK"
}

/// Researcher lookup request body
#[derive(Debug, Deserialize)]
struct ResearcherRequest {
    #[serde(alias = "nome")]
    name: String,
    #[serde(default, alias = "instituicao")]
    institution: Option<String>,
    #[serde(default)]
    email: Option<String>,
    /// Candidate index for /analyze
    #[serde(default)]
    candidate: Option<usize>,
}

impl ResearcherRequest {
    fn query(&self) -> SearchQuery {
        SearchQuery {
            name: self.name.clone(),
            institution: self.institution.clone(),
            email: self.email.clone(),
        }
    }
}

/// Search response
#[derive(Debug, Serialize)]
struct SearchResponse {
    status: String,
    count: usize,
    candidates: Vec<Candidate>,
}

/// Search endpoint handler
async fn search_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ResearcherRequest>,
) -> Json<SearchResponse> {
    info!(name = %req.name, "Search request");

    let provider = HttpSessionProvider::new(state.http.clone());
    match search_profiles(&provider, &state.pipeline, &req.query()).await {
        Ok(candidates) => Json(SearchResponse {
            status: "success".to_string(),
            count: candidates.len(),
            candidates,
        }),
        Err(e) => {
            error!(error = %e, "Search failed");
            Json(SearchResponse {
                status: format!("error: {}", e),
                count: 0,
                candidates: vec![],
            })
        }
    }
}

/// Analyze endpoint handler: full pipeline, `{ "error": ... }` on failure
async fn analyze_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ResearcherRequest>,
) -> Json<ExtractionOutput> {
    info!(name = %req.name, candidate = ?req.candidate, "Analyze request");

    let provider = HttpSessionProvider::new(state.http.clone());
    let pipeline = ProfilePipeline::new(&provider, state.pipeline.clone());
    let selector = IndexSelector(req.candidate.unwrap_or(0));
    let classifier = state.classifier.as_ref().map(|c| c as &dyn Classifier);

    let output = pipeline.run(&req.query(), &selector, classifier).await;
    if let ExtractionOutput::Failed { error } = &output {
        warn!(name = %req.name, error = %error, "Analyze request failed");
    }
    Json(output)
}

// ============================================================================
// Cookie Management
// ============================================================================

fn handle_cookies(path: Option<PathBuf>, action: CookieAction) -> Result<()> {
    let manager = CookieManager::resolve(path);

    match action {
        CookieAction::Clear => {
            manager.clear()?;
            println!("Cookies cleared.");
        }
        CookieAction::Path => {
            println!("Cookie file: {:?}", manager.path());
        }
        CookieAction::Import { file } => {
            let count = manager
                .import(&file)
                .with_context(|| format!("Failed to import cookies from {:?}", file))?;
            println!("Imported {} cookies into {:?}", count, manager.path());
        }
    }

    Ok(())
}
