//! # scholarleads
//!
//! Google Scholar researcher profile discovery and extraction.
//!
//! ## Modules
//!
//! - [`search`] - Author search returning candidate profile URLs
//! - [`profile`] - Name, research area, citations and publication list
//! - [`abstracts`] - Abstract cascade with publisher second hop, bounded fan-out
//! - [`coauthors`] - Coauthor parsing and "view all" merge
//! - [`pipeline`] - Extraction orchestrator and end-to-end `run`
//! - [`classify`] - Qualitative-research classifier (OpenAI-compatible API)
//! - [`fetcher`] / [`http`] - Page fetcher contract and the reqwest backend
//! - [`store`] - JSON records and CSV coauthor leads
//! - [`cookies`] - Cookie persistence
//! - [`error`] - Custom error types
//!
//! ## Usage
//!
//! ```rust,no_run
//! use scholarleads::config::{HttpConfig, PipelineConfig};
//! use scholarleads::http::HttpSessionProvider;
//! use scholarleads::pipeline::{FirstCandidate, ProfilePipeline};
//! use scholarleads::search::SearchQuery;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let provider = HttpSessionProvider::new(HttpConfig::default());
//!     let pipeline = ProfilePipeline::new(&provider, PipelineConfig::default());
//!     let output = pipeline
//!         .run(&SearchQuery::new("Maria Silva"), &FirstCandidate, None)
//!         .await;
//!     println!("{}", serde_json::to_string_pretty(&output)?);
//!     Ok(())
//! }
//! ```

pub mod abstracts;
pub mod classify;
pub mod coauthors;
pub mod config;
pub mod cookies;
pub mod dom;
pub mod error;
pub mod fetcher;
pub mod http;
pub mod model;
pub mod pipeline;
pub mod profile;
pub mod prompts;
pub mod search;
pub mod store;
pub mod testing;

pub use error::{LeadsError, Result};
