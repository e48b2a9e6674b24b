//! Researcher classification through an OpenAI-compatible chat API.
//!
//! The pipeline only depends on the [`Classifier`] trait; [`LlmClassifier`]
//! is the bundled implementation. A reply that cannot be parsed becomes an
//! inconclusive classification rather than an error.

use crate::error::{LeadsError, Result};
use crate::model::{Classification, QualitativeAnalysis, ResearcherProfile};
use crate::prompts::{build_user_prompt, SYSTEM_PROMPT};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Request timeout in seconds
const REQUEST_TIMEOUT_SECS: u64 = 60;

/// Verdict attached when the model's answer cannot be read.
pub const INCONCLUSIVE: &str = "inconclusive";

/// Attaches a qualitative-research verdict to an assembled profile.
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(&self, profile: &ResearcherProfile) -> Result<Classification>;
}

/// LLM configuration
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
}

/// OpenAI-compatible API response structures
#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    prompt_tokens: u64,
    completion_tokens: u64,
}

/// Profile data sent to the model (no coauthors, no URLs)
#[derive(Debug, Serialize)]
struct ProfileForLlm<'a> {
    name: &'a str,
    research_area: &'a str,
    total_citations: u64,
    articles: Vec<ArticleForLlm<'a>>,
}

#[derive(Debug, Serialize)]
struct ArticleForLlm<'a> {
    title: &'a str,
    #[serde(rename = "abstract")]
    abstract_text: &'a str,
}

impl<'a> From<&'a ResearcherProfile> for ProfileForLlm<'a> {
    fn from(p: &'a ResearcherProfile) -> Self {
        Self {
            name: &p.name,
            research_area: &p.research_area,
            total_citations: p.total_citations,
            articles: p
                .publications
                .iter()
                .map(|a| ArticleForLlm {
                    title: &a.title,
                    abstract_text: a.abstract_text.as_deref().unwrap_or_default(),
                })
                .collect(),
        }
    }
}

/// Classifier backed by a chat completion endpoint.
pub struct LlmClassifier {
    client: reqwest::Client,
    config: LlmConfig,
}

impl LlmClassifier {
    pub fn new(config: LlmConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(LeadsError::Config("LLM API key is empty".to_string()));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| LeadsError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }
}

#[async_trait]
impl Classifier for LlmClassifier {
    async fn classify(&self, profile: &ResearcherProfile) -> Result<Classification> {
        let profile_json = serde_json::to_string_pretty(&ProfileForLlm::from(profile))?;
        let user_prompt = build_user_prompt(&profile_json);

        let request_body = serde_json::json!({
            "model": self.config.model,
            "messages": [
                {"role": "system", "content": SYSTEM_PROMPT},
                {"role": "user", "content": user_prompt}
            ],
            "temperature": 0.1
        });

        let api_url = format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'));

        info!(name = %profile.name, model = %self.config.model, "Classifying researcher");

        let response = self
            .client
            .post(&api_url)
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .json(&request_body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(LeadsError::Api {
                code: i32::from(status.as_u16()),
                message: format!("LLM API error: {} - {}", status, error_text),
            });
        }

        let api_response: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| LeadsError::Parse(format!("Failed to parse LLM response: {}", e)))?;

        if let Some(usage) = &api_response.usage {
            debug!(
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "LLM usage"
            );
        }

        let content = api_response
            .choices
            .first()
            .map(|c| c.message.content.as_str())
            .unwrap_or_default();

        Ok(parse_llm_response(content))
    }
}

/// Parse the model's JSON answer, degrading to an inconclusive verdict.
fn parse_llm_response(content: &str) -> Classification {
    #[derive(Deserialize)]
    struct LlmOutput {
        is_qualitative_researcher: bool,
        contains_qualitative_research: bool,
        #[serde(default)]
        detailed_analysis: String,
        #[serde(default, alias = "veredict")]
        verdict: Option<String>,
    }

    let json_str = extract_json(content);

    match serde_json::from_str::<LlmOutput>(&json_str) {
        Ok(output) => Classification {
            verdict: output.verdict.filter(|v| !v.trim().is_empty()),
            analysis: Some(QualitativeAnalysis {
                is_qualitative_researcher: output.is_qualitative_researcher,
                contains_qualitative_research: output.contains_qualitative_research,
                detailed_analysis: output.detailed_analysis,
            }),
        },
        Err(e) => {
            let preview: String = content.chars().take(200).collect();
            warn!(
                error = %e,
                content_preview = %preview,
                "LLM output parse failed - treating as inconclusive"
            );
            Classification {
                verdict: Some(INCONCLUSIVE.to_string()),
                analysis: Some(QualitativeAnalysis {
                    detailed_analysis: format!("Parse error: {}", e),
                    ..Default::default()
                }),
            }
        }
    }
}

/// Extract JSON from LLM response (handles markdown code blocks)
fn extract_json(content: &str) -> String {
    let trimmed = content.trim();

    if let Some(body) = trimmed.strip_prefix("```") {
        let body = body.strip_prefix("json").unwrap_or(body);
        let body = body.strip_suffix("```").unwrap_or(body);
        return body.trim().to_string();
    }

    match (trimmed.find('{'), trimmed.rfind('}')) {
        (Some(start), Some(end)) if start < end => trimmed[start..=end].to_string(),
        _ => trimmed.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Publication;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const ANSWER: &str = r#"{"is_qualitative_researcher": true, "contains_qualitative_research": true, "detailed_analysis": "Interviews with nurses.", "verdict": "Pesquisadora qualitativa"}"#;

    fn profile() -> ResearcherProfile {
        ResearcherProfile {
            name: "Maria Silva".to_string(),
            profile_url: "https://scholar.google.com/citations?user=AAA111".to_string(),
            research_area: "Pesquisa Qualitativa".to_string(),
            publications: vec![Publication::new("Night shifts", "https://scholar.google.com/x")],
            ..Default::default()
        }
    }

    #[test]
    fn test_extract_json_code_block() {
        let input = format!("```json\n{}\n```", ANSWER);
        assert_eq!(extract_json(&input), ANSWER);
    }

    #[test]
    fn test_extract_json_with_text() {
        let input = format!("Here is the result: {} Hope it helps.", ANSWER);
        assert_eq!(extract_json(&input), ANSWER);
    }

    #[test]
    fn test_parse_llm_response() {
        let classification = parse_llm_response(ANSWER);
        assert_eq!(classification.verdict.as_deref(), Some("Pesquisadora qualitativa"));
        let analysis = classification.analysis.expect("analysis");
        assert!(analysis.is_qualitative_researcher);
    }

    #[test]
    fn test_malformed_answer_is_inconclusive() {
        let classification = parse_llm_response("I cannot decide.");
        assert_eq!(classification.verdict.as_deref(), Some(INCONCLUSIVE));
        let analysis = classification.analysis.expect("analysis");
        assert!(!analysis.is_qualitative_researcher);
        assert!(analysis.detailed_analysis.starts_with("Parse error"));
    }

    #[test]
    fn test_empty_api_key_rejected() {
        let config = LlmConfig {
            base_url: "http://localhost".to_string(),
            api_key: " ".to_string(),
            model: "m".to_string(),
        };
        assert!(matches!(LlmClassifier::new(config), Err(LeadsError::Config(_))));
    }

    #[tokio::test]
    async fn test_classify_against_chat_api() -> Result<()> {
        let server = MockServer::start().await;
        let body = serde_json::json!({
            "choices": [{"message": {"content": ANSWER}}],
            "usage": {"prompt_tokens": 10, "completion_tokens": 5}
        });
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("Authorization", "Bearer secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .expect(1)
            .mount(&server)
            .await;

        let classifier = LlmClassifier::new(LlmConfig {
            base_url: format!("{}/v1/", server.uri()),
            api_key: "secret".to_string(),
            model: "test-model".to_string(),
        })?;

        let classification = classifier.classify(&profile()).await?;
        assert!(classification
            .analysis
            .is_some_and(|a| a.contains_qualitative_research));
        Ok(())
    }

    #[tokio::test]
    async fn test_classify_api_error() -> Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .mount(&server)
            .await;

        let classifier = LlmClassifier::new(LlmConfig {
            base_url: server.uri(),
            api_key: "secret".to_string(),
            model: "test-model".to_string(),
        })?;

        match classifier.classify(&profile()).await {
            Err(LeadsError::Api { code, .. }) => assert_eq!(code, 503),
            other => panic!("expected API error, got {:?}", other.map(|c| c.verdict)),
        }
        Ok(())
    }
}
