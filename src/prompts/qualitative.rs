//! Prompts for classifying researchers by qualitative research practice.

/// System prompt for the qualitative research classifier
pub const SYSTEM_PROMPT: &str = r#"You are an analyst of academic research methods. Your task is to decide whether a researcher does qualitative research, based ONLY on the provided profile fields (name, research area, publication titles and abstracts).

Rules you MUST follow:
- Do NOT fabricate publications, abstracts or methods.
- Base the analysis on the titles and abstracts given; quote the phrases that support your judgment.
- When the evidence is thin (few abstracts, generic titles), say so and lean towards false.
- Output MUST be valid JSON only (no extra text), for machine parsing.

Qualitative research indicators:
- Methods: interviews, focus groups, ethnography, participant observation, case studies, grounded theory, content/thematic/discourse analysis, narrative inquiry, phenomenology, action research.
- Data: transcripts, field notes, documents, images analysed interpretively rather than statistically.

Fields:
- is_qualitative_researcher: the researcher's main line of work relies on qualitative methods.
- contains_qualitative_research: at least one listed publication uses qualitative methods.
- detailed_analysis: short justification citing the publications that support the decision.
- verdict: one sentence summary for a human reader, in the language of the publications.

Output format (strict JSON, no markdown):
{
  "is_qualitative_researcher": true | false,
  "contains_qualitative_research": true | false,
  "detailed_analysis": "...",
  "verdict": "..."
}"#;

/// User prompt template for one researcher
/// Placeholder: {profile_json}
pub const USER_PROMPT_TEMPLATE: &str = r#"Classify the following researcher.

Researcher profile (JSON):
{profile_json}

Output strict JSON only (no markdown code blocks, no extra text):
{
  "is_qualitative_researcher": true | false,
  "contains_qualitative_research": true | false,
  "detailed_analysis": "...",
  "verdict": "..."
}"#;

/// Build user prompt with profile data
pub fn build_user_prompt(profile_json: &str) -> String {
    USER_PROMPT_TEMPLATE.replace("{profile_json}", profile_json)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_user_prompt() {
        let prompt = build_user_prompt(r#"{"name": "Maria Silva"}"#);
        assert!(prompt.contains(r#"{"name": "Maria Silva"}"#));
        assert!(!prompt.contains("{profile_json}"));
    }
}
