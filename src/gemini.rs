//! Script generation client for the Gemini `generateContent` REST API.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::contract::ScriptGenerator;
use crate::error::GenerationError;

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

const PROMPT_PREAMBLE: &str = "\
You are a podcast narrator explaining a research paper to an intelligent, \
technically literate audience. Convert the following research paper into a \
spoken narration whose primary goal is deep understanding.

STRICT FORMAT REQUIREMENTS:
- Output ONLY the spoken narration text
- Do NOT include music cues, sound effects, transitions, or stage directions
- Do NOT include labels, headings, bullet points, or markdown
- Write in complete, conversational sentences suitable for text-to-speech

CONTENT GUIDELINES:
- Begin with a brief introduction framing the problem and why it is difficult
- Explain the methodological pipeline in detail, then results and limitations
- Use analogies only when they clarify a technical mechanism
- Conclude with implications and future work

PAPER:
";

pub struct GeminiGenerator {
    http: reqwest::Client,
    api_key: String,
    model: String,
}

impl GeminiGenerator {
    pub fn new(api_key: String, model: String) -> Self {
        GeminiGenerator {
            http: reqwest::Client::new(),
            api_key,
            model,
        }
    }
}

#[derive(Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Serialize, Deserialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[async_trait]
impl ScriptGenerator for GeminiGenerator {
    async fn generate(
        &self,
        source_text: &str,
        max_source_chars: usize,
    ) -> Result<String, GenerationError> {
        let bounded = truncate_chars(source_text, max_source_chars);
        if bounded.len() < source_text.len() {
            warn!(
                original_chars = source_text.chars().count(),
                max_source_chars,
                "source text truncated before generation"
            );
        }

        let url = format!(
            "{API_BASE}/models/{}:generateContent?key={}",
            self.model, self.api_key
        );
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: format!("{PROMPT_PREAMBLE}{bounded}"),
                }],
            }],
        };

        let response = self
            .http
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| GenerationError::Request(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::Request(format!(
                "{status}: {body}"
            )));
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::Request(e.to_string()))?;
        let script: String = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| {
                c.parts
                    .into_iter()
                    .map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if script.trim().is_empty() {
            return Err(GenerationError::EmptyResponse);
        }
        info!(model = %self.model, script_chars = script.len(), "script generated");
        Ok(script)
    }
}

fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((offset, _)) => &s[..offset],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncation_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("short", 100), "short");
    }
}
