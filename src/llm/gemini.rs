//! Google Gemini 답변 생성
//!
//! generateContent API에 대화 기록을 user/model 턴으로 전달합니다.
//! source: https://ai.google.dev/api/generate-content

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::LlmProvider;
use crate::config::GenerationOptions;
use crate::session::Turn;

/// generateContent 엔드포인트 (모델 이름 앞부분)
const GEMINI_MODELS_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Gemini LLM 구현체
#[derive(Debug)]
pub struct GeminiLlm {
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl GeminiLlm {
    /// 새 인스턴스 생성
    pub fn new(api_key: String, model: &str) -> Result<Self> {
        if model.trim().is_empty() {
            anyhow::bail!("LLM model name must not be empty");
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            api_key,
            model: model.to_string(),
            client,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/{}:generateContent", GEMINI_MODELS_URL, self.model)
    }

    /// 요청 본문 구성
    ///
    /// max_length는 Gemini에 대응 항목이 없어 사용하지 않습니다.
    fn build_request(
        prompt: &str,
        history: &[Turn],
        options: &GenerationOptions,
    ) -> GenerateRequest {
        let mut contents = Vec::with_capacity(history.len() * 2 + 1);
        for turn in history {
            contents.push(Content::new("user", &turn.question));
            contents.push(Content::new("model", &turn.answer));
        }
        contents.push(Content::new("user", prompt));

        GenerateRequest {
            contents,
            generation_config: GenerationConfig {
                temperature: options.temperature,
                max_output_tokens: options.max_new_tokens,
            },
        }
    }
}

// ============================================================================
// API Types
// ============================================================================

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    role: String,
    parts: Vec<Part>,
}

impl Content {
    fn new(role: &str, text: &str) -> Self {
        Self {
            role: role.to_string(),
            parts: vec![Part {
                text: text.to_string(),
            }],
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

impl GenerateResponse {
    /// 첫 번째 후보의 텍스트 파트를 이어 붙임
    fn into_text(self) -> Option<String> {
        let candidate = self.candidates.into_iter().next()?;
        let text: String = candidate
            .content
            .parts
            .into_iter()
            .map(|p| p.text)
            .collect();
        Some(text)
    }
}

#[async_trait]
impl LlmProvider for GeminiLlm {
    async fn generate(
        &self,
        prompt: &str,
        history: &[Turn],
        options: &GenerationOptions,
    ) -> Result<String> {
        let request = Self::build_request(prompt, history, options);

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .context("Failed to send generateContent request")?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            anyhow::bail!("Gemini API error ({}): {}", status, body);
        }

        let parsed: GenerateResponse =
            serde_json::from_str(&body).context("Failed to parse generateContent response")?;

        parsed
            .into_text()
            .ok_or_else(|| anyhow::anyhow!("Gemini returned no candidates"))
    }

    fn name(&self) -> &str {
        &self.model
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint() {
        let llm = GeminiLlm::new("key".to_string(), "gemini-2.0-flash").unwrap();
        assert_eq!(
            llm.endpoint(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent"
        );
        assert!(GeminiLlm::new("key".to_string(), " ").is_err());
    }

    #[test]
    fn test_request_alternates_roles() {
        let history = vec![Turn::new("q1", "a1")];
        let request =
            GeminiLlm::build_request("prompt", &history, &GenerationOptions::default());
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["contents"][0]["role"], "user");
        assert_eq!(json["contents"][1]["role"], "model");
        assert_eq!(json["contents"][1]["parts"][0]["text"], "a1");
        assert_eq!(json["contents"][2]["parts"][0]["text"], "prompt");
        assert_eq!(json["generationConfig"]["maxOutputTokens"], 50);
    }

    #[test]
    fn test_parse_response() {
        let body = r#"{"candidates":[{"content":{"parts":[{"text":"Hello "},{"text":"world"}]}}]}"#;
        let parsed: GenerateResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.into_text().as_deref(), Some("Hello world"));

        let parsed: GenerateResponse = serde_json::from_str("{}").unwrap();
        assert!(parsed.into_text().is_none());
    }
}
