//! HuggingFace Inference API 답변 생성
//!
//! text-generation / text2text-generation 모델을 호출합니다.
//! 대화 기록은 프롬프트 앞에 "Chat History" 블록으로 붙입니다.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{render_history, LlmProvider};
use crate::config::GenerationOptions;
use crate::session::Turn;

/// Inference API 모델 엔드포인트
const HF_MODELS_URL: &str = "https://api-inference.huggingface.co/models";

/// HuggingFace Hub LLM 구현체
#[derive(Debug)]
pub struct HuggingFaceLlm {
    token: String,
    repo_id: String,
    client: reqwest::Client,
}

impl HuggingFaceLlm {
    /// 새 인스턴스 생성
    ///
    /// # Arguments
    /// * `token` - HuggingFace API 토큰
    /// * `repo_id` - 모델 repo id (예: google/flan-t5-xxl)
    pub fn new(token: String, repo_id: &str) -> Result<Self> {
        if repo_id.trim().is_empty() {
            anyhow::bail!("LLM repo id must not be empty");
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            token,
            repo_id: repo_id.to_string(),
            client,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/{}", HF_MODELS_URL, self.repo_id)
    }

    /// 기록 블록을 포함한 최종 입력 텍스트
    fn build_input(prompt: &str, history: &[Turn]) -> String {
        if history.is_empty() {
            prompt.to_string()
        } else {
            format!("Chat History:\n{}\n{}", render_history(history), prompt)
        }
    }
}

// ============================================================================
// API Types
// ============================================================================

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    inputs: &'a str,
    parameters: Parameters,
    options: RequestOptions,
}

#[derive(Debug, Serialize)]
struct Parameters {
    temperature: f32,
    max_length: u32,
    max_new_tokens: u32,
    /// text-generation 모델이 프롬프트를 답변 앞에 되풀이하지 않도록 함
    return_full_text: bool,
}

#[derive(Debug, Serialize)]
struct RequestOptions {
    wait_for_model: bool,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum GenerateResponse {
    Generations(Vec<Generation>),
    Error { error: String },
}

#[derive(Debug, Deserialize)]
struct Generation {
    generated_text: String,
}

/// 입력 프롬프트가 앞에 붙어 돌아온 경우 잘라냄
///
/// `return_full_text`를 무시하는 엔드포인트도 있습니다.
fn strip_echoed_input(input: &str, generated: String) -> String {
    match generated.strip_prefix(input) {
        Some(rest) => rest.to_string(),
        None => generated,
    }
}

#[async_trait]
impl LlmProvider for HuggingFaceLlm {
    async fn generate(
        &self,
        prompt: &str,
        history: &[Turn],
        options: &GenerationOptions,
    ) -> Result<String> {
        let input = Self::build_input(prompt, history);
        let request = GenerateRequest {
            inputs: &input,
            parameters: Parameters {
                temperature: options.temperature,
                max_length: options.max_length,
                max_new_tokens: options.max_new_tokens,
                return_full_text: false,
            },
            options: RequestOptions {
                wait_for_model: true,
            },
        };

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.token)
            .json(&request)
            .send()
            .await
            .context("Failed to send text-generation request")?;

        let status = response.status();
        let body = response.text().await?;

        let parsed = serde_json::from_str::<GenerateResponse>(&body);

        match parsed {
            Ok(GenerateResponse::Generations(generations)) if status.is_success() => generations
                .into_iter()
                .next()
                .map(|g| strip_echoed_input(&input, g.generated_text))
                .ok_or_else(|| anyhow::anyhow!("HuggingFace returned no generations")),
            Ok(GenerateResponse::Error { error }) => {
                anyhow::bail!("HuggingFace API error ({}): {}", status, error)
            }
            _ => anyhow::bail!("Unexpected HuggingFace response ({}): {}", status, body),
        }
    }

    fn name(&self) -> &str {
        &self.repo_id
    }
}

// ============================================================================
// Tests
// ============================================================================
