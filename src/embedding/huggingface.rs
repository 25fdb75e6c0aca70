//! HuggingFace Inference API 임베딩
//!
//! feature-extraction 파이프라인으로 텍스트를 벡터화합니다.
//! ref: https://huggingface.co/docs/api-inference/tasks/feature-extraction

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::EmbeddingProvider;

/// Inference API feature-extraction 엔드포인트
const HF_FEATURE_EXTRACTION_URL: &str =
    "https://api-inference.huggingface.co/pipeline/feature-extraction";

/// 요청당 최대 텍스트 수
const BATCH_SIZE: usize = 32;

/// HuggingFace 임베딩 구현체
#[derive(Debug)]
pub struct HuggingFaceEmbedding {
    token: String,
    model: String,
    dimension: usize,
    client: reqwest::Client,
}

impl HuggingFaceEmbedding {
    /// 새 인스턴스 생성
    ///
    /// # Arguments
    /// * `token` - HuggingFace API 토큰
    /// * `model` - 모델 repo id (예: hkunlp/instructor-xl)
    /// * `dimension` - 모델 출력 차원
    pub fn new(token: String, model: &str, dimension: usize) -> Result<Self> {
        if model.trim().is_empty() {
            anyhow::bail!("Embedding model id must not be empty");
        }
        if dimension == 0 {
            anyhow::bail!("Embedding dimension must be greater than 0");
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            token,
            model: model.to_string(),
            dimension,
            client,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/{}", HF_FEATURE_EXTRACTION_URL, self.model)
    }

    /// 한 번의 요청으로 여러 텍스트 임베딩
    async fn request(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let request = FeatureRequest {
            inputs: texts,
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
            .context("Failed to send feature-extraction request")?;

        let status = response.status();
        let body = response
            .text()
            .await
            .context("Failed to read response body")?;

        if !status.is_success() {
            if let Ok(error) = serde_json::from_str::<HfError>(&body) {
                anyhow::bail!("HuggingFace API error ({}): {}", status, error.error);
            }
            anyhow::bail!("HuggingFace API error ({}): {}", status, body);
        }

        let parsed: FeatureResponse =
            serde_json::from_str(&body).context("Failed to parse feature-extraction response")?;
        Ok(parsed.into_sentence_vectors())
    }
}

// ============================================================================
// API Types
// ============================================================================

#[derive(Debug, Serialize)]
struct FeatureRequest<'a> {
    inputs: &'a [String],
    options: RequestOptions,
}

#[derive(Debug, Serialize)]
struct RequestOptions {
    wait_for_model: bool,
}

/// 모델에 따라 문장 벡터 또는 토큰별 벡터가 반환됨
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FeatureResponse {
    Sentences(Vec<Vec<f32>>),
    Tokens(Vec<Vec<Vec<f32>>>),
}

impl FeatureResponse {
    /// 토큰별 벡터는 평균 풀링
    fn into_sentence_vectors(self) -> Vec<Vec<f32>> {
        match self {
            FeatureResponse::Sentences(vectors) => vectors,
            FeatureResponse::Tokens(per_text) => per_text.into_iter().map(mean_pool).collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct HfError {
    error: String,
}

fn mean_pool(tokens: Vec<Vec<f32>>) -> Vec<f32> {
    let Some(width) = tokens.first().map(Vec::len) else {
        return vec![];
    };

    let mut sum = vec![0.0f32; width];
    for token in &tokens {
        for (acc, value) in sum.iter_mut().zip(token) {
            *acc += value;
        }
    }

    let count = tokens.len() as f32;
    sum.into_iter().map(|v| v / count).collect()
}

#[async_trait]
impl EmbeddingProvider for HuggingFaceEmbedding {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.request(&[text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| anyhow::anyhow!("Empty feature-extraction response"))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut results = Vec::with_capacity(texts.len());

        for (i, batch) in texts.chunks(BATCH_SIZE).enumerate() {
            tracing::debug!(
                "Embedding batch {}/{}",
                i + 1,
                texts.len().div_ceil(BATCH_SIZE)
            );
            results.extend(self.request(batch).await?);
        }

        Ok(results)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn name(&self) -> &str {
        &self.model
    }
}

// ============================================================================
// Tests
// ============================================================================
