//! Google Gemini 임베딩
//!
//! source: https://ai.google.dev/gemini-api/docs/embeddings
//!
//! 문서 청크는 `RETRIEVAL_DOCUMENT`, 질문은 `RETRIEVAL_QUERY` 용도로 임베딩합니다.
//! 무료 티어 한도(60 RPM)를 지키도록 요청 간격을 조절하고,
//! 429 응답과 전송 실패는 지수 백오프로 재시도합니다.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use super::EmbeddingProvider;

/// Gemini API 베이스 URL
const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// 지원하는 출력 차원
const SUPPORTED_DIMENSIONS: [usize; 3] = [768, 1536, 3072];

/// 분당 최대 요청 수 (Gemini 무료 티어)
const REQUESTS_PER_MINUTE: usize = 60;
/// 호출 간 최소 간격
const MIN_INTERVAL: Duration = Duration::from_millis(1000);
/// 재시도 횟수
const MAX_RETRIES: u32 = 3;
/// 초기 백오프 (ms)
const INITIAL_BACKOFF_MS: u64 = 2000;

/// 임베딩 용도 (Gemini taskType)
#[derive(Debug, Clone, Copy)]
enum TaskType {
    /// 인덱싱할 문서 청크
    Document,
    /// 검색 질문
    Query,
}

impl TaskType {
    fn as_str(&self) -> &'static str {
        match self {
            TaskType::Document => "RETRIEVAL_DOCUMENT",
            TaskType::Query => "RETRIEVAL_QUERY",
        }
    }
}

// ============================================================================
// Request Pacing
// ============================================================================

/// 1분 윈도우 안의 요청 시각 기록
#[derive(Debug, Default)]
struct RequestPacer {
    sent: VecDeque<Instant>,
}

impl RequestPacer {
    /// 다음 요청을 보내도 될 때까지 대기
    async fn wait_turn(&mut self) {
        if let Some(&last) = self.sent.back() {
            let since_last = last.elapsed();
            if since_last < MIN_INTERVAL {
                tokio::time::sleep(MIN_INTERVAL - since_last).await;
            }
        }

        let window = Duration::from_secs(60);
        while let Some(&oldest) = self.sent.front() {
            if oldest.elapsed() < window {
                break;
            }
            self.sent.pop_front();
        }

        if self.sent.len() >= REQUESTS_PER_MINUTE {
            if let Some(oldest) = self.sent.pop_front() {
                let wait = window.saturating_sub(oldest.elapsed());
                tracing::debug!("Gemini request quota reached, waiting {:?}", wait);
                tokio::time::sleep(wait).await;
            }
        }

        self.sent.push_back(Instant::now());
    }
}

/// 한 번의 HTTP 시도 결과
enum Attempt {
    Embedded(Vec<f32>),
    /// 재시도할 수 있는 실패 (전송 실패, 429)
    Retryable(anyhow::Error),
}

// ============================================================================
// GeminiEmbedding
// ============================================================================

/// Google Gemini 임베딩 구현체
#[derive(Debug)]
pub struct GeminiEmbedding {
    api_key: String,
    /// "models/" 접두사 없는 모델 이름
    model: String,
    client: reqwest::Client,
    dimension: usize,
    pacer: Mutex<RequestPacer>,
}

impl GeminiEmbedding {
    /// 새 인스턴스 생성
    ///
    /// # Arguments
    /// * `api_key` - Google AI API 키
    /// * `model` - 임베딩 모델 이름 (예: gemini-embedding-001, "models/" 접두사 허용)
    /// * `dimension` - 출력 차원 (768, 1536, 3072 중 선택)
    pub fn new(api_key: String, model: &str, dimension: usize) -> Result<Self> {
        if !SUPPORTED_DIMENSIONS.contains(&dimension) {
            anyhow::bail!(
                "Invalid dimension: {}. Must be 768, 1536, or 3072",
                dimension
            );
        }

        let model = model.trim().trim_start_matches("models/");
        if model.is_empty() {
            anyhow::bail!("Gemini embedding model must not be empty");
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            api_key,
            model: model.to_string(),
            client,
            dimension,
            pacer: Mutex::new(RequestPacer::default()),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:embedContent", GEMINI_API_BASE, self.model)
    }

    fn build_request(&self, text: &str, task: TaskType) -> EmbedRequest {
        EmbedRequest {
            model: format!("models/{}", self.model),
            content: EmbedContent {
                parts: vec![EmbedPart {
                    text: text.to_string(),
                }],
            },
            task_type: task.as_str(),
            output_dimensionality: Some(self.dimension),
        }
    }

    /// 용도를 지정한 단일 임베딩
    async fn embed_with_task(&self, text: &str, task: TaskType) -> Result<Vec<f32>> {
        if text.trim().is_empty() {
            return Ok(vec![0.0; self.dimension]);
        }

        let request = self.build_request(text, task);

        for attempt in 0..=MAX_RETRIES {
            self.pacer.lock().await.wait_turn().await;

            match self.send(&request).await? {
                Attempt::Embedded(values) => return Ok(values),
                Attempt::Retryable(e) if attempt < MAX_RETRIES => {
                    let backoff = backoff_for(attempt);
                    tracing::warn!(
                        "{}, retrying in {:?} (attempt {}/{})",
                        e,
                        backoff,
                        attempt + 1,
                        MAX_RETRIES
                    );
                    tokio::time::sleep(backoff).await;
                }
                Attempt::Retryable(e) => {
                    return Err(e.context(format!("Embedding failed after {} retries", MAX_RETRIES)))
                }
            }
        }

        anyhow::bail!("Embedding failed after {} retries", MAX_RETRIES)
    }

    /// 요청 한 번 전송
    ///
    /// 429 외의 API 에러는 즉시 `Err`로 반환합니다.
    async fn send(&self, request: &EmbedRequest) -> Result<Attempt> {
        // API 키는 URL이 아닌 헤더로 전송
        let response = match self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(request)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                return Ok(Attempt::Retryable(anyhow::anyhow!(
                    "Failed to send embedding request: {}",
                    e
                )))
            }
        };

        let status = response.status();
        let body = response
            .text()
            .await
            .context("Failed to read response body")?;

        if status.is_success() {
            let parsed: EmbedResponse =
                serde_json::from_str(&body).context("Failed to parse embedding response")?;
            return Ok(Attempt::Embedded(parsed.embedding.values));
        }

        if status.as_u16() == 429 {
            return Ok(Attempt::Retryable(anyhow::anyhow!(
                "Rate limit exceeded (429)"
            )));
        }

        match serde_json::from_str::<GeminiError>(&body) {
            Ok(error) => anyhow::bail!(
                "Gemini API error ({}): {}",
                error.error.status,
                error.error.message
            ),
            Err(_) => anyhow::bail!("Gemini API error ({}): {}", status, body),
        }
    }
}

fn backoff_for(attempt: u32) -> Duration {
    Duration::from_millis(INITIAL_BACKOFF_MS * 2u64.pow(attempt))
}

// ============================================================================
// API Types
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EmbedRequest {
    model: String,
    content: EmbedContent,
    task_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    output_dimensionality: Option<usize>,
}

#[derive(Debug, Serialize)]
struct EmbedContent {
    parts: Vec<EmbedPart>,
}

#[derive(Debug, Serialize)]
struct EmbedPart {
    text: String,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embedding: EmbeddingValues,
}

#[derive(Debug, Deserialize)]
struct EmbeddingValues {
    values: Vec<f32>,
}

/// Gemini API 에러 응답
#[derive(Debug, Deserialize)]
struct GeminiError {
    error: GeminiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorDetail {
    message: String,
    #[serde(default)]
    status: String,
}

#[async_trait]
impl EmbeddingProvider for GeminiEmbedding {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_with_task(text, TaskType::Query).await
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        // embedContent는 텍스트 하나씩 처리
        let mut results = Vec::with_capacity(texts.len());

        for (i, text) in texts.iter().enumerate() {
            tracing::debug!("Embedding chunk {}/{}", i + 1, texts.len());
            results.push(self.embed_with_task(text, TaskType::Document).await?);
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

#[cfg(test)]
mod tests {
    use super::*;

    const DEFAULT_MODEL: &str = "gemini-embedding-001";

    #[test]
    fn test_invalid_dimension() {
        let result = GeminiEmbedding::new("fake_key".to_string(), DEFAULT_MODEL, 999);
        let err = result.err().map(|e| e.to_string()).unwrap_or_default();
        assert!(err.contains("Invalid dimension"));

        for dim in SUPPORTED_DIMENSIONS {
            assert!(GeminiEmbedding::new("fake_key".to_string(), DEFAULT_MODEL, dim).is_ok());
        }
    }

    #[test]
    fn test_model_drives_endpoint_and_request() {
        let embedder =
            GeminiEmbedding::new("fake_key".to_string(), "models/text-embedding-004", 768)
                .unwrap();
        assert_eq!(embedder.name(), "text-embedding-004");
        assert_eq!(
            embedder.endpoint(),
            "https://generativelanguage.googleapis.com/v1beta/models/text-embedding-004:embedContent"
        );

        let json = serde_json::to_value(embedder.build_request("hi", TaskType::Query)).unwrap();
        assert_eq!(json["model"], "models/text-embedding-004");
        assert_eq!(json["taskType"], "RETRIEVAL_QUERY");
        assert_eq!(json["outputDimensionality"], 768);
        assert_eq!(json["content"]["parts"][0]["text"], "hi");

        assert!(GeminiEmbedding::new("fake_key".to_string(), "  ", 768).is_err());
    }

    #[tokio::test]
    async fn test_empty_text_returns_zero_vector() {
        let embedder = GeminiEmbedding::new("fake_key".to_string(), DEFAULT_MODEL, 768).unwrap();
        let vector = embedder.embed("   ").await.unwrap();
        assert_eq!(vector.len(), 768);
        assert!(vector.iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_backoff_grows() {
        assert_eq!(backoff_for(0), Duration::from_millis(2000));
        assert_eq!(backoff_for(2), Duration::from_millis(8000));
    }

    #[tokio::test]
    async fn test_pacer_records_requests() {
        let mut pacer = RequestPacer::default();
        pacer.wait_turn().await;
        assert_eq!(pacer.sent.len(), 1);
    }
}
