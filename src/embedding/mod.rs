//! 임베딩 모듈 - 텍스트 벡터화 프로바이더
//!
//! 세션 생성 시 설정에 따라 하나의 프로바이더를 고르고,
//! 인덱스 구축과 질문 임베딩 모두 같은 인스턴스를 사용합니다.
//!
//! ## 사용법
//! ```rust,ignore
//! let embedder = create_embedder(&EmbeddingConfig::default())?;
//! let embedding = embedder.embed("Hello, world!").await?;
//! ```

mod gemini;
mod hashing;
mod huggingface;

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use crate::config::{get_api_key, get_hf_token, EmbeddingBackend, EmbeddingConfig};

pub use gemini::GeminiEmbedding;
pub use hashing::HashingEmbedding;
pub use huggingface::HuggingFaceEmbedding;

// ============================================================================
// EmbeddingProvider Trait
// ============================================================================

/// 임베딩 프로바이더 트레이트
///
/// 텍스트를 고정 차원 벡터로 변환하는 인터페이스입니다.
/// `embed`는 질문, `embed_batch`는 문서 청크에 사용됩니다.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// 단일 텍스트 임베딩
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// 배치 임베딩 (기본 구현: 순차 호출)
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.embed(text).await?);
        }
        Ok(results)
    }

    /// 임베딩 차원 수
    fn dimension(&self) -> usize;

    /// 프로바이더 이름
    fn name(&self) -> &str;
}

// ============================================================================
// Factory Function
// ============================================================================

/// 설정에 맞는 임베딩 프로바이더 생성
///
/// 원격 백엔드는 환경변수에서 키를 읽습니다.
pub fn create_embedder(config: &EmbeddingConfig) -> Result<Arc<dyn EmbeddingProvider>> {
    let embedder: Arc<dyn EmbeddingProvider> = match config.backend {
        EmbeddingBackend::HuggingFace => Arc::new(HuggingFaceEmbedding::new(
            get_hf_token()?,
            &config.model,
            config.dimension,
        )?),
        EmbeddingBackend::Gemini => Arc::new(GeminiEmbedding::new(
            get_api_key()?,
            &config.model,
            config.dimension,
        )?),
        EmbeddingBackend::Hashing => Arc::new(HashingEmbedding::new(config.dimension)?),
    };

    tracing::info!(
        "Using {} embedding (dimension: {})",
        embedder.name(),
        embedder.dimension()
    );
    Ok(embedder)
}

// ============================================================================
// Tests
// ============================================================================
