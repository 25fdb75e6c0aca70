//! 에러 타입
//!
//! 파이프라인과 대화 세션이 반환하는 에러 분류입니다.
//! 프로바이더 구현체는 `anyhow::Result`를 반환하고,
//! 세션 경계에서 `RagError`로 감싸집니다.

/// 라이브러리 공통 Result
pub type Result<T> = std::result::Result<T, RagError>;

/// 외부 에러를 담는 박스 타입
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// RAG 파이프라인 에러
///
/// 모든 에러는 현재 명령(process / ask)을 통째로 중단시킵니다.
/// 부분적으로 만들어진 인덱스나 대화 턴은 남지 않습니다.
#[derive(Debug, thiserror::Error)]
pub enum RagError {
    /// 문서 파싱 실패 (손상, 암호화, 잘못된 인코딩)
    #[error("Unreadable document '{name}': {source}")]
    UnreadableDocument {
        name: String,
        #[source]
        source: BoxError,
    },

    /// 임베딩 프로바이더 호출 실패
    #[error("Embedding provider '{provider}' failed: {source}")]
    EmbeddingProvider {
        provider: String,
        #[source]
        source: BoxError,
    },

    /// 청크/벡터 개수 또는 벡터 차원 불일치
    #[error("Dimension mismatch ({what}): expected {expected}, got {actual}")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    /// LLM 답변 생성 실패
    #[error("Answer generation failed ({provider}): {source}")]
    AnswerGeneration {
        provider: String,
        #[source]
        source: BoxError,
    },

    /// 인덱스가 아직 없음 (process 전에 ask 호출)
    #[error("No documents processed yet. Run process before asking questions")]
    NotReady,

    /// 빈 질문
    #[error("Question is empty")]
    EmptyQuestion,

    /// 추출된 텍스트가 없음 (문서 없음 또는 스캔 PDF만 있음)
    #[error("No extractable text found in the uploaded documents")]
    NoText,

    /// 청크 수 제한 초과
    #[error("Documents produced {chunks} chunks, exceeding the limit of {limit}")]
    DocumentTooLarge { chunks: usize, limit: usize },

    /// 잘못된 설정값
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl RagError {
    /// 임베딩 에러 생성 헬퍼
    pub fn embedding(provider: &str, source: impl Into<BoxError>) -> Self {
        Self::EmbeddingProvider {
            provider: provider.to_string(),
            source: source.into(),
        }
    }

    /// 답변 생성 에러 생성 헬퍼
    pub fn answer(provider: &str, source: impl Into<BoxError>) -> Self {
        Self::AnswerGeneration {
            provider: provider.to_string(),
            source: source.into(),
        }
    }

    /// 인덱스 구축 단계 에러인지 여부
    pub fn is_ingestion_error(&self) -> bool {
        matches!(
            self,
            Self::UnreadableDocument { .. }
                | Self::EmbeddingProvider { .. }
                | Self::DimensionMismatch { .. }
                | Self::NoText
                | Self::DocumentTooLarge { .. }
        )
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = RagError::DimensionMismatch {
            what: "vectors per chunk",
            expected: 3,
            actual: 2,
        };
        assert_eq!(
            err.to_string(),
            "Dimension mismatch (vectors per chunk): expected 3, got 2"
        );

        let err = RagError::embedding("hashing", anyhow::anyhow!("offline"));
        assert!(err.to_string().contains("offline"));
        assert!(err.is_ingestion_error());
    }

    #[test]
    fn test_source_chain_preserved() {
        use std::error::Error;

        let err = RagError::answer("gemini", anyhow::anyhow!("quota exceeded"));
        let source = err.source().map(|s| s.to_string());
        assert_eq!(source.as_deref(), Some("quota exceeded"));
        assert!(!err.is_ingestion_error());
    }
}
