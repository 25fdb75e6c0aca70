//! 설정 모듈
//!
//! 프로바이더 선택, 청킹, 검색, 대화 기록 한도 등 세션 구성값을 모읍니다.
//! 비밀값(API 키)은 환경변수에서만 읽습니다.

use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};
use crate::knowledge::{ChunkConfig, DistanceMetric};

// ============================================================================
// Provider Selection
// ============================================================================

/// 임베딩 백엔드
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    /// HuggingFace Inference API (feature-extraction)
    #[value(name = "huggingface", alias = "hf")]
    HuggingFace,
    /// Google Gemini embedding API
    Gemini,
    /// 로컬 해싱 임베딩 (네트워크 불필요)
    Hashing,
}

impl EmbeddingBackend {
    /// 백엔드별 기본 모델
    pub fn default_model(&self) -> &'static str {
        match self {
            EmbeddingBackend::HuggingFace => "hkunlp/instructor-xl",
            EmbeddingBackend::Gemini => "gemini-embedding-001",
            EmbeddingBackend::Hashing => "feature-hashing",
        }
    }

    /// 백엔드별 기본 차원
    pub fn default_dimension(&self) -> usize {
        match self {
            EmbeddingBackend::HuggingFace => 768,
            EmbeddingBackend::Gemini => 768,
            EmbeddingBackend::Hashing => 384,
        }
    }
}

/// LLM 백엔드
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LlmBackend {
    /// HuggingFace Inference API (text-generation)
    #[value(name = "huggingface", alias = "hf")]
    HuggingFace,
    /// Google Gemini generateContent API
    Gemini,
}

impl LlmBackend {
    /// 백엔드별 기본 모델
    pub fn default_model(&self) -> &'static str {
        match self {
            LlmBackend::HuggingFace => "google/flan-t5-xxl",
            LlmBackend::Gemini => "gemini-2.0-flash",
        }
    }
}

// ============================================================================
// Config Types
// ============================================================================

/// 임베딩 프로바이더 설정
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    pub backend: EmbeddingBackend,
    /// 모델 식별자
    pub model: String,
    /// 벡터 차원
    pub dimension: usize,
}

impl EmbeddingConfig {
    /// 백엔드 기본값으로 생성
    pub fn for_backend(backend: EmbeddingBackend) -> Self {
        Self {
            backend,
            model: backend.default_model().to_string(),
            dimension: backend.default_dimension(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self::for_backend(EmbeddingBackend::HuggingFace)
    }
}

/// LLM 생성 옵션
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationOptions {
    pub temperature: f32,
    /// 프롬프트 포함 최대 길이 (토큰)
    pub max_length: u32,
    /// 새로 생성할 최대 토큰 수
    pub max_new_tokens: u32,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            temperature: 0.5,
            max_length: 1024,
            max_new_tokens: 50,
        }
    }
}

/// LLM 프로바이더 설정
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmConfig {
    pub backend: LlmBackend,
    /// 모델 식별자 (repo id 또는 모델 이름)
    pub model: String,
}

impl LlmConfig {
    /// 백엔드 기본값으로 생성
    pub fn for_backend(backend: LlmBackend) -> Self {
        Self {
            backend,
            model: backend.default_model().to_string(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self::for_backend(LlmBackend::HuggingFace)
    }
}

/// 대화 세션 설정
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    pub chunk: ChunkConfig,
    /// 질문당 검색할 청크 수
    pub top_k: usize,
    pub metric: DistanceMetric,
    /// 후속 질문을 독립 질문으로 재작성한 뒤 검색
    pub condense_question: bool,
    /// 보관할 최대 대화 턴 수 (초과 시 오래된 턴 삭제)
    pub max_history_turns: usize,
    /// 프롬프트에 넣을 최근 턴 수
    pub prompt_history_turns: usize,
    /// process 한 번에 허용하는 최대 청크 수
    pub max_chunks: usize,
    pub generation: GenerationOptions,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            chunk: ChunkConfig::default(),
            top_k: 4,
            metric: DistanceMetric::default(),
            condense_question: false,
            max_history_turns: 50,
            prompt_history_turns: 6,
            max_chunks: 20_000,
            generation: GenerationOptions::default(),
        }
    }
}

impl SessionConfig {
    /// 설정값 검증
    pub fn validate(&self) -> Result<()> {
        self.chunk.validate()?;
        if self.top_k == 0 {
            return Err(RagError::InvalidConfig("top_k must be at least 1".to_string()));
        }
        if self.max_chunks == 0 {
            return Err(RagError::InvalidConfig(
                "max_chunks must be at least 1".to_string(),
            ));
        }
        if self.prompt_history_turns > self.max_history_turns {
            return Err(RagError::InvalidConfig(format!(
                "prompt_history_turns ({}) cannot exceed max_history_turns ({})",
                self.prompt_history_turns, self.max_history_turns
            )));
        }
        Ok(())
    }
}

/// 전체 설정
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RagConfig {
    pub embedding: EmbeddingConfig,
    pub llm: LlmConfig,
    pub session: SessionConfig,
}

// ============================================================================
// API Key Management
// ============================================================================

/// 환경변수 목록에서 첫 번째로 비어있지 않은 값
fn first_env(names: &[&str]) -> Option<String> {
    names.iter().find_map(|name| match std::env::var(name) {
        Ok(value) if !value.is_empty() => {
            tracing::debug!("Using API key from {}", name);
            Some(value)
        }
        _ => None,
    })
}

/// Gemini API 키 환경변수 (우선순위 순)
pub const GEMINI_KEY_VARS: &[&str] = &["GEMINI_API_KEY", "GOOGLE_AI_API_KEY"];

/// HuggingFace 토큰 환경변수 (우선순위 순)
pub const HF_TOKEN_VARS: &[&str] = &["HUGGINGFACEHUB_API_TOKEN", "HF_TOKEN"];

/// Gemini API 키 로드
///
/// 우선순위: GEMINI_API_KEY > GOOGLE_AI_API_KEY
pub fn get_api_key() -> anyhow::Result<String> {
    first_env(GEMINI_KEY_VARS).ok_or_else(|| {
        anyhow::anyhow!(
            "API key not found. Set GEMINI_API_KEY or GOOGLE_AI_API_KEY environment variable.\n\
             Get your API key at: https://aistudio.google.com/app/apikey"
        )
    })
}

/// Gemini API 키 존재 여부
pub fn has_api_key() -> bool {
    first_env(GEMINI_KEY_VARS).is_some()
}

/// HuggingFace 토큰 로드
///
/// 우선순위: HUGGINGFACEHUB_API_TOKEN > HF_TOKEN
pub fn get_hf_token() -> anyhow::Result<String> {
    first_env(HF_TOKEN_VARS).ok_or_else(|| {
        anyhow::anyhow!(
            "HuggingFace token not found. Set HUGGINGFACEHUB_API_TOKEN or HF_TOKEN environment variable.\n\
             Create a token at: https://huggingface.co/settings/tokens"
        )
    })
}

/// HuggingFace 토큰 존재 여부
pub fn has_hf_token() -> bool {
    first_env(HF_TOKEN_VARS).is_some()
}

// ============================================================================
// Tests
// ============================================================================
