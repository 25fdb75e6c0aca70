//! LLM 모듈 - 답변 생성 프로바이더
//!
//! 프롬프트와 이전 대화 턴을 받아 답변 텍스트를 생성합니다.
//! 대화 기록을 어떻게 전달할지는 프로바이더마다 다릅니다
//! (Gemini는 멀티턴 contents, HuggingFace는 텍스트 접두사).

mod gemini;
mod huggingface;

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use crate::config::{get_api_key, get_hf_token, GenerationOptions, LlmBackend, LlmConfig};
use crate::session::Turn;

pub use gemini::GeminiLlm;
pub use huggingface::HuggingFaceLlm;

// ============================================================================
// LlmProvider Trait
// ============================================================================

/// LLM 프로바이더 트레이트
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// 답변 생성
    ///
    /// # Arguments
    /// * `prompt` - 검색 컨텍스트와 질문이 담긴 프롬프트
    /// * `history` - 이전 대화 턴 (오래된 순)
    /// * `options` - 생성 옵션
    async fn generate(
        &self,
        prompt: &str,
        history: &[Turn],
        options: &GenerationOptions,
    ) -> Result<String>;

    /// 프로바이더 이름
    fn name(&self) -> &str;
}

// ============================================================================
// Helper Functions
// ============================================================================

/// 대화 기록을 텍스트로 렌더링
///
/// 기록이 없으면 빈 문자열입니다.
pub fn render_history(history: &[Turn]) -> String {
    let mut text = String::new();
    for turn in history {
        text.push_str("Human: ");
        text.push_str(&turn.question);
        text.push_str("\nAssistant: ");
        text.push_str(&turn.answer);
        text.push('\n');
    }
    text
}

// ============================================================================
// Factory Function
// ============================================================================

/// 설정에 맞는 LLM 프로바이더 생성
pub fn create_llm(config: &LlmConfig) -> Result<Arc<dyn LlmProvider>> {
    let llm: Arc<dyn LlmProvider> = match config.backend {
        LlmBackend::HuggingFace => Arc::new(HuggingFaceLlm::new(get_hf_token()?, &config.model)?),
        LlmBackend::Gemini => Arc::new(GeminiLlm::new(get_api_key()?, &config.model)?),
    };

    tracing::info!("Using {} for answer generation", llm.name());
    Ok(llm)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_history() {
        assert_eq!(render_history(&[]), "");

        let history = vec![
            Turn::new("What is A?", "A is a paragraph."),
            Turn::new("And B?", "B follows A."),
        ];
        assert_eq!(
            render_history(&history),
            "Human: What is A?\nAssistant: A is a paragraph.\nHuman: And B?\nAssistant: B follows A.\n"
        );
    }
}
