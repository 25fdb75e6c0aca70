//! 프롬프트 템플릿

use crate::knowledge::Hit;
use crate::llm::render_history;

use super::Turn;

/// 검색 컨텍스트 기반 답변 프롬프트
const QA_INSTRUCTION: &str = "Use the following pieces of context to answer the question at the end. \
If you don't know the answer, say that you don't know instead of making one up.";

/// 후속 질문 재작성 프롬프트
const CONDENSE_INSTRUCTION: &str = "Given the following conversation and a follow up question, \
rephrase the follow up question to be a standalone question, in its original language.";

/// 답변 생성 프롬프트 구성
///
/// 검색된 청크는 가까운 순서대로 빈 줄로 구분해 넣습니다.
pub fn build_qa_prompt(hits: &[Hit<'_>], question: &str) -> String {
    let context = hits
        .iter()
        .map(|hit| hit.chunk.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "{}\n\n{}\n\nQuestion: {}\nHelpful Answer:",
        QA_INSTRUCTION, context, question
    )
}

/// 독립 질문 재작성 프롬프트 구성
pub fn build_condense_prompt(history: &[Turn], question: &str) -> String {
    format!(
        "{}\n\nChat History:\n{}Follow Up Input: {}\nStandalone question:",
        CONDENSE_INSTRUCTION,
        render_history(history),
        question
    )
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::Chunk;

    #[test]
    fn test_qa_prompt_contains_context_in_order() {
        let first = Chunk {
            index: 3,
            text: "nearest".to_string(),
            char_start: 0,
            char_end: 7,
        };
        let second = Chunk {
            index: 0,
            text: "farther".to_string(),
            char_start: 0,
            char_end: 7,
        };
        let hits = vec![
            Hit {
                chunk: &first,
                distance: 0.1,
            },
            Hit {
                chunk: &second,
                distance: 0.5,
            },
        ];

        let prompt = build_qa_prompt(&hits, "What?");
        assert!(prompt.contains("nearest\n\nfarther"));
        assert!(prompt.ends_with("Question: What?\nHelpful Answer:"));
    }

    #[test]
    fn test_condense_prompt() {
        let history = vec![Turn::new("What is A?", "A paragraph.")];
        let prompt = build_condense_prompt(&history, "and B?");
        assert!(prompt.contains("Human: What is A?\nAssistant: A paragraph.\n"));
        assert!(prompt.ends_with("Follow Up Input: and B?\nStandalone question:"));
    }
}
