//! 대화 기록
//!
//! 세션 안에서만 유지되는 (질문, 답변) 턴 목록입니다.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 대화 한 턴
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub question: String,
    pub answer: String,
    pub asked_at: DateTime<Utc>,
}

impl Turn {
    /// 현재 시각으로 턴 생성
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
            asked_at: Utc::now(),
        }
    }
}

/// 상한이 있는 대화 기록
///
/// 상한을 넘으면 가장 오래된 턴부터 버립니다.
#[derive(Debug, Clone)]
pub struct ConversationMemory {
    turns: VecDeque<Turn>,
    max_turns: usize,
}

impl ConversationMemory {
    pub fn new(max_turns: usize) -> Self {
        Self {
            turns: VecDeque::new(),
            max_turns,
        }
    }

    /// 턴 추가
    pub fn push(&mut self, turn: Turn) {
        if self.max_turns == 0 {
            return;
        }
        while self.turns.len() >= self.max_turns {
            self.turns.pop_front();
        }
        self.turns.push_back(turn);
    }

    /// 최근 n개 턴 (오래된 순)
    pub fn recent(&self, n: usize) -> Vec<Turn> {
        let skip = self.turns.len().saturating_sub(n);
        self.turns.iter().skip(skip).cloned().collect()
    }

    /// 전체 턴 (오래된 순)
    pub fn turns(&self) -> impl Iterator<Item = &Turn> {
        self.turns.iter()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_drops_oldest_beyond_limit() {
        let mut memory = ConversationMemory::new(2);
        memory.push(Turn::new("q1", "a1"));
        memory.push(Turn::new("q2", "a2"));
        memory.push(Turn::new("q3", "a3"));

        let questions: Vec<_> = memory.turns().map(|t| t.question.as_str()).collect();
        assert_eq!(questions, vec!["q2", "q3"]);
    }

    #[test]
    fn test_recent() {
        let mut memory = ConversationMemory::new(10);
        for i in 0..5 {
            memory.push(Turn::new(format!("q{}", i), format!("a{}", i)));
        }

        let recent = memory.recent(2);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].question, "q3");
        assert_eq!(recent[1].question, "q4");

        assert_eq!(memory.recent(100).len(), 5);
        assert!(memory.recent(0).is_empty());
    }

    #[test]
    fn test_zero_capacity_keeps_nothing() {
        let mut memory = ConversationMemory::new(0);
        memory.push(Turn::new("q", "a"));
        assert!(memory.is_empty());
    }
}
