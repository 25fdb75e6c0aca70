//! 대화 세션 - 문서 처리와 질의응답
//!
//! 상태는 두 가지입니다.
//! - `Idle`: 인덱스 없음
//! - `Ready`: 인덱스와 대화 기록 보유
//!
//! `process`는 이전 인덱스와 대화를 버린 뒤 새로 구축하고,
//! `ask`는 같은 임베딩 프로바이더로 질문을 벡터화해 검색 후 LLM에 답변을 요청합니다.
//! 두 명령 모두 `&mut self`를 받으므로 한 세션에서 동시에 실행될 수 없습니다.

mod memory;
mod prompt;

use std::sync::Arc;

use uuid::Uuid;

use crate::config::{RagConfig, SessionConfig};
use crate::embedding::{create_embedder, EmbeddingProvider};
use crate::error::{RagError, Result};
use crate::extractor::{extract_text, Document};
use crate::knowledge::{character_chunker, Chunker, VectorIndex};
use crate::llm::{create_llm, LlmProvider};

pub use memory::{ConversationMemory, Turn};
pub use prompt::{build_condense_prompt, build_qa_prompt};

// ============================================================================
// Types
// ============================================================================

/// process 결과 통계
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessStats {
    /// 처리한 문서 수
    pub documents: usize,
    /// 추출된 문자 수
    pub characters: usize,
    /// 생성된 청크 수
    pub chunks: usize,
    /// 임베딩 차원
    pub dimension: usize,
}

/// 세션 상태 요약
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Idle,
    Ready,
}

/// 인덱스가 구축된 상태
struct ReadyState {
    index: VectorIndex,
    memory: ConversationMemory,
    stats: ProcessStats,
}

enum SessionState {
    Idle,
    Ready(ReadyState),
}

// ============================================================================
// ConversationSession
// ============================================================================

/// 사용자 한 명의 대화 세션
///
/// 임베딩/LLM 프로바이더는 생성 시 고정되어, 인덱스 구축과 질문 임베딩이
/// 항상 같은 임베딩 공간을 사용합니다.
pub struct ConversationSession {
    id: Uuid,
    embedder: Arc<dyn EmbeddingProvider>,
    llm: Arc<dyn LlmProvider>,
    chunker: Box<dyn Chunker>,
    config: SessionConfig,
    state: SessionState,
}

impl ConversationSession {
    /// 프로바이더와 설정으로 세션 생성
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        llm: Arc<dyn LlmProvider>,
        config: SessionConfig,
    ) -> Result<Self> {
        config.validate()?;
        let chunker = character_chunker(config.chunk.clone())?;

        let id = Uuid::new_v4();
        tracing::debug!(
            "Created session {} (embedding={}, llm={})",
            id,
            embedder.name(),
            llm.name()
        );

        Ok(Self {
            id,
            embedder,
            llm,
            chunker,
            config,
            state: SessionState::Idle,
        })
    }

    /// 전체 설정에서 프로바이더까지 생성
    pub fn from_config(config: &RagConfig) -> anyhow::Result<Self> {
        let embedder = create_embedder(&config.embedding)?;
        let llm = create_llm(&config.llm)?;
        Ok(Self::new(embedder, llm, config.session.clone())?)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// 현재 상태
    pub fn status(&self) -> SessionStatus {
        match self.state {
            SessionState::Idle => SessionStatus::Idle,
            SessionState::Ready(_) => SessionStatus::Ready,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.status() == SessionStatus::Ready
    }

    /// 대화 기록 (Idle이면 비어있음)
    pub fn history(&self) -> Vec<Turn> {
        match &self.state {
            SessionState::Idle => vec![],
            SessionState::Ready(ready) => ready.memory.turns().cloned().collect(),
        }
    }

    /// 마지막 process 통계
    pub fn stats(&self) -> Option<&ProcessStats> {
        match &self.state {
            SessionState::Idle => None,
            SessionState::Ready(ready) => Some(&ready.stats),
        }
    }

    /// 현재 인덱스
    pub fn index(&self) -> Option<&VectorIndex> {
        match &self.state {
            SessionState::Idle => None,
            SessionState::Ready(ready) => Some(&ready.index),
        }
    }

    /// 인덱스와 대화 기록 폐기 (Idle로 전환)
    pub fn reset(&mut self) {
        if self.is_ready() {
            tracing::info!("Session {}: discarding index and conversation", self.id);
        }
        self.state = SessionState::Idle;
    }

    /// 문서 처리: 추출 → 청킹 → 임베딩 → 인덱스 구축
    ///
    /// 이전 인덱스와 대화는 시작 시점에 버려집니다. 어느 단계에서든 실패하면
    /// 세션은 Idle로 남고 부분 인덱스는 남지 않습니다.
    pub async fn process(&mut self, documents: Vec<Document>) -> Result<ProcessStats> {
        self.reset();

        let document_count = documents.len();
        let raw_text = extract_text(&documents).await?;
        drop(documents);

        if raw_text.trim().is_empty() {
            return Err(RagError::NoText);
        }

        let chunks = self.chunker.chunk(&raw_text);
        if chunks.len() > self.config.max_chunks {
            return Err(RagError::DocumentTooLarge {
                chunks: chunks.len(),
                limit: self.config.max_chunks,
            });
        }

        tracing::info!(
            "Session {}: embedding {} chunks with {}",
            self.id,
            chunks.len(),
            self.embedder.name()
        );

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = self
            .embedder
            .embed_batch(&texts)
            .await
            .map_err(|e| RagError::embedding(self.embedder.name(), e))?;

        let index = VectorIndex::build_with_metric(chunks, vectors, self.config.metric)?;

        let stats = ProcessStats {
            documents: document_count,
            characters: raw_text.chars().count(),
            chunks: index.len(),
            dimension: index.dimension(),
        };

        tracing::info!(
            "Session {}: ready ({} documents, {} chunks, dimension {})",
            self.id,
            stats.documents,
            stats.chunks,
            stats.dimension
        );

        self.state = SessionState::Ready(ReadyState {
            index,
            memory: ConversationMemory::new(self.config.max_history_turns),
            stats: stats.clone(),
        });

        Ok(stats)
    }

    /// 질문에 답변
    ///
    /// 실패하면 대화 기록은 바뀌지 않습니다.
    pub async fn ask(&mut self, question: &str) -> Result<String> {
        let question = question.trim();
        if question.is_empty() {
            return Err(RagError::EmptyQuestion);
        }

        let SessionState::Ready(ready) = &mut self.state else {
            return Err(RagError::NotReady);
        };

        let history = ready.memory.recent(self.config.prompt_history_turns);
        let options = &self.config.generation;

        // 후속 질문을 독립 질문으로 재작성
        let search_question = if self.config.condense_question && !history.is_empty() {
            let condense_prompt = build_condense_prompt(&history, question);
            let standalone = self
                .llm
                .generate(&condense_prompt, &[], options)
                .await
                .map_err(|e| RagError::answer(self.llm.name(), e))?;
            let standalone = standalone.trim();
            if standalone.is_empty() {
                question.to_string()
            } else {
                tracing::debug!("Condensed question: {}", standalone);
                standalone.to_string()
            }
        } else {
            question.to_string()
        };

        let query_embedding = self
            .embedder
            .embed(&search_question)
            .await
            .map_err(|e| RagError::embedding(self.embedder.name(), e))?;

        let hits = ready.index.query(&query_embedding, self.config.top_k)?;
        tracing::debug!(
            "Session {}: retrieved {} chunks (nearest distance {:?})",
            self.id,
            hits.len(),
            hits.first().map(|h| h.distance)
        );

        let prompt = build_qa_prompt(&hits, &search_question);
        let answer = self
            .llm
            .generate(&prompt, &history, options)
            .await
            .map_err(|e| RagError::answer(self.llm.name(), e))?;

        let answer = answer.trim();
        if answer.is_empty() {
            return Err(RagError::answer(self.llm.name(), "LLM returned an empty answer"));
        }

        ready.memory.push(Turn::new(question, answer));
        tracing::info!(
            "Session {}: answered question ({} turns)",
            self.id,
            ready.memory.len()
        );

        Ok(answer.to_string())
    }
}

// ============================================================================
// Tests
// ============================================================================
