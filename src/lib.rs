//! pdf-chat - PDF 문서 대화형 RAG
//!
//! 업로드한 문서에서 텍스트를 추출해 청크로 나누고, 임베딩 벡터 인덱스를
//! 구축한 뒤 검색된 청크와 대화 기록을 바탕으로 LLM이 질문에 답합니다.

pub mod cli;
pub mod collector;
pub mod config;
pub mod embedding;
pub mod error;
pub mod extractor;
pub mod knowledge;
pub mod llm;
pub mod session;

// Re-exports
pub use config::{
    EmbeddingBackend, EmbeddingConfig, GenerationOptions, LlmBackend, LlmConfig, RagConfig,
    SessionConfig,
};
pub use embedding::{
    create_embedder, EmbeddingProvider, GeminiEmbedding, HashingEmbedding, HuggingFaceEmbedding,
};
pub use error::{RagError, Result};
pub use extractor::{extract_text, Document, DocumentKind};
pub use knowledge::{
    character_chunker, CharacterChunker, Chunk, ChunkConfig, Chunker, DistanceMetric, Hit,
    VectorIndex,
};
pub use llm::{create_llm, GeminiLlm, HuggingFaceLlm, LlmProvider};
pub use session::{ConversationSession, ProcessStats, SessionStatus, Turn};
