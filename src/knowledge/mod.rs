//! Knowledge 모듈 - 청킹과 벡터 인덱스
//!
//! - Chunker: 문단 경계 우선, 고정 오버랩 텍스트 분할
//! - Index: 메모리 내 최근접 이웃 검색 (L2 / 코사인)

mod chunker;
mod index;

// Re-exports
pub use chunker::{
    character_chunker, reconstruct, CharacterChunker, Chunk, ChunkConfig, Chunker,
};
pub use index::{cosine_similarity, euclidean_distance, DistanceMetric, Hit, VectorIndex};
