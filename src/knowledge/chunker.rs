//! Text Chunking Module
//!
//! 원문을 문단 경계를 우선하는 고정 크기 청크로 나눕니다.
//! 연속된 청크는 항상 `chunk_overlap` 문자만큼 겹칩니다.

use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};

// ============================================================================
// Chunk Configuration
// ============================================================================

/// 청킹 설정
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkConfig {
    /// 최대 청크 크기 (문자 수)
    pub chunk_size: usize,
    /// 오버랩 크기 (문자 수, chunk_size 미만)
    pub chunk_overlap: usize,
    /// 우선 분할 구분자 (기본: 문단 경계)
    pub separator: String,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
            separator: "\n\n".to_string(),
        }
    }
}

impl ChunkConfig {
    /// 크기와 오버랩 지정
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            chunk_size,
            chunk_overlap,
            ..Default::default()
        }
    }

    /// RAG 최적화된 설정
    pub fn for_rag() -> Self {
        Self::new(1500, 300)
    }

    /// 빠른 인덱싱용 설정 (오버랩 없음)
    pub fn for_fast() -> Self {
        Self::new(1000, 0)
    }

    /// 설정값 검증
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(RagError::InvalidConfig(
                "chunk_size must be greater than 0".to_string(),
            ));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(RagError::InvalidConfig(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        Ok(())
    }
}

// ============================================================================
// Chunk
// ============================================================================

/// 원문의 부분 문자열
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// 청크 순번 (0-based)
    pub index: usize,
    /// 청크 텍스트
    pub text: String,
    /// 원문 내 시작 위치 (문자 단위)
    pub char_start: usize,
    /// 원문 내 끝 위치 (문자 단위, 미포함)
    pub char_end: usize,
}

impl Chunk {
    /// 문자 수
    pub fn char_len(&self) -> usize {
        self.char_end - self.char_start
    }
}

// ============================================================================
// Chunker Trait
// ============================================================================

/// 텍스트 청킹 전략 트레이트
pub trait Chunker: Send + Sync {
    /// 텍스트를 청크로 분할
    fn chunk(&self, text: &str) -> Vec<Chunk>;

    /// 청커 이름
    fn name(&self) -> &'static str;
}

// ============================================================================
// CharacterChunker
// ============================================================================

/// 구분자 우선 문자 청커
///
/// `chunk_size` 문자 창 안에서 마지막 구분자 경계로 자르고,
/// 경계가 없으면 창 끝에서 자릅니다. 다음 청크는 이전 끝에서
/// `chunk_overlap` 문자 앞에서 시작합니다.
///
/// 그래서 두 번째 청크부터 앞 `chunk_overlap` 문자를 버리고 이어 붙이면
/// 원문이 그대로 복원됩니다.
pub struct CharacterChunker {
    config: ChunkConfig,
}

impl CharacterChunker {
    /// 설정으로 생성 (설정 검증 포함)
    pub fn new(config: ChunkConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// 기본 설정으로 생성
    pub fn with_defaults() -> Self {
        Self {
            config: ChunkConfig::default(),
        }
    }

    /// 현재 설정
    pub fn config(&self) -> &ChunkConfig {
        &self.config
    }

    /// 청크 끝 위치 결정 (문자 단위)
    ///
    /// `offsets[i]`는 i번째 문자의 바이트 위치이고, 마지막 원소는 text.len() 입니다.
    fn find_end(&self, text: &str, offsets: &[usize], start: usize) -> usize {
        let total = offsets.len() - 1;
        let window_end = (start + self.config.chunk_size).min(total);
        if window_end == total {
            return total;
        }

        let separator = self.config.separator.as_str();
        if separator.is_empty() {
            return window_end;
        }

        // 오버랩 영역을 넘어서는 마지막 구분자 경계
        let min_end = start + self.config.chunk_overlap + 1;
        (min_end..=window_end)
            .rev()
            .find(|&end| text[offsets[end]..].starts_with(separator))
            .unwrap_or(window_end)
    }
}

impl Chunker for CharacterChunker {
    fn chunk(&self, text: &str) -> Vec<Chunk> {
        if text.is_empty() {
            return vec![];
        }

        let offsets: Vec<usize> = text
            .char_indices()
            .map(|(i, _)| i)
            .chain(std::iter::once(text.len()))
            .collect();
        let total = offsets.len() - 1;

        let mut chunks = Vec::new();
        let mut start = 0;

        loop {
            let end = self.find_end(text, &offsets, start);

            chunks.push(Chunk {
                index: chunks.len(),
                text: text[offsets[start]..offsets[end]].to_string(),
                char_start: start,
                char_end: end,
            });

            if end == total {
                break;
            }
            start = end - self.config.chunk_overlap;
        }

        tracing::debug!(
            "Split {} characters into {} chunks (size={}, overlap={})",
            total,
            chunks.len(),
            self.config.chunk_size,
            self.config.chunk_overlap
        );

        chunks
    }

    fn name(&self) -> &'static str {
        "CharacterChunker"
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// 오버랩을 제거하고 청크를 이어 붙여 원문 복원
pub fn reconstruct(chunks: &[Chunk], overlap: usize) -> String {
    let mut text = String::new();
    for (i, chunk) in chunks.iter().enumerate() {
        if i == 0 {
            text.push_str(&chunk.text);
        } else {
            text.extend(chunk.text.chars().skip(overlap));
        }
    }
    text
}

// ============================================================================
// Factory Functions
// ============================================================================

/// 설정을 지정한 문자 청커 생성
pub fn character_chunker(config: ChunkConfig) -> Result<Box<dyn Chunker>> {
    Ok(Box::new(CharacterChunker::new(config)?))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn chunker(size: usize, overlap: usize) -> CharacterChunker {
        CharacterChunker::new(ChunkConfig::new(size, overlap)).unwrap()
    }

    fn texts(chunks: &[Chunk]) -> Vec<&str> {
        chunks.iter().map(|c| c.text.as_str()).collect()
    }

    fn overlap_len(prev: &Chunk, next: &Chunk) -> usize {
        prev.char_end.saturating_sub(next.char_start)
    }

    #[test]
    fn test_chunker_empty() {
        let chunks = CharacterChunker::with_defaults().chunk("");
        assert!(chunks.is_empty());
    }

    #[test]
    fn test_chunker_small_text_single_chunk() {
        let text = "  Short paragraph.\n\nAnother one.  ";
        let chunks = CharacterChunker::with_defaults().chunk(text);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, text);
    }

    #[test]
    fn test_chunk_size_equal_to_length() {
        let chunks = chunker(6, 2).chunk("Para A");
        assert_eq!(texts(&chunks), vec!["Para A"]);
    }

    #[test]
    fn test_paragraph_scenario() {
        let text = "Para A\n\nPara B\n\nPara C";
        let chunks = chunker(6, 2).chunk(text);

        assert_eq!(
            texts(&chunks),
            vec!["Para A", " A\n\nPa", "Para B", " B\n\nPa", "Para C"]
        );
        for pair in chunks.windows(2) {
            assert_eq!(overlap_len(&pair[0], &pair[1]), 2);
            let tail: String = pair[0].text.chars().skip(pair[0].char_len() - 2).collect();
            let head: String = pair[1].text.chars().take(2).collect();
            assert_eq!(tail, head);
        }
        assert_eq!(reconstruct(&chunks, 2), text);
    }

    #[test]
    fn test_prefers_paragraph_boundary() {
        let text = "alpha beta\n\ngamma delta epsilon";
        let chunks = chunker(16, 0).chunk(text);
        assert_eq!(chunks[0].text, "alpha beta");
        assert_eq!(reconstruct(&chunks, 0), text);
    }

    #[test]
    fn test_invariants_on_varied_inputs() {
        let inputs = [
            "a",
            "no separators at all in this fairly long line of text",
            "one\n\ntwo\n\nthree\n\nfour\n\nfive\n\nsix",
            "\n\n\n\nleading separators and trailing\n\n",
            "한국어 문단입니다.\n\n두 번째 문단은 조금 더 깁니다.\n\n세 번째.",
            "mixed ✓ unicode — text\n\nwith émojis 🎉 and more words here",
        ];
        let configs = [(1, 0), (5, 1), (8, 3), (10, 9), (32, 8), (1000, 200)];

        for text in inputs {
            for (size, overlap) in configs {
                let chunks = chunker(size, overlap).chunk(text);
                assert!(!chunks.is_empty());
                assert_eq!(chunks[0].char_start, 0);
                assert_eq!(chunks.last().unwrap().char_end, text.chars().count());

                for (i, chunk) in chunks.iter().enumerate() {
                    assert_eq!(chunk.index, i);
                    assert!(chunk.char_len() <= size, "chunk too long: {:?}", chunk);
                    assert_eq!(chunk.text.chars().count(), chunk.char_len());
                }
                for pair in chunks.windows(2) {
                    assert_eq!(overlap_len(&pair[0], &pair[1]), overlap);
                }
                assert_eq!(reconstruct(&chunks, overlap), text);
            }
        }
    }

    #[test]
    fn test_config_validation() {
        assert!(ChunkConfig::new(10, 2).validate().is_ok());
        assert!(ChunkConfig::new(10, 10).validate().is_err());
        assert!(ChunkConfig::new(0, 0).validate().is_err());
        assert!(CharacterChunker::new(ChunkConfig::new(5, 7)).is_err());
    }

    #[test]
    fn test_config_presets() {
        let default = ChunkConfig::default();
        assert_eq!(default.chunk_size, 1000);
        assert_eq!(default.chunk_overlap, 200);
        assert_eq!(default.separator, "\n\n");

        let rag = ChunkConfig::for_rag();
        assert!(rag.validate().is_ok());

        let fast = ChunkConfig::for_fast();
        assert_eq!(fast.chunk_overlap, 0);
    }

    #[test]
    fn test_empty_separator_cuts_at_window() {
        let config = ChunkConfig {
            chunk_size: 4,
            chunk_overlap: 1,
            separator: String::new(),
        };
        let chunks = CharacterChunker::new(config).unwrap().chunk("abcdefg");
        assert_eq!(texts(&chunks), vec!["abcd", "defg"]);
    }
}
