//! Vector Index - 메모리 내 정확한 최근접 이웃 검색
//!
//! 세션마다 한 번 구축되고 이후 변경되지 않습니다.
//! 새 process 호출 시 통째로 교체됩니다 (병합/삭제 없음).

use serde::{Deserialize, Serialize};

use super::chunker::Chunk;
use crate::error::{RagError, Result};

// ============================================================================
// Types
// ============================================================================

/// 거리 척도
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMetric {
    /// L2 거리 (flat 인덱스 기본값)
    #[default]
    Euclidean,
    /// 1 - 코사인 유사도
    Cosine,
}

impl DistanceMetric {
    /// 두 벡터 사이 거리
    pub fn distance(&self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            DistanceMetric::Euclidean => euclidean_distance(a, b),
            DistanceMetric::Cosine => 1.0 - cosine_similarity(a, b),
        }
    }
}

/// 검색 결과
#[derive(Debug, Clone)]
pub struct Hit<'a> {
    /// 검색된 청크
    pub chunk: &'a Chunk,
    /// 질의 벡터와의 거리 (작을수록 가까움)
    pub distance: f32,
}

/// 인덱스 엔트리
#[derive(Debug, Clone)]
struct IndexEntry {
    chunk: Chunk,
    embedding: Vec<f32>,
}

// ============================================================================
// VectorIndex
// ============================================================================

/// 청크 벡터 인덱스
#[derive(Debug, Clone)]
pub struct VectorIndex {
    entries: Vec<IndexEntry>,
    dimension: usize,
    metric: DistanceMetric,
}

impl VectorIndex {
    /// 인덱스 구축 (기본 거리 척도)
    pub fn build(chunks: Vec<Chunk>, vectors: Vec<Vec<f32>>) -> Result<Self> {
        Self::build_with_metric(chunks, vectors, DistanceMetric::default())
    }

    /// 거리 척도를 지정하여 인덱스 구축
    ///
    /// 청크와 벡터 개수가 다르거나 벡터 차원이 제각각이면
    /// `DimensionMismatch` 에러를 반환합니다.
    pub fn build_with_metric(
        chunks: Vec<Chunk>,
        vectors: Vec<Vec<f32>>,
        metric: DistanceMetric,
    ) -> Result<Self> {
        if chunks.len() != vectors.len() {
            return Err(RagError::DimensionMismatch {
                what: "embedding vectors per chunk",
                expected: chunks.len(),
                actual: vectors.len(),
            });
        }

        let dimension = vectors.first().map(Vec::len).unwrap_or(0);
        if let Some(bad) = vectors.iter().find(|v| v.len() != dimension) {
            return Err(RagError::DimensionMismatch {
                what: "embedding dimension",
                expected: dimension,
                actual: bad.len(),
            });
        }

        let entries = chunks
            .into_iter()
            .zip(vectors)
            .map(|(chunk, embedding)| IndexEntry { chunk, embedding })
            .collect::<Vec<_>>();

        tracing::debug!(
            "Built vector index: {} entries, dimension {}, metric {:?}",
            entries.len(),
            dimension,
            metric
        );

        Ok(Self {
            entries,
            dimension,
            metric,
        })
    }

    /// 최근접 k개 청크 검색
    ///
    /// 거리 오름차순으로 정렬되며, 길이는 min(k, 인덱스 크기) 입니다.
    /// 거리가 같으면 청크 순서를 따릅니다.
    pub fn query(&self, query_embedding: &[f32], k: usize) -> Result<Vec<Hit<'_>>> {
        if self.entries.is_empty() || k == 0 {
            return Ok(vec![]);
        }

        if query_embedding.len() != self.dimension {
            return Err(RagError::DimensionMismatch {
                what: "query embedding dimension",
                expected: self.dimension,
                actual: query_embedding.len(),
            });
        }

        let mut hits: Vec<Hit<'_>> = self
            .entries
            .iter()
            .map(|entry| Hit {
                chunk: &entry.chunk,
                distance: self.metric.distance(query_embedding, &entry.embedding),
            })
            .collect();

        hits.sort_by(|a, b| {
            a.distance
                .total_cmp(&b.distance)
                .then(a.chunk.index.cmp(&b.chunk.index))
        });
        hits.truncate(k);

        Ok(hits)
    }

    /// 엔트리 개수
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// 비어있는지 여부
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 벡터 차원 (비어있으면 0)
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// 거리 척도
    pub fn metric(&self) -> DistanceMetric {
        self.metric
    }
}

// ============================================================================
// Utility Functions
// ============================================================================

/// 코사인 유사도 계산
///
/// 결과는 -1.0 ~ 1.0 범위입니다. 길이가 다르거나 영벡터면 0.0 입니다.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

/// L2 거리
pub fn euclidean_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(index: usize, text: &str) -> Chunk {
        Chunk {
            index,
            text: text.to_string(),
            char_start: 0,
            char_end: text.chars().count(),
        }
    }

    fn sample_index(metric: DistanceMetric) -> VectorIndex {
        let chunks = vec![chunk(0, "x"), chunk(1, "y"), chunk(2, "z"), chunk(3, "xy")];
        let vectors = vec![
            vec![1.0, 0.0, 0.0],
            vec![0.0, 1.0, 0.0],
            vec![0.0, 0.0, 1.0],
            vec![0.7, 0.7, 0.0],
        ];
        VectorIndex::build_with_metric(chunks, vectors, metric).unwrap()
    }

    #[test]
    fn test_cosine_similarity_same() {
        let a = vec![1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &a) - 1.0).abs() < 0.0001);
    }

    #[test]
    fn test_cosine_similarity_orthogonal_and_opposite() {
        let a = vec![1.0, 0.0, 0.0];
        let c = vec![0.0, 1.0, 0.0];
        let d = vec![-1.0, 0.0, 0.0];
        assert!(cosine_similarity(&a, &c).abs() < 0.0001);
        assert!((cosine_similarity(&a, &d) + 1.0).abs() < 0.0001);
    }

    #[test]
    fn test_cosine_similarity_empty() {
        let a: Vec<f32> = vec![];
        assert_eq!(cosine_similarity(&a, &a), 0.0);
    }

    #[test]
    fn test_euclidean_distance() {
        assert!((euclidean_distance(&[0.0, 0.0], &[3.0, 4.0]) - 5.0).abs() < 0.0001);
    }

    #[test]
    fn test_build_length_mismatch() {
        let result = VectorIndex::build(vec![chunk(0, "a"), chunk(1, "b")], vec![vec![1.0]]);
        assert!(matches!(
            result,
            Err(RagError::DimensionMismatch {
                expected: 2,
                actual: 1,
                ..
            })
        ));

        let result = VectorIndex::build(vec![], vec![vec![1.0]]);
        assert!(matches!(result, Err(RagError::DimensionMismatch { .. })));
    }

    #[test]
    fn test_build_inconsistent_dimension() {
        let result = VectorIndex::build(
            vec![chunk(0, "a"), chunk(1, "b")],
            vec![vec![1.0, 0.0], vec![1.0]],
        );
        assert!(matches!(result, Err(RagError::DimensionMismatch { .. })));
    }

    #[test]
    fn test_query_sorted_and_bounded() {
        for metric in [DistanceMetric::Euclidean, DistanceMetric::Cosine] {
            let index = sample_index(metric);
            let query = [0.9, 0.1, 0.0];

            for k in 0..6 {
                let hits = index.query(&query, k).unwrap();
                assert_eq!(hits.len(), k.min(index.len()));
                for pair in hits.windows(2) {
                    assert!(pair[0].distance <= pair[1].distance);
                }
            }

            let hits = index.query(&query, 1).unwrap();
            assert_eq!(hits[0].chunk.text, "x");
        }
    }

    #[test]
    fn test_query_deterministic_ties() {
        let chunks = vec![chunk(0, "a"), chunk(1, "b"), chunk(2, "c")];
        let vectors = vec![vec![1.0, 0.0], vec![1.0, 0.0], vec![1.0, 0.0]];
        let index = VectorIndex::build(chunks, vectors).unwrap();

        let first: Vec<usize> = index
            .query(&[1.0, 0.0], 3)
            .unwrap()
            .iter()
            .map(|h| h.chunk.index)
            .collect();
        assert_eq!(first, vec![0, 1, 2]);
    }

    #[test]
    fn test_query_with_nan_distance_does_not_panic() {
        let chunks = vec![chunk(0, "nan"), chunk(1, "near"), chunk(2, "far")];
        let vectors = vec![vec![f32::NAN, 0.0], vec![1.0, 0.0], vec![0.0, 1.0]];
        let index = VectorIndex::build(chunks, vectors).unwrap();

        let hits = index.query(&[1.0, 0.0], 3).unwrap();
        assert_eq!(hits.len(), 3);

        let finite: Vec<usize> = hits
            .iter()
            .filter(|h| h.distance.is_finite())
            .map(|h| h.chunk.index)
            .collect();
        assert_eq!(finite, vec![1, 2]);
    }

    #[test]
    fn test_query_dimension_mismatch() {
        let index = sample_index(DistanceMetric::Euclidean);
        assert!(matches!(
            index.query(&[1.0, 0.0], 2),
            Err(RagError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_empty_index() {
        let index = VectorIndex::build(vec![], vec![]).unwrap();
        assert!(index.is_empty());
        assert!(index.query(&[1.0, 2.0], 4).unwrap().is_empty());
    }
}
