//! 로컬 해싱 임베딩
//!
//! 단어를 SHA-256으로 해싱해 고정 차원 버킷에 누적하는 feature hashing 방식입니다.
//! 네트워크 없이 동작하며 같은 입력에 항상 같은 벡터를 냅니다.
//! 의미 유사도는 어휘 겹침 수준입니다.

use anyhow::Result;
use async_trait::async_trait;
use regex::Regex;
use sha2::{Digest, Sha256};

use super::EmbeddingProvider;

/// 해싱 임베딩 구현체
#[derive(Debug)]
pub struct HashingEmbedding {
    dimension: usize,
    token_re: Regex,
}

impl HashingEmbedding {
    /// 차원을 지정하여 생성
    pub fn new(dimension: usize) -> Result<Self> {
        if dimension == 0 {
            anyhow::bail!("Hashing embedding dimension must be greater than 0");
        }

        Ok(Self {
            dimension,
            token_re: Regex::new(r"\w+")?,
        })
    }

    /// 동기 벡터화 (L2 정규화)
    pub fn vectorize(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];

        for token in self.token_re.find_iter(text) {
            let token = token.as_str().to_lowercase();
            let digest = Sha256::digest(token.as_bytes());

            let mut bucket_bytes = [0u8; 8];
            bucket_bytes.copy_from_slice(&digest[..8]);
            let bucket = (u64::from_le_bytes(bucket_bytes) % self.dimension as u64) as usize;
            let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };

            vector[bucket] += sign;
        }

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in vector.iter_mut() {
                *v /= norm;
            }
        }

        vector
    }
}

#[async_trait]
impl EmbeddingProvider for HashingEmbedding {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.vectorize(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.vectorize(t)).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn name(&self) -> &str {
        "feature-hashing"
    }
}

// ============================================================================
// Tests
// ============================================================================
