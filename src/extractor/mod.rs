//! 콘텐츠 추출 모듈
//!
//! 업로드된 문서들에서 텍스트를 추출하여 하나의 원문(RawText)으로 합칩니다.
//! - PDF 파일: pdf-extract로 텍스트 추출
//! - 텍스트 파일: UTF-8로 직접 읽기
//!
//! 페이지/문서 사이에는 구분자를 넣지 않습니다.

pub mod pdf;

use std::path::Path;

use anyhow::Context;

use crate::error::{RagError, Result};

// ============================================================================
// Document
// ============================================================================

/// 문서 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    /// PDF 파일
    Pdf,
    /// 텍스트 파일 (마크다운 포함)
    Text,
}

impl DocumentKind {
    /// 확장자로 문서 종류 결정
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "pdf" => Some(DocumentKind::Pdf),
            "txt" | "md" | "markdown" => Some(DocumentKind::Text),
            _ => None,
        }
    }

    /// 파일 경로에서 종류 결정
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }
}

/// 업로드된 문서 (불투명한 바이너리)
///
/// 텍스트 추출 후 폐기됩니다.
#[derive(Debug, Clone)]
pub struct Document {
    /// 표시용 이름 (파일명)
    pub name: String,
    /// 문서 종류
    pub kind: DocumentKind,
    /// 원본 바이트
    pub bytes: Vec<u8>,
}

impl Document {
    /// PDF 문서 생성
    pub fn pdf(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            kind: DocumentKind::Pdf,
            bytes,
        }
    }

    /// 텍스트 문서 생성
    pub fn text(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: DocumentKind::Text,
            bytes: text.into().into_bytes(),
        }
    }

    /// 파일에서 문서 읽기
    pub async fn from_path(path: &Path) -> anyhow::Result<Self> {
        let kind = DocumentKind::from_path(path)
            .ok_or_else(|| anyhow::anyhow!("Unsupported document type: {:?}", path))?;

        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read document: {:?}", path))?;

        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown")
            .to_string();

        Ok(Self { name, kind, bytes })
    }
}

// ============================================================================
// Text Extraction
// ============================================================================

/// 모든 문서에서 텍스트를 추출해 입력 순서대로 연결
///
/// 하나라도 읽을 수 없으면 전체 추출을 중단합니다.
pub async fn extract_text(documents: &[Document]) -> Result<String> {
    let mut raw_text = String::new();

    for doc in documents {
        let pages = extract_document(doc).await?;
        tracing::debug!("Extracted {} page(s) from {}", pages.len(), doc.name);

        for page in pages {
            raw_text.push_str(&page);
        }
    }

    tracing::info!(
        "Extracted {} characters from {} document(s)",
        raw_text.chars().count(),
        documents.len()
    );

    Ok(raw_text)
}

/// 단일 문서에서 페이지별 텍스트 추출
async fn extract_document(doc: &Document) -> Result<Vec<String>> {
    match doc.kind {
        DocumentKind::Text => {
            let text = std::str::from_utf8(&doc.bytes).map_err(|e| {
                RagError::UnreadableDocument {
                    name: doc.name.clone(),
                    source: Box::new(e),
                }
            })?;
            Ok(vec![text.to_string()])
        }
        DocumentKind::Pdf => {
            // PDF 추출은 CPU 바운드이므로 spawn_blocking 사용
            let name = doc.name.clone();
            let bytes = doc.bytes.clone();
            let joined =
                tokio::task::spawn_blocking(move || pdf::extract_pages(&name, &bytes)).await;

            match joined {
                Ok(Ok(pages)) => Ok(pages),
                Ok(Err(e)) => Err(RagError::UnreadableDocument {
                    name: doc.name.clone(),
                    source: e.into(),
                }),
                // 파서 패닉도 읽을 수 없는 문서로 취급
                Err(e) => Err(RagError::UnreadableDocument {
                    name: doc.name.clone(),
                    source: Box::new(e),
                }),
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_kind_from_path() {
        assert_eq!(
            DocumentKind::from_path(Path::new("paper.PDF")),
            Some(DocumentKind::Pdf)
        );
        assert_eq!(
            DocumentKind::from_path(Path::new("notes.md")),
            Some(DocumentKind::Text)
        );
        assert_eq!(DocumentKind::from_path(Path::new("image.png")), None);
        assert_eq!(DocumentKind::from_path(Path::new("README")), None);
    }

    #[tokio::test]
    async fn test_extract_concatenates_in_order_without_separator() {
        let docs = vec![
            Document::text("a.txt", "first"),
            Document::text("b.txt", "second"),
        ];
        let text = extract_text(&docs).await.unwrap();
        assert_eq!(text, "firstsecond");
    }

    #[tokio::test]
    async fn test_extract_pdf_pages_then_text_document() {
        let docs = vec![
            Document::pdf("two.pdf", pdf::sample_pdf(&["Alpha", "Bravo"])),
            Document::text("tail.txt", "Zulu"),
        ];
        let text = extract_text(&docs).await.unwrap();

        let alpha = text.find("Alpha").unwrap();
        let bravo = text.find("Bravo").unwrap();
        assert!(alpha < bravo);
        assert!(text.ends_with("Zulu"));
        assert!(!text.contains('\x0c'));
    }

    #[tokio::test]
    async fn test_extract_empty_input() {
        let text = extract_text(&[]).await.unwrap();
        assert!(text.is_empty());
    }

    #[tokio::test]
    async fn test_extract_aborts_on_unreadable_pdf() {
        let docs = vec![
            Document::text("ok.txt", "fine"),
            Document::pdf("corrupt.pdf", b"%PDF-garbage".to_vec()),
        ];
        let err = extract_text(&docs).await.unwrap_err();
        match err {
            RagError::UnreadableDocument { name, .. } => assert_eq!(name, "corrupt.pdf"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_extract_rejects_invalid_utf8() {
        let doc = Document {
            name: "bad.txt".to_string(),
            kind: DocumentKind::Text,
            bytes: vec![0xff, 0xfe, 0xfd],
        };
        let err = extract_text(&[doc]).await.unwrap_err();
        assert!(matches!(err, RagError::UnreadableDocument { .. }));
    }

    #[tokio::test]
    async fn test_document_from_path() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "hello").unwrap();

        let doc = Document::from_path(&path).await.unwrap();
        assert_eq!(doc.name, "notes.txt");
        assert_eq!(doc.kind, DocumentKind::Text);
        assert_eq!(doc.bytes, b"hello");

        let unsupported = dir.path().join("photo.png");
        std::fs::write(&unsupported, [0u8; 4]).unwrap();
        assert!(Document::from_path(&unsupported).await.is_err());
    }
}
