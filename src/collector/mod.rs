//! 문서 수집 모듈
//!
//! 명령줄에서 지정한 파일과 폴더에서 처리할 문서 경로를 모읍니다.
//! .gitignore 패턴을 존중하고, 지원하는 확장자(PDF, 텍스트)만 수집합니다.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use ignore::WalkBuilder;

use crate::extractor::{Document, DocumentKind};

// ============================================================================
// Collected File
// ============================================================================

/// 수집된 파일 정보
#[derive(Debug, Clone)]
pub struct CollectedFile {
    /// 파일 절대 경로
    pub path: PathBuf,
    /// 문서 종류
    pub kind: DocumentKind,
    /// 파일 크기 (바이트)
    pub size: u64,
}

impl CollectedFile {
    /// 파일에서 CollectedFile 생성
    pub fn from_path(path: PathBuf) -> Result<Option<Self>> {
        let kind = match DocumentKind::from_path(&path) {
            Some(kind) => kind,
            None => return Ok(None), // 지원하지 않는 확장자
        };

        let metadata = std::fs::metadata(&path)
            .with_context(|| format!("Failed to read metadata: {:?}", path))?;

        if !metadata.is_file() {
            return Ok(None);
        }

        Ok(Some(Self {
            path,
            kind,
            size: metadata.len(),
        }))
    }
}

// ============================================================================
// Document Collector
// ============================================================================

/// 수집기 설정
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// .gitignore 패턴 존중 여부
    pub respect_gitignore: bool,
    /// 숨김 파일 포함 여부
    pub include_hidden: bool,
    /// 최대 파일 크기 (바이트, 0이면 제한 없음)
    pub max_file_size: u64,
    /// PDF만 수집 (텍스트 파일 제외)
    pub pdf_only: bool,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            respect_gitignore: true,
            include_hidden: false,
            max_file_size: 50 * 1024 * 1024, // 50MB
            pdf_only: false,
        }
    }
}

/// 문서 수집기
pub struct DocumentCollector {
    config: CollectorConfig,
}

impl DocumentCollector {
    /// 새 수집기 생성
    pub fn new(config: CollectorConfig) -> Self {
        Self { config }
    }

    /// 기본 설정으로 수집기 생성
    pub fn with_defaults() -> Self {
        Self::new(CollectorConfig::default())
    }

    /// 명시된 파일들과 폴더를 수집
    ///
    /// 파일은 지정한 순서를 유지하고, 폴더 내 파일은 경로 순으로 뒤에 붙습니다.
    /// 명시적으로 지정한 파일이 지원되지 않는 형식이면 에러입니다.
    pub fn collect(&self, files: &[PathBuf], dir: Option<&Path>) -> Result<Vec<CollectedFile>> {
        let mut collected = Vec::new();

        for path in files {
            match self.collect_file(path)? {
                Some(file) => collected.push(file),
                None => anyhow::bail!("Unsupported or filtered document: {:?}", path),
            }
        }

        if let Some(dir) = dir {
            collected.extend(self.collect_directory(dir)?);
        }

        Ok(collected)
    }

    /// 단일 파일 수집
    pub fn collect_file(&self, path: &Path) -> Result<Option<CollectedFile>> {
        let abs_path = absolute(path)?;

        if !abs_path.exists() {
            anyhow::bail!("File not found: {:?}", abs_path);
        }

        if !abs_path.is_file() {
            anyhow::bail!("Not a file: {:?}", abs_path);
        }

        let file = CollectedFile::from_path(abs_path)?;
        Ok(file.filter(|f| self.should_include(f)))
    }

    /// 폴더 재귀 수집 (경로 순 정렬)
    pub fn collect_directory(&self, path: &Path) -> Result<Vec<CollectedFile>> {
        let abs_path = absolute(path)?;

        if !abs_path.is_dir() {
            anyhow::bail!("Not a directory: {:?}", abs_path);
        }

        let mut files = Vec::new();

        // ignore 크레이트로 .gitignore 지원
        let walker = WalkBuilder::new(&abs_path)
            .hidden(!self.config.include_hidden)
            .git_ignore(self.config.respect_gitignore)
            .git_global(self.config.respect_gitignore)
            .git_exclude(self.config.respect_gitignore)
            .build();

        for entry in walker {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    tracing::warn!("Failed to read entry: {}", e);
                    continue;
                }
            };

            if !entry.file_type().map(|ft| ft.is_file()).unwrap_or(false) {
                continue;
            }

            match CollectedFile::from_path(entry.path().to_path_buf()) {
                Ok(Some(file)) if self.should_include(&file) => files.push(file),
                Ok(_) => {}
                Err(e) => tracing::warn!("Failed to collect file: {}", e),
            }
        }

        files.sort_by(|a, b| a.path.cmp(&b.path));

        tracing::info!("Collected {} documents from {:?}", files.len(), abs_path);
        Ok(files)
    }

    /// 파일이 필터 조건을 만족하는지 확인
    fn should_include(&self, file: &CollectedFile) -> bool {
        if self.config.max_file_size > 0 && file.size > self.config.max_file_size {
            tracing::debug!("Skipping large file: {:?} ({} bytes)", file.path, file.size);
            return false;
        }

        !(self.config.pdf_only && file.kind != DocumentKind::Pdf)
    }
}

/// 수집된 파일들을 문서로 읽기
pub async fn load_documents(files: &[CollectedFile]) -> Result<Vec<Document>> {
    let mut documents = Vec::with_capacity(files.len());
    for file in files {
        documents.push(Document::from_path(&file.path).await?);
    }
    Ok(documents)
}

fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

// ============================================================================
// Tests
// ============================================================================
