//! CLI 모듈
//!
//! pdf-chat 명령어 정의 및 구현

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use crate::collector::{load_documents, CollectedFile, CollectorConfig, DocumentCollector};
use crate::config::{
    has_api_key, has_hf_token, EmbeddingBackend, EmbeddingConfig, LlmBackend, LlmConfig,
    RagConfig, SessionConfig, GEMINI_KEY_VARS, HF_TOKEN_VARS,
};
use crate::extractor::{extract_text, DocumentKind};
use crate::knowledge::{CharacterChunker, ChunkConfig, Chunker};
use crate::session::{ConversationSession, ProcessStats};

// ============================================================================
// CLI Definition
// ============================================================================

#[derive(Parser)]
#[command(name = "pdf-chat")]
#[command(version, about = "PDF 문서와 대화하기", long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub options: SessionArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// 프로바이더와 세션 옵션 (모든 명령어 공통)
#[derive(Args, Debug, Clone)]
pub struct SessionArgs {
    /// 임베딩 백엔드
    #[arg(
        long,
        global = true,
        value_enum,
        env = "PDF_CHAT_EMBEDDING",
        default_value = "huggingface"
    )]
    pub embedding: EmbeddingBackend,

    /// 임베딩 모델 (기본: 백엔드별 기본 모델)
    #[arg(long, global = true, env = "PDF_CHAT_EMBEDDING_MODEL")]
    pub embedding_model: Option<String>,

    /// 답변 생성 LLM 백엔드
    #[arg(
        long,
        global = true,
        value_enum,
        env = "PDF_CHAT_LLM",
        default_value = "huggingface"
    )]
    pub llm: LlmBackend,

    /// LLM 모델 (기본: 백엔드별 기본 모델)
    #[arg(long, global = true, env = "PDF_CHAT_LLM_MODEL")]
    pub llm_model: Option<String>,

    /// 청크 최대 문자 수
    #[arg(long, global = true, env = "PDF_CHAT_CHUNK_SIZE", default_value = "1000")]
    pub chunk_size: usize,

    /// 청크 간 겹치는 문자 수
    #[arg(long, global = true, env = "PDF_CHAT_CHUNK_OVERLAP", default_value = "200")]
    pub chunk_overlap: usize,

    /// 질문당 검색할 청크 수
    #[arg(long, global = true, env = "PDF_CHAT_TOP_K", default_value = "4")]
    pub top_k: usize,

    /// 생성 온도
    #[arg(long, global = true, default_value = "0.5")]
    pub temperature: f32,

    /// 새로 생성할 최대 토큰 수
    #[arg(long, global = true, default_value = "50")]
    pub max_new_tokens: u32,

    /// 후속 질문을 독립 질문으로 재작성한 뒤 검색
    #[arg(long, global = true)]
    pub condense: bool,
}

impl SessionArgs {
    /// CLI 옵션을 전체 설정으로 변환
    pub fn to_config(&self) -> RagConfig {
        let mut embedding = EmbeddingConfig::for_backend(self.embedding);
        if let Some(ref model) = self.embedding_model {
            embedding.model = model.clone();
        }

        let mut llm = LlmConfig::for_backend(self.llm);
        if let Some(ref model) = self.llm_model {
            llm.model = model.clone();
        }

        let mut session = SessionConfig {
            chunk: ChunkConfig::new(self.chunk_size, self.chunk_overlap),
            top_k: self.top_k,
            condense_question: self.condense,
            ..Default::default()
        };
        session.generation.temperature = self.temperature;
        session.generation.max_new_tokens = self.max_new_tokens;

        RagConfig {
            embedding,
            llm,
            session,
        }
    }
}

/// 처리할 문서 지정
#[derive(Args, Debug, Clone)]
pub struct DocumentArgs {
    /// PDF 또는 텍스트 파일
    pub files: Vec<PathBuf>,

    /// 폴더 (재귀)
    #[arg(short, long)]
    pub dir: Option<PathBuf>,

    /// 폴더에서 PDF만 수집
    #[arg(long)]
    pub pdf_only: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 문서를 처리한 뒤 대화형으로 질문
    Chat {
        #[command(flatten)]
        documents: DocumentArgs,
    },

    /// 문서를 처리하고 질문 하나에 답변
    Ask {
        #[command(flatten)]
        documents: DocumentArgs,

        /// 질문
        #[arg(short, long)]
        question: String,
    },

    /// 청크 분할 결과 확인
    Chunks {
        #[command(flatten)]
        documents: DocumentArgs,

        /// 청크 미리보기 길이
        #[arg(long, default_value = "80")]
        preview: usize,
    },

    /// 상태 확인
    Status,
}

// ============================================================================
// CLI Runner
// ============================================================================

/// CLI 명령어 실행
pub async fn run(cli: Cli) -> Result<()> {
    let config = cli.options.to_config();

    match cli.command {
        Commands::Chat { documents } => cmd_chat(&config, &documents).await,
        Commands::Ask {
            documents,
            question,
        } => cmd_ask(&config, &documents, &question).await,
        Commands::Chunks { documents, preview } => {
            cmd_chunks(&config.session.chunk, &documents, preview).await
        }
        Commands::Status => cmd_status(&config),
    }
}

// ============================================================================
// Command Implementations
// ============================================================================

/// 대화 명령어 (chat)
///
/// 문서를 처리한 뒤 표준 입력에서 질문을 한 줄씩 읽습니다.
async fn cmd_chat(config: &RagConfig, documents: &DocumentArgs) -> Result<()> {
    let files = collect_files(documents)?;
    let mut session = ConversationSession::from_config(config).context("세션 생성 실패")?;
    process_files(&mut session, &files)
        .await
        .context("문서 처리 실패")?;

    println!();
    println!("질문을 입력하세요. (/history: 대화 기록, /reset: 문서 재처리, /quit: 종료)");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        stdout.write_all(b"\n> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };

        if handle_chat_input(&mut session, &files, &line).await == ChatFlow::Quit {
            break;
        }
    }

    println!("[OK] 종료합니다.");
    Ok(())
}

/// 대화 루프 진행 여부
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChatFlow {
    Continue,
    Quit,
}

/// 대화 입력 한 줄 처리
///
/// `/reset`은 인덱스와 대화를 버리고 같은 파일을 다시 처리합니다.
/// 명령 실패는 출력만 하고 루프를 이어갑니다.
async fn handle_chat_input(
    session: &mut ConversationSession,
    files: &[CollectedFile],
    line: &str,
) -> ChatFlow {
    let input = line.trim();

    match input {
        "" => {}
        "/quit" | "/exit" => return ChatFlow::Quit,
        "/history" => print_history(session),
        "/reset" => match process_files(session, files).await {
            Ok(_) => println!("[OK] 대화 기록을 지우고 문서를 다시 처리했습니다."),
            Err(e) => println!("[!] 문서 재처리 실패: {:#}", e),
        },
        _ => match session.ask(input).await {
            Ok(answer) => println!("{}", answer),
            Err(e) => println!("[!] {}", e),
        },
    }

    ChatFlow::Continue
}

/// 단일 질문 명령어 (ask)
async fn cmd_ask(config: &RagConfig, documents: &DocumentArgs, question: &str) -> Result<()> {
    let files = collect_files(documents)?;
    let mut session = ConversationSession::from_config(config).context("세션 생성 실패")?;
    process_files(&mut session, &files)
        .await
        .context("문서 처리 실패")?;

    let answer = session.ask(question).await.context("답변 생성 실패")?;
    println!();
    println!("{}", answer);

    Ok(())
}

/// 청크 확인 명령어 (chunks)
///
/// 프로바이더 호출 없이 추출과 청킹 결과만 출력합니다.
async fn cmd_chunks(chunk: &ChunkConfig, documents: &DocumentArgs, preview: usize) -> Result<()> {
    let chunker = CharacterChunker::new(chunk.clone())?;

    let files = collect_files(documents)?;
    let docs = load_documents(&files).await?;
    let text = extract_text(&docs).await?;

    let chunks = chunker.chunk(&text);
    println!(
        "[OK] {} 문자 → {} 청크 ({}, size {}, overlap {})",
        text.chars().count(),
        chunks.len(),
        chunker.name(),
        chunk.chunk_size,
        chunk.chunk_overlap
    );
    println!();

    for chunk in &chunks {
        println!(
            "  #{:<4} [{}..{}] {}",
            chunk.index,
            chunk.char_start,
            chunk.char_end,
            truncate_text(&chunk.text, preview)
        );
    }

    Ok(())
}

/// 상태 명령어 (status)
fn cmd_status(config: &RagConfig) -> Result<()> {
    println!("pdf-chat v{}", env!("CARGO_PKG_VERSION"));
    println!();

    println!(
        "[*] 임베딩: {:?} ({}, dimension {})",
        config.embedding.backend, config.embedding.model, config.embedding.dimension
    );
    println!("[*] LLM: {:?} ({})", config.llm.backend, config.llm.model);
    println!(
        "[*] 청킹: size {}, overlap {} / top_k {}",
        config.session.chunk.chunk_size, config.session.chunk.chunk_overlap, config.session.top_k
    );

    print_key_status("HuggingFace 토큰", has_hf_token(), HF_TOKEN_VARS);
    print_key_status("Gemini API 키", has_api_key(), GEMINI_KEY_VARS);

    if let Err(e) = config.session.validate() {
        println!("[!] 설정 오류: {}", e);
    }

    Ok(())
}

// ============================================================================
// Helper Functions
// ============================================================================

/// 파일 수집
fn collect_files(documents: &DocumentArgs) -> Result<Vec<CollectedFile>> {
    if documents.files.is_empty() && documents.dir.is_none() {
        bail!("처리할 파일 또는 --dir를 지정해야 합니다");
    }

    let collector = DocumentCollector::new(CollectorConfig {
        pdf_only: documents.pdf_only,
        ..Default::default()
    });

    let files = collector.collect(&documents.files, documents.dir.as_deref())?;
    if files.is_empty() {
        bail!("처리할 수 있는 문서가 없습니다 (PDF, txt, md 지원)");
    }

    Ok(files)
}

/// 파일을 읽어 세션에서 처리 (이전 인덱스와 대화는 폐기)
async fn process_files(
    session: &mut ConversationSession,
    files: &[CollectedFile],
) -> Result<ProcessStats> {
    let total_size: u64 = files.iter().map(|f| f.size).sum();
    let pdf_count = files.iter().filter(|f| f.kind == DocumentKind::Pdf).count();
    println!(
        "[*] 문서 {} 개 (PDF {}, 텍스트 {}), 총 {}",
        files.len(),
        pdf_count,
        files.len() - pdf_count,
        format_bytes(total_size as usize)
    );

    let docs = load_documents(files).await?;

    println!("[*] 텍스트 추출, 청킹, 임베딩 중...");
    let stats = session.process(docs).await?;
    println!(
        "[OK] 처리 완료: {} 문자, {} 청크 (dimension {})",
        stats.characters, stats.chunks, stats.dimension
    );

    Ok(stats)
}

/// 대화 기록 출력
fn print_history(session: &ConversationSession) {
    let history = session.history();
    if history.is_empty() {
        println!("[!] 대화 기록이 없습니다.");
        return;
    }

    for (i, turn) in history.iter().enumerate() {
        println!(
            "{}. [{}] Q: {}",
            i + 1,
            turn.asked_at.format("%H:%M:%S"),
            truncate_text(&turn.question, 80)
        );
        println!("   A: {}", truncate_text(&turn.answer, 200));
    }
}

fn print_key_status(label: &str, present: bool, vars: &[&str]) {
    if present {
        println!("[OK] {}: 설정됨", label);
    } else {
        println!("[!] {}: 미설정 ({})", label, vars.join(" 또는 "));
    }
}

/// 텍스트 자르기 (UTF-8 안전)
fn truncate_text(text: &str, max_chars: usize) -> String {
    let cleaned = text.replace('\n', " ").replace('\r', "");
    let cleaned = cleaned.trim();

    if cleaned.chars().count() <= max_chars {
        cleaned.to_string()
    } else {
        let truncated: String = cleaned.chars().take(max_chars).collect();
        format!("{}...", truncated)
    }
}

/// 바이트 크기 포맷팅
fn format_bytes(bytes: usize) -> String {
    const KB: usize = 1024;
    const MB: usize = KB * 1024;

    if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

// ============================================================================
// Tests
// ============================================================================
