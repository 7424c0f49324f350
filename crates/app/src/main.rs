use anyhow::Context;
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use medrag_core::{
    clean_page, export_eval_records, load_corpus, write_eval_records, BoilerplateOptions,
    ChunkingOptions, CleaningConfig, CorpusProfile, IndexManager, IngestionOptions,
    OllamaEmbedder, OpenAiCompatibleLlm, QueryEngine,
};
use std::io::Write;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "medrag", version, about = "RAG assistant over a folder of medical PDFs")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Path of the persisted index state file.
    #[arg(long, default_value = "index_state.json")]
    state: PathBuf,

    /// Ollama-compatible embedding endpoint.
    #[arg(long, env = "EMBEDDING_API_BASE", default_value = "http://localhost:11434")]
    embedding_url: String,

    /// Embedding model name; part of the index fingerprint.
    #[arg(long, env = "EMBEDDING_MODEL_NAME", default_value = "bge-m3")]
    embedding_model: String,

    /// OpenAI-compatible chat completion endpoint.
    #[arg(long, env = "LLM_API_BASE", default_value = "http://localhost:11434")]
    llm_url: String,

    /// API key for the chat endpoint, when it needs one.
    #[arg(long, env = "LLM_API_KEY")]
    llm_api_key: Option<String>,

    /// Chat model name.
    #[arg(long, env = "LLM_MODEL_NAME", default_value = "llama3")]
    llm_model: String,

    #[command(flatten)]
    ingestion: IngestionArgs,
}

#[derive(Args)]
struct IngestionArgs {
    /// Target chunk length in characters.
    #[arg(long, default_value_t = 800)]
    chunk_size: usize,

    /// Characters shared between consecutive chunks.
    #[arg(long, default_value_t = 100)]
    chunk_overlap: usize,

    /// Fraction of pages a line must appear on to count as boilerplate.
    #[arg(long, default_value_t = 0.3)]
    boilerplate_threshold: f64,

    /// Lines longer than this never qualify as boilerplate by frequency.
    #[arg(long, default_value_t = 80)]
    boilerplate_line_cutoff: usize,

    /// Keep repeated headers/footers instead of stripping them.
    #[arg(long, default_value_t = false)]
    keep_boilerplate: bool,

    /// Keep URLs and email addresses in the text.
    #[arg(long, default_value_t = false)]
    keep_urls: bool,

    /// Leave words split by end-of-line hyphens as extracted.
    #[arg(long, default_value_t = false)]
    keep_hyphenation: bool,

    /// Expand medical abbreviations to their full terms.
    #[arg(long, default_value_t = false)]
    normalize_medical: bool,
}

impl IngestionArgs {
    fn to_options(&self) -> IngestionOptions {
        IngestionOptions {
            cleaning: CleaningConfig {
                fix_hyphenation: !self.keep_hyphenation,
                remove_boilerplate: !self.keep_boilerplate,
                remove_urls: !self.keep_urls,
                normalize_medical: self.normalize_medical,
            },
            boilerplate: BoilerplateOptions {
                frequency_threshold: self.boilerplate_threshold,
                short_line_cutoff: self.boilerplate_line_cutoff,
            },
            chunking: ChunkingOptions {
                chunk_size: self.chunk_size,
                chunk_overlap: self.chunk_overlap,
            },
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Build the index for a folder, or reuse it when the fingerprint
    /// still matches.
    Ingest {
        /// Folder that contains PDFs, searched recursively.
        #[arg(long)]
        folder: PathBuf,
    },
    /// Answer a single question against the persisted index.
    Query {
        #[arg(long)]
        question: String,
        /// Folder that backs the index; rebuilt if stale.
        #[arg(long)]
        folder: PathBuf,
        #[arg(long, default_value_t = 5)]
        top_k: usize,
    },
    /// Interactive question loop; type 'exit' to quit.
    Chat {
        #[arg(long)]
        folder: PathBuf,
        #[arg(long, default_value_t = 5)]
        top_k: usize,
    },
    /// Show corpus statistics and the effect of cleaning, without
    /// touching the index.
    Inspect {
        #[arg(long)]
        folder: PathBuf,
        /// Print a before/after excerpt of the first page.
        #[arg(long, default_value_t = false)]
        preview: bool,
    },
    /// Answer a list of questions and write question/answer/context
    /// records for an external scorer.
    EvalExport {
        #[arg(long)]
        folder: PathBuf,
        /// JSON file holding an array of question strings.
        #[arg(long)]
        questions: PathBuf,
        #[arg(long, default_value = "eval_records.json")]
        out: PathBuf,
        #[arg(long, default_value_t = 5)]
        top_k: usize,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();
    info!(
        version = env!("CARGO_PKG_VERSION"),
        started_at = %Utc::now().to_rfc3339(),
        "medrag boot"
    );

    let options = cli.ingestion.to_options();
    let embedder = OllamaEmbedder::new(&cli.embedding_url, &cli.embedding_model)
        .context("invalid embedding endpoint")?;
    let manager = IndexManager::new(&cli.state);

    match cli.command {
        Command::Ingest { folder } => {
            let report = manager.build_or_load(&folder, &options, &embedder).await?;

            for skipped in &report.skipped {
                warn!(path = %skipped.path.display(), reason = %skipped.reason, "skipped document");
            }
            if report.reused {
                println!(
                    "index up to date ({} chunks, state {})",
                    report.index.len(),
                    cli.state.display()
                );
            } else {
                println!(
                    "built index with {} chunks ({} files skipped), state {}",
                    report.index.len(),
                    report.skipped.len(),
                    cli.state.display()
                );
            }
        }
        Command::Query {
            question,
            folder,
            top_k,
        } => {
            let report = manager.build_or_load(&folder, &options, &embedder).await?;
            let model = OpenAiCompatibleLlm::new(&cli.llm_url, cli.llm_api_key, &cli.llm_model)
                .map_err(|error| anyhow::anyhow!(error.to_string()))?;
            let engine = QueryEngine::new(&report.index, &embedder, &model, top_k);

            let answer = engine
                .answer(&question)
                .await
                .map_err(|error| anyhow::anyhow!(error.to_string()))?;
            print_answer(&answer);
        }
        Command::Chat { folder, top_k } => {
            let report = manager.build_or_load(&folder, &options, &embedder).await?;
            let model = OpenAiCompatibleLlm::new(&cli.llm_url, cli.llm_api_key, &cli.llm_model)
                .map_err(|error| anyhow::anyhow!(error.to_string()))?;
            let engine = QueryEngine::new(&report.index, &embedder, &model, top_k);

            println!("Ask about the corpus; type 'exit' to quit.");
            loop {
                print!("\n> ");
                std::io::stdout().flush()?;
                let mut line = String::new();
                if std::io::stdin().read_line(&mut line)? == 0 {
                    break;
                }
                let question = line.trim();
                if question.eq_ignore_ascii_case("exit") {
                    break;
                }
                if question.is_empty() {
                    continue;
                }

                match engine.answer(question).await {
                    Ok(answer) => print_answer(&answer),
                    Err(error) => eprintln!("error: {error}"),
                }
            }
        }
        Command::Inspect { folder, preview } => {
            inspect(&folder, &options, preview)?;
        }
        Command::EvalExport {
            folder,
            questions,
            out,
            top_k,
        } => {
            let report = manager.build_or_load(&folder, &options, &embedder).await?;
            let model = OpenAiCompatibleLlm::new(&cli.llm_url, cli.llm_api_key, &cli.llm_model)
                .map_err(|error| anyhow::anyhow!(error.to_string()))?;
            let engine = QueryEngine::new(&report.index, &embedder, &model, top_k);

            let raw = std::fs::read(&questions)
                .with_context(|| format!("reading {}", questions.display()))?;
            let questions: Vec<String> =
                serde_json::from_slice(&raw).context("questions file must be a JSON string array")?;

            let records = export_eval_records(&engine, &questions)
                .await
                .map_err(|error| anyhow::anyhow!(error.to_string()))?;
            write_eval_records(&out, &records)
                .map_err(|error| anyhow::anyhow!(error.to_string()))?;

            info!(records = records.len(), out = %out.display(), "wrote evaluation records");
            println!("{} records written to {}", records.len(), out.display());
        }
    }

    Ok(())
}

fn print_answer(answer: &medrag_core::Answer) {
    println!("\n--- Answer ---");
    println!("{}", answer.text);
    println!("--- Sources ---");
    for source in &answer.sources {
        let excerpt: String = source.text.chars().take(120).collect();
        println!(
            "[{} p.{}] score={:.3} {}",
            source.source_id, source.page_number, source.score, excerpt
        );
    }
}

fn inspect(
    folder: &std::path::Path,
    options: &IngestionOptions,
    preview: bool,
) -> anyhow::Result<()> {
    let report = load_corpus(folder)?;
    for skipped in &report.skipped {
        warn!(path = %skipped.path.display(), reason = %skipped.reason, "skipped document");
    }

    let profile = CorpusProfile::scan(&report.pages);
    let boilerplate = profile.boilerplate_set(&options.boilerplate);

    let cleaned: Vec<_> = report
        .pages
        .iter()
        .map(|page| clean_page(page, &boilerplate, &options.cleaning))
        .collect();

    let raw_chars: usize = report.pages.iter().map(|page| page.raw_text.len()).sum();
    let raw_words: usize = report
        .pages
        .iter()
        .map(|page| page.raw_text.split_whitespace().count())
        .sum();
    let clean_chars: usize = cleaned.iter().map(|page| page.clean_text.len()).sum();
    let clean_words: usize = cleaned
        .iter()
        .map(|page| page.clean_text.split_whitespace().count())
        .sum();

    println!("pages: {}", report.pages.len());
    println!("skipped files: {}", report.skipped.len());
    println!("boilerplate lines detected: {}", boilerplate.len());
    println!("characters: {raw_chars} -> {clean_chars}");
    println!("words: {raw_words} -> {clean_words}");
    if raw_chars > 0 {
        let reduction = (raw_chars.saturating_sub(clean_chars)) as f64 / raw_chars as f64 * 100.0;
        println!("reduction: {reduction:.1}%");
    }

    let mut detected: Vec<&str> = boilerplate.iter().collect();
    detected.sort_unstable();
    for line in detected {
        println!("boilerplate: {line:?}");
    }

    if preview {
        if let (Some(raw), Some(clean)) = (report.pages.first(), cleaned.first()) {
            let before: String = raw.raw_text.chars().take(300).collect();
            let after: String = clean.clean_text.chars().take(300).collect();
            println!("\n--- first page, extracted ---\n{before}");
            println!("\n--- first page, cleaned ---\n{after}");
        }
    }

    Ok(())
}
