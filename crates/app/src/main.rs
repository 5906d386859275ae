mod api;

use chrono::Utc;
use clap::{Parser, Subcommand};
use statement_search_core::{
    create_embedder, extract_layout, purge_cached_model, section_contents, EmbedderKind,
    EmbedderSettings, OcrClient, SearchOptions, StatementSearch, StructureOptions,
    StructureParser, DEFAULT_MODEL,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const DEFAULT_CACHE_DIR: &str = ".fastembed_cache";

#[derive(Parser)]
#[command(name = "statement-search", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Directory holding the reference PDFs
    #[arg(long, env = "STATEMENT_SEARCH_CORPUS_DIR", default_value = "corpus")]
    corpus_dir: PathBuf,

    /// Embedding backend: `ngram` or `fastembed`
    #[arg(long, env = "STATEMENT_SEARCH_EMBEDDER", default_value = "ngram")]
    embedder: String,

    /// Pretrained model used by the fastembed backend
    #[arg(long, env = "STATEMENT_SEARCH_MODEL", default_value = DEFAULT_MODEL)]
    model: String,

    /// Where downloaded models are cached
    #[arg(long, env = "FASTEMBED_CACHE_DIR")]
    cache_dir: Option<PathBuf>,

    /// Number of documents selected per question
    #[arg(long, env = "STATEMENT_SEARCH_TOP_DOCUMENTS", default_value = "2")]
    top_documents: usize,

    /// Number of statements returned per selected document
    #[arg(long, env = "STATEMENT_SEARCH_TOP_STATEMENTS", default_value = "2")]
    top_statements: usize,

    /// Only treat `{PREFIX}-<n>` lines as statements (e.g. VULN)
    #[arg(long, env = "STATEMENT_SEARCH_STATEMENT_PREFIX")]
    statement_prefix: Option<String>,

    /// Transcription endpoint for PDFs without extractable text
    #[arg(long, env = "STATEMENT_SEARCH_OCR_ENDPOINT")]
    ocr_endpoint: Option<String>,

    /// Bearer token sent to the transcription endpoint
    #[arg(long, env = "STATEMENT_SEARCH_OCR_API_KEY", hide_env_values = true)]
    ocr_api_key: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the chat page and the question endpoint.
    Serve {
        #[arg(long, env = "STATEMENT_SEARCH_BIND", default_value = "127.0.0.1:5000")]
        bind: String,
    },
    /// Answer one question from the command line.
    Ask {
        #[arg(long)]
        question: String,
    },
    /// Print the detected structure of one PDF as JSON.
    Inspect {
        #[arg(long)]
        pdf: PathBuf,
        /// Also print the text under each section heading.
        #[arg(long, default_value_t = false)]
        with_contents: bool,
    },
    /// Delete a downloaded model from the local cache.
    PurgeModelCache {
        #[arg(long, default_value = "BAAI/bge-base-en-v1.5")]
        model: String,
    },
}

impl Cli {
    fn embedder_settings(&self) -> anyhow::Result<EmbedderSettings> {
        Ok(EmbedderSettings {
            kind: self.embedder.parse::<EmbedderKind>()?,
            model: self.model.clone(),
            cache_dir: self.cache_dir.clone(),
        })
    }

    fn search_options(&self) -> SearchOptions {
        SearchOptions {
            top_k_documents: self.top_documents,
            top_k_statements: self.top_statements,
            structure: StructureOptions {
                statement_prefix: self.statement_prefix.clone(),
                ..StructureOptions::default()
            },
        }
    }

    fn ocr_client(&self) -> Option<OcrClient> {
        self.ocr_endpoint
            .as_deref()
            .map(str::trim)
            .filter(|endpoint| !endpoint.is_empty())
            .map(|endpoint| OcrClient::new(endpoint, self.ocr_api_key.clone()))
    }

    /// Structure of one PDF as JSON. Needs no embedder, and the PDF is
    /// extracted once even when section contents are included.
    fn inspect_report(&self, pdf: &Path, with_contents: bool) -> anyhow::Result<serde_json::Value> {
        let parser = StructureParser::new(&self.search_options().structure)?;
        let layout = extract_layout(pdf, self.ocr_client().as_ref())?;
        let structure = parser.analyze(&layout);

        let mut report = serde_json::to_value(&structure)?;
        if with_contents {
            let contents = section_contents(&layout.full_text(), &structure.sections);
            report["section_contents"] = serde_json::to_value(contents)?;
        }
        Ok(report)
    }

    fn build_search(&self) -> anyhow::Result<StatementSearch> {
        let embedder = create_embedder(&self.embedder_settings()?)?;
        info!(
            embedder = embedder.model_name(),
            dimensions = embedder.dimensions(),
            corpus = %self.corpus_dir.display(),
            ocr = self.ocr_endpoint.as_deref().unwrap_or("off"),
            "search pipeline ready"
        );

        let search = StatementSearch::new(
            self.corpus_dir.clone(),
            embedder,
            self.search_options(),
        )?;
        Ok(match self.ocr_client() {
            Some(ocr) => search.with_ocr(ocr),
            None => search,
        })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let app_version = env!("CARGO_PKG_VERSION");

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();

    info!(
        version = app_version,
        started_at = %Utc::now().to_rfc3339(),
        "statement-search boot"
    );

    match &cli.command {
        Command::Serve { bind } => {
            let search = cli.build_search()?;
            let app = api::router(api::AppState {
                search: Arc::new(search),
            });

            let listener = tokio::net::TcpListener::bind(bind).await?;
            info!(address = %bind, "listening");

            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal())
                .await?;
        }
        Command::Ask { question } => {
            let search = cli.build_search()?;
            let question = question.clone();
            let answer = tokio::task::spawn_blocking(move || search.answer(&question)).await??;

            println!("question: {}", answer.question);
            if answer.documents.is_empty() {
                println!("no matching documents in {}", cli.corpus_dir.display());
            }
            for document in answer.documents {
                println!("{}:", document.doc);
                for statement in document.reps {
                    println!("  - {}", statement.replace('\n', "\n    "));
                }
            }
        }
        Command::Inspect { pdf, with_contents } => {
            let report = tokio::task::block_in_place(|| cli.inspect_report(pdf, *with_contents))?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::PurgeModelCache { model } => {
            let cache_dir = cli
                .cache_dir
                .clone()
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CACHE_DIR));
            let removed = purge_cached_model(&cache_dir, model)?;

            if removed.is_empty() {
                warn!(model = %model, cache = %cache_dir.display(), "model not found in cache");
                println!("{model} not found in {}", cache_dir.display());
            }
            for path in removed {
                println!("removed {}", path.display());
            }
        }
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        warn!(%error, "failed to listen for shutdown signal");
    }
    info!("shutting down");
}
