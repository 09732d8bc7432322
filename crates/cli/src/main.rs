use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use warden_config::Config;
use warden_index::{HttpEmbedder, QdrantClient, WorkspaceIndexer};

#[derive(Parser)]
#[command(name = "warden", about = "Pre-execution safety gate for AI coding assistants", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate one intercepted tool call from stdin; exits 0 (admit),
    /// 1 (internal error), or 2 (refuse)
    Hook,
    /// Build or refresh the duplicate-prevention index for a workspace
    Index {
        /// Workspace root (default: detected from the current directory)
        #[arg(long)]
        root: Option<PathBuf>,
    },
    /// Watch a workspace and keep its duplicate-prevention index current
    Watch {
        #[arg(long)]
        root: Option<PathBuf>,
    },
    /// Drop a workspace's duplicate-prevention collection from the vector store
    DropIndex {
        #[arg(long)]
        root: Option<PathBuf>,
    },
    /// Build or refresh the repository symbol index
    Symbols {
        #[arg(long)]
        root: Option<PathBuf>,
    },
    /// Search the symbol index
    Search {
        /// Name pattern; supports * and ? wildcards
        query: String,
        /// Filter by kind: function, class, method, variable
        #[arg(short, long)]
        kind: Option<String>,
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
        #[arg(long)]
        root: Option<PathBuf>,
    },
    /// Review a directory with the configured generative model
    Review {
        /// Absolute directory to review
        directory: PathBuf,
        /// Focus areas inserted into the prompt
        #[arg(short, long)]
        focus: Vec<String>,
        /// Hunt only for concrete bugs
        #[arg(long)]
        bugs: bool,
        /// Model override
        #[arg(short, long)]
        model: Option<String>,
    },
    /// Serve the symbol-search tool surface over stdio
    McpSearch {
        #[arg(long)]
        root: Option<PathBuf>,
    },
    /// Serve the code-review tool surface over stdio
    McpReview,
    /// Print the resolved configuration
    Config,
}

fn workspace_root(explicit: Option<PathBuf>) -> PathBuf {
    match explicit {
        Some(root) => root,
        None => {
            let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
            warden_index::find_workspace_root(&cwd)
        }
    }
}

/// Route tracing to stderr for interactive commands, or to a best-effort file
/// for the hook and protocol servers whose output streams are spoken for.
fn init_tracing(cfg: &Config, log_file: Option<&str>) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    match log_file {
        Some(name) => {
            let dir = cfg.log_dir();
            let _ = std::fs::create_dir_all(&dir);
            let path = dir.join(name);
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(move || file_writer(&path))
                .try_init();
        }
        None => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .try_init();
        }
    }
}

fn file_writer(path: &std::path::Path) -> Box<dyn std::io::Write> {
    match std::fs::OpenOptions::new().create(true).append(true).open(path) {
        Ok(file) => Box::new(file),
        Err(_) => Box::new(std::io::sink()),
    }
}

fn build_indexer(cfg: &Config, root: &std::path::Path) -> Arc<WorkspaceIndexer> {
    let embedder = Arc::new(HttpEmbedder::new(
        cfg.duplicate.embedding_url(),
        cfg.duplicate.embedding_dimension,
    ));
    let store = Arc::new(QdrantClient::new(cfg.duplicate.qdrant_url()));
    Arc::new(WorkspaceIndexer::new(
        root,
        embedder,
        store,
        cfg.indexer.clone(),
    ))
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let cfg = Config::load_or_default();

    let exit_code = match cli.command {
        Commands::Hook => {
            init_tracing(&cfg, Some("hook.log"));
            run_hook(&cfg).await
        }
        Commands::Index { root } => {
            init_tracing(&cfg, None);
            report(run_index(&cfg, workspace_root(root)).await)
        }
        Commands::Watch { root } => {
            init_tracing(&cfg, None);
            report(run_watch(&cfg, workspace_root(root)).await)
        }
        Commands::DropIndex { root } => {
            init_tracing(&cfg, None);
            report(run_drop_index(&cfg, workspace_root(root)).await)
        }
        Commands::Symbols { root } => {
            init_tracing(&cfg, None);
            report(run_symbols(workspace_root(root)))
        }
        Commands::Search {
            query,
            kind,
            limit,
            root,
        } => {
            init_tracing(&cfg, None);
            report(run_search(workspace_root(root), &query, kind.as_deref(), limit))
        }
        Commands::Review {
            directory,
            focus,
            bugs,
            model,
        } => {
            init_tracing(&cfg, None);
            report(run_review(&cfg, directory, focus, bugs, model).await)
        }
        Commands::McpSearch { root } => {
            init_tracing(&cfg, Some("mcp_search.log"));
            let provider = warden_mcp::SymbolSearchProvider::new(workspace_root(root));
            report(warden_mcp::serve(&provider).await)
        }
        Commands::McpReview => {
            init_tracing(&cfg, Some("mcp_review.log"));
            let provider = warden_mcp::ReviewProvider::new(cfg.review.clone());
            report(warden_mcp::serve(&provider).await)
        }
        Commands::Config => {
            init_tracing(&cfg, None);
            match serde_json::to_string_pretty(&cfg) {
                Ok(rendered) => {
                    println!("{rendered}");
                    0
                }
                Err(e) => {
                    eprintln!("Error: {e}");
                    1
                }
            }
        }
    };

    std::process::exit(exit_code);
}

/// Hook entry point. Stdout stays empty; guard messages go to stderr; the
/// exit code is the decision.
async fn run_hook(cfg: &Config) -> i32 {
    let mut input = String::new();
    if let Err(e) = std::io::stdin().read_to_string(&mut input) {
        eprintln!("Error: failed to read stdin: {e}");
        return 1;
    }

    let request = match warden_guards::normalize(&input) {
        Ok(request) => request,
        Err(e) => {
            eprintln!("Error: {e}");
            return 1;
        }
    };

    let registry = warden_guards::build_registry(cfg);
    let overrides = warden_guards::OverrideAuthenticator::from_config(cfg);
    let interactive = warden_guards::interaction::is_interactive();

    let decision = registry.evaluate(&request, interactive, &overrides).await;
    for message in &decision.messages {
        eprintln!("{message}");
    }
    decision.exit_code
}

async fn run_index(cfg: &Config, root: PathBuf) -> Result<()> {
    let indexer = build_indexer(cfg, &root);
    let stats = indexer.build().await?;
    println!(
        "Indexed {} of {} files into '{}' ({} unchanged, {} failed)",
        stats.indexed,
        stats.scanned,
        indexer.collection(),
        stats.skipped,
        stats.failed
    );
    Ok(())
}

async fn run_watch(cfg: &Config, root: PathBuf) -> Result<()> {
    let indexer = build_indexer(cfg, &root);
    warden_index::watcher::run(indexer, cfg.indexer.clone()).await
}

async fn run_drop_index(cfg: &Config, root: PathBuf) -> Result<()> {
    let collection = warden_index::collection_name(&root);
    let store = QdrantClient::new(cfg.duplicate.qdrant_url());
    store.drop_collection(&collection).await?;
    println!("Dropped collection '{collection}'");
    Ok(())
}

fn run_symbols(root: PathBuf) -> Result<()> {
    let outcome = warden_symbols::index_repository(&root)?;
    println!(
        "Scanned {} files: {} indexed, {} unchanged, {} removed",
        outcome.scanned, outcome.indexed, outcome.skipped, outcome.removed
    );
    Ok(())
}

fn run_search(root: PathBuf, query: &str, kind: Option<&str>, limit: usize) -> Result<()> {
    warden_symbols::index_repository(&root)?;
    let store = warden_symbols::SymbolStore::open(&root)?;

    let kind = match kind {
        None => None,
        Some(raw) => Some(
            warden_symbols::SymbolKind::parse(raw)
                .ok_or_else(|| anyhow::anyhow!("Unknown symbol kind: {raw}"))?,
        ),
    };

    let results = store.search_name(query, kind, limit)?;
    if results.is_empty() {
        println!("No symbols matching '{query}'");
        return Ok(());
    }
    for symbol in &results {
        let full_name = match &symbol.parent {
            Some(parent) => format!("{parent}.{}", symbol.name),
            None => symbol.name.clone(),
        };
        println!(
            "{}:{} - {} {}",
            symbol.file_path,
            symbol.line,
            symbol.kind.as_str(),
            full_name
        );
        if let Some(signature) = &symbol.signature {
            println!("    {}{}", symbol.name, signature);
        }
    }
    Ok(())
}

async fn run_review(
    cfg: &Config,
    directory: PathBuf,
    focus: Vec<String>,
    bugs: bool,
    model: Option<String>,
) -> Result<()> {
    let directory = if directory.is_absolute() {
        directory
    } else {
        std::env::current_dir()?.join(directory)
    };

    let mut settings = cfg.review.clone();
    if let Some(model) = model {
        settings.model = model;
    }
    let kind = if bugs {
        warden_review::ReviewKind::BugHunt
    } else {
        warden_review::ReviewKind::General
    };

    let report = warden_review::run_review(
        &directory,
        kind,
        &warden_review::ReviewOptions { focus },
        &settings,
    )
    .await?;

    println!("{}", report.text);
    if !report.skipped_too_large.is_empty() {
        println!("\nSkipped (too large): {}", report.skipped_too_large.join(", "));
    }
    println!(
        "\n--\n{} files reviewed; {} tokens ({} in / {} out); est. ${:.4}",
        report.files_reviewed,
        report.usage.total_tokens,
        report.usage.input_tokens,
        report.usage.output_tokens,
        report.usage.estimated_cost_usd
    );
    Ok(())
}

fn report(result: Result<()>) -> i32 {
    match result {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("Error: {e:#}");
            1
        }
    }
}
