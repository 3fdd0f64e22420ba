//! Paper cache command-line interface.
//!
//! Runs the same operations as the MCP server directly from a shell, against
//! the same `papers/` cache. Useful for warming the cache or inspecting it.
//!
//! # Examples
//!
//! Search a topic and cache the results:
//! ```bash
//! papers search "quantum computing" --max-results 5
//! ```
//!
//! Show cached metadata and citations:
//! ```bash
//! papers info 2301.00001v2
//! papers cite 2301.00001v2 --format json
//! ```
//!
//! List cached topics:
//! ```bash
//! papers topics
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use comfy_table::{presets::UTF8_FULL, Attribute, Cell, Color, ContentArrangement, Table};
use mcp_paper_cache::{
    provider::arxiv::ArxivProvider,
    service::{PaperCacheService, DEFAULT_MAX_RESULTS},
    storage::{
        json::{topic_key, JsonTopicStorage},
        PaperStorage,
    },
    AppConfig, CitationOutcome, LookupOutcome, PaperRecord,
};
use tracing::debug;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Output format for command results
#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Human-friendly table
    Table,
    /// Machine-readable JSON, as returned by the MCP tools
    Json,
}

/// Search arXiv and manage the local paper cache
#[derive(Parser, Debug)]
#[command(name = "papers", version, about)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Directory holding one folder per searched topic [default: $PAPER_DIR or ./papers]
    #[arg(long, global = true, value_name = "DIR")]
    paper_dir: Option<PathBuf>,

    /// arXiv API endpoint [default: $ARXIV_API_URL or the public API]
    #[arg(long, global = true, value_name = "URL")]
    arxiv_url: Option<String>,

    /// Output format
    #[arg(long, global = true, value_enum, default_value = "table")]
    format: OutputFormat,

    /// Logging verbosity level
    #[arg(long, global = true, default_value = "warn", value_name = "LEVEL")]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Search arXiv for a topic and cache the results
    Search {
        /// Topic to search for
        topic: String,

        /// Number of papers to fetch
        #[arg(long, short = 'n', default_value_t = DEFAULT_MAX_RESULTS)]
        max_results: usize,
    },
    /// Show the cached metadata of a paper
    Info {
        /// arXiv identifier
        paper_id: String,
    },
    /// Show citations for a paper
    Cite {
        /// arXiv identifier
        paper_id: String,
    },
    /// List cached topics
    Topics,
}

/// Setup logging with the specified level
fn setup_logging(log_level: &str) {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level)))
        .init();
}

/// Shorten `text` to at most `max` characters, marking the cut with "...".
fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let kept: String = text.chars().take(max.saturating_sub(3)).collect();
    format!("{}...", kept)
}

fn bold(label: &str) -> Cell {
    Cell::new(label).add_attribute(Attribute::Bold)
}

/// Format searched papers as a table, in ranking order
fn format_papers_table(papers: &[PaperRecord]) -> String {
    if papers.is_empty() {
        return "No results found.".to_string();
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        bold("Rank"),
        bold("ID"),
        bold("Title"),
        bold("Authors"),
        bold("Published"),
    ]);

    for (idx, paper) in papers.iter().enumerate() {
        table.add_row(vec![
            Cell::new(idx + 1),
            Cell::new(&paper.id).fg(Color::Cyan),
            Cell::new(truncate(&paper.title, 60)),
            Cell::new(truncate(&paper.authors.join(", "), 40)),
            Cell::new(&paper.published),
        ]);
    }

    table.to_string()
}

/// Display detailed view of a single paper
fn display_paper_detail(paper: &PaperRecord) {
    println!("{}", "═".repeat(80));
    println!("ID: {}", paper.id);
    println!("Title: {}", paper.title);
    println!("Authors: {}", paper.authors.join(", "));
    println!("Published: {}", paper.published);
    println!("PDF: {}", paper.pdf_url);
    println!("\nAbstract:\n{}", paper.summary);
    println!("{}", "═".repeat(80));
}

async fn run_search(
    service: &PaperCacheService<ArxivProvider, JsonTopicStorage>,
    topic: &str,
    max_results: usize,
    format: OutputFormat,
) -> Result<()> {
    let ids = service
        .search(topic, max_results)
        .await
        .with_context(|| format!("Failed to search arXiv for '{}'", topic))?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&ids)?),
        OutputFormat::Table => {
            let document = service.storage().load_topic(topic).await?;
            let papers: Vec<PaperRecord> = ids
                .iter()
                .filter_map(|id| document.get(id).map(|v| PaperRecord::from_stored(id, v)))
                .collect();
            println!("{}", format_papers_table(&papers));
            println!("Cached {} papers under {}", ids.len(), topic_key(topic)?);
        }
    }
    Ok(())
}

async fn run_info(
    service: &PaperCacheService<ArxivProvider, JsonTopicStorage>,
    paper_id: &str,
    format: OutputFormat,
) -> Result<()> {
    let outcome = service.extract_info(paper_id).await?;
    match (&outcome, format) {
        (LookupOutcome::Found(paper), OutputFormat::Table) => {
            display_paper_detail(&paper.record())
        }
        _ => println!("{}", outcome.to_message()?),
    }
    Ok(())
}

async fn run_cite(
    service: &PaperCacheService<ArxivProvider, JsonTopicStorage>,
    paper_id: &str,
    format: OutputFormat,
) -> Result<()> {
    let outcome = service.get_citations(paper_id).await?;
    match (&outcome, format) {
        (CitationOutcome::Citations(bundle), OutputFormat::Table) => {
            println!("{} ({})", bundle.title, bundle.paper_id);
            println!("\nAPA:\n{}", bundle.citations.apa);
            println!("\nMLA:\n{}", bundle.citations.mla);
            println!("\nBibTeX:\n{}", bundle.citations.bibtex);
        }
        _ => println!("{}", outcome.to_message()?),
    }
    Ok(())
}

async fn run_topics(storage: &JsonTopicStorage, format: OutputFormat) -> Result<()> {
    let topics = storage.list_topics().await?;

    match format {
        OutputFormat::Json => {
            let value: serde_json::Map<String, serde_json::Value> = topics
                .iter()
                .map(|t| (t.name.clone(), t.paper_count.into()))
                .collect();
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        OutputFormat::Table => {
            if topics.is_empty() {
                println!("No topics cached in {}", storage.root().display());
                return Ok(());
            }
            let mut table = Table::new();
            table.load_preset(UTF8_FULL);
            table.set_header(vec![bold("Topic"), bold("Papers")]);
            for topic in &topics {
                table.add_row(vec![Cell::new(&topic.name), Cell::new(topic.paper_count)]);
            }
            println!("{}", table);
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    setup_logging(&args.log_level);

    let config = AppConfig::from_env()
        .context("Invalid environment configuration")?
        .with_overrides(args.paper_dir, args.arxiv_url);
    debug!("Configuration: {:?}", config);

    let provider = ArxivProvider::new(config.arxiv).context("Failed to create arXiv client")?;
    let service = PaperCacheService::new(provider, JsonTopicStorage::new(config.paper_dir));

    match args.command {
        Command::Search { topic, max_results } => {
            run_search(&service, &topic, max_results, args.format).await
        }
        Command::Info { paper_id } => run_info(&service, &paper_id, args.format).await,
        Command::Cite { paper_id } => run_cite(&service, &paper_id, args.format).await,
        Command::Topics => run_topics(service.storage(), args.format).await,
    }
}
