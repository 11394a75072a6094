use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lit_review::config::{get_config, load_config, Config};
use lit_review::models::ReviewRequest;
use lit_review::pipeline::Orchestrator;
use lit_review::sources::RetrieverRegistry;
use lit_review::ui;

/// lit-review - Automated literature review pipeline
#[derive(Parser, Debug)]
#[command(name = "lit-review")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Retrieve, deduplicate and analyze academic literature", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging (-v for debug, -vv for trace)
    #[arg(long, short, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(long, short)]
    quiet: bool,

    /// Configuration file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Output format for the review result
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum OutputFormat {
    /// Compiled markdown report
    Markdown,
    /// Full pipeline result as JSON
    Json,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a literature review on a topic
    #[command(alias = "r")]
    Run {
        /// Research topic to review
        topic: String,

        /// Maximum number of items to retain after deduplication
        #[arg(long, short, default_value_t = 20)]
        max_items: usize,

        /// Sources to query, in priority order
        #[arg(long, short, value_delimiter = ',')]
        sources: Vec<String>,

        /// Fetch and analyze full-text PDFs
        #[arg(long)]
        enrich: bool,

        /// Earliest publication year to include
        #[arg(long)]
        year_start: Option<i32>,

        /// Latest publication year to include
        #[arg(long)]
        year_end: Option<i32>,

        /// Fail instead of returning an empty result when nothing is found
        #[arg(long)]
        require_items: bool,

        /// Write the output to a file instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Output format
        #[arg(long, short, value_enum, default_value_t = OutputFormat::Markdown)]
        format: OutputFormat,
    },

    /// List the available literature sources
    Sources,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let env_filter = if cli.quiet { "error" } else { log_level };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("lit_review={}", env_filter)),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = match &cli.config {
        Some(path) => load_config(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => get_config().context("loading config from environment")?,
    };

    match cli.command {
        Commands::Run {
            topic,
            max_items,
            sources,
            enrich,
            year_start,
            year_end,
            require_items,
            output,
            format,
        } => {
            let mut request = ReviewRequest::new(topic)
                .max_items(max_items)
                .enrich_full_text(enrich)
                .require_items(require_items);
            if !sources.is_empty() {
                request = request.sources(sources);
            }
            if let (Some(start), Some(end)) = (year_start, year_end) {
                request = request.year_range(start, end);
            }

            run_review(&config, request, output, format, cli.quiet).await
        }
        Commands::Sources => {
            let registry = RetrieverRegistry::new();
            let mut ids: Vec<&str> = registry.ids().collect();
            ids.sort_unstable();
            for id in ids {
                if let Some(retriever) = registry.get(id) {
                    println!("{:<12} {}", id, retriever.name());
                }
            }
            Ok(())
        }
    }
}

async fn run_review(
    config: &Config,
    request: ReviewRequest,
    output: Option<PathBuf>,
    format: OutputFormat,
    quiet: bool,
) -> Result<()> {
    let mut orchestrator = Orchestrator::from_config(config)?;

    let show_progress = !quiet && ui::is_terminal();
    let progress = if show_progress {
        let progress = Arc::new(ui::StageProgress::new());
        orchestrator = orchestrator.with_observer(progress.clone());
        Some(progress)
    } else {
        None
    };

    let started = Instant::now();
    let result = orchestrator.run_review(request).await;
    if let Some(progress) = &progress {
        progress.finish();
    }

    let result = match result {
        Ok(result) => result,
        Err(err) => {
            ui::print_error(&err.to_string());
            return Err(err.into());
        }
    };

    let rendered = match format {
        OutputFormat::Json => serde_json::to_string_pretty(&result)?,
        OutputFormat::Markdown => result
            .report
            .clone()
            .unwrap_or_else(|| format!("No report generated for '{}'.", result.topic)),
    };

    match output {
        Some(path) => {
            std::fs::write(&path, &rendered)
                .with_context(|| format!("writing output to {}", path.display()))?;
            if !quiet {
                ui::print_success(&format!("Output written to {}", path.display()));
            }
        }
        None => println!("{}", rendered),
    }

    if !quiet && format == OutputFormat::Markdown {
        ui::print_run_summary(&result, started.elapsed());
    }

    Ok(())
}
