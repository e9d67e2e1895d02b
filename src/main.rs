use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use quantbull_pipeline::config::AppConfig;
use quantbull_pipeline::crawler::{JsonFileSource, RecordSource};
use quantbull_pipeline::logging::{init_logging, LoggingOptions};
use quantbull_pipeline::types::{FetchParams, Record};
use quantbull_pipeline::{registry, tasks, TaskReport};

#[derive(Parser)]
#[command(name = "quantbull-pipeline")]
#[command(about = "Crawl and clean market, news, factor, content and user records")]
#[command(version)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, global = true, default_value = "config.toml")]
    config: PathBuf,

    /// Expose Prometheus metrics on this address while running
    #[arg(long, global = true)]
    metrics_addr: Option<SocketAddr>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Clean a JSON file of records
    Clean {
        /// Cleaner kind: market, market-quant, news, content, factor, user
        #[arg(long)]
        kind: String,
        /// JSON array (or {"data": [...]}) of records
        #[arg(long)]
        input: PathBuf,
        /// Write the cleaned records here instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Run a crawler over a file-backed source, optionally cleaning the result
    Crawl {
        /// Crawler name: market, market-quant, news, factor, prompt, vector, wechat, external
        #[arg(long)]
        source: String,
        /// JSON array (or {"data": [...]}) standing in for the upstream
        #[arg(long)]
        input: PathBuf,
        /// Clean the crawled records with this cleaner kind
        #[arg(long)]
        clean_with: Option<String>,
        /// Comma-separated stock codes passed to the fetch step
        #[arg(long, value_delimiter = ',')]
        codes: Vec<String>,
        /// Keep at most this many fetched records
        #[arg(long)]
        limit: Option<usize>,
        /// Write the resulting records here
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

fn write_records(records: &[Record], output: Option<&PathBuf>) -> Result<()> {
    let json = serde_json::to_string_pretty(records)?;
    match output {
        Some(path) => {
            std::fs::write(path, json)
                .with_context(|| format!("writing records to {}", path.display()))?;
            info!("Wrote {} records to {}", records.len(), path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn print_report(report: &TaskReport) -> Result<()> {
    eprintln!("{}", serde_json::to_string_pretty(report)?);
    if !report.is_success() {
        warn!("Task {} finished with an error", report.task);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?
        .with_env_overrides();

    let _guard = init_logging(&LoggingOptions {
        level: config.log_level.clone(),
        log_dir: config.log_dir.clone(),
    });

    if let Some(addr) = cli.metrics_addr {
        quantbull_pipeline::metrics::install_prometheus(addr)?;
        info!("Serving metrics on {}", addr);
    }

    match cli.command {
        Commands::Clean {
            kind,
            input,
            output,
        } => {
            let cleaner = registry::build_cleaner(&kind, &config)?;
            let records = JsonFileSource::new(&input)
                .fetch(&FetchParams::default())
                .await?;
            let report = tasks::clean_records(&format!("clean_{kind}"), cleaner.as_ref(), records);
            print_report(&report)?;
            write_records(&report.records, output.as_ref())?;
        }
        Commands::Crawl {
            source,
            input,
            clean_with,
            codes,
            limit,
            output,
        } => {
            let file_source: Arc<dyn RecordSource> = Arc::new(JsonFileSource::new(&input));
            let crawler = registry::build_crawler(&source, file_source, &config.crawler)?;
            let params = FetchParams {
                codes,
                limit,
                ..FetchParams::default()
            };

            let task = format!("crawl_{source}");
            let report = match clean_with {
                Some(kind) => {
                    let cleaner = registry::build_cleaner(&kind, &config)?;
                    tasks::collect_and_clean(&task, crawler.as_ref(), cleaner.as_ref(), &params)
                        .await
                }
                None => tasks::collect(&task, crawler.as_ref(), &params).await,
            };
            print_report(&report)?;
            if report.is_success() {
                write_records(&report.records, output.as_ref())?;
            } else {
                anyhow::bail!(
                    "crawl failed: {}",
                    report.error.as_deref().unwrap_or("unknown error")
                );
            }
        }
    }

    Ok(())
}
