//! crawl-history main entry point
//!
//! Command-line access to persisted crawl history: record counts and the
//! failed requests a spider would retry on its next run.

use anyhow::Context;
use clap::{Parser, Subcommand};
use crawl_history::config::{load_config, Config};
use crawl_history::{HistoryTracker, Provider};
use std::io::{self, Write};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// crawl-history: inspect success/failure history of a crawler
#[derive(Parser, Debug)]
#[command(name = "crawl-history")]
#[command(version = "1.0.0")]
#[command(about = "Inspect persisted crawl history", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,

    /// Backend to read from instead of the configured one ("mgo", "mysql", "file")
    #[arg(long, global = true)]
    provider: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show success and failure counts
    Stats,

    /// Print the failed requests of a spider as JSON lines
    Pull {
        /// Spider whose failures to list
        #[arg(value_name = "SPIDER")]
        spider: String,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let config = load_config(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;

    let provider = cli
        .provider
        .as_deref()
        .map(Provider::from_name)
        .unwrap_or(config.history.provider);

    let tracker = HistoryTracker::new(&config).context("failed to open history backends")?;

    let mut out = io::stdout().lock();
    match cli.command {
        Command::Stats => handle_stats(&mut out, &config, &tracker, provider),
        Command::Pull { spider } => handle_pull(&mut out, &tracker, provider, &spider),
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("crawl_history=info,warn"),
            1 => EnvFilter::new("crawl_history=debug,info"),
            2 => EnvFilter::new("crawl_history=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles `stats`: loads both histories and prints their counts
fn handle_stats<W: Write>(
    out: &mut W,
    config: &Config,
    tracker: &HistoryTracker,
    provider: Provider,
) -> anyhow::Result<()> {
    tracker.read_success(provider, true);
    tracker.read_failure(provider, true);
    let stats = tracker.stats();

    writeln!(out, "=== Crawl History ===\n")?;
    writeln!(out, "Provider: {}", provider)?;
    if provider == Provider::File {
        writeln!(out, "  Success file: {}", config.history.success_file().display())?;
        writeln!(out, "  Failure file: {}", config.history.failure_file().display())?;
    }

    writeln!(out, "\nSucceeded requests: {}", stats.successes)?;
    writeln!(out, "Failed requests: {}", stats.total_failures())?;
    for (spider, count) in &stats.failures {
        writeln!(out, "  - {}: {}", spider, count)?;
    }

    Ok(())
}

/// Handles `pull`: prints the spider's previously failed requests
fn handle_pull<W: Write>(
    out: &mut W,
    tracker: &HistoryTracker,
    provider: Provider,
    spider: &str,
) -> anyhow::Result<()> {
    tracker.read_failure(provider, true);

    let requests = tracker.pull_failure(spider);
    tracing::info!("{} failed requests for spider {}", requests.len(), spider);

    for request in &requests {
        writeln!(out, "{}", serde_json::to_string(request)?)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crawl_history::config::parse_config;
    use crawl_history::Request;
    use tempfile::TempDir;

    fn test_config(dir: &TempDir) -> Config {
        let toml = format!(
            "[history]\ncache-dir = \"{}\"\nfile-name = \"history\"\n",
            dir.path().display()
        );
        parse_config(&toml).unwrap()
    }

    fn seed(config: &Config) {
        let writer = HistoryTracker::new(config).unwrap();
        writer.upsert_success(&Request::new("news", "https://example.com/ok"));
        writer.upsert_failure(&Request::new("news", "https://example.com/a"));
        writer.upsert_failure(&Request::new("blogs", "https://example.com/b"));
        writer.flush_success(Provider::File);
        writer.flush_failure(Provider::File);
    }

    #[test]
    fn test_stats_output() {
        let dir = TempDir::new().unwrap();
        let config = test_config(&dir);
        seed(&config);

        let tracker = HistoryTracker::new(&config).unwrap();
        let mut out = Vec::new();
        handle_stats(&mut out, &config, &tracker, Provider::File).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.contains("Provider: file"));
        assert!(text.contains("Succeeded requests: 1"));
        assert!(text.contains("Failed requests: 2"));
        assert!(text.contains("  - blogs: 1"));
        assert!(text.contains("  - news: 1"));
    }

    #[test]
    fn test_pull_prints_json_lines() {
        let dir = TempDir::new().unwrap();
        let config = test_config(&dir);
        seed(&config);

        let tracker = HistoryTracker::new(&config).unwrap();
        let mut out = Vec::new();
        handle_pull(&mut out, &tracker, Provider::File, "news").unwrap();
        let text = String::from_utf8(out).unwrap();

        let pulled: Vec<Request> = text
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(pulled, vec![Request::new("news", "https://example.com/a")]);
    }

    #[test]
    fn test_pull_unknown_spider_prints_nothing() {
        let dir = TempDir::new().unwrap();
        let config = test_config(&dir);
        seed(&config);

        let tracker = HistoryTracker::new(&config).unwrap();
        let mut out = Vec::new();
        handle_pull(&mut out, &tracker, Provider::File, "nobody").unwrap();

        assert!(out.is_empty());
    }
}
