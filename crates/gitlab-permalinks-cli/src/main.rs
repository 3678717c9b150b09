// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2025 Waddle Social

//! glpermalinks - rewrite GitLab permalinks in a message into code previews.
//!
//! Reads the message from the command line or stdin and writes the result
//! to stdout. Logs go to stderr.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use gitlab_permalinks::{GitLabClient, PermalinkRewriter};
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

mod config;
mod logging;

use config::Config;
use logging::LogFormat;

/// Rewrite GitLab permalinks into inline code previews
#[derive(Parser)]
#[command(name = "glpermalinks")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Config file (default: ~/.config/gitlab-permalinks/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// GitLab instance URL, overrides config and GITLAB_URL
    #[arg(long, global = true)]
    gitlab_url: Option<String>,

    /// Log filter, e.g. "debug" or "gitlab_permalinks=trace"
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Log output format
    #[arg(long, global = true, value_enum)]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rewrite a message and print the result
    Rewrite {
        /// Message text (read from stdin when omitted)
        message: Option<String>,
    },
    /// List the permalinks that would be rewritten, without fetching
    Scan {
        /// Message text (read from stdin when omitted)
        message: Option<String>,

        /// Print candidates as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(url) = cli.gitlab_url {
        config.gitlab.base_url = url;
    }

    let level = cli.log_level.as_deref().unwrap_or(&config.logging.level);
    logging::init(level, cli.log_format.unwrap_or(config.logging.format))?;

    let client = GitLabClient::new(config.gitlab.clone()).context("Failed to create GitLab client")?;
    let rewriter = PermalinkRewriter::new(
        Arc::new(client),
        &config.gitlab.base_url,
        config.preview.clone(),
    )
    .context("Failed to create rewriter")?;

    match cli.command {
        Commands::Rewrite { message } => {
            let (message, from_stdin) = read_message(message)?;
            let rewritten = rewriter.rewrite(&message).await;

            let mut stdout = io::stdout().lock();
            stdout.write_all(rewritten.as_bytes())?;
            if !from_stdin {
                stdout.write_all(b"\n")?;
            }
            stdout.flush()?;
        }
        Commands::Scan { message, json } => {
            let (message, _) = read_message(message)?;
            let candidates = rewriter.candidates(&message);
            info!(host = rewriter.grammar().host(), count = candidates.len(), "Scanned message");

            if json {
                println!("{}", serde_json::to_string_pretty(&candidates)?);
            } else {
                for r in &candidates {
                    println!(
                        "{}\t{}@{}:{}\t{}",
                        r.index,
                        r.info.project_path(),
                        r.info.commit,
                        r.info.path,
                        if r.info.line.is_empty() { "-" } else { r.info.line.as_str() }
                    );
                }
            }
        }
    }

    Ok(())
}

/// The message argument, or all of stdin.
fn read_message(arg: Option<String>) -> Result<(String, bool)> {
    match arg {
        Some(message) => Ok((message, false)),
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read message from stdin")?;
            Ok((buf, true))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_scan_with_globals() {
        let cli = Cli::parse_from([
            "glpermalinks",
            "scan",
            "--json",
            "--gitlab-url",
            "https://gitlab.example.com",
            "hello",
        ]);
        assert_eq!(cli.gitlab_url.as_deref(), Some("https://gitlab.example.com"));
        match cli.command {
            Commands::Scan { message, json } => {
                assert_eq!(message.as_deref(), Some("hello"));
                assert!(json);
            }
            Commands::Rewrite { .. } => panic!("expected scan"),
        }
    }

    #[test]
    fn test_parse_rewrite_from_stdin() {
        let cli = Cli::parse_from(["glpermalinks", "--log-format", "json", "rewrite"]);
        assert_eq!(cli.log_format, Some(LogFormat::Json));
        assert!(matches!(cli.command, Commands::Rewrite { message: None }));
    }
}
