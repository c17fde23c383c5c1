//! CLI for the upo upload orchestrator.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use upo_core::config;

use commands::{run_check, run_completions, run_config, run_man, run_upload, UploadOverrides};

/// Top-level CLI for the upo upload orchestrator.
#[derive(Debug, Parser)]
#[command(name = "upo")]
#[command(about = "upo: validate and upload files with bounded concurrency", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Validate files, upload the accepted ones and print each outcome.
    Upload {
        /// Files to upload, in order.
        #[arg(required = true, value_name = "PATH")]
        paths: Vec<PathBuf>,

        /// Use the simulated transport instead of HTTP.
        #[arg(long)]
        simulate: bool,

        /// Upload at most N files at a time (overrides the config file).
        #[arg(long, value_name = "N")]
        max_concurrent: Option<usize>,

        /// Start the next file as soon as any upload finishes instead of
        /// waiting for the whole chunk.
        #[arg(long)]
        pool: bool,

        /// Upload endpoint (overrides `[http].endpoint`).
        #[arg(long, value_name = "URL")]
        endpoint: Option<String>,
    },

    /// Check files against the configured limits without uploading.
    Check {
        #[arg(required = true, value_name = "PATH")]
        paths: Vec<PathBuf>,
    },

    /// Print the effective configuration and its path.
    Config,

    /// Print a shell completion script.
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },

    /// Print the man page (roff).
    Man,
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();

        match cli.command {
            CliCommand::Upload {
                paths,
                simulate,
                max_concurrent,
                pool,
                endpoint,
            } => {
                let mut cfg = config::load_or_init()?;
                UploadOverrides {
                    max_concurrent,
                    pool,
                    endpoint,
                }
                .apply(&mut cfg);
                tracing::debug!("effective config: {:?}", cfg);
                run_upload(&cfg, &paths, simulate).await?;
            }
            CliCommand::Check { paths } => {
                let cfg = config::load_or_init()?;
                run_check(&cfg.orchestrator, &paths).await?;
            }
            CliCommand::Config => run_config()?,
            CliCommand::Completions { shell } => run_completions(shell),
            CliCommand::Man => run_man()?,
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
