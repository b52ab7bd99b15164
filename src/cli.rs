use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::info;
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::analyzer;
use crate::config::Config;
use crate::patterns;
use crate::report::JobMetadata;

#[derive(Parser)]
#[command(name = "logtriage")]
#[command(author, version, about = "CI Failure Log Analyzer", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    #[arg(short, long, global = true, default_value_t = false)]
    pretty: bool,

    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    Analyze {
        /// Path to the raw job log ('-' reads from stdin)
        log: PathBuf,

        /// Job name used in the analysis record
        #[arg(short, long, default_value = "job")]
        job: String,

        /// Path to step metadata JSON for timing analysis
        #[arg(short, long)]
        steps: Option<PathBuf>,

        /// Path to the local failure-signature file
        #[arg(short = 'P', long)]
        patterns: Option<PathBuf>,

        /// URL of a community failure-signature file
        #[arg(short, long, env = "LOGTRIAGE_REMOTE_PATTERNS")]
        remote_patterns: Option<String>,

        /// Name of the failed step, when already known
        #[arg(short, long)]
        failed_step: Option<String>,
    },
}

impl Cli {
    #[allow(clippy::too_many_arguments)]
    async fn execute_analyze(
        &self,
        log: &Path,
        job: &str,
        steps: Option<&Path>,
        pattern_path: Option<&Path>,
        remote_patterns: Option<&str>,
        failed_step: Option<&str>,
    ) -> Result<()> {
        let config = Config::load(self.config.as_deref())?;

        let local_path = pattern_path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(&config.patterns.local_path));
        let remote_url = remote_patterns
            .map(str::to_owned)
            .or_else(|| config.patterns.remote_url.clone());

        let catalog = patterns::load_catalog(&local_path, remote_url.as_deref()).await;

        let raw_log = read_log(log)?;
        let metadata = steps.map(read_metadata).transpose()?;

        info!("Analyzing log for job: {}", job);
        let analysis = analyzer::analyze_job(
            job,
            &raw_log,
            &catalog,
            failed_step,
            metadata.as_ref(),
        );

        let json_output = if self.pretty || config.output.pretty {
            serde_json::to_string_pretty(&analysis)?
        } else {
            serde_json::to_string(&analysis)?
        };

        if let Some(output_path) = &self.output {
            std::fs::write(output_path, json_output)?;
            info!("Analysis written to: {}", output_path.display());
        } else {
            println!("{}", json_output);
        }

        Ok(())
    }

    pub async fn execute(&self) -> Result<()> {
        match &self.command {
            Commands::Analyze {
                log,
                job,
                steps,
                patterns,
                remote_patterns,
                failed_step,
            } => {
                self.execute_analyze(
                    log,
                    job,
                    steps.as_deref(),
                    patterns.as_deref(),
                    remote_patterns.as_deref(),
                    failed_step.as_deref(),
                )
                .await
            }
        }
    }
}

fn read_log(path: &Path) -> Result<String> {
    if path.as_os_str() == "-" {
        let mut contents = String::new();
        std::io::stdin()
            .read_to_string(&mut contents)
            .context("Failed to read log from stdin")?;
        return Ok(contents);
    }

    std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read log file: {}", path.display()))
}

fn read_metadata(path: &Path) -> Result<JobMetadata> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read step metadata: {}", path.display()))?;

    serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse step metadata: {}", path.display()))
}
