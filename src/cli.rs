use clap::{Parser, Subcommand};

use crate::config::DEFAULT_API_BASE;

// Display order for the token option (placed at top of help text)
const TOKEN_DISPLAY_ORDER: usize = 0;
// Display order for log level option (placed at end of help text)
const LOG_LEVEL_DISPLAY_ORDER: usize = 100;

/// CLI arguments
#[derive(Parser)]
#[command(
    name = "diffnote",
    version,
    about = "Posts static-analysis findings as pull request annotations",
    long_about = None
)]
pub struct Cli {
    /// Log level (see https://docs.rs/tracing-subscriber/latest/tracing_subscriber/filter/struct.EnvFilter.html)
    /// [env: DIFFNOTE_LOG=] [default: info]
    #[arg(
        long,
        env = "DIFFNOTE_LOG",
        default_value = "info",
        global = true,
        hide_default_value = true,
        hide_env = true,
        display_order = LOG_LEVEL_DISPLAY_ORDER,
        verbatim_doc_comment
    )]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand)]
pub enum Commands {
    /// Annotate a pull request with a scan report's findings
    Annotate(AnnotateArgs),
}

/// Arguments for the annotate command
#[derive(Parser, Debug)]
pub struct AnnotateArgs {
    /// API token for the hosting platform
    #[arg(long, env = "GITHUB_TOKEN", display_order = TOKEN_DISPLAY_ORDER)]
    pub token: String,

    /// Repository in owner/name form
    #[arg(long, env = "GITHUB_REPOSITORY")]
    pub repo: String,

    /// Pull request number
    #[arg(long, env = "PR_NUMBER")]
    pub pr: u64,

    /// Head commit SHA the inline comments attach to
    #[arg(long, env = "COMMIT_ID")]
    pub commit: String,

    /// Path to the scan report JSON
    #[arg(long, default_value = "apexScanResults.json")]
    pub report: String,

    /// Path to an optional tuning config file
    #[arg(long, default_value = "diffnote.toml")]
    pub config: String,

    /// API base URL (self-hosted instances)
    #[arg(long, default_value = DEFAULT_API_BASE, hide_default_value = true)]
    pub api_base: String,

    /// Dry run: resolve and partition the findings without posting
    #[arg(long)]
    pub dry_run: bool,
}
