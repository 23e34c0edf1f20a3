mod cli;
mod config;
mod diff;
mod github;
mod matcher;
mod partition;
mod render;
mod report;
mod sync;
mod types;

use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};

use cli::{AnnotateArgs, Cli, Commands};
use config::{Limits, RunConfig};
use diff::DiffIndex;
use github::{GithubClient, PullRequestHost};
use sync::Synchronizer;
use types::RunResult;

const EXIT_FAILURE: i32 = 1;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(&cli.log_level))
        .init();

    match &cli.command {
        Commands::Annotate(args) => {
            let result = annotate(args).await.unwrap_or_else(|err| {
                error!("{err:#}");
                std::process::exit(EXIT_FAILURE);
            });
            if result.inline_failed > 0 || result.overflow_failed {
                error!(
                    "{} comment(s) failed permanently",
                    result.inline_failed + usize::from(result.overflow_failed)
                );
                std::process::exit(EXIT_FAILURE);
            }
        }
    }
}

async fn annotate(args: &AnnotateArgs) -> Result<RunResult> {
    let limits = Limits::load(Path::new(&args.config))?;
    let config = RunConfig {
        token: args.token.clone(),
        repository: args.repo.clone(),
        pr_number: args.pr,
        commit_sha: args.commit.clone(),
        api_base: args.api_base.clone(),
        limits,
    };
    info!(
        "annotating {}#{} at {} from {}",
        config.repository, config.pr_number, config.commit_sha, args.report
    );

    let violations = report::load(Path::new(&args.report))?;

    let client = GithubClient::new(config.clone())?;
    let changed = client
        .list_changed_files()
        .await
        .context("failed to fetch the changed-files list")?;
    let index = DiffIndex::build(&changed);
    info!(
        "{} changed file(s), {} with commentable diffs",
        changed.len(),
        index.len()
    );

    let split = partition::partition(&violations, &index, config.limits.max_inline);
    info!(
        "{} inline candidate(s), {} for the aggregated comment",
        split.inline.len(),
        split.overflow.len()
    );

    if args.dry_run {
        for candidate in &split.inline {
            info!(
                "would post at {}:{} ({}/{})",
                candidate.path, candidate.line, candidate.engine, candidate.rule
            );
        }
        if !split.overflow.is_empty() {
            info!(
                "would post one aggregated comment with {} finding(s)",
                split.overflow.len()
            );
        }
        info!("dry run - no comments were deleted or created");
        return Ok(RunResult::default());
    }

    Synchronizer::new(&client, &config).run(&split).await
}
