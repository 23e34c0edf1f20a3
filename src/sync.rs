use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{error, info, warn};

use crate::config::RunConfig;
use crate::github::{CreateOutcome, InlineComment, PullRequestHost};
use crate::partition::Partition;
use crate::render;
use crate::types::RunResult;

/// Pushes one run's partition to the pull request: stale-annotation
/// cleanup, then inline submission, then the aggregated comment.
///
/// Strictly sequential. Cleanup must complete before anything is
/// created (that is what makes re-runs idempotent), and the counters
/// must reflect a happens-before relation with every attempt.
pub struct Synchronizer<'a> {
    host: &'a dyn PullRequestHost,
    config: &'a RunConfig,
}

impl<'a> Synchronizer<'a> {
    pub fn new(host: &'a dyn PullRequestHost, config: &'a RunConfig) -> Self {
        Self { host, config }
    }

    pub async fn run(&self, partition: &Partition) -> Result<RunResult> {
        let mut result = RunResult {
            deleted: self.cleanup().await?,
            ..RunResult::default()
        };

        let total = partition.inline.len();
        for (i, candidate) in partition.inline.iter().enumerate() {
            if self.post_inline(candidate).await {
                result.inline_posted += 1;
                info!(
                    "posted inline comment {}/{} at {}:{}",
                    i + 1,
                    total,
                    candidate.path,
                    candidate.line
                );
            } else {
                result.inline_failed += 1;
            }
            if i + 1 < total {
                tokio::time::sleep(Duration::from_millis(self.config.limits.post_delay_ms)).await;
            }
        }

        if !partition.overflow.is_empty() {
            match self.post_overflow(partition).await {
                true => result.overflow_posted = true,
                false => result.overflow_failed = true,
            }
        }

        info!(
            "run complete: {} deleted, {} inline posted, {} inline failed, overflow posted: {}",
            result.deleted, result.inline_posted, result.inline_failed, result.overflow_posted
        );
        Ok(result)
    }

    /// Delete every comment from a previous run, identified solely by
    /// the marker substring. Listing failures are fatal (a partial view
    /// would break idempotence); per-comment delete failures are not.
    async fn cleanup(&self) -> Result<usize> {
        let review = self
            .host
            .list_review_comments()
            .await
            .context("failed to list existing review comments")?;
        let issue = self
            .host
            .list_issue_comments()
            .await
            .context("failed to list existing issue comments")?;

        let mut deleted = 0;
        for comment in review.iter().filter(|c| c.body.contains(render::MARKER)) {
            match self.host.delete_review_comment(comment.id).await {
                Ok(()) => deleted += 1,
                Err(err) => warn!(
                    "failed to delete stale review comment {} ({}): {err:#}",
                    comment.id, comment.url
                ),
            }
        }
        for comment in issue.iter().filter(|c| c.body.contains(render::MARKER)) {
            match self.host.delete_issue_comment(comment.id).await {
                Ok(()) => deleted += 1,
                Err(err) => warn!(
                    "failed to delete stale issue comment {} ({}): {err:#}",
                    comment.id, comment.url
                ),
            }
        }
        info!("cleanup removed {deleted} stale annotation(s)");
        Ok(deleted)
    }

    /// Submit one candidate: Pending -> Submitting -> Succeeded, or
    /// RateLimited -> (backoff) -> Submitting again up to the attempt
    /// budget, or Failed. Returns whether it succeeded.
    async fn post_inline(&self, candidate: &crate::types::AnnotationCandidate) -> bool {
        let comment = InlineComment::new(
            candidate.body.clone(),
            self.config.commit_sha.clone(),
            candidate.path.clone(),
            candidate.line,
        );
        let attempts = self.config.limits.rate_limit_max_attempts.max(1);

        for attempt in 1..=attempts {
            match self.host.create_inline_comment(&comment).await {
                Ok(CreateOutcome::Created) => return true,
                Ok(CreateOutcome::RateLimited) => {
                    warn!(
                        "rate limited posting {}:{} (attempt {attempt}/{attempts})",
                        candidate.path, candidate.line
                    );
                    if attempt < attempts {
                        self.backoff().await;
                    }
                }
                Ok(CreateOutcome::Rejected { status, body }) => {
                    error!(
                        "comment at {}:{} rejected with {status}: {body}",
                        candidate.path, candidate.line
                    );
                    return false;
                }
                Err(err) => {
                    error!(
                        "comment at {}:{} failed to send: {err:#}",
                        candidate.path, candidate.line
                    );
                    return false;
                }
            }
        }
        error!(
            "comment at {}:{} still rate limited after {attempts} attempt(s)",
            candidate.path, candidate.line
        );
        false
    }

    async fn post_overflow(&self, partition: &Partition) -> bool {
        let body = render::overflow_body(
            &partition.overflow,
            self.config.limits.overflow_message_budget,
        );
        let attempts = self.config.limits.rate_limit_max_attempts.max(1);

        for attempt in 1..=attempts {
            match self.host.create_issue_comment(&body).await {
                Ok(CreateOutcome::Created) => {
                    info!(
                        "posted aggregated comment with {} finding(s)",
                        partition.overflow.len()
                    );
                    return true;
                }
                Ok(CreateOutcome::RateLimited) => {
                    warn!("rate limited posting the aggregated comment (attempt {attempt}/{attempts})");
                    if attempt < attempts {
                        self.backoff().await;
                    }
                }
                Ok(CreateOutcome::Rejected { status, body }) => {
                    error!("aggregated comment rejected with {status}: {body}");
                    return false;
                }
                Err(err) => {
                    error!("aggregated comment failed to send: {err:#}");
                    return false;
                }
            }
        }
        error!("aggregated comment still rate limited after {attempts} attempt(s)");
        false
    }

    async fn backoff(&self) {
        tokio::time::sleep(Duration::from_millis(self.config.limits.rate_limit_backoff_ms)).await;
    }
}
