use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::RunConfig;

const API_TIMEOUT_SECS: u64 = 60;
const PAGE_SIZE: usize = 100;

/// Maximum length for response body content carried in error messages
const MAX_ERROR_BODY_LEN: usize = 400;

/// One entry of the PR's changed-file list. `patch` is absent for
/// renamed, removed, and binary files.
#[derive(Debug, Clone, Deserialize)]
pub struct ChangedFile {
    pub filename: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub patch: Option<String>,
}

/// An existing PR comment, review-level or issue-level
#[derive(Debug, Clone, Deserialize)]
pub struct PrComment {
    pub id: u64,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub body: String,
}

/// Inline comment creation request, addressed by new-file line
#[derive(Debug, Clone, Serialize)]
pub struct InlineComment {
    pub body: String,
    pub commit_id: String,
    pub path: String,
    pub line: u32,
    pub side: &'static str,
}

impl InlineComment {
    pub fn new(body: String, commit_id: String, path: String, line: u32) -> Self {
        Self {
            body,
            commit_id,
            path,
            line,
            side: "RIGHT",
        }
    }
}

/// What a comment-creation attempt came back with. Transport failures
/// surface as `Err` from the call itself.
#[derive(Debug, Clone)]
pub enum CreateOutcome {
    Created,
    /// Secondary rate limit: the caller backs off and retries
    RateLimited,
    /// Any other non-success status: permanent for this item
    Rejected { status: u16, body: String },
}

/// The hosting platform, as seen by the engine: list what exists,
/// create, delete. Injected so the run logic is testable without a
/// network; the run itself stays fully sequential.
#[async_trait]
pub trait PullRequestHost {
    async fn list_changed_files(&self) -> Result<Vec<ChangedFile>>;
    async fn list_review_comments(&self) -> Result<Vec<PrComment>>;
    async fn list_issue_comments(&self) -> Result<Vec<PrComment>>;
    async fn create_inline_comment(&self, comment: &InlineComment) -> Result<CreateOutcome>;
    async fn create_issue_comment(&self, body: &str) -> Result<CreateOutcome>;
    async fn delete_review_comment(&self, id: u64) -> Result<()>;
    async fn delete_issue_comment(&self, id: u64) -> Result<()>;
}

/// GitHub REST implementation of [`PullRequestHost`]
pub struct GithubClient {
    http: reqwest::Client,
    config: RunConfig,
}

impl GithubClient {
    pub fn new(config: RunConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(API_TIMEOUT_SECS))
            .build()
            .context("failed to create HTTP client")?;
        Ok(Self { http, config })
    }

    fn url(&self, tail: &str) -> String {
        format!(
            "{}/repos/{}/{}",
            self.config.api_base, self.config.repository, tail
        )
    }

    fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        self.http
            .request(method, url)
            .header("Accept", "application/vnd.github+json")
            .header("Authorization", format!("Bearer {}", self.config.token))
            .header("User-Agent", "diffnote")
            .header("X-GitHub-Api-Version", "2022-11-28")
    }

    /// Fetch every page of a list endpoint. Cleanup correctness depends
    /// on seeing every existing comment, so short pages end the loop,
    /// not a fixed page count.
    async fn list_all<T: serde::de::DeserializeOwned>(&self, tail: &str) -> Result<Vec<T>> {
        let url = self.url(tail);
        let mut items = Vec::new();
        for page in 1.. {
            let resp = self
                .request(reqwest::Method::GET, &url)
                .query(&[("per_page", PAGE_SIZE.to_string()), ("page", page.to_string())])
                .send()
                .await
                .with_context(|| format!("GET {url} failed"))?;

            let status = resp.status();
            if !status.is_success() {
                let body = truncate_body(&resp.text().await.unwrap_or_default());
                anyhow::bail!("GET {url} returned {status}: {body}");
            }

            let mut page_items: Vec<T> = resp
                .json()
                .await
                .with_context(|| format!("GET {url} returned unparsable JSON"))?;
            let short_page = page_items.len() < PAGE_SIZE;
            items.append(&mut page_items);
            if short_page {
                break;
            }
        }
        Ok(items)
    }

    async fn create_comment<B: Serialize>(&self, tail: &str, payload: &B) -> Result<CreateOutcome> {
        let url = self.url(tail);
        let resp = self
            .request(reqwest::Method::POST, &url)
            .json(payload)
            .send()
            .await
            .with_context(|| format!("POST {url} failed"))?;

        let status = resp.status();
        if status == StatusCode::CREATED {
            return Ok(CreateOutcome::Created);
        }

        let body = truncate_body(&resp.text().await.unwrap_or_default());
        if is_secondary_rate_limit(status, &body) {
            debug!("POST {url} hit the secondary rate limit");
            return Ok(CreateOutcome::RateLimited);
        }
        Ok(CreateOutcome::Rejected {
            status: status.as_u16(),
            body,
        })
    }

    async fn delete(&self, tail: &str) -> Result<()> {
        let url = self.url(tail);
        let resp = self
            .request(reqwest::Method::DELETE, &url)
            .send()
            .await
            .with_context(|| format!("DELETE {url} failed"))?;

        let status = resp.status();
        if !status.is_success() {
            let body = truncate_body(&resp.text().await.unwrap_or_default());
            anyhow::bail!("DELETE {url} returned {status}: {body}");
        }
        Ok(())
    }
}

#[async_trait]
impl PullRequestHost for GithubClient {
    async fn list_changed_files(&self) -> Result<Vec<ChangedFile>> {
        self.list_all(&format!("pulls/{}/files", self.config.pr_number))
            .await
    }

    async fn list_review_comments(&self) -> Result<Vec<PrComment>> {
        self.list_all(&format!("pulls/{}/comments", self.config.pr_number))
            .await
    }

    async fn list_issue_comments(&self) -> Result<Vec<PrComment>> {
        self.list_all(&format!("issues/{}/comments", self.config.pr_number))
            .await
    }

    async fn create_inline_comment(&self, comment: &InlineComment) -> Result<CreateOutcome> {
        self.create_comment(&format!("pulls/{}/comments", self.config.pr_number), comment)
            .await
    }

    async fn create_issue_comment(&self, body: &str) -> Result<CreateOutcome> {
        let payload = serde_json::json!({ "body": body });
        self.create_comment(
            &format!("issues/{}/comments", self.config.pr_number),
            &payload,
        )
        .await
    }

    async fn delete_review_comment(&self, id: u64) -> Result<()> {
        self.delete(&format!("pulls/comments/{id}")).await
    }

    async fn delete_issue_comment(&self, id: u64) -> Result<()> {
        self.delete(&format!("issues/comments/{id}")).await
    }
}

/// GitHub reports secondary rate limiting as 403 with a telltale
/// message rather than 429.
fn is_secondary_rate_limit(status: StatusCode, body: &str) -> bool {
    status == StatusCode::FORBIDDEN && body.to_ascii_lowercase().contains("secondary rate limit")
}

fn truncate_body(body: &str) -> String {
    if body.len() > MAX_ERROR_BODY_LEN {
        let cut: String = body.chars().take(MAX_ERROR_BODY_LEN).collect();
        format!("{cut}... (truncated)")
    } else {
        body.to_string()
    }
}
