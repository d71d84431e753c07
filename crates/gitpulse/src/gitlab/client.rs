//! GitLab API client creation and management.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, SecondsFormat};
use url::Url;

use super::convert::{to_commit_detail, to_commit_summary, to_project, to_project_summary};
use super::error::GitLabError;
use super::types::{GitLabBranch, GitLabCommit, GitLabProject, GitLabUser};
use crate::http::reqwest_transport::ReqwestTransport;
use crate::http::{HttpRequest, HttpResponse, HttpTransport};
use crate::platform::{
    self, ApiRateLimiter, CommitDetail, CommitSummary, PlatformClient, PlatformError, Project,
    ProjectSummary, UserInfo,
};

/// Largest `per_page` GitLab accepts.
pub const API_PAGE_SIZE: u32 = 100;

/// GitLab API v4 client over an [`HttpTransport`].
#[derive(Clone)]
pub struct GitLabClient {
    transport: Arc<dyn HttpTransport>,
    host: String,
    api_base: Url,
    token: String,
    /// Optional proactive pacing shared by every request of this client.
    rate_limiter: Option<ApiRateLimiter>,
}

impl GitLabClient {
    /// Create a new GitLab client.
    ///
    /// # Arguments
    ///
    /// * `host` - GitLab host (e.g. "git.example.com" or "https://git.example.com")
    /// * `token` - Personal access token, sent as a bearer credential
    /// * `timeout` - Per-request timeout
    /// * `rate_limiter` - Optional request pacing
    ///
    /// # Example
    ///
    /// ```ignore
    /// let client = GitLabClient::new("git.example.com", "glpat-...", Duration::from_secs(30), None)?;
    /// ```
    pub fn new(
        host: &str,
        token: &str,
        timeout: StdDuration,
        rate_limiter: Option<ApiRateLimiter>,
    ) -> Result<Self, GitLabError> {
        let transport = ReqwestTransport::with_timeout(timeout)
            .map_err(|e| GitLabError::Config(e.to_string()))?;

        Self::new_with_transport(host, token, rate_limiter, Arc::new(transport))
    }

    pub fn new_with_transport(
        host: &str,
        token: &str,
        rate_limiter: Option<ApiRateLimiter>,
        transport: Arc<dyn HttpTransport>,
    ) -> Result<Self, GitLabError> {
        let host = normalize_host(host);
        let api_base = Url::parse(&format!("{host}/api/v4"))
            .map_err(|e| GitLabError::InvalidUrl(format!("{host}: {e}")))?;

        if api_base.cannot_be_a_base() {
            return Err(GitLabError::InvalidUrl(host));
        }

        Ok(Self {
            transport,
            host,
            api_base,
            token: token.to_string(),
            rate_limiter,
        })
    }

    /// Get the host URL.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Wait for rate limiter if one is configured.
    async fn wait_for_rate_limit(&self) {
        if let Some(ref limiter) = self.rate_limiter {
            limiter.wait().await;
        }
    }

    /// Build an API URL from path segments and query parameters.
    ///
    /// Segments and values are percent-encoded.
    fn endpoint(&self, segments: &[&str], query: &[(&str, String)]) -> Result<String, GitLabError> {
        let mut url = self.api_base.clone();
        url.path_segments_mut()
            .map_err(|()| GitLabError::InvalidUrl(self.host.clone()))?
            .pop_if_empty()
            .extend(segments);
        if !query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(query.iter().map(|(k, v)| (*k, v.as_str())));
        }
        Ok(url.into())
    }

    /// Make an authenticated GET request.
    async fn get<T: serde::de::DeserializeOwned>(&self, url: String) -> Result<T, GitLabError> {
        self.wait_for_rate_limit().await;

        let request = HttpRequest {
            url,
            headers: vec![
                ("Accept".to_string(), "application/json".to_string()),
                ("User-Agent".to_string(), "gitpulse".to_string()),
                (
                    "Authorization".to_string(),
                    format!("Bearer {}", self.token),
                ),
            ],
        };

        let response: HttpResponse = self.transport.send(request).await?;

        if !response.is_success() {
            let body = String::from_utf8_lossy(&response.body);
            return Err(GitLabError::from_status(response.status, body.trim()));
        }

        Ok(serde_json::from_slice(&response.body)?)
    }

    /// `GET /user`.
    pub async fn current_user(&self) -> Result<GitLabUser, GitLabError> {
        self.get(self.endpoint(&["user"], &[])?).await
    }

    /// `GET /projects`, one page of non-archived projects ordered by id.
    pub async fn projects_page(
        &self,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<GitLabProject>, GitLabError> {
        let url = self.endpoint(
            &["projects"],
            &[
                ("page", page.to_string()),
                ("per_page", per_page.to_string()),
                ("archived", "false".to_string()),
                ("simple", "true".to_string()),
                ("order_by", "id".to_string()),
                ("sort", "asc".to_string()),
            ],
        )?;
        self.get(url).await
    }

    /// `GET /projects/:id`.
    pub async fn project(&self, project_id: u64) -> Result<GitLabProject, GitLabError> {
        let id = project_id.to_string();
        self.get(self.endpoint(&["projects", &id], &[])?).await
    }

    /// `GET /projects/:id/repository/branches`, one page.
    pub async fn branches_page(
        &self,
        project_id: u64,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<GitLabBranch>, GitLabError> {
        let id = project_id.to_string();
        let url = self.endpoint(
            &["projects", &id, "repository", "branches"],
            &[
                ("page", page.to_string()),
                ("per_page", per_page.min(API_PAGE_SIZE).to_string()),
            ],
        )?;
        self.get(url).await
    }

    /// `GET /projects/:id/repository/commits` for one branch and time range,
    /// one page.
    pub async fn commits_page(
        &self,
        project_id: u64,
        branch: &str,
        since: DateTime<FixedOffset>,
        until: DateTime<FixedOffset>,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<GitLabCommit>, GitLabError> {
        let id = project_id.to_string();
        let url = self.endpoint(
            &["projects", &id, "repository", "commits"],
            &[
                ("ref_name", branch.to_string()),
                ("since", since.to_rfc3339_opts(SecondsFormat::Secs, false)),
                ("until", until.to_rfc3339_opts(SecondsFormat::Secs, false)),
                ("page", page.to_string()),
                ("per_page", per_page.min(API_PAGE_SIZE).to_string()),
            ],
        )?;
        self.get(url).await
    }

    /// `GET /projects/:id/repository/commits/:sha?stats=true`.
    pub async fn commit(&self, project_id: u64, sha: &str) -> Result<GitLabCommit, GitLabError> {
        let id = project_id.to_string();
        let url = self.endpoint(
            &["projects", &id, "repository", "commits", sha],
            &[("stats", "true".to_string())],
        )?;
        self.get(url).await
    }
}

/// Normalize a configured host into `scheme://host[/prefix]`.
///
/// A missing scheme defaults to HTTPS; trailing slashes and an explicit
/// `/api/v4` suffix are removed.
fn normalize_host(host: &str) -> String {
    let trimmed = host.trim().trim_end_matches('/');
    let trimmed = trimmed.strip_suffix("/api/v4").unwrap_or(trimmed);
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    }
}

#[async_trait]
impl PlatformClient for GitLabClient {
    async fn authenticate(&self) -> platform::Result<UserInfo> {
        let user = self.current_user().await?;
        Ok(UserInfo {
            id: user.id,
            username: user.username,
        })
    }

    async fn list_projects_page(
        &self,
        page: u32,
        per_page: u32,
    ) -> platform::Result<Vec<ProjectSummary>> {
        let projects = self.projects_page(page, per_page).await?;
        Ok(projects.iter().map(to_project_summary).collect())
    }

    async fn get_project(&self, project_id: u64) -> platform::Result<Project> {
        self.project(project_id)
            .await
            .map(to_project)
            .map_err(PlatformError::from)
    }

    async fn list_branches_page(
        &self,
        project_id: u64,
        page: u32,
        per_page: u32,
    ) -> platform::Result<Vec<String>> {
        let branches = self.branches_page(project_id, page, per_page).await?;
        Ok(branches.into_iter().map(|b| b.name).collect())
    }

    async fn list_commits_page(
        &self,
        project_id: u64,
        branch: &str,
        since: DateTime<FixedOffset>,
        until: DateTime<FixedOffset>,
        page: u32,
        per_page: u32,
    ) -> platform::Result<Vec<CommitSummary>> {
        let commits = self
            .commits_page(project_id, branch, since, until, page, per_page)
            .await?;
        Ok(commits.into_iter().map(to_commit_summary).collect())
    }

    async fn get_commit(&self, project_id: u64, sha: &str) -> platform::Result<CommitDetail> {
        self.commit(project_id, sha)
            .await
            .map(to_commit_detail)
            .map_err(PlatformError::from)
    }
}
