use chrono::{DateTime, SecondsFormat, Utc};
use log::{debug, info, warn};
use octocrab::Octocrab;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::ops::ControlFlow;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::time::{sleep, Duration};

use crate::config::{Credentials, FetchConfig, RateLimitConfig};
use crate::error::{GitHubToolsError, Result};
use crate::filters::IssueState;
use crate::types::{CommitRecord, ForgeItem, ItemState, Repository, TagRecord, Team, TeamMember};

const PER_PAGE: usize = 100;

#[derive(Debug, Deserialize)]
struct UserPayload {
    login: String,
}

#[derive(Debug, Deserialize)]
struct UserProfilePayload {
    login: String,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LabelPayload {
    name: String,
}

#[derive(Debug, Deserialize)]
struct IssuePayload {
    number: u64,
    title: String,
    state: String,
    user: Option<UserPayload>,
    #[serde(default)]
    labels: Vec<LabelPayload>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    closed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    closed_by: Option<UserPayload>,
    html_url: String,
    #[serde(default)]
    pull_request: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct PullPayload {
    number: u64,
    #[serde(default)]
    title: Option<String>,
    state: String,
    user: Option<UserPayload>,
    #[serde(default)]
    labels: Vec<LabelPayload>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    closed_at: Option<DateTime<Utc>>,
    merged_at: Option<DateTime<Utc>>,
    html_url: String,
    /// Only present on single pull requests, null until the forge computed it.
    #[serde(default)]
    mergeable: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct ShaPayload {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct TagPayload {
    name: String,
    commit: ShaPayload,
}

#[derive(Debug, Deserialize)]
struct GitDatePayload {
    date: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct GitCommitPayload {
    author: Option<GitDatePayload>,
    committer: Option<GitDatePayload>,
}

#[derive(Debug, Deserialize)]
struct CommitPayload {
    sha: String,
    commit: GitCommitPayload,
}

#[derive(Debug, Deserialize)]
struct BranchPayload {
    commit: ShaPayload,
}

#[derive(Debug, Deserialize)]
struct RepoPayload {
    open_issues_count: u64,
}

#[derive(Debug, Deserialize)]
struct TeamPayload {
    name: String,
    slug: String,
}

fn parse_state(state: &str) -> ItemState {
    if state.eq_ignore_ascii_case("closed") {
        ItemState::Closed
    } else {
        ItemState::Open
    }
}

fn login(user: Option<UserPayload>) -> String {
    user.map(|u| u.login)
        .unwrap_or_else(|| "unknown".to_string())
}

/// Issue listing route. Pages are ordered by creation time, which updates
/// made while the listing is walked cannot reorder.
fn issues_route(repo: &Repository, state: IssueState, since: Option<DateTime<Utc>>) -> String {
    let mut route = format!(
        "/repos/{}/{}/issues?state={}&sort=created&direction=asc",
        repo.owner,
        repo.name,
        state.as_query()
    );
    if let Some(since) = since {
        route.push_str("&since=");
        route.push_str(&iso8601(since));
    }
    route
}

fn iso8601(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

impl From<IssuePayload> for ForgeItem {
    fn from(issue: IssuePayload) -> Self {
        Self {
            number: issue.number,
            title: issue.title,
            state: parse_state(&issue.state),
            author: login(issue.user),
            closed_by: issue.closed_by.map(|u| u.login),
            labels: issue.labels.into_iter().map(|l| l.name).collect(),
            created_at: issue.created_at,
            updated_at: issue.updated_at,
            closed_at: issue.closed_at,
            merged_at: None,
            html_url: issue.html_url,
            is_pull_request: issue.pull_request.is_some(),
        }
    }
}

impl From<PullPayload> for ForgeItem {
    fn from(pr: PullPayload) -> Self {
        Self {
            number: pr.number,
            title: pr.title.unwrap_or_default(),
            state: parse_state(&pr.state),
            author: login(pr.user),
            closed_by: None,
            labels: pr.labels.into_iter().map(|l| l.name).collect(),
            created_at: pr.created_at,
            updated_at: pr.updated_at,
            closed_at: pr.closed_at.or(pr.merged_at),
            merged_at: pr.merged_at,
            html_url: pr.html_url,
            is_pull_request: true,
        }
    }
}

impl TryFrom<CommitPayload> for CommitRecord {
    type Error = GitHubToolsError;

    fn try_from(commit: CommitPayload) -> Result<Self> {
        let committer = commit.commit.committer.map(|c| c.date);
        let author = commit.commit.author.map(|a| a.date);
        match (author.or(committer), committer.or(author)) {
            (Some(author_date), Some(committer_date)) => Ok(Self {
                sha: commit.sha,
                author_date,
                committer_date,
            }),
            _ => Err(GitHubToolsError::ApiError(format!(
                "commit {} carries no dates",
                commit.sha
            ))),
        }
    }
}

pub struct GitHubClient {
    octocrab: Octocrab,
    rate_limit_delay: Duration,
    rate_limiting: RateLimitConfig,
    requests: AtomicU64,
}

impl GitHubClient {
    pub fn with_credentials(config: &FetchConfig, credentials: &Credentials) -> Result<Self> {
        let timeout = Duration::from_secs(config.github.timeout_seconds);
        let mut builder = Octocrab::builder()
            .personal_token(credentials.token().to_string())
            .set_connect_timeout(Some(timeout))
            .set_read_timeout(Some(timeout));

        if !config.github.api_base_url.is_empty()
            && config.github.api_base_url != "https://api.github.com"
        {
            builder = builder
                .base_uri(config.github.api_base_url.as_str())
                .map_err(|e| GitHubToolsError::ConfigError(format!("Invalid base URI: {}", e)))?;
        }

        let octocrab = builder.build()?;

        Ok(Self {
            octocrab,
            rate_limit_delay: config.rate_limiting.delay_duration(),
            rate_limiting: config.rate_limiting.clone(),
            requests: AtomicU64::new(0),
        })
    }

    /// Number of API requests issued so far.
    pub fn request_count(&self) -> u64 {
        self.requests.load(Ordering::Relaxed)
    }

    async fn get_json<R: DeserializeOwned>(&self, route: &str) -> Result<R> {
        self.requests.fetch_add(1, Ordering::Relaxed);
        let response = self
            .octocrab
            .get(route, None::<&()>)
            .await
            .map_err(|e| GitHubToolsError::ApiError(format!("GET {} failed: {}", route, e)))?;
        if !self.rate_limit_delay.is_zero() {
            sleep(self.rate_limit_delay).await;
        }
        Ok(response)
    }

    /// Walk every page of a listing, handing each element to `visit` as soon as
    /// its page arrives. `visit` may break to stop before the next page is
    /// requested. Returns the number of elements visited.
    async fn visit_pages<P, F>(&self, route: &str, mut visit: F) -> Result<usize>
    where
        P: DeserializeOwned,
        F: FnMut(P) -> ControlFlow<()>,
    {
        let separator = if route.contains('?') { '&' } else { '?' };
        let mut page = 1u32;
        let mut visited = 0;

        loop {
            debug!("Fetching page {} of {}", page, route);
            let url = format!("{}{}per_page={}&page={}", route, separator, PER_PAGE, page);
            let items: Vec<P> = self.get_json(&url).await?;
            let page_len = items.len();

            for item in items {
                visited += 1;
                if visit(item).is_break() {
                    debug!("Stopped {} after {} elements", route, visited);
                    return Ok(visited);
                }
            }

            if page_len < PER_PAGE {
                return Ok(visited);
            }
            page += 1;
        }
    }

    /// Visit issues (pull requests included, as the forge lists them) in
    /// `state`, optionally only those updated at or after `since`, oldest
    /// first.
    pub async fn visit_issues<F>(
        &self,
        repo: &Repository,
        state: IssueState,
        since: Option<DateTime<Utc>>,
        mut visit: F,
    ) -> Result<usize>
    where
        F: FnMut(ForgeItem) -> ControlFlow<()>,
    {
        let route = issues_route(repo, state, since);

        info!("Collecting {} issues from {}", state.as_query(), repo.full_name);
        let visited = self
            .visit_pages(&route, |issue: IssuePayload| visit(issue.into()))
            .await?;
        info!("Visited {} issues from {}", visited, repo.full_name);
        Ok(visited)
    }

    pub async fn fetch_issue(&self, repo: &Repository, number: u64) -> Result<ForgeItem> {
        let route = format!("/repos/{}/{}/issues/{}", repo.owner, repo.name, number);
        let issue: IssuePayload = self.get_json(&route).await.map_err(|e| {
            GitHubToolsError::NotFound(format!("Issue #{} not found: {}", number, e))
        })?;
        Ok(issue.into())
    }

    /// Visit pull requests in `state`, most recently updated first.
    pub async fn visit_pulls<F>(
        &self,
        repo: &Repository,
        state: IssueState,
        mut visit: F,
    ) -> Result<usize>
    where
        F: FnMut(ForgeItem) -> ControlFlow<()>,
    {
        let route = format!(
            "/repos/{}/{}/pulls?state={}&sort=updated&direction=desc",
            repo.owner,
            repo.name,
            state.as_query()
        );
        info!("Collecting {} pulls from {}", state.as_query(), repo.full_name);
        self.visit_pages(&route, |pr: PullPayload| visit(pr.into()))
            .await
    }

    /// Poll a pull request until the forge has computed its mergeability, at
    /// most `max_mergeable_polls` times. `None` means it never settled.
    pub async fn fetch_pull_mergeable(&self, repo: &Repository, number: u64) -> Result<Option<bool>> {
        let route = format!("/repos/{}/{}/pulls/{}", repo.owner, repo.name, number);
        let attempts = self.rate_limiting.max_mergeable_polls.max(1);

        for attempt in 1..=attempts {
            let pr: PullPayload = self.get_json(&route).await?;
            if pr.mergeable.is_some() {
                return Ok(pr.mergeable);
            }
            if attempt < attempts {
                debug!(
                    "Mergeability of #{} not computed yet (attempt {}/{})",
                    number, attempt, attempts
                );
                sleep(self.rate_limiting.mergeable_poll_interval()).await;
            }
        }

        warn!(
            "Mergeability of #{} still unknown after {} attempts",
            number, attempts
        );
        Ok(None)
    }

    async fn fetch_commit(&self, repo: &Repository, sha: &str) -> Result<CommitRecord> {
        let route = format!("/repos/{}/{}/commits/{}", repo.owner, repo.name, sha);
        let commit: CommitPayload = self.get_json(&route).await?;
        commit.try_into()
    }

    /// All tags with the committer date of the commit they point to. Needs one
    /// extra request per tag.
    pub async fn fetch_tags(&self, repo: &Repository) -> Result<Vec<TagRecord>> {
        let route = format!("/repos/{}/{}/tags", repo.owner, repo.name);
        let mut listed = Vec::new();
        self.visit_pages(&route, |tag: TagPayload| {
            listed.push(tag);
            ControlFlow::Continue(())
        })
        .await?;

        info!("Resolving dates of {} tags", listed.len());
        let mut tags = Vec::with_capacity(listed.len());
        for tag in listed {
            let commit = self.fetch_commit(repo, &tag.commit.sha).await?;
            tags.push(TagRecord {
                name: tag.name,
                date: commit.committer_date,
            });
        }
        Ok(tags)
    }

    pub async fn fetch_commits(&self, repo: &Repository, branch: &str) -> Result<Vec<CommitRecord>> {
        let route = format!("/repos/{}/{}/commits?sha={}", repo.owner, repo.name, branch);
        let mut commits = Vec::new();
        let mut malformed = 0;
        self.visit_pages(&route, |commit: CommitPayload| {
            match CommitRecord::try_from(commit) {
                Ok(record) => commits.push(record),
                Err(e) => {
                    warn!("Skipping commit: {}", e);
                    malformed += 1;
                }
            }
            ControlFlow::Continue(())
        })
        .await?;
        info!(
            "{} commits received ({} skipped)",
            commits.len(),
            malformed
        );
        Ok(commits)
    }

    pub async fn fetch_branch_head(&self, repo: &Repository, branch: &str) -> Result<String> {
        let route = format!("/repos/{}/{}/branches/{}", repo.owner, repo.name, branch);
        let branch: BranchPayload = self.get_json(&route).await?;
        Ok(branch.commit.sha)
    }

    pub async fn fetch_open_issue_count(&self, repo: &Repository) -> Result<u64> {
        let route = format!("/repos/{}/{}", repo.owner, repo.name);
        let info: RepoPayload = self.get_json(&route).await?;
        Ok(info.open_issues_count)
    }

    pub async fn fetch_teams(&self, organization: &str) -> Result<Vec<Team>> {
        let route = format!("/orgs/{}/teams", organization);
        let mut teams = Vec::new();
        self.visit_pages(&route, |team: TeamPayload| {
            teams.push(Team {
                name: team.name,
                slug: team.slug,
            });
            ControlFlow::Continue(())
        })
        .await?;
        Ok(teams)
    }

    /// Members of a team with their profile names. Needs one extra request
    /// per member.
    pub async fn fetch_team_members(&self, organization: &str, team: &Team) -> Result<Vec<TeamMember>> {
        let route = format!("/orgs/{}/teams/{}/members", organization, team.slug);
        let mut logins = Vec::new();
        self.visit_pages(&route, |user: UserPayload| {
            logins.push(user.login);
            ControlFlow::Continue(())
        })
        .await?;

        let mut members = Vec::with_capacity(logins.len());
        for login in logins {
            let profile: UserProfilePayload = self.get_json(&format!("/users/{}", login)).await?;
            members.push(TeamMember {
                login: profile.login,
                name: profile.name.filter(|n| !n.is_empty()),
            });
        }
        Ok(members)
    }

    pub async fn test_connection(&self) -> Result<()> {
        debug!("Testing GitHub API connection");

        self.octocrab
            .ratelimit()
            .get()
            .await
            .map_err(|e| GitHubToolsError::ApiError(format!("Connection test failed: {}", e)))?;

        info!("GitHub API connection successful");
        Ok(())
    }

    pub async fn get_rate_limit(&self) -> Result<String> {
        let rate_limit =
            self.octocrab.ratelimit().get().await.map_err(|e| {
                GitHubToolsError::ApiError(format!("Failed to get rate limit: {}", e))
            })?;

        Ok(format!(
            "Rate limit: {}/{} remaining, resets at {}",
            rate_limit.resources.core.remaining,
            rate_limit.resources.core.limit,
            rate_limit.resources.core.reset
        ))
    }
}
