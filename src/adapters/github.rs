//! GitHub REST API client for status gates, release tags and PR notices.

use crate::adapters::http::{default_client, error_for_response, trim_base};
use crate::domain::model::ValidationStatus;
use crate::utils::error::{Result, TubularError};
use crate::utils::retry::{retry, RetryPolicy};
use chrono::{Datelike, NaiveDate, Weekday};
use regex::Regex;
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

pub const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";
pub const DEFAULT_EXCLUDE_CONTEXTS: &str = "datreeio|Renovate|[Cc]odecov|Dependabot";
const SERVICE: &str = "GitHub";

pub const PR_PREFIX: &str = "**EdX Release Notice**: ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    Stage,
    Prod,
    ProdRollback,
    BrokeVagrant,
    E2eFailed,
}

impl MessageType {
    pub fn text(&self) -> &'static str {
        match self {
            Self::Stage => "Deployed to stage",
            Self::Prod => "Deployed to PROD",
            Self::ProdRollback => "Deployed to PROD, then rolled back",
            Self::BrokeVagrant => "Breaks on Vagrant",
            Self::E2eFailed => "Failed E2E Testing",
        }
    }
}

impl std::str::FromStr for MessageType {
    type Err = TubularError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "stage" => Ok(Self::Stage),
            "prod" => Ok(Self::Prod),
            "prod_rollback" => Ok(Self::ProdRollback),
            "broke_vagrant" => Ok(Self::BrokeVagrant),
            "e2e_failed" => Ok(Self::E2eFailed),
            other => Err(TubularError::InvalidConfigValueError {
                field: "type".to_string(),
                value: other.to_string(),
                reason: "expected stage, prod, prod_rollback, broke_vagrant or e2e_failed".to_string(),
            }),
        }
    }
}

pub fn pr_message(message_type: MessageType, extra_text: &str) -> String {
    format!("{} {} {}", PR_PREFIX, message_type.text(), extra_text)
}

pub fn stage_date_extra(deploy_date: NaiveDate, extra_text: &str) -> String {
    format!(
        "in preparation for a release to production on {}. {}",
        deploy_date.format("%A, %B %d, %Y"),
        extra_text
    )
}

/// The next weekday after `today`.
pub fn default_deploy_date(today: NaiveDate) -> NaiveDate {
    let mut date = today.succ_opt().unwrap_or(today);
    while matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
        date = date.succ_opt().unwrap_or(date);
    }
    date
}

pub fn diff_url(org: &str, repo: &str, base_sha: &str, head_sha: &str) -> Result<String> {
    let url = format!(
        "https://github.com/{}/{}/compare/{}...{}",
        org, repo, base_sha, head_sha
    );
    if [org, repo, base_sha, head_sha]
        .iter()
        .any(|part| part.chars().any(char::is_whitespace))
    {
        return Err(TubularError::InvalidUrlError { url });
    }
    Ok(url)
}

#[derive(Debug, Clone, Deserialize)]
pub struct GitRefTarget {
    pub sha: String,
    #[serde(rename = "ref", default)]
    pub ref_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    pub head: GitRefTarget,
    pub base: GitRefTarget,
    #[serde(default)]
    pub html_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CommitStatus {
    context: String,
    state: Option<String>,
    #[serde(default)]
    target_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CombinedStatus {
    #[serde(default)]
    statuses: Vec<CommitStatus>,
}

#[derive(Debug, Deserialize)]
struct CheckApp {
    name: String,
}

#[derive(Debug, Deserialize)]
struct CheckSuite {
    app: CheckApp,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    conclusion: Option<String>,
    #[serde(default)]
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CheckSuites {
    #[serde(default)]
    check_suites: Vec<CheckSuite>,
}

#[derive(Debug, Deserialize)]
struct CheckRun {
    name: String,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    conclusion: Option<String>,
    #[serde(default)]
    html_url: Option<String>,
    #[serde(default)]
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CheckRuns {
    #[serde(default)]
    check_runs: Vec<CheckRun>,
}

#[derive(Debug, Deserialize)]
struct RequiredStatusChecks {
    #[serde(default)]
    contexts: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct GitObject {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct GitRef {
    object: GitObject,
}

#[derive(Debug, Deserialize)]
struct User {
    login: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    email: Option<String>,
}

#[derive(Debug, Serialize)]
struct Tagger<'a> {
    name: &'a str,
    email: &'a str,
    date: String,
}

#[derive(Debug, Serialize)]
struct CreateTag<'a> {
    tag: &'a str,
    message: &'a str,
    object: &'a str,
    #[serde(rename = "type")]
    kind: &'a str,
    tagger: Tagger<'a>,
}

#[derive(Debug, Serialize)]
struct CreateRef<'a> {
    #[serde(rename = "ref")]
    ref_name: String,
    sha: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IssueComment {
    pub body: String,
    #[serde(default)]
    pub html_url: Option<String>,
}

#[derive(Debug, Serialize)]
struct NewComment<'a> {
    body: &'a str,
}

/// The `rel="last"` target of a `Link` pagination header.
fn last_page_url(link: &str) -> Option<String> {
    link.split(',').find_map(|part| {
        let (target, params) = part.split_once(';')?;
        params
            .split(';')
            .any(|p| p.trim() == "rel=\"last\"")
            .then(|| target.trim().trim_start_matches('<').trim_end_matches('>').to_string())
    })
}

fn is_success_state(state: &str) -> bool {
    matches!(state.to_ascii_lowercase().as_str(), "success" | "skipped" | "neutral")
}

fn state_or_none(conclusion: Option<String>, status: Option<String>) -> String {
    conclusion
        .or(status.filter(|s| s != "completed"))
        .unwrap_or_else(|| "none".to_string())
}

pub struct GitHubApi {
    client: Client,
    base_url: String,
    org: String,
    repo: String,
    token: Option<String>,
    exclude_contexts: Option<Regex>,
    include_contexts: Option<Regex>,
    pub all_checks: bool,
    retry: RetryPolicy,
}

impl GitHubApi {
    pub fn new(org: &str, repo: &str, token: Option<String>) -> Result<Self> {
        Self::with_base_url(org, repo, token, DEFAULT_GITHUB_API_URL)
    }

    pub fn with_base_url(org: &str, repo: &str, token: Option<String>, base_url: &str) -> Result<Self> {
        Ok(Self {
            client: default_client()?,
            base_url: trim_base(base_url),
            org: org.to_string(),
            repo: repo.to_string(),
            token,
            exclude_contexts: Some(Regex::new(DEFAULT_EXCLUDE_CONTEXTS)?),
            include_contexts: None,
            all_checks: true,
            retry: RetryPolicy::from_env("RETRY_MAX_ATTEMPTS", 5),
        })
    }

    /// Sets the context filters; `None` disables that filter.
    pub fn with_context_filters(mut self, exclude: Option<&str>, include: Option<&str>) -> Result<Self> {
        self.exclude_contexts = exclude.filter(|s| !s.is_empty()).map(Regex::new).transpose()?;
        self.include_contexts = include.filter(|s| !s.is_empty()).map(Regex::new).transpose()?;
        Ok(self)
    }

    pub fn with_all_checks(mut self, all_checks: bool) -> Self {
        self.all_checks = all_checks;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn repo_url(&self, path: &str) -> String {
        format!("{}/repos/{}/{}/{}", self.base_url, self.org, self.repo, path)
    }

    fn request(&self, method: Method, url: &str) -> reqwest::RequestBuilder {
        let builder = self
            .client
            .request(method, url)
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28");
        match &self.token {
            Some(token) => builder.header("Authorization", format!("token {}", token)),
            None => builder,
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        retry(&self.retry, "github GET", || async move {
            tracing::debug!("📡 GET {}", url);
            let response = self.request(Method::GET, url).send().await?;
            if !response.status().is_success() {
                return Err(error_for_response(SERVICE, response).await);
            }
            Ok(response.json::<T>().await?)
        })
        .await
    }

    async fn post_json<B: Serialize + Sync, T: DeserializeOwned>(&self, url: &str, body: &B) -> Result<T> {
        retry(&self.retry, "github POST", || async move {
            tracing::debug!("📡 POST {}", url);
            let response = self.request(Method::POST, url).json(body).send().await?;
            if !response.status().is_success() {
                return Err(error_for_response(SERVICE, response).await);
            }
            Ok(response.json::<T>().await?)
        })
        .await
    }

    pub async fn pull_request(&self, number: u64) -> Result<PullRequest> {
        self.get_json(&self.repo_url(&format!("pulls/{}", number)))
            .await
            .map_err(|e| match e {
                TubularError::ApiError { status: 404, .. } => TubularError::InvalidPullRequestError { number },
                other => other,
            })
    }

    /// Context names the base branch's protection rules require.
    pub async fn required_contexts(&self, branch: &str) -> Result<Vec<String>> {
        let url = self.repo_url(&format!("branches/{}/protection/required_status_checks", branch));
        match self.get_json::<RequiredStatusChecks>(&url).await {
            Ok(checks) => Ok(checks.contexts),
            Err(TubularError::ApiError { status: 404, .. }) => {
                tracing::warn!("⚠️ Branch {} has no required status checks", branch);
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }

    /// Commit statuses from the combined status endpoint, keyed by context.
    pub async fn commit_statuses(&self, sha: &str) -> Result<Vec<(String, ValidationStatus)>> {
        let combined: CombinedStatus = self.get_json(&self.repo_url(&format!("commits/{}/status", sha))).await?;
        Ok(combined
            .statuses
            .into_iter()
            .map(|status| {
                let state = status.state.unwrap_or_else(|| "none".to_string());
                (status.context, ValidationStatus::new(status.target_url.unwrap_or_default(), state))
            })
            .collect())
    }

    pub async fn check_suites(&self, sha: &str) -> Result<Vec<(String, ValidationStatus)>> {
        let suites: CheckSuites = self
            .get_json(&self.repo_url(&format!("commits/{}/check-suites?per_page=100", sha)))
            .await?;
        Ok(suites
            .check_suites
            .into_iter()
            .map(|suite| {
                let state = state_or_none(suite.conclusion, suite.status);
                (suite.app.name, ValidationStatus::new(suite.url.unwrap_or_default(), state))
            })
            .collect())
    }

    /// Check runs keyed by run name; the state is the conclusion, or the status while
    /// the run has not completed.
    pub async fn check_runs(&self, sha: &str) -> Result<Vec<(String, ValidationStatus)>> {
        let runs: CheckRuns = self
            .get_json(&self.repo_url(&format!("commits/{}/check-runs?per_page=100", sha)))
            .await?;
        Ok(runs
            .check_runs
            .into_iter()
            .map(|run| {
                let url = run.html_url.or(run.url).unwrap_or_default();
                (run.name, ValidationStatus::new(url, state_or_none(run.conclusion, run.status)))
            })
            .collect())
    }

    /// Every commit status, check suite and check run reported for `sha`. Later
    /// sources win on a name clash.
    pub async fn validation_results(&self, sha: &str) -> Result<BTreeMap<String, ValidationStatus>> {
        let mut results = BTreeMap::new();
        results.extend(self.commit_statuses(sha).await?);
        results.extend(self.check_suites(sha).await?);
        results.extend(self.check_runs(sha).await?);

        tracing::debug!("Found {} validation result(s) for {}", results.len(), sha);
        Ok(results)
    }

    /// Drops excluded contexts (unless also included) and, without `all_checks`, any
    /// context not in `required`.
    pub fn filter_validation_results(
        &self,
        results: BTreeMap<String, ValidationStatus>,
        required: Option<&[String]>,
    ) -> BTreeMap<String, ValidationStatus> {
        let required: Option<HashSet<&str>> = match (self.all_checks, required) {
            (false, Some(required)) => Some(required.iter().map(String::as_str).collect()),
            _ => None,
        };

        results
            .into_iter()
            .filter(|(context, _)| {
                let excluded = self.exclude_contexts.as_ref().is_some_and(|re| re.is_match(context));
                let included = self.include_contexts.as_ref().is_some_and(|re| re.is_match(context));
                !excluded || included
            })
            .filter(|(context, _)| required.as_ref().map_or(true, |r| r.contains(context.as_str())))
            .collect()
    }

    async fn check_combined_status(
        &self,
        sha: &str,
        base_branch: Option<&str>,
    ) -> Result<(bool, BTreeMap<String, ValidationStatus>)> {
        let required = match (self.all_checks, base_branch) {
            (false, Some(branch)) => Some(self.required_contexts(branch).await?),
            _ => None,
        };
        let results = self.validation_results(sha).await?;
        let filtered = self.filter_validation_results(results, required.as_deref());
        let success = !filtered.is_empty() && filtered.values().all(|s| is_success_state(&s.state));
        Ok((success, filtered))
    }

    pub async fn check_combined_status_commit(&self, sha: &str) -> Result<(bool, BTreeMap<String, ValidationStatus>)> {
        let base = if self.all_checks { None } else { Some("master") };
        self.check_combined_status(sha, base).await
    }

    pub async fn check_combined_status_pull_request(
        &self,
        number: u64,
    ) -> Result<(bool, BTreeMap<String, ValidationStatus>)> {
        let pr = self.pull_request(number).await?;
        tracing::info!("PR #{} head is {}", number, pr.head.sha);
        self.check_combined_status(&pr.head.sha, pr.base.ref_name.as_deref()).await
    }

    async fn current_user(&self) -> Result<User> {
        self.get_json(&format!("{}/user", self.base_url)).await
    }

    /// Tags `sha`. Re-tagging the same sha is a no-op; a tag pointing elsewhere is an error.
    pub async fn create_tag(&self, sha: &str, tag: &str) -> Result<()> {
        let user = self.current_user().await?;
        let name = user.name.clone().unwrap_or_else(|| user.login.clone());
        let email = user
            .email
            .clone()
            .unwrap_or_else(|| format!("{}@users.noreply.github.com", user.login));

        let tag_body = CreateTag {
            tag,
            message: "",
            object: sha,
            kind: "commit",
            tagger: Tagger {
                name: &name,
                email: &email,
                date: chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string(),
            },
        };
        let _: GitObject = self.post_json(&self.repo_url("git/tags"), &tag_body).await?;

        let ref_body = CreateRef {
            ref_name: format!("refs/tags/{}", tag),
            sha,
        };
        match self.post_json::<_, GitRef>(&self.repo_url("git/refs"), &ref_body).await {
            Ok(_) => {
                tracing::info!("✅ Created tag {} at {}", tag, sha);
                Ok(())
            }
            Err(TubularError::ApiError { status: 422, message, .. })
                if message.contains("Reference already exists") =>
            {
                let existing: GitRef = self.get_json(&self.repo_url(&format!("git/ref/tags/{}", tag))).await?;
                if existing.object.sha == sha {
                    tracing::info!("Tag {} already exists at {}", tag, sha);
                    Ok(())
                } else {
                    Err(TubularError::TagMismatchError {
                        tag: tag.to_string(),
                        existing_sha: existing.object.sha,
                        requested_sha: sha.to_string(),
                    })
                }
            }
            Err(e) => Err(e),
        }
    }

    /// The most recent comment on an issue or PR. GitHub lists comments oldest first, so
    /// when the listing is paginated the last page is fetched.
    pub async fn latest_comment(&self, number: u64) -> Result<Option<IssueComment>> {
        let first_page = self.repo_url(&format!("issues/{}/comments?per_page=100", number));
        let (mut comments, last_page) = self.get_comment_page(&first_page).await?;
        if let Some(last_page) = last_page {
            tracing::debug!("PR #{} comments are paginated, reading {}", number, last_page);
            comments = self.get_comment_page(&last_page).await?.0;
        }
        Ok(comments.pop())
    }

    async fn get_comment_page(&self, url: &str) -> Result<(Vec<IssueComment>, Option<String>)> {
        retry(&self.retry, "github GET", || async move {
            tracing::debug!("📡 GET {}", url);
            let response = self.request(Method::GET, url).send().await?;
            if !response.status().is_success() {
                return Err(error_for_response(SERVICE, response).await);
            }
            let last_page = response
                .headers()
                .get(reqwest::header::LINK)
                .and_then(|v| v.to_str().ok())
                .and_then(last_page_url);
            Ok((response.json::<Vec<IssueComment>>().await?, last_page))
        })
        .await
    }

    /// Comments on a PR unless its most recent comment already contains `message_filter`.
    /// Returns the new comment, or `None` when nothing was posted.
    pub async fn message_pull_request(
        &self,
        number: u64,
        message: &str,
        message_filter: &str,
        force_message: bool,
    ) -> Result<Option<IssueComment>> {
        self.pull_request(number).await?;

        if !force_message {
            let filter = message_filter.to_lowercase();
            let latest = self.latest_comment(number).await?;
            if latest.is_some_and(|c| c.body.to_lowercase().contains(&filter)) {
                tracing::info!("PR #{} already carries this notice, skipping", number);
                return Ok(None);
            }
        }

        let url = self.repo_url(&format!("issues/{}/comments", number));
        let comment: IssueComment = self.post_json(&url, &NewComment { body: message }).await?;
        tracing::info!("✅ Messaged PR #{}", number);
        Ok(Some(comment))
    }

    pub async fn message_pr_with_type(
        &self,
        number: u64,
        message_type: MessageType,
        extra_text: &str,
        deploy_date: Option<NaiveDate>,
        force_message: bool,
    ) -> Result<Option<IssueComment>> {
        let extra = if message_type == MessageType::Stage {
            let date = deploy_date.unwrap_or_else(|| default_deploy_date(chrono::Local::now().date_naive()));
            stage_date_extra(date, extra_text)
        } else {
            extra_text.to_string()
        };
        let message = pr_message(message_type, &extra);
        self.message_pull_request(number, &message, &message, force_message).await
    }
}
