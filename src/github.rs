use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use octocrab::models::hooks;
use octocrab::models::webhook_events::WebhookEventType;
use octocrab::params::teams::Permission;
use octocrab::Octocrab;
use serde::{Deserialize, Serialize};
use std::env;
use std::process::Command;
use tracing::{debug, info, warn};

use crate::api::{
    BranchProtection, Hook, Label, NewHook, NewRelease, ProtectionUpdate, Release, RepoApi,
    RepoPage, RepoSummary, SettingsPatch, StatusChecks, TeamAccess, TeamPermission,
};
use crate::config::Config;

/// GitHub client wrapper with authentication management
pub struct GitHubClient {
    client: Octocrab,
    per_page: u8,
}

/// GitHub authentication strategies
#[derive(Debug, Clone)]
pub enum AuthStrategy {
    /// Use GitHub CLI authentication
    GitHubCLI,
    /// Use environment variable token
    EnvironmentToken,
}

impl GitHubClient {
    /// Create a new GitHub client, failing when no credential is available
    pub fn new(config: &Config) -> Result<Self> {
        let (auth_strategy, token) = Self::detect_authentication(config)?;

        info!("Using authentication strategy: {:?}", auth_strategy);

        Self::with_token(token, config.github.api_url.as_deref(), config.github.per_page)
    }

    /// Create a client from an explicit token and optional base URL
    pub fn with_token(token: String, api_url: Option<&str>, per_page: u8) -> Result<Self> {
        let mut builder = Octocrab::builder();

        if let Some(url) = api_url {
            builder = builder
                .base_uri(url)
                .with_context(|| format!("Invalid GitHub API url: {}", url))?;
        }

        let client = builder
            .personal_token(token)
            .build()
            .context("Failed to create GitHub client")?;

        Ok(Self { client, per_page })
    }

    /// Detect and obtain GitHub authentication
    fn detect_authentication(config: &Config) -> Result<(AuthStrategy, String)> {
        match config.github.auth_method.as_str() {
            "auto" => {
                // Try GitHub CLI first, then environment token
                if let Ok(token) = Self::try_github_cli() {
                    Ok((AuthStrategy::GitHubCLI, token))
                } else if let Ok(token) = Self::try_environment_token() {
                    Ok((AuthStrategy::EnvironmentToken, token))
                } else {
                    Err(anyhow!(
                        "No GitHub authentication found. Please either:\n\
                         1. Set the GITHUB_TOKEN environment variable\n\
                         2. Install and authenticate GitHub CLI: gh auth login"
                    ))
                }
            }
            "gh_cli" => {
                let token = Self::try_github_cli()
                    .context("GitHub CLI authentication failed. Run: gh auth login")?;
                Ok((AuthStrategy::GitHubCLI, token))
            }
            "token" => {
                let token = Self::try_environment_token()
                    .context("GITHUB_TOKEN environment variable not found or invalid")?;
                Ok((AuthStrategy::EnvironmentToken, token))
            }
            other => Err(anyhow!("Unknown auth method: {}", other)),
        }
    }

    /// Try to get token from GitHub CLI
    fn try_github_cli() -> Result<String> {
        debug!("Attempting GitHub CLI authentication");

        let token_output = Command::new("gh")
            .args(["auth", "token"])
            .output()
            .context("Failed to run GitHub CLI (is gh installed?)")?;

        if !token_output.status.success() {
            return Err(anyhow!(
                "Failed to retrieve token from GitHub CLI: {}",
                String::from_utf8_lossy(&token_output.stderr)
            ));
        }

        let token = String::from_utf8(token_output.stdout)
            .context("GitHub CLI token is not valid UTF-8")?
            .trim()
            .to_string();

        if token.is_empty() {
            return Err(anyhow!("GitHub CLI returned empty token"));
        }

        debug!("Successfully obtained token from GitHub CLI");
        Ok(token)
    }

    /// Try to get token from environment variable
    fn try_environment_token() -> Result<String> {
        debug!("Attempting environment variable authentication");

        let token = env::var("GITHUB_TOKEN").context("GITHUB_TOKEN environment variable not set")?;

        if token.is_empty() {
            return Err(anyhow!("GITHUB_TOKEN is empty"));
        }

        if !["ghp_", "gho_", "ghs_", "github_pat_"]
            .iter()
            .any(|prefix| token.starts_with(prefix))
        {
            warn!("GITHUB_TOKEN doesn't look like a GitHub token (expected ghp_, gho_, ghs_ or github_pat_ prefix)");
        }

        Ok(token)
    }

    fn repo_route(repo: &RepoSummary, tail: &str) -> String {
        format!("/repos/{}/{}/{}", repo.owner, repo.name, tail)
    }

    fn protection_route(repo: &RepoSummary, branch: &str) -> String {
        Self::repo_route(repo, &format!("branches/{}/protection", branch))
    }
}

/// Whether an octocrab error is a GitHub 404
fn is_not_found(err: &octocrab::Error) -> bool {
    match err {
        octocrab::Error::GitHub { source, .. } => source.status_code.as_u16() == 404,
        _ => false,
    }
}

fn summarize(repo: octocrab::models::Repository) -> RepoSummary {
    let owner = repo
        .owner
        .as_ref()
        .map(|o| o.login.clone())
        .unwrap_or_default();
    let full_name = repo
        .full_name
        .clone()
        .unwrap_or_else(|| format!("{}/{}", owner, repo.name));

    RepoSummary {
        owner,
        full_name,
        name: repo.name,
        archived: repo.archived.unwrap_or(false),
        has_wiki: repo.has_wiki.unwrap_or(false),
        has_issues: repo.has_issues.unwrap_or(false),
        allow_merge_commit: repo.allow_merge_commit.unwrap_or(false),
        allow_rebase_merge: repo.allow_rebase_merge.unwrap_or(false),
        default_branch: repo.default_branch,
    }
}

/// Map configured event names onto octocrab's event enum; names it does
/// not know are passed through as-is
fn webhook_events(events: &[String]) -> Result<Vec<WebhookEventType>> {
    events
        .iter()
        .map(|event| {
            serde_json::from_value(serde_json::Value::String(event.clone()))
                .with_context(|| format!("Invalid webhook event name: {}", event))
        })
        .collect()
}

fn hook_content_type(content_type: &str) -> hooks::ContentType {
    match content_type {
        "json" => hooks::ContentType::Json,
        "form" => hooks::ContentType::Form,
        other => hooks::ContentType::Other(other.to_string()),
    }
}

// Wire shapes for the endpoints octocrab has no typed handler for: listing
// hooks, patching repository settings, branch protection and required
// signatures.

#[derive(Serialize)]
struct ListParams {
    per_page: u8,
}

#[derive(Deserialize)]
struct HookResponse {
    id: u64,
    #[serde(default)]
    config: HookConfigResponse,
}

#[derive(Deserialize, Default)]
struct HookConfigResponse {
    url: Option<String>,
}

#[derive(Deserialize)]
struct ProtectionResponse {
    required_status_checks: Option<StatusChecksResponse>,
    required_pull_request_reviews: Option<ReviewsResponse>,
}

#[derive(Deserialize)]
struct StatusChecksResponse {
    #[serde(default)]
    strict: bool,
    #[serde(default)]
    contexts: Vec<String>,
}

#[derive(Deserialize)]
struct ReviewsResponse {
    #[serde(default)]
    required_approving_review_count: u32,
}

#[derive(Serialize)]
struct ProtectionBody<'a> {
    required_status_checks: StatusChecksBody<'a>,
    enforce_admins: bool,
    required_pull_request_reviews: ReviewsBody,
    // Must be sent as an explicit null
    restrictions: Option<()>,
}

#[derive(Serialize)]
struct StatusChecksBody<'a> {
    strict: bool,
    contexts: &'a [String],
}

#[derive(Serialize)]
struct ReviewsBody {
    dismiss_stale_reviews: bool,
    require_code_owner_reviews: bool,
    required_approving_review_count: u32,
}

#[derive(Deserialize)]
struct SignaturesResponse {
    enabled: bool,
}

#[async_trait]
impl RepoApi for GitHubClient {
    async fn list_org_repos(&self, org: &str, page: u32) -> Result<RepoPage> {
        debug!("Fetching repositories for organization {} page {}", org, page);

        let page_repos = self
            .client
            .orgs(org)
            .list_repos()
            .per_page(self.per_page)
            .page(page)
            .send()
            .await
            .with_context(|| {
                format!(
                    "Failed to fetch repositories for organization {} page {}",
                    org, page
                )
            })?;

        let has_next = page_repos.next.is_some();
        let repos = page_repos.items.into_iter().map(summarize).collect();

        Ok(RepoPage { repos, has_next })
    }

    async fn list_hooks(&self, repo: &RepoSummary) -> Result<Vec<Hook>> {
        let hooks: Vec<HookResponse> = self
            .client
            .get(
                Self::repo_route(repo, "hooks"),
                Some(&ListParams { per_page: 100 }),
            )
            .await
            .with_context(|| format!("Failed to list hooks for {}", repo.full_name))?;

        Ok(hooks
            .into_iter()
            .map(|h| Hook {
                id: h.id,
                url: h.config.url,
            })
            .collect())
    }

    async fn create_hook(&self, repo: &RepoSummary, hook: &NewHook) -> Result<()> {
        let new_hook = hooks::Hook {
            name: "web".to_string(),
            active: true,
            events: webhook_events(&hook.events)?,
            config: hooks::Config {
                url: hook.url.clone(),
                content_type: Some(hook_content_type(&hook.content_type)),
                insecure_ssl: Some("0".to_string()),
                secret: hook.secret.clone(),
            },
            ..Default::default()
        };

        self.client
            .repos(&repo.owner, &repo.name)
            .create_hook(new_hook)
            .await
            .with_context(|| format!("Failed to create hook for {}", repo.full_name))?;

        Ok(())
    }

    async fn list_labels(&self, repo: &RepoSummary) -> Result<Vec<Label>> {
        let labels = self
            .client
            .issues(&repo.owner, &repo.name)
            .list_labels_for_repo()
            .per_page(100)
            .send()
            .await
            .with_context(|| format!("Failed to list labels for {}", repo.full_name))?;

        Ok(labels
            .items
            .into_iter()
            .map(|l| Label {
                name: l.name,
                color: l.color,
                description: l.description,
            })
            .collect())
    }

    async fn create_label(&self, repo: &RepoSummary, label: &Label) -> Result<()> {
        self.client
            .issues(&repo.owner, &repo.name)
            .create_label(
                &label.name,
                &label.color,
                label.description.as_deref().unwrap_or_default(),
            )
            .await
            .with_context(|| {
                format!("Failed to create label '{}' on {}", label.name, repo.full_name)
            })?;

        Ok(())
    }

    async fn list_teams(&self, repo: &RepoSummary) -> Result<Vec<TeamAccess>> {
        let teams = self
            .client
            .repos(&repo.owner, &repo.name)
            .list_teams()
            .per_page(100)
            .send()
            .await
            .with_context(|| format!("Failed to list teams for {}", repo.full_name))?;

        Ok(teams
            .items
            .into_iter()
            .map(|t| TeamAccess {
                slug: t.slug,
                permission: t.permission,
            })
            .collect())
    }

    async fn grant_team(
        &self,
        repo: &RepoSummary,
        team_slug: &str,
        permission: TeamPermission,
    ) -> Result<()> {
        let permission = match permission {
            TeamPermission::Read => Permission::Pull,
            TeamPermission::Write => Permission::Push,
            TeamPermission::Admin => Permission::Admin,
        };

        self.client
            .teams(repo.owner.clone())
            .repos(team_slug)
            .add_or_update(repo.owner.clone(), repo.name.clone(), permission)
            .await
            .with_context(|| {
                format!("Failed to grant team '{}' on {}", team_slug, repo.full_name)
            })?;

        Ok(())
    }

    async fn update_settings(&self, repo: &RepoSummary, patch: &SettingsPatch) -> Result<()> {
        let _: serde_json::Value = self
            .client
            .patch(format!("/repos/{}/{}", repo.owner, repo.name), Some(patch))
            .await
            .with_context(|| format!("Failed to update settings for {}", repo.full_name))?;

        Ok(())
    }

    async fn list_releases(&self, repo: &RepoSummary) -> Result<Vec<Release>> {
        let releases = self
            .client
            .repos(&repo.owner, &repo.name)
            .releases()
            .list()
            .per_page(100)
            .send()
            .await
            .with_context(|| format!("Failed to list releases for {}", repo.full_name))?;

        Ok(releases
            .items
            .into_iter()
            .map(|r| Release { tag_name: r.tag_name })
            .collect())
    }

    async fn create_release(&self, repo: &RepoSummary, release: &NewRelease) -> Result<()> {
        self.client
            .repos(&repo.owner, &repo.name)
            .releases()
            .create(&release.tag_name)
            .target_commitish(&release.target_commitish)
            .name(&release.name)
            .body(&release.body)
            .draft(release.draft)
            .prerelease(release.prerelease)
            .send()
            .await
            .with_context(|| {
                format!(
                    "Failed to create release {} on {}",
                    release.tag_name, repo.full_name
                )
            })?;

        Ok(())
    }

    async fn get_branch_protection(
        &self,
        repo: &RepoSummary,
        branch: &str,
    ) -> Result<Option<BranchProtection>> {
        let result: octocrab::Result<ProtectionResponse> = self
            .client
            .get(Self::protection_route(repo, branch), None::<&()>)
            .await;

        match result {
            Ok(protection) => Ok(Some(BranchProtection {
                required_approving_review_count: protection
                    .required_pull_request_reviews
                    .map(|r| r.required_approving_review_count),
                status_checks: protection.required_status_checks.map(|s| StatusChecks {
                    strict: s.strict,
                    contexts: s.contexts,
                }),
            })),
            Err(e) if is_not_found(&e) => Ok(None),
            Err(e) => Err(e).with_context(|| {
                format!(
                    "Failed to get branch protection for {} ({})",
                    repo.full_name, branch
                )
            }),
        }
    }

    async fn update_branch_protection(
        &self,
        repo: &RepoSummary,
        branch: &str,
        update: &ProtectionUpdate,
    ) -> Result<()> {
        let body = ProtectionBody {
            required_status_checks: StatusChecksBody {
                strict: update.strict,
                contexts: &update.contexts,
            },
            enforce_admins: update.enforce_admins,
            required_pull_request_reviews: ReviewsBody {
                dismiss_stale_reviews: update.dismiss_stale_reviews,
                require_code_owner_reviews: update.require_code_owner_reviews,
                required_approving_review_count: update.required_approving_review_count,
            },
            restrictions: None,
        };

        let _: serde_json::Value = self
            .client
            .put(Self::protection_route(repo, branch), Some(&body))
            .await
            .with_context(|| {
                format!(
                    "Failed to update branch protection for {} ({})",
                    repo.full_name, branch
                )
            })?;

        Ok(())
    }

    async fn get_signature_protection(
        &self,
        repo: &RepoSummary,
        branch: &str,
    ) -> Result<Option<bool>> {
        let route = format!("{}/required_signatures", Self::protection_route(repo, branch));
        let result: octocrab::Result<SignaturesResponse> =
            self.client.get(route, None::<&()>).await;

        match result {
            Ok(signatures) => Ok(Some(signatures.enabled)),
            Err(e) if is_not_found(&e) => Ok(None),
            Err(e) => Err(e).with_context(|| {
                format!(
                    "Failed to get signature protection for {} ({})",
                    repo.full_name, branch
                )
            }),
        }
    }

    async fn enable_signature_protection(&self, repo: &RepoSummary, branch: &str) -> Result<()> {
        let route = format!("{}/required_signatures", Self::protection_route(repo, branch));

        let _: serde_json::Value = self
            .client
            .post(route, None::<&()>)
            .await
            .with_context(|| {
                format!(
                    "Failed to enable signature protection for {} ({})",
                    repo.full_name, branch
                )
            })?;

        Ok(())
    }
}
