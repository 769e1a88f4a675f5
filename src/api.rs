//! Remote API seam
//!
//! Every check talks to GitHub through [`RepoApi`]. The production
//! implementation lives in [`crate::github`]; tests substitute a mock or an
//! in-memory fake.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// The repository attributes the reconciler consults
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RepoSummary {
    /// Owner login (organization name)
    pub owner: String,

    /// Repository name
    pub name: String,

    /// `owner/name`
    pub full_name: String,

    pub archived: bool,
    pub has_wiki: bool,
    pub has_issues: bool,
    pub allow_merge_commit: bool,
    pub allow_rebase_merge: bool,

    /// Default branch as reported by the API
    pub default_branch: Option<String>,
}

impl RepoSummary {
    /// Minimal summary with all feature flags off
    pub fn new(owner: &str, name: &str) -> Self {
        Self {
            owner: owner.to_string(),
            name: name.to_string(),
            full_name: format!("{}/{}", owner, name),
            ..Default::default()
        }
    }
}

/// One page of organization repositories
#[derive(Debug, Clone, Default)]
pub struct RepoPage {
    pub repos: Vec<RepoSummary>,
    /// Whether the API reported a following page
    pub has_next: bool,
}

/// An existing repository webhook
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hook {
    pub id: u64,
    /// `config.url`, absent for hooks without a URL (e.g. email hooks)
    pub url: Option<String>,
}

/// Payload for a new webhook
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewHook {
    pub url: String,
    pub content_type: String,
    pub secret: Option<String>,
    pub events: Vec<String>,
}

/// An issue label, used both for listing and creating
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label {
    pub name: String,
    pub color: String,
    pub description: Option<String>,
}

/// Team permission levels accepted by the GitHub team-repository API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum TeamPermission {
    #[serde(rename = "pull", alias = "read")]
    Read,
    #[serde(rename = "push", alias = "write")]
    Write,
    #[serde(rename = "admin")]
    Admin,
}

impl TeamPermission {
    /// The permission string GitHub reports on a repository's team list
    pub fn as_api_str(&self) -> &'static str {
        match self {
            TeamPermission::Read => "pull",
            TeamPermission::Write => "push",
            TeamPermission::Admin => "admin",
        }
    }
}

/// A team's access to a repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamAccess {
    pub slug: String,
    /// Raw permission string (`pull`, `triage`, `push`, `maintain`, `admin`)
    pub permission: String,
}

/// Combined repository settings update
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SettingsPatch {
    pub has_wiki: bool,
    pub has_issues: bool,
    pub allow_merge_commit: bool,
    pub allow_rebase_merge: bool,
    pub allow_squash_merge: bool,
}

/// An existing release
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Release {
    pub tag_name: String,
}

/// Payload for a new release
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRelease {
    pub tag_name: String,
    pub target_commitish: String,
    pub name: String,
    pub body: String,
    pub draft: bool,
    pub prerelease: bool,
}

/// Required status checks of a protected branch
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StatusChecks {
    pub strict: bool,
    pub contexts: Vec<String>,
}

/// Current protection of a branch, as far as the reconciler cares
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BranchProtection {
    /// `None` when pull request reviews are not required at all
    pub required_approving_review_count: Option<u32>,
    /// `None` when status checks are not required at all
    pub status_checks: Option<StatusChecks>,
}

/// Full branch protection to install
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtectionUpdate {
    pub strict: bool,
    pub contexts: Vec<String>,
    pub required_approving_review_count: u32,
    pub dismiss_stale_reviews: bool,
    pub require_code_owner_reviews: bool,
    pub enforce_admins: bool,
}

/// Remote operations needed by the reconciliation checks
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RepoApi: Send + Sync {
    /// Fetch one page (1-based) of the organization's repositories
    async fn list_org_repos(&self, org: &str, page: u32) -> Result<RepoPage>;

    async fn list_hooks(&self, repo: &RepoSummary) -> Result<Vec<Hook>>;
    async fn create_hook(&self, repo: &RepoSummary, hook: &NewHook) -> Result<()>;

    async fn list_labels(&self, repo: &RepoSummary) -> Result<Vec<Label>>;
    async fn create_label(&self, repo: &RepoSummary, label: &Label) -> Result<()>;

    async fn list_teams(&self, repo: &RepoSummary) -> Result<Vec<TeamAccess>>;
    async fn grant_team(
        &self,
        repo: &RepoSummary,
        team_slug: &str,
        permission: TeamPermission,
    ) -> Result<()>;

    async fn update_settings(&self, repo: &RepoSummary, patch: &SettingsPatch) -> Result<()>;

    async fn list_releases(&self, repo: &RepoSummary) -> Result<Vec<Release>>;
    async fn create_release(&self, repo: &RepoSummary, release: &NewRelease) -> Result<()>;

    /// `Ok(None)` when the branch is not protected
    async fn get_branch_protection(
        &self,
        repo: &RepoSummary,
        branch: &str,
    ) -> Result<Option<BranchProtection>>;
    async fn update_branch_protection(
        &self,
        repo: &RepoSummary,
        branch: &str,
        update: &ProtectionUpdate,
    ) -> Result<()>;

    /// `Ok(None)` when the branch is not protected, otherwise whether
    /// signed commits are required
    async fn get_signature_protection(&self, repo: &RepoSummary, branch: &str)
        -> Result<Option<bool>>;
    async fn enable_signature_protection(&self, repo: &RepoSummary, branch: &str) -> Result<()>;
}
