//! Common test utilities and helpers for repowarden tests

#![allow(dead_code)]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashSet};
use std::sync::Mutex;

use repowarden::api::{
    BranchProtection, Hook, Label, NewHook, NewRelease, ProtectionUpdate, Release, RepoApi,
    RepoPage, RepoSummary, SettingsPatch, StatusChecks, TeamAccess, TeamPermission,
};

/// Operations that change remote state
pub const WRITE_OPS: &[&str] = &[
    "create_hook",
    "create_label",
    "grant_team",
    "update_settings",
    "create_release",
    "update_branch_protection",
    "enable_signature_protection",
];

/// One recorded API call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub op: &'static str,
    /// Full name of the repository, or the organization for listings
    pub target: String,
}

impl Call {
    pub fn is_write(&self) -> bool {
        WRITE_OPS.contains(&self.op)
    }
}

/// Remote state of one fake repository
#[derive(Debug, Clone, Default)]
pub struct FakeRepo {
    pub summary: RepoSummary,
    pub hooks: Vec<Hook>,
    pub labels: Vec<Label>,
    pub teams: Vec<TeamAccess>,
    pub releases: Vec<Release>,
    pub protection: Option<BranchProtection>,
    pub signatures: bool,
}

impl FakeRepo {
    pub fn new(name: &str) -> Self {
        Self {
            summary: RepoSummary::new("florx", name),
            ..Default::default()
        }
    }

    pub fn archived(mut self) -> Self {
        self.summary.archived = true;
        self
    }

    pub fn with_wiki(mut self) -> Self {
        self.summary.has_wiki = true;
        self
    }

    pub fn with_labels(mut self, names: &[&str]) -> Self {
        self.labels = names
            .iter()
            .map(|n| Label {
                name: n.to_string(),
                color: "ededed".to_string(),
                description: None,
            })
            .collect();
        self
    }

    pub fn with_release(mut self, tag: &str) -> Self {
        self.releases.push(Release {
            tag_name: tag.to_string(),
        });
        self
    }

    pub fn with_protection(mut self, count: u32, strict: bool, contexts: &[&str]) -> Self {
        self.protection = Some(BranchProtection {
            required_approving_review_count: Some(count),
            status_checks: Some(StatusChecks {
                strict,
                contexts: contexts.iter().map(|c| c.to_string()).collect(),
            }),
        });
        self
    }

    pub fn with_signatures(mut self) -> Self {
        self.signatures = true;
        self
    }
}

#[derive(Default)]
struct State {
    repos: BTreeMap<String, FakeRepo>,
    order: Vec<String>,
    calls: Vec<Call>,
    failing_ops: HashSet<&'static str>,
    next_hook_id: u64,
}

/// In-memory GitHub organization that records every call and applies writes
#[derive(Default)]
pub struct FakeGitHub {
    state: Mutex<State>,
}

impl FakeGitHub {
    pub fn new(repos: Vec<FakeRepo>) -> Self {
        let fake = Self::default();
        {
            let mut state = fake.state.lock().unwrap();
            for repo in repos {
                state.order.push(repo.summary.full_name.clone());
                state.repos.insert(repo.summary.full_name.clone(), repo);
            }
        }
        fake
    }

    /// Make every call of `op` fail from now on
    pub fn fail(&self, op: &'static str) {
        self.state.lock().unwrap().failing_ops.insert(op);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn writes(&self) -> Vec<Call> {
        self.calls().into_iter().filter(Call::is_write).collect()
    }

    pub fn ops_for(&self, full_name: &str) -> Vec<&'static str> {
        self.calls()
            .into_iter()
            .filter(|c| c.target == full_name)
            .map(|c| c.op)
            .collect()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    pub fn repo(&self, full_name: &str) -> FakeRepo {
        self.state.lock().unwrap().repos[full_name].clone()
    }

    fn record(&self, op: &'static str, target: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call {
            op,
            target: target.to_string(),
        });
        if state.failing_ops.contains(op) {
            return Err(anyhow!("{} failed: 500 Internal Server Error", op));
        }
        Ok(())
    }

    fn with_repo<T>(&self, repo: &RepoSummary, f: impl FnOnce(&mut FakeRepo) -> T) -> Result<T> {
        let mut state = self.state.lock().unwrap();
        let entry = state
            .repos
            .get_mut(&repo.full_name)
            .ok_or_else(|| anyhow!("404 Not Found: {}", repo.full_name))?;
        Ok(f(entry))
    }
}

#[async_trait]
impl RepoApi for FakeGitHub {
    async fn list_org_repos(&self, org: &str, page: u32) -> Result<RepoPage> {
        self.record("list_org_repos", org)?;
        let state = self.state.lock().unwrap();
        let repos = if page == 1 {
            state
                .order
                .iter()
                .map(|name| state.repos[name].summary.clone())
                .collect()
        } else {
            Vec::new()
        };
        Ok(RepoPage {
            repos,
            has_next: false,
        })
    }

    async fn list_hooks(&self, repo: &RepoSummary) -> Result<Vec<Hook>> {
        self.record("list_hooks", &repo.full_name)?;
        self.with_repo(repo, |r| r.hooks.clone())
    }

    async fn create_hook(&self, repo: &RepoSummary, hook: &NewHook) -> Result<()> {
        self.record("create_hook", &repo.full_name)?;
        let id = {
            let mut state = self.state.lock().unwrap();
            state.next_hook_id += 1;
            state.next_hook_id
        };
        self.with_repo(repo, |r| {
            r.hooks.push(Hook {
                id,
                url: Some(hook.url.clone()),
            })
        })
    }

    async fn list_labels(&self, repo: &RepoSummary) -> Result<Vec<Label>> {
        self.record("list_labels", &repo.full_name)?;
        self.with_repo(repo, |r| r.labels.clone())
    }

    async fn create_label(&self, repo: &RepoSummary, label: &Label) -> Result<()> {
        self.record("create_label", &repo.full_name)?;
        self.with_repo(repo, |r| r.labels.push(label.clone()))
    }

    async fn list_teams(&self, repo: &RepoSummary) -> Result<Vec<TeamAccess>> {
        self.record("list_teams", &repo.full_name)?;
        self.with_repo(repo, |r| r.teams.clone())
    }

    async fn grant_team(
        &self,
        repo: &RepoSummary,
        team_slug: &str,
        permission: TeamPermission,
    ) -> Result<()> {
        self.record("grant_team", &repo.full_name)?;
        self.with_repo(repo, |r| {
            r.teams.retain(|t| t.slug != team_slug);
            r.teams.push(TeamAccess {
                slug: team_slug.to_string(),
                permission: permission.as_api_str().to_string(),
            });
        })
    }

    async fn update_settings(&self, repo: &RepoSummary, patch: &SettingsPatch) -> Result<()> {
        self.record("update_settings", &repo.full_name)?;
        self.with_repo(repo, |r| {
            r.summary.has_wiki = patch.has_wiki;
            r.summary.has_issues = patch.has_issues;
            r.summary.allow_merge_commit = patch.allow_merge_commit;
            r.summary.allow_rebase_merge = patch.allow_rebase_merge;
        })
    }

    async fn list_releases(&self, repo: &RepoSummary) -> Result<Vec<Release>> {
        self.record("list_releases", &repo.full_name)?;
        self.with_repo(repo, |r| r.releases.clone())
    }

    async fn create_release(&self, repo: &RepoSummary, release: &NewRelease) -> Result<()> {
        self.record("create_release", &repo.full_name)?;
        self.with_repo(repo, |r| {
            r.releases.push(Release {
                tag_name: release.tag_name.clone(),
            })
        })
    }

    async fn get_branch_protection(
        &self,
        repo: &RepoSummary,
        _branch: &str,
    ) -> Result<Option<BranchProtection>> {
        self.record("get_branch_protection", &repo.full_name)?;
        self.with_repo(repo, |r| r.protection.clone())
    }

    async fn update_branch_protection(
        &self,
        repo: &RepoSummary,
        _branch: &str,
        update: &ProtectionUpdate,
    ) -> Result<()> {
        self.record("update_branch_protection", &repo.full_name)?;
        self.with_repo(repo, |r| {
            r.protection = Some(BranchProtection {
                required_approving_review_count: Some(update.required_approving_review_count),
                status_checks: Some(StatusChecks {
                    strict: update.strict,
                    contexts: update.contexts.clone(),
                }),
            })
        })
    }

    async fn get_signature_protection(
        &self,
        repo: &RepoSummary,
        _branch: &str,
    ) -> Result<Option<bool>> {
        self.record("get_signature_protection", &repo.full_name)?;
        self.with_repo(repo, |r| r.protection.as_ref().map(|_| r.signatures))
    }

    async fn enable_signature_protection(&self, repo: &RepoSummary, _branch: &str) -> Result<()> {
        self.record("enable_signature_protection", &repo.full_name)?;
        self.with_repo(repo, |r| r.signatures = true)
    }
}
