//! Dry-run wrapper: real reads, logged writes

use anyhow::Result;
use async_trait::async_trait;
use tracing::info;

use crate::api::{
    BranchProtection, Hook, Label, NewHook, NewRelease, ProtectionUpdate, Release, RepoApi,
    RepoPage, RepoSummary, SettingsPatch, TeamAccess, TeamPermission,
};

/// Forwards every read to `inner` and reports writes without issuing them
pub struct DryRunApi<'a> {
    inner: &'a dyn RepoApi,
}

impl<'a> DryRunApi<'a> {
    pub fn new(inner: &'a dyn RepoApi) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl RepoApi for DryRunApi<'_> {
    async fn list_org_repos(&self, org: &str, page: u32) -> Result<RepoPage> {
        self.inner.list_org_repos(org, page).await
    }

    async fn list_hooks(&self, repo: &RepoSummary) -> Result<Vec<Hook>> {
        self.inner.list_hooks(repo).await
    }

    async fn create_hook(&self, repo: &RepoSummary, hook: &NewHook) -> Result<()> {
        info!(
            "[dry-run] would create webhook {} ({}) on {}",
            hook.url,
            hook.events.join(","),
            repo.full_name
        );
        Ok(())
    }

    async fn list_labels(&self, repo: &RepoSummary) -> Result<Vec<Label>> {
        self.inner.list_labels(repo).await
    }

    async fn create_label(&self, repo: &RepoSummary, label: &Label) -> Result<()> {
        info!(
            "[dry-run] would create label '{}' (#{}) on {}",
            label.name, label.color, repo.full_name
        );
        Ok(())
    }

    async fn list_teams(&self, repo: &RepoSummary) -> Result<Vec<TeamAccess>> {
        self.inner.list_teams(repo).await
    }

    async fn grant_team(
        &self,
        repo: &RepoSummary,
        team_slug: &str,
        permission: TeamPermission,
    ) -> Result<()> {
        info!(
            "[dry-run] would grant team '{}' {} on {}",
            team_slug,
            permission.as_api_str(),
            repo.full_name
        );
        Ok(())
    }

    async fn update_settings(&self, repo: &RepoSummary, patch: &SettingsPatch) -> Result<()> {
        info!("[dry-run] would update settings of {}: {:?}", repo.full_name, patch);
        Ok(())
    }

    async fn list_releases(&self, repo: &RepoSummary) -> Result<Vec<Release>> {
        self.inner.list_releases(repo).await
    }

    async fn create_release(&self, repo: &RepoSummary, release: &NewRelease) -> Result<()> {
        info!(
            "[dry-run] would create release {} on {} targeting {}",
            release.tag_name, repo.full_name, release.target_commitish
        );
        Ok(())
    }

    async fn get_branch_protection(
        &self,
        repo: &RepoSummary,
        branch: &str,
    ) -> Result<Option<BranchProtection>> {
        self.inner.get_branch_protection(repo, branch).await
    }

    async fn update_branch_protection(
        &self,
        repo: &RepoSummary,
        branch: &str,
        update: &ProtectionUpdate,
    ) -> Result<()> {
        info!(
            "[dry-run] would protect {} of {} (reviews: {}, contexts: {})",
            branch,
            repo.full_name,
            update.required_approving_review_count,
            update.contexts.join(",")
        );
        Ok(())
    }

    async fn get_signature_protection(
        &self,
        repo: &RepoSummary,
        branch: &str,
    ) -> Result<Option<bool>> {
        self.inner.get_signature_protection(repo, branch).await
    }

    async fn enable_signature_protection(&self, repo: &RepoSummary, branch: &str) -> Result<()> {
        info!(
            "[dry-run] would require signed commits on {} of {}",
            branch, repo.full_name
        );
        Ok(())
    }
}
