//! Repository feature and merge-strategy settings

use anyhow::Result;
use tracing::info;

use super::CheckOutcome;
use crate::api::{RepoApi, RepoSummary, SettingsPatch};
use crate::config::SettingsPolicy;

/// Fix wiki/issues/merge-strategy flags with one combined update.
///
/// Only the four feature flags are compared; squash merging is written as
/// part of the correction but never inspected.
pub async fn check_settings(
    api: &dyn RepoApi,
    repo: &RepoSummary,
    desired: &SettingsPolicy,
) -> Result<CheckOutcome> {
    let drifted = repo.has_wiki != desired.has_wiki
        || repo.has_issues != desired.has_issues
        || repo.allow_merge_commit != desired.allow_merge_commit
        || repo.allow_rebase_merge != desired.allow_rebase_merge;

    if !drifted {
        return Ok(CheckOutcome::Compliant);
    }

    info!(
        "Repo settings for '{}' are incorrect, so updating them",
        repo.full_name
    );

    let patch = SettingsPatch {
        has_wiki: desired.has_wiki,
        has_issues: desired.has_issues,
        allow_merge_commit: desired.allow_merge_commit,
        allow_rebase_merge: desired.allow_rebase_merge,
        allow_squash_merge: desired.allow_squash_merge,
    };
    api.update_settings(repo, &patch).await?;

    Ok(CheckOutcome::Corrected(1))
}
