//! Baseline release check

use anyhow::Result;
use tracing::info;

use super::CheckOutcome;
use crate::api::{NewRelease, RepoApi, RepoSummary};
use crate::config::ReleasePolicy;

/// Seed a baseline release into repositories that have none, so release
/// automation has a version to bump from.
///
/// The release targets the repository's default branch, or `fallback_branch`
/// when the API did not report one.
pub async fn check_releases(
    api: &dyn RepoApi,
    repo: &RepoSummary,
    release: &ReleasePolicy,
    fallback_branch: &str,
) -> Result<CheckOutcome> {
    let releases = api.list_releases(repo).await?;
    if !releases.is_empty() {
        return Ok(CheckOutcome::Compliant);
    }

    info!(
        "Didn't find any releases on {} so creating {}",
        repo.full_name, release.tag
    );

    let target = repo
        .default_branch
        .as_deref()
        .filter(|b| !b.is_empty())
        .unwrap_or(fallback_branch);

    let new_release = NewRelease {
        tag_name: release.tag.clone(),
        target_commitish: target.to_string(),
        name: release.name.clone(),
        body: release.body.clone(),
        draft: false,
        prerelease: false,
    };
    api.create_release(repo, &new_release).await?;

    Ok(CheckOutcome::Corrected(1))
}
