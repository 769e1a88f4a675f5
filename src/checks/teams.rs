//! Team access check
//!
//! Additive only: teams with access the policy does not mention are left alone.

use anyhow::{bail, Result};
use tracing::{info, warn};

use super::CheckOutcome;
use crate::api::{RepoApi, RepoSummary};
use crate::config::TeamPolicy;

/// Grant each configured team its permission unless the repository already
/// lists that team with exactly that permission. Never revokes access.
pub async fn check_teams(
    api: &dyn RepoApi,
    repo: &RepoSummary,
    grants: &[TeamPolicy],
) -> Result<CheckOutcome> {
    if grants.is_empty() {
        return Ok(CheckOutcome::skipped("no teams configured"));
    }

    let teams = api.list_teams(repo).await?;

    let mut granted = 0;
    let mut failed = Vec::new();

    for grant in grants {
        let wanted = grant.permission.as_api_str();
        if teams
            .iter()
            .any(|team| team.slug == grant.slug && team.permission == wanted)
        {
            continue;
        }

        info!(
            "Team '{}' missing or with wrong permission on {}, granting {}",
            grant.name, repo.full_name, wanted
        );

        match api.grant_team(repo, &grant.slug, grant.permission).await {
            Ok(()) => granted += 1,
            Err(e) => {
                warn!("{:#}", e);
                failed.push(grant.name.as_str());
            }
        }
    }

    if !failed.is_empty() {
        bail!(
            "could not grant {} team(s): {}",
            failed.len(),
            failed.join(", ")
        );
    }

    Ok(if granted == 0 {
        CheckOutcome::Compliant
    } else {
        CheckOutcome::Corrected(granted)
    })
}
