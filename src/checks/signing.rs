//! Required commit signatures on the protected branch

use anyhow::Result;
use tracing::info;

use super::{CheckOutcome, ProtectedBranch};
use crate::api::{RepoApi, RepoSummary};

/// Require signed commits on a branch the protection check has vouched for.
///
/// A branch the API still reports as unprotected (e.g. during a dry run) is
/// skipped rather than treated as a failure.
pub async fn check_signing(
    api: &dyn RepoApi,
    repo: &RepoSummary,
    protected: &ProtectedBranch,
) -> Result<CheckOutcome> {
    let branch = protected.branch();

    match api.get_signature_protection(repo, branch).await? {
        None => Ok(CheckOutcome::skipped(format!(
            "branch {} is not protected",
            branch
        ))),
        Some(true) => Ok(CheckOutcome::Compliant),
        Some(false) => {
            info!(
                "Signing protection is disabled on {} of {}, enabling it",
                branch, repo.full_name
            );
            api.enable_signature_protection(repo, branch).await?;
            Ok(CheckOutcome::Corrected(1))
        }
    }
}
