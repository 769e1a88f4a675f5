//! Branch protection reconciliation
//!
//! The comparison is split from the API calls so the decision logic can be
//! exercised directly. [`check_branch_protection`] hands back a
//! [`ProtectedBranch`] on success, which the signing check requires.

use anyhow::Result;
use tracing::info;

use super::CheckOutcome;
use crate::api::{BranchProtection, ProtectionUpdate, RepoApi, RepoSummary};
use crate::config::ProtectionPolicy;

/// Proof that branch protection was found compliant or installed during
/// this pass. Only [`check_branch_protection`] constructs it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtectedBranch {
    branch: String,
}

impl ProtectedBranch {
    pub fn branch(&self) -> &str {
        &self.branch
    }
}

/// Status-check contexts a repository should require
pub fn desired_contexts(repo_name: &str, policy: &ProtectionPolicy) -> Vec<String> {
    let checks = &policy.status_checks;
    let mut contexts = Vec::new();

    if requires_additional(repo_name, policy) {
        contexts.extend(checks.additional.iter().cloned());
    }
    contexts.push(checks.default.clone());
    contexts
}

fn requires_additional(repo_name: &str, policy: &ProtectionPolicy) -> bool {
    let needle = &policy.status_checks.additional_contains;
    !needle.is_empty() && repo_name.contains(needle.as_str())
}

/// Work out whether `current` protection violates the policy and, if so,
/// the single update that fixes it. `None` means compliant.
pub fn plan_protection(
    repo_name: &str,
    current: Option<&BranchProtection>,
    policy: &ProtectionPolicy,
) -> Option<ProtectionUpdate> {
    let update = ProtectionUpdate {
        strict: true,
        contexts: desired_contexts(repo_name, policy),
        required_approving_review_count: policy.required_approving_review_count,
        dismiss_stale_reviews: false,
        require_code_owner_reviews: false,
        enforce_admins: false,
    };

    let Some(current) = current else {
        return Some(update);
    };

    let status = current.status_checks.as_ref();
    let contexts: &[String] = status.map(|s| s.contexts.as_slice()).unwrap_or(&[]);
    let default = &policy.status_checks.default;

    let mut needs_update = current.required_approving_review_count
        != Some(policy.required_approving_review_count);

    if !status.is_some_and(|s| s.strict) {
        needs_update = true;
    }

    if !contexts.contains(default) {
        needs_update = true;
    }

    if requires_additional(repo_name, policy) {
        // Length is compared against additional + default rather than set
        // equality, so duplicates or extra contexts force a rewrite.
        let additional = &policy.status_checks.additional;
        if contexts.len() != additional.len() + 1 {
            needs_update = true;
        } else if additional.iter().any(|c| !contexts.contains(c)) {
            needs_update = true;
        }
    }

    needs_update.then_some(update)
}

/// Ensure `policy.branch` is protected as configured
pub async fn check_branch_protection(
    api: &dyn RepoApi,
    repo: &RepoSummary,
    policy: &ProtectionPolicy,
) -> Result<(CheckOutcome, ProtectedBranch)> {
    let current = api.get_branch_protection(repo, &policy.branch).await?;
    let witness = ProtectedBranch {
        branch: policy.branch.clone(),
    };

    let Some(update) = plan_protection(&repo.name, current.as_ref(), policy) else {
        return Ok((CheckOutcome::Compliant, witness));
    };

    if current.is_none() {
        info!(
            "Branch {} of {} is not protected, protecting it",
            policy.branch, repo.full_name
        );
    } else {
        info!(
            "Branch protection of {} on {} isn't correct, so updating it",
            policy.branch, repo.full_name
        );
    }

    api.update_branch_protection(repo, &policy.branch, &update)
        .await?;

    Ok((CheckOutcome::Corrected(1), witness))
}
