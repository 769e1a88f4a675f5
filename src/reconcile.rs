//! Reconciler - walks repositories and runs every check in order
//!
//! The reconciler owns no state beyond the API handle and the policy it was
//! given. Check failures are logged and recorded, never propagated, so one
//! broken repository cannot stop the run.

use anyhow::Result;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::api::{RepoApi, RepoSummary};
use crate::checks::{
    hooks::check_hooks, labels::check_labels, protection::check_branch_protection,
    releases::check_releases, settings::check_settings, signing::check_signing, teams::check_teams,
    CheckKind, CheckOutcome,
};
use crate::config::Policy;
use crate::enumerate::{list_all_repositories, RepoSelector, SkipReason};

/// A check that returned an error
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckFailure {
    pub repository: String,
    pub check: CheckKind,
    pub message: String,
}

/// What happened to one repository
#[derive(Debug, Clone)]
pub struct RepoReport {
    pub repository: String,
    /// One entry per check, in execution order; `Err` holds the message
    pub results: Vec<(CheckKind, std::result::Result<CheckOutcome, String>)>,
}

impl RepoReport {
    fn new(repository: &str) -> Self {
        Self {
            repository: repository.to_string(),
            results: Vec::with_capacity(CheckKind::ALL.len()),
        }
    }

    fn record(&mut self, check: CheckKind, result: Result<CheckOutcome>) {
        let entry = match result {
            Ok(outcome) => {
                match &outcome {
                    CheckOutcome::Compliant => debug!("{} {}: compliant", self.repository, check),
                    CheckOutcome::Corrected(n) => {
                        info!("{} {}: {} correction(s)", self.repository, check, n)
                    }
                    CheckOutcome::Skipped(reason) => {
                        debug!("{} {}: skipped ({})", self.repository, check, reason)
                    }
                }
                Ok(outcome)
            }
            Err(e) => {
                warn!("{} {}: {:#}", self.repository, check, e);
                Err(format!("{:#}", e))
            }
        };
        self.results.push((check, entry));
    }

    /// Corrective writes issued for this repository
    pub fn changes(&self) -> usize {
        self.results
            .iter()
            .filter_map(|(_, r)| r.as_ref().ok())
            .map(CheckOutcome::changes)
            .sum()
    }

    pub fn failures(&self) -> impl Iterator<Item = CheckFailure> + '_ {
        self.results.iter().filter_map(|(check, r)| {
            r.as_ref().err().map(|message| CheckFailure {
                repository: self.repository.clone(),
                check: *check,
                message: message.clone(),
            })
        })
    }
}

/// Results from a complete enforcement run
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub total_repositories: usize,
    pub processed_repositories: usize,
    pub skipped: Vec<(String, SkipReason)>,
    pub corrections: usize,
    pub compliant_checks: usize,
    pub skipped_checks: usize,
    pub failures: Vec<CheckFailure>,
    pub duration: Duration,
}

impl RunSummary {
    fn absorb(&mut self, report: &RepoReport) {
        self.processed_repositories += 1;
        self.corrections += report.changes();
        for (_, result) in &report.results {
            match result {
                Ok(CheckOutcome::Compliant) => self.compliant_checks += 1,
                Ok(CheckOutcome::Skipped(_)) => self.skipped_checks += 1,
                _ => {}
            }
        }
        self.failures.extend(report.failures());
    }
}

/// Applies a [`Policy`] to repositories through a [`RepoApi`]
pub struct Reconciler<'a> {
    api: &'a dyn RepoApi,
    policy: &'a Policy,
}

impl<'a> Reconciler<'a> {
    pub fn new(api: &'a dyn RepoApi, policy: &'a Policy) -> Self {
        Self { api, policy }
    }

    /// Run all checks against one repository, in fixed order
    pub async fn reconcile_repo(&self, repo: &RepoSummary) -> RepoReport {
        info!("Processing {} ...", repo.full_name);

        let api = self.api;
        let policy = self.policy;
        let mut report = RepoReport::new(&repo.full_name);

        report.record(
            CheckKind::Hooks,
            check_hooks(api, repo, &policy.webhook).await,
        );
        report.record(
            CheckKind::Labels,
            check_labels(api, repo, &policy.labels).await,
        );
        report.record(CheckKind::Teams, check_teams(api, repo, &policy.teams).await);
        report.record(
            CheckKind::Settings,
            check_settings(api, repo, &policy.settings).await,
        );
        report.record(
            CheckKind::Releases,
            check_releases(api, repo, &policy.release, &policy.protection.branch).await,
        );

        let protected = match check_branch_protection(api, repo, &policy.protection).await {
            Ok((outcome, witness)) => {
                report.record(CheckKind::BranchProtection, Ok(outcome));
                Some(witness)
            }
            Err(e) => {
                report.record(CheckKind::BranchProtection, Err(e));
                None
            }
        };

        let signing = if !policy.protection.require_signatures {
            Ok(CheckOutcome::skipped("signature enforcement disabled"))
        } else if let Some(protected) = &protected {
            check_signing(api, repo, protected).await
        } else {
            Ok(CheckOutcome::skipped("branch protection not in place"))
        };
        report.record(CheckKind::Signing, signing);

        report
    }

    /// Reconcile every repository the selector accepts
    pub async fn run(&self, repositories: &[RepoSummary], selector: &RepoSelector) -> RunSummary {
        let start_time = Instant::now();
        let mut summary = RunSummary {
            total_repositories: repositories.len(),
            ..Default::default()
        };

        for repo in repositories {
            if let Some(reason) = selector.skip_reason(repo) {
                debug!("Skipping {}: {}", repo.full_name, reason);
                summary.skipped.push((repo.full_name.clone(), reason));
                continue;
            }

            let report = self.reconcile_repo(repo).await;
            summary.absorb(&report);
        }

        summary.duration = start_time.elapsed();

        info!(
            "Run completed in {:.2}s: {} processed, {} corrections, {} failed checks",
            summary.duration.as_secs_f64(),
            summary.processed_repositories,
            summary.corrections,
            summary.failures.len()
        );

        summary
    }

    /// Enumerate `org` and reconcile everything the selector accepts
    pub async fn run_organization(&self, org: &str, selector: &RepoSelector) -> RunSummary {
        let repositories = list_all_repositories(self.api, org).await;
        info!("Got all repositories, processing one by one...");
        self.run(&repositories, selector).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MockRepoApi;
    use crate::config::Config;
    use anyhow::anyhow;

    fn quiet_api() -> MockRepoApi {
        let mut api = MockRepoApi::new();
        api.expect_list_labels().returning(|_| Ok(Vec::new()));
        api.expect_create_label().returning(|_, _| Ok(()));
        api.expect_list_teams().returning(|_| Ok(Vec::new()));
        api.expect_grant_team().returning(|_, _, _| Ok(()));
        api.expect_list_releases().returning(|_| Ok(Vec::new()));
        api.expect_create_release().returning(|_, _| Ok(()));
        api
    }

    #[tokio::test]
    async fn test_protection_failure_skips_signing() {
        let mut api = quiet_api();
        api.expect_get_branch_protection()
            .times(1)
            .returning(|_, _| Err(anyhow!("502 Bad Gateway")));
        api.expect_get_signature_protection().times(0);

        let config = Config::default();
        let reconciler = Reconciler::new(&api, &config.policy);
        let report = reconciler
            .reconcile_repo(&RepoSummary::new("florx", "web"))
            .await;

        let checks: Vec<_> = report.results.iter().map(|(c, _)| *c).collect();
        assert_eq!(checks, CheckKind::ALL.to_vec());

        let failures: Vec<_> = report.failures().collect();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].check, CheckKind::BranchProtection);
        assert!(failures[0].message.contains("502"));

        let (_, signing) = report.results.last().unwrap();
        assert!(matches!(signing, Ok(CheckOutcome::Skipped(_))));
    }

    #[tokio::test]
    async fn test_disabled_signing_is_never_queried() {
        let mut api = quiet_api();
        api.expect_get_branch_protection()
            .returning(|_, _| Ok(None));
        api.expect_update_branch_protection()
            .returning(|_, _, _| Ok(()));
        api.expect_get_signature_protection().times(0);

        let mut config = Config::default();
        config.policy.protection.require_signatures = false;

        let reconciler = Reconciler::new(&api, &config.policy);
        let report = reconciler
            .reconcile_repo(&RepoSummary::new("florx", "web"))
            .await;

        // 3 labels + 3 teams + release + protection
        assert_eq!(report.changes(), 8);
        assert_eq!(report.failures().count(), 0);
    }

    #[tokio::test]
    async fn test_summary_counts_skips() {
        let api = MockRepoApi::new();
        let config = Config::default();
        let reconciler = Reconciler::new(&api, &config.policy);

        let mut archived = RepoSummary::new("florx", "old");
        archived.archived = true;
        let repos = vec![archived, RepoSummary::new("florx", "repo-conformity-enforcer")];

        let selector = RepoSelector::new(&config.skip.repositories);
        let summary = reconciler.run(&repos, &selector).await;

        assert_eq!(summary.total_repositories, 2);
        assert_eq!(summary.processed_repositories, 0);
        assert_eq!(summary.skipped.len(), 2);
        assert_eq!(summary.skipped[0].1, SkipReason::Archived);
    }
}
