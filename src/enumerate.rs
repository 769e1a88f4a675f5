//! Repository enumeration and selection
//!
//! Pages through an organization's repositories and decides which of them
//! the reconciler should touch.

use std::collections::HashSet;
use tracing::{debug, info, warn};

use crate::api::{RepoApi, RepoSummary};

/// Consecutive failed pages after which enumeration gives up
pub const MAX_CONSECUTIVE_PAGE_FAILURES: u32 = 3;

/// Hard stop so a misbehaving API cannot keep the loop alive forever
const MAX_PAGES: u32 = 10_000;

/// Fetch every repository of `org`, in API order, deduplicated by full name.
///
/// A page that fails is logged and skipped; the next page number is tried
/// instead. Enumeration ends when a page reports no successor or after
/// [`MAX_CONSECUTIVE_PAGE_FAILURES`] failures in a row.
pub async fn list_all_repositories(api: &dyn RepoApi, org: &str) -> Vec<RepoSummary> {
    let mut repositories = Vec::new();
    let mut seen = HashSet::new();
    let mut consecutive_failures = 0;
    let mut page = 1u32;

    info!("Getting all repositories for organization {}", org);

    loop {
        match api.list_org_repos(org, page).await {
            Ok(result) => {
                consecutive_failures = 0;
                debug!("Page {} returned {} repositories", page, result.repos.len());

                for repo in result.repos {
                    if seen.insert(repo.full_name.clone()) {
                        repositories.push(repo);
                    } else {
                        debug!("Ignoring duplicate repository {}", repo.full_name);
                    }
                }

                if !result.has_next {
                    break;
                }
            }
            Err(e) => {
                consecutive_failures += 1;
                warn!("Skipping repository page {} for {}: {:#}", page, org, e);

                if consecutive_failures >= MAX_CONSECUTIVE_PAGE_FAILURES {
                    warn!(
                        "Giving up on {} after {} consecutive failed pages; the repository list may be partial",
                        org, consecutive_failures
                    );
                    break;
                }
            }
        }

        if page >= MAX_PAGES {
            warn!("Reached maximum pagination limit ({} pages) for {}", MAX_PAGES, org);
            break;
        }
        page += 1;
    }

    info!(
        "Found {} repositories for organization {}",
        repositories.len(),
        org
    );
    repositories
}

/// Why a repository is left alone
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    Archived,
    /// Matched this skip-list entry
    Excluded(String),
    /// Did not match the `--repo` filter
    NotSelected,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::Archived => write!(f, "archived"),
            SkipReason::Excluded(pattern) => write!(f, "skip list ({})", pattern),
            SkipReason::NotSelected => write!(f, "not selected"),
        }
    }
}

/// Decides which repositories get reconciled
#[derive(Debug, Clone, Default)]
pub struct RepoSelector {
    skip_patterns: Vec<String>,
    only: Option<String>,
}

impl RepoSelector {
    pub fn new(skip_patterns: &[String]) -> Self {
        Self {
            skip_patterns: skip_patterns.to_vec(),
            only: None,
        }
    }

    /// Restrict selection to a single repository name
    pub fn only(mut self, name: Option<String>) -> Self {
        self.only = name;
        self
    }

    /// `None` when the repository should be processed
    pub fn skip_reason(&self, repo: &RepoSummary) -> Option<SkipReason> {
        if let Some(only) = &self.only {
            if &repo.name != only {
                return Some(SkipReason::NotSelected);
            }
        }

        if repo.archived {
            return Some(SkipReason::Archived);
        }

        self.skip_patterns
            .iter()
            .find(|pattern| matches_skip_pattern(&repo.name, pattern))
            .map(|pattern| SkipReason::Excluded(pattern.clone()))
    }
}

/// Exact name, or a simple `*` glob
fn matches_skip_pattern(name: &str, pattern: &str) -> bool {
    if pattern.contains('*') {
        let pattern_regex = regex::escape(pattern).replace(r"\*", ".*");

        regex::Regex::new(&format!("^{}$", pattern_regex))
            .map(|re| re.is_match(name))
            .unwrap_or(false)
    } else {
        name == pattern
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{MockRepoApi, RepoPage};
    use anyhow::anyhow;
    use mockall::Sequence;

    fn page(names: &[&str], has_next: bool) -> RepoPage {
        RepoPage {
            repos: names.iter().map(|n| RepoSummary::new("florx", n)).collect(),
            has_next,
        }
    }

    fn names(repos: &[RepoSummary]) -> Vec<&str> {
        repos.iter().map(|r| r.name.as_str()).collect()
    }

    #[tokio::test]
    async fn test_follows_pagination_until_exhausted() {
        let mut api = MockRepoApi::new();
        let mut seq = Sequence::new();
        api.expect_list_org_repos()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, p| {
                assert_eq!(p, 1);
                Ok(page(&["alpha", "beta"], true))
            });
        api.expect_list_org_repos()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, p| {
                assert_eq!(p, 2);
                Ok(page(&["gamma"], false))
            });

        let repos = list_all_repositories(&api, "florx").await;
        assert_eq!(names(&repos), vec!["alpha", "beta", "gamma"]);
    }

    #[tokio::test]
    async fn test_failed_page_is_skipped() {
        let mut api = MockRepoApi::new();
        let mut seq = Sequence::new();
        api.expect_list_org_repos()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(page(&["alpha"], true)));
        api.expect_list_org_repos()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Err(anyhow!("502 Bad Gateway")));
        api.expect_list_org_repos()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, p| {
                assert_eq!(p, 3);
                Ok(page(&["gamma"], false))
            });

        let repos = list_all_repositories(&api, "florx").await;
        assert_eq!(names(&repos), vec!["alpha", "gamma"]);
    }

    #[tokio::test]
    async fn test_stops_after_consecutive_failures() {
        let mut api = MockRepoApi::new();
        api.expect_list_org_repos()
            .times(MAX_CONSECUTIVE_PAGE_FAILURES as usize)
            .returning(|_, _| Err(anyhow!("connection reset")));

        let repos = list_all_repositories(&api, "florx").await;
        assert!(repos.is_empty());
    }

    #[tokio::test]
    async fn test_duplicates_across_pages_are_dropped() {
        let mut api = MockRepoApi::new();
        let mut seq = Sequence::new();
        api.expect_list_org_repos()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(page(&["alpha", "beta"], true)));
        api.expect_list_org_repos()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(page(&["beta", "gamma"], false)));

        let repos = list_all_repositories(&api, "florx").await;
        assert_eq!(names(&repos), vec!["alpha", "beta", "gamma"]);
    }

    #[test]
    fn test_selector_skips_archived_and_listed() {
        let selector = RepoSelector::new(&["repo-conformity-enforcer".to_string()]);

        let mut archived = RepoSummary::new("florx", "old-service");
        archived.archived = true;
        let listed = RepoSummary::new("florx", "repo-conformity-enforcer");
        let normal = RepoSummary::new("florx", "billing-service");

        assert_eq!(selector.skip_reason(&archived), Some(SkipReason::Archived));
        assert_eq!(
            selector.skip_reason(&listed),
            Some(SkipReason::Excluded("repo-conformity-enforcer".to_string()))
        );
        assert_eq!(selector.skip_reason(&normal), None);
    }

    #[test]
    fn test_selector_only_filter() {
        let selector = RepoSelector::new(&[]).only(Some("billing-service".to_string()));

        assert_eq!(
            selector.skip_reason(&RepoSummary::new("florx", "web")),
            Some(SkipReason::NotSelected)
        );
        assert_eq!(
            selector.skip_reason(&RepoSummary::new("florx", "billing-service")),
            None
        );
    }

    #[test]
    fn test_skip_pattern_matching() {
        assert!(matches_skip_pattern("legacy-api", "legacy-*"));
        assert!(matches_skip_pattern("florx.github.io", "*.github.io"));
        assert!(!matches_skip_pattern("florxgithubxio", "*.github.io"));
        assert!(!matches_skip_pattern("my-legacy-api", "legacy-*"));
        assert!(matches_skip_pattern("sandbox", "sandbox"));
        assert!(!matches_skip_pattern("sandbox2", "sandbox"));
    }
}
