//! repowarden - Organization-wide GitHub Repository Policy Enforcer
//!
//! repowarden walks every repository of a GitHub organization and corrects
//! drift from a single policy, one idempotent check at a time.
//!
//! ## Core Features
//!
//! - **Repository Enumeration**: Paginated organization listing with skip lists
//! - **Webhooks and Labels**: Ensures the PR label webhook and semver labels exist
//! - **Team Access**: Grants configured teams their permission level
//! - **Merge Settings**: Squash-only merging, wiki and issues disabled
//! - **Branch Protection**: Reviews, strict status checks and signed commits
//! - **Dry Run**: Reports every correction without writing
//!
//! ## Modules
//!
//! - [`config`]: Configuration management and parsing
//! - [`api`]: The remote API seam and its data types
//! - [`github`]: GitHub API integration and authentication
//! - [`enumerate`]: Repository listing and selection
//! - [`checks`]: The individual reconciliation checks
//! - [`reconcile`]: Runs the checks and summarizes the outcome

pub mod api;
pub mod checks;
pub mod config;
pub mod dry_run;
pub mod enumerate;
pub mod github;
pub mod reconcile;

pub use api::{RepoApi, RepoSummary};
pub use config::{Config, Policy};
pub use dry_run::DryRunApi;
pub use enumerate::RepoSelector;
pub use github::GitHubClient;
pub use reconcile::{Reconciler, RunSummary};
