//! Reconciliation checks
//!
//! Each check reads one aspect of a repository, compares it with the
//! [`Policy`](crate::config::Policy) and issues at most the corrective calls
//! needed. Checks never panic on API failures; they return the error and
//! leave logging and bookkeeping to the reconciler.

pub mod hooks;
pub mod labels;
pub mod protection;
pub mod releases;
pub mod settings;
pub mod signing;
pub mod teams;

pub use protection::ProtectedBranch;

/// The reconciliation checks, in the order they run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CheckKind {
    Hooks,
    Labels,
    Teams,
    Settings,
    Releases,
    BranchProtection,
    Signing,
}

impl CheckKind {
    pub const ALL: [CheckKind; 7] = [
        CheckKind::Hooks,
        CheckKind::Labels,
        CheckKind::Teams,
        CheckKind::Settings,
        CheckKind::Releases,
        CheckKind::BranchProtection,
        CheckKind::Signing,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CheckKind::Hooks => "hooks",
            CheckKind::Labels => "labels",
            CheckKind::Teams => "teams",
            CheckKind::Settings => "settings",
            CheckKind::Releases => "releases",
            CheckKind::BranchProtection => "branch-protection",
            CheckKind::Signing => "signing",
        }
    }
}

impl std::fmt::Display for CheckKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a check that did not fail
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckOutcome {
    /// Remote state already matched
    Compliant,
    /// This many corrective writes were issued
    Corrected(usize),
    /// Nothing to do for this repository
    Skipped(String),
}

impl CheckOutcome {
    pub fn skipped(reason: impl Into<String>) -> Self {
        CheckOutcome::Skipped(reason.into())
    }

    /// Number of writes this outcome stands for
    pub fn changes(&self) -> usize {
        match self {
            CheckOutcome::Corrected(n) => *n,
            _ => 0,
        }
    }
}
