//! Semver label check

use anyhow::{bail, Result};
use tracing::{info, warn};

use super::CheckOutcome;
use crate::api::{Label, RepoApi, RepoSummary};
use crate::config::LabelPolicy;

/// Create every required label that is missing by exact name.
///
/// Labels are independent: one failed creation does not stop the others,
/// but the check still reports failure afterwards.
pub async fn check_labels(
    api: &dyn RepoApi,
    repo: &RepoSummary,
    required: &[LabelPolicy],
) -> Result<CheckOutcome> {
    let existing = api.list_labels(repo).await?;

    let mut created = 0;
    let mut failed = Vec::new();

    for wanted in required {
        if existing.iter().any(|label| label.name == wanted.name) {
            continue;
        }

        info!(
            "Didn't find label '{}' on {} so creating it",
            wanted.name, repo.full_name
        );

        let label = Label {
            name: wanted.name.clone(),
            color: wanted.color.clone(),
            description: Some(wanted.description()),
        };

        match api.create_label(repo, &label).await {
            Ok(()) => created += 1,
            Err(e) => {
                warn!("{:#}", e);
                failed.push(wanted.name.as_str());
            }
        }
    }

    if !failed.is_empty() {
        bail!(
            "{} label(s) could not be created ({}); {} created",
            failed.len(),
            failed.join(", "),
            created
        );
    }

    Ok(if created == 0 {
        CheckOutcome::Compliant
    } else {
        CheckOutcome::Corrected(created)
    })
}
