//! Webhook check
//!
//! Ensures the PR-label webhook is installed. Hooks are matched by URL only.

use anyhow::Result;
use tracing::{debug, info};

use super::CheckOutcome;
use crate::api::{NewHook, RepoApi, RepoSummary};
use crate::config::WebhookPolicy;

/// Ensure the configured webhook exists, keyed by URL
pub async fn check_hooks(
    api: &dyn RepoApi,
    repo: &RepoSummary,
    webhook: &WebhookPolicy,
) -> Result<CheckOutcome> {
    let url = match webhook.url.as_deref() {
        Some(url) if !url.is_empty() => url,
        _ => return Ok(CheckOutcome::skipped("no webhook url configured")),
    };

    let hooks = api.list_hooks(repo).await?;
    if let Some(existing) = hooks.iter().find(|hook| hook.url.as_deref() == Some(url)) {
        debug!("Webhook {} already present on {}", existing.id, repo.full_name);
        return Ok(CheckOutcome::Compliant);
    }

    info!("Creating webhook for {}", repo.full_name);
    let hook = NewHook {
        url: url.to_string(),
        content_type: webhook.content_type.clone(),
        secret: webhook.secret.clone().filter(|s| !s.is_empty()),
        events: webhook.events.clone(),
    };
    api.create_hook(repo, &hook).await?;

    Ok(CheckOutcome::Corrected(1))
}
