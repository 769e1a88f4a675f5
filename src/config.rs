use anyhow::{anyhow, bail, Context, Result};
use dirs::config_dir;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::api::TeamPermission;

/// Main configuration structure for repowarden
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    /// Organization whose repositories are enforced
    #[serde(default = "default_organization")]
    pub organization: String,

    /// GitHub authentication and API settings
    #[serde(default)]
    pub github: GitHubConfig,

    /// Repositories left untouched
    #[serde(default)]
    pub skip: SkipConfig,

    /// Desired state applied to every processed repository
    #[serde(default)]
    pub policy: Policy,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// GitHub configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct GitHubConfig {
    /// Authentication method
    #[serde(default = "default_auth_method")]
    pub auth_method: String, // "token", "gh_cli", "auto"

    /// Base URL for GitHub Enterprise; github.com when unset
    #[serde(default)]
    pub api_url: Option<String>,

    /// Repositories requested per page when enumerating
    #[serde(default = "default_per_page")]
    pub per_page: u8,
}

/// Skip list configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SkipConfig {
    /// Repository names or `*` glob patterns
    #[serde(default)]
    pub repositories: Vec<String>,
}

/// Everything the reconciliation checks compare against
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Policy {
    #[serde(default)]
    pub webhook: WebhookPolicy,

    #[serde(default = "default_labels")]
    pub labels: Vec<LabelPolicy>,

    #[serde(default = "default_teams")]
    pub teams: Vec<TeamPolicy>,

    #[serde(default)]
    pub settings: SettingsPolicy,

    #[serde(default)]
    pub release: ReleasePolicy,

    #[serde(default)]
    pub protection: ProtectionPolicy,
}

/// Webhook that every repository should carry
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct WebhookPolicy {
    /// Target URL; the hook check is skipped when unset
    #[serde(default)]
    pub url: Option<String>,

    /// Shared secret, supports `${VAR}` expansion
    #[serde(default)]
    pub secret: Option<String>,

    #[serde(default = "default_content_type")]
    pub content_type: String,

    #[serde(default = "default_hook_events")]
    pub events: Vec<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct LabelPolicy {
    pub name: String,
    /// Six hex digits, no leading `#`
    pub color: String,
}

impl LabelPolicy {
    fn new(name: &str, color: &str) -> Self {
        Self {
            name: name.to_string(),
            color: color.to_string(),
        }
    }

    /// Description attached to created labels
    pub fn description(&self) -> String {
        format!("{} change", self.name)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct TeamPolicy {
    /// Display name, used for logging only
    pub name: String,
    /// Team slug within the organization
    pub slug: String,
    pub permission: TeamPermission,
}

impl TeamPolicy {
    fn new(name: &str, slug: &str, permission: TeamPermission) -> Self {
        Self {
            name: name.to_string(),
            slug: slug.to_string(),
            permission,
        }
    }
}

/// Desired repository feature flags
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
pub struct SettingsPolicy {
    #[serde(default)]
    pub has_wiki: bool,
    #[serde(default)]
    pub has_issues: bool,
    #[serde(default)]
    pub allow_merge_commit: bool,
    #[serde(default)]
    pub allow_rebase_merge: bool,
    #[serde(default = "default_true")]
    pub allow_squash_merge: bool,
}

/// Baseline release seeded into repositories without any release
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ReleasePolicy {
    #[serde(default = "default_release_tag")]
    pub tag: String,
    #[serde(default = "default_release_name")]
    pub name: String,
    #[serde(default = "default_release_body")]
    pub body: String,
}

/// Branch protection and signing policy
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProtectionPolicy {
    /// Branch to protect
    #[serde(default = "default_branch")]
    pub branch: String,

    #[serde(default = "default_review_count")]
    pub required_approving_review_count: u32,

    #[serde(default)]
    pub status_checks: StatusCheckPolicy,

    /// Require signed commits on the protected branch
    #[serde(default = "default_true")]
    pub require_signatures: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct StatusCheckPolicy {
    /// Context every repository must require
    #[serde(default = "default_status_check")]
    pub default: String,

    /// Repositories whose name contains this also require `additional`;
    /// empty disables the additional contexts
    #[serde(default = "default_additional_contains")]
    pub additional_contains: String,

    #[serde(default = "default_additional_checks")]
    pub additional: Vec<String>,
}

/// Logging configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String, // "info"
}

// Default value functions
fn default_organization() -> String {
    "florx".to_string()
}
fn default_auth_method() -> String {
    "token".to_string()
}
fn default_per_page() -> u8 {
    100
}
fn default_true() -> bool {
    true
}
fn default_content_type() -> String {
    "json".to_string()
}
fn default_hook_events() -> Vec<String> {
    vec!["pull_request".to_string()]
}
fn default_labels() -> Vec<LabelPolicy> {
    vec![
        LabelPolicy::new("major", "b60205"),
        LabelPolicy::new("minor", "e8894a"),
        LabelPolicy::new("patch", "b5d3ff"),
    ]
}
fn default_teams() -> Vec<TeamPolicy> {
    vec![
        TeamPolicy::new("Dev", "dev", TeamPermission::Write),
        TeamPolicy::new("ReadOnly", "readonly", TeamPermission::Read),
        TeamPolicy::new("AllAdmins", "alladmins", TeamPermission::Admin),
    ]
}
fn default_release_tag() -> String {
    "v0.0.1".to_string()
}
fn default_release_name() -> String {
    "v0.0.1 - Initial Release".to_string()
}
fn default_release_body() -> String {
    "This is the initial semver release base number.".to_string()
}
fn default_branch() -> String {
    "master".to_string()
}
fn default_review_count() -> u32 {
    1
}
fn default_status_check() -> String {
    "pr-label-check".to_string()
}
fn default_additional_contains() -> String {
    "service".to_string()
}
fn default_additional_checks() -> Vec<String> {
    vec!["build".to_string(), "test".to_string()]
}
fn default_log_level() -> String {
    "info".to_string()
}

// Default implementations
impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            auth_method: default_auth_method(),
            api_url: None,
            per_page: default_per_page(),
        }
    }
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            webhook: WebhookPolicy::default(),
            labels: default_labels(),
            teams: default_teams(),
            settings: SettingsPolicy::default(),
            release: ReleasePolicy::default(),
            protection: ProtectionPolicy::default(),
        }
    }
}

impl Default for SkipConfig {
    fn default() -> Self {
        Self {
            repositories: vec!["repo-conformity-enforcer".to_string()],
        }
    }
}

impl Default for WebhookPolicy {
    fn default() -> Self {
        Self {
            url: None,
            secret: None,
            content_type: default_content_type(),
            events: default_hook_events(),
        }
    }
}

impl Default for SettingsPolicy {
    fn default() -> Self {
        Self {
            has_wiki: false,
            has_issues: false,
            allow_merge_commit: false,
            allow_rebase_merge: false,
            allow_squash_merge: true,
        }
    }
}

impl Default for ReleasePolicy {
    fn default() -> Self {
        Self {
            tag: default_release_tag(),
            name: default_release_name(),
            body: default_release_body(),
        }
    }
}

impl Default for ProtectionPolicy {
    fn default() -> Self {
        Self {
            branch: default_branch(),
            required_approving_review_count: default_review_count(),
            status_checks: StatusCheckPolicy::default(),
            require_signatures: true,
        }
    }
}

impl Default for StatusCheckPolicy {
    fn default() -> Self {
        Self {
            default: default_status_check(),
            additional_contains: default_additional_contains(),
            additional: default_additional_checks(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            organization: default_organization(),
            github: GitHubConfig::default(),
            skip: SkipConfig::default(),
            policy: Policy::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from the default location, falling back to
    /// built-in defaults when no file exists
    pub fn load_or_default() -> Result<Self> {
        let config_path = Self::default_config_path()?;

        if config_path.exists() {
            Self::load(&config_path)
        } else {
            tracing::debug!(
                "No configuration at {:?}, using built-in defaults",
                config_path
            );
            let mut config = Self::default();
            config.expand_values()?;
            config.validate()?;
            Ok(config)
        }
    }

    /// Load configuration from a specific file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        let mut config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;

        config.expand_values()?;
        config
            .validate()
            .with_context(|| format!("Invalid configuration in {:?}", path))?;

        Ok(config)
    }

    /// Save configuration to a file, creating parent directories
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let content = serde_yaml::to_string(self).context("Failed to serialize configuration")?;

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {:?}", path))?;

        Ok(())
    }

    /// Get the default configuration file path (XDG compliant)
    pub fn default_config_path() -> Result<PathBuf> {
        let config_dir = config_dir().context("Failed to get user config directory")?;

        Ok(config_dir.join("repowarden").join("config.yml"))
    }

    /// Expand environment variables in values that commonly come from
    /// the environment
    pub fn expand_values(&mut self) -> Result<()> {
        let webhook = &mut self.policy.webhook;

        if let Some(url) = &webhook.url {
            webhook.url = Some(
                shellexpand::env(url)
                    .context("Failed to expand webhook url")?
                    .into_owned(),
            );
        }

        if let Some(secret) = &webhook.secret {
            webhook.secret = Some(
                shellexpand::env(secret)
                    .context("Failed to expand webhook secret")?
                    .into_owned(),
            );
        }

        if let Some(api_url) = &self.github.api_url {
            self.github.api_url = Some(
                shellexpand::env(api_url)
                    .context("Failed to expand github api_url")?
                    .into_owned(),
            );
        }

        Ok(())
    }

    /// Reject configurations the checks cannot act on
    pub fn validate(&self) -> Result<()> {
        if self.organization.trim().is_empty() {
            bail!("organization must not be empty");
        }

        if self.github.per_page == 0 {
            bail!("github.per_page must be at least 1");
        }

        let protection = &self.policy.protection;
        if protection.branch.trim().is_empty() {
            bail!("policy.protection.branch must not be empty");
        }
        if !(1..=6).contains(&protection.required_approving_review_count) {
            bail!(
                "policy.protection.required_approving_review_count must be between 1 and 6, got {}",
                protection.required_approving_review_count
            );
        }
        if protection.status_checks.default.trim().is_empty() {
            bail!("policy.protection.status_checks.default must not be empty");
        }

        for label in &self.policy.labels {
            let valid_color =
                label.color.len() == 6 && label.color.chars().all(|c| c.is_ascii_hexdigit());
            if !valid_color {
                return Err(anyhow!(
                    "label '{}' has invalid color '{}' (expected six hex digits)",
                    label.name,
                    label.color
                ));
            }
        }

        let webhook = &self.policy.webhook;
        if webhook.url.as_deref().is_some_and(|u| !u.is_empty()) && webhook.events.is_empty() {
            bail!("policy.webhook.events must not be empty when a webhook url is set");
        }

        Ok(())
    }

    /// Webhook URL if one is configured and non-empty
    pub fn webhook_url(&self) -> Option<&str> {
        self.policy.webhook.url.as_deref().filter(|u| !u.is_empty())
    }
}
