//! Connector configuration: stored settings, validation, derived URLs, and
//! the configuration form schema.
//!
//! Settings live in the host's settings store under [`SETTINGS_KEY`] and are
//! re-read on every operation, so edits take effect immediately. Nothing in
//! this module is cached.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Identifier the connector registers under; also the type tag stamped on
/// items it has uploaded.
pub const UPLOADER_ID: &str = "gitcode";

/// Key under which the connector's settings live in the host settings store.
pub const SETTINGS_KEY: &str = "picbed.gitcode";

/// GitCode platform domain.
pub const DOMAIN: &str = "https://gitcode.com";

/// Content API version segment.
pub const API_VERSION: &str = "v5";

/// Commit message used when none is configured.
pub const DEFAULT_COMMIT_MESSAGE: &str = "picgo commit";

/// Branch path segment embedded in preview URLs.
pub const RAW_SEGMENT: &str = "raw/master";

/// Content-API path segment that replaces [`RAW_SEGMENT`] when deriving an
/// API URL from a preview URL.
pub const CONTENTS_SEGMENT: &str = "contents";

// ---------------------------------------------------------------------------
// GitcodeConfig
// ---------------------------------------------------------------------------

/// User-editable settings as stored by the host.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitcodeConfig {
    /// GitCode user or organisation name.
    pub owner: String,
    /// Repository holding the uploaded images.
    pub repo: String,
    /// Optional sub-path inside the repository, without a leading slash.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Personal access token.
    pub token: String,
    /// Optional commit message for uploads and deletions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl GitcodeConfig {
    /// Validate the stored settings.
    pub fn validate(&self) -> Result<()> {
        if self.owner.is_empty() {
            return Err(Error::Validation("owner must not be empty".into()));
        }
        if self.repo.is_empty() {
            return Err(Error::Validation("repo must not be empty".into()));
        }
        if self.token.is_empty() {
            return Err(Error::Validation("token must not be empty".into()));
        }
        if let Some(path) = &self.path {
            if path.starts_with('/') {
                return Err(Error::Validation(
                    "path must not start with '/' (the connector adds one)".into(),
                ));
            }
        }
        Ok(())
    }

    /// Repository sub-path with the leading slash the content API expects,
    /// or the empty string for the repository root.
    pub fn formatted_path(&self) -> String {
        match &self.path {
            Some(path) if !path.is_empty() => format!("/{path}"),
            _ => String::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// ResolvedConfig
// ---------------------------------------------------------------------------

/// Validated settings plus the URLs derived from them.
///
/// Built fresh per operation and never persisted; holding it across calls
/// would defeat the read-fresh-settings contract.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub owner: String,
    pub repo: String,
    pub token: String,
    /// `{domain}/api/{version}/repos/{owner}/{repo}`
    pub base_url: String,
    /// `{domain}/{owner}/{repo}/raw/master{path}` — public raw-content URL
    /// prefix for uploaded files.
    pub preview_url: String,
    /// Effective commit message (configured or the default literal).
    pub message: String,
    /// Formatted repository sub-path (`"/sub"` or `""`).
    pub path: String,
}

impl ResolvedConfig {
    /// Validate `config` and compute the derived fields against `domain`.
    pub fn resolve(config: &GitcodeConfig, domain: &str) -> Result<Self> {
        config.validate()?;
        let path = config.formatted_path();
        Ok(Self {
            owner: config.owner.clone(),
            repo: config.repo.clone(),
            token: config.token.clone(),
            base_url: format!(
                "{domain}/api/{API_VERSION}/repos/{}/{}",
                config.owner, config.repo
            ),
            preview_url: format!(
                "{domain}/{}/{}/{RAW_SEGMENT}{path}",
                config.owner, config.repo
            ),
            message: config
                .message
                .clone()
                .unwrap_or_else(|| DEFAULT_COMMIT_MESSAGE.to_string()),
            path,
        })
    }
}

// ---------------------------------------------------------------------------
// Configuration form schema
// ---------------------------------------------------------------------------

/// Input kind for a configuration form field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    /// Plain text input.
    Text,
    /// Masked input for secrets.
    Secret,
}

/// One field descriptor of the configuration form the host renders.
#[derive(Debug, Clone, Serialize)]
pub struct ConfigField {
    /// Settings key of the field.
    pub name: &'static str,
    pub kind: FieldKind,
    pub required: bool,
    /// Short label shown next to the input.
    pub label: &'static str,
    /// Help text shown below the input.
    pub description: &'static str,
    /// Pre-populated value from the currently stored settings.
    pub default: Option<String>,
}

/// Build the ordered configuration form, pre-populated from `current`.
pub fn config_form(current: Option<&GitcodeConfig>) -> Vec<ConfigField> {
    vec![
        ConfigField {
            name: "owner",
            kind: FieldKind::Text,
            required: true,
            label: "Owner",
            description: "GitCode user or organisation name",
            default: current.map(|c| c.owner.clone()),
        },
        ConfigField {
            name: "repo",
            kind: FieldKind::Text,
            required: true,
            label: "Repository",
            description: "Repository used to store the uploaded images",
            default: current.map(|c| c.repo.clone()),
        },
        ConfigField {
            name: "path",
            kind: FieldKind::Text,
            required: false,
            label: "Path",
            description: "Storage path inside the repository; leave empty for the root",
            default: current.and_then(|c| c.path.clone()),
        },
        ConfigField {
            name: "token",
            kind: FieldKind::Secret,
            required: true,
            label: "Token",
            description: "GitCode personal access token",
            default: current.map(|c| c.token.clone()),
        },
        ConfigField {
            name: "message",
            kind: FieldKind::Text,
            required: false,
            label: "Commit message",
            description: "Git commit message for uploads; defaults to \"picgo commit\"",
            default: Some(
                current
                    .and_then(|c| c.message.clone())
                    .unwrap_or_else(|| DEFAULT_COMMIT_MESSAGE.to_string()),
            ),
        },
    ]
}
