//! The GitCode connector: registration, upload handling, and removal
//! handling against the platform's v5 content API.
//!
//! Upload is one `POST /contents{path}/{name}` per image. Removal is a
//! three-step sequence per file: derive the content-API URL from the stored
//! preview URL, fetch the file's current `sha`, then `DELETE` with that
//! `sha` so the platform refuses to drop a concurrently modified file.
//! Batches are processed strictly sequentially; a failed item never aborts
//! the rest of its batch.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::config::{
    config_form, GitcodeConfig, ResolvedConfig, API_VERSION, CONTENTS_SEGMENT, DOMAIN,
    RAW_SEGMENT, SETTINGS_KEY, UPLOADER_ID,
};
use crate::error::{Error, Result};
use crate::events::{EventBus, EventPayload};
use crate::item::{ImageItem, RemovalDescriptor};
use crate::registry::{Registration, Uploader, UploaderRegistry};
use crate::settings::SettingsStore;

/// Content type sent on every content-API request.
const HEADER_CONTENT_TYPE: &str = "application/json;charset=UTF-8";

/// Human-readable label shown in the host UI.
const DISPLAY_NAME: &str = "GitCode";

// Notification literals. Fixed wording; tests and hosts match on these.
pub const UPLOAD_SUCCEEDED_TITLE: &str = "GitCode upload succeeded";
pub const UPLOAD_FAILED_TITLE: &str = "GitCode upload failed";
pub const DUPLICATE_BODY: &str = "The file already exists in the repository";
pub const REMOVAL_RESULT_TITLE: &str = "GitCode removal result";
pub const REMOVAL_FAILED_TITLE: &str = "GitCode removal failed";
pub const REMOVAL_ALL_OK_BODY: &str = "All files were removed from the repository";

/// Content metadata returned by `GET {base}/contents/{path}`. Only the
/// `sha` field is needed for delete confirmation.
#[derive(Debug, Deserialize)]
struct ContentMetadata {
    sha: String,
}

// ---------------------------------------------------------------------------
// GitcodeUploader
// ---------------------------------------------------------------------------

/// Image-hosting connector for GitCode repositories.
pub struct GitcodeUploader {
    settings: Arc<dyn SettingsStore>,
    events: Arc<EventBus>,
    client: reqwest::Client,
    domain: String,
}

impl GitcodeUploader {
    /// Create a connector talking to the GitCode platform.
    ///
    /// The host supplies the `reqwest::Client`; the connector sets no
    /// timeout of its own, so timeout policy stays with the host transport.
    pub fn new(
        settings: Arc<dyn SettingsStore>,
        events: Arc<EventBus>,
        client: reqwest::Client,
    ) -> Arc<Self> {
        Self::with_domain(settings, events, client, DOMAIN)
    }

    /// Create a connector against a non-default domain (used by tests).
    pub fn with_domain(
        settings: Arc<dyn SettingsStore>,
        events: Arc<EventBus>,
        client: reqwest::Client,
        domain: impl Into<String>,
    ) -> Arc<Self> {
        Arc::new(Self {
            settings,
            events,
            client,
            domain: domain.into(),
        })
    }

    /// Register the connector with the host.
    ///
    /// Adds a registry entry carrying the upload handler, display label, and
    /// a config-form provider that reads current settings on every call, and
    /// spawns the listener that dispatches removal events to
    /// [`on_remove`](Self::on_remove). Call once at plugin load: registering
    /// again replaces the registry entry but spawns an additional removal
    /// listener.
    pub fn register(self: &Arc<Self>, registry: &UploaderRegistry) {
        let settings = Arc::clone(&self.settings);
        registry.register(
            UPLOADER_ID,
            Registration {
                name: DISPLAY_NAME.to_string(),
                uploader: Arc::clone(self) as Arc<dyn Uploader>,
                config_form: Box::new(move || {
                    let current: Option<GitcodeConfig> = settings
                        .get(SETTINGS_KEY)
                        .and_then(|value| serde_json::from_value(value).ok());
                    config_form(current.as_ref())
                }),
            },
        );

        let mut rx = self.events.subscribe();
        let connector = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) => {
                        if let EventPayload::RemoveRequested { files } = event.payload {
                            connector.on_remove(files).await;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!("removal listener lagged, skipped {} event(s)", skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
    }

    /// Read settings from the host store and derive the per-operation
    /// configuration. Never cached: edits take effect on the next call.
    fn resolve_config(&self) -> Result<ResolvedConfig> {
        let raw = self
            .settings
            .get(SETTINGS_KEY)
            .ok_or(Error::ConfigurationMissing)?;
        let config: GitcodeConfig = serde_json::from_value(raw)
            .map_err(|err| Error::Validation(err.to_string()))?;
        ResolvedConfig::resolve(&config, &self.domain)
    }

    /// Handle removal of previously uploaded files.
    ///
    /// Descriptors from other uploaders are ignored. One summary
    /// notification is emitted after the whole batch.
    pub async fn on_remove(&self, files: Vec<RemovalDescriptor>) {
        let targets: Vec<RemovalDescriptor> = files
            .into_iter()
            .filter(|file| file.uploader == UPLOADER_ID)
            .collect();
        if targets.is_empty() {
            return;
        }

        let config = match self.resolve_config() {
            Ok(config) => config,
            Err(err) => {
                tracing::error!("GitCode removal aborted: {}", err);
                self.notify(REMOVAL_FAILED_TITLE, format!("Error: {err}"));
                return;
            }
        };

        tracing::info!("removing {} file(s) from GitCode", targets.len());

        let mut failed = 0usize;
        for file in &targets {
            match self.remove_one(file, &config).await {
                Ok(()) => {
                    tracing::info!("removed {} from GitCode", file.display_name());
                }
                Err(err) => {
                    failed += 1;
                    tracing::error!("failed to remove {}: {}", file.display_name(), err);
                }
            }
        }

        let body = if failed == 0 {
            REMOVAL_ALL_OK_BODY.to_string()
        } else {
            format!("Removal partially failed: {failed} file(s) could not be removed")
        };
        self.notify(REMOVAL_RESULT_TITLE, body);
    }

    /// Upload one image: create the file at a collision-free path, then
    /// record the preview URL on the item and drop its bytes.
    async fn upload_one(
        &self,
        item: &mut ImageItem,
        contents_url: &str,
        config: &ResolvedConfig,
    ) -> Result<()> {
        let content = item
            .content
            .as_ref()
            .ok_or_else(|| Error::Validation(format!("{} has no image data", item.file_name)))?
            .to_base64();
        let unique_name = unique_name(&item.file_name);
        let target = encode_uri(&format!("{contents_url}/{unique_name}"));

        tracing::debug!("uploading {} to {}", item.file_name, target);

        // The platform expects the JSON content type even though the body
        // is form-encoded, so the body is built by hand instead of `.form()`.
        let body = serde_urlencoded::to_string([
            ("access_token", config.token.as_str()),
            ("content", content.as_str()),
            ("message", config.message.as_str()),
        ])
        .map_err(|err| Error::remote(err.to_string()))?;

        let response = self
            .client
            .post(&target)
            .header(CONTENT_TYPE, HEADER_CONTENT_TYPE)
            .body(body)
            .send()
            .await?;

        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::classify_remote(&body));
        }

        item.img_url = Some(format!("{}/{unique_name}", config.preview_url));
        item.uploader = UPLOADER_ID.to_string();
        // Drop the image bytes as soon as the remote has accepted them so a
        // large batch never accumulates raw content.
        item.content = None;

        tracing::info!("uploaded {} to GitCode", item.file_name);
        self.notify(
            UPLOAD_SUCCEEDED_TITLE,
            format!("{} was uploaded to the repository", item.file_name),
        );
        Ok(())
    }

    /// Remove one file: derive its content-API URL, fetch the current
    /// `sha`, then delete with that `sha`.
    async fn remove_one(&self, file: &RemovalDescriptor, config: &ResolvedConfig) -> Result<()> {
        let content_url = derive_content_url(&file.img_url)?;
        let sha = self.fetch_sha(&content_url, config).await?;
        let url = build_delete_url(&content_url, config, &sha);

        let response = self
            .client
            .delete(&url)
            .header(CONTENT_TYPE, HEADER_CONTENT_TYPE)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::remote(format!("delete failed ({status}): {body}")));
        }
        Ok(())
    }

    /// Fetch the content hash the platform requires for delete confirmation.
    async fn fetch_sha(&self, content_url: &str, config: &ResolvedConfig) -> Result<String> {
        let url = encode_uri(&format!("{content_url}?access_token={}", config.token));

        let response = self
            .client
            .get(&url)
            .header(CONTENT_TYPE, HEADER_CONTENT_TYPE)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::remote(format!(
                "metadata fetch failed ({status}): {body}"
            )));
        }

        let body = response.text().await?;
        let metadata: ContentMetadata = serde_json::from_str(&body)
            .map_err(|err| Error::MalformedHashResponse(err.to_string()))?;
        Ok(metadata.sha)
    }

    fn report_upload_failure(&self, file_name: &str, err: &Error) {
        let body = match err {
            Error::DuplicateName => DUPLICATE_BODY.to_string(),
            other => format!("Error: {other}"),
        };
        tracing::error!("upload of {} failed: {}", file_name, err);
        self.notify(UPLOAD_FAILED_TITLE, body);
    }

    fn notify(&self, title: &str, body: String) {
        self.events.emit(EventPayload::Notification {
            title: title.to_string(),
            body,
        });
    }
}

#[async_trait]
impl Uploader for GitcodeUploader {
    async fn handle(&self, mut batch: Vec<ImageItem>) -> Result<Vec<ImageItem>> {
        let config = self.resolve_config()?;
        let contents_url = format!("{}/{CONTENTS_SEGMENT}{}", config.base_url, config.path);

        tracing::info!(
            "uploading {} image(s) to {}/{}",
            batch.len(),
            config.owner,
            config.repo
        );

        for item in batch.iter_mut() {
            if let Err(err) = self.upload_one(item, &contents_url, &config).await {
                self.report_upload_failure(&item.file_name, &err);
            }
        }

        Ok(batch)
    }
}

// ---------------------------------------------------------------------------
// URL helpers
// ---------------------------------------------------------------------------

/// Collision-avoidance name: a letter-prefixed v4 UUID prepended to the
/// original file name, so repeated uploads of the same file never collide
/// on the remote path.
fn unique_name(file_name: &str) -> String {
    format!("a{}{file_name}", Uuid::new_v4())
}

/// Derive the content-API URL for a file from its preview URL by replacing
/// the scheme+host prefix with `{origin}/api/{version}/repos` and the
/// branch segment with the content-API segment. Only URLs produced by this
/// connector's own upload step are supported input.
fn derive_content_url(preview_url: &str) -> Result<String> {
    let parsed = reqwest::Url::parse(preview_url)
        .map_err(|_| Error::remote(format!("invalid preview URL: {preview_url}")))?;
    let host = parsed
        .host_str()
        .ok_or_else(|| Error::remote(format!("invalid preview URL: {preview_url}")))?;
    let mut origin = format!("{}://{host}", parsed.scheme());
    if let Some(port) = parsed.port() {
        origin.push_str(&format!(":{port}"));
    }

    let replaced = preview_url.replacen(&origin, &format!("{origin}/api/{API_VERSION}/repos"), 1);
    Ok(replaced.replacen(RAW_SEGMENT, CONTENTS_SEGMENT, 1))
}

/// Delete URL carrying exactly `access_token`, `message`, and `sha`, in
/// that order, percent-encoded as a whole.
fn build_delete_url(content_url: &str, config: &ResolvedConfig, sha: &str) -> String {
    encode_uri(&format!(
        "{content_url}?access_token={}&message={}&sha={sha}",
        config.token, config.message
    ))
}

/// Percent-encode a complete URL, leaving URI structure characters intact
/// (the same character set JavaScript's `encodeURI` keeps unescaped).
fn encode_uri(url: &str) -> String {
    let mut out = String::with_capacity(url.len());
    for &b in url.as_bytes() {
        match b {
            b'A'..=b'Z'
            | b'a'..=b'z'
            | b'0'..=b'9'
            | b'-'
            | b'_'
            | b'.'
            | b'!'
            | b'~'
            | b'*'
            | b'\''
            | b'('
            | b')'
            | b';'
            | b','
            | b'/'
            | b'?'
            | b':'
            | b'@'
            | b'&'
            | b'='
            | b'+'
            | b'$'
            | b'#' => out.push(b as char),
            _ => {
                out.push('%');
                out.push_str(&format!("{b:02X}"));
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_COMMIT_MESSAGE;
    use assert_matches::assert_matches;

    fn resolved() -> ResolvedConfig {
        let config = GitcodeConfig {
            owner: "acme".into(),
            repo: "imgs".into(),
            path: Some("pics".into()),
            token: "secret-token".into(),
            message: None,
        };
        ResolvedConfig::resolve(&config, DOMAIN).unwrap()
    }

    #[test]
    fn derive_content_url_replaces_origin_and_branch_segment() {
        let derived =
            derive_content_url("https://gitcode.com/acme/imgs/raw/master/pics/a.png").unwrap();
        assert_eq!(
            derived,
            "https://gitcode.com/api/v5/repos/acme/imgs/contents/pics/a.png"
        );
    }

    #[test]
    fn derive_content_url_keeps_ports() {
        let derived =
            derive_content_url("http://127.0.0.1:8080/acme/imgs/raw/master/a.png").unwrap();
        assert_eq!(
            derived,
            "http://127.0.0.1:8080/api/v5/repos/acme/imgs/contents/a.png"
        );
    }

    #[test]
    fn derive_content_url_rejects_garbage() {
        assert_matches!(
            derive_content_url("not a url"),
            Err(Error::RemoteRequest { .. })
        );
    }

    #[test]
    fn delete_url_has_three_params_in_order() {
        let url = build_delete_url(
            "https://gitcode.com/api/v5/repos/acme/imgs/contents/pics/a.png",
            &resolved(),
            "abc123",
        );
        assert_eq!(
            url,
            "https://gitcode.com/api/v5/repos/acme/imgs/contents/pics/a.png\
             ?access_token=secret-token&message=picgo%20commit&sha=abc123"
        );
        // The effective message is the default literal, percent-encoded as
        // part of the whole URL.
        assert!(DEFAULT_COMMIT_MESSAGE.contains(' '));
    }

    #[test]
    fn encode_uri_keeps_url_structure() {
        assert_eq!(
            encode_uri("https://gitcode.com/a b/c?x=1&y=2"),
            "https://gitcode.com/a%20b/c?x=1&y=2"
        );
    }

    #[test]
    fn encode_uri_escapes_non_ascii() {
        assert_eq!(encode_uri("图.png"), "%E5%9B%BE.png");
    }

    #[test]
    fn unique_names_differ_and_keep_the_file_name() {
        let a = unique_name("cat.png");
        let b = unique_name("cat.png");
        assert_ne!(a, b);
        assert!(a.starts_with('a'));
        assert!(a.ends_with("cat.png"));
        // "a" + hyphenated uuid + original name.
        assert_eq!(a.len(), 1 + 36 + "cat.png".len());
    }
}
