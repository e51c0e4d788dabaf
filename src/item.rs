//! Image batch items and removal descriptors exchanged with the host.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};

/// Image bytes as handed over by the host.
#[derive(Debug, Clone)]
pub enum ImageContent {
    /// Raw image bytes.
    Raw(Vec<u8>),
    /// Already base64-encoded image data.
    Base64(String),
}

impl ImageContent {
    /// Base64 text of the image bytes, re-encoding when the source is raw.
    pub fn to_base64(&self) -> String {
        match self {
            Self::Raw(bytes) => BASE64.encode(bytes),
            Self::Base64(text) => text.clone(),
        }
    }
}

/// One image of an upload batch.
///
/// Owned by the host for the duration of the batch; the connector fills in
/// `img_url` on success and clears `content` as soon as the remote has
/// accepted the bytes, so a large batch never holds more than one image in
/// memory longer than necessary.
#[derive(Debug, Clone, Default)]
pub struct ImageItem {
    /// File name as chosen by the user.
    pub file_name: String,
    /// Image data; `None` once uploaded (or when the host never set it).
    pub content: Option<ImageContent>,
    /// Public preview URL, set on successful upload.
    pub img_url: Option<String>,
    /// Type tag of the connector that produced the item.
    pub uploader: String,
}

impl ImageItem {
    /// Convenience constructor for an item carrying raw bytes.
    pub fn from_bytes(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            content: Some(ImageContent::Raw(bytes)),
            img_url: None,
            uploader: String::new(),
        }
    }
}

/// Minimal record the host passes back when the user deletes a previously
/// uploaded image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemovalDescriptor {
    /// Preview URL produced by the upload step.
    pub img_url: String,
    /// Original file name, if the host still knows it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    /// Type tag of the connector that uploaded the file.
    pub uploader: String,
}

impl RemovalDescriptor {
    /// Display name used in logs: the file name when known, otherwise the
    /// preview URL.
    pub fn display_name(&self) -> &str {
        self.file_name.as_deref().unwrap_or(&self.img_url)
    }
}
