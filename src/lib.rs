//! GitCode repository image-hosting connector.
//!
//! Uploads images from a host image-management application into a GitCode
//! repository through the platform's v5 content REST API and removes them
//! again on request. The host supplies settings storage ([`SettingsStore`]),
//! an event bus ([`EventBus`]) carrying removal requests and user
//! notifications, and the `reqwest::Client` used for transport; the
//! connector registers itself in an [`UploaderRegistry`] with its upload
//! handler, display label, and configuration form.

pub mod config;
pub mod connector;
pub mod error;
pub mod events;
pub mod item;
pub mod registry;
pub mod settings;

pub use config::{ConfigField, FieldKind, GitcodeConfig, ResolvedConfig};
pub use connector::GitcodeUploader;
pub use error::{Error, Result};
pub use events::{Event, EventBus, EventPayload};
pub use item::{ImageContent, ImageItem, RemovalDescriptor};
pub use registry::{Registration, Uploader, UploaderRegistry};
pub use settings::{MemorySettings, SettingsStore};
