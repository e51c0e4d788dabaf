//! Uploader registry: the host-facing seam through which connectors expose
//! their upload handler, display label, and configuration form.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::config::ConfigField;
use crate::error::Result;
use crate::item::ImageItem;

/// Handler the host invokes with a batch of images to upload.
#[async_trait]
pub trait Uploader: Send + Sync {
    /// Process `batch` sequentially, returning it with `img_url` populated
    /// on every item that uploaded successfully.
    async fn handle(&self, batch: Vec<ImageItem>) -> Result<Vec<ImageItem>>;
}

/// Provider of the configuration form, evaluated lazily so the form always
/// reflects the currently stored settings.
pub type ConfigFormFn = Box<dyn Fn() -> Vec<ConfigField> + Send + Sync>;

/// What a connector hands the registry when it registers itself.
pub struct Registration {
    /// Human-readable label shown in the host UI.
    pub name: String,
    /// The upload handler.
    pub uploader: Arc<dyn Uploader>,
    /// Configuration form provider.
    pub config_form: ConfigFormFn,
}

/// Registry of available uploaders, keyed by their fixed id.
#[derive(Default)]
pub struct UploaderRegistry {
    entries: RwLock<HashMap<String, Arc<Registration>>>,
}

impl UploaderRegistry {
    /// Register `registration` under `id`, replacing any previous entry.
    pub fn register(&self, id: &str, registration: Registration) {
        self.entries
            .write()
            .insert(id.to_string(), Arc::new(registration));
    }

    /// Look up a registration by id.
    pub fn get(&self, id: &str) -> Option<Arc<Registration>> {
        self.entries.read().get(id).cloned()
    }

    /// Ids of all registered uploaders.
    pub fn ids(&self) -> Vec<String> {
        self.entries.read().keys().cloned().collect()
    }
}
