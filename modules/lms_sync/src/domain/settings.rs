use std::sync::Arc;

use parking_lot::RwLock;

/// Per-request view of the gateway configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub secret: String,
    /// Service identity that creates channels and posts announcements.
    pub bot_user_id: String,
}

/// Holds the active settings. Readers take an immutable snapshot; a reload
/// installs a whole new snapshot so in-flight requests keep a consistent view.
#[derive(Debug)]
pub struct SettingsHolder {
    current: RwLock<Arc<Settings>>,
}

impl SettingsHolder {
    pub fn new(settings: Settings) -> Self {
        Self {
            current: RwLock::new(Arc::new(settings)),
        }
    }

    pub fn snapshot(&self) -> Arc<Settings> {
        self.current.read().clone()
    }

    pub fn replace(&self, settings: Settings) {
        *self.current.write() = Arc::new(settings);
    }
}
