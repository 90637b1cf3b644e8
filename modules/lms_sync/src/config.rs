use serde::{Deserialize, Serialize};

use crate::domain::{settings::Settings, validation::is_valid_id};

/// Keys whose values are masked when the configuration is printed.
pub const SENSITIVE_KEYS: &[&str] = &["secret", "access_token"];

/// Gateway configuration, read from the `lms_sync` module section.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct LmsSyncConfig {
    /// Shared secret callers pass as the `secret` query/form value.
    pub secret: String,
    /// Service identity that owns created channels and posts announcements.
    pub bot_user_id: String,
    pub path_prefix: String,
    /// Directory served under `/static`; not mounted when unset.
    pub assets_dir: Option<String>,
    pub platform: PlatformConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlatformConfig {
    pub url: String,
    pub access_token: String,
    pub timeout_sec: u64,
}

impl Default for LmsSyncConfig {
    fn default() -> Self {
        Self {
            secret: String::new(),
            bot_user_id: String::new(),
            path_prefix: "/api/v1".to_string(),
            assets_dir: None,
            platform: PlatformConfig::default(),
        }
    }
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:8065".to_string(),
            access_token: String::new(),
            timeout_sec: 30,
        }
    }
}

impl LmsSyncConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.secret.is_empty() {
            anyhow::bail!("lms_sync.secret must not be empty");
        }
        if !is_valid_id(&self.bot_user_id) {
            anyhow::bail!("lms_sync.bot_user_id is not a valid id");
        }
        if !self.path_prefix.is_empty() && !self.path_prefix.starts_with('/') {
            anyhow::bail!("lms_sync.path_prefix must start with '/'");
        }
        url::Url::parse(&self.platform.url)
            .map_err(|e| anyhow::anyhow!("lms_sync.platform.url is invalid: {e}"))?;
        Ok(())
    }

    /// The hot-reloadable part of the configuration.
    pub fn settings(&self) -> Settings {
        Settings {
            secret: self.secret.clone(),
            bot_user_id: self.bot_user_id.clone(),
        }
    }

    /// Prefix without a trailing slash; empty means routes sit at the root.
    pub fn normalized_prefix(&self) -> &str {
        self.path_prefix.trim_end_matches('/')
    }
}
