use std::{sync::Arc, time::Duration};

use axum::Router;
use tracing::{info, warn};

use crate::api::rest::routes;
use crate::config::LmsSyncConfig;
use crate::contract::client::PlatformApi;
use crate::domain::{
    service::Service,
    settings::{Settings, SettingsHolder},
};
use crate::infra::mattermost::MattermostClient;

/// The gateway: validated configuration, reloadable settings and the domain
/// service wired to a platform adapter.
pub struct LmsSync {
    config: LmsSyncConfig,
    settings: Arc<SettingsHolder>,
    service: Arc<Service>,
}

impl LmsSync {
    pub fn new(config: LmsSyncConfig, platform: Arc<dyn PlatformApi>) -> anyhow::Result<Self> {
        config.validate()?;

        let settings = Arc::new(SettingsHolder::new(config.settings()));
        let service = Arc::new(Service::new(platform, settings.clone()));
        info!(
            prefix = %config.normalized_prefix(),
            platform = %config.platform.url,
            "lms_sync gateway initialized"
        );

        Ok(Self {
            config,
            settings,
            service,
        })
    }

    /// Wires the gateway to the platform's REST API.
    pub fn with_rest_platform(config: LmsSyncConfig) -> anyhow::Result<Self> {
        let platform: Arc<dyn PlatformApi> = Arc::new(MattermostClient::new(&config.platform)?);
        Self::new(config, platform)
    }

    pub fn router(&self, timeout: Option<Duration>) -> Router {
        routes::build_router(
            &self.config,
            self.service.clone(),
            self.settings.clone(),
            timeout,
        )
    }

    /// Installs the secret and service identity from `config`. Other fields
    /// only take effect after a restart.
    pub fn reload(&self, config: &LmsSyncConfig) -> anyhow::Result<()> {
        config.validate()?;

        if config.path_prefix != self.config.path_prefix
            || config.assets_dir != self.config.assets_dir
            || config.platform.url != self.config.platform.url
            || config.platform.access_token != self.config.platform.access_token
            || config.platform.timeout_sec != self.config.platform.timeout_sec
        {
            warn!("lms_sync routing or platform settings changed; restart to apply them");
        }

        self.settings.replace(config.settings());
        info!("lms_sync settings reloaded");
        Ok(())
    }

    pub fn settings(&self) -> Arc<Settings> {
        self.settings.snapshot()
    }

    pub fn service(&self) -> Arc<Service> {
        self.service.clone()
    }
}
