//! Wires configuration into a ready-to-serve [`AppState`].

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;

use zg_domain::config::ConfigSeverity;
use zg_domain::Config;
use zg_sessions::{
    AdmissionController, InstanceStore, LifecycleManager, MessageDispatcher, SessionRegistry,
};

use crate::bridge::BridgeFactory;
use crate::state::AppState;
use crate::webhook::WebhookForwarder;

pub fn build_app_state(config: Config) -> anyhow::Result<AppState> {
    let issues = config.validate();
    let mut fatal = false;
    for issue in &issues {
        match issue.severity {
            ConfigSeverity::Error => {
                fatal = true;
                tracing::error!("config: {issue}");
            }
            ConfigSeverity::Warning => {
                tracing::warn!("config: {issue}");
            }
        }
    }
    if fatal {
        anyhow::bail!("configuration is invalid, refusing to start");
    }

    let store = Arc::new(
        InstanceStore::new(&config.instances.state_path).context("opening instance store")?,
    );
    let registry = Arc::new(SessionRegistry::new());
    let admission = AdmissionController::new(config.instances.max_free);
    let factory = Arc::new(BridgeFactory::new(&config.bridge).context("building bridge factory")?);
    let sink = Arc::new(WebhookForwarder::new(&config.webhook).context("building webhook client")?);

    let lifecycle = LifecycleManager::new(
        registry.clone(),
        store,
        admission,
        factory,
        sink,
        Duration::from_secs(config.instances.reconnect_delay_secs),
    );
    let dispatcher = Arc::new(MessageDispatcher::new(
        registry,
        config.instances.country_code.clone(),
    ));

    Ok(AppState {
        config: Arc::new(config),
        lifecycle,
        dispatcher,
    })
}
