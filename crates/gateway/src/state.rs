use std::sync::Arc;

use zg_domain::config::Config;
use zg_sessions::{LifecycleManager, MessageDispatcher};

/// Shared application state passed to all API handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    /// Session lifecycle orchestration (create / restore / destroy) and
    /// connection-state projections.
    pub lifecycle: Arc<LifecycleManager>,
    /// Readiness-guarded outbound dispatch.
    pub dispatcher: Arc<MessageDispatcher>,
}
