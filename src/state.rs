use std::sync::Arc;

use crate::config::Config;
use crate::error::Result;
use crate::services::registry::RegistryClient;
use crate::services::session::SessionManager;

/// The application's state.
#[derive(Clone)]
pub struct AppState {
    /// The application's configuration.
    pub config: Arc<Config>,
    /// Client for the registry API.
    pub registry: RegistryClient,
    /// Reads and writes the session cookie.
    pub sessions: SessionManager,
}

impl AppState {
    /// Creates a new `AppState`.
    pub fn new(config: Config) -> Result<Self> {
        let registry = RegistryClient::new(config.hosted_url.clone(), config.request_timeout)?;
        tracing::info!("✅ Registry client initialized for {}", registry.base_url());

        let sessions = SessionManager::new(&config.session_secrets, config.is_production)?;
        tracing::info!(
            "✅ Session manager initialized ({} secret(s), secure cookies: {})",
            config.session_secrets.len(),
            config.is_production
        );

        Ok(AppState {
            config: Arc::new(config),
            registry,
            sessions,
        })
    }
}
