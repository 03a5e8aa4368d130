use std::path::PathBuf;
use std::sync::Arc;

use anyhow::anyhow;
use tracing::error;

use invitation_db::Database;
use invitation_gateway::dispatcher::Dispatcher;
use invitation_types::config::WeddingConfig;

use crate::error::ApiError;
use crate::google::GoogleClient;
use crate::notify::SlackNotifier;
use crate::upload::UploadPolicy;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub dispatcher: Dispatcher,
    pub google: GoogleClient,
    pub notifier: SlackNotifier,
    /// The wedding being served. Immutable for the life of the process.
    pub site: WeddingConfig,
    pub upload: UploadPolicy,
    /// Directory scanned for gallery images; falls back to the configured list.
    pub gallery_dir: Option<PathBuf>,
    /// Mark cookies `Secure` (production deployments behind HTTPS).
    pub secure_cookies: bool,
}

/// Run a blocking store call off the async runtime.
pub(crate) async fn with_db<F, T>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state.db))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal(anyhow!("blocking task failed: {e}"))
        })?
        .map_err(ApiError::Internal)
}
