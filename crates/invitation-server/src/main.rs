mod config;

use std::net::SocketAddr;
use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use invitation_api::google::GoogleClient;
use invitation_api::notify::SlackNotifier;
use invitation_api::state::{AppState, AppStateInner};
use invitation_gateway::dispatcher::Dispatcher;
use invitation_types::config::WeddingConfig;

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "invitation=debug,tower_http=debug".into()),
        )
        .init();

    let config = Config::load()?;

    // Wedding description
    let site = match &config.config_path {
        Some(path) => WeddingConfig::load(path)?,
        None => {
            warn!("INVITATION_CONFIG_PATH not set, serving the example wedding");
            WeddingConfig::example()?
        }
    };
    info!("Serving invitation '{}'", site.meta.title);

    // Init database
    let db = invitation_db::Database::open(&config.db_path)?;

    let mut google = GoogleClient::new(config.oauth.clone());
    if let Some(account) = config.service_account.clone() {
        info!("Google service account configured for {}", account.client_email);
        google = google.with_service_account(account);
    }
    if config.oauth.client_id.is_empty() {
        warn!("GOOGLE_CLIENT_ID not set, Google sign-in is unavailable");
    }

    let notifier = SlackNotifier::new(config.slack_webhook_url.clone(), &site.slack);
    if !notifier.is_enabled() {
        info!("SLACK_WEBHOOK_URL not set, guestbook notifications disabled");
    }

    let upload = config.upload_policy(site.google_photos.album_id.clone());
    info!(
        "Uploads go to {:?}, up to {}MB",
        upload.target,
        upload.max_mb()
    );

    // Shared state
    let state: AppState = Arc::new(AppStateInner {
        db,
        dispatcher: Dispatcher::new(),
        google,
        notifier,
        site,
        upload,
        gallery_dir: config.gallery_dir.clone(),
        secure_cookies: config.production,
    });

    // Routes: the API, then the built page and its assets
    let app = invitation_api::router(state)
        .fallback_service(ServeDir::new(&config.public_dir))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("Invitation server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
                }
            }
            Err(e) => {
                warn!("Could not install SIGTERM handler: {}", e);
                ctrl_c.await.ok();
                info!("Received Ctrl+C, shutting down...");
            }
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
