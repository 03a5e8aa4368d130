pub mod auth;
pub mod error;
pub mod google;
pub mod guestbook;
pub mod notify;
pub mod og;
pub mod site;
pub mod state;
pub mod upload;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};

use crate::state::AppState;

/// Every `/api` route. Static files and middleware are layered on by the caller.
pub fn router(state: AppState) -> Router {
    let upload_routes = Router::new()
        .route("/api/upload", post(upload::upload))
        .layer(DefaultBodyLimit::max(state.upload.body_limit()));

    Router::new()
        .route("/api/auth/url", get(auth::auth_url))
        .route("/api/auth/login", get(auth::login))
        .route("/api/auth/google", get(auth::google_callback))
        .route("/api/auth/status", get(auth::status))
        .route("/api/auth/logout", post(auth::logout))
        .route(
            "/api/guestbook",
            get(guestbook::list_entries).post(guestbook::create_entry),
        )
        .route("/api/guestbook/import", post(guestbook::import_entries))
        .route("/api/guestbook/live", get(guestbook::live))
        .route("/api/og", get(og::preview))
        .route("/api/config", get(site::config))
        .route("/api/gallery", get(site::gallery))
        .route("/api/accounts", get(site::accounts))
        .route("/api/accounts/{role}/pay", get(site::pay_link))
        .route("/api/health", get(site::health))
        .merge(upload_routes)
        .with_state(state)
}
