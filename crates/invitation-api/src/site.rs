use std::path::Path as FsPath;

use axum::{
    Json,
    extract::{Path, State},
    http::{HeaderMap, header},
};
use tracing::{debug, warn};

use invitation_types::accounts::Platform;
use invitation_types::api::{AccountView, GalleryResponse, HealthResponse, PayLinkResponse};
use invitation_types::config::WeddingConfig;

use crate::error::ApiError;
use crate::state::AppState;

const GALLERY_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "avif", "gif"];

/// Public URL prefix the gallery directory is served under.
pub const GALLERY_URL_PREFIX: &str = "/images/gallery";

/// GET /api/config: the wedding description the page renders from.
pub async fn config(State(state): State<AppState>) -> Json<WeddingConfig> {
    Json(state.site.clone())
}

/// GET /api/gallery: image URLs in display order.
pub async fn gallery(State(state): State<AppState>) -> Json<GalleryResponse> {
    if let Some(dir) = &state.gallery_dir {
        match scan_gallery(dir).await {
            Ok(images) if !images.is_empty() => return Json(GalleryResponse { images }),
            Ok(_) => debug!("Gallery directory {} is empty", dir.display()),
            Err(e) => warn!("Could not read gallery directory {}: {}", dir.display(), e),
        }
    }

    Json(GalleryResponse {
        images: state.site.gallery.images.clone(),
    })
}

/// Image files in `dir`, sorted by file name, as public URLs.
async fn scan_gallery(dir: &FsPath) -> std::io::Result<Vec<String>> {
    let mut names = Vec::new();
    let mut entries = tokio::fs::read_dir(dir).await?;

    while let Some(entry) = entries.next_entry().await? {
        if !entry.file_type().await?.is_file() {
            continue;
        }
        let Ok(name) = entry.file_name().into_string() else {
            continue;
        };
        let is_image = FsPath::new(&name)
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| GALLERY_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()));
        if is_image {
            names.push(name);
        }
    }

    names.sort();
    Ok(names
        .into_iter()
        .map(|name| format!("{GALLERY_URL_PREFIX}/{name}"))
        .collect())
}

/// GET /api/accounts
pub async fn accounts(State(state): State<AppState>) -> Json<Vec<AccountView>> {
    let views = state
        .site
        .account
        .iter()
        .map(|(role, account)| AccountView {
            role: role.to_string(),
            bank_code: account.bank_code().map(str::to_string),
            copy_text: account.copy_text(),
            account: account.clone(),
        })
        .collect();
    Json(views)
}

/// GET /api/accounts/{role}/pay: where the "send money" button should go
/// for this guest's device.
pub async fn pay_link(
    State(state): State<AppState>,
    Path(role): Path<String>,
    headers: HeaderMap,
) -> Result<Json<PayLinkResponse>, ApiError> {
    let account = state
        .site
        .account
        .get(&role)
        .ok_or_else(|| ApiError::NotFound(format!("'{role}' 계좌 정보가 없습니다")))?;

    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    let platform = Platform::from_user_agent(user_agent);

    Ok(Json(PayLinkResponse {
        platform,
        copy_text: account.copy_text(),
        deep_link: platform.pay_deep_link().map(str::to_string),
        fallback_url: platform.app_store_url().map(str::to_string),
    }))
}

/// GET /api/health
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let db = state.clone();
    let guestbook = tokio::task::spawn_blocking(move || db.db.ping())
        .await
        .unwrap_or(false);

    Json(HealthResponse {
        status: if guestbook { "ok" } else { "degraded" }.to_string(),
        guestbook,
        subscribers: state.dispatcher.subscriber_count(),
    })
}
