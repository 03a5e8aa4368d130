use axum::{
    Json,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD as B64;
use serde::Deserialize;
use tracing::{error, info, warn};

use invitation_types::api::{AuthStatusResponse, AuthUrlResponse, LogoutResponse};

use crate::error::ApiError;
use crate::google::{
    GoogleError, SCOPE_DRIVE_FILE, SCOPE_EMAIL, SCOPE_PHOTOS_APPEND, SCOPE_PROFILE, TokenSet,
};
use crate::state::AppState;
use crate::upload::UploadTarget;

/// Cookie holding the token endpoint's response.
pub const TOKEN_COOKIE: &str = "google_tokens";

const TOKEN_COOKIE_DAYS: i64 = 7;

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub error: Option<String>,
}

/// Build the token cookie. The JSON is base64url-encoded so it survives
/// cookie value restrictions. Not encrypted.
pub(crate) fn token_cookie(tokens: &TokenSet, secure: bool) -> Cookie<'static> {
    let json = serde_json::to_vec(tokens).unwrap_or_default();
    Cookie::build((TOKEN_COOKIE, B64.encode(json)))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::days(TOKEN_COOKIE_DAYS))
        .build()
}

fn expired_token_cookie(secure: bool) -> Cookie<'static> {
    Cookie::build((TOKEN_COOKIE, ""))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::ZERO)
        .build()
}

/// Tokens stored by a previous sign-in, if the cookie is present and readable.
/// Plain JSON values are accepted too.
pub fn read_tokens(jar: &CookieJar) -> Option<TokenSet> {
    let raw = jar.get(TOKEN_COOKIE)?.value();
    if raw.is_empty() {
        return None;
    }
    let json = if raw.starts_with('{') {
        raw.as_bytes().to_vec()
    } else {
        B64.decode(raw).ok()?
    };
    serde_json::from_slice::<TokenSet>(&json)
        .ok()
        .filter(|t| !t.access_token.is_empty())
}

fn scopes_for(target: UploadTarget) -> Vec<&'static str> {
    let storage = match target {
        UploadTarget::GoogleDrive => SCOPE_DRIVE_FILE,
        UploadTarget::GooglePhotos | UploadTarget::Simulated => SCOPE_PHOTOS_APPEND,
    };
    vec![storage, SCOPE_PROFILE, SCOPE_EMAIL]
}

/// GET /api/auth/url: consent screen URL for the configured upload target.
pub async fn auth_url(State(state): State<AppState>) -> Result<Json<AuthUrlResponse>, ApiError> {
    let url = state
        .google
        .auth_url(&scopes_for(state.upload.target))
        .map_err(|e| ApiError::Internal(e.into()))?;
    Ok(Json(AuthUrlResponse { url }))
}

/// GET /api/auth/login: send the guest straight to the consent screen.
pub async fn login(State(state): State<AppState>) -> Result<Redirect, ApiError> {
    let url = state
        .google
        .auth_url(&scopes_for(state.upload.target))
        .map_err(|e| ApiError::Internal(e.into()))?;
    Ok(Redirect::temporary(&url))
}

/// GET /api/auth/google: OAuth redirect target.
pub async fn google_callback(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(query): Query<CallbackQuery>,
) -> Response {
    if let Some(error) = query.error {
        warn!("Google sign-in denied: {}", error);
        return Redirect::temporary("/?error=auth_denied").into_response();
    }

    let Some(code) = query.code.filter(|c| !c.is_empty()) else {
        return Redirect::temporary("/?error=no_code").into_response();
    };

    match state.google.exchange_code(&code).await {
        Ok(tokens) => {
            info!("Google sign-in completed");
            (
                jar.add(token_cookie(&tokens, state.secure_cookies)),
                Redirect::temporary("/?auth=success"),
            )
                .into_response()
        }
        Err(e) => {
            error!("OAuth token exchange failed: {}", e);
            Redirect::temporary("/?error=auth_failed").into_response()
        }
    }
}

/// POST /api/auth/logout
pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> impl IntoResponse {
    (
        jar.add(expired_token_cookie(state.secure_cookies)),
        Json(LogoutResponse {
            success: true,
            message: "로그아웃되었습니다".into(),
        }),
    )
}

/// GET /api/auth/status: never fails; any problem reads as signed out.
pub async fn status(State(state): State<AppState>, jar: CookieJar) -> Response {
    let Some(mut tokens) = read_tokens(&jar) else {
        return Json(AuthStatusResponse::signed_out()).into_response();
    };

    let err = match state.google.user_info(&tokens.access_token).await {
        Ok(info) => {
            return Json(AuthStatusResponse {
                authenticated: true,
                user_info: Some(info),
            })
            .into_response();
        }
        Err(e) => e,
    };

    // An expired access token is refreshed once, on demand.
    let refresh_token = match (&err, tokens.refresh_token.clone()) {
        (GoogleError::Status { status: 401, .. }, Some(refresh)) => refresh,
        _ => {
            warn!("Auth status check failed: {}", err);
            return Json(AuthStatusResponse::signed_out()).into_response();
        }
    };

    let fresh = match state.google.refresh(&refresh_token).await {
        Ok(fresh) => fresh,
        Err(e) => {
            warn!("Token refresh failed: {}", e);
            return Json(AuthStatusResponse::signed_out()).into_response();
        }
    };
    tokens.merge(fresh);

    match state.google.user_info(&tokens.access_token).await {
        Ok(info) => (
            jar.add(token_cookie(&tokens, state.secure_cookies)),
            Json(AuthStatusResponse {
                authenticated: true,
                user_info: Some(info),
            }),
        )
            .into_response(),
        Err(e) => {
            warn!("Userinfo failed after refresh: {}", e);
            Json(AuthStatusResponse::signed_out()).into_response()
        }
    }
}
