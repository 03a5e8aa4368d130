use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::accounts::{BankAccount, Platform};

// -- Errors --

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

// -- Auth --

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthUrlResponse {
    pub url: String,
}

/// Profile returned by Google's userinfo endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GoogleUserInfo {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub verified_email: Option<bool>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub picture: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthStatusResponse {
    pub authenticated: bool,
    pub user_info: Option<GoogleUserInfo>,
}

impl AuthStatusResponse {
    pub fn signed_out() -> Self {
        Self {
            authenticated: false,
            user_info: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LogoutResponse {
    pub success: bool,
    pub message: String,
}

// -- Upload --

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub success: bool,
    pub message: String,
    pub file_name: String,
    pub file_size: u64,
    pub upload_time: DateTime<Utc>,
    /// Identifier assigned by the storage provider, when there is one.
    pub remote_id: Option<String>,
}

// -- Guestbook --

#[derive(Debug, Serialize, Deserialize)]
pub struct ImportResponse {
    pub imported: usize,
    pub skipped: usize,
}

// -- Site --

#[derive(Debug, Serialize, Deserialize)]
pub struct GalleryResponse {
    pub images: Vec<String>,
}

/// One transfer account as shown on the page.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountView {
    pub role: String,
    #[serde(flatten)]
    pub account: BankAccount,
    pub bank_code: Option<String>,
    pub copy_text: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayLinkResponse {
    pub platform: Platform,
    pub copy_text: String,
    /// App deep link; absent on desktop where the app cannot be opened.
    pub deep_link: Option<String>,
    /// Where to send the guest when the app is not installed.
    pub fallback_url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub guestbook: bool,
    pub subscribers: usize,
}
