//! Thin client for the Google endpoints the invitation needs: OAuth code
//! exchange and refresh, userinfo, Photos Library uploads and Drive uploads.
//! Every call is a single request with no retries.

use bytes::Bytes;
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use reqwest::{Client, Response, Url, header};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use invitation_types::api::GoogleUserInfo;

pub const SCOPE_PHOTOS_APPEND: &str = "https://www.googleapis.com/auth/photoslibrary.appendonly";
pub const SCOPE_DRIVE_FILE: &str = "https://www.googleapis.com/auth/drive.file";
pub const SCOPE_PROFILE: &str = "https://www.googleapis.com/auth/userinfo.profile";
pub const SCOPE_EMAIL: &str = "https://www.googleapis.com/auth/userinfo.email";

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

#[derive(Debug, Error)]
pub enum GoogleError {
    #[error("Google returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("request to Google failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("service account signing failed: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),

    #[error("Google integration misconfigured: {0}")]
    Misconfigured(String),
}

impl GoogleError {
    /// HTTP status Google answered with, if it answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            GoogleError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Base URLs for every Google endpoint used. Overridable so tests can point
/// the client at a local stand-in.
#[derive(Debug, Clone)]
pub struct GoogleEndpoints {
    pub auth_url: String,
    pub token_url: String,
    pub userinfo_url: String,
    pub photos_api: String,
    pub drive_upload_url: String,
}

impl Default for GoogleEndpoints {
    fn default() -> Self {
        Self {
            auth_url: "https://accounts.google.com/o/oauth2/v2/auth".into(),
            token_url: "https://oauth2.googleapis.com/token".into(),
            userinfo_url: "https://www.googleapis.com/oauth2/v2/userinfo".into(),
            photos_api: "https://photoslibrary.googleapis.com/v1".into(),
            drive_upload_url: "https://www.googleapis.com/upload/drive/v3/files".into(),
        }
    }
}

impl GoogleEndpoints {
    /// Every endpoint rooted at `base`, e.g. a local test server.
    pub fn rooted_at(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            auth_url: format!("{base}/o/oauth2/v2/auth"),
            token_url: format!("{base}/token"),
            userinfo_url: format!("{base}/oauth2/v2/userinfo"),
            photos_api: format!("{base}/v1"),
            drive_upload_url: format!("{base}/upload/drive/v3/files"),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct OAuthCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
}

#[derive(Clone)]
pub struct ServiceAccount {
    pub client_email: String,
    /// PEM-encoded RSA key. Literal `\n` sequences from env files are accepted.
    pub private_key: String,
}

/// Token endpoint response. Unknown fields are kept so the cookie holds
/// exactly what Google returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenSet {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl TokenSet {
    /// Fold a refresh response into this set. Refresh responses usually omit
    /// the refresh token, so the existing one is kept.
    pub fn merge(&mut self, fresh: TokenSet) {
        self.access_token = fresh.access_token;
        if fresh.refresh_token.is_some() {
            self.refresh_token = fresh.refresh_token;
        }
        if fresh.expires_in.is_some() {
            self.expires_in = fresh.expires_in;
        }
        if fresh.scope.is_some() {
            self.scope = fresh.scope;
        }
        if fresh.token_type.is_some() {
            self.token_type = fresh.token_type;
        }
        self.extra.extend(fresh.extra);
    }
}

#[derive(Serialize)]
struct ServiceAccountClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BatchCreateResponse {
    #[serde(default)]
    new_media_item_results: Vec<NewMediaItemResult>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct NewMediaItemResult {
    #[serde(default)]
    media_item: Option<MediaItem>,
    #[serde(default)]
    status: Option<ItemStatus>,
}

#[derive(Deserialize)]
struct MediaItem {
    id: String,
}

#[derive(Deserialize)]
struct ItemStatus {
    #[serde(default)]
    message: String,
}

#[derive(Deserialize)]
struct DriveFile {
    id: String,
}

#[derive(Clone)]
pub struct GoogleClient {
    http: Client,
    endpoints: GoogleEndpoints,
    credentials: OAuthCredentials,
    service_account: Option<ServiceAccount>,
}

impl GoogleClient {
    pub fn new(credentials: OAuthCredentials) -> Self {
        Self::with_endpoints(credentials, GoogleEndpoints::default())
    }

    pub fn with_endpoints(credentials: OAuthCredentials, endpoints: GoogleEndpoints) -> Self {
        Self {
            http: Client::new(),
            endpoints,
            credentials,
            service_account: None,
        }
    }

    pub fn with_service_account(mut self, account: ServiceAccount) -> Self {
        self.service_account = Some(account);
        self
    }

    pub fn has_service_account(&self) -> bool {
        self.service_account.is_some()
    }

    // -- OAuth --

    /// Consent screen URL requesting offline access for `scopes`.
    pub fn auth_url(&self, scopes: &[&str]) -> Result<String, GoogleError> {
        if self.credentials.client_id.is_empty() {
            return Err(GoogleError::Misconfigured("client id is not set".into()));
        }

        let scope = scopes.join(" ");
        let url = Url::parse_with_params(
            &self.endpoints.auth_url,
            &[
                ("client_id", self.credentials.client_id.as_str()),
                ("redirect_uri", self.credentials.redirect_uri.as_str()),
                ("response_type", "code"),
                ("scope", scope.as_str()),
                ("access_type", "offline"),
                ("prompt", "consent"),
            ],
        )
        .map_err(|e| GoogleError::Misconfigured(format!("bad auth url: {e}")))?;

        Ok(url.into())
    }

    pub async fn exchange_code(&self, code: &str) -> Result<TokenSet, GoogleError> {
        let response = self
            .http
            .post(&self.endpoints.token_url)
            .form(&[
                ("client_id", self.credentials.client_id.as_str()),
                ("client_secret", self.credentials.client_secret.as_str()),
                ("code", code),
                ("grant_type", "authorization_code"),
                ("redirect_uri", self.credentials.redirect_uri.as_str()),
            ])
            .send()
            .await?;

        Ok(check(response).await?.json().await?)
    }

    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenSet, GoogleError> {
        let response = self
            .http
            .post(&self.endpoints.token_url)
            .form(&[
                ("client_id", self.credentials.client_id.as_str()),
                ("client_secret", self.credentials.client_secret.as_str()),
                ("refresh_token", refresh_token),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await?;

        Ok(check(response).await?.json().await?)
    }

    pub async fn user_info(&self, access_token: &str) -> Result<GoogleUserInfo, GoogleError> {
        let response = self
            .http
            .get(&self.endpoints.userinfo_url)
            .bearer_auth(access_token)
            .send()
            .await?;

        Ok(check(response).await?.json().await?)
    }

    /// Access token for the configured service account, via a signed JWT assertion.
    pub async fn service_account_token(&self, scope: &str) -> Result<TokenSet, GoogleError> {
        let account = self
            .service_account
            .as_ref()
            .ok_or_else(|| GoogleError::Misconfigured("no service account configured".into()))?;

        let now = chrono::Utc::now().timestamp();
        let claims = ServiceAccountClaims {
            iss: &account.client_email,
            scope,
            aud: &self.endpoints.token_url,
            iat: now,
            exp: now + 3600,
        };
        let pem = account.private_key.replace("\\n", "\n");
        let assertion = encode(
            &Header::new(Algorithm::RS256),
            &claims,
            &EncodingKey::from_rsa_pem(pem.as_bytes())?,
        )?;

        let response = self
            .http
            .post(&self.endpoints.token_url)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await?;

        Ok(check(response).await?.json().await?)
    }

    // -- Photos Library --

    /// Step one of a Photos upload: send raw bytes, receive an upload token.
    pub async fn photos_upload(
        &self,
        access_token: &str,
        file_name: &str,
        data: Bytes,
    ) -> Result<String, GoogleError> {
        let response = self
            .http
            .post(format!("{}/uploads", self.endpoints.photos_api))
            .bearer_auth(access_token)
            .header(header::CONTENT_TYPE, "application/octet-stream")
            .header("X-Goog-Upload-Protocol", "raw")
            .header("X-Goog-Upload-File-Name", header_safe_name(file_name))
            .body(data)
            .send()
            .await?;

        Ok(check(response).await?.text().await?)
    }

    /// Step two: turn an upload token into a media item. Returns its id.
    pub async fn photos_batch_create(
        &self,
        access_token: &str,
        upload_token: &str,
        description: &str,
    ) -> Result<String, GoogleError> {
        let body = serde_json::json!({
            "newMediaItems": [{
                "description": description,
                "simpleMediaItem": { "uploadToken": upload_token },
            }]
        });

        let response = self
            .http
            .post(format!("{}/mediaItems:batchCreate", self.endpoints.photos_api))
            .bearer_auth(access_token)
            .json(&body)
            .send()
            .await?;

        let created: BatchCreateResponse = check(response).await?.json().await?;
        let result = created.new_media_item_results.into_iter().next();

        match result {
            Some(NewMediaItemResult {
                media_item: Some(item),
                ..
            }) => Ok(item.id),
            Some(NewMediaItemResult { status, .. }) => Err(GoogleError::Status {
                status: 500,
                body: status.map(|s| s.message).unwrap_or_default(),
            }),
            None => Err(GoogleError::Status {
                status: 500,
                body: "batchCreate returned no results".into(),
            }),
        }
    }

    pub async fn photos_add_to_album(
        &self,
        access_token: &str,
        album_id: &str,
        media_item_id: &str,
    ) -> Result<(), GoogleError> {
        let response = self
            .http
            .post(format!(
                "{}/albums/{}:batchAddMediaItems",
                self.endpoints.photos_api, album_id
            ))
            .bearer_auth(access_token)
            .json(&serde_json::json!({ "mediaItemIds": [media_item_id] }))
            .send()
            .await?;

        check(response).await?;
        Ok(())
    }

    // -- Drive --

    /// Single-request multipart upload into `folder_id` (or My Drive).
    /// Returns the new file id.
    pub async fn drive_upload(
        &self,
        access_token: &str,
        folder_id: Option<&str>,
        file_name: &str,
        mime_type: &str,
        data: &[u8],
    ) -> Result<String, GoogleError> {
        let mut metadata = serde_json::json!({ "name": file_name });
        if let Some(folder) = folder_id {
            metadata["parents"] = serde_json::json!([folder]);
        }

        let boundary = format!("invitation-{}", Uuid::new_v4().simple());
        let body = multipart_related(&boundary, &metadata, mime_type, data);

        let response = self
            .http
            .post(&self.endpoints.drive_upload_url)
            .query(&[("uploadType", "multipart"), ("fields", "id")])
            .bearer_auth(access_token)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/related; boundary={boundary}"),
            )
            .body(body)
            .send()
            .await?;

        let file: DriveFile = check(response).await?.json().await?;
        debug!("Drive file {} created", file.id);
        Ok(file.id)
    }
}

async fn check(response: Response) -> Result<Response, GoogleError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(GoogleError::Status {
        status: status.as_u16(),
        body: body.chars().take(500).collect(),
    })
}

/// Header values must be visible ASCII; anything else is replaced.
fn header_safe_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| if c.is_ascii_graphic() || c == ' ' { c } else { '_' })
        .collect();
    if cleaned.trim().is_empty() {
        "upload".to_string()
    } else {
        cleaned
    }
}

fn multipart_related(
    boundary: &str,
    metadata: &serde_json::Value,
    mime_type: &str,
    data: &[u8],
) -> Vec<u8> {
    let mut body = Vec::with_capacity(data.len() + 512);
    body.extend_from_slice(
        format!(
            "--{boundary}\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n{metadata}\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(format!("--{boundary}\r\nContent-Type: {mime_type}\r\n\r\n").as_bytes());
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    body
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> GoogleClient {
        GoogleClient::new(OAuthCredentials {
            client_id: "client-123".into(),
            client_secret: "secret".into(),
            redirect_uri: "https://example.com/api/auth/google".into(),
        })
    }

    #[test]
    fn auth_url_requests_offline_consent() {
        let url = client().auth_url(&[SCOPE_PHOTOS_APPEND, SCOPE_PROFILE]).unwrap();
        let parsed = Url::parse(&url).unwrap();
        let params: std::collections::HashMap<_, _> = parsed.query_pairs().into_owned().collect();

        assert!(url.starts_with("https://accounts.google.com/o/oauth2/v2/auth?"));
        assert_eq!(params["client_id"], "client-123");
        assert_eq!(params["response_type"], "code");
        assert_eq!(params["access_type"], "offline");
        assert_eq!(params["prompt"], "consent");
        assert_eq!(
            params["scope"],
            format!("{SCOPE_PHOTOS_APPEND} {SCOPE_PROFILE}")
        );
    }

    #[test]
    fn auth_url_needs_client_id() {
        let client = GoogleClient::new(OAuthCredentials::default());
        assert!(matches!(
            client.auth_url(&[SCOPE_PROFILE]),
            Err(GoogleError::Misconfigured(_))
        ));
    }

    #[test]
    fn merge_keeps_refresh_token() {
        let mut tokens: TokenSet = serde_json::from_str(
            r#"{"access_token":"old","refresh_token":"r1","expires_in":3599,"id_token":"x"}"#,
        )
        .unwrap();
        let fresh: TokenSet =
            serde_json::from_str(r#"{"access_token":"new","expires_in":3600}"#).unwrap();

        tokens.merge(fresh);
        assert_eq!(tokens.access_token, "new");
        assert_eq!(tokens.refresh_token.as_deref(), Some("r1"));
        assert_eq!(tokens.expires_in, Some(3600));
        assert_eq!(tokens.extra["id_token"], "x");
    }

    #[test]
    fn header_names_are_sanitised() {
        assert_eq!(header_safe_name("IMG_0001.jpg"), "IMG_0001.jpg");
        assert_eq!(header_safe_name("결혼.jpg"), "__.jpg");
        assert_eq!(header_safe_name("\u{1F600}"), "_");
        assert_eq!(header_safe_name(""), "upload");
    }

    #[test]
    fn multipart_related_layout() {
        let body = multipart_related("b", &serde_json::json!({"name":"a.jpg"}), "image/jpeg", b"DATA");
        let text = String::from_utf8(body).unwrap();
        assert!(text.starts_with("--b\r\nContent-Type: application/json"));
        assert!(text.contains("{\"name\":\"a.jpg\"}"));
        assert!(text.contains("Content-Type: image/jpeg\r\n\r\nDATA\r\n--b--\r\n"));
    }
}
