use std::str::FromStr;

use axum::{
    Json,
    extract::{Multipart, State, multipart::MultipartError},
    http::StatusCode,
};
use axum_extra::extract::cookie::CookieJar;
use bytes::{Bytes, BytesMut};
use chrono::Utc;
use tracing::{info, warn};

use invitation_types::api::UploadResponse;

use crate::auth::read_tokens;
use crate::error::ApiError;
use crate::google::SCOPE_DRIVE_FILE;
use crate::state::AppState;

/// Limit when only images are accepted.
pub const IMAGE_LIMIT_BYTES: usize = 10 * 1024 * 1024;

/// Limit when videos are accepted as well.
pub const MEDIA_LIMIT_BYTES: usize = 100 * 1024 * 1024;

/// Slack on top of the file limit for multipart framing and other fields.
const MULTIPART_OVERHEAD: usize = 1024 * 1024;

/// Where accepted uploads are sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadTarget {
    /// Validate only; nothing leaves the server.
    Simulated,
    GooglePhotos,
    GoogleDrive,
}

impl FromStr for UploadTarget {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "simulated" | "none" => Ok(UploadTarget::Simulated),
            "photos" | "google-photos" => Ok(UploadTarget::GooglePhotos),
            "drive" | "google-drive" => Ok(UploadTarget::GoogleDrive),
            other => Err(format!("unknown upload target '{other}'")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct UploadPolicy {
    pub target: UploadTarget,
    pub max_bytes: usize,
    /// MIME type prefixes accepted, e.g. `image/`.
    pub accepted_prefixes: Vec<&'static str>,
    pub drive_folder_id: Option<String>,
    /// Photos album new items are added to, best effort.
    pub album_id: Option<String>,
}

impl UploadPolicy {
    pub fn images_only(target: UploadTarget) -> Self {
        Self {
            target,
            max_bytes: IMAGE_LIMIT_BYTES,
            accepted_prefixes: vec!["image/"],
            drive_folder_id: None,
            album_id: None,
        }
    }

    pub fn images_and_videos(target: UploadTarget) -> Self {
        Self {
            target,
            max_bytes: MEDIA_LIMIT_BYTES,
            accepted_prefixes: vec!["image/", "video/"],
            drive_folder_id: None,
            album_id: None,
        }
    }

    pub fn accepts(&self, content_type: &str) -> bool {
        let content_type = content_type.trim().to_ascii_lowercase();
        self.accepted_prefixes
            .iter()
            .any(|prefix| content_type.starts_with(prefix))
    }

    pub fn max_mb(&self) -> usize {
        self.max_bytes / (1024 * 1024)
    }

    /// Request body limit for the upload route.
    pub fn body_limit(&self) -> usize {
        self.max_bytes + MULTIPART_OVERHEAD
    }

    fn accepted_label(&self) -> &'static str {
        if self.accepted_prefixes.contains(&"video/") {
            "이미지 또는 동영상"
        } else {
            "이미지"
        }
    }
}

struct ReceivedFile {
    name: String,
    content_type: String,
    data: Bytes,
}

/// POST /api/upload: multipart with `file` and optionally `accessToken`.
///
/// Validation order: presence, size, MIME type. Then the bytes are relayed
/// to the configured target.
pub async fn upload(
    State(state): State<AppState>,
    jar: CookieJar,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<UploadResponse>), ApiError> {
    let policy = &state.upload;
    let too_large = || ApiError::FileTooLarge {
        max_mb: policy.max_mb(),
    };
    let multipart_error = |e: MultipartError| {
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            too_large()
        } else {
            ApiError::BadRequest(format!("잘못된 업로드 요청입니다: {}", e.body_text()))
        }
    };

    let mut file: Option<ReceivedFile> = None;
    let mut form_token: Option<String> = None;

    while let Some(mut field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("file") => {
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let content_type = field.content_type().unwrap_or_default().to_string();

                let mut data = BytesMut::new();
                while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
                    if data.len() + chunk.len() > policy.max_bytes {
                        return Err(too_large());
                    }
                    data.extend_from_slice(&chunk);
                }

                file = Some(ReceivedFile {
                    name: file_name,
                    content_type,
                    data: data.freeze(),
                });
            }
            Some("accessToken") => {
                let token = field.text().await.map_err(multipart_error)?;
                let token = token.trim();
                if !token.is_empty() {
                    form_token = Some(token.to_string());
                }
            }
            _ => {}
        }
    }

    let file = file.ok_or(ApiError::MissingFile)?;
    if !policy.accepts(&file.content_type) {
        return Err(ApiError::UnsupportedType {
            accepted: policy.accepted_label(),
        });
    }

    info!(
        "Upload received: {} ({}, {} bytes)",
        file.name,
        file.content_type,
        file.data.len()
    );

    let access_token = form_token.or_else(|| read_tokens(&jar).map(|t| t.access_token));

    let (remote_id, message) = match policy.target {
        UploadTarget::Simulated => (None, "사진이 전달되었습니다. 감사합니다!"),
        UploadTarget::GooglePhotos => {
            let token = access_token.ok_or(ApiError::NotAuthenticated)?;
            let id = upload_to_photos(&state, &token, &file).await?;
            (Some(id), "사진이 성공적으로 구글 포토에 업로드되었습니다!")
        }
        UploadTarget::GoogleDrive => {
            let token = match access_token {
                Some(token) => token,
                None if state.google.has_service_account() => {
                    state
                        .google
                        .service_account_token(SCOPE_DRIVE_FILE)
                        .await?
                        .access_token
                }
                None => return Err(ApiError::NotAuthenticated),
            };
            let id = state
                .google
                .drive_upload(
                    &token,
                    policy.drive_folder_id.as_deref(),
                    &file.name,
                    &file.content_type,
                    &file.data,
                )
                .await?;
            (Some(id), "사진이 성공적으로 구글 드라이브에 업로드되었습니다!")
        }
    };

    Ok((
        StatusCode::OK,
        Json(UploadResponse {
            success: true,
            message: message.to_string(),
            file_name: file.name,
            file_size: file.data.len() as u64,
            upload_time: Utc::now(),
            remote_id,
        }),
    ))
}

async fn upload_to_photos(
    state: &AppState,
    access_token: &str,
    file: &ReceivedFile,
) -> Result<String, ApiError> {
    let google = &state.google;
    let upload_token = google
        .photos_upload(access_token, &file.name, file.data.clone())
        .await?;

    let description = format!("Wedding photo - {}", Utc::now().format("%Y-%m-%d"));
    let media_item_id = google
        .photos_batch_create(access_token, &upload_token, &description)
        .await?;

    // Album placement is a nicety; the photo is already in the library.
    if let Some(album_id) = &state.upload.album_id {
        if let Err(e) = google
            .photos_add_to_album(access_token, album_id, &media_item_id)
            .await
        {
            warn!("Could not add {} to album {}: {}", media_item_id, album_id, e);
        }
    }

    Ok(media_item_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, header};
    use tower::ServiceExt;

    use crate::testing::{self, MockGoogle};

    const BOUNDARY: &str = "X-TEST-BOUNDARY";

    struct Part<'a> {
        name: &'a str,
        file_name: Option<&'a str>,
        content_type: Option<&'a str>,
        data: &'a [u8],
    }

    fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
        let mut body = Vec::new();
        for part in parts {
            body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
            let mut disposition = format!("Content-Disposition: form-data; name=\"{}\"", part.name);
            if let Some(file_name) = part.file_name {
                disposition.push_str(&format!("; filename=\"{file_name}\""));
            }
            body.extend_from_slice(disposition.as_bytes());
            body.extend_from_slice(b"\r\n");
            if let Some(ct) = part.content_type {
                body.extend_from_slice(format!("Content-Type: {ct}\r\n").as_bytes());
            }
            body.extend_from_slice(b"\r\n");
            body.extend_from_slice(part.data);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    fn file_part<'a>(content_type: &'a str, data: &'a [u8]) -> Part<'a> {
        Part {
            name: "file",
            file_name: Some("photo.jpg"),
            content_type: Some(content_type),
            data,
        }
    }

    fn request(parts: &[Part<'_>]) -> Request<Body> {
        Request::post("/api/upload")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(multipart_body(parts)))
            .unwrap()
    }

    fn small_policy(target: UploadTarget) -> UploadPolicy {
        UploadPolicy {
            max_bytes: 1024 * 1024,
            ..UploadPolicy::images_only(target)
        }
    }

    #[test]
    fn target_parsing() {
        assert_eq!("photos".parse::<UploadTarget>(), Ok(UploadTarget::GooglePhotos));
        assert_eq!(" Google-Drive ".parse::<UploadTarget>(), Ok(UploadTarget::GoogleDrive));
        assert_eq!("simulated".parse::<UploadTarget>(), Ok(UploadTarget::Simulated));
        assert!("dropbox".parse::<UploadTarget>().is_err());
    }

    #[test]
    fn policy_prefixes() {
        let images = UploadPolicy::images_only(UploadTarget::Simulated);
        assert!(images.accepts("image/jpeg"));
        assert!(images.accepts("IMAGE/HEIC"));
        assert!(!images.accepts("video/mp4"));
        assert!(!images.accepts(""));
        assert_eq!(images.max_mb(), 10);

        let media = UploadPolicy::images_and_videos(UploadTarget::Simulated);
        assert!(media.accepts("video/mp4"));
        assert!(!media.accepts("application/pdf"));
        assert_eq!(media.max_mb(), 100);
    }

    #[tokio::test]
    async fn oversized_file_is_rejected() {
        let google = MockGoogle::start().await;
        let app = testing::router_with(google.client(), small_policy(UploadTarget::GooglePhotos));

        let data = vec![0u8; 1024 * 1024 + 1];
        let response = app.oneshot(request(&[file_part("image/jpeg", &data)])).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = testing::json_body(response).await;
        assert_eq!(body["error"], "파일 크기는 1MB를 초과할 수 없습니다");
        assert_eq!(google.uploaded_bytes(), 0);
    }

    #[tokio::test]
    async fn oversized_non_image_reports_size_first() {
        let google = MockGoogle::start().await;
        let app = testing::router_with(google.client(), small_policy(UploadTarget::Simulated));

        let data = vec![0u8; 2 * 1024 * 1024];
        let response = app
            .oneshot(request(&[file_part("application/zip", &data)]))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = testing::json_body(response).await;
        assert!(body["error"].as_str().unwrap().contains("초과할 수 없습니다"));
    }

    #[tokio::test]
    async fn wrong_type_is_rejected() {
        let google = MockGoogle::start().await;
        let app = testing::router_with(google.client(), testing::image_policy());

        let response = app
            .oneshot(request(&[file_part("video/mp4", b"not an image")]))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = testing::json_body(response).await;
        assert_eq!(body["error"], "이미지 파일만 업로드 가능합니다");
    }

    #[tokio::test]
    async fn video_allowed_when_policy_says_so() {
        let google = MockGoogle::start().await;
        let app = testing::router_with(
            google.client(),
            UploadPolicy::images_and_videos(UploadTarget::Simulated),
        );

        let response = app
            .oneshot(request(&[file_part("video/mp4", b"clip")]))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let app = testing::router_with(
            google.client(),
            UploadPolicy::images_and_videos(UploadTarget::Simulated),
        );
        let response = app
            .oneshot(request(&[file_part("text/plain", b"notes")]))
            .await
            .unwrap();
        let body = testing::json_body(response).await;
        assert_eq!(body["error"], "이미지 또는 동영상 파일만 업로드 가능합니다");
    }

    #[tokio::test]
    async fn missing_file_is_rejected() {
        let google = MockGoogle::start().await;
        let app = testing::router_with(google.client(), testing::image_policy());

        let response = app
            .oneshot(request(&[Part {
                name: "accessToken",
                file_name: None,
                content_type: None,
                data: testing::GOOD_TOKEN.as_bytes(),
            }]))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = testing::json_body(response).await;
        assert_eq!(body["error"], "파일이 필요합니다");
    }

    #[tokio::test]
    async fn photos_upload_needs_a_token() {
        let google = MockGoogle::start().await;
        let app = testing::router_with(google.client(), testing::image_policy());

        let response = app
            .oneshot(request(&[file_part("image/png", b"png")]))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn photos_upload_with_form_token() {
        let google = MockGoogle::start().await;
        let app = testing::router_with(google.client(), testing::image_policy());

        let response = app
            .oneshot(request(&[
                Part {
                    name: "accessToken",
                    file_name: None,
                    content_type: None,
                    data: testing::GOOD_TOKEN.as_bytes(),
                },
                file_part("image/jpeg", b"jpeg-bytes"),
            ]))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = testing::json_body(response).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["fileName"], "photo.jpg");
        assert_eq!(body["fileSize"], 10);
        assert_eq!(body["remoteId"], "media-1");
        assert_eq!(google.uploaded_bytes(), 10);
        // The album call fails upstream; the upload still succeeds.
        assert_eq!(google.album_requests(), 1);
    }

    #[tokio::test]
    async fn rejected_token_maps_to_401() {
        let google = MockGoogle::start().await;
        let app = testing::router_with(google.client(), testing::image_policy());

        let response = app
            .oneshot(request(&[
                Part {
                    name: "accessToken",
                    file_name: None,
                    content_type: None,
                    data: b"revoked",
                },
                file_part("image/jpeg", b"jpeg"),
            ]))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = testing::json_body(response).await;
        assert!(body["error"].as_str().unwrap().contains("만료"));
    }

    #[tokio::test]
    async fn drive_upload_uses_cookie_token() {
        let google = MockGoogle::start().await;
        let policy = UploadPolicy {
            drive_folder_id: Some("folder-1".into()),
            ..UploadPolicy::images_only(UploadTarget::GoogleDrive)
        };
        let app = testing::router_with(google.client(), policy);

        let tokens: crate::google::TokenSet =
            serde_json::from_value(serde_json::json!({ "access_token": testing::GOOD_TOKEN }))
                .unwrap();
        let cookie = crate::auth::token_cookie(&tokens, false);

        let mut req = request(&[file_part("image/jpeg", b"drive-bytes")]);
        req.headers_mut().insert(
            header::COOKIE,
            format!("{}={}", cookie.name(), cookie.value()).parse().unwrap(),
        );

        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = testing::json_body(response).await;
        assert_eq!(body["remoteId"], "drive-file-1");
    }

    #[tokio::test]
    async fn drive_upload_falls_back_to_service_account() {
        let google = MockGoogle::start().await;
        let app = testing::router_with(
            google.client_with_service_account(),
            UploadPolicy::images_only(UploadTarget::GoogleDrive),
        );

        let response = app
            .oneshot(request(&[file_part("image/jpeg", b"drive-bytes")]))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = testing::json_body(response).await;
        assert_eq!(body["remoteId"], "drive-file-1");
        assert_eq!(body["message"], "사진이 성공적으로 구글 드라이브에 업로드되었습니다!");
        assert_eq!(google.token_requests(), 1);
    }

    #[tokio::test]
    async fn drive_upload_without_any_credentials() {
        let google = MockGoogle::start().await;
        let app = testing::router_with(
            google.client(),
            UploadPolicy::images_only(UploadTarget::GoogleDrive),
        );

        let response = app
            .oneshot(request(&[file_part("image/jpeg", b"drive-bytes")]))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = testing::json_body(response).await;
        assert_eq!(body["error"], "먼저 Google 계정으로 로그인해주세요");
        assert_eq!(google.token_requests(), 0);
    }
}
