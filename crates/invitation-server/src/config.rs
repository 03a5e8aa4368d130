use std::{fmt::Display, path::PathBuf, str::FromStr};

use anyhow::{Context, Result};
use tracing::info;

use invitation_api::google::{OAuthCredentials, ServiceAccount};
use invitation_api::upload::{UploadPolicy, UploadTarget};

/// Process settings, read from the environment (and `.env`) at startup.
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    /// Wedding description; the bundled example is used when unset.
    pub config_path: Option<PathBuf>,
    pub public_dir: PathBuf,
    pub gallery_dir: Option<PathBuf>,
    pub production: bool,
    pub upload_target: UploadTarget,
    pub allow_video: bool,
    pub oauth: OAuthCredentials,
    pub drive_folder_id: Option<String>,
    pub service_account: Option<ServiceAccount>,
    pub slack_webhook_url: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        // Blank values count as unset
        let var = |key: &str| var(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let service_account = match (
            var("GOOGLE_SERVICE_ACCOUNT_EMAIL"),
            var("GOOGLE_SERVICE_ACCOUNT_PRIVATE_KEY"),
        ) {
            (Some(client_email), Some(private_key)) => Some(ServiceAccount {
                client_email,
                private_key,
            }),
            _ => None,
        };

        Ok(Self {
            host: var("INVITATION_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port: try_load(&var, "INVITATION_PORT", "3000")?,
            db_path: var("INVITATION_DB_PATH")
                .unwrap_or_else(|| "guestbook.db".into())
                .into(),
            config_path: var("INVITATION_CONFIG_PATH").map(PathBuf::from),
            public_dir: var("INVITATION_PUBLIC_DIR")
                .unwrap_or_else(|| "public".into())
                .into(),
            gallery_dir: var("INVITATION_GALLERY_DIR").map(PathBuf::from),
            production: var("INVITATION_ENV").is_some_and(|v| v.eq_ignore_ascii_case("production")),
            upload_target: try_load(&var, "INVITATION_UPLOAD_TARGET", "photos")?,
            allow_video: try_load(&var, "INVITATION_UPLOAD_ALLOW_VIDEO", "false")?,
            oauth: OAuthCredentials {
                client_id: var("GOOGLE_CLIENT_ID").unwrap_or_default(),
                client_secret: var("GOOGLE_CLIENT_SECRET").unwrap_or_default(),
                redirect_uri: var("GOOGLE_REDIRECT_URI")
                    .unwrap_or_else(|| "http://localhost:3000/api/auth/google".into()),
            },
            drive_folder_id: var("GOOGLE_DRIVE_FOLDER_ID"),
            service_account,
            slack_webhook_url: var("SLACK_WEBHOOK_URL"),
        })
    }

    pub fn upload_policy(&self, album_id: Option<String>) -> UploadPolicy {
        let base = if self.allow_video {
            UploadPolicy::images_and_videos(self.upload_target)
        } else {
            UploadPolicy::images_only(self.upload_target)
        };
        UploadPolicy {
            drive_folder_id: self.drive_folder_id.clone(),
            album_id,
            ..base
        }
    }
}

fn try_load<T: FromStr>(var: impl Fn(&str) -> Option<String>, key: &str, default: &str) -> Result<T>
where
    T::Err: Display,
{
    let raw = var(key).unwrap_or_else(|| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });
    raw.parse()
        .map_err(|e| anyhow::anyhow!("{e}"))
        .with_context(|| format!("invalid {key} value '{raw}'"))
}
