//! Per-deployment description of the wedding. Loaded once at startup and
//! never modified afterwards.

use std::path::Path;

use anyhow::{Context, Result, bail};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::accounts::BankAccount;
use crate::gallery::{GalleryLayout, GalleryPosition};

const EXAMPLE_CONFIG: &str = include_str!("../wedding.example.json");

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeddingConfig {
    pub meta: Meta,
    pub main: MainSection,
    #[serde(default)]
    pub intro: Intro,
    pub date: WeddingDate,
    pub venue: Venue,
    #[serde(default)]
    pub gallery: GalleryConfig,
    pub invitation: Invitation,
    #[serde(default)]
    pub account: Accounts,
    #[serde(default)]
    pub video: VideoConfig,
    #[serde(default)]
    pub rsvp: RsvpConfig,
    #[serde(default)]
    pub slack: SlackConfig,
    #[serde(default)]
    pub google_photos: GooglePhotosConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Meta {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub og_image: String,
    #[serde(default)]
    pub no_index: bool,
    /// Absolute origin, used where a full URL is required (preview images).
    #[serde(default)]
    pub site_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MainSection {
    pub title: String,
    pub image: String,
    /// Human-readable date line.
    pub date: String,
    pub venue: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Intro {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeddingDate {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
    pub display_date: String,
}

impl WeddingDate {
    /// Ceremony start in venue-local time, if the fields form a real date.
    pub fn to_datetime(&self) -> Option<NaiveDateTime> {
        NaiveDate::from_ymd_opt(self.year, self.month, self.day)?.and_hms_opt(self.hour, self.minute, 0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Venue {
    pub name: String,
    pub address: String,
    #[serde(default)]
    pub tel: String,
    #[serde(default)]
    pub naver_map_id: String,
    pub coordinates: Coordinates,
    #[serde(default)]
    pub place_id: String,
    #[serde(default)]
    pub map_zoom: String,
    #[serde(default)]
    pub transportation: Transportation,
    #[serde(default)]
    pub parking: String,
    #[serde(default)]
    pub groom_shuttle: Option<Shuttle>,
    #[serde(default)]
    pub bride_shuttle: Option<Shuttle>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Transportation {
    #[serde(default)]
    pub subway: String,
    #[serde(default)]
    pub bus: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shuttle {
    pub location: String,
    pub departure_time: String,
    pub contact: Contact,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contact {
    pub name: String,
    pub tel: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GalleryConfig {
    #[serde(default)]
    pub layout: GalleryLayout,
    #[serde(default)]
    pub position: GalleryPosition,
    #[serde(default)]
    pub images: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invitation {
    pub message: String,
    pub groom: Person,
    pub bride: Person,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Person {
    pub name: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub father: String,
    #[serde(default)]
    pub mother: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Accounts {
    pub groom: Option<BankAccount>,
    pub bride: Option<BankAccount>,
    pub groom_father: Option<BankAccount>,
    pub groom_mother: Option<BankAccount>,
    pub bride_father: Option<BankAccount>,
    pub bride_mother: Option<BankAccount>,
}

impl Accounts {
    /// Configured accounts in display order, keyed by role.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &BankAccount)> {
        [
            ("groom", &self.groom),
            ("groomFather", &self.groom_father),
            ("groomMother", &self.groom_mother),
            ("bride", &self.bride),
            ("brideFather", &self.bride_father),
            ("brideMother", &self.bride_mother),
        ]
        .into_iter()
        .filter_map(|(role, account)| account.as_ref().map(|a| (role, a)))
    }

    pub fn get(&self, role: &str) -> Option<&BankAccount> {
        self.iter().find(|(r, _)| *r == role).map(|(_, a)| a)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VideoConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RsvpConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub show_meal_option: bool,
}

/// Slack routing. The webhook URL itself is a secret and comes from the environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlackConfig {
    #[serde(default)]
    pub channel: String,
    #[serde(default = "default_true")]
    pub compact_message: bool,
}

impl Default for SlackConfig {
    fn default() -> Self {
        Self {
            channel: String::new(),
            compact_message: true,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GooglePhotosConfig {
    #[serde(default)]
    pub album_id: Option<String>,
    #[serde(default)]
    pub album_name: String,
}

fn default_true() -> bool {
    true
}

impl WeddingConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json).context("invalid wedding config")?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("reading wedding config {}", path.display()))?;
        Self::from_json(&json)
    }

    /// The bundled example wedding.
    pub fn example() -> Result<Self> {
        Self::from_json(EXAMPLE_CONFIG)
    }

    pub fn validate(&self) -> Result<()> {
        if self.meta.title.trim().is_empty() {
            bail!("meta.title must not be empty");
        }
        if self.date.to_datetime().is_none() {
            bail!(
                "wedding date {}-{}-{} {}:{} is not a valid date",
                self.date.year,
                self.date.month,
                self.date.day,
                self.date.hour,
                self.date.minute
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn example_config_loads() {
        let config = WeddingConfig::example().unwrap();
        assert_eq!(config.gallery.layout, GalleryLayout::Grid);
        assert_eq!(config.gallery.images.len(), 3);
        assert_eq!(
            config.date.to_datetime().unwrap().to_string(),
            "2025-11-22 17:30:00"
        );
        assert!(config.slack.compact_message);
    }

    #[test]
    fn accounts_skip_missing_roles() {
        let config = WeddingConfig::example().unwrap();
        let roles: Vec<_> = config.account.iter().map(|(r, _)| r).collect();
        assert_eq!(roles, vec!["groom", "bride"]);
        assert_eq!(config.account.get("bride").unwrap().bank, "신한은행");
        assert!(config.account.get("groomFather").is_none());
    }

    #[test]
    fn rejects_impossible_date() {
        let mut value: serde_json::Value = serde_json::from_str(EXAMPLE_CONFIG).unwrap();
        value["date"]["month"] = 2.into();
        value["date"]["day"] = 30.into();
        let err = WeddingConfig::from_json(&value.to_string()).unwrap_err();
        assert!(err.to_string().contains("not a valid date"));
    }
}
