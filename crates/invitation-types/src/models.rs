use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Longest guestbook message accepted, in characters.
pub const MAX_MESSAGE_CHARS: usize = 200;

/// Longest guest name accepted, in characters.
pub const MAX_NAME_CHARS: usize = 20;

/// A congratulatory note left in the guestbook. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuestbookEntry {
    pub id: Uuid,
    pub name: String,
    pub message: String,
    /// Client-facing creation time in epoch milliseconds.
    pub timestamp: i64,
    /// Server-assigned creation time.
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GuestbookError {
    #[error("이름을 입력해주세요")]
    EmptyName,

    #[error("메시지를 입력해주세요")]
    EmptyMessage,

    #[error("이름은 {max}자 이내로 작성해주세요")]
    NameTooLong { max: usize },

    #[error("메시지는 {max}자 이내로 작성해주세요")]
    MessageTooLong { max: usize },
}

/// Guestbook form submission, as typed by the guest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewGuestbookEntry {
    pub name: String,
    pub message: String,
}

/// A submission that passed validation. Fields are trimmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidEntry {
    pub name: String,
    pub message: String,
}

impl NewGuestbookEntry {
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Check the submission before it is sent anywhere.
    pub fn validate(&self) -> Result<ValidEntry, GuestbookError> {
        let name = self.name.trim();
        let message = self.message.trim();

        if name.is_empty() {
            return Err(GuestbookError::EmptyName);
        }
        if message.is_empty() {
            return Err(GuestbookError::EmptyMessage);
        }
        if name.chars().count() > MAX_NAME_CHARS {
            return Err(GuestbookError::NameTooLong {
                max: MAX_NAME_CHARS,
            });
        }
        if message.chars().count() > MAX_MESSAGE_CHARS {
            return Err(GuestbookError::MessageTooLong {
                max: MAX_MESSAGE_CHARS,
            });
        }

        Ok(ValidEntry {
            name: name.to_string(),
            message: message.to_string(),
        })
    }
}

/// Entry shape written by the browser's local fallback storage.
/// `id` and `timestamp` may be missing in older saves.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalGuestbookEntry {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    pub message: String,
    #[serde(default)]
    pub timestamp: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_accepted_entries() {
        let entry = NewGuestbookEntry::new("  Jiwoo ", "\nCongratulations!  ");
        let valid = entry.validate().unwrap();
        assert_eq!(valid.name, "Jiwoo");
        assert_eq!(valid.message, "Congratulations!");
    }

    #[test]
    fn rejects_blank_fields() {
        assert_eq!(
            NewGuestbookEntry::new("   ", "hello").validate(),
            Err(GuestbookError::EmptyName)
        );
        assert_eq!(
            NewGuestbookEntry::new("Jiwoo", "").validate(),
            Err(GuestbookError::EmptyMessage)
        );
    }

    #[test]
    fn message_limit_counts_characters() {
        let at_limit = "축".repeat(MAX_MESSAGE_CHARS);
        assert!(NewGuestbookEntry::new("Jiwoo", at_limit).validate().is_ok());

        let over = "a".repeat(MAX_MESSAGE_CHARS + 1);
        assert_eq!(
            NewGuestbookEntry::new("Jiwoo", over).validate(),
            Err(GuestbookError::MessageTooLong { max: 200 })
        );
    }

    #[test]
    fn rejects_long_names() {
        let name = "n".repeat(MAX_NAME_CHARS + 1);
        assert_eq!(
            NewGuestbookEntry::new(name, "hi").validate(),
            Err(GuestbookError::NameTooLong { max: 20 })
        );
    }

    #[test]
    fn local_entries_tolerate_missing_fields() {
        let parsed: Vec<LocalGuestbookEntry> =
            serde_json::from_str(r#"[{"name":"A","message":"B"},{"id":"1","name":"C","message":"D","timestamp":1700000000000}]"#)
                .unwrap();
        assert_eq!(parsed.len(), 2);
        assert!(parsed[0].timestamp.is_none());
        assert_eq!(parsed[1].timestamp, Some(1_700_000_000_000));
    }
}
