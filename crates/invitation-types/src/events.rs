use serde::{Deserialize, Serialize};

use crate::models::GuestbookEntry;

/// Events pushed to live guestbook subscribers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum GuestbookEvent {
    /// Current entries, newest first. Sent once when a subscriber connects.
    Snapshot { entries: Vec<GuestbookEntry> },

    /// A guest left a new entry
    EntryCreate { entry: GuestbookEntry },
}

impl GuestbookEvent {
    pub fn to_json(&self) -> String {
        // Derived Serialize on owned strings and numbers cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }
}
