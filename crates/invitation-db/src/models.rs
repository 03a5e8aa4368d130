/// Database row types. These map directly to SQLite rows and are converted
/// to `invitation_types` models at the API layer.

pub struct GuestbookRow {
    pub id: String,
    pub name: String,
    pub message: String,
    pub timestamp: i64,
    pub created_at: String,
}
