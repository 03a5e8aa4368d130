use crate::Database;
use crate::models::GuestbookRow;
use anyhow::{Result, anyhow};
use invitation_types::models::{LocalGuestbookEntry, NewGuestbookEntry};
use rusqlite::{Connection, OptionalExtension};
use tracing::{info, warn};
use uuid::Uuid;

/// SQLite `datetime('now')` layout.
const SQLITE_DATETIME: &str = "%Y-%m-%d %H:%M:%S";

impl Database {
    // -- Guestbook --

    /// Insert a new entry and return the stored row, including the
    /// server-assigned `created_at`.
    pub fn insert_entry(&self, id: &str, name: &str, message: &str, timestamp: i64) -> Result<GuestbookRow> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO guestbook (id, name, message, timestamp) VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![id, name, message, timestamp],
            )?;
            query_entry(conn, id)?.ok_or_else(|| anyhow!("Entry vanished after insert: {}", id))
        })
    }

    pub fn get_entry(&self, id: &str) -> Result<Option<GuestbookRow>> {
        self.with_conn(|conn| query_entry(conn, id))
    }

    /// Newest entries first.
    pub fn list_entries(&self, limit: u32) -> Result<Vec<GuestbookRow>> {
        self.with_conn(|conn| query_entries(conn, limit))
    }

    pub fn count_entries(&self) -> Result<u64> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM guestbook", [], |row| row.get(0))?;
            Ok(count as u64)
        })
    }

    /// Cheap round trip used by health checks.
    pub fn ping(&self) -> bool {
        self.with_conn(|conn| {
            conn.query_row("SELECT 1 FROM guestbook LIMIT 1", [], |_| Ok(()))
                .optional()?;
            Ok(())
        })
        .is_ok()
    }

    /// Copy entries saved by the browser's local fallback into the store.
    ///
    /// Runs in one transaction. Entries that fail the guestbook rules (blank
    /// or overlong name or message) are skipped. `created_at` is taken from
    /// the entry's own timestamp, or `now_ms` when it has none or it is out
    /// of range. Returns (imported, skipped).
    pub fn import_entries(&self, entries: &[LocalGuestbookEntry], now_ms: i64) -> Result<(usize, usize)> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let mut imported = 0;
            let mut skipped = 0;

            {
                let mut stmt = tx.prepare(
                    "INSERT INTO guestbook (id, name, message, timestamp, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
                )?;

                for entry in entries {
                    let valid = match NewGuestbookEntry::new(&entry.name, &entry.message).validate() {
                        Ok(valid) => valid,
                        Err(e) => {
                            warn!("Skipping local guestbook entry: {}", e);
                            skipped += 1;
                            continue;
                        }
                    };

                    // Out-of-range client timestamps are replaced by the import time
                    let (timestamp, created) = match entry
                        .timestamp
                        .and_then(|ts| chrono::DateTime::from_timestamp_millis(ts).map(|dt| (ts, dt)))
                    {
                        Some(pair) => pair,
                        None => {
                            if let Some(ts) = entry.timestamp {
                                warn!("Local guestbook timestamp {} out of range, using import time", ts);
                            }
                            let now = chrono::DateTime::from_timestamp_millis(now_ms)
                                .ok_or_else(|| anyhow!("Import time out of range: {}", now_ms))?;
                            (now_ms, now)
                        }
                    };
                    let created_at = created.format(SQLITE_DATETIME).to_string();

                    stmt.execute(rusqlite::params![
                        Uuid::new_v4().to_string(),
                        valid.name,
                        valid.message,
                        timestamp,
                        created_at
                    ])?;
                    imported += 1;
                }
            }

            tx.commit()?;
            info!("Imported {} local guestbook entries ({} skipped)", imported, skipped);
            Ok((imported, skipped))
        })
    }
}

fn map_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<GuestbookRow> {
    Ok(GuestbookRow {
        id: row.get(0)?,
        name: row.get(1)?,
        message: row.get(2)?,
        timestamp: row.get(3)?,
        created_at: row.get(4)?,
    })
}

fn query_entry(conn: &Connection, id: &str) -> Result<Option<GuestbookRow>> {
    let mut stmt = conn
        .prepare("SELECT id, name, message, timestamp, created_at FROM guestbook WHERE id = ?1")?;

    Ok(stmt.query_row([id], map_row).optional()?)
}

fn query_entries(conn: &Connection, limit: u32) -> Result<Vec<GuestbookRow>> {
    // created_at has second resolution; timestamp breaks ties
    let mut stmt = conn.prepare(
        "SELECT id, name, message, timestamp, created_at
         FROM guestbook
         ORDER BY created_at DESC, timestamp DESC
         LIMIT ?1",
    )?;

    let rows = stmt
        .query_map([limit], map_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local(name: &str, message: &str, timestamp: Option<i64>) -> LocalGuestbookEntry {
        LocalGuestbookEntry {
            id: None,
            name: name.into(),
            message: message.into(),
            timestamp,
        }
    }

    #[test]
    fn insert_returns_server_time() {
        let db = Database::open_in_memory().unwrap();
        let row = db.insert_entry("a", "Jiwoo", "Congrats", 1_700_000_000_000).unwrap();
        assert_eq!(row.name, "Jiwoo");
        assert_eq!(row.created_at.len(), "2025-01-01 00:00:00".len());
        assert!(db.get_entry("a").unwrap().is_some());
        assert!(db.get_entry("missing").unwrap().is_none());
    }

    #[test]
    fn list_is_newest_first_and_limited() {
        let db = Database::open_in_memory().unwrap();
        for i in 0..5 {
            db.insert_entry(&format!("id-{i}"), "Guest", "Hi", 1_000 + i).unwrap();
        }
        let rows = db.list_entries(3).unwrap();
        let ids: Vec<_> = rows.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["id-4", "id-3", "id-2"]);
        assert_eq!(db.count_entries().unwrap(), 5);
    }

    #[test]
    fn import_uses_entry_timestamps() {
        let db = Database::open_in_memory().unwrap();
        let entries = vec![
            local(" Old ", "First ", Some(1_600_000_000_000)),
            local("", "no name", Some(1)),
            local("New", "Second", None),
        ];

        let (imported, skipped) = db.import_entries(&entries, 1_700_000_000_000).unwrap();
        assert_eq!((imported, skipped), (2, 1));

        let rows = db.list_entries(10).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].name, "New");
        assert_eq!(rows[0].timestamp, 1_700_000_000_000);
        assert_eq!(rows[1].name, "Old");
        assert_eq!(rows[1].message, "First");
        assert_eq!(rows[1].created_at, "2020-09-13 12:26:40");
    }

    #[test]
    fn import_applies_length_limits() {
        let db = Database::open_in_memory().unwrap();
        let entries = vec![
            local("Jiwoo", &"x".repeat(201), Some(1)),
            local(&"n".repeat(21), "Hi", Some(1)),
            local(&"가".repeat(20), &"나".repeat(200), None),
        ];

        let (imported, skipped) = db.import_entries(&entries, 1_700_000_000_000).unwrap();
        assert_eq!((imported, skipped), (1, 2));

        let rows = db.list_entries(10).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].message.chars().count(), 200);
    }

    #[test]
    fn out_of_range_timestamp_uses_import_time() {
        let db = Database::open_in_memory().unwrap();
        let entries = vec![
            local("A", "ok", Some(1_600_000_000_000)),
            local("B", "bad", Some(i64::MAX)),
        ];

        let (imported, skipped) = db.import_entries(&entries, 1_700_000_000_000).unwrap();
        assert_eq!((imported, skipped), (2, 0));

        let rows = db.list_entries(10).unwrap();
        assert_eq!(rows[0].name, "B");
        assert_eq!(rows[0].timestamp, 1_700_000_000_000);
        assert_eq!(rows[0].created_at, "2023-11-14 22:13:20");
    }

    #[test]
    fn ping_on_empty_store() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.ping());
    }
}
