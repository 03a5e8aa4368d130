use axum::{
    Json,
    extract::{Query, State, WebSocketUpgrade},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;
use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

use invitation_db::models::GuestbookRow;
use invitation_gateway::connection::handle_subscriber;
use invitation_types::api::ImportResponse;
use invitation_types::events::GuestbookEvent;
use invitation_types::models::{GuestbookEntry, LocalGuestbookEntry, NewGuestbookEntry};

use crate::error::ApiError;
use crate::state::{AppState, with_db};

/// Most entries returned by one list call, and the size of a live snapshot.
pub const MAX_LIST: u32 = 100;

/// Most entries accepted by one import call.
pub const MAX_IMPORT: usize = 500;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub limit: Option<u32>,
}

/// GET /api/guestbook: newest first.
pub async fn list_entries(
    State(state): State<AppState>,
    WithRejection(Query(query), _): WithRejection<Query<ListQuery>, ApiError>,
) -> Result<Json<Vec<GuestbookEntry>>, ApiError> {
    let limit = query.limit.unwrap_or(MAX_LIST).clamp(1, MAX_LIST);
    Ok(Json(load_entries(&state, limit).await?))
}

/// POST /api/guestbook
pub async fn create_entry(
    State(state): State<AppState>,
    WithRejection(Json(req), _): WithRejection<Json<NewGuestbookEntry>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let valid = req.validate()?;

    let id = Uuid::new_v4();
    let timestamp = chrono::Utc::now().timestamp_millis();
    let row = with_db(&state, move |db| {
        db.insert_entry(&id.to_string(), &valid.name, &valid.message, timestamp)
    })
    .await?;

    let entry = row_to_entry(row);
    info!("Guestbook entry {} from {}", entry.id, entry.name);

    state.dispatcher.broadcast(GuestbookEvent::EntryCreate {
        entry: entry.clone(),
    });
    state.notifier.guestbook_entry(&entry);

    Ok((StatusCode::CREATED, Json(entry)))
}

/// POST /api/guestbook/import: move entries from the browser's local
/// fallback storage into the store.
pub async fn import_entries(
    State(state): State<AppState>,
    WithRejection(Json(entries), _): WithRejection<Json<Vec<LocalGuestbookEntry>>, ApiError>,
) -> Result<Json<ImportResponse>, ApiError> {
    if entries.len() > MAX_IMPORT {
        return Err(ApiError::BadRequest(format!(
            "한 번에 최대 {MAX_IMPORT}개까지 가져올 수 있습니다"
        )));
    }
    if entries.is_empty() {
        return Ok(Json(ImportResponse {
            imported: 0,
            skipped: 0,
        }));
    }

    let now_ms = chrono::Utc::now().timestamp_millis();
    let (imported, skipped) =
        with_db(&state, move |db| db.import_entries(&entries, now_ms)).await?;

    // Imported entries may sort anywhere, so live viewers get a fresh list.
    if imported > 0 {
        let entries = load_entries(&state, MAX_LIST).await?;
        state.dispatcher.broadcast(GuestbookEvent::Snapshot { entries });
    }

    Ok(Json(ImportResponse { imported, skipped }))
}

/// GET /api/guestbook/live: WebSocket feed: one snapshot, then new entries.
pub async fn live(
    State(state): State<AppState>,
    ws: WebSocketUpgrade,
) -> Result<impl IntoResponse, ApiError> {
    // Subscribe before reading so nothing written in between is lost.
    let events = state.dispatcher.subscribe();
    let snapshot = load_entries(&state, MAX_LIST).await?;
    let dispatcher = state.dispatcher.clone();

    Ok(ws.on_upgrade(move |socket| handle_subscriber(socket, dispatcher, events, snapshot)))
}

async fn load_entries(state: &AppState, limit: u32) -> Result<Vec<GuestbookEntry>, ApiError> {
    let rows = with_db(state, move |db| db.list_entries(limit)).await?;
    Ok(rows.into_iter().map(row_to_entry).collect())
}

fn row_to_entry(row: GuestbookRow) -> GuestbookEntry {
    GuestbookEntry {
        id: row.id.parse().unwrap_or_else(|e| {
            warn!("Corrupt guestbook id '{}': {}", row.id, e);
            Uuid::default()
        }),
        created_at: row
            .created_at
            .parse::<chrono::DateTime<chrono::Utc>>()
            .or_else(|_| {
                // SQLite stores "YYYY-MM-DD HH:MM:SS" without a timezone
                chrono::NaiveDateTime::parse_from_str(&row.created_at, "%Y-%m-%d %H:%M:%S")
                    .map(|ndt| ndt.and_utc())
            })
            .unwrap_or_else(|e| {
                warn!("Corrupt created_at '{}' on entry '{}': {}", row.created_at, row.id, e);
                chrono::DateTime::default()
            }),
        name: row.name,
        message: row.message,
        timestamp: row.timestamp,
    }
}
