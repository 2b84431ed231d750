use axum::{
    extract::State,
    http::header,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::auth::Curator;
use crate::error::AppError;
use crate::models::Entry;
use crate::AppState;

/// The download format, also accepted by `lifemuseum import`.
#[derive(Serialize, Deserialize)]
pub struct ExportData {
    pub exported_at: String,
    pub entries: Vec<Entry>,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/export", get(export_data))
}

/// Reads the store rather than the mirror so the download is never behind
/// a pending push.
async fn export_data(
    State(state): State<AppState>,
    Curator { session, .. }: Curator,
) -> Result<impl IntoResponse, AppError> {
    let entries = state.store.snapshot(&session.user_id).await?;

    let export = ExportData {
        exported_at: chrono::Utc::now().to_rfc3339(),
        entries,
    };

    let filename = format!("lifemuseum-export-{}.json", chrono::Local::now().format("%Y-%m-%d"));
    let content_disposition = format!("attachment; filename=\"{}\"", filename);

    Ok((
        [
            (header::CONTENT_TYPE, "application/json".to_string()),
            (header::CONTENT_DISPOSITION, content_disposition),
        ],
        Json(export),
    ))
}
