use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::{error::AppError, models::ReportBatch, state::AppState};

#[derive(Debug, Serialize)]
pub struct IngestSummary {
    pub processed: usize,
}

/// Ingest position reports (POST /api/positions).
///
/// Reporting agents authenticate at the network edge, not with user
/// identity headers. Each report registers the device if it is new and
/// appends one row to the position log; a batch is capped to bound a
/// single request's write volume.
pub async fn ingest_positions(
    State(state): State<AppState>,
    Json(batch): Json<ReportBatch>,
) -> Result<(StatusCode, Json<IngestSummary>), AppError> {
    let mut items = batch.into_items();
    if items.len() > state.ingest_batch_cap {
        tracing::warn!(
            received = items.len(),
            cap = state.ingest_batch_cap,
            "Ingest batch truncated"
        );
        items.truncate(state.ingest_batch_cap);
    }

    let mut processed = 0;
    for item in &items {
        state.store.upsert_device(&item.to_new_device()).await?;
        state.store.insert_position(&item.to_new_position()).await?;
        processed += 1;
    }

    tracing::info!(processed, "Ingested position reports");

    Ok((StatusCode::CREATED, Json(IngestSummary { processed })))
}
