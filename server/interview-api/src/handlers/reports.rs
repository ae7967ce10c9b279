use std::sync::Arc;

use axum::{extract::State, Json};

use crate::error::ApiError;
use crate::extract::ApiPath;
use crate::report::collect_payload;
use crate::state::AppState;
use crate::types::{ReportCreated, ReportOut};

/// Build the report from stored analytics and replace any previous one.
pub async fn create_report(
  State(state): State<Arc<AppState>>,
  ApiPath(session_id): ApiPath<i64>,
) -> Result<Json<ReportCreated>, ApiError> {
  let session = state
    .store
    .get_session(session_id)
    .await?
    .ok_or(ApiError::NotFound("Session"))?;
  let payload = collect_payload(state.store.as_ref(), &session).await?;
  if payload.qas.is_empty() {
    return Err(ApiError::bad_request("No answers found for this session"));
  }

  let report = state.reports.generate(&payload).await;
  let record = state.store.upsert_report(session_id, &report).await?;
  tracing::info!(session_id, report_id = record.id, total_score = record.total_score, "report saved");
  Ok(Json(ReportCreated {
    session_id,
    report_id: record.id,
    total_score: record.total_score,
  }))
}

pub async fn get_report(
  State(state): State<Arc<AppState>>,
  ApiPath(session_id): ApiPath<i64>,
) -> Result<Json<ReportOut>, ApiError> {
  let record = state
    .store
    .get_report(session_id)
    .await?
    .ok_or(ApiError::NotFound("Report"))?;
  Ok(Json(record.into()))
}
