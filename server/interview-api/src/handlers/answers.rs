use std::sync::Arc;

use answer_analysis::analyze;
use axum::{extract::State, Json};

use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath};
use crate::state::AppState;
use crate::store::{AnswerKind, NewAnswer};
use crate::types::{AnalyticsOut, AnswerCreate, AnswerScored};

pub async fn create_answer(
  State(state): State<Arc<AppState>>,
  ApiJson(body): ApiJson<AnswerCreate>,
) -> Result<Json<AnswerScored>, ApiError> {
  let kind = AnswerKind::parse(&body.kind).ok_or_else(|| ApiError::bad_request("type must be 'text' or 'audio'"))?;
  let duration_sec = body.duration();
  if !duration_sec.is_finite() {
    return Err(ApiError::bad_request("duration_sec must be a number"));
  }
  let question = state
    .store
    .get_question(body.question_id)
    .await?
    .ok_or(ApiError::NotFound("Question"))?;

  let metrics = analyze(&body.transcript, &question.keywords(), duration_sec);
  let answer = state
    .store
    .create_answer(NewAnswer {
      question_id: question.id,
      kind,
      transcript: body.transcript,
      audio_url: body.audio_url,
      duration_sec,
    })
    .await?;
  state.store.save_analytics(answer.id, &metrics).await?;

  tracing::debug!(answer_id = answer.id, question_id = question.id, "answer scored");
  Ok(Json(AnswerScored {
    answer_id: answer.id,
    analytics: metrics,
  }))
}

pub async fn get_analytics(
  State(state): State<Arc<AppState>>,
  ApiPath(answer_id): ApiPath<i64>,
) -> Result<Json<AnalyticsOut>, ApiError> {
  let record = state
    .store
    .get_analytics(answer_id)
    .await?
    .ok_or(ApiError::NotFound("Analytics"))?;
  Ok(Json(record.into()))
}
