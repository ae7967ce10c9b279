use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::questions::SessionRequest;
use crate::state::AppState;
use crate::store::{NewSession, SessionRecord};
use crate::types::{CreatedSession, MineQuery, QuestionOut, SessionDetail};

/// Session by id. Sessions with an owner are visible only to that owner;
/// ownerless sessions are open to any signed-in user.
async fn owned_session(state: &AppState, id: i64, user: AuthUser) -> Result<SessionRecord, ApiError> {
  let session = state.store.get_session(id).await?.ok_or(ApiError::NotFound("Session"))?;
  if matches!(session.user_id, Some(owner) if owner != user.id) {
    return Err(ApiError::Forbidden);
  }
  Ok(session)
}

pub async fn create_session(
  State(state): State<Arc<AppState>>,
  user: AuthUser,
  ApiJson(req): ApiJson<SessionRequest>,
) -> Result<Json<CreatedSession>, ApiError> {
  if req.role.trim().is_empty() || req.job_title.trim().is_empty() {
    return Err(ApiError::bad_request("role and job_title are required"));
  }

  let session = state
    .store
    .create_session(NewSession {
      user_id: Some(user.id),
      company: req.company.trim().to_string(),
      role: req.role.clone(),
      job_title: req.job_title.clone(),
      level: req.level.clone(),
      difficulty: req.difficulty.clone(),
    })
    .await?;
  let questions = state
    .store
    .add_questions(session.id, &state.questions.generate(&req))
    .await?;

  tracing::info!(session_id = session.id, user_id = user.id, questions = questions.len(), "session created");
  Ok(Json(CreatedSession {
    session_id: session.id,
    questions: questions.into_iter().map(QuestionOut::from).collect(),
  }))
}

pub async fn list_my_sessions(
  State(state): State<Arc<AppState>>,
  user: AuthUser,
  ApiQuery(query): ApiQuery<MineQuery>,
) -> Result<Json<Vec<SessionRecord>>, ApiError> {
  let company = query.company.as_deref().map(str::trim).filter(|c| !c.is_empty());
  Ok(Json(state.store.list_sessions_for_user(user.id, company).await?))
}

pub async fn get_session(
  State(state): State<Arc<AppState>>,
  user: AuthUser,
  ApiPath(id): ApiPath<i64>,
) -> Result<Json<SessionDetail>, ApiError> {
  let session = owned_session(&state, id, user).await?;
  let questions = state.store.list_questions(id).await?;
  Ok(Json(SessionDetail {
    session,
    questions: questions.into_iter().map(QuestionOut::from).collect(),
  }))
}

pub async fn delete_session(
  State(state): State<Arc<AppState>>,
  user: AuthUser,
  ApiPath(id): ApiPath<i64>,
) -> Result<StatusCode, ApiError> {
  owned_session(&state, id, user).await?;
  state.store.delete_session(id).await?;
  tracing::info!(session_id = id, user_id = user.id, "session deleted");
  Ok(StatusCode::NO_CONTENT)
}
