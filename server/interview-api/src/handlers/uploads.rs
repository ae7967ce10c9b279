use std::path::{Path, PathBuf};
use std::sync::Arc;

use answer_analysis::analyze;
use axum::{
  extract::{multipart::MultipartRejection, Multipart, State},
  Json,
};
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;
use crate::store::{AnswerKind, NewAnswer};
use crate::types::AudioScored;

/// Request body limit for the upload route.
pub const MAX_AUDIO_BYTES: usize = 50 * 1024 * 1024;

const DEFAULT_LANGUAGE: &str = "ko";
const DEFAULT_EXTENSION: &str = "wav";

struct AudioForm {
  question_id: i64,
  language: String,
  file_name: Option<String>,
  bytes: Vec<u8>,
}

async fn read_form(mut form: Multipart) -> Result<AudioForm, ApiError> {
  let mut question_id = None;
  let mut language = None;
  let mut file = None;

  while let Some(field) = form
    .next_field()
    .await
    .map_err(|e| ApiError::bad_request(format!("invalid multipart body: {}", e)))?
  {
    let name = field.name().map(str::to_string);
    match name.as_deref() {
      Some("question_id") => {
        let raw = field.text().await.map_err(|e| ApiError::bad_request(e.to_string()))?;
        let id = raw
          .trim()
          .parse::<i64>()
          .map_err(|_| ApiError::bad_request("question_id must be an integer"))?;
        question_id = Some(id);
      }
      Some("language") => {
        let raw = field.text().await.map_err(|e| ApiError::bad_request(e.to_string()))?;
        language = Some(raw.trim().to_string()).filter(|l| !l.is_empty());
      }
      Some("file") => {
        let file_name = field.file_name().map(str::to_string);
        let bytes = field.bytes().await.map_err(|e| ApiError::bad_request(e.to_string()))?;
        file = Some((file_name, bytes.to_vec()));
      }
      _ => {}
    }
  }

  let question_id = question_id.ok_or_else(|| ApiError::bad_request("question_id is required"))?;
  let (file_name, bytes) = file.ok_or_else(|| ApiError::bad_request("file is required"))?;
  if bytes.is_empty() {
    return Err(ApiError::bad_request("file is empty"));
  }
  Ok(AudioForm {
    question_id,
    language: language.unwrap_or_else(|| DEFAULT_LANGUAGE.to_string()),
    file_name,
    bytes,
  })
}

/// Extension from the client's file name, if it looks like one.
fn extension(file_name: Option<&str>) -> String {
  file_name
    .and_then(|n| Path::new(n).extension())
    .and_then(|e| e.to_str())
    .filter(|e| !e.is_empty() && e.len() <= 8 && e.chars().all(|c| c.is_ascii_alphanumeric()))
    .map(str::to_ascii_lowercase)
    .unwrap_or_else(|| DEFAULT_EXTENSION.to_string())
}

async fn save_audio(dir: &Path, file_name: Option<&str>, bytes: &[u8]) -> Result<PathBuf, ApiError> {
  tokio::fs::create_dir_all(dir).await?;
  let path = dir.join(format!("{}.{}", Uuid::new_v4(), extension(file_name)));
  tokio::fs::write(&path, bytes).await?;
  Ok(path)
}

pub async fn upload_audio(
  State(state): State<Arc<AppState>>,
  form: Result<Multipart, MultipartRejection>,
) -> Result<Json<AudioScored>, ApiError> {
  let form = read_form(form?).await?;
  let question = state
    .store
    .get_question(form.question_id)
    .await?
    .ok_or(ApiError::NotFound("Question"))?;

  let path = save_audio(&state.config.upload_dir, form.file_name.as_deref(), &form.bytes).await?;
  let transcript = state.transcriber.transcribe(&path, &form.language).await?;
  let metrics = analyze(&transcript.text, &question.keywords(), transcript.duration_sec);

  let audio_url = path.to_string_lossy().into_owned();
  let answer = state
    .store
    .create_answer(NewAnswer {
      question_id: question.id,
      kind: AnswerKind::Audio,
      transcript: transcript.text.clone(),
      audio_url: audio_url.clone(),
      duration_sec: transcript.duration_sec,
    })
    .await?;
  state.store.save_analytics(answer.id, &metrics).await?;

  tracing::info!(
    answer_id = answer.id,
    question_id = question.id,
    duration_sec = transcript.duration_sec,
    "audio answer transcribed and scored"
  );
  Ok(Json(AudioScored {
    answer_id: answer.id,
    transcript: transcript.text,
    duration_sec: transcript.duration_sec,
    audio_url,
    analytics: metrics,
  }))
}
