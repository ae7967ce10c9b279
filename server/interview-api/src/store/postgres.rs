//! Postgres-backed store. Schema lives in `migrations/0001_init.sql`.

use answer_analysis::{AnalysisResult, Sentiment};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};

use super::*;
use crate::report::ReportResult;

const SCHEMA: &str = include_str!("../../migrations/0001_init.sql");

#[derive(Clone)]
pub struct PgStore {
  pool: PgPool,
}

impl PgStore {
  pub async fn connect(database_url: &str) -> StoreResult<Self> {
    let pool = PgPoolOptions::new()
      .max_connections(10)
      .connect(database_url)
      .await?;
    Ok(Self { pool })
  }

  /// Create tables if they are missing.
  pub async fn migrate(&self) -> StoreResult<()> {
    sqlx::raw_sql(SCHEMA).execute(&self.pool).await?;
    Ok(())
  }
}

// Row shapes as selected; converted into the public records below.

#[derive(sqlx::FromRow)]
struct UserRow {
  id: i64,
  email: String,
  password_hash: String,
  created_at: DateTime<Utc>,
}

impl From<UserRow> for UserRecord {
  fn from(r: UserRow) -> Self {
    Self {
      id: r.id,
      email: r.email,
      password_hash: r.password_hash,
      created_at: r.created_at,
    }
  }
}

#[derive(sqlx::FromRow)]
struct SessionRow {
  id: i64,
  user_id: Option<i64>,
  company: String,
  role: String,
  job_title: String,
  level: String,
  difficulty: String,
  created_at: DateTime<Utc>,
}

impl From<SessionRow> for SessionRecord {
  fn from(r: SessionRow) -> Self {
    Self {
      id: r.id,
      user_id: r.user_id,
      company: r.company,
      role: r.role,
      job_title: r.job_title,
      level: r.level,
      difficulty: r.difficulty,
      created_at: r.created_at,
    }
  }
}

#[derive(sqlx::FromRow)]
struct QuestionRow {
  id: i64,
  session_id: i64,
  text: String,
  rubric_keywords: String,
  difficulty: String,
}

impl From<QuestionRow> for QuestionRecord {
  fn from(r: QuestionRow) -> Self {
    Self {
      id: r.id,
      session_id: r.session_id,
      text: r.text,
      rubric_keywords: r.rubric_keywords,
      difficulty: r.difficulty,
    }
  }
}

#[derive(sqlx::FromRow)]
struct AnswerRow {
  id: i64,
  question_id: i64,
  #[sqlx(rename = "type")]
  kind: String,
  transcript: String,
  audio_url: String,
  duration_sec: f64,
  created_at: DateTime<Utc>,
}

impl TryFrom<AnswerRow> for AnswerRecord {
  type Error = StoreError;

  fn try_from(r: AnswerRow) -> Result<Self, Self::Error> {
    let kind = AnswerKind::parse(&r.kind)
      .ok_or_else(|| StoreError::Corrupt(format!("answer {} has type {:?}", r.id, r.kind)))?;
    Ok(Self {
      id: r.id,
      question_id: r.question_id,
      kind,
      transcript: r.transcript,
      audio_url: r.audio_url,
      duration_sec: r.duration_sec,
      created_at: r.created_at,
    })
  }
}

#[derive(sqlx::FromRow)]
struct AnalyticsRow {
  id: i64,
  answer_id: i64,
  filler_ratio: f64,
  wpm: f64,
  sentiment: String,
  keyword_hit_rate: f64,
  clarity_score: f64,
  coherence_score: f64,
  created_at: DateTime<Utc>,
}

impl From<AnalyticsRow> for AnalyticsRecord {
  fn from(r: AnalyticsRow) -> Self {
    Self {
      id: r.id,
      answer_id: r.answer_id,
      metrics: AnalysisResult {
        filler_ratio: r.filler_ratio,
        words_per_minute: r.wpm,
        keyword_hit_rate: r.keyword_hit_rate,
        sentiment: Sentiment::from_str_loose(&r.sentiment),
        clarity_score: r.clarity_score,
        coherence_score: r.coherence_score,
      },
      created_at: r.created_at,
    }
  }
}

#[derive(sqlx::FromRow)]
struct ReportRow {
  id: i64,
  session_id: i64,
  total_score: f64,
  summary_md: String,
  suggestions_md: String,
  created_at: DateTime<Utc>,
}

impl From<ReportRow> for ReportRecord {
  fn from(r: ReportRow) -> Self {
    Self {
      id: r.id,
      session_id: r.session_id,
      total_score: r.total_score,
      summary_md: r.summary_md,
      suggestions_md: r.suggestions_md,
      created_at: r.created_at,
    }
  }
}

/// Foreign-key violations mean the parent row is gone.
fn parent_missing(err: sqlx::Error, entity: &'static str, id: i64) -> StoreError {
  match &err {
    sqlx::Error::Database(db) if db.is_foreign_key_violation() => StoreError::MissingParent { entity, id },
    _ => StoreError::Database(err),
  }
}

const USER_COLUMNS: &str = "id, email, password_hash, created_at";
const SESSION_COLUMNS: &str = "id, user_id, company, role, job_title, level, difficulty, created_at";
const ANSWER_COLUMNS: &str = "id, question_id, type, transcript, audio_url, duration_sec, created_at";
const ANALYTICS_COLUMNS: &str =
  "id, answer_id, filler_ratio, wpm, sentiment, keyword_hit_rate, clarity_score, coherence_score, created_at";
const REPORT_COLUMNS: &str = "id, session_id, total_score, summary_md, suggestions_md, created_at";

#[async_trait]
impl Store for PgStore {
  async fn create_user(&self, new: NewUser) -> StoreResult<UserRecord> {
    let row: UserRow = sqlx::query_as(&format!(
      "INSERT INTO users (email, password_hash) VALUES ($1, $2) RETURNING {USER_COLUMNS}"
    ))
    .bind(&new.email)
    .bind(&new.password_hash)
    .fetch_one(&self.pool)
    .await
    .map_err(|err| match &err {
      sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::Duplicate {
        entity: "user",
        key: new.email.clone(),
      },
      _ => StoreError::Database(err),
    })?;
    Ok(row.into())
  }

  async fn get_user(&self, id: i64) -> StoreResult<Option<UserRecord>> {
    let row: Option<UserRow> = sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
      .bind(id)
      .fetch_optional(&self.pool)
      .await?;
    Ok(row.map(Into::into))
  }

  async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<UserRecord>> {
    let row: Option<UserRow> = sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
      .bind(email)
      .fetch_optional(&self.pool)
      .await?;
    Ok(row.map(Into::into))
  }

  async fn create_session(&self, new: NewSession) -> StoreResult<SessionRecord> {
    let row: SessionRow = sqlx::query_as(&format!(
      "INSERT INTO sessions (user_id, company, role, job_title, level, difficulty)
       VALUES ($1, $2, $3, $4, $5, $6)
       RETURNING {SESSION_COLUMNS}"
    ))
    .bind(new.user_id)
    .bind(&new.company)
    .bind(&new.role)
    .bind(&new.job_title)
    .bind(&new.level)
    .bind(&new.difficulty)
    .fetch_one(&self.pool)
    .await
    .map_err(|err| parent_missing(err, "user", new.user_id.unwrap_or_default()))?;
    Ok(row.into())
  }

  async fn get_session(&self, id: i64) -> StoreResult<Option<SessionRecord>> {
    let row: Option<SessionRow> = sqlx::query_as(&format!("SELECT {SESSION_COLUMNS} FROM sessions WHERE id = $1"))
      .bind(id)
      .fetch_optional(&self.pool)
      .await?;
    Ok(row.map(Into::into))
  }

  async fn list_sessions_for_user(&self, user_id: i64, company: Option<&str>) -> StoreResult<Vec<SessionRecord>> {
    let rows: Vec<SessionRow> = sqlx::query_as(&format!(
      "SELECT {SESSION_COLUMNS} FROM sessions
       WHERE user_id = $1 AND ($2::text IS NULL OR company = $2)
       ORDER BY created_at DESC, id DESC"
    ))
    .bind(user_id)
    .bind(company)
    .fetch_all(&self.pool)
    .await?;
    Ok(rows.into_iter().map(Into::into).collect())
  }

  async fn delete_session(&self, id: i64) -> StoreResult<bool> {
    let done = sqlx::query("DELETE FROM sessions WHERE id = $1")
      .bind(id)
      .execute(&self.pool)
      .await?;
    Ok(done.rows_affected() > 0)
  }

  async fn add_questions(&self, session_id: i64, questions: &[NewQuestion]) -> StoreResult<Vec<QuestionRecord>> {
    let mut tx = self.pool.begin().await?;
    let mut out = Vec::with_capacity(questions.len());
    for q in questions {
      let row: QuestionRow = sqlx::query_as(
        "INSERT INTO questions (session_id, text, rubric_keywords, difficulty)
         VALUES ($1, $2, $3, $4)
         RETURNING id, session_id, text, rubric_keywords, difficulty",
      )
      .bind(session_id)
      .bind(&q.text)
      .bind(join_rubric(&q.rubric_keywords))
      .bind(&q.difficulty)
      .fetch_one(&mut *tx)
      .await
      .map_err(|e| parent_missing(e, "session", session_id))?;
      out.push(row.into());
    }
    tx.commit().await?;
    Ok(out)
  }

  async fn get_question(&self, id: i64) -> StoreResult<Option<QuestionRecord>> {
    let row: Option<QuestionRow> =
      sqlx::query_as("SELECT id, session_id, text, rubric_keywords, difficulty FROM questions WHERE id = $1")
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
    Ok(row.map(Into::into))
  }

  async fn list_questions(&self, session_id: i64) -> StoreResult<Vec<QuestionRecord>> {
    let rows: Vec<QuestionRow> = sqlx::query_as(
      "SELECT id, session_id, text, rubric_keywords, difficulty FROM questions
       WHERE session_id = $1 ORDER BY id",
    )
    .bind(session_id)
    .fetch_all(&self.pool)
    .await?;
    Ok(rows.into_iter().map(Into::into).collect())
  }

  async fn delete_question(&self, id: i64) -> StoreResult<bool> {
    let done = sqlx::query("DELETE FROM questions WHERE id = $1")
      .bind(id)
      .execute(&self.pool)
      .await?;
    Ok(done.rows_affected() > 0)
  }

  async fn create_answer(&self, new: NewAnswer) -> StoreResult<AnswerRecord> {
    let row: AnswerRow = sqlx::query_as(&format!(
      "INSERT INTO answers (question_id, type, transcript, audio_url, duration_sec)
       VALUES ($1, $2, $3, $4, $5)
       RETURNING {ANSWER_COLUMNS}"
    ))
    .bind(new.question_id)
    .bind(new.kind.as_str())
    .bind(&new.transcript)
    .bind(&new.audio_url)
    .bind(new.duration_sec)
    .fetch_one(&self.pool)
    .await
    .map_err(|e| parent_missing(e, "question", new.question_id))?;
    row.try_into()
  }

  async fn list_answers_for_questions(&self, question_ids: &[i64]) -> StoreResult<Vec<AnswerRecord>> {
    if question_ids.is_empty() {
      return Ok(Vec::new());
    }
    let rows: Vec<AnswerRow> = sqlx::query_as(&format!(
      "SELECT {ANSWER_COLUMNS} FROM answers WHERE question_id = ANY($1) ORDER BY id"
    ))
    .bind(question_ids)
    .fetch_all(&self.pool)
    .await?;
    rows.into_iter().map(AnswerRecord::try_from).collect()
  }

  async fn delete_answer(&self, id: i64) -> StoreResult<bool> {
    let done = sqlx::query("DELETE FROM answers WHERE id = $1")
      .bind(id)
      .execute(&self.pool)
      .await?;
    Ok(done.rows_affected() > 0)
  }

  async fn save_analytics(&self, answer_id: i64, m: &AnalysisResult) -> StoreResult<AnalyticsRecord> {
    let row: AnalyticsRow = sqlx::query_as(&format!(
      "INSERT INTO analytics
         (answer_id, filler_ratio, wpm, sentiment, keyword_hit_rate, clarity_score, coherence_score)
       VALUES ($1, $2, $3, $4, $5, $6, $7)
       ON CONFLICT (answer_id) DO UPDATE SET
         filler_ratio = EXCLUDED.filler_ratio,
         wpm = EXCLUDED.wpm,
         sentiment = EXCLUDED.sentiment,
         keyword_hit_rate = EXCLUDED.keyword_hit_rate,
         clarity_score = EXCLUDED.clarity_score,
         coherence_score = EXCLUDED.coherence_score
       RETURNING {ANALYTICS_COLUMNS}"
    ))
    .bind(answer_id)
    .bind(m.filler_ratio)
    .bind(m.words_per_minute)
    .bind(m.sentiment.as_str())
    .bind(m.keyword_hit_rate)
    .bind(m.clarity_score)
    .bind(m.coherence_score)
    .fetch_one(&self.pool)
    .await
    .map_err(|e| parent_missing(e, "answer", answer_id))?;
    Ok(row.into())
  }

  async fn get_analytics(&self, answer_id: i64) -> StoreResult<Option<AnalyticsRecord>> {
    let row: Option<AnalyticsRow> =
      sqlx::query_as(&format!("SELECT {ANALYTICS_COLUMNS} FROM analytics WHERE answer_id = $1"))
        .bind(answer_id)
        .fetch_optional(&self.pool)
        .await?;
    Ok(row.map(Into::into))
  }

  async fn upsert_report(&self, session_id: i64, report: &ReportResult) -> StoreResult<ReportRecord> {
    let row: ReportRow = sqlx::query_as(&format!(
      "INSERT INTO reports (session_id, total_score, summary_md, suggestions_md)
       VALUES ($1, $2, $3, $4)
       ON CONFLICT (session_id) DO UPDATE SET
         total_score = EXCLUDED.total_score,
         summary_md = EXCLUDED.summary_md,
         suggestions_md = EXCLUDED.suggestions_md
       RETURNING {REPORT_COLUMNS}"
    ))
    .bind(session_id)
    .bind(report.total_score)
    .bind(&report.summary_md)
    .bind(&report.suggestions_md)
    .fetch_one(&self.pool)
    .await
    .map_err(|e| parent_missing(e, "session", session_id))?;
    Ok(row.into())
  }

  async fn get_report(&self, session_id: i64) -> StoreResult<Option<ReportRecord>> {
    let row: Option<ReportRow> =
      sqlx::query_as(&format!("SELECT {REPORT_COLUMNS} FROM reports WHERE session_id = $1"))
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await?;
    Ok(row.map(Into::into))
  }
}
