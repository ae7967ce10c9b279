//! In-memory store with the same cascade semantics as the Postgres schema.
//! Session owners are not checked against the user table.

use std::collections::BTreeMap;

use answer_analysis::AnalysisResult;
use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::*;
use crate::report::ReportResult;

#[derive(Default)]
struct Tables {
  next_id: i64,
  users: BTreeMap<i64, UserRecord>,
  sessions: BTreeMap<i64, SessionRecord>,
  questions: BTreeMap<i64, QuestionRecord>,
  answers: BTreeMap<i64, AnswerRecord>,
  /// Keyed by answer id (1:1).
  analytics: BTreeMap<i64, AnalyticsRecord>,
  /// Keyed by session id (1:1).
  reports: BTreeMap<i64, ReportRecord>,
}

impl Tables {
  fn id(&mut self) -> i64 {
    self.next_id += 1;
    self.next_id
  }

  fn drop_answer(&mut self, id: i64) -> bool {
    self.analytics.remove(&id);
    self.answers.remove(&id).is_some()
  }

  fn drop_question(&mut self, id: i64) -> bool {
    let answer_ids: Vec<i64> = self
      .answers
      .values()
      .filter(|a| a.question_id == id)
      .map(|a| a.id)
      .collect();
    for a in answer_ids {
      self.drop_answer(a);
    }
    self.questions.remove(&id).is_some()
  }
}

/// Process-local store, used by tests and for running without a database.
#[derive(Default)]
pub struct MemoryStore {
  tables: RwLock<Tables>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }
}

#[async_trait]
impl Store for MemoryStore {
  async fn create_user(&self, new: NewUser) -> StoreResult<UserRecord> {
    let mut t = self.tables.write().await;
    if t.users.values().any(|u| u.email == new.email) {
      return Err(StoreError::Duplicate {
        entity: "user",
        key: new.email,
      });
    }
    let record = UserRecord {
      id: t.id(),
      email: new.email,
      password_hash: new.password_hash,
      created_at: Utc::now(),
    };
    t.users.insert(record.id, record.clone());
    Ok(record)
  }

  async fn get_user(&self, id: i64) -> StoreResult<Option<UserRecord>> {
    Ok(self.tables.read().await.users.get(&id).cloned())
  }

  async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<UserRecord>> {
    let t = self.tables.read().await;
    Ok(t.users.values().find(|u| u.email == email).cloned())
  }

  async fn create_session(&self, new: NewSession) -> StoreResult<SessionRecord> {
    let mut t = self.tables.write().await;
    let record = SessionRecord {
      id: t.id(),
      user_id: new.user_id,
      company: new.company,
      role: new.role,
      job_title: new.job_title,
      level: new.level,
      difficulty: new.difficulty,
      created_at: Utc::now(),
    };
    t.sessions.insert(record.id, record.clone());
    Ok(record)
  }

  async fn get_session(&self, id: i64) -> StoreResult<Option<SessionRecord>> {
    Ok(self.tables.read().await.sessions.get(&id).cloned())
  }

  async fn list_sessions_for_user(&self, user_id: i64, company: Option<&str>) -> StoreResult<Vec<SessionRecord>> {
    let t = self.tables.read().await;
    let mut rows: Vec<SessionRecord> = t
      .sessions
      .values()
      .filter(|s| s.user_id == Some(user_id))
      .filter(|s| company.map_or(true, |c| s.company == c))
      .cloned()
      .collect();
    rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
    Ok(rows)
  }

  async fn delete_session(&self, id: i64) -> StoreResult<bool> {
    let mut t = self.tables.write().await;
    let question_ids: Vec<i64> = t
      .questions
      .values()
      .filter(|q| q.session_id == id)
      .map(|q| q.id)
      .collect();
    for q in question_ids {
      t.drop_question(q);
    }
    t.reports.remove(&id);
    Ok(t.sessions.remove(&id).is_some())
  }

  async fn add_questions(&self, session_id: i64, questions: &[NewQuestion]) -> StoreResult<Vec<QuestionRecord>> {
    let mut t = self.tables.write().await;
    if !t.sessions.contains_key(&session_id) {
      return Err(StoreError::MissingParent {
        entity: "session",
        id: session_id,
      });
    }
    let mut out = Vec::with_capacity(questions.len());
    for q in questions {
      let record = QuestionRecord {
        id: t.id(),
        session_id,
        text: q.text.clone(),
        rubric_keywords: join_rubric(&q.rubric_keywords),
        difficulty: q.difficulty.clone(),
      };
      t.questions.insert(record.id, record.clone());
      out.push(record);
    }
    Ok(out)
  }

  async fn get_question(&self, id: i64) -> StoreResult<Option<QuestionRecord>> {
    Ok(self.tables.read().await.questions.get(&id).cloned())
  }

  async fn list_questions(&self, session_id: i64) -> StoreResult<Vec<QuestionRecord>> {
    let t = self.tables.read().await;
    Ok(
      t.questions
        .values()
        .filter(|q| q.session_id == session_id)
        .cloned()
        .collect(),
    )
  }

  async fn delete_question(&self, id: i64) -> StoreResult<bool> {
    Ok(self.tables.write().await.drop_question(id))
  }

  async fn create_answer(&self, new: NewAnswer) -> StoreResult<AnswerRecord> {
    let mut t = self.tables.write().await;
    if !t.questions.contains_key(&new.question_id) {
      return Err(StoreError::MissingParent {
        entity: "question",
        id: new.question_id,
      });
    }
    let record = AnswerRecord {
      id: t.id(),
      question_id: new.question_id,
      kind: new.kind,
      transcript: new.transcript,
      audio_url: new.audio_url,
      duration_sec: new.duration_sec,
      created_at: Utc::now(),
    };
    t.answers.insert(record.id, record.clone());
    Ok(record)
  }

  async fn list_answers_for_questions(&self, question_ids: &[i64]) -> StoreResult<Vec<AnswerRecord>> {
    let t = self.tables.read().await;
    Ok(
      t.answers
        .values()
        .filter(|a| question_ids.contains(&a.question_id))
        .cloned()
        .collect(),
    )
  }

  async fn delete_answer(&self, id: i64) -> StoreResult<bool> {
    Ok(self.tables.write().await.drop_answer(id))
  }

  async fn save_analytics(&self, answer_id: i64, metrics: &AnalysisResult) -> StoreResult<AnalyticsRecord> {
    let mut t = self.tables.write().await;
    if !t.answers.contains_key(&answer_id) {
      return Err(StoreError::MissingParent {
        entity: "answer",
        id: answer_id,
      });
    }
    let id = match t.analytics.get(&answer_id) {
      Some(existing) => existing.id,
      None => t.id(),
    };
    let record = AnalyticsRecord {
      id,
      answer_id,
      metrics: *metrics,
      created_at: Utc::now(),
    };
    t.analytics.insert(answer_id, record.clone());
    Ok(record)
  }

  async fn get_analytics(&self, answer_id: i64) -> StoreResult<Option<AnalyticsRecord>> {
    Ok(self.tables.read().await.analytics.get(&answer_id).cloned())
  }

  async fn upsert_report(&self, session_id: i64, report: &ReportResult) -> StoreResult<ReportRecord> {
    let mut t = self.tables.write().await;
    if !t.sessions.contains_key(&session_id) {
      return Err(StoreError::MissingParent {
        entity: "session",
        id: session_id,
      });
    }
    let id = match t.reports.get(&session_id) {
      Some(existing) => existing.id,
      None => t.id(),
    };
    let record = ReportRecord {
      id,
      session_id,
      total_score: report.total_score,
      summary_md: report.summary_md.clone(),
      suggestions_md: report.suggestions_md.clone(),
      created_at: Utc::now(),
    };
    t.reports.insert(session_id, record.clone());
    Ok(record)
  }

  async fn get_report(&self, session_id: i64) -> StoreResult<Option<ReportRecord>> {
    Ok(self.tables.read().await.reports.get(&session_id).cloned())
  }
}
