//! End-to-end tests of the HTTP surface over the in-memory store.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tokio_tungstenite::tungstenite::Message;
use tower::ServiceExt;

use interview_api::auth::{TokenKind, TokenSigner};
use interview_api::questions::TemplateQuestions;
use interview_api::report::ReportGenerator;
use interview_api::store::{MemoryStore, NewSession};
use interview_api::transcribe::{TranscribeError, Transcriber, Transcript};
use interview_api::{router, AppState, Config};

const BOUNDARY: &str = "test-boundary-7MA4YWxkTrZu0gW";

#[derive(Default)]
struct StubTranscriber {
  fail: bool,
  languages: Mutex<Vec<String>>,
}

#[async_trait]
impl Transcriber for StubTranscriber {
  async fn transcribe(&self, path: &Path, language: &str) -> Result<Transcript, TranscribeError> {
    self.languages.lock().unwrap().push(language.to_string());
    if self.fail {
      return Err(TranscribeError::Engine("model not loaded".into()));
    }
    assert!(path.exists(), "audio should be saved before transcription");
    Ok(Transcript {
      text: "음 핵심키워드 설명".into(),
      duration_sec: 6.0,
    })
  }
}

struct Harness {
  state: Arc<AppState>,
  transcriber: Arc<StubTranscriber>,
  _uploads: tempfile::TempDir,
}

impl Harness {
  fn new() -> Self {
    Self::with_transcriber(StubTranscriber::default())
  }

  fn with_transcriber(stub: StubTranscriber) -> Self {
    let uploads = tempfile::tempdir().unwrap();
    let config = Config {
      upload_dir: uploads.path().join("audio"),
      ..Config::default()
    };
    let transcriber = Arc::new(stub);
    let state = Arc::new(AppState {
      tokens: TokenSigner::new(&config.token_secret),
      config,
      store: Arc::new(MemoryStore::new()),
      transcriber: transcriber.clone(),
      reports: ReportGenerator::fallback_only(),
      questions: Arc::new(TemplateQuestions),
    });
    Self {
      state,
      transcriber,
      _uploads: uploads,
    }
  }

  fn cookie(&self, user_id: i64) -> String {
    format!("access_token={}", self.state.tokens.issue(TokenKind::Access, user_id))
  }

  async fn send(&self, req: Request<Body>) -> Response {
    router(self.state.clone()).oneshot(req).await.unwrap()
  }

  async fn json(&self, method: Method, uri: &str, user: Option<i64>, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(id) = user {
      builder = builder.header(header::COOKIE, self.cookie(id));
    }
    let req = match body {
      Some(b) => builder
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(b.to_string()))
        .unwrap(),
      None => builder.body(Body::empty()).unwrap(),
    };
    let response = self.send(req).await;
    let status = response.status();
    (status, read_json(response).await)
  }

  async fn new_session(&self, user_id: i64, company: &str) -> (i64, Vec<Value>) {
    let (status, body) = self
      .json(
        Method::POST,
        "/api/sessions",
        Some(user_id),
        Some(json!({
          "role": "backend",
          "job_title": "Backend Engineer",
          "stack": ["Rust", "Postgres"],
          "difficulty": "medium",
          "company": company,
        })),
      )
      .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    (body["session_id"].as_i64().unwrap(), body["questions"].as_array().unwrap().clone())
  }
}

async fn read_json(response: Response) -> Value {
  let bytes = response.into_body().collect().await.unwrap().to_bytes();
  if bytes.is_empty() {
    Value::Null
  } else {
    serde_json::from_slice(&bytes).unwrap()
  }
}

fn multipart(fields: &[(&str, &str)], file: Option<(&str, &[u8])>) -> Body {
  let mut body = Vec::new();
  for (name, value) in fields {
    body.extend_from_slice(
      format!(
        "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
        BOUNDARY, name, value
      )
      .as_bytes(),
    );
  }
  if let Some((file_name, bytes)) = file {
    body.extend_from_slice(
      format!(
        "--{}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\nContent-Type: application/octet-stream\r\n\r\n",
        BOUNDARY, file_name
      )
      .as_bytes(),
    );
    body.extend_from_slice(bytes);
    body.extend_from_slice(b"\r\n");
  }
  body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
  Body::from(body)
}

fn set_cookies(response: &Response) -> Vec<String> {
  response
    .headers()
    .get_all(header::SET_COOKIE)
    .iter()
    .map(|v| v.to_str().unwrap().to_string())
    .collect()
}

/// `name=value` pair from a `Set-Cookie` header, ready for a `Cookie` header.
fn cookie_pair(set_cookie: &str) -> &str {
  set_cookie.split(';').next().unwrap()
}

fn upload_request(body: Body) -> Request<Body> {
  Request::builder()
    .method(Method::POST)
    .uri("/api/uploads/audio")
    .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={}", BOUNDARY))
    .body(body)
    .unwrap()
}

#[tokio::test]
async fn health_is_ok() {
  let h = Harness::new();
  let (status, body) = h.json(Method::GET, "/health", None, None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body, json!({ "status": "ok" }));
}

#[tokio::test]
async fn session_routes_require_a_token() {
  let h = Harness::new();
  let (status, body) = h
    .json(Method::POST, "/api/sessions", None, Some(json!({ "role": "x", "job_title": "y" })))
    .await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);
  assert_eq!(body, json!({ "detail": "unauthorized" }));

  let req = Request::builder()
    .uri("/api/sessions/mine")
    .header(header::COOKIE, "access_token=forged.1.2.3")
    .body(Body::empty())
    .unwrap();
  assert_eq!(h.send(req).await.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn create_and_read_session_with_questions() {
  let h = Harness::new();
  let (sid, questions) = h.new_session(1, "Acme").await;
  assert_eq!(questions.len(), 8);
  assert!(questions[3]["text"].as_str().unwrap().starts_with("Rust, Postgres"));
  assert_eq!(questions[1]["rubric_keywords"], json!(["원인-해결", "구체성", "영향도"]));
  assert_eq!(questions[5]["rubric_keywords"], json!(["원인-해결", "구체성", "영향도"]));
  assert_eq!(questions[2]["rubric_keywords"], json!(["핵심키워드", "경험근거"]));

  let (status, body) = h.json(Method::GET, &format!("/api/sessions/{}", sid), Some(1), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["id"], sid);
  assert_eq!(body["company"], "Acme");
  assert_eq!(body["questions"].as_array().unwrap().len(), 8);
}

#[tokio::test]
async fn sessions_are_private_to_their_owner() {
  let h = Harness::new();
  let (sid, _) = h.new_session(1, "Acme").await;

  let (status, _) = h.json(Method::GET, &format!("/api/sessions/{}", sid), Some(2), None).await;
  assert_eq!(status, StatusCode::FORBIDDEN);
  let (status, _) = h.json(Method::DELETE, &format!("/api/sessions/{}", sid), Some(2), None).await;
  assert_eq!(status, StatusCode::FORBIDDEN);
  let (status, body) = h.json(Method::GET, "/api/sessions/999", Some(1), None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
  assert_eq!(body["detail"], "Session not found");
}

#[tokio::test]
async fn ownerless_sessions_are_open_to_any_user() {
  let h = Harness::new();
  let session = h
    .state
    .store
    .create_session(NewSession {
      user_id: None,
      company: "Acme".into(),
      role: "backend".into(),
      job_title: "Backend Engineer".into(),
      level: "junior".into(),
      difficulty: "medium".into(),
    })
    .await
    .unwrap();

  let (status, body) = h.json(Method::GET, &format!("/api/sessions/{}", session.id), Some(7), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["id"], session.id);
  assert_eq!(body["user_id"], Value::Null);

  let (status, _) = h.json(Method::GET, &format!("/api/sessions/{}", session.id), None, None).await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn my_sessions_filter_by_company() {
  let h = Harness::new();
  let (acme, _) = h.new_session(1, "Acme").await;
  let (kakao, _) = h.new_session(1, "Kakao").await;
  h.new_session(2, "Acme").await;

  let (_, all) = h.json(Method::GET, "/api/sessions/mine", Some(1), None).await;
  let ids: Vec<i64> = all.as_array().unwrap().iter().map(|s| s["id"].as_i64().unwrap()).collect();
  assert_eq!(ids, vec![kakao, acme]);

  let (_, only) = h.json(Method::GET, "/api/sessions/mine?company=Acme", Some(1), None).await;
  assert_eq!(only.as_array().unwrap().len(), 1);
  assert_eq!(only[0]["id"], acme);
}

#[tokio::test]
async fn text_answer_is_scored_and_stored() {
  let h = Harness::new();
  let (_, questions) = h.new_session(1, "").await;
  let qid = questions[0]["id"].as_i64().unwrap();

  let (status, body) = h
    .json(
      Method::POST,
      "/api/answers",
      None,
      Some(json!({
        "question_id": qid,
        "type": "text",
        "transcript": "핵심키워드 중심의 경험근거 제시",
        "duration_sec": 60,
      })),
    )
    .await;
  assert_eq!(status, StatusCode::OK, "{}", body);
  assert_eq!(
    body["analytics"],
    json!({
      "filler_ratio": 0.0,
      "wpm": 4.0,
      "keyword_hit_rate": 1.0,
      "sentiment": "neu",
      "clarity_score": 4.0,
      "coherence_score": 5.0,
    })
  );

  let answer_id = body["answer_id"].as_i64().unwrap();
  let (status, stored) = h
    .json(Method::GET, &format!("/api/answers/{}/analytics", answer_id), None, None)
    .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(stored["answer_id"], answer_id);
  assert_eq!(stored["wpm"], 4.0);
}

#[tokio::test]
async fn answer_validation() {
  let h = Harness::new();
  let (_, questions) = h.new_session(1, "").await;
  let qid = questions[0]["id"].as_i64().unwrap();

  let (status, body) = h
    .json(Method::POST, "/api/answers", None, Some(json!({ "question_id": qid, "type": "video" })))
    .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["detail"], "type must be 'text' or 'audio'");

  let (status, body) = h
    .json(Method::POST, "/api/answers", None, Some(json!({ "question_id": 4242, "type": "text" })))
    .await;
  assert_eq!(status, StatusCode::NOT_FOUND);
  assert_eq!(body["detail"], "Question not found");

  let (status, _) = h.json(Method::GET, "/api/answers/4242/analytics", None, None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn answer_type_and_duration_are_optional() {
  let h = Harness::new();
  let (_, questions) = h.new_session(1, "").await;
  let qid = questions[0]["id"].as_i64().unwrap();

  let (status, body) = h
    .json(
      Method::POST,
      "/api/answers",
      None,
      Some(json!({ "question_id": qid, "transcript": "핵심키워드 설명" })),
    )
    .await;
  assert_eq!(status, StatusCode::OK, "{}", body);
  assert_eq!(body["analytics"]["wpm"], 0.0);
  assert_eq!(body["analytics"]["keyword_hit_rate"], 0.5);

  let (status, body) = h
    .json(
      Method::POST,
      "/api/answers",
      None,
      Some(json!({ "question_id": qid, "type": "text", "transcript": "핵심키워드", "duration_sec": null })),
    )
    .await;
  assert_eq!(status, StatusCode::OK, "{}", body);
  assert_eq!(body["analytics"]["wpm"], 0.0);
  assert_eq!(body["analytics"]["clarity_score"], 5.0);
}

#[tokio::test]
async fn malformed_requests_get_a_detail_body() {
  let h = Harness::new();

  let req = Request::builder()
    .method(Method::POST)
    .uri("/api/answers")
    .header(header::CONTENT_TYPE, "application/json")
    .body(Body::from("{\"question_id\": "))
    .unwrap();
  let response = h.send(req).await;
  assert_eq!(response.status(), StatusCode::BAD_REQUEST);
  let body = read_json(response).await;
  assert!(!body["detail"].as_str().unwrap().is_empty());

  let (status, body) = h
    .json(Method::POST, "/api/answers", None, Some(json!({ "question_id": "three" })))
    .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert!(body["detail"].is_string());

  let req = Request::builder()
    .method(Method::POST)
    .uri("/api/answers")
    .body(Body::from("{}"))
    .unwrap();
  let response = h.send(req).await;
  assert_eq!(response.status(), StatusCode::BAD_REQUEST, "missing content type");
  assert!(read_json(response).await["detail"].is_string());

  let (status, body) = h.json(Method::GET, "/api/answers/abc/analytics", None, None).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert!(body["detail"].is_string());

  let (status, body) = h.json(Method::GET, "/api/sessions/abc", Some(1), None).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert!(body["detail"].is_string());

  let req = Request::builder()
    .method(Method::POST)
    .uri("/api/uploads/audio")
    .header(header::CONTENT_TYPE, "application/json")
    .body(Body::from("{}"))
    .unwrap();
  let response = h.send(req).await;
  assert_eq!(response.status(), StatusCode::BAD_REQUEST);
  assert!(read_json(response).await["detail"].is_string());
}

#[tokio::test]
async fn audio_upload_is_saved_transcribed_and_scored() {
  let h = Harness::new();
  let (_, questions) = h.new_session(1, "").await;
  let qid = questions[0]["id"].as_i64().unwrap().to_string();

  let body = multipart(&[("question_id", qid.as_str())], Some(("answer.webm", &b"\x1a\x45\xdf\xa3webm"[..])));
  let response = h.send(upload_request(body)).await;
  assert_eq!(response.status(), StatusCode::OK);
  let body = read_json(response).await;

  assert_eq!(body["transcript"], "음 핵심키워드 설명");
  assert_eq!(body["duration_sec"], 6.0);
  assert_eq!(body["analytics"]["filler_ratio"], 0.333);
  assert_eq!(body["analytics"]["wpm"], 30.0);
  assert_eq!(body["analytics"]["keyword_hit_rate"], 0.5);

  let audio_url = body["audio_url"].as_str().unwrap();
  assert!(audio_url.ends_with(".webm"));
  assert!(Path::new(audio_url).starts_with(&h.state.config.upload_dir));
  assert!(Path::new(audio_url).exists());
  assert_eq!(*h.transcriber.languages.lock().unwrap(), vec!["ko".to_string()]);
}

#[tokio::test]
async fn audio_upload_errors() {
  let h = Harness::with_transcriber(StubTranscriber {
    fail: true,
    ..StubTranscriber::default()
  });
  let (_, questions) = h.new_session(1, "").await;
  let qid = questions[0]["id"].as_i64().unwrap().to_string();

  let missing_file = multipart(&[("question_id", qid.as_str())], None);
  assert_eq!(h.send(upload_request(missing_file)).await.status(), StatusCode::BAD_REQUEST);

  let unknown = multipart(&[("question_id", "999")], Some(("a.wav", &b"RIFF"[..])));
  assert_eq!(h.send(upload_request(unknown)).await.status(), StatusCode::NOT_FOUND);

  let body = multipart(&[("question_id", qid.as_str()), ("language", "en")], Some(("a.wav", &b"RIFF"[..])));
  let response = h.send(upload_request(body)).await;
  assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
  let body = read_json(response).await;
  assert!(body["detail"].as_str().unwrap().starts_with("STT failed"));
  assert_eq!(*h.transcriber.languages.lock().unwrap(), vec!["en".to_string()]);
}

#[tokio::test]
async fn report_lifecycle() {
  let h = Harness::new();
  let (sid, questions) = h.new_session(1, "").await;

  let (status, _) = h.json(Method::POST, "/api/sessions/999/report", None, None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
  let (status, body) = h.json(Method::POST, &format!("/api/sessions/{}/report", sid), None, None).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["detail"], "No answers found for this session");
  let (status, _) = h.json(Method::GET, &format!("/api/sessions/{}/report", sid), None, None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);

  for q in questions.iter().take(2) {
    h.json(
      Method::POST,
      "/api/answers",
      None,
      Some(json!({
        "question_id": q["id"],
        "type": "text",
        "transcript": "핵심키워드 경험근거 기반으로 문제를 해결했습니다",
        "duration_sec": 3,
      })),
    )
    .await;
  }

  let (status, created) = h.json(Method::POST, &format!("/api/sessions/{}/report", sid), None, None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(created["session_id"], sid);
  let score = created["total_score"].as_f64().unwrap();
  assert!((0.0..=100.0).contains(&score));

  let (status, again) = h.json(Method::POST, &format!("/api/sessions/{}/report", sid), None, None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(again["report_id"], created["report_id"]);

  let (status, report) = h.json(Method::GET, &format!("/api/sessions/{}/report", sid), None, None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(report["total_score"], score);
  assert!(!report["summary_md"].as_str().unwrap().is_empty());
  assert!(!report["suggestions_md"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn deleting_a_session_removes_it() {
  let h = Harness::new();
  let (sid, _) = h.new_session(1, "").await;
  let (status, _) = h.json(Method::DELETE, &format!("/api/sessions/{}", sid), Some(1), None).await;
  assert_eq!(status, StatusCode::NO_CONTENT);
  let (status, _) = h.json(Method::GET, &format!("/api/sessions/{}", sid), Some(1), None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn signup_validates_and_rejects_duplicates() {
  let h = Harness::new();

  let (status, body) = h
    .json(Method::POST, "/api/auth/signup", None, Some(json!({ "email": "  ", "password": "pw" })))
    .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["detail"], "email/password required");
  let (status, _) = h
    .json(Method::POST, "/api/auth/signup", None, Some(json!({ "email": "kim@example.com" })))
    .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);

  let (status, body) = h
    .json(
      Method::POST,
      "/api/auth/signup",
      None,
      Some(json!({ "email": " Kim@Example.com ", "password": "pw1234" })),
    )
    .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body, json!({ "ok": true }));

  let (status, body) = h
    .json(
      Method::POST,
      "/api/auth/signup",
      None,
      Some(json!({ "email": "kim@example.com", "password": "other" })),
    )
    .await;
  assert_eq!(status, StatusCode::CONFLICT);
  assert_eq!(body["detail"], "email already exists");
}

#[tokio::test]
async fn login_rejects_bad_credentials() {
  let h = Harness::new();
  h.json(
    Method::POST,
    "/api/auth/signup",
    None,
    Some(json!({ "email": "kim@example.com", "password": "pw1234" })),
  )
  .await;

  for creds in [
    json!({ "email": "kim@example.com", "password": "wrong" }),
    json!({ "email": "lee@example.com", "password": "pw1234" }),
  ] {
    let req = Request::builder()
      .method(Method::POST)
      .uri("/api/auth/login")
      .header(header::CONTENT_TYPE, "application/json")
      .body(Body::from(creds.to_string()))
      .unwrap();
    let response = h.send(req).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(set_cookies(&response).is_empty());
    assert_eq!(
      read_json(response).await,
      json!({ "detail": "이메일 또는 비밀번호가 올바르지 않습니다" })
    );
  }
}

#[tokio::test]
async fn login_me_refresh_and_logout() {
  let h = Harness::new();
  let (status, _) = h
    .json(
      Method::POST,
      "/api/auth/signup",
      None,
      Some(json!({ "email": "kim@example.com", "password": "pw1234" })),
    )
    .await;
  assert_eq!(status, StatusCode::OK);

  let req = Request::builder()
    .method(Method::POST)
    .uri("/api/auth/login")
    .header(header::CONTENT_TYPE, "application/json")
    .body(Body::from(json!({ "email": "KIM@example.com", "password": "pw1234" }).to_string()))
    .unwrap();
  let response = h.send(req).await;
  assert_eq!(response.status(), StatusCode::OK);
  let cookies = set_cookies(&response);
  assert_eq!(read_json(response).await, json!({ "ok": true }));
  assert_eq!(cookies.len(), 2);
  assert!(cookies[0].starts_with("access_token="));
  assert!(cookies[1].starts_with("refresh_token="));
  assert!(cookies.iter().all(|c| c.contains("HttpOnly")));

  let req = Request::builder()
    .uri("/api/me")
    .header(header::COOKIE, cookie_pair(&cookies[0]))
    .body(Body::empty())
    .unwrap();
  let response = h.send(req).await;
  assert_eq!(response.status(), StatusCode::OK);
  let me = read_json(response).await;
  assert_eq!(me["email"], "kim@example.com");
  let user_id = me["id"].as_i64().unwrap();

  // Refresh with the login's refresh cookie, then use the new access token
  // as a bearer header.
  let req = Request::builder()
    .method(Method::POST)
    .uri("/api/auth/refresh")
    .header(header::COOKIE, cookie_pair(&cookies[1]))
    .body(Body::empty())
    .unwrap();
  let response = h.send(req).await;
  assert_eq!(response.status(), StatusCode::NO_CONTENT);
  let refreshed = set_cookies(&response);
  assert_eq!(refreshed.len(), 2);
  let access = cookie_pair(&refreshed[0]).strip_prefix("access_token=").unwrap();

  let req = Request::builder()
    .uri("/api/me")
    .header(header::AUTHORIZATION, format!("Bearer {}", access))
    .body(Body::empty())
    .unwrap();
  let response = h.send(req).await;
  assert_eq!(response.status(), StatusCode::OK);
  assert_eq!(read_json(response).await, json!({ "id": user_id, "email": "kim@example.com" }));

  // An access token cannot be used to refresh.
  let req = Request::builder()
    .method(Method::POST)
    .uri("/api/auth/refresh")
    .header(header::COOKIE, format!("refresh_token={}", access))
    .body(Body::empty())
    .unwrap();
  assert_eq!(h.send(req).await.status(), StatusCode::UNAUTHORIZED);

  let req = Request::builder()
    .method(Method::POST)
    .uri("/api/auth/logout")
    .body(Body::empty())
    .unwrap();
  let response = h.send(req).await;
  assert_eq!(response.status(), StatusCode::NO_CONTENT);
  assert_eq!(set_cookies(&response).len(), 2);
}

#[tokio::test]
async fn me_needs_an_existing_user() {
  let h = Harness::new();
  let (status, _) = h.json(Method::GET, "/api/me", Some(404), None).await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);
}

/// Next text frame from the server, parsed as JSON.
async fn ws_reply<S>(ws: &mut S) -> Value
where
  S: futures::Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
  loop {
    match ws.next().await.unwrap().unwrap() {
      Message::Text(text) => return serde_json::from_str(&text).unwrap(),
      Message::Ping(_) | Message::Pong(_) => continue,
      other => panic!("unexpected frame: {:?}", other),
    }
  }
}

#[tokio::test]
async fn realtime_socket_scores_frames_in_order() {
  let h = Harness::new();
  let (sid, questions) = h.new_session(1, "").await;
  let qid = questions[0]["id"].as_i64().unwrap();

  let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
  let addr = listener.local_addr().unwrap();
  let app = router(h.state.clone());
  tokio::spawn(async move {
    axum::serve(listener, app).await.unwrap();
  });

  let (mut ws, _) = tokio_tungstenite::connect_async(format!("ws://{}/api/realtime/{}", addr, sid))
    .await
    .unwrap();

  let frame = json!({ "question_id": qid, "text": "핵심키워드 중심의 경험근거 제시", "elapsed_sec": 60 });
  ws.send(Message::Text(frame.to_string())).await.unwrap();
  let scored = ws_reply(&mut ws).await;
  assert_eq!(scored["question_id"], qid);
  assert_eq!(scored["elapsed_sec"], 60.0);
  assert_eq!(scored["metrics"]["wpm"], 4.0);
  assert_eq!(scored["metrics"]["keyword_hit_rate"], 1.0);
  assert!(!scored["tip"].as_str().unwrap().is_empty());

  // Binary frames are ignored; the next text frame still gets its own reply.
  ws.send(Message::Binary(vec![1, 2, 3])).await.unwrap();
  ws.send(Message::Text("not json".into())).await.unwrap();
  let invalid = ws_reply(&mut ws).await;
  assert!(invalid["error"].as_str().unwrap().starts_with("invalid message"));

  ws.send(Message::Text(json!({ "question_id": 9999 }).to_string())).await.unwrap();
  assert_eq!(ws_reply(&mut ws).await, json!({ "error": "Question not found" }));

  ws.close(None).await.unwrap();
}
