use std::sync::Arc;

use axum::{
  extract::{
    ws::{Message, WebSocket, WebSocketUpgrade},
    State,
  },
  response::IntoResponse,
};
use futures::{SinkExt, StreamExt};

use crate::extract::ApiPath;
use crate::feedback::FeedbackSession;
use crate::state::AppState;

pub async fn realtime(
  State(state): State<Arc<AppState>>,
  ApiPath(session_id): ApiPath<i64>,
  upgrade: WebSocketUpgrade,
) -> impl IntoResponse {
  upgrade.on_upgrade(move |socket| run_feedback(state, session_id, socket))
}

/// One connection: every text frame is scored and answered in order until
/// the client goes away.
async fn run_feedback(state: Arc<AppState>, session_id: i64, socket: WebSocket) {
  let (mut sender, mut receiver) = socket.split();
  let mut session = FeedbackSession::new(session_id);
  tracing::debug!(session_id, "realtime feedback connected");

  while let Some(Ok(message)) = receiver.next().await {
    let raw = match message {
      Message::Text(text) => text,
      Message::Close(_) => break,
      Message::Binary(_) => {
        tracing::warn!(session_id, "unexpected binary frame");
        continue;
      }
      Message::Ping(_) | Message::Pong(_) => continue,
    };
    let reply = session.handle_text(state.store.as_ref(), &raw).await;
    if sender.send(Message::Text(reply.to_string())).await.is_err() {
      break;
    }
  }

  tracing::debug!(
    session_id = session.session_id(),
    questions = session.cached_questions(),
    "realtime feedback closed"
  );
}
