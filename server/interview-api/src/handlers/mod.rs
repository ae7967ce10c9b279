//! HTTP and WebSocket handlers.

mod answers;
mod auth;
mod health;
mod realtime;
mod reports;
mod sessions;
mod uploads;

pub use answers::{create_answer, get_analytics};
pub use auth::{login, logout, me, refresh, signup};
pub use health::health;
pub use realtime::realtime;
pub use reports::{create_report, get_report};
pub use sessions::{create_session, delete_session, get_session, list_my_sessions};
pub use uploads::{upload_audio, MAX_AUDIO_BYTES};
