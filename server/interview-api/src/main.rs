//! Binary entrypoint for the interview API.

use std::sync::Arc;

use interview_api::store::PgStore;
use interview_api::{router, AppState, Config};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("interview_api=info,tower_http=info")),
    )
    .init();

  let config = Config::from_env()?;
  let store = PgStore::connect(config.require_database_url()?).await?;
  store.migrate().await?;

  if !config.llm.enabled() {
    tracing::info!("no report generator configured; reports use the rule-based fallback");
  }

  let addr = config.bind_addr;
  let state = Arc::new(AppState::new(config, Arc::new(store)));
  let app = router(state);

  let listener = tokio::net::TcpListener::bind(addr).await?;
  tracing::info!("interview-api listening on http://{}", addr);
  axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

  Ok(())
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    tracing::error!(error = %e, "failed to listen for shutdown signal");
    std::future::pending::<()>().await;
  }
  tracing::info!("shutting down");
}
