//! Standalone improve-text service.
//!
//! Serves the improvement endpoint on `IMPROVE_SERVICE_ADDR`
//! (default 127.0.0.1:8787). Needs `OPENAI_API_KEY` in the environment or a
//! `.env.local`/`.env` file at the crate root.

use anyhow::Result;
use diario_scan::service::{router, ServiceState};

#[tokio::main]
async fn main() -> Result<()> {
    diario_scan::config::load_dotenv();
    env_logger::init();

    let state = ServiceState::from_env();
    if state.openai_api_key.is_none() {
        log::warn!("[SERVICE] OPENAI_API_KEY not set — improvement requests will fail");
    }

    let addr = std::env::var("IMPROVE_SERVICE_ADDR")
        .unwrap_or_else(|_| "127.0.0.1:8787".to_string());
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    log::info!("[SERVICE] improve-text listening on {addr}");

    axum::serve(listener, router(state)).await?;
    Ok(())
}
