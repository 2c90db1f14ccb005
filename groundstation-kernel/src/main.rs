/*
 * GROUND STATION KERNEL - entry point of the field monitoring service
 *
 * Wires config, the telemetry aggregator, the flight recorder and the
 * command sandbox behind one axum router. Request-driven: nothing samples
 * in the background, each /api/telemetry poll produces one snapshot (and
 * one CSV row while recording).
 */

mod battery;
mod config;
mod environment;
mod error;
mod health;
mod http;
mod probe;
mod recorder;
mod sandbox;
mod state;
mod telemetry;
#[cfg(test)]
mod testing;

use crate::config::load_config;
use crate::state::StationContext;
use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("groundstation_kernel=info,groundstation_host=info")),
        )
        .init();

    let cfg = load_config().await;

    if let Err(e) = std::fs::create_dir_all(&cfg.logging.dir) {
        warn!("cannot create log dir {}: {}", cfg.logging.dir.display(), e);
    }

    let ctx = StationContext::from_config(&cfg);
    let recorder = ctx.recorder.clone();
    let app = http::build_router(ctx);

    let listener = TcpListener::bind(&cfg.http.bind)
        .await
        .with_context(|| format!("Failed to bind {}", cfg.http.bind))?;
    info!("ground station listening on http://{}", cfg.http.bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            info!("shutdown requested");
        })
        .await
        .context("HTTP server failed")?;

    // an open flight log is closed and synced before exit
    let stopped = recorder.lock().stop();
    match stopped {
        Ok(Some(path)) => info!("closed active flight log {}", path.display()),
        Ok(None) => {}
        Err(e) => warn!("flight log did not close cleanly: {}", e),
    }

    Ok(())
}
