/// Expired refresh-token sweeper.
///
/// Runs one sweep immediately on startup, then repeats on a fixed interval.
/// Each sweep is a single bulk delete of tokens expired longer than the
/// configured grace window ago; in-flight refresh calls already reject
/// anything past expiry, so the slack only delays reclamation of dead rows.
/// A failed sweep is logged and retried at the next tick, never fatal.

use sqlx::PgPool;
use std::time::Duration;
use tokio::sync::watch;

use crate::auth::delete_expired_tokens;
use crate::configuration::SweeperSettings;

/// Drive the sweep loop until the shutdown signal fires.
///
/// The loop observes `shutdown` cooperatively: it exits at the next wait
/// boundary without cutting a sweep short.
pub async fn run_sweeper(
    pool: PgPool,
    settings: SweeperSettings,
    mut shutdown: watch::Receiver<bool>,
) {
    tracing::info!(
        interval_secs = settings.interval_secs,
        grace_secs = settings.grace_secs,
        "Starting refresh token sweeper"
    );

    // First sweep runs right away; the first interval tick fires immediately
    // as well, so skip it.
    sweep_once(&pool, settings.grace_secs).await;

    let mut interval = tokio::time::interval(Duration::from_secs(settings.interval_secs));
    interval.tick().await;

    loop {
        tokio::select! {
            _ = interval.tick() => {
                sweep_once(&pool, settings.grace_secs).await;
            }
            _ = shutdown.changed() => {
                tracing::info!("Refresh token sweeper shutting down");
                break;
            }
        }
    }
}

async fn sweep_once(pool: &PgPool, grace_secs: i64) {
    match delete_expired_tokens(pool, grace_secs).await {
        Ok(removed) => {
            if removed > 0 {
                tracing::info!(removed, "Swept expired refresh tokens");
            } else {
                tracing::debug!("Sweep found no expired refresh tokens");
            }
        }
        Err(e) => {
            // Store hiccups are retried at the next tick.
            tracing::warn!(error = %e, "Refresh token sweep failed");
        }
    }
}
