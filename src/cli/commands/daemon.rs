use crate::scheduler::Scheduler;
use crate::state::SharedState;
use std::sync::Arc;
use tracing::{error, info};

/// Runs the cron scheduler until Ctrl+C, same shape as the teacher's daemon
/// mode minus the web server (no HTTP surface in this crate).
pub async fn cmd_daemon(
    state: Arc<SharedState>,
    _prometheus_handle: Option<metrics_exporter_prometheus::PrometheusHandle>,
) -> anyhow::Result<()> {
    info!("cinevault v{} starting in daemon mode", env!("CARGO_PKG_VERSION"));

    let scheduler = Arc::new(Scheduler::new(Arc::clone(&state), state.config.scheduler.clone()));

    let scheduler_handle = {
        let scheduler = Arc::clone(&scheduler);
        tokio::spawn(async move {
            if let Err(e) = scheduler.start().await {
                error!(error = %e, "scheduler error");
            }
        })
    };

    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received");

    scheduler.stop().await;
    scheduler_handle.abort();

    info!("daemon stopped");
    Ok(())
}

/// Runs one ingestion pass and one association scan, then exits.
pub async fn cmd_check(state: &SharedState) -> anyhow::Result<()> {
    info!("running single check");
    let scheduler = Scheduler::new(Arc::new(state.clone()), state.config.scheduler.clone());
    scheduler.run_once().await?;
    info!("check complete");
    Ok(())
}
