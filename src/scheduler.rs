//! Workflow Orchestrator's cron-driven half (C9, §2/§5): runs the ingestion
//! pipeline and the suspicion scan on a schedule instead of only on operator
//! demand, grounded on the teacher's `Scheduler` (`JobScheduler` + a
//! `running` flag gating scheduled ticks so `stop()` takes effect between
//! runs rather than mid-run).

use crate::config::SchedulerConfig;
use crate::models::MediaTypeHint;
use crate::state::SharedState;
use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio_cron_scheduler::{Job, JobScheduler};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

pub struct Scheduler {
    state: Arc<SharedState>,
    config: SchedulerConfig,
    running: Arc<RwLock<bool>>,
}

impl Scheduler {
    #[must_use]
    pub fn new(state: Arc<SharedState>, config: SchedulerConfig) -> Self {
        Self {
            state,
            config,
            running: Arc::new(RwLock::new(false)),
        }
    }

    /// Registers the ingestion and suspicion-scan jobs on their configured
    /// cron expressions and blocks until `stop()` flips `running` false.
    /// A no-op when scheduling is disabled in config (operator-triggered
    /// ingestion only, per spec.md §1 Non-goals).
    pub async fn start(&self) -> Result<()> {
        if !self.config.enabled {
            info!("scheduler disabled in config; ingestion remains operator-triggered");
            return Ok(());
        }

        *self.running.write().await = true;
        let mut sched = JobScheduler::new().await?;

        let ingest_state = Arc::clone(&self.state);
        let ingest_running = Arc::clone(&self.running);
        let ingest_job = Job::new_async(self.config.cron_expression.as_str(), move |_uuid, _lock| {
            let state = Arc::clone(&ingest_state);
            let running = Arc::clone(&ingest_running);
            Box::pin(async move {
                if !*running.read().await {
                    return;
                }
                if let Err(e) = run_ingestion(&state).await {
                    error!(error = %e, "scheduled ingestion run failed");
                }
            })
        })?;

        let scan_state = Arc::clone(&self.state);
        let scan_running = Arc::clone(&self.running);
        let scan_job = Job::new_async(
            self.config.association_scan_cron_expression.as_str(),
            move |_uuid, _lock| {
                let state = Arc::clone(&scan_state);
                let running = Arc::clone(&scan_running);
                Box::pin(async move {
                    if !*running.read().await {
                        return;
                    }
                    if let Err(e) = run_association_scan(&state).await {
                        error!(error = %e, "scheduled association scan failed");
                    }
                })
            },
        )?;

        sched.add(ingest_job).await?;
        sched.add(scan_job).await?;
        sched.start().await?;

        info!(
            ingest_cron = %self.config.cron_expression,
            scan_cron = %self.config.association_scan_cron_expression,
            "scheduler running"
        );

        while *self.running.read().await {
            tokio::time::sleep(std::time::Duration::from_secs(1)).await;
        }

        sched.shutdown().await?;
        Ok(())
    }

    pub async fn stop(&self) {
        *self.running.write().await = false;
    }

    /// Runs both jobs immediately, once, ignoring the cron schedule —
    /// used by the CLI's one-shot `check` command.
    pub async fn run_once(&self) -> Result<()> {
        run_ingestion(&self.state).await?;
        run_association_scan(&self.state).await?;
        Ok(())
    }
}

async fn run_ingestion(state: &Arc<SharedState>) -> Result<()> {
    let cancel = CancellationToken::new();
    let (tx, mut rx) = tokio::sync::mpsc::channel(256);
    let drain = tokio::spawn(async move { while rx.recv().await.is_some() {} });

    let films_root = PathBuf::from(&state.config.downloads_dir).join("Films");
    let series_root = PathBuf::from(&state.config.downloads_dir).join("Series");

    let films = state
        .workflow
        .run(films_root, MediaTypeHint::Movie, tx.clone(), &cancel);
    let series = state
        .workflow
        .run(series_root, MediaTypeHint::Series, tx.clone(), &cancel);
    drop(tx);

    let (films_report, series_report) = tokio::join!(films, series);
    let _ = drain.await;

    info!(?films_report, ?series_report, "scheduled ingestion finished");
    films_report?;
    series_report?;
    Ok(())
}

async fn run_association_scan(state: &Arc<SharedState>) -> Result<()> {
    let cancel = CancellationToken::new();
    let flagged = state.association_checker.scan_suspicious(&cancel).await?;
    info!(flagged = flagged.len(), "scheduled association scan finished");
    Ok(())
}
