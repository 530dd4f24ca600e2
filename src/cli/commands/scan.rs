use crate::models::MediaTypeHint;
use crate::state::SharedState;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

/// Runs the ingestion pipeline over both download roots, printing progress
/// as it streams in rather than waiting for a final report.
pub async fn cmd_scan(state: &SharedState) -> anyhow::Result<()> {
    let cancel = CancellationToken::new();
    let (tx, mut rx) = tokio::sync::mpsc::channel(256);

    let printer = tokio::spawn(async move {
        use crate::services::workflow::WorkflowEvent;
        while let Some(event) = rx.recv().await {
            match event {
                WorkflowEvent::Started { root } => println!("scanning {}", root.display()),
                WorkflowEvent::FileDiscovered { filename } => println!("  found {filename}"),
                WorkflowEvent::FileAutoValidated { filename, title } => {
                    println!("  auto-validated {filename} -> {title}");
                }
                WorkflowEvent::FileQueuedForReview { filename } => {
                    println!("  queued for review: {filename}");
                }
                WorkflowEvent::FileSkipped { filename, reason } => {
                    println!("  skipped {filename} ({reason})");
                }
                WorkflowEvent::RootFinished { root } => println!("finished {}\n", root.display()),
            }
        }
    });

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
    printer.await?;

    let films_report = films_report?;
    let series_report = series_report?;

    println!(
        "films: {} discovered, {} auto-validated, {} queued, {} skipped",
        films_report.discovered, films_report.auto_validated, films_report.queued_for_review, films_report.skipped
    );
    println!(
        "series: {} discovered, {} auto-validated, {} queued, {} skipped",
        series_report.discovered, series_report.auto_validated, series_report.queued_for_review, series_report.skipped
    );

    Ok(())
}
