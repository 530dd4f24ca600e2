use crate::cli::ConflictPolicy;
use crate::services::transfer_service::{ConflictChoice, TransferEvent};
use crate::state::SharedState;
use tokio_util::sync::CancellationToken;

pub async fn cmd_transfer(state: &SharedState, dry_run: bool, on_conflict: ConflictPolicy) -> anyhow::Result<()> {
    let cancel = CancellationToken::new();
    let (tx, mut rx) = tokio::sync::mpsc::channel(32);

    let printer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match event {
                TransferEvent::Started { total } => println!("transferring {total} item(s)"),
                TransferEvent::Progress { done, total, current_filename } => {
                    if !current_filename.is_empty() {
                        println!("  [{done}/{total}] {current_filename}");
                    }
                }
                TransferEvent::Conflict { context, reply } => {
                    println!(
                        "  conflict for pending #{}: {:?} at {}",
                        context.pending_id,
                        context.kind,
                        context.destination.display()
                    );
                    let choice = resolve_policy(on_conflict);
                    println!("    resolved automatically as {choice:?}");
                    let _ = reply.send(choice);
                }
                TransferEvent::Resolved { pending_id, choice } => {
                    println!("  pending #{pending_id} resolved as {choice:?}");
                }
                TransferEvent::Finished { report } => {
                    println!(
                        "done: {} transferred, {} duplicates skipped, {} skipped, {} failed",
                        report.transferred, report.duplicates_skipped, report.skipped, report.failed
                    );
                }
            }
        }
    });

    state.transfer.execute(dry_run, tx, &cancel).await?;
    printer.await?;
    Ok(())
}

const fn resolve_policy(policy: ConflictPolicy) -> ConflictChoice {
    match policy {
        ConflictPolicy::KeepOld => ConflictChoice::KeepOld,
        ConflictPolicy::KeepNew => ConflictChoice::KeepNew,
        ConflictPolicy::KeepBoth => ConflictChoice::KeepBoth,
        ConflictPolicy::Skip => ConflictChoice::Skip,
    }
}
