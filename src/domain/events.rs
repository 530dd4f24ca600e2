//! Domain events broadcast from the workflow, validation and transfer
//! services so multiple CLI invocations (or a future daemon front-end) can
//! observe progress without each service knowing about its listeners.

use serde::Serialize;

/// Events broadcast over the application event bus (§5 progress events).
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", content = "payload")]
pub enum NotificationEvent {
    ScanStarted { root: String },
    ScanFileDiscovered { filename: String },
    ScanFinished { root: String, discovered: usize },

    AutoValidated { filename: String, title: String },
    QueuedForReview { filename: String },
    FileSkipped { filename: String, reason: String },

    TransferStarted { total: usize },
    TransferProgress { done: usize, total: usize, current_filename: String },
    TransferConflict { pending_id: i32, destination: String },
    TransferResolved { pending_id: i32, choice: String },
    TransferFinished { transferred: usize, skipped: usize, failed: usize },

    AssociationScanStarted,
    AssociationScanFinished { flagged: usize },

    Error { message: String },
    Info { message: String },
}
