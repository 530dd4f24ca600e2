use crate::services::association_checker::EntityKind;
use crate::state::SharedState;
use tokio_util::sync::CancellationToken;

pub async fn cmd_scan_suspicious(state: &SharedState) -> anyhow::Result<()> {
    let flagged = state.association_checker.scan_suspicious(&CancellationToken::new()).await?;

    if flagged.is_empty() {
        println!("no suspicious associations found.");
        return Ok(());
    }

    println!("{} suspicious association(s)", flagged.len());
    for item in flagged {
        println!(
            "  {:?} #{} confidence={} path={}",
            item.entity_type,
            item.entity_id,
            item.confidence,
            item.file_path.display()
        );
        for reason in item.reasons {
            println!("    - {reason}");
        }
    }
    Ok(())
}

pub async fn cmd_confirm(state: &SharedState, entity_type: &str, entity_id: i32) -> anyhow::Result<()> {
    let kind = match entity_type.to_lowercase().as_str() {
        "movie" => EntityKind::Movie,
        "episode" => EntityKind::Episode,
        other => anyhow::bail!("unknown entity type \"{other}\", expected movie|episode"),
    };
    state.association_checker.confirm(kind, entity_id).await?;
    println!("{entity_type} #{entity_id} confirmed.");
    Ok(())
}
