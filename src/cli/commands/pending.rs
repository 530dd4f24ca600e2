use crate::db::Store;
use crate::state::SharedState;
use tokio_util::sync::CancellationToken;

pub async fn cmd_pending_list(state: &SharedState) -> anyhow::Result<()> {
    let items = state.validation.list_pending().await?;
    if items.is_empty() {
        println!("no pending validations.");
        return Ok(());
    }

    println!("Pending validations ({} total)", items.len());
    println!("{:-<70}", "");
    for item in items {
        let candidates = Store::decode_candidates(&item);
        let top = candidates.first();
        println!(
            "#{} video_file={} candidates={} top={}",
            item.id,
            item.video_file_id,
            candidates.len(),
            top.map_or_else(|| "none".to_string(), |c| format!("{} ({:.0})", c.title, c.score)),
        );
    }
    Ok(())
}

pub async fn cmd_pending_show(state: &SharedState, id: i32) -> anyhow::Result<()> {
    let Some(item) = state.store.get_pending_validation(id).await? else {
        println!("no pending validation with id {id}");
        return Ok(());
    };
    let video_file = state.store.get_video_file(item.video_file_id).await?;

    println!("pending validation #{}", item.id);
    println!("status: {}", item.status);
    if let Some(vf) = video_file {
        println!("file: {}", vf.path);
    }
    println!("candidates:");
    for candidate in Store::decode_candidates(&item) {
        println!(
            "  {} | {} ({}) | score {:.1} | {:?}",
            candidate.external_id,
            candidate.title,
            candidate.year.map_or_else(|| "?".to_string(), |y| y.to_string()),
            candidate.score,
            candidate.source,
        );
    }
    Ok(())
}

pub async fn cmd_accept(state: &SharedState, pending_id: i32, candidate_external_id: &str) -> anyhow::Result<()> {
    let updated = state
        .validation
        .accept(pending_id, candidate_external_id, &CancellationToken::new())
        .await?;
    println!("pending validation #{} accepted -> {}", updated.id, candidate_external_id);
    Ok(())
}

pub async fn cmd_reject(state: &SharedState, pending_id: i32) -> anyhow::Result<()> {
    let updated = state.validation.reject(pending_id).await?;
    println!("pending validation #{} rejected", updated.id);
    Ok(())
}

pub async fn cmd_reset(state: &SharedState, pending_id: i32) -> anyhow::Result<()> {
    let updated = state.validation.reset_to_pending(pending_id).await?;
    println!("pending validation #{} reset to pending", updated.id);
    Ok(())
}
