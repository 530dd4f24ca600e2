use crate::state::SharedState;

pub async fn cmd_trash_list(state: &SharedState, entity_type: Option<&str>) -> anyhow::Result<()> {
    let entries = state.store.list_trash(entity_type).await?;
    if entries.is_empty() {
        println!("trash is empty.");
        return Ok(());
    }

    println!("Trash ({} total)", entries.len());
    println!("{:-<70}", "");
    for entry in entries {
        println!(
            "#{} {} original_id={} deleted_at={}",
            entry.id, entry.entity_type, entry.original_id, entry.deleted_at
        );
    }
    Ok(())
}

pub async fn cmd_trash_restore(state: &SharedState, id: i32) -> anyhow::Result<()> {
    state.store.restore_from_trash(id).await?;
    println!("trash entry #{id} restored.");
    Ok(())
}

pub async fn cmd_trash_remove(state: &SharedState, id: i32) -> anyhow::Result<()> {
    state.store.remove_trash_entry(id).await?;
    println!("trash entry #{id} permanently removed.");
    Ok(())
}
