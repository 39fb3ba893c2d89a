//! `tabmate clear` — Forget a session or everything.

use super::{CommandResult, load_config, open_memory, open_store, session_arg};

pub async fn run(session: Option<&str>, all: bool, confirm: bool) -> CommandResult {
    if all {
        if !confirm {
            println!("⚠️  This will delete ALL stored turns and page context permanently.");
            println!("   Run with --confirm to proceed:");
            println!("   tabmate clear --all --confirm");
            return Ok(());
        }
        let config = load_config()?;
        let store = open_store(&config.memory).await?;
        store.clear().await?;
        println!("✅ All sessions cleared ({} backend).", store.name());
        return Ok(());
    }

    let session_id = session_arg(session.unwrap_or_default())?;
    let memory = open_memory().await?;
    if memory.clear_session(&session_id).await {
        println!("🗑️  Cleared session {session_id}.");
    } else {
        println!("   Nothing stored for session {session_id}.");
    }
    Ok(())
}
