//! `tabmate turns` — List stored turns of a session.


use super::{CommandResult, open_memory, session_arg};

pub async fn run(session: &str, limit: usize) -> CommandResult {
    let session_id = session_arg(session)?;
    let memory = open_memory().await?;
    let store = memory.store();

    let count = store.turn_count(&session_id).await?;
    println!("🧠 Session {session_id} ({} backend)", store.name());
    println!("   Turns: {count}");
    if count == 0 {
        return Ok(());
    }

    let older = store.turn_summaries(&session_id, limit).await?;
    if !older.is_empty() {
        println!();
        println!("   Older (summaries):");
        for summary in &older {
            println!("   • {summary}");
        }
    }

    println!();
    println!("   Recent:");
    for turn in store.recent_turns(&session_id, limit).await? {
        println!(
            "   #{:<3} {}  [{} tokens]",
            turn.turn_number,
            turn.timestamp.format("%Y-%m-%d %H:%M:%S"),
            turn.tokens
        );
        println!("        user:      {}", turn.user_message);
        println!("        assistant: {}", turn.assistant_response);
    }

    if let Some(context) = store.context(&session_id).await? {
        println!();
        println!(
            "   Page: {}",
            context.page_summary.as_deref().unwrap_or("(none)")
        );
        println!("   Attachments: {}", context.attachments.len());
    }
    Ok(())
}
