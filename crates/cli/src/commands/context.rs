//! `tabmate context` — Assemble the message list for a new message.

use super::{CommandResult, open_memory, session_arg};

pub async fn run(
    session: &str,
    message: &str,
    turn: Option<u32>,
    system: Option<&str>,
    with_metadata: bool,
) -> CommandResult {
    let session_id = session_arg(session)?;
    let memory = open_memory().await?;
    let turn_number = match turn {
        Some(n) => n,
        None => memory.next_turn_number(&session_id).await,
    };

    let assembled = memory
        .assemble(&session_id, message, turn_number, system)
        .await;

    let output = if with_metadata {
        serde_json::json!({
            "turn": turn_number,
            "messages": assembled.messages,
            "metadata": assembled.metadata,
        })
    } else {
        serde_json::to_value(&assembled.messages)?
    };
    println!("{}", serde_json::to_string_pretty(&output)?);

    if with_metadata {
        eprintln!(
            "📊 {} tokens of {} ({:.1}%), {} drop(s)",
            assembled.metadata.total_tokens,
            assembled.metadata.budget,
            assembled.metadata.utilization_pct,
            assembled.metadata.drops.len()
        );
    }
    Ok(())
}
