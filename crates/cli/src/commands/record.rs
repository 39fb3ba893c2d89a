//! `tabmate record` — Store a completed turn.

use super::{CommandResult, open_memory, session_arg};

pub async fn run(session: &str, user: &str, assistant: &str, turn: Option<u32>) -> CommandResult {
    let session_id = session_arg(session)?;
    let memory = open_memory().await?;
    let turn_number = match turn {
        Some(n) => n,
        None => memory.next_turn_number(&session_id).await,
    };

    match memory
        .store_turn(&session_id, turn_number, user, assistant)
        .await
    {
        Some(stored) => {
            println!(
                "✅ Stored turn {} of session {} ({} tokens)",
                stored.turn_number, stored.session_id, stored.tokens
            );
            println!("   {}", stored.summary);
            Ok(())
        }
        None => Err(format!("Failed to store turn {turn_number} (see log)").into()),
    }
}
