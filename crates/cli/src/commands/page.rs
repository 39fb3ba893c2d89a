//! `tabmate page` — Store page content and attachments.

use std::io::Read;
use std::path::{Path, PathBuf};

use tabmate_core::message::Attachment;

use super::{CommandResult, open_memory, session_arg};

pub async fn run(session: &str, file: Option<PathBuf>, attachments: Vec<PathBuf>) -> CommandResult {
    let session_id = session_arg(session)?;

    let page = match (&file, attachments.is_empty()) {
        (Some(path), _) => Some(read(path)?),
        (None, true) => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            Some(buf)
        }
        (None, false) => None,
    };

    let attachments = attachments
        .iter()
        .map(|path| {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());
            Ok(Attachment::text(name, read(path)?))
        })
        .collect::<Result<Vec<_>, Box<dyn std::error::Error>>>()?;

    let memory = open_memory().await?;
    let stored = memory
        .store_context(&session_id, page.as_deref(), attachments)
        .await
        .ok_or("Failed to store page context (see log)")?;

    println!("✅ Stored context for session {}", stored.session_id);
    if let Some(summary) = &stored.page_summary {
        println!("   Page:        {summary}");
    }
    for summary in &stored.attachment_summaries {
        println!("   Attachment:  {summary}");
    }
    Ok(())
}

fn read(path: &Path) -> Result<String, Box<dyn std::error::Error>> {
    std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read {}: {e}", path.display()).into())
}
