//! Subcommand implementations.

pub mod clear;
pub mod config_cmd;
pub mod context;
pub mod page;
pub mod record;
pub mod render;
pub mod turns;

use std::sync::Arc;

use tabmate_config::{AppConfig, MemoryConfig};
use tabmate_context::{ContextBudget, ConversationMemory};
use tabmate_core::memory::TurnStore;
use tabmate_core::message::SessionId;
use tabmate_core::{Error, Result};
use tabmate_memory::{FileTurnStore, InMemoryTurnStore, NoopTurnStore};

pub type CommandResult = std::result::Result<(), Box<dyn std::error::Error>>;

/// Open the turn store named by the memory configuration.
pub async fn open_store(config: &MemoryConfig) -> Result<Arc<dyn TurnStore>> {
    let store: Arc<dyn TurnStore> = match config.backend.as_str() {
        #[cfg(feature = "sqlite")]
        "sqlite" => {
            let path = config.resolved_path();
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let url = format!("sqlite://{}", path.display());
            Arc::new(tabmate_memory::SqliteTurnStore::new(&url).await?)
        }
        "file" => Arc::new(FileTurnStore::new(config.resolved_path())),
        "memory" => Arc::new(InMemoryTurnStore::new()),
        "none" => Arc::new(NoopTurnStore),
        other => {
            return Err(Error::Config {
                message: format!("Unsupported memory backend: {other}"),
            });
        }
    };
    tracing::debug!(backend = store.name(), "Turn store opened");
    Ok(store)
}

pub fn load_config() -> Result<AppConfig> {
    AppConfig::load().map_err(|e| Error::Config {
        message: e.to_string(),
    })
}

/// Load config and wire a [`ConversationMemory`] over the configured store.
pub async fn open_memory() -> Result<ConversationMemory> {
    let config = load_config()?;
    let store = open_store(&config.memory).await?;
    Ok(ConversationMemory::new(
        store,
        ContextBudget::from(&config.context),
    ))
}

/// Parse a session id argument, rejecting blanks.
pub fn session_arg(raw: &str) -> Result<SessionId> {
    let id = SessionId::from(raw.trim());
    if id.is_empty() {
        return Err(Error::InvalidInput("Session id must not be empty".into()));
    }
    Ok(id)
}
