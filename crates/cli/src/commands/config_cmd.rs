//! `tabmate config` — Configuration management commands.

use tabmate_config::AppConfig;

use super::CommandResult;

pub async fn validate() -> CommandResult {
    println!("🔍 Validating configuration...");

    match AppConfig::load() {
        Ok(config) => {
            println!("   ✅ Config parsed successfully");

            let mut warnings = Vec::new();
            if config.context.recent_turns == 0 {
                warnings.push("context.recent_turns = 0 disables working memory");
            }
            if config.context.history_cap == 0 {
                warnings.push("context.history_cap = 0 disables long-term history");
            }
            if config.memory.backend == "memory" || config.memory.backend == "none" {
                warnings.push("Turns are not persisted between CLI invocations with this backend");
            }

            if warnings.is_empty() {
                println!("   ✅ All checks passed");
            } else {
                println!();
                for w in &warnings {
                    println!("   ⚠️  {w}");
                }
            }

            println!();
            println!("   Memory:    {}", config.memory.backend);
            println!("   Store:     {}", config.memory.resolved_path().display());
            println!(
                "   Budget:    {} tokens ({} reserved)",
                config.context.total_tokens, config.context.new_message_reserve
            );
            println!("   Marker:    {}", config.context.page_marker);
        }
        Err(e) => {
            println!("   ❌ Config error: {e}");
            return Err(e.into());
        }
    }

    Ok(())
}

pub async fn show() -> CommandResult {
    let config = super::load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

pub async fn path() -> CommandResult {
    let config_path = AppConfig::config_dir().join("config.toml");
    println!("{}", config_path.display());
    Ok(())
}

pub async fn init(force: bool) -> CommandResult {
    let config_path = AppConfig::config_dir().join("config.toml");
    if config_path.exists() && !force {
        println!("   Config already exists at {}", config_path.display());
        println!("   Run with --force to overwrite.");
        return Ok(());
    }
    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&config_path, AppConfig::default_toml())?;
    println!("✅ Wrote {}", config_path.display());
    Ok(())
}
